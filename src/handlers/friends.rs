/// Friendship endpoints. Every transition answers with the relationship as
/// the caller sees it afterwards.
use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::db::{models::*, Database, DbPool};
use crate::error::Result;
use crate::push::PushNotifier;
use crate::social::{AccountId, Relationship};

fn relationship_response(account_id: AccountId, relationship: Relationship) -> HttpResponse {
    HttpResponse::Ok().json(RelationshipResponse {
        account_id,
        relationship,
    })
}

/// GET /accounts/{email}/relationship/{account_id}
pub async fn get_relationship(
    pool: web::Data<DbPool>,
    path: web::Path<(String, AccountId)>,
) -> Result<HttpResponse> {
    let (email, other) = path.into_inner();
    let relationship = Database::relationship(&pool, &email, other).await?;
    Ok(relationship_response(other, relationship))
}

/// GET /accounts/{email}/friends
pub async fn list_friends(
    pool: web::Data<DbPool>,
    email: web::Path<String>,
) -> Result<HttpResponse> {
    let friends = Database::list_friends(&pool, &email).await?;
    Ok(HttpResponse::Ok().json(friends))
}

/// GET /accounts/{email}/friend-requests
pub async fn list_requests(
    pool: web::Data<DbPool>,
    email: web::Path<String>,
) -> Result<HttpResponse> {
    let requests = Database::list_friend_requests(&pool, &email).await?;
    Ok(HttpResponse::Ok().json(requests))
}

/// POST /friend-requests
pub async fn send_request(
    pool: web::Data<DbPool>,
    notifier: web::Data<PushNotifier>,
    req: web::Json<FriendActionRequest>,
) -> Result<HttpResponse> {
    let (relationship, created) =
        Database::send_friend_request(&pool, &req.email, req.account_id).await?;

    if created {
        let sender = Database::get_account(&pool, &req.email).await?;
        notifier.notify(
            pool.get_ref().clone(),
            req.account_id,
            "New friend request",
            format!("{} wants to be your friend", sender.username),
            json!({ "type": "friend_request", "account_id": sender.account_id }),
        );
    }
    Ok(relationship_response(req.account_id, relationship))
}

/// POST /friend-requests/cancel
pub async fn cancel_request(
    pool: web::Data<DbPool>,
    req: web::Json<FriendActionRequest>,
) -> Result<HttpResponse> {
    let relationship = Database::cancel_friend_request(&pool, &req.email, req.account_id).await?;
    Ok(relationship_response(req.account_id, relationship))
}

/// POST /friend-requests/accept
pub async fn accept_request(
    pool: web::Data<DbPool>,
    notifier: web::Data<PushNotifier>,
    req: web::Json<FriendActionRequest>,
) -> Result<HttpResponse> {
    let relationship = Database::accept_friend_request(&pool, &req.email, req.account_id).await?;

    let accepter = Database::get_account(&pool, &req.email).await?;
    notifier.notify(
        pool.get_ref().clone(),
        req.account_id,
        "Friend request accepted",
        format!("{} accepted your friend request", accepter.username),
        json!({ "type": "friend_accept", "account_id": accepter.account_id }),
    );
    Ok(relationship_response(req.account_id, relationship))
}

/// POST /friend-requests/reject
pub async fn reject_request(
    pool: web::Data<DbPool>,
    req: web::Json<FriendActionRequest>,
) -> Result<HttpResponse> {
    let relationship = Database::reject_friend_request(&pool, &req.email, req.account_id).await?;
    Ok(relationship_response(req.account_id, relationship))
}

/// POST /friends/remove
pub async fn remove_friend(
    pool: web::Data<DbPool>,
    req: web::Json<FriendActionRequest>,
) -> Result<HttpResponse> {
    let relationship = Database::remove_friend(&pool, &req.email, req.account_id).await?;
    Ok(relationship_response(req.account_id, relationship))
}
