/// Post and comment endpoints. Reads are performed on behalf of the viewer
/// named by `?email=`.
use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::db::{models::*, Database, DbPool};
use crate::error::Result;
use crate::push::PushNotifier;
use crate::social::AccountId;

/// POST /posts
pub async fn create_post(
    pool: web::Data<DbPool>,
    req: web::Json<CreatePostRequest>,
) -> Result<HttpResponse> {
    let post = Database::create_post(&pool, &req).await?;
    Ok(HttpResponse::Created().json(post))
}

/// GET /feed?email=
pub async fn feed(
    pool: web::Data<DbPool>,
    viewer: web::Query<ViewerQuery>,
) -> Result<HttpResponse> {
    let posts = Database::feed(&pool, &viewer.email).await?;
    Ok(HttpResponse::Ok().json(posts))
}

/// GET /profiles/{account_id}/posts?email=
pub async fn posts_by_account(
    pool: web::Data<DbPool>,
    owner: web::Path<AccountId>,
    viewer: web::Query<ViewerQuery>,
) -> Result<HttpResponse> {
    let posts = Database::posts_by_account(&pool, &viewer.email, owner.into_inner()).await?;
    Ok(HttpResponse::Ok().json(posts))
}

/// GET /posts/{post_id}?email=
pub async fn get_post(
    pool: web::Data<DbPool>,
    post_id: web::Path<i64>,
    viewer: web::Query<ViewerQuery>,
) -> Result<HttpResponse> {
    let post = Database::get_post(&pool, &viewer.email, post_id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(post))
}

/// DELETE /posts/{post_id}?email=
pub async fn delete_post(
    pool: web::Data<DbPool>,
    post_id: web::Path<i64>,
    viewer: web::Query<ViewerQuery>,
) -> Result<HttpResponse> {
    Database::delete_post(&pool, &viewer.email, post_id.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// POST /posts/{post_id}/reactions
pub async fn react_to_post(
    pool: web::Data<DbPool>,
    post_id: web::Path<i64>,
    req: web::Json<ReactionRequest>,
) -> Result<HttpResponse> {
    let stats =
        Database::react_to_post(&pool, &req.email, post_id.into_inner(), &req.reaction).await?;
    Ok(HttpResponse::Ok().json(stats))
}

/// POST /comments
///
/// The post owner is notified unless they commented on their own post.
pub async fn create_comment(
    pool: web::Data<DbPool>,
    notifier: web::Data<PushNotifier>,
    req: web::Json<CreateCommentRequest>,
) -> Result<HttpResponse> {
    let comment = Database::create_comment(&pool, &req.email, req.post_id, &req.content).await?;

    let post = Database::get_post(&pool, &req.email, comment.post_id).await?;
    if post.post.account_id != comment.account_id {
        notifier.notify(
            pool.get_ref().clone(),
            post.post.account_id,
            "New comment",
            format!("{} commented on your post", comment.username),
            json!({
                "type": "comment",
                "post_id": comment.post_id,
                "comment_id": comment.comment_id,
            }),
        );
    }
    Ok(HttpResponse::Created().json(comment))
}

/// GET /posts/{post_id}/comments?email=
pub async fn list_comments(
    pool: web::Data<DbPool>,
    post_id: web::Path<i64>,
    viewer: web::Query<ViewerQuery>,
) -> Result<HttpResponse> {
    let comments = Database::comments_for_post(&pool, &viewer.email, post_id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(comments))
}

/// DELETE /comments/{comment_id}?email=
pub async fn delete_comment(
    pool: web::Data<DbPool>,
    comment_id: web::Path<i64>,
    viewer: web::Query<ViewerQuery>,
) -> Result<HttpResponse> {
    Database::delete_comment(&pool, &viewer.email, comment_id.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// POST /comments/{comment_id}/reactions
pub async fn react_to_comment(
    pool: web::Data<DbPool>,
    comment_id: web::Path<i64>,
    req: web::Json<ReactionRequest>,
) -> Result<HttpResponse> {
    let stats =
        Database::react_to_comment(&pool, &req.email, comment_id.into_inner(), &req.reaction)
            .await?;
    Ok(HttpResponse::Ok().json(stats))
}
