/// Direct message endpoints. Messages sent over HTTP are relayed to open
/// websocket connections the same way chat commands are.
use actix_web::{web, HttpResponse};

use crate::db::{models::*, Database, DbPool};
use crate::error::Result;
use crate::handlers::WsServer;
use crate::social::AccountId;

/// POST /messages
pub async fn send_message(
    pool: web::Data<DbPool>,
    server: web::Data<WsServer>,
    req: web::Json<SendMessageRequest>,
) -> Result<HttpResponse> {
    let message = Database::send_message(&pool, &req.email, req.receiver_id, &req.content).await?;
    server.deliver_chat(&message).await;
    server.notify_message(&message).await;
    Ok(HttpResponse::Created().json(message))
}

/// GET /accounts/{email}/messages/{account_id}?limit=
pub async fn conversation(
    pool: web::Data<DbPool>,
    path: web::Path<(String, AccountId)>,
    query: web::Query<HistoryQuery>,
) -> Result<HttpResponse> {
    let (email, other) = path.into_inner();
    let messages = Database::conversation(&pool, &email, other, query.limit).await?;
    Ok(HttpResponse::Ok().json(messages))
}

/// GET /accounts/{email}/conversations
pub async fn conversations(
    pool: web::Data<DbPool>,
    email: web::Path<String>,
) -> Result<HttpResponse> {
    let conversations = Database::conversations(&pool, &email).await?;
    Ok(HttpResponse::Ok().json(conversations))
}
