/// HTTP handlers module
/// Provides REST and WebSocket endpoints
use actix_web::{web, HttpResponse};
use serde_json::json;

pub mod accounts;
pub mod friends;
pub mod messages;
pub mod posts;
pub mod uploads;
pub mod websocket;

pub use websocket::{ws_connect, WsServer};

/// Health check endpoint
/// GET /health
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "ok"
    }))
}

/// Register every route on an app or scope.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health))
        // Accounts
        .route("/accounts/check", web::post().to(accounts::check_availability))
        .route("/accounts", web::post().to(accounts::create_account))
        .route("/accounts/{email}", web::get().to(accounts::get_account))
        .route("/accounts/{email}", web::put().to(accounts::update_profile))
        .route("/accounts/{email}", web::delete().to(accounts::delete_account))
        .route("/accounts/{email}/email", web::put().to(accounts::update_email))
        .route(
            "/accounts/{email}/profile-image",
            web::put().to(accounts::update_profile_image),
        )
        .route(
            "/accounts/{email}/push-token",
            web::put().to(accounts::update_push_token),
        )
        .route("/accounts/{email}/contacts", web::post().to(accounts::contacts))
        .route("/accounts/{email}/suggestions", web::get().to(accounts::suggestions))
        .route("/accounts/{email}/search", web::get().to(accounts::search))
        .route("/profiles/{account_id}", web::get().to(accounts::get_profile))
        // Friends
        .route(
            "/accounts/{email}/relationship/{account_id}",
            web::get().to(friends::get_relationship),
        )
        .route("/accounts/{email}/friends", web::get().to(friends::list_friends))
        .route(
            "/accounts/{email}/friend-requests",
            web::get().to(friends::list_requests),
        )
        .route("/friend-requests", web::post().to(friends::send_request))
        .route("/friend-requests/cancel", web::post().to(friends::cancel_request))
        .route("/friend-requests/accept", web::post().to(friends::accept_request))
        .route("/friend-requests/reject", web::post().to(friends::reject_request))
        .route("/friends/remove", web::post().to(friends::remove_friend))
        // Posts and comments
        .route("/posts", web::post().to(posts::create_post))
        .route("/feed", web::get().to(posts::feed))
        .route("/profiles/{account_id}/posts", web::get().to(posts::posts_by_account))
        .route("/posts/{post_id}", web::get().to(posts::get_post))
        .route("/posts/{post_id}", web::delete().to(posts::delete_post))
        .route("/posts/{post_id}/reactions", web::post().to(posts::react_to_post))
        .route("/posts/{post_id}/comments", web::get().to(posts::list_comments))
        .route("/comments", web::post().to(posts::create_comment))
        .route("/comments/{comment_id}", web::delete().to(posts::delete_comment))
        .route(
            "/comments/{comment_id}/reactions",
            web::post().to(posts::react_to_comment),
        )
        // Messages
        .route("/messages", web::post().to(messages::send_message))
        .route(
            "/accounts/{email}/messages/{account_id}",
            web::get().to(messages::conversation),
        )
        .route(
            "/accounts/{email}/conversations",
            web::get().to(messages::conversations),
        )
        // Uploads
        .route("/uploads", web::post().to(uploads::upload))
        .route("/uploads/{name}", web::get().to(uploads::serve))
        // WebSocket endpoint
        .route("/ws/{email}", web::get().to(ws_connect));
}
