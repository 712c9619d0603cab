/// Account endpoints: registration, profile maintenance, deletion and the
/// discovery views (contacts, suggestions, search).
use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::db::{models::*, Database, DbPool};
use crate::error::Result;
use crate::social::AccountId;
use crate::uploads::FileStore;

/// POST /accounts/check
pub async fn check_availability(
    pool: web::Data<DbPool>,
    req: web::Json<CheckAvailabilityRequest>,
) -> Result<HttpResponse> {
    Database::check_available(&pool, &req.email, &req.username).await?;
    Ok(HttpResponse::Ok().json(json!({ "available": true })))
}

/// POST /accounts
pub async fn create_account(
    pool: web::Data<DbPool>,
    req: web::Json<CreateAccountRequest>,
) -> Result<HttpResponse> {
    let account = Database::create_account(&pool, &req).await?;
    log::info!("Registered account {} ({})", account.account_id, account.username);
    Ok(HttpResponse::Created().json(account))
}

/// GET /accounts/{email}
pub async fn get_account(
    pool: web::Data<DbPool>,
    email: web::Path<String>,
) -> Result<HttpResponse> {
    let account = Database::get_account(&pool, &email).await?;
    Ok(HttpResponse::Ok().json(account))
}

/// GET /profiles/{account_id}
pub async fn get_profile(
    pool: web::Data<DbPool>,
    account_id: web::Path<AccountId>,
) -> Result<HttpResponse> {
    let account = Database::get_account_by_id(&pool, account_id.into_inner()).await?;
    let summary = AccountSummary {
        account_id: account.account_id,
        username: account.username,
        fname: account.fname,
        lname: account.lname,
        profile_image: account.profile_image,
    };
    Ok(HttpResponse::Ok().json(summary))
}

/// PUT /accounts/{email}/email
pub async fn update_email(
    pool: web::Data<DbPool>,
    email: web::Path<String>,
    req: web::Json<UpdateEmailRequest>,
) -> Result<HttpResponse> {
    let account = Database::update_email(&pool, &email, &req.new_email).await?;
    Ok(HttpResponse::Ok().json(account))
}

/// PUT /accounts/{email}
pub async fn update_profile(
    pool: web::Data<DbPool>,
    email: web::Path<String>,
    req: web::Json<UpdateProfileRequest>,
) -> Result<HttpResponse> {
    let account = Database::update_profile(&pool, &email, &req).await?;
    Ok(HttpResponse::Ok().json(account))
}

/// PUT /accounts/{email}/profile-image
///
/// Stores the uploaded image and points the profile at it.
pub async fn update_profile_image(
    pool: web::Data<DbPool>,
    files: web::Data<FileStore>,
    email: web::Path<String>,
    req: web::Json<UploadRequest>,
) -> Result<HttpResponse> {
    // Resolve first so unknown accounts don't leave files behind
    Database::resolve_account(&pool, &email).await?;
    let url = files.store_base64(&req.filename, &req.data).await?;
    let account = Database::update_profile_image(&pool, &email, &url).await?;
    Ok(HttpResponse::Ok().json(account))
}

/// PUT /accounts/{email}/push-token
pub async fn update_push_token(
    pool: web::Data<DbPool>,
    email: web::Path<String>,
    req: web::Json<PushTokenRequest>,
) -> Result<HttpResponse> {
    Database::update_push_token(&pool, &email, req.token.as_deref()).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// DELETE /accounts/{email}
pub async fn delete_account(
    pool: web::Data<DbPool>,
    email: web::Path<String>,
) -> Result<HttpResponse> {
    Database::delete_account(&pool, &email).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// POST /accounts/{email}/contacts
pub async fn contacts(
    pool: web::Data<DbPool>,
    email: web::Path<String>,
    req: web::Json<ContactsRequest>,
) -> Result<HttpResponse> {
    let matches = Database::contacts_from_numbers(&pool, &email, &req.phone_numbers).await?;
    Ok(HttpResponse::Ok().json(matches))
}

/// GET /accounts/{email}/suggestions
pub async fn suggestions(
    pool: web::Data<DbPool>,
    email: web::Path<String>,
) -> Result<HttpResponse> {
    let matches = Database::friend_suggestions(&pool, &email).await?;
    Ok(HttpResponse::Ok().json(matches))
}

/// GET /accounts/{email}/search?q=
pub async fn search(
    pool: web::Data<DbPool>,
    email: web::Path<String>,
    query: web::Query<SearchQuery>,
) -> Result<HttpResponse> {
    let matches = Database::search_accounts(&pool, &email, &query.q).await?;
    Ok(HttpResponse::Ok().json(matches))
}
