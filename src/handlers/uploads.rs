/// Upload endpoints backed by the `FileStore`.
use actix_web::{web, HttpResponse};

use crate::db::models::{UploadRequest, UploadResponse};
use crate::error::Result;
use crate::uploads::{content_type_for, FileStore};

/// POST /uploads
pub async fn upload(
    files: web::Data<FileStore>,
    req: web::Json<UploadRequest>,
) -> Result<HttpResponse> {
    let url = files.store_base64(&req.filename, &req.data).await?;
    Ok(HttpResponse::Created().json(UploadResponse { url }))
}

/// GET /uploads/{name}
pub async fn serve(files: web::Data<FileStore>, name: web::Path<String>) -> Result<HttpResponse> {
    let bytes = files.read(&name).await?;
    Ok(HttpResponse::Ok()
        .content_type(content_type_for(&name))
        .body(bytes))
}
