/// File storage for uploaded images.
/// Files are written under the upload directory with a generated name that
/// keeps the original extension, and are served back from `/uploads/{name}`.
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::error::{AppError, Result};

/// 10 MB per upload
pub const MAX_UPLOAD_SIZE: usize = 10 * 1024 * 1024;

const URL_PREFIX: &str = "/uploads/";

#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FileStore { root: root.into() }
    }

    /// Decode a base64 payload and store it. Returns the URL to serve it from.
    pub async fn store_base64(&self, filename: &str, data: &str) -> Result<String> {
        let bytes = BASE64
            .decode(data.trim())
            .map_err(|e| AppError::validation(format!("Invalid base64 data: {}", e)))?;
        self.store(filename, &bytes).await
    }

    pub async fn store(&self, filename: &str, bytes: &[u8]) -> Result<String> {
        if bytes.is_empty() {
            return Err(AppError::validation("Upload is empty"));
        }
        if bytes.len() > MAX_UPLOAD_SIZE {
            return Err(AppError::validation(format!(
                "Upload exceeds {} bytes",
                MAX_UPLOAD_SIZE
            )));
        }

        let name = match extension_of(filename) {
            Some(ext) => format!("{}.{}", Uuid::new_v4(), ext),
            None => Uuid::new_v4().to_string(),
        };

        tokio::fs::create_dir_all(&self.root).await?;
        let path = self.root.join(&name);
        let mut file = tokio::fs::File::create(&path).await?;
        file.write_all(bytes).await?;
        file.flush().await?;

        log::info!("Stored upload {} ({} bytes)", name, bytes.len());
        Ok(format!("{}{}", URL_PREFIX, name))
    }

    /// Contents of a stored file. Names that could leave the upload
    /// directory read as `NotFound`.
    pub async fn read(&self, name: &str) -> Result<Vec<u8>> {
        if !is_stored_name(name) {
            return Err(AppError::not_found("File not found"));
        }
        match tokio::fs::read(self.root.join(name)).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(AppError::not_found("File not found")),
            Err(e) => Err(e.into()),
        }
    }
}

/// MIME type to serve a stored file with.
pub fn content_type_for(name: &str) -> &'static str {
    match extension_of(name).as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("mp4") => "video/mp4",
        _ => "application/octet-stream",
    }
}

fn extension_of(filename: &str) -> Option<String> {
    let ext = Path::new(filename).extension()?.to_str()?;
    if ext.is_empty() || ext.len() > 8 || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

fn is_stored_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
}
