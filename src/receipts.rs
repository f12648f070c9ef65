//! Receipt storage collaborator.
//!
//! Expenses can carry a receipt image. The store hands back a url-like
//! relative path on upload; deletion failures are the caller's to log and
//! swallow; losing a receipt file must never block an expense operation.

use crate::error::{AppError, AppResult};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Upload size ceiling: 5 MB
pub const MAX_RECEIPT_BYTES: usize = 5 * 1024 * 1024;

const ALLOWED_TYPES: [&str; 3] = ["image/jpeg", "image/png", "image/webp"];

/// A receipt image handed in alongside an expense
#[derive(Debug, Clone)]
pub struct ReceiptUpload {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ReceiptUpload {
    /// Validate type and size limits before accepting the upload
    pub fn validate(&self) -> AppResult<()> {
        if !ALLOWED_TYPES.contains(&self.content_type.as_str()) {
            return Err(AppError::Validation(format!(
                "Only JPEG, PNG, WebP files are allowed, got {}",
                self.content_type
            )));
        }

        if self.bytes.len() > MAX_RECEIPT_BYTES {
            return Err(AppError::Validation(
                "File size must be less than 5MB".to_string(),
            ));
        }

        Ok(())
    }

    fn extension(&self) -> &'static str {
        match self.content_type.as_str() {
            "image/jpeg" => "jpg",
            "image/png" => "png",
            _ => "webp",
        }
    }
}

/// Filesystem-backed receipt store
pub struct ReceiptStore {
    root: PathBuf,
}

impl ReceiptStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Store a validated receipt and return its url (a path relative to the
    /// store root)
    pub async fn upload(&self, receipt: &ReceiptUpload) -> AppResult<String> {
        receipt.validate()?;

        let name = format!("{}.{}", Uuid::new_v4(), receipt.extension());

        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| AppError::Message(format!("Failed to create receipt dir: {}", e)))?;

        tokio::fs::write(self.root.join(&name), &receipt.bytes)
            .await
            .map_err(|e| AppError::Message(format!("Failed to upload receipt: {}", e)))?;

        Ok(name)
    }

    /// Delete a previously uploaded receipt by its url
    pub async fn delete(&self, url: &str) -> std::io::Result<()> {
        // Refuse anything that escapes the store root
        let name = Path::new(url)
            .file_name()
            .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::InvalidInput, "bad receipt url"))?;

        tokio::fs::remove_file(self.root.join(name)).await
    }
}
