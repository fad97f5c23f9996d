//! Local-directory object store for bottle and entry photos.

use std::path::PathBuf;

use tracing::debug;

use crate::error::{ServiceError, ServiceResult};

/// Accepted image types and the extension stored files get.
const IMAGE_TYPES: &[(&str, &str)] = &[
    ("image/jpeg", "jpg"),
    ("image/png", "png"),
    ("image/webp", "webp"),
    ("image/heic", "heic"),
];

/// Writes uploads into a directory and hands back a stable public URL.
///
/// Bytes are stored as received; resizing happens before upload.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
    public_base_url: String,
    max_bytes: usize,
}

/// Extension for an accepted image content type.
pub fn extension_for(content_type: &str) -> Option<&'static str> {
    let content_type = content_type.trim().to_ascii_lowercase();
    let content_type = match content_type.as_str() {
        "image/jpg" => "image/jpeg",
        other => other,
    };
    IMAGE_TYPES
        .iter()
        .find(|(ct, _)| *ct == content_type)
        .map(|(_, ext)| *ext)
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: &str, max_bytes: usize) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
            max_bytes,
        }
    }

    pub const fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Check an upload without storing it.
    pub fn check(&self, data: &[u8], content_type: &str) -> ServiceResult<&'static str> {
        let ext = extension_for(content_type).ok_or_else(|| {
            ServiceError::validation(format!("Unsupported image type: {content_type}"))
        })?;
        if data.is_empty() {
            return Err(ServiceError::validation("Image is empty"));
        }
        if data.len() > self.max_bytes {
            return Err(ServiceError::validation(format!(
                "Image exceeds {} bytes",
                self.max_bytes
            )));
        }
        Ok(ext)
    }

    /// Store an image and return its public URL.
    pub async fn put(&self, data: &[u8], content_type: &str) -> ServiceResult<String> {
        let ext = self.check(data, content_type)?;

        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| ServiceError::Internal(format!("Creating upload dir: {e}")))?;

        let file_name = format!("{}.{ext}", uuid::Uuid::new_v4());
        let path = self.root.join(&file_name);
        tokio::fs::write(&path, data)
            .await
            .map_err(|e| ServiceError::Internal(format!("Writing {}: {e}", path.display())))?;

        debug!(path = %path.display(), bytes = data.len(), "Image stored");
        Ok(format!("{}/{file_name}", self.public_base_url))
    }
}
