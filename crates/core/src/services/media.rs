//! Media service: decoding and storing base64 image uploads.

use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use recipedia_common::{AppError, AppResult, StorageBackend, generate_storage_key};

/// Media service for storing uploaded images.
///
/// Images arrive as `data:image/...;base64,...` URIs; the service
/// decodes them, sniffs the actual format, writes the bytes through the
/// storage backend and hands back an absolute URL.
#[derive(Clone)]
pub struct MediaService {
    storage: Arc<dyn StorageBackend>,
    server_url: String,
}

impl MediaService {
    /// Create a new media service.
    #[must_use]
    pub fn new(storage: Arc<dyn StorageBackend>, server_url: String) -> Self {
        Self {
            storage,
            server_url,
        }
    }

    /// Decode a base64 data URI and store it, returning the absolute
    /// URL of the stored image.
    pub async fn store_data_uri(&self, user_id: &str, data_uri: &str) -> AppResult<String> {
        let (content_type, payload) = split_data_uri(data_uri)?;

        let bytes = BASE64
            .decode(payload)
            .map_err(|_| AppError::Validation("image: invalid base64 payload".to_string()))?;

        let extension = match image::guess_format(&bytes) {
            Ok(image::ImageFormat::Png) => "png",
            Ok(image::ImageFormat::Jpeg) => "jpg",
            Ok(image::ImageFormat::Gif) => "gif",
            Ok(image::ImageFormat::WebP) => "webp",
            _ => {
                return Err(AppError::Validation(
                    "image: unsupported image format".to_string(),
                ));
            }
        };

        let key = generate_storage_key(user_id, &format!("upload.{extension}"));
        let stored = self.storage.upload(&key, &bytes, content_type).await?;

        Ok(self.absolute_url(&stored.url))
    }

    /// Delete a previously stored image by its URL. Unknown URLs are
    /// ignored so removal stays idempotent.
    pub async fn delete_by_url(&self, url: &str) -> AppResult<()> {
        let relative = url
            .strip_prefix(self.server_url.trim_end_matches('/'))
            .unwrap_or(url);

        if let Some(key) = relative.trim_start_matches('/').split_once('/') {
            // First path segment is the serving prefix, the rest is the key
            self.storage.delete(key.1).await?;
        }

        Ok(())
    }

    fn absolute_url(&self, url: &str) -> String {
        if url.starts_with('/') {
            format!("{}{}", self.server_url.trim_end_matches('/'), url)
        } else {
            url.to_string()
        }
    }
}

/// Split a `data:<type>;base64,<payload>` URI into content type and
/// payload.
fn split_data_uri(data_uri: &str) -> AppResult<(&str, &str)> {
    let rest = data_uri
        .strip_prefix("data:")
        .ok_or_else(|| AppError::Validation("image: expected a base64 data URI".to_string()))?;

    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| AppError::Validation("image: malformed data URI".to_string()))?;

    let content_type = header.strip_suffix(";base64").ok_or_else(|| {
        AppError::Validation("image: only base64 data URIs are supported".to_string())
    })?;

    Ok((content_type, payload))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_data_uri() {
        let (content_type, payload) = split_data_uri("data:image/png;base64,aGVsbG8=").unwrap();
        assert_eq!(content_type, "image/png");
        assert_eq!(payload, "aGVsbG8=");
    }

    #[test]
    fn test_split_data_uri_rejects_plain_text() {
        assert!(split_data_uri("hello").is_err());
        assert!(split_data_uri("data:image/png,plain").is_err());
        assert!(split_data_uri("data:image/png;base64").is_err());
    }
}
