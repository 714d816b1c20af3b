use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use super::{extension_for_content_type, MediaStore};
use crate::{
    config::LocalMediaConfig,
    error::{AppError, AppResult},
};

/// Photos written to a directory on disk and served back under `/media`.
#[derive(Clone)]
pub struct LocalMediaStore {
    base_path: PathBuf,
    base_url: String,
}

impl LocalMediaStore {
    pub async fn new(config: &LocalMediaConfig) -> AppResult<Self> {
        fs::create_dir_all(config.dir.join("photos"))
            .await
            .map_err(|e| {
                AppError::Storage(format!(
                    "Failed to create media directory {}: {}",
                    config.dir.display(),
                    e
                ))
            })?;

        Ok(Self {
            base_path: config.dir.clone(),
            base_url: config.public_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl MediaStore for LocalMediaStore {
    async fn upload_photo(&self, data: Bytes, content_type: &str) -> AppResult<String> {
        let extension = extension_for_content_type(content_type).ok_or_else(|| {
            AppError::Validation(format!("Unsupported image type: {}", content_type))
        })?;
        let key = format!("photos/{}.{}", Uuid::new_v4(), extension);
        let path = self.base_path.join(&key);

        let mut file = fs::File::create(&path).await.map_err(|e| {
            AppError::Storage(format!("Failed to create file {}: {}", path.display(), e))
        })?;
        file.write_all(&data).await.map_err(|e| {
            AppError::Storage(format!("Failed to write file {}: {}", path.display(), e))
        })?;
        file.flush()
            .await
            .map_err(|e| AppError::Storage(format!("Failed to flush file {}: {}", path.display(), e)))?;

        tracing::debug!(key = %key, size = data.len(), "Stored photo locally");
        Ok(format!("{}/{}", self.base_url, key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_config() -> LocalMediaConfig {
        LocalMediaConfig {
            dir: std::env::temp_dir().join(format!("purethanks-media-{}", Uuid::new_v4())),
            public_url: "http://localhost:5000/media/".to_string(),
        }
    }

    #[tokio::test]
    async fn upload_writes_file_and_returns_public_url() {
        let config = temp_config();
        let store = LocalMediaStore::new(&config).await.unwrap();

        let url = store
            .upload_photo(Bytes::from_static(b"\x89PNG"), "image/png")
            .await
            .unwrap();

        let key = url
            .strip_prefix("http://localhost:5000/media/")
            .unwrap();
        assert!(key.starts_with("photos/") && key.ends_with(".png"));
        let written = fs::read(config.dir.join(key)).await.unwrap();
        assert_eq!(written, b"\x89PNG");

        fs::remove_dir_all(&config.dir).await.unwrap();
    }

    #[tokio::test]
    async fn upload_rejects_non_images() {
        let config = temp_config();
        let store = LocalMediaStore::new(&config).await.unwrap();

        let err = store
            .upload_photo(Bytes::from_static(b"%PDF"), "application/pdf")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        fs::remove_dir_all(&config.dir).await.unwrap();
    }
}
