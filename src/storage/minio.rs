use async_trait::async_trait;
use aws_config::Region;
use aws_sdk_s3::{
    config::{BehaviorVersion, Credentials},
    primitives::ByteStream,
    types::{BucketCannedAcl, ObjectCannedAcl},
    Client, Config,
};
use bytes::Bytes;
use uuid::Uuid;

use super::{extension_for_content_type, MediaStore};
use crate::{
    config::MinioConfig,
    error::{AppError, AppResult},
};

#[derive(Clone)]
pub struct MinioClient {
    client: Client,
    config: MinioConfig,
}

impl MinioClient {
    pub fn new(config: &MinioConfig) -> Self {
        let creds = Credentials::new(
            &config.access_key,
            &config.secret_key,
            None,
            None,
            "minio",
        );

        let s3_config = Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .endpoint_url(&config.endpoint)
            .credentials_provider(creds)
            .force_path_style(true)
            .build();

        let client = Client::from_conf(s3_config);

        Self {
            client,
            config: config.clone(),
        }
    }

    pub async fn ensure_bucket(&self) -> AppResult<()> {
        let bucket = self.photos_bucket();
        let result = self.client.head_bucket().bucket(bucket).send().await;

        if result.is_err() {
            self.client
                .create_bucket()
                .bucket(bucket)
                .acl(BucketCannedAcl::PublicRead)
                .send()
                .await
                .map_err(|e| AppError::Storage(format!("Failed to create bucket: {}", e)))?;
            tracing::info!("Created bucket: {}", bucket);
        }

        Ok(())
    }

    pub async fn upload_file(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> AppResult<String> {
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(data))
            .content_type(content_type)
            .acl(ObjectCannedAcl::PublicRead)
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("Failed to upload file: {}", e)))?;

        Ok(self.get_file_url(bucket, key))
    }

    pub fn get_file_url(&self, bucket: &str, key: &str) -> String {
        file_url(&self.config, bucket, key)
    }

    pub fn photos_bucket(&self) -> &str {
        &self.config.photos_bucket
    }
}

#[async_trait]
impl MediaStore for MinioClient {
    async fn upload_photo(&self, data: Bytes, content_type: &str) -> AppResult<String> {
        let extension = extension_for_content_type(content_type).ok_or_else(|| {
            AppError::Validation(format!("Unsupported image type: {}", content_type))
        })?;
        let key = format!("photos/{}.{}", Uuid::new_v4(), extension);

        self.upload_file(self.photos_bucket(), &key, data, content_type)
            .await
    }
}

fn file_url(config: &MinioConfig, bucket: &str, key: &str) -> String {
    let base = config
        .public_url
        .as_deref()
        .unwrap_or(&config.endpoint)
        .trim_end_matches('/');
    format!("{}/{}/{}", base, bucket, key)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(public_url: Option<&str>) -> MinioConfig {
        MinioConfig {
            endpoint: "http://localhost:9000".to_string(),
            access_key: "minioadmin".to_string(),
            secret_key: "minioadmin".to_string(),
            region: "us-east-1".to_string(),
            photos_bucket: "ourmemory".to_string(),
            public_url: public_url.map(str::to_string),
        }
    }

    #[test]
    fn url_prefers_public_base() {
        let url = file_url(
            &config(Some("https://cdn.example.com/")),
            "ourmemory",
            "photos/a.jpg",
        );
        assert_eq!(url, "https://cdn.example.com/ourmemory/photos/a.jpg");
    }

    #[test]
    fn url_falls_back_to_endpoint() {
        let url = file_url(&config(None), "ourmemory", "photos/a.png");
        assert_eq!(url, "http://localhost:9000/ourmemory/photos/a.png");
    }
}
