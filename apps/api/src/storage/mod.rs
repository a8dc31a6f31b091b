//! Blob storage — transient CV bytes and profile avatars. The S3 client is
//! constructed at the composition root and injected behind the `BlobStore`
//! trait so the pipeline can be exercised with an in-memory stand-in.

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use tracing::info;

use crate::errors::AppError;

#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn store(&self, key: &str, bytes: Bytes, content_type: &str) -> Result<(), AppError>;
    /// Returns `None` when the key does not exist.
    async fn read(&self, key: &str) -> Result<Option<Bytes>, AppError>;
    async fn delete(&self, key: &str) -> Result<(), AppError>;
}

/// S3-backed blob store (MinIO-compatible in local deployments).
pub struct S3BlobStore {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3BlobStore {
    pub fn new(client: aws_sdk_s3::Client, bucket: String) -> Self {
        Self { client, bucket }
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn store(&self, key: &str, bytes: Bytes, content_type: &str) -> Result<(), AppError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("put s3://{}/{key}: {e}", self.bucket)))?;
        info!("Stored blob s3://{}/{key}", self.bucket);
        Ok(())
    }

    async fn read(&self, key: &str) -> Result<Option<Bytes>, AppError> {
        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await;

        let output = match response {
            Ok(output) => output,
            Err(e) => {
                if e.as_service_error().is_some_and(|se| se.is_no_such_key()) {
                    return Ok(None);
                }
                return Err(AppError::Storage(format!(
                    "get s3://{}/{key}: {e}",
                    self.bucket
                )));
            }
        };

        let data = output
            .body
            .collect()
            .await
            .map_err(|e| AppError::Storage(format!("read s3://{}/{key}: {e}", self.bucket)))?;
        Ok(Some(data.into_bytes()))
    }

    async fn delete(&self, key: &str) -> Result<(), AppError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("delete s3://{}/{key}: {e}", self.bucket)))?;
        Ok(())
    }
}
