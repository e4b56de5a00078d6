use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error};

use crate::config::UploadConfig;
use crate::error::StorageResult;
use crate::services::connection::{ConnectionFactory, Credentials, Endpoint};
use crate::services::form::FileHeader;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadResult {
    /// Publicly resolvable address of the stored object
    pub location: String,
    pub bucket: String,
    pub key: String,
}

/// Uploads single files under `<file name><suffix>` in the configured bucket.
#[derive(Clone)]
pub struct ObjectUploader {
    connections: Arc<dyn ConnectionFactory>,
    config: UploadConfig,
}

impl ObjectUploader {
    pub fn new(connections: Arc<dyn ConnectionFactory>, config: UploadConfig) -> Self {
        Self {
            connections,
            config,
        }
    }

    pub fn config(&self) -> &UploadConfig {
        &self.config
    }

    pub async fn upload(
        &self,
        endpoint: &Endpoint,
        credentials: &Credentials,
        file: &FileHeader,
    ) -> StorageResult<UploadResult> {
        let store = self.connections.connect(endpoint, credentials).await?;

        let bucket = &self.config.bucket_name;
        let key = self.config.object_key(file.file_name());

        let body = file.open().await.map_err(|e| {
            error!("Failed to open file {}: {}", file.file_name(), e);
            e
        })?;

        debug!("Uploading {} ({} bytes) to {}/{}", file.file_name(), file.size(), bucket, key);

        // `body` is moved into the store and dropped before this returns.
        let location = store
            .put_object(bucket, &key, file.content_type(), body)
            .await
            .map_err(|e| {
                error!("Failed to upload {} to {}/{}: {}", file.file_name(), bucket, key, e);
                e
            })?;

        Ok(UploadResult {
            location,
            bucket: bucket.clone(),
            key,
        })
    }
}
