use std::sync::Arc;

use tracing::{error, info};

use crate::error::{StorageError, StorageResult};
use crate::services::connection::{ConnectionFactory, Credentials, Endpoint};

/// Deletes single objects by bucket and key.
#[derive(Clone)]
pub struct ObjectDeleter {
    connections: Arc<dyn ConnectionFactory>,
}

impl ObjectDeleter {
    pub fn new(connections: Arc<dyn ConnectionFactory>) -> Self {
        Self { connections }
    }

    /// Deleting a key that does not exist is normally reported as success by
    /// the service and is passed through unchanged.
    pub async fn delete(
        &self,
        endpoint: &Endpoint,
        credentials: &Credentials,
        bucket: &str,
        key: &str,
    ) -> StorageResult<()> {
        if bucket.is_empty() {
            return Err(StorageError::invalid_key("bucket must not be empty"));
        }
        if key.is_empty() {
            return Err(StorageError::invalid_key("object key must not be empty"));
        }

        let store = self.connections.connect(endpoint, credentials).await?;

        if let Err(e) = store.delete_object(bucket, key).await {
            error!("Failed to delete object {} from bucket {}: {}", key, bucket, e);
            return Err(e);
        }

        info!("Object {} deleted successfully from bucket {}", key, bucket);
        Ok(())
    }
}
