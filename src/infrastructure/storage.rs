use crate::config::AppConfig;
use crate::services::connection::{ConnectionFactory, PooledConnectionFactory, S3ConnectionFactory};
use std::sync::Arc;
use tracing::info;

pub fn setup_storage(config: &AppConfig) -> Arc<dyn ConnectionFactory> {
    info!(
        "☁️  Spaces Storage: {} ({}) (Bucket: {})",
        config.endpoint.url, config.endpoint.region, config.upload.bucket_name
    );

    let factory = S3ConnectionFactory::new()
        .with_part_size(config.part_size)
        .with_path_style(config.force_path_style);

    if config.pool_connections {
        info!("♻️  Reusing client handles across requests");
        Arc::new(PooledConnectionFactory::new(factory))
    } else {
        Arc::new(factory)
    }
}
