use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::{Builder, Region};
use dashmap::DashMap;
use sha2::{Digest, Sha256};
use tracing::debug;
use url::Url;

use crate::error::{StorageError, StorageResult};
use crate::services::object_store::{ObjectStore, S3ObjectStore};

/// Static access/secret key pair.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_key: String,
    pub secret_key: String,
}

impl Credentials {
    pub fn new(access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key: secret_key.into(),
        }
    }

    /// Stable digest of the key pair, safe to use as a map key or in logs.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.access_key.as_bytes());
        hasher.update([0u8]);
        hasher.update(self.secret_key.as_bytes());
        hex::encode(hasher.finalize())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key", &self.access_key)
            .field("secret_key", &"***")
            .finish()
    }
}

/// Storage provider endpoint and region, e.g.
/// `https://nyc3.digitaloceanspaces.com` / `nyc3`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    pub url: String,
    pub region: String,
}

impl Endpoint {
    pub fn new(url: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            region: region.into(),
        }
    }

    /// Parses and checks the endpoint URL.
    pub fn parsed_url(&self) -> StorageResult<Url> {
        let url = Url::parse(&self.url).map_err(|e| {
            StorageError::configuration(format!("invalid endpoint '{}': {}", self.url, e))
        })?;

        match url.scheme() {
            "http" | "https" => {}
            other => {
                return Err(StorageError::configuration(format!(
                    "unsupported endpoint scheme '{}'",
                    other
                )));
            }
        }

        if url.host_str().is_none() {
            return Err(StorageError::configuration(format!(
                "endpoint '{}' has no host",
                self.url
            )));
        }

        Ok(url)
    }
}

/// Builds authenticated client handles.
#[async_trait]
pub trait ConnectionFactory: Send + Sync {
    async fn connect(
        &self,
        endpoint: &Endpoint,
        credentials: &Credentials,
    ) -> StorageResult<Arc<dyn ObjectStore>>;
}

/// Creates a fresh `aws_sdk_s3::Client` on every call; no handle is reused.
#[derive(Debug, Clone)]
pub struct S3ConnectionFactory {
    force_path_style: bool,
    part_size: usize,
}

impl Default for S3ConnectionFactory {
    fn default() -> Self {
        Self {
            force_path_style: true,
            part_size: crate::config::MIN_PART_SIZE,
        }
    }
}

impl S3ConnectionFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_path_style(mut self, force_path_style: bool) -> Self {
        self.force_path_style = force_path_style;
        self
    }

    pub fn with_part_size(mut self, part_size: usize) -> Self {
        self.part_size = part_size.max(crate::config::MIN_PART_SIZE);
        self
    }
}

#[async_trait]
impl ConnectionFactory for S3ConnectionFactory {
    async fn connect(
        &self,
        endpoint: &Endpoint,
        credentials: &Credentials,
    ) -> StorageResult<Arc<dyn ObjectStore>> {
        let url = endpoint.parsed_url()?;

        if endpoint.region.trim().is_empty() {
            return Err(StorageError::configuration("region must not be empty"));
        }
        if credentials.access_key.is_empty() {
            return Err(StorageError::configuration("access key must not be empty"));
        }

        let static_credentials = aws_sdk_s3::config::Credentials::new(
            &credentials.access_key,
            &credentials.secret_key,
            None,
            None,
            "static",
        );

        let s3_config = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(&endpoint.url)
            .region(Region::new(endpoint.region.clone()))
            .credentials_provider(static_credentials)
            .force_path_style(self.force_path_style)
            .build();

        debug!("Connected to {} ({})", endpoint.url, endpoint.region);

        let client = aws_sdk_s3::Client::from_conf(s3_config);
        Ok(Arc::new(S3ObjectStore::new(
            client,
            url,
            self.force_path_style,
            self.part_size,
        )))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ConnectionKey {
    endpoint: Endpoint,
    credentials: String,
}

/// Caches handles from another factory, keyed by endpoint, region and
/// credential fingerprint. Failed connections are not cached.
pub struct PooledConnectionFactory<F> {
    inner: F,
    handles: DashMap<ConnectionKey, Arc<dyn ObjectStore>>,
}

impl<F: ConnectionFactory> PooledConnectionFactory<F> {
    pub fn new(inner: F) -> Self {
        Self {
            inner,
            handles: DashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

#[async_trait]
impl<F: ConnectionFactory> ConnectionFactory for PooledConnectionFactory<F> {
    async fn connect(
        &self,
        endpoint: &Endpoint,
        credentials: &Credentials,
    ) -> StorageResult<Arc<dyn ObjectStore>> {
        let key = ConnectionKey {
            endpoint: endpoint.clone(),
            credentials: credentials.fingerprint(),
        };

        if let Some(handle) = self.handles.get(&key) {
            return Ok(handle.value().clone());
        }

        let handle = self.inner.connect(endpoint, credentials).await?;
        // A concurrent caller may have won the race; keep the first handle.
        Ok(self.handles.entry(key).or_insert(handle).value().clone())
    }
}
