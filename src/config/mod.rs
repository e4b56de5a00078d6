use std::env;
use std::net::SocketAddr;

use crate::error::{StorageError, StorageResult};
use crate::services::connection::{Credentials, Endpoint};

/// Default bucket that uploads land in.
pub const DEFAULT_BUCKET_NAME: &str = "my.posts";

/// Suffix appended to every uploaded file name to form its object key.
pub const DEFAULT_KEY_SUFFIX: &str = ".jpg";

/// Multipart form field that carries the files of a batch upload.
pub const DEFAULT_FILES_FIELD: &str = "files";

/// Options that shape object keys and upload behavior.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadConfig {
    /// Target bucket (default: "my.posts")
    pub bucket_name: String,

    /// Appended to the original file name (default: ".jpg")
    pub key_suffix: String,

    /// Form field holding the files (default: "files")
    pub files_field: String,

    /// In-memory budget for parsed form files in bytes (default: 32 MiB).
    /// Parts beyond it spill to temporary files.
    pub max_memory: usize,
}

/// S3 rejects multipart parts smaller than this, except the last one.
pub const MIN_PART_SIZE: usize = 5 * 1024 * 1024;

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            bucket_name: DEFAULT_BUCKET_NAME.to_string(),
            key_suffix: DEFAULT_KEY_SUFFIX.to_string(),
            files_field: DEFAULT_FILES_FIELD.to_string(),
            max_memory: 32 * 1024 * 1024,
        }
    }
}

impl UploadConfig {
    /// Object key for an uploaded file name.
    pub fn object_key(&self, file_name: &str) -> String {
        format!("{}{}", file_name, self.key_suffix)
    }

    pub fn with_bucket(mut self, bucket_name: impl Into<String>) -> Self {
        self.bucket_name = bucket_name.into();
        self
    }

    pub fn with_key_suffix(mut self, key_suffix: impl Into<String>) -> Self {
        self.key_suffix = key_suffix.into();
        self
    }

    pub fn with_max_memory(mut self, max_memory: usize) -> Self {
        self.max_memory = max_memory;
        self
    }

    /// Load overrides from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            bucket_name: env::var("SPACES_BUCKET").unwrap_or(default.bucket_name),

            key_suffix: env::var("SPACES_KEY_SUFFIX").unwrap_or(default.key_suffix),

            files_field: env::var("SPACES_FILES_FIELD").unwrap_or(default.files_field),

            max_memory: env::var("MAX_MEMORY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_memory),
        }
    }
}

/// Process configuration for the HTTP server binary.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub endpoint: Endpoint,
    pub credentials: Credentials,
    pub upload: UploadConfig,

    /// Part size of the managed uploader in bytes, at least 5 MiB
    /// (default: 5 MiB). Bodies up to this size go up in a single put.
    pub part_size: usize,

    /// Address buckets as `<endpoint>/<bucket>` rather than
    /// `<bucket>.<endpoint>` (default: true)
    pub force_path_style: bool,

    /// Maximum accepted request body in bytes (default: 256 MB)
    pub max_request_size: usize,

    /// Reuse client handles across requests (default: false)
    pub pool_connections: bool,

    /// Listen address (default: 127.0.0.1:3000)
    pub bind_addr: SocketAddr,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> StorageResult<Self> {
        let endpoint = Endpoint::new(required("SPACES_ENDPOINT")?, required("SPACES_REGION")?);
        let credentials =
            Credentials::new(required("SPACES_ACCESS_KEY")?, required("SPACES_SECRET_KEY")?);

        let bind_addr = match env::var("BIND_ADDR") {
            Ok(v) => v
                .parse()
                .map_err(|e| StorageError::configuration(format!("BIND_ADDR '{}': {}", v, e)))?,
            Err(_) => SocketAddr::from(([127, 0, 0, 1], 3000)),
        };

        Ok(Self {
            endpoint,
            credentials,
            upload: UploadConfig::from_env(),
            part_size: env::var("SPACES_PART_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(|v: usize| v.max(MIN_PART_SIZE))
                .unwrap_or(MIN_PART_SIZE),
            force_path_style: env::var("SPACES_FORCE_PATH_STYLE")
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(true),
            max_request_size: env::var("MAX_REQUEST_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(256 * 1024 * 1024),
            pool_connections: env::var("POOL_CONNECTIONS")
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(false),
            bind_addr,
        })
    }
}

fn required(name: &str) -> StorageResult<String> {
    env::var(name).map_err(|_| StorageError::configuration(format!("{} must be set", name)))
}
