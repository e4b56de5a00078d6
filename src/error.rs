use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors returned by the upload/delete layer.
///
/// Variants name the failure kind only; mapping to HTTP semantics is the
/// request handler's job (see `api::error::AppError`).
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Malformed multipart request: {0}")]
    RequestParse(String),

    #[error("No files provided in field '{0}'")]
    NoFiles(String),

    #[error("Invalid key: {0}")]
    InvalidKey(String),
}

impl StorageError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    pub fn request_parse(msg: impl Into<String>) -> Self {
        Self::RequestParse(msg.into())
    }

    pub fn invalid_key(msg: impl Into<String>) -> Self {
        Self::InvalidKey(msg.into())
    }

    /// Wraps an SDK error, keeping the full source chain in the message.
    pub(crate) fn from_sdk<E>(context: &str, err: E) -> Self
    where
        E: std::error::Error,
    {
        Self::Storage(format!(
            "{}: {}",
            context,
            aws_sdk_s3::error::DisplayErrorContext(err)
        ))
    }
}
