use std::collections::HashMap;
use std::io::Cursor;

use axum::extract::{FromRequest, Multipart, Request};
use bytes::{Bytes, BytesMut};
use tempfile::TempPath;
use tokio::io::{AsyncRead, AsyncWriteExt};
use tracing::debug;

use crate::error::{StorageError, StorageResult};

enum FileContent {
    Memory(Bytes),
    Disk(TempPath),
}

/// A file part of a parsed multipart form.
///
/// Spooled parts live in a temporary file that is removed when the header
/// is dropped.
pub struct FileHeader {
    file_name: String,
    content_type: Option<String>,
    size: u64,
    content: FileContent,
}

impl FileHeader {
    pub fn in_memory(
        file_name: impl Into<String>,
        content_type: Option<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        let data = data.into();
        Self {
            file_name: file_name.into(),
            content_type,
            size: data.len() as u64,
            content: FileContent::Memory(data),
        }
    }

    pub fn on_disk(
        file_name: impl Into<String>,
        content_type: Option<String>,
        size: u64,
        path: TempPath,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type,
            size,
            content: FileContent::Disk(path),
        }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn is_spooled(&self) -> bool {
        matches!(self.content, FileContent::Disk(_))
    }

    /// Opens a new stream over the file's contents. The stream is closed
    /// when the returned reader is dropped.
    pub async fn open(&self) -> std::io::Result<Box<dyn AsyncRead + Unpin + Send>> {
        match &self.content {
            FileContent::Memory(data) => Ok(Box::new(Cursor::new(data.clone()))),
            FileContent::Disk(path) => {
                let file = tokio::fs::File::open(path).await?;
                Ok(Box::new(file))
            }
        }
    }
}

impl std::fmt::Debug for FileHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileHeader")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("size", &self.size)
            .field("spooled", &self.is_spooled())
            .finish()
    }
}

/// A fully parsed `multipart/form-data` body.
#[derive(Debug, Default)]
pub struct MultipartForm {
    values: HashMap<String, Vec<String>>,
    files: HashMap<String, Vec<FileHeader>>,
}

impl MultipartForm {
    /// Extracts and parses the multipart body of `req`.
    ///
    /// File parts are kept in memory while the form's total stays within
    /// `max_memory`; anything beyond spills to temporary files.
    pub async fn from_request(req: Request, max_memory: usize) -> StorageResult<Self> {
        let multipart = Multipart::from_request(req, &())
            .await
            .map_err(|e| StorageError::request_parse(e.body_text()))?;

        Self::parse(multipart, max_memory).await
    }

    pub async fn parse(mut multipart: Multipart, max_memory: usize) -> StorageResult<Self> {
        let mut form = Self::default();
        let mut memory_used = 0usize;

        while let Some(mut field) = multipart
            .next_field()
            .await
            .map_err(|e| StorageError::request_parse(e.body_text()))?
        {
            let name = field.name().unwrap_or_default().to_string();

            // An empty filename is what browsers send for a file input with
            // nothing selected; it is kept as a text value.
            let Some(file_name) = field
                .file_name()
                .filter(|n| !n.is_empty())
                .map(str::to_string)
            else {
                let text = field
                    .text()
                    .await
                    .map_err(|e| StorageError::request_parse(e.body_text()))?;
                form.values.entry(name).or_default().push(text);
                continue;
            };
            let content_type = field.content_type().map(str::to_string);

            let mut buffer = BytesMut::new();
            let mut spool: Option<(TempPath, tokio::fs::File)> = None;
            let mut size = 0u64;

            while let Some(chunk) = field
                .chunk()
                .await
                .map_err(|e| StorageError::request_parse(e.body_text()))?
            {
                size += chunk.len() as u64;

                if let Some((_, file)) = spool.as_mut() {
                    file.write_all(&chunk).await?;
                    continue;
                }

                if memory_used + buffer.len() + chunk.len() > max_memory {
                    let path = tempfile::NamedTempFile::new()?.into_temp_path();
                    let mut file = tokio::fs::File::create(&path).await?;
                    file.write_all(&buffer).await?;
                    file.write_all(&chunk).await?;
                    debug!("Spooling form file '{}' to {}", file_name, path.display());
                    buffer.clear();
                    spool = Some((path, file));
                } else {
                    buffer.extend_from_slice(&chunk);
                }
            }

            let header = match spool {
                Some((path, mut file)) => {
                    file.flush().await?;
                    FileHeader::on_disk(file_name, content_type, size, path)
                }
                None => {
                    memory_used += buffer.len();
                    FileHeader::in_memory(file_name, content_type, buffer.freeze())
                }
            };

            form.files.entry(name).or_default().push(header);
        }

        Ok(form)
    }

    /// File parts submitted under `field`, in submission order.
    pub fn files(&self, field: &str) -> &[FileHeader] {
        self.files.get(field).map(Vec::as_slice).unwrap_or_default()
    }

    /// Text values submitted under `field`, in submission order.
    pub fn values(&self, field: &str) -> &[String] {
        self.values.get(field).map(Vec::as_slice).unwrap_or_default()
    }
}
