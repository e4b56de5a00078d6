use axum::extract::Request;
use tracing::info;

use crate::error::{StorageError, StorageResult};
use crate::services::connection::{Credentials, Endpoint};
use crate::services::form::{FileHeader, MultipartForm};
use crate::services::uploader::ObjectUploader;

/// Uploads every file of a multipart request, one after another.
#[derive(Clone)]
pub struct BatchUploader {
    uploader: ObjectUploader,
}

impl BatchUploader {
    pub fn new(uploader: ObjectUploader) -> Self {
        Self { uploader }
    }

    /// Parses `req` and uploads the files of the configured field.
    ///
    /// Returns one location per file in submission order. The first failed
    /// file aborts the batch; files after it are not attempted.
    pub async fn upload_all(
        &self,
        req: Request,
        endpoint: &Endpoint,
        credentials: &Credentials,
    ) -> StorageResult<Vec<String>> {
        let config = self.uploader.config();
        let form = MultipartForm::from_request(req, config.max_memory).await?;

        // Spooled temp files of `form` are removed when it drops at return.
        self.upload_files(form.files(&config.files_field), endpoint, credentials)
            .await
    }

    pub async fn upload_files(
        &self,
        files: &[FileHeader],
        endpoint: &Endpoint,
        credentials: &Credentials,
    ) -> StorageResult<Vec<String>> {
        if files.is_empty() {
            return Err(StorageError::NoFiles(
                self.uploader.config().files_field.clone(),
            ));
        }

        let mut locations = Vec::with_capacity(files.len());
        for file in files {
            let uploaded = self.uploader.upload(endpoint, credentials, file).await?;
            locations.push(uploaded.location);
        }

        info!("{} files uploaded successfully", locations.len());
        Ok(locations)
    }
}
