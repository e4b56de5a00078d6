use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, warn};
use url::Url;

use crate::error::{StorageError, StorageResult};

/// Operations a connected client handle exposes.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Stores the full contents of `body` under `bucket/key` and returns the
    /// object's public location.
    async fn put_object<'a>(
        &self,
        bucket: &str,
        key: &str,
        content_type: Option<&str>,
        body: Box<dyn AsyncRead + Unpin + Send + 'a>,
    ) -> StorageResult<String>;

    async fn delete_object(&self, bucket: &str, key: &str) -> StorageResult<()>;
}

/// Characters left as-is in object key segments (RFC 3986 unreserved).
const KEY_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Public URL of `bucket/key` on `endpoint`.
///
/// Virtual-hosted addressing falls back to path style for buckets that are
/// not a single DNS label over https, since the wildcard certificate would
/// not match.
pub fn object_location(endpoint: &Url, bucket: &str, key: &str, force_path_style: bool) -> String {
    let encoded_key = key
        .split('/')
        .map(|segment| utf8_percent_encode(segment, KEY_SEGMENT).to_string())
        .collect::<Vec<_>>()
        .join("/");

    let path_style = force_path_style
        || bucket.is_empty()
        || (bucket.contains('.') && endpoint.scheme() == "https");

    if !path_style {
        if let Some(host) = endpoint.host_str() {
            let mut virtual_host = endpoint.clone();
            if virtual_host
                .set_host(Some(&format!("{}.{}", bucket, host)))
                .is_ok()
            {
                return format!(
                    "{}/{}",
                    virtual_host.as_str().trim_end_matches('/'),
                    encoded_key
                );
            }
        }
    }

    format!(
        "{}/{}/{}",
        endpoint.as_str().trim_end_matches('/'),
        bucket,
        encoded_key
    )
}

/// Reads from `reader` until `buffer` is full or the stream ends.
async fn fill_buffer<R>(reader: &mut R, buffer: &mut [u8]) -> std::io::Result<usize>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut n = 0;
    while n < buffer.len() {
        let read = reader.read(&mut buffer[n..]).await?;
        if read == 0 {
            break;
        }
        n += read;
    }
    Ok(n)
}

/// `ObjectStore` backed by the AWS S3 SDK. Bodies of at most `part_size`
/// bytes go up in a single put, longer ones through a multipart upload in
/// `part_size` chunks.
pub struct S3ObjectStore {
    client: Client,
    endpoint: Url,
    force_path_style: bool,
    part_size: usize,
}

impl S3ObjectStore {
    pub fn new(client: Client, endpoint: Url, force_path_style: bool, part_size: usize) -> Self {
        Self {
            client,
            endpoint,
            force_path_style,
            part_size,
        }
    }

    fn location(&self, bucket: &str, key: &str) -> String {
        object_location(&self.endpoint, bucket, key, self.force_path_style)
    }

    /// Uploads `buffer` and the rest of `reader` as numbered parts.
    ///
    /// `buffer` holds `part_size + 1` bytes already read; the byte past each
    /// full part is carried into the next one, so the last part is never
    /// empty.
    async fn upload_parts<'a>(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        mut buffer: Vec<u8>,
        mut reader: Box<dyn AsyncRead + Unpin + Send + 'a>,
    ) -> StorageResult<Vec<CompletedPart>> {
        let mut completed_parts = Vec::new();
        let mut part_number = 1;
        let mut n = buffer.len();

        loop {
            let len = n.min(self.part_size);
            debug!("Uploading part {} ({} bytes) of {}", part_number, len, key);

            let res = self
                .client
                .upload_part()
                .bucket(bucket)
                .key(key)
                .upload_id(upload_id)
                .part_number(part_number)
                .body(ByteStream::from(buffer[..len].to_vec()))
                .send()
                .await
                .map_err(|e| StorageError::from_sdk("upload part failed", e))?;

            completed_parts.push(
                CompletedPart::builder()
                    .e_tag(res.e_tag().unwrap_or_default())
                    .part_number(part_number)
                    .build(),
            );

            if n <= self.part_size {
                break;
            }

            let carried = n - len;
            buffer.copy_within(len..n, 0);
            n = carried + fill_buffer(&mut reader, &mut buffer[carried..]).await?;
            part_number += 1;
        }

        Ok(completed_parts)
    }

    async fn abort(&self, bucket: &str, key: &str, upload_id: &str) {
        if let Err(e) = self
            .client
            .abort_multipart_upload()
            .bucket(bucket)
            .key(key)
            .upload_id(upload_id)
            .send()
            .await
        {
            warn!(
                "Failed to abort multipart upload {} for {}/{}: {}",
                upload_id,
                bucket,
                key,
                aws_sdk_s3::error::DisplayErrorContext(e)
            );
        }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put_object<'a>(
        &self,
        bucket: &str,
        key: &str,
        content_type: Option<&str>,
        mut body: Box<dyn AsyncRead + Unpin + Send + 'a>,
    ) -> StorageResult<String> {
        // One byte past a part tells a body of exactly `part_size` apart
        // from a longer one.
        let mut buffer = vec![0u8; self.part_size + 1];
        let n = fill_buffer(&mut body, &mut buffer).await?;

        if n <= self.part_size {
            buffer.truncate(n);
            self.client
                .put_object()
                .bucket(bucket)
                .key(key)
                .set_content_type(content_type.map(str::to_string))
                .body(ByteStream::from(buffer))
                .send()
                .await
                .map_err(|e| StorageError::from_sdk("put object failed", e))?;

            return Ok(self.location(bucket, key));
        }

        let created = self
            .client
            .create_multipart_upload()
            .bucket(bucket)
            .key(key)
            .set_content_type(content_type.map(str::to_string))
            .send()
            .await
            .map_err(|e| StorageError::from_sdk("create multipart upload failed", e))?;

        let upload_id = created
            .upload_id()
            .ok_or_else(|| StorageError::storage("no upload id returned"))?
            .to_string();

        let parts = match self.upload_parts(bucket, key, &upload_id, buffer, body).await {
            Ok(parts) => parts,
            Err(e) => {
                self.abort(bucket, key, &upload_id).await;
                return Err(e);
            }
        };

        let completed = self
            .client
            .complete_multipart_upload()
            .bucket(bucket)
            .key(key)
            .upload_id(&upload_id)
            .multipart_upload(
                CompletedMultipartUpload::builder()
                    .set_parts(Some(parts))
                    .build(),
            )
            .send()
            .await;

        match completed {
            Ok(output) => Ok(output
                .location()
                .map(str::to_string)
                .unwrap_or_else(|| self.location(bucket, key))),
            Err(e) => {
                self.abort(bucket, key, &upload_id).await;
                Err(StorageError::from_sdk("complete multipart upload failed", e))
            }
        }
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> StorageResult<()> {
        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| StorageError::from_sdk("delete object failed", e))?;
        Ok(())
    }
}
