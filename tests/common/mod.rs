#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::extract::Request;
use spaces_uploader::StorageError;
use spaces_uploader::StorageResult;
use spaces_uploader::services::connection::{ConnectionFactory, Credentials, Endpoint};
use spaces_uploader::services::object_store::{ObjectStore, object_location};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncRead, AsyncReadExt};

pub const ENDPOINT: &str = "https://nyc3.digitaloceanspaces.com";
pub const BOUNDARY: &str = "---------------------------123456789012345678901234567";

pub fn endpoint() -> Endpoint {
    Endpoint::new(ENDPOINT, "nyc3")
}

pub fn credentials() -> Credentials {
    Credentials::new("DO00TESTKEY", "test-secret")
}

/// In-memory object store that records every call.
#[derive(Default)]
pub struct MemoryStore {
    objects: Mutex<HashMap<(String, String), Vec<u8>>>,
    content_types: Mutex<HashMap<String, Option<String>>>,
    puts: Mutex<Vec<String>>,
    deletes: Mutex<Vec<String>>,
    fail_put_on: Mutex<Option<String>>,
    fail_deletes: AtomicBool,
}

impl MemoryStore {
    pub fn fail_put_on(&self, key: &str) {
        *self.fail_put_on.lock().unwrap() = Some(key.to_string());
    }

    pub fn fail_deletes(&self) {
        self.fail_deletes.store(true, Ordering::SeqCst);
    }

    /// Keys of every attempted put, in call order.
    pub fn puts(&self) -> Vec<String> {
        self.puts.lock().unwrap().clone()
    }

    pub fn deletes(&self) -> Vec<String> {
        self.deletes.lock().unwrap().clone()
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.objects
            .lock()
            .unwrap()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    pub fn content_type(&self, key: &str) -> Option<String> {
        self.content_types.lock().unwrap().get(key).cloned().flatten()
    }

    pub fn object_count(&self) -> usize {
        self.objects.lock().unwrap().len()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn put_object<'a>(
        &self,
        bucket: &str,
        key: &str,
        content_type: Option<&str>,
        mut body: Box<dyn AsyncRead + Unpin + Send + 'a>,
    ) -> StorageResult<String> {
        self.puts.lock().unwrap().push(key.to_string());

        let mut data = Vec::new();
        body.read_to_end(&mut data).await?;

        if self.fail_put_on.lock().unwrap().as_deref() == Some(key) {
            return Err(StorageError::storage("injected put failure"));
        }

        self.objects
            .lock()
            .unwrap()
            .insert((bucket.to_string(), key.to_string()), data);
        self.content_types
            .lock()
            .unwrap()
            .insert(key.to_string(), content_type.map(str::to_string));

        let url = url::Url::parse(ENDPOINT).unwrap();
        Ok(object_location(&url, bucket, key, true))
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> StorageResult<()> {
        self.deletes.lock().unwrap().push(key.to_string());

        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(StorageError::storage("injected delete failure"));
        }

        // Missing keys are not an error, as with S3.
        self.objects
            .lock()
            .unwrap()
            .remove(&(bucket.to_string(), key.to_string()));
        Ok(())
    }
}

/// Hands out the shared `MemoryStore` and counts connections.
#[derive(Default)]
pub struct MockConnections {
    pub store: Arc<MemoryStore>,
    connects: AtomicUsize,
    fail: AtomicBool,
}

impl MockConnections {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_connect(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConnectionFactory for MockConnections {
    async fn connect(
        &self,
        _endpoint: &Endpoint,
        _credentials: &Credentials,
    ) -> StorageResult<Arc<dyn ObjectStore>> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(StorageError::configuration("injected session failure"));
        }
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(self.store.clone())
    }
}

pub fn file_part(field: &str, filename: &str, content: &str) -> String {
    format!(
        "--{BOUNDARY}\r\n\
        Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n\
        Content-Type: image/jpeg\r\n\r\n\
        {content}\r\n"
    )
}

pub fn text_part(field: &str, value: &str) -> String {
    format!(
        "--{BOUNDARY}\r\n\
        Content-Disposition: form-data; name=\"{field}\"\r\n\r\n\
        {value}\r\n"
    )
}

/// Multipart body from pre-rendered parts.
pub fn multipart_body(parts: &[String]) -> String {
    format!("{}--{BOUNDARY}--\r\n", parts.concat())
}

pub fn upload_request(body: String) -> Request {
    axum::http::Request::builder()
        .method("POST")
        .uri("/upload")
        .header(
            "Content-Type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}
