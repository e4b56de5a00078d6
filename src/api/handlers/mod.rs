pub mod health;
pub mod objects;

pub use health::{HealthResponse, health_check};
pub use objects::{BatchUploadResponse, DeleteObjectQuery, delete_object, upload_files};
