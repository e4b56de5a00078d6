pub mod api;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod services;

use crate::config::UploadConfig;
use crate::services::batch::BatchUploader;
use crate::services::connection::{ConnectionFactory, Credentials, Endpoint};
use crate::services::deleter::ObjectDeleter;
use crate::services::uploader::ObjectUploader;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware::from_fn,
    routing::{delete, get, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use crate::error::{StorageError, StorageResult};

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::health::health_check,
        api::handlers::objects::upload_files,
        api::handlers::objects::delete_object,
    ),
    components(
        schemas(
            api::handlers::HealthResponse,
            api::handlers::BatchUploadResponse,
        )
    ),
    tags(
        (name = "objects", description = "Object upload and deletion"),
        (name = "system", description = "Service status")
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub batch: BatchUploader,
    pub deleter: ObjectDeleter,
    pub endpoint: Endpoint,
    pub credentials: Credentials,
    pub config: UploadConfig,
    pub max_request_size: usize,
}

impl AppState {
    pub fn new(
        connections: Arc<dyn ConnectionFactory>,
        endpoint: Endpoint,
        credentials: Credentials,
        config: UploadConfig,
        max_request_size: usize,
    ) -> Self {
        let uploader = ObjectUploader::new(connections.clone(), config.clone());
        Self {
            batch: BatchUploader::new(uploader),
            deleter: ObjectDeleter::new(connections),
            endpoint,
            credentials,
            config,
            max_request_size,
        }
    }
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(api::handlers::health_check))
        .route("/upload", post(api::handlers::upload_files))
        .route("/objects/*key", delete(api::handlers::delete_object))
        .layer(from_fn(api::middleware::request_id::request_id_middleware))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
                .expose_headers(Any),
        )
        .layer(DefaultBodyLimit::max(state.max_request_size))
        .with_state(state)
}
