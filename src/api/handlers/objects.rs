use axum::{
    Json,
    extract::{Path, Query, Request, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::AppState;
use crate::api::error::AppError;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BatchUploadResponse {
    /// Object locations, one per uploaded file, in submission order
    pub locations: Vec<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DeleteObjectQuery {
    /// Bucket holding the object; defaults to the configured bucket
    pub bucket: Option<String>,
}

#[utoipa::path(
    post,
    path = "/upload",
    request_body(
        content = String,
        content_type = "multipart/form-data",
        description = "One or more file parts in the `files` field"
    ),
    responses(
        (status = 200, description = "Files uploaded successfully", body = BatchUploadResponse),
        (status = 400, description = "Malformed form or no files"),
        (status = 502, description = "Storage service rejected an upload")
    ),
    tag = "objects"
)]
pub async fn upload_files(
    State(state): State<AppState>,
    req: Request,
) -> Result<Json<BatchUploadResponse>, AppError> {
    let locations = state
        .batch
        .upload_all(req, &state.endpoint, &state.credentials)
        .await?;

    Ok(Json(BatchUploadResponse { locations }))
}

#[utoipa::path(
    delete,
    path = "/objects/{key}",
    params(
        ("key" = String, Path, description = "Object key"),
        DeleteObjectQuery
    ),
    responses(
        (status = 204, description = "Object deleted"),
        (status = 400, description = "Empty bucket or key"),
        (status = 502, description = "Storage service rejected the delete")
    ),
    tag = "objects"
)]
pub async fn delete_object(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(query): Query<DeleteObjectQuery>,
) -> Result<StatusCode, AppError> {
    let bucket = query
        .bucket
        .unwrap_or_else(|| state.config.bucket_name.clone());

    state
        .deleter
        .delete(&state.endpoint, &state.credentials, &bucket, &key)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
