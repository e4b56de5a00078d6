mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use common::*;
use http_body_util::BodyExt;
use serde_json::Value;
use spaces_uploader::config::UploadConfig;
use spaces_uploader::{AppState, create_app};
use std::sync::Arc;
use tower::ServiceExt;

fn app(connections: &Arc<MockConnections>) -> axum::Router {
    let state = AppState::new(
        connections.clone(),
        endpoint(),
        credentials(),
        UploadConfig::default(),
        10 * 1024 * 1024,
    );
    create_app(state)
}

async fn json_body(response: axum::response::Response) -> Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_upload_endpoint_returns_locations() {
    let connections = MockConnections::new();
    let app = app(&connections);

    let body = multipart_body(&[
        file_part("files", "cat", "meow"),
        file_part("files", "dog", "woof"),
    ]);

    let response = app.oneshot(upload_request(body)).await.unwrap();

    let status = response.status();
    let json = json_body(response).await;
    if status != StatusCode::OK {
        panic!("Upload failed with status {}: {}", status, json);
    }

    assert_eq!(
        json["locations"],
        serde_json::json!([
            "https://nyc3.digitaloceanspaces.com/my.posts/cat.jpg",
            "https://nyc3.digitaloceanspaces.com/my.posts/dog.jpg",
        ])
    );
}

#[tokio::test]
async fn test_upload_endpoint_rejects_empty_form() {
    let connections = MockConnections::new();
    let app = app(&connections);

    let body = multipart_body(&[text_part("caption", "no files here")]);
    let response = app.oneshot(upload_request(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert!(json["error"].as_str().unwrap().contains("files"));
}

#[tokio::test]
async fn test_upload_endpoint_rejects_non_multipart() {
    let connections = MockConnections::new();
    let app = app(&connections);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/upload")
                .header("Content-Type", "application/json")
                .body(Body::from(r#"{"files": []}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(connections.store.puts().is_empty());
}

#[tokio::test]
async fn test_upload_endpoint_maps_storage_failure() {
    let connections = MockConnections::new();
    connections.store.fail_put_on("cat.jpg");
    let app = app(&connections);

    let body = multipart_body(&[file_part("files", "cat", "meow")]);
    let response = app.oneshot(upload_request(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let json = json_body(response).await;
    // Internal details stay in the logs
    assert_eq!(json["error"], "Storage service error");
}

#[tokio::test]
async fn test_delete_endpoint() {
    let connections = MockConnections::new();
    let app = app(&connections);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/objects/holiday/cat.jpg")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(connections.store.deletes(), vec!["holiday/cat.jpg"]);

    let response = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/objects/cat.jpg?bucket=")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_health_and_request_id() {
    let connections = MockConnections::new();
    let app = app(&connections);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("x-request-id", "req-42")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-request-id"], "req-42");
    let json = json_body(response).await;
    assert_eq!(json["status"], "ok");
}
