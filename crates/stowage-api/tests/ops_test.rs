//! End-to-end tests for the operator reconciliation endpoints.

mod helpers;

use axum::http::StatusCode;
use bytes::Bytes;
use helpers::{body_json, test_app, ADMIN_SECRET};
use stowage_storage::ContentStorage;

#[tokio::test]
async fn test_ops_require_admin_secret() {
    let app = test_app();

    let response = app.post_ops("/v1/ops/list-orphans", None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app.post_ops("/v1/ops/list-orphans", Some("wrong")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_list_and_delete_orphans() {
    let app = test_app();
    app.seed_file("a", "a.txt", "text/plain", b"accounted").await;
    // content with no metadata row
    app.storage
        .put("stray", "text/plain", Bytes::from_static(b"stray"))
        .await
        .unwrap();

    let response = app
        .post_ops("/v1/ops/list-orphans", Some(ADMIN_SECRET))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["files"], serde_json::json!(["stray"]));

    let response = app
        .post_ops("/v1/ops/delete-orphans", Some(ADMIN_SECRET))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["files"], serde_json::json!(["stray"]));

    assert_eq!(app.storage.list_ids().await.unwrap(), vec!["a"]);
}

#[tokio::test]
async fn test_pending_upload_content_is_not_an_orphan() {
    let app = test_app();
    let mut file = app.seed_file("b", "b.txt", "text/plain", b"pending").await;
    file.is_uploaded = false;
    app.metadata.insert_file(file).await;

    let response = app
        .post_ops("/v1/ops/list-orphans", Some(ADMIN_SECRET))
        .await;
    let json = body_json(response).await;
    assert_eq!(json["files"], serde_json::json!([]));
}

#[tokio::test]
async fn test_list_and_delete_broken_metadata() {
    let app = test_app();
    let mut ghost = app.seed_file("ghost", "g.txt", "text/plain", b"gone").await;
    // drop the bytes but keep the uploaded row
    app.storage.delete("ghost").await.unwrap();
    ghost.is_uploaded = true;
    app.metadata.insert_file(ghost).await;

    let response = app
        .post_ops("/v1/ops/list-broken-metadata", Some(ADMIN_SECRET))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["metadata"][0]["id"], "ghost");

    let response = app
        .post_ops("/v1/ops/delete-broken-metadata", Some(ADMIN_SECRET))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    // the row is gone from the read path too
    let response = app.get("/v1/files/ghost").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_not_uploaded() {
    let app = test_app();
    app.seed_file("done", "d.txt", "text/plain", b"done").await;
    let mut pending = app.seed_file("wip", "w.txt", "text/plain", b"wip").await;
    pending.is_uploaded = false;
    app.metadata.insert_file(pending).await;

    let response = app
        .post_ops("/v1/ops/list-not-uploaded", Some(ADMIN_SECRET))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["metadata"].as_array().unwrap().len(), 1);
    assert_eq!(json["metadata"][0]["id"], "wip");
    assert_eq!(json["metadata"][0]["isUploaded"], false);
}
