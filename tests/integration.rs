use std::fs;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

use workspace_fs_server::middleware::{AccessGate, BearerTokenGate, OpenGate};
use workspace_fs_server::protocol::router;
use workspace_fs_server::storage::WorkspaceRoot;
use workspace_fs_server::transfer::UploadIngestor;
use workspace_fs_server::WorkspaceService;

const BOUNDARY: &str = "----workspace-test-boundary";

// Helper to build an app over a fresh temporary workspace
fn app_with(max_file_size: u64, gate: Arc<dyn AccessGate>) -> (TempDir, Router) {
    let dir = tempfile::tempdir().unwrap();
    let root = WorkspaceRoot::new(dir.path()).unwrap();
    let service = WorkspaceService::new(
        root,
        UploadIngestor::new(max_file_size),
        Duration::from_secs(10),
    );
    (dir, router(service, gate))
}

fn app() -> (TempDir, Router) {
    app_with(1024 * 1024, Arc::new(OpenGate))
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

// Helper to assemble a multipart/form-data body: (field, filename, bytes)
fn multipart_body(parts: &[(&str, Option<&str>, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (field, filename, data) in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match filename {
            Some(filename) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                        field, filename
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
            }
            None => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", field)
                        .as_bytes(),
                );
            }
        }
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

async fn post_multipart(app: &Router, parts: &[(&str, Option<&str>, &[u8])]) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri("/files/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap();
    send(app, request).await
}

#[tokio::test]
async fn test_health_probe() {
    let (_dir, app) = app();
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_mkdir_then_conflict() {
    let (dir, app) = app();

    let (status, body) = post_json(
        &app,
        "/files/mkdir",
        json!({"targetPath": "/", "directoryName": "x"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["path"], "/x");
    assert!(body["fullPath"].as_str().unwrap().ends_with("x"));
    assert!(dir.path().join("x").is_dir());

    let (status, body) = post_json(
        &app,
        "/files/mkdir",
        json!({"targetPath": "/", "directoryName": "x"}),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);
    assert_eq!(body["category"], "conflict");
    assert_eq!(body["existingPath"], "/x");
}

#[tokio::test]
async fn test_mkdir_failures() {
    let (_dir, app) = app();

    let (status, body) = post_json(
        &app,
        "/files/mkdir",
        json!({"targetPath": "no/such/parent", "directoryName": "x"}),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["category"], "not_found");

    let (status, body) = post_json(
        &app,
        "/files/mkdir",
        json!({"targetPath": "", "directoryName": "a/b"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["category"], "validation_error");

    let (status, _) = post_json(&app, "/files/mkdir", json!({"targetPath": ""})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let request = Request::builder()
        .method("POST")
        .uri("/files/mkdir")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["category"], "validation_error");
}

#[tokio::test]
async fn test_mkdir_traversal_stays_inside_workspace() {
    let (dir, app) = app();
    let (status, body) = post_json(
        &app,
        "/files/mkdir",
        json!({"targetPath": "../../../../tmp", "directoryName": "escape"}),
    )
    .await;
    // "tmp" does not exist inside the workspace, so the clamped parent is missing.
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["category"], "not_found");

    let (status, body) = post_json(
        &app,
        "/files/mkdir",
        json!({"targetPath": "..\\..\\", "directoryName": "inside"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["path"], "/inside");
    assert!(dir.path().join("inside").is_dir());
}

#[tokio::test]
async fn test_rename_then_not_found() {
    let (dir, app) = app();
    fs::write(dir.path().join("a"), b"payload").unwrap();

    let request = json!({"currentPath": "a", "newName": "b", "workspaceRoot": ""});
    let (status, body) = post_json(&app, "/files/rename", request.clone()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["oldPath"], "/a");
    assert_eq!(body["newPath"], "/b");
    assert_eq!(body["filename"], "b");
    assert_eq!(fs::read(dir.path().join("b")).unwrap(), b"payload");

    let (status, body) = post_json(&app, "/files/rename", request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["category"], "not_found");
}

#[tokio::test]
async fn test_rename_rejects_path_in_new_name() {
    let (dir, app) = app();
    fs::write(dir.path().join("a"), b"").unwrap();

    let (status, _) = post_json(
        &app,
        "/files/rename",
        json!({"currentPath": "a", "newName": "../b"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(dir.path().join("a").exists());
}

#[tokio::test]
async fn test_move_preserves_content() {
    let (dir, app) = app();
    let payload: Vec<u8> = (0..50_000u32).map(|i| (i * 31 % 251) as u8).collect();
    fs::write(dir.path().join("data.bin"), &payload).unwrap();

    let (status, body) = post_json(
        &app,
        "/files/move",
        json!({"sourcePath": "data.bin", "destinationPath": "archive", "workspaceRoot": null}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["oldPath"], "/data.bin");
    assert_eq!(body["newPath"], "/archive/data.bin");
    assert_eq!(body["filename"], "data.bin");
    assert_eq!(fs::read(dir.path().join("archive/data.bin")).unwrap(), payload);
}

#[tokio::test]
async fn test_move_to_itself_is_rejected() {
    let (dir, app) = app();

    let (status, body) = post_json(
        &app,
        "/files/move",
        json!({"sourcePath": "ghost", "destinationPath": "/ghost/"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["category"], "validation_error");

    fs::create_dir(dir.path().join("real")).unwrap();
    let (status, _) = post_json(
        &app,
        "/files/move",
        json!({"sourcePath": "real", "destinationPath": "real"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_move_conflict() {
    let (dir, app) = app();
    fs::write(dir.path().join("a.txt"), b"outer").unwrap();
    fs::create_dir(dir.path().join("dest")).unwrap();
    fs::write(dir.path().join("dest/a.txt"), b"inner").unwrap();

    let (status, body) = post_json(
        &app,
        "/files/move",
        json!({"sourcePath": "a.txt", "destinationPath": "dest"}),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["existingPath"], "/dest/a.txt");
    assert_eq!(fs::read(dir.path().join("dest/a.txt")).unwrap(), b"inner");
}

#[tokio::test]
async fn test_upload_partial_failure() {
    let (dir, app) = app_with(1024, Arc::new(OpenGate));
    let small = vec![b'a'; 10];
    let big = vec![b'b'; 4096];
    let tiny = vec![b'c'; 100];

    let (status, body) = post_multipart(
        &app,
        &[
            ("files", Some("fileA.txt"), &small),
            ("files", Some("fileB.bin"), &big),
            ("files", Some("fileC.txt"), &tiny),
            ("path", None, b"inbox/today"),
        ],
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["uploaded"], 2);
    assert_eq!(body["targetPath"], "/inbox/today");

    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["originalName"], "fileA.txt");
    assert_eq!(results[0]["size"], 10);
    assert_eq!(results[1]["originalName"], "fileC.txt");
    assert_ne!(results[0]["filename"], results[1]["filename"]);

    let errors = body["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0]["filename"], "fileB.bin");
    assert!(errors[0]["error"].as_str().unwrap().contains("maximum size"));

    let stored = fs::read_dir(dir.path().join("inbox/today")).unwrap().count();
    assert_eq!(stored, 2);
}

#[tokio::test]
async fn test_upload_requires_files() {
    let (_dir, app) = app();

    let (status, body) = post_multipart(&app, &[("path", None, b"somewhere")]).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["category"], "validation_error");

    let (status, _) = post_json(&app, "/files/upload", json!({"files": []})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_upload_below_a_file_is_rejected() {
    let (dir, app) = app();
    fs::write(dir.path().join("plain"), b"x").unwrap();

    let (status, body) = post_multipart(
        &app,
        &[("path", None, b"plain/sub"), ("files", Some("a.txt"), b"a")],
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["category"], "validation_error");
    assert_eq!(fs::read(dir.path().join("plain")).unwrap(), b"x");
}

#[tokio::test]
async fn test_upload_defaults_to_workspace_root() {
    let (dir, app) = app();
    let (status, body) = post_multipart(&app, &[("files", Some("note.md"), b"# hi")]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["targetPath"], "/");
    let stored = body["results"][0]["filename"].as_str().unwrap().to_string();
    assert!(stored.starts_with("note-") && stored.ends_with(".md"));
    assert_eq!(fs::read(dir.path().join(stored)).unwrap(), b"# hi");
}

#[tokio::test]
async fn test_authorization_gate() {
    let (_dir, app) = app_with(1024, Arc::new(BearerTokenGate::new("s3cret")));

    let (status, body) = post_json(
        &app,
        "/files/mkdir",
        json!({"targetPath": "", "directoryName": "x"}),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["category"], "unauthorized");

    let request = Request::builder()
        .method("POST")
        .uri("/files/mkdir")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, "Bearer s3cret")
        .body(Body::from(json!({"targetPath": "", "directoryName": "x"}).to_string()))
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);

    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
}
