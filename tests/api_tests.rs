use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use bitswap_depot::api::create_router;
use bitswap_depot::config::{Config, IndexBackend, NodeConfig, StorageConfig};
use bitswap_depot::content_store::LocalStore;
use bitswap_depot::storage::open_index;
use bitswap_depot::AppState;

const BOUNDARY: &str = "depot-test-boundary";

fn test_app(dir: &TempDir, allow_deactivate: bool) -> Router {
    let data_dir = dir.path().join("data");
    let content_dir = dir.path().join("uploads");

    let config = Config {
        node: NodeConfig {
            bind_address: "127.0.0.1:0".to_string(),
            data_dir: data_dir.to_string_lossy().to_string(),
        },
        storage: StorageConfig {
            index_backend: IndexBackend::Sqlite,
            content_dir: content_dir.to_string_lossy().to_string(),
        },
        public_base_url: Some("http://depot.test".to_string()),
        allow_deactivate,
        max_upload_size: 1024,
    };

    let index = open_index(IndexBackend::Sqlite, &data_dir).unwrap();
    let content = LocalStore::new(&content_dir);

    create_router(Arc::new(AppState {
        config,
        index,
        content: Arc::new(content),
    }))
}

fn multipart_body(file_name: &str, data: &[u8], fields: &[(&str, &str)]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n\
             Content-Type: text/plain\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn upload_request(
    file_name: &str,
    data: &[u8],
    fields: &[(&str, &str)],
    from: &str,
) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/ingest")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .header("x-forwarded-for", from)
        .body(Body::from(multipart_body(file_name, data, fields)))
        .unwrap()
}

fn get(uri: &str, from: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("x-forwarded-for", from)
        .body(Body::empty())
        .unwrap()
}

fn describe_req(hash: &str, from: &str) -> Request<Body> {
    get(&format!("/retrieve?hash={hash}&info=1"), from)
}

fn download_req(hash: &str, from: &str) -> Request<Body> {
    get(&format!("/retrieve?hash={hash}"), from)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, HeaderMap, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, headers, body.to_vec())
}

async fn send_json(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let (status, _, body) = send(app, request).await;
    (status, serde_json::from_slice(&body).unwrap())
}

async fn upload(app: &Router, file_name: &str, data: &[u8], from: &str) -> Value {
    let (status, body) = send_json(app, upload_request(file_name, data, &[], from)).await;
    assert_eq!(status, StatusCode::OK, "upload failed: {body}");
    body
}

#[tokio::test]
async fn test_upload_then_download() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(&dir, false);

    let uploaded = upload(&app, "hello.txt", b"hello-bws\n", "10.0.0.1").await;
    assert_eq!(uploaded["success"], true);
    assert_eq!(uploaded["message"], "File uploaded successfully");
    assert_eq!(uploaded["size"], 10);
    assert!(uploaded.get("existing").is_none());

    let hash = uploaded["hash"].as_str().unwrap().to_string();
    assert_eq!(hash.len(), 64);
    assert!(hash.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    assert_eq!(uploaded["retrievalUri"], format!("/retrieve?hash={hash}"));
    assert_eq!(
        uploaded["magnetUri"],
        format!("magnet:?xt=urn:sha256:{hash}&dn=hello.txt&xl=10")
    );
    assert_eq!(
        uploaded["shareUri"],
        format!("http://depot.test/retrieve?hash={hash}")
    );

    let (status, info) = send_json(&app, describe_req(&hash, "10.0.0.2")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(info["file"]["downloadCount"], 0);
    assert_eq!(info["file"]["peerCount"], 1);

    let (status, headers, body) = send(&app, download_req(&hash, "10.0.0.2")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"hello-bws\n");
    assert_eq!(headers[header::CONTENT_LENGTH], "10");
    assert_eq!(headers[header::CONTENT_TYPE], "text/plain");
    assert_eq!(
        headers[header::CONTENT_DISPOSITION],
        "attachment; filename=\"hello.txt\""
    );
    assert_eq!(
        headers[header::CACHE_CONTROL],
        "no-cache, no-store, must-revalidate"
    );
    assert_eq!(headers[header::PRAGMA], "no-cache");
    assert_eq!(headers[header::EXPIRES], "0");

    let (_, info) = send_json(&app, describe_req(&hash, "10.0.0.2")).await;
    assert_eq!(info["file"]["downloadCount"], 1);
    assert_eq!(info["file"]["peerCount"], 2);
}

#[tokio::test]
async fn test_download_by_uploader_keeps_one_peer() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(&dir, false);

    let uploaded = upload(&app, "hello.txt", b"hello-bws\n", "10.0.0.1").await;
    let hash = uploaded["hash"].as_str().unwrap();

    let (status, _, _) = send(&app, download_req(&hash, "10.0.0.1")).await;
    assert_eq!(status, StatusCode::OK);

    let (_, info) = send_json(&app, describe_req(&hash, "10.0.0.1")).await;
    assert_eq!(info["file"]["downloadCount"], 1);
    assert_eq!(info["file"]["peerCount"], 1);
}

#[tokio::test]
async fn test_duplicate_upload_reports_existing() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(&dir, false);

    let first = upload(&app, "a.txt", b"same bytes", "10.0.0.1").await;
    let second = upload(&app, "b.txt", b"same bytes", "10.0.0.9").await;

    assert_eq!(first["hash"], second["hash"]);
    assert_eq!(second["existing"], true);
    assert_eq!(second["message"], "File already exists");
    // The stored record keeps its first name
    assert_eq!(second["name"], "a.txt");

    let (_, list) = send_json(&app, get("/catalog", "10.0.0.1")).await;
    assert_eq!(list["total"], 1);
    assert_eq!(list["files"][0]["peerCount"], 1);
}

#[tokio::test]
async fn test_upload_with_metadata() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(&dir, false);

    let request = upload_request(
        "notes.md",
        b"# notes",
        &[("description", "Meeting notes"), ("tags", "work, notes,,")],
        "10.0.0.1",
    );
    let (status, uploaded) = send_json(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    let hash = uploaded["hash"].as_str().unwrap();

    let (_, info) = send_json(&app, describe_req(&hash, "10.0.0.1")).await;
    assert_eq!(info["file"]["description"], "Meeting notes");
    assert_eq!(info["file"]["tags"], serde_json::json!(["work", "notes"]));
}

#[tokio::test]
async fn test_upload_without_file_field() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(&dir, false);

    let body = format!(
        "--{BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"description\"\r\n\r\n\
         no file\r\n--{BOUNDARY}--\r\n"
    );
    let request = Request::builder()
        .method(Method::POST)
        .uri("/ingest")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap();

    let (status, body) = send_json(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn test_upload_empty_file_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(&dir, false);

    let (status, body) = send_json(&app, upload_request("empty.txt", b"", &[], "10.0.0.1")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_upload_over_limit_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(&dir, false);

    let data = vec![b'x'; 2048];
    let (status, body) = send_json(&app, upload_request("big.bin", &data, &[], "10.0.0.1")).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_retrieve_missing_hash() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(&dir, false);

    let (status, body) = send_json(&app, get("/retrieve", "10.0.0.1")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, body) = send_json(&app, get("/retrieve?info=1", "10.0.0.1")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_retrieve_unknown_hash() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(&dir, false);
    let unknown = "0".repeat(64);

    let (status, body) = send_json(&app, describe_req(&unknown, "10.0.0.1")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "File not found");

    let (status, body) = send_json(&app, download_req(&unknown, "10.0.0.1")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "File not found");
}

#[tokio::test]
async fn test_catalog_list_and_search() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(&dir, false);

    upload(&app, "report.pdf", b"pdf bytes", "10.0.0.1").await;
    upload(&app, "photo.jpg", b"jpg bytes", "10.0.0.1").await;
    upload(&app, "holiday-photo.png", b"png bytes", "10.0.0.1").await;

    let (status, list) = send_json(&app, get("/catalog?action=list", "10.0.0.1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["success"], true);
    assert_eq!(list["total"], 3);
    assert_eq!(list["limit"], 50);
    assert_eq!(list["offset"], 0);
    assert_eq!(list["files"][0]["status"], "seeding");

    let (_, found) = send_json(&app, get("/catalog?search=PHOTO", "10.0.0.1")).await;
    assert_eq!(found["total"], 2);

    let (_, page) = send_json(&app, get("/catalog?limit=1000&offset=2", "10.0.0.1")).await;
    assert_eq!(page["limit"], 100);
    assert_eq!(page["files"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_catalog_bad_params() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(&dir, false);

    let (status, body) = send_json(&app, get("/catalog?action=purge", "10.0.0.1")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid action");

    let (status, body) = send_json(&app, get("/catalog?limit=-5", "10.0.0.1")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (status, _) = send_json(&app, get("/catalog?limit=0", "10.0.0.1")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_catalog_stats() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(&dir, false);

    let a = upload(&app, "a.txt", b"1234", "10.0.0.1").await;
    upload(&app, "b.txt", b"123456", "10.0.0.2").await;
    let hash = a["hash"].as_str().unwrap();
    send(&app, download_req(&hash, "10.0.0.3")).await;

    let (status, body) = send_json(&app, get("/catalog?action=stats", "10.0.0.1")).await;
    assert_eq!(status, StatusCode::OK);
    let stats = &body["stats"];
    assert_eq!(stats["fileCount"], 2);
    assert_eq!(stats["totalBytes"], 10);
    assert_eq!(stats["totalDownloads"], 1);
    assert_eq!(stats["distinctRecentPeers"], 3);
    assert_eq!(stats["avgDownloadSpeed"], 2_400_000);
    assert_eq!(stats["avgUploadSpeed"], 847_000);
}

#[tokio::test]
async fn test_health() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(&dir, false);

    let (status, body) = send_json(&app, get("/_internal/health", "127.0.0.1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_deactivate_route_disabled_by_default() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(&dir, false);

    let uploaded = upload(&app, "a.txt", b"keep me", "10.0.0.1").await;
    let hash = uploaded["hash"].as_str().unwrap();

    let request = Request::builder()
        .method(Method::DELETE)
        .uri(format!("/files/{hash}"))
        .body(Body::empty())
        .unwrap();
    let (status, _, _) = send(&app, request).await;
    assert!(status == StatusCode::NOT_FOUND || status == StatusCode::METHOD_NOT_ALLOWED);

    let (status, _) = send_json(&app, describe_req(&hash, "10.0.0.1")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_deactivate_hides_file() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(&dir, true);

    let uploaded = upload(&app, "a.txt", b"retire me", "10.0.0.1").await;
    let hash = uploaded["hash"].as_str().unwrap().to_string();

    let delete = |hash: &str| {
        Request::builder()
            .method(Method::DELETE)
            .uri(format!("/files/{hash}"))
            .body(Body::empty())
            .unwrap()
    };

    let (status, body) = send_json(&app, delete(&hash)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["hash"], hash.as_str());

    let (status, _, _) = send(&app, download_req(&hash, "10.0.0.2")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, list) = send_json(&app, get("/catalog", "10.0.0.1")).await;
    assert_eq!(list["total"], 0);

    // Deactivating twice is a not-found
    let (status, _) = send_json(&app, delete(&hash)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Uploading the same bytes brings it back
    let again = upload(&app, "a.txt", b"retire me", "10.0.0.1").await;
    assert_eq!(again["hash"], hash.as_str());
    let (status, _) = send_json(&app, describe_req(&hash, "10.0.0.1")).await;
    assert_eq!(status, StatusCode::OK);
}
