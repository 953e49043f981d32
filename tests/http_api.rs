//! End-to-end HTTP surface tests: router-level, no socket.

use std::io::Write;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use clap::Parser;
use pretty_assertions::assert_eq;
use tower::ServiceExt;

use simdex::loader::{build_index, IndexHandle};
use simdex::server::{router, AppState};
use simdex::Config;

/// Corpus: two close signatures and one far away.
const CORPUS: &str = "\
1 00000000cafebabe
2 00000000cafebabf
3 ffffffff00000000
";

fn app(args: &[&str]) -> axum::Router {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(CORPUS.as_bytes()).expect("write corpus");

    let mut argv = vec!["simdexd", "-f", file.path().to_str().expect("utf-8 path")];
    argv.extend_from_slice(args);
    let cfg = Config::parse_from(argv);
    cfg.validate().expect("valid test config");

    let index = build_index(&cfg).expect("index builds");
    let state = AppState::new(Arc::new(IndexHandle::new(index)));
    router(&cfg, state)
}

async fn get(app: &axum::Router, uri: &str) -> (StatusCode, String) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).expect("request"))
        .await
        .expect("response");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    (status, String::from_utf8(bytes.to_vec()).expect("utf-8 body"))
}

// ============================================================================
// /search
// ============================================================================

#[tokio::test]
async fn search_returns_docids_within_distance() {
    let app = app(&[]);
    let (status, body) = get(&app, "/search?sig=00000000cafebabe").await;
    assert_eq!(status, StatusCode::OK);

    let mut ids: Vec<u64> = serde_json::from_str(&body).expect("json docid array");
    ids.sort_unstable();
    assert_eq!(ids, vec![1, 2]);
}

#[tokio::test]
async fn search_misses_return_an_empty_array() {
    let app = app(&[]);
    let (status, body) = get(&app, "/search?sig=1234567812345678").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "[]");
}

#[tokio::test]
async fn search_rejects_bad_hex() {
    let app = app(&[]);
    let (status, _) = get(&app, "/search?sig=0xGG").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn search_route_absent_when_store_disabled() {
    let app = app(&["--store", "false"]);
    let (status, _) = get(&app, "/search?sig=00000000cafebabe").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // /topk still serves.
    let (status, _) = get(&app, "/topk?sig=00000000cafebabe").await;
    assert_eq!(status, StatusCode::OK);
}

// ============================================================================
// /topk
// ============================================================================

#[derive(Debug, serde::Deserialize)]
struct Row {
    id: u64,
    d: f64,
}

#[tokio::test]
async fn topk_returns_ascending_distances() {
    let app = app(&[]);
    let (status, body) = get(&app, "/topk?sig=00000000cafebabe&k=3").await;
    assert_eq!(status, StatusCode::OK);

    let rows: Vec<Row> = serde_json::from_str(&body).expect("json rows");
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].id, 1);
    assert_eq!(rows[0].d, 0.0);
    assert_eq!(rows[1].id, 2);
    assert_eq!(rows[1].d, 1.0);
    assert!(rows[1].d <= rows[2].d);
}

#[tokio::test]
async fn topk_defaults_to_ten_results() {
    let app = app(&[]);
    let (status, body) = get(&app, "/topk?sig=00000000cafebabe").await;
    assert_eq!(status, StatusCode::OK);

    // Only three records exist, so the default k=10 is capped by the corpus.
    let rows: Vec<Row> = serde_json::from_str(&body).expect("json rows");
    assert_eq!(rows.len(), 3);
}

#[tokio::test]
async fn topk_rejects_unparseable_k() {
    let app = app(&[]);
    let (status, _) = get(&app, "/topk?sig=00000000cafebabe&k=banana").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn topk_rejects_bad_hex() {
    let app = app(&[]);
    let (status, _) = get(&app, "/topk?sig=zzzz").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
