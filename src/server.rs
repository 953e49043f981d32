//! HTTP query surface.
//!
//! Two read-only endpoints over the current index snapshot:
//!
//! - `GET /search?sig=<16-hex>` — bounded-Hamming docid lookup
//! - `GET /topk?sig=<16-hex>&k=<int>` — k nearest signatures with distances
//!
//! Handlers sample the [`IndexHandle`] exactly once, so each request sees
//! one consistent index version even across a concurrent reload. Input
//! parse failures are the client's problem (400); everything inside the
//! index degrades instead of erroring.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::loader::IndexHandle;
use crate::Error;

// ============================================================================
// State
// ============================================================================

#[derive(Clone)]
pub struct AppState {
    pub index: Arc<IndexHandle>,
    pub queries: Arc<AtomicU64>,
}

impl AppState {
    pub fn new(index: Arc<IndexHandle>) -> Self {
        Self { index, queries: Arc::new(AtomicU64::new(0)) }
    }
}

/// Routes for the enabled components only: a disabled component simply has
/// no route, mirroring the configuration instead of advertising dead paths.
pub fn router(cfg: &Config, state: AppState) -> Router {
    let mut app = Router::new();
    if cfg.store {
        app = app.route("/search", get(search));
    }
    if cfg.vptree {
        app = app.route("/topk", get(topk));
    }
    app.with_state(state)
}

// ============================================================================
// Error mapping
// ============================================================================

/// Query-path error wrapper: bad client input is 400, anything else 500.
struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            Error::ParseSignature(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.0.to_string()).into_response()
    }
}

fn parse_sig(s: &str) -> Result<u64, ApiError> {
    u64::from_str_radix(s, 16).map_err(|_| ApiError(Error::ParseSignature(s.to_owned())))
}

// ============================================================================
// Handlers
// ============================================================================

#[derive(Debug, Deserialize)]
struct SearchParams {
    sig: String,
}

async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<u64>>, ApiError> {
    let sig = parse_sig(&params.sig)?;
    state.queries.fetch_add(1, Ordering::Relaxed);

    let index = state.index.snapshot();
    let ids = index.store.as_ref().map(|s| s.find(sig)).unwrap_or_default();
    Ok(Json(ids))
}

fn default_k() -> usize {
    10
}

#[derive(Debug, Deserialize)]
struct TopkParams {
    sig: String,
    #[serde(default = "default_k")]
    k: usize,
}

/// One nearest-neighbour result row.
#[derive(Debug, Serialize)]
pub struct Neighbor {
    pub id: u64,
    pub d: f64,
}

async fn topk(
    State(state): State<AppState>,
    Query(params): Query<TopkParams>,
) -> Result<Json<Vec<Neighbor>>, ApiError> {
    let sig = parse_sig(&params.sig)?;
    state.queries.fetch_add(1, Ordering::Relaxed);

    let index = state.index.snapshot();
    let (items, dists) = index
        .vptree
        .as_ref()
        .map(|t| t.search(sig, params.k))
        .unwrap_or_default();

    let rows = items
        .iter()
        .zip(dists)
        .map(|(item, d)| Neighbor { id: item.id, d })
        .collect();
    Ok(Json(rows))
}
