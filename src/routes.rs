//! HTTP surface of the OCR search service.
//!
//! Search endpoints are public and always answer 200 with a JSON body for
//! a known node; backend trouble shows up as empty match lists.

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::content::ContentTree;
use crate::search::{AnnotationsList, OcrSearch, PageSelection};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub search: Arc<OcrSearch>,
    pub content: Arc<dyn ContentTree>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ocr/:node/search", get(search_all_pages))
        .route("/ocr/:node/search/:page", get(search_page))
        .route("/ocr/:node/count", get(count))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    q: Option<String>,
}

/// Search every page of a node.
///
/// GET /ocr/:node/search?q=term
async fn search_all_pages(
    State(state): State<AppState>,
    Path(node): Path<String>,
    Query(params): Query<SearchParams>,
) -> Result<Response, StatusCode> {
    run_search(&state, &node, "all", params).await
}

/// Search one page (`all` or a 0-based index) of a node.
///
/// GET /ocr/:node/search/:page?q=term
async fn search_page(
    State(state): State<AppState>,
    Path((node, page)): Path<(String, String)>,
    Query(params): Query<SearchParams>,
) -> Result<Response, StatusCode> {
    run_search(&state, &node, &page, params).await
}

async fn run_search(
    state: &AppState,
    node_id: &str,
    page: &str,
    params: SearchParams,
) -> Result<Response, StatusCode> {
    let node = state.content.item(node_id).ok_or(StatusCode::NOT_FOUND)?;
    let term = params.q.filter(|q| !q.trim().is_empty());

    let annotations = match (term, PageSelection::parse(page)) {
        (Some(term), Some(selection)) => {
            state
                .search
                .search(state.content.as_ref(), &node, &term, selection)
                .await
        }
        _ => AnnotationsList::new(),
    };

    Ok(public_json(&annotations))
}

#[derive(Debug, Serialize)]
struct CountResponse {
    count: u64,
}

/// Number of OCR documents indexed for a node.
///
/// GET /ocr/:node/count
async fn count(
    State(state): State<AppState>,
    Path(node): Path<String>,
) -> Result<Response, StatusCode> {
    let node = state.content.item(&node).ok_or(StatusCode::NOT_FOUND)?;
    let count = state.search.count(state.content.as_ref(), &node).await;
    Ok(public_json(&CountResponse { count }))
}

/// JSON body readable from any origin (IIIF viewers assume this).
fn public_json<T: Serialize>(body: &T) -> Response {
    (
        [(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*")],
        Json(body),
    )
        .into_response()
}
