//! HTTP API.
//!
//! | Method | Path | Response |
//! |---|---|---|
//! | GET | `/hazard-map` | hazards, newest report first |
//! | GET | `/stats` | hazard summaries, highest risk first |
//! | GET | `/hazard/{id}` | one hazard |
//! | GET | `/workers` | worker directory |
//! | GET | `/repair/{id}` | repair tracker |
//! | POST | `/repair/update/{id}` | `{"success": true, "data": tracker}` |
//!
//! Cross-origin access is unrestricted: every response carries the CORS
//! headers and any `OPTIONS` request is answered with 204.

mod error;

use axum::body::Bytes;
use axum::extract::{Path, Request, State};
use axum::http::{HeaderValue, Method, StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use roadwatch_core::repair::{RepairTracker, RepairUpdate};
use roadwatch_core::{Hazard, HazardId, HazardSummary, Worker};
use serde::Serialize;
use tracing::debug;

pub use self::error::ApiError;
use crate::state::AppState;

const ALLOW_ORIGIN: &str = "*";
const ALLOW_METHODS: &str = "GET, POST, OPTIONS";
const ALLOW_HEADERS: &str = "Content-Type, Authorization";

/// Builds the API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/hazard-map", get(hazard_map))
        .route("/stats", get(stats))
        .route("/hazard/{id}", get(hazard))
        .route("/workers", get(workers))
        .route("/repair/{id}", get(repair_tracker))
        .route("/repair/update/{id}", post(update_repair))
        .fallback(not_found)
        .layer(middleware::from_fn(cors))
        .with_state(state)
}

/// Successful mutation envelope.
#[derive(Debug, Serialize)]
struct Updated<T> {
    success: bool,
    data: T,
}

async fn hazard_map(State(state): State<AppState>) -> Result<Json<Vec<Hazard>>, ApiError> {
    Ok(Json(state.store().list_hazards(state.list_limit())?))
}

async fn stats(State(state): State<AppState>) -> Result<Json<Vec<HazardSummary>>, ApiError> {
    Ok(Json(state.store().list_summaries(state.list_limit())?))
}

async fn hazard(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Hazard>, ApiError> {
    let id = HazardId::new(id);
    state
        .store()
        .hazard(&id)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("hazard not found: {id}")))
}

async fn workers(State(state): State<AppState>) -> Result<Json<Vec<Worker>>, ApiError> {
    Ok(Json(state.store().list_workers()?))
}

async fn repair_tracker(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<RepairTracker>, ApiError> {
    Ok(Json(state.engine().tracker(&HazardId::new(id)).await?))
}

async fn update_repair(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<Updated<RepairTracker>>, ApiError> {
    // The body is decoded whatever its declared content type.
    let update: RepairUpdate = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let id = HazardId::new(id);
    debug!(hazard_id = %id, ?update, "repair update received");

    let data = state.engine().apply_update(&id, update).await?;
    Ok(Json(Updated {
        success: true,
        data,
    }))
}

async fn not_found() -> ApiError {
    ApiError::NotFound("Not Found".to_string())
}

/// Answers preflight requests and adds the CORS headers to every response.
async fn cors(request: Request, next: Next) -> Response {
    let mut response = if request.method() == Method::OPTIONS {
        StatusCode::NO_CONTENT.into_response()
    } else {
        next.run(request).await
    };

    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static(ALLOW_ORIGIN),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOW_METHODS),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOW_HEADERS),
    );
    response
}
