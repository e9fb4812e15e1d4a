//! HTTP API server.
//!
//! Exposes job submission, job status, summary retrieval, and service
//! statistics as a JSON HTTP API.
//!
//! # Endpoints
//!
//! | Method   | Path | Description |
//! |----------|------|-------------|
//! | `GET`    | `/` | Service info / health check |
//! | `POST`   | `/scrape` | Submit a URL; returns the queued job id |
//! | `GET`    | `/jobs/{id}` | Job status and error, if any |
//! | `GET`    | `/summaries` | List summaries (limit/offset/search) |
//! | `GET`    | `/summaries/{id}` | One summary with its full text |
//! | `DELETE` | `/summaries/{id}` | Delete a summary and its artifact |
//! | `GET`    | `/stats` | Job and summary counts |
//!
//! # Error Contract
//!
//! All error responses carry one JSON shape:
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "url must use http or https" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `internal` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so browser dashboards
//! can call the API directly.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::models::{Job, Stats, SummaryRecord};
use crate::pipeline::Pipeline;
use crate::store::Store;

const DEFAULT_LIST_LIMIT: i64 = 10;
const MAX_LIST_LIMIT: i64 = 100;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    store: Store,
    pipeline: Arc<Pipeline>,
    /// Defaults applied when a scrape request omits its bounds.
    max_pages: u32,
    max_depth: u32,
}

/// Starts the HTTP server on `bind_addr` and serves until terminated.
pub async fn run_server(
    bind_addr: &str,
    store: Store,
    pipeline: Arc<Pipeline>,
    max_pages: u32,
    max_depth: u32,
) -> anyhow::Result<()> {
    let state = AppState {
        store,
        pipeline,
        max_pages,
        max_depth,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/", get(handle_root))
        .route("/scrape", post(handle_scrape))
        .route("/jobs/{id}", get(handle_get_job))
        .route("/summaries", get(handle_list_summaries))
        .route(
            "/summaries/{id}",
            get(handle_get_summary).delete(handle_delete_summary),
        )
        .route("/stats", get(handle_stats))
        .layer(cors)
        .with_state(state);

    info!(bind = bind_addr, "API server listening");

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found".to_string(),
        message: message.into(),
    }
}

fn internal(err: anyhow::Error) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: err.to_string(),
    }
}

// ============ GET / ============

#[derive(Serialize)]
struct RootResponse {
    service: String,
    version: String,
    status: String,
}

async fn handle_root() -> Json<RootResponse> {
    Json(RootResponse {
        service: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        status: "ok".to_string(),
    })
}

// ============ POST /scrape ============

#[derive(Deserialize)]
struct ScrapeRequest {
    url: String,
    max_pages: Option<u32>,
    max_depth: Option<u32>,
}

#[derive(Serialize)]
struct ScrapeResponse {
    job_id: String,
    status: String,
    message: String,
}

/// Validates the URL, records a queued job, and spawns the pipeline run.
/// Returns `202` immediately; progress is observable via `GET /jobs/{id}`.
async fn handle_scrape(
    State(state): State<AppState>,
    Json(request): Json<ScrapeRequest>,
) -> Result<(StatusCode, Json<ScrapeResponse>), AppError> {
    let url = request.url.trim().to_string();
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(bad_request("url must use http or https"));
    }

    let max_pages = request.max_pages.unwrap_or(state.max_pages);
    let max_depth = request.max_depth.unwrap_or(state.max_depth);
    if max_pages == 0 {
        return Err(bad_request("max_pages must be > 0"));
    }

    let job_id = state.store.create_job(&url).await.map_err(internal)?;

    info!(job_id, url, "job queued");

    let pipeline = state.pipeline.clone();
    let spawned_id = job_id.clone();
    tokio::spawn(async move {
        pipeline.run(&spawned_id, &url, max_pages, max_depth).await;
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(ScrapeResponse {
            job_id,
            status: "queued".to_string(),
            message: "job queued; poll /jobs/{id} for progress".to_string(),
        }),
    ))
}

// ============ GET /jobs/{id} ============

async fn handle_get_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Job>, AppError> {
    let job = state
        .store
        .get_job(&id)
        .await
        .map_err(internal)?
        .ok_or_else(|| not_found(format!("no job with id: {}", id)))?;
    Ok(Json(job))
}

// ============ GET /summaries ============

#[derive(Deserialize)]
struct ListQuery {
    limit: Option<i64>,
    offset: Option<i64>,
    search: Option<String>,
}

#[derive(Serialize)]
struct SummaryListResponse {
    summaries: Vec<SummaryRecord>,
    count: usize,
}

async fn handle_list_summaries(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<SummaryListResponse>, AppError> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_LIST_LIMIT)
        .clamp(1, MAX_LIST_LIMIT);
    let offset = query.offset.unwrap_or(0).max(0);
    let search = query
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    let summaries = state
        .store
        .list_summaries(limit, offset, search)
        .await
        .map_err(internal)?;

    let count = summaries.len();
    Ok(Json(SummaryListResponse { summaries, count }))
}

// ============ GET /summaries/{id} ============

async fn handle_get_summary(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SummaryRecord>, AppError> {
    let summary = state
        .store
        .get_summary(&id)
        .await
        .map_err(internal)?
        .ok_or_else(|| not_found(format!("no summary with id: {}", id)))?;
    Ok(Json(summary))
}

// ============ DELETE /summaries/{id} ============

#[derive(Serialize)]
struct DeleteResponse {
    deleted: String,
}

/// Deletes the summary row and best-effort removes its artifact file;
/// a missing or unremovable file does not fail the request.
async fn handle_delete_summary(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, AppError> {
    let filename = state
        .store
        .delete_summary(&id)
        .await
        .map_err(internal)?
        .ok_or_else(|| not_found(format!("no summary with id: {}", id)))?;

    let path = PathBuf::from(&filename);
    if let Err(e) = std::fs::remove_file(&path) {
        warn!(file = %path.display(), error = %e, "could not remove artifact file");
    }

    Ok(Json(DeleteResponse { deleted: id }))
}

// ============ GET /stats ============

async fn handle_stats(State(state): State<AppState>) -> Result<Json<Stats>, AppError> {
    let stats = state.store.stats().await.map_err(internal)?;
    Ok(Json(stats))
}
