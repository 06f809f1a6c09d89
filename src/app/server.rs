//! HTTP API over the scan engine.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{HeaderName, Request, StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use super::error::ScanError;
use super::report::render_report;
use super::runtime::{Engine, new_job_id};
use super::types::{GrammarScanRequest, MigrationJob, MigrationTarget, PrecursorRule};

pub const SCAN_ID_HEADER: &str = "x-scan-id";

#[derive(Clone)]
pub struct AppState {
    pub engine: Engine,
    /// Bearer token required on every request when set.
    pub api_token: Option<Arc<str>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GrammarScanBody {
    #[serde(default)]
    base_domain: String,
    #[serde(default)]
    find_word: String,
    #[serde(default)]
    find_broken_links: bool,
    #[serde(default = "default_grammar_pages")]
    max_pages: usize,
    #[serde(default)]
    required_precursor: String,
    #[serde(default)]
    phrase_to_check: String,
    #[serde(default)]
    ignore_words: Vec<String>,
    delay_ms: Option<u64>,
    scan_id: Option<String>,
}

fn default_grammar_pages() -> usize {
    10
}

impl From<GrammarScanBody> for GrammarScanRequest {
    fn from(body: GrammarScanBody) -> Self {
        GrammarScanRequest {
            job_id: body.scan_id,
            base_domain: body.base_domain,
            max_pages: body.max_pages,
            find_word: Some(body.find_word).filter(|w| !w.is_empty()),
            precursor_rule: PrecursorRule::new(&body.required_precursor, &body.phrase_to_check),
            ignore_words: body.ignore_words,
            delay: body.delay_ms.map(Duration::from_millis),
            find_broken_links: body.find_broken_links,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AllBlogsBody {
    #[serde(default)]
    base_url: String,
    #[serde(default = "default_blog_pages")]
    max_pages: usize,
    #[serde(default)]
    scan_id: String,
}

fn default_blog_pages() -> usize {
    100
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SpecificBlogsBody {
    #[serde(default)]
    base_url: String,
    #[serde(default)]
    blog_url_list: Vec<String>,
    #[serde(default)]
    scan_id: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/api/runGrammarScan", post(run_grammar_scan))
        .route("/api/runGrammarScan/progress/:scan_id", get(progress))
        .route("/api/migrationScan/getAllBlogs", post(get_all_blogs))
        .route("/api/migrationScan/getAllBlogs/progress/:scan_id", get(progress))
        .route("/api/migrationScan/getSpecificBlogs", post(get_specific_blogs))
        .route(
            "/api/migrationScan/getSpecificBlogs/progress/:scan_id",
            get(progress),
        )
        .route("/api/migrationScan/scan/:scan_id", delete(clear_scan))
        .layer(middleware::from_fn_with_state(state.clone(), require_token))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, state: AppState) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("server running at http://{}", listener.local_addr()?);
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("server shutting down");
        })
        .await?;
    Ok(())
}

async fn require_token(State(state): State<AppState>, request: Request<Body>, next: Next) -> Response {
    let Some(expected) = state.api_token.as_deref() else {
        return next.run(request).await;
    };
    let presented = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim);

    match presented {
        Some(token) if token == expected => next.run(request).await,
        _ => (StatusCode::UNAUTHORIZED, Json(json!({ "error": "Unauthorized" }))).into_response(),
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "API is running" }))
}

/// Scans submitted without `scanId` get a generated id, echoed back in the
/// `X-Scan-Id` header so the caller can poll progress.
async fn run_grammar_scan(State(state): State<AppState>, Json(body): Json<GrammarScanBody>) -> Response {
    let mut request = GrammarScanRequest::from(body);
    let scan_id = request
        .job_id
        .take()
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(new_job_id);
    request.job_id = Some(scan_id.clone());

    match state.engine.grammar_scan(request).await {
        Ok(outcome) => (
            [
                (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
                (HeaderName::from_static(SCAN_ID_HEADER), scan_id),
            ],
            render_report(&outcome),
        )
            .into_response(),
        Err(err) => {
            let status = status_for(&err);
            if status == StatusCode::INTERNAL_SERVER_ERROR {
                error!(error = %err, "grammar scan failed");
                (status, "Server error during crawl").into_response()
            } else {
                (status, err.to_string()).into_response()
            }
        }
    }
}

async fn get_all_blogs(State(state): State<AppState>, Json(body): Json<AllBlogsBody>) -> Response {
    if body.base_url.trim().is_empty() || body.scan_id.trim().is_empty() {
        return json_error(StatusCode::BAD_REQUEST, "Missing baseUrl or scanId");
    }
    let job = MigrationJob {
        id: body.scan_id,
        base_url: body.base_url,
        target: MigrationTarget::AllBlogs {
            max_pages: body.max_pages,
        },
    };
    migration_response(&state, job, "blogs.csv", "Server error during blog crawl").await
}

async fn get_specific_blogs(
    State(state): State<AppState>,
    Json(body): Json<SpecificBlogsBody>,
) -> Response {
    if body.base_url.trim().is_empty() || body.blog_url_list.is_empty() || body.scan_id.trim().is_empty() {
        return json_error(
            StatusCode::BAD_REQUEST,
            "Missing baseUrl, blogUrlList, or scanId",
        );
    }
    let job = MigrationJob {
        id: body.scan_id,
        base_url: body.base_url,
        target: MigrationTarget::SpecificBlogs {
            slugs: body.blog_url_list,
        },
    };
    migration_response(
        &state,
        job,
        "specific-blogs.csv",
        "Server error during specific blog crawl",
    )
    .await
}

async fn migration_response(
    state: &AppState,
    job: MigrationJob,
    filename: &str,
    failure: &str,
) -> Response {
    match state.engine.migration(job).await {
        Ok(export) => (
            [
                (header::CONTENT_TYPE, "text/csv".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename={filename}"),
                ),
            ],
            export.csv,
        )
            .into_response(),
        Err(err) => {
            let status = status_for(&err);
            if status == StatusCode::INTERNAL_SERVER_ERROR {
                error!(error = %err, "migration failed");
                json_error(status, failure)
            } else {
                json_error(status, &err.to_string())
            }
        }
    }
}

async fn progress(State(state): State<AppState>, Path(scan_id): Path<String>) -> Response {
    Json(state.engine.progress(&scan_id)).into_response()
}

async fn clear_scan(State(state): State<AppState>, Path(scan_id): Path<String>) -> Response {
    if state.engine.clear(&scan_id) {
        (
            StatusCode::OK,
            Json(json!({ "message": format!("Scan {scan_id} cleared.") })),
        )
            .into_response()
    } else {
        json_error(StatusCode::NOT_FOUND, &format!("Scan {scan_id} not found."))
    }
}

fn status_for(err: &ScanError) -> StatusCode {
    match err {
        ScanError::MissingField(_) | ScanError::InvalidUrl { .. } => StatusCode::BAD_REQUEST,
        ScanError::JobIdInUse(_) | ScanError::Cancelled(_) => StatusCode::CONFLICT,
        ScanError::Client(_) | ScanError::Csv(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn json_error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

