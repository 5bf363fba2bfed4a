use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use chrono::{Local, Utc};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::analysis::{Analyzer, DEFAULT_TOP_N};
use crate::state::AppState;
use crate::store::download_name;
use crate::types::Record;

const DEFAULT_PER_PAGE: usize = 25;

pub struct ApiServer {
    host: String,
    port: u16,
    state: Arc<AppState>,
}

impl ApiServer {
    pub fn new(host: impl Into<String>, port: u16, state: Arc<AppState>) -> Self {
        Self { host: host.into(), port, state }
    }

    /// Serve until `shutdown` is cancelled
    pub async fn run(self, shutdown: CancellationToken) -> anyhow::Result<()> {
        let app = router(self.state);

        let addr = format!("{}:{}", self.host, self.port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        info!("🌐 API server listening on {}", addr);

        axum::serve(listener, app).with_graceful_shutdown(async move { shutdown.cancelled().await }).await.map_err(|e| {
            error!("API server error: {}", e);
            e.into()
        })
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/scrape", post(scrape_handler))
        .route("/api/scrape-status", get(scrape_status_handler))
        .route("/api/movies", get(movies_handler))
        .route("/api/search", get(search_handler))
        .route("/api/statistics", get(statistics_handler))
        .route("/api/top-movies", get(top_movies_handler))
        .route("/api/download-csv", get(download_handler))
        .route("/api/data-status", get(data_status_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Lenient integer query value: missing or malformed falls back to `default`
fn int_param(value: Option<&str>, default: usize) -> usize {
    value.and_then(|v| v.trim().parse::<usize>().ok()).unwrap_or(default)
}

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    page: Option<String>,
    per_page: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    keyword: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TopParams {
    top: Option<String>,
}

/// One page of the listing, 1-based
#[derive(Debug, Clone, PartialEq)]
pub struct MoviePage {
    pub data: Vec<Record>,
    pub total: usize,
    pub page: usize,
    pub per_page: usize,
    pub total_pages: usize,
}

pub fn paginate(records: &[Record], page: usize, per_page: usize) -> MoviePage {
    let page = page.max(1);
    let per_page = per_page.max(1);
    let total = records.len();
    let start = (page - 1).saturating_mul(per_page).min(total);
    let end = start.saturating_add(per_page).min(total);

    MoviePage { data: records[start..end].to_vec(), total, page, per_page, total_pages: total.div_ceil(per_page) }
}

async fn health_handler(State(state): State<Arc<AppState>>) -> (StatusCode, Json<Value>) {
    let health = json!({
        "status": "healthy",
        "service": "top250",
        "movie_count": state.record_count(),
        "scrape_running": state.progress().running,
        "timestamp": Utc::now().to_rfc3339(),
    });

    (StatusCode::OK, Json(health))
}

async fn scrape_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    let outcome = state.run_scrape().await;

    let body = match outcome.count() {
        Some(count) if outcome.is_success() => json!({ "success": true, "message": outcome.message(), "count": count }),
        _ => json!({ "success": false, "message": outcome.message() }),
    };
    Json(body)
}

async fn scrape_status_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({ "success": true, "data": state.progress() }))
}

async fn movies_handler(State(state): State<Arc<AppState>>, Query(params): Query<ListParams>) -> Json<Value> {
    let page = int_param(params.page.as_deref(), 1);
    let per_page = int_param(params.per_page.as_deref(), DEFAULT_PER_PAGE);

    let records = state.snapshot();
    let slice = paginate(&records, page, per_page);

    Json(json!({
        "success": true,
        "data": slice.data,
        "total": slice.total,
        "page": slice.page,
        "per_page": slice.per_page,
        "total_pages": slice.total_pages,
    }))
}

async fn search_handler(State(state): State<Arc<AppState>>, Query(params): Query<SearchParams>) -> Json<Value> {
    let keyword = params.keyword.unwrap_or_default();
    if keyword.is_empty() {
        return Json(json!({ "success": false, "message": "请输入搜索关键词" }));
    }

    let records = state.snapshot();
    let results = Analyzer::new(&records).search(&keyword);

    Json(json!({ "success": true, "count": results.len(), "data": results }))
}

async fn statistics_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    let records = state.snapshot();
    let report = Analyzer::new(&records).report(DEFAULT_TOP_N);

    Json(json!({ "success": true, "data": report }))
}

async fn top_movies_handler(State(state): State<Arc<AppState>>, Query(params): Query<TopParams>) -> Json<Value> {
    let top = int_param(params.top.as_deref(), DEFAULT_TOP_N);

    let records = state.snapshot();
    let movies = Analyzer::new(&records).top_rated(top);

    Json(json!({ "success": true, "data": movies }))
}

async fn download_handler(State(state): State<Arc<AppState>>) -> Response {
    match state.store().read_bytes().await {
        Ok(bytes) => {
            let disposition = format!("attachment; filename=\"{}\"", download_name(&Local::now()));
            (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()), (header::CONTENT_DISPOSITION, disposition)],
                Body::from(bytes),
            )
                .into_response()
        }
        Err(e) => {
            info!("📭 Download requested without data: {}", e);
            (StatusCode::NOT_FOUND, Json(json!({ "success": false, "message": "CSV文件不存在，请先爬取数据" }))).into_response()
        }
    }
}

async fn data_status_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    let movie_count = state.record_count();
    let has_data = state.has_data().await;

    Json(json!({ "success": true, "has_data": has_data, "movie_count": movie_count }))
}
