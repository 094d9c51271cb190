use askama::Template;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Html,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use tower_http::{compression::CompressionLayer, cors::CorsLayer};

use crate::dataset::load_articles;
use crate::search::{Mode, SearchHit, SearchIndex};
use crate::templates::{IndexTemplate, ResultsTemplate};

/// Live search waits this long after the last keystroke.
pub const DEBOUNCE_MS: u64 = 250;

type ApiError = (StatusCode, String);

/// The search index together with when its dataset was loaded.
#[derive(Debug)]
pub struct LoadedDataset {
    pub index: SearchIndex,
    pub loaded_at: DateTime<Utc>,
}

impl LoadedDataset {
    pub fn new(index: SearchIndex) -> Self {
        Self {
            index,
            loaded_at: Utc::now(),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    dataset: Arc<Mutex<LoadedDataset>>,
    dataset_path: Arc<PathBuf>,
    default_mode: Mode,
}

impl AppState {
    pub fn new(index: SearchIndex, dataset_path: impl Into<PathBuf>, default_mode: Mode) -> Self {
        Self {
            dataset: Arc::new(Mutex::new(LoadedDataset::new(index))),
            dataset_path: Arc::new(dataset_path.into()),
            default_mode,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, LoadedDataset>, ApiError> {
        self.dataset.lock().map_err(|_| {
            tracing::error!("Search index lock poisoned");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Search index unavailable".to_string(),
            )
        })
    }

    fn mode(&self, raw: Option<&str>) -> Result<Mode, ApiError> {
        match raw.map(str::trim).filter(|m| !m.is_empty()) {
            None => Ok(self.default_mode),
            Some(m) => m.parse().map_err(|e| {
                tracing::warn!("Rejected search: {}", e);
                (StatusCode::BAD_REQUEST, format!("{}", e))
            }),
        }
    }

    fn search(&self, query: &str, mode: Mode) -> Result<Vec<SearchHit>, ApiError> {
        let mut dataset = self.lock()?;
        Ok(dataset.index.search(query, mode))
    }
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    q: Option<String>,
    mode: Option<String>,
}

impl SearchParams {
    /// `None` when no query was submitted at all (fresh page or Limpiar).
    fn submitted(&self) -> Option<&str> {
        self.q.as_deref().map(str::trim)
    }

    fn query(&self) -> &str {
        self.submitted().unwrap_or("")
    }
}

#[derive(Debug, Serialize)]
struct SearchResponse {
    query: String,
    mode: Mode,
    results: Vec<SearchHit>,
    total: usize,
    time_ms: u128,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    articles: usize,
    dataset_version: u64,
    loaded_at: DateTime<Utc>,
}

impl HealthResponse {
    fn from_dataset(dataset: &LoadedDataset) -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            articles: dataset.index.len(),
            dataset_version: dataset.index.version(),
            loaded_at: dataset.loaded_at,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(page_handler))
        .route("/results", get(results_handler))
        .route("/api/search", get(search_handler))
        .route("/api/health", get(health_handler))
        .route("/api/reload", post(reload_handler))
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, state: AppState) -> anyhow::Result<()> {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("🚀 Server listening on http://{}", addr);
    tracing::info!("🔍 Search API available at http://{}/api/search?q=<query>&mode=<tema|palabras|ambos>", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

fn render<T: Template>(template: &T) -> Result<Html<String>, ApiError> {
    template.render().map(Html).map_err(|e| {
        tracing::error!("Template error: {}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, "Failed to render page".to_string())
    })
}

/// No submitted query shows the idle view; a submitted one always searches,
/// even when empty.
fn results_view(
    state: &AppState,
    query: Option<&str>,
    mode: Mode,
) -> Result<ResultsTemplate, ApiError> {
    let Some(query) = query else {
        return Ok(ResultsTemplate::idle());
    };
    let hits = state.search(query, mode)?;
    Ok(ResultsTemplate::from_hits(&hits, query))
}

async fn page_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Html<String>, ApiError> {
    let mode = state.mode(params.mode.as_deref())?;
    let results = results_view(&state, params.submitted(), mode)?;
    let query = params.query();

    render(&IndexTemplate {
        query,
        mode: mode.as_str(),
        debounce_ms: DEBOUNCE_MS,
        results,
    })
}

async fn results_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Html<String>, ApiError> {
    let mode = state.mode(params.mode.as_deref())?;
    render(&results_view(&state, params.submitted(), mode)?)
}

async fn search_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, ApiError> {
    let start = std::time::Instant::now();
    let mode = state.mode(params.mode.as_deref())?;
    let query = params.query();

    let results = state.search(query, mode)?;

    let total = results.len();
    let time_ms = start.elapsed().as_millis();

    tracing::info!(
        "Search query='{}' mode={} returned {} results in {}ms",
        query,
        mode,
        total,
        time_ms
    );

    Ok(Json(SearchResponse {
        query: query.to_string(),
        mode,
        results,
        total,
        time_ms,
    }))
}

async fn health_handler(State(state): State<AppState>) -> Result<Json<HealthResponse>, ApiError> {
    let dataset = state.lock()?;
    Ok(Json(HealthResponse::from_dataset(&dataset)))
}

async fn reload_handler(State(state): State<AppState>) -> Result<Json<HealthResponse>, ApiError> {
    let path = Arc::clone(&state.dataset_path);
    tracing::info!("📦 Reloading dataset from {}", path.display());

    let articles = tokio::task::spawn_blocking(move || load_articles(path.as_path()))
        .await
        .map_err(|e| {
            tracing::error!("Reload task failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, format!("Reload task failed: {}", e))
        })?
        .map_err(|e| {
            tracing::error!("Reload failed, keeping previous dataset: {:#}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, format!("{:#}", e))
        })?;

    let mut dataset = state.lock()?;
    dataset.index.reload(articles);
    dataset.loaded_at = Utc::now();

    Ok(Json(HealthResponse::from_dataset(&dataset)))
}
