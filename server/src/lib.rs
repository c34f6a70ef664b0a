use anyhow::{Context, Result};
use axum::{extract::{Path, Query, State}, http::{HeaderMap, StatusCode}, routing::{get, post}, Json, Router};
use parking_lot::RwLock;
use search_core::{ArtifactPaths, ArtifactSet, DocumentView, RankingConfig, ScoredResult, SearchEngine};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub const DEFAULT_TOP_K: usize = 20;
pub const MAX_TOP_K: usize = 100;

#[derive(Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: Option<String>,
    /// Kept as text so an empty or non-numeric value falls back to the default.
    #[serde(default)]
    pub top_k: Option<String>,
}

impl SearchParams {
    /// Requested result count, clamped to `1..=MAX_TOP_K`.
    pub fn top_k(&self) -> usize {
        self.top_k
            .as_deref()
            .and_then(|s| s.trim().parse::<usize>().ok())
            .unwrap_or(DEFAULT_TOP_K)
            .clamp(1, MAX_TOP_K)
    }
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub results: Vec<SearchHit>,
    /// Seconds spent ranking; absent when no query was given.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<f64>,
}

#[derive(Serialize)]
pub struct SearchHit {
    pub doc_id: String,
    pub url: String,
    pub title: String,
    pub score: f64,
    pub bm25: f64,
    pub pagerank: f64,
}

impl From<ScoredResult> for SearchHit {
    fn from(r: ScoredResult) -> Self {
        Self {
            doc_id: r.doc_id,
            url: r.url,
            title: r.title,
            score: r.combined_score,
            bm25: r.bm25_component,
            pagerank: r.pagerank_component,
        }
    }
}

/// Startup settings for [`build_app`].
#[derive(Debug, Clone)]
pub struct AppOptions {
    pub index_dir: PathBuf,
    pub ranking: RankingConfig,
    pub admin_token: Option<String>,
    /// Comma-separated origins; `None` or an unparsable list allows any.
    pub cors_allow_origin: Option<String>,
}

impl AppOptions {
    pub fn new(index_dir: impl Into<PathBuf>) -> Self {
        Self { index_dir: index_dir.into(), ranking: RankingConfig::default(), admin_token: None, cors_allow_origin: None }
    }
}

#[derive(Clone)]
pub struct AppState {
    /// Swapped wholesale on reload; handlers clone the inner `Arc` and search without holding the lock.
    engine: Arc<RwLock<Arc<SearchEngine>>>,
    index_dir: PathBuf,
    ranking: RankingConfig,
    admin_token: Option<String>,
}

impl AppState {
    pub fn engine(&self) -> Arc<SearchEngine> {
        self.engine.read().clone()
    }
}

/// Load and validate a full artifact set. Fails if any file is missing or corrupt.
pub fn load_engine(index_dir: &std::path::Path, ranking: RankingConfig) -> Result<SearchEngine> {
    let artifacts = ArtifactSet::load(&ArtifactPaths::new(index_dir))
        .with_context(|| format!("loading artifacts from {}", index_dir.display()))?;
    Ok(SearchEngine::new(artifacts, ranking))
}

pub fn build_app(options: AppOptions) -> Result<Router> {
    // Refuse to start on missing or partial artifacts
    let engine = load_engine(&options.index_dir, options.ranking)?;
    let app_state = AppState {
        engine: Arc::new(RwLock::new(Arc::new(engine))),
        index_dir: options.index_dir,
        ranking: options.ranking,
        admin_token: options.admin_token,
    };

    let cors = match options.cors_allow_origin {
        Some(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        None => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_handler))
        .route("/doc/:doc_id", get(doc_handler))
        .route("/admin/reload", post(reload_handler))
        .with_state(app_state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());
    Ok(app)
}

pub async fn search_handler(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Json<SearchResponse> {
    let query = params.q.as_deref().unwrap_or("").trim().to_string();
    if query.is_empty() {
        return Json(SearchResponse { query: String::new(), results: vec![], time: None });
    }
    let top_k = params.top_k();
    let outcome = state.engine().search(&query, top_k);
    Json(SearchResponse {
        query,
        results: outcome.results.into_iter().map(SearchHit::from).collect(),
        time: Some(outcome.elapsed.as_secs_f64()),
    })
}

pub async fn doc_handler(State(state): State<AppState>, Path(doc_id): Path<String>) -> Result<Json<DocumentView>, (StatusCode, Json<serde_json::Value>)> {
    state
        .engine()
        .document(&doc_id)
        .map(Json)
        .ok_or_else(|| (StatusCode::NOT_FOUND, Json(serde_json::json!({ "error": "not found" }))))
}

/// Load a fresh artifact set from the index directory, then publish it.
/// Queries already running keep the engine they started with.
async fn reload_handler(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    authorize(&state, &headers)?;
    let dir = state.index_dir.clone();
    let ranking = state.ranking;
    let engine = tokio::task::spawn_blocking(move || load_engine(&dir, ranking))
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .map_err(|e| {
            tracing::error!(error = %format!("{e:#}"), "reload failed, keeping current artifacts");
            (StatusCode::INTERNAL_SERVER_ERROR, format!("{e:#}"))
        })?;
    let total_docs = engine.corpus_stats().total_docs;
    *state.engine.write() = Arc::new(engine);
    tracing::info!(total_docs, "artifacts reloaded");
    Ok(Json(serde_json::json!({ "status": "reloaded", "total_docs": total_docs })))
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), (StatusCode, String)> {
    let required = match &state.admin_token {
        Some(t) => t,
        None => return Err((StatusCode::UNAUTHORIZED, "ADMIN_TOKEN not set".into())),
    };
    let provided = headers.get("X-ADMIN-TOKEN").and_then(|v| v.to_str().ok()).unwrap_or("");
    if provided == required {
        Ok(())
    } else {
        Err((StatusCode::UNAUTHORIZED, "invalid admin token".into()))
    }
}
