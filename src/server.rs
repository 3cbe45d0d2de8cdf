//! HTTP front end: search, autocomplete, version and health routes.

use std::sync::Arc;

use axum::extract::rejection::{PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::AnnoSearchConfig;
use crate::error::{AnnoSearchError, Result};
use crate::search::query::parse_page;
use crate::search::{AnnotationPage, SearchClient, SearchParams, TermPage};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    search: Arc<SearchClient>,
}

impl AppState {
    pub fn new(search: SearchClient) -> Self {
        Self {
            search: Arc::new(search),
        }
    }
}

/// Converts the error taxonomy into `{"error": message}` responses.
#[derive(Debug)]
pub struct ApiError(AnnoSearchError);

impl From<AnnoSearchError> for ApiError {
    fn from(err: AnnoSearchError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.0.log();
        let status =
            StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(json!({ "error": self.0.message() }))).into_response()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
    pub page: Option<String>,
    pub motivation: Option<String>,
    pub date: Option<String>,
    pub user: Option<String>,
}

impl SearchQuery {
    /// Filter parameters that were supplied, in a fixed order.
    fn supplied_filters(&self) -> Vec<String> {
        [
            ("motivation", &self.motivation),
            ("date", &self.date),
            ("user", &self.user),
        ]
        .into_iter()
        .filter(|(_, value)| value.as_deref().is_some_and(|v| !v.trim().is_empty()))
        .map(|(name, _)| name.to_string())
        .collect()
    }
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn version() -> Json<Value> {
    Json(json!({ "version": env!("CARGO_PKG_VERSION") }))
}

/// Extractor rejections become validation errors so they share the JSON
/// error body and the error log.
fn request_parts(
    index: std::result::Result<Path<String>, PathRejection>,
    query: std::result::Result<Query<SearchQuery>, QueryRejection>,
) -> Result<(String, SearchQuery)> {
    let Path(index) = index.map_err(|rejection| AnnoSearchError::validation(rejection.body_text()))?;
    let Query(query) =
        query.map_err(|rejection| AnnoSearchError::validation(rejection.body_text()))?;
    Ok((index, query))
}

async fn search(
    State(state): State<AppState>,
    index: std::result::Result<Path<String>, PathRejection>,
    query: std::result::Result<Query<SearchQuery>, QueryRejection>,
) -> std::result::Result<Json<AnnotationPage>, ApiError> {
    let (index, query) = request_parts(index, query)?;
    let params = SearchParams {
        page: parse_page(query.page.as_deref())?,
        q: query.q.unwrap_or_default(),
        motivation: query.motivation,
        date: query.date,
        user: query.user,
    };
    Ok(Json(state.search.search_index(&index, &params).await?))
}

async fn autocomplete(
    State(state): State<AppState>,
    index: std::result::Result<Path<String>, PathRejection>,
    query: std::result::Result<Query<SearchQuery>, QueryRejection>,
) -> std::result::Result<Json<TermPage>, ApiError> {
    let (index, query) = request_parts(index, query)?;
    let ignored = query.supplied_filters();
    let q = query.q.unwrap_or_default();
    Ok(Json(
        state.search.search_autocomplete(&index, &q, &ignored).await?,
    ))
}

async fn not_found() -> ApiError {
    ApiError(AnnoSearchError::not_found("Not found"))
}

/// `*` allows any origin; anything else must be a single origin.
pub fn cors_layer(origin: &str) -> Result<CorsLayer> {
    let layer = CorsLayer::new().allow_methods([Method::GET]);
    if origin.trim() == "*" {
        return Ok(layer.allow_origin(Any));
    }
    let origin = HeaderValue::from_str(origin.trim())
        .map_err(|_| AnnoSearchError::validation(format!("Invalid CORS origin: {origin}")))?;
    Ok(layer.allow_origin(origin))
}

pub fn create_router(state: AppState, cors_origin: &str) -> Result<Router> {
    Ok(Router::new()
        .route("/", get(health).fallback(not_found))
        .route("/version", get(version).fallback(not_found))
        .route("/:index/search", get(search).fallback(not_found))
        .route("/:index/autocomplete", get(autocomplete).fallback(not_found))
        .fallback(not_found)
        .with_state(state)
        .layer(cors_layer(cors_origin)?)
        .layer(TraceLayer::new_for_http()))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!(error = %err, "ctrl-c handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "TERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}

/// Bind and serve until interrupted.
pub async fn serve(config: &AnnoSearchConfig) -> Result<()> {
    let search = SearchClient::from_config(config)?;
    let app = create_router(AppState::new(search), &config.cors_origin)?;

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AnnoSearchError::application(format!("Failed to bind to {addr}: {e}")))?;
    info!(addr = %addr, search_url = %config.search_url(), "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AnnoSearchError::application(format!("Server error: {e}")))
}
