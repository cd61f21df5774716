//! Product search HTTP server.
//!
//! Exposes search and index maintenance as a JSON HTTP API for storefront
//! frontends.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`    | `/search?q=&facets=&lang=` | Product search |
//! | `POST`   | `/index/rebuild` | Rebuild the whole index from the catalog |
//! | `POST`   | `/index/products/{id}` | Index (or remove, if unpublished) one product |
//! | `DELETE` | `/index/products/{id}` | Remove one product from the index |
//! | `GET`    | `/health` | Health check (returns version) |
//!
//! When `lang` is absent, the first `Accept-Language` tag is used as the
//! caller's working language. `language` and `facetString` are accepted as
//! aliases of `lang` and `facets`.
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "query must not be empty" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404),
//! `backend_unavailable` (503), `internal` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted.

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use product_search_core::assembler::SearchResponseModel;
use product_search_core::error::{IndexError, SearchError};
use product_search_core::indexing::ReindexReport;
use product_search_core::search::{search_products, SearchContext, SearchRequest};
use product_search_core::store::SearchStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::Instrument;

use crate::catalog::{load_catalog, CatalogFile};
use crate::config::Config;
use crate::index_cmd::{self, ProductIndexOutcome};
use crate::solr::SolrClient;

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn SearchStore>,
    pub catalog: Arc<CatalogFile>,
}

/// Build the router. Separate from [`run_server`] so tests can serve it
/// on an ephemeral port with any store.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/search", get(handle_search))
        .route("/index/rebuild", post(handle_rebuild))
        .route(
            "/index/products/{id}",
            post(handle_index_product).delete(handle_delete_product),
        )
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state)
}

/// Starts the HTTP server on `[server].bind` and runs until terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let store = SolrClient::new(&config.solr)?;
    let catalog = load_catalog(&config.catalog.path)?;

    let state = AppState {
        config: Arc::new(config.clone()),
        store: Arc::new(store),
        catalog: Arc::new(catalog),
    };

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(bind = %bind_addr, solr = %config.solr.core_url(), "product search server listening");
    println!("Product search server listening on http://{}", bind_addr);

    axum::serve(listener, router(state)).await?;
    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    /// Machine-readable error code (e.g., `"bad_request"`, `"not_found"`).
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

fn app_error(status: StatusCode, code: &str, message: impl Into<String>) -> AppError {
    AppError {
        status,
        code: code.to_string(),
        message: message.into(),
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    app_error(StatusCode::BAD_REQUEST, "bad_request", message)
}

fn not_found(message: impl Into<String>) -> AppError {
    app_error(StatusCode::NOT_FOUND, "not_found", message)
}

fn backend_unavailable(message: impl Into<String>) -> AppError {
    app_error(StatusCode::SERVICE_UNAVAILABLE, "backend_unavailable", message)
}

impl From<SearchError> for AppError {
    fn from(err: SearchError) -> Self {
        match err {
            SearchError::EmptyQuery => bad_request(err.to_string()),
            SearchError::BackendUnavailable(_) | SearchError::DeadlineExceeded => {
                backend_unavailable(err.to_string())
            }
        }
    }
}

impl From<IndexError> for AppError {
    fn from(err: IndexError) -> Self {
        match err {
            IndexError::Store(_) => backend_unavailable(err.to_string()),
            IndexError::InvalidProduct { .. } => bad_request(err.to_string()),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        if let Some(index_err) = err.downcast_ref::<IndexError>() {
            return index_err.clone().into();
        }
        app_error(StatusCode::INTERNAL_SERVER_ERROR, "internal", err.to_string())
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ GET /search ============

/// `facetString` and `language` are the parameter names older storefront
/// URLs use.
#[derive(Debug, Deserialize)]
struct SearchParams {
    #[serde(default)]
    q: String,
    #[serde(default, alias = "facetString")]
    facets: Option<String>,
    #[serde(default, alias = "language")]
    lang: Option<String>,
}

/// First language tag of an `Accept-Language` header (`de-CH,de;q=0.9` → `de-CH`).
fn accept_language(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::ACCEPT_LANGUAGE)?.to_str().ok()?;
    let tag = value.split(',').next()?.split(';').next()?.trim();
    (!tag.is_empty() && tag != "*").then(|| tag.to_string())
}

async fn handle_search(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponseModel>, AppError> {
    let request_id = uuid::Uuid::new_v4();

    let request = SearchRequest {
        q: params.q,
        language: params.lang.filter(|l| !l.trim().is_empty()),
        facets: params.facets.unwrap_or_default(),
        return_facets: None,
    };
    let context = SearchContext {
        working_language: accept_language(&headers),
        timeout: Some(state.config.server.request_timeout()),
    };

    let response = search_products(
        state.store.as_ref(),
        state.catalog.as_ref(),
        &request,
        &context,
        &state.config.search,
    )
    .instrument(tracing::info_span!("search", %request_id))
    .await?;

    Ok(Json(response))
}

// ============ Index endpoints ============

async fn handle_rebuild(State(state): State<AppState>) -> Result<Json<ReindexReport>, AppError> {
    let report = index_cmd::rebuild(state.store.as_ref(), &state.catalog, &state.config).await?;
    Ok(Json(report))
}

#[derive(Serialize)]
struct ProductIndexResponse {
    id: i64,
    outcome: ProductIndexOutcome,
}

async fn handle_index_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ProductIndexResponse>, AppError> {
    if state.catalog.product(id).is_none() {
        return Err(not_found(format!("product {} not found in catalog", id)));
    }
    let outcome =
        index_cmd::index_product(state.store.as_ref(), &state.catalog, &state.config, id).await?;
    Ok(Json(ProductIndexResponse { id, outcome }))
}

async fn handle_delete_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ProductIndexResponse>, AppError> {
    index_cmd::remove_product(state.store.as_ref(), id).await?;
    Ok(Json(ProductIndexResponse {
        id,
        outcome: ProductIndexOutcome::Removed,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_accept_language() {
        let mut headers = HeaderMap::new();
        assert_eq!(accept_language(&headers), None);
        headers.insert(
            header::ACCEPT_LANGUAGE,
            HeaderValue::from_static("de-CH,de;q=0.9,en;q=0.8"),
        );
        assert_eq!(accept_language(&headers).as_deref(), Some("de-CH"));
        headers.insert(header::ACCEPT_LANGUAGE, HeaderValue::from_static("*"));
        assert_eq!(accept_language(&headers), None);
    }

    #[test]
    fn test_search_params_accept_legacy_names() {
        let Query(params): Query<SearchParams> = Query::try_from_uri(
            &"/search?q=shoe&language=de-DE&facetString=allcategories:1"
                .parse::<axum::http::Uri>()
                .unwrap(),
        )
        .unwrap();
        assert_eq!(params.lang.as_deref(), Some("de-DE"));
        assert_eq!(params.facets.as_deref(), Some("allcategories:1"));
    }

    #[test]
    fn test_search_error_mapping() {
        let err: AppError = SearchError::EmptyQuery.into();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        let err: AppError = SearchError::DeadlineExceeded.into();
        assert_eq!(err.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.code, "backend_unavailable");
    }
}
