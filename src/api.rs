//! HTTP endpoints. Each scrape route is a thin call-through to the
//! orchestrator with a fixed profile.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::{IntoParams, OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

use crate::error::ScrapeError;
use crate::extractor::ProductFields;
use crate::orchestrator::{ScrapeFailure, ScrapeOrchestrator, ScrapeResult};
use crate::profiles::{self, SiteProfile};

pub const MISSING_URL: &str = "URL é obrigatória";

pub struct AppState {
    pub orchestrator: ScrapeOrchestrator,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ScrapeQuery {
    /// Product page URL
    pub url: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ValidationError {
    pub error: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ApiIndex {
    pub message: String,
    pub endpoints: Endpoints,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Endpoints {
    pub scrape: String,
    pub shopee: String,
    pub mercadolivre: String,
}

#[derive(Debug)]
pub enum ApiError {
    MissingUrl,
    Scrape(ScrapeError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::MissingUrl => (
                StatusCode::BAD_REQUEST,
                Json(ValidationError {
                    error: MISSING_URL.to_string(),
                }),
            )
                .into_response(),
            ApiError::Scrape(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ScrapeFailure::from(&err)),
            )
                .into_response(),
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(index, scrape_generic, scrape_shopee, scrape_mercado_livre),
    components(schemas(
        ApiIndex,
        Endpoints,
        ScrapeResult,
        ProductFields,
        ScrapeFailure,
        ValidationError
    )),
    tags((name = "scraper", description = "Product page scraping API"))
)]
pub struct ApiDoc;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/", get(index))
        .route("/api/scrape", get(scrape_generic))
        .route("/api/shopee", get(scrape_shopee))
        .route("/api/mercadolivre", get(scrape_mercado_livre))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[utoipa::path(
    get,
    path = "/",
    responses((status = 200, description = "Service descriptor", body = ApiIndex)),
    tag = "scraper"
)]
pub async fn index() -> Json<ApiIndex> {
    Json(ApiIndex {
        message: "Shopee Scraper API está funcionando!".to_string(),
        endpoints: Endpoints {
            scrape: "/api/scrape?url=URL_DO_PRODUTO".to_string(),
            shopee: "/api/shopee?url=URL_SHOPEE".to_string(),
            mercadolivre: "/api/mercadolivre?url=URL_ML".to_string(),
        },
    })
}

/// Generic meta-tag and heuristic extraction
#[utoipa::path(
    get,
    path = "/api/scrape",
    params(ScrapeQuery),
    responses(
        (status = 200, description = "Product fields", body = ScrapeResult),
        (status = 400, description = "Missing url", body = ValidationError),
        (status = 500, description = "Browser or page failure", body = ScrapeFailure)
    ),
    tag = "scraper"
)]
pub async fn scrape_generic(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ScrapeQuery>,
) -> Result<Json<ScrapeResult>, ApiError> {
    scrape_with(&state, query, profiles::generic()).await
}

/// Shopee product pages
#[utoipa::path(
    get,
    path = "/api/shopee",
    params(ScrapeQuery),
    responses(
        (status = 200, description = "Product fields", body = ScrapeResult),
        (status = 400, description = "Missing url", body = ValidationError),
        (status = 500, description = "Browser or page failure", body = ScrapeFailure)
    ),
    tag = "scraper"
)]
pub async fn scrape_shopee(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ScrapeQuery>,
) -> Result<Json<ScrapeResult>, ApiError> {
    scrape_with(&state, query, profiles::shopee()).await
}

/// Mercado Livre product pages
#[utoipa::path(
    get,
    path = "/api/mercadolivre",
    params(ScrapeQuery),
    responses(
        (status = 200, description = "Product fields", body = ScrapeResult),
        (status = 400, description = "Missing url", body = ValidationError),
        (status = 500, description = "Browser or page failure", body = ScrapeFailure)
    ),
    tag = "scraper"
)]
pub async fn scrape_mercado_livre(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ScrapeQuery>,
) -> Result<Json<ScrapeResult>, ApiError> {
    scrape_with(&state, query, profiles::mercado_livre()).await
}

async fn scrape_with(
    state: &AppState,
    query: ScrapeQuery,
    profile: &'static SiteProfile,
) -> Result<Json<ScrapeResult>, ApiError> {
    let url = query
        .url
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .ok_or(ApiError::MissingUrl)?;

    let result = state
        .orchestrator
        .scrape(url, profile)
        .await
        .map_err(ApiError::Scrape)?;
    Ok(Json(result))
}
