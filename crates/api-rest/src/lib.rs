//! # API REST
//!
//! REST API for the ward census.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON bodies, API key and role headers, status codes, CORS)
//!
//! All record semantics live in `ward-core`; handlers only translate between HTTP and
//! [`CensusService`] calls. Deleting records is restricted to admins here, on top of the
//! core's manage-records check.

#![warn(rust_2018_idioms)]

pub mod auth;
pub mod dto;
pub mod error;
pub mod handlers;

use axum::routing::{get, post, put};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use ward_core::CensusService;

/// Shared state for request handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    pub service: CensusService,
    pub api_key: Arc<str>,
}

impl AppState {
    pub fn new(service: CensusService, api_key: impl Into<Arc<str>>) -> Self {
        Self {
            service,
            api_key: api_key.into(),
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        handlers::options,
        handlers::list_census,
        handlers::census_next_serial,
        handlers::admit,
        handlers::update_census,
        handlers::archive,
        handlers::delete_census,
        handlers::list_mortality,
        handlers::mortality_next_serial,
        handlers::update_mortality,
        handlers::delete_mortality,
    ),
    components(schemas(
        dto::HealthRes,
        dto::AdmissionReq,
        dto::ArchiveReq,
        dto::RecordRes,
        dto::RecordListRes,
        dto::NextSerialRes,
        dto::OptionsRes,
        dto::UnitOption,
        error::ErrorBody,
        error::ErrorDetail,
    ))
)]
pub struct ApiDoc;

/// Builds the application router, including Swagger UI at `/swagger-ui`.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/options", get(handlers::options))
        .route(
            "/units/:unit/census",
            get(handlers::list_census).post(handlers::admit),
        )
        .route(
            "/units/:unit/census/next-serial",
            get(handlers::census_next_serial),
        )
        .route(
            "/units/:unit/census/:id",
            put(handlers::update_census).delete(handlers::delete_census),
        )
        .route("/units/:unit/census/:id/archive", post(handlers::archive))
        .route("/units/:unit/mortality", get(handlers::list_mortality))
        .route(
            "/units/:unit/mortality/next-serial",
            get(handlers::mortality_next_serial),
        )
        .route(
            "/units/:unit/mortality/:id",
            put(handlers::update_mortality).delete(handlers::delete_mortality),
        )
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
