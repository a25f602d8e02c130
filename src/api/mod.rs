pub mod auth;
pub mod employee;
pub mod health;
pub mod material;

use axum::extract::DefaultBodyLimit;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_rapidoc::RapiDoc;

use crate::app_state::AppState;
use crate::db::queries::employee::EmployeeDoc;
use crate::db::queries::material::MaterialDoc;
use crate::db::queries::teacher::TeacherDoc;

/// OpenAPI document covering every JSON endpoint.
pub fn api_doc() -> utoipa::openapi::OpenApi {
    auth::AuthDoc::openapi()
        .merge_from(MaterialDoc::openapi())
        .merge_from(EmployeeDoc::openapi())
        .merge_from(TeacherDoc::openapi())
}

/// Builds the complete application router.
pub fn router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes;
    let upload_dir = state.config.upload_dir.clone();

    Router::new()
        .merge(health::health_routes())
        .merge(material::material_routes())
        .merge(employee::employee_routes())
        .merge(auth::teacher_routes(state.clone()))
        .merge(RapiDoc::with_openapi("/api-docs/openapi.json", api_doc()).path("/rapidoc"))
        .nest_service("/images", ServeDir::new(upload_dir))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
