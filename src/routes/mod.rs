use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::auth::CredentialManager;
use crate::error::ApiError;
use crate::gateway::ClassroomGateway;
use crate::middleware;
use crate::models::responses::{AssignmentsResponse, CoursesResponse};

/// Application version from Cargo.toml
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub credentials: Arc<CredentialManager>,
    pub gateway: Arc<ClassroomGateway>,
}

/// Health check routes (no credential required)
pub fn health_routes() -> Router {
    Router::new().route("/health", get(health_handler))
}

/// Classroom proxy routes
pub fn classroom_routes(state: AppState) -> Router {
    Router::new()
        .route("/home", get(home_handler))
        .route("/assignments", get(assignments_handler))
        .with_state(state)
}

/// Build the application with all routes and middleware
pub fn build_app(state: AppState, cors_origins: &[String]) -> Router {
    Router::new()
        .merge(health_routes())
        .merge(classroom_routes(state))
        .layer(middleware::cors_layer(cors_origins))
        .layer(TraceLayer::new_for_http())
}

/// GET /health - Liveness check
async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
        "version": VERSION
    }))
}

/// GET /home - First ten courses
async fn home_handler(State(state): State<AppState>) -> Result<Json<CoursesResponse>, ApiError> {
    tracing::info!("Request to /home");

    let credential = state.credentials.ensure_credential().await?;
    let courses = state.gateway.list_courses(&credential).await?;

    Ok(Json(courses))
}

/// GET /assignments - Course work grouped by course
///
/// One upstream call per course; a course whose call fails is reported with
/// an `error` field instead of failing the request.
async fn assignments_handler(
    State(state): State<AppState>,
) -> Result<Json<AssignmentsResponse>, ApiError> {
    tracing::info!("Request to /assignments");

    let credential = state.credentials.ensure_credential().await?;
    let assignments = state.gateway.list_assignments(&credential).await?;

    Ok(Json(assignments))
}
