//! HTTP API.
//!
//! - `GET /health`
//! - `GET /topic-flow?owner_id=..`
//! - `POST /topic-flow/update?owner_id=..&mode=incremental|full`
//! - `POST /topic-flow/reset?owner_id=..`

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;
use topicflow_types::{GraphSnapshot, OwnerId};

use crate::error::ServiceError;
use crate::mode::UpdateMode;
use crate::orchestrator::{FlowOrchestrator, UpdateOutcome};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<FlowOrchestrator>,
}

impl AppState {
    pub fn new(orchestrator: Arc<FlowOrchestrator>) -> Self {
        Self { orchestrator }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/topic-flow", get(get_topic_flow))
        .route("/topic-flow/update", post(update_topic_flow))
        .route("/topic-flow/reset", post(reset_topic_flow))
        .merge(health_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub module: String,
    pub version: String,
}

/// GET /health
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        module: "topicflow".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Build health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

/// Owner selector shared by every topic-flow route
#[derive(Debug, Deserialize)]
pub struct OwnerQuery {
    pub owner_id: Option<String>,
}

/// Query parameters for an update run
#[derive(Debug, Deserialize)]
pub struct UpdateQuery {
    pub owner_id: Option<String>,
    pub mode: Option<String>,
}

fn owner_from(raw: Option<&str>) -> Result<OwnerId, ServiceError> {
    Ok(OwnerId::require(raw)?)
}

/// GET /topic-flow
pub async fn get_topic_flow(
    State(state): State<AppState>,
    Query(query): Query<OwnerQuery>,
) -> Result<Json<GraphSnapshot>, ServiceError> {
    let owner = owner_from(query.owner_id.as_deref())?;
    let snapshot = state.orchestrator.get_current(&owner).await?;
    Ok(Json(snapshot))
}

/// POST /topic-flow/update
pub async fn update_topic_flow(
    State(state): State<AppState>,
    Query(query): Query<UpdateQuery>,
) -> Result<Json<UpdateOutcome>, ServiceError> {
    let owner = owner_from(query.owner_id.as_deref())?;
    let mode = match query.mode.as_deref() {
        Some(raw) => raw.parse::<UpdateMode>()?,
        None => UpdateMode::Incremental,
    };
    let outcome = state.orchestrator.update(&owner, mode).await?;
    Ok(Json(outcome))
}

/// POST /topic-flow/reset
pub async fn reset_topic_flow(
    State(state): State<AppState>,
    Query(query): Query<OwnerQuery>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    let owner = owner_from(query.owner_id.as_deref())?;
    state.orchestrator.reset(&owner).await?;
    Ok(Json(json!({ "status": "ok", "owner_id": owner.as_str() })))
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = if self.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            warn!(error = %self, "Request failed");
            StatusCode::INTERNAL_SERVER_ERROR
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
