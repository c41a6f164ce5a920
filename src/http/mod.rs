//! Thin REST collaborator: a router exposing the three operations the orchestrator
//! needs plus a health check.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::Value;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::error;
use uuid::Uuid;

use crate::error::OrchestratorError;
use crate::executor::Executor;
use crate::saga::{Saga, SagaType, TenantId};

#[derive(Clone)]
pub struct AppState {
    pub executor: Arc<Executor>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/sagas", get(list_sagas).post(create_saga))
        .route("/sagas/:transaction_id", get(get_saga))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

async fn health_check() -> Json<Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "saga-orchestrator",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now(),
    }))
}

fn tenant_id_from(state: &AppState, headers: &HeaderMap) -> Result<TenantId, StatusCode> {
    let header_name = state.executor.config().tenant_header_name.as_str();
    headers
        .get(header_name)
        .and_then(|v| v.to_str().ok())
        .map(TenantId::from)
        .ok_or(StatusCode::BAD_REQUEST)
}

async fn list_sagas(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<Saga>>, StatusCode> {
    let tenant_id = tenant_id_from(&state, &headers)?;
    Ok(Json(state.executor.get_all(&tenant_id).await))
}

async fn get_saga(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(transaction_id): Path<Uuid>,
) -> Result<Json<Saga>, StatusCode> {
    let tenant_id = tenant_id_from(&state, &headers)?;
    match state.executor.get_by_id(&tenant_id, transaction_id).await {
        Some(saga) => Ok(Json(saga)),
        None => Err(StatusCode::NOT_FOUND),
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateSagaRequest {
    pub transaction_id: Option<Uuid>,
    pub saga_type: SagaType,
    pub initiated_by: String,
    pub steps: Vec<crate::saga::Step>,
}

async fn create_saga(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CreateSagaRequest>,
) -> Result<Json<Value>, StatusCode> {
    let tenant_id = tenant_id_from(&state, &headers)?;
    let transaction_id = request.transaction_id.unwrap_or_else(Uuid::new_v4);

    let saga = Saga::new(
        transaction_id,
        request.saga_type,
        request.initiated_by,
        request.steps,
    )
    .map_err(error_to_status)?;

    state
        .executor
        .put(&tenant_id, saga)
        .await
        .map_err(error_to_status)?;

    Ok(Json(serde_json::json!({ "transaction_id": transaction_id })))
}

fn error_to_status(err: OrchestratorError) -> StatusCode {
    error!(error = %err, category = err.category(), "request failed");
    match err {
        OrchestratorError::Absent { .. } => StatusCode::NOT_FOUND,
        OrchestratorError::InvalidPayload { .. } | OrchestratorError::ValidationFailure { .. } => {
            StatusCode::BAD_REQUEST
        }
        OrchestratorError::DispatchFailure { .. } | OrchestratorError::RemoteFailure { .. } => {
            StatusCode::BAD_GATEWAY
        }
        OrchestratorError::CompensationFailure { .. } | OrchestratorError::InvariantViolation { .. } => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
