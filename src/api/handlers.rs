//! HTTP request handlers

use super::sse::sse_stream;
use super::types::{ConfigureRequest, ErrorResponse};
use super::AppState;
use crate::alerts::GeoFenceAlert;
use crate::catalog::Catalog;
use crate::dashboard::{self, DashboardMetrics};
use crate::insights::{generate_insight, Insight};
use crate::runtime::{ConductorSnapshot, RuntimeError, SseEvent};
use crate::session::{ClosingSummary, Session, Tally, TransitionError};
use crate::store::DbError;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;

/// Create the main router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/catalog", get(get_catalog))
        // Conductor terminal
        .route("/api/conductor", get(get_conductor))
        .route("/api/conductor/configure", post(configure))
        .route("/api/conductor/start", post(start_session))
        .route("/api/conductor/board", post(record_board))
        .route("/api/conductor/alight", post(record_alight))
        .route("/api/conductor/finish", post(finish_session))
        .route("/api/conductor/closing", get(closing_summary))
        .route("/api/conductor/confirm", post(confirm_close))
        // Admin
        .route("/api/sessions", get(list_sessions))
        .route("/api/admin/dashboard", get(get_dashboard))
        .route("/api/admin/alerts", get(list_alerts))
        .route("/api/admin/insights", post(generate_insights))
        .route("/api/admin/stream", get(stream_admin))
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Catalog
// ============================================================

async fn get_catalog(State(state): State<AppState>) -> Json<Catalog> {
    Json(state.catalog.as_ref().clone())
}

// ============================================================
// Conductor
// ============================================================

async fn get_conductor(State(state): State<AppState>) -> Json<ConductorSnapshot> {
    Json(state.runtime.snapshot().await)
}

async fn configure(
    State(state): State<AppState>,
    Json(req): Json<ConfigureRequest>,
) -> Result<Json<ConductorSnapshot>, AppError> {
    let snapshot = state
        .runtime
        .configure(req.vehicle_id, req.route_id, req.turn)
        .await?;
    Ok(Json(snapshot))
}

async fn start_session(State(state): State<AppState>) -> Result<Json<ConductorSnapshot>, AppError> {
    Ok(Json(state.runtime.start().await?))
}

async fn record_board(State(state): State<AppState>) -> Result<Json<Tally>, AppError> {
    Ok(Json(state.runtime.record_board().await?))
}

async fn record_alight(State(state): State<AppState>) -> Result<Json<Tally>, AppError> {
    Ok(Json(state.runtime.record_alight().await?))
}

async fn finish_session(State(state): State<AppState>) -> Result<Json<ClosingSummary>, AppError> {
    Ok(Json(state.runtime.finish().await?))
}

async fn closing_summary(State(state): State<AppState>) -> Result<Json<ClosingSummary>, AppError> {
    Ok(Json(state.runtime.closing_summary().await?))
}

async fn confirm_close(State(state): State<AppState>) -> Result<Json<Session>, AppError> {
    Ok(Json(state.runtime.confirm_close().await?))
}

// ============================================================
// Admin
// ============================================================

async fn list_sessions(State(state): State<AppState>) -> Result<Json<Vec<Session>>, AppError> {
    Ok(Json(state.runtime.sessions().await?))
}

async fn get_dashboard(State(state): State<AppState>) -> Result<Json<DashboardMetrics>, AppError> {
    let sessions = state.runtime.sessions().await?;
    Ok(Json(dashboard::summarize(
        &sessions,
        &state.catalog,
        state.utc_offset,
    )))
}

async fn list_alerts(State(state): State<AppState>) -> Json<Vec<GeoFenceAlert>> {
    Json(state.alerts.recent_alerts(Utc::now()).await)
}

async fn generate_insights(State(state): State<AppState>) -> Result<Json<Insight>, AppError> {
    let sessions = state.runtime.sessions().await?;
    Ok(Json(
        generate_insight(state.summarizer.as_ref(), &sessions).await,
    ))
}

async fn stream_admin(State(state): State<AppState>) -> impl IntoResponse {
    // Subscribe first so nothing between the snapshot and the stream is lost
    let broadcast_rx = state.runtime.subscribe();
    let snapshot = state.runtime.snapshot().await;
    let init_event = SseEvent::Init {
        conductor: serde_json::to_value(snapshot).unwrap_or(serde_json::Value::Null),
    };
    sse_stream(init_event, broadcast_rx)
}

// ============================================================
// Version
// ============================================================

async fn get_version() -> &'static str {
    concat!("fleet-tally ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
    Conflict(String),
    Internal(String),
}

impl From<RuntimeError> for AppError {
    fn from(e: RuntimeError) -> Self {
        match e {
            RuntimeError::Transition(e) => e.into(),
            RuntimeError::Store(e) => e.into(),
        }
    }
}

impl From<TransitionError> for AppError {
    fn from(e: TransitionError) -> Self {
        match e {
            TransitionError::MissingConfiguration(_) => AppError::BadRequest(e.to_string()),
            TransitionError::InvalidTransition { .. } => AppError::Conflict(e.to_string()),
        }
    }
}

impl From<DbError> for AppError {
    fn from(e: DbError) -> Self {
        tracing::error!(error = %e, "Session store failure");
        AppError::Internal(e.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
