//! HTTP route handlers.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use tracing::warn;

use crate::domain::{InvalidServiceUid, ServiceUid};
use crate::rtt::TimetableSource;

use super::dto::*;
use super::state::AppState;

/// Create the status router.
pub fn create_router<S>(state: AppState<S>) -> Router
where
    S: TimetableSource + 'static,
{
    Router::new()
        .route("/health", get(health))
        .route("/jobs", get(list_jobs::<S>))
        .route("/trains", get(list_trains::<S>))
        .route("/trains/:uid", get(get_train::<S>))
        .with_state(state)
}

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// Pending message jobs, soonest first.
async fn list_jobs<S>(State(state): State<AppState<S>>) -> Json<JobsResponse> {
    let jobs = state
        .ctx
        .scheduler
        .list_jobs()
        .await
        .iter()
        .map(JobResult::from_summary)
        .collect();

    Json(JobsResponse { jobs })
}

/// Every tracked train.
async fn list_trains<S>(State(state): State<AppState<S>>) -> Json<TrainsResponse> {
    let trains = state
        .ctx
        .trains()
        .await
        .iter()
        .map(TrainResult::from_train)
        .collect();

    Json(TrainsResponse { trains })
}

/// Tracked runs of one service uid.
async fn get_train<S>(
    State(state): State<AppState<S>>,
    Path(uid): Path<String>,
) -> Result<Json<TrainsResponse>, AppError> {
    let uid = ServiceUid::new(uid)?;

    let trains: Vec<TrainResult> = state
        .ctx
        .trains()
        .await
        .iter()
        .filter(|t| t.uid() == &uid)
        .map(TrainResult::from_train)
        .collect();

    if trains.is_empty() {
        return Err(AppError::NotFound {
            message: format!("train {uid} is not tracked"),
        });
    }

    Ok(Json(TrainsResponse { trains }))
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    BadRequest { message: String },
    NotFound { message: String },
}

impl From<InvalidServiceUid> for AppError {
    fn from(e: InvalidServiceUid) -> Self {
        AppError::BadRequest {
            message: e.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest { message } => (StatusCode::BAD_REQUEST, message),
            AppError::NotFound { message } => (StatusCode::NOT_FOUND, message),
        };

        warn!(%status, %message, "status request failed");

        let body = Json(ErrorResponse { error: message });
        (status, body).into_response()
    }
}
