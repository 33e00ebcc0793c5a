//! REST handlers: record and user CRUD, the on-demand aggregate endpoint,
//! and the diagnostics log query.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use pulse_core::ids::{RecordId, UserId};
use pulse_core::records::{StatusRecord, UserRecord};
use pulse_core::summary::StatusSummary;
use pulse_store::{RecordPatch, StoreError, UserPatch};
use pulse_telemetry::{LogQuery, LogRecord};

use crate::server::AppState;

/// Store failure mapped onto an HTTP response. `NotFound` is the only
/// per-record condition; everything else means the store could not serve
/// the request.
pub struct ApiError(StoreError);

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            StoreError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self.0, "request failed");
        }
        let body = serde_json::json!({ "error": self.0.to_string() });
        (status, Json(body)).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateRecord {
    pub name: String,
    pub age: Option<i64>,
    pub status: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateRecord {
    pub name: Option<String>,
    pub age: Option<i64>,
    pub status: Option<String>,
}

pub async fn list_records(
    State(state): State<AppState>,
) -> Result<Json<Vec<StatusRecord>>, ApiError> {
    Ok(Json(state.repo.list()?))
}

pub async fn create_record(
    State(state): State<AppState>,
    Json(body): Json<CreateRecord>,
) -> Result<(StatusCode, Json<StatusRecord>), ApiError> {
    let record = state.repo.create(&body.name, body.age, &body.status)?;
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn get_record(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<StatusRecord>, ApiError> {
    let record = state.repo.get(&RecordId::from_raw(id))?;
    Ok(Json(record))
}

pub async fn update_record(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<UpdateRecord>,
) -> Result<Json<StatusRecord>, ApiError> {
    let patch = RecordPatch {
        name: body.name,
        age: body.age,
        status: body.status,
    };
    let record = state.repo.update(&RecordId::from_raw(id), &patch)?;
    Ok(Json(record))
}

pub async fn delete_record(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.repo.delete(&RecordId::from_raw(id))?;
    Ok(Json(serde_json::json!({ "message": "record deleted" })))
}

#[derive(Debug, Deserialize)]
pub struct CreateUser {
    pub name: String,
    pub email: String,
    pub age: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateUser {
    pub name: Option<String>,
    pub email: Option<String>,
    pub age: Option<i64>,
}

pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<UserRecord>>, ApiError> {
    Ok(Json(state.users.list()?))
}

pub async fn create_user(
    State(state): State<AppState>,
    Json(body): Json<CreateUser>,
) -> Result<(StatusCode, Json<UserRecord>), ApiError> {
    let user = state.users.create(&body.name, &body.email, body.age)?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<UserRecord>, ApiError> {
    let user = state.users.get(&UserId::from_raw(id))?;
    Ok(Json(user))
}

pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<UpdateUser>,
) -> Result<Json<UserRecord>, ApiError> {
    let patch = UserPatch {
        name: body.name,
        email: body.email,
        age: body.age,
    };
    let user = state.users.update(&UserId::from_raw(id), &patch)?;
    Ok(Json(user))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.users.delete(&UserId::from_raw(id))?;
    Ok(Json(serde_json::json!({ "message": "user deleted" })))
}

#[derive(Debug, Default, Deserialize)]
pub struct LogsParams {
    pub level: Option<String>,
    pub target: Option<String>,
    pub since: Option<String>,
    pub limit: Option<u32>,
}

/// Query the persisted warn+ logs. 404 when log persistence is disabled.
pub async fn diagnostics_logs(
    State(state): State<AppState>,
    Query(params): Query<LogsParams>,
) -> Response {
    let Some(sink) = &state.logs else {
        let body = serde_json::json!({ "error": "log database disabled" });
        return (StatusCode::NOT_FOUND, Json(body)).into_response();
    };

    let query = LogQuery {
        level: params.level,
        target: params.target,
        since: params.since,
        limit: params.limit,
    };
    match sink.query(&query) {
        Ok(records) => Json::<Vec<LogRecord>>(records).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "log query failed");
            let body = serde_json::json!({ "error": e.to_string() });
            (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
        }
    }
}

/// On-demand aggregate, computed fresh per request. `StoreUnavailable`
/// surfaces here as a 500, unlike on the streaming path where a failed
/// cycle is just skipped.
pub async fn status_counts(
    State(state): State<AppState>,
) -> Result<Json<StatusSummary>, ApiError> {
    Ok(Json(state.repo.status_counts()?))
}

pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "clients": state.registry.count(),
    }))
}
