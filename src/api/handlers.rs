//! Route handlers

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::Uri;
use log::{error, info, warn};
use serde::{Deserialize, Serialize};

use super::AppState;
use super::auth::AuthenticatedUser;
use super::response::{ApiError, Payload, proceeds};
use crate::error::{Error, PortalError};
use crate::portal::{AttendanceRecord, Credentials, SubjectRow};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    password: Option<String>,
}

impl LoginRequest {
    fn credentials(self) -> Option<Credentials> {
        let username = self.username?.trim().to_string();
        let password = self.password?;
        if username.is_empty() || password.trim().is_empty() {
            return None;
        }
        Some(Credentials::new(username, password))
    }
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    token: String,
}

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    data: AttendanceRecord,
}

#[derive(Debug, Serialize)]
pub struct AttendanceResponse {
    attendance: Vec<SubjectRow>,
}

#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    logged_out: bool,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: &'static str,
    sessions: usize,
}

/// POST /api/login
pub async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Payload<LoginResponse> {
    let Json(request) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let credentials = request
        .credentials()
        .ok_or_else(|| ApiError::BadRequest("Username and password required".to_string()))?;

    let session = state.portal.login(&credentials).await.map_err(|err| match err {
        Error::Portal(PortalError::InvalidCredentials) => ApiError::InvalidCredentials,
        Error::Portal(PortalError::Unreachable(reason)) => {
            warn!("[{}] ERP portal unreachable: {}", credentials.username, reason);
            ApiError::PortalUnreachable
        }
        other => {
            error!("[{}] login failed: {}", credentials.username, other);
            ApiError::Internal
        }
    })?;
    let issued = state.tokens.issue(&credentials.username).map_err(|e| {
        error!("[{}] failed to issue token: {}", credentials.username, e);
        ApiError::Internal
    })?;
    state.sessions.insert(session, issued.expires_at).await;
    info!(
        "[{}] issued token valid until {}",
        credentials.username, issued.expires_at
    );

    proceeds(LoginResponse {
        token: issued.token,
    })
}

/// GET /api/dashboard
pub async fn dashboard(
    State(state): State<AppState>,
    AuthenticatedUser(username): AuthenticatedUser,
) -> Payload<DashboardResponse> {
    let data = fetch_record(&state, &username).await?;
    proceeds(DashboardResponse { data })
}

/// GET /api/attendance
pub async fn attendance(
    State(state): State<AppState>,
    AuthenticatedUser(username): AuthenticatedUser,
) -> Payload<AttendanceResponse> {
    let record = fetch_record(&state, &username).await?;
    proceeds(AttendanceResponse {
        attendance: record.subjects,
    })
}

/// POST /api/logout
pub async fn logout(
    State(state): State<AppState>,
    AuthenticatedUser(username): AuthenticatedUser,
) -> Payload<LogoutResponse> {
    let logged_out = state.sessions.remove(&username).await;
    info!("[{}] logout (session dropped: {})", username, logged_out);
    proceeds(LogoutResponse { logged_out })
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Payload<HealthResponse> {
    proceeds(HealthResponse {
        status: "ok",
        sessions: state.sessions.len().await,
    })
}

pub async fn not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(format!("Invalid path: {}", uri))
}

/// Fetch and parse the dashboard through the user's stored portal session.
///
/// The session mutex is held for the whole fetch so requests for the same
/// user take turns on its cookie jar.
async fn fetch_record(state: &AppState, username: &str) -> Result<AttendanceRecord, ApiError> {
    let session = state.sessions.get(username).await.ok_or_else(|| {
        warn!("[{}] no portal session; log in again", username);
        ApiError::DashboardFetchFailed
    })?;

    let guard = session.lock().await;
    let html = guard.fetch_dashboard().await.map_err(|e| {
        warn!("[{}] {}", username, e);
        ApiError::DashboardFetchFailed
    })?;
    drop(guard);

    Ok(state.parser.parse(&html).into_record())
}
