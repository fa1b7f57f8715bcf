//! JSON envelopes shared by every endpoint
//!
//! Success bodies are `{"success": true, ...fields}`, failures are
//! `{"success": false, "error": "<message>"}`.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::error::TokenError;

pub type Payload<T> = Result<Json<Success<T>>, ApiError>;

/// Wrap a value in a success envelope
pub fn proceeds<V: Serialize>(value: V) -> Payload<V> {
    Ok(Json(Success::of(value)))
}

#[derive(Debug, Clone, Serialize)]
pub struct Success<V> {
    success: bool,
    #[serde(flatten)]
    value: V,
}

impl<V: Serialize> Success<V> {
    pub fn of(value: V) -> Self {
        Self {
            success: true,
            value,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Failure {
    success: bool,
    error: String,
}

/// Errors surfaced to API callers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    BadRequest(String),
    InvalidCredentials,
    PortalUnreachable,
    Token(TokenError),
    DashboardFetchFailed,
    NotFound(String),
    Internal,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::InvalidCredentials | ApiError::Token(_) => StatusCode::UNAUTHORIZED,
            ApiError::PortalUnreachable => StatusCode::BAD_GATEWAY,
            ApiError::DashboardFetchFailed | ApiError::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }

    pub fn message(&self) -> String {
        match self {
            ApiError::BadRequest(msg) | ApiError::NotFound(msg) => msg.clone(),
            ApiError::InvalidCredentials => "Invalid credentials".to_string(),
            ApiError::PortalUnreachable => "ERP portal unreachable".to_string(),
            ApiError::Token(err) => err.to_string(),
            ApiError::DashboardFetchFailed => "Dashboard fetch failed".to_string(),
            ApiError::Internal => "Internal server error".to_string(),
        }
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        ApiError::Token(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Failure {
            success: false,
            error: self.message(),
        };
        (self.status(), Json(body)).into_response()
    }
}
