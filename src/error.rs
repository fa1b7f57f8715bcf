//! Error types for the ERP attendance service

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for ERP attendance operations
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for the application
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Portal(#[from] PortalError),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Operation failed: {0}")]
    Other(String),
}

/// Errors talking to the upstream ERP portal
#[derive(Debug, Error)]
pub enum PortalError {
    /// Network failure, timeout or non-success status during login.
    /// Worth retrying later; says nothing about the credentials.
    #[error("ERP portal unreachable: {0}")]
    Unreachable(String),

    /// The login sequence completed but no success marker was found.
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Dashboard fetch failed: {0}")]
    DashboardFetchFailed(String),
}

impl From<reqwest::Error> for PortalError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            PortalError::Unreachable("Request timed out".to_string())
        } else if err.is_connect() {
            PortalError::Unreachable("Failed to connect to ERP portal".to_string())
        } else {
            PortalError::Unreachable(err.to_string())
        }
    }
}

/// Bearer token verification failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("Token missing")]
    Missing,

    #[error("Token expired")]
    Expired,

    #[error("Token invalid")]
    Invalid,
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("ERP portal URL not configured. Set `portal.base_url` or ERP_PORTAL_URL.")]
    MissingPortalUrl,

    #[error("Token secret not configured. Set `token.secret` or ERP_TOKEN_SECRET.")]
    MissingTokenSecret,
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}
