//! HTTP API
//!
//! | Route | Auth | Purpose |
//! |---|---|---|
//! | `POST /api/login` | none | log in to the portal, receive a bearer token |
//! | `GET /api/dashboard` | bearer | student name, overall percentage, subjects |
//! | `GET /api/attendance` | bearer | subject rows only |
//! | `POST /api/logout` | bearer | forget the stored portal session |
//! | `GET /health` | none | liveness and session count |

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use chrono::TimeDelta;
use log::info;
use tokio::net::TcpListener;

use crate::config::Config;
use crate::error::{ConfigError, Result};
use crate::portal::{DashboardParser, ErpClient};
use crate::session::SessionRegistry;
use crate::token::TokenIssuer;

pub mod auth;
pub mod handlers;
pub mod response;

pub use auth::AuthenticatedUser;
pub use response::{ApiError, Payload};

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub portal: Arc<ErpClient>,
    pub parser: Arc<DashboardParser>,
    pub tokens: Arc<TokenIssuer>,
    pub sessions: Arc<SessionRegistry>,
}

impl AppState {
    /// Build the state from a validated configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;

        let secret = config
            .token
            .secret
            .as_deref()
            .ok_or(ConfigError::MissingTokenSecret)?;
        let ttl = TimeDelta::try_seconds(config.token.ttl_secs).ok_or_else(|| {
            ConfigError::Invalid(format!("`token.ttl_secs` out of range: {}", config.token.ttl_secs))
        })?;
        let tokens = TokenIssuer::new(secret)?.with_ttl(ttl);

        Ok(Self {
            portal: Arc::new(ErpClient::new(&config.portal)?),
            parser: Arc::new(DashboardParser::new(&config.portal.dashboard)?),
            tokens: Arc::new(tokens),
            sessions: Arc::new(SessionRegistry::new()),
        })
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/login", post(handlers::login))
        .route("/api/logout", post(handlers::logout))
        .route("/api/dashboard", get(handlers::dashboard))
        .route("/api/attendance", get(handlers::attendance))
        .fallback(handlers::not_found)
        .with_state(state)
}

/// Bind the configured address and serve until the process exits
pub async fn serve(config: &Config) -> Result<()> {
    let state = AppState::from_config(config)?;
    let listener = TcpListener::bind(&config.server.bind).await?;

    info!(
        "Serving attendance API on http://{} (portal: {})",
        listener.local_addr()?,
        config.portal.base_url.as_deref().unwrap_or_default()
    );

    axum::serve(listener, build_router(state)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Overrides;
    use crate::error::Error;

    fn config(ttl_secs: i64) -> Config {
        let mut config = Config::default();
        config.apply(Overrides {
            portal_url: Some("http://127.0.0.1:9".to_string()),
            token_secret: Some("s3cret".to_string()),
            ..Overrides::default()
        });
        config.token.ttl_secs = ttl_secs;
        config
    }

    #[test]
    fn test_state_uses_configured_ttl() {
        let state = AppState::from_config(&config(60)).unwrap();
        assert_eq!(state.tokens.ttl(), TimeDelta::seconds(60));
    }

    #[test]
    fn test_oversized_ttl_is_a_config_error() {
        for ttl in [10_000_000_000_000, i64::MAX] {
            assert!(matches!(
                AppState::from_config(&config(ttl)),
                Err(Error::Config(ConfigError::Invalid(_)))
            ));
        }
    }
}
