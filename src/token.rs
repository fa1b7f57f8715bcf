//! Signed bearer tokens
//!
//! Tokens are compact HS256 JWTs: `base64url(header).base64url(claims).base64url(mac)`.
//! They are stateless; validity depends only on the signature and `exp`.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use log::debug;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::error::{ConfigError, Error, Result, TokenError};

type HmacSha256 = Hmac<Sha256>;

/// Default token lifetime
pub const TOKEN_TTL_SECS: i64 = 3600;

/// Longest lifetime a configuration may ask for (one year)
pub const MAX_TOKEN_TTL_SECS: i64 = 365 * 24 * 3600;

const HEADER_JSON: &str = r#"{"alg":"HS256","typ":"JWT"}"#;

/// Claims carried by every token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub username: String,
    /// Expiry as a Unix timestamp (seconds)
    pub exp: i64,
}

/// A freshly minted token
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Mints and verifies tokens with one process-wide secret
#[derive(Clone)]
pub struct TokenIssuer {
    mac: HmacSha256,
    header: String,
    ttl: Duration,
}

impl TokenIssuer {
    /// Create an issuer with the default one-hour lifetime
    pub fn new(secret: &str) -> Result<Self> {
        if secret.trim().is_empty() {
            return Err(ConfigError::MissingTokenSecret.into());
        }

        let mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|e| ConfigError::Invalid(format!("token secret: {}", e)))?;

        Ok(Self {
            mac,
            header: URL_SAFE_NO_PAD.encode(HEADER_JSON),
            ttl: Duration::seconds(TOKEN_TTL_SECS),
        })
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a token for `username` valid from now
    pub fn issue(&self, username: &str) -> Result<IssuedToken> {
        self.issue_at(username, Utc::now())
    }

    /// Issue a token for `username` as if the current time were `now`
    pub fn issue_at(&self, username: &str, now: DateTime<Utc>) -> Result<IssuedToken> {
        let expires_at = now.checked_add_signed(self.ttl).ok_or_else(|| {
            Error::Other(format!("token expiry overflows: {} + {}", now, self.ttl))
        })?;
        let claims = Claims {
            username: username.to_string(),
            exp: expires_at.timestamp(),
        };

        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims)?);
        let signing_input = format!("{}.{}", self.header, payload);
        let signature = URL_SAFE_NO_PAD.encode(self.sign(&signing_input));

        Ok(IssuedToken {
            token: format!("{}.{}", signing_input, signature),
            expires_at,
        })
    }

    /// Verify a token against the current time
    pub fn verify(&self, token: &str) -> std::result::Result<Claims, TokenError> {
        self.verify_at(token, Utc::now())
    }

    /// Verify signature and expiry, returning the embedded claims.
    ///
    /// The signature is checked before anything in the payload is trusted,
    /// so a tampered token is `Invalid` even if it also looks expired.
    pub fn verify_at(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> std::result::Result<Claims, TokenError> {
        let mut parts = token.split('.');
        let (Some(header), Some(payload), Some(signature), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            debug!("Rejecting token: not three segments");
            return Err(TokenError::Invalid);
        };

        if header != self.header {
            debug!("Rejecting token: unexpected header");
            return Err(TokenError::Invalid);
        }

        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| TokenError::Invalid)?;

        let mut mac = self.mac.clone();
        mac.update(header.as_bytes());
        mac.update(b".");
        mac.update(payload.as_bytes());
        if mac.verify_slice(&signature).is_err() {
            debug!("Rejecting token: bad signature");
            return Err(TokenError::Invalid);
        }

        let payload = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| TokenError::Invalid)?;
        let claims: Claims = serde_json::from_slice(&payload).map_err(|_| TokenError::Invalid)?;

        if now.timestamp() >= claims.exp {
            debug!("Rejecting token for {}: expired", claims.username);
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }

    fn sign(&self, input: &str) -> Vec<u8> {
        let mut mac = self.mac.clone();
        mac.update(input.as_bytes());
        mac.finalize().into_bytes().to_vec()
    }
}
