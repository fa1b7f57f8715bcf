//! Configuration management for the ERP attendance service
//!
//! Settings come from an optional YAML file and are then overridden by
//! command-line flags / environment variables (see [`Overrides`]).

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};
use crate::portal::DashboardParser;
use crate::token::{MAX_TOKEN_TTL_SECS, TOKEN_TTL_SECS};

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP listener settings
    pub server: ServerConfig,

    /// Upstream ERP portal settings
    pub portal: PortalConfig,

    /// Bearer token settings
    pub token: TokenConfig,
}

/// HTTP listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to bind, e.g. `0.0.0.0:8080`
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Upstream ERP portal settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalConfig {
    /// Portal root, e.g. `https://erp.college.edu`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    pub login_path: String,

    pub dashboard_path: String,

    /// Per-request timeout applied to every portal call
    pub timeout_secs: u64,

    /// Names of the login form controls
    pub form: LoginForm,

    /// Substrings whose presence in the final login response means success
    pub success_markers: Vec<String>,

    /// CSS selectors locating the dashboard elements
    pub dashboard: DashboardLayout,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            login_path: "/Login.aspx".to_string(),
            dashboard_path: "/StudentDashboard.aspx".to_string(),
            timeout_secs: 15,
            form: LoginForm::default(),
            success_markers: vec!["lblUserName".to_string(), "Welcome".to_string()],
            dashboard: DashboardLayout::default(),
        }
    }
}

impl PortalConfig {
    /// Absolute URL of the login page
    pub fn login_url(&self) -> Result<String> {
        self.join(&self.login_path)
    }

    /// Absolute URL of the student dashboard page
    pub fn dashboard_url(&self) -> Result<String> {
        self.join(&self.dashboard_path)
    }

    fn join(&self, path: &str) -> Result<String> {
        let base = self
            .base_url
            .as_deref()
            .filter(|b| !b.trim().is_empty())
            .ok_or(ConfigError::MissingPortalUrl)?;

        Ok(format!(
            "{}/{}",
            base.trim_end_matches('/'),
            path.trim_start_matches('/')
        ))
    }
}

/// Names of the web-forms controls posted during login
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub username_field: String,
    pub proceed_field: String,
    pub proceed_value: String,
    pub password_field: String,
    pub submit_field: String,
    pub submit_value: String,
}

impl Default for LoginForm {
    fn default() -> Self {
        Self {
            username_field: "txtUserName".to_string(),
            proceed_field: "btnNext".to_string(),
            proceed_value: "Next".to_string(),
            password_field: "txtPassword".to_string(),
            submit_field: "btnSubmit".to_string(),
            submit_value: "Submit".to_string(),
        }
    }
}

/// CSS selectors for the dashboard page
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardLayout {
    pub student_name: String,
    pub attendance_percentage: String,
    pub subject_table: String,
}

impl Default for DashboardLayout {
    fn default() -> Self {
        Self {
            student_name: "#lblStudentName".to_string(),
            attendance_percentage: "#lblAttendancePercentage".to_string(),
            subject_table: "#tblSubjectAttendance".to_string(),
        }
    }
}

/// Bearer token settings
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenConfig {
    /// HMAC signing secret shared by every token this process issues
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,

    /// Token lifetime in seconds
    pub ttl_secs: i64,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            secret: None,
            ttl_secs: TOKEN_TTL_SECS,
        }
    }
}

impl fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenConfig")
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .field("ttl_secs", &self.ttl_secs)
            .finish()
    }
}

/// Values supplied on the command line or through the environment.
/// `None` leaves the file/default value untouched.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub portal_url: Option<String>,
    pub token_secret: Option<String>,
    pub timeout_secs: Option<u64>,
    pub bind: Option<String>,
}

impl Config {
    /// Get the default config file path
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or(ConfigError::Invalid(
            "Could not determine home directory".to_string(),
        ))?;

        Ok(home.join(".erp-attendance").join("config.yaml"))
    }

    /// Load configuration from an explicit path, or from the default
    /// location when `path` is `None`.
    ///
    /// An explicit path must exist. A missing default file yields defaults.
    pub fn load_at(path: Option<&str>) -> Result<Self> {
        match path {
            Some(p) => Self::load_from(PathBuf::from(p)),
            None => {
                let default = Self::default_path()?;
                if default.exists() {
                    Self::load_from(default)
                } else {
                    log::debug!("No config file at {}, using defaults", default.display());
                    Ok(Self::default())
                }
            }
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: PathBuf) -> Result<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path).into());
        }

        let contents = std::fs::read_to_string(&path)?;
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config = serde_yaml::from_str(&contents).map_err(ConfigError::from)?;
        log::debug!("Loaded configuration from {}", path.display());

        Ok(config)
    }

    /// Apply command-line / environment overrides
    pub fn apply(&mut self, overrides: Overrides) {
        if let Some(url) = overrides.portal_url {
            self.portal.base_url = Some(url);
        }
        if let Some(secret) = overrides.token_secret {
            self.token.secret = Some(secret);
        }
        if let Some(timeout) = overrides.timeout_secs {
            self.portal.timeout_secs = timeout;
        }
        if let Some(bind) = overrides.bind {
            self.server.bind = bind;
        }
    }

    /// Check that everything needed to serve requests is present and usable
    pub fn validate(&self) -> Result<()> {
        self.portal.login_url()?;

        match self.token.secret.as_deref() {
            Some(s) if !s.trim().is_empty() => {}
            _ => return Err(ConfigError::MissingTokenSecret.into()),
        }

        if self.token.ttl_secs <= 0 {
            return Err(ConfigError::Invalid("`token.ttl_secs` must be positive".to_string()).into());
        }
        if self.token.ttl_secs > MAX_TOKEN_TTL_SECS {
            return Err(ConfigError::Invalid(format!(
                "`token.ttl_secs` must be at most {} (one year)",
                MAX_TOKEN_TTL_SECS
            ))
            .into());
        }

        if self.portal.timeout_secs == 0 {
            return Err(
                ConfigError::Invalid("`portal.timeout_secs` must be positive".to_string()).into(),
            );
        }

        if self.portal.success_markers.iter().all(|m| m.is_empty()) {
            return Err(ConfigError::Invalid(
                "`portal.success_markers` needs at least one non-empty marker".to_string(),
            )
            .into());
        }

        DashboardParser::new(&self.portal.dashboard)?;

        Ok(())
    }
}
