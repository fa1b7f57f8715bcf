//! ERP portal session client
//!
//! Login is three dependent round trips against the same web-forms page:
//!
//! 1. `GET` the login page
//! 2. post its hidden fields with the username and the "proceed" button
//! 3. post the *new* hidden fields with the password and the "submit" button
//!
//! The portal regenerates its view-state on every response, so each step
//! must use the fields from the response immediately before it.

use std::fmt;
use std::time::Duration;

use log::{debug, info};
use reqwest::{Client as HttpClient, RequestBuilder};

use super::detect::is_authenticated;
use super::fields::HiddenFieldSet;
use crate::config::{LoginForm, PortalConfig};
use crate::error::{Error, PortalError, Result};

const USER_AGENT: &str = concat!("erp-attendance/", env!("CARGO_PKG_VERSION"));

/// Portal login credentials. Only lives for the duration of a login call.
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Performs logins against the configured ERP portal
#[derive(Debug, Clone)]
pub struct ErpClient {
    login_url: String,
    dashboard_url: String,
    timeout: Duration,
    form: LoginForm,
    success_markers: Vec<String>,
}

impl ErpClient {
    /// Create a client from the portal configuration
    pub fn new(config: &PortalConfig) -> Result<Self> {
        Ok(Self {
            login_url: config.login_url()?,
            dashboard_url: config.dashboard_url()?,
            timeout: Duration::from_secs(config.timeout_secs),
            form: config.form.clone(),
            success_markers: config.success_markers.clone(),
        })
    }

    /// Run the login sequence. On success the returned session owns the
    /// cookie jar the portal just authenticated.
    pub async fn login(&self, credentials: &Credentials) -> Result<ErpSession> {
        let http = self.session_http()?;
        let username = credentials.username.as_str();

        debug!("[{}] step 1: GET {}", username, self.login_url);
        let page = fetch_page(http.get(&self.login_url)).await?;
        let fields = extract_fields(&page, username, 1);

        debug!("[{}] step 2: submitting username", username);
        let mut form = fields.into_form();
        form.push((self.form.username_field.clone(), credentials.username.clone()));
        form.push((self.form.proceed_field.clone(), self.form.proceed_value.clone()));
        let page = fetch_page(http.post(&self.login_url).form(&form)).await?;
        let fields = extract_fields(&page, username, 2);

        debug!("[{}] step 3: submitting password", username);
        let mut form = fields.into_form();
        form.push((self.form.password_field.clone(), credentials.password.clone()));
        form.push((self.form.submit_field.clone(), self.form.submit_value.clone()));
        let page = fetch_page(http.post(&self.login_url).form(&form)).await?;

        if !is_authenticated(&page, &self.success_markers) {
            info!("[{}] portal login rejected", username);
            return Err(PortalError::InvalidCredentials.into());
        }

        info!("[{}] portal login succeeded", username);
        Ok(ErpSession {
            http,
            dashboard_url: self.dashboard_url.clone(),
            username: credentials.username.clone(),
        })
    }

    /// A fresh HTTP client with its own cookie jar
    fn session_http(&self) -> Result<HttpClient> {
        HttpClient::builder()
            .timeout(self.timeout)
            .cookie_store(true)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::Other(format!("Failed to build HTTP client: {}", e)))
    }
}

/// An authenticated portal session (one cookie jar, one user)
#[derive(Debug)]
pub struct ErpSession {
    http: HttpClient,
    dashboard_url: String,
    username: String,
}

impl ErpSession {
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Fetch the raw dashboard HTML.
    ///
    /// The portal is not asked whether the session is still alive; an
    /// expired session typically serves the login page with a 200, which
    /// then parses to an empty record.
    pub async fn fetch_dashboard(&self) -> Result<String> {
        debug!("[{}] GET {}", self.username, self.dashboard_url);

        let response = self
            .http
            .get(&self.dashboard_url)
            .send()
            .await
            .map_err(PortalError::from)?;

        let status = response.status();
        if !status.is_success() {
            return Err(PortalError::DashboardFetchFailed(format!("HTTP {}", status)).into());
        }

        let body = response
            .text()
            .await
            .map_err(|e| PortalError::DashboardFetchFailed(format!("Failed to read body: {}", e)))?;
        Ok(body)
    }
}

/// Send one login step and return the body of a successful response
async fn fetch_page(request: RequestBuilder) -> Result<String> {
    let response = request.send().await.map_err(PortalError::from)?;

    let status = response.status();
    if !status.is_success() {
        return Err(PortalError::Unreachable(format!("Login page returned HTTP {}", status)).into());
    }

    let body = response.text().await.map_err(PortalError::from)?;
    Ok(body)
}

fn extract_fields(page: &str, username: &str, step: u8) -> HiddenFieldSet {
    let fields = HiddenFieldSet::extract(page);
    let missing = fields.missing();
    if !missing.is_empty() {
        debug!(
            "[{}] step {} response lacks hidden fields: {}",
            username,
            step,
            missing.join(", ")
        );
    }
    fields
}
