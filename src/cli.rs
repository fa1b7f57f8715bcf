//! Command-line interface

use clap::{Parser, Subcommand};

use crate::config::{Config, Overrides};
use crate::error::Result;
use crate::portal::{Credentials, DashboardParser, ErpClient};

/// Attendance API backed by the college ERP portal
#[derive(Parser, Debug)]
#[command(name = "erp-attendance")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Override config file location
    #[arg(long, global = true, env = "ERP_CONFIG", hide_env = true)]
    pub config: Option<String>,

    /// ERP portal base URL
    #[arg(long, global = true, env = "ERP_PORTAL_URL", hide_env = true)]
    pub portal_url: Option<String>,

    /// Secret used to sign API tokens
    #[arg(long, global = true, env = "ERP_TOKEN_SECRET", hide_env_values = true)]
    pub token_secret: Option<String>,

    /// Timeout in seconds for each portal request
    #[arg(long, global = true, env = "ERP_TIMEOUT_SECS", hide_env = true)]
    pub timeout_secs: Option<u64>,

    /// Enable debug logging
    #[arg(long, global = true, env = "ERP_DEBUG", hide_env = true)]
    pub debug: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the attendance API server
    Serve {
        /// Address to listen on, e.g. 127.0.0.1:8080
        #[arg(long, env = "ERP_BIND", hide_env = true)]
        bind: Option<String>,

        /// Listen on 0.0.0.0:<PORT> (ignored when --bind is given)
        #[arg(long, env = "PORT", hide_env = true)]
        port: Option<u16>,
    },

    /// Log in once and print the attendance record as JSON
    Attendance {
        /// Portal username (roll number)
        username: String,

        /// Portal password
        #[arg(long, env = "ERP_PASSWORD", hide_env_values = true)]
        password: String,
    },
}

impl Cli {
    /// Settings that take precedence over the config file
    pub fn overrides(&self) -> Overrides {
        let bind = match &self.command {
            Commands::Serve { bind: Some(bind), .. } => Some(bind.clone()),
            Commands::Serve {
                port: Some(port), ..
            } => Some(format!("0.0.0.0:{}", port)),
            _ => None,
        };

        Overrides {
            portal_url: self.portal_url.clone(),
            token_secret: self.token_secret.clone(),
            timeout_secs: self.timeout_secs,
            bind,
        }
    }
}

/// One-shot login, fetch and parse; prints the record to stdout
pub async fn print_attendance(config: &Config, username: &str, password: &str) -> Result<()> {
    let client = ErpClient::new(&config.portal)?;
    let parser = DashboardParser::new(&config.portal.dashboard)?;

    let session = client.login(&Credentials::new(username, password)).await?;
    let html = session.fetch_dashboard().await?;
    let record = parser.parse(&html).into_record();

    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}
