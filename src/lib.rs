//! ERP attendance service
//!
//! Logs in to a college ERP (an ASP.NET web-forms portal) on behalf of a
//! student, scrapes the attendance dashboard, and serves the result as JSON
//! behind short-lived bearer tokens.

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod portal;
pub mod session;
pub mod token;

pub use error::{Error, Result};
