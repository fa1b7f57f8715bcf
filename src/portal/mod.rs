//! ERP portal client
//!
//! Drives the web-forms login postbacks against the college ERP and scrapes
//! attendance data from the student dashboard.

pub mod client;
pub mod dashboard;
pub mod detect;
pub mod fields;

pub use client::{Credentials, ErpClient, ErpSession};
pub use dashboard::{AttendanceRecord, DashboardField, DashboardParser, ParsedDashboard, SubjectRow};
pub use detect::is_authenticated;
pub use fields::HiddenFieldSet;
