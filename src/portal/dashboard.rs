//! Student dashboard scraping
//!
//! Extraction is structural: elements are located by the selectors in
//! [`DashboardLayout`]. When the portal markup drifts, the affected fields
//! come back empty and are listed in [`ParsedDashboard::missing`] instead of
//! failing the whole request.

use std::fmt;

use log::warn;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};

use crate::config::DashboardLayout;
use crate::error::{ConfigError, Result};

/// Subject table rows need at least this many cells:
/// serial no, subject, faculty, held, attended, percentage.
pub const SUBJECT_COLUMNS: usize = 6;

const COL_SUBJECT: usize = 1;
const COL_FACULTY: usize = 2;
const COL_HELD: usize = 3;
const COL_ATTENDED: usize = 4;
const COL_PERCENTAGE: usize = 5;

/// One subject's attendance, exactly as the portal renders it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectRow {
    pub subject: String,
    pub faculty: String,
    pub held: String,
    pub attended: String,
    pub percentage: String,
}

/// Attendance summary scraped from one dashboard page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub student_name: String,
    pub attendance_percentage: String,
    pub subjects: Vec<SubjectRow>,
}

/// Dashboard elements that can go missing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashboardField {
    StudentName,
    AttendancePercentage,
    SubjectTable,
}

impl fmt::Display for DashboardField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DashboardField::StudentName => "student_name",
            DashboardField::AttendancePercentage => "attendance_percentage",
            DashboardField::SubjectTable => "subject_table",
        };
        f.write_str(name)
    }
}

/// Parse result: the record plus the fields that had to be defaulted
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedDashboard {
    pub record: AttendanceRecord,
    pub missing: Vec<DashboardField>,
}

impl ParsedDashboard {
    /// True when every expected element was found
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }

    /// Take the record, logging any defaulted fields as a data-quality warning
    pub fn into_record(self) -> AttendanceRecord {
        for field in &self.missing {
            warn!(
                "Dashboard element `{}` not found; portal markup may have changed",
                field
            );
        }
        self.record
    }
}

/// Compiled selectors for one dashboard layout
#[derive(Debug, Clone)]
pub struct DashboardParser {
    student_name: Selector,
    attendance_percentage: Selector,
    subject_table: Selector,
    row: Selector,
}

impl DashboardParser {
    /// Compile the layout's selectors
    pub fn new(layout: &DashboardLayout) -> Result<Self> {
        Ok(Self {
            student_name: selector("student_name", &layout.student_name)?,
            attendance_percentage: selector("attendance_percentage", &layout.attendance_percentage)?,
            subject_table: selector("subject_table", &layout.subject_table)?,
            row: selector("row", "tr")?,
        })
    }

    /// Parse a dashboard document. Never fails.
    pub fn parse(&self, html: &str) -> ParsedDashboard {
        let document = Html::parse_document(html);
        let mut missing = Vec::new();

        let student_name = self.label_text(&document, &self.student_name);
        if student_name.is_empty() {
            missing.push(DashboardField::StudentName);
        }

        let attendance_percentage = self.label_text(&document, &self.attendance_percentage);
        if attendance_percentage.is_empty() {
            missing.push(DashboardField::AttendancePercentage);
        }

        let subjects = match document.select(&self.subject_table).next() {
            Some(table) => self.subject_rows(table),
            None => {
                missing.push(DashboardField::SubjectTable);
                Vec::new()
            }
        };

        ParsedDashboard {
            record: AttendanceRecord {
                student_name,
                attendance_percentage,
                subjects,
            },
            missing,
        }
    }

    fn label_text(&self, document: &Html, selector: &Selector) -> String {
        document
            .select(selector)
            .next()
            .map(element_text)
            .unwrap_or_default()
    }

    fn subject_rows(&self, table: ElementRef<'_>) -> Vec<SubjectRow> {
        // Rows and cells of nested tables belong to those tables, not this one.
        table
            .select(&self.row)
            .filter(|row| owning_table(*row).map(|t| t.id()) == Some(table.id()))
            .skip(1) // header
            .filter_map(|row| {
                let cells: Vec<String> = row
                    .children()
                    .filter_map(ElementRef::wrap)
                    .filter(|cell| cell.value().name() == "td")
                    .map(element_text)
                    .collect();
                if cells.len() < SUBJECT_COLUMNS {
                    return None;
                }
                Some(SubjectRow {
                    subject: cells[COL_SUBJECT].clone(),
                    faculty: cells[COL_FACULTY].clone(),
                    held: cells[COL_HELD].clone(),
                    attended: cells[COL_ATTENDED].clone(),
                    percentage: cells[COL_PERCENTAGE].clone(),
                })
            })
            .collect()
    }
}

fn selector(name: &str, css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| {
        ConfigError::Invalid(format!("dashboard selector `{}` ({}): {:?}", name, css, e)).into()
    })
}

/// The closest enclosing `<table>` of a row
fn owning_table(row: ElementRef<'_>) -> Option<ElementRef<'_>> {
    row.ancestors()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "table")
}

/// Visible text of an element with whitespace runs collapsed
fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}
