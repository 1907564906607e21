//! Spreadsheet import models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use skinior_core::{ImportLogId, UserId};

/// A recorded import run.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ImportLog {
    pub id: ImportLogId,
    pub file_name: String,
    pub imported_by: Option<UserId>,
    /// `processing`, `completed` or `failed`.
    pub status: String,
    pub total_rows: i32,
    pub success_count: i32,
    pub failure_count: i32,
    pub skipped_count: i32,
    pub errors: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// A problem found on one spreadsheet row. Rows are numbered as in the
/// spreadsheet, so the first data row is row 2.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RowIssue {
    pub row: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub message: String,
}

impl RowIssue {
    pub fn new(row: usize, field: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            row,
            field: field.map(str::to_owned),
            message: message.into(),
        }
    }
}

/// `POST /api/admin/products/import` query flags.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ImportOptions {
    #[serde(default = "default_true")]
    pub create_missing_categories: bool,
    #[serde(default = "default_true")]
    pub create_missing_brands: bool,
    #[serde(default)]
    pub dry_run: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            create_missing_categories: true,
            create_missing_brands: true,
            dry_run: false,
        }
    }
}

/// Outcome of an import run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportReport {
    pub total_rows: usize,
    pub success_count: usize,
    pub failure_count: usize,
    pub skipped: usize,
    pub errors: Vec<RowIssue>,
    pub warnings: Vec<RowIssue>,
    pub categories_created: usize,
    pub brands_created: usize,
    /// Absent for dry runs.
    pub import_log_id: Option<ImportLogId>,
    pub dry_run: bool,
}

const fn default_true() -> bool {
    true
}
