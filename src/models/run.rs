//! Scrape run audit records.
//!
//! Every ingestion pass opens a run record before writing and closes it on a
//! terminal status, so the run history doubles as the audit trail for when
//! each provider's dataset was last replaced.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a scrape run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// One audited execution of the ingestion pipeline against a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeRun {
    /// Database row ID.
    pub id: i64,
    /// Provider the run wrote plans for.
    pub provider_id: i64,
    /// Kind of run ("full" for a whole-batch replace).
    pub scrape_type: String,
    /// Current lifecycle status.
    pub status: RunStatus,
    /// Plans in the scraped batch.
    pub plans_found: i64,
    /// Plans successfully inserted.
    pub plans_added: i64,
    /// Plans updated in place (always 0 under full replace).
    pub plans_updated: i64,
    /// Concatenated per-item error strings, if any.
    pub error_message: Option<String>,
    /// When the run was opened.
    pub started_at: DateTime<Utc>,
    /// When the run reached a terminal status.
    pub completed_at: Option<DateTime<Utc>>,
}

impl ScrapeRun {
    /// Wall time from open to close, if the run has closed.
    pub fn duration(&self) -> Option<chrono::Duration> {
        self.completed_at.map(|end| end - self.started_at)
    }
}

/// Outcome of one `save_plans` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestReport {
    /// False only when the write procedure itself failed part-way; individual
    /// skipped plans leave this true.
    pub success: bool,
    pub plans_found: usize,
    pub plans_added: usize,
    pub plans_updated: usize,
    pub errors: Vec<String>,
}

impl IngestReport {
    pub fn new(plans_found: usize) -> Self {
        Self {
            success: true,
            plans_found,
            plans_added: 0,
            plans_updated: 0,
            errors: Vec::new(),
        }
    }

    /// Error strings joined for the run record, or None when clean.
    pub fn joined_errors(&self) -> Option<String> {
        if self.errors.is_empty() {
            None
        } else {
            Some(self.errors.join("; "))
        }
    }
}
