//! Core types shared by the pipeline components

use serde::{Deserialize, Serialize};

/// One user entity as exported by the source tenant
///
/// The pipeline treats records as opaque key/value maps. Identity lives in
/// the provider-assigned `user_id` field.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Status of a remote bulk job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

/// Unrecognized statuses ("processing", "queued", ...) count as pending.
impl From<&str> for JobStatus {
    fn from(s: &str) -> Self {
        match s {
            "completed" => JobStatus::Completed,
            "failed" => JobStatus::Failed,
            _ => JobStatus::Pending,
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-job counters reported by the destination tenant for imports
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    #[serde(default)]
    pub failed: u64,
    #[serde(default)]
    pub updated: u64,
    #[serde(default)]
    pub inserted: u64,
    #[serde(default)]
    pub total: u64,
}

impl ImportSummary {
    /// Add another job's counters to this one
    pub fn accumulate(&mut self, other: &ImportSummary) {
        self.failed += other.failed;
        self.updated += other.updated;
        self.inserted += other.inserted;
        self.total += other.total;
    }
}

/// Snapshot of a remote asynchronous job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    /// Opaque identifier assigned by the tenant
    pub id: String,
    pub status: JobStatus,
    /// Download location of the export result, present once completed
    pub location: Option<String>,
    /// Import counters, when the tenant reports them
    pub summary: Option<ImportSummary>,
}

impl Job {
    pub fn new(id: impl Into<String>, status: JobStatus) -> Self {
        Self {
            id: id.into(),
            status,
            location: None,
            summary: None,
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_summary(mut self, summary: ImportSummary) -> Self {
        self.summary = Some(summary);
        self
    }

    /// Human-readable reason for a failed job
    pub fn failure_detail(&self) -> String {
        match self.summary {
            Some(summary) if summary.total > 0 => format!(
                "{} of {} records failed",
                summary.failed, summary.total
            ),
            _ => "tenant reported status 'failed'".to_string(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_status_is_pending() {
        assert_eq!(JobStatus::from("completed"), JobStatus::Completed);
        assert_eq!(JobStatus::from("failed"), JobStatus::Failed);
        assert_eq!(JobStatus::from("processing"), JobStatus::Pending);
        assert_eq!(JobStatus::from(""), JobStatus::Pending);
    }

    #[test]
    fn test_failure_detail() {
        let bare = Job::new("job_1", JobStatus::Failed);
        assert_eq!(bare.failure_detail(), "tenant reported status 'failed'");

        let counted = bare.with_summary(ImportSummary {
            failed: 3,
            total: 10,
            ..Default::default()
        });
        assert_eq!(counted.failure_detail(), "3 of 10 records failed");
    }

    #[test]
    fn test_summary_accumulate() {
        let mut total = ImportSummary::default();
        total.accumulate(&ImportSummary { failed: 0, updated: 2, inserted: 3, total: 5 });
        total.accumulate(&ImportSummary { failed: 1, updated: 0, inserted: 4, total: 5 });
        assert_eq!(total, ImportSummary { failed: 1, updated: 2, inserted: 7, total: 10 });
    }
}
