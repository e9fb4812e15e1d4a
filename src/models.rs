//! Core data models for jobs and summaries.
//!
//! Timestamps are stored as unix seconds (i64) and rendered as ISO8601 at
//! the API boundary.

use serde::Serialize;

/// Lifecycle state of a scraping job.
///
/// `queued → processing → completed | failed`; terminal states are
/// absorbing. Re-running a job is not supported — a new job is created
/// instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Queued,
    Processing,
    Completed,
    Failed,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Queued => "queued",
            JobState::Processing => "processing",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }

    pub fn parse(s: &str) -> Option<JobState> {
        match s {
            "queued" => Some(JobState::Queued),
            "processing" => Some(JobState::Processing),
            "completed" => Some(JobState::Completed),
            "failed" => Some(JobState::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One end-to-end acquire-and-summarize request for a single URL.
#[derive(Debug, Clone, Serialize)]
pub struct Job {
    pub id: String,
    pub url: String,
    pub status: JobState,
    /// Present iff `status` is `failed`.
    pub error: Option<String>,
    pub created_at: i64,
    /// Present iff `status` is terminal.
    pub completed_at: Option<i64>,
}

/// Persisted summary record, written once per successful job.
///
/// The extracted source content is large, so it is populated only when a
/// single record is fetched, never in listings.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryRecord {
    pub id: String,
    pub job_id: String,
    pub url: String,
    pub title: String,
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub filename: String,
    pub created_at: i64,
}

/// Counters returned by the stats endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct Stats {
    pub total_summaries: i64,
    pub total_jobs: i64,
    pub completed_jobs: i64,
    pub failed_jobs: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_roundtrip() {
        for state in [
            JobState::Queued,
            JobState::Processing,
            JobState::Completed,
            JobState::Failed,
        ] {
            assert_eq!(JobState::parse(state.as_str()), Some(state));
        }
        assert_eq!(JobState::parse("bogus"), None);
    }

    #[test]
    fn test_terminal_states() {
        assert!(!JobState::Queued.is_terminal());
        assert!(!JobState::Processing.is_terminal());
        assert!(JobState::Completed.is_terminal());
        assert!(JobState::Failed.is_terminal());
    }
}
