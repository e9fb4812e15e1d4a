//! Persistent job and summary store.
//!
//! All operations are single-row, single-statement; concurrent pipeline
//! runs never need a cross-row transaction. Status updates are monotonic:
//! the SQL guards refuse to move a job out of a terminal state, so a
//! racing update can never resurrect a completed or failed job.

use anyhow::{bail, Result};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::models::{Job, JobState, Stats, SummaryRecord};

#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Creates a job in `queued` state and returns its id.
    pub async fn create_job(&self, url: &str) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let now = chrono::Utc::now().timestamp();

        sqlx::query("INSERT INTO jobs (id, url, status, created_at) VALUES (?, ?, 'queued', ?)")
            .bind(&id)
            .bind(url)
            .bind(now)
            .execute(&self.pool)
            .await?;

        Ok(id)
    }

    /// Moves a job to a non-terminal state. No-op when the job is already
    /// terminal.
    pub async fn update_status(&self, id: &str, state: JobState) -> Result<()> {
        sqlx::query(
            "UPDATE jobs SET status = ? WHERE id = ? AND status NOT IN ('completed', 'failed')",
        )
        .bind(state.as_str())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Marks a job completed, setting the completion timestamp.
    pub async fn mark_completed(&self, id: &str) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        sqlx::query(
            "UPDATE jobs SET status = 'completed', completed_at = ? \
             WHERE id = ? AND status NOT IN ('completed', 'failed')",
        )
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Marks a job failed with the given error message.
    pub async fn mark_failed(&self, id: &str, error: &str) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        sqlx::query(
            "UPDATE jobs SET status = 'failed', error = ?, completed_at = ? \
             WHERE id = ? AND status NOT IN ('completed', 'failed')",
        )
        .bind(error)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_job(&self, id: &str) -> Result<Option<Job>> {
        let row = sqlx::query(
            "SELECT id, url, status, error, created_at, completed_at FROM jobs WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(job_from_row).transpose()
    }

    /// Persists the summary record and returns its id.
    pub async fn save_summary(
        &self,
        job_id: &str,
        url: &str,
        title: &str,
        content: &str,
        summary: &str,
        filename: &str,
    ) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let now = chrono::Utc::now().timestamp();

        sqlx::query(
            "INSERT INTO summaries (id, job_id, url, title, content, summary, filename, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(job_id)
        .bind(url)
        .bind(title)
        .bind(content)
        .bind(summary)
        .bind(filename)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(id)
    }

    /// The summary written by a given job, if the job produced one.
    pub async fn get_summary_for_job(&self, job_id: &str) -> Result<Option<SummaryRecord>> {
        let row = sqlx::query(
            "SELECT id, job_id, url, title, summary, filename, created_at \
             FROM summaries WHERE job_id = ? ORDER BY created_at DESC LIMIT 1",
        )
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(summary_from_row))
    }

    /// Fetches one summary with its extracted source content.
    pub async fn get_summary(&self, id: &str) -> Result<Option<SummaryRecord>> {
        let row = sqlx::query(
            "SELECT id, job_id, url, title, content, summary, filename, created_at \
             FROM summaries WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| SummaryRecord {
            content: Some(row.get("content")),
            ..summary_from_row(row)
        }))
    }

    /// Lists summaries newest-first, optionally filtered by a LIKE search
    /// over title, summary, and url.
    pub async fn list_summaries(
        &self,
        limit: i64,
        offset: i64,
        search: Option<&str>,
    ) -> Result<Vec<SummaryRecord>> {
        let rows = match search {
            Some(term) => {
                let pattern = format!("%{}%", term);
                sqlx::query(
                    "SELECT id, job_id, url, title, summary, filename, created_at \
                     FROM summaries \
                     WHERE title LIKE ? OR summary LIKE ? OR url LIKE ? \
                     ORDER BY created_at DESC LIMIT ? OFFSET ?",
                )
                .bind(&pattern)
                .bind(&pattern)
                .bind(&pattern)
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    "SELECT id, job_id, url, title, summary, filename, created_at \
                     FROM summaries ORDER BY created_at DESC LIMIT ? OFFSET ?",
                )
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(rows.into_iter().map(summary_from_row).collect())
    }

    /// Deletes a summary row and returns the artifact filename it pointed
    /// to, or `None` when the row did not exist.
    pub async fn delete_summary(&self, id: &str) -> Result<Option<String>> {
        let filename: Option<String> =
            sqlx::query_scalar("SELECT filename FROM summaries WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        if filename.is_some() {
            sqlx::query("DELETE FROM summaries WHERE id = ?")
                .bind(id)
                .execute(&self.pool)
                .await?;
        }

        Ok(filename)
    }

    pub async fn stats(&self) -> Result<Stats> {
        let total_summaries: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM summaries")
            .fetch_one(&self.pool)
            .await?;
        let total_jobs: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM jobs")
            .fetch_one(&self.pool)
            .await?;
        let completed_jobs: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM jobs WHERE status = 'completed'")
                .fetch_one(&self.pool)
                .await?;
        let failed_jobs: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM jobs WHERE status = 'failed'")
                .fetch_one(&self.pool)
                .await?;

        Ok(Stats {
            total_summaries,
            total_jobs,
            completed_jobs,
            failed_jobs,
        })
    }
}

fn job_from_row(row: sqlx::sqlite::SqliteRow) -> Result<Job> {
    let status_raw: String = row.get("status");
    let Some(status) = JobState::parse(&status_raw) else {
        bail!("unknown job status in store: {}", status_raw);
    };

    Ok(Job {
        id: row.get("id"),
        url: row.get("url"),
        status,
        error: row.get("error"),
        created_at: row.get("created_at"),
        completed_at: row.get("completed_at"),
    })
}

/// Maps the listing projection; `content` is filled in only by
/// [`Store::get_summary`].
fn summary_from_row(row: sqlx::sqlite::SqliteRow) -> SummaryRecord {
    SummaryRecord {
        id: row.get("id"),
        job_id: row.get("job_id"),
        url: row.get("url"),
        title: row.get("title"),
        summary: row.get("summary"),
        content: None,
        filename: row.get("filename"),
        created_at: row.get("created_at"),
    }
}
