//! Job lifecycle controller.
//!
//! Drives one job through acquisition, extraction, summarization, and
//! persistence, and owns the state transitions recorded in the store.
//! State moves queued -> processing -> completed | failed; terminal states
//! are absorbing (the store enforces that in SQL), so a pipeline run can
//! never resurrect a finished job.

use serde_json::Value;
use tracing::{error, info, warn};

use crate::acquire::ScrapeClient;
use crate::artifact::ArtifactWriter;
use crate::error::{PipelineError, Result};
use crate::extract;
use crate::fetch::FallbackFetcher;
use crate::models::JobState;
use crate::store::Store;
use crate::summarize::Summarizer;

pub struct Pipeline {
    store: Store,
    scraper: ScrapeClient,
    fallback: FallbackFetcher,
    summarizer: Summarizer,
    artifacts: ArtifactWriter,
}

impl Pipeline {
    pub fn new(
        store: Store,
        scraper: ScrapeClient,
        fallback: FallbackFetcher,
        summarizer: Summarizer,
        artifacts: ArtifactWriter,
    ) -> Self {
        Self {
            store,
            scraper,
            fallback,
            summarizer,
            artifacts,
        }
    }

    /// Runs one job to a terminal state. Failures are recorded on the job
    /// row; this method itself never propagates them.
    pub async fn run(&self, job_id: &str, url: &str, max_pages: u32, max_depth: u32) {
        info!(job_id, url, "starting pipeline run");

        match self.execute(job_id, url, max_pages, max_depth).await {
            Ok(summary_id) => {
                info!(job_id, summary_id, "pipeline run completed");
            }
            Err(e) => {
                error!(job_id, kind = e.kind(), error = %e, "pipeline run failed");
                if let Err(store_err) = self.store.mark_failed(job_id, &e.to_string()).await {
                    error!(job_id, error = %store_err, "failed to record job failure");
                }
            }
        }
    }

    async fn execute(
        &self,
        job_id: &str,
        url: &str,
        max_pages: u32,
        max_depth: u32,
    ) -> Result<String> {
        self.store
            .update_status(job_id, JobState::Processing)
            .await
            .map_err(|e| PipelineError::PersistenceFailed(e.to_string()))?;

        let payload = self.acquire(url, max_pages, max_depth).await?;

        let content = extract::extract_text(&payload)
            .ok_or_else(|| PipelineError::ExtractionEmpty(url.to_string()))?;
        let title = extract::derive_title(url, &payload);

        let summary = self.summarizer.summarize(&content, url).await;

        let filename = self
            .artifacts
            .write(&title, url, &summary, &content)
            .map_err(|e| PipelineError::PersistenceFailed(e.to_string()))?;

        let summary_id = self
            .store
            .save_summary(job_id, url, &title, &content, &summary, &filename)
            .await
            .map_err(|e| PipelineError::PersistenceFailed(e.to_string()))?;

        self.store
            .mark_completed(job_id)
            .await
            .map_err(|e| PipelineError::PersistenceFailed(e.to_string()))?;

        Ok(summary_id)
    }

    /// Acquires the page payload, preferring the provider and dropping to
    /// the direct fetcher only when the provider is wholly out of reach or
    /// polling exhausts its budget. Provider-level rejections and reported
    /// failures are real answers and propagate as job failures.
    async fn acquire(&self, url: &str, max_pages: u32, max_depth: u32) -> Result<Value> {
        let attempt = async {
            let outcome = self.scraper.submit(url, max_pages, max_depth).await?;
            self.scraper.resolve(outcome).await
        };

        match attempt.await {
            Ok(payload) => Ok(payload),
            Err(
                e @ (PipelineError::ProviderUnreachable(_)
                | PipelineError::ResolutionTimeout { .. }),
            ) => {
                warn!(url, error = %e, "provider path exhausted, fetching directly");
                Ok(self.fallback.fetch(url).await)
            }
            Err(e) => Err(e),
        }
    }
}
