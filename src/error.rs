//! Error types for the acquisition-and-summarization pipeline.
//!
//! Every failure that can end a job maps to one of these variants; the
//! lifecycle controller records the display string verbatim as the job's
//! error message. The summarizer deliberately has no variant here — it
//! always degrades to its local tier instead of failing.

use thiserror::Error;

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors produced by the acquisition-and-summarization pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Every candidate request shape was rejected by the provider, or an
    /// async acceptance carried no discoverable job token.
    #[error("acquisition failed: {0}")]
    AcquisitionFailed(String),

    /// The provider could not be reached at all — every request-shape
    /// attempt died at the transport level. Absorbed by the pipeline
    /// (it switches to the local fallback fetch) and never recorded on
    /// a job.
    #[error("scraping provider unreachable: {0}")]
    ProviderUnreachable(String),

    /// The provider reported the remote scraping job as failed.
    #[error("scraping job failed: {0}")]
    ResolutionFailed(String),

    /// Polling exhausted its round budget without the token resolving.
    #[error("scraping job timed out after {rounds} polling rounds")]
    ResolutionTimeout { rounds: u32 },

    /// A resolved payload yielded no text at all.
    #[error("no content extracted from {0}")]
    ExtractionEmpty(String),

    /// The job store or artifact store refused a write.
    #[error("persistence failed: {0}")]
    PersistenceFailed(String),
}

impl PipelineError {
    /// Short machine-readable kind, used in logs and job listings.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::AcquisitionFailed(_) => "acquisition_failed",
            PipelineError::ProviderUnreachable(_) => "provider_unreachable",
            PipelineError::ResolutionFailed(_) => "resolution_failed",
            PipelineError::ResolutionTimeout { .. } => "resolution_timeout",
            PipelineError::ExtractionEmpty(_) => "extraction_empty",
            PipelineError::PersistenceFailed(_) => "persistence_failed",
        }
    }
}
