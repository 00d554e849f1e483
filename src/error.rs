//! Error taxonomy for the analysis pipeline.
//!
//! Inbound failures (`AuthError`) surface as HTTP responses; everything that
//! happens after an event has been dispatched is a `PipelineError`, terminal
//! for that event and logged rather than surfaced to the original caller.

use thiserror::Error;

/// Webhook signature validation failures. Missing and malformed headers are
/// deliberately distinct variants so neither path is merged or panics.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("missing X-Hub-Signature-256 header")]
    MissingSignature,
    #[error("malformed signature header (expected sha256=<hex>)")]
    MalformedSignature,
    #[error("signature does not match payload")]
    InvalidSignature,
}

/// Failure while retrieving the content to analyze. Any page failing aborts
/// the fetch; no partial diff is returned.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("content source request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("content source returned status {0}")]
    Status(u16),
}

/// Failure of the external generation capability.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("generation request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("generation API returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("model returned an empty response")]
    EmptyResponse,
}

/// Failure inside the analysis orchestrator. A malformed model output is
/// terminal and carries the raw response text for diagnostics.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error("failed to parse model output: {source} (raw: {raw})")]
    MalformedOutput {
        #[source]
        source: serde_json::Error,
        raw: String,
    },
}

/// Failure delivering a result to the destination sink.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("comment request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("comment API returned status {0}")]
    Status(u16),
}

/// Any step failing after dispatch. There is no retry policy and no dead
/// letter queue; the caller already received its acknowledgment.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("diff fetch failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("analysis failed: {0}")]
    Analysis(#[from] AnalysisError),
    #[error("publish failed: {0}")]
    Publish(#[from] PublishError),
}
