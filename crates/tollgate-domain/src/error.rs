use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    /// Business-rule violation at the ingestion edge: missing/non-positive
    /// unit id, non-increasing timestamp, non-finite or negative value.
    #[error("invalid sample: {0}")]
    InvalidSample(String),

    /// Malformed raw event that could not be decoded into a sample.
    #[error("malformed telemetry event: {0}")]
    DecodeError(String),

    #[error("no invoice for unit {0}")]
    InvoiceNotFound(i64),

    #[error("store error: {0}")]
    StoreError(#[from] anyhow::Error),
}

pub type DomainResult<T> = Result<T, DomainError>;

/// Errors surfaced by transport client adapters. Kept separate from
/// [`DomainError`] so delivery failures are never mistaken for business
/// failures.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Network or serialization failure between client and server. The
    /// request may never have reached the aggregator; safe to retry.
    #[error("transport error: {0}")]
    Transport(#[source] anyhow::Error),

    /// The server received the call and refused or failed it. Retrying the
    /// same request will not help.
    #[error("request rejected by aggregator: {0}")]
    Rejected(String),

    #[error("no invoice for unit {0}")]
    NotFound(i64),
}

impl ClientError {
    /// Whether a retry with backoff is worthwhile.
    pub fn is_transient(&self) -> bool {
        matches!(self, ClientError::Transport(_))
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
