//! Error taxonomy for the moderation pipeline.
//!
//! Per-comment action failures and notification failures never surface
//! here — they are caught and logged inside the engine. Everything else
//! propagates as a `GuardPostError` to the caller.

use thiserror::Error;

/// All failure modes the pipeline can surface to a caller.
#[derive(Debug, Error)]
pub enum GuardPostError {
    /// Malformed or missing input from the caller.
    #[error("validation error: {0}")]
    Validation(String),

    /// A referenced record does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Uniqueness or binding invariant would be violated
    /// (proxy already bound, duplicate task for a post).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Caller is not allowed to touch this record. Ownership checks
    /// live in the hosting process; the variant is carried so the
    /// collaborator surface can report them uniformly.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The opaque credential bundle could not be decoded.
    #[error("invalid credential bundle: {0}")]
    InvalidCredential(String),

    /// Transport or API failure talking to the external platform.
    /// Never retried in place — the next scheduled tick retries.
    #[error("external api error: {0}")]
    ExternalApi(String),

    /// Auto-assignment found no unbound ACTIVE proxy.
    #[error("no free active proxy available")]
    NoProxyAvailable,

    /// SQLite persistence failure.
    #[error("store error: {0}")]
    Store(String),

    /// Configuration could not be read or parsed.
    #[error("config error: {0}")]
    Config(String),

    /// Notification channel failure.
    #[error("channel error: {0}")]
    Channel(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, GuardPostError>;
