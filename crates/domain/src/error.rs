/// Shared error type used across all admin-panel crates.
///
/// Variants follow the collaborator-facing taxonomy: what a caller can do
/// about a failure, not which subsystem produced it. `TokenExpired` is kept
/// separate from `Unauthorized` because the session middleware branches on
/// it (expired operator tokens are silently refreshed, invalid ones are not).
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("token expired")]
    TokenExpired,

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("conflict: {0}")]
    Conflict(String),

    /// Network-level failure (timeout, connection refused, degraded bus).
    /// The caller decides whether to repeat; the core never auto-retries.
    #[error("transient: {0}")]
    Transient(String),

    /// A collaborator answered but with a 5xx or an otherwise broken reply.
    #[error("dependency: {0}")]
    Dependency(String),

    /// Codec / parse failure. Carries position context, never retried.
    #[error("corrupted: {0}")]
    Corrupted(String),

    #[error("config: {0}")]
    Config(String),

    #[error("internal: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// True for failures that denote a broken credential rather than a
    /// broken request.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Error::Unauthorized(_) | Error::TokenExpired)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Corrupted(format!("json: {e}"))
    }
}
