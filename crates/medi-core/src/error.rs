use thiserror::Error;

/// The user-visible error taxonomy from spec.md §7. Background loops never
/// let one of these escape unhandled; foreground operations return it
/// directly to the caller.
#[derive(Debug, Error)]
pub enum MediatorError {
    // ── Startup ──────────────────────────────────────────────────────────────
    #[error("configuration error: {0}")]
    Config(String),

    // ── Preconditions ────────────────────────────────────────────────────────
    #[error("validation failed: {0}")]
    Validation(String),

    // ── Uniqueness / state conflicts ─────────────────────────────────────────
    #[error("conflict: {0}")]
    Conflict(String),

    // ── Integrity ────────────────────────────────────────────────────────────
    #[error("integrity check failed for {entity} {id}: stored hash does not match recomputed hash")]
    Integrity { entity: String, id: String },

    // ── External collaborators ───────────────────────────────────────────────
    #[error("remote call to {target} failed: {reason}")]
    Remote { target: String, reason: String },

    // ── Prompt-injection defence ─────────────────────────────────────────────
    #[error("input from {author} matched a prompt-injection pattern: {pattern}")]
    InjectionRisk { author: String, pattern: String },

    // ── Storage plumbing ──────────────────────────────────────────────────────
    #[error("storage error: {0}")]
    Storage(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("{0}")]
    Other(String),
}

impl MediatorError {
    pub fn config(msg: impl Into<String>) -> Self {
        MediatorError::Config(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        MediatorError::Validation(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        MediatorError::Conflict(msg.into())
    }

    pub fn remote(target: impl Into<String>, reason: impl Into<String>) -> Self {
        MediatorError::Remote {
            target: target.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error class should be retried with backoff (§7: "transient
    /// errors are retried"). Only remote-collaborator failures are transient;
    /// everything else is either a programming error, a rejected precondition,
    /// or a terminal state the retry loop cannot fix.
    pub fn is_transient(&self) -> bool {
        matches!(self, MediatorError::Remote { .. })
    }
}

impl From<sled::Error> for MediatorError {
    fn from(e: sled::Error) -> Self {
        MediatorError::Storage(e.to_string())
    }
}

impl From<bincode::Error> for MediatorError {
    fn from(e: bincode::Error) -> Self {
        MediatorError::Serialization(e.to_string())
    }
}

impl From<serde_json::Error> for MediatorError {
    fn from(e: serde_json::Error) -> Self {
        MediatorError::Serialization(e.to_string())
    }
}
