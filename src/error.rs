//! Service error taxonomy.
//!
//! Every database service in this crate returns `Result<_, ServiceError>`.
//! The variants map one-to-one onto the transport-level outcomes the web
//! server produces:
//!
//! ```text
//! Validation  → 400 (bad or policy-violating input, no state change)
//! NotFound    → 404 (referenced row absent)
//! Persistence → 500 (the backing store reported a failure)
//! ```

use uuid::Uuid;

/// Failure modes of the Camara database services.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Malformed or policy-violating input. No write was attempted.
    #[error("{0}")]
    Validation(String),

    /// A row the operation depends on does not exist.
    #[error("{what} not found: {id}")]
    NotFound { what: &'static str, id: Uuid },

    /// The backing store reported a failure on a read or write.
    #[error("persistence failure: {0}")]
    Persistence(#[from] sqlx::Error),
}

impl ServiceError {
    /// Convenience constructor for validation failures.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}
