// src/error.rs
// Error taxonomy shared across the orchestrator and its handlers (spec 7).

use thiserror::Error;

/// Semantic error taxonomy. The orchestrator maps each variant to a
/// user-facing reply; internal details never reach the chat transport.
#[derive(Error, Debug)]
pub enum AppError {
    /// Network blip, provider 5xx, timeout. Retried once in-request by the
    /// caller; never mutates state.
    #[error("transient upstream failure: {0}")]
    TransientUpstream(String),

    /// Malformed LLM output or unexpected webhook shape. Falls back to
    /// rule-based handling.
    #[error("schema violation: {0}")]
    SchemaViolation(String),

    /// SKU absent, position out of range, client email unknown.
    #[error("not found: {0}")]
    NotFound(String),

    /// Concurrent first-checkout for the same email; caller should re-read
    /// and reuse the existing row.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Negative quantity, malformed internal state. Fails the request and
    /// is logged at ERROR; never echoed to the user verbatim.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// Email provider rejected after retries. The order remains committed.
    #[error("permanent upstream failure: {0}")]
    PermanentUpstream(String),

    #[error("session store unavailable: {0}")]
    SessionUnavailable(String),
}

impl AppError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn transient(msg: impl Into<String>) -> Self {
        Self::TransientUpstream(msg.into())
    }

    /// The generic, detail-free message shown to the user for any error
    /// that isn't handled with a more specific reply upstream.
    pub fn user_message(&self) -> String {
        match self {
            AppError::NotFound(msg) => msg.clone(),
            AppError::TransientUpstream(_) | AppError::SessionUnavailable(_) => {
                "Lo siento, algo salió mal. Por favor intenta de nuevo en un momento.".to_string()
            }
            AppError::SchemaViolation(_)
            | AppError::Conflict(_)
            | AppError::InvariantViolation(_)
            | AppError::PermanentUpstream(_) => {
                "Algo salió mal procesando tu solicitud. Por favor intenta de nuevo.".to_string()
            }
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => AppError::NotFound("row not found".to_string()),
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                AppError::Conflict(db_err.to_string())
            }
            other => AppError::TransientUpstream(other.to_string()),
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        AppError::TransientUpstream(e.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(e: anyhow::Error) -> Self {
        AppError::TransientUpstream(e.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;
