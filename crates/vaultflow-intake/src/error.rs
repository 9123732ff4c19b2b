//! Intake error taxonomy

use thiserror::Error;
use vaultflow_orchestrator::OrchestratorError;

#[derive(Debug, Error)]
pub enum IntakeError {
    /// Webhook signature did not verify; payload dropped unread
    #[error("webhook signature rejected")]
    Signature,

    /// Payload could not be decoded into a decision record
    #[error("undecodable decision payload: {message}")]
    Decode { message: String },

    /// HMAC construction failed
    #[error("crypto error")]
    Crypto,

    /// HTTP client could not be constructed
    #[error("http client setup failed: {message}")]
    ClientSetup { message: String },

    /// Downstream settlement failure
    #[error(transparent)]
    Orchestrator(#[from] OrchestratorError),
}

pub type Result<T> = std::result::Result<T, IntakeError>;
