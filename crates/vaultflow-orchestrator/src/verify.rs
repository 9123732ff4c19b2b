//! Decision verification port
//!
//! The orchestrator refuses to execute any decision that has not passed
//! zero-trust verification. The concrete verifier (canonical hash, freshness
//! window, signer registry) lives in `vaultflow-intake`; this port keeps the
//! dependency pointing the right way.

use std::fmt;

use vaultflow_types::DecisionRecord;

/// Why a decision's seal was rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SealViolation {
    /// Recomputed canonical hash differs from the declared hash
    HashMismatch,
    /// Seal timestamp is outside the freshness window
    Stale { age_seconds: i64 },
    /// Seal timestamp lies in the future beyond tolerated clock skew
    FutureTimestamp,
    /// Signer is not a recognized issuer
    UnknownSigner { signer_id: String },
    /// Seal is structurally unusable
    Malformed { message: String },
}

impl fmt::Display for SealViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HashMismatch => write!(f, "seal hash does not match decision fields"),
            Self::Stale { age_seconds } => write!(f, "seal is stale ({age_seconds}s old)"),
            Self::FutureTimestamp => write!(f, "seal timestamp is in the future"),
            Self::UnknownSigner { signer_id } => write!(f, "unrecognized signer {signer_id}"),
            Self::Malformed { message } => write!(f, "malformed seal: {message}"),
        }
    }
}

/// Verifier port over decision audit seals
pub trait DecisionVerifier: Send + Sync {
    fn verify(&self, decision: &DecisionRecord) -> std::result::Result<(), SealViolation>;
}

/// Verifier that accepts everything
///
/// For tests of downstream machinery only; production wiring must use the
/// seal verifier from the intake crate.
pub struct AcceptAllVerifier;

impl DecisionVerifier for AcceptAllVerifier {
    fn verify(&self, _decision: &DecisionRecord) -> std::result::Result<(), SealViolation> {
        Ok(())
    }
}
