//! Orchestrator error taxonomy
//!
//! The variants map directly onto how far a payout got before failing, which
//! in turn decides who fixes it: validation and liquidity failures are
//! caller-recoverable, gateway transients retry internally, and a
//! reconciliation-required state is terminal for the automated path.

use thiserror::Error;
use vaultflow_ledger::LedgerError;
use vaultflow_treasury::TreasuryError;
use vaultflow_types::{Amount, ClaimId, Currency};

use crate::{FetchError, SealViolation};

#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Bad input; no side effects
    #[error("Validation failed for claim {claim_id}: {message}")]
    Validation { claim_id: ClaimId, message: String },

    /// Decision could not be fetched (retries exhausted or permanent)
    #[error("Decision fetch failed for claim {claim_id}: {source}")]
    DecisionFetch {
        claim_id: ClaimId,
        #[source]
        source: FetchError,
    },

    /// Decision failed zero-trust verification; dropped, never executed
    #[error("Seal verification failed for claim {claim_id}: {violation}")]
    SealVerification {
        claim_id: ClaimId,
        violation: SealViolation,
    },

    /// No pool configured for the decision currency
    #[error("No liquidity pool configured for currency {currency}")]
    NoPoolForCurrency { currency: Currency },

    /// Pool could not cover the payout; no external call was attempted
    #[error("Insufficient liquidity for claim {claim_id}: needed {needed}, available {available}")]
    Liquidity {
        claim_id: ClaimId,
        needed: Amount,
        available: Amount,
    },

    /// Ledger rejected the transaction; aborted before any external call
    #[error("Ledger rejected payout for claim {claim_id}: {source}")]
    Ledger {
        claim_id: ClaimId,
        #[source]
        source: LedgerError,
    },

    /// Treasury operation failed
    #[error("Treasury error for claim {claim_id}: {source}")]
    Treasury {
        claim_id: ClaimId,
        #[source]
        source: TreasuryError,
    },

    /// Ledger committed but the external transfer failed or is unknown.
    /// The single most dangerous state: needs a human, never auto-retried.
    #[error("Reconciliation required for claim {claim_id}: {reason}")]
    ReconciliationRequired { claim_id: ClaimId, reason: String },

    /// Approval command rejected (wrong state, unknown claim)
    #[error("Cannot approve claim {claim_id}: {message}")]
    InvalidApproval { claim_id: ClaimId, message: String },

    /// Payout storage failure
    #[error("Payout store error: {message}")]
    Store { message: String },

    /// Operational query against a subsystem failed
    #[error("Operational query failed: {message}")]
    Ops { message: String },
}

pub type Result<T> = std::result::Result<T, OrchestratorError>;
