//! Payout records
//!
//! One record per claim id, for the life of the system. The record is both
//! the audit trail of a payout attempt and the idempotency seal that stops
//! any future re-execution.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use vaultflow_gateway::PaymentRail;
use vaultflow_types::{Amount, ClaimId, LockId, PayoutId, PolicyId, TransactionId};

/// Lifecycle of a payout
///
/// ```text
/// Processing -> PendingApproval -> Processing (after approval)
/// Processing -> LedgerLocked -> BankTransferPending -> Settled
///                                                   -> ReconciliationRequired
/// Processing -> Skipped | Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PayoutStatus {
    /// Claimed by a worker; execution under way
    Processing,
    /// Parked awaiting a human approver (amount over threshold)
    PendingApproval,
    /// Balanced ledger transaction committed
    LedgerLocked,
    /// Gateway call in flight; outcome not yet known
    BankTransferPending,
    /// Transfer confirmed; the permanent idempotency seal
    Settled,
    /// Ledger committed but the external outcome is failed/unknown;
    /// requires human reconciliation, never auto-retried
    ReconciliationRequired,
    /// Aborted before any money moved; safe to resubmit
    Failed,
    /// Decision verdict was not PAY; nothing to do
    Skipped,
}

impl PayoutStatus {
    /// Terminal states are never re-executed by the automated path
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Settled | Self::ReconciliationRequired | Self::Skipped
        )
    }

    /// Whether a fresh attempt may take over a record in this state
    ///
    /// Only `Failed` is re-enterable: nothing moved, so a corrected
    /// resubmission is safe.
    pub fn is_reenterable(&self) -> bool {
        matches!(self, Self::Failed)
    }
}

/// The persisted record of one claim payout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutRecord {
    pub id: PayoutId,
    /// The idempotency key
    pub claim_id: ClaimId,
    pub policy_id: PolicyId,
    pub recipient: String,
    pub amount: Amount,
    pub rail: PaymentRail,
    pub status: PayoutStatus,
    /// Gateway transaction hash, present once a transfer was submitted
    pub tx_hash: Option<String>,
    pub failure_reason: Option<String>,
    /// Treasury lock backing this payout while in flight
    pub lock_id: Option<LockId>,
    /// The committed ledger transaction, once posted
    pub ledger_tx_id: Option<TransactionId>,
    /// Operator who approved an over-threshold payout
    pub approved_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PayoutRecord {
    /// Fresh record in `Processing`, before any side effects
    pub fn begin_processing(
        claim_id: ClaimId,
        policy_id: PolicyId,
        recipient: impl Into<String>,
        amount: Amount,
        rail: PaymentRail,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: PayoutId::new(),
            claim_id,
            policy_id,
            recipient: recipient.into(),
            amount,
            rail,
            status: PayoutStatus::Processing,
            tx_hash: None,
            failure_reason: None,
            lock_id: None,
            ledger_tx_id: None,
            approved_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub(crate) fn transition(&mut self, status: PayoutStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }

    pub(crate) fn fail(&mut self, reason: impl Into<String>) {
        self.failure_reason = Some(reason.into());
        self.transition(PayoutStatus::Failed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vaultflow_types::Currency::USD;

    #[test]
    fn terminal_states() {
        assert!(PayoutStatus::Settled.is_terminal());
        assert!(PayoutStatus::ReconciliationRequired.is_terminal());
        assert!(PayoutStatus::Skipped.is_terminal());
        assert!(!PayoutStatus::Failed.is_terminal());
        assert!(!PayoutStatus::Processing.is_terminal());
    }

    #[test]
    fn only_failed_is_reenterable() {
        for status in [
            PayoutStatus::Processing,
            PayoutStatus::PendingApproval,
            PayoutStatus::LedgerLocked,
            PayoutStatus::BankTransferPending,
            PayoutStatus::Settled,
            PayoutStatus::ReconciliationRequired,
            PayoutStatus::Skipped,
        ] {
            assert!(!status.is_reenterable());
        }
        assert!(PayoutStatus::Failed.is_reenterable());
    }

    #[test]
    fn begin_processing_has_no_side_effect_fields() {
        let record = PayoutRecord::begin_processing(
            ClaimId::new("CLAIM-1"),
            PolicyId::new("POL-1"),
            "acct",
            Amount::from_units(500, USD).unwrap(),
            PaymentRail::Fiat,
        );
        assert_eq!(record.status, PayoutStatus::Processing);
        assert!(record.tx_hash.is_none());
        assert!(record.lock_id.is_none());
        assert!(record.ledger_tx_id.is_none());
    }
}
