//! Claim decision records
//!
//! Decisions are produced by the upstream claims platform and arrive through
//! the polling and webhook intake paths. They are untrusted input: nothing in
//! a `DecisionRecord` is acted on until its audit seal has been verified.

use crate::{ClaimId, Currency, PolicyId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Verdict attached to a claim decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DecisionStatus {
    /// Approved for payout
    Pay,
    /// Denied
    Deny,
    /// Needs human review upstream
    Review,
    /// Still being adjudicated
    Pending,
}

impl fmt::Display for DecisionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pay => "PAY",
            Self::Deny => "DENY",
            Self::Review => "REVIEW",
            Self::Pending => "PENDING",
        };
        write!(f, "{}", s)
    }
}

/// Cryptographic seal over a decision's immutable fields
///
/// The hash is a hex SHA-256 over the canonical field string; the signer must
/// be a recognized issuer and the timestamp must be inside the freshness
/// window for the decision to be accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditSeal {
    /// Hex SHA-256 of the canonical decision fields
    pub hash: String,
    /// Identifier of the sealing issuer
    pub signer_id: String,
    /// When the seal was produced
    pub timestamp: DateTime<Utc>,
}

/// A payout decision from the claims platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub claim_id: ClaimId,
    pub policy_id: PolicyId,
    pub status: DecisionStatus,
    /// Payout amount in micros (1,000,000 micros = 1 unit)
    pub amount_micros: i64,
    pub currency: Currency,
    /// Rail-specific recipient address or account
    pub recipient: String,
    pub decision_timestamp: DateTime<Utc>,
    pub audit_seal: AuditSeal,
}

impl DecisionRecord {
    /// The canonical string the seal hash is computed over
    ///
    /// Field order is part of the wire contract with the claims platform;
    /// changing it invalidates every existing seal.
    pub fn canonical_fields(&self) -> String {
        format!(
            "{}|{}|{}|{}|{}|{}|{}",
            self.claim_id,
            self.policy_id,
            self.status,
            self.amount_micros,
            self.currency,
            self.recipient,
            self.decision_timestamp.timestamp_millis(),
        )
    }
}
