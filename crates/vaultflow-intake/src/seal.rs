//! Audit seal verification
//!
//! Decisions are accepted on cryptographic proof, not provenance: the
//! orchestrator runs every decision through this verifier no matter which
//! intake path delivered it. A seal passes when its hash matches the
//! recomputed canonical hash, its signer is registered, and its timestamp
//! sits inside the freshness window.

use std::collections::HashSet;

use chrono::{Duration, Utc};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use tracing::warn;
use vaultflow_orchestrator::{DecisionVerifier, SealViolation};
use vaultflow_types::DecisionRecord;

/// Hex SHA-256 over the decision's canonical field string
pub fn compute_seal_hash(decision: &DecisionRecord) -> String {
    let digest = Sha256::digest(decision.canonical_fields().as_bytes());
    hex::encode(digest)
}

/// Freshness rules for seal timestamps
#[derive(Debug, Clone)]
pub struct SealPolicy {
    /// Maximum accepted seal age
    pub freshness_window: Duration,
    /// Tolerated forward clock drift between us and the claims platform
    pub clock_skew: Duration,
}

impl Default for SealPolicy {
    fn default() -> Self {
        Self {
            freshness_window: Duration::hours(24),
            clock_skew: Duration::minutes(5),
        }
    }
}

/// Zero-trust verifier over decision audit seals
pub struct SealVerifier {
    signers: HashSet<String>,
    policy: SealPolicy,
}

impl SealVerifier {
    pub fn new(signers: impl IntoIterator<Item = impl Into<String>>, policy: SealPolicy) -> Self {
        Self {
            signers: signers.into_iter().map(Into::into).collect(),
            policy,
        }
    }

    pub fn with_default_policy(signers: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self::new(signers, SealPolicy::default())
    }
}

impl DecisionVerifier for SealVerifier {
    fn verify(&self, decision: &DecisionRecord) -> Result<(), SealViolation> {
        let seal = &decision.audit_seal;

        let declared = hex::decode(&seal.hash).map_err(|_| SealViolation::Malformed {
            message: "seal hash is not valid hex".to_string(),
        })?;
        let computed = Sha256::digest(decision.canonical_fields().as_bytes());
        // Length leak is fine; content must compare in constant time
        if declared.len() != computed.len()
            || !bool::from(computed.as_slice().ct_eq(&declared))
        {
            warn!(claim_id = %decision.claim_id, signer = %seal.signer_id, "seal hash mismatch, decision dropped");
            return Err(SealViolation::HashMismatch);
        }

        if !self.signers.contains(&seal.signer_id) {
            warn!(claim_id = %decision.claim_id, signer = %seal.signer_id, "unrecognized seal signer");
            return Err(SealViolation::UnknownSigner {
                signer_id: seal.signer_id.clone(),
            });
        }

        let age = Utc::now() - seal.timestamp;
        if age > self.policy.freshness_window {
            return Err(SealViolation::Stale {
                age_seconds: age.num_seconds(),
            });
        }
        if age < -self.policy.clock_skew {
            return Err(SealViolation::FutureTimestamp);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use vaultflow_types::{AuditSeal, ClaimId, Currency, DecisionStatus, PolicyId};

    const SIGNER: &str = "claims-platform-1";

    fn sealed_decision() -> DecisionRecord {
        let mut decision = DecisionRecord {
            claim_id: ClaimId::new("CLAIM-1"),
            policy_id: PolicyId::new("POL-1"),
            status: DecisionStatus::Pay,
            amount_micros: 250_000_000,
            currency: Currency::USD,
            recipient: "acct_abc".to_string(),
            decision_timestamp: Utc::now(),
            audit_seal: AuditSeal {
                hash: String::new(),
                signer_id: SIGNER.to_string(),
                timestamp: Utc::now(),
            },
        };
        decision.audit_seal.hash = compute_seal_hash(&decision);
        decision
    }

    fn verifier() -> SealVerifier {
        SealVerifier::with_default_policy([SIGNER])
    }

    #[test]
    fn valid_seal_is_accepted() {
        assert!(verifier().verify(&sealed_decision()).is_ok());
    }

    #[test]
    fn tampered_amount_is_rejected() {
        let mut decision = sealed_decision();
        decision.amount_micros += 1_000_000;
        assert_eq!(
            verifier().verify(&decision),
            Err(SealViolation::HashMismatch)
        );
    }

    #[test]
    fn tampered_recipient_is_rejected() {
        let mut decision = sealed_decision();
        decision.recipient = "acct_attacker".to_string();
        assert_eq!(
            verifier().verify(&decision),
            Err(SealViolation::HashMismatch)
        );
    }

    #[test]
    fn non_hex_hash_is_malformed() {
        let mut decision = sealed_decision();
        decision.audit_seal.hash = "not-hex!".to_string();
        assert!(matches!(
            verifier().verify(&decision),
            Err(SealViolation::Malformed { .. })
        ));
    }

    #[test]
    fn unknown_signer_is_rejected() {
        let mut decision = sealed_decision();
        decision.audit_seal.signer_id = "rogue-signer".to_string();
        assert!(matches!(
            verifier().verify(&decision),
            Err(SealViolation::UnknownSigner { .. })
        ));
    }

    #[test]
    fn stale_seal_is_rejected() {
        let mut decision = sealed_decision();
        decision.audit_seal.timestamp = Utc::now() - Duration::hours(25);
        assert!(matches!(
            verifier().verify(&decision),
            Err(SealViolation::Stale { .. })
        ));
    }

    #[test]
    fn seal_from_the_future_is_rejected() {
        let mut decision = sealed_decision();
        decision.audit_seal.timestamp = Utc::now() + Duration::hours(1);
        assert_eq!(
            verifier().verify(&decision),
            Err(SealViolation::FutureTimestamp)
        );
    }

    #[test]
    fn small_clock_skew_is_tolerated() {
        let mut decision = sealed_decision();
        decision.audit_seal.timestamp = Utc::now() + Duration::minutes(2);
        assert!(verifier().verify(&decision).is_ok());
    }
}
