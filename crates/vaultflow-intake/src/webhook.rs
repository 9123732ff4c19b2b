//! Webhook intake path
//!
//! The claims platform pushes decisions over a signed webhook. Two gates
//! stand between the wire and settlement: an HMAC-SHA256 signature over the
//! raw payload bytes (transport authenticity), then the audit seal check
//! inside the orchestrator (decision integrity). The payload is not even
//! decoded until the signature verifies.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::{info, warn};
use vaultflow_orchestrator::{PayoutOrchestrator, PayoutRecord};
use vaultflow_types::DecisionRecord;

use crate::{IntakeError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Signed webhook receiver
#[derive(Clone)]
pub struct WebhookIntake {
    secret: Vec<u8>,
    orchestrator: PayoutOrchestrator,
}

impl WebhookIntake {
    pub fn new(secret: impl Into<Vec<u8>>, orchestrator: PayoutOrchestrator) -> Self {
        Self {
            secret: secret.into(),
            orchestrator,
        }
    }

    /// Verify the payload signature without decoding anything
    pub fn verify_signature(&self, payload: &[u8], signature_hex: &str) -> bool {
        let Ok(declared) = hex::decode(signature_hex) else {
            return false;
        };
        let Ok(mut mac) = HmacSha256::new_from_slice(&self.secret) else {
            return false;
        };
        mac.update(payload);
        // verify_slice compares in constant time
        mac.verify_slice(&declared).is_ok()
    }

    /// Sign a payload the way the claims platform does
    ///
    /// Used by tests and by local tooling that replays captured webhooks.
    pub fn sign(&self, payload: &[u8]) -> Result<String> {
        let mut mac =
            HmacSha256::new_from_slice(&self.secret).map_err(|_| IntakeError::Crypto)?;
        mac.update(payload);
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// Handle one webhook delivery
    ///
    /// Signature gate, JSON decode, then straight into the orchestrator,
    /// whose idempotency gate makes redelivered webhooks harmless.
    pub async fn handle(&self, payload: &[u8], signature_hex: &str) -> Result<PayoutRecord> {
        if !self.verify_signature(payload, signature_hex) {
            warn!(payload_bytes = payload.len(), "webhook signature rejected");
            return Err(IntakeError::Signature);
        }

        let decision: DecisionRecord =
            serde_json::from_slice(payload).map_err(|e| IntakeError::Decode {
                message: e.to_string(),
            })?;
        info!(claim_id = %decision.claim_id, verdict = %decision.status, "webhook decision accepted");

        Ok(self.orchestrator.process_decision(decision).await?)
    }
}
