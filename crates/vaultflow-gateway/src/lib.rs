//! VaultFlow Bank Gateway - The payment-rail port
//!
//! The ledger and orchestrator never talk to a payment vendor directly;
//! everything goes through the [`BankGateway`] trait. Adapters are swappable
//! and no vendor type leaks into the core.
//!
//! # Adapter contract
//!
//! Every adapter MUST treat the instruction's `reference` as an idempotency
//! key: retrying the same reference after an ambiguous failure (timeout,
//! 5xx) must never produce a second transfer. This is what makes ambiguous
//! failures safe to retry at all.
//!
//! A per-transfer safety-limit violation is a distinct, non-retryable error
//! and must never be conflated with transient rail trouble.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};

use vaultflow_types::Amount;

/// Payment rails the treasury can settle over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentRail {
    /// Conventional bank transfer (ACH/SEPA style)
    Fiat,
    /// On-chain stablecoin transfer
    Crypto,
}

/// Errors returned by gateway adapters
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// Per-transfer safety limit violated; needs manual approval, never retried
    #[error("Transfer limit exceeded: requested {requested} over limit {limit}")]
    LimitExceeded { requested: Amount, limit: Amount },

    /// Rail rejected the instruction outright (bad recipient, closed account)
    #[error("Transfer rejected: {reason}")]
    Rejected { reason: String },

    /// Rail is down or unreachable
    #[error("Gateway unavailable: {message}")]
    Unavailable { message: String },

    /// Call timed out; outcome unknown
    #[error("Gateway call timed out after {seconds}s")]
    Timeout { seconds: u64 },

    /// Upstream 5xx-class failure; outcome unknown
    #[error("Upstream gateway failure (status {status})")]
    Upstream { status: u16 },

    /// Unknown transaction hash in a status query
    #[error("Unknown transfer: {tx_hash}")]
    UnknownTransfer { tx_hash: String },
}

impl GatewayError {
    /// Whether retrying the same idempotency key is safe and worthwhile
    ///
    /// Only ambiguous failures are retryable; the adapter's idempotency
    /// contract is what makes the retry safe.
    pub fn retryable(&self) -> bool {
        matches!(
            self,
            Self::Unavailable { .. } | Self::Timeout { .. } | Self::Upstream { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;

/// An outbound transfer instruction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferInstruction {
    /// Caller-chosen idempotency key (the claim id for payouts)
    pub reference: String,
    /// Rail-specific recipient address or account
    pub recipient: String,
    pub amount: Amount,
    pub rail: PaymentRail,
    pub memo: Option<String>,
}

/// Proof of a submitted transfer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferReceipt {
    /// Rail-assigned transaction hash
    pub tx_hash: String,
    /// Echo of the instruction's idempotency key
    pub reference: String,
    pub rail: PaymentRail,
    pub submitted_at: DateTime<Utc>,
}

/// Settlement state of a previously submitted transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferStatus {
    /// Accepted by the rail, not yet final
    Pending,
    /// Finalized on the rail
    Confirmed,
    /// The rail reports the transfer failed
    Failed,
}

/// The bank gateway port
///
/// Adapters wrap concrete rails (bank APIs, chain RPCs) behind this trait.
#[async_trait]
pub trait BankGateway: Send + Sync {
    /// Submit a transfer; idempotent on `instruction.reference`
    async fn transfer(&self, instruction: &TransferInstruction) -> Result<TransferReceipt>;

    /// Whether the rail is currently reachable
    async fn is_available(&self) -> bool;

    /// Look up the settlement state of an earlier transfer
    async fn transfer_status(&self, tx_hash: &str) -> Result<TransferStatus>;
}

/// Failure script for the mock gateway
#[derive(Debug, Clone)]
enum FailureMode {
    None,
    /// Fail the next N transfer calls with the given error, then succeed
    FailNext(u32, GatewayErrorKind),
    /// Fail every transfer call
    FailAlways(GatewayErrorKind),
}

/// Which error the mock should produce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayErrorKind {
    Timeout,
    Upstream,
    Unavailable,
    Rejected,
}

impl GatewayErrorKind {
    fn to_error(self) -> GatewayError {
        match self {
            Self::Timeout => GatewayError::Timeout { seconds: 10 },
            Self::Upstream => GatewayError::Upstream { status: 503 },
            Self::Unavailable => GatewayError::Unavailable {
                message: "rail offline".to_string(),
            },
            Self::Rejected => GatewayError::Rejected {
                reason: "recipient account closed".to_string(),
            },
        }
    }
}

#[derive(Default)]
struct MockState {
    /// Completed transfers by idempotency reference
    by_reference: HashMap<String, TransferReceipt>,
    /// Settlement state by tx hash
    statuses: HashMap<String, TransferStatus>,
    failure: Option<FailureMode>,
    transfer_calls: u32,
}

/// In-memory gateway adapter for tests and local runs
///
/// Honors the idempotency contract: a repeated reference returns the
/// original receipt without moving money again, even after the mock
/// reported an ambiguous failure for that reference.
#[derive(Clone)]
pub struct MockBankGateway {
    state: Arc<Mutex<MockState>>,
    /// Per-transfer safety limit, if any
    transfer_limit: Option<Amount>,
    rail: PaymentRail,
}

impl MockBankGateway {
    pub fn new(rail: PaymentRail) -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState::default())),
            transfer_limit: None,
            rail,
        }
    }

    /// Set a per-transfer safety limit
    pub fn with_transfer_limit(mut self, limit: Amount) -> Self {
        self.transfer_limit = Some(limit);
        self
    }

    /// Fail the next `n` transfer calls with `kind`, then recover
    pub async fn fail_next(&self, n: u32, kind: GatewayErrorKind) {
        self.state.lock().await.failure = Some(FailureMode::FailNext(n, kind));
    }

    /// Fail every transfer call with `kind`
    pub async fn fail_always(&self, kind: GatewayErrorKind) {
        self.state.lock().await.failure = Some(FailureMode::FailAlways(kind));
    }

    /// Stop injecting failures
    pub async fn heal(&self) {
        self.state.lock().await.failure = Some(FailureMode::None);
    }

    /// Mark a pending transfer as confirmed (simulates rail finality)
    pub async fn confirm(&self, tx_hash: &str) {
        self.state
            .lock()
            .await
            .statuses
            .insert(tx_hash.to_string(), TransferStatus::Confirmed);
    }

    /// How many transfer calls the mock has seen
    pub async fn transfer_calls(&self) -> u32 {
        self.state.lock().await.transfer_calls
    }

    /// Number of distinct transfers actually executed
    pub async fn executed_transfers(&self) -> usize {
        self.state.lock().await.by_reference.len()
    }

    fn mint_tx_hash() -> String {
        let mut bytes = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut bytes);
        format!("0x{}", hex::encode(bytes))
    }
}

#[async_trait]
impl BankGateway for MockBankGateway {
    async fn transfer(&self, instruction: &TransferInstruction) -> Result<TransferReceipt> {
        let mut state = self.state.lock().await;
        state.transfer_calls += 1;

        // Idempotency gate comes first: a replayed reference returns the
        // original receipt no matter what the failure script says now.
        if let Some(receipt) = state.by_reference.get(&instruction.reference) {
            info!(reference = %instruction.reference, "duplicate transfer reference, returning original receipt");
            return Ok(receipt.clone());
        }

        if let Some(limit) = self.transfer_limit {
            if instruction.amount.micros > limit.micros {
                return Err(GatewayError::LimitExceeded {
                    requested: instruction.amount,
                    limit,
                });
            }
        }

        match state.failure.clone() {
            Some(FailureMode::FailAlways(kind)) => {
                warn!(reference = %instruction.reference, "mock gateway failing transfer (always)");
                return Err(kind.to_error());
            }
            Some(FailureMode::FailNext(n, kind)) if n > 0 => {
                state.failure = Some(FailureMode::FailNext(n - 1, kind));
                warn!(reference = %instruction.reference, remaining = n - 1, "mock gateway failing transfer (scripted)");
                return Err(kind.to_error());
            }
            _ => {}
        }

        let receipt = TransferReceipt {
            tx_hash: Self::mint_tx_hash(),
            reference: instruction.reference.clone(),
            rail: self.rail,
            submitted_at: Utc::now(),
        };
        state
            .by_reference
            .insert(instruction.reference.clone(), receipt.clone());
        state
            .statuses
            .insert(receipt.tx_hash.clone(), TransferStatus::Pending);
        info!(reference = %instruction.reference, tx_hash = %receipt.tx_hash, amount = %instruction.amount, "mock transfer executed");
        Ok(receipt)
    }

    async fn is_available(&self) -> bool {
        !matches!(
            self.state.lock().await.failure,
            Some(FailureMode::FailAlways(GatewayErrorKind::Unavailable))
        )
    }

    async fn transfer_status(&self, tx_hash: &str) -> Result<TransferStatus> {
        self.state
            .lock()
            .await
            .statuses
            .get(tx_hash)
            .copied()
            .ok_or_else(|| GatewayError::UnknownTransfer {
                tx_hash: tx_hash.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vaultflow_types::Currency::USD;

    fn instruction(reference: &str, units: i64) -> TransferInstruction {
        TransferInstruction {
            reference: reference.to_string(),
            recipient: "acct_abc".to_string(),
            amount: Amount::from_units(units, USD).unwrap(),
            rail: PaymentRail::Fiat,
            memo: None,
        }
    }

    #[tokio::test]
    async fn transfer_returns_receipt_with_echoed_reference() {
        let gateway = MockBankGateway::new(PaymentRail::Fiat);
        let receipt = gateway.transfer(&instruction("CLAIM-1", 500)).await.unwrap();
        assert_eq!(receipt.reference, "CLAIM-1");
        assert!(receipt.tx_hash.starts_with("0x"));
        assert_eq!(
            gateway.transfer_status(&receipt.tx_hash).await.unwrap(),
            TransferStatus::Pending
        );
    }

    #[tokio::test]
    async fn same_reference_never_double_transfers() {
        let gateway = MockBankGateway::new(PaymentRail::Fiat);
        let first = gateway.transfer(&instruction("CLAIM-1", 500)).await.unwrap();
        let second = gateway.transfer(&instruction("CLAIM-1", 500)).await.unwrap();
        assert_eq!(first.tx_hash, second.tx_hash);
        assert_eq!(gateway.executed_transfers().await, 1);
    }

    #[tokio::test]
    async fn retry_after_ambiguous_failure_is_idempotent() {
        let gateway = MockBankGateway::new(PaymentRail::Fiat);
        gateway.fail_next(1, GatewayErrorKind::Timeout).await;

        let err = gateway.transfer(&instruction("CLAIM-1", 500)).await.unwrap_err();
        assert!(err.retryable());

        // Retry with the same reference succeeds exactly once
        let receipt = gateway.transfer(&instruction("CLAIM-1", 500)).await.unwrap();
        let replay = gateway.transfer(&instruction("CLAIM-1", 500)).await.unwrap();
        assert_eq!(receipt.tx_hash, replay.tx_hash);
        assert_eq!(gateway.executed_transfers().await, 1);
    }

    #[tokio::test]
    async fn limit_violation_is_not_retryable() {
        let gateway = MockBankGateway::new(PaymentRail::Fiat)
            .with_transfer_limit(Amount::from_units(1_000, USD).unwrap());
        let err = gateway.transfer(&instruction("CLAIM-1", 5_000)).await.unwrap_err();
        assert!(matches!(err, GatewayError::LimitExceeded { .. }));
        assert!(!err.retryable());
        assert_eq!(gateway.executed_transfers().await, 0);
    }

    #[tokio::test]
    async fn rejection_is_permanent() {
        let gateway = MockBankGateway::new(PaymentRail::Fiat);
        gateway.fail_always(GatewayErrorKind::Rejected).await;
        let err = gateway.transfer(&instruction("CLAIM-1", 500)).await.unwrap_err();
        assert!(matches!(err, GatewayError::Rejected { .. }));
        assert!(!err.retryable());
    }

    #[tokio::test]
    async fn availability_tracks_failure_script() {
        let gateway = MockBankGateway::new(PaymentRail::Crypto);
        assert!(gateway.is_available().await);
        gateway.fail_always(GatewayErrorKind::Unavailable).await;
        assert!(!gateway.is_available().await);
        gateway.heal().await;
        assert!(gateway.is_available().await);
    }

    #[tokio::test]
    async fn status_of_unknown_hash_errors() {
        let gateway = MockBankGateway::new(PaymentRail::Fiat);
        let err = gateway.transfer_status("0xdeadbeef").await.unwrap_err();
        assert!(matches!(err, GatewayError::UnknownTransfer { .. }));
    }

    #[tokio::test]
    async fn confirm_marks_transfer_final() {
        let gateway = MockBankGateway::new(PaymentRail::Fiat);
        let receipt = gateway.transfer(&instruction("CLAIM-1", 500)).await.unwrap();
        gateway.confirm(&receipt.tx_hash).await;
        assert_eq!(
            gateway.transfer_status(&receipt.tx_hash).await.unwrap(),
            TransferStatus::Confirmed
        );
    }
}
