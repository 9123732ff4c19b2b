//! Payout persistence port
//!
//! The store is THE serialization point for idempotency. `begin` is an
//! atomic unique-key insert on claim id, not a read-then-write: when two
//! workers race on the same claim, exactly one gets `Started` and the other
//! gets `Existing` with whatever record the winner inserted. An in-process
//! check alone would let both racers pass a stale read and double-pay.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use vaultflow_types::ClaimId;

use crate::{OrchestratorError, PayoutRecord, Result};

/// Outcome of the atomic claim gate
#[derive(Debug, Clone)]
pub enum BeginOutcome {
    /// This caller owns the claim; the fresh record was inserted
    Started(PayoutRecord),
    /// Another attempt already holds (or held) the claim
    Existing(PayoutRecord),
}

/// Storage port for payout records
#[async_trait]
pub trait PayoutStore: Send + Sync {
    /// Atomically insert `record` unless a record for its claim id exists
    ///
    /// A present record in a re-enterable state (`Failed`) is replaced and
    /// `Started` is returned; any other present record is returned as
    /// `Existing`, untouched.
    async fn begin(&self, record: PayoutRecord) -> Result<BeginOutcome>;

    /// Persist an updated record (same claim id must already exist)
    async fn update(&self, record: &PayoutRecord) -> Result<()>;

    async fn get(&self, claim_id: &ClaimId) -> Result<Option<PayoutRecord>>;

    async fn all(&self) -> Result<Vec<PayoutRecord>>;
}

/// In-memory payout store
///
/// A single mutex over the map gives `begin` its insert-if-absent atomicity.
#[derive(Clone, Default)]
pub struct MemoryPayoutStore {
    records: Arc<Mutex<HashMap<ClaimId, PayoutRecord>>>,
}

impl MemoryPayoutStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PayoutStore for MemoryPayoutStore {
    async fn begin(&self, record: PayoutRecord) -> Result<BeginOutcome> {
        let mut records = self.records.lock().await;
        match records.get(&record.claim_id) {
            Some(existing) if !existing.status.is_reenterable() => {
                Ok(BeginOutcome::Existing(existing.clone()))
            }
            _ => {
                records.insert(record.claim_id.clone(), record.clone());
                Ok(BeginOutcome::Started(record))
            }
        }
    }

    async fn update(&self, record: &PayoutRecord) -> Result<()> {
        let mut records = self.records.lock().await;
        if !records.contains_key(&record.claim_id) {
            return Err(OrchestratorError::Store {
                message: format!("update for unknown claim {}", record.claim_id),
            });
        }
        records.insert(record.claim_id.clone(), record.clone());
        Ok(())
    }

    async fn get(&self, claim_id: &ClaimId) -> Result<Option<PayoutRecord>> {
        Ok(self.records.lock().await.get(claim_id).cloned())
    }

    async fn all(&self) -> Result<Vec<PayoutRecord>> {
        Ok(self.records.lock().await.values().cloned().collect())
    }
}
