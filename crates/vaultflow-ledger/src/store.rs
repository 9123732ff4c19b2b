//! Ledger storage port
//!
//! The ledger core validates; the store persists. The store is injected so
//! tests run against the in-memory implementation and production can slot in
//! a transactional database behind the same trait. The append-only contract
//! is part of the trait: there is no update or delete operation at all.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use vaultflow_types::{Account, Currency, TransactionId};

use crate::{LedgerError, LedgerTransaction, Result};

/// Storage port for the ledger
///
/// `append` must be atomic: either the whole transaction and its balance
/// deltas become visible together, or nothing does. `snapshot` must return a
/// consistent point-in-time view even while writers are active.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Atomically persist a validated transaction
    async fn append(&self, transaction: LedgerTransaction) -> Result<()>;

    /// Fetch one transaction by id
    async fn get(&self, id: &TransactionId) -> Result<Option<LedgerTransaction>>;

    /// Consistent point-in-time copy of every transaction, in append order
    async fn snapshot(&self) -> Result<Vec<LedgerTransaction>>;

    /// Cached balance for (account, currency), maintained atomically with append
    async fn cached_balance(&self, account: Account, currency: Currency) -> Result<i64>;

    /// Number of persisted transactions
    async fn transaction_count(&self) -> Result<usize>;
}

#[derive(Default)]
struct MemoryLedgerInner {
    transactions: Vec<LedgerTransaction>,
    by_id: HashMap<TransactionId, usize>,
    balances: HashMap<(Account, Currency), i64>,
}

/// In-memory ledger store
///
/// A single `RwLock` over all state makes every append a critical section, so
/// the balance cache can never drift from the entry log within a process.
#[derive(Clone, Default)]
pub struct MemoryLedgerStore {
    inner: Arc<RwLock<MemoryLedgerInner>>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn append(&self, transaction: LedgerTransaction) -> Result<()> {
        let mut inner = self.inner.write().await;
        if inner.by_id.contains_key(&transaction.id) {
            return Err(LedgerError::DuplicateTransaction {
                transaction_id: transaction.id,
            });
        }
        for entry in &transaction.entries {
            *inner
                .balances
                .entry((entry.account, entry.amount.currency))
                .or_insert(0) += entry.amount.micros;
        }
        let idx = inner.transactions.len();
        inner.by_id.insert(transaction.id, idx);
        inner.transactions.push(transaction);
        Ok(())
    }

    async fn get(&self, id: &TransactionId) -> Result<Option<LedgerTransaction>> {
        let inner = self.inner.read().await;
        Ok(inner.by_id.get(id).map(|&idx| inner.transactions[idx].clone()))
    }

    async fn snapshot(&self) -> Result<Vec<LedgerTransaction>> {
        let inner = self.inner.read().await;
        Ok(inner.transactions.clone())
    }

    async fn cached_balance(&self, account: Account, currency: Currency) -> Result<i64> {
        let inner = self.inner.read().await;
        Ok(inner
            .balances
            .get(&(account, currency))
            .copied()
            .unwrap_or(0))
    }

    async fn transaction_count(&self) -> Result<usize> {
        let inner = self.inner.read().await;
        Ok(inner.transactions.len())
    }
}
