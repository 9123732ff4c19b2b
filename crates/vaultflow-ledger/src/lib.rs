//! VaultFlow Ledger - Immutable double-entry ledger
//!
//! The ledger is:
//! - Double-entry (every transaction's entries sum to exactly zero)
//! - Immutable (entries are append-only; corrections are new reversals)
//! - The sole source of truth for account balances
//!
//! # Invariants
//!
//! 1. Every persisted transaction has >= 2 entries summing to zero micros
//! 2. Nothing partial is ever written: validation happens before append
//! 3. Entries are never updated or deleted
//! 4. The balance cache always equals the sum of entries for its key

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use vaultflow_types::{
    Account, Amount, Currency, EntryId, ReferenceType, TransactionId,
};

mod store;

pub use store::{LedgerStore, MemoryLedgerStore};

/// Errors that can occur in ledger operations
#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    /// Transaction entries do not sum to zero
    #[error("Unbalanced transaction: entries sum to {sum_micros} micros, expected 0")]
    Unbalanced { sum_micros: i64 },

    /// Structural validation failure, nothing written
    #[error("Invalid transaction: {message}")]
    Validation { message: String },

    /// Entries mix currencies within one transaction
    #[error("Currency mismatch within transaction: {expected} and {actual}")]
    CurrencyMismatch { expected: Currency, actual: Currency },

    /// Referenced transaction does not exist
    #[error("Transaction not found: {transaction_id}")]
    TransactionNotFound { transaction_id: TransactionId },

    /// Transaction id already persisted
    #[error("Duplicate transaction id: {transaction_id}")]
    DuplicateTransaction { transaction_id: TransactionId },

    /// Storage backend failure
    #[error("Ledger storage error: {message}")]
    Storage { message: String },
}

pub type Result<T> = std::result::Result<T, LedgerError>;

/// One side of a double-entry, as submitted by a caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEntry {
    pub account: Account,
    /// Signed amount; debits positive, credits negative
    pub amount: Amount,
    pub memo: Option<String>,
}

impl NewEntry {
    pub fn new(account: Account, amount: Amount) -> Self {
        Self {
            account,
            amount,
            memo: None,
        }
    }

    pub fn with_memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = Some(memo.into());
        self
    }
}

/// An immutable, persisted ledger entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: EntryId,
    pub transaction_id: TransactionId,
    pub account: Account,
    /// Signed amount in micros; debits positive, credits negative
    pub amount: Amount,
    pub reference_id: String,
    pub reference_type: ReferenceType,
    pub created_at: DateTime<Utc>,
    pub memo: Option<String>,
}

/// A balanced, persisted double-entry transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerTransaction {
    pub id: TransactionId,
    pub entries: Vec<LedgerEntry>,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
}

impl LedgerTransaction {
    /// Sum of entry micros; zero for every valid transaction
    pub fn sum_micros(&self) -> i64 {
        self.entries.iter().map(|e| e.amount.micros).sum()
    }
}

/// Result of a full-ledger integrity scan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrityReport {
    pub valid: bool,
    /// Entry sums per currency; every value is zero on a healthy ledger.
    /// Sums are never mixed across currencies.
    pub global_sums_micros: HashMap<Currency, i64>,
    pub transactions_checked: usize,
    pub entries_checked: usize,
    /// Transactions whose entries do not sum to zero
    pub violations: Vec<TransactionId>,
}

/// The double-entry ledger service
///
/// Validates transactions and delegates persistence to an injected
/// [`LedgerStore`]. Cheap to clone; all clones share the same store.
#[derive(Clone)]
pub struct Ledger {
    store: Arc<dyn LedgerStore>,
}

impl Ledger {
    /// Create a ledger over an injected store
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Create a ledger over a fresh in-memory store
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryLedgerStore::new()))
    }

    /// Record a balanced transaction
    ///
    /// Requires at least two entries, a single currency, and a zero sum.
    /// Validation happens entirely before the store append, so a rejected
    /// transaction leaves no partial state behind.
    pub async fn record_transaction(
        &self,
        entries: Vec<NewEntry>,
        reference_id: impl Into<String>,
        reference_type: ReferenceType,
        description: impl Into<String>,
        created_by: impl Into<String>,
    ) -> Result<LedgerTransaction> {
        let reference_id = reference_id.into();
        let description = description.into();

        if entries.len() < 2 {
            return Err(LedgerError::Validation {
                message: format!(
                    "a double-entry transaction needs at least 2 entries, got {}",
                    entries.len()
                ),
            });
        }

        let currency = entries[0].amount.currency;
        let mut sum: i64 = 0;
        for entry in &entries {
            if entry.amount.currency != currency {
                return Err(LedgerError::CurrencyMismatch {
                    expected: currency,
                    actual: entry.amount.currency,
                });
            }
            if entry.amount.is_zero() {
                return Err(LedgerError::Validation {
                    message: format!("zero-amount entry for account {}", entry.account),
                });
            }
            sum = sum
                .checked_add(entry.amount.micros)
                .ok_or(LedgerError::Validation {
                    message: "entry amounts overflow i64".to_string(),
                })?;
        }
        if sum != 0 {
            return Err(LedgerError::Unbalanced { sum_micros: sum });
        }

        let transaction_id = TransactionId::new();
        let created_at = Utc::now();
        let transaction = LedgerTransaction {
            id: transaction_id,
            entries: entries
                .into_iter()
                .map(|e| LedgerEntry {
                    id: EntryId::new(),
                    transaction_id,
                    account: e.account,
                    amount: e.amount,
                    reference_id: reference_id.clone(),
                    reference_type,
                    created_at,
                    memo: e.memo,
                })
                .collect(),
            description,
            created_at,
            created_by: created_by.into(),
        };

        self.store.append(transaction.clone()).await?;
        info!(
            transaction_id = %transaction.id,
            reference_id = %reference_id,
            entries = transaction.entries.len(),
            "ledger transaction recorded"
        );
        Ok(transaction)
    }

    /// Balance for (account, currency) from the maintained cache
    ///
    /// The cache is updated atomically with every append; see
    /// [`Ledger::recompute_balance`] for the authoritative entry sum the
    /// cache must always agree with.
    pub async fn account_balance(&self, account: Account, currency: Currency) -> Result<Amount> {
        let micros = self.store.cached_balance(account, currency).await?;
        Ok(Amount::from_micros(micros, currency))
    }

    /// Authoritative balance: the sum over all historical entries for the key
    pub async fn recompute_balance(&self, account: Account, currency: Currency) -> Result<Amount> {
        let snapshot = self.store.snapshot().await?;
        let micros = snapshot
            .iter()
            .flat_map(|tx| tx.entries.iter())
            .filter(|e| e.account == account && e.amount.currency == currency)
            .map(|e| e.amount.micros)
            .sum();
        Ok(Amount::from_micros(micros, currency))
    }

    /// Scan the whole ledger and verify the double-entry invariant
    ///
    /// Operates on a point-in-time snapshot, so concurrent writers can never
    /// produce false positives: a transaction is either fully visible and
    /// balanced, or not visible at all.
    pub async fn verify_integrity(&self) -> Result<IntegrityReport> {
        let snapshot = self.store.snapshot().await?;

        let mut violations = Vec::new();
        let mut entries_checked = 0usize;
        let mut global_sums: HashMap<Currency, i64> = HashMap::new();

        for tx in &snapshot {
            entries_checked += tx.entries.len();
            let mut tx_sum: i64 = 0;
            for entry in &tx.entries {
                tx_sum += entry.amount.micros;
                *global_sums.entry(entry.amount.currency).or_insert(0) += entry.amount.micros;
            }
            if tx_sum != 0 {
                violations.push(tx.id);
            }
        }

        let valid = violations.is_empty() && global_sums.values().all(|&s| s == 0);
        if !valid {
            warn!(
                violations = violations.len(),
                global_sums = ?global_sums,
                "ledger integrity check failed"
            );
        }

        Ok(IntegrityReport {
            valid,
            global_sums_micros: global_sums,
            transactions_checked: snapshot.len(),
            entries_checked,
            violations,
        })
    }

    /// Append a correcting transaction that exactly negates the original
    ///
    /// History is never edited: the original transaction stays in place and
    /// the reversal is a new transaction referencing it.
    pub async fn record_reversal(
        &self,
        original_tx_id: TransactionId,
        reason: impl Into<String>,
        created_by: impl Into<String>,
    ) -> Result<LedgerTransaction> {
        let original = self
            .store
            .get(&original_tx_id)
            .await?
            .ok_or(LedgerError::TransactionNotFound {
                transaction_id: original_tx_id,
            })?;

        let entries = original
            .entries
            .iter()
            .map(|e| NewEntry {
                account: e.account,
                amount: e.amount.negate(),
                memo: e.memo.clone(),
            })
            .collect();

        self.record_transaction(
            entries,
            original_tx_id.to_string(),
            ReferenceType::Reversal,
            format!("Reversal of {}: {}", original_tx_id, reason.into()),
            created_by,
        )
        .await
    }

    /// Fetch one transaction by id
    pub async fn get_transaction(&self, id: &TransactionId) -> Result<Option<LedgerTransaction>> {
        self.store.get(id).await
    }

    /// Number of persisted transactions
    pub async fn transaction_count(&self) -> Result<usize> {
        self.store.transaction_count().await
    }
}
