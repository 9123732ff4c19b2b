//! The payout state machine
//!
//! For one claim at a time: idempotency gate, decision fetch, verdict gate,
//! treasury lock, ledger post, gateway transfer, idempotency seal. Distinct
//! claims run concurrently; one claim never runs twice at once.
//!
//! Ordering is everything here. The treasury lock and the ledger post both
//! happen before the gateway call, so a liquidity or ledger failure aborts
//! with no money moved. Once the ledger transaction is committed it is
//! immutable; a transfer failure after that point can only be surfaced as
//! `ReconciliationRequired`, never patched over by touching history.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use tracing::{error, info, warn};
use vaultflow_gateway::{BankGateway, GatewayError, TransferInstruction};
use vaultflow_ledger::{Ledger, NewEntry};
use vaultflow_treasury::PoolManager;
use vaultflow_types::{
    Account, Amount, ClaimId, Currency, DecisionRecord, DecisionStatus, PoolId, ReferenceType,
};

use crate::{
    BeginOutcome, DecisionSource, DecisionVerifier, OrchestratorError, PayoutRecord, PayoutStatus,
    PayoutStore, Result,
};

/// Actor string recorded on ledger transactions posted by the orchestrator
const LEDGER_ACTOR: &str = "payout-orchestrator";

/// Orchestrator tuning knobs
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Attempts at fetching a decision before giving up
    pub max_fetch_attempts: u32,
    /// Attempts at the gateway transfer before flagging reconciliation
    pub max_transfer_attempts: u32,
    /// Base backoff between retries; doubles per attempt
    pub retry_backoff: Duration,
    /// Timeout applied to every external call
    pub call_timeout: Duration,
    /// Age after which a `Processing` record left by a dead worker is
    /// reclaimed by the reconciliation sweep
    pub stale_processing_ttl: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_fetch_attempts: 3,
            max_transfer_attempts: 3,
            retry_backoff: Duration::from_millis(250),
            call_timeout: Duration::from_secs(10),
            stale_processing_ttl: Duration::from_secs(15 * 60),
        }
    }
}

/// Outcome of a reconciliation sweep over stuck payouts
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    /// In-doubt transfers resolved as settled
    pub settled: usize,
    /// In-doubt transfers flagged for human reconciliation
    pub flagged: usize,
    /// Stale `Processing` records returned to the re-enterable `Failed` state
    pub reclaimed: usize,
}

/// The payout orchestrator
#[derive(Clone)]
pub struct PayoutOrchestrator {
    ledger: Ledger,
    treasury: PoolManager,
    gateway: Arc<dyn BankGateway>,
    source: Arc<dyn DecisionSource>,
    verifier: Arc<dyn DecisionVerifier>,
    store: Arc<dyn PayoutStore>,
    /// Pool routing: which pool pays out each currency
    pools: HashMap<Currency, PoolId>,
    /// Claims currently executing in this process
    in_flight: Arc<Mutex<HashSet<ClaimId>>>,
    config: OrchestratorConfig,
}

/// Removes the claim from the in-flight set when execution ends
struct InFlightGuard {
    set: Arc<Mutex<HashSet<ClaimId>>>,
    claim_id: ClaimId,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if let Ok(mut set) = self.set.lock() {
            set.remove(&self.claim_id);
        }
    }
}

impl PayoutOrchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        ledger: Ledger,
        treasury: PoolManager,
        gateway: Arc<dyn BankGateway>,
        source: Arc<dyn DecisionSource>,
        verifier: Arc<dyn DecisionVerifier>,
        store: Arc<dyn PayoutStore>,
        pools: HashMap<Currency, PoolId>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            ledger,
            treasury,
            gateway,
            source,
            verifier,
            store,
            pools,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
            config,
        }
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn treasury(&self) -> &PoolManager {
        &self.treasury
    }

    pub fn store(&self) -> &Arc<dyn PayoutStore> {
        &self.store
    }

    /// Process a claim end to end, fetching its decision from the source
    ///
    /// Idempotent: once a claim is settled (or otherwise terminal) the
    /// persisted record is returned unchanged and nothing re-executes.
    pub async fn process_claim(&self, claim_id: &ClaimId) -> Result<PayoutRecord> {
        // Idempotency pre-check before spending a fetch on a settled claim.
        // The authoritative gate is the store insert inside process_decision.
        if let Some(existing) = self.store.get(claim_id).await? {
            if !existing.status.is_reenterable() {
                info!(claim_id = %claim_id, status = ?existing.status, "claim already recorded, returning unchanged");
                return Ok(existing);
            }
        }

        let decision = self.fetch_with_retry(claim_id).await?;
        self.process_decision(decision).await
    }

    /// Process an already-fetched decision (the intake paths land here)
    pub async fn process_decision(&self, decision: DecisionRecord) -> Result<PayoutRecord> {
        let claim_id = decision.claim_id.clone();

        // One execution per claim per process; the store gate below covers
        // racers in other processes or intake paths.
        let _guard = match self.try_claim_in_flight(&claim_id) {
            Some(guard) => guard,
            None => {
                if let Some(record) = self.store.get(&claim_id).await? {
                    return Ok(record);
                }
                return Err(OrchestratorError::Validation {
                    claim_id,
                    message: "claim is already executing".to_string(),
                });
            }
        };

        self.validate(&decision)?;
        self.verifier
            .verify(&decision)
            .map_err(|violation| OrchestratorError::SealVerification {
                claim_id: claim_id.clone(),
                violation,
            })?;

        let amount = Amount::from_micros(decision.amount_micros, decision.currency);
        let rail = if decision.currency.is_fiat() {
            vaultflow_gateway::PaymentRail::Fiat
        } else {
            vaultflow_gateway::PaymentRail::Crypto
        };
        let fresh = PayoutRecord::begin_processing(
            claim_id.clone(),
            decision.policy_id.clone(),
            decision.recipient.clone(),
            amount,
            rail,
        );

        // The serialization point: an atomic unique insert on claim id.
        let mut record = match self.store.begin(fresh).await? {
            BeginOutcome::Existing(existing) => {
                info!(claim_id = %claim_id, status = ?existing.status, "duplicate trigger, returning existing record");
                return Ok(existing);
            }
            BeginOutcome::Started(record) => record,
        };

        // Verdict gate: only PAY moves money
        if decision.status != DecisionStatus::Pay {
            record.failure_reason = Some(format!("decision verdict {}", decision.status));
            record.transition(PayoutStatus::Skipped);
            self.store.update(&record).await?;
            info!(claim_id = %claim_id, verdict = %decision.status, "claim skipped");
            return Ok(record);
        }

        // Large payouts park for a human before anything moves
        if self.treasury.requires_manual_approval(amount) && record.approved_by.is_none() {
            record.transition(PayoutStatus::PendingApproval);
            self.store.update(&record).await?;
            info!(claim_id = %claim_id, amount = %amount, "payout parked for manual approval");
            return Ok(record);
        }

        self.execute(record).await
    }

    /// Resume an over-threshold payout once a human signs off
    pub async fn approve_manual_payout(
        &self,
        claim_id: &ClaimId,
        approver: impl Into<String>,
    ) -> Result<PayoutRecord> {
        let _guard = self.try_claim_in_flight(claim_id).ok_or_else(|| {
            OrchestratorError::InvalidApproval {
                claim_id: claim_id.clone(),
                message: "claim is already executing".to_string(),
            }
        })?;

        let mut record = self
            .store
            .get(claim_id)
            .await?
            .ok_or_else(|| OrchestratorError::InvalidApproval {
                claim_id: claim_id.clone(),
                message: "no payout record".to_string(),
            })?;
        if record.status != PayoutStatus::PendingApproval {
            return Err(OrchestratorError::InvalidApproval {
                claim_id: claim_id.clone(),
                message: format!("record is {:?}, not pending approval", record.status),
            });
        }

        record.approved_by = Some(approver.into());
        record.transition(PayoutStatus::Processing);
        self.store.update(&record).await?;
        info!(claim_id = %claim_id, approver = ?record.approved_by, "manual approval granted");

        self.execute(record).await
    }

    /// Payouts parked for a human approver
    pub async fn pending_manual_review(&self) -> Result<Vec<PayoutRecord>> {
        Ok(self
            .store
            .all()
            .await?
            .into_iter()
            .filter(|r| r.status == PayoutStatus::PendingApproval)
            .collect())
    }

    /// Re-drive payouts a crashed worker left behind
    ///
    /// Three stuck shapes, three remedies:
    /// - `BankTransferPending`: the process died inside the gateway window.
    ///   Re-issuing the transfer is safe because the gateway is idempotent on
    ///   the claim reference: either we learn the original outcome or the
    ///   transfer finally happens, exactly once.
    /// - `LedgerLocked`: the ledger committed but no transfer was attempted
    ///   (the record is moved to `BankTransferPending` before any gateway
    ///   call). Re-driven the same way.
    /// - `Processing` older than the stale TTL: nothing was persisted beyond
    ///   the record itself, so it is returned to the re-enterable `Failed`
    ///   state and a later trigger pays it normally. Any treasury lock
    ///   orphaned by the same crash is reclaimed by `expire_stale_locks`.
    pub async fn reconcile_pending(&self) -> Result<ReconcileSummary> {
        let mut summary = ReconcileSummary::default();
        let now = Utc::now();
        let stale_after = chrono::Duration::from_std(self.config.stale_processing_ttl)
            .unwrap_or(chrono::Duration::MAX);

        for mut record in self.store.all().await? {
            match record.status {
                PayoutStatus::BankTransferPending | PayoutStatus::LedgerLocked => {
                    let _guard = match self.try_claim_in_flight(&record.claim_id) {
                        Some(guard) => guard,
                        None => continue, // actively executing, not stuck
                    };
                    let instruction = self.instruction_for(&record);
                    match self.gateway.transfer(&instruction).await {
                        Ok(receipt) => {
                            record.tx_hash = Some(receipt.tx_hash);
                            record.transition(PayoutStatus::Settled);
                            self.store.update(&record).await?;
                            self.release_lock_quietly(&record).await;
                            info!(claim_id = %record.claim_id, "in-doubt transfer reconciled as settled");
                            summary.settled += 1;
                        }
                        Err(e) if e.retryable() => {
                            // Still ambiguous; leave for the next sweep
                        }
                        Err(e) => {
                            record.failure_reason = Some(e.to_string());
                            record.transition(PayoutStatus::ReconciliationRequired);
                            self.store.update(&record).await?;
                            self.restore_lock_quietly(&record).await;
                            error!(claim_id = %record.claim_id, error = %e, "in-doubt transfer failed, flagged for reconciliation");
                            summary.flagged += 1;
                        }
                    }
                }
                PayoutStatus::Processing if now - record.updated_at > stale_after => {
                    let _guard = match self.try_claim_in_flight(&record.claim_id) {
                        Some(guard) => guard,
                        None => continue,
                    };
                    record.fail("worker lost before any side effect; reclaimed by sweep");
                    self.store.update(&record).await?;
                    warn!(claim_id = %record.claim_id, "stale processing record reclaimed");
                    summary.reclaimed += 1;
                }
                _ => {}
            }
        }
        Ok(summary)
    }

    // ------------------------------------------------------------------
    // Pipeline internals
    // ------------------------------------------------------------------

    fn try_claim_in_flight(&self, claim_id: &ClaimId) -> Option<InFlightGuard> {
        let mut set = self.in_flight.lock().ok()?;
        if !set.insert(claim_id.clone()) {
            return None;
        }
        Some(InFlightGuard {
            set: Arc::clone(&self.in_flight),
            claim_id: claim_id.clone(),
        })
    }

    fn validate(&self, decision: &DecisionRecord) -> Result<()> {
        let claim_id = decision.claim_id.clone();
        if decision.status == DecisionStatus::Pay && decision.amount_micros <= 0 {
            return Err(OrchestratorError::Validation {
                claim_id,
                message: format!("non-positive payout amount {}", decision.amount_micros),
            });
        }
        if decision.recipient.trim().is_empty() {
            return Err(OrchestratorError::Validation {
                claim_id,
                message: "empty recipient".to_string(),
            });
        }
        Ok(())
    }

    async fn fetch_with_retry(&self, claim_id: &ClaimId) -> Result<DecisionRecord> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let fetch = tokio::time::timeout(
                self.config.call_timeout,
                self.source.fetch_decision(claim_id),
            )
            .await
            .unwrap_or_else(|_| {
                Err(crate::FetchError::Transient {
                    message: format!("fetch timed out after {:?}", self.config.call_timeout),
                    retry_after: None,
                })
            });

            match fetch {
                Ok(decision) => return Ok(decision),
                Err(e) if e.retryable() && attempt < self.config.max_fetch_attempts => {
                    let delay = match &e {
                        crate::FetchError::Transient {
                            retry_after: Some(delay),
                            ..
                        } => *delay,
                        _ => self.backoff_for(attempt),
                    };
                    warn!(claim_id = %claim_id, attempt, delay_ms = delay.as_millis() as u64, "transient decision fetch failure, retrying");
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    return Err(OrchestratorError::DecisionFetch {
                        claim_id: claim_id.clone(),
                        source: e,
                    })
                }
            }
        }
    }

    async fn execute(&self, mut record: PayoutRecord) -> Result<PayoutRecord> {
        let claim_id = record.claim_id.clone();
        let amount = record.amount;

        // Treasury lock: check-then-decrement, atomic per pool
        let Some(&pool_id) = self.pools.get(&amount.currency) else {
            record.fail(format!("no pool configured for {}", amount.currency));
            self.store.update(&record).await?;
            return Err(OrchestratorError::NoPoolForCurrency {
                currency: amount.currency,
            });
        };
        let lock = self
            .treasury
            .lock_funds(pool_id, claim_id.clone(), amount)
            .await
            .map_err(|source| OrchestratorError::Treasury {
                claim_id: claim_id.clone(),
                source,
            })?;
        let Some(lock) = lock else {
            let check = self.treasury.check_liquidity(pool_id, amount).await;
            record.fail("insufficient liquidity");
            self.store.update(&record).await?;
            return Err(OrchestratorError::Liquidity {
                claim_id,
                needed: amount,
                available: check.available_balance,
            });
        };
        record.lock_id = Some(lock.id);

        // Ledger post: immutable once committed. A rejection here aborts
        // before any external call; the reservation goes back to the pool.
        let entries = vec![
            NewEntry::new(Account::ExpenseClaims, amount)
                .with_memo(format!("claim {} payout", claim_id)),
            NewEntry::new(Account::AssetTreasury, amount.negate()),
        ];
        let transaction = match self
            .ledger
            .record_transaction(
                entries,
                claim_id.to_string(),
                ReferenceType::ClaimPayout,
                format!("Claim {} payout to {}", claim_id, record.recipient),
                LEDGER_ACTOR,
            )
            .await
        {
            Ok(tx) => tx,
            Err(source) => {
                self.restore_lock_quietly(&record).await;
                record.fail(format!("ledger rejected transaction: {source}"));
                self.store.update(&record).await?;
                return Err(OrchestratorError::Ledger { claim_id, source });
            }
        };
        record.ledger_tx_id = Some(transaction.id);
        record.transition(PayoutStatus::LedgerLocked);
        self.store.update(&record).await?;

        // Gateway transfer. From here on the ledger is committed, so every
        // terminal failure is a reconciliation case, not a rollback.
        record.transition(PayoutStatus::BankTransferPending);
        self.store.update(&record).await?;

        match self.transfer_with_retry(&record).await {
            Ok(receipt) => {
                record.tx_hash = Some(receipt.tx_hash.clone());
                record.transition(PayoutStatus::Settled);
                self.store.update(&record).await?;
                self.release_lock_quietly(&record).await;
                info!(claim_id = %claim_id, tx_hash = %receipt.tx_hash, amount = %amount, "payout settled");
                Ok(record)
            }
            Err(gateway_error) => {
                let reason = gateway_error.to_string();
                record.failure_reason = Some(reason.clone());
                record.transition(PayoutStatus::ReconciliationRequired);
                self.store.update(&record).await?;
                // The money never left, so the reservation is returned; the
                // ledger transaction stays for the reconciler to resolve.
                self.restore_lock_quietly(&record).await;
                error!(claim_id = %claim_id, error = %reason, "transfer failed after ledger commit, reconciliation required");
                Err(OrchestratorError::ReconciliationRequired { claim_id, reason })
            }
        }
    }

    async fn transfer_with_retry(
        &self,
        record: &PayoutRecord,
    ) -> std::result::Result<vaultflow_gateway::TransferReceipt, GatewayError> {
        let instruction = self.instruction_for(record);
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let result = tokio::time::timeout(
                self.config.call_timeout,
                self.gateway.transfer(&instruction),
            )
            .await
            .unwrap_or_else(|_| {
                Err(GatewayError::Timeout {
                    seconds: self.config.call_timeout.as_secs(),
                })
            });

            match result {
                Ok(receipt) => return Ok(receipt),
                // Retry is safe only because the gateway is idempotent on
                // the claim reference
                Err(e) if e.retryable() && attempt < self.config.max_transfer_attempts => {
                    let delay = self.backoff_for(attempt);
                    warn!(claim_id = %record.claim_id, attempt, error = %e, "retryable gateway failure, backing off");
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn instruction_for(&self, record: &PayoutRecord) -> TransferInstruction {
        TransferInstruction {
            reference: record.claim_id.to_string(),
            recipient: record.recipient.clone(),
            amount: record.amount,
            rail: record.rail,
            memo: Some(format!("claim {} payout", record.claim_id)),
        }
    }

    fn backoff_for(&self, attempt: u32) -> Duration {
        self.config.retry_backoff * 2u32.saturating_pow(attempt.saturating_sub(1))
    }

    async fn release_lock_quietly(&self, record: &PayoutRecord) {
        if let Some(lock_id) = record.lock_id {
            if let Err(e) = self.treasury.release_lock(lock_id).await {
                warn!(claim_id = %record.claim_id, lock_id = %lock_id, error = %e, "lock release failed; expiry sweep will reclaim");
            }
        }
    }

    async fn restore_lock_quietly(&self, record: &PayoutRecord) {
        if let Some(lock_id) = record.lock_id {
            if let Err(e) = self.treasury.restore_lock_funds(lock_id).await {
                warn!(claim_id = %record.claim_id, lock_id = %lock_id, error = %e, "lock restore failed; expiry sweep will reclaim");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AcceptAllVerifier, BeginOutcome, MemoryPayoutStore, StaticDecisionSource};
    use vaultflow_gateway::{GatewayErrorKind, MockBankGateway, PaymentRail};
    use vaultflow_treasury::TreasuryConfig;
    use vaultflow_types::{AuditSeal, Currency::USD, PolicyId};

    async fn orchestrator_with(
        gateway: Arc<MockBankGateway>,
        store: Arc<MemoryPayoutStore>,
        source: StaticDecisionSource,
        config: OrchestratorConfig,
    ) -> PayoutOrchestrator {
        let treasury = PoolManager::new(TreasuryConfig::default());
        let pool = treasury
            .create_pool(
                "usd-main",
                USD,
                Amount::from_units(1_000, USD).unwrap(),
                Amount::from_units(100, USD).unwrap(),
            )
            .await
            .unwrap();
        let mut pools = HashMap::new();
        pools.insert(USD, pool.id);
        PayoutOrchestrator::new(
            Ledger::in_memory(),
            treasury,
            gateway,
            Arc::new(source),
            Arc::new(AcceptAllVerifier),
            store,
            pools,
            config,
        )
    }

    fn quick_config() -> OrchestratorConfig {
        OrchestratorConfig {
            retry_backoff: Duration::from_millis(1),
            ..OrchestratorConfig::default()
        }
    }

    fn pay_decision(claim: &str, units: i64) -> DecisionRecord {
        DecisionRecord {
            claim_id: ClaimId::new(claim),
            policy_id: PolicyId::new("POL-1"),
            status: DecisionStatus::Pay,
            amount_micros: units * 1_000_000,
            currency: USD,
            recipient: "acct_claimant".to_string(),
            decision_timestamp: Utc::now(),
            audit_seal: AuditSeal {
                hash: String::new(),
                signer_id: "issuer-1".to_string(),
                timestamp: Utc::now(),
            },
        }
    }

    /// Plant a record frozen in `status`, as left behind by a worker that
    /// died mid-pipeline
    async fn plant_stuck(store: &MemoryPayoutStore, claim: &str, status: PayoutStatus) -> PayoutRecord {
        let fresh = PayoutRecord::begin_processing(
            ClaimId::new(claim),
            PolicyId::new("POL-1"),
            "acct_dead",
            Amount::from_units(75, USD).unwrap(),
            PaymentRail::Fiat,
        );
        let mut record = match store.begin(fresh).await.unwrap() {
            BeginOutcome::Started(r) => r,
            BeginOutcome::Existing(_) => unreachable!(),
        };
        record.transition(status);
        store.update(&record).await.unwrap();
        record
    }

    #[tokio::test]
    async fn reconcile_settles_in_doubt_transfer_exactly_once() {
        let gateway = Arc::new(MockBankGateway::new(PaymentRail::Fiat));
        let store = Arc::new(MemoryPayoutStore::new());
        let orchestrator = orchestrator_with(
            Arc::clone(&gateway),
            Arc::clone(&store),
            StaticDecisionSource::new(),
            quick_config(),
        )
        .await;

        plant_stuck(&store, "CLAIM-DOUBT", PayoutStatus::BankTransferPending).await;

        let summary = orchestrator.reconcile_pending().await.unwrap();
        assert_eq!(
            summary,
            ReconcileSummary {
                settled: 1,
                ..ReconcileSummary::default()
            }
        );

        let record = store.get(&ClaimId::new("CLAIM-DOUBT")).await.unwrap().unwrap();
        assert_eq!(record.status, PayoutStatus::Settled);
        assert!(record.tx_hash.is_some());

        // A second sweep finds nothing pending and touches nothing
        let again = orchestrator.reconcile_pending().await.unwrap();
        assert_eq!(again, ReconcileSummary::default());
        assert_eq!(gateway.executed_transfers().await, 1);
    }

    #[tokio::test]
    async fn reconcile_flags_permanently_rejected_transfer() {
        let gateway = Arc::new(MockBankGateway::new(PaymentRail::Fiat));
        let store = Arc::new(MemoryPayoutStore::new());
        let orchestrator = orchestrator_with(
            Arc::clone(&gateway),
            Arc::clone(&store),
            StaticDecisionSource::new(),
            quick_config(),
        )
        .await;

        plant_stuck(&store, "CLAIM-DOUBT", PayoutStatus::BankTransferPending).await;
        gateway.fail_always(GatewayErrorKind::Rejected).await;

        let summary = orchestrator.reconcile_pending().await.unwrap();
        assert_eq!(
            summary,
            ReconcileSummary {
                flagged: 1,
                ..ReconcileSummary::default()
            }
        );

        let record = store.get(&ClaimId::new("CLAIM-DOUBT")).await.unwrap().unwrap();
        assert_eq!(record.status, PayoutStatus::ReconciliationRequired);
        assert!(record.failure_reason.is_some());
    }

    #[tokio::test]
    async fn reconcile_leaves_ambiguous_transfer_for_next_sweep() {
        let gateway = Arc::new(MockBankGateway::new(PaymentRail::Fiat));
        let store = Arc::new(MemoryPayoutStore::new());
        let orchestrator = orchestrator_with(
            Arc::clone(&gateway),
            Arc::clone(&store),
            StaticDecisionSource::new(),
            quick_config(),
        )
        .await;

        plant_stuck(&store, "CLAIM-DOUBT", PayoutStatus::BankTransferPending).await;
        gateway.fail_always(GatewayErrorKind::Unavailable).await;

        let summary = orchestrator.reconcile_pending().await.unwrap();
        assert_eq!(summary, ReconcileSummary::default());
        let record = store.get(&ClaimId::new("CLAIM-DOUBT")).await.unwrap().unwrap();
        assert_eq!(record.status, PayoutStatus::BankTransferPending);
    }

    #[tokio::test]
    async fn reconcile_re_drives_ledger_locked_record() {
        let gateway = Arc::new(MockBankGateway::new(PaymentRail::Fiat));
        let store = Arc::new(MemoryPayoutStore::new());
        let orchestrator = orchestrator_with(
            Arc::clone(&gateway),
            Arc::clone(&store),
            StaticDecisionSource::new(),
            quick_config(),
        )
        .await;

        // Worker died after the ledger commit, before any gateway call
        plant_stuck(&store, "CLAIM-LOCKED", PayoutStatus::LedgerLocked).await;

        let summary = orchestrator.reconcile_pending().await.unwrap();
        assert_eq!(
            summary,
            ReconcileSummary {
                settled: 1,
                ..ReconcileSummary::default()
            }
        );
        let record = store.get(&ClaimId::new("CLAIM-LOCKED")).await.unwrap().unwrap();
        assert_eq!(record.status, PayoutStatus::Settled);
        assert!(record.tx_hash.is_some());
        assert_eq!(gateway.executed_transfers().await, 1);
    }

    #[tokio::test]
    async fn stale_processing_record_is_reclaimed_and_can_be_repaid() {
        let gateway = Arc::new(MockBankGateway::new(PaymentRail::Fiat));
        let store = Arc::new(MemoryPayoutStore::new());
        let source = StaticDecisionSource::new();
        source.put(pay_decision("CLAIM-DEAD", 75)).await;
        let orchestrator = orchestrator_with(
            Arc::clone(&gateway),
            Arc::clone(&store),
            source,
            OrchestratorConfig {
                stale_processing_ttl: Duration::ZERO,
                ..quick_config()
            },
        )
        .await;

        // A dead worker's record wedges every direct trigger
        plant_stuck(&store, "CLAIM-DEAD", PayoutStatus::Processing).await;
        let stuck = orchestrator
            .process_claim(&ClaimId::new("CLAIM-DEAD"))
            .await
            .unwrap();
        assert_eq!(stuck.status, PayoutStatus::Processing);
        assert_eq!(gateway.executed_transfers().await, 0);

        // The sweep reclaims it into the re-enterable state
        let summary = orchestrator.reconcile_pending().await.unwrap();
        assert_eq!(
            summary,
            ReconcileSummary {
                reclaimed: 1,
                ..ReconcileSummary::default()
            }
        );
        let record = store.get(&ClaimId::new("CLAIM-DEAD")).await.unwrap().unwrap();
        assert_eq!(record.status, PayoutStatus::Failed);

        // ...and the next trigger pays the claim normally
        let settled = orchestrator
            .process_claim(&ClaimId::new("CLAIM-DEAD"))
            .await
            .unwrap();
        assert_eq!(settled.status, PayoutStatus::Settled);
        assert_eq!(gateway.executed_transfers().await, 1);
    }

    #[tokio::test]
    async fn fresh_processing_record_is_left_for_its_worker() {
        let gateway = Arc::new(MockBankGateway::new(PaymentRail::Fiat));
        let store = Arc::new(MemoryPayoutStore::new());
        let orchestrator = orchestrator_with(
            Arc::clone(&gateway),
            Arc::clone(&store),
            StaticDecisionSource::new(),
            quick_config(), // default 15-minute TTL
        )
        .await;

        plant_stuck(&store, "CLAIM-LIVE", PayoutStatus::Processing).await;

        let summary = orchestrator.reconcile_pending().await.unwrap();
        assert_eq!(summary, ReconcileSummary::default());
        let record = store.get(&ClaimId::new("CLAIM-LIVE")).await.unwrap().unwrap();
        assert_eq!(record.status, PayoutStatus::Processing);
        assert_eq!(gateway.transfer_calls().await, 0);
    }
}
