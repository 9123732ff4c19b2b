//! VaultFlow Treasury - Liquidity pools and fund locking
//!
//! The treasury tracks per-pool liquidity, issues time-boxed fund locks
//! against in-flight payouts, and raises alerts when reserves run low.
//!
//! # Invariants
//!
//! 1. Check-then-decrement is a single critical section per pool: concurrent
//!    lock attempts can never both observe sufficient balance and overdraw
//! 2. A successful lock and its pool-balance decrement are atomic
//! 3. Alerts are append-only and never auto-clear
//! 4. The pool balance counter is an operational cache; the ledger is the
//!    authority and `reconcile_pool` corrects any drift
//!
//! Releasing a lock does not by itself restore balance: after a settled
//! transfer the money is gone, so `release_lock` only retires the
//! reservation. When a transfer terminally fails after locking, the caller
//! uses `restore_lock_funds`, which retires the lock AND returns its amount
//! to the pool.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{info, warn};

use vaultflow_types::{AlertId, Amount, ClaimId, Currency, LockId, PoolId};

/// Treasury errors
#[derive(Debug, Clone, Error)]
pub enum TreasuryError {
    #[error("Pool not found: {pool_id}")]
    PoolNotFound { pool_id: PoolId },

    #[error("Pool {pool_id} is suspended")]
    PoolSuspended { pool_id: PoolId },

    #[error("Lock not found: {lock_id}")]
    LockNotFound { lock_id: LockId },

    #[error("Lock {lock_id} is not active (status {status:?})")]
    LockNotActive { lock_id: LockId, status: LockStatus },

    #[error("Alert not found: {alert_id}")]
    AlertNotFound { alert_id: AlertId },

    #[error("Invalid amount: {message}")]
    InvalidAmount { message: String },

    #[error("Currency mismatch: pool is {expected}, got {actual}")]
    CurrencyMismatch { expected: Currency, actual: Currency },
}

pub type Result<T> = std::result::Result<T, TreasuryError>;

/// Operational status of a liquidity pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PoolStatus {
    /// Balance at or above minimum reserve
    Active,
    /// Balance below minimum reserve
    LowReserve,
    /// No funds available
    Depleted,
    /// Manually suspended; no new locks
    Suspended,
}

/// A currency-scoped bucket of available funds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidityPool {
    pub id: PoolId,
    pub name: String,
    pub currency: Currency,
    /// Available balance (cache of the ledger-derived figure)
    pub balance: Amount,
    pub minimum_reserve: Amount,
    pub status: PoolStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Lifecycle of a fund lock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LockStatus {
    Locked,
    Released,
    Expired,
}

/// A time-boxed reservation of pool funds against one in-flight payout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundLock {
    pub id: LockId,
    pub pool_id: PoolId,
    pub claim_id: ClaimId,
    pub amount: Amount,
    pub locked_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub status: LockStatus,
}

/// Kind of treasury alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertType {
    /// Balance dropped below minimum reserve
    LowReserve,
    /// A lock attempt failed for insufficient funds
    LiquidityFailure,
    /// Pool has no funds left
    Depleted,
    /// Reconciliation found the cached balance out of step with the ledger
    BalanceDrift,
}

/// An operator-facing alert; append-only, cleared only by acknowledgement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreasuryAlert {
    pub id: AlertId,
    pub alert_type: AlertType,
    pub pool_id: PoolId,
    pub current_balance: Amount,
    pub threshold: Amount,
    pub message: String,
    pub acknowledged: bool,
    pub created_at: DateTime<Utc>,
}

/// Answer to a liquidity query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidityCheck {
    pub sufficient: bool,
    pub available_balance: Amount,
    pub shortfall: Amount,
    pub pool_status: PoolStatus,
}

/// Treasury configuration
#[derive(Debug, Clone)]
pub struct TreasuryConfig {
    /// Payouts at or above this many micros need a human approver
    pub manual_approval_threshold_micros: i64,
    /// How long a fund lock stays valid before the expiry sweep reclaims it
    pub lock_ttl: Duration,
}

impl Default for TreasuryConfig {
    fn default() -> Self {
        Self {
            // $10,000.00
            manual_approval_threshold_micros: 10_000 * 1_000_000,
            lock_ttl: Duration::minutes(15),
        }
    }
}

#[derive(Default)]
struct TreasuryInner {
    pools: HashMap<PoolId, LiquidityPool>,
    locks: HashMap<LockId, FundLock>,
    alerts: Vec<TreasuryAlert>,
}

/// The treasury pool manager
///
/// Thread-safe and cheap to clone; all clones share state. A single write
/// lock over the pool map makes every balance mutation a critical section.
#[derive(Clone)]
pub struct PoolManager {
    inner: Arc<RwLock<TreasuryInner>>,
    config: TreasuryConfig,
}

impl PoolManager {
    pub fn new(config: TreasuryConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(TreasuryInner::default())),
            config,
        }
    }

    /// Create a pool with an opening balance
    pub async fn create_pool(
        &self,
        name: impl Into<String>,
        currency: Currency,
        opening_balance: Amount,
        minimum_reserve: Amount,
    ) -> Result<LiquidityPool> {
        if opening_balance.currency != currency || minimum_reserve.currency != currency {
            return Err(TreasuryError::CurrencyMismatch {
                expected: currency,
                actual: opening_balance.currency,
            });
        }
        if opening_balance.is_negative() {
            return Err(TreasuryError::InvalidAmount {
                message: "opening balance cannot be negative".to_string(),
            });
        }

        let now = Utc::now();
        let pool = LiquidityPool {
            id: PoolId::new(),
            name: name.into(),
            currency,
            balance: opening_balance,
            minimum_reserve,
            status: status_for(opening_balance, minimum_reserve),
            created_at: now,
            updated_at: now,
        };

        let mut inner = self.inner.write().await;
        inner.pools.insert(pool.id, pool.clone());
        info!(pool_id = %pool.id, name = %pool.name, balance = %pool.balance, "liquidity pool created");
        Ok(pool)
    }

    /// Add funds to a pool
    pub async fn fund_pool(&self, pool_id: PoolId, amount: Amount) -> Result<LiquidityPool> {
        if !amount.is_positive() {
            return Err(TreasuryError::InvalidAmount {
                message: "funding amount must be positive".to_string(),
            });
        }
        let mut inner = self.inner.write().await;
        let pool = inner
            .pools
            .get_mut(&pool_id)
            .ok_or(TreasuryError::PoolNotFound { pool_id })?;
        if pool.currency != amount.currency {
            return Err(TreasuryError::CurrencyMismatch {
                expected: pool.currency,
                actual: amount.currency,
            });
        }
        pool.balance = pool
            .balance
            .checked_add(amount)
            .map_err(|_| TreasuryError::InvalidAmount {
                message: "pool balance overflow".to_string(),
            })?;
        pool.status = status_for(pool.balance, pool.minimum_reserve);
        pool.updated_at = Utc::now();
        Ok(pool.clone())
    }

    /// Check whether a pool can cover an amount
    ///
    /// A missing pool is reported as depleted rather than as an error: the
    /// caller's decision is the same either way, don't pay.
    pub async fn check_liquidity(&self, pool_id: PoolId, amount: Amount) -> LiquidityCheck {
        let inner = self.inner.read().await;
        match inner.pools.get(&pool_id) {
            Some(pool) if pool.currency == amount.currency => {
                let sufficient =
                    pool.status != PoolStatus::Suspended && pool.balance.micros >= amount.micros;
                let shortfall_micros = (amount.micros - pool.balance.micros).max(0);
                LiquidityCheck {
                    sufficient,
                    available_balance: pool.balance,
                    shortfall: Amount::from_micros(shortfall_micros, amount.currency),
                    pool_status: pool.status,
                }
            }
            _ => LiquidityCheck {
                sufficient: false,
                available_balance: Amount::zero(amount.currency),
                shortfall: amount,
                pool_status: PoolStatus::Depleted,
            },
        }
    }

    /// Atomically reserve funds for a claim
    ///
    /// Returns `None` (and emits a LIQUIDITY_FAILURE alert) when the pool
    /// cannot cover the amount; the caller must not proceed to any external
    /// transfer in that case.
    pub async fn lock_funds(
        &self,
        pool_id: PoolId,
        claim_id: ClaimId,
        amount: Amount,
    ) -> Result<Option<FundLock>> {
        if !amount.is_positive() {
            return Err(TreasuryError::InvalidAmount {
                message: "lock amount must be positive".to_string(),
            });
        }

        let mut inner = self.inner.write().await;
        let Some(pool) = inner.pools.get(&pool_id) else {
            return Err(TreasuryError::PoolNotFound { pool_id });
        };
        if pool.currency != amount.currency {
            return Err(TreasuryError::CurrencyMismatch {
                expected: pool.currency,
                actual: amount.currency,
            });
        }
        if pool.status == PoolStatus::Suspended {
            return Err(TreasuryError::PoolSuspended { pool_id });
        }

        if pool.balance.micros < amount.micros {
            let alert = TreasuryAlert {
                id: AlertId::new(),
                alert_type: AlertType::LiquidityFailure,
                pool_id,
                current_balance: pool.balance,
                threshold: amount,
                message: format!(
                    "lock for claim {} needs {} but pool {} holds {}",
                    claim_id, amount, pool.name, pool.balance
                ),
                acknowledged: false,
                created_at: Utc::now(),
            };
            warn!(pool_id = %pool_id, claim_id = %claim_id, requested = %amount, available = %pool.balance, "liquidity failure");
            inner.alerts.push(alert);
            return Ok(None);
        }

        // Decrement inside the same write lock that did the check
        let now = Utc::now();
        let Some(pool) = inner.pools.get_mut(&pool_id) else {
            return Err(TreasuryError::PoolNotFound { pool_id });
        };
        pool.balance = Amount::from_micros(pool.balance.micros - amount.micros, pool.currency);
        pool.status = status_for(pool.balance, pool.minimum_reserve);
        pool.updated_at = now;

        let low_reserve_alert = if pool.status != PoolStatus::Active {
            Some(TreasuryAlert {
                id: AlertId::new(),
                alert_type: if pool.status == PoolStatus::Depleted {
                    AlertType::Depleted
                } else {
                    AlertType::LowReserve
                },
                pool_id,
                current_balance: pool.balance,
                threshold: pool.minimum_reserve,
                message: format!(
                    "pool {} balance {} below reserve {}",
                    pool.name, pool.balance, pool.minimum_reserve
                ),
                acknowledged: false,
                created_at: now,
            })
        } else {
            None
        };

        let lock = FundLock {
            id: LockId::new(),
            pool_id,
            claim_id: claim_id.clone(),
            amount,
            locked_at: now,
            expires_at: now + self.config.lock_ttl,
            status: LockStatus::Locked,
        };
        inner.locks.insert(lock.id, lock.clone());
        if let Some(alert) = low_reserve_alert {
            warn!(pool_id = %pool_id, balance = %alert.current_balance, "pool reserve warning");
            inner.alerts.push(alert);
        }

        info!(lock_id = %lock.id, pool_id = %pool_id, claim_id = %claim_id, amount = %amount, "funds locked");
        Ok(Some(lock))
    }

    /// Retire a lock after a settled transfer; the money has left, so the
    /// pool balance stays decremented
    pub async fn release_lock(&self, lock_id: LockId) -> Result<FundLock> {
        let mut inner = self.inner.write().await;
        let lock = inner
            .locks
            .get_mut(&lock_id)
            .ok_or(TreasuryError::LockNotFound { lock_id })?;
        if lock.status != LockStatus::Locked {
            return Err(TreasuryError::LockNotActive {
                lock_id,
                status: lock.status,
            });
        }
        lock.status = LockStatus::Released;
        info!(lock_id = %lock_id, claim_id = %lock.claim_id, "lock released");
        Ok(lock.clone())
    }

    /// Retire a lock after a terminal transfer failure and return its funds
    ///
    /// No money actually left the treasury, so the reservation is handed
    /// back to the pool. The ledger-side correction is the caller's job.
    pub async fn restore_lock_funds(&self, lock_id: LockId) -> Result<FundLock> {
        let mut inner = self.inner.write().await;
        let lock = inner
            .locks
            .get(&lock_id)
            .cloned()
            .ok_or(TreasuryError::LockNotFound { lock_id })?;
        if lock.status != LockStatus::Locked {
            return Err(TreasuryError::LockNotActive {
                lock_id,
                status: lock.status,
            });
        }

        if let Some(pool) = inner.pools.get_mut(&lock.pool_id) {
            pool.balance =
                Amount::from_micros(pool.balance.micros + lock.amount.micros, pool.currency);
            pool.status = status_for(pool.balance, pool.minimum_reserve);
            pool.updated_at = Utc::now();
        }
        let Some(lock) = inner.locks.get_mut(&lock_id) else {
            return Err(TreasuryError::LockNotFound { lock_id });
        };
        lock.status = LockStatus::Released;
        info!(lock_id = %lock_id, amount = %lock.amount, "lock funds restored to pool");
        Ok(lock.clone())
    }

    /// Reclaim every lock past its expiry: restore balance, mark EXPIRED
    ///
    /// The backstop against orphaned reservations from crashed payouts.
    pub async fn expire_stale_locks(&self) -> Vec<FundLock> {
        let now = Utc::now();
        let mut inner = self.inner.write().await;
        let stale: Vec<LockId> = inner
            .locks
            .values()
            .filter(|l| l.status == LockStatus::Locked && l.expires_at <= now)
            .map(|l| l.id)
            .collect();

        let mut expired = Vec::with_capacity(stale.len());
        for lock_id in stale {
            let (pool_id, amount) = {
                let lock = &inner.locks[&lock_id];
                (lock.pool_id, lock.amount)
            };
            if let Some(pool) = inner.pools.get_mut(&pool_id) {
                pool.balance =
                    Amount::from_micros(pool.balance.micros + amount.micros, pool.currency);
                pool.status = status_for(pool.balance, pool.minimum_reserve);
                pool.updated_at = now;
            }
            let Some(lock) = inner.locks.get_mut(&lock_id) else {
                continue;
            };
            lock.status = LockStatus::Expired;
            warn!(lock_id = %lock_id, claim_id = %lock.claim_id, "stale lock expired, funds returned");
            expired.push(lock.clone());
        }
        expired
    }

    /// Whether a payout of this size needs a human approver
    pub fn requires_manual_approval(&self, amount: Amount) -> bool {
        amount.micros >= self.config.manual_approval_threshold_micros
    }

    /// Correct the cached pool balance against the ledger-derived figure
    ///
    /// The ledger is authoritative. Returns the drift in micros (ledger
    /// minus cache); non-zero drift raises a BalanceDrift alert.
    pub async fn reconcile_pool(&self, pool_id: PoolId, ledger_balance: Amount) -> Result<i64> {
        let mut inner = self.inner.write().await;
        let pool = inner
            .pools
            .get_mut(&pool_id)
            .ok_or(TreasuryError::PoolNotFound { pool_id })?;
        if pool.currency != ledger_balance.currency {
            return Err(TreasuryError::CurrencyMismatch {
                expected: pool.currency,
                actual: ledger_balance.currency,
            });
        }

        let drift = ledger_balance.micros - pool.balance.micros;
        if drift != 0 {
            warn!(pool_id = %pool_id, drift_micros = drift, cached = %pool.balance, ledger = %ledger_balance, "pool balance drift corrected");
            pool.balance = ledger_balance;
            pool.status = status_for(pool.balance, pool.minimum_reserve);
            pool.updated_at = Utc::now();
            let alert = TreasuryAlert {
                id: AlertId::new(),
                alert_type: AlertType::BalanceDrift,
                pool_id,
                current_balance: ledger_balance,
                threshold: Amount::zero(ledger_balance.currency),
                message: format!("cached balance drifted {} micros from ledger", drift),
                acknowledged: false,
                created_at: Utc::now(),
            };
            inner.alerts.push(alert);
        }
        Ok(drift)
    }

    /// Suspend a pool; no new locks until resumed
    pub async fn suspend_pool(&self, pool_id: PoolId) -> Result<()> {
        let mut inner = self.inner.write().await;
        let pool = inner
            .pools
            .get_mut(&pool_id)
            .ok_or(TreasuryError::PoolNotFound { pool_id })?;
        pool.status = PoolStatus::Suspended;
        pool.updated_at = Utc::now();
        Ok(())
    }

    /// Lift a suspension; status recomputed from balance
    pub async fn resume_pool(&self, pool_id: PoolId) -> Result<()> {
        let mut inner = self.inner.write().await;
        let pool = inner
            .pools
            .get_mut(&pool_id)
            .ok_or(TreasuryError::PoolNotFound { pool_id })?;
        pool.status = status_for(pool.balance, pool.minimum_reserve);
        pool.updated_at = Utc::now();
        Ok(())
    }

    pub async fn get_pool(&self, pool_id: PoolId) -> Option<LiquidityPool> {
        self.inner.read().await.pools.get(&pool_id).cloned()
    }

    pub async fn get_lock(&self, lock_id: LockId) -> Option<FundLock> {
        self.inner.read().await.locks.get(&lock_id).cloned()
    }

    pub async fn all_pools(&self) -> Vec<LiquidityPool> {
        self.inner.read().await.pools.values().cloned().collect()
    }

    /// Unacknowledged alerts, oldest first
    pub async fn active_alerts(&self) -> Vec<TreasuryAlert> {
        self.inner
            .read()
            .await
            .alerts
            .iter()
            .filter(|a| !a.acknowledged)
            .cloned()
            .collect()
    }

    /// Mark one alert as handled by an operator
    pub async fn acknowledge_alert(&self, alert_id: AlertId) -> Result<()> {
        let mut inner = self.inner.write().await;
        let alert = inner
            .alerts
            .iter_mut()
            .find(|a| a.id == alert_id)
            .ok_or(TreasuryError::AlertNotFound { alert_id })?;
        alert.acknowledged = true;
        Ok(())
    }
}

impl Default for PoolManager {
    fn default() -> Self {
        Self::new(TreasuryConfig::default())
    }
}

fn status_for(balance: Amount, minimum_reserve: Amount) -> PoolStatus {
    if balance.micros <= 0 {
        PoolStatus::Depleted
    } else if balance.micros < minimum_reserve.micros {
        PoolStatus::LowReserve
    } else {
        PoolStatus::Active
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vaultflow_types::Currency::USD;

    fn usd(units: i64) -> Amount {
        Amount::from_units(units, USD).unwrap()
    }

    async fn manager_with_pool(balance: i64, reserve: i64) -> (PoolManager, PoolId) {
        let manager = PoolManager::default();
        let pool = manager
            .create_pool("claims-usd", USD, usd(balance), usd(reserve))
            .await
            .unwrap();
        (manager, pool.id)
    }

    #[tokio::test]
    async fn lock_decrements_balance_atomically() {
        let (manager, pool_id) = manager_with_pool(1_000, 100).await;
        let lock = manager
            .lock_funds(pool_id, ClaimId::new("CLAIM-1"), usd(400))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(lock.status, LockStatus::Locked);
        assert_eq!(manager.get_pool(pool_id).await.unwrap().balance, usd(600));
    }

    #[tokio::test]
    async fn insufficient_funds_returns_none_and_alerts() {
        let (manager, pool_id) = manager_with_pool(100, 10).await;
        let result = manager
            .lock_funds(pool_id, ClaimId::new("CLAIM-1"), usd(150))
            .await
            .unwrap();
        assert!(result.is_none());

        // Balance unchanged, alert emitted
        assert_eq!(manager.get_pool(pool_id).await.unwrap().balance, usd(100));
        let alerts = manager.active_alerts().await;
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].alert_type, AlertType::LiquidityFailure);
    }

    #[tokio::test]
    async fn concurrent_locks_never_overdraw() {
        let (manager, pool_id) = manager_with_pool(1_000, 0).await;

        let mut handles = Vec::new();
        for i in 0..20 {
            let manager = manager.clone();
            handles.push(tokio::spawn(async move {
                manager
                    .lock_funds(pool_id, ClaimId::new(format!("CLAIM-{i}")), usd(100))
                    .await
                    .unwrap()
            }));
        }

        let mut granted = 0;
        for h in handles {
            if h.await.unwrap().is_some() {
                granted += 1;
            }
        }

        // Exactly 10 locks of $100 fit in a $1,000 pool
        assert_eq!(granted, 10);
        let pool = manager.get_pool(pool_id).await.unwrap();
        assert_eq!(pool.balance.micros, 0);
        assert!(!pool.balance.is_negative());
    }

    #[tokio::test]
    async fn release_does_not_restore_balance() {
        let (manager, pool_id) = manager_with_pool(1_000, 0).await;
        let lock = manager
            .lock_funds(pool_id, ClaimId::new("CLAIM-1"), usd(400))
            .await
            .unwrap()
            .unwrap();

        let released = manager.release_lock(lock.id).await.unwrap();
        assert_eq!(released.status, LockStatus::Released);
        assert_eq!(manager.get_pool(pool_id).await.unwrap().balance, usd(600));
    }

    #[tokio::test]
    async fn restore_returns_funds_to_pool() {
        let (manager, pool_id) = manager_with_pool(1_000, 0).await;
        let lock = manager
            .lock_funds(pool_id, ClaimId::new("CLAIM-1"), usd(400))
            .await
            .unwrap()
            .unwrap();

        manager.restore_lock_funds(lock.id).await.unwrap();
        assert_eq!(manager.get_pool(pool_id).await.unwrap().balance, usd(1_000));
    }

    #[tokio::test]
    async fn double_release_is_rejected() {
        let (manager, pool_id) = manager_with_pool(1_000, 0).await;
        let lock = manager
            .lock_funds(pool_id, ClaimId::new("CLAIM-1"), usd(400))
            .await
            .unwrap()
            .unwrap();
        manager.release_lock(lock.id).await.unwrap();
        let err = manager.restore_lock_funds(lock.id).await.unwrap_err();
        assert!(matches!(err, TreasuryError::LockNotActive { .. }));
    }

    #[tokio::test]
    async fn expiry_sweep_returns_funds() {
        let manager = PoolManager::new(TreasuryConfig {
            lock_ttl: Duration::milliseconds(-1), // already expired on creation
            ..TreasuryConfig::default()
        });
        let pool = manager
            .create_pool("claims-usd", USD, usd(1_000), usd(0))
            .await
            .unwrap();
        manager
            .lock_funds(pool.id, ClaimId::new("CLAIM-1"), usd(300))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(manager.get_pool(pool.id).await.unwrap().balance, usd(700));

        let expired = manager.expire_stale_locks().await;
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].status, LockStatus::Expired);
        assert_eq!(manager.get_pool(pool.id).await.unwrap().balance, usd(1_000));

        // Sweep is idempotent
        assert!(manager.expire_stale_locks().await.is_empty());
    }

    #[tokio::test]
    async fn low_reserve_alert_fires_on_lock() {
        let (manager, pool_id) = manager_with_pool(1_000, 800).await;
        manager
            .lock_funds(pool_id, ClaimId::new("CLAIM-1"), usd(300))
            .await
            .unwrap()
            .unwrap();

        let pool = manager.get_pool(pool_id).await.unwrap();
        assert_eq!(pool.status, PoolStatus::LowReserve);
        let alerts = manager.active_alerts().await;
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].alert_type, AlertType::LowReserve);
    }

    #[tokio::test]
    async fn alerts_require_explicit_acknowledgement() {
        let (manager, pool_id) = manager_with_pool(100, 10).await;
        manager
            .lock_funds(pool_id, ClaimId::new("CLAIM-1"), usd(500))
            .await
            .unwrap();
        let alert_id = manager.active_alerts().await[0].id;

        manager.acknowledge_alert(alert_id).await.unwrap();
        assert!(manager.active_alerts().await.is_empty());
    }

    #[tokio::test]
    async fn missing_pool_reports_depleted() {
        let manager = PoolManager::default();
        let check = manager.check_liquidity(PoolId::new(), usd(100)).await;
        assert!(!check.sufficient);
        assert_eq!(check.pool_status, PoolStatus::Depleted);
        assert_eq!(check.shortfall, usd(100));
    }

    #[tokio::test]
    async fn manual_approval_threshold() {
        let manager = PoolManager::default();
        assert!(!manager.requires_manual_approval(usd(9_999)));
        assert!(manager.requires_manual_approval(usd(10_000)));
        assert!(manager.requires_manual_approval(usd(50_000)));
    }

    #[tokio::test]
    async fn reconcile_corrects_drifted_balance() {
        let (manager, pool_id) = manager_with_pool(1_000, 0).await;

        // No drift: no alert, zero delta
        assert_eq!(manager.reconcile_pool(pool_id, usd(1_000)).await.unwrap(), 0);
        assert!(manager.active_alerts().await.is_empty());

        // Ledger says the pool really holds $900
        let drift = manager.reconcile_pool(pool_id, usd(900)).await.unwrap();
        assert_eq!(drift, -100 * 1_000_000);
        assert_eq!(manager.get_pool(pool_id).await.unwrap().balance, usd(900));
        let alerts = manager.active_alerts().await;
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].alert_type, AlertType::BalanceDrift);
    }

    #[tokio::test]
    async fn suspended_pool_rejects_locks() {
        let (manager, pool_id) = manager_with_pool(1_000, 0).await;
        manager.suspend_pool(pool_id).await.unwrap();
        let err = manager
            .lock_funds(pool_id, ClaimId::new("CLAIM-1"), usd(100))
            .await
            .unwrap_err();
        assert!(matches!(err, TreasuryError::PoolSuspended { .. }));

        manager.resume_pool(pool_id).await.unwrap();
        assert!(manager
            .lock_funds(pool_id, ClaimId::new("CLAIM-1"), usd(100))
            .await
            .unwrap()
            .is_some());
    }
}
