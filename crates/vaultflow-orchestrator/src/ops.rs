//! Operational surface
//!
//! Read-only projections and alert handling for operators: a health summary
//! over payouts, pools and the ledger, plus alert passthrough.

use serde::Serialize;
use vaultflow_ledger::IntegrityReport;
use vaultflow_treasury::{LiquidityPool, TreasuryAlert};
use vaultflow_types::AlertId;

use crate::{OrchestratorError, PayoutOrchestrator, PayoutStatus, Result};

/// Point-in-time operational snapshot
#[derive(Debug, Clone, Serialize)]
pub struct HealthSummary {
    pub total_payouts: usize,
    pub settled: usize,
    pub in_flight: usize,
    pub pending_approval: usize,
    pub reconciliation_required: usize,
    pub failed: usize,
    pub skipped: usize,
    pub pools: Vec<LiquidityPool>,
    pub unacknowledged_alerts: usize,
    pub ledger: IntegrityReport,
}

impl PayoutOrchestrator {
    /// Operational snapshot across all subsystems
    pub async fn health_summary(&self) -> Result<HealthSummary> {
        let records = self.store().all().await?;
        let count = |status: PayoutStatus| records.iter().filter(|r| r.status == status).count();

        let in_flight = records
            .iter()
            .filter(|r| {
                matches!(
                    r.status,
                    PayoutStatus::Processing
                        | PayoutStatus::LedgerLocked
                        | PayoutStatus::BankTransferPending
                )
            })
            .count();

        let ledger =
            self.ledger()
                .verify_integrity()
                .await
                .map_err(|e| OrchestratorError::Ops {
                    message: format!("ledger integrity scan failed: {e}"),
                })?;

        Ok(HealthSummary {
            total_payouts: records.len(),
            settled: count(PayoutStatus::Settled),
            in_flight,
            pending_approval: count(PayoutStatus::PendingApproval),
            reconciliation_required: count(PayoutStatus::ReconciliationRequired),
            failed: count(PayoutStatus::Failed),
            skipped: count(PayoutStatus::Skipped),
            pools: self.treasury().all_pools().await,
            unacknowledged_alerts: self.treasury().active_alerts().await.len(),
            ledger,
        })
    }

    /// Unacknowledged treasury alerts
    pub async fn active_alerts(&self) -> Vec<TreasuryAlert> {
        self.treasury().active_alerts().await
    }

    pub async fn acknowledge_alert(&self, alert_id: AlertId) -> Result<()> {
        self.treasury()
            .acknowledge_alert(alert_id)
            .await
            .map_err(|source| OrchestratorError::Ops {
                message: format!("alert acknowledge failed: {source}"),
            })
    }

    /// Full-ledger integrity scan
    pub async fn verify_ledger_integrity(&self) -> Result<IntegrityReport> {
        self.ledger()
            .verify_integrity()
            .await
            .map_err(|e| OrchestratorError::Ops {
                message: format!("ledger integrity scan failed: {e}"),
            })
    }
}
