//! Polling intake path
//!
//! Backstop for missed webhooks: periodically pulls approved decisions from
//! the claims platform and hands them to the orchestrator, whose idempotency
//! gate makes overlap between the two paths harmless. Pagination drains a
//! backlog page by page before the poller goes back to sleep.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info, warn};
use vaultflow_orchestrator::{FetchError, PayoutOrchestrator, PayoutStatus};
use vaultflow_types::DecisionRecord;

/// One page of decisions from the claims platform
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionPage {
    pub decisions: Vec<DecisionRecord>,
    /// Opaque cursor for the next page
    pub cursor: Option<String>,
    pub has_more: bool,
}

/// Port over the paginated decision feed
#[async_trait]
pub trait DecisionFeed: Send + Sync {
    async fn fetch_page(
        &self,
        cursor: Option<&str>,
    ) -> std::result::Result<DecisionPage, FetchError>;
}

#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Sleep between polls once the feed is drained
    pub interval: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
        }
    }
}

/// Background decision poller
pub struct DecisionPoller {
    feed: Arc<dyn DecisionFeed>,
    orchestrator: PayoutOrchestrator,
    config: PollerConfig,
}

impl DecisionPoller {
    pub fn new(
        feed: Arc<dyn DecisionFeed>,
        orchestrator: PayoutOrchestrator,
        config: PollerConfig,
    ) -> Self {
        Self {
            feed,
            orchestrator,
            config,
        }
    }

    /// Poll until `shutdown` flips to true
    ///
    /// Per-decision failures are logged and skipped; one poisoned decision
    /// must not stall the rest of the feed.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(interval_ms = self.config.interval.as_millis() as u64, "decision poller started");
        let mut cursor: Option<String> = None;

        loop {
            if *shutdown.borrow() {
                break;
            }

            match self.feed.fetch_page(cursor.as_deref()).await {
                Ok(page) => {
                    debug!(decisions = page.decisions.len(), has_more = page.has_more, "fetched decision page");
                    for decision in page.decisions {
                        let claim_id = decision.claim_id.clone();
                        match self.orchestrator.process_decision(decision).await {
                            Ok(record) if record.status == PayoutStatus::Settled => {
                                info!(claim_id = %claim_id, "polled decision settled");
                            }
                            Ok(record) => {
                                debug!(claim_id = %claim_id, status = ?record.status, "polled decision processed");
                            }
                            Err(e) => {
                                warn!(claim_id = %claim_id, error = %e, "polled decision failed");
                            }
                        }
                    }
                    cursor = page.cursor;
                    // Drain the backlog before sleeping
                    if page.has_more {
                        continue;
                    }
                }
                Err(e) => {
                    warn!(error = %e, "decision feed poll failed");
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(self.config.interval) => {}
                _ = shutdown.changed() => {}
            }
        }
        info!("decision poller stopped");
    }
}
