//! VaultFlow Payout Orchestrator
//!
//! Drives approved claim decisions through settlement: idempotency gate,
//! zero-trust verification, treasury lock, double-entry ledger post, then
//! the gateway transfer. Guarantees:
//!
//! - **Exactly-once**: one claim id settles at most once, ever, regardless
//!   of duplicate triggers or concurrent workers
//! - **Money-safe ordering**: liquidity is reserved and the ledger committed
//!   before any external transfer is attempted
//! - **Honest failure**: a transfer whose outcome is unknown after the
//!   ledger commit is flagged `ReconciliationRequired` for a human, never
//!   silently retried into a double payment
//!
//! The orchestrator is wired from ports: [`DecisionSource`],
//! [`DecisionVerifier`], [`PayoutStore`] and the gateway trait, each with an
//! in-memory implementation for tests.

mod error;
mod ops;
mod orchestrator;
mod record;
mod source;
mod store;
mod verify;

pub use error::{OrchestratorError, Result};
pub use ops::HealthSummary;
pub use orchestrator::{OrchestratorConfig, PayoutOrchestrator, ReconcileSummary};
pub use record::{PayoutRecord, PayoutStatus};
pub use source::{DecisionSource, FetchError, StaticDecisionSource};
pub use store::{BeginOutcome, MemoryPayoutStore, PayoutStore};
pub use verify::{AcceptAllVerifier, DecisionVerifier, SealViolation};
