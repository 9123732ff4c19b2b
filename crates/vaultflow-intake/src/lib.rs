//! VaultFlow Claims Intake
//!
//! Zero-trust ingestion of claim decisions from the upstream claims
//! platform. Decisions reach settlement over two paths, a signed webhook
//! and a polling backstop, and neither path is trusted: every decision
//! must carry a valid audit seal (canonical SHA-256 hash, registered
//! signer, fresh timestamp) before the orchestrator will act on it.
//!
//! - [`SealVerifier`]: the audit seal check, plugged into the orchestrator
//! - [`WebhookIntake`]: HMAC-SHA256 signed push deliveries
//! - [`DecisionPoller`]: paginated pull sweep for missed webhooks
//! - [`HttpDecisionSource`]: REST client implementing both fetch ports

mod error;
mod http;
mod poller;
mod seal;
mod webhook;

pub use error::{IntakeError, Result};
pub use http::HttpDecisionSource;
pub use poller::{DecisionFeed, DecisionPage, DecisionPoller, PollerConfig};
pub use seal::{compute_seal_hash, SealPolicy, SealVerifier};
pub use webhook::WebhookIntake;
