//! Decision source port
//!
//! Where payout decisions come from. Production uses the HTTP client in
//! `vaultflow-intake`; tests use the in-memory stub below.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;
use vaultflow_types::{ClaimId, DecisionRecord};

/// Failure fetching a decision
///
/// Transient failures carry an optional server-requested delay and are the
/// only variant worth retrying; everything else aborts the payout attempt.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("no decision found for claim {claim_id}")]
    NotFound { claim_id: ClaimId },

    #[error("permanent decision-fetch failure (status {status}): {message}")]
    Permanent { status: u16, message: String },

    #[error("transient decision-fetch failure: {message}")]
    Transient {
        message: String,
        /// Server-specified delay before the next attempt, if any
        retry_after: Option<Duration>,
    },
}

impl FetchError {
    pub fn retryable(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }
}

/// Port over the upstream claims platform
#[async_trait]
pub trait DecisionSource: Send + Sync {
    async fn fetch_decision(&self, claim_id: &ClaimId)
        -> std::result::Result<DecisionRecord, FetchError>;
}

enum StubAnswer {
    Decision(DecisionRecord),
    Fail(FetchError),
}

/// In-memory decision source for tests
///
/// Serves scripted decisions and can fail the next N fetches to exercise
/// the orchestrator's retry path.
#[derive(Clone, Default)]
pub struct StaticDecisionSource {
    inner: Arc<Mutex<StaticInner>>,
}

#[derive(Default)]
struct StaticInner {
    answers: HashMap<ClaimId, StubAnswer>,
    fail_next: Vec<FetchError>,
    fetch_calls: u32,
}

impl StaticDecisionSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn put(&self, decision: DecisionRecord) {
        self.inner
            .lock()
            .await
            .answers
            .insert(decision.claim_id.clone(), StubAnswer::Decision(decision));
    }

    /// Always answer this claim with the given error
    pub async fn put_failure(&self, claim_id: ClaimId, error: FetchError) {
        self.inner
            .lock()
            .await
            .answers
            .insert(claim_id, StubAnswer::Fail(error));
    }

    /// Fail the next fetches (any claim) with these errors, in order
    pub async fn fail_next(&self, errors: Vec<FetchError>) {
        let mut inner = self.inner.lock().await;
        inner.fail_next = errors;
        inner.fail_next.reverse(); // pop() serves them in the given order
    }

    pub async fn fetch_calls(&self) -> u32 {
        self.inner.lock().await.fetch_calls
    }
}

#[async_trait]
impl DecisionSource for StaticDecisionSource {
    async fn fetch_decision(
        &self,
        claim_id: &ClaimId,
    ) -> std::result::Result<DecisionRecord, FetchError> {
        let mut inner = self.inner.lock().await;
        inner.fetch_calls += 1;
        if let Some(err) = inner.fail_next.pop() {
            return Err(err);
        }
        match inner.answers.get(claim_id) {
            Some(StubAnswer::Decision(d)) => Ok(d.clone()),
            Some(StubAnswer::Fail(e)) => Err(e.clone()),
            None => Err(FetchError::NotFound {
                claim_id: claim_id.clone(),
            }),
        }
    }
}
