//! HTTP client against the claims platform
//!
//! Implements both intake ports over REST: [`DecisionSource`] for on-demand
//! single-claim fetches and [`DecisionFeed`] for the poller's paginated
//! sweep. Failure classification is the contract that matters here: the
//! orchestrator retries only what this client calls transient.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::debug;
use vaultflow_orchestrator::{DecisionSource, FetchError};
use vaultflow_types::{ClaimId, DecisionRecord};

use crate::poller::{DecisionFeed, DecisionPage};
use crate::IntakeError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// REST client for the claims platform decision API
#[derive(Clone)]
pub struct HttpDecisionSource {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpDecisionSource {
    pub fn new(base_url: impl Into<String>) -> Result<Self, IntakeError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| IntakeError::ClientSetup {
                message: e.to_string(),
            })?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: None,
        })
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    fn request(&self, url: String) -> reqwest::RequestBuilder {
        let mut builder = self.client.get(url);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        builder
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: String,
    ) -> Result<T, FetchError> {
        debug!(url = %url, "claims platform request");
        let response = self
            .request(url)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = parse_retry_after(
                response
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok()),
            );
            let body = response.text().await.unwrap_or_default();
            return Err(classify_failure(status, retry_after, body));
        }

        response.json().await.map_err(|e| FetchError::Permanent {
            status: status.as_u16(),
            message: format!("undecodable response body: {e}"),
        })
    }
}

fn transport_error(e: reqwest::Error) -> FetchError {
    if e.is_timeout() || e.is_connect() {
        FetchError::Transient {
            message: e.to_string(),
            retry_after: None,
        }
    } else {
        FetchError::Permanent {
            status: e.status().map(|s| s.as_u16()).unwrap_or(0),
            message: e.to_string(),
        }
    }
}

/// Integer-seconds form of the Retry-After header
fn parse_retry_after(header: Option<&str>) -> Option<Duration> {
    header?.trim().parse::<u64>().ok().map(Duration::from_secs)
}

fn classify_failure(status: StatusCode, retry_after: Option<Duration>, body: String) -> FetchError {
    match status.as_u16() {
        // Server overload and timeouts are worth another try
        408 | 429 | 500..=599 => FetchError::Transient {
            message: format!("status {status}: {body}"),
            retry_after,
        },
        _ => FetchError::Permanent {
            status: status.as_u16(),
            message: body,
        },
    }
}

#[async_trait]
impl DecisionSource for HttpDecisionSource {
    async fn fetch_decision(&self, claim_id: &ClaimId) -> Result<DecisionRecord, FetchError> {
        let url = format!("{}/v1/decisions/{}", self.base_url, claim_id);
        match self.get_json::<DecisionRecord>(url).await {
            Err(FetchError::Permanent { status: 404, .. }) => Err(FetchError::NotFound {
                claim_id: claim_id.clone(),
            }),
            other => other,
        }
    }
}

#[async_trait]
impl DecisionFeed for HttpDecisionSource {
    async fn fetch_page(&self, cursor: Option<&str>) -> Result<DecisionPage, FetchError> {
        let url = match cursor {
            Some(cursor) => format!(
                "{}/v1/decisions?status=PAY&cursor={}",
                self.base_url, cursor
            ),
            None => format!("{}/v1/decisions?status=PAY", self.base_url),
        };
        self.get_json(url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_is_transient_with_server_delay() {
        let err = classify_failure(
            StatusCode::TOO_MANY_REQUESTS,
            parse_retry_after(Some("7")),
            "slow down".to_string(),
        );
        match err {
            FetchError::Transient { retry_after, .. } => {
                assert_eq!(retry_after, Some(Duration::from_secs(7)));
            }
            other => panic!("expected transient, got {other:?}"),
        }
    }

    #[test]
    fn server_errors_are_transient() {
        for status in [
            StatusCode::INTERNAL_SERVER_ERROR,
            StatusCode::BAD_GATEWAY,
            StatusCode::SERVICE_UNAVAILABLE,
            StatusCode::GATEWAY_TIMEOUT,
            StatusCode::REQUEST_TIMEOUT,
        ] {
            assert!(matches!(
                classify_failure(status, None, String::new()),
                FetchError::Transient { .. }
            ));
        }
    }

    #[test]
    fn client_errors_are_permanent() {
        for status in [
            StatusCode::BAD_REQUEST,
            StatusCode::UNAUTHORIZED,
            StatusCode::FORBIDDEN,
            StatusCode::GONE,
        ] {
            assert!(matches!(
                classify_failure(status, None, String::new()),
                FetchError::Permanent { .. }
            ));
        }
    }

    #[test]
    fn retry_after_ignores_http_dates() {
        // Only the integer-seconds form is honored; backoff covers the rest
        assert_eq!(parse_retry_after(Some("Wed, 21 Oct 2026 07:28:00 GMT")), None);
        assert_eq!(parse_retry_after(Some("12")), Some(Duration::from_secs(12)));
        assert_eq!(parse_retry_after(None), None);
    }

    #[test]
    fn base_url_trailing_slash_is_normalized() {
        let source = HttpDecisionSource::new("https://claims.example.com/").unwrap();
        assert_eq!(source.base_url, "https://claims.example.com");
    }
}
