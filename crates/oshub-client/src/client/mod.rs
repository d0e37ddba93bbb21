//! HTTP client for the Open Supply Hub facility registry.

mod matches;
mod submit;

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use oshub_core::ClientConfig;
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use tokio::time::Instant;

use crate::error::ClientError;
use crate::retry::rate_limit_error;
use crate::types::FacilityCount;

pub use matches::match_id_from_url;

/// Client for the facility registry API.
///
/// Owns one reusable `reqwest::Client`. Use [`FacilityClient::connect`] to
/// build and probe a client from configuration, or
/// [`FacilityClient::with_base_url`] to point at a mock server in tests.
///
/// Each call awaits its attempts strictly one after another. Methods take
/// `&self`, so a client can be shared, but the call diagnostics
/// ([`api_call_count`](Self::api_call_count),
/// [`last_call_duration`](Self::last_call_duration)) are per instance and
/// interleave when calls on the same instance run concurrently.
pub struct FacilityClient {
    pub(super) client: Client,
    pub(super) token: String,
    pub(super) base_url: Url,
    pub(super) health_check_timeout: Duration,
    /// Rate-limit budget for calls that take no explicit budget.
    pub(super) default_budget_secs: u64,
    pub(super) stats: CallStats,
}

/// Lifetime call counter and duration of the most recent single attempt.
#[derive(Debug)]
pub(super) struct CallStats {
    calls: AtomicU64,
    last_duration_micros: AtomicU64,
}

const NO_CALL_YET: u64 = u64::MAX;

impl Default for CallStats {
    fn default() -> Self {
        Self {
            calls: AtomicU64::new(0),
            last_duration_micros: AtomicU64::new(NO_CALL_YET),
        }
    }
}

impl CallStats {
    fn record(&self, duration: Duration) {
        self.calls.fetch_add(1, Ordering::Relaxed);
        let micros = u64::try_from(duration.as_micros()).unwrap_or(NO_CALL_YET - 1);
        self.last_duration_micros.store(micros, Ordering::Relaxed);
    }
}

impl FacilityClient {
    /// Builds a client from configuration without touching the network.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`ClientError::InvalidBaseUrl`] if the
    /// configured base URL cannot be parsed.
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .user_agent(config.user_agent.as_str())
            .build()?;

        // Exactly one trailing slash, so relative endpoint paths join below
        // the base path instead of replacing its last segment.
        let normalised = format!("{}/", config.base_url.trim().trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| ClientError::InvalidBaseUrl {
            url: config.base_url.clone(),
            reason: e.to_string(),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::InvalidBaseUrl {
                url: config.base_url.clone(),
                reason: "URL cannot carry a path".to_owned(),
            });
        }

        Ok(Self {
            client,
            token: config.token.trim().to_owned(),
            base_url,
            health_check_timeout: Duration::from_secs(config.health_check_timeout_secs),
            default_budget_secs: config.timeout_budget_secs,
            stats: CallStats::default(),
        })
    }

    /// Creates a client with default settings for the given token and base URL.
    ///
    /// # Errors
    ///
    /// Same as [`FacilityClient::new`].
    pub fn with_base_url(token: &str, base_url: &str) -> Result<Self, ClientError> {
        Self::new(&ClientConfig {
            base_url: base_url.to_owned(),
            token: token.to_owned(),
            ..ClientConfig::default()
        })
    }

    /// Builds a client, checks the registry is reachable and, when
    /// `config.check_token` is set, that the token is accepted.
    ///
    /// # Errors
    ///
    /// - [`ClientError::Http`] if the registry cannot be reached.
    /// - [`ClientError::HealthCheck`] if the health endpoint answers non-2xx.
    /// - Any error from [`FacilityClient::check_token`].
    pub async fn connect(config: &ClientConfig) -> Result<Self, ClientError> {
        let client = Self::new(config)?;
        client.health_check().await?;
        if config.check_token {
            let facilities = client.check_token().await?;
            tracing::info!(facilities, "API token accepted");
        }
        tracing::info!(base_url = %client.base_url, "connected to facility registry");
        Ok(client)
    }

    /// Probes `GET /health-check/` with the short health-check timeout.
    /// Not counted in [`api_call_count`](Self::api_call_count).
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Http`] on network failure or timeout and
    /// [`ClientError::HealthCheck`] on a non-2xx status.
    pub async fn health_check(&self) -> Result<(), ClientError> {
        let url = self.endpoint("health-check/")?;
        let response = self
            .client
            .get(url)
            .timeout(self.health_check_timeout)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::HealthCheck {
                status: status.as_u16(),
            });
        }
        Ok(())
    }

    /// Verifies the token with a counted call to `GET /api/facilities/count/`
    /// and returns the registry's facility count.
    ///
    /// # Errors
    ///
    /// - [`ClientError::MissingToken`] if no token is configured.
    /// - [`ClientError::UnexpectedStatus`] if the registry rejects the token.
    /// - [`ClientError::Http`] on network failure.
    /// - [`ClientError::Deserialize`] if the body is not `{"count": n}`.
    pub async fn check_token(&self) -> Result<u64, ClientError> {
        if self.token.is_empty() {
            return Err(ClientError::MissingToken);
        }
        let url = self.endpoint("api/facilities/count/")?;
        let request = self.authorized(self.client.get(url.clone()));
        let (status, body) = self.execute(request).await?;
        if !status.is_success() {
            return Err(ClientError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        let parsed: FacilityCount =
            serde_json::from_str(&body).map_err(|e| ClientError::Deserialize {
                context: "facility count".to_owned(),
                source: e,
            })?;
        Ok(parsed.count)
    }

    /// Number of API attempts made by this instance, including each retry.
    #[must_use]
    pub fn api_call_count(&self) -> u64 {
        self.stats.calls.load(Ordering::Relaxed)
    }

    /// Wall-clock duration of the most recent single attempt.
    #[must_use]
    pub fn last_call_duration(&self) -> Option<Duration> {
        match self.stats.last_duration_micros.load(Ordering::Relaxed) {
            NO_CALL_YET => None,
            micros => Some(Duration::from_micros(micros)),
        }
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolves a path relative to the base URL.
    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        self.base_url
            .join(path)
            .map_err(|e| ClientError::InvalidBaseUrl {
                url: self.base_url.to_string(),
                reason: e.to_string(),
            })
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header(reqwest::header::AUTHORIZATION, format!("Token {}", self.token))
            .header(reqwest::header::ACCEPT, "application/json")
    }

    /// Sends one request, counting it and recording its duration.
    async fn execute(
        &self,
        request: RequestBuilder,
    ) -> Result<(StatusCode, String), ClientError> {
        let started = Instant::now();
        let outcome = async {
            let response = request.send().await?;
            let status = response.status();
            let body = response.text().await?;
            Ok::<_, reqwest::Error>((status, body))
        }
        .await;
        let elapsed = started.elapsed();
        self.stats.record(elapsed);

        let (status, body) = outcome?;
        tracing::debug!(
            status = status.as_u16(),
            elapsed = ?elapsed,
            "registry call finished"
        );
        Ok((status, body))
    }

    /// Maps a finished attempt to parsed JSON or a typed error.
    ///
    /// 429 becomes [`ClientError::RateLimited`] (or
    /// [`ClientError::UnexpectedRateLimitFormat`]) for the retry loop to
    /// decide on; 400 and every other non-2xx status are final.
    fn json_or_error(
        status: StatusCode,
        body: String,
        url: &Url,
        context: &str,
    ) -> Result<serde_json::Value, ClientError> {
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(rate_limit_error(&body));
        }
        if status == StatusCode::BAD_REQUEST {
            return Err(ClientError::BadRequest { body });
        }
        if !status.is_success() {
            return Err(ClientError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        serde_json::from_str(&body).map_err(|e| ClientError::Deserialize {
            context: context.to_owned(),
            source: e,
        })
    }
}

#[cfg(test)]
#[path = "../client_test.rs"]
mod tests;
