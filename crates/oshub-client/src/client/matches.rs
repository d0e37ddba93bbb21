//! Confirming or rejecting potential matches.
//!
//! A `POTENTIAL_MATCH` row carries `match_confirm_match_url` and
//! `match_reject_match_url` paths of the form
//! `/api/facility-matches/{id}/confirm/`. The caller picks one and reports the
//! decision back to the registry.

use reqwest::Url;

use super::FacilityClient;
use crate::error::ClientError;
use crate::retry::retry_rate_limited;

/// Extracts the numeric match id from a confirm or reject URL.
///
/// Accepts both bare paths and absolute URLs.
///
/// # Errors
///
/// Returns [`ClientError::InvalidMatchUrl`] if the URL has no
/// `facility-matches/{id}` segment pair with a numeric id.
pub fn match_id_from_url(url: &str) -> Result<u64, ClientError> {
    let mut segments = url.split('/').filter(|s| !s.is_empty());
    segments
        .find(|s| *s == "facility-matches")
        .and_then(|_| segments.next())
        .and_then(|id| id.parse::<u64>().ok())
        .ok_or_else(|| ClientError::InvalidMatchUrl(url.to_owned()))
}

impl FacilityClient {
    /// Confirms a potential match, making the submitted item part of the
    /// matched facility.
    ///
    /// # Errors
    ///
    /// - [`ClientError::BadRequest`] if the match is not pending.
    /// - [`ClientError::UnexpectedStatus`] on any other non-2xx status.
    /// - [`ClientError::Timeout`] if rate-limit waits exceed the client budget.
    /// - [`ClientError::Http`] on network failure.
    /// - [`ClientError::Deserialize`] if the body is not JSON.
    pub async fn confirm_match(&self, match_id: u64) -> Result<serde_json::Value, ClientError> {
        self.vote_on_match(match_id, "confirm").await
    }

    /// Rejects a potential match. Once every candidate is rejected the
    /// registry creates a new facility for the submitted item.
    ///
    /// # Errors
    ///
    /// Same as [`confirm_match`](Self::confirm_match).
    pub async fn reject_match(&self, match_id: u64) -> Result<serde_json::Value, ClientError> {
        self.vote_on_match(match_id, "reject").await
    }

    async fn vote_on_match(
        &self,
        match_id: u64,
        verdict: &str,
    ) -> Result<serde_json::Value, ClientError> {
        let url = self.endpoint(&format!("api/facility-matches/{match_id}/{verdict}/"))?;
        tracing::debug!(match_id, verdict, "reporting match decision");
        retry_rate_limited(self.default_budget_secs, || self.post_vote_once(&url)).await
    }

    async fn post_vote_once(&self, url: &Url) -> Result<serde_json::Value, ClientError> {
        let request = self.authorized(self.client.post(url.clone()));
        let (status, body) = self.execute(request).await?;
        Self::json_or_error(status, body, url, "facility match decision response")
    }
}
