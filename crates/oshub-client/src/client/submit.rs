//! Facility create/match submissions.

use std::collections::BTreeMap;

use oshub_core::{FacilityPayload, SubmitOptions};
use reqwest::Url;

use super::FacilityClient;
use crate::error::ClientError;
use crate::flatten::flatten_facilities;
use crate::retry::retry_rate_limited;
use crate::types::{FlatRecord, MatchStatus};

fn flag(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

impl FacilityClient {
    /// Submits one facility and returns the flattened match rows.
    ///
    /// Required fields are checked before any request is sent. HTTP 429
    /// responses are retried after exactly the wait the registry names, as
    /// long as the wait fits `options.timeout_budget_secs`.
    ///
    /// # Errors
    ///
    /// - [`ClientError::MissingField`] if `name`, `address` or `country` is
    ///   empty (checked in that order); no request is made.
    /// - [`ClientError::Timeout`] if a requested wait would exceed the budget.
    /// - [`ClientError::UnexpectedRateLimitFormat`] for a 429 without a wait.
    /// - [`ClientError::BadRequest`] on HTTP 400 (not retried).
    /// - [`ClientError::UnexpectedStatus`] on any other non-2xx status.
    /// - [`ClientError::Http`] on network failure.
    /// - [`ClientError::Deserialize`] if the body is not JSON.
    /// - [`ClientError::SchemaViolation`] if the response cannot be flattened.
    pub async fn submit(
        &self,
        payload: FacilityPayload,
        options: SubmitOptions,
    ) -> Result<Vec<FlatRecord>, ClientError> {
        let raw = self.submit_raw(payload, options).await?;
        let rows = flatten_facilities(&raw)?;
        tracing::info!(
            rows = rows.len(),
            status = rows
                .first()
                .and_then(MatchStatus::of_record)
                .map_or("unknown", MatchStatus::as_str),
            "facility submitted"
        );
        Ok(rows)
    }

    /// Like [`submit`](Self::submit) but returns the registry's JSON unflattened.
    ///
    /// # Errors
    ///
    /// Every error of [`submit`](Self::submit) except
    /// [`ClientError::SchemaViolation`].
    pub async fn submit_raw(
        &self,
        payload: FacilityPayload,
        options: SubmitOptions,
    ) -> Result<serde_json::Value, ClientError> {
        let form = payload
            .into_form()
            .map_err(|field| ClientError::MissingField { field })?;
        let url = self.facilities_url(options)?;
        tracing::debug!(%url, fields = form.len(), "submitting facility");

        retry_rate_limited(options.timeout_budget_secs, || {
            self.post_facility_once(&url, &form)
        })
        .await
    }

    /// Submits each payload in turn. A failed item does not stop the rest;
    /// outcomes come back in input order.
    pub async fn submit_bulk<I>(
        &self,
        payloads: I,
        options: SubmitOptions,
    ) -> Vec<Result<Vec<FlatRecord>, ClientError>>
    where
        I: IntoIterator<Item = FacilityPayload>,
    {
        let mut outcomes = Vec::new();
        for (index, payload) in payloads.into_iter().enumerate() {
            let outcome = self.submit(payload, options).await;
            if let Err(err) = &outcome {
                tracing::warn!(index, error = %err, "bulk facility submission item failed");
            }
            outcomes.push(outcome);
        }
        outcomes
    }

    /// `POST /api/facilities/` with all three flags spelled out.
    pub(super) fn facilities_url(&self, options: SubmitOptions) -> Result<Url, ClientError> {
        let mut url = self.endpoint("api/facilities/")?;
        url.query_pairs_mut()
            .append_pair("create", flag(options.create))
            .append_pair("public", flag(options.public))
            .append_pair("textonlyfallback", flag(options.text_only_fallback));
        Ok(url)
    }

    async fn post_facility_once(
        &self,
        url: &Url,
        form: &BTreeMap<String, String>,
    ) -> Result<serde_json::Value, ClientError> {
        let request = self.authorized(self.client.post(url.clone())).form(form);
        let (status, body) = self.execute(request).await?;
        Self::json_or_error(status, body, url, "facility submission response")
    }
}
