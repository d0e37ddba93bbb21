//! Rate-limit handling for facility submissions.
//!
//! The registry answers HTTP 429 with a human-readable detail such as
//! `"Request was throttled. Expected available in 5 seconds."`. Unlike an
//! exponential back-off, the wait is always exactly what the server asks for;
//! the only client-side decision is whether honouring it still fits inside the
//! caller's total budget:
//!
//! | Outcome of an attempt           | Next step                                  |
//! |---------------------------------|--------------------------------------------|
//! | success                         | return                                     |
//! | 429, wait `N` fits the budget   | sleep `N` s, attempt again                 |
//! | 429, wait `N` exceeds budget    | [`ClientError::Timeout`]                   |
//! | 429, no wait in the detail      | [`ClientError::UnexpectedRateLimitFormat`] |
//! | anything else                   | returned as is, no retry                   |

use std::future::Future;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use tokio::time::Instant;

use crate::error::ClientError;
use crate::types::RateLimitBody;

static WAIT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"in (\d+) seconds?").expect("valid wait regex"));

/// Extracts `N` from a detail message containing `"in N seconds"`.
pub(crate) fn parse_wait_secs(detail: &str) -> Option<u64> {
    WAIT_PATTERN
        .captures(detail)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<u64>().ok())
}

/// Classifies the body of a 429 response.
///
/// The wait is read from the JSON `detail` field; a body that is not JSON is
/// searched as plain text.
pub(crate) fn rate_limit_error(body: &str) -> ClientError {
    let detail = serde_json::from_str::<RateLimitBody>(body)
        .ok()
        .and_then(|b| b.detail)
        .unwrap_or_else(|| body.to_owned());

    match parse_wait_secs(&detail) {
        Some(retry_after_secs) => ClientError::RateLimited { retry_after_secs },
        None => ClientError::UnexpectedRateLimitFormat { detail },
    }
}

/// Whether waiting `wait_secs` more still ends inside the budget.
#[allow(clippy::cast_precision_loss)]
fn fits_budget(elapsed_secs: f64, wait_secs: u64, budget_secs: u64) -> bool {
    (elapsed_secs + wait_secs as f64).ceil() <= budget_secs as f64
}

/// Runs `operation` until it stops returning [`ClientError::RateLimited`] or
/// the next wait would overrun `budget_secs`, measured from the first attempt.
///
/// The budget bounds the waits, not the requests: a slow request can still
/// push the total past it.
pub(crate) async fn retry_rate_limited<T, F, Fut>(
    budget_secs: u64,
    mut operation: F,
) -> Result<T, ClientError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ClientError>>,
{
    let started = Instant::now();
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        let ClientError::RateLimited { retry_after_secs } = err else {
            return Err(err);
        };

        let elapsed_secs = started.elapsed().as_secs_f64();
        if !fits_budget(elapsed_secs, retry_after_secs, budget_secs) {
            tracing::warn!(
                attempts,
                budget_secs,
                wait_secs = retry_after_secs,
                elapsed_secs,
                "rate-limit wait exceeds budget, giving up"
            );
            return Err(ClientError::Timeout {
                attempts,
                budget_secs,
                wait_secs: retry_after_secs,
                elapsed_secs,
            });
        }

        tracing::warn!(
            attempt = attempts,
            wait_secs = retry_after_secs,
            elapsed_secs,
            budget_secs,
            "rate limited by facility registry, waiting before retry"
        );
        tokio::time::sleep(Duration::from_secs(retry_after_secs)).await;
    }
}
