use oshub_core::MissingField;
use serde::Serialize;
use thiserror::Error;

/// Status reported when a required field is missing. Existing consumers of
/// the registry tooling match on this exact string.
pub const PARAMETER_ERROR_STATUS: &str = "PYTHON_PARAMETER_ERROR";
pub const TIMEOUT_STATUS: &str = "TIMEOUT";
pub const HTTP_ERROR_STATUS: &str = "HTTP_ERROR";
pub const ERROR_STATUS: &str = "ERROR";

/// Errors returned by the facility registry client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// A required field was empty; no request was sent.
    #[error("missing required field {field}: {}", .field.message())]
    MissingField { field: MissingField },

    /// HTTP 429 with a parseable wait. Consumed by the retry loop and never
    /// returned from a public method.
    #[error("rate limited (retry in {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    /// HTTP 429 whose detail message carries no wait time.
    #[error("unexpected rate-limit response format: {detail}")]
    UnexpectedRateLimitFormat { detail: String },

    /// Honouring the server's wait would exceed the caller's budget.
    #[error(
        "Exceeded timeout of {budget_secs}s after {attempts} attempt(s): \
         server asked to wait {wait_secs}s with {elapsed_secs:.1}s already elapsed"
    )]
    Timeout {
        attempts: u32,
        budget_secs: u64,
        wait_secs: u64,
        elapsed_secs: f64,
    },

    #[error("bad request (HTTP 400): {body}")]
    BadRequest { body: String },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    /// Network, DNS or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// The match response no longer has the shape the flattener understands.
    /// Retrying will not help; the upstream schema has changed.
    #[error("facility response schema changed: {reason}")]
    SchemaViolation { reason: String },

    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("invalid match URL '{0}'")]
    InvalidMatchUrl(String),

    #[error("health check failed with HTTP status {status}")]
    HealthCheck { status: u16 },

    #[error("no API token configured")]
    MissingToken,
}

impl ClientError {
    /// Status discriminator returned in place of rows.
    #[must_use]
    pub fn status(&self) -> &'static str {
        match self {
            Self::MissingField { .. } => PARAMETER_ERROR_STATUS,
            Self::Timeout { .. } => TIMEOUT_STATUS,
            Self::BadRequest { .. } | Self::UnexpectedStatus { .. } | Self::HealthCheck { .. } => {
                HTTP_ERROR_STATUS
            }
            Self::RateLimited { .. }
            | Self::UnexpectedRateLimitFormat { .. }
            | Self::Http(_)
            | Self::Deserialize { .. }
            | Self::SchemaViolation { .. }
            | Self::InvalidBaseUrl { .. }
            | Self::InvalidMatchUrl(_)
            | Self::MissingToken => ERROR_STATUS,
        }
    }

    /// Numeric result code: `-100`/`-101`/`-102` for missing fields, `-2`
    /// for an exhausted rate-limit budget, `-3` for an unparsable 429, `-4`
    /// for a schema violation and `-1` for everything else.
    #[must_use]
    pub fn code(&self) -> i32 {
        match self {
            Self::MissingField { field } => field.code(),
            Self::Timeout { .. } => -2,
            Self::UnexpectedRateLimitFormat { .. } => -3,
            Self::SchemaViolation { .. } => -4,
            _ => -1,
        }
    }

    pub(crate) fn schema(reason: impl Into<String>) -> Self {
        Self::SchemaViolation {
            reason: reason.into(),
        }
    }
}

/// Serializable `{status, code, message}` view of a [`ClientError`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorResult {
    pub status: String,
    pub code: i32,
    pub message: String,
}

impl From<&ClientError> for ErrorResult {
    fn from(err: &ClientError) -> Self {
        Self {
            status: err.status().to_string(),
            code: err.code(),
            message: err.to_string(),
        }
    }
}
