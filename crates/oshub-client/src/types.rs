//! Facility registry response types.

use serde::Deserialize;

/// One flattened output row: column name to scalar JSON value.
///
/// Column order follows the response (the workspace enables `serde_json`'s
/// `preserve_order` feature).
pub type FlatRecord = serde_json::Map<String, serde_json::Value>;

/// Outcome of the registry's matching step, from the `status` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStatus {
    /// No match; a new OS ID was minted.
    NewFacility,
    /// Exactly one existing facility was recognised.
    Matched,
    /// One or more candidates need a confirm/reject decision.
    PotentialMatch,
    /// The registry could not process the record.
    ErrorMatching,
}

impl MatchStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NewFacility => "NEW_FACILITY",
            Self::Matched => "MATCHED",
            Self::PotentialMatch => "POTENTIAL_MATCH",
            Self::ErrorMatching => "ERROR_MATCHING",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "NEW_FACILITY" => Some(Self::NewFacility),
            "MATCHED" => Some(Self::Matched),
            "POTENTIAL_MATCH" => Some(Self::PotentialMatch),
            "ERROR_MATCHING" => Some(Self::ErrorMatching),
            _ => None,
        }
    }

    /// Reads the `status` column of a flattened row.
    #[must_use]
    pub fn of_record(record: &FlatRecord) -> Option<Self> {
        record
            .get("status")
            .and_then(serde_json::Value::as_str)
            .and_then(Self::parse)
    }
}

/// Body of an HTTP 429 response.
#[derive(Debug, Deserialize)]
pub(crate) struct RateLimitBody {
    #[serde(default)]
    pub detail: Option<String>,
}

/// Body of `GET /api/facilities/count/`.
#[derive(Debug, Deserialize)]
pub(crate) struct FacilityCount {
    pub count: u64,
}
