//! Facility submission payloads.
//!
//! A [`FacilityPayload`] collects the fields sent to the registry's
//! create/match endpoint. Fields can be supplied explicitly through the
//! builder methods or in bulk through a raw key/value map; explicit fields
//! always win over same-named raw keys.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Required fields, in the order they are validated.
pub const REQUIRED_FIELDS: [&str; 3] = ["name", "address", "country"];

/// A single form value. The registry accepts text and numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PayloadValue {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl PayloadValue {
    fn trimmed(self) -> Self {
        match self {
            Self::Text(s) => Self::Text(s.trim().to_string()),
            other => other,
        }
    }

    fn is_blank(&self) -> bool {
        matches!(self, Self::Text(s) if s.trim().is_empty())
    }
}

impl fmt::Display for PayloadValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(n) => write!(f, "{n}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for PayloadValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for PayloadValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for PayloadValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for PayloadValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

/// A required field that was empty after merging and trimming.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingField {
    Name,
    Address,
    Country,
}

impl MissingField {
    /// Legacy numeric code reported for this field.
    #[must_use]
    pub fn code(self) -> i32 {
        match self {
            Self::Name => -100,
            Self::Address => -101,
            Self::Country => -102,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Address => "address",
            Self::Country => "country",
        }
    }

    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            Self::Name => "Empty facility name given, we need a name.",
            Self::Address => "Empty address given, we need an address.",
            Self::Country => "Empty country name given, we need a country.",
        }
    }

    fn from_key(key: &str) -> Option<Self> {
        match key {
            "name" => Some(Self::Name),
            "address" => Some(Self::Address),
            "country" => Some(Self::Country),
            _ => None,
        }
    }
}

impl fmt::Display for MissingField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fields for one create/match submission.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FacilityPayload {
    explicit: BTreeMap<String, PayloadValue>,
    raw: BTreeMap<String, PayloadValue>,
}

impl FacilityPayload {
    #[must_use]
    pub fn new(name: &str, address: &str, country: &str) -> Self {
        Self::default()
            .field("name", name)
            .field("address", address)
            .field("country", country)
    }

    /// Supply fields in bulk. Explicit fields set through the other builder
    /// methods take precedence over keys in this map.
    #[must_use]
    pub fn with_raw<I, K, V>(mut self, raw: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<PayloadValue>,
    {
        self.raw
            .extend(raw.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Set an arbitrary explicit field. Blank text is treated as not supplied.
    #[must_use]
    pub fn field(mut self, key: &str, value: impl Into<PayloadValue>) -> Self {
        self.explicit.insert(key.to_string(), value.into());
        self
    }

    #[must_use]
    pub fn sector(self, sector: &str) -> Self {
        self.field("sector", sector)
    }

    #[must_use]
    pub fn number_of_workers(self, value: &str) -> Self {
        self.field("number_of_workers", value)
    }

    #[must_use]
    pub fn facility_type(self, value: &str) -> Self {
        self.field("facility_type", value)
    }

    #[must_use]
    pub fn processing_type(self, value: &str) -> Self {
        self.field("processing_type", value)
    }

    #[must_use]
    pub fn product_type(self, value: &str) -> Self {
        self.field("product_type", value)
    }

    #[must_use]
    pub fn parent_company_name(self, value: &str) -> Self {
        self.field("parent_company_name", value)
    }

    #[must_use]
    pub fn native_language_name(self, value: &str) -> Self {
        self.field("native_language_name", value)
    }

    /// Merge raw and explicit fields into the form that is sent on the wire.
    ///
    /// Text values are trimmed, blank values are dropped, explicit fields
    /// overwrite raw ones, then `name`, `address` and `country` are checked
    /// in that order.
    ///
    /// # Errors
    ///
    /// Returns the first required field that is missing or blank.
    pub fn into_form(self) -> Result<BTreeMap<String, String>, MissingField> {
        let mut merged: BTreeMap<String, PayloadValue> = BTreeMap::new();
        for (key, value) in self.raw.into_iter().chain(self.explicit) {
            if value.is_blank() {
                continue;
            }
            merged.insert(key.trim().to_string(), value.trimmed());
        }

        if let Some(missing) = REQUIRED_FIELDS
            .into_iter()
            .find(|key| !merged.contains_key(*key))
            .and_then(MissingField::from_key)
        {
            return Err(missing);
        }

        Ok(merged
            .into_iter()
            .map(|(k, v)| (k, v.to_string()))
            .collect())
    }
}

/// Query flags and retry budget for a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitOptions {
    /// Create a new facility when no match is found.
    pub create: bool,
    pub public: bool,
    /// Let the registry fall back to text-only matching when geocoding fails.
    pub text_only_fallback: bool,
    pub timeout_budget_secs: u64,
}

impl Default for SubmitOptions {
    fn default() -> Self {
        Self {
            create: false,
            public: true,
            text_only_fallback: false,
            timeout_budget_secs: 20,
        }
    }
}
