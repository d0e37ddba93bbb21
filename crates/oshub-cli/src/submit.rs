//! Arguments of the `submit` subcommand.

use anyhow::bail;
use clap::Args;
use oshub_core::{FacilityPayload, SubmitOptions};

#[derive(Debug, Args)]
pub struct SubmitArgs {
    /// Facility name
    #[arg(long)]
    pub name: Option<String>,
    /// Full street address
    #[arg(long)]
    pub address: Option<String>,
    /// Country name or ISO code
    #[arg(long)]
    pub country: Option<String>,
    #[arg(long)]
    pub sector: Option<String>,
    /// Number of workers, a count or a range such as `100-500`
    #[arg(long)]
    pub number_of_workers: Option<String>,
    #[arg(long)]
    pub facility_type: Option<String>,
    #[arg(long)]
    pub processing_type: Option<String>,
    #[arg(long)]
    pub product_type: Option<String>,
    #[arg(long)]
    pub parent_company_name: Option<String>,
    #[arg(long)]
    pub native_language_name: Option<String>,
    /// Additional form field, repeatable
    #[arg(long = "field", value_name = "KEY=VALUE")]
    pub fields: Vec<String>,
    /// Create a facility when no match is found
    #[arg(long)]
    pub create: bool,
    /// Keep the contribution private
    #[arg(long)]
    pub private: bool,
    /// Match on text only when geocoding fails
    #[arg(long)]
    pub text_only_fallback: bool,
    /// Rate-limit wait budget in seconds (defaults to `OSH_TIMEOUT_BUDGET_SECS`)
    #[arg(long)]
    pub budget: Option<u64>,
}

fn split_field(raw: &str) -> anyhow::Result<(String, String)> {
    let Some((key, value)) = raw.split_once('=') else {
        bail!("--field expects KEY=VALUE, got '{raw}'");
    };
    let key = key.trim();
    if key.is_empty() {
        bail!("--field has an empty key: '{raw}'");
    }
    Ok((key.to_string(), value.to_string()))
}

impl SubmitArgs {
    /// Builds the payload. `--field` entries are raw fields, so the named
    /// flags win when both set the same key.
    pub fn payload(&self) -> anyhow::Result<FacilityPayload> {
        let raw = self
            .fields
            .iter()
            .map(String::as_str)
            .map(split_field)
            .collect::<anyhow::Result<Vec<_>>>()?;

        let mut payload = FacilityPayload::new(
            self.name.as_deref().unwrap_or_default(),
            self.address.as_deref().unwrap_or_default(),
            self.country.as_deref().unwrap_or_default(),
        )
        .with_raw(raw);

        let optional = [
            ("sector", &self.sector),
            ("number_of_workers", &self.number_of_workers),
            ("facility_type", &self.facility_type),
            ("processing_type", &self.processing_type),
            ("product_type", &self.product_type),
            ("parent_company_name", &self.parent_company_name),
            ("native_language_name", &self.native_language_name),
        ];
        for (key, value) in optional {
            if let Some(value) = value {
                payload = payload.field(key, value.as_str());
            }
        }
        Ok(payload)
    }

    pub fn options(&self, budget_secs: u64) -> SubmitOptions {
        SubmitOptions {
            create: self.create,
            public: !self.private,
            text_only_fallback: self.text_only_fallback,
            timeout_budget_secs: budget_secs,
        }
    }
}
