//! Client for the Open Supply Hub facility registry.
//!
//! The interesting parts are [`FacilityClient::submit`], which drives the
//! create/match upload and honours server-dictated rate-limit waits within a
//! caller budget, and [`flatten_facilities`], which turns the nested match
//! response into flat rows.

pub mod client;
pub mod error;
pub mod flatten;
pub(crate) mod retry;
pub mod types;

pub use client::{match_id_from_url, FacilityClient};
pub use error::{ClientError, ErrorResult};
pub use flatten::flatten_facilities;
pub use oshub_core::{ClientConfig, FacilityPayload, MissingField, PayloadValue, SubmitOptions};
pub use types::{FlatRecord, MatchStatus};
