pub mod client_config;
pub mod config;
pub mod payload;

pub use client_config::ClientConfig;
pub use config::{load_client_config, load_client_config_from_env, parse_credentials_yaml};
pub use payload::{FacilityPayload, MissingField, PayloadValue, SubmitOptions};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("could not read credentials file {path}: {reason}")]
    CredentialsFile { path: String, reason: String },

    #[error("credentials file is missing key {0}")]
    MissingCredential(String),
}
