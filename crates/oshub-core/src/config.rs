use std::path::Path;

use serde::Deserialize;

use crate::client_config::ClientConfig;
use crate::ConfigError;

/// Credentials file read when `OSH_ENV_YML` is not set.
pub const DEFAULT_CREDENTIALS_PATH: &str = "./.env.yml";

/// Contents of a YAML credentials file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub url: String,
    pub token: String,
}

#[derive(Deserialize)]
struct RawCredentials {
    #[serde(rename = "OSH_URL")]
    url: Option<String>,
    #[serde(rename = "OSH_TOKEN")]
    token: Option<String>,
}

/// Load client configuration from `.env`, the credentials file and the process environment.
///
/// # Errors
///
/// Returns `ConfigError` if an env var has an invalid value or the credentials
/// file cannot be read or parsed.
pub fn load_client_config() -> Result<ClientConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_client_config_from_env()
}

/// Load client configuration without touching `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if an env var has an invalid value or the credentials
/// file cannot be read or parsed.
pub fn load_client_config_from_env() -> Result<ClientConfig, ConfigError> {
    build_client_config(|key| std::env::var(key), |path| std::fs::read_to_string(path))
}

/// Parse the YAML credentials format:
///
/// ```text
/// OSH_URL: https://opensupplyhub.org
/// OSH_TOKEN: 12345abcdef12345abcdef12345abcdef
/// ```
///
/// # Errors
///
/// Returns [`ConfigError::CredentialsFile`] for malformed YAML and
/// [`ConfigError::MissingCredential`] if either key is absent.
pub fn parse_credentials_yaml(text: &str) -> Result<Credentials, ConfigError> {
    let raw: RawCredentials =
        serde_yaml::from_str(text).map_err(|e| ConfigError::CredentialsFile {
            path: "<yaml>".to_string(),
            reason: e.to_string(),
        })?;
    let url = raw
        .url
        .ok_or_else(|| ConfigError::MissingCredential("OSH_URL".to_string()))?;
    let token = raw
        .token
        .ok_or_else(|| ConfigError::MissingCredential("OSH_TOKEN".to_string()))?;
    Ok(Credentials { url, token })
}

/// Resolve the credentials file, if any.
///
/// An explicit `OSH_ENV_YML` path must be readable; the default path is
/// optional and silently skipped when absent.
fn read_credentials<F, R>(lookup: &F, read: &R) -> Result<Option<Credentials>, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
    R: Fn(&Path) -> std::io::Result<String>,
{
    let explicit = lookup("OSH_ENV_YML").ok().filter(|p| !p.trim().is_empty());
    let path = explicit
        .clone()
        .unwrap_or_else(|| DEFAULT_CREDENTIALS_PATH.to_string());

    let text = match read(Path::new(&path)) {
        Ok(text) => text,
        Err(e) if explicit.is_none() && e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(None);
        }
        Err(e) => {
            return Err(ConfigError::CredentialsFile {
                path,
                reason: e.to_string(),
            });
        }
    };

    parse_credentials_yaml(&text)
        .map(Some)
        .map_err(|e| match e {
            ConfigError::CredentialsFile { reason, .. } => ConfigError::CredentialsFile {
                path: path.clone(),
                reason,
            },
            other => other,
        })
}

/// Core parsing and precedence logic, decoupled from the real environment
/// and filesystem so it can be tested with plain closures.
fn build_client_config<F, R>(lookup: F, read: R) -> Result<ClientConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
    R: Fn(&Path) -> std::io::Result<String>,
{
    let defaults = ClientConfig::default();
    let credentials = read_credentials(&lookup, &read)?;

    let parse_u64 = |var: &str, default: u64| -> Result<u64, ConfigError> {
        match lookup(var) {
            Ok(raw) => raw
                .trim()
                .parse::<u64>()
                .map_err(|e| ConfigError::InvalidEnvVar {
                    var: var.to_string(),
                    reason: e.to_string(),
                }),
            Err(_) => Ok(default),
        }
    };

    let parse_bool = |var: &str, default: bool| -> Result<bool, ConfigError> {
        match lookup(var) {
            Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => Ok(true),
                "0" | "false" | "no" | "" => Ok(false),
                other => Err(ConfigError::InvalidEnvVar {
                    var: var.to_string(),
                    reason: format!("expected a boolean, got \"{other}\""),
                }),
            },
            Err(_) => Ok(default),
        }
    };

    let base_url = lookup("OSH_URL")
        .ok()
        .or_else(|| credentials.as_ref().map(|c| c.url.clone()))
        .unwrap_or(defaults.base_url);
    let token = lookup("OSH_TOKEN")
        .ok()
        .or_else(|| credentials.as_ref().map(|c| c.token.clone()))
        .unwrap_or(defaults.token);

    Ok(ClientConfig {
        base_url: base_url.trim().trim_end_matches('/').to_string(),
        token: token.trim().to_string(),
        timeout_budget_secs: parse_u64("OSH_TIMEOUT_BUDGET_SECS", defaults.timeout_budget_secs)?,
        connect_timeout_secs: parse_u64(
            "OSH_CONNECT_TIMEOUT_SECS",
            defaults.connect_timeout_secs,
        )?,
        health_check_timeout_secs: parse_u64(
            "OSH_HEALTH_CHECK_TIMEOUT_SECS",
            defaults.health_check_timeout_secs,
        )?,
        user_agent: lookup("OSH_USER_AGENT").unwrap_or(defaults.user_agent),
        check_token: parse_bool("OSH_CHECK_TOKEN", defaults.check_token)?,
    })
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
