use clap::Args;
use oshub_client::{match_id_from_url, ClientError};

/// Identifies a potential match by id or by its confirm/reject URL.
#[derive(Debug, Args)]
#[group(required = true, multiple = false)]
pub struct MatchArgs {
    #[arg(long)]
    pub match_id: Option<u64>,
    /// A `match_confirm_match_url` or `match_reject_match_url` value
    #[arg(long)]
    pub match_url: Option<String>,
}

impl MatchArgs {
    pub fn resolve(&self) -> Result<u64, ClientError> {
        match (self.match_id, self.match_url.as_deref()) {
            (Some(id), _) => Ok(id),
            (None, Some(url)) => match_id_from_url(url),
            (None, None) => Err(ClientError::InvalidMatchUrl(String::new())),
        }
    }
}
