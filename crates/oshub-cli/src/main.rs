mod matches;
mod submit;

use clap::{Parser, Subcommand};
use oshub_client::{ClientError, ErrorResult, FacilityClient};
use oshub_core::ClientConfig;
use tracing_subscriber::EnvFilter;

use crate::matches::MatchArgs;
use crate::submit::SubmitArgs;

#[derive(Debug, Parser)]
#[command(name = "oshub")]
#[command(about = "Open Supply Hub facility registry client")]
struct Cli {
    /// Registry base URL (overrides `OSH_URL` and the credentials file)
    #[arg(long, global = true)]
    url: Option<String>,
    /// API token (overrides `OSH_TOKEN` and the credentials file)
    #[arg(long, global = true)]
    token: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Check that the registry is reachable
    Health {
        /// Also verify the API token
        #[arg(long)]
        check_token: bool,
    },
    /// Submit one facility and print the match rows as JSON lines
    Submit(Box<SubmitArgs>),
    /// Confirm a potential match
    Confirm(MatchArgs),
    /// Reject a potential match
    Reject(MatchArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = resolve_config(&cli)?;
    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Health { check_token } => {
            let config = ClientConfig {
                check_token: check_token || config.check_token,
                ..config
            };
            FacilityClient::connect(&config)
                .await
                .map_err(|e| report(&e))?;
            println!("ok");
        }
        Commands::Submit(args) => {
            let budget = args.budget.unwrap_or(config.timeout_budget_secs);
            let client = FacilityClient::new(&config)?;
            let rows = client
                .submit(args.payload()?, args.options(budget))
                .await
                .map_err(|e| report(&e))?;
            for row in &rows {
                println!("{}", serde_json::to_string(row)?);
            }
            tracing::debug!(
                api_calls = client.api_call_count(),
                last_call = ?client.last_call_duration(),
                "submission finished"
            );
        }
        Commands::Confirm(args) => {
            let client = FacilityClient::new(&config)?;
            let body = client
                .confirm_match(args.resolve().map_err(|e| report(&e))?)
                .await
                .map_err(|e| report(&e))?;
            println!("{body}");
        }
        Commands::Reject(args) => {
            let client = FacilityClient::new(&config)?;
            let body = client
                .reject_match(args.resolve().map_err(|e| report(&e))?)
                .await
                .map_err(|e| report(&e))?;
            println!("{body}");
        }
    }

    Ok(())
}

/// Loads `.env`, the credentials file and the environment, then applies the
/// command-line overrides.
fn resolve_config(cli: &Cli) -> anyhow::Result<ClientConfig> {
    Ok(apply_overrides(oshub_core::load_client_config()?, cli))
}

fn apply_overrides(config: ClientConfig, cli: &Cli) -> ClientConfig {
    ClientConfig {
        base_url: cli
            .url
            .as_deref()
            .map_or(config.base_url, |u| u.trim_end_matches('/').to_owned()),
        token: cli.token.clone().unwrap_or(config.token),
        ..config
    }
}

/// Prints the machine-readable error row and hands the error on to `main`.
fn report(err: &ClientError) -> anyhow::Error {
    match serde_json::to_string(&ErrorResult::from(err)) {
        Ok(line) => println!("{line}"),
        Err(e) => tracing::warn!(error = %e, "could not serialize error result"),
    }
    anyhow::anyhow!("{err}")
}
