//! bmctl - A command line client for the BattleMetrics API.
//!
//! # Configuration
//!
//! Create a `battlemetrics.yaml` file with your token:
//!
//! ```yaml
//! api:
//!   token: "your-token"
//! retry:
//!   max_retries: 5
//!   cooldown: 30
//! ```
//!
//! Any value can be overridden with the `BATTLEMETRICS_` prefix:
//!
//! ```bash
//! export BATTLEMETRICS_API__TOKEN="your-token"
//! ```
//!
//! # Usage
//!
//! ```bash
//! bmctl --config battlemetrics.yaml player 42
//! bmctl --config battlemetrics.yaml search-bans --search 76561198000000000
//! bmctl --config battlemetrics.yaml export-bans --org 12345
//! bmctl --config battlemetrics.yaml scopes
//! ```
//!
//! Results are printed as pretty JSON on stdout, logs go to stderr.
//!
//! # Environment Variables
//!
//! - `RUST_LOG` - Controls logging level (default: `info`)

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use env_logger::Env;
use log::info;
use serde::Serialize;

use battlemetrics::config::Config;
use battlemetrics::resources::BanSearch;

/// Command-line arguments for bmctl.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the YAML configuration file.
    #[arg(short, long, default_value = "battlemetrics.yaml")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show a player with identifiers, servers and flags
    Player {
        /// BattleMetrics player id
        id: String,
    },
    /// Search bans, most recent first
    SearchBans {
        /// Free text, e.g. a Steam id or a name
        #[arg(long)]
        search: Option<String>,
        /// Organization id
        #[arg(long)]
        org: Option<String>,
    },
    /// Export the bans of an organization as ban records
    ExportBans {
        /// Organization id
        #[arg(long)]
        org: String,
        /// Server id
        #[arg(long)]
        server: Option<String>,
    },
    /// Show the scopes of the configured token
    Scopes,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Put logger at info level by default
    let env = Env::default().filter_or("RUST_LOG", "info");
    env_logger::init_from_env(env);

    let args = Args::parse();
    info!("Starting bmctl {}...", env!("CARGO_PKG_VERSION"));

    let config = Config::load(&args.config)
        .with_context(|| format!("failed to load config file {}", args.config))?;
    let client = config.client()?;

    match args.command {
        Command::Player { id } => print_json(&client.players().info(&id).await?)?,
        Command::SearchBans { search, org } => {
            let search = BanSearch {
                search,
                organization: org,
                ..Default::default()
            };
            print_json(&client.bans().search(&search).await?)?
        }
        Command::ExportBans { org, server } => {
            let records = client.ban_lists().export(&org, server.as_deref()).await?;
            info!("exported {} bans", records.len());
            print_json(&records)?
        }
        Command::Scopes => print_json(&client.check_api_scopes(None).await?)?,
    }

    client.close();
    Ok(())
}
