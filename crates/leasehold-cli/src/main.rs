//! Command line client for the Leasehold lock ledger.
//!
//! Exit codes: 0 on success, 1 when an acquire finds the lock held, 2 on
//! any error.

mod commands;
mod startup;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::error;

use commands::{Context, Outcome};
use leasehold_common::LockSettings;

/// Command line arguments
#[derive(Debug, Parser)]
#[command(name = "leasehold", version, about = "Inspect and drive a shared lock ledger")]
struct Cli {
    /// Settings file (defaults to conf/leasehold.toml when present)
    #[arg(short = 'c', long = "config", global = true)]
    config: Option<PathBuf>,
    /// Ledger database URL
    #[arg(long = "db-url", env = "DATABASE_URL", global = true)]
    db_url: Option<String>,
    /// Owner identity written to the ledger (defaults to <hostname>:<pid>)
    #[arg(short = 'i', long = "identity", global = true)]
    identity: Option<String>,
    /// Lease length, e.g. `90s`, `15m`, `PT1H`, or bare seconds
    #[arg(short = 'l', long = "lease", global = true)]
    lease: Option<String>,
    /// Debug logging with targets
    #[arg(short = 'v', long = "verbose", global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create the lock ledger table if it does not exist
    Init,
    /// Try to take a lock
    Acquire { name: String },
    /// Give back a lock held by this identity
    Release { name: String },
    /// Print the recorded owner of a lock, `-` when free
    Owner { name: String },
    /// Print the ledger entry of a lock as JSON
    Status { name: String },
}

impl Cli {
    fn overrides(&self) -> Vec<(&'static str, String)> {
        let mut overrides = Vec::new();
        if let Some(v) = &self.db_url {
            overrides.push(("db.url", v.clone()));
        }
        if let Some(v) = &self.identity {
            overrides.push(("lock.identity", v.clone()));
        }
        if let Some(v) = &self.lease {
            overrides.push(("lock.lease", v.clone()));
        }
        overrides
    }
}

async fn run(cli: Cli, settings: LockSettings) -> anyhow::Result<Outcome> {
    let ctx = Context::open(settings).await?;

    match &cli.command {
        Command::Init => commands::init(&ctx).await,
        Command::Acquire { name } => commands::acquire(&ctx, name).await,
        Command::Release { name } => commands::release(&ctx, name).await,
        Command::Owner { name } => commands::owner(&ctx, name).await,
        Command::Status { name } => commands::status(&ctx, name).await,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match LockSettings::load_with_overrides(cli.config.as_deref(), &cli.overrides()) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Failed to load settings: {}", e);
            return ExitCode::from(2);
        }
    };

    let logging_config = startup::LoggingConfig::from_config(&settings.log.level, cli.verbose);
    if let Err(e) = startup::init_logging(&logging_config) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    match run(cli, settings).await {
        Ok(Outcome::Done) => ExitCode::SUCCESS,
        Ok(Outcome::Contended) => ExitCode::from(1),
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(2)
        }
    }
}
