use std::path::PathBuf;

use anyhow::{anyhow, Result};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

mod commands;
mod schema;

#[derive(Parser)]
#[command(name = "wardsctl", version, about = "Inspect change policy snapshots")]
struct Cli {
    /// Snapshot file (YAML, or JSON when the extension is .json)
    #[arg(long, global = true, env = "WARDS_SNAPSHOT", value_name = "FILE")]
    snapshot: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the change policy that applies to an employee
    Resolve {
        #[arg(long)]
        org: String,
        #[arg(long)]
        employee: String,
        /// Evaluate at this instant instead of now (RFC 3339)
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },
    /// Classify an entry date for an employee
    Classify {
        #[arg(long)]
        org: String,
        #[arg(long)]
        employee: String,
        /// Entry date (YYYY-MM-DD)
        #[arg(long)]
        date: NaiveDate,
        /// Evaluate at this instant instead of now (RFC 3339)
        #[arg(long)]
        at: Option<DateTime<Utc>>,
        /// IANA timezone used to count days; overrides WARDS_TIMEZONE
        #[arg(long)]
        timezone: Option<String>,
    },
    /// List active assignments of an organization in resolution order
    Assignments {
        #[arg(long)]
        org: String,
    },
    /// Check a snapshot against the schema and model invariants
    Validate,
    /// Print version and exit
    Version,
}

fn init_tracing() {
    let _ = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn require(snapshot: Option<PathBuf>) -> Result<PathBuf> {
    snapshot.ok_or_else(|| anyhow!("No snapshot given. Use --snapshot FILE or set WARDS_SNAPSHOT"))
}

fn main() -> Result<()> {
    init_tracing();
    let Cli { snapshot, cmd } = Cli::parse();

    match cmd {
        Commands::Resolve { org, employee, at } => {
            commands::resolve(&require(snapshot)?, &org, &employee, at)?;
        }
        Commands::Classify {
            org,
            employee,
            date,
            at,
            timezone,
        } => {
            let snapshot = require(snapshot)?;
            commands::classify(&snapshot, &org, &employee, date, at, timezone.as_deref())?;
        }
        Commands::Assignments { org } => {
            commands::assignments(&require(snapshot)?, &org)?;
        }
        Commands::Validate => {
            if !commands::validate(&require(snapshot)?)? {
                std::process::exit(1);
            }
        }
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
        }
    }
    Ok(())
}
