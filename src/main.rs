//! # Resource Tiers CLI (`rtier`)
//!
//! Operator interface for the tier engine: schema setup, record import,
//! the one-shot tier backfill, plan-scoped listings, and collection stats.
//!
//! ## Usage
//!
//! ```bash
//! rtier --config ./config/rtier.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `rtier init` | Create the SQLite database and schema |
//! | `rtier load <file>` | Import raw documents (JSON array or JSON lines) |
//! | `rtier migrate` | Backfill tiers on records that lack one |
//! | `rtier list --plan <name>` | List active records capped for a plan |
//! | `rtier stats` | Per-shape, per-type, and per-tier counts |
//!
//! Diagnostics go to stderr and are filtered with `RUST_LOG`; reports go to
//! stdout.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use resource_tiers::{backfill_cmd, config, list, load, schema, stats};

/// Resource Tiers CLI: access-tier engine for aggregated job, course, and
/// tool listings.
#[derive(Parser)]
#[command(
    name = "rtier",
    about = "Resource Tiers: normalize, backfill, and serve plan-gated resource listings",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/rtier.toml`. Database, classifier tables, and
    /// plan caps are read from this file.
    #[arg(long, global = true, default_value = "./config/rtier.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Idempotent: running it multiple times is safe.
    Init,

    /// Import raw documents into the store.
    ///
    /// Accepts a JSON array of objects or one object per line. Each object's
    /// `id` becomes the record id; a UUID is generated when it is missing.
    Load {
        /// Path to the JSON or JSON-lines file.
        file: PathBuf,

        /// Reject the whole file if any record is incomplete.
        #[arg(long)]
        strict: bool,

        /// Parse and count only; write nothing.
        #[arg(long)]
        dry_run: bool,
    },

    /// Backfill access tiers on records that lack one.
    ///
    /// Classifies every untagged record and commits all updates in a single
    /// batch. Records that already have a tier are never changed, so a second
    /// run reports `updated: 0`.
    Migrate {
        /// Show the assignments without committing them.
        #[arg(long)]
        dry_run: bool,

        /// Print every assignment.
        #[arg(long, short)]
        verbose: bool,
    },

    /// List active records for a subscription plan.
    List {
        /// Plan name. Unknown plans fall back to the most restrictive plan.
        #[arg(long, default_value = "free")]
        plan: String,

        /// Also hide records above the plan's tier ceiling.
        #[arg(long)]
        gate: bool,

        /// Emit JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Show per-shape, per-type, and per-tier counts.
    Stats {
        /// Emit JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "resource_tiers=info,resource_tiers_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    // `load --dry-run` only parses, so it works without a config file.
    if let Commands::Load {
        file,
        strict,
        dry_run: true,
    } = &cli.command
    {
        let cfg = config::load_config(&cli.config).unwrap_or_else(|_| config::Config::minimal());
        load::run_load(&cfg, file, *strict, true).await?;
        return Ok(());
    }

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            schema::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Load {
            file,
            strict,
            dry_run,
        } => {
            load::run_load(&cfg, &file, strict, dry_run).await?;
        }
        Commands::Migrate { dry_run, verbose } => {
            backfill_cmd::run_backfill(&cfg, dry_run, verbose).await?;
        }
        Commands::List { plan, gate, json } => {
            list::run_list(&cfg, &plan, gate, json).await?;
        }
        Commands::Stats { json } => {
            stats::run_stats(&cfg, json).await?;
        }
    }

    Ok(())
}
