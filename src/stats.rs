//! Collection statistics.
//!
//! A quick summary of what's stored: record shapes, statuses, and the
//! per-type and per-tier breakdowns. Used by `rtier stats` to check a load
//! or a backfill before and after running it.

use anyhow::Result;
use serde::Serialize;

use resource_tiers_core::diagnostics::{collect_inventory, Inventory};
use resource_tiers_core::models::{AccessTier, ResourceType};

use crate::config::Config;
use crate::db;
use crate::sqlite_store::SqliteStore;

#[derive(Serialize)]
struct StatsOutput<'a> {
    database: String,
    size_bytes: u64,
    #[serde(flatten)]
    inventory: &'a Inventory,
}

/// Run the stats command: scan the store and print a summary.
pub async fn run_stats(config: &Config, json: bool) -> Result<()> {
    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool, config.db.max_batch_writes);
    let inventory = collect_inventory(&store).await;
    store.close().await;
    let inv = inventory?;

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    if json {
        let out = StatsOutput {
            database: config.db.path.display().to_string(),
            size_bytes: db_size,
            inventory: &inv,
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!("Resource Tiers: Collection Stats");
    println!("=================================");
    println!();
    println!("  Database:    {}", config.db.path.display());
    println!("  Size:        {}", format_bytes(db_size));
    println!();
    println!("  Records:     {}", inv.total);
    println!("  Current:     {}", inv.shapes.current);
    println!("  Legacy:      {}", inv.shapes.legacy);
    println!("  Active:      {}", inv.statuses.active);
    println!("  Inactive:    {}", inv.statuses.inactive);

    println!();
    println!("  By type:");
    for t in ResourceType::ALL {
        println!("    {:<12} {:>6}", t.as_str(), inv.types.get(t));
    }

    println!();
    println!("  By tier:");
    for tier in AccessTier::ALL {
        println!("    {:<12} {:>6}", tier.as_str(), inv.tiers.get(tier));
    }
    println!("    {:<12} {:>6}", "unassigned", inv.unassigned);
    if inv.unassigned > 0 {
        println!();
        println!("  {} record(s) need a tier; run `rtier migrate`.", inv.unassigned);
    }
    println!();

    Ok(())
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}
