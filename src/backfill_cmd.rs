//! `rtier migrate`: run the tier backfill against the SQLite store and
//! print its report.
//!
//! The report goes to stdout. On failure the command still prints an
//! `updated: 0` summary before returning the store error, since a rejected
//! batch writes nothing.

use anyhow::Result;

use resource_tiers_core::backfill::{migrate_all_with, MigrationOptions, MigrationReport};
use resource_tiers_core::models::AccessTier;

use crate::config::Config;
use crate::db;
use crate::sqlite_store::SqliteStore;

pub async fn run_backfill(config: &Config, dry_run: bool, verbose: bool) -> Result<()> {
    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool, config.db.max_batch_writes);
    let rules = config.classifier_rules();

    let result = migrate_all_with(&store, &rules, MigrationOptions { dry_run }).await;
    store.close().await;

    match result {
        Ok(report) => {
            print_report(&report, verbose);
            Ok(())
        }
        Err(e) => {
            println!("migrate (failed)");
            println!("  updated: 0");
            Err(e.into())
        }
    }
}

pub fn print_report(report: &MigrationReport, verbose: bool) {
    if report.dry_run {
        println!("migrate (dry-run)");
    } else {
        println!("migrate");
    }

    if verbose {
        for a in &report.assignments {
            println!(
                "  {} {:<48} rank {:>4} ({:>5.1}%) -> {}",
                a.id, a.title, a.rank, a.percentile, a.tier
            );
        }
    }

    println!("  updated: {}", report.updated);
    println!("  skipped: {}", report.skipped);
    println!("  total: {}", report.total);

    if report.updated > 0 {
        println!("  assigned:");
        for tier in AccessTier::ALL {
            println!("    {:<10} {}", tier.as_str(), report.assigned.get(tier));
        }
    }
    println!("  expected distribution:");
    for tier in AccessTier::ALL {
        println!("    {:<10} ~{}", tier.as_str(), report.expected.get(tier));
    }

    if report.updated == 0 {
        println!("no updates needed");
    } else {
        println!("ok");
    }
}
