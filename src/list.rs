//! `rtier list`: the plan-scoped listing.
//!
//! Without `--gate` only the plan's per-type caps apply. With `--gate` the
//! plan's `max_tier` ceiling is applied first, hiding records above it.

use anyhow::Result;

use resource_tiers_core::models::ResourceType;
use resource_tiers_core::query::{list_for_plan_with, AllowAll, CapabilityCheck, PlanListing, TierCeiling};

use crate::config::Config;
use crate::db;
use crate::sqlite_store::SqliteStore;

/// Build the listing for `plan` from the configured store.
pub async fn plan_listing(config: &Config, plan: &str, gate: bool) -> Result<PlanListing> {
    let entitlements = config.entitlements()?;
    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool, config.db.max_batch_writes);

    let (_, entitlement, _) = entitlements.resolve(plan);
    let ceiling = TierCeiling::for_plan(entitlement);
    let check: &dyn CapabilityCheck = if gate { &ceiling } else { &AllowAll };

    let listing = list_for_plan_with(&store, &entitlements, plan, check).await;
    store.close().await;
    Ok(listing?)
}

pub async fn run_list(config: &Config, plan: &str, gate: bool, json: bool) -> Result<()> {
    let listing = plan_listing(config, plan, gate).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&listing)?);
        return Ok(());
    }

    if listing.substituted {
        println!(
            "plan {} (unknown, using {})",
            listing.requested_plan, listing.plan
        );
    } else {
        println!("plan {}", listing.plan);
    }

    for t in ResourceType::ALL {
        let group = listing.group(t);
        println!();
        println!(
            "{}s: {} of {}{}",
            t,
            group.len(),
            listing.available.get(t),
            if listing.has_more(t) { " (more with upgrade)" } else { "" }
        );
        for r in group {
            let created = r
                .created_at
                .map(|dt| dt.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "-".to_string());
            println!(
                "  {:<10} {:<10} {:<48} {}",
                created,
                r.effective_tier().as_str(),
                r.title,
                r.id
            );
        }
    }

    Ok(())
}
