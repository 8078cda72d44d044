//! Tier backfill: the batch migration that assigns tiers to untagged records.
//!
//! # Steps
//!
//! 1. Scan the whole collection and normalize every record.
//! 2. Partition: records with a tier (stored `access_level`, or any legacy
//!    record) are skipped; CURRENT records without one need classification.
//! 3. Sort the untagged subset by title (case-insensitive, ties by id) and
//!    classify each record using its rank **within that subset**.
//! 4. Stage one visibility patch per untagged record.
//! 5. Commit the batch in a single all-or-nothing call.
//!
//! A second run finds nothing untagged and reports `updated == 0`. A failed
//! commit changes nothing, so retrying the whole operation is safe.
//!
//! Ranking over the untagged subset (rather than the whole store) means the
//! tiers a record receives depend on which records were still untagged when
//! the run happened. Tests pin this behaviour.

use serde::Serialize;

use crate::classify::{classify, percentile, sort_for_classification, ClassifierRules};
use crate::error::Result;
use crate::models::{AccessTier, NormalizedResource, RawRecord};
use crate::normalize::normalize;
use crate::store::{ResourceStore, UpdateBatch, VisibilityPatch};

#[derive(Debug, Clone, Copy, Default)]
pub struct MigrationOptions {
    /// Stage and report, but do not commit.
    pub dry_run: bool,
}

/// Counts per tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TierCounts {
    pub free: usize,
    pub pro: usize,
    pub enterprise: usize,
}

impl TierCounts {
    pub fn add(&mut self, tier: AccessTier) {
        match tier {
            AccessTier::Free => self.free += 1,
            AccessTier::Pro => self.pro += 1,
            AccessTier::Enterprise => self.enterprise += 1,
        }
    }

    pub fn get(&self, tier: AccessTier) -> usize {
        match tier {
            AccessTier::Free => self.free,
            AccessTier::Pro => self.pro,
            AccessTier::Enterprise => self.enterprise,
        }
    }

    pub fn total(&self) -> usize {
        self.free + self.pro + self.enterprise
    }
}

/// Target 60/30/10 split for `total` records, rounded up for the lower tiers.
pub fn expected_distribution(total: usize) -> TierCounts {
    let free = (total * 6).div_ceil(10);
    let pro = (total * 3).div_ceil(10);
    TierCounts {
        free,
        pro,
        enterprise: total.saturating_sub(free + pro),
    }
}

/// One record's backfilled tier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assignment {
    pub id: String,
    pub title: String,
    pub rank: usize,
    pub percentile: f64,
    pub tier: AccessTier,
}

/// Outcome of a backfill run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MigrationReport {
    /// Records written (or, on a dry run, that would have been written).
    pub updated: usize,
    pub skipped: usize,
    pub total: usize,
    pub dry_run: bool,
    pub assignments: Vec<Assignment>,
    /// Tiers handed out by this run.
    pub assigned: TierCounts,
    /// Target distribution over the whole collection.
    pub expected: TierCounts,
}

/// Pure staging step: decide what the backfill would write for `records`.
///
/// Returns the batch to commit and a report whose `updated` equals the
/// batch length.
pub fn plan_backfill(records: &[RawRecord], rules: &ClassifierRules) -> (UpdateBatch, MigrationReport) {
    let total = records.len();
    let (tagged, mut untagged): (Vec<NormalizedResource>, Vec<NormalizedResource>) = records
        .iter()
        .map(normalize)
        .partition(|r| r.access_tier.is_assigned());

    for r in &tagged {
        tracing::debug!(id = %r.id, title = %r.title, "skipping record with existing tier");
    }

    sort_for_classification(&mut untagged);
    let subset = untagged.len();

    let mut batch = UpdateBatch::new();
    let mut assignments = Vec::with_capacity(subset);
    let mut assigned = TierCounts::default();

    for (rank, resource) in untagged.iter().enumerate() {
        let c = classify(resource, rank, subset, rules);
        tracing::debug!(
            id = %resource.id,
            title = %resource.title,
            rank,
            tier = %c.tier,
            "classified"
        );
        batch.stage(resource.id.clone(), VisibilityPatch::from_classification(&c));
        assigned.add(c.tier);
        assignments.push(Assignment {
            id: resource.id.clone(),
            title: resource.title.clone(),
            rank,
            percentile: percentile(rank, subset),
            tier: c.tier,
        });
    }

    let report = MigrationReport {
        updated: batch.len(),
        skipped: tagged.len(),
        total,
        dry_run: false,
        assignments,
        assigned,
        expected: expected_distribution(total),
    };
    (batch, report)
}

/// Run the backfill against `store` and commit the result.
pub async fn migrate_all<S>(store: &S, rules: &ClassifierRules) -> Result<MigrationReport>
where
    S: ResourceStore + ?Sized,
{
    migrate_all_with(store, rules, MigrationOptions::default()).await
}

/// [`migrate_all`] with options.
///
/// Store failures are returned unchanged; no retry is attempted.
pub async fn migrate_all_with<S>(
    store: &S,
    rules: &ClassifierRules,
    options: MigrationOptions,
) -> Result<MigrationReport>
where
    S: ResourceStore + ?Sized,
{
    let records = store.scan().await?;
    tracing::info!(total = records.len(), "scanned resources for backfill");

    let (batch, mut report) = plan_backfill(&records, rules);
    report.dry_run = options.dry_run;

    if batch.is_empty() {
        tracing::info!("no records need a tier");
        return Ok(report);
    }
    if options.dry_run {
        tracing::info!(staged = batch.len(), "dry run: batch not committed");
        return Ok(report);
    }

    let staged = batch.len();
    if let Err(e) = store.commit(batch).await {
        tracing::warn!(staged, error = %e, "backfill batch rejected");
        return Err(e);
    }
    tracing::info!(updated = staged, "backfill committed");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entitlement::PlanEntitlements;
    use crate::error::TierError;
    use crate::query::list_for_plan;
    use crate::store::memory::InMemoryStore;
    use serde_json::{json, Value};

    fn current(id: &str, title: &str) -> RawRecord {
        RawRecord::new(
            id,
            json!({
                "metadata": { "title": title, "type": "job" },
                "content": { "company": "Local Co", "location": "Karachi" },
                "visibility": { "status": "active" }
            }),
        )
    }

    fn current_with(id: &str, title: &str, company: &str, location: &str) -> RawRecord {
        RawRecord::new(
            id,
            json!({
                "metadata": { "title": title, "type": "job" },
                "content": { "company": company, "location": location }
            }),
        )
    }

    fn tiered(id: &str, title: &str, tier: &str) -> RawRecord {
        RawRecord::new(
            id,
            json!({
                "metadata": { "title": title, "type": "course" },
                "visibility": { "access_level": tier, "priority_score": 7 }
            }),
        )
    }

    fn legacy(id: &str, title: &str) -> RawRecord {
        RawRecord::new(id, json!({ "title": title, "type": "tool", "status": "active" }))
    }

    fn level(store: &InMemoryStore, id: &str) -> Value {
        store.get(id).unwrap()["visibility"]["access_level"].clone()
    }

    /// 20 untagged records titled "Role 00".."Role 19"; 13..=18 fall in the
    /// pro band, 19 in the enterprise band.
    fn twenty() -> Vec<RawRecord> {
        (0..20)
            .map(|i| {
                let title = format!("Role {:02}", i);
                match i {
                    14 => current_with(&format!("r{:02}", i), &format!("Senior {}", title), "", ""),
                    16 => current_with(&format!("r{:02}", i), &title, "Shopify", ""),
                    17 => current_with(&format!("r{:02}", i), &title, "", "Worldwide"),
                    _ => current(&format!("r{:02}", i), &title),
                }
            })
            .collect()
    }

    #[tokio::test]
    async fn test_assigns_every_band() {
        let store = InMemoryStore::with_records(twenty());
        let report = migrate_all(&store, &ClassifierRules::default()).await.unwrap();

        assert_eq!(report.updated, 20);
        assert_eq!(report.skipped, 0);
        assert_eq!(report.total, 20);
        assert_eq!(report.assigned, TierCounts { free: 17, pro: 2, enterprise: 1 });

        assert_eq!(level(&store, "r00"), "free");
        assert_eq!(level(&store, "r13"), "free");
        // "Senior Role 14" sorts after every "Role NN" title: rank 19 => enterprise.
        assert_eq!(level(&store, "r14"), "enterprise");
        assert_eq!(level(&store, "r15"), "free");
        assert_eq!(level(&store, "r16"), "pro");
        assert_eq!(level(&store, "r17"), "pro");
        assert_eq!(level(&store, "r18"), "free");
        assert_eq!(level(&store, "r19"), "free");

        let doc = store.get("r14").unwrap();
        assert_eq!(doc["visibility"]["is_featured"], true);
        assert_eq!(doc["visibility"]["priority_score"], 100);
        assert_eq!(doc["visibility"]["status"], "active");
        assert_eq!(doc["content"]["company"], "");
    }

    #[tokio::test]
    async fn test_second_run_updates_nothing() {
        let store = InMemoryStore::with_records(twenty());
        let rules = ClassifierRules::default();
        migrate_all(&store, &rules).await.unwrap();

        let second = migrate_all(&store, &rules).await.unwrap();
        assert_eq!(second.updated, 0);
        assert_eq!(second.skipped, 20);
        assert_eq!(store.commit_count(), 1);
    }

    #[tokio::test]
    async fn test_tagged_and_legacy_untouched() {
        let tagged = tiered("t1", "Aardvark Course", "enterprise");
        let old = legacy("l1", "Zeta Tool");
        let store = InMemoryStore::with_records(vec![
            tagged.clone(),
            old.clone(),
            current("c1", "Middle"),
        ]);
        let report = migrate_all(&store, &ClassifierRules::default()).await.unwrap();

        assert_eq!(report.updated, 1);
        assert_eq!(report.skipped, 2);
        assert_eq!(report.total, 3);
        assert_eq!(store.get("t1").unwrap(), tagged.doc);
        assert_eq!(store.get("l1").unwrap(), old.doc);
    }

    #[tokio::test]
    async fn test_ranks_are_relative_to_untagged_subset() {
        // Alone, the single untagged record has rank 0 of 1 => free, even
        // though it sorts last across the whole store.
        let mut records: Vec<RawRecord> = (0..9)
            .map(|i| tiered(&format!("t{}", i), &format!("A{}", i), "pro"))
            .collect();
        records.push(current("z", "Zzz Last"));
        let store = InMemoryStore::with_records(records);

        let report = migrate_all(&store, &ClassifierRules::default()).await.unwrap();
        assert_eq!(report.updated, 1);
        assert_eq!(report.assignments[0].rank, 0);
        assert_eq!(level(&store, "z"), "free");
    }

    #[tokio::test]
    async fn test_inactive_record_gets_tier_but_stays_hidden() {
        let hidden = RawRecord::new(
            "h1",
            json!({
                "metadata": { "title": "Hidden", "type": "job" },
                "visibility": { "status": "inactive", "is_featured": true, "priority_score": 7 }
            }),
        );
        let store = InMemoryStore::with_records(vec![hidden]);
        let report = migrate_all(&store, &ClassifierRules::default()).await.unwrap();
        assert_eq!(report.updated, 1);

        let doc = store.get("h1").unwrap();
        assert_eq!(doc["visibility"]["access_level"], "free");
        assert_eq!(doc["visibility"]["status"], "inactive");
        assert_eq!(doc["visibility"]["is_featured"], true);
        assert_eq!(doc["visibility"]["priority_score"], 7);

        let listing = list_for_plan(&store, &PlanEntitlements::default(), "enterprise")
            .await
            .unwrap();
        assert!(listing.jobs.is_empty());
    }

    #[tokio::test]
    async fn test_commit_keeps_tier_assigned_after_scan() {
        let store = InMemoryStore::with_records(vec![current("r1", "Role"), current("r2", "Other")]);
        let records = store.scan().await.unwrap();
        let (batch, _) = plan_backfill(&records, &ClassifierRules::default());
        assert_eq!(batch.len(), 2);

        store.put(tiered("r1", "Role", "enterprise")).unwrap();
        store.commit(batch).await.unwrap();

        assert_eq!(level(&store, "r1"), "enterprise");
        assert_eq!(store.get("r1").unwrap()["visibility"]["priority_score"], 7);
        assert_eq!(level(&store, "r2"), "free");
    }

    #[tokio::test]
    async fn test_rejected_batch_changes_nothing() {
        let store = InMemoryStore::with_records(twenty()).with_batch_limit(5);
        let err = migrate_all(&store, &ClassifierRules::default()).await.unwrap_err();
        assert!(matches!(err, TierError::StoreUnavailable { .. }));
        assert!(store.get("r00").unwrap()["visibility"].get("access_level").is_none());
        assert_eq!(store.commit_count(), 0);
    }

    #[tokio::test]
    async fn test_retry_after_transient_fault() {
        let store = InMemoryStore::with_records(twenty());
        let rules = ClassifierRules::default();
        store.fail_next_commit();
        assert!(migrate_all(&store, &rules).await.is_err());

        let report = migrate_all(&store, &rules).await.unwrap();
        assert_eq!(report.updated, 20);
        assert_eq!(level(&store, "r14"), "enterprise");
    }

    #[tokio::test]
    async fn test_dry_run_commits_nothing() {
        let store = InMemoryStore::with_records(twenty());
        let report = migrate_all_with(
            &store,
            &ClassifierRules::default(),
            MigrationOptions { dry_run: true },
        )
        .await
        .unwrap();
        assert!(report.dry_run);
        assert_eq!(report.updated, 20);
        assert_eq!(store.commit_count(), 0);
        assert!(store.get("r19").unwrap()["visibility"].get("access_level").is_none());
    }

    #[tokio::test]
    async fn test_empty_store() {
        let store = InMemoryStore::new();
        let report = migrate_all(&store, &ClassifierRules::default()).await.unwrap();
        assert_eq!((report.updated, report.skipped, report.total), (0, 0, 0));
        assert_eq!(store.commit_count(), 0);
    }

    #[test]
    fn test_expected_distribution() {
        assert_eq!(
            expected_distribution(88),
            TierCounts { free: 53, pro: 27, enterprise: 8 }
        );
        assert_eq!(expected_distribution(0), TierCounts::default());
        assert_eq!(expected_distribution(1), TierCounts { free: 1, pro: 1, enterprise: 0 });
    }
}
