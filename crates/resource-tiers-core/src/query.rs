//! Plan-gated resource listing.
//!
//! # Pipeline
//!
//! 1. Scan and normalize every record.
//! 2. Drop records whose status is not `active`.
//! 3. Capability stage: drop records the caller may not see
//!    ([`CapabilityCheck`]). The default, [`AllowAll`], keeps everything;
//!    only count caps apply.
//! 4. Group by type.
//! 5. Order each group: records with `created_at` first, newest first;
//!    then records without it by title (case-insensitive); ties by id.
//! 6. Truncate each group to the plan's cap.
//!
//! An unknown plan is not an error: the most restrictive configured plan is
//! used instead and the substitution is recorded on the [`PlanListing`].
//! The whole operation is read-only and may run concurrently.

use std::cmp::Ordering;

use serde::Serialize;

use crate::entitlement::{PlanEntitlement, PlanEntitlements};
use crate::error::Result;
use crate::models::{AccessTier, NormalizedResource, ResourceType};
use crate::normalize::normalize;
use crate::store::ResourceStore;

/// Filter stage applied before cap truncation.
pub trait CapabilityCheck: Send + Sync {
    fn allows(&self, resource: &NormalizedResource) -> bool;
}

/// Keeps every record.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl CapabilityCheck for AllowAll {
    fn allows(&self, _resource: &NormalizedResource) -> bool {
        true
    }
}

/// Keeps records whose effective tier is at or below a ceiling.
#[derive(Debug, Clone, Copy)]
pub struct TierCeiling(pub AccessTier);

impl TierCeiling {
    pub fn for_plan(entitlement: &PlanEntitlement) -> Self {
        TierCeiling(entitlement.max_tier)
    }
}

impl CapabilityCheck for TierCeiling {
    fn allows(&self, resource: &NormalizedResource) -> bool {
        resource.effective_tier() <= self.0
    }
}

/// Per-type record counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TypeCounts {
    pub jobs: usize,
    pub courses: usize,
    pub tools: usize,
}

impl TypeCounts {
    pub fn get(&self, t: ResourceType) -> usize {
        match t {
            ResourceType::Job => self.jobs,
            ResourceType::Course => self.courses,
            ResourceType::Tool => self.tools,
        }
    }

    fn slot(&mut self, t: ResourceType) -> &mut usize {
        match t {
            ResourceType::Job => &mut self.jobs,
            ResourceType::Course => &mut self.courses,
            ResourceType::Tool => &mut self.tools,
        }
    }

    pub fn add(&mut self, t: ResourceType) {
        *self.slot(t) += 1;
    }

    pub fn total(&self) -> usize {
        self.jobs + self.courses + self.tools
    }
}

/// Capped, ordered listing for one plan.
#[derive(Debug, Clone, Serialize)]
pub struct PlanListing {
    /// Plan the caller asked for.
    pub requested_plan: String,
    /// Plan whose caps were applied.
    pub plan: String,
    /// True when `requested_plan` was unknown and `plan` was substituted.
    pub substituted: bool,
    pub jobs: Vec<NormalizedResource>,
    pub courses: Vec<NormalizedResource>,
    pub tools: Vec<NormalizedResource>,
    /// Per-type counts before truncation.
    pub available: TypeCounts,
}

impl PlanListing {
    pub fn group(&self, t: ResourceType) -> &[NormalizedResource] {
        match t {
            ResourceType::Job => &self.jobs,
            ResourceType::Course => &self.courses,
            ResourceType::Tool => &self.tools,
        }
    }

    /// True when the cap hid some records of this type.
    pub fn has_more(&self, t: ResourceType) -> bool {
        self.available.get(t) > self.group(t).len()
    }

    pub fn shown(&self) -> TypeCounts {
        TypeCounts {
            jobs: self.jobs.len(),
            courses: self.courses.len(),
            tools: self.tools.len(),
        }
    }
}

/// Listing order: dated records newest first, then undated by title;
/// ties by id.
pub fn listing_order(a: &NormalizedResource, b: &NormalizedResource) -> Ordering {
    let by_date = match (a.created_at, b.created_at) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
    };
    by_date.then_with(|| a.id.cmp(&b.id))
}

/// Apply the listing pipeline to already-normalized records.
pub fn build_listing(
    resources: Vec<NormalizedResource>,
    entitlements: &PlanEntitlements,
    plan: &str,
    check: &dyn CapabilityCheck,
) -> PlanListing {
    let (resolved, entitlement, substituted) = entitlements.resolve(plan);
    if substituted {
        tracing::warn!(requested = plan, using = resolved, "unknown plan, using most restrictive");
    }

    let mut groups: [Vec<NormalizedResource>; 3] = [Vec::new(), Vec::new(), Vec::new()];
    for r in resources
        .into_iter()
        .filter(NormalizedResource::is_active)
        .filter(|r| check.allows(r))
    {
        let idx = match r.resource_type {
            ResourceType::Job => 0,
            ResourceType::Course => 1,
            ResourceType::Tool => 2,
        };
        groups[idx].push(r);
    }

    let mut available = TypeCounts::default();
    for (group, t) in groups.iter_mut().zip(ResourceType::ALL) {
        *available.slot(t) = group.len();
        group.sort_by(listing_order);
        let cap = entitlement.cap_for(t).as_count();
        group.truncate(cap);
    }

    let [jobs, courses, tools] = groups;
    PlanListing {
        requested_plan: plan.to_string(),
        plan: resolved.to_string(),
        substituted,
        jobs,
        courses,
        tools,
        available,
    }
}

/// List active records for `plan`, enforcing only per-type count caps.
pub async fn list_for_plan<S>(
    store: &S,
    entitlements: &PlanEntitlements,
    plan: &str,
) -> Result<PlanListing>
where
    S: ResourceStore + ?Sized,
{
    list_for_plan_with(store, entitlements, plan, &AllowAll).await
}

/// [`list_for_plan`] with an extra capability stage ahead of truncation.
///
/// Scan failures are returned as-is; no partial listing is produced.
pub async fn list_for_plan_with<S>(
    store: &S,
    entitlements: &PlanEntitlements,
    plan: &str,
    check: &dyn CapabilityCheck,
) -> Result<PlanListing>
where
    S: ResourceStore + ?Sized,
{
    let records = store.scan().await?;
    let resources = records.iter().map(normalize).collect();
    let listing = build_listing(resources, entitlements, plan, check);
    tracing::debug!(
        plan = %listing.plan,
        jobs = listing.jobs.len(),
        courses = listing.courses.len(),
        tools = listing.tools.len(),
        "built plan listing"
    );
    Ok(listing)
}
