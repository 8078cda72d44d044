//! Read-only inventory of the collection: how many records of each shape,
//! status, type, and tier are stored.

use serde::Serialize;

use crate::backfill::TierCounts;
use crate::error::Result;
use crate::models::{NormalizedResource, RecordShape, ResourceStatus, TierAssignment};
use crate::normalize::normalize;
use crate::query::TypeCounts;
use crate::store::ResourceStore;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ShapeCounts {
    pub legacy: usize,
    pub current: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub active: usize,
    pub inactive: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Inventory {
    pub total: usize,
    pub shapes: ShapeCounts,
    pub statuses: StatusCounts,
    pub types: TypeCounts,
    pub tiers: TierCounts,
    /// CURRENT records still waiting for the backfill.
    pub unassigned: usize,
}

pub fn inventory(resources: &[NormalizedResource]) -> Inventory {
    let mut inv = Inventory {
        total: resources.len(),
        ..Default::default()
    };
    for r in resources {
        match r.shape {
            RecordShape::Legacy => inv.shapes.legacy += 1,
            RecordShape::Current => inv.shapes.current += 1,
        }
        match r.status {
            ResourceStatus::Active => inv.statuses.active += 1,
            ResourceStatus::Inactive => inv.statuses.inactive += 1,
        }
        inv.types.add(r.resource_type);
        match r.access_tier {
            TierAssignment::Assigned(t) => inv.tiers.add(t),
            TierAssignment::Unassigned => inv.unassigned += 1,
        }
    }
    inv
}

/// Scan the store and summarize it.
pub async fn collect_inventory<S>(store: &S) -> Result<Inventory>
where
    S: ResourceStore + ?Sized,
{
    let records = store.scan().await?;
    let resources: Vec<NormalizedResource> = records.iter().map(normalize).collect();
    Ok(inventory(&resources))
}
