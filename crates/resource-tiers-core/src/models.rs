//! Core data models for the tier engine.
//!
//! [`RawRecord`] is a document exactly as the store holds it. Every other
//! component works on [`NormalizedResource`], the canonical read-only view
//! produced by [`crate::normalize::normalize`].

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored document: an opaque, stable identifier plus its JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub id: String,
    pub doc: serde_json::Value,
}

impl RawRecord {
    pub fn new(id: impl Into<String>, doc: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            doc,
        }
    }
}

/// Storage layout of a record, detected structurally by the normalizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordShape {
    /// Flat fields: `title`, `type`, `company`, `location`, `status`.
    Legacy,
    /// Nested `metadata` / `content` / `visibility` groups.
    Current,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Job,
    Course,
    Tool,
}

impl ResourceType {
    pub const ALL: [ResourceType; 3] = [ResourceType::Job, ResourceType::Course, ResourceType::Tool];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Job => "job",
            ResourceType::Course => "course",
            ResourceType::Tool => "tool",
        }
    }
}

impl FromStr for ResourceType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "job" => Ok(ResourceType::Job),
            "course" => Ok(ResourceType::Course),
            "tool" => Ok(ResourceType::Tool),
            _ => Err(()),
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceStatus {
    Active,
    Inactive,
}

impl ResourceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceStatus::Active => "active",
            ResourceStatus::Inactive => "inactive",
        }
    }
}

impl FromStr for ResourceStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(ResourceStatus::Active),
            "inactive" => Ok(ResourceStatus::Inactive),
            _ => Err(()),
        }
    }
}

/// Access tier. Ordered from least to most privileged, so a capability
/// ceiling can be expressed as `tier <= ceiling`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessTier {
    Free,
    Pro,
    Enterprise,
}

impl AccessTier {
    pub const ALL: [AccessTier; 3] = [AccessTier::Free, AccessTier::Pro, AccessTier::Enterprise];

    pub fn as_str(&self) -> &'static str {
        match self {
            AccessTier::Free => "free",
            AccessTier::Pro => "pro",
            AccessTier::Enterprise => "enterprise",
        }
    }
}

impl FromStr for AccessTier {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "free" => Ok(AccessTier::Free),
            "pro" => Ok(AccessTier::Pro),
            "enterprise" => Ok(AccessTier::Enterprise),
            _ => Err(()),
        }
    }
}

impl fmt::Display for AccessTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tier state of a normalized record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase", tag = "state", content = "tier")]
pub enum TierAssignment {
    /// An `access_level` is stored (or implied, for legacy records).
    Assigned(AccessTier),
    /// A CURRENT record with no `access_level`; eligible for backfill.
    Unassigned,
}

impl TierAssignment {
    pub fn is_assigned(&self) -> bool {
        matches!(self, TierAssignment::Assigned(_))
    }

    pub fn tier(&self) -> Option<AccessTier> {
        match self {
            TierAssignment::Assigned(t) => Some(*t),
            TierAssignment::Unassigned => None,
        }
    }
}

/// Canonical in-memory view of a stored record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedResource {
    pub id: String,
    /// Never empty.
    pub title: String,
    #[serde(rename = "type")]
    pub resource_type: ResourceType,
    pub company: String,
    pub location: String,
    pub status: ResourceStatus,
    pub access_tier: TierAssignment,
    pub created_at: Option<DateTime<Utc>>,
    pub shape: RecordShape,
}

impl NormalizedResource {
    pub fn is_active(&self) -> bool {
        self.status == ResourceStatus::Active
    }

    /// Tier used for visibility decisions. Unassigned records are treated
    /// as `free` until the backfill runs.
    pub fn effective_tier(&self) -> AccessTier {
        self.access_tier.tier().unwrap_or(AccessTier::Free)
    }
}
