//! Storage abstraction for the tier engine.
//!
//! The [`ResourceStore`] trait is the only seam between the core and a
//! concrete document store. It exposes two capabilities:
//!
//! | Method | Purpose |
//! |--------|---------|
//! | [`scan`](ResourceStore::scan) | Read the full collection in key order |
//! | [`commit`](ResourceStore::commit) | Apply an [`UpdateBatch`] all-or-nothing |
//!
//! Cross-document visibility during a commit is backend-dependent: a
//! concurrent reader sees each record either before or after its update,
//! but may see different records at different phases unless the backend
//! commits the batch in one transaction.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::classify::Classification;
use crate::error::Result;
use crate::models::{AccessTier, RawRecord};
use crate::normalize::is_truthy;

/// Field-level update to a record's `visibility` group.
///
/// `access_level` is written only when the record has no tier; the other
/// three fields only when they are absent or null. Every other field in
/// the document is preserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VisibilityPatch {
    pub access_level: AccessTier,
    pub status: &'static str,
    pub is_featured: bool,
    pub priority_score: u32,
}

impl VisibilityPatch {
    pub fn from_classification(c: &Classification) -> Self {
        Self {
            access_level: c.tier,
            status: "active",
            is_featured: c.is_featured,
            priority_score: c.priority_score,
        }
    }

    /// Write the patch into `doc`, creating `visibility` when it is absent
    /// or not an object.
    ///
    /// Returns `false` and leaves `doc` untouched when it already carries a
    /// tier, so a commit never overwrites one assigned after the scan.
    pub fn apply_to(&self, doc: &mut Value) -> bool {
        if has_tier(doc) {
            return false;
        }
        if !doc.is_object() {
            *doc = Value::Object(Map::new());
        }
        let Value::Object(root) = doc else {
            return false;
        };
        let visibility = root
            .entry("visibility")
            .or_insert_with(|| Value::Object(Map::new()));
        if !visibility.is_object() {
            *visibility = Value::Object(Map::new());
        }
        let Value::Object(v) = visibility else {
            return false;
        };
        v.insert(
            "access_level".to_string(),
            Value::String(self.access_level.as_str().to_string()),
        );
        set_if_unset(v, "status", Value::String(self.status.to_string()));
        set_if_unset(v, "is_featured", Value::Bool(self.is_featured));
        set_if_unset(v, "priority_score", Value::from(self.priority_score));
        true
    }
}

fn has_tier(doc: &Value) -> bool {
    doc.get("visibility")
        .and_then(|v| v.get("access_level"))
        .is_some_and(is_truthy)
}

fn set_if_unset(group: &mut Map<String, Value>, key: &str, value: Value) {
    match group.get(key) {
        Some(existing) if !existing.is_null() => {}
        _ => {
            group.insert(key.to_string(), value);
        }
    }
}

/// One staged write: the record id and its visibility patch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StagedUpdate {
    pub id: String,
    pub patch: VisibilityPatch,
}

/// Updates staged for a single atomic commit.
#[derive(Debug, Clone, Default)]
pub struct UpdateBatch {
    updates: Vec<StagedUpdate>,
}

impl UpdateBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(&mut self, id: impl Into<String>, patch: VisibilityPatch) {
        self.updates.push(StagedUpdate {
            id: id.into(),
            patch,
        });
    }

    pub fn len(&self) -> usize {
        self.updates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }

    pub fn updates(&self) -> &[StagedUpdate] {
        &self.updates
    }

    pub fn into_updates(self) -> Vec<StagedUpdate> {
        self.updates
    }
}

/// Abstract persistent, key-ordered document collection.
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Load every record, ordered by id.
    async fn scan(&self) -> Result<Vec<RawRecord>>;

    /// Apply every staged update, or none of them.
    ///
    /// Each patch is re-checked against the stored document: a record
    /// that gained a tier since the scan is left as it is.
    ///
    /// A rejected batch (size limit, missing record, transient fault)
    /// returns [`TierError::StoreUnavailable`](crate::error::TierError::StoreUnavailable)
    /// and leaves the collection unchanged.
    async fn commit(&self, batch: UpdateBatch) -> Result<()>;
}
