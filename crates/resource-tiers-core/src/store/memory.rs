//! In-memory [`ResourceStore`] implementation for tests and embedding.
//!
//! Records live in a `BTreeMap` behind `std::sync::RwLock`, so scans come
//! back in key order. Commits are applied to a copy of the map and swapped
//! in only when every staged update succeeds.
//!
//! A batch size limit and one-shot fault injection let callers exercise the
//! rejection paths of the backfill and query services.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{Result, TierError};
use crate::models::RawRecord;

use super::{ResourceStore, UpdateBatch};

/// In-memory, key-ordered document collection.
pub struct InMemoryStore {
    docs: RwLock<BTreeMap<String, Value>>,
    max_batch: Option<usize>,
    fail_next_commit: AtomicBool,
    fail_scans: AtomicBool,
    commits: AtomicUsize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            docs: RwLock::new(BTreeMap::new()),
            max_batch: None,
            fail_next_commit: AtomicBool::new(false),
            fail_scans: AtomicBool::new(false),
            commits: AtomicUsize::new(0),
        }
    }

    pub fn with_records(records: impl IntoIterator<Item = RawRecord>) -> Self {
        let store = Self::new();
        if let Ok(mut docs) = store.docs.write() {
            for r in records {
                docs.insert(r.id, r.doc);
            }
        }
        store
    }

    /// Reject any batch larger than `max` updates.
    pub fn with_batch_limit(mut self, max: usize) -> Self {
        self.max_batch = Some(max);
        self
    }

    /// Make the next [`commit`](ResourceStore::commit) fail with a transient fault.
    pub fn fail_next_commit(&self) {
        self.fail_next_commit.store(true, Ordering::SeqCst);
    }

    /// Make every subsequent scan fail (or succeed again).
    pub fn set_scan_failure(&self, fail: bool) {
        self.fail_scans.store(fail, Ordering::SeqCst);
    }

    /// Insert or replace a record.
    pub fn put(&self, record: RawRecord) -> Result<()> {
        let mut docs = self
            .docs
            .write()
            .map_err(|_| TierError::rejected("in-memory store lock poisoned"))?;
        docs.insert(record.id, record.doc);
        Ok(())
    }

    /// Fetch a record's document by id.
    pub fn get(&self, id: &str) -> Option<Value> {
        self.docs.read().ok().and_then(|d| d.get(id).cloned())
    }

    pub fn len(&self) -> usize {
        self.docs.read().map(|d| d.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of successful commits so far.
    pub fn commit_count(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResourceStore for InMemoryStore {
    async fn scan(&self) -> Result<Vec<RawRecord>> {
        if self.fail_scans.load(Ordering::SeqCst) {
            return Err(TierError::rejected("scan failed: store unreachable"));
        }
        let docs = self
            .docs
            .read()
            .map_err(|_| TierError::rejected("in-memory store lock poisoned"))?;
        Ok(docs
            .iter()
            .map(|(id, doc)| RawRecord::new(id.clone(), doc.clone()))
            .collect())
    }

    async fn commit(&self, batch: UpdateBatch) -> Result<()> {
        if self.fail_next_commit.swap(false, Ordering::SeqCst) {
            return Err(TierError::rejected("commit failed: transient fault"));
        }
        if let Some(max) = self.max_batch {
            if batch.len() > max {
                return Err(TierError::rejected(format!(
                    "batch of {} writes exceeds limit of {}",
                    batch.len(),
                    max
                )));
            }
        }

        let mut docs = self
            .docs
            .write()
            .map_err(|_| TierError::rejected("in-memory store lock poisoned"))?;
        let mut staged = docs.clone();
        for update in batch.updates() {
            let doc = staged.get_mut(&update.id).ok_or_else(|| {
                TierError::rejected(format!("no record with id '{}'", update.id))
            })?;
            if !update.patch.apply_to(doc) {
                tracing::debug!(id = %update.id, "record already tiered, skipping");
            }
        }
        *docs = staged;
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
