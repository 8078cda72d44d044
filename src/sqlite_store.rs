//! SQLite-backed [`ResourceStore`] implementation.
//!
//! Each record is one row of the `resources` table: the document id, the
//! document body as JSON text, and the time the row was last written.
//! A backfill batch is committed inside one transaction, so readers see
//! either none or all of it.

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use resource_tiers_core::models::RawRecord;
use resource_tiers_core::store::{ResourceStore, UpdateBatch};
use resource_tiers_core::{Result, TierError};

/// SQLite implementation of the [`ResourceStore`] trait.
pub struct SqliteStore {
    pool: SqlitePool,
    max_batch_writes: usize,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool, max_batch_writes: usize) -> Self {
        Self {
            pool,
            max_batch_writes,
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Insert or replace a record. Used by the loader; never by the backfill.
    pub async fn upsert(&self, record: &RawRecord) -> Result<()> {
        self.upsert_all(std::slice::from_ref(record)).await
    }

    /// Insert or replace every record in one transaction. A failure on any
    /// row leaves the table as it was.
    pub async fn upsert_all(&self, records: &[RawRecord]) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| TierError::store("failed to begin transaction", e))?;

        for record in records {
            let body = serde_json::to_string(&record.doc)
                .map_err(|e| TierError::MalformedInput(format!("{}: {}", record.id, e)))?;
            sqlx::query(
                r#"
                INSERT INTO resources (id, doc_json, updated_at) VALUES (?, ?, ?)
                ON CONFLICT(id) DO UPDATE SET
                    doc_json = excluded.doc_json,
                    updated_at = excluded.updated_at
                "#,
            )
            .bind(&record.id)
            .bind(&body)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(|e| TierError::store("failed to write resource", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| TierError::store("failed to commit import", e))?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn parse_doc(id: &str, body: &str) -> serde_json::Value {
    serde_json::from_str(body).unwrap_or_else(|e| {
        tracing::warn!(id, error = %e, "stored document is not valid JSON");
        serde_json::Value::Null
    })
}

#[async_trait]
impl ResourceStore for SqliteStore {
    async fn scan(&self) -> Result<Vec<RawRecord>> {
        let rows = sqlx::query("SELECT id, doc_json FROM resources ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| TierError::store("failed to scan resources", e))?;

        Ok(rows
            .iter()
            .map(|row| {
                let id: String = row.get("id");
                let body: String = row.get("doc_json");
                let doc = parse_doc(&id, &body);
                RawRecord::new(id, doc)
            })
            .collect())
    }

    async fn commit(&self, batch: UpdateBatch) -> Result<()> {
        if batch.len() > self.max_batch_writes {
            return Err(TierError::rejected(format!(
                "batch of {} writes exceeds limit of {}",
                batch.len(),
                self.max_batch_writes
            )));
        }

        let now = chrono::Utc::now().timestamp();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| TierError::store("failed to begin transaction", e))?;

        for update in batch.updates() {
            let body: Option<String> =
                sqlx::query_scalar("SELECT doc_json FROM resources WHERE id = ?")
                    .bind(&update.id)
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(|e| TierError::store("failed to read resource", e))?;

            // Dropping `tx` on any early return rolls the batch back.
            let body = body.ok_or_else(|| {
                TierError::rejected(format!("no record with id '{}'", update.id))
            })?;
            let mut doc = parse_doc(&update.id, &body);
            if !update.patch.apply_to(&mut doc) {
                tracing::debug!(id = %update.id, "record already tiered, skipping");
                continue;
            }
            let new_body = serde_json::to_string(&doc)
                .map_err(|e| TierError::MalformedInput(format!("{}: {}", update.id, e)))?;

            sqlx::query("UPDATE resources SET doc_json = ?, updated_at = ? WHERE id = ?")
                .bind(&new_body)
                .bind(now)
                .bind(&update.id)
                .execute(&mut *tx)
                .await
                .map_err(|e| TierError::store("failed to update resource", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| TierError::store("failed to commit batch", e))?;
        Ok(())
    }
}
