//! Record loading.
//!
//! Imports raw documents from a JSON file into the store: either a JSON
//! array of objects or one object per line. Each object's `id` field (string
//! or number) becomes the record id and is removed from the stored body;
//! objects without one get a fresh UUID. Bodies are stored as-is, in
//! whichever shape they arrive.
//!
//! With `--strict`, every record must pass
//! [`normalize_strict`](resource_tiers_core::normalize::normalize_strict)
//! before anything is written.

use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::path::Path;
use uuid::Uuid;

use resource_tiers_core::models::{RawRecord, RecordShape};
use resource_tiers_core::normalize::{normalize, normalize_strict};

use crate::config::Config;
use crate::db;
use crate::sqlite_store::SqliteStore;

/// Parse a JSON array or JSON-lines document into raw records.
pub fn parse_records(content: &str) -> Result<Vec<RawRecord>> {
    let trimmed = content.trim_start();
    let values: Vec<Value> = if trimmed.starts_with('[') {
        serde_json::from_str(trimmed).context("Failed to parse JSON array")?
    } else {
        trimmed
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(i, line)| {
                serde_json::from_str(line)
                    .with_context(|| format!("Failed to parse line {}", i + 1))
            })
            .collect::<Result<_>>()?
    };

    values
        .into_iter()
        .enumerate()
        .map(|(i, value)| into_record(i, value))
        .collect()
}

fn into_record(index: usize, value: Value) -> Result<RawRecord> {
    let Value::Object(mut obj) = value else {
        bail!("record {} is not a JSON object", index + 1);
    };
    let id = match obj.remove("id") {
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        None | Some(Value::Null) => Uuid::new_v4().to_string(),
        Some(other) => bail!("record {} has an unusable id: {}", index + 1, other),
    };
    Ok(RawRecord::new(id, Value::Object(obj)))
}

pub async fn run_load(config: &Config, path: &Path, strict: bool, dry_run: bool) -> Result<()> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let records = parse_records(&content)?;

    if strict {
        for r in &records {
            normalize_strict(r)?;
        }
    }

    let (legacy, current) = records.iter().map(normalize).fold((0, 0), |(l, c), r| match r.shape {
        RecordShape::Legacy => (l + 1, c),
        RecordShape::Current => (l, c + 1),
    });

    if dry_run {
        println!("load {} (dry-run)", path.display());
        println!("  records found: {}", records.len());
        println!("  legacy: {}", legacy);
        println!("  current: {}", current);
        return Ok(());
    }

    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool, config.db.max_batch_writes);
    store.upsert_all(&records).await?;
    tracing::info!(records = records.len(), path = %path.display(), "loaded records");

    println!("load {}", path.display());
    println!("  upserted records: {}", records.len());
    println!("  legacy: {}", legacy);
    println!("  current: {}", current);
    println!("ok");

    store.close().await;
    Ok(())
}
