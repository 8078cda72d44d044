//! Configuration parsing and validation.
//!
//! Resource Tiers is configured via a TOML file (default
//! `./config/rtier.toml`):
//!
//! ```toml
//! [db]
//! path = "./data/resources.sqlite"
//! max_batch_writes = 500
//!
//! [classifier]
//! seniority_keywords = ["senior", "lead"]
//!
//! [plans.free]
//! job_cap = 10
//! course_cap = 15
//! tool_cap = 15
//! max_tier = "free"
//!
//! [plans.enterprise]
//! job_cap = -1
//! course_cap = -1
//! tool_cap = -1
//! max_tier = "enterprise"
//! ```
//!
//! Omitted `[classifier]` lists fall back to the built-in tables; an
//! omitted `[plans]` section yields the stock free/pro/enterprise plans.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use resource_tiers_core::classify::{
    ClassifierRules, DEFAULT_QUALITY_COMPANIES, DEFAULT_REMOTE_MARKERS, DEFAULT_SENIORITY_KEYWORDS,
};
use resource_tiers_core::entitlement::{PlanEntitlement, PlanEntitlements};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub plans: BTreeMap<String, PlanEntitlement>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
    /// Largest batch a single commit may carry.
    #[serde(default = "default_max_batch_writes")]
    pub max_batch_writes: usize,
}

fn default_max_batch_writes() -> usize {
    500
}

#[derive(Debug, Deserialize, Clone)]
pub struct ClassifierConfig {
    #[serde(default = "default_seniority_keywords")]
    pub seniority_keywords: Vec<String>,
    #[serde(default = "default_quality_companies")]
    pub quality_companies: Vec<String>,
    #[serde(default = "default_remote_markers")]
    pub remote_markers: Vec<String>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            seniority_keywords: default_seniority_keywords(),
            quality_companies: default_quality_companies(),
            remote_markers: default_remote_markers(),
        }
    }
}

fn default_seniority_keywords() -> Vec<String> {
    DEFAULT_SENIORITY_KEYWORDS.iter().map(|s| s.to_string()).collect()
}
fn default_quality_companies() -> Vec<String> {
    DEFAULT_QUALITY_COMPANIES.iter().map(|s| s.to_string()).collect()
}
fn default_remote_markers() -> Vec<String> {
    DEFAULT_REMOTE_MARKERS.iter().map(|s| s.to_string()).collect()
}

impl Config {
    /// Config used when no file is available: a database under `./data`
    /// and every built-in table.
    pub fn minimal() -> Self {
        Self {
            db: DbConfig {
                path: PathBuf::from("./data/resources.sqlite"),
                max_batch_writes: default_max_batch_writes(),
            },
            classifier: ClassifierConfig::default(),
            plans: BTreeMap::new(),
        }
    }

    pub fn classifier_rules(&self) -> ClassifierRules {
        ClassifierRules::new(
            self.classifier.seniority_keywords.clone(),
            self.classifier.quality_companies.clone(),
            self.classifier.remote_markers.clone(),
        )
    }

    /// The plan table; the stock plans when none are configured.
    pub fn entitlements(&self) -> Result<PlanEntitlements> {
        if self.plans.is_empty() {
            return Ok(PlanEntitlements::default());
        }
        Ok(PlanEntitlements::new(self.plans.clone())?)
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.db.max_batch_writes == 0 {
        bail!("db.max_batch_writes must be > 0");
    }

    let c = &config.classifier;
    for (name, list) in [
        ("seniority_keywords", &c.seniority_keywords),
        ("quality_companies", &c.quality_companies),
        ("remote_markers", &c.remote_markers),
    ] {
        if list.iter().any(|s| s.trim().is_empty()) {
            bail!("classifier.{} must not contain empty entries", name);
        }
    }

    for name in config.plans.keys() {
        if name.trim().is_empty() {
            bail!("plan names must not be empty");
        }
    }
    config.entitlements().context("Invalid [plans] section")?;

    Ok(config)
}
