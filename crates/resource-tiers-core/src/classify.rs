//! Tier classification for records that carry no stored tier.
//!
//! # Algorithm
//!
//! Records are ranked by title (case-insensitive, ties by id) and the rank
//! is turned into a percentile `rank / total × 100`:
//!
//! | Percentile | Tier |
//! |------------|------|
//! | `<= 60` | `free` |
//! | `(60, 90]` | `pro` if the content signals quality, else `free` |
//! | `> 90` | `enterprise` |
//!
//! Quality signals are case-insensitive substring matches: a seniority
//! keyword in the title, a well-known employer in the company, or a
//! remote marker in the location.
//!
//! Band edges are compared in integer arithmetic (`rank × 100` against
//! `bound × total`) so a percentile of exactly 60 or 90 lands in the lower
//! band regardless of floating-point rounding.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::models::{AccessTier, NormalizedResource};

/// Upper edge (inclusive) of the `free` band.
pub const FREE_BAND_MAX: u64 = 60;
/// Upper edge (inclusive) of the `pro` band.
pub const PRO_BAND_MAX: u64 = 90;

pub const DEFAULT_SENIORITY_KEYWORDS: [&str; 10] = [
    "senior",
    "lead",
    "manager",
    "director",
    "architect",
    "expert",
    "advanced",
    "premium",
    "certified",
    "principal",
];

pub const DEFAULT_QUALITY_COMPANIES: [&str; 10] = [
    "google",
    "microsoft",
    "apple",
    "amazon",
    "meta",
    "netflix",
    "uber",
    "airbnb",
    "stripe",
    "shopify",
];

pub const DEFAULT_REMOTE_MARKERS: [&str; 2] = ["remote", "worldwide"];

/// Keyword tables consulted inside the `pro` band.
///
/// Loaded once at startup and passed in; entries are stored lowercased.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RulesTable")]
pub struct ClassifierRules {
    pub seniority_keywords: Vec<String>,
    pub quality_companies: Vec<String>,
    pub remote_markers: Vec<String>,
}

/// Deserialized form; routed through [`ClassifierRules::new`].
#[derive(Deserialize)]
struct RulesTable {
    seniority_keywords: Vec<String>,
    quality_companies: Vec<String>,
    remote_markers: Vec<String>,
}

impl From<RulesTable> for ClassifierRules {
    fn from(t: RulesTable) -> Self {
        Self::new(t.seniority_keywords, t.quality_companies, t.remote_markers)
    }
}

impl Default for ClassifierRules {
    fn default() -> Self {
        Self::new(
            DEFAULT_SENIORITY_KEYWORDS.iter().map(|s| s.to_string()).collect(),
            DEFAULT_QUALITY_COMPANIES.iter().map(|s| s.to_string()).collect(),
            DEFAULT_REMOTE_MARKERS.iter().map(|s| s.to_string()).collect(),
        )
    }
}

impl ClassifierRules {
    pub fn new(
        seniority_keywords: Vec<String>,
        quality_companies: Vec<String>,
        remote_markers: Vec<String>,
    ) -> Self {
        let clean = |v: Vec<String>| -> Vec<String> {
            v.into_iter()
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect()
        };
        Self {
            seniority_keywords: clean(seniority_keywords),
            quality_companies: clean(quality_companies),
            remote_markers: clean(remote_markers),
        }
    }

    /// True if any quality signal fires for this record.
    pub fn has_quality_signal(&self, resource: &NormalizedResource) -> bool {
        contains_any(&resource.title, &self.seniority_keywords)
            || contains_any(&resource.company, &self.quality_companies)
            || contains_any(&resource.location, &self.remote_markers)
    }
}

fn contains_any(haystack: &str, needles: &[String]) -> bool {
    if haystack.is_empty() {
        return false;
    }
    let lower = haystack.to_lowercase();
    needles.iter().any(|n| lower.contains(n.as_str()))
}

/// Tier plus the derived visibility flags written by the backfill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub tier: AccessTier,
    pub is_featured: bool,
    pub priority_score: u32,
}

impl Classification {
    pub fn for_tier(tier: AccessTier) -> Self {
        Self {
            tier,
            is_featured: tier == AccessTier::Enterprise,
            priority_score: priority_score(tier),
        }
    }
}

pub fn priority_score(tier: AccessTier) -> u32 {
    match tier {
        AccessTier::Enterprise => 100,
        AccessTier::Pro => 80,
        AccessTier::Free => 60,
    }
}

/// Percentile of `rank` within `total`, for reporting.
pub fn percentile(rank: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (rank as f64 / total as f64) * 100.0
}

/// `rank / total × 100 <= bound`, evaluated exactly.
fn within(rank: usize, total: usize, bound: u64) -> bool {
    (rank as u128) * 100 <= (bound as u128) * (total as u128)
}

/// Assign a tier to `resource` given its position in the classification
/// ordering. Pure; an empty set (`total == 0`) is treated as percentile 0.
pub fn classify(
    resource: &NormalizedResource,
    rank: usize,
    total: usize,
    rules: &ClassifierRules,
) -> Classification {
    let tier = if total == 0 || within(rank, total, FREE_BAND_MAX) {
        AccessTier::Free
    } else if within(rank, total, PRO_BAND_MAX) {
        if rules.has_quality_signal(resource) {
            AccessTier::Pro
        } else {
            AccessTier::Free
        }
    } else {
        AccessTier::Enterprise
    };
    Classification::for_tier(tier)
}

/// Ordering used to rank records for classification: title ascending,
/// case-insensitive, ties broken by id.
pub fn title_order(a: &NormalizedResource, b: &NormalizedResource) -> Ordering {
    a.title
        .to_lowercase()
        .cmp(&b.title.to_lowercase())
        .then_with(|| a.id.cmp(&b.id))
}

/// Sort in place into classification order.
pub fn sort_for_classification(resources: &mut [NormalizedResource]) {
    resources.sort_by(title_order);
}

/// Classify an entire set: sorts it, then assigns each record its tier from
/// its rank within that set. Returned in classification order.
pub fn classify_set(
    mut resources: Vec<NormalizedResource>,
    rules: &ClassifierRules,
) -> Vec<(NormalizedResource, Classification)> {
    sort_for_classification(&mut resources);
    let total = resources.len();
    resources
        .into_iter()
        .enumerate()
        .map(|(rank, r)| {
            let c = classify(&r, rank, total, rules);
            (r, c)
        })
        .collect()
}
