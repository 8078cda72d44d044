//! Plan entitlement table.
//!
//! Maps a subscription plan name to per-type result caps and, for the
//! optional tier-gating stage, the highest tier the plan may see. The table
//! is built once at startup and shared read-only.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TierError};
use crate::models::{AccessTier, ResourceType};

/// Result cap for one resource type. Serialized as an integer where `-1`
/// means unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum Cap {
    Limit(usize),
    Unlimited,
}

impl Cap {
    pub fn allows(&self, len: usize) -> bool {
        match self {
            Cap::Limit(n) => len <= *n,
            Cap::Unlimited => true,
        }
    }

    /// The cap as a count, saturating to `usize::MAX` when unlimited.
    pub fn as_count(&self) -> usize {
        match self {
            Cap::Limit(n) => *n,
            Cap::Unlimited => usize::MAX,
        }
    }
}

impl TryFrom<i64> for Cap {
    type Error = String;

    fn try_from(v: i64) -> std::result::Result<Self, Self::Error> {
        match v {
            -1 => Ok(Cap::Unlimited),
            n if n >= 0 => usize::try_from(n)
                .map(Cap::Limit)
                .map_err(|_| format!("cap {} is out of range", n)),
            n => Err(format!("cap must be >= -1, got {}", n)),
        }
    }
}

impl From<Cap> for i64 {
    fn from(c: Cap) -> i64 {
        match c {
            Cap::Limit(n) => i64::try_from(n).unwrap_or(i64::MAX),
            Cap::Unlimited => -1,
        }
    }
}

fn default_max_tier() -> AccessTier {
    AccessTier::Free
}

/// Caps for a single plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanEntitlement {
    pub job_cap: Cap,
    pub course_cap: Cap,
    pub tool_cap: Cap,
    /// Highest tier visible when the tier-gating stage is enabled.
    #[serde(default = "default_max_tier")]
    pub max_tier: AccessTier,
}

impl PlanEntitlement {
    pub fn cap_for(&self, t: ResourceType) -> Cap {
        match t {
            ResourceType::Job => self.job_cap,
            ResourceType::Course => self.course_cap,
            ResourceType::Tool => self.tool_cap,
        }
    }

    /// Total records this plan may see; used to rank plans by restrictiveness.
    fn breadth(&self) -> usize {
        ResourceType::ALL
            .iter()
            .fold(0usize, |acc, t| acc.saturating_add(self.cap_for(*t).as_count()))
    }
}

/// Immutable plan name → entitlement mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanEntitlements {
    plans: BTreeMap<String, PlanEntitlement>,
}

impl Default for PlanEntitlements {
    /// The stock subscription plans.
    fn default() -> Self {
        let mut plans = BTreeMap::new();
        plans.insert(
            "free".to_string(),
            PlanEntitlement {
                job_cap: Cap::Limit(10),
                course_cap: Cap::Limit(15),
                tool_cap: Cap::Limit(15),
                max_tier: AccessTier::Free,
            },
        );
        plans.insert(
            "pro".to_string(),
            PlanEntitlement {
                job_cap: Cap::Limit(80),
                course_cap: Cap::Limit(60),
                tool_cap: Cap::Limit(60),
                max_tier: AccessTier::Pro,
            },
        );
        plans.insert(
            "enterprise".to_string(),
            PlanEntitlement {
                job_cap: Cap::Unlimited,
                course_cap: Cap::Unlimited,
                tool_cap: Cap::Unlimited,
                max_tier: AccessTier::Enterprise,
            },
        );
        Self { plans }
    }
}

impl PlanEntitlements {
    /// Build a table from explicit entries. At least one plan is required.
    pub fn new(plans: BTreeMap<String, PlanEntitlement>) -> Result<Self> {
        if plans.is_empty() {
            return Err(TierError::MalformedInput(
                "at least one plan must be configured".to_string(),
            ));
        }
        let mut normalized = BTreeMap::new();
        for (name, e) in plans {
            let key = name.trim().to_lowercase();
            if normalized.insert(key.clone(), e).is_some() {
                return Err(TierError::MalformedInput(format!(
                    "plan '{}' is configured more than once",
                    key
                )));
            }
        }
        Ok(Self { plans: normalized })
    }

    pub fn get(&self, plan: &str) -> Result<&PlanEntitlement> {
        self.plans
            .get(&plan.trim().to_lowercase())
            .ok_or_else(|| TierError::UnknownPlan(plan.to_string()))
    }

    /// The plan with the smallest total allowance (ties broken by name).
    pub fn most_restrictive(&self) -> (&str, &PlanEntitlement) {
        self.plans
            .iter()
            .min_by(|(an, a), (bn, b)| a.breadth().cmp(&b.breadth()).then_with(|| an.cmp(bn)))
            .map(|(n, e)| (n.as_str(), e))
            .unwrap_or(("", &FALLBACK))
    }

    /// Resolve `plan`, substituting the most restrictive plan when unknown.
    ///
    /// Returns the resolved name, its entitlement, and whether a
    /// substitution happened.
    pub fn resolve(&self, plan: &str) -> (&str, &PlanEntitlement, bool) {
        let key = plan.trim().to_lowercase();
        match self.plans.get_key_value(&key) {
            Some((name, e)) => (name.as_str(), e, false),
            None => {
                let (name, e) = self.most_restrictive();
                (name, e, true)
            }
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.plans.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PlanEntitlement)> {
        self.plans.iter().map(|(n, e)| (n.as_str(), e))
    }
}

/// Used only if the table were empty, which [`PlanEntitlements::new`] forbids.
static FALLBACK: PlanEntitlement = PlanEntitlement {
    job_cap: Cap::Limit(0),
    course_cap: Cap::Limit(0),
    tool_cap: Cap::Limit(0),
    max_tier: AccessTier::Free,
};
