//! # Resource Tiers Core
//!
//! Storage-agnostic logic for Resource Tiers: normalization of the two
//! stored record shapes, tier classification, the tier backfill, plan
//! entitlements, and the plan-gated listing.
//!
//! This crate contains no tokio, sqlx, or filesystem I/O. Hosts supply a
//! [`store::ResourceStore`] implementation and the static tables
//! ([`classify::ClassifierRules`], [`entitlement::PlanEntitlements`]).
//!
//! ```text
//! raw records ─▶ normalize ─┬─▶ classify ─▶ backfill ─▶ store.commit
//!                           └─▶ query (caps from entitlements)
//! ```

pub mod backfill;
pub mod classify;
pub mod diagnostics;
pub mod entitlement;
pub mod error;
pub mod models;
pub mod normalize;
pub mod query;
pub mod store;

pub use error::{Result, TierError};
