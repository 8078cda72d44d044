//! # Resource Tiers
//!
//! **Access-tier engine for aggregated job, course, and tool listings.**
//!
//! Resource Tiers normalizes stored records of two incompatible shapes,
//! backfills an access tier on records that lack one, and serves
//! plan-scoped listings capped per resource type.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌─────────────┐   ┌────────────┐
//! │   loader   │──▶│   SQLite    │◀──│  backfill  │
//! │ JSON/JSONL │   │  resources  │   │  (migrate) │
//! └────────────┘   └──────┬──────┘   └────────────┘
//!                         │
//!              ┌──────────┴──────────┐
//!              ▼                     ▼
//!         ┌──────────┐         ┌──────────┐
//!         │   list   │         │  stats   │
//!         │ per plan │         │          │
//!         └──────────┘         └──────────┘
//! ```
//!
//! The algorithms live in `resource-tiers-core` and run against any
//! [`ResourceStore`](resource_tiers_core::store::ResourceStore); this crate
//! supplies the SQLite store, configuration, and the `rtier` CLI.
//!
//! ## Quick Start
//!
//! ```bash
//! rtier init                     # create database
//! rtier load resources.json      # import raw documents
//! rtier migrate --dry-run        # preview tier assignments
//! rtier migrate                  # backfill tiers
//! rtier list --plan pro          # plan-scoped listing
//! rtier stats                    # per-type / per-tier counts
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`db`] | SQLite connection pool with WAL mode |
//! | [`schema`] | Database schema creation (idempotent) |
//! | [`sqlite_store`] | SQLite-backed `ResourceStore` |
//! | [`load`] | JSON / JSON-lines record import |
//! | [`backfill_cmd`] | `migrate` command: tier backfill and report |
//! | [`list`] | `list` command: plan-scoped listing |
//! | [`stats`] | `stats` command: collection inventory |

pub mod backfill_cmd;
pub mod config;
pub mod db;
pub mod list;
pub mod load;
pub mod schema;
pub mod sqlite_store;
pub mod stats;

pub use resource_tiers_core::store;
