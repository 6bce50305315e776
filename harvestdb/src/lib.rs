//! # harvestdb
//!
//! Embedded multi-tenant storage engine for farm monitoring data.
//!
//! harvestdb keeps sensor readings, control-loop events, farm settings, and
//! weekly growth summaries for many independent tenants ("farms") in a
//! single embedded database file, next to a small identity store of
//! registered users.
//!
//! **Status**: This crate is in early development. The API is not yet stable.
//!
//! ## Key Properties
//!
//! - One database file, one long-lived handle, one transaction per call
//! - Per-tenant namespaces created lazily on first write
//! - Human-readable JSON payloads with type tags that range queries match on
//! - Malformed records are reported, never fatal to a scan
//! - Weekly summaries that tile the growth window exactly
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use harvestdb::{
//!     EntryKey, FarmDetails, SensorEntry, SensorType, Store, StoreConfig, TimeRange, TypeFilter,
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Open or create the database file
//! let store = Store::open(StoreConfig::new("./data/main.db"))?;
//!
//! // Provision a tenant and describe its crop
//! store.create_tenant_bucket("1GYJU7OD2KFJ")?;
//! store.put_farm_details("1GYJU7OD2KFJ", &FarmDetails {
//!     crop_type: "lettuce".to_string(),
//!     planted_on: 1_551_398_400,
//!     harvest_on: 1_551_398_400 + 21 * 86_400,
//!     npk: "10-10-10".to_string(),
//!     maturity_time: 45,
//!     configured: false,
//! })?;
//!
//! // Record a reading
//! store.put_sensor_entry("1GYJU7OD2KFJ", &EntryKey::generate(), &SensorEntry {
//!     time: 1_551_398_400 + 3_600,
//!     sensor_type: SensorType::Temperature,
//!     value: 21.5,
//! })?;
//!
//! // Query temperature readings back
//! let readings = store.scan_sensor_entries(
//!     "1GYJU7OD2KFJ",
//!     TimeRange::all(),
//!     &TypeFilter::from(SensorType::Temperature),
//! )?;
//! for reading in readings {
//!     println!("{}: {}", reading.time, reading.value);
//! }
//!
//! // Roll the growth window up into weeks
//! let summary = store.generate_summary("1GYJU7OD2KFJ")?;
//! assert_eq!(summary.data.len(), 4);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`Store`] — Top-level handle; opens the database file, runs every operation
//! - [`StoreConfig`] — Database path and tuning, loadable from JSON
//! - [`TenantKey`] / [`SubNamespace`] — Tenant namespace addressing
//! - [`ScanResult`] — Range query results with scan metadata
//! - [`Summary`] — Weekly rollup of a growth window
//!
//! ## Modules
//!
//! For lower-level access, the individual modules are also public:
//!
//! - [`store`] — Store lifecycle and all operations
//! - [`config`] — Store configuration
//! - [`namespace`] — Tenant and sub-namespace naming
//! - [`record`] — Persisted record types
//! - [`codec`] — Canonical payload encoding
//! - [`writer`] — Entry keys and the write path
//! - [`query`] — Time ranges, type filters, scan results
//! - [`identity`] — Registered users
//! - [`summary`] — Week partitioning and aggregation
//! - [`error`] — Error types

pub mod codec;
pub mod config;
pub mod error;
pub mod identity;
pub mod namespace;
pub mod query;
pub mod record;
pub mod store;
pub mod summary;
pub mod writer;

// Re-export primary API types at crate root for convenience.
pub use config::StoreConfig;
pub use error::{ErrorKind, HarvestError, Result};
pub use namespace::{SubNamespace, TenantKey, TenantMeta};
pub use query::{ScanResult, SkippedRecord, TimeRange, TypeFilter};
pub use record::{
    Entry, FarmDetails, LogEntry, Record, RecordKind, SensorEntry, SensorType, Summary, User, Week,
    WeekOf,
};
pub use store::Store;
pub use summary::Aggregation;
pub use writer::EntryKey;
