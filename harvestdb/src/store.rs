//! Store module for the harvestdb storage engine.
//!
//! This module provides the top-level API that ties all components together.
//! A [`Store`] owns one long-lived handle on the embedded database file and
//! runs every operation in exactly one transaction, so no transaction ever
//! outlives a call.
//!
//! # Design
//!
//! The Store acts as the central coordinator:
//! - Opens (or creates) the database file described by a [`StoreConfig`]
//! - Resolves tenant keys and provisions tenant namespaces
//! - Encodes records before any transaction is opened
//! - Runs range scans, identity lookups, and summary generation
//!
//! Writers are serialized by the embedded store; readers proceed
//! concurrently with each other and with the single writer. `Store` is
//! `Send + Sync` and can be shared behind an `Arc`.
//!
//! # File Layout
//!
//! ```text
//! main.db
//! ├── USER                     <- users keyed by normalized email
//! ├── <TENANT>                 <- tenant root (tenant metadata)
//! ├── <TENANT>/SENSOR          <- sensor readings
//! ├── <TENANT>/LOG             <- control-loop events
//! ├── <TENANT>/FARMDETAILS     <- single farm details record
//! └── <TENANT>/SUMMARY         <- generated summaries, "<id>/<uuid>"
//! ```
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use harvestdb::{EntryKey, SensorEntry, SensorType, Store, StoreConfig, TimeRange, TypeFilter};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Store::open(StoreConfig::new("data/main.db"))?;
//! store.create_tenant_bucket("1GYJU7OD2KFJ")?;
//!
//! store.put_sensor_entry("1GYJU7OD2KFJ", &EntryKey::generate(), &SensorEntry {
//!     time: 1_551_398_400,
//!     sensor_type: SensorType::Temperature,
//!     value: 21.5,
//! })?;
//!
//! let readings = store.scan_sensor_entries("1GYJU7OD2KFJ", TimeRange::all(), &TypeFilter::all())?;
//! assert_eq!(readings.len(), 1);
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use redb::{Database, ReadTransaction, ReadableTable};
use tracing::{debug, info, warn};

use crate::codec;
use crate::config::StoreConfig;
use crate::error::{FarmError, NamespaceError, Result, StoreError};
use crate::identity;
use crate::namespace::{self, SubNamespace, TenantKey, TenantMeta};
use crate::query::{self, ScanResult, TimeRange, TypeFilter, unix_now};
use crate::record::{Entry, FarmDetails, LogEntry, Record, RecordKind, SensorEntry, Summary, User};
use crate::summary;
use crate::writer::{self, EntryKey};

/// Key of the single record in a tenant's farm details namespace.
const FARM_DETAILS_KEY: &str = "details";

/// Top-level store handle for harvestdb.
///
/// The Store provides the main API: tenant provisioning, record writes,
/// range queries, the identity store, and summary generation.
///
/// # Thread Safety
///
/// The Store is `Send + Sync`. Each method opens and finishes its own
/// transaction, so calls from different threads never share transaction
/// state.
pub struct Store {
    /// The embedded database.
    db: Database,
    /// Path of the database file.
    path: PathBuf,
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl Store {
    /// Opens the database file described by `config`, creating it if it
    /// does not exist.
    ///
    /// # Errors
    ///
    /// - [`crate::error::ConfigError::Invalid`] if the configuration fails validation
    /// - [`StoreError::DirectoryAccess`] if the parent directory cannot be created
    /// - [`StoreError::Open`] if the file cannot be opened or is not a database
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// # use harvestdb::{Store, StoreConfig};
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let store = Store::open(StoreConfig::new("./data/main.db"))?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn open(config: StoreConfig) -> Result<Self> {
        config.validate()?;
        let path = config.path;

        if config.create_dirs
            && let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty())
        {
            fs::create_dir_all(parent).map_err(|e| StoreError::DirectoryAccess {
                path: parent.display().to_string(),
                source: e,
            })?;
        }

        let db = Database::builder()
            .set_cache_size(config.cache_size_bytes)
            .create(&path)
            .map_err(|e| StoreError::Open {
                path: path.display().to_string(),
                source: e,
            })?;

        info!(path = %path.display(), "store opened");
        Ok(Self { db, path })
    }

    /// Returns the path of the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    // ---- Tenant namespaces ----

    /// Creates the root namespace for a tenant.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::NamespaceError::TenantExists`] if the tenant was
    /// already created and [`crate::error::NamespaceError::InvalidTenantKey`] if
    /// the key is unusable.
    pub fn create_tenant_bucket(&self, tenant: &str) -> Result<()> {
        let tenant = TenantKey::parse(tenant)?;
        let txn = self.db.begin_write()?;
        namespace::create_root(&txn, &tenant, unix_now())?;
        txn.commit()?;
        Ok(())
    }

    /// Returns true if the tenant's root namespace exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is invalid or the read fails.
    pub fn tenant_exists(&self, tenant: &str) -> Result<bool> {
        let tenant = TenantKey::parse(tenant)?;
        let txn = self.db.begin_read()?;
        match namespace::open_root(&txn, &tenant) {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Returns the metadata recorded when the tenant root was created.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::NamespaceError::TenantNotFound`] if the tenant
    /// does not exist.
    pub fn tenant_meta(&self, tenant: &str) -> Result<TenantMeta> {
        let tenant = TenantKey::parse(tenant)?;
        let txn = self.db.begin_read()?;
        namespace::read_meta(&txn, &tenant)
    }

    /// Entry counts of every sub-namespace the tenant has written to.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::NamespaceError::TenantNotFound`] if the tenant
    /// does not exist.
    pub fn namespace_stats(&self, tenant: &str) -> Result<Vec<(SubNamespace, u64)>> {
        let tenant = TenantKey::parse(tenant)?;
        let txn = self.db.begin_read()?;
        namespace::sub_counts(&txn, &tenant)
    }

    // ---- Identity ----

    /// Registers a user and creates the tenant namespace named by the
    /// user's `key`, atomically. If either the email or the tenant is
    /// already taken, nothing is written.
    ///
    /// Returns the stored user, with its email normalized.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::IdentityError::Conflict`] for a taken email and
    /// [`crate::error::NamespaceError::TenantExists`] for a taken tenant key.
    pub fn register(&self, user: &User) -> Result<User> {
        let tenant = TenantKey::parse(&user.key)?;
        let txn = self.db.begin_write()?;
        let stored = identity::put_unique(&txn, user)?;
        namespace::create_root(&txn, &tenant, unix_now())?;
        txn.commit()?;
        Ok(stored)
    }

    /// Stores a user unless the normalized email is already registered.
    ///
    /// Returns the stored user, with its email normalized.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::IdentityError::Conflict`] if the email is taken.
    pub fn put_unique(&self, user: &User) -> Result<User> {
        let txn = self.db.begin_write()?;
        let stored = identity::put_unique(&txn, user)?;
        txn.commit()?;
        Ok(stored)
    }

    /// Looks up a user by email (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::IdentityError::UserNotFound`] if no such user
    /// exists and a decode error if the stored record is malformed.
    pub fn user(&self, email: &str) -> Result<User> {
        let txn = self.db.begin_read()?;
        identity::get(&txn, email)
    }

    // ---- Writes ----

    /// Stores a record under `key` in one of the tenant's sub-namespaces.
    ///
    /// The record must be of the kind `sub` holds, and it is validated and
    /// encoded before a transaction is opened. Sensor, log, and summary
    /// namespaces create the tenant root if it is missing. Farm details go
    /// through [`Store::put_farm_details`] and always land under their fixed
    /// key, so `key` is ignored for them.
    ///
    /// # Errors
    ///
    /// - [`NamespaceError::WrongRecordKind`] if `sub` holds another kind
    /// - [`crate::error::CodecError::NonFiniteValue`] for NaN or infinite values
    /// - [`FarmError::InvalidGrowthWindow`] for inverted farm details
    /// - [`crate::error::NamespaceError::TenantNotFound`] for farm details of an
    ///   unknown tenant
    /// - [`StoreError::Backend`] if the transaction fails
    pub fn put(&self, tenant: &str, sub: SubNamespace, key: &EntryKey, record: &Record) -> Result<()> {
        if record.kind() != sub.record_kind() {
            return Err(NamespaceError::WrongRecordKind {
                namespace: sub.name(),
                kind: record.kind().name(),
            }
            .into());
        }
        if let Record::FarmDetails(details) = record {
            return self.put_farm_details(tenant, details);
        }

        record.validate()?;
        let tenant = TenantKey::parse(tenant)?;
        let payload = record.encode()?;
        self.write_payload(&tenant, sub, key, &payload)
    }

    /// Validates and stores a typed entry in its namespace.
    ///
    /// # Errors
    ///
    /// Returns a codec error if validation fails, otherwise as [`Store::put`].
    pub fn put_entry<T: Entry>(&self, tenant: &str, key: &EntryKey, entry: &T) -> Result<()> {
        entry.validate()?;
        let tenant = TenantKey::parse(tenant)?;
        let payload = codec::encode(T::NAMESPACE.record_kind().name(), entry)?;
        self.write_payload(&tenant, T::NAMESPACE, key, &payload)
    }

    /// Stores a sensor reading.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::CodecError::NonFiniteValue`] for NaN or infinite
    /// values, otherwise as [`Store::put`].
    pub fn put_sensor_entry(&self, tenant: &str, key: &EntryKey, entry: &SensorEntry) -> Result<()> {
        self.put_entry(tenant, key, entry)
    }

    /// Stores a control-loop event.
    ///
    /// # Errors
    ///
    /// As [`Store::put`].
    pub fn put_log_entry(&self, tenant: &str, key: &EntryKey, entry: &LogEntry) -> Result<()> {
        self.put_entry(tenant, key, entry)
    }

    /// Replaces the tenant's farm details and marks them configured.
    ///
    /// # Errors
    ///
    /// - [`FarmError::InvalidGrowthWindow`] if harvest precedes planting
    /// - [`crate::error::NamespaceError::TenantNotFound`] if the tenant does not
    ///   exist
    pub fn put_farm_details(&self, tenant: &str, details: &FarmDetails) -> Result<()> {
        details.validate()?;

        let details = FarmDetails {
            configured: true,
            ..details.clone()
        };
        let tenant = TenantKey::parse(tenant)?;
        let payload = codec::encode(RecordKind::FarmDetails.name(), &details)?;
        self.write_payload(
            &tenant,
            SubNamespace::FarmDetails,
            &EntryKey::from(FARM_DETAILS_KEY),
            &payload,
        )?;

        info!(tenant = %tenant, crop = %details.crop_type, "farm details configured");
        Ok(())
    }

    fn write_payload(
        &self,
        tenant: &TenantKey,
        sub: SubNamespace,
        key: &EntryKey,
        payload: &[u8],
    ) -> Result<()> {
        let txn = self.db.begin_write()?;
        writer::put_payload(&txn, tenant, sub, key, payload, unix_now())?;
        txn.commit()?;
        Ok(())
    }

    // ---- Reads ----

    /// Returns the tenant's farm details, or `None` if they were never set.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::NamespaceError::TenantNotFound`] if the tenant
    /// does not exist and a decode error if the record is malformed.
    pub fn farm_details(&self, tenant: &str) -> Result<Option<FarmDetails>> {
        let tenant = TenantKey::parse(tenant)?;
        let txn = self.db.begin_read()?;
        read_farm_details(&txn, &tenant)
    }

    /// Scans one of the tenant's sub-namespaces.
    ///
    /// Keeps records whose timestamp lies in `range` and whose encoded
    /// payload contains the filter tag. Records come back in key order.
    /// Undecodable entries are reported in [`ScanResult::skipped`].
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::NamespaceError::TenantNotFound`] if the tenant
    /// does not exist. A missing sub-namespace yields an empty result.
    pub fn scan(
        &self,
        tenant: &str,
        sub: SubNamespace,
        range: TimeRange,
        filter: &TypeFilter,
    ) -> Result<ScanResult<Record>> {
        let tenant = TenantKey::parse(tenant)?;
        let txn = self.db.begin_read()?;
        scan_sub(&txn, &tenant, sub, range, filter)
    }

    /// Scans the namespace of a typed entry kind.
    ///
    /// # Errors
    ///
    /// As [`Store::scan`].
    pub fn scan_entries<T: Entry>(
        &self,
        tenant: &str,
        range: TimeRange,
        filter: &TypeFilter,
    ) -> Result<ScanResult<T>> {
        Ok(self
            .scan(tenant, T::NAMESPACE, range, filter)?
            .filter_map(T::from_record))
    }

    /// Scans sensor readings.
    ///
    /// # Errors
    ///
    /// As [`Store::scan`].
    pub fn scan_sensor_entries(
        &self,
        tenant: &str,
        range: TimeRange,
        filter: &TypeFilter,
    ) -> Result<ScanResult<SensorEntry>> {
        self.scan_entries(tenant, range, filter)
    }

    /// Scans control-loop events.
    ///
    /// # Errors
    ///
    /// As [`Store::scan`].
    pub fn scan_log_entries(
        &self,
        tenant: &str,
        range: TimeRange,
        filter: &TypeFilter,
    ) -> Result<ScanResult<LogEntry>> {
        self.scan_entries(tenant, range, filter)
    }

    // ---- Summaries ----

    /// Builds a weekly summary of the tenant's growth window and persists it.
    ///
    /// Farm details and sensor readings are read in one snapshot. Each call
    /// appends a new summary record; earlier ones are kept.
    ///
    /// # Errors
    ///
    /// - [`crate::error::NamespaceError::TenantNotFound`] if the tenant does not exist
    /// - [`FarmError::NotConfigured`] if farm details were never set
    /// - [`FarmError::InvalidGrowthWindow`] if harvest precedes planting
    pub fn generate_summary(&self, tenant: &str) -> Result<Summary> {
        let tenant = TenantKey::parse(tenant)?;

        let (details, readings) = {
            let txn = self.db.begin_read()?;
            let details = read_farm_details(&txn, &tenant)?
                .filter(|details| details.configured)
                .ok_or_else(|| FarmError::NotConfigured {
                    tenant: tenant.to_string(),
                })?;
            let range = TimeRange::new(details.planted_on, details.harvest_on);
            let readings = scan_sub(&txn, &tenant, SubNamespace::Sensor, range, &TypeFilter::all())?;
            (details, readings)
        };

        if !readings.skipped().is_empty() {
            warn!(
                tenant = %tenant,
                skipped = readings.skipped().len(),
                "summary ignores undecodable sensor entries"
            );
        }

        let summary = summary::build_summary(
            &details,
            readings.filter_map(SensorEntry::from_record),
            unix_now(),
        )?;
        summary.validate()?;

        let payload = codec::encode(RecordKind::Summary.name(), &summary)?;
        let key = EntryKey::with_prefix(&summary.id);
        self.write_payload(&tenant, SubNamespace::Summary, &key, &payload)?;

        info!(tenant = %tenant, id = %summary.id, weeks = summary.data.len(), "summary generated");
        Ok(summary)
    }

    /// Returns every persisted summary of the tenant, oldest first.
    ///
    /// # Errors
    ///
    /// As [`Store::scan`].
    pub fn list_summaries(&self, tenant: &str) -> Result<ScanResult<Summary>> {
        let mut summaries = self.scan_entries::<Summary>(tenant, TimeRange::all(), &TypeFilter::all())?;
        summaries.sort_by_key(|summary| summary.generated_at);
        debug!(count = summaries.len(), "summaries listed");
        Ok(summaries)
    }
}

/// Reads the farm details record inside an open read transaction.
fn read_farm_details(txn: &ReadTransaction, tenant: &TenantKey) -> Result<Option<FarmDetails>> {
    let Some(table) = namespace::open_sub(txn, tenant, SubNamespace::FarmDetails)? else {
        return Ok(None);
    };
    let Some(payload) = table.get(FARM_DETAILS_KEY.as_bytes())? else {
        return Ok(None);
    };
    let details = codec::decode(RecordKind::FarmDetails.name(), payload.value())?;
    Ok(Some(details))
}

/// Scans a sub-namespace inside an open read transaction.
fn scan_sub(
    txn: &ReadTransaction,
    tenant: &TenantKey,
    sub: SubNamespace,
    range: TimeRange,
    filter: &TypeFilter,
) -> Result<ScanResult<Record>> {
    match namespace::open_sub(txn, tenant, sub)? {
        Some(table) => query::scan_table(&table, sub.record_kind(), range, filter),
        None => Ok(ScanResult::empty(range)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, HarvestError};
    use crate::record::SensorType;
    use tempfile::{TempDir, tempdir};

    fn open_temp() -> (TempDir, Store) {
        let dir = tempdir().unwrap();
        let store = Store::open(StoreConfig::new(dir.path().join("main.db"))).unwrap();
        (dir, store)
    }

    fn reading(time: i64, sensor_type: SensorType, value: f64) -> SensorEntry {
        SensorEntry {
            time,
            sensor_type,
            value,
        }
    }

    #[test]
    fn test_store_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Store>();
    }

    #[test]
    fn test_open_creates_parent_directories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join("main.db");
        let store = Store::open(StoreConfig::new(&path)).unwrap();
        assert_eq!(store.path(), path);
        assert!(path.exists());
    }

    #[test]
    fn test_open_without_create_dirs_fails() {
        let dir = tempdir().unwrap();
        let mut config = StoreConfig::new(dir.path().join("missing").join("main.db"));
        config.create_dirs = false;
        let err = Store::open(config).unwrap_err();
        assert!(matches!(err, HarvestError::Store(StoreError::Open { .. })));
    }

    #[test]
    fn test_create_tenant_twice_conflicts() {
        let (_dir, store) = open_temp();
        store.create_tenant_bucket("t1").unwrap();

        let err = store.create_tenant_bucket(" T1 ").unwrap_err();
        assert!(matches!(
            err,
            HarvestError::Namespace(NamespaceError::TenantExists { .. })
        ));
        assert!(store.tenant_exists("t1").unwrap());
        assert!(!store.tenant_exists("t2").unwrap());
    }

    #[test]
    fn test_sensor_write_provisions_tenant() {
        let (_dir, store) = open_temp();
        store
            .put_sensor_entry("fresh", &EntryKey::generate(), &reading(5, SensorType::Ph, 6.5))
            .unwrap();

        assert!(store.tenant_exists("FRESH").unwrap());
        assert_eq!(
            store.namespace_stats("fresh").unwrap(),
            vec![(SubNamespace::Sensor, 1)]
        );
    }

    #[test]
    fn test_farm_details_requires_tenant() {
        let (_dir, store) = open_temp();
        let err = store
            .put_farm_details("ghost", &FarmDetails::default())
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(!store.tenant_exists("ghost").unwrap());
    }

    #[test]
    fn test_non_finite_reading_is_not_written() {
        let (_dir, store) = open_temp();
        store.create_tenant_bucket("t1").unwrap();

        let err = store
            .put_sensor_entry("t1", &EntryKey::generate(), &reading(1, SensorType::Ec, f64::NAN))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Encode);
        assert!(store.namespace_stats("t1").unwrap().is_empty());
    }

    #[test]
    fn test_generic_put_rejects_non_finite_value() {
        let (_dir, store) = open_temp();
        store.create_tenant_bucket("t1").unwrap();

        let record = Record::Sensor(reading(1, SensorType::Ec, f64::NAN));
        let err = store
            .put("t1", SubNamespace::Sensor, &EntryKey::from("k"), &record)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Encode);

        let result = store
            .scan("t1", SubNamespace::Sensor, TimeRange::all(), &TypeFilter::all())
            .unwrap();
        assert_eq!(result.examined(), 0);
        assert!(result.skipped().is_empty());
    }

    #[test]
    fn test_generic_put_rejects_wrong_kind() {
        let (_dir, store) = open_temp();
        store.create_tenant_bucket("t1").unwrap();

        let log = Record::Log(LogEntry {
            time: 1,
            success: true,
            message: "fan on".to_string(),
            kind: "coolingFan".to_string(),
        });
        let err = store
            .put("t1", SubNamespace::Sensor, &EntryKey::from("k"), &log)
            .unwrap_err();
        assert!(matches!(
            err,
            HarvestError::Namespace(NamespaceError::WrongRecordKind { .. })
        ));
        assert_eq!(err.kind(), ErrorKind::Invalid);

        let user = Record::User(User {
            email: "a@x.com".to_string(),
            name: "A".to_string(),
            phone: String::new(),
            password_hash: String::new(),
            key: "t1".to_string(),
            created_at: 0,
        });
        assert!(store
            .put("t1", SubNamespace::Log, &EntryKey::from("u"), &user)
            .is_err());

        assert!(store.namespace_stats("t1").unwrap().is_empty());

        store
            .put("t1", SubNamespace::Log, &EntryKey::from("k"), &log)
            .unwrap();
        let logs = store
            .scan_log_entries("t1", TimeRange::all(), &TypeFilter::all())
            .unwrap();
        assert_eq!(logs.len(), 1);
    }

    #[test]
    fn test_generic_put_farm_details_uses_fixed_key() {
        let (_dir, store) = open_temp();
        store.create_tenant_bucket("t1").unwrap();

        let inverted = Record::FarmDetails(FarmDetails {
            planted_on: 200,
            harvest_on: 100,
            ..FarmDetails::default()
        });
        let err = store
            .put("t1", SubNamespace::FarmDetails, &EntryKey::from("other"), &inverted)
            .unwrap_err();
        assert!(matches!(
            err,
            HarvestError::Farm(FarmError::InvalidGrowthWindow { .. })
        ));
        assert_eq!(store.farm_details("t1").unwrap(), None);

        let details = FarmDetails {
            crop_type: "lettuce".to_string(),
            planted_on: 100,
            harvest_on: 200,
            ..FarmDetails::default()
        };
        store
            .put(
                "t1",
                SubNamespace::FarmDetails,
                &EntryKey::from("other"),
                &Record::FarmDetails(details),
            )
            .unwrap();

        let stored = store.farm_details("t1").unwrap().unwrap();
        assert_eq!(stored.crop_type, "lettuce");
        assert!(stored.configured);
        assert_eq!(
            store.namespace_stats("t1").unwrap(),
            vec![(SubNamespace::FarmDetails, 1)]
        );
    }

    #[test]
    fn test_tenant_meta_records_creation_time() {
        let (_dir, store) = open_temp();
        let before = unix_now();
        store.create_tenant_bucket("t1").unwrap();

        let meta = store.tenant_meta("T1").unwrap();
        assert!(meta.created_at >= before);
        assert!(meta.created_at <= unix_now());
        assert!(store.tenant_meta("ghost").unwrap_err().is_not_found());
    }

    #[test]
    fn test_failed_farm_details_write_leaves_no_root() {
        let (_dir, store) = open_temp();
        store
            .put_farm_details("ghost", &FarmDetails::default())
            .unwrap_err();
        assert!(!store.tenant_exists("ghost").unwrap());

        store.create_tenant_bucket("ghost").unwrap();
        assert!(store.tenant_exists("ghost").unwrap());
        store.put_farm_details("ghost", &FarmDetails::default()).unwrap();
    }

    #[test]
    fn test_key_collision_replaces_payload() {
        let (_dir, store) = open_temp();
        let key = EntryKey::from("fixed");
        store
            .put_sensor_entry("t1", &key, &reading(1, SensorType::Temperature, 10.0))
            .unwrap();
        store
            .put_sensor_entry("t1", &key, &reading(2, SensorType::Temperature, 20.0))
            .unwrap();

        let result = store
            .scan_sensor_entries("t1", TimeRange::all(), &TypeFilter::all())
            .unwrap();
        assert_eq!(result.records(), &[reading(2, SensorType::Temperature, 20.0)]);
    }

    #[test]
    fn test_skipped_entries_are_reported() {
        let (_dir, store) = open_temp();
        store
            .put_sensor_entry("t1", &EntryKey::from("a"), &reading(1, SensorType::Ph, 7.0))
            .unwrap();

        let tenant = TenantKey::parse("t1").unwrap();
        store
            .write_payload(&tenant, SubNamespace::Sensor, &EntryKey::from("b"), b"{not json")
            .unwrap();

        let result = store
            .scan_sensor_entries("t1", TimeRange::all(), &TypeFilter::all())
            .unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result.examined(), 2);
        assert_eq!(result.skipped().len(), 1);
        assert_eq!(result.skipped()[0].key, "b");
    }

    #[test]
    fn test_farm_details_marked_configured() {
        let (_dir, store) = open_temp();
        store.create_tenant_bucket("t1").unwrap();
        assert_eq!(store.farm_details("t1").unwrap(), None);

        let details = FarmDetails {
            crop_type: "basil".to_string(),
            planted_on: 100,
            harvest_on: 200,
            ..FarmDetails::default()
        };
        store.put_farm_details("t1", &details).unwrap();

        let stored = store.farm_details("t1").unwrap().unwrap();
        assert!(stored.configured);
        assert_eq!(stored.crop_type, "basil");
    }

    #[test]
    fn test_summary_requires_configuration() {
        let (_dir, store) = open_temp();
        store.create_tenant_bucket("t1").unwrap();

        let err = store.generate_summary("t1").unwrap_err();
        assert!(matches!(
            err,
            HarvestError::Farm(FarmError::NotConfigured { .. })
        ));

        let err = store.generate_summary("nobody").unwrap_err();
        assert!(matches!(
            err,
            HarvestError::Namespace(NamespaceError::TenantNotFound { .. })
        ));
    }
}
