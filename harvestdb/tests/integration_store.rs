//! Integration tests for the store lifecycle and tenant namespaces.
//!
//! These tests exercise the flow from opening a database file through
//! tenant provisioning, writes, and reopening the file.

use harvestdb::error::{HarvestError, NamespaceError};
use harvestdb::{
    EntryKey, FarmDetails, LogEntry, SensorEntry, SensorType, Store, StoreConfig, SubNamespace,
    TimeRange, TypeFilter,
};
use tempfile::tempdir;

const BASE_TIME: i64 = 1_551_398_400;

fn reading(time: i64, sensor_type: SensorType, value: f64) -> SensorEntry {
    SensorEntry {
        time,
        sensor_type,
        value,
    }
}

#[test]
fn test_full_store_lifecycle() {
    let temp_dir = tempdir().unwrap();
    let db_path = temp_dir.path().join("data").join("main.db");

    // Phase 1: create the store, a tenant, and some data
    {
        let store = Store::open(StoreConfig::new(&db_path)).unwrap();
        store.create_tenant_bucket("farm-a").unwrap();

        for i in 0..60_i32 {
            store
                .put_sensor_entry(
                    "farm-a",
                    &EntryKey::generate(),
                    &reading(BASE_TIME + i64::from(i) * 60, SensorType::Temperature, f64::from(i)),
                )
                .unwrap();
        }
        store
            .put_log_entry(
                "farm-a",
                &EntryKey::generate(),
                &LogEntry {
                    time: BASE_TIME,
                    success: true,
                    message: "pump started".to_string(),
                    kind: "waterPump".to_string(),
                },
            )
            .unwrap();
    }

    // Phase 2: reopen and verify everything persisted
    {
        let store = Store::open(StoreConfig::new(&db_path)).unwrap();
        assert!(store.tenant_exists("FARM-A").unwrap());

        let readings = store
            .scan_sensor_entries("farm-a", TimeRange::all(), &TypeFilter::all())
            .unwrap();
        assert_eq!(readings.len(), 60);
        assert!(readings.skipped().is_empty());

        let logs = store
            .scan_log_entries("farm-a", TimeRange::all(), &TypeFilter::all())
            .unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs.records()[0].message, "pump started");

        let mut stats = store.namespace_stats("farm-a").unwrap();
        stats.sort_by_key(|(sub, _)| sub.name());
        assert_eq!(stats, vec![(SubNamespace::Log, 1), (SubNamespace::Sensor, 60)]);
    }
}

#[test]
fn test_tenants_are_isolated() {
    let temp_dir = tempdir().unwrap();
    let store = Store::open(StoreConfig::new(temp_dir.path().join("main.db"))).unwrap();

    store
        .put_sensor_entry("a", &EntryKey::generate(), &reading(1, SensorType::Ph, 6.0))
        .unwrap();
    store
        .put_sensor_entry("b", &EntryKey::generate(), &reading(1, SensorType::Ph, 7.0))
        .unwrap();
    store
        .put_sensor_entry("b", &EntryKey::generate(), &reading(2, SensorType::Ph, 7.5))
        .unwrap();

    let a = store
        .scan_sensor_entries("a", TimeRange::all(), &TypeFilter::all())
        .unwrap();
    let b = store
        .scan_sensor_entries("b", TimeRange::all(), &TypeFilter::all())
        .unwrap();
    assert_eq!(a.records(), &[reading(1, SensorType::Ph, 6.0)]);
    assert_eq!(b.len(), 2);
}

#[test]
fn test_tenant_keys_are_case_insensitive() {
    let temp_dir = tempdir().unwrap();
    let store = Store::open(StoreConfig::new(temp_dir.path().join("main.db"))).unwrap();

    store.create_tenant_bucket("1gyju7od2kfj").unwrap();
    store
        .put_sensor_entry(
            " 1GYJU7OD2KFJ ",
            &EntryKey::generate(),
            &reading(1, SensorType::Ec, 1.2),
        )
        .unwrap();

    let result = store
        .scan_sensor_entries("1GyJu7od2kfj", TimeRange::all(), &TypeFilter::all())
        .unwrap();
    assert_eq!(result.len(), 1);
}

#[test]
fn test_invalid_tenant_keys_rejected() {
    let temp_dir = tempdir().unwrap();
    let store = Store::open(StoreConfig::new(temp_dir.path().join("main.db"))).unwrap();

    for key in ["", "  ", "a/b", "user"] {
        let err = store.create_tenant_bucket(key).unwrap_err();
        assert!(
            matches!(
                err,
                HarvestError::Namespace(NamespaceError::InvalidTenantKey { .. })
            ),
            "key {key:?} should be rejected, got {err}"
        );
    }
}

#[test]
fn test_farm_details_replace_and_persist() {
    let temp_dir = tempdir().unwrap();
    let db_path = temp_dir.path().join("main.db");

    {
        let store = Store::open(StoreConfig::new(&db_path)).unwrap();
        store.create_tenant_bucket("t1").unwrap();

        let mut details = FarmDetails {
            crop_type: "lettuce".to_string(),
            planted_on: BASE_TIME,
            harvest_on: BASE_TIME + 30 * 86_400,
            npk: "10-10-10".to_string(),
            maturity_time: 45,
            configured: false,
        };
        store.put_farm_details("t1", &details).unwrap();

        details.crop_type = "kale".to_string();
        store.put_farm_details("t1", &details).unwrap();
    }

    let store = Store::open(StoreConfig::new(&db_path)).unwrap();
    let details = store.farm_details("t1").unwrap().unwrap();
    assert_eq!(details.crop_type, "kale");
    assert!(details.configured);
    assert_eq!(
        store.namespace_stats("t1").unwrap(),
        vec![(SubNamespace::FarmDetails, 1)]
    );
}

#[test]
fn test_inverted_growth_window_rejected() {
    let temp_dir = tempdir().unwrap();
    let store = Store::open(StoreConfig::new(temp_dir.path().join("main.db"))).unwrap();
    store.create_tenant_bucket("t1").unwrap();

    let details = FarmDetails {
        planted_on: 200,
        harvest_on: 100,
        ..FarmDetails::default()
    };
    assert!(store.put_farm_details("t1", &details).is_err());
    assert_eq!(store.farm_details("t1").unwrap(), None);
}

#[test]
fn test_missing_tenant_reads_are_not_found() {
    let temp_dir = tempdir().unwrap();
    let store = Store::open(StoreConfig::new(temp_dir.path().join("main.db"))).unwrap();

    assert!(store.farm_details("ghost").unwrap_err().is_not_found());
    assert!(store.namespace_stats("ghost").unwrap_err().is_not_found());
    assert!(
        store
            .scan(
                "ghost",
                SubNamespace::Log,
                TimeRange::all(),
                &TypeFilter::all()
            )
            .unwrap_err()
            .is_not_found()
    );
}

#[test]
fn test_concurrent_writers_share_one_store() {
    let temp_dir = tempdir().unwrap();
    let store = Store::open(StoreConfig::new(temp_dir.path().join("main.db"))).unwrap();
    store.create_tenant_bucket("t1").unwrap();

    std::thread::scope(|scope| {
        for worker in 0..4 {
            let store = &store;
            scope.spawn(move || {
                for i in 0..25 {
                    store
                        .put_sensor_entry(
                            "t1",
                            &EntryKey::generate(),
                            &reading(BASE_TIME + worker * 100 + i, SensorType::Humidity, 50.0),
                        )
                        .unwrap();
                }
            });
        }
    });

    let result = store
        .scan_sensor_entries("t1", TimeRange::all(), &TypeFilter::all())
        .unwrap();
    assert_eq!(result.len(), 100);
}

#[test]
fn test_config_file_opens_store() {
    let temp_dir = tempdir().unwrap();
    let db_path = temp_dir.path().join("db").join("farm.db");
    let config_path = temp_dir.path().join("store.json");
    std::fs::write(
        &config_path,
        format!(
            r#"{{ "path": {}, "cache_size_bytes": 1048576 }}"#,
            serde_json::to_string(&db_path).unwrap()
        ),
    )
    .unwrap();

    let config = StoreConfig::load(&config_path).unwrap();
    assert_eq!(config.cache_size_bytes, 1_048_576);

    let store = Store::open(config).unwrap();
    assert_eq!(store.path(), db_path);
    assert!(db_path.exists());
}
