//! Integration tests for the identity store and registration.

use std::sync::atomic::{AtomicUsize, Ordering};

use harvestdb::error::{HarvestError, IdentityError, NamespaceError};
use harvestdb::{ErrorKind, Store, StoreConfig, User};
use redb::{Database, TableDefinition};
use tempfile::{TempDir, tempdir};

const RAW_USER_TABLE: TableDefinition<&[u8], &[u8]> = TableDefinition::new("USER");

fn open_store() -> (TempDir, Store) {
    let temp_dir = tempdir().unwrap();
    let store = Store::open(StoreConfig::new(temp_dir.path().join("main.db"))).unwrap();
    (temp_dir, store)
}

fn user(email: &str, name: &str, key: &str) -> User {
    User {
        email: email.to_string(),
        name: name.to_string(),
        phone: "555-0100".to_string(),
        password_hash: "$2a$10$abcdefghijklmnopqrstuv".to_string(),
        key: key.to_string(),
        created_at: 1_551_398_400,
    }
}

#[test]
fn test_put_unique_then_lookup() {
    let (_dir, store) = open_store();
    let stored = store.put_unique(&user("Adam@X.com", "Adam", "K1")).unwrap();
    assert_eq!(stored.email, "adam@x.com");

    let found = store.user("  ADAM@x.COM ").unwrap();
    assert_eq!(found, stored);
    assert_eq!(found.name, "Adam");
}

#[test]
fn test_duplicate_email_keeps_first_user() {
    let (_dir, store) = open_store();
    store.put_unique(&user("a@x.com", "first", "K1")).unwrap();

    let err = store
        .put_unique(&user("A@X.COM", "second", "K2"))
        .unwrap_err();
    assert!(matches!(
        err,
        HarvestError::Identity(IdentityError::Conflict { .. })
    ));
    assert_eq!(err.kind(), ErrorKind::Conflict);

    assert_eq!(store.user("a@x.com").unwrap().name, "first");
}

#[test]
fn test_unknown_user_not_found() {
    let (_dir, store) = open_store();
    // Before any user exists the identity namespace is absent.
    assert!(store.user("nobody@x.com").unwrap_err().is_not_found());

    store.put_unique(&user("a@x.com", "a", "K1")).unwrap();
    assert!(store.user("nobody@x.com").unwrap_err().is_not_found());
}

#[test]
fn test_concurrent_put_unique_admits_one() {
    let (_dir, store) = open_store();
    let successes = AtomicUsize::new(0);
    let conflicts = AtomicUsize::new(0);

    std::thread::scope(|scope| {
        for i in 0..8 {
            let store = &store;
            let successes = &successes;
            let conflicts = &conflicts;
            scope.spawn(move || {
                match store.put_unique(&user("race@x.com", &format!("writer {i}"), "K")) {
                    Ok(_) => successes.fetch_add(1, Ordering::SeqCst),
                    Err(e) if e.is_conflict() => conflicts.fetch_add(1, Ordering::SeqCst),
                    Err(e) => panic!("unexpected error: {e}"),
                };
            });
        }
    });

    assert_eq!(successes.load(Ordering::SeqCst), 1);
    assert_eq!(conflicts.load(Ordering::SeqCst), 7);
    assert!(store.user("race@x.com").unwrap().name.starts_with("writer "));
}

#[test]
fn test_register_creates_user_and_tenant() {
    let (_dir, store) = open_store();
    let stored = store
        .register(&user("grower@farm.io", "Grower", "1gyju7od2kfj"))
        .unwrap();

    assert_eq!(stored.email, "grower@farm.io");
    assert!(store.tenant_exists("1GYJU7OD2KFJ").unwrap());
    assert_eq!(store.user("grower@farm.io").unwrap(), stored);
}

#[test]
fn test_register_is_atomic() {
    let (_dir, store) = open_store();
    store.create_tenant_bucket("TAKEN").unwrap();

    // Tenant conflict: the user must not be stored either.
    let err = store
        .register(&user("new@x.com", "New", "taken"))
        .unwrap_err();
    assert!(matches!(
        err,
        HarvestError::Namespace(NamespaceError::TenantExists { .. })
    ));
    assert!(store.user("new@x.com").unwrap_err().is_not_found());

    // Email conflict: the tenant must not be created.
    store.register(&user("old@x.com", "Old", "K1")).unwrap();
    let err = store.register(&user("old@x.com", "Old", "K2")).unwrap_err();
    assert!(err.is_conflict());
    assert!(!store.tenant_exists("K2").unwrap());
}

#[test]
fn test_invalid_email_rejected() {
    let (_dir, store) = open_store();
    let err = store.put_unique(&user("   ", "blank", "K1")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Invalid);
}

#[test]
fn test_malformed_user_is_decode_error() {
    let temp_dir = tempdir().unwrap();
    let db_path = temp_dir.path().join("main.db");

    {
        let db = Database::create(&db_path).unwrap();
        let txn = db.begin_write().unwrap();
        {
            let mut table = txn.open_table(RAW_USER_TABLE).unwrap();
            table
                .insert(b"bad@x.com".as_slice(), b"\x00\x01 not json".as_slice())
                .unwrap();
        }
        txn.commit().unwrap();
    }

    let store = Store::open(StoreConfig::new(&db_path)).unwrap();
    let err = store.user("bad@x.com").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Decode);
}
