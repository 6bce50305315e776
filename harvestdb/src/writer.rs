//! Entry writer: places encoded records into tenant sub-namespaces.
//!
//! Encoding happens before a transaction is opened, so a record that cannot
//! be serialized never touches storage. Everything after that (provisioning
//! the tenant root, creating the sub-namespace table, inserting the entry)
//! runs inside the caller's single write transaction and commits together.

use std::fmt;

use redb::WriteTransaction;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::Result;
use crate::namespace::{self, SubNamespace, TenantKey};

/// Key under which one record is stored inside a namespace.
///
/// Callers normally supply their own collision-free keys; [`EntryKey::generate`]
/// produces a time-sortable unique one (UUIDv7) for those that do not.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntryKey(String);

impl EntryKey {
    /// Generates a new unique key whose lexicographic order follows
    /// generation time.
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Generates a unique key under a readable prefix, as `"<prefix>/<uuid>"`.
    pub fn with_prefix(prefix: &str) -> Self {
        Self(format!("{prefix}/{}", Uuid::now_v7()))
    }

    /// Returns the key as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the key bytes as stored.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl From<&str> for EntryKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl From<String> for EntryKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl fmt::Display for EntryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Inserts an already-encoded payload into a tenant sub-namespace.
///
/// Provisions the tenant root according to the namespace's policy and
/// creates the sub-namespace table if needed. An existing entry under the
/// same key is replaced; the return value says whether that happened.
pub(crate) fn put_payload(
    txn: &WriteTransaction,
    tenant: &TenantKey,
    sub: SubNamespace,
    key: &EntryKey,
    payload: &[u8],
    now: i64,
) -> Result<bool> {
    namespace::ensure_root(txn, tenant, sub, now)?;

    let name = tenant.sub_table_name(sub);
    let mut target = txn.open_table(namespace::table(&name))?;
    let replaced = target.insert(key.as_bytes(), payload)?.is_some();

    if replaced && sub.is_append_style() {
        warn!(tenant = %tenant, namespace = %sub, key = %key, "entry key collision, previous payload replaced");
    }
    debug!(tenant = %tenant, namespace = %sub, key = %key, bytes = payload.len(), "entry written");

    Ok(replaced)
}
