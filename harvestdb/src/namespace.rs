//! Tenant namespaces.
//!
//! The embedded store only offers flat, named tables, so nesting is encoded
//! in table names. Each tenant owns a root table named by its normalized
//! key, and each sub-namespace is a sibling table whose name is prefixed
//! by the root:
//!
//! ```text
//! USER                      <- identity store, keyed by normalized email
//! 1GYJU7OD2KFJRBUWDPP5I8P5  <- tenant root (tenant metadata)
//! 1GYJU7OD2KFJRBUWDPP5I8P5/SENSOR
//! 1GYJU7OD2KFJRBUWDPP5I8P5/LOG
//! 1GYJU7OD2KFJRBUWDPP5I8P5/FARMDETAILS
//! 1GYJU7OD2KFJRBUWDPP5I8P5/SUMMARY
//! ```
//!
//! The root table is created exactly once. Sub-namespace tables are created
//! lazily by the first write into them.

use std::fmt;

use redb::{
    ReadOnlyTable, ReadTransaction, ReadableTable, ReadableTableMetadata, TableDefinition,
    TableError, WriteTransaction,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::codec;
use crate::error::{NamespaceError, Result};
use crate::record::RecordKind;

/// Name of the top-level identity namespace.
pub const USER_NAMESPACE: &str = "USER";

/// Separator between a tenant root and its sub-namespace in table names.
pub const SEPARATOR: char = '/';

/// Key of the metadata record inside a tenant's root table.
const TENANT_META_KEY: &[u8] = b"meta";

/// Byte-keyed, byte-valued table definition.
pub(crate) type BytesTable<'a> = TableDefinition<'a, &'static [u8], &'static [u8]>;

/// Read-only handle on a byte table.
pub(crate) type ReadTable = ReadOnlyTable<&'static [u8], &'static [u8]>;

/// Returns the definition of the byte table called `name`.
pub(crate) fn table(name: &str) -> BytesTable<'_> {
    TableDefinition::new(name)
}

/// A normalized tenant key.
///
/// Tenant keys are opaque, externally issued identifiers. They are trimmed
/// and upper-cased so that lookups are case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TenantKey(String);

impl TenantKey {
    /// Normalizes and validates a raw tenant key.
    ///
    /// # Errors
    ///
    /// Returns [`NamespaceError::InvalidTenantKey`] if the key is empty,
    /// contains the namespace separator, or names the identity namespace.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use harvestdb::TenantKey;
    ///
    /// let key = TenantKey::parse(" 1gyju7od2kfj ").unwrap();
    /// assert_eq!(key.as_str(), "1GYJU7OD2KFJ");
    /// assert!(TenantKey::parse("user").is_err());
    /// ```
    pub fn parse(raw: &str) -> Result<Self> {
        let normalized = raw.trim().to_uppercase();

        let reason = if normalized.is_empty() {
            Some("key cannot be empty".to_string())
        } else if normalized.contains(SEPARATOR) {
            Some(format!("key cannot contain '{SEPARATOR}'"))
        } else if normalized == USER_NAMESPACE {
            Some(format!("'{USER_NAMESPACE}' is reserved"))
        } else {
            None
        };

        match reason {
            Some(reason) => Err(NamespaceError::InvalidTenantKey {
                key: raw.to_string(),
                reason,
            }
            .into()),
            None => Ok(Self(normalized)),
        }
    }

    /// Returns the normalized key, which is also the root table name.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the table name of one of this tenant's sub-namespaces.
    pub fn sub_table_name(&self, sub: SubNamespace) -> String {
        format!("{}{SEPARATOR}{}", self.0, sub.name())
    }
}

impl fmt::Display for TenantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Namespaces nested under a tenant root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubNamespace {
    /// Sensor readings.
    Sensor,
    /// Control-loop event log.
    Log,
    /// The tenant's single farm details record.
    FarmDetails,
    /// Generated weekly summaries.
    Summary,
}

impl SubNamespace {
    /// All sub-namespaces.
    pub const ALL: [SubNamespace; 4] = [Self::Sensor, Self::Log, Self::FarmDetails, Self::Summary];

    /// Returns the upper-case namespace name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Sensor => "SENSOR",
            Self::Log => "LOG",
            Self::FarmDetails => "FARMDETAILS",
            Self::Summary => "SUMMARY",
        }
    }

    /// Kind of record stored in this namespace.
    pub fn record_kind(self) -> RecordKind {
        match self {
            Self::Sensor => RecordKind::Sensor,
            Self::Log => RecordKind::Log,
            Self::FarmDetails => RecordKind::FarmDetails,
            Self::Summary => RecordKind::Summary,
        }
    }

    /// Append-style namespaces provision the tenant root on first write;
    /// the others require the tenant to have been registered.
    pub fn is_append_style(self) -> bool {
        !matches!(self, Self::FarmDetails)
    }
}

impl fmt::Display for SubNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Metadata kept in a tenant's root table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantMeta {
    /// When the tenant root was created, unix seconds.
    pub created_at: i64,
}

/// Returns true if the tenant's root holds its metadata record.
///
/// Opening the root inside a write transaction creates an empty table when
/// it is missing. Every caller either inserts the metadata next or fails,
/// which drops and aborts the transaction, so an empty root never commits.
pub(crate) fn root_exists(txn: &WriteTransaction, tenant: &TenantKey) -> Result<bool> {
    let root = txn.open_table(table(tenant.as_str()))?;
    let exists = root.get(TENANT_META_KEY)?.is_some();
    Ok(exists)
}

/// Creates the tenant's root table.
///
/// # Errors
///
/// Returns [`NamespaceError::TenantExists`] if it already exists.
pub(crate) fn create_root(txn: &WriteTransaction, tenant: &TenantKey, created_at: i64) -> Result<()> {
    if root_exists(txn, tenant)? {
        return Err(NamespaceError::TenantExists {
            tenant: tenant.to_string(),
        }
        .into());
    }

    let meta = codec::encode("tenant metadata", &TenantMeta { created_at })?;
    let mut root = txn.open_table(table(tenant.as_str()))?;
    root.insert(TENANT_META_KEY, meta.as_slice())?;

    info!(tenant = %tenant, "created tenant namespace");
    Ok(())
}

/// Makes sure the tenant root exists before writing into `sub`.
///
/// Append-style namespaces provision a missing root; the others fail with
/// [`NamespaceError::TenantNotFound`].
pub(crate) fn ensure_root(
    txn: &WriteTransaction,
    tenant: &TenantKey,
    sub: SubNamespace,
    now: i64,
) -> Result<()> {
    if root_exists(txn, tenant)? {
        return Ok(());
    }

    if sub.is_append_style() {
        create_root(txn, tenant, now)
    } else {
        Err(NamespaceError::TenantNotFound {
            tenant: tenant.to_string(),
        }
        .into())
    }
}

/// Opens a table for reading, mapping "does not exist" to `None`.
fn open_optional(txn: &ReadTransaction, name: &str) -> Result<Option<ReadTable>> {
    match txn.open_table(table(name)) {
        Ok(handle) => Ok(Some(handle)),
        Err(TableError::TableDoesNotExist(_)) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Opens the tenant's root table for reading.
///
/// # Errors
///
/// Returns [`NamespaceError::TenantNotFound`] if the tenant does not exist.
pub(crate) fn open_root(txn: &ReadTransaction, tenant: &TenantKey) -> Result<ReadTable> {
    open_optional(txn, tenant.as_str())?.ok_or_else(|| {
        NamespaceError::TenantNotFound {
            tenant: tenant.to_string(),
        }
        .into()
    })
}

/// Reads the metadata stored in the tenant's root.
///
/// # Errors
///
/// Returns [`NamespaceError::TenantNotFound`] if the tenant does not exist.
pub(crate) fn read_meta(txn: &ReadTransaction, tenant: &TenantKey) -> Result<TenantMeta> {
    let root = open_root(txn, tenant)?;
    let Some(payload) = root.get(TENANT_META_KEY)? else {
        return Err(NamespaceError::TenantNotFound {
            tenant: tenant.to_string(),
        }
        .into());
    };
    codec::decode("tenant metadata", payload.value())
}

/// Opens one of the tenant's sub-namespaces for reading.
///
/// Returns `Ok(None)` if the tenant exists but nothing was ever written to
/// `sub`.
///
/// # Errors
///
/// Returns [`NamespaceError::TenantNotFound`] if the tenant does not exist.
pub(crate) fn open_sub(
    txn: &ReadTransaction,
    tenant: &TenantKey,
    sub: SubNamespace,
) -> Result<Option<ReadTable>> {
    open_root(txn, tenant)?;
    open_optional(txn, &tenant.sub_table_name(sub))
}

/// Opens the identity namespace for reading, if any user was ever stored.
pub(crate) fn open_users(txn: &ReadTransaction) -> Result<Option<ReadTable>> {
    open_optional(txn, USER_NAMESPACE)
}

/// Entry counts of every existing sub-namespace of a tenant.
pub(crate) fn sub_counts(
    txn: &ReadTransaction,
    tenant: &TenantKey,
) -> Result<Vec<(SubNamespace, u64)>> {
    open_root(txn, tenant)?;

    let mut counts = Vec::new();
    for sub in SubNamespace::ALL {
        if let Some(handle) = open_optional(txn, &tenant.sub_table_name(sub))? {
            counts.push((sub, handle.len()?));
        }
    }
    Ok(counts)
}
