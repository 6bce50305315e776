//! Error types for the harvestdb storage engine.

use thiserror::Error;

/// The main error type for all harvestdb operations.
///
/// Each variant wraps a more specific error enum for one concern of the
/// engine. Callers that only care about the broad category (for example to
/// pick an HTTP status code) should use [`HarvestError::kind`].
#[derive(Error, Debug)]
pub enum HarvestError {
    /// Error opening the database or executing a transaction.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Error resolving or creating a tenant namespace.
    #[error("namespace error: {0}")]
    Namespace(#[from] NamespaceError),

    /// Error encoding or decoding a record payload.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// Error in the identity (user) store.
    #[error("identity error: {0}")]
    Identity(#[from] IdentityError),

    /// Error reading farm details or generating a summary.
    #[error("farm error: {0}")]
    Farm(#[from] FarmError),

    /// Error loading or validating configuration.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

/// Broad classification of a [`HarvestError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A tenant, namespace, or record is absent.
    NotFound,
    /// A uniqueness constraint was violated.
    Conflict,
    /// A record could not be serialized.
    Encode,
    /// Stored bytes could not be parsed into the expected record.
    Decode,
    /// The underlying store rejected a transaction.
    Write,
    /// The caller supplied an invalid argument or configuration.
    Invalid,
    /// Filesystem access failed.
    Io,
}

impl HarvestError {
    /// Returns the broad category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Store(StoreError::DirectoryAccess { .. }) => ErrorKind::Io,
            Self::Store(StoreError::Open { .. } | StoreError::Backend(_)) => ErrorKind::Write,
            Self::Namespace(NamespaceError::TenantNotFound { .. }) => ErrorKind::NotFound,
            Self::Namespace(NamespaceError::TenantExists { .. }) => ErrorKind::Conflict,
            Self::Namespace(
                NamespaceError::InvalidTenantKey { .. } | NamespaceError::WrongRecordKind { .. },
            ) => ErrorKind::Invalid,
            Self::Codec(CodecError::Encode { .. } | CodecError::NonFiniteValue { .. }) => {
                ErrorKind::Encode
            }
            Self::Codec(CodecError::Decode { .. }) => ErrorKind::Decode,
            Self::Identity(IdentityError::Conflict { .. }) => ErrorKind::Conflict,
            Self::Identity(IdentityError::UserNotFound { .. }) => ErrorKind::NotFound,
            Self::Identity(IdentityError::InvalidEmail { .. }) => ErrorKind::Invalid,
            Self::Farm(FarmError::NotConfigured { .. }) => ErrorKind::NotFound,
            Self::Farm(
                FarmError::InvalidGrowthWindow { .. } | FarmError::GrowthWindowTooLong { .. },
            ) => ErrorKind::Invalid,
            Self::Config(ConfigError::Read { .. }) => ErrorKind::Io,
            Self::Config(ConfigError::Parse { .. } | ConfigError::Invalid { .. }) => {
                ErrorKind::Invalid
            }
        }
    }

    /// Returns true if this error reports a missing tenant, record, or user.
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// Returns true if this error reports a uniqueness violation.
    pub fn is_conflict(&self) -> bool {
        self.kind() == ErrorKind::Conflict
    }
}

/// Errors that can occur when opening the database or running transactions.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The directory holding the database file could not be created.
    #[error("failed to access store directory '{path}': {source}")]
    DirectoryAccess {
        /// The path that could not be accessed.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The database file could not be opened or created.
    #[error("failed to open database '{path}': {source}")]
    Open {
        /// The database file path.
        path: String,
        /// The underlying redb error.
        #[source]
        source: redb::DatabaseError,
    },

    /// The underlying store rejected a transaction (oversized key, I/O
    /// failure during commit, and so on).
    #[error("transaction failed: {0}")]
    Backend(#[source] redb::Error),
}

/// Errors that can occur while resolving tenant namespaces.
#[derive(Error, Debug)]
pub enum NamespaceError {
    /// The tenant's root namespace does not exist.
    #[error("tenant '{tenant}' not found")]
    TenantNotFound {
        /// The normalized tenant key.
        tenant: String,
    },

    /// The tenant's root namespace was already created.
    #[error("tenant '{tenant}' already exists")]
    TenantExists {
        /// The normalized tenant key.
        tenant: String,
    },

    /// The tenant key cannot be used as a namespace name.
    #[error("invalid tenant key '{key}': {reason}")]
    InvalidTenantKey {
        /// The key as supplied by the caller.
        key: String,
        /// Why the key was rejected.
        reason: String,
    },

    /// A record was written into a namespace that holds another kind.
    #[error("cannot store a {kind} in namespace {namespace}")]
    WrongRecordKind {
        /// The target sub-namespace.
        namespace: &'static str,
        /// The kind of record offered.
        kind: &'static str,
    },
}

/// Errors that can occur while encoding or decoding record payloads.
#[derive(Error, Debug)]
pub enum CodecError {
    /// A record could not be serialized.
    #[error("failed to encode {kind}: {source}")]
    Encode {
        /// The record kind being encoded.
        kind: &'static str,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// Stored bytes did not parse into the expected record kind.
    #[error("failed to decode {kind}: {source}")]
    Decode {
        /// The record kind being decoded.
        kind: &'static str,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// A sensor value is NaN or infinite and cannot round-trip.
    #[error("sensor value {value} is not finite")]
    NonFiniteValue {
        /// The rejected value.
        value: f64,
    },
}

/// Errors that can occur in the identity store.
#[derive(Error, Debug)]
pub enum IdentityError {
    /// A user with this email is already registered.
    #[error("user '{email}' already exists")]
    Conflict {
        /// The normalized email.
        email: String,
    },

    /// No user is registered under this email.
    #[error("user '{email}' not found")]
    UserNotFound {
        /// The normalized email.
        email: String,
    },

    /// The email is empty after normalization.
    #[error("invalid email '{email}'")]
    InvalidEmail {
        /// The email as supplied by the caller.
        email: String,
    },
}

/// Errors that can occur when reading farm details or generating summaries.
#[derive(Error, Debug)]
pub enum FarmError {
    /// The tenant has no farm details, or they were never configured.
    #[error("farm details for tenant '{tenant}' are not configured")]
    NotConfigured {
        /// The normalized tenant key.
        tenant: String,
    },

    /// The harvest date precedes the planting date.
    #[error("invalid growth window: harvest {harvest_on} is before planting {planted_on}")]
    InvalidGrowthWindow {
        /// Planting time, unix seconds.
        planted_on: i64,
        /// Harvest time, unix seconds.
        harvest_on: i64,
    },

    /// The growth window spans more weeks than a summary may hold.
    #[error("growth window spans {weeks} weeks (max {max_weeks})")]
    GrowthWindowTooLong {
        /// Number of weeks the window would produce.
        weeks: i64,
        /// The maximum allowed.
        max_weeks: i64,
    },
}

/// Errors that can occur when loading store configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config '{path}': {source}")]
    Read {
        /// The config file path.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid JSON for [`crate::StoreConfig`].
    #[error("failed to parse config '{path}': {source}")]
    Parse {
        /// The config file path.
        path: String,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// A configuration value is out of range.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// Description of the problem.
        reason: String,
    },
}

impl From<redb::Error> for HarvestError {
    fn from(err: redb::Error) -> Self {
        Self::Store(StoreError::Backend(err))
    }
}

impl From<redb::TransactionError> for HarvestError {
    fn from(err: redb::TransactionError) -> Self {
        redb::Error::from(err).into()
    }
}

impl From<redb::TableError> for HarvestError {
    fn from(err: redb::TableError) -> Self {
        redb::Error::from(err).into()
    }
}

impl From<redb::StorageError> for HarvestError {
    fn from(err: redb::StorageError) -> Self {
        redb::Error::from(err).into()
    }
}

impl From<redb::CommitError> for HarvestError {
    fn from(err: redb::CommitError) -> Self {
        redb::Error::from(err).into()
    }
}

/// Type alias for `Result<T, HarvestError>`.
pub type Result<T> = std::result::Result<T, HarvestError>;
