//! Identity store: registered users, unique by email.
//!
//! Users live in the top-level `USER` namespace, outside any tenant. The
//! uniqueness check and the insert run in the same write transaction, and
//! the store admits only one writer at a time, so two registrations of the
//! same email can never both succeed.

use redb::{ReadTransaction, ReadableTable, WriteTransaction};
use tracing::info;

use crate::codec;
use crate::error::{IdentityError, Result};
use crate::namespace::{self, USER_NAMESPACE};
use crate::record::{RecordKind, User};

/// Normalizes an email for use as an identity key.
///
/// # Errors
///
/// Returns [`IdentityError::InvalidEmail`] if nothing is left after trimming.
///
/// # Examples
///
/// ```rust
/// use harvestdb::identity::normalize_email;
///
/// assert_eq!(normalize_email("  Adam@Example.COM ").unwrap(), "adam@example.com");
/// assert!(normalize_email("   ").is_err());
/// ```
pub fn normalize_email(email: &str) -> Result<String> {
    let normalized = email.trim().to_lowercase();
    if normalized.is_empty() {
        return Err(IdentityError::InvalidEmail {
            email: email.to_string(),
        }
        .into());
    }
    Ok(normalized)
}

/// Inserts `user` unless a user with the same normalized email exists.
///
/// The stored record carries the normalized email.
pub(crate) fn put_unique(txn: &WriteTransaction, user: &User) -> Result<User> {
    let email = normalize_email(&user.email)?;
    let user = User {
        email: email.clone(),
        ..user.clone()
    };
    let payload = codec::encode(RecordKind::User.name(), &user)?;

    let mut users = txn.open_table(namespace::table(USER_NAMESPACE))?;
    if users.get(email.as_bytes())?.is_some() {
        return Err(IdentityError::Conflict { email }.into());
    }
    users.insert(email.as_bytes(), payload.as_slice())?;

    info!(email = %email, "user registered");
    Ok(user)
}

/// Looks up a user by email.
///
/// # Errors
///
/// Returns [`IdentityError::UserNotFound`] if the identity namespace or the
/// key is absent, and a decode error if the stored bytes are malformed.
pub(crate) fn get(txn: &ReadTransaction, email: &str) -> Result<User> {
    let email = normalize_email(email)?;
    let not_found = || IdentityError::UserNotFound {
        email: email.clone(),
    };

    let Some(users) = namespace::open_users(txn)? else {
        return Err(not_found().into());
    };
    let Some(payload) = users.get(email.as_bytes())? else {
        return Err(not_found().into());
    };

    codec::decode(RecordKind::User.name(), payload.value())
}
