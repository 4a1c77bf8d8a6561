//! Account identity as seen by the sync pipeline.
//!
//! Accounts are managed elsewhere; the pipeline only needs their identifier,
//! the login used to find the fallback service account, and the caller's
//! context for ownership checks.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Validation errors for account values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccountValidationError {
    /// The identifier is not a UUID.
    #[error("account id must be a valid UUID")]
    InvalidId,
    /// The login is empty once trimmed.
    #[error("account login must not be empty")]
    EmptyLogin,
}

/// Stable account identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(Uuid);

impl AccountId {
    /// Parse an identifier from its textual UUID form.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, AccountValidationError> {
        Uuid::parse_str(raw.as_ref().trim())
            .map(Self)
            .map_err(|_| AccountValidationError::InvalidId)
    }

    /// Generate a fresh random identifier.
    #[must_use]
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Borrow the inner UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Login of the reserved service account that owns devices first seen
/// without a session account.
pub const DEFAULT_FALLBACK_LOGIN: &str = "device-sync";

/// Login name of an account, trimmed and non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AccountLogin(String);

impl AccountLogin {
    /// Validate and wrap a login name.
    pub fn new(raw: impl Into<String>) -> Result<Self, AccountValidationError> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(AccountValidationError::EmptyLogin);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Login of the default fallback service account.
    #[must_use]
    pub fn default_fallback() -> Self {
        Self(DEFAULT_FALLBACK_LOGIN.to_owned())
    }

    /// Borrow the login text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountLogin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Who is pushing a batch.
///
/// Authenticated pushes carry the session account; anonymous pushes fall
/// back to the reserved service account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncContext {
    /// No session account was presented.
    Anonymous,
    /// The session belongs to this account.
    Account(AccountId),
}

impl SyncContext {
    /// Account asserted by the caller, if any.
    #[must_use]
    pub const fn account(&self) -> Option<AccountId> {
        match self {
            Self::Anonymous => None,
            Self::Account(id) => Some(*id),
        }
    }
}

impl From<Option<AccountId>> for SyncContext {
    fn from(value: Option<AccountId>) -> Self {
        value.map_or(Self::Anonymous, Self::Account)
    }
}
