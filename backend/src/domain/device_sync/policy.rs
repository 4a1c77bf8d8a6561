//! Explicit configuration handed to the coordinator.

use crate::domain::{AccountLogin, CoordinateDefaults};

/// Default cap on documents across both families of one batch.
pub const DEFAULT_MAX_DOCUMENTS_PER_BATCH: usize = 500;
/// Default cap on lines of a single document.
pub const DEFAULT_MAX_LINES_PER_DOCUMENT: usize = 1000;

/// Coordinator settings.
///
/// # Examples
/// ```
/// use fleet_backend::domain::{CoordinateDefaults, SyncPolicy};
///
/// let policy = SyncPolicy::default().with_coordinate_defaults(CoordinateDefaults::Null);
/// assert_eq!(policy.fallback_login().as_str(), "device-sync");
/// assert_eq!(policy.coordinate_defaults(), CoordinateDefaults::Null);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncPolicy {
    fallback_login: AccountLogin,
    coordinate_defaults: CoordinateDefaults,
    max_documents_per_batch: usize,
    max_lines_per_document: usize,
}

impl Default for SyncPolicy {
    fn default() -> Self {
        Self {
            fallback_login: AccountLogin::default_fallback(),
            coordinate_defaults: CoordinateDefaults::default(),
            max_documents_per_batch: DEFAULT_MAX_DOCUMENTS_PER_BATCH,
            max_lines_per_document: DEFAULT_MAX_LINES_PER_DOCUMENT,
        }
    }
}

impl SyncPolicy {
    /// Use `login` for the service account owning anonymous devices.
    #[must_use]
    pub fn with_fallback_login(mut self, login: AccountLogin) -> Self {
        self.fallback_login = login;
        self
    }

    /// Set how absent header coordinates are stored.
    #[must_use]
    pub fn with_coordinate_defaults(mut self, defaults: CoordinateDefaults) -> Self {
        self.coordinate_defaults = defaults;
        self
    }

    /// Set batch size limits. Zero disables the respective limit.
    #[must_use]
    pub fn with_limits(mut self, max_documents_per_batch: usize, max_lines_per_document: usize) -> Self {
        self.max_documents_per_batch = max_documents_per_batch;
        self.max_lines_per_document = max_lines_per_document;
        self
    }

    /// Login of the fallback service account.
    #[must_use]
    pub fn fallback_login(&self) -> &AccountLogin {
        &self.fallback_login
    }

    /// Header coordinate policy.
    #[must_use]
    pub fn coordinate_defaults(&self) -> CoordinateDefaults {
        self.coordinate_defaults
    }

    /// Document cap per batch, if enabled.
    #[must_use]
    pub fn max_documents_per_batch(&self) -> Option<usize> {
        Some(self.max_documents_per_batch).filter(|limit| *limit > 0)
    }

    /// Line cap per document, if enabled.
    #[must_use]
    pub fn max_lines_per_document(&self) -> Option<usize> {
        Some(self.max_lines_per_document).filter(|limit| *limit > 0)
    }
}
