//! Session helpers to keep HTTP handlers free of framework-specific logic.
//!
//! The authentication service issues a signed session cookie carrying the
//! account id. The sync endpoint only reads it: a missing or tampered value
//! makes the push anonymous rather than failing it.

use actix_session::Session;
use actix_web::{FromRequest, HttpRequest, dev::Payload};
use futures_util::future::LocalBoxFuture;

use crate::domain::{AccountId, Error, SyncContext};

pub(crate) const ACCOUNT_ID_KEY: &str = "account_id";

/// Newtype wrapper that exposes higher-level session operations.
#[derive(Clone)]
pub struct SessionContext(Session);

impl SessionContext {
    /// Construct a new wrapper from the underlying Actix session.
    pub fn new(session: Session) -> Self {
        Self(session)
    }

    /// Persist the authenticated account id in the session cookie.
    ///
    /// Sign-in belongs to the authentication service; this stands in for it
    /// in tests.
    #[cfg(any(test, feature = "test-support"))]
    pub fn persist_account(&self, account_id: &AccountId) -> Result<(), Error> {
        self.0
            .insert(ACCOUNT_ID_KEY, account_id.to_string())
            .map_err(|error| Error::internal(format!("failed to persist session: {error}")))
    }

    /// Fetch the session account id, if present and well formed.
    pub fn account_id(&self) -> Result<Option<AccountId>, Error> {
        let id = self
            .0
            .get::<String>(ACCOUNT_ID_KEY)
            .map_err(|error| Error::internal(format!("failed to read session: {error}")))?;
        Ok(id.and_then(|raw| match AccountId::new(&raw) {
            Ok(id) => Some(id),
            Err(error) => {
                tracing::warn!("invalid account id in session cookie: {error}");
                None
            }
        }))
    }

    /// Caller identity for a sync push.
    ///
    /// Unreadable sessions degrade to anonymous so a stale cookie never
    /// blocks a device from uploading.
    pub fn sync_context(&self) -> SyncContext {
        match self.account_id() {
            Ok(account) => SyncContext::from(account),
            Err(error) => {
                tracing::warn!(%error, "ignoring unreadable session");
                SyncContext::Anonymous
            }
        }
    }
}

impl FromRequest for SessionContext {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let fut = Session::from_request(req, payload);
        Box::pin(async move { fut.await.map(SessionContext::new) })
    }
}
