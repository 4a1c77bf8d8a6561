//! Test helpers for inbound HTTP components.

use actix_session::{SessionMiddleware, storage::CookieSessionStore};
use actix_web::body::MessageBody;
use actix_web::cookie::{Cookie, Key};
use actix_web::dev::{Service, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpResponse, test, web};

use crate::domain::{AccountId, Error};
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::sync::{sync_device, sync_json_config};

/// Route that stands in for the authentication service in tests.
pub const SIGN_IN_PATH: &str = "/test/sign-in";

/// Build a session middleware configured for tests.
///
/// - Generates a fresh signing/encryption key per invocation.
/// - Sets the cookie name to `session` and disables the `Secure` flag for
///   local HTTP tests.
pub fn test_session_middleware() -> SessionMiddleware<CookieSessionStore> {
    SessionMiddleware::builder(CookieSessionStore::default(), Key::generate())
        .cookie_name("session".to_owned())
        .cookie_secure(false)
        .build()
}

async fn sign_in(session: SessionContext, path: web::Path<String>) -> Result<HttpResponse, Error> {
    let account = AccountId::new(path.into_inner())
        .map_err(|error| Error::invalid_request(error.to_string()))?;
    session.persist_account(&account)?;
    Ok(HttpResponse::NoContent().finish())
}

/// App exposing the sync route under `/api/v1` plus a sign-in helper.
pub fn sync_test_app(
    state: HttpState,
    json_limit_bytes: usize,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new()
        .app_data(web::Data::new(state))
        .app_data(sync_json_config(json_limit_bytes))
        .wrap(test_session_middleware())
        .route(&format!("{SIGN_IN_PATH}/{{account}}"), web::post().to(sign_in))
        .service(web::scope("/api/v1").service(sync_device))
}

/// Sign in as `account` and return the issued session cookie.
pub async fn session_cookie<S, B>(app: &S, account: AccountId) -> Cookie<'static>
where
    S: Service<actix_http::Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let response = test::call_service(
        app,
        test::TestRequest::post()
            .uri(&format!("{SIGN_IN_PATH}/{account}"))
            .to_request(),
    )
    .await;
    assert!(response.status().is_success(), "sign-in route succeeds");
    response
        .response()
        .cookies()
        .find(|cookie| cookie.name() == "session")
        .map(Cookie::into_owned)
        .expect("session cookie issued")
}
