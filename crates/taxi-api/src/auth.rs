//! # Authentication Middleware
//!
//! Session authentication for the fleet routes. A request is logged in when
//! it carries a live session token, either in the `sessionid` cookie or as
//! `Authorization: Bearer <token>`, and the session's driver is still active.
//!
//! Anonymous requests to protected routes are redirected to the login page
//! with the original path in `next`. Health probes, `/metrics` and the
//! account endpoints are mounted outside this middleware.

use axum::extract::{FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::http::{header, HeaderMap, Uri};
use axum::middleware::Next;
use axum::response::Response;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use taxi_core::DriverId;

use crate::error::AppError;
use crate::routes::found;
use crate::session::SESSION_COOKIE;
use crate::state::{AppState, LOGIN_URL};

/// The logged-in driver, injected by [`require_login`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentDriver {
    pub id: DriverId,
    pub username: String,
    pub is_superuser: bool,
}

/// The session token the request authenticated with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionToken(pub String);

impl<S: Send + Sync> FromRequestParts<S> for CurrentDriver {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentDriver>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("login required".to_string()))
    }
}

impl<S: Send + Sync> FromRequestParts<S> for SessionToken {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SessionToken>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("login required".to_string()))
    }
}

/// Login-required middleware.
///
/// Resolves the session and injects [`CurrentDriver`] and [`SessionToken`]
/// into request extensions, or redirects to the login page.
pub async fn require_login(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let token = session_token(&jar, request.headers());
    let driver = token.as_deref().and_then(|token| {
        let session = state.sessions.get(token)?;
        state
            .drivers
            .get(session.driver_id)
            .filter(|driver| driver.is_active)
    });

    match (token, driver) {
        (Some(token), Some(driver)) => {
            request.extensions_mut().insert(CurrentDriver {
                id: driver.id,
                username: driver.username,
                is_superuser: driver.is_superuser,
            });
            request.extensions_mut().insert(SessionToken(token));
            next.run(request).await
        }
        _ => {
            tracing::debug!(path = %request.uri().path(), "anonymous request redirected to login");
            redirect_to_login(request.uri())
        }
    }
}

/// The session token from the cookie, falling back to a bearer header.
pub fn session_token(jar: &CookieJar, headers: &HeaderMap) -> Option<String> {
    jar.get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|token| !token.is_empty())
        .or_else(|| bearer_token(headers))
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(String::from)
}

fn redirect_to_login(uri: &Uri) -> Response {
    let target = uri
        .path_and_query()
        .map_or_else(|| uri.path(), |pq| pq.as_str());
    let next: String = url::form_urlencoded::byte_serialize(target.as_bytes()).collect();
    found(format!("{LOGIN_URL}?next={next}"))
}

/// The session cookie carrying `token`.
pub fn session_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .path("/")
        .build()
}
