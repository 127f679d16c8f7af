//! # Accounts
//!
//! Login and logout. These routes are public; everything else requires the
//! session they create.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use axum_extra::extract::{Form, FormRejection};
use serde::{Deserialize, Serialize};
use taxi_core::LoginForm;
use utoipa::ToSchema;

use super::found;
use crate::auth::{session_cookie, session_token};
use crate::error::AppError;
use crate::extractors::{extract_form, extract_query};
use crate::session::SESSION_COOKIE;
use crate::state::{AppState, LOGIN_URL};

/// Query string of the login page.
#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    #[serde(default)]
    pub next: Option<String>,
}

/// What the login page expects to be posted back.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginPage {
    pub fields: Vec<String>,
    /// Where a successful login will redirect.
    pub next: Option<String>,
}

/// Build the accounts router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/accounts/login", get(login_page).post(login))
        .route("/accounts/logout", post(logout))
}

/// GET /accounts/login - Describe the login form.
#[utoipa::path(
    get,
    path = "/accounts/login",
    params(("next" = Option<String>, Query, description = "Path to return to after login")),
    responses((status = 200, description = "Login form", body = LoginPage)),
    tag = "accounts"
)]
pub(crate) async fn login_page(
    query: Result<Query<LoginQuery>, QueryRejection>,
) -> Result<Json<LoginPage>, AppError> {
    let query = extract_query(query)?;
    Ok(Json(LoginPage {
        fields: vec!["username".to_string(), "password".to_string()],
        next: query.next,
    }))
}

/// POST /accounts/login - Start a session.
#[utoipa::path(
    post,
    path = "/accounts/login",
    request_body(content_type = "application/x-www-form-urlencoded", description = "username, password, optional next"),
    responses(
        (status = 302, description = "Logged in; redirect to `next` or `/`"),
        (status = 422, description = "Wrong credentials", body = crate::error::ErrorBody),
    ),
    tag = "accounts"
)]
pub(crate) async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    form: Result<Form<LoginForm>, FormRejection>,
) -> Result<(CookieJar, Response), AppError> {
    let form = extract_form(form)?;
    let (username, password) = form.clean()?;

    let Some(driver) = state.authenticate(username, password) else {
        tracing::info!(username = %username, "failed login attempt");
        return Err(LoginForm::invalid_credentials().into());
    };

    if let Some(previous) = jar.get(SESSION_COOKIE) {
        state.sessions.remove(previous.value());
    }
    let token = state.sessions.create(driver.id);
    tracing::info!(driver_id = %driver.id, "driver logged in");

    let jar = jar.add(session_cookie(token, state.config.session_cookie_secure));
    Ok((jar, found(form.redirect_target("/"))))
}

/// POST /accounts/logout - End the session.
#[utoipa::path(
    post,
    path = "/accounts/logout",
    responses((status = 302, description = "Logged out; redirect to the login page")),
    tag = "accounts"
)]
pub(crate) async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
) -> (CookieJar, Response) {
    if let Some(token) = session_token(&jar, &headers) {
        if let Some(session) = state.sessions.get(&token) {
            tracing::info!(driver_id = %session.driver_id, "driver logged out");
        }
        state.sessions.remove(&token);
    }
    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    (jar, found(LOGIN_URL))
}
