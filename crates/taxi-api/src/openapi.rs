//! # OpenAPI Specification Assembly
//!
//! Assembles all utoipa-documented routes into a single OpenAPI document
//! served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::session::SESSION_COOKIE;
use crate::state::AppState;

/// Adds the session cookie and bearer token security schemes.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "session_cookie",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new(SESSION_COOKIE))),
            );
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .description(Some(
                            "The session token returned in the sessionid cookie at login.",
                        ))
                        .build(),
                ),
            );
        }
    }
}

/// Assembled OpenAPI spec for the entire API surface.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Taxi Fleet API",
        description = "Manufacturers, cars and drivers of a taxi fleet.\n\nAll fleet routes require a login session. Log in with `POST /accounts/login`; the session token travels in the `sessionid` cookie or as `Authorization: Bearer <token>`. Form submissions are `application/x-www-form-urlencoded` and answer with a 302 redirect on success or a 422 with per-field messages.",
    ),
    security(
        ("session_cookie" = []),
        ("bearer_auth" = [])
    ),
    paths(
        // -- Accounts --
        crate::routes::accounts::login_page,
        crate::routes::accounts::login,
        crate::routes::accounts::logout,
        // -- Index --
        crate::routes::index::index,
        // -- Manufacturers --
        crate::routes::manufacturers::list_manufacturers,
        crate::routes::manufacturers::create_manufacturer,
        crate::routes::manufacturers::update_manufacturer,
        crate::routes::manufacturers::delete_manufacturer,
        // -- Cars --
        crate::routes::cars::list_cars,
        crate::routes::cars::get_car,
        crate::routes::cars::create_car,
        crate::routes::cars::update_car,
        crate::routes::cars::delete_car,
        crate::routes::cars::toggle_assign,
        // -- Drivers --
        crate::routes::drivers::list_drivers,
        crate::routes::drivers::get_driver,
        crate::routes::drivers::create_driver,
        crate::routes::drivers::update_license,
        crate::routes::drivers::delete_driver,
    ),
    components(
        schemas(
            crate::error::ErrorBody,
            crate::error::ErrorDetail,
            crate::pagination::PageInfo,
            crate::routes::accounts::LoginPage,
            crate::routes::index::IndexView,
            crate::routes::manufacturers::ManufacturerView,
            crate::routes::manufacturers::ManufacturerList,
            crate::routes::cars::CarView,
            crate::routes::cars::CarDetail,
            crate::routes::cars::CarSummary,
            crate::routes::cars::CarList,
            crate::routes::drivers::DriverSummary,
            crate::routes::drivers::DriverView,
            crate::routes::drivers::DriverDetail,
            crate::routes::drivers::DriverList,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "accounts", description = "Login and logout"),
        (name = "index", description = "Fleet overview"),
        (name = "manufacturers", description = "Car manufacturers"),
        (name = "cars", description = "Cars and driver assignment"),
        (name = "drivers", description = "Driver accounts"),
    )
)]
pub struct ApiDoc;

/// Router serving the OpenAPI document.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
