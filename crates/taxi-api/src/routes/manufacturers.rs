//! # Manufacturer API
//!
//! List with name search, create, update and delete. Deleting a
//! manufacturer deletes its cars.

use axum::extract::rejection::{PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use axum_extra::extract::{Form, FormRejection};
use serde::{Deserialize, Serialize};
use taxi_core::search::search_manufacturers;
use taxi_core::{Manufacturer, ManufacturerForm, ManufacturerId, ManufacturerSearchForm};
use utoipa::ToSchema;

use super::{found, persist_failed};
use crate::auth::CurrentDriver;
use crate::error::AppError;
use crate::extractors::{extract_form, extract_id, extract_query};
use crate::pagination::{paginate, PageInfo, PageQuery};
use crate::state::{AppState, Rollback};

const LIST_URL: &str = "/manufacturers";

/// A manufacturer as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ManufacturerView {
    pub id: i64,
    pub name: String,
    pub country: String,
}

impl From<Manufacturer> for ManufacturerView {
    fn from(m: Manufacturer) -> Self {
        Self {
            id: m.id.get(),
            name: m.name,
            country: m.country,
        }
    }
}

/// One page of the manufacturer list.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ManufacturerList {
    pub results: Vec<ManufacturerView>,
    /// The name search as applied, if any.
    pub name: Option<String>,
    #[serde(flatten)]
    pub pagination: PageInfo,
}

/// Build the manufacturers router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/manufacturers", get(list_manufacturers))
        .route("/manufacturers/create", post(create_manufacturer))
        .route("/manufacturers/{id}/update", post(update_manufacturer))
        .route("/manufacturers/{id}/delete", post(delete_manufacturer))
}

fn not_found(id: ManufacturerId) -> AppError {
    AppError::NotFound(format!("manufacturer {id} not found"))
}

/// GET /manufacturers - List manufacturers, optionally filtered by name.
#[utoipa::path(
    get,
    path = "/manufacturers",
    params(
        ("name" = Option<String>, Query, description = "Case-insensitive name substring"),
        ("page" = Option<String>, Query, description = "1-based page number or `last`"),
    ),
    responses(
        (status = 200, description = "Manufacturer page", body = ManufacturerList),
        (status = 404, description = "No such page", body = crate::error::ErrorBody),
        (status = 422, description = "Search value too long", body = crate::error::ErrorBody),
    ),
    tag = "manufacturers"
)]
pub(crate) async fn list_manufacturers(
    State(state): State<AppState>,
    search: Result<Query<ManufacturerSearchForm>, QueryRejection>,
    page: Result<Query<PageQuery>, QueryRejection>,
) -> Result<Json<ManufacturerList>, AppError> {
    let name = extract_query(search)?.clean()?;
    let page = extract_query(page)?;

    let matches = search_manufacturers(state.manufacturers.list(), name.as_deref());
    let (results, pagination) = paginate(matches, page.page.as_deref())?;

    Ok(Json(ManufacturerList {
        results: results.into_iter().map(ManufacturerView::from).collect(),
        name,
        pagination,
    }))
}

/// POST /manufacturers/create - Create a manufacturer.
#[utoipa::path(
    post,
    path = "/manufacturers/create",
    request_body(content_type = "application/x-www-form-urlencoded", description = "name, country"),
    responses(
        (status = 302, description = "Created; redirect to the list"),
        (status = 422, description = "Invalid form", body = crate::error::ErrorBody),
    ),
    tag = "manufacturers"
)]
pub(crate) async fn create_manufacturer(
    State(state): State<AppState>,
    driver: CurrentDriver,
    form: Result<Form<ManufacturerForm>, FormRejection>,
) -> Result<Response, AppError> {
    let cleaned = extract_form(form)?.clean(&state, None)?;
    let record = state.insert_manufacturer(cleaned)?;

    if let Some(pool) = &state.db_pool {
        crate::db::manufacturers::insert(pool, &record)
            .await
            .map_err(|e| persist_failed(&state, Rollback::ManufacturerCreated(record.id), e))?;
    }

    tracing::info!(manufacturer_id = %record.id, by = %driver.username, "manufacturer created");
    Ok(found(LIST_URL))
}

/// POST /manufacturers/{id}/update - Replace a manufacturer's fields.
#[utoipa::path(
    post,
    path = "/manufacturers/{id}/update",
    params(("id" = i64, Path, description = "Manufacturer ID")),
    request_body(content_type = "application/x-www-form-urlencoded", description = "name, country"),
    responses(
        (status = 302, description = "Updated; redirect to the list"),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid form", body = crate::error::ErrorBody),
    ),
    tag = "manufacturers"
)]
pub(crate) async fn update_manufacturer(
    State(state): State<AppState>,
    driver: CurrentDriver,
    path: Result<Path<i64>, PathRejection>,
    form: Result<Form<ManufacturerForm>, FormRejection>,
) -> Result<Response, AppError> {
    let id = ManufacturerId::new(extract_id(path)?);
    if !state.manufacturers.contains(id) {
        return Err(not_found(id));
    }
    let cleaned = extract_form(form)?.clean(&state, Some(id))?;
    let (previous, record) = state
        .replace_manufacturer(id, cleaned)
        .ok_or_else(|| not_found(id))??;

    if let Some(pool) = &state.db_pool {
        crate::db::manufacturers::update(pool, &record)
            .await
            .map_err(|e| persist_failed(&state, Rollback::ManufacturerChanged(previous), e))?;
    }

    tracing::info!(manufacturer_id = %id, by = %driver.username, "manufacturer updated");
    Ok(found(LIST_URL))
}

/// POST /manufacturers/{id}/delete - Delete a manufacturer and its cars.
#[utoipa::path(
    post,
    path = "/manufacturers/{id}/delete",
    params(("id" = i64, Path, description = "Manufacturer ID")),
    responses(
        (status = 302, description = "Deleted; redirect to the list"),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "manufacturers"
)]
pub(crate) async fn delete_manufacturer(
    State(state): State<AppState>,
    driver: CurrentDriver,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Response, AppError> {
    let id = ManufacturerId::new(extract_id(path)?);
    let (removed, cars) = state.delete_manufacturer(id).ok_or_else(|| not_found(id))?;
    let cars_deleted = cars.len();

    if let Some(pool) = &state.db_pool {
        crate::db::manufacturers::delete(pool, id)
            .await
            .map_err(|e| persist_failed(&state, Rollback::ManufacturerDeleted(removed, cars), e))?;
    }

    tracing::info!(
        manufacturer_id = %id,
        cars_deleted,
        by = %driver.username,
        "manufacturer deleted"
    );
    Ok(found(LIST_URL))
}
