//! # Driver API
//!
//! List with license-number search, detail with assigned cars, registration,
//! license update and delete. Deleting a driver unassigns it from every car
//! and ends its sessions.

use axum::extract::rejection::{PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use axum_extra::extract::{Form, FormRejection};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use taxi_core::search::search_drivers;
use taxi_core::{
    CarId, Driver, DriverCreationForm, DriverId, DriverLicenseUpdateForm, DriverSearchForm,
};
use utoipa::ToSchema;

use super::cars::CarSummary;
use super::{found, persist_failed};
use crate::auth::CurrentDriver;
use crate::error::AppError;
use crate::extractors::{extract_form, extract_id, extract_query};
use crate::pagination::{paginate, PageInfo, PageQuery};
use crate::state::{AppState, Rollback};

const LIST_URL: &str = "/drivers";

/// A driver as embedded in a car.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DriverSummary {
    pub id: i64,
    pub username: String,
    pub full_name: String,
    pub license_number: String,
}

impl From<&Driver> for DriverSummary {
    fn from(d: &Driver) -> Self {
        Self {
            id: d.id.get(),
            username: d.username.clone(),
            full_name: d.full_name(),
            license_number: d.license_number.clone(),
        }
    }
}

/// A driver as returned by the API. The password hash is never exposed.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DriverView {
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub license_number: String,
    pub is_superuser: bool,
    pub date_joined: DateTime<Utc>,
}

impl From<Driver> for DriverView {
    fn from(d: Driver) -> Self {
        Self {
            id: d.id.get(),
            username: d.username,
            first_name: d.first_name,
            last_name: d.last_name,
            email: d.email,
            license_number: d.license_number,
            is_superuser: d.is_superuser,
            date_joined: d.date_joined,
        }
    }
}

/// Driver detail page.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DriverDetail {
    #[serde(flatten)]
    pub driver: DriverView,
    /// Cars this driver is assigned to.
    pub cars: Vec<CarSummary>,
}

/// One page of the driver list.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DriverList {
    pub results: Vec<DriverView>,
    /// The license-number search as applied, if any.
    pub license_number: Option<String>,
    #[serde(flatten)]
    pub pagination: PageInfo,
}

/// Build the drivers router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/drivers", get(list_drivers))
        .route("/drivers/create", post(create_driver))
        .route("/drivers/{id}", get(get_driver))
        .route("/drivers/{id}/update", post(update_license))
        .route("/drivers/{id}/delete", post(delete_driver))
}

fn not_found(id: DriverId) -> AppError {
    AppError::NotFound(format!("driver {id} not found"))
}

/// GET /drivers - List drivers, optionally filtered by license number.
#[utoipa::path(
    get,
    path = "/drivers",
    params(
        ("license_number" = Option<String>, Query, description = "Case-sensitive license number substring"),
        ("page" = Option<String>, Query, description = "1-based page number or `last`"),
    ),
    responses(
        (status = 200, description = "Driver page", body = DriverList),
        (status = 404, description = "No such page", body = crate::error::ErrorBody),
        (status = 422, description = "Search value too long", body = crate::error::ErrorBody),
    ),
    tag = "drivers"
)]
pub(crate) async fn list_drivers(
    State(state): State<AppState>,
    search: Result<Query<DriverSearchForm>, QueryRejection>,
    page: Result<Query<PageQuery>, QueryRejection>,
) -> Result<Json<DriverList>, AppError> {
    let license_number = extract_query(search)?.clean()?;
    let page = extract_query(page)?;

    let matches = search_drivers(state.drivers.list(), license_number.as_deref());
    let (results, pagination) = paginate(matches, page.page.as_deref())?;

    Ok(Json(DriverList {
        results: results.into_iter().map(DriverView::from).collect(),
        license_number,
        pagination,
    }))
}

/// GET /drivers/{id} - Driver detail with assigned cars.
#[utoipa::path(
    get,
    path = "/drivers/{id}",
    params(("id" = i64, Path, description = "Driver ID")),
    responses(
        (status = 200, description = "Driver found", body = DriverDetail),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "drivers"
)]
pub(crate) async fn get_driver(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<DriverDetail>, AppError> {
    let id = DriverId::new(extract_id(path)?);
    let driver = state.drivers.get(id).ok_or_else(|| not_found(id))?;

    let cars = state.manufacturers.read_with(|manufacturers| {
        state.cars.read_with(|cars| {
            cars.values()
                .filter(|car| car.has_driver(id))
                .map(|car| CarSummary {
                    id: car.id.get(),
                    model: car.model.clone(),
                    manufacturer: manufacturers
                        .get(&car.manufacturer_id)
                        .map(|m| m.name.clone())
                        .unwrap_or_default(),
                })
                .collect()
        })
    });

    Ok(Json(DriverDetail {
        driver: driver.into(),
        cars,
    }))
}

/// POST /drivers/create - Register a driver.
#[utoipa::path(
    post,
    path = "/drivers/create",
    request_body(
        content_type = "application/x-www-form-urlencoded",
        description = "username, password1, password2, license_number, first_name, last_name, email"
    ),
    responses(
        (status = 302, description = "Created; redirect to the driver detail"),
        (status = 422, description = "Invalid form", body = crate::error::ErrorBody),
    ),
    tag = "drivers"
)]
pub(crate) async fn create_driver(
    State(state): State<AppState>,
    actor: CurrentDriver,
    form: Result<Form<DriverCreationForm>, FormRejection>,
) -> Result<Response, AppError> {
    let cleaned = extract_form(form)?.clean(&state)?;
    let record = state.insert_driver(cleaned, false)?;

    if let Some(pool) = &state.db_pool {
        crate::db::drivers::insert(pool, &record)
            .await
            .map_err(|e| persist_failed(&state, Rollback::DriverCreated(record.id), e))?;
    }

    tracing::info!(driver_id = %record.id, by = %actor.username, "driver registered");
    Ok(found(format!("{LIST_URL}/{}", record.id)))
}

/// POST /drivers/{id}/update - Change a driver's license number.
#[utoipa::path(
    post,
    path = "/drivers/{id}/update",
    params(("id" = i64, Path, description = "Driver ID")),
    request_body(content_type = "application/x-www-form-urlencoded", description = "license_number"),
    responses(
        (status = 302, description = "Updated; redirect to the list"),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid form", body = crate::error::ErrorBody),
    ),
    tag = "drivers"
)]
pub(crate) async fn update_license(
    State(state): State<AppState>,
    actor: CurrentDriver,
    path: Result<Path<i64>, PathRejection>,
    form: Result<Form<DriverLicenseUpdateForm>, FormRejection>,
) -> Result<Response, AppError> {
    let id = DriverId::new(extract_id(path)?);
    if !state.drivers.contains(id) {
        return Err(not_found(id));
    }
    let license = extract_form(form)?.clean(&state, id)?;
    let (previous, record) = state
        .update_license(id, license)
        .ok_or_else(|| not_found(id))??;

    if let Some(pool) = &state.db_pool {
        crate::db::drivers::update_license(pool, id, &record.license_number)
            .await
            .map_err(|e| persist_failed(&state, Rollback::DriverChanged(previous), e))?;
    }

    tracing::info!(driver_id = %id, by = %actor.username, "driver license updated");
    Ok(found(LIST_URL))
}

/// POST /drivers/{id}/delete - Delete a driver.
#[utoipa::path(
    post,
    path = "/drivers/{id}/delete",
    params(("id" = i64, Path, description = "Driver ID")),
    responses(
        (status = 302, description = "Deleted; redirect to the list"),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "drivers"
)]
pub(crate) async fn delete_driver(
    State(state): State<AppState>,
    actor: CurrentDriver,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Response, AppError> {
    let id = DriverId::new(extract_id(path)?);
    let (removed, cars) = state.delete_driver(id).ok_or_else(|| not_found(id))?;
    let unassigned: Vec<CarId> = cars.iter().map(|car| car.id).collect();
    let cars_unassigned = unassigned.len();

    if let Some(pool) = &state.db_pool {
        crate::db::drivers::delete(pool, id)
            .await
            .map_err(|e| persist_failed(&state, Rollback::DriverDeleted(removed, unassigned), e))?;
    }

    tracing::info!(
        driver_id = %id,
        cars_unassigned,
        by = %actor.username,
        "driver deleted"
    );
    Ok(found(LIST_URL))
}
