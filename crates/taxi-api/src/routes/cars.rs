//! # Car API
//!
//! List with model search, detail, create, update, delete, and the
//! assign/unassign toggle for the logged-in driver.

use std::collections::BTreeMap;

use axum::extract::rejection::{PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use axum_extra::extract::{Form, FormRejection};
use serde::{Deserialize, Serialize};
use taxi_core::search::search_cars;
use taxi_core::{
    Car, CarForm, CarId, CarSearchForm, Driver, DriverId, Manufacturer, ManufacturerId,
};
use utoipa::ToSchema;

use super::drivers::DriverSummary;
use super::manufacturers::ManufacturerView;
use super::{found, persist_failed};
use crate::auth::CurrentDriver;
use crate::error::AppError;
use crate::extractors::{extract_form, extract_id, extract_query};
use crate::pagination::{paginate, PageInfo, PageQuery};
use crate::state::{AppState, Rollback};

const LIST_URL: &str = "/cars";

/// A car with its manufacturer and drivers resolved.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CarView {
    pub id: i64,
    pub model: String,
    pub manufacturer: ManufacturerView,
    pub drivers: Vec<DriverSummary>,
}

impl CarView {
    /// `None` when the manufacturer is gone.
    fn build(
        car: Car,
        manufacturers: &BTreeMap<ManufacturerId, Manufacturer>,
        drivers: &BTreeMap<DriverId, Driver>,
    ) -> Option<Self> {
        let manufacturer = manufacturers.get(&car.manufacturer_id)?.clone();
        Some(Self {
            id: car.id.get(),
            model: car.model,
            manufacturer: manufacturer.into(),
            drivers: car
                .drivers
                .iter()
                .filter_map(|id| drivers.get(id))
                .map(DriverSummary::from)
                .collect(),
        })
    }
}

/// Car detail page.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CarDetail {
    #[serde(flatten)]
    pub car: CarView,
    /// Whether the logged-in driver is assigned to this car.
    pub assigned: bool,
}

/// A car as listed on a driver's page.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CarSummary {
    pub id: i64,
    pub model: String,
    pub manufacturer: String,
}

/// One page of the car list.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CarList {
    pub results: Vec<CarView>,
    /// The model search as applied, if any.
    pub model: Option<String>,
    #[serde(flatten)]
    pub pagination: PageInfo,
}

/// Build the cars router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/cars", get(list_cars))
        .route("/cars/create", post(create_car))
        .route("/cars/{id}", get(get_car))
        .route("/cars/{id}/update", post(update_car))
        .route("/cars/{id}/delete", post(delete_car))
        .route("/cars/{id}/toggle-assign", post(toggle_assign))
}

fn not_found(id: CarId) -> AppError {
    AppError::NotFound(format!("car {id} not found"))
}

/// Resolve manufacturers and drivers for a batch of cars in one snapshot.
pub(crate) fn car_views(state: &AppState, cars: Vec<Car>) -> Vec<CarView> {
    state.manufacturers.read_with(|manufacturers| {
        state.drivers.read_with(|drivers| {
            cars.into_iter()
                .filter_map(|car| CarView::build(car, manufacturers, drivers))
                .collect()
        })
    })
}

/// GET /cars - List cars, optionally filtered by model.
#[utoipa::path(
    get,
    path = "/cars",
    params(
        ("model" = Option<String>, Query, description = "Case-insensitive model substring"),
        ("page" = Option<String>, Query, description = "1-based page number or `last`"),
    ),
    responses(
        (status = 200, description = "Car page", body = CarList),
        (status = 302, description = "Not logged in; redirect to login"),
        (status = 404, description = "No such page", body = crate::error::ErrorBody),
        (status = 422, description = "Search value too long", body = crate::error::ErrorBody),
    ),
    tag = "cars"
)]
pub(crate) async fn list_cars(
    State(state): State<AppState>,
    search: Result<Query<CarSearchForm>, QueryRejection>,
    page: Result<Query<PageQuery>, QueryRejection>,
) -> Result<Json<CarList>, AppError> {
    let model = extract_query(search)?.clean()?;
    let page = extract_query(page)?;

    let matches = search_cars(state.cars.list(), model.as_deref());
    let (cars, pagination) = paginate(matches, page.page.as_deref())?;

    Ok(Json(CarList {
        results: car_views(&state, cars),
        model,
        pagination,
    }))
}

/// GET /cars/{id} - Car detail.
#[utoipa::path(
    get,
    path = "/cars/{id}",
    params(("id" = i64, Path, description = "Car ID")),
    responses(
        (status = 200, description = "Car found", body = CarDetail),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "cars"
)]
pub(crate) async fn get_car(
    State(state): State<AppState>,
    driver: CurrentDriver,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<CarDetail>, AppError> {
    let id = CarId::new(extract_id(path)?);
    let car = state.cars.get(id).ok_or_else(|| not_found(id))?;
    let assigned = car.has_driver(driver.id);
    let car = car_views(&state, vec![car])
        .pop()
        .ok_or_else(|| not_found(id))?;
    Ok(Json(CarDetail { car, assigned }))
}

/// POST /cars/create - Create a car.
#[utoipa::path(
    post,
    path = "/cars/create",
    request_body(content_type = "application/x-www-form-urlencoded", description = "model, manufacturer, drivers (repeatable)"),
    responses(
        (status = 302, description = "Created; redirect to the list"),
        (status = 422, description = "Invalid form", body = crate::error::ErrorBody),
    ),
    tag = "cars"
)]
pub(crate) async fn create_car(
    State(state): State<AppState>,
    driver: CurrentDriver,
    form: Result<Form<CarForm>, FormRejection>,
) -> Result<Response, AppError> {
    let cleaned = extract_form(form)?.clean(&state)?;
    let record = state.insert_car(cleaned)?;

    if let Some(pool) = &state.db_pool {
        crate::db::cars::insert(pool, &record)
            .await
            .map_err(|e| persist_failed(&state, Rollback::CarCreated(record.id), e))?;
    }

    tracing::info!(car_id = %record.id, by = %driver.username, "car created");
    Ok(found(LIST_URL))
}

/// POST /cars/{id}/update - Replace a car's fields.
#[utoipa::path(
    post,
    path = "/cars/{id}/update",
    params(("id" = i64, Path, description = "Car ID")),
    request_body(content_type = "application/x-www-form-urlencoded", description = "model, manufacturer, drivers (repeatable)"),
    responses(
        (status = 302, description = "Updated; redirect to the list"),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid form", body = crate::error::ErrorBody),
    ),
    tag = "cars"
)]
pub(crate) async fn update_car(
    State(state): State<AppState>,
    driver: CurrentDriver,
    path: Result<Path<i64>, PathRejection>,
    form: Result<Form<CarForm>, FormRejection>,
) -> Result<Response, AppError> {
    let id = CarId::new(extract_id(path)?);
    if !state.cars.contains(id) {
        return Err(not_found(id));
    }
    let cleaned = extract_form(form)?.clean(&state)?;
    let (previous, record) = state.replace_car(id, cleaned).ok_or_else(|| not_found(id))??;

    if let Some(pool) = &state.db_pool {
        crate::db::cars::update(pool, &record)
            .await
            .map_err(|e| persist_failed(&state, Rollback::CarChanged(previous), e))?;
    }

    tracing::info!(car_id = %id, by = %driver.username, "car updated");
    Ok(found(LIST_URL))
}

/// POST /cars/{id}/delete - Delete a car.
#[utoipa::path(
    post,
    path = "/cars/{id}/delete",
    params(("id" = i64, Path, description = "Car ID")),
    responses(
        (status = 302, description = "Deleted; redirect to the list"),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "cars"
)]
pub(crate) async fn delete_car(
    State(state): State<AppState>,
    driver: CurrentDriver,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Response, AppError> {
    let id = CarId::new(extract_id(path)?);
    let removed = state.cars.remove(id).ok_or_else(|| not_found(id))?;

    if let Some(pool) = &state.db_pool {
        crate::db::cars::delete(pool, id)
            .await
            .map_err(|e| persist_failed(&state, Rollback::CarDeleted(removed), e))?;
    }

    tracing::info!(car_id = %id, by = %driver.username, "car deleted");
    Ok(found(LIST_URL))
}

/// POST /cars/{id}/toggle-assign - Assign or unassign the logged-in driver.
#[utoipa::path(
    post,
    path = "/cars/{id}/toggle-assign",
    params(("id" = i64, Path, description = "Car ID")),
    responses(
        (status = 302, description = "Toggled; redirect to the car detail"),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "cars"
)]
pub(crate) async fn toggle_assign(
    State(state): State<AppState>,
    driver: CurrentDriver,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Response, AppError> {
    let id = CarId::new(extract_id(path)?);
    let (_, assigned) = state
        .toggle_assignment(id, driver.id)
        .ok_or_else(|| not_found(id))?;

    if let Some(pool) = &state.db_pool {
        crate::db::cars::set_assignment(pool, id, driver.id, assigned)
            .await
            .map_err(|e| {
                let undo = Rollback::AssignmentToggled {
                    car: id,
                    driver: driver.id,
                };
                persist_failed(&state, undo, e)
            })?;
    }

    tracing::info!(car_id = %id, driver_id = %driver.id, assigned, "car assignment toggled");
    Ok(found(format!("{LIST_URL}/{id}")))
}
