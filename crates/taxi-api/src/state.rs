//! # Application State
//!
//! Shared state for the Axum application, passed to all route handlers
//! via the `State` extractor.
//!
//! ## Stores
//!
//! Each record kind lives in an in-memory [`Store`] ordered by id, so a
//! listing is always in creation order. When a database pool is configured,
//! handlers write through to Postgres after the in-memory change and the
//! stores are hydrated from it at startup.
//!
//! ## Referential integrity
//!
//! Operations that touch more than one store live on [`AppState`] and take
//! the locks in a fixed order: manufacturers, then drivers, then cars.
//!
//! - Deleting a manufacturer deletes its cars.
//! - Deleting a driver removes it from every car and ends its sessions.
//! - Usernames and license numbers are checked for uniqueness under the
//!   same write lock that inserts the driver.
//!
//! ## Failed writes
//!
//! When the database write after an in-memory change fails, the handler
//! hands the matching [`Rollback`] to [`AppState::roll_back`], which puts the
//! stores back the way they were before the request.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, OnceLock};

use chrono::Utc;
use parking_lot::RwLock;
use sqlx::PgPool;
use taxi_core::forms::{
    invalid_driver_choice, DUPLICATE_LICENSE, DUPLICATE_MANUFACTURER, DUPLICATE_USERNAME,
    INVALID_MANUFACTURER,
};
use taxi_core::{
    Car, CarId, CleanedCar, CleanedDriver, CleanedManufacturer, Driver, DriverId, FleetDirectory,
    FormErrors, LicenseNumber, Manufacturer, ManufacturerId, PasswordHash,
};

use crate::session::SessionStore;

// -- Generic In-Memory Store --------------------------------------------------

/// Thread-safe, cloneable in-memory store keyed by a typed integer id.
///
/// All operations are synchronous (the RwLock is `parking_lot`, not `tokio::sync`)
/// because the lock is never held across `.await` points. Ids are allocated
/// from a counter that always stays above the largest id inserted.
#[derive(Debug)]
pub struct Store<K, T> {
    data: Arc<RwLock<BTreeMap<K, T>>>,
    next_id: Arc<AtomicI64>,
}

impl<K, T> Clone for Store<K, T> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
            next_id: Arc::clone(&self.next_id),
        }
    }
}

impl<K, T> Store<K, T>
where
    K: Copy + Ord + From<i64> + Into<i64>,
    T: Clone,
{
    /// Create an empty store whose first allocated id is 1.
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(BTreeMap::new())),
            next_id: Arc::new(AtomicI64::new(1)),
        }
    }

    /// Insert a record under a known id, returning the previous value.
    ///
    /// Used when loading persisted records; later allocations skip past `id`.
    pub fn insert(&self, id: K, value: T) -> Option<T> {
        let raw: i64 = id.into();
        self.next_id.fetch_max(raw.saturating_add(1), Ordering::Relaxed);
        self.data.write().insert(id, value)
    }

    /// Allocate an id and insert the record `build` returns for it.
    ///
    /// `build` sees the current records and runs under the write lock, so a
    /// uniqueness check inside it cannot race another insert. When `build`
    /// fails nothing is inserted.
    pub fn insert_with<E>(
        &self,
        build: impl FnOnce(K, &BTreeMap<K, T>) -> Result<T, E>,
    ) -> Result<T, E> {
        let mut guard = self.data.write();
        let id = K::from(self.next_id.fetch_add(1, Ordering::Relaxed));
        let value = build(id, &guard)?;
        guard.insert(id, value.clone());
        Ok(value)
    }

    /// Retrieve a record by id.
    pub fn get(&self, id: K) -> Option<T> {
        self.data.read().get(&id).cloned()
    }

    /// All records in id order.
    pub fn list(&self) -> Vec<T> {
        self.data.read().values().cloned().collect()
    }

    /// Update a record in place. Returns the updated record, or `None` if not found.
    pub fn update(&self, id: K, f: impl FnOnce(&mut T)) -> Option<T> {
        let mut guard = self.data.write();
        let entry = guard.get_mut(&id)?;
        f(entry);
        Some(entry.clone())
    }

    /// Remove a record by id.
    pub fn remove(&self, id: K) -> Option<T> {
        self.data.write().remove(&id)
    }

    /// Check if a record exists.
    pub fn contains(&self, id: K) -> bool {
        self.data.read().contains_key(&id)
    }

    /// Return the number of records.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run `f` with shared access to every record.
    pub fn read_with<R>(&self, f: impl FnOnce(&BTreeMap<K, T>) -> R) -> R {
        f(&self.data.read())
    }

    /// Run `f` with exclusive access to every record.
    pub fn write_with<R>(&self, f: impl FnOnce(&mut BTreeMap<K, T>) -> R) -> R {
        f(&mut self.data.write())
    }
}

impl<K, T> Default for Store<K, T>
where
    K: Copy + Ord + From<i64> + Into<i64>,
    T: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

// -- Configuration ------------------------------------------------------------

/// Path of the login endpoint; unauthenticated requests are redirected here.
pub const LOGIN_URL: &str = "/accounts/login";

/// Application configuration.
///
/// Custom `Debug` redacts the database URL, which may embed credentials.
#[derive(Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Postgres connection string. `None` runs in-memory only.
    pub database_url: Option<String>,
    /// Mark the session cookie `Secure` (HTTPS deployments).
    pub session_cookie_secure: bool,
    /// Serve Prometheus metrics at `/metrics`.
    pub metrics_enabled: bool,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "[REDACTED]"),
            )
            .field("session_cookie_secure", &self.session_cookie_secure)
            .field("metrics_enabled", &self.metrics_enabled)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            database_url: None,
            session_cookie_secure: false,
            metrics_enabled: true,
        }
    }
}

// -- Application State --------------------------------------------------------

/// Shared application state passed to all route handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub manufacturers: Store<ManufacturerId, Manufacturer>,
    pub drivers: Store<DriverId, Driver>,
    pub cars: Store<CarId, Car>,
    pub sessions: SessionStore,

    /// PostgreSQL connection pool. When `None`, the API operates in
    /// in-memory-only mode.
    pub db_pool: Option<PgPool>,

    pub config: AppConfig,
}

impl AppState {
    /// Create an in-memory state with default configuration.
    pub fn new() -> Self {
        Self::with_config(AppConfig::default(), None)
    }

    /// Create a state with the given configuration and optional database pool.
    pub fn with_config(config: AppConfig, db_pool: Option<PgPool>) -> Self {
        Self {
            manufacturers: Store::new(),
            drivers: Store::new(),
            cars: Store::new(),
            sessions: SessionStore::new(),
            db_pool,
            config,
        }
    }

    /// The active driver with these credentials, if any.
    ///
    /// Usernames match exactly; inactive drivers never authenticate. A
    /// password is always hashed, even for unknown usernames, so response
    /// time does not reveal which usernames exist.
    pub fn authenticate(&self, username: &str, password: &str) -> Option<Driver> {
        let driver = self
            .drivers
            .read_with(|drivers| drivers.values().find(|d| d.username == username).cloned());
        let Some(driver) = driver else {
            absent_driver_hash().verify(password);
            return None;
        };
        let verified = driver.password.verify(password);
        (verified && driver.is_active).then_some(driver)
    }

    // -- Manufacturers --

    /// Insert a manufacturer, rechecking name uniqueness under the write lock.
    pub fn insert_manufacturer(
        &self,
        cleaned: CleanedManufacturer,
    ) -> Result<Manufacturer, FormErrors> {
        self.manufacturers.insert_with(|id, manufacturers| {
            if manufacturers.values().any(|m| m.name == cleaned.name) {
                return Err(FormErrors::single("name", DUPLICATE_MANUFACTURER));
            }
            Ok(cleaned.into_manufacturer(id))
        })
    }

    /// Replace a manufacturer's fields, returning the previous and the
    /// updated record. `None` when it does not exist.
    pub fn replace_manufacturer(
        &self,
        id: ManufacturerId,
        cleaned: CleanedManufacturer,
    ) -> Option<Result<(Manufacturer, Manufacturer), FormErrors>> {
        self.manufacturers.write_with(|manufacturers| {
            if !manufacturers.contains_key(&id) {
                return None;
            }
            if manufacturers
                .values()
                .any(|m| m.id != id && m.name == cleaned.name)
            {
                return Some(Err(FormErrors::single("name", DUPLICATE_MANUFACTURER)));
            }
            let record = cleaned.into_manufacturer(id);
            let previous = manufacturers.insert(id, record.clone())?;
            Some(Ok((previous, record)))
        })
    }

    /// Delete a manufacturer and every car it built.
    pub fn delete_manufacturer(&self, id: ManufacturerId) -> Option<(Manufacturer, Vec<Car>)> {
        self.manufacturers.write_with(|manufacturers| {
            let removed = manufacturers.remove(&id)?;
            let cars = self.cars.write_with(|cars| {
                let mut deleted = Vec::new();
                cars.retain(|_, car| {
                    if car.manufacturer_id == id {
                        deleted.push(car.clone());
                        false
                    } else {
                        true
                    }
                });
                deleted
            });
            Some((removed, cars))
        })
    }

    // -- Cars --

    /// Insert a car whose manufacturer and drivers still exist.
    pub fn insert_car(&self, cleaned: CleanedCar) -> Result<Car, FormErrors> {
        self.manufacturers.read_with(|manufacturers| {
            self.drivers.read_with(|drivers| {
                check_car_references(&cleaned, manufacturers, drivers)?;
                self.cars.insert_with(|id, _| Ok(cleaned.into_car(id)))
            })
        })
    }

    /// Replace a car's fields, returning the previous and the updated
    /// record. `None` when it does not exist.
    pub fn replace_car(
        &self,
        id: CarId,
        cleaned: CleanedCar,
    ) -> Option<Result<(Car, Car), FormErrors>> {
        self.manufacturers.read_with(|manufacturers| {
            self.drivers.read_with(|drivers| {
                self.cars.write_with(|cars| {
                    if !cars.contains_key(&id) {
                        return None;
                    }
                    if let Err(errors) = check_car_references(&cleaned, manufacturers, drivers) {
                        return Some(Err(errors));
                    }
                    let record = cleaned.into_car(id);
                    let previous = cars.insert(id, record.clone())?;
                    Some(Ok((previous, record)))
                })
            })
        })
    }

    /// Assign the driver to the car, or unassign if already assigned.
    ///
    /// Returns the updated car and whether the driver is now assigned.
    pub fn toggle_assignment(&self, car: CarId, driver: DriverId) -> Option<(Car, bool)> {
        self.drivers.read_with(|drivers| {
            if !drivers.contains_key(&driver) {
                return None;
            }
            let mut assigned = false;
            let car = self
                .cars
                .update(car, |c| assigned = c.toggle_driver(driver))?;
            Some((car, assigned))
        })
    }

    // -- Drivers --

    /// Insert a driver, rechecking username and license uniqueness under the
    /// write lock.
    pub fn insert_driver(
        &self,
        cleaned: CleanedDriver,
        is_superuser: bool,
    ) -> Result<Driver, FormErrors> {
        self.drivers.insert_with(|id, drivers| {
            let mut errors = FormErrors::new();
            if drivers
                .values()
                .any(|d| same_username(&d.username, &cleaned.username))
            {
                errors.add("username", DUPLICATE_USERNAME);
            }
            if drivers
                .values()
                .any(|d| d.license_number == cleaned.license_number.as_str())
            {
                errors.add("license_number", DUPLICATE_LICENSE);
            }
            errors.into_result(())?;

            let mut driver = cleaned.into_driver(id, Utc::now());
            driver.is_superuser = is_superuser;
            Ok(driver)
        })
    }

    /// Change a driver's license number, returning the previous and the
    /// updated record. `None` when the driver does not exist.
    pub fn update_license(
        &self,
        id: DriverId,
        license: LicenseNumber,
    ) -> Option<Result<(Driver, Driver), FormErrors>> {
        self.drivers.write_with(|drivers| {
            if drivers
                .values()
                .any(|d| d.id != id && d.license_number == license.as_str())
            {
                return drivers
                    .contains_key(&id)
                    .then(|| Err(FormErrors::single("license_number", DUPLICATE_LICENSE)));
            }
            let driver = drivers.get_mut(&id)?;
            let previous = driver.clone();
            driver.license_number = license.into();
            Some(Ok((previous, driver.clone())))
        })
    }

    /// Delete a driver, unassign it from every car and end its sessions.
    ///
    /// Returns the deleted driver and the cars it was removed from.
    pub fn delete_driver(&self, id: DriverId) -> Option<(Driver, Vec<Car>)> {
        let deleted = self.drivers.write_with(|drivers| {
            let removed = drivers.remove(&id)?;
            let cars: Vec<Car> = self.cars.write_with(|cars| {
                cars.values_mut()
                    .filter_map(|car| car.drivers.remove(&id).then(|| car.clone()))
                    .collect()
            });
            Some((removed, cars))
        })?;
        let ended = self.sessions.remove_for_driver(id);
        tracing::debug!(driver_id = %id, sessions = ended, "ended sessions of deleted driver");
        Some(deleted)
    }

    // -- Rollback --

    /// Undo an in-memory change whose database write failed.
    pub fn roll_back(&self, undo: Rollback) {
        let (record, id) = undo.target();
        match undo {
            Rollback::ManufacturerCreated(id) => {
                self.manufacturers.remove(id);
            }
            Rollback::ManufacturerChanged(previous) => {
                self.manufacturers.insert(previous.id, previous);
            }
            Rollback::ManufacturerDeleted(manufacturer, cars) => {
                self.manufacturers.insert(manufacturer.id, manufacturer);
                for car in cars {
                    self.cars.insert(car.id, car);
                }
            }
            Rollback::CarCreated(id) => {
                self.cars.remove(id);
            }
            Rollback::CarChanged(previous) | Rollback::CarDeleted(previous) => {
                self.cars.insert(previous.id, previous);
            }
            Rollback::AssignmentToggled { car, driver } => {
                self.cars.update(car, |c| {
                    c.toggle_driver(driver);
                });
            }
            Rollback::DriverCreated(id) => {
                self.drivers.remove(id);
            }
            Rollback::DriverChanged(previous) => {
                self.drivers.insert(previous.id, previous);
            }
            Rollback::DriverDeleted(driver, cars) => {
                let id = driver.id;
                self.drivers.insert(id, driver);
                self.cars.write_with(|all| {
                    for car in cars {
                        if let Some(car) = all.get_mut(&car) {
                            car.drivers.insert(id);
                        }
                    }
                });
            }
        }
        tracing::warn!(record, id, "in-memory change rolled back");
    }

    // -- Persistence --

    /// Hydrate in-memory stores from the database.
    ///
    /// Called once on startup when a database pool is available.
    pub async fn hydrate_from_db(&self) -> Result<(), sqlx::Error> {
        let Some(pool) = &self.db_pool else {
            return Ok(());
        };

        let manufacturers = crate::db::manufacturers::load_all(pool).await?;
        let manufacturer_count = manufacturers.len();
        for record in manufacturers {
            self.manufacturers.insert(record.id, record);
        }

        let drivers = crate::db::drivers::load_all(pool).await?;
        let driver_count = drivers.len();
        for record in drivers {
            self.drivers.insert(record.id, record);
        }

        let cars = crate::db::cars::load_all(pool).await?;
        let car_count = cars.len();
        for record in cars {
            self.cars.insert(record.id, record);
        }

        tracing::info!(
            manufacturers = manufacturer_count,
            drivers = driver_count,
            cars = car_count,
            "Hydrated in-memory stores from database"
        );

        Ok(())
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl FleetDirectory for AppState {
    fn username_taken(&self, username: &str) -> bool {
        self.drivers
            .read_with(|drivers| drivers.values().any(|d| same_username(&d.username, username)))
    }

    fn license_number_taken(&self, license_number: &str, exclude: Option<DriverId>) -> bool {
        self.drivers.read_with(|drivers| {
            drivers
                .values()
                .any(|d| d.license_number == license_number && Some(d.id) != exclude)
        })
    }

    fn manufacturer_name_taken(&self, name: &str, exclude: Option<ManufacturerId>) -> bool {
        self.manufacturers.read_with(|manufacturers| {
            manufacturers
                .values()
                .any(|m| m.name == name && Some(m.id) != exclude)
        })
    }

    fn manufacturer_exists(&self, id: ManufacturerId) -> bool {
        self.manufacturers.contains(id)
    }

    fn driver_exists(&self, id: DriverId) -> bool {
        self.drivers.contains(id)
    }
}

/// How to undo one in-memory change.
///
/// Deleted drivers come back without their sessions; they log in again.
#[derive(Debug, Clone)]
pub enum Rollback {
    ManufacturerCreated(ManufacturerId),
    ManufacturerChanged(Manufacturer),
    /// The manufacturer and the cars deleted with it.
    ManufacturerDeleted(Manufacturer, Vec<Car>),
    CarCreated(CarId),
    CarChanged(Car),
    CarDeleted(Car),
    AssignmentToggled { car: CarId, driver: DriverId },
    DriverCreated(DriverId),
    DriverChanged(Driver),
    /// The driver and the cars it was unassigned from.
    DriverDeleted(Driver, Vec<CarId>),
}

impl Rollback {
    /// Record kind and id, for logs.
    pub fn target(&self) -> (&'static str, i64) {
        match self {
            Self::ManufacturerCreated(id) => ("manufacturer", id.get()),
            Self::ManufacturerChanged(m) | Self::ManufacturerDeleted(m, _) => {
                ("manufacturer", m.id.get())
            }
            Self::CarCreated(id) => ("car", id.get()),
            Self::CarChanged(c) | Self::CarDeleted(c) => ("car", c.id.get()),
            Self::AssignmentToggled { car, .. } => ("car assignment", car.get()),
            Self::DriverCreated(id) => ("driver", id.get()),
            Self::DriverChanged(d) | Self::DriverDeleted(d, _) => ("driver", d.id.get()),
        }
    }
}

/// Hash checked when no driver has the username.
fn absent_driver_hash() -> &'static PasswordHash {
    static HASH: OnceLock<PasswordHash> = OnceLock::new();
    HASH.get_or_init(|| PasswordHash::hash("absent-driver"))
}

/// Usernames compare without regard to case for uniqueness.
pub(crate) fn same_username(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

fn check_car_references(
    car: &CleanedCar,
    manufacturers: &BTreeMap<ManufacturerId, Manufacturer>,
    drivers: &BTreeMap<DriverId, Driver>,
) -> Result<(), FormErrors> {
    let mut errors = FormErrors::new();
    if !manufacturers.contains_key(&car.manufacturer_id) {
        errors.add("manufacturer", INVALID_MANUFACTURER);
    }
    for id in car.drivers.iter().filter(|id| !drivers.contains_key(id)) {
        errors.add("drivers", invalid_driver_choice(*id));
    }
    errors.into_result(())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use taxi_core::{DriverCreationForm, PasswordHash};

    use super::*;

    fn cleaned_driver(username: &str, license: &str) -> CleanedDriver {
        CleanedDriver {
            username: username.to_string(),
            password: PasswordHash::unusable(),
            license_number: LicenseNumber::new(license).unwrap(),
            first_name: String::new(),
            last_name: String::new(),
            email: String::new(),
        }
    }

    fn manufacturer(state: &AppState, name: &str) -> Manufacturer {
        state
            .insert_manufacturer(CleanedManufacturer {
                name: name.to_string(),
                country: "Germany".to_string(),
            })
            .unwrap()
    }

    fn car(state: &AppState, model: &str, m: ManufacturerId, drivers: &[DriverId]) -> Car {
        state
            .insert_car(CleanedCar {
                model: model.to_string(),
                manufacturer_id: m,
                drivers: drivers.iter().copied().collect(),
            })
            .unwrap()
    }

    // -- Store tests ----------------------------------------------------------

    #[test]
    fn store_new_creates_empty_store() {
        let store: Store<CarId, String> = Store::new();
        assert!(store.is_empty());
        assert_eq!(store.len(), 0);
        assert!(store.list().is_empty());
    }

    #[test]
    fn store_allocates_increasing_ids() {
        let store: Store<CarId, i64> = Store::new();
        let a = store.insert_with(|id, _| Ok::<_, ()>(id.get())).unwrap();
        let b = store.insert_with(|id, _| Ok::<_, ()>(id.get())).unwrap();
        assert_eq!((a, b), (1, 2));
        assert_eq!(store.list(), vec![1, 2]);
    }

    #[test]
    fn store_insert_bumps_allocator_past_loaded_ids() {
        let store: Store<CarId, i64> = Store::new();
        store.insert(CarId::new(41), 41);
        let next = store.insert_with(|id, _| Ok::<_, ()>(id.get())).unwrap();
        assert_eq!(next, 42);
    }

    #[test]
    fn store_insert_with_failure_inserts_nothing() {
        let store: Store<CarId, i64> = Store::new();
        let result = store.insert_with(|_, _| Err::<i64, _>("rejected"));
        assert_eq!(result, Err("rejected"));
        assert!(store.is_empty());
    }

    #[test]
    fn store_list_is_in_id_order() {
        let store: Store<CarId, &str> = Store::new();
        store.insert(CarId::new(3), "c");
        store.insert(CarId::new(1), "a");
        store.insert(CarId::new(2), "b");
        assert_eq!(store.list(), vec!["a", "b", "c"]);
    }

    #[test]
    fn store_update_and_remove() {
        let store: Store<CarId, i64> = Store::new();
        store.insert(CarId::new(1), 10);
        assert_eq!(store.update(CarId::new(1), |v| *v += 1), Some(11));
        assert_eq!(store.update(CarId::new(9), |v| *v += 1), None);
        assert_eq!(store.remove(CarId::new(1)), Some(11));
        assert!(!store.contains(CarId::new(1)));
    }

    #[test]
    fn store_clone_shares_data() {
        let store: Store<CarId, i64> = Store::new();
        let clone = store.clone();
        store.insert(CarId::new(1), 1);
        assert_eq!(clone.get(CarId::new(1)), Some(1));
    }

    // -- AppConfig ------------------------------------------------------------

    #[test]
    fn config_debug_redacts_database_url() {
        let config = AppConfig {
            database_url: Some("postgres://user:hunter2@db/taxi".to_string()),
            ..AppConfig::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("[REDACTED]"));
    }

    // -- Fleet operations -----------------------------------------------------

    #[test]
    fn duplicate_manufacturer_name_rejected_atomically() {
        let state = AppState::new();
        manufacturer(&state, "BMW");
        let errors = state
            .insert_manufacturer(CleanedManufacturer {
                name: "BMW".to_string(),
                country: "Germany".to_string(),
            })
            .unwrap_err();
        assert_eq!(errors.get("name").unwrap(), [DUPLICATE_MANUFACTURER]);
        assert_eq!(state.manufacturers.len(), 1);
    }

    #[test]
    fn replace_manufacturer_keeps_id() {
        let state = AppState::new();
        let bmw = manufacturer(&state, "BMW");
        let (previous, updated) = state
            .replace_manufacturer(
                bmw.id,
                CleanedManufacturer {
                    name: "BMW AG".to_string(),
                    country: "Germany".to_string(),
                },
            )
            .unwrap()
            .unwrap();
        assert_eq!(previous, bmw);
        assert_eq!(updated.id, bmw.id);
        assert_eq!(state.manufacturers.get(bmw.id).unwrap().name, "BMW AG");
        assert!(state
            .replace_manufacturer(
                ManufacturerId::new(99),
                CleanedManufacturer {
                    name: "x".to_string(),
                    country: "y".to_string()
                }
            )
            .is_none());
    }

    #[test]
    fn deleting_manufacturer_deletes_its_cars() {
        let state = AppState::new();
        let driver = state
            .insert_driver(cleaned_driver("d1", "ABC12345"), false)
            .unwrap();
        let bmw = manufacturer(&state, "BMW");
        let audi = manufacturer(&state, "Audi");
        car(&state, "X5", bmw.id, &[driver.id]);
        car(&state, "X3", bmw.id, &[driver.id]);
        let a4 = car(&state, "A4", audi.id, &[driver.id]);

        let (removed, cars) = state.delete_manufacturer(bmw.id).unwrap();
        assert_eq!(removed.name, "BMW");
        assert_eq!(cars.len(), 2);
        assert_eq!(state.cars.list(), vec![a4]);
        assert!(state.delete_manufacturer(bmw.id).is_none());
    }

    #[test]
    fn deleting_driver_unassigns_and_ends_sessions() {
        let state = AppState::new();
        let d1 = state
            .insert_driver(cleaned_driver("d1", "ABC12345"), false)
            .unwrap();
        let d2 = state
            .insert_driver(cleaned_driver("d2", "ABC54321"), false)
            .unwrap();
        let bmw = manufacturer(&state, "BMW");
        let x5 = car(&state, "X5", bmw.id, &[d1.id, d2.id]);
        let token = state.sessions.create(d1.id);

        let (_, affected) = state.delete_driver(d1.id).unwrap();
        assert_eq!(affected.len(), 1);
        let x5 = state.cars.get(x5.id).unwrap();
        assert_eq!(x5.drivers, BTreeSet::from([d2.id]));
        assert!(state.sessions.get(&token).is_none());
    }

    #[test]
    fn roll_back_manufacturer_delete_restores_cars() {
        let state = AppState::new();
        let driver = state
            .insert_driver(cleaned_driver("d1", "ABC12345"), false)
            .unwrap();
        let bmw = manufacturer(&state, "BMW");
        let x5 = car(&state, "X5", bmw.id, &[driver.id]);

        let (removed, cars) = state.delete_manufacturer(bmw.id).unwrap();
        state.roll_back(Rollback::ManufacturerDeleted(removed, cars));
        assert_eq!(state.manufacturers.get(bmw.id), Some(bmw));
        assert_eq!(state.cars.list(), vec![x5]);
    }

    #[test]
    fn roll_back_driver_delete_restores_assignments() {
        let state = AppState::new();
        let d1 = state
            .insert_driver(cleaned_driver("d1", "ABC12345"), false)
            .unwrap();
        let bmw = manufacturer(&state, "BMW");
        let x5 = car(&state, "X5", bmw.id, &[d1.id]);

        let (removed, cars) = state.delete_driver(d1.id).unwrap();
        let affected = cars.iter().map(|c| c.id).collect();
        state.roll_back(Rollback::DriverDeleted(removed, affected));
        assert_eq!(state.drivers.get(d1.id).unwrap().username, "d1");
        assert_eq!(state.cars.get(x5.id), Some(x5));
    }

    #[test]
    fn roll_back_creates_updates_and_toggles() {
        let state = AppState::new();
        let d1 = state
            .insert_driver(cleaned_driver("d1", "ABC12345"), false)
            .unwrap();
        let bmw = manufacturer(&state, "BMW");
        let x5 = car(&state, "X5", bmw.id, &[]);

        let (previous, _) = state
            .update_license(d1.id, LicenseNumber::new("XYZ99999").unwrap())
            .unwrap()
            .unwrap();
        state.roll_back(Rollback::DriverChanged(previous));
        assert_eq!(state.drivers.get(d1.id).unwrap().license_number, "ABC12345");

        state.toggle_assignment(x5.id, d1.id).unwrap();
        state.roll_back(Rollback::AssignmentToggled {
            car: x5.id,
            driver: d1.id,
        });
        assert!(state.cars.get(x5.id).unwrap().drivers.is_empty());

        let audi = manufacturer(&state, "Audi");
        state.roll_back(Rollback::ManufacturerCreated(audi.id));
        assert!(!state.manufacturers.contains(audi.id));
        assert!(!state.manufacturer_name_taken("Audi", None));
    }

    #[test]
    fn insert_car_rechecks_references() {
        let state = AppState::new();
        let errors = state
            .insert_car(CleanedCar {
                model: "X5".to_string(),
                manufacturer_id: ManufacturerId::new(1),
                drivers: BTreeSet::from([DriverId::new(7)]),
            })
            .unwrap_err();
        assert!(errors.has("manufacturer"));
        assert!(errors.has("drivers"));
        assert!(state.cars.is_empty());
    }

    #[test]
    fn toggle_assignment_flips_membership() {
        let state = AppState::new();
        let d1 = state
            .insert_driver(cleaned_driver("d1", "ABC12345"), false)
            .unwrap();
        let d2 = state
            .insert_driver(cleaned_driver("d2", "ABC54321"), false)
            .unwrap();
        let bmw = manufacturer(&state, "BMW");
        let x5 = car(&state, "X5", bmw.id, &[d1.id]);

        let (_, assigned) = state.toggle_assignment(x5.id, d2.id).unwrap();
        assert!(assigned);
        let (car, assigned) = state.toggle_assignment(x5.id, d2.id).unwrap();
        assert!(!assigned);
        assert!(!car.has_driver(d2.id));
        assert!(state.toggle_assignment(CarId::new(99), d1.id).is_none());
    }

    #[test]
    fn usernames_unique_case_insensitively() {
        let state = AppState::new();
        state
            .insert_driver(cleaned_driver("Karina", "ABC12345"), false)
            .unwrap();
        let errors = state
            .insert_driver(cleaned_driver("karina", "XYZ12345"), false)
            .unwrap_err();
        assert_eq!(errors.get("username").unwrap(), [DUPLICATE_USERNAME]);
        assert!(state.username_taken("KARINA"));
    }

    #[test]
    fn license_numbers_unique() {
        let state = AppState::new();
        let d1 = state
            .insert_driver(cleaned_driver("d1", "ABC12345"), false)
            .unwrap();
        let d2 = state
            .insert_driver(cleaned_driver("d2", "XYZ12345"), false)
            .unwrap();

        let errors = state
            .insert_driver(cleaned_driver("d3", "ABC12345"), false)
            .unwrap_err();
        assert_eq!(errors.get("license_number").unwrap(), [DUPLICATE_LICENSE]);

        let conflict = state
            .update_license(d2.id, LicenseNumber::new("ABC12345").unwrap())
            .unwrap();
        assert!(conflict.is_err());
        let same = state
            .update_license(d1.id, LicenseNumber::new("ABC12345").unwrap())
            .unwrap();
        assert!(same.is_ok());
        assert!(state
            .update_license(DriverId::new(99), LicenseNumber::new("QQQ11111").unwrap())
            .is_none());
    }

    #[test]
    fn authenticate_checks_password_and_activity() {
        let state = AppState::new();
        let form = DriverCreationForm {
            username: "karina".to_string(),
            password1: "Tr1cky-Passw0rd".to_string(),
            password2: "Tr1cky-Passw0rd".to_string(),
            license_number: "KAR00001".to_string(),
            ..Default::default()
        };
        let cleaned = form.clean(&state).unwrap();
        let driver = state.insert_driver(cleaned, false).unwrap();

        assert!(state.authenticate("karina", "Tr1cky-Passw0rd").is_some());
        assert!(state.authenticate("karina", "wrong").is_none());
        assert!(state.authenticate("Karina", "Tr1cky-Passw0rd").is_none());

        state.drivers.update(driver.id, |d| d.is_active = false);
        assert!(state.authenticate("karina", "Tr1cky-Passw0rd").is_none());
    }

    #[test]
    fn unknown_username_still_hashes_the_password() {
        let state = AppState::new();
        let fallback = absent_driver_hash();
        assert!(fallback.is_usable());
        assert!(!fallback.verify("Tr1cky-Passw0rd"));
        assert!(state.authenticate("nobody", "Tr1cky-Passw0rd").is_none());
        assert!(std::ptr::eq(fallback, absent_driver_hash()));
    }
}
