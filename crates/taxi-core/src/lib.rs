#![deny(missing_docs)]

//! # taxi-core: Domain Types for the Taxi Fleet Service
//!
//! This crate holds everything about the fleet that does not depend on HTTP
//! or storage: the three record kinds, the license-number rule, the form
//! bindings that turn submitted fields into validated values, and the search
//! filters used by the list views. It has no internal crate dependencies,
//! only `serde`, `thiserror`, `chrono`, `sha2`, `rand_core` and `subtle`.
//!
//! ## Design Principles
//!
//! 1. **Typed identifiers.** [`ManufacturerId`], [`CarId`] and [`DriverId`]
//!    are distinct types; a car id cannot be passed where a driver id is
//!    expected.
//!
//! 2. **Explicit field dispatch.** Each form owns a table mapping field names
//!    to validator functions. Handlers call `clean` directly; nothing is
//!    discovered by naming convention.
//!
//! 3. **Field-scoped errors.** Form validation never fails with a single
//!    opaque error. It returns a [`FormErrors`] map from field name to the
//!    messages for that field.
//!
//! 4. **No I/O.** Uniqueness and existence checks go through the
//!    [`FleetDirectory`] trait, implemented by whatever owns the records.

pub mod error;
pub mod forms;
pub mod license;
pub mod model;
pub mod password;
pub mod search;

pub use error::{FormErrors, ValidationError};
pub use forms::{
    CarForm, CleanedCar, CleanedDriver, CleanedManufacturer, DriverCreationForm,
    DriverLicenseUpdateForm, FleetDirectory, LoginForm, ManufacturerForm, NON_FIELD_ERRORS,
};
pub use license::{validate_license_number, LicenseNumber};
pub use model::{Car, CarId, Driver, DriverId, Manufacturer, ManufacturerId};
pub use password::{validate_password_strength, PasswordHash};
pub use search::{
    search_cars, search_drivers, search_manufacturers, CarSearchForm, DriverSearchForm,
    ManufacturerSearchForm,
};
