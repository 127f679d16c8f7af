//! # Form Bindings
//!
//! A form is a plain struct of submitted field values. Calling `clean` on it
//! runs every validator registered for its fields and yields either a
//! cleaned value ready to persist or a [`FormErrors`] map. Cleaning has no
//! side effects; persisting the result is the caller's job.
//!
//! Each form declares its validators as a table of `(field, validator)`
//! pairs. The handler invokes `clean` directly, so the full set of rules for
//! a form is visible in one place.
//!
//! Checks that need other records (unique usernames, existing
//! manufacturers) go through [`FleetDirectory`].

mod car;
mod driver;
mod login;
mod manufacturer;

pub use car::{invalid_driver_choice, CarForm, CleanedCar, INVALID_MANUFACTURER};
pub use driver::{
    CleanedDriver, DriverCreationForm, DriverLicenseUpdateForm, DUPLICATE_LICENSE,
    DUPLICATE_USERNAME,
};
pub use login::{LoginForm, INVALID_LOGIN};
pub use manufacturer::{CleanedManufacturer, ManufacturerForm, DUPLICATE_MANUFACTURER};

use crate::error::{FormErrors, ValidationError};
use crate::model::{DriverId, ManufacturerId};

/// Error key for messages that concern the whole form rather than one field.
pub const NON_FIELD_ERRORS: &str = "__all__";

/// A validator for one field value.
pub type FieldValidator = fn(&str) -> Result<(), ValidationError>;

/// Lookups a form needs from the record owner.
pub trait FleetDirectory {
    /// Whether a driver already uses this username (case-insensitive).
    fn username_taken(&self, username: &str) -> bool;

    /// Whether a driver other than `exclude` holds this license number.
    fn license_number_taken(&self, license_number: &str, exclude: Option<DriverId>) -> bool;

    /// Whether a manufacturer other than `exclude` uses this name.
    fn manufacturer_name_taken(&self, name: &str, exclude: Option<ManufacturerId>) -> bool;

    /// Whether the manufacturer exists.
    fn manufacturer_exists(&self, id: ManufacturerId) -> bool;

    /// Whether the driver exists.
    fn driver_exists(&self, id: DriverId) -> bool;
}

/// Run each `(field, validator)` pair against the value `value_of` yields.
fn apply_validators<'a>(
    errors: &mut FormErrors,
    validators: &[(&'static str, FieldValidator)],
    value_of: impl Fn(&str) -> &'a str,
) {
    for (field, validator) in validators {
        if let Err(err) = validator(value_of(field)) {
            errors.add_error(field, &err);
        }
    }
}

fn required(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::Required)
    } else {
        Ok(())
    }
}

fn max_length(value: &str, max: usize) -> Result<(), ValidationError> {
    let actual = value.chars().count();
    if actual > max {
        Err(ValidationError::TooLong { max, actual })
    } else {
        Ok(())
    }
}

fn required_name(value: &str) -> Result<(), ValidationError> {
    required(value)?;
    max_length(value.trim(), 255)
}

fn optional_name(value: &str) -> Result<(), ValidationError> {
    max_length(value.trim(), 150)
}

fn parse_id(value: &str) -> Option<i64> {
    value.trim().parse().ok()
}
