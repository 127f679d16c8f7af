//! Car create/update form.

use std::collections::BTreeSet;

use serde::Deserialize;

use super::{apply_validators, parse_id, required, required_name, FieldValidator, FleetDirectory};
use crate::error::FormErrors;
use crate::model::{Car, CarId, DriverId, ManufacturerId};

/// Message for a manufacturer id that does not name an existing record.
pub const INVALID_MANUFACTURER: &str =
    "Select a valid choice. That choice is not one of the available choices.";

/// Message for a driver id that does not name an existing record.
pub fn invalid_driver_choice(id: DriverId) -> String {
    format!("Select a valid choice. {id} is not one of the available choices.")
}

/// Fields submitted to create or edit a car.
///
/// `drivers` is a multi-select: the field may repeat in the request body.
/// Values are kept as strings so a malformed id becomes a field error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CarForm {
    /// Model name.
    #[serde(default)]
    pub model: String,
    /// Manufacturer id.
    #[serde(default)]
    pub manufacturer: String,
    /// Assigned driver ids. At least one is required.
    #[serde(default)]
    pub drivers: Vec<String>,
}

/// Validated car fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanedCar {
    /// Model name, trimmed.
    pub model: String,
    /// An existing manufacturer.
    pub manufacturer_id: ManufacturerId,
    /// Existing drivers, deduplicated.
    pub drivers: BTreeSet<DriverId>,
}

impl CleanedCar {
    /// Build the record for the given id.
    pub fn into_car(self, id: CarId) -> Car {
        Car {
            id,
            model: self.model,
            manufacturer_id: self.manufacturer_id,
            drivers: self.drivers,
        }
    }
}

impl CarForm {
    const VALIDATORS: &'static [(&'static str, FieldValidator)] =
        &[("model", required_name), ("manufacturer", required)];

    fn field(&self, name: &str) -> &str {
        match name {
            "model" => &self.model,
            "manufacturer" => &self.manufacturer,
            _ => "",
        }
    }

    /// Validate the car fields against the current fleet.
    ///
    /// # Errors
    ///
    /// Returns a [`FormErrors`] map when the model is blank, the manufacturer
    /// does not exist, or any driver id is malformed or unknown.
    pub fn clean(&self, directory: &impl FleetDirectory) -> Result<CleanedCar, FormErrors> {
        let mut errors = FormErrors::new();
        apply_validators(&mut errors, Self::VALIDATORS, |name| self.field(name));

        let manufacturer_id = if errors.has("manufacturer") {
            None
        } else {
            match parse_id(&self.manufacturer).map(ManufacturerId::new) {
                Some(id) if directory.manufacturer_exists(id) => Some(id),
                _ => {
                    errors.add("manufacturer", INVALID_MANUFACTURER);
                    None
                }
            }
        };

        let mut drivers = BTreeSet::new();
        let submitted: Vec<&str> = self
            .drivers
            .iter()
            .map(|d| d.trim())
            .filter(|d| !d.is_empty())
            .collect();
        if submitted.is_empty() {
            errors.add("drivers", "This field is required.");
        }
        for raw in submitted {
            match parse_id(raw).map(DriverId::new) {
                None => errors.add("drivers", format!("\u{201c}{raw}\u{201d} is not a valid value.")),
                Some(id) if !directory.driver_exists(id) => {
                    errors.add("drivers", invalid_driver_choice(id));
                }
                Some(id) => {
                    drivers.insert(id);
                }
            }
        }

        match manufacturer_id {
            Some(manufacturer_id) if errors.is_empty() => Ok(CleanedCar {
                model: self.model.trim().to_string(),
                manufacturer_id,
                drivers,
            }),
            _ => Err(errors),
        }
    }
}
