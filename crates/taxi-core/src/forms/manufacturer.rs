//! Manufacturer create/update form.

use serde::Deserialize;

use super::{apply_validators, required_name, FieldValidator, FleetDirectory};
use crate::error::FormErrors;
use crate::model::{Manufacturer, ManufacturerId};

/// Message for a name another manufacturer already uses.
pub const DUPLICATE_MANUFACTURER: &str = "Manufacturer with this Name already exists.";

/// Fields submitted to create or edit a manufacturer.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ManufacturerForm {
    /// Manufacturer name.
    #[serde(default)]
    pub name: String,
    /// Country of origin.
    #[serde(default)]
    pub country: String,
}

/// Validated manufacturer fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanedManufacturer {
    /// Name, trimmed and unique.
    pub name: String,
    /// Country, trimmed.
    pub country: String,
}

impl CleanedManufacturer {
    /// Build the record for the given id.
    pub fn into_manufacturer(self, id: ManufacturerId) -> Manufacturer {
        Manufacturer {
            id,
            name: self.name,
            country: self.country,
        }
    }
}

impl ManufacturerForm {
    const VALIDATORS: &'static [(&'static str, FieldValidator)] =
        &[("name", required_name), ("country", required_name)];

    fn field(&self, name: &str) -> &str {
        match name {
            "name" => &self.name,
            "country" => &self.country,
            _ => "",
        }
    }

    /// Validate the fields. `editing` names the manufacturer being updated,
    /// which may keep its own name.
    ///
    /// # Errors
    ///
    /// Returns a [`FormErrors`] map for blank or over-long fields and for a
    /// name another manufacturer already uses.
    pub fn clean(
        &self,
        directory: &impl FleetDirectory,
        editing: Option<ManufacturerId>,
    ) -> Result<CleanedManufacturer, FormErrors> {
        let mut errors = FormErrors::new();
        apply_validators(&mut errors, Self::VALIDATORS, |name| self.field(name));

        let name = self.name.trim();
        if !errors.has("name") && directory.manufacturer_name_taken(name, editing) {
            errors.add("name", DUPLICATE_MANUFACTURER);
        }

        errors.into_result(CleanedManufacturer {
            name: name.to_string(),
            country: self.country.trim().to_string(),
        })
    }
}
