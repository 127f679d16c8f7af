//! # List Filters
//!
//! Each list view accepts one optional search field. The search forms trim
//! the submitted value and enforce its maximum length; the `search_*`
//! functions keep the records whose field contains the query.
//!
//! | View          | Field            | Max | Match            |
//! |---------------|------------------|-----|------------------|
//! | manufacturers | `name`           | 200 | case-insensitive |
//! | cars          | `model`          | 200 | case-insensitive |
//! | drivers       | `license_number` | 10  | case-sensitive   |
//!
//! A blank or absent query keeps every record. Input order is preserved.

use serde::{Deserialize, Serialize};

use crate::error::{FormErrors, ValidationError};
use crate::model::{Car, Driver, Manufacturer};

fn clean_query(field: &str, value: Option<&str>, max: usize) -> Result<Option<String>, FormErrors> {
    let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    let actual = value.chars().count();
    if actual > max {
        let mut errors = FormErrors::new();
        errors.add_error(field, &ValidationError::TooLong { max, actual });
        return Err(errors);
    }
    Ok(Some(value.to_string()))
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Search field of the manufacturer list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ManufacturerSearchForm {
    /// Substring of the manufacturer name.
    #[serde(default)]
    pub name: Option<String>,
}

impl ManufacturerSearchForm {
    /// Maximum query length.
    pub const MAX_LENGTH: usize = 200;

    /// The trimmed query, or `None` when blank.
    ///
    /// # Errors
    ///
    /// Returns a `name` field error when the query is too long.
    pub fn clean(&self) -> Result<Option<String>, FormErrors> {
        clean_query("name", self.name.as_deref(), Self::MAX_LENGTH)
    }
}

/// Search field of the car list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CarSearchForm {
    /// Substring of the car model.
    #[serde(default)]
    pub model: Option<String>,
}

impl CarSearchForm {
    /// Maximum query length.
    pub const MAX_LENGTH: usize = 200;

    /// The trimmed query, or `None` when blank.
    ///
    /// # Errors
    ///
    /// Returns a `model` field error when the query is too long.
    pub fn clean(&self) -> Result<Option<String>, FormErrors> {
        clean_query("model", self.model.as_deref(), Self::MAX_LENGTH)
    }
}

/// Search field of the driver list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DriverSearchForm {
    /// Substring of the license number.
    #[serde(default)]
    pub license_number: Option<String>,
}

impl DriverSearchForm {
    /// Maximum query length.
    pub const MAX_LENGTH: usize = 10;

    /// The trimmed query, or `None` when blank.
    ///
    /// # Errors
    ///
    /// Returns a `license_number` field error when the query is too long.
    pub fn clean(&self) -> Result<Option<String>, FormErrors> {
        clean_query(
            "license_number",
            self.license_number.as_deref(),
            Self::MAX_LENGTH,
        )
    }
}

/// Manufacturers whose name contains `query`, ignoring case.
pub fn search_manufacturers(
    records: impl IntoIterator<Item = Manufacturer>,
    query: Option<&str>,
) -> Vec<Manufacturer> {
    match query {
        Some(q) if !q.is_empty() => records
            .into_iter()
            .filter(|m| contains_ignore_case(&m.name, q))
            .collect(),
        _ => records.into_iter().collect(),
    }
}

/// Cars whose model contains `query`, ignoring case.
pub fn search_cars(records: impl IntoIterator<Item = Car>, query: Option<&str>) -> Vec<Car> {
    match query {
        Some(q) if !q.is_empty() => records
            .into_iter()
            .filter(|c| contains_ignore_case(&c.model, q))
            .collect(),
        _ => records.into_iter().collect(),
    }
}

/// Drivers whose license number contains `query`.
pub fn search_drivers(records: impl IntoIterator<Item = Driver>, query: Option<&str>) -> Vec<Driver> {
    match query {
        Some(q) if !q.is_empty() => records
            .into_iter()
            .filter(|d| d.license_number.contains(q))
            .collect(),
        _ => records.into_iter().collect(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use chrono::Utc;

    use super::*;
    use crate::model::{CarId, DriverId, ManufacturerId};
    use crate::password::PasswordHash;

    fn manufacturer(id: i64, name: &str) -> Manufacturer {
        Manufacturer {
            id: ManufacturerId::new(id),
            name: name.to_string(),
            country: String::new(),
        }
    }

    fn car(id: i64, model: &str) -> Car {
        Car {
            id: CarId::new(id),
            model: model.to_string(),
            manufacturer_id: ManufacturerId::new(1),
            drivers: BTreeSet::new(),
        }
    }

    fn driver(id: i64, license: &str) -> Driver {
        Driver {
            id: DriverId::new(id),
            username: format!("driver{id}"),
            password: PasswordHash::unusable(),
            first_name: String::new(),
            last_name: String::new(),
            email: String::new(),
            license_number: license.to_string(),
            is_active: true,
            is_superuser: false,
            date_joined: Utc::now(),
        }
    }

    #[test]
    fn manufacturer_search_matches_substring() {
        let found = search_manufacturers(
            vec![manufacturer(1, "Ivan"), manufacturer(2, "Alex")],
            Some("Iv"),
        );
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Ivan");
    }

    #[test]
    fn manufacturer_search_ignores_case() {
        let found = search_manufacturers(
            vec![manufacturer(1, "Ivan"), manufacturer(2, "Alex")],
            Some("iV"),
        );
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn absent_query_keeps_order() {
        let records = vec![manufacturer(2, "B"), manufacturer(1, "A")];
        let found = search_manufacturers(records.clone(), None);
        assert_eq!(found, records);
        assert_eq!(search_manufacturers(records.clone(), Some("")), records);
    }

    #[test]
    fn car_search_ignores_case() {
        let found = search_cars(vec![car(1, "BMW"), car(2, "Mercedes")], Some("merc"));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].model, "Mercedes");
    }

    #[test]
    fn driver_search_matches_license_substring() {
        let records = vec![driver(1, "ABC12345"), driver(2, "XYZ54321")];
        let found = search_drivers(records.clone(), Some("C123"));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, DriverId::new(1));
        assert!(search_drivers(records, Some("c123")).is_empty());
    }

    #[test]
    fn search_forms_trim_and_blank_to_none() {
        let form = ManufacturerSearchForm {
            name: Some("  Iv ".to_string()),
        };
        assert_eq!(form.clean().unwrap().as_deref(), Some("Iv"));

        let form = CarSearchForm {
            model: Some("   ".to_string()),
        };
        assert_eq!(form.clean().unwrap(), None);
        assert_eq!(DriverSearchForm::default().clean().unwrap(), None);
    }

    #[test]
    fn over_long_query_is_field_error() {
        let form = DriverSearchForm {
            license_number: Some("ABC123456789".to_string()),
        };
        let errors = form.clean().unwrap_err();
        assert_eq!(
            errors.get("license_number").unwrap(),
            ["Ensure this value has at most 10 characters (it has 12)."]
        );

        let form = CarSearchForm {
            model: Some("m".repeat(201)),
        };
        assert!(form.clean().unwrap_err().has("model"));
    }
}
