//! # Fleet Records
//!
//! The three persisted record kinds and their identifiers.
//!
//! - [`Manufacturer`]: referenced by many cars.
//! - [`Car`]: belongs to one manufacturer, driven by a set of drivers.
//! - [`Driver`]: the authentication principal; may drive many cars.
//!
//! Identifiers are generated by the owning store as increasing integers,
//! so ordering by id is ordering by creation.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::password::PasswordHash;

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wrap a raw identifier.
            pub const fn new(id: i64) -> Self {
                Self(id)
            }

            /// Access the raw identifier.
            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

record_id!(
    /// Identifier of a [`Manufacturer`].
    ManufacturerId
);
record_id!(
    /// Identifier of a [`Car`].
    CarId
);
record_id!(
    /// Identifier of a [`Driver`].
    DriverId
);

/// A car manufacturer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manufacturer {
    /// Generated identifier.
    pub id: ManufacturerId,
    /// Manufacturer name, unique across the fleet.
    pub name: String,
    /// Country of origin.
    pub country: String,
}

/// A car in the fleet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Car {
    /// Generated identifier.
    pub id: CarId,
    /// Model name, e.g. "Corolla".
    pub model: String,
    /// The manufacturer that built this car.
    pub manufacturer_id: ManufacturerId,
    /// Drivers assigned to this car.
    pub drivers: BTreeSet<DriverId>,
}

impl Car {
    /// Whether the driver is assigned to this car.
    pub fn has_driver(&self, driver: DriverId) -> bool {
        self.drivers.contains(&driver)
    }

    /// Assign the driver if unassigned, unassign otherwise.
    ///
    /// Returns `true` when the driver is assigned after the call.
    pub fn toggle_driver(&mut self, driver: DriverId) -> bool {
        if self.drivers.remove(&driver) {
            false
        } else {
            self.drivers.insert(driver);
            true
        }
    }
}

/// A driver account.
///
/// The password hash is never serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Driver {
    /// Generated identifier.
    pub id: DriverId,
    /// Login name, unique across the fleet (case-insensitively).
    pub username: String,
    /// Encoded password hash.
    #[serde(skip_serializing)]
    pub password: PasswordHash,
    /// Given name; may be empty.
    pub first_name: String,
    /// Family name; may be empty.
    pub last_name: String,
    /// Contact email; may be empty.
    pub email: String,
    /// Driver license number. Unique across the fleet.
    pub license_number: String,
    /// Inactive drivers cannot log in.
    pub is_active: bool,
    /// Superusers may manage every record.
    pub is_superuser: bool,
    /// When the account was created.
    pub date_joined: DateTime<Utc>,
}

impl Driver {
    /// "First Last", falling back to the username when both are empty.
    pub fn full_name(&self) -> String {
        let full = format!("{} {}", self.first_name, self.last_name);
        let full = full.trim();
        if full.is_empty() {
            self.username.clone()
        } else {
            full.to_string()
        }
    }
}
