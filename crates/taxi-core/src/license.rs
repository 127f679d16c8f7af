//! # Driver License Numbers
//!
//! A license number is exactly eight characters: three uppercase letters
//! followed by five decimal digits, e.g. `ABC12345`.
//!
//! ## Validation
//!
//! The rule is checked in two steps and reports the first step that fails:
//!
//! 1. The first three characters must all be uppercase letters `A`-`Z`.
//!    Inputs shorter than three characters fail this step.
//! 2. Everything after the third character must be exactly five digits
//!    `0`-`9`.
//!
//! Characters are counted as Unicode scalar values, so slicing never splits
//! a multi-byte character.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

const PREFIX_LEN: usize = 3;
const SUFFIX_LEN: usize = 5;

/// Validate a license number string.
///
/// # Errors
///
/// Returns [`ValidationError::LicensePrefix`] when the first three characters
/// are not uppercase letters, otherwise [`ValidationError::LicenseSuffix`]
/// when the remainder is not exactly five digits.
pub fn validate_license_number(value: &str) -> Result<(), ValidationError> {
    let mut chars = value.chars();

    let prefix: Vec<char> = chars.by_ref().take(PREFIX_LEN).collect();
    if prefix.len() != PREFIX_LEN || !prefix.iter().all(char::is_ascii_uppercase) {
        return Err(ValidationError::LicensePrefix);
    }

    let suffix: Vec<char> = chars.collect();
    if suffix.len() != SUFFIX_LEN || !suffix.iter().all(char::is_ascii_digit) {
        return Err(ValidationError::LicenseSuffix);
    }

    Ok(())
}

/// A license number that has passed [`validate_license_number`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LicenseNumber(String);

impl LicenseNumber {
    /// Create a license number, validating its format.
    ///
    /// # Errors
    ///
    /// Returns the [`ValidationError`] raised by [`validate_license_number`].
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let s = value.into();
        validate_license_number(&s)?;
        Ok(Self(s))
    }

    /// Access the license number string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The three-letter prefix.
    pub fn prefix(&self) -> &str {
        &self.0[..PREFIX_LEN]
    }

    /// The five-digit suffix.
    pub fn digits(&self) -> &str {
        &self.0[PREFIX_LEN..]
    }
}

impl TryFrom<String> for LicenseNumber {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<LicenseNumber> for String {
    fn from(value: LicenseNumber) -> Self {
        value.0
    }
}

impl std::fmt::Display for LicenseNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
