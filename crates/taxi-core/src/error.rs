//! # Error Types
//!
//! Two shapes of failure exist in the fleet domain:
//!
//! - [`ValidationError`]: a single rule rejected a single value. Its
//!   `Display` text is the human-readable message shown next to the field.
//! - [`FormErrors`]: the outcome of binding a whole form: every failing
//!   field with every message raised for it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single rule failure for a single field value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The first three characters of a license number are not uppercase letters.
    #[error("First 3 characters should be uppercase letters")]
    LicensePrefix,

    /// The characters after the prefix are not exactly five digits.
    #[error("Last 5 characters should be digits")]
    LicenseSuffix,

    /// A required field was missing or blank.
    #[error("This field is required.")]
    Required,

    /// The value exceeds the field's maximum length.
    #[error("Ensure this value has at most {max} characters (it has {actual}).")]
    TooLong {
        /// Maximum allowed length in characters.
        max: usize,
        /// Length of the rejected value in characters.
        actual: usize,
    },

    /// A value failed a format rule; the message is field-specific.
    #[error("{0}")]
    Invalid(String),
}

/// Per-field validation messages produced by a form binding.
///
/// Keys are field names; the special key [`crate::NON_FIELD_ERRORS`] holds
/// errors that concern the form as a whole. Serializes as a plain JSON
/// object: `{"license_number": ["Last 5 characters should be digits"]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormErrors(BTreeMap<String, Vec<String>>);

impl FormErrors {
    /// Create an empty error map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message against a field.
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    /// Record a [`ValidationError`] against a field.
    pub fn add_error(&mut self, field: &str, error: &ValidationError) {
        self.add(field, error.to_string());
    }

    /// Build a map holding one message for one field.
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    /// Messages recorded for a field, if any.
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// Whether a field has at least one message.
    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Whether no field has failed.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Names of the failing fields, in sorted order.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// `Ok(value)` when empty, otherwise `Err(self)`.
    pub fn into_result<T>(self, value: T) -> Result<T, Self> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl std::fmt::Display for FormErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            for message in messages {
                if !first {
                    f.write_str("; ")?;
                }
                write!(f, "{field}: {message}")?;
                first = false;
            }
        }
        Ok(())
    }
}

impl std::error::Error for FormErrors {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn license_messages_match_form_text() {
        assert_eq!(
            ValidationError::LicensePrefix.to_string(),
            "First 3 characters should be uppercase letters"
        );
        assert_eq!(
            ValidationError::LicenseSuffix.to_string(),
            "Last 5 characters should be digits"
        );
    }

    #[test]
    fn too_long_message_reports_lengths() {
        let err = ValidationError::TooLong { max: 10, actual: 12 };
        assert_eq!(
            err.to_string(),
            "Ensure this value has at most 10 characters (it has 12)."
        );
    }

    #[test]
    fn form_errors_collect_per_field() {
        let mut errors = FormErrors::new();
        assert!(errors.is_empty());
        errors.add("username", "first");
        errors.add("username", "second");
        errors.add_error("license_number", &ValidationError::LicenseSuffix);

        assert_eq!(errors.get("username").map(<[String]>::len), Some(2));
        assert!(errors.has("license_number"));
        assert!(!errors.has("password1"));
        assert_eq!(
            errors.fields().collect::<Vec<_>>(),
            vec!["license_number", "username"]
        );
    }

    #[test]
    fn form_errors_serialize_as_object() {
        let errors = FormErrors::single("name", "This field is required.");
        let json = serde_json::to_value(&errors).unwrap();
        assert_eq!(json["name"][0], "This field is required.");
    }

    #[test]
    fn into_result_passes_value_through_when_empty() {
        assert_eq!(FormErrors::new().into_result(7), Ok(7));
        assert!(FormErrors::single("a", "b").into_result(7).is_err());
    }

    #[test]
    fn display_joins_all_messages() {
        let mut errors = FormErrors::new();
        errors.add("b", "two");
        errors.add("a", "one");
        assert_eq!(errors.to_string(), "a: one; b: two");
    }
}
