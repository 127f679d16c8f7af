//! Driver registration and license update forms.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::{apply_validators, optional_name, required, FieldValidator, FleetDirectory};
use crate::error::{FormErrors, ValidationError};
use crate::license::{validate_license_number, LicenseNumber};
use crate::model::{Driver, DriverId};
use crate::password::{validate_password_strength, PasswordHash};

const USERNAME_MAX: usize = 150;
const EMAIL_MAX: usize = 254;

const INVALID_USERNAME: &str =
    "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.";
/// Message for a username another driver already uses.
pub const DUPLICATE_USERNAME: &str = "A user with that username already exists.";
/// Message for a license number another driver already holds.
pub const DUPLICATE_LICENSE: &str = "Driver with this License number already exists.";
const PASSWORD_MISMATCH: &str = "The two password fields didn\u{2019}t match.";

fn validate_username(value: &str) -> Result<(), ValidationError> {
    required(value)?;
    let value = value.trim();
    let len = value.chars().count();
    if len > USERNAME_MAX {
        return Err(ValidationError::TooLong {
            max: USERNAME_MAX,
            actual: len,
        });
    }
    if !value
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
    {
        return Err(ValidationError::Invalid(INVALID_USERNAME.to_string()));
    }
    Ok(())
}

fn validate_license_field(value: &str) -> Result<(), ValidationError> {
    required(value)?;
    validate_license_number(value.trim())
}

fn validate_email(value: &str) -> Result<(), ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(());
    }
    let invalid = || ValidationError::Invalid("Enter a valid email address.".to_string());
    if value.chars().count() > EMAIL_MAX || value.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    let (local, domain) = value.split_once('@').ok_or_else(invalid)?;
    if local.is_empty()
        || domain.contains('@')
        || !domain.contains('.')
        || domain.starts_with('.')
        || domain.ends_with('.')
    {
        return Err(invalid());
    }
    Ok(())
}

/// Account creation form for a new driver.
///
/// Fields: `username`, `password1`, `password2`, `license_number`, and the
/// optional `first_name`, `last_name` and `email`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DriverCreationForm {
    /// Requested login name.
    #[serde(default)]
    pub username: String,
    /// Password.
    #[serde(default)]
    pub password1: String,
    /// Password confirmation.
    #[serde(default)]
    pub password2: String,
    /// License number, checked by [`validate_license_number`].
    #[serde(default)]
    pub license_number: String,
    /// Given name.
    #[serde(default)]
    pub first_name: String,
    /// Family name.
    #[serde(default)]
    pub last_name: String,
    /// Contact email.
    #[serde(default)]
    pub email: String,
}

/// Validated driver fields, ready to become a [`Driver`] record.
#[derive(Debug, Clone)]
pub struct CleanedDriver {
    /// Login name, trimmed.
    pub username: String,
    /// Hash of the accepted password.
    pub password: PasswordHash,
    /// Validated license number.
    pub license_number: LicenseNumber,
    /// Given name, trimmed.
    pub first_name: String,
    /// Family name, trimmed.
    pub last_name: String,
    /// Contact email, trimmed.
    pub email: String,
}

impl CleanedDriver {
    /// Build the record for a newly allocated id.
    pub fn into_driver(self, id: DriverId, date_joined: DateTime<Utc>) -> Driver {
        Driver {
            id,
            username: self.username,
            password: self.password,
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            license_number: self.license_number.into(),
            is_active: true,
            is_superuser: false,
            date_joined,
        }
    }
}

impl DriverCreationForm {
    const VALIDATORS: &'static [(&'static str, FieldValidator)] = &[
        ("username", validate_username),
        ("license_number", validate_license_field),
        ("first_name", optional_name),
        ("last_name", optional_name),
        ("email", validate_email),
    ];

    fn field(&self, name: &str) -> &str {
        match name {
            "username" => &self.username,
            "license_number" => &self.license_number,
            "first_name" => &self.first_name,
            "last_name" => &self.last_name,
            "email" => &self.email,
            _ => "",
        }
    }

    /// Validate every field.
    ///
    /// # Errors
    ///
    /// Returns a [`FormErrors`] map naming each failing field. The
    /// `license_number` entry carries the message from
    /// [`validate_license_number`].
    pub fn clean(&self, directory: &impl FleetDirectory) -> Result<CleanedDriver, FormErrors> {
        let mut errors = FormErrors::new();
        apply_validators(&mut errors, Self::VALIDATORS, |name| self.field(name));

        let username = self.username.trim();
        if !errors.has("username") && directory.username_taken(username) {
            errors.add("username", DUPLICATE_USERNAME);
        }

        let license_number = self.license_number.trim();
        if !errors.has("license_number") && directory.license_number_taken(license_number, None) {
            errors.add("license_number", DUPLICATE_LICENSE);
        }

        if self.password1.is_empty() {
            errors.add_error("password1", &ValidationError::Required);
        }
        if self.password2.is_empty() {
            errors.add_error("password2", &ValidationError::Required);
        } else if !self.password1.is_empty() {
            if self.password1 != self.password2 {
                errors.add("password2", PASSWORD_MISMATCH);
            } else {
                for message in validate_password_strength(&self.password2, username) {
                    errors.add("password2", message);
                }
            }
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        let license_number =
            LicenseNumber::new(license_number).map_err(|e| single("license_number", &e))?;

        Ok(CleanedDriver {
            username: username.to_string(),
            password: PasswordHash::hash(&self.password2),
            license_number,
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            email: self.email.trim().to_string(),
        })
    }
}

/// Form that changes only a driver's license number.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DriverLicenseUpdateForm {
    /// New license number.
    #[serde(default)]
    pub license_number: String,
}

impl DriverLicenseUpdateForm {
    const VALIDATORS: &'static [(&'static str, FieldValidator)] =
        &[("license_number", validate_license_field)];

    /// Validate the license number for the given driver.
    ///
    /// # Errors
    ///
    /// Returns a [`FormErrors`] map with a `license_number` entry when the
    /// value is malformed or already held by another driver.
    pub fn clean(
        &self,
        directory: &impl FleetDirectory,
        driver: DriverId,
    ) -> Result<LicenseNumber, FormErrors> {
        let mut errors = FormErrors::new();
        apply_validators(&mut errors, Self::VALIDATORS, |_| self.license_number.as_str());

        let license_number = self.license_number.trim();
        if !errors.has("license_number")
            && directory.license_number_taken(license_number, Some(driver))
        {
            errors.add("license_number", DUPLICATE_LICENSE);
        }
        if !errors.is_empty() {
            return Err(errors);
        }

        LicenseNumber::new(license_number).map_err(|e| single("license_number", &e))
    }
}

fn single(field: &str, err: &ValidationError) -> FormErrors {
    FormErrors::single(field, err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::testing::StubDirectory;

    fn valid_form() -> DriverCreationForm {
        DriverCreationForm {
            username: "test_user".to_string(),
            password1: "StrongP@ssw0rd!".to_string(),
            password2: "StrongP@ssw0rd!".to_string(),
            license_number: "ABC12345".to_string(),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            email: "test_user@example.com".to_string(),
        }
    }

    #[test]
    fn valid_registration_is_accepted() {
        let cleaned = valid_form().clean(&StubDirectory::default()).unwrap();
        assert_eq!(cleaned.license_number.as_str(), "ABC12345");
        assert_eq!(cleaned.username, "test_user");
        assert!(cleaned.password.verify("StrongP@ssw0rd!"));

        let driver = cleaned.into_driver(DriverId::new(5), Utc::now());
        assert_eq!(driver.id, DriverId::new(5));
        assert_eq!(driver.license_number, "ABC12345");
        assert!(driver.is_active);
        assert!(!driver.is_superuser);
    }

    #[test]
    fn lowercase_license_reports_prefix_message() {
        let form = DriverCreationForm {
            license_number: "abc12345".to_string(),
            ..valid_form()
        };
        let errors = form.clean(&StubDirectory::default()).unwrap_err();
        assert_eq!(
            errors.get("license_number").unwrap(),
            ["First 3 characters should be uppercase letters"]
        );
    }

    #[test]
    fn short_license_reports_digits_message() {
        let form = DriverCreationForm {
            license_number: "ABC1234".to_string(),
            ..valid_form()
        };
        let errors = form.clean(&StubDirectory::default()).unwrap_err();
        assert_eq!(
            errors.get("license_number").unwrap(),
            ["Last 5 characters should be digits"]
        );
    }

    #[test]
    fn license_is_trimmed_before_validation() {
        let form = DriverCreationForm {
            license_number: "  ABC12345 ".to_string(),
            ..valid_form()
        };
        let cleaned = form.clean(&StubDirectory::default()).unwrap();
        assert_eq!(cleaned.license_number.as_str(), "ABC12345");
    }

    #[test]
    fn missing_license_is_required() {
        let form = DriverCreationForm {
            license_number: String::new(),
            ..valid_form()
        };
        let errors = form.clean(&StubDirectory::default()).unwrap_err();
        assert_eq!(
            errors.get("license_number").unwrap(),
            ["This field is required."]
        );
    }

    #[test]
    fn password_mismatch_reported_on_confirmation() {
        let form = DriverCreationForm {
            password2: "Different#Pass99".to_string(),
            ..valid_form()
        };
        let errors = form.clean(&StubDirectory::default()).unwrap_err();
        assert_eq!(errors.get("password2").unwrap(), [PASSWORD_MISMATCH]);
        assert!(!errors.has("password1"));
    }

    #[test]
    fn weak_password_reported_on_confirmation() {
        let form = DriverCreationForm {
            password1: "12345".to_string(),
            password2: "12345".to_string(),
            ..valid_form()
        };
        let errors = form.clean(&StubDirectory::default()).unwrap_err();
        let messages = errors.get("password2").unwrap();
        assert!(messages.iter().any(|m| m.contains("too short")));
        assert!(messages.iter().any(|m| m.contains("entirely numeric")));
    }

    #[test]
    fn missing_passwords_are_required() {
        let form = DriverCreationForm {
            password1: String::new(),
            password2: String::new(),
            ..valid_form()
        };
        let errors = form.clean(&StubDirectory::default()).unwrap_err();
        assert!(errors.has("password1"));
        assert!(errors.has("password2"));
    }

    #[test]
    fn duplicate_username_rejected_case_insensitively() {
        let directory = StubDirectory {
            usernames: vec!["TEST_USER".to_string()],
            ..Default::default()
        };
        let errors = valid_form().clean(&directory).unwrap_err();
        assert_eq!(errors.get("username").unwrap(), [DUPLICATE_USERNAME]);
    }

    #[test]
    fn invalid_username_characters_rejected() {
        let form = DriverCreationForm {
            username: "bad name!".to_string(),
            ..valid_form()
        };
        let errors = form.clean(&StubDirectory::default()).unwrap_err();
        assert_eq!(errors.get("username").unwrap(), [INVALID_USERNAME]);
    }

    #[test]
    fn duplicate_license_rejected() {
        let directory = StubDirectory {
            licenses: vec![(DriverId::new(1), "ABC12345".to_string())],
            ..Default::default()
        };
        let errors = valid_form().clean(&directory).unwrap_err();
        assert_eq!(errors.get("license_number").unwrap(), [DUPLICATE_LICENSE]);
    }

    #[test]
    fn invalid_email_rejected_and_blank_email_allowed() {
        let form = DriverCreationForm {
            email: "not-an-email".to_string(),
            ..valid_form()
        };
        let errors = form.clean(&StubDirectory::default()).unwrap_err();
        assert!(errors.has("email"));

        let form = DriverCreationForm {
            email: String::new(),
            ..valid_form()
        };
        assert!(form.clean(&StubDirectory::default()).is_ok());
    }

    #[test]
    fn every_failing_field_is_reported_together() {
        let form = DriverCreationForm {
            username: String::new(),
            license_number: "x".to_string(),
            password2: "nope".to_string(),
            ..valid_form()
        };
        let errors = form.clean(&StubDirectory::default()).unwrap_err();
        let fields: Vec<&str> = errors.fields().collect();
        assert_eq!(fields, vec!["license_number", "password2", "username"]);
    }

    #[test]
    fn license_update_accepts_valid_number() {
        let form = DriverLicenseUpdateForm {
            license_number: "XYZ98765".to_string(),
        };
        let license = form
            .clean(&StubDirectory::default(), DriverId::new(1))
            .unwrap();
        assert_eq!(license.as_str(), "XYZ98765");
    }

    #[test]
    fn license_update_uses_same_rule() {
        let form = DriverLicenseUpdateForm {
            license_number: "abc12345".to_string(),
        };
        let errors = form
            .clean(&StubDirectory::default(), DriverId::new(1))
            .unwrap_err();
        assert_eq!(
            errors.get("license_number").unwrap(),
            ["First 3 characters should be uppercase letters"]
        );
    }

    #[test]
    fn license_update_allows_keeping_own_number() {
        let directory = StubDirectory {
            licenses: vec![(DriverId::new(1), "ABC12345".to_string())],
            ..Default::default()
        };
        let form = DriverLicenseUpdateForm {
            license_number: "ABC12345".to_string(),
        };
        assert!(form.clean(&directory, DriverId::new(1)).is_ok());
        let errors = form.clean(&directory, DriverId::new(2)).unwrap_err();
        assert_eq!(errors.get("license_number").unwrap(), [DUPLICATE_LICENSE]);
    }
}
