//! Login form.

use serde::Deserialize;

use super::{apply_validators, required, FieldValidator, NON_FIELD_ERRORS};
use crate::error::FormErrors;

/// Message shown when the credentials do not match an active driver.
pub const INVALID_LOGIN: &str = "Please enter a correct username and password. Note that both fields may be case-sensitive.";

/// Submitted credentials.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginForm {
    /// Login name.
    #[serde(default)]
    pub username: String,
    /// Raw password.
    #[serde(default)]
    pub password: String,
    /// Where to redirect after a successful login.
    #[serde(default)]
    pub next: Option<String>,
}

impl LoginForm {
    const VALIDATORS: &'static [(&'static str, FieldValidator)] =
        &[("username", required), ("password", required)];

    fn field(&self, name: &str) -> &str {
        match name {
            "username" => &self.username,
            "password" => &self.password,
            _ => "",
        }
    }

    /// Check that both credentials were supplied.
    ///
    /// # Errors
    ///
    /// Returns a [`FormErrors`] map naming each blank field.
    pub fn clean(&self) -> Result<(&str, &str), FormErrors> {
        let mut errors = FormErrors::new();
        apply_validators(&mut errors, Self::VALIDATORS, |name| self.field(name));
        errors.into_result((self.username.trim(), self.password.as_str()))
    }

    /// The error map for credentials that did not authenticate.
    pub fn invalid_credentials() -> FormErrors {
        FormErrors::single(NON_FIELD_ERRORS, INVALID_LOGIN)
    }

    /// The post-login redirect target.
    ///
    /// Only site-relative paths are honoured; anything else falls back to
    /// `default`.
    pub fn redirect_target<'a>(&'a self, default: &'a str) -> &'a str {
        match self.next.as_deref() {
            Some(next) if next.starts_with('/') && !next.starts_with("//") && !next.contains('\\') => next,
            _ => default,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(username: &str, password: &str, next: Option<&str>) -> LoginForm {
        LoginForm {
            username: username.to_string(),
            password: password.to_string(),
            next: next.map(str::to_string),
        }
    }

    #[test]
    fn clean_returns_credentials() {
        let login = form(" admin ", "secret pw", None);
        assert_eq!(login.clean().unwrap(), ("admin", "secret pw"));
    }

    #[test]
    fn blank_fields_are_required() {
        let errors = form("", "", None).clean().unwrap_err();
        assert!(errors.has("username"));
        assert!(errors.has("password"));
    }

    #[test]
    fn invalid_credentials_use_form_wide_key() {
        let errors = LoginForm::invalid_credentials();
        assert_eq!(errors.get(NON_FIELD_ERRORS).unwrap(), [INVALID_LOGIN]);
    }

    #[test]
    fn redirect_only_follows_local_paths() {
        assert_eq!(form("a", "b", Some("/cars/")).redirect_target("/"), "/cars/");
        assert_eq!(form("a", "b", Some("https://evil.example")).redirect_target("/"), "/");
        assert_eq!(form("a", "b", Some("//evil.example")).redirect_target("/"), "/");
        assert_eq!(form("a", "b", None).redirect_target("/"), "/");
    }
}
