//! # Superuser Bootstrap
//!
//! Creates the first superuser driver so someone can log in to a fresh
//! deployment. Used by the `create-superuser` subcommand and, when the
//! superuser options are given, by `serve` at startup.
//!
//! The account goes through the same registration validation as any other
//! driver. An existing driver with the same username is left untouched.

use taxi_core::{Driver, DriverCreationForm, FormErrors};
use thiserror::Error;

use crate::state::{same_username, AppState};

/// Credentials for the bootstrap superuser.
#[derive(Clone)]
pub struct SuperuserCredentials {
    pub username: String,
    pub password: String,
    pub license_number: String,
}

impl std::fmt::Debug for SuperuserCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SuperuserCredentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("license_number", &self.license_number)
            .finish()
    }
}

/// Failure to create the bootstrap superuser.
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("superuser rejected: {0}")]
    Invalid(FormErrors),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Whether [`ensure_superuser`] created the account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Created,
    AlreadyExists,
}

/// Create the superuser unless a driver with that username exists.
///
/// # Errors
///
/// [`BootstrapError::Invalid`] when the credentials fail registration
/// validation; [`BootstrapError::Database`] when the write-through fails.
pub async fn ensure_superuser(
    state: &AppState,
    credentials: &SuperuserCredentials,
) -> Result<(Driver, Outcome), BootstrapError> {
    let existing = state.drivers.read_with(|drivers| {
        drivers
            .values()
            .find(|d| same_username(&d.username, &credentials.username))
            .cloned()
    });
    if let Some(driver) = existing {
        tracing::info!(username = %driver.username, "superuser already exists, leaving it unchanged");
        return Ok((driver, Outcome::AlreadyExists));
    }

    let form = DriverCreationForm {
        username: credentials.username.clone(),
        password1: credentials.password.clone(),
        password2: credentials.password.clone(),
        license_number: credentials.license_number.clone(),
        ..Default::default()
    };
    let cleaned = form.clean(state).map_err(BootstrapError::Invalid)?;
    let driver = state
        .insert_driver(cleaned, true)
        .map_err(BootstrapError::Invalid)?;

    if let Some(pool) = &state.db_pool {
        if let Err(e) = crate::db::drivers::insert(pool, &driver).await {
            state.drivers.remove(driver.id);
            return Err(e.into());
        }
    }

    tracing::info!(driver_id = %driver.id, username = %driver.username, "superuser created");
    Ok((driver, Outcome::Created))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials_for(username: &str) -> SuperuserCredentials {
        SuperuserCredentials {
            username: username.to_string(),
            password: "Fleet-Adm1n-2024".to_string(),
            license_number: "ADM00001".to_string(),
        }
    }

    #[tokio::test]
    async fn creates_superuser_that_can_log_in() {
        let state = AppState::new();
        let (driver, outcome) = ensure_superuser(&state, &credentials_for("admin")).await.unwrap();
        assert_eq!(outcome, Outcome::Created);
        assert!(driver.is_superuser);
        assert!(state.authenticate("admin", "Fleet-Adm1n-2024").is_some());
    }

    #[tokio::test]
    async fn existing_username_is_left_alone() {
        let state = AppState::new();
        let (first, _) = ensure_superuser(&state, &credentials_for("admin")).await.unwrap();
        let (again, outcome) = ensure_superuser(&state, &credentials_for("admin")).await.unwrap();
        assert_eq!(outcome, Outcome::AlreadyExists);
        assert_eq!(first.id, again.id);
        assert_eq!(state.drivers.len(), 1);
    }

    #[tokio::test]
    async fn existing_username_matches_regardless_of_case() {
        let state = AppState::new();
        let (first, _) = ensure_superuser(&state, &credentials_for("Admin")).await.unwrap();
        let (again, outcome) = ensure_superuser(&state, &credentials_for("admin")).await.unwrap();
        assert_eq!(outcome, Outcome::AlreadyExists);
        assert_eq!(again.id, first.id);
        assert_eq!(again.username, "Admin");
        assert_eq!(state.drivers.len(), 1);
    }

    #[tokio::test]
    async fn invalid_license_rejected() {
        let state = AppState::new();
        let mut bad = credentials_for("admin");
        bad.license_number = "adm00001".to_string();
        let err = ensure_superuser(&state, &bad).await.unwrap_err();
        match err {
            BootstrapError::Invalid(errors) => assert!(errors.has("license_number")),
            other => panic!("unexpected error: {other}"),
        }
        assert!(state.drivers.is_empty());
    }

    #[test]
    fn debug_redacts_password() {
        let debug = format!("{:?}", credentials_for("admin"));
        assert!(!debug.contains("Fleet-Adm1n-2024"));
    }
}
