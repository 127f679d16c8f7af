//! # Command Line
//!
//! `taxi-api serve` runs the HTTP server; `taxi-api create-superuser`
//! writes the first superuser to the database. Every option falls back to
//! an environment variable.

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

use crate::bootstrap::SuperuserCredentials;
use crate::state::AppConfig;

/// Taxi fleet service.
#[derive(Parser, Debug)]
#[command(name = "taxi-api", version, about, long_about = None)]
pub struct Cli {
    /// Log output format.
    #[arg(long, value_enum, env = "LOG_FORMAT", default_value = "text", global = true)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP server.
    Serve(ServeArgs),

    /// Create a superuser driver in the database.
    CreateSuperuser(CreateSuperuserArgs),
}

/// Options of `serve`.
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Port to listen on.
    #[arg(long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// Postgres connection string. Without it records live in memory only.
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: Option<String>,

    /// Mark the session cookie Secure (serve behind HTTPS).
    #[arg(long, env = "SESSION_COOKIE_SECURE")]
    pub session_cookie_secure: bool,

    /// Serve Prometheus metrics at /metrics.
    #[arg(long, env = "TAXI_METRICS_ENABLED", default_value_t = true, action = ArgAction::Set)]
    pub metrics_enabled: bool,

    /// Username of a superuser to ensure at startup.
    #[arg(long, env = "TAXI_SUPERUSER_USERNAME", requires_all = ["superuser_password", "superuser_license"])]
    pub superuser_username: Option<String>,

    /// Password of the startup superuser.
    #[arg(long, env = "TAXI_SUPERUSER_PASSWORD", hide_env_values = true)]
    pub superuser_password: Option<String>,

    /// License number of the startup superuser.
    #[arg(long, env = "TAXI_SUPERUSER_LICENSE")]
    pub superuser_license: Option<String>,
}

impl ServeArgs {
    pub fn config(&self) -> AppConfig {
        AppConfig {
            port: self.port,
            database_url: self.database_url.clone(),
            session_cookie_secure: self.session_cookie_secure,
            metrics_enabled: self.metrics_enabled,
        }
    }

    /// The startup superuser, when all three options are present.
    pub fn superuser(&self) -> Option<SuperuserCredentials> {
        Some(SuperuserCredentials {
            username: self.superuser_username.clone()?,
            password: self.superuser_password.clone()?,
            license_number: self.superuser_license.clone()?,
        })
    }
}

/// Options of `create-superuser`.
#[derive(Args, Debug)]
pub struct CreateSuperuserArgs {
    #[arg(long)]
    pub username: String,

    #[arg(long, env = "TAXI_SUPERUSER_PASSWORD", hide_env_values = true)]
    pub password: String,

    #[arg(long)]
    pub license_number: String,

    /// Postgres connection string the superuser is written to.
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: String,
}

impl CreateSuperuserArgs {
    pub fn credentials(&self) -> SuperuserCredentials {
        SuperuserCredentials {
            username: self.username.clone(),
            password: self.password.clone(),
            license_number: self.license_number.clone(),
        }
    }
}
