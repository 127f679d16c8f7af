//! Driver persistence operations on the `drivers` table.
//!
//! Deleting a driver cascades to its `car_drivers` rows.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use taxi_core::{Driver, DriverId, PasswordHash};

/// Insert a new driver record, including its password hash.
pub async fn insert(pool: &PgPool, record: &Driver) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO drivers (id, username, password, first_name, last_name, email,
                              license_number, is_active, is_superuser, date_joined)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
    )
    .bind(record.id.get())
    .bind(&record.username)
    .bind(record.password.as_str())
    .bind(&record.first_name)
    .bind(&record.last_name)
    .bind(&record.email)
    .bind(&record.license_number)
    .bind(record.is_active)
    .bind(record.is_superuser)
    .bind(record.date_joined)
    .execute(pool)
    .await?;
    Ok(())
}

/// Update a driver's license number. Returns whether a row was updated.
pub async fn update_license(
    pool: &PgPool,
    id: DriverId,
    license_number: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE drivers SET license_number = $1 WHERE id = $2")
        .bind(license_number)
        .bind(id.get())
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Delete a driver (and, by cascade, its car assignments).
pub async fn delete(pool: &PgPool, id: DriverId) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM drivers WHERE id = $1")
        .bind(id.get())
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Load all drivers from the database into the in-memory store on startup.
pub async fn load_all(pool: &PgPool) -> Result<Vec<Driver>, sqlx::Error> {
    let rows = sqlx::query_as::<_, DriverRow>(
        "SELECT id, username, password, first_name, last_name, email,
                license_number, is_active, is_superuser, date_joined
         FROM drivers ORDER BY id",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(DriverRow::into_record).collect())
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct DriverRow {
    id: i64,
    username: String,
    password: String,
    first_name: String,
    last_name: String,
    email: String,
    license_number: String,
    is_active: bool,
    is_superuser: bool,
    date_joined: DateTime<Utc>,
}

impl DriverRow {
    fn into_record(self) -> Driver {
        let password = PasswordHash::from_encoded(self.password);
        if !password.is_usable() {
            tracing::warn!(
                id = self.id,
                username = %self.username,
                "driver has an unusable password hash and cannot log in"
            );
        }
        Driver {
            id: DriverId::new(self.id),
            username: self.username,
            password,
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            license_number: self.license_number,
            is_active: self.is_active,
            is_superuser: self.is_superuser,
            date_joined: self.date_joined,
        }
    }
}
