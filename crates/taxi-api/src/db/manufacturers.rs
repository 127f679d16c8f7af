//! Manufacturer persistence operations on the `manufacturers` table.
//!
//! Deleting a manufacturer cascades to its cars in SQL as well as in memory.

use sqlx::PgPool;
use taxi_core::{Manufacturer, ManufacturerId};

/// Insert a new manufacturer record.
pub async fn insert(pool: &PgPool, record: &Manufacturer) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO manufacturers (id, name, country) VALUES ($1, $2, $3)")
        .bind(record.id.get())
        .bind(&record.name)
        .bind(&record.country)
        .execute(pool)
        .await?;
    Ok(())
}

/// Overwrite name and country. Returns whether a row was updated.
pub async fn update(pool: &PgPool, record: &Manufacturer) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE manufacturers SET name = $1, country = $2 WHERE id = $3")
        .bind(&record.name)
        .bind(&record.country)
        .bind(record.id.get())
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Delete a manufacturer (and, by cascade, its cars).
pub async fn delete(pool: &PgPool, id: ManufacturerId) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM manufacturers WHERE id = $1")
        .bind(id.get())
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Load all manufacturers from the database into the in-memory store on startup.
pub async fn load_all(pool: &PgPool) -> Result<Vec<Manufacturer>, sqlx::Error> {
    let rows = sqlx::query_as::<_, ManufacturerRow>(
        "SELECT id, name, country FROM manufacturers ORDER BY id",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(ManufacturerRow::into_record).collect())
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct ManufacturerRow {
    id: i64,
    name: String,
    country: String,
}

impl ManufacturerRow {
    fn into_record(self) -> Manufacturer {
        Manufacturer {
            id: ManufacturerId::new(self.id),
            name: self.name,
            country: self.country,
        }
    }
}
