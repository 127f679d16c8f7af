//! Car persistence operations on the `cars` and `car_drivers` tables.
//!
//! A car row and its driver assignments are always written in one
//! transaction.

use std::collections::{BTreeMap, BTreeSet};

use sqlx::{PgPool, Postgres, Transaction};
use taxi_core::{Car, CarId, DriverId, ManufacturerId};

/// Insert a new car with its driver assignments.
pub async fn insert(pool: &PgPool, record: &Car) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    sqlx::query("INSERT INTO cars (id, model, manufacturer_id) VALUES ($1, $2, $3)")
        .bind(record.id.get())
        .bind(&record.model)
        .bind(record.manufacturer_id.get())
        .execute(&mut *tx)
        .await?;
    insert_assignments(&mut tx, record.id, &record.drivers).await?;
    tx.commit().await
}

/// Overwrite a car's fields and replace its driver assignments.
/// Returns whether a row was updated.
pub async fn update(pool: &PgPool, record: &Car) -> Result<bool, sqlx::Error> {
    let mut tx = pool.begin().await?;
    let result = sqlx::query("UPDATE cars SET model = $1, manufacturer_id = $2 WHERE id = $3")
        .bind(&record.model)
        .bind(record.manufacturer_id.get())
        .bind(record.id.get())
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM car_drivers WHERE car_id = $1")
        .bind(record.id.get())
        .execute(&mut *tx)
        .await?;
    insert_assignments(&mut tx, record.id, &record.drivers).await?;
    tx.commit().await?;
    Ok(result.rows_affected() > 0)
}

/// Record a single assign or unassign.
pub async fn set_assignment(
    pool: &PgPool,
    car: CarId,
    driver: DriverId,
    assigned: bool,
) -> Result<(), sqlx::Error> {
    let sql = if assigned {
        "INSERT INTO car_drivers (car_id, driver_id) VALUES ($1, $2) ON CONFLICT DO NOTHING"
    } else {
        "DELETE FROM car_drivers WHERE car_id = $1 AND driver_id = $2"
    };
    sqlx::query(sql)
        .bind(car.get())
        .bind(driver.get())
        .execute(pool)
        .await?;
    Ok(())
}

/// Delete a car (and, by cascade, its assignments).
pub async fn delete(pool: &PgPool, id: CarId) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM cars WHERE id = $1")
        .bind(id.get())
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Load all cars and their assignments into the in-memory store on startup.
pub async fn load_all(pool: &PgPool) -> Result<Vec<Car>, sqlx::Error> {
    let rows = sqlx::query_as::<_, CarRow>("SELECT id, model, manufacturer_id FROM cars ORDER BY id")
        .fetch_all(pool)
        .await?;
    let links = sqlx::query_as::<_, CarDriverRow>("SELECT car_id, driver_id FROM car_drivers")
        .fetch_all(pool)
        .await?;

    let mut drivers: BTreeMap<i64, BTreeSet<DriverId>> = BTreeMap::new();
    for link in links {
        drivers
            .entry(link.car_id)
            .or_default()
            .insert(DriverId::new(link.driver_id));
    }

    Ok(rows
        .into_iter()
        .map(|row| {
            let assigned = drivers.remove(&row.id).unwrap_or_default();
            row.into_record(assigned)
        })
        .collect())
}

async fn insert_assignments(
    tx: &mut Transaction<'_, Postgres>,
    car: CarId,
    drivers: &BTreeSet<DriverId>,
) -> Result<(), sqlx::Error> {
    for driver in drivers {
        sqlx::query("INSERT INTO car_drivers (car_id, driver_id) VALUES ($1, $2)")
            .bind(car.get())
            .bind(driver.get())
            .execute(&mut **tx)
            .await?;
    }
    Ok(())
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct CarRow {
    id: i64,
    model: String,
    manufacturer_id: i64,
}

impl CarRow {
    fn into_record(self, drivers: BTreeSet<DriverId>) -> Car {
        Car {
            id: CarId::new(self.id),
            model: self.model,
            manufacturer_id: ManufacturerId::new(self.manufacturer_id),
            drivers,
        }
    }
}

#[derive(sqlx::FromRow)]
struct CarDriverRow {
    car_id: i64,
    driver_id: i64,
}
