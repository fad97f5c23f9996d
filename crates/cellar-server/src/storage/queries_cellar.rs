//! Bottle, drink log and cellar statistics queries.

use std::collections::BTreeMap;

use cellar_core::db::{DatabaseError, unix_timestamp};

use super::db::CellarDatabase;
use super::models::{Bottle, CountryTotals, DrinkLog, StatusTotals};

/// Descriptive bottle fields shared by create and update.
#[derive(Debug, Clone, Default)]
pub struct BottleParams {
    pub name: String,
    pub producer: String,
    pub vintage: Option<i64>,
    pub grapes: String,
    pub country: String,
    pub region: String,
    pub location_id: Option<String>,
    pub purchase_date: Option<String>,
    pub purchase_place: String,
    pub price_cents: Option<i64>,
    pub currency: String,
    pub notes: String,
    pub photo_url: Option<String>,
}

/// Parameters for appending a drink log.
#[derive(Debug, Clone, Default)]
pub struct DrinkLogParams {
    pub bottle_id: Option<String>,
    pub drunk_at: i64,
    pub context: String,
    pub venue: String,
    pub notes: String,
    pub rating: Option<i64>,
    pub tasting_notes: BTreeMap<String, String>,
}

impl CellarDatabase {
    // =========================================================================
    // Bottle queries
    // =========================================================================

    pub async fn create_bottle(
        &self,
        id: &str,
        user_id: &str,
        params: &BottleParams,
        quantity: i64,
        status: &str,
    ) -> Result<Bottle, DatabaseError> {
        let now = unix_timestamp();

        sqlx::query(
            "INSERT INTO bottles (id, user_id, name, producer, vintage, grapes, country, region, \
             status, quantity, location_id, purchase_date, purchase_place, price_cents, currency, \
             notes, photo_url, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(user_id)
        .bind(&params.name)
        .bind(&params.producer)
        .bind(params.vintage)
        .bind(&params.grapes)
        .bind(&params.country)
        .bind(&params.region)
        .bind(status)
        .bind(quantity)
        .bind(params.location_id.as_deref())
        .bind(params.purchase_date.as_deref())
        .bind(&params.purchase_place)
        .bind(params.price_cents)
        .bind(&params.currency)
        .bind(&params.notes)
        .bind(params.photo_url.as_deref())
        .bind(now)
        .bind(now)
        .execute(self.pool())
        .await?;

        self.get_bottle(user_id, id).await
    }

    /// Get a bottle owned by `user_id`.
    pub async fn get_bottle(&self, user_id: &str, id: &str) -> Result<Bottle, DatabaseError> {
        sqlx::query_as::<_, Bottle>("SELECT * FROM bottles WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Bottle {id}")))
    }

    /// List bottles, optionally filtered by status and location.
    pub async fn list_bottles(
        &self,
        user_id: &str,
        status: Option<&str>,
        location_id: Option<&str>,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Bottle>, DatabaseError> {
        let bottles = sqlx::query_as::<_, Bottle>(
            "SELECT * FROM bottles WHERE user_id = ? \
             AND (? IS NULL OR status = ?) \
             AND (? IS NULL OR location_id = ?) \
             ORDER BY updated_at DESC, id LIMIT ? OFFSET ?",
        )
        .bind(user_id)
        .bind(status)
        .bind(status)
        .bind(location_id)
        .bind(location_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool())
        .await?;

        Ok(bottles)
    }

    /// Replace descriptive fields and optionally the quantity.
    pub async fn update_bottle(
        &self,
        user_id: &str,
        id: &str,
        params: &BottleParams,
        quantity: Option<i64>,
    ) -> Result<Bottle, DatabaseError> {
        let now = unix_timestamp();

        let result = sqlx::query(
            "UPDATE bottles SET name = ?, producer = ?, vintage = ?, grapes = ?, country = ?, \
             region = ?, location_id = ?, purchase_date = ?, purchase_place = ?, price_cents = ?, \
             currency = ?, notes = ?, photo_url = ?, quantity = COALESCE(?, quantity), \
             updated_at = ? WHERE id = ? AND user_id = ?",
        )
        .bind(&params.name)
        .bind(&params.producer)
        .bind(params.vintage)
        .bind(&params.grapes)
        .bind(&params.country)
        .bind(&params.region)
        .bind(params.location_id.as_deref())
        .bind(params.purchase_date.as_deref())
        .bind(&params.purchase_place)
        .bind(params.price_cents)
        .bind(&params.currency)
        .bind(&params.notes)
        .bind(params.photo_url.as_deref())
        .bind(quantity)
        .bind(now)
        .bind(id)
        .bind(user_id)
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("Bottle {id}")));
        }
        self.get_bottle(user_id, id).await
    }

    /// Set status and quantity together.
    pub async fn set_bottle_state(
        &self,
        user_id: &str,
        id: &str,
        status: &str,
        quantity: i64,
    ) -> Result<Bottle, DatabaseError> {
        let now = unix_timestamp();

        let result = sqlx::query(
            "UPDATE bottles SET status = ?, quantity = ?, updated_at = ? WHERE id = ? AND user_id = ?",
        )
        .bind(status)
        .bind(quantity)
        .bind(now)
        .bind(id)
        .bind(user_id)
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("Bottle {id}")));
        }
        self.get_bottle(user_id, id).await
    }

    pub async fn delete_bottle(&self, user_id: &str, id: &str) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM bottles WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    // Drink log queries
    // =========================================================================

    /// Append a drink log and, when it references a bottle, consume `quantity`
    /// from it in the same transaction.
    ///
    /// The decrement is guarded by `quantity >= ?`; if another writer drained
    /// the bottle first the whole write is rolled back with
    /// `DatabaseError::Conflict`. Reaching zero moves the bottle to `consumed`.
    pub async fn log_drink(
        &self,
        id: &str,
        user_id: &str,
        params: &DrinkLogParams,
        quantity: i64,
    ) -> Result<(DrinkLog, Option<Bottle>), DatabaseError> {
        let now = unix_timestamp();
        let notes_json =
            serde_json::to_string(&params.tasting_notes).unwrap_or_else(|_| "{}".to_string());

        let mut tx = self.pool().begin().await?;

        if let Some(bottle_id) = &params.bottle_id {
            let result = sqlx::query(
                "UPDATE bottles SET quantity = quantity - ?, \
                 status = CASE WHEN quantity - ? = 0 THEN 'consumed' ELSE status END, \
                 updated_at = ? \
                 WHERE id = ? AND user_id = ? AND quantity >= ?",
            )
            .bind(quantity)
            .bind(quantity)
            .bind(now)
            .bind(bottle_id)
            .bind(user_id)
            .bind(quantity)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                return Err(DatabaseError::Conflict(format!(
                    "Bottle {bottle_id} has fewer than {quantity} left"
                )));
            }
        }

        sqlx::query(
            "INSERT INTO drink_logs (id, user_id, bottle_id, drunk_at, context, venue, notes, \
             rating, tasting_notes, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(user_id)
        .bind(params.bottle_id.as_deref())
        .bind(params.drunk_at)
        .bind(&params.context)
        .bind(&params.venue)
        .bind(&params.notes)
        .bind(params.rating)
        .bind(&notes_json)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        let log = self.get_drink_log(user_id, id).await?;
        let bottle = match &params.bottle_id {
            Some(bottle_id) => Some(self.get_bottle(user_id, bottle_id).await?),
            None => None,
        };
        Ok((log, bottle))
    }

    pub async fn get_drink_log(&self, user_id: &str, id: &str) -> Result<DrinkLog, DatabaseError> {
        sqlx::query_as::<_, DrinkLog>("SELECT * FROM drink_logs WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Drink log {id}")))
    }

    /// Newest first.
    pub async fn list_drink_logs(
        &self,
        user_id: &str,
        bottle_id: Option<&str>,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<DrinkLog>, DatabaseError> {
        let logs = sqlx::query_as::<_, DrinkLog>(
            "SELECT * FROM drink_logs WHERE user_id = ? AND (? IS NULL OR bottle_id = ?) \
             ORDER BY drunk_at DESC, created_at DESC LIMIT ? OFFSET ?",
        )
        .bind(user_id)
        .bind(bottle_id)
        .bind(bottle_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool())
        .await?;

        Ok(logs)
    }

    // =========================================================================
    // Statistics
    // =========================================================================

    pub async fn bottle_status_totals(
        &self,
        user_id: &str,
    ) -> Result<Vec<StatusTotals>, DatabaseError> {
        let rows = sqlx::query_as::<_, StatusTotals>(
            "SELECT status, COUNT(*) AS bottles, COALESCE(SUM(quantity), 0) AS quantity \
             FROM bottles WHERE user_id = ? GROUP BY status ORDER BY status",
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    /// Value of in-cellar stock: price times remaining quantity.
    pub async fn in_cellar_value_cents(&self, user_id: &str) -> Result<i64, DatabaseError> {
        let (value,): (i64,) = sqlx::query_as(
            "SELECT COALESCE(SUM(price_cents * quantity), 0) FROM bottles \
             WHERE user_id = ? AND status = 'in_cellar' AND price_cents IS NOT NULL",
        )
        .bind(user_id)
        .fetch_one(self.pool())
        .await?;
        Ok(value)
    }

    pub async fn bottle_country_totals(
        &self,
        user_id: &str,
    ) -> Result<Vec<CountryTotals>, DatabaseError> {
        let rows = sqlx::query_as::<_, CountryTotals>(
            "SELECT country, COUNT(*) AS bottles FROM bottles \
             WHERE user_id = ? AND country != '' \
             GROUP BY country ORDER BY bottles DESC, country",
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    /// Number of drink logs and their rounded average rating.
    pub async fn drink_log_totals(
        &self,
        user_id: &str,
    ) -> Result<(i64, Option<i64>), DatabaseError> {
        let row: (i64, Option<i64>) = sqlx::query_as(
            "SELECT COUNT(*), CAST(ROUND(AVG(rating)) AS INTEGER) FROM drink_logs WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_one(self.pool())
        .await?;
        Ok(row)
    }
}
