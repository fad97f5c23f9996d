//! Bottles, storage locations and drink logs of one owner.

use tracing::{debug, info};

use crate::error::{ServiceError, ServiceResult};
use crate::storage::{
    Bottle, BottleParams, BottleStatus, CellarDatabase, CountryTotals, DatabaseError, DrinkLog,
    DrinkLogParams, Location, StatusTotals,
};

const MAX_RATING: i64 = 100;

/// Read-only cellar figures for charts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellarSummary {
    /// One row per status, including statuses with no bottles.
    pub by_status: Vec<StatusTotals>,
    pub in_cellar_value_cents: i64,
    pub by_country: Vec<CountryTotals>,
    pub drink_log_count: i64,
    pub average_rating: Option<i64>,
}

#[derive(Clone)]
pub struct CellarManager {
    db: CellarDatabase,
}

fn bottle_err(e: DatabaseError) -> ServiceError {
    ServiceError::from_db(e, "Bottle")
}

fn location_err(e: DatabaseError) -> ServiceError {
    match e {
        DatabaseError::Conflict(_) => {
            ServiceError::Conflict("A location with that name already exists".into())
        }
        other => ServiceError::from_db(other, "Location"),
    }
}

impl CellarManager {
    pub const fn new(db: CellarDatabase) -> Self {
        Self { db }
    }

    // =========================================================================
    // Locations
    // =========================================================================

    pub async fn create_location(&self, user_id: &str, name: &str) -> ServiceResult<Location> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ServiceError::validation("Location name is required"));
        }
        let id = uuid::Uuid::new_v4().to_string();
        self.db
            .create_location(&id, user_id, name)
            .await
            .map_err(location_err)
    }

    pub async fn list_locations(&self, user_id: &str) -> ServiceResult<Vec<Location>> {
        Ok(self.db.list_locations(user_id).await?)
    }

    pub async fn rename_location(
        &self,
        user_id: &str,
        id: &str,
        name: &str,
    ) -> ServiceResult<Location> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ServiceError::validation("Location name is required"));
        }
        self.db
            .rename_location(user_id, id, name)
            .await
            .map_err(location_err)
    }

    pub async fn delete_location(&self, user_id: &str, id: &str) -> ServiceResult<()> {
        if !self.db.delete_location(user_id, id).await? {
            return Err(ServiceError::not_found("Location"));
        }
        Ok(())
    }

    // =========================================================================
    // Bottles
    // =========================================================================

    /// Add a bottle. Quantity defaults to 1; a bottle added with none left
    /// starts out consumed.
    pub async fn create_bottle(
        &self,
        user_id: &str,
        params: BottleParams,
        quantity: Option<i64>,
    ) -> ServiceResult<Bottle> {
        let params = self.checked_params(user_id, params).await?;
        let quantity = quantity.unwrap_or(1);
        if quantity < 0 {
            return Err(ServiceError::validation("Quantity must not be negative"));
        }
        let status = if quantity == 0 {
            BottleStatus::Consumed
        } else {
            BottleStatus::InCellar
        };

        let id = uuid::Uuid::new_v4().to_string();
        let bottle = self
            .db
            .create_bottle(&id, user_id, &params, quantity, status.as_str())
            .await
            .map_err(bottle_err)?;

        debug!(bottle_id = %id, user_id, "Bottle added");
        Ok(bottle)
    }

    pub async fn get_bottle(&self, user_id: &str, id: &str) -> ServiceResult<Bottle> {
        self.db.get_bottle(user_id, id).await.map_err(bottle_err)
    }

    pub async fn list_bottles(
        &self,
        user_id: &str,
        status: Option<BottleStatus>,
        location_id: Option<&str>,
        limit: u32,
        offset: u32,
    ) -> ServiceResult<Vec<Bottle>> {
        Ok(self
            .db
            .list_bottles(
                user_id,
                status.map(|s| s.as_str()),
                location_id,
                limit,
                offset,
            )
            .await?)
    }

    /// Replace the descriptive fields, optionally setting a new quantity.
    ///
    /// Setting the quantity of an in-cellar bottle to 0 marks it consumed.
    pub async fn update_bottle(
        &self,
        user_id: &str,
        id: &str,
        params: BottleParams,
        quantity: Option<i64>,
    ) -> ServiceResult<Bottle> {
        let params = self.checked_params(user_id, params).await?;
        if quantity.is_some_and(|q| q < 0) {
            return Err(ServiceError::validation("Quantity must not be negative"));
        }

        let bottle = self
            .db
            .update_bottle(user_id, id, &params, quantity)
            .await
            .map_err(bottle_err)?;

        if bottle.quantity == 0 && bottle.status() == BottleStatus::InCellar {
            return self
                .db
                .set_bottle_state(user_id, id, BottleStatus::Consumed.as_str(), 0)
                .await
                .map_err(bottle_err);
        }
        Ok(bottle)
    }

    /// Move a bottle through its lifecycle.
    ///
    /// Archiving keeps the quantity. Marking consumed empties the bottle.
    /// Restoring to the cellar gives an empty bottle a quantity of 1.
    pub async fn set_status(
        &self,
        user_id: &str,
        id: &str,
        status: BottleStatus,
    ) -> ServiceResult<Bottle> {
        let bottle = self.get_bottle(user_id, id).await?;
        let current = bottle.status();
        if current == status {
            return Ok(bottle);
        }

        let quantity = match status {
            BottleStatus::Archived => bottle.quantity,
            BottleStatus::Consumed => 0,
            BottleStatus::InCellar => bottle.quantity.max(1),
        };

        let updated = self
            .db
            .set_bottle_state(user_id, id, status.as_str(), quantity)
            .await
            .map_err(bottle_err)?;

        info!(bottle_id = %id, from = %current, to = %status, "Bottle status changed");
        Ok(updated)
    }

    pub async fn delete_bottle(&self, user_id: &str, id: &str) -> ServiceResult<()> {
        if !self.db.delete_bottle(user_id, id).await? {
            return Err(ServiceError::not_found("Bottle"));
        }
        Ok(())
    }

    async fn checked_params(
        &self,
        user_id: &str,
        mut params: BottleParams,
    ) -> ServiceResult<BottleParams> {
        params.name = params.name.trim().to_string();
        if params.name.is_empty() {
            return Err(ServiceError::validation("Bottle name is required"));
        }
        if params.vintage.is_some_and(|v| !(1000..=9999).contains(&v)) {
            return Err(ServiceError::validation("Vintage must be a four-digit year"));
        }
        if params.price_cents.is_some_and(|p| p < 0) {
            return Err(ServiceError::validation("Price must not be negative"));
        }
        params.currency = params.currency.trim().to_ascii_uppercase();
        if params.currency.is_empty() {
            params.currency = self
                .db
                .get_user(user_id)
                .await
                .map_err(|e| ServiceError::from_db(e, "User"))?
                .default_currency;
        }
        params.location_id = params.location_id.filter(|l| !l.is_empty());
        if let Some(location_id) = &params.location_id {
            self.db
                .get_location(user_id, location_id)
                .await
                .map_err(|e| ServiceError::from_db(e, "Location"))?;
        }
        Ok(params)
    }

    // =========================================================================
    // Drink logs
    // =========================================================================

    /// Record a drinking occasion, consuming `quantity` from the referenced
    /// bottle (1 when 0 is given). Emptying a bottle marks it consumed.
    pub async fn log_drink(
        &self,
        user_id: &str,
        mut params: DrinkLogParams,
        quantity: u32,
    ) -> ServiceResult<(DrinkLog, Option<Bottle>)> {
        let quantity = i64::from(quantity.max(1));
        if params.rating.is_some_and(|r| !(0..=MAX_RATING).contains(&r)) {
            return Err(ServiceError::validation(format!(
                "Rating must be between 0 and {MAX_RATING}"
            )));
        }
        params.bottle_id = params.bottle_id.filter(|b| !b.is_empty());

        if let Some(bottle_id) = &params.bottle_id {
            let bottle = self.get_bottle(user_id, bottle_id).await?;
            if bottle.quantity < quantity {
                return Err(ServiceError::validation(format!(
                    "Only {} left of this bottle",
                    bottle.quantity
                )));
            }
        }

        let id = uuid::Uuid::new_v4().to_string();
        let (log, bottle) = self
            .db
            .log_drink(&id, user_id, &params, quantity)
            .await
            .map_err(|e| match e {
                // Another log drained the bottle between the check and the write.
                DatabaseError::Conflict(msg) => ServiceError::Validation(msg),
                other => bottle_err(other),
            })?;

        if let Some(b) = &bottle {
            debug!(bottle_id = %b.id, remaining = b.quantity, status = %b.status, "Drink logged");
        }
        Ok((log, bottle))
    }

    pub async fn list_drink_logs(
        &self,
        user_id: &str,
        bottle_id: Option<&str>,
        limit: u32,
        offset: u32,
    ) -> ServiceResult<Vec<DrinkLog>> {
        Ok(self
            .db
            .list_drink_logs(user_id, bottle_id, limit, offset)
            .await?)
    }

    // =========================================================================
    // Summary
    // =========================================================================

    pub async fn summary(&self, user_id: &str) -> ServiceResult<CellarSummary> {
        let totals = self.db.bottle_status_totals(user_id).await?;
        let by_status = [
            BottleStatus::InCellar,
            BottleStatus::Consumed,
            BottleStatus::Archived,
        ]
        .into_iter()
        .map(|status| {
            totals
                .iter()
                .find(|t| t.status == status.as_str())
                .cloned()
                .unwrap_or_else(|| StatusTotals {
                    status: status.as_str().to_string(),
                    bottles: 0,
                    quantity: 0,
                })
        })
        .collect();

        let (drink_log_count, average_rating) = self.db.drink_log_totals(user_id).await?;

        Ok(CellarSummary {
            by_status,
            in_cellar_value_cents: self.db.in_cellar_value_cents(user_id).await?,
            by_country: self.db.bottle_country_totals(user_id).await?,
            drink_log_count,
            average_rating,
        })
    }
}
