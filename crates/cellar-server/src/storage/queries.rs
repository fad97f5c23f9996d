//! User and location queries.

use cellar_core::db::{DatabaseError, unix_timestamp};

use super::db::CellarDatabase;
use super::models::{Location, User};

impl CellarDatabase {
    // =========================================================================
    // User queries
    // =========================================================================

    /// Create a new user. A duplicate email surfaces as `DatabaseError::Conflict`.
    pub async fn create_user(
        &self,
        id: &str,
        email: &str,
        password_hash: &str,
        display_name: &str,
    ) -> Result<User, DatabaseError> {
        let now = unix_timestamp();

        sqlx::query(
            "INSERT INTO users (id, email, password_hash, display_name, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(email)
        .bind(password_hash)
        .bind(display_name)
        .bind(now)
        .bind(now)
        .execute(self.pool())
        .await?;

        self.get_user(id).await
    }

    /// Get a user by ID.
    pub async fn get_user(&self, id: &str) -> Result<User, DatabaseError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("User {id}")))
    }

    /// Get a user by (already normalised) email.
    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(self.pool())
            .await?;
        Ok(user)
    }

    /// Update profile fields; `None` leaves a field unchanged.
    pub async fn update_user_profile(
        &self,
        id: &str,
        display_name: Option<&str>,
        default_currency: Option<&str>,
        beverage_type: Option<&str>,
    ) -> Result<User, DatabaseError> {
        let now = unix_timestamp();

        let result = sqlx::query(
            "UPDATE users SET \
             display_name = COALESCE(?, display_name), \
             default_currency = COALESCE(?, default_currency), \
             beverage_type = COALESCE(?, beverage_type), \
             updated_at = ? \
             WHERE id = ?",
        )
        .bind(display_name)
        .bind(default_currency)
        .bind(beverage_type)
        .bind(now)
        .bind(id)
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("User {id}")));
        }
        self.get_user(id).await
    }

    // =========================================================================
    // Location queries
    // =========================================================================

    pub async fn create_location(
        &self,
        id: &str,
        user_id: &str,
        name: &str,
    ) -> Result<Location, DatabaseError> {
        let now = unix_timestamp();

        sqlx::query("INSERT INTO locations (id, user_id, name, created_at) VALUES (?, ?, ?, ?)")
            .bind(id)
            .bind(user_id)
            .bind(name)
            .bind(now)
            .execute(self.pool())
            .await?;

        self.get_location(user_id, id).await
    }

    /// Get a location owned by `user_id`.
    pub async fn get_location(&self, user_id: &str, id: &str) -> Result<Location, DatabaseError> {
        sqlx::query_as::<_, Location>("SELECT * FROM locations WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Location {id}")))
    }

    pub async fn list_locations(&self, user_id: &str) -> Result<Vec<Location>, DatabaseError> {
        let locations = sqlx::query_as::<_, Location>(
            "SELECT * FROM locations WHERE user_id = ? ORDER BY name COLLATE NOCASE",
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;
        Ok(locations)
    }

    pub async fn rename_location(
        &self,
        user_id: &str,
        id: &str,
        name: &str,
    ) -> Result<Location, DatabaseError> {
        let result = sqlx::query("UPDATE locations SET name = ? WHERE id = ? AND user_id = ?")
            .bind(name)
            .bind(id)
            .bind(user_id)
            .execute(self.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("Location {id}")));
        }
        self.get_location(user_id, id).await
    }

    /// Delete a location; bottles stored there lose their location reference.
    pub async fn delete_location(&self, user_id: &str, id: &str) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM locations WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
