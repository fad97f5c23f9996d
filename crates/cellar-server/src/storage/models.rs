//! Data models for Cellar storage.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub email: String,
    pub password_hash: String,
    pub display_name: String,
    pub default_currency: String,
    pub beverage_type: String,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Location {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub created_at: i64,
}

/// Lifecycle state of a bottle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BottleStatus {
    InCellar,
    Consumed,
    Archived,
}

impl BottleStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::InCellar => "in_cellar",
            Self::Consumed => "consumed",
            Self::Archived => "archived",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "in_cellar" => Some(Self::InCellar),
            "consumed" => Some(Self::Consumed),
            "archived" => Some(Self::Archived),
            _ => None,
        }
    }
}

impl std::fmt::Display for BottleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Bottle {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub producer: String,
    pub vintage: Option<i64>,
    pub grapes: String,
    pub country: String,
    pub region: String,
    pub status: String,
    pub quantity: i64,
    pub location_id: Option<String>,
    pub purchase_date: Option<String>,
    pub purchase_place: String,
    pub price_cents: Option<i64>,
    pub currency: String,
    pub notes: String,
    pub photo_url: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Bottle {
    /// Parsed status; the CHECK constraint keeps unknown values out.
    pub fn status(&self) -> BottleStatus {
        BottleStatus::parse(&self.status).unwrap_or(BottleStatus::InCellar)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DrinkLog {
    pub id: String,
    pub user_id: String,
    pub bottle_id: Option<String>,
    pub drunk_at: i64,
    pub context: String,
    pub venue: String,
    pub notes: String,
    pub rating: Option<i64>,
    pub tasting_notes: String,
    pub created_at: i64,
}

impl DrinkLog {
    pub fn tasting_notes(&self) -> BTreeMap<String, String> {
        decode_notes(&self.tasting_notes)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TastingSession {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub occurred_at: i64,
    pub venue: String,
    pub participants: String,
    pub notes: String,
    pub summary: String,
    pub social_mode: bool,
    pub join_code: Option<String>,
    pub invite_expires_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// A tasting entry row.
///
/// Host (template) entries have neither `guest_id` nor `parent_entry_id`;
/// guest score entries have both. `bottle_name` is joined in from `bottles`.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TastingEntry {
    pub id: String,
    pub tasting_session_id: String,
    pub bottle_id: Option<String>,
    pub ad_hoc_name: Option<String>,
    pub ad_hoc_photo_url: Option<String>,
    pub materialize_bottle: bool,
    pub total_score: Option<i64>,
    pub tasting_notes: String,
    pub short_notes: Option<String>,
    pub long_notes: Option<String>,
    pub tags: String,
    pub guest_id: Option<String>,
    pub parent_entry_id: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
    pub bottle_name: Option<String>,
}

impl TastingEntry {
    pub const fn is_host_entry(&self) -> bool {
        self.guest_id.is_none() && self.parent_entry_id.is_none()
    }

    /// Name shown for the wine: the bottle's name, else the ad-hoc name.
    pub fn label(&self) -> String {
        self.bottle_name
            .as_deref()
            .or(self.ad_hoc_name.as_deref())
            .unwrap_or_default()
            .to_string()
    }

    pub fn tasting_notes(&self) -> BTreeMap<String, String> {
        decode_notes(&self.tasting_notes)
    }

    pub fn tags(&self) -> Vec<String> {
        serde_json::from_str(&self.tags).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SessionGuest {
    pub id: String,
    pub tasting_session_id: String,
    pub display_name: String,
    pub token_hash: String,
    pub joined_at: i64,
    pub active: bool,
}

/// Bottle count and quantity for one status.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct StatusTotals {
    pub status: String,
    pub bottles: i64,
    pub quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct CountryTotals {
    pub country: String,
    pub bottles: i64,
}

fn decode_notes(raw: &str) -> BTreeMap<String, String> {
    serde_json::from_str(raw).unwrap_or_default()
}
