//! Conversion helpers between domain rows and proto messages.

use cellar_proto::v1 as pb;
use prost_types::Timestamp;
use tonic::Status;

use crate::cellar::CellarSummary;
use crate::media::{LabelConfidence, LabelSuggestion, ScanError};
use crate::storage::{
    Bottle, BottleParams, BottleStatus, DrinkLog, Location, SessionGuest, TastingEntry,
    TastingSession, User,
};
use crate::tasting::{ScorePayload, SessionResults};

pub const fn timestamp(seconds: i64) -> Timestamp {
    Timestamp { seconds, nanos: 0 }
}

/// Seconds of an optional timestamp; sub-second precision is dropped.
pub fn seconds(ts: Option<&Timestamp>) -> Option<i64> {
    ts.map(|t| t.seconds)
}

fn to_i32(v: i64) -> i32 {
    i32::try_from(v).unwrap_or(if v < 0 { i32::MIN } else { i32::MAX })
}

fn to_u32(v: i64) -> u32 {
    u32::try_from(v.max(0)).unwrap_or(u32::MAX)
}

fn to_u64(v: i64) -> u64 {
    u64::try_from(v).unwrap_or(0)
}

/// Map `ScanError` to tonic Status.
#[allow(clippy::needless_pass_by_value)]
pub fn scan_error_to_status(err: ScanError) -> Status {
    match &err {
        ScanError::Config(_) => Status::failed_precondition(err.to_string()),
        ScanError::Http(_) | ScanError::Status(_) => Status::unavailable(err.to_string()),
    }
}

// =========================================================================
// Accounts
// =========================================================================

pub fn beverage_type_to_proto(s: &str) -> pb::BeverageType {
    match s {
        "wine" => pb::BeverageType::Wine,
        "beer" => pb::BeverageType::Beer,
        "both" => pb::BeverageType::Both,
        _ => pb::BeverageType::Unspecified,
    }
}

/// Storage value for a beverage type; `None` for unspecified.
pub const fn beverage_type_from_proto(t: pb::BeverageType) -> Option<&'static str> {
    match t {
        pb::BeverageType::Wine => Some("wine"),
        pb::BeverageType::Beer => Some("beer"),
        pb::BeverageType::Both => Some("both"),
        pb::BeverageType::Unspecified => None,
    }
}

pub fn user_to_proto(u: &User) -> pb::UserProfile {
    pb::UserProfile {
        user_id: u.id.clone(),
        email: u.email.clone(),
        display_name: u.display_name.clone(),
        default_currency: u.default_currency.clone(),
        beverage_type: beverage_type_to_proto(&u.beverage_type).into(),
        created_at: Some(timestamp(u.created_at)),
    }
}

// =========================================================================
// Cellar
// =========================================================================

pub const fn bottle_status_to_proto(s: BottleStatus) -> pb::BottleStatus {
    match s {
        BottleStatus::InCellar => pb::BottleStatus::InCellar,
        BottleStatus::Consumed => pb::BottleStatus::Consumed,
        BottleStatus::Archived => pb::BottleStatus::Archived,
    }
}

pub const fn bottle_status_from_proto(s: pb::BottleStatus) -> Option<BottleStatus> {
    match s {
        pb::BottleStatus::InCellar => Some(BottleStatus::InCellar),
        pb::BottleStatus::Consumed => Some(BottleStatus::Consumed),
        pb::BottleStatus::Archived => Some(BottleStatus::Archived),
        pb::BottleStatus::Unspecified => None,
    }
}

pub fn location_to_proto(l: &Location) -> pb::Location {
    pb::Location {
        id: l.id.clone(),
        name: l.name.clone(),
        created_at: Some(timestamp(l.created_at)),
    }
}

pub fn bottle_to_proto(b: &Bottle) -> pb::Bottle {
    pb::Bottle {
        id: b.id.clone(),
        name: b.name.clone(),
        producer: b.producer.clone(),
        vintage: b.vintage.map(to_i32),
        grapes: b.grapes.clone(),
        country: b.country.clone(),
        region: b.region.clone(),
        status: bottle_status_to_proto(b.status()).into(),
        quantity: to_u32(b.quantity),
        location_id: b.location_id.clone(),
        purchase_date: b.purchase_date.clone(),
        purchase_place: b.purchase_place.clone(),
        price_cents: b.price_cents,
        currency: b.currency.clone(),
        notes: b.notes.clone(),
        photo_url: b.photo_url.clone(),
        created_at: Some(timestamp(b.created_at)),
        updated_at: Some(timestamp(b.updated_at)),
    }
}

pub fn bottle_params_from_proto(f: pb::BottleFields) -> BottleParams {
    BottleParams {
        name: f.name,
        producer: f.producer,
        vintage: f.vintage.map(i64::from),
        grapes: f.grapes,
        country: f.country,
        region: f.region,
        location_id: f.location_id,
        purchase_date: f.purchase_date.filter(|d| !d.is_empty()),
        purchase_place: f.purchase_place,
        price_cents: f.price_cents,
        currency: f.currency,
        notes: f.notes,
        photo_url: f.photo_url.filter(|u| !u.is_empty()),
    }
}

pub fn drink_log_to_proto(d: &DrinkLog) -> pb::DrinkLog {
    pb::DrinkLog {
        id: d.id.clone(),
        bottle_id: d.bottle_id.clone(),
        drunk_at: Some(timestamp(d.drunk_at)),
        context: d.context.clone(),
        venue: d.venue.clone(),
        notes: d.notes.clone(),
        rating: d.rating.map(to_i32),
        tasting_notes: d.tasting_notes().into_iter().collect(),
        created_at: Some(timestamp(d.created_at)),
    }
}

pub fn summary_to_proto(s: &CellarSummary) -> pb::CellarSummary {
    pb::CellarSummary {
        by_status: s
            .by_status
            .iter()
            .map(|t| pb::StatusCount {
                status: BottleStatus::parse(&t.status)
                    .map_or(pb::BottleStatus::Unspecified, bottle_status_to_proto)
                    .into(),
                bottles: to_u64(t.bottles),
                quantity: to_u64(t.quantity),
            })
            .collect(),
        in_cellar_value_cents: s.in_cellar_value_cents,
        by_country: s
            .by_country
            .iter()
            .map(|c| pb::CountryCount {
                country: c.country.clone(),
                bottles: to_u64(c.bottles),
            })
            .collect(),
        drink_log_count: to_u64(s.drink_log_count),
        average_rating: s.average_rating.map(to_i32),
    }
}

pub fn label_suggestion_to_proto(s: LabelSuggestion) -> pb::LabelSuggestion {
    let confidence = match s.guess.confidence {
        LabelConfidence::Low => pb::LabelConfidence::Low,
        LabelConfidence::Medium => pb::LabelConfidence::Medium,
        LabelConfidence::High => pb::LabelConfidence::High,
    };
    pb::LabelSuggestion {
        name: s.guess.name,
        producer: s.guess.producer,
        vintage: s.guess.vintage.map(to_i32),
        country: s.guess.country,
        region: s.guess.region,
        grapes: s.guess.grapes,
        confidence: confidence.into(),
        auto_fill: s.auto_fill,
    }
}

// =========================================================================
// Tasting
// =========================================================================

pub fn session_to_proto(s: &TastingSession) -> pb::TastingSession {
    pb::TastingSession {
        id: s.id.clone(),
        name: s.name.clone(),
        occurred_at: Some(timestamp(s.occurred_at)),
        venue: s.venue.clone(),
        participants: s.participants.clone(),
        notes: s.notes.clone(),
        summary: s.summary.clone(),
        social_mode: s.social_mode,
        join_code: s.join_code.clone(),
        invite_expires_at: s.invite_expires_at.map(timestamp),
        created_at: Some(timestamp(s.created_at)),
    }
}

/// The guest-facing slice of a session.
pub fn guest_view_to_proto(s: &TastingSession, now: i64) -> pb::GuestSessionView {
    let open = s.social_mode && s.invite_expires_at.is_none_or(|exp| now <= exp);
    pb::GuestSessionView {
        name: s.name.clone(),
        occurred_at: Some(timestamp(s.occurred_at)),
        venue: s.venue.clone(),
        join_code: s.join_code.clone().unwrap_or_default(),
        accepting_guests: open,
    }
}

pub fn entry_to_proto(e: &TastingEntry) -> pb::TastingEntry {
    pb::TastingEntry {
        id: e.id.clone(),
        session_id: e.tasting_session_id.clone(),
        bottle_id: e.bottle_id.clone(),
        ad_hoc_name: e.ad_hoc_name.clone(),
        ad_hoc_photo_url: e.ad_hoc_photo_url.clone(),
        materialize_bottle: e.materialize_bottle,
        label: e.label(),
        total_score: e.total_score.map(to_i32),
        tasting_notes: e.tasting_notes().into_iter().collect(),
        short_notes: e.short_notes.clone(),
        long_notes: e.long_notes.clone(),
        tags: e.tags(),
        guest_id: e.guest_id.clone(),
        parent_entry_id: e.parent_entry_id.clone(),
        created_at: Some(timestamp(e.created_at)),
        updated_at: Some(timestamp(e.updated_at)),
    }
}

pub fn guest_to_proto(g: &SessionGuest) -> pb::SessionGuest {
    pb::SessionGuest {
        id: g.id.clone(),
        display_name: g.display_name.clone(),
        joined_at: Some(timestamp(g.joined_at)),
        active: g.active,
    }
}

pub fn score_payload_from_proto(p: Option<pb::ScorePayload>) -> ScorePayload {
    let Some(p) = p else {
        return ScorePayload::default();
    };
    ScorePayload {
        total_score: p.total_score.map(i64::from),
        tasting_notes: p.tasting_notes.into_iter().collect(),
        short_notes: p.short_notes,
        long_notes: p.long_notes,
        tags: p.tags.map(|t| t.tags).unwrap_or_default(),
    }
}

pub fn results_to_proto(r: &SessionResults) -> pb::SessionResults {
    pb::SessionResults {
        wines: r
            .wines
            .iter()
            .map(|w| pb::WineResult {
                entry_id: w.entry_id.clone(),
                label: w.label.clone(),
                host_score: w.host_score.map(to_i32),
                average: to_i32(w.average),
                contributors: w.contributors,
                guest_scores: w
                    .guest_scores
                    .iter()
                    .map(|g| pb::GuestScore {
                        guest_id: g.guest_id.clone(),
                        guest_name: g.guest_name.clone(),
                        total_score: to_i32(g.total_score),
                    })
                    .collect(),
            })
            .collect(),
        guests: r
            .guests
            .iter()
            .map(|g| pb::GuestResult {
                guest_id: g.guest_id.clone(),
                guest_name: g.guest_name.clone(),
                average: to_i32(g.average),
                scored: g.scored,
            })
            .collect(),
        superlatives: Some(pb::Superlatives {
            top_wine_entry_id: r.superlatives.top_wine_entry_id.clone(),
            most_generous_guest_id: r.superlatives.most_generous_guest_id.clone(),
            harshest_critic_guest_id: r.superlatives.harshest_critic_guest_id.clone(),
        }),
    }
}
