//! Score payload validation and the tasting-note key catalogue.
//!
//! Tasting notes are an open string map. The catalogue below lists the keys
//! each tasting mode knows about; it is a hint for clients and logs, never a
//! filter. Unknown keys are stored as given.

use std::collections::BTreeMap;

use tracing::debug;

use crate::error::{ServiceError, ServiceResult};
use crate::storage::EntryScore;

pub const MAX_SCORE: i64 = 100;

const MAX_NOTE_KEY_LEN: usize = 64;
const MAX_TEXT_LEN: usize = 4000;

/// Structured tasting mode a note key belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TastingMode {
    Wine,
    Beer,
    Casual,
}

pub const WINE_KEYS: &[&str] = &[
    "clarity",
    "intensityAppearance",
    "colour",
    "condition",
    "intensityNose",
    "aromaCharacteristics",
    "development",
    "sweetness",
    "acidity",
    "tannin",
    "alcohol",
    "body",
    "flavourIntensity",
    "flavourCharacteristics",
    "finish",
    "qualityLevel",
    "readiness",
];

pub const BEER_KEYS: &[&str] = &[
    "beerColour",
    "beerClarity",
    "headRetention",
    "maltAroma",
    "hopAroma",
    "bitterness",
    "beerBody",
    "carbonation",
    "overallImpression",
];

pub const CASUAL_KEYS: &[&str] = &[
    "casualLooks",
    "casualSmell",
    "casualTaste",
    "casualDrinkability",
    "casualValue",
    "casualBuyAgain",
];

impl TastingMode {
    pub const fn keys(self) -> &'static [&'static str] {
        match self {
            Self::Wine => WINE_KEYS,
            Self::Beer => BEER_KEYS,
            Self::Casual => CASUAL_KEYS,
        }
    }

    /// The mode that recognises `key`, if any.
    pub fn of_key(key: &str) -> Option<Self> {
        [Self::Wine, Self::Beer, Self::Casual]
            .into_iter()
            .find(|mode| mode.keys().contains(&key))
    }
}

/// A score as submitted by an owner or guest, before validation.
#[derive(Debug, Clone, Default)]
pub struct ScorePayload {
    pub total_score: Option<i64>,
    pub tasting_notes: BTreeMap<String, String>,
    pub short_notes: Option<String>,
    pub long_notes: Option<String>,
    pub tags: Vec<String>,
}

impl ScorePayload {
    /// Check bounds and tidy free text.
    ///
    /// Blank notes become `None`; tags are trimmed, blanks dropped and
    /// duplicates removed in first-seen order.
    pub fn validate(self) -> ServiceResult<EntryScore> {
        if let Some(total) = self.total_score.filter(|t| !(0..=MAX_SCORE).contains(t)) {
            return Err(ServiceError::validation(format!(
                "Total score must be between 0 and {MAX_SCORE}, got {total}"
            )));
        }

        for key in self.tasting_notes.keys() {
            if key.trim().is_empty() {
                return Err(ServiceError::validation("Tasting note keys must not be blank"));
            }
            if key.len() > MAX_NOTE_KEY_LEN {
                return Err(ServiceError::validation(format!(
                    "Tasting note key exceeds {MAX_NOTE_KEY_LEN} characters"
                )));
            }
        }

        let unknown = self
            .tasting_notes
            .keys()
            .filter(|k| TastingMode::of_key(k).is_none())
            .count();
        if unknown > 0 {
            debug!(unknown, "Storing unrecognised tasting note keys");
        }

        let mut tags: Vec<String> = Vec::with_capacity(self.tags.len());
        for tag in self.tags {
            let tag = tag.trim();
            if !tag.is_empty() && !tags.iter().any(|t| t == tag) {
                tags.push(tag.to_string());
            }
        }

        Ok(EntryScore {
            total_score: self.total_score,
            tasting_notes: self.tasting_notes,
            short_notes: tidy_text(self.short_notes, "Short notes")?,
            long_notes: tidy_text(self.long_notes, "Long notes")?,
            tags,
        })
    }
}

fn tidy_text(text: Option<String>, field: &str) -> ServiceResult<Option<String>> {
    match text {
        Some(t) if t.len() > MAX_TEXT_LEN => Err(ServiceError::validation(format!(
            "{field} exceed {MAX_TEXT_LEN} characters"
        ))),
        Some(t) if t.trim().is_empty() => Ok(None),
        other => Ok(other),
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_totals_are_rejected() {
        for total in [-1, 101] {
            let payload = ScorePayload {
                total_score: Some(total),
                ..ScorePayload::default()
            };
            assert!(matches!(
                payload.validate(),
                Err(ServiceError::Validation(_))
            ));
        }

        for total in [0, 100] {
            let payload = ScorePayload {
                total_score: Some(total),
                ..ScorePayload::default()
            };
            assert_eq!(payload.validate().unwrap().total_score, Some(total));
        }
    }

    #[test]
    fn unknown_note_keys_pass_through() {
        let mut notes = BTreeMap::new();
        notes.insert("acidity".to_string(), "high".to_string());
        notes.insert("futureField".to_string(), "42".to_string());
        let score = ScorePayload {
            tasting_notes: notes,
            ..ScorePayload::default()
        }
        .validate()
        .unwrap();

        assert_eq!(score.tasting_notes.len(), 2);
        assert_eq!(score.tasting_notes["futureField"], "42");
    }

    #[test]
    fn blank_note_key_is_rejected() {
        let mut notes = BTreeMap::new();
        notes.insert("  ".to_string(), "x".to_string());
        let payload = ScorePayload {
            tasting_notes: notes,
            ..ScorePayload::default()
        };
        assert!(payload.validate().is_err());
    }

    #[test]
    fn text_and_tags_are_tidied() {
        let score = ScorePayload {
            short_notes: Some("   ".into()),
            long_notes: Some("Long and layered".into()),
            tags: vec![" cherry ".into(), String::new(), "cherry".into(), "oak".into()],
            ..ScorePayload::default()
        }
        .validate()
        .unwrap();

        assert!(score.short_notes.is_none());
        assert_eq!(score.long_notes.as_deref(), Some("Long and layered"));
        assert_eq!(score.tags, ["cherry", "oak"]);
    }

    #[test]
    fn catalogue_lookup() {
        assert_eq!(TastingMode::of_key("tannin"), Some(TastingMode::Wine));
        assert_eq!(TastingMode::of_key("hopAroma"), Some(TastingMode::Beer));
        assert_eq!(TastingMode::of_key("casualValue"), Some(TastingMode::Casual));
        assert_eq!(TastingMode::of_key("mystery"), None);
    }
}
