//! Label-scan client.
//!
//! Sends a label photo to an external vision endpoint and turns the reply
//! into an advisory suggestion. Only high-confidence guesses are marked for
//! auto-fill; everything else is shown as a suggestion.

use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Label scan service returned status {0}")]
    Status(u16),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Unrecognised levels decode as `Low`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum LabelConfidence {
    #[default]
    Low,
    Medium,
    High,
}

impl From<String> for LabelConfidence {
    fn from(level: String) -> Self {
        match level.to_ascii_lowercase().as_str() {
            "high" => Self::High,
            "medium" => Self::Medium,
            _ => Self::Low,
        }
    }
}

/// The vision service's best guess. Missing fields decode as empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LabelGuess {
    pub name: String,
    pub producer: String,
    pub vintage: Option<i64>,
    pub country: String,
    pub region: String,
    pub grapes: String,
    pub confidence: LabelConfidence,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelSuggestion {
    pub guess: LabelGuess,
    /// Whether a client may fill the bottle form without asking.
    pub auto_fill: bool,
}

impl From<LabelGuess> for LabelSuggestion {
    fn from(guess: LabelGuess) -> Self {
        let auto_fill = guess.confidence == LabelConfidence::High && !guess.name.is_empty();
        Self { guess, auto_fill }
    }
}

#[derive(Debug, Clone)]
pub struct LabelScanner {
    http: reqwest::Client,
    url: String,
}

impl LabelScanner {
    pub fn new(url: &str) -> Result<Self, ScanError> {
        if url.is_empty() {
            return Err(ScanError::Config("label scan URL is empty".into()));
        }

        // reqwest is built with rustls-no-provider; Err means already installed.
        let _ = rustls::crypto::ring::default_provider().install_default();

        let http = reqwest::Client::builder().build()?;
        Ok(Self {
            http,
            url: url.to_string(),
        })
    }

    /// Scan one label image.
    pub async fn scan(&self, data: Vec<u8>, content_type: &str) -> Result<LabelSuggestion, ScanError> {
        let resp = self
            .http
            .post(&self.url)
            .header(CONTENT_TYPE, content_type)
            .body(data)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ScanError::Status(status.as_u16()));
        }

        let guess: LabelGuess = resp.json().await?;
        debug!(confidence = ?guess.confidence, "Label scanned");
        Ok(guess.into())
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn empty_url_is_config_error() {
        assert!(matches!(LabelScanner::new(""), Err(ScanError::Config(_))));
        assert!(LabelScanner::new("http://127.0.0.1:9/scan").is_ok());
    }

    #[test]
    fn only_high_confidence_auto_fills() {
        let json = r#"{"name":"Chateau Margaux","vintage":2015,"confidence":"high"}"#;
        let guess: LabelGuess = serde_json::from_str(json).unwrap();
        assert_eq!(guess.vintage, Some(2015));
        assert!(guess.producer.is_empty());
        assert!(LabelSuggestion::from(guess).auto_fill);

        for level in ["medium", "low"] {
            let json = format!(r#"{{"name":"Something","confidence":"{level}"}}"#);
            let guess: LabelGuess = serde_json::from_str(&json).unwrap();
            assert!(!LabelSuggestion::from(guess).auto_fill);
        }
    }

    #[test]
    fn unknown_or_missing_confidence_is_low() {
        let guess: LabelGuess =
            serde_json::from_str(r#"{"name":"X","confidence":"certain"}"#).unwrap();
        assert_eq!(guess.confidence, LabelConfidence::Low);

        let guess: LabelGuess = serde_json::from_str(r#"{"name":"X"}"#).unwrap();
        assert_eq!(guess.confidence, LabelConfidence::Low);
    }

    #[test]
    fn high_confidence_without_name_does_not_auto_fill() {
        let guess = LabelGuess {
            confidence: LabelConfidence::High,
            ..LabelGuess::default()
        };
        assert!(!LabelSuggestion::from(guess).auto_fill);
    }
}
