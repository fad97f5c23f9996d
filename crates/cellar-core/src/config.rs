//! Configuration resolution for Cellar.
//!
//! Implements hierarchical config resolution:
//! 1. Built-in defaults
//! 2. Global config (~/.config/cellar/settings.json)
//! 3. Explicit config file (`--config`)
//! 4. Environment variables
//! 5. CLI arguments (highest priority, applied by the binary)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Complete Cellar configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub tasting: TastingConfig,
    #[serde(default)]
    pub media: MediaConfig,
    #[serde(default)]
    pub notifications: NotificationConfig,
}

/// Listener and storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub addr: String,
    pub database_path: Option<PathBuf>,
    pub log_json: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "0.0.0.0:50051".to_string(),
            database_path: None,
            log_json: false,
        }
    }
}

/// Bearer token lifetimes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Owner session token TTL (seconds). Default: 7 days.
    pub owner_token_ttl_secs: i64,
    /// Guest token TTL (seconds). Default: 7 days.
    pub guest_token_ttl_secs: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            owner_token_ttl_secs: 7 * 24 * 60 * 60,
            guest_token_ttl_secs: 7 * 24 * 60 * 60,
        }
    }
}

/// Tasting session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TastingConfig {
    /// How long an invite stays open after social mode is enabled (seconds).
    pub invite_ttl_secs: i64,
    /// Attempts at minting a join code before giving up on collisions.
    pub join_code_attempts: u32,
}

impl Default for TastingConfig {
    fn default() -> Self {
        Self {
            invite_ttl_secs: 24 * 60 * 60,
            join_code_attempts: 5,
        }
    }
}

/// Image storage and label scanning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    pub upload_dir: Option<PathBuf>,
    /// Prefix joined with the stored file name to form a public URL.
    pub public_base_url: String,
    pub max_upload_bytes: usize,
    /// Label-scan endpoint. Scanning is disabled when unset.
    pub label_scan_url: Option<String>,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            upload_dir: None,
            public_base_url: "/media".to_string(),
            max_upload_bytes: 10 * 1024 * 1024, // 10 MB
            label_scan_url: None,
        }
    }
}

/// Best-effort outbound notifications.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// Webhook receiving "guest joined" events. Disabled when unset.
    pub webhook_url: Option<String>,
    pub timeout_secs: u64,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            timeout_secs: 5,
        }
    }
}

/// Load configuration with hierarchical resolution.
///
/// `explicit` is a config file named on the command line; a missing explicit
/// file is an error, a missing global file is not.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let mut config = Config::default();

    if let Some(global_path) = global_config_path() {
        if global_path.exists() {
            config = load_config_file(&global_path)?;
        }
    }

    if let Some(path) = explicit {
        config = load_config_file(path)?;
    }

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());

    Ok(config)
}

/// Get the global config file path.
pub fn global_config_path() -> Option<PathBuf> {
    config_dir().map(|p| p.join("settings.json"))
}

/// Default location of the server database.
pub fn database_path() -> Option<PathBuf> {
    config_dir().map(|p| p.join("cellar.db"))
}

/// Default directory for uploaded images.
pub fn upload_dir() -> Option<PathBuf> {
    config_dir().map(|p| p.join("media"))
}

/// Per-user settings directory, e.g. `~/.config/cellar` on Linux.
fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("cellar"))
}

fn load_config_file(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&content).map_err(|e| {
        Error::Config(format!("Failed to parse config file {}: {}", path.display(), e))
    })
}

fn apply_env_overrides(config: &mut Config, var: impl Fn(&str) -> Option<String>) {
    if let Some(val) = var("CELLAR_ADDR") {
        config.server.addr = val;
    }
    if let Some(val) = var("CELLAR_DATABASE_PATH") {
        config.server.database_path = Some(PathBuf::from(val));
    }
    if let Some(n) = var("CELLAR_OWNER_TOKEN_TTL").and_then(|v| v.parse().ok()) {
        config.auth.owner_token_ttl_secs = n;
    }
    if let Some(n) = var("CELLAR_GUEST_TOKEN_TTL").and_then(|v| v.parse().ok()) {
        config.auth.guest_token_ttl_secs = n;
    }
    if let Some(n) = var("CELLAR_INVITE_TTL").and_then(|v| v.parse().ok()) {
        config.tasting.invite_ttl_secs = n;
    }
    if let Some(val) = var("CELLAR_UPLOAD_DIR") {
        config.media.upload_dir = Some(PathBuf::from(val));
    }
    if let Some(val) = var("CELLAR_PUBLIC_BASE_URL") {
        config.media.public_base_url = val;
    }
    if let Some(val) = var("CELLAR_LABEL_SCAN_URL") {
        config.media.label_scan_url = Some(val);
    }
    if let Some(val) = var("CELLAR_WEBHOOK_URL") {
        config.notifications.webhook_url = Some(val);
    }
}
