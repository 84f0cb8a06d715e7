use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

// ── Credit write-back mode ────────────────────────────────────────────────────

/// Controls how credit rows are written back after a reconciliation.
///
/// | Mode     | Behaviour                                                      |
/// |----------|----------------------------------------------------------------|
/// | `upsert` | A second reconciliation for the same member amends the row.    |
/// | `append` | Every write adds a new generation; reads return the oldest, so |
/// |          | the credit baseline never advances (legacy-compatible).        |
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CreditWrites {
    #[default]
    Upsert,
    Append,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Base URL of the remote scoreboard.
    pub base_url: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Path to a JSON file holding the session cookies.  Empty means the
    /// client browses anonymously (friend rosters and award pages then come
    /// back empty).  Overridden at runtime by the `TALLY_SESSION_FILE`
    /// environment variable when set.
    pub session_file: String,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://scoreboard.example.net".to_string(),
            timeout_secs: 30,
            session_file: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Path of the on-disk row store.  Overridden by `TALLY_STORE_PATH`.
    pub path: String,
    /// See [`CreditWrites`] for semantics.
    pub credit_writes: CreditWrites,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: "tally.redb".to_string(),
            credit_writes: CreditWrites::Upsert,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CycleConfig {
    /// Minutes between reconciliation cycles when running as a daemon.
    pub interval_minutes: u64,
    /// Reconcile forum-post credit inside the periodic cycle.  Off by
    /// default; credit is normally polled on demand because it needs one
    /// extra page fetch per member.
    pub include_credits: bool,
    /// When the remote catalog has grown past the widest persisted solve
    /// sequence, re-push every member's baseline so stored sequences cover
    /// the new items.
    pub extend_baselines: bool,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            interval_minutes: 15,
            include_credits: false,
            extend_baselines: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub log_level: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub remote: RemoteConfig,
    pub store: StoreConfig,
    pub cycle: CycleConfig,
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let mut config = Self::default();
        if let Ok(raw) = fs::read_to_string(path) {
            config = toml::from_str(&raw)?;
        }

        // Env overrides take precedence over the config file.
        if let Ok(value) = env::var("TALLY_SESSION_FILE") {
            if !value.is_empty() {
                config.remote.session_file = value;
            }
        }
        if let Ok(value) = env::var("TALLY_STORE_PATH") {
            if !value.is_empty() {
                config.store.path = value;
            }
        }

        Ok(config)
    }

    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }

        let rendered = toml::to_string_pretty(self)?;
        fs::write(path, rendered)?;
        Ok(())
    }

    /// Session cookie file, `None` when browsing anonymously.
    pub fn session_path(&self) -> Option<&Path> {
        if self.remote.session_file.is_empty() {
            None
        } else {
            Some(Path::new(&self.remote.session_file))
        }
    }

    pub fn cycle_interval(&self) -> Duration {
        Duration::from_secs(self.cycle.interval_minutes * 60)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.remote.timeout_secs)
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
