//! HTTP client for the scoreboard's minimal feeds and progress pages.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use tally_config::RemoteConfig;
use tally_roster::{AwardSnapshot, CreditSnapshot, FetchError, ItemInfo, Profile, RemoteSource};

use crate::feed::{parse_catalog_feed, parse_roster_feed};
use crate::pages::{parse_award_page, parse_post_page};
use crate::session::SessionJar;

/// Marker the scoreboard renders only for signed-in sessions.
const AUTHENTICATED_MARKER: &str = "Logged in as";

const USER_AGENT: &str = concat!("tally/", env!("CARGO_PKG_VERSION"));

/// Request counters, readable as a snapshot at any time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FetchMetrics {
    pub total_requests: u64,
    pub successful_requests: u64,
    /// Requests that went out with session cookies attached.
    pub session_requests: u64,
    pub last_success_at: Option<DateTime<Utc>>,
    /// Outcome of the most recent request.
    pub last_request_ok: bool,
}

#[derive(Debug)]
pub struct RemoteClient {
    http: reqwest::Client,
    base_url: String,
    session: SessionJar,
    metrics: Mutex<FetchMetrics>,
}

impl RemoteClient {
    /// Build a client from configuration, loading the session jar when one
    /// is configured.
    pub fn from_config(config: &RemoteConfig) -> Result<Self, FetchError> {
        let session = if config.session_file.is_empty() {
            SessionJar::anonymous()
        } else {
            SessionJar::load(&config.session_file)?
        };
        Self::new(
            &config.base_url,
            Duration::from_secs(config.timeout_secs),
            session,
        )
    }

    pub fn new(
        base_url: &str,
        timeout: Duration,
        session: SessionJar,
    ) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .gzip(true)
            .build()
            .map_err(|e| FetchError::Unavailable(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
            metrics: Mutex::new(FetchMetrics::default()),
        })
    }

    pub fn has_session(&self) -> bool {
        !self.session.is_empty()
    }

    /// Snapshot of the request counters.
    pub fn metrics(&self) -> FetchMetrics {
        self.lock_metrics().clone()
    }

    async fn get_text(&self, path: &str, with_session: bool) -> Result<String, FetchError> {
        let url = format!("{}/{}", self.base_url, path);
        let mut request = self.http.get(&url);
        let mut used_session = false;
        if with_session {
            if let Some(cookie) = self.session.header_value() {
                request = request.header(reqwest::header::COOKIE, cookie);
                used_session = true;
            }
        }

        let result = match request.send().await {
            Err(e) if e.is_timeout() => Err(FetchError::Unavailable(format!("{url}: timed out"))),
            Err(e) => Err(FetchError::Unavailable(format!("{url}: {e}"))),
            Ok(response) if !response.status().is_success() => Err(FetchError::Unavailable(
                format!("{url} returned HTTP {}", response.status()),
            )),
            Ok(response) => response
                .text()
                .await
                .map_err(|e| FetchError::Unavailable(format!("{url}: {e}"))),
        };

        self.record(used_session, result.is_ok());
        debug!(%url, session = used_session, ok = result.is_ok(), "fetched");
        result
    }

    fn record(&self, used_session: bool, ok: bool) {
        let mut metrics = self.lock_metrics();
        metrics.total_requests += 1;
        if used_session {
            metrics.session_requests += 1;
        }
        if ok {
            metrics.successful_requests += 1;
            metrics.last_success_at = Some(Utc::now());
        }
        metrics.last_request_ok = ok;
    }

    fn lock_metrics(&self) -> std::sync::MutexGuard<'_, FetchMetrics> {
        self.metrics
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl RemoteSource for RemoteClient {
    async fn fetch_roster_profiles(&self) -> Result<Vec<Profile>, FetchError> {
        let text = self.get_text("minimal=roster", true).await?;
        parse_roster_feed(&text)
    }

    async fn fetch_awards(&self, alias: &str) -> Result<AwardSnapshot, FetchError> {
        let html = self
            .get_text(&format!("progress={alias};show=awards"), true)
            .await?;
        parse_award_page(&html)
    }

    async fn fetch_credits(&self, alias: &str) -> Result<CreditSnapshot, FetchError> {
        let html = self
            .get_text(&format!("progress={alias};show=posts"), true)
            .await?;
        parse_post_page(&html)
    }

    async fn fetch_catalog(&self) -> Result<Vec<ItemInfo>, FetchError> {
        let text = self.get_text("minimal=items", false).await?;
        parse_catalog_feed(&text)
    }

    /// True when the scoreboard answers at all, signed in or not.
    async fn is_reachable(&self) -> bool {
        self.get_text("", false).await.is_ok()
    }

    /// True when the session cookies still identify an account.
    async fn is_authenticated(&self) -> bool {
        match self.get_text("", true).await {
            Ok(body) => body.contains(AUTHENTICATED_MARKER),
            Err(_) => false,
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
