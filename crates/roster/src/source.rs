use async_trait::async_trait;

use crate::error::{FetchError, StoreError};
use crate::identity::Identity;
use crate::row::{CreditRow, MemberPatch, MemberRow};
use crate::snapshot::{AwardSnapshot, CreditSnapshot, ItemInfo, Profile, Snapshot};

/// Read-only view of the remote scoreboard.
///
/// Implementations own their transport, timeout and retry policy; callers
/// only see success or a [`FetchError`].
#[async_trait]
pub trait RemoteSource: Send + Sync {
    /// The full roster feed, one profile per member the session account
    /// follows.  One fetch serves a whole cycle.
    async fn fetch_roster_profiles(&self) -> Result<Vec<Profile>, FetchError>;

    /// Identities currently present on the roster feed.
    async fn fetch_roster(&self) -> Result<Vec<Identity>, FetchError> {
        Ok(self
            .fetch_roster_profiles()
            .await?
            .into_iter()
            .map(|profile| Identity::Alias(profile.alias))
            .collect())
    }

    /// One member's line from the roster feed.
    async fn fetch_profile(&self, alias: &str) -> Result<Profile, FetchError> {
        self.fetch_roster_profiles()
            .await?
            .into_iter()
            .find(|profile| profile.alias == alias)
            .ok_or_else(|| FetchError::Structure(format!("{alias} is not in the roster feed")))
    }

    /// One member's award page.
    async fn fetch_awards(&self, alias: &str) -> Result<AwardSnapshot, FetchError>;

    /// One member's post page.
    async fn fetch_credits(&self, alias: &str) -> Result<CreditSnapshot, FetchError>;

    /// The published item catalog.
    async fn fetch_catalog(&self) -> Result<Vec<ItemInfo>, FetchError>;

    /// Highest published item id, `0` for an empty catalog.
    async fn latest_item(&self) -> Result<u32, FetchError> {
        Ok(self
            .fetch_catalog()
            .await?
            .iter()
            .map(|item| item.id)
            .max()
            .unwrap_or(0))
    }

    /// The full remote observation for one member, assembled piecewise.
    async fn fetch_snapshot(&self, alias: &str) -> Result<Snapshot, FetchError> {
        let profile = self.fetch_profile(alias).await?;
        let awards = self.fetch_awards(alias).await?;
        let credits = self.fetch_credits(alias).await?;
        Ok(Snapshot {
            profile,
            awards,
            credits,
            private: false,
        })
    }

    /// Cheap health probe.  Network-backed implementations answer
    /// truthfully; the default assumes a healthy source.
    async fn is_reachable(&self) -> bool {
        true
    }

    /// Whether the source still recognizes the configured session.
    async fn is_authenticated(&self) -> bool {
        true
    }
}

/// Persisted member and credit baselines.
#[async_trait]
pub trait RowStore: Send + Sync {
    async fn read_all(&self) -> Result<Vec<MemberRow>, StoreError>;

    /// Look up one row, by alias directly or through the linked-id index.
    async fn read_member(&self, identity: &Identity) -> Result<Option<MemberRow>, StoreError>;

    async fn insert_member(&self, row: &MemberRow) -> Result<(), StoreError>;

    /// Apply a partial update.  An absent row is a no-op, never an insert.
    async fn update_member(
        &self,
        identity: &Identity,
        patch: &MemberPatch,
    ) -> Result<(), StoreError>;

    async fn read_credit(&self, alias: &str) -> Result<Option<CreditRow>, StoreError>;

    async fn write_credit(&self, row: &CreditRow) -> Result<(), StoreError>;

    async fn member_count(&self) -> Result<u64, StoreError>;
}

// ── Tests ────────────────────────────────────────────────────────────────────
