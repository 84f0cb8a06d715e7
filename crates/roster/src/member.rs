use std::sync::Arc;

use tracing::debug;

use crate::award::{AwardDelta, AwardState};
use crate::bits::BitSeq;
use crate::credit::{CreditDelta, CreditState};
use crate::diff;
use crate::error::RosterError;
use crate::identity::Identity;
use crate::record::MemberSummary;
use crate::row::{CreditRow, MemberPatch, MemberRow};
use crate::snapshot::Profile;
use crate::source::{RemoteSource, RowStore};
use crate::sourced::Sourced;

/// Fetch-insert-reread rounds attempted before a missing row is declared
/// unbootstrappable.
pub const BOOTSTRAP_MAX_ATTEMPTS: u32 = 3;

/// One member under reconciliation.
///
/// Created fresh per cycle.  Every attribute sits in a [`Sourced`] cache that
/// records which side has reported it; accessors resolve lazily, preferring
/// whatever is already cached over triggering a fetch.  Remote-specific
/// accessors always represent "as currently observed on the source",
/// persisted-specific ones the last written baseline.
pub struct Member {
    alias: Option<String>,
    linked: Option<String>,

    remote: Arc<dyn RemoteSource>,
    store: Arc<dyn RowStore>,

    display_name: Sourced<String>,
    solve_count: Sourced<u32>,
    solves: Sourced<BitSeq>,
    award_count: Sourced<u32>,
    awards: Sourced<AwardState>,
    credit_total: Sourced<u32>,
    credits: Sourced<CreditState>,
    post_count: Sourced<u32>,

    locale: Option<String>,
    language: Option<String>,
    level: Option<u32>,
    private: Option<bool>,
}

impl Member {
    pub fn by_alias(
        alias: impl Into<String>,
        remote: Arc<dyn RemoteSource>,
        store: Arc<dyn RowStore>,
    ) -> Self {
        let mut member = Self::blank(remote, store);
        member.alias = Some(alias.into());
        member
    }

    pub fn by_linked(
        linked: impl Into<String>,
        remote: Arc<dyn RemoteSource>,
        store: Arc<dyn RowStore>,
    ) -> Self {
        let mut member = Self::blank(remote, store);
        member.linked = Some(linked.into());
        member
    }

    fn blank(remote: Arc<dyn RemoteSource>, store: Arc<dyn RowStore>) -> Self {
        Self {
            alias: None,
            linked: None,
            remote,
            store,
            display_name: Sourced::Unset,
            solve_count: Sourced::Unset,
            solves: Sourced::Unset,
            award_count: Sourced::Unset,
            awards: Sourced::Unset,
            credit_total: Sourced::Unset,
            credits: Sourced::Unset,
            post_count: Sourced::Unset,
            locale: None,
            language: None,
            level: None,
            private: None,
        }
    }

    // ── Identity ─────────────────────────────────────────────────────────────

    /// Strongest known identity: alias when known, else linked id.
    pub fn identity(&self) -> Result<Identity, RosterError> {
        if let Some(alias) = &self.alias {
            Ok(Identity::Alias(alias.clone()))
        } else if let Some(linked) = &self.linked {
            Ok(Identity::Linked(linked.clone()))
        } else {
            Err(RosterError::MissingIdentity)
        }
    }

    /// The member's alias, reading the persisted row when only a linked id
    /// is known.  A linked-only member with no row cannot be identified on
    /// the remote at all.
    pub async fn alias(&mut self) -> Result<String, RosterError> {
        if let Some(alias) = &self.alias {
            return Ok(alias.clone());
        }
        let identity = self.identity()?;
        if let Some(row) = self.store.read_member(&identity).await? {
            self.apply_row(row);
        }
        self.alias.clone().ok_or(RosterError::MissingIdentity)
    }

    /// Linked external id, if known.
    pub fn linked_id(&self) -> Option<&str> {
        self.linked.as_deref()
    }

    // ── Scalars that ride along on loads ─────────────────────────────────────

    pub fn locale(&self) -> Option<&str> {
        self.locale.as_deref()
    }

    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    pub fn level(&self) -> Option<u32> {
        self.level
    }

    /// Whether the member asked not to be named.  Loads the row on first
    /// use; the remote never reports this flag.
    pub async fn is_private(&mut self) -> Result<bool, RosterError> {
        if let Some(private) = self.private {
            return Ok(private);
        }
        self.load_persisted().await?;
        Ok(self.private.unwrap_or(false))
    }

    // ── Source loads ─────────────────────────────────────────────────────────

    /// Seed the remote-side profile attributes from an already-fetched feed
    /// line, so a cycle can serve every member from one roster fetch.
    pub fn preload_profile(&mut self, profile: Profile) {
        self.apply_profile(profile);
    }

    /// Populate the remote-side profile attributes (scalars and solves).
    /// No-op when they are already seeded; a member never fetches the same
    /// page twice.
    pub async fn load_remote_profile(&mut self) -> Result<(), RosterError> {
        if self.solves.remote().is_some() {
            return Ok(());
        }
        let alias = self.alias().await?;
        let profile = self.remote.fetch_profile(&alias).await?;
        self.apply_profile(profile);
        Ok(())
    }

    /// Populate the remote-side award attributes.  No-op when already
    /// seeded.
    pub async fn load_remote_awards(&mut self) -> Result<(), RosterError> {
        if self.awards.remote().is_some() {
            return Ok(());
        }
        let alias = self.alias().await?;
        let snapshot = self.remote.fetch_awards(&alias).await?;
        self.award_count.set_remote(snapshot.count);
        self.awards.set_remote(snapshot.state);
        Ok(())
    }

    /// Populate the remote-side credit attributes.  No-op when already
    /// seeded.
    pub async fn load_remote_credits(&mut self) -> Result<(), RosterError> {
        if self.credits.remote().is_some() {
            return Ok(());
        }
        let alias = self.alias().await?;
        let snapshot = self.remote.fetch_credits(&alias).await?;
        self.post_count.set_remote(snapshot.post_count);
        self.credit_total.set_remote(snapshot.total);
        self.credits.set_remote(snapshot.state);
        Ok(())
    }

    /// Populate the persisted-side attributes, bootstrapping the row from a
    /// remote fetch when it does not exist yet.
    ///
    /// The bootstrap is bounded: a row that keeps vanishing between the
    /// write and the re-read ends in [`RosterError::BootstrapFailed`]
    /// instead of spinning forever.
    pub async fn load_persisted(&mut self) -> Result<(), RosterError> {
        let identity = self.identity()?;
        if let Some(row) = self.store.read_member(&identity).await? {
            self.apply_row(row);
            return Ok(());
        }

        for attempt in 1..=BOOTSTRAP_MAX_ATTEMPTS {
            debug!(identity = %identity, attempt, "row missing, bootstrapping from remote");
            self.load_remote_profile().await?;
            self.push_basics().await?;
            if let Some(row) = self.store.read_member(&identity).await? {
                self.apply_row(row);
                return Ok(());
            }
        }

        Err(RosterError::BootstrapFailed {
            alias: self.alias.clone().unwrap_or_default(),
            attempts: BOOTSTRAP_MAX_ATTEMPTS,
        })
    }

    /// Populate the persisted-side credit attributes, bootstrapping the
    /// credit row when absent.  Same bound as [`Member::load_persisted`].
    pub async fn load_persisted_credits(&mut self) -> Result<(), RosterError> {
        let alias = self.alias().await?;
        if let Some(row) = self.store.read_credit(&alias).await? {
            self.apply_credit_row(row);
            return Ok(());
        }

        for attempt in 1..=BOOTSTRAP_MAX_ATTEMPTS {
            debug!(alias = %alias, attempt, "credit row missing, bootstrapping from remote");
            self.load_remote_credits().await?;
            self.push_credit().await?;
            if let Some(row) = self.store.read_credit(&alias).await? {
                self.apply_credit_row(row);
                return Ok(());
            }
        }

        Err(RosterError::BootstrapFailed {
            alias,
            attempts: BOOTSTRAP_MAX_ATTEMPTS,
        })
    }

    fn apply_profile(&mut self, profile: Profile) {
        self.display_name.set_remote(profile.display_name);
        self.solve_count.set_remote(profile.solve_count);
        self.solves.set_remote(profile.solves);
        self.locale = Some(profile.locale);
        self.language = Some(profile.language);
        self.level = Some(profile.level);
    }

    fn apply_row(&mut self, row: MemberRow) {
        self.alias = Some(row.alias);
        if !row.linked.is_empty() {
            self.linked = Some(row.linked);
        }
        self.display_name.set_persisted(row.display_name);
        self.solve_count.set_persisted(row.solve_count);
        self.solves.set_persisted(row.solves);
        self.award_count.set_persisted(row.award_count);
        self.awards.set_persisted(row.awards);
        // A profile loaded earlier already carries the fresh remote scalars;
        // the row only fills the gaps.
        if self.locale.is_none() {
            self.locale = Some(row.locale);
        }
        if self.language.is_none() {
            self.language = Some(row.language);
        }
        self.private = Some(row.private);
    }

    fn apply_credit_row(&mut self, row: CreditRow) {
        self.post_count.set_persisted(row.post_count);
        self.credit_total.set_persisted(row.total);
        self.credits.set_persisted(row.credits);
    }

    // ── Solve accessors ──────────────────────────────────────────────────────

    /// Best-known solve sequence, resolving from the store on first use.
    pub async fn solve_state(&mut self) -> Result<BitSeq, RosterError> {
        if let Some(v) = self.solves.best() {
            return Ok(v.clone());
        }
        self.load_persisted().await?;
        self.solves
            .best()
            .cloned()
            .ok_or(RosterError::Unresolved { attribute: "solve_state" })
    }

    /// Solve sequence as currently observed on the remote.
    pub async fn remote_solve_state(&mut self) -> Result<BitSeq, RosterError> {
        if let Some(v) = self.solves.remote() {
            return Ok(v.clone());
        }
        self.load_remote_profile().await?;
        self.solves
            .remote()
            .cloned()
            .ok_or(RosterError::Unresolved { attribute: "solve_state" })
    }

    /// Solve sequence from the persisted baseline.
    pub async fn persisted_solve_state(&mut self) -> Result<BitSeq, RosterError> {
        if let Some(v) = self.solves.persisted() {
            return Ok(v.clone());
        }
        self.load_persisted().await?;
        self.solves
            .persisted()
            .cloned()
            .ok_or(RosterError::Unresolved { attribute: "solve_state" })
    }

    pub async fn solve_count(&mut self) -> Result<u32, RosterError> {
        if let Some(v) = self.solve_count.best() {
            return Ok(*v);
        }
        self.load_persisted().await?;
        self.solve_count
            .best()
            .copied()
            .ok_or(RosterError::Unresolved { attribute: "solve_count" })
    }

    pub async fn remote_solve_count(&mut self) -> Result<u32, RosterError> {
        if let Some(v) = self.solve_count.remote() {
            return Ok(*v);
        }
        self.load_remote_profile().await?;
        self.solve_count
            .remote()
            .copied()
            .ok_or(RosterError::Unresolved { attribute: "solve_count" })
    }

    pub async fn persisted_solve_count(&mut self) -> Result<u32, RosterError> {
        if let Some(v) = self.solve_count.persisted() {
            return Ok(*v);
        }
        self.load_persisted().await?;
        self.solve_count
            .persisted()
            .copied()
            .ok_or(RosterError::Unresolved { attribute: "solve_count" })
    }

    /// Whether the member has solved the 1-based item id, best-known view.
    pub async fn has_solved(&mut self, item: u32) -> Result<bool, RosterError> {
        Ok(self.solve_state().await?.has_solved(item))
    }

    // ── Award accessors ──────────────────────────────────────────────────────

    pub async fn award_state(&mut self) -> Result<AwardState, RosterError> {
        if let Some(v) = self.awards.best() {
            return Ok(v.clone());
        }
        self.load_persisted().await?;
        self.awards
            .best()
            .cloned()
            .ok_or(RosterError::Unresolved { attribute: "award_state" })
    }

    pub async fn remote_award_state(&mut self) -> Result<AwardState, RosterError> {
        if let Some(v) = self.awards.remote() {
            return Ok(v.clone());
        }
        self.load_remote_awards().await?;
        self.awards
            .remote()
            .cloned()
            .ok_or(RosterError::Unresolved { attribute: "award_state" })
    }

    pub async fn persisted_award_state(&mut self) -> Result<AwardState, RosterError> {
        if let Some(v) = self.awards.persisted() {
            return Ok(v.clone());
        }
        self.load_persisted().await?;
        self.awards
            .persisted()
            .cloned()
            .ok_or(RosterError::Unresolved { attribute: "award_state" })
    }

    pub async fn award_count(&mut self) -> Result<u32, RosterError> {
        if let Some(v) = self.award_count.best() {
            return Ok(*v);
        }
        self.load_persisted().await?;
        self.award_count
            .best()
            .copied()
            .ok_or(RosterError::Unresolved { attribute: "award_count" })
    }

    pub async fn remote_award_count(&mut self) -> Result<u32, RosterError> {
        if let Some(v) = self.award_count.remote() {
            return Ok(*v);
        }
        self.load_remote_awards().await?;
        self.award_count
            .remote()
            .copied()
            .ok_or(RosterError::Unresolved { attribute: "award_count" })
    }

    pub async fn persisted_award_count(&mut self) -> Result<u32, RosterError> {
        if let Some(v) = self.award_count.persisted() {
            return Ok(*v);
        }
        self.load_persisted().await?;
        self.award_count
            .persisted()
            .copied()
            .ok_or(RosterError::Unresolved { attribute: "award_count" })
    }

    // ── Credit accessors ─────────────────────────────────────────────────────

    pub async fn credit_state(&mut self) -> Result<CreditState, RosterError> {
        if let Some(v) = self.credits.best() {
            return Ok(v.clone());
        }
        self.load_persisted_credits().await?;
        self.credits
            .best()
            .cloned()
            .ok_or(RosterError::Unresolved { attribute: "credit_state" })
    }

    pub async fn remote_credit_state(&mut self) -> Result<CreditState, RosterError> {
        if let Some(v) = self.credits.remote() {
            return Ok(v.clone());
        }
        self.load_remote_credits().await?;
        self.credits
            .remote()
            .cloned()
            .ok_or(RosterError::Unresolved { attribute: "credit_state" })
    }

    pub async fn persisted_credit_state(&mut self) -> Result<CreditState, RosterError> {
        if let Some(v) = self.credits.persisted() {
            return Ok(v.clone());
        }
        self.load_persisted_credits().await?;
        self.credits
            .persisted()
            .cloned()
            .ok_or(RosterError::Unresolved { attribute: "credit_state" })
    }

    pub async fn credit_total(&mut self) -> Result<u32, RosterError> {
        if let Some(v) = self.credit_total.best() {
            return Ok(*v);
        }
        self.load_persisted_credits().await?;
        self.credit_total
            .best()
            .copied()
            .ok_or(RosterError::Unresolved { attribute: "credit_total" })
    }

    pub async fn remote_credit_total(&mut self) -> Result<u32, RosterError> {
        if let Some(v) = self.credit_total.remote() {
            return Ok(*v);
        }
        self.load_remote_credits().await?;
        self.credit_total
            .remote()
            .copied()
            .ok_or(RosterError::Unresolved { attribute: "credit_total" })
    }

    pub async fn persisted_credit_total(&mut self) -> Result<u32, RosterError> {
        if let Some(v) = self.credit_total.persisted() {
            return Ok(*v);
        }
        self.load_persisted_credits().await?;
        self.credit_total
            .persisted()
            .copied()
            .ok_or(RosterError::Unresolved { attribute: "credit_total" })
    }

    pub async fn remote_post_count(&mut self) -> Result<u32, RosterError> {
        if let Some(v) = self.post_count.remote() {
            return Ok(*v);
        }
        self.load_remote_credits().await?;
        self.post_count
            .remote()
            .copied()
            .ok_or(RosterError::Unresolved { attribute: "post_count" })
    }

    // ── Display name ─────────────────────────────────────────────────────────

    pub async fn display_name(&mut self) -> Result<String, RosterError> {
        if let Some(v) = self.display_name.best() {
            return Ok(v.clone());
        }
        self.load_persisted().await?;
        self.display_name
            .best()
            .cloned()
            .ok_or(RosterError::Unresolved { attribute: "display_name" })
    }

    pub async fn remote_display_name(&mut self) -> Result<String, RosterError> {
        if let Some(v) = self.display_name.remote() {
            return Ok(v.clone());
        }
        self.load_remote_profile().await?;
        self.display_name
            .remote()
            .cloned()
            .ok_or(RosterError::Unresolved { attribute: "display_name" })
    }

    pub async fn persisted_display_name(&mut self) -> Result<String, RosterError> {
        if let Some(v) = self.display_name.persisted() {
            return Ok(v.clone());
        }
        self.load_persisted().await?;
        self.display_name
            .persisted()
            .cloned()
            .ok_or(RosterError::Unresolved { attribute: "display_name" })
    }

    // ── Change gates ─────────────────────────────────────────────────────────
    //
    // Cheap aggregate-count comparisons.  A gate returning false means
    // "nothing changed at all" for well-formed data; the positional diffs
    // below remain correct regardless.

    pub async fn solves_changed(&mut self) -> Result<bool, RosterError> {
        let remote = self.remote_solve_count().await?;
        let persisted = self.persisted_solve_count().await?;
        Ok(remote != persisted)
    }

    pub async fn awards_changed(&mut self) -> Result<bool, RosterError> {
        let remote = self.remote_award_count().await?;
        let persisted = self.persisted_award_count().await?;
        Ok(remote != persisted)
    }

    pub async fn credits_changed(&mut self) -> Result<bool, RosterError> {
        let remote = self.remote_credit_total().await?;
        let persisted = self.persisted_credit_total().await?;
        Ok(remote != persisted)
    }

    // ── Diffs ────────────────────────────────────────────────────────────────

    /// 1-based ids of items newly solved on the remote.  Short-circuits to
    /// empty when the count gate reports no movement.
    pub async fn new_solves(&mut self) -> Result<Vec<u32>, RosterError> {
        if !self.solves_changed().await? {
            return Ok(Vec::new());
        }
        let remote = self.remote_solve_state().await?;
        let persisted = self.persisted_solve_state().await?;
        Ok(diff::new_solves(&remote, &persisted))
    }

    /// Newly earned award indexes per category, 0-based.
    pub async fn new_awards(&mut self) -> Result<AwardDelta, RosterError> {
        if !self.awards_changed().await? {
            return Ok(AwardDelta::default());
        }
        let remote = self.remote_award_state().await?;
        let persisted = self.persisted_award_state().await?;
        Ok(diff::new_awards(&remote, &persisted))
    }

    /// Signed credit movement per post.
    pub async fn new_credits(&mut self) -> Result<Vec<CreditDelta>, RosterError> {
        if !self.credits_changed().await? {
            return Ok(Vec::new());
        }
        let remote = self.remote_credit_state().await?;
        let persisted = self.persisted_credit_state().await?;
        Ok(diff::new_credits(&remote, &persisted))
    }

    // ── Write-backs ──────────────────────────────────────────────────────────

    /// Seed or refresh the member row from the remote observation.
    ///
    /// Absent row: insert, seeded with everything currently known remotely,
    /// an empty linked id and public visibility.  Existing row: update the
    /// mutable profile fields only, leaving identity links and visibility
    /// untouched.  Two successive calls with an unchanged remote view write
    /// the same row.
    pub async fn push_basics(&mut self) -> Result<(), RosterError> {
        let alias = self.alias().await?;
        let display_name = self.remote_display_name().await?;
        let solve_count = self.remote_solve_count().await?;
        let solves = self.remote_solve_state().await?;
        let locale = self.locale.clone().unwrap_or_default();
        let language = self.language.clone().unwrap_or_default();

        let identity = Identity::Alias(alias.clone());
        if self.store.read_member(&identity).await?.is_none() {
            let award_count = self.remote_award_count().await?;
            let awards = self.remote_award_state().await?;
            let row = MemberRow {
                alias,
                linked: String::new(),
                display_name,
                locale,
                language,
                solve_count,
                solves,
                award_count,
                awards,
                private: false,
            };
            self.store.insert_member(&row).await?;
        } else {
            let patch = MemberPatch {
                display_name: Some(display_name),
                locale: Some(locale),
                language: Some(language),
                solve_count: Some(solve_count),
                solves: Some(solves),
                ..MemberPatch::default()
            };
            self.store.update_member(&identity, &patch).await?;
        }
        Ok(())
    }

    /// Update-only award write-back.
    pub async fn push_awards(&mut self) -> Result<(), RosterError> {
        let alias = self.alias().await?;
        let award_count = self.remote_award_count().await?;
        let awards = self.remote_award_state().await?;
        let patch = MemberPatch {
            award_count: Some(award_count),
            awards: Some(awards),
            ..MemberPatch::default()
        };
        self.store
            .update_member(&Identity::Alias(alias), &patch)
            .await?;
        Ok(())
    }

    /// Write the remote credit observation as the new credit baseline.
    pub async fn push_credit(&mut self) -> Result<(), RosterError> {
        let alias = self.alias().await?;
        let credits = self.remote_credit_state().await?;
        let total = self.remote_credit_total().await?;
        let post_count = self.remote_post_count().await?;
        let row = CreditRow {
            alias,
            post_count,
            total,
            credits,
        };
        self.store.write_credit(&row).await?;
        Ok(())
    }

    /// Flip the visibility flag on the persisted row.
    pub async fn push_privacy(&mut self, private: bool) -> Result<(), RosterError> {
        let identity = self.identity()?;
        let patch = MemberPatch {
            private: Some(private),
            ..MemberPatch::default()
        };
        self.store.update_member(&identity, &patch).await?;
        self.private = Some(private);
        Ok(())
    }

    /// Record the linked external id on the member's row.
    pub async fn push_link(&mut self, linked: &str) -> Result<(), RosterError> {
        let alias = self.alias().await?;
        let patch = MemberPatch {
            linked: Some(linked.to_string()),
            ..MemberPatch::default()
        };
        self.store
            .update_member(&Identity::Alias(alias), &patch)
            .await?;
        self.linked = Some(linked.to_string());
        Ok(())
    }

    // ── Composite operations ─────────────────────────────────────────────────

    /// One-shot credit reconciliation: gate, diff, write the new baseline.
    /// Returns the per-post movement, empty when the totals already agree.
    pub async fn reconcile_credits(&mut self) -> Result<Vec<CreditDelta>, RosterError> {
        if !self.credits_changed().await? {
            return Ok(Vec::new());
        }
        let deltas = self.new_credits().await?;
        self.push_credit().await?;
        Ok(deltas)
    }

    /// Sink-facing summary of the best-known member state.
    pub async fn summary(&mut self) -> Result<MemberSummary, RosterError> {
        let alias = self.alias().await?;
        let display_name = self.display_name().await?;
        let private = self.is_private().await?;
        let solve_count = self.solve_count().await?;
        Ok(MemberSummary {
            alias,
            linked: self.linked.clone().unwrap_or_default(),
            display_name,
            private,
            solve_count,
            // The remote computes level as one step per 25 solves.
            level: self.level.unwrap_or(solve_count / 25),
        })
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
