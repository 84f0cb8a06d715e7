//! Reconciliation cycle orchestration.
//!
//! One cycle walks the full roster, reconciles every member against the
//! persisted baselines, writes the advanced counts back, and returns one
//! [`ChangeRecord`] per member that moved.  A cycle is all-or-nothing from
//! the caller's point of view: any remote or store failure aborts it,
//! leaving only the write-backs that already committed.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use tally_config::CycleConfig;
use tally_roster::{ChangeRecord, Member, Profile, RemoteSource, RosterError, RowStore};

/// Optional passes a cycle runs besides the solve/award reconciliation.
#[derive(Debug, Clone, Copy)]
pub struct CycleOptions {
    /// Reconcile forum-post credit for every member inside the cycle.
    /// Costs one extra page fetch per member, so it is off by default and
    /// credit is normally polled on demand instead.
    pub include_credits: bool,
    /// Re-push every member's baseline when the remote catalog outgrew the
    /// widest persisted solve sequence.
    pub extend_baselines: bool,
}

impl Default for CycleOptions {
    fn default() -> Self {
        Self {
            include_credits: false,
            extend_baselines: true,
        }
    }
}

impl From<&CycleConfig> for CycleOptions {
    fn from(config: &CycleConfig) -> Self {
        Self {
            include_credits: config.include_credits,
            extend_baselines: config.extend_baselines,
        }
    }
}

/// Remote health, checked by the driver before each cycle and shown by the
/// doctor command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RemoteProbe {
    pub reachable: bool,
    pub authenticated: bool,
}

/// Outcome of one reconciliation cycle.
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub cycle: Uuid,
    pub records: Vec<ChangeRecord>,
    /// Members enumerated, private and unlisted ones included.
    pub members_seen: usize,
    /// Members with nothing to announce.
    pub members_skipped: usize,
    /// Members whose counts advanced silently.
    pub private_members: usize,
    pub baselines_extended: bool,
    pub duration: Duration,
}

/// Owns one remote source and one row store and runs reconciliation cycles
/// over them.
pub struct UpdateProcess {
    remote: Arc<dyn RemoteSource>,
    store: Arc<dyn RowStore>,
    options: CycleOptions,
    /// Cycles never overlap; a second caller waits for the running one.
    cycle_lock: Mutex<()>,
}

impl UpdateProcess {
    pub fn new(
        remote: Arc<dyn RemoteSource>,
        store: Arc<dyn RowStore>,
        options: CycleOptions,
    ) -> Self {
        Self {
            remote,
            store,
            options,
            cycle_lock: Mutex::new(()),
        }
    }

    pub fn options(&self) -> CycleOptions {
        self.options
    }

    /// Ask the remote whether it answers at all and whether the session
    /// still identifies an account.
    pub async fn probe(&self) -> RemoteProbe {
        RemoteProbe {
            reachable: self.remote.is_reachable().await,
            authenticated: self.remote.is_authenticated().await,
        }
    }

    /// Walk the full roster once and reconcile every member, solves before
    /// awards before credits.
    ///
    /// The roster is the union of the stored rows and the remote roster
    /// feed, each member exactly once: stored members first, then feed
    /// lines never seen before.  One feed fetch serves the whole cycle.
    #[instrument(skip(self))]
    pub async fn run_cycle(&self) -> Result<CycleReport, RosterError> {
        let _flight = self.cycle_lock.lock().await;
        let cycle = Uuid::new_v4();
        let started = Instant::now();
        info!(%cycle, "reconciliation cycle starting");

        let rows = self.store.read_all().await?;
        let profiles = self.remote.fetch_roster_profiles().await?;

        let mut seen = HashSet::new();
        let mut aliases = Vec::new();
        for alias in rows
            .iter()
            .map(|row| row.alias.as_str())
            .chain(profiles.iter().map(|profile| profile.alias.as_str()))
        {
            if seen.insert(alias.to_string()) {
                aliases.push(alias.to_string());
            }
        }

        let feed: HashMap<String, Profile> = profiles
            .into_iter()
            .map(|profile| (profile.alias.clone(), profile))
            .collect();

        let members_seen = aliases.len();
        let mut members_skipped = 0;
        let mut private_members = 0;
        let mut records = Vec::new();

        for alias in &aliases {
            let mut member = Member::by_alias(
                alias.clone(),
                Arc::clone(&self.remote),
                Arc::clone(&self.store),
            );
            match feed.get(alias.as_str()) {
                Some(profile) => member.preload_profile(profile.clone()),
                None => {
                    // Still stored, no longer followed on the remote
                    // roster; nothing to reconcile against.
                    debug!(member = %alias, "absent from the roster feed");
                    members_skipped += 1;
                    continue;
                }
            }

            if member.is_private().await? {
                // Counts advance for private members too; no record is
                // emitted for them.
                if member.solves_changed().await? {
                    member.push_basics().await?;
                }
                if member.awards_changed().await? {
                    member.push_awards().await?;
                }
                private_members += 1;
                continue;
            }

            let mut record = ChangeRecord::default();

            if member.solves_changed().await? {
                record.new_solves = member.new_solves().await?;
                // Item-category awards read the fresh solve baseline from
                // the same row, so basics land first.
                member.push_basics().await?;
            }

            if member.awards_changed().await? {
                record.new_awards = member.new_awards().await?;
                member.push_awards().await?;
            }

            if self.options.include_credits {
                record.new_credits = member.reconcile_credits().await?;
            }

            if record.is_empty() {
                debug!(member = %alias, "no change");
                members_skipped += 1;
                continue;
            }

            record.member = member.summary().await?;
            info!(
                member = %record.member.display_alias(),
                solves = record.new_solves.len(),
                awards = record.new_awards.total(),
                credits = record.new_credits.len(),
                "member advanced"
            );
            records.push(record);
        }

        let baselines_extended = if self.options.extend_baselines {
            self.extend_baselines_if_needed(&feed).await?
        } else {
            false
        };

        let report = CycleReport {
            cycle,
            records,
            members_seen,
            members_skipped,
            private_members,
            baselines_extended,
            duration: started.elapsed(),
        };
        info!(
            %cycle,
            seen = report.members_seen,
            changed = report.records.len(),
            skipped = report.members_skipped,
            private = report.private_members,
            duration = ?report.duration,
            "reconciliation cycle finished"
        );
        Ok(report)
    }

    /// Grow every stored solve sequence when the catalog published items
    /// past the widest persisted baseline.
    async fn extend_baselines_if_needed(
        &self,
        feed: &HashMap<String, Profile>,
    ) -> Result<bool, RosterError> {
        let rows = self.store.read_all().await?;
        if rows.is_empty() {
            return Ok(false);
        }
        let widest = rows.iter().map(|row| row.solves.len()).max().unwrap_or(0);
        let latest = self.remote.latest_item().await? as usize;
        if latest <= widest {
            return Ok(false);
        }

        info!(latest, widest, "catalog outgrew stored baselines, re-pushing");
        for profile in feed.values() {
            let mut member = Member::by_alias(
                profile.alias.clone(),
                Arc::clone(&self.remote),
                Arc::clone(&self.store),
            );
            member.preload_profile(profile.clone());
            member.push_basics().await?;
        }
        Ok(true)
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{FakeRemote, FakeStore, credit_snapshot, item, profile, row_for};
    use std::sync::atomic::Ordering;
    use tally_roster::{AwardSnapshot, AwardState, CreditRow, FetchError};

    fn process_with(
        remote: &Arc<FakeRemote>,
        store: &Arc<FakeStore>,
        options: CycleOptions,
    ) -> UpdateProcess {
        UpdateProcess::new(
            Arc::clone(remote) as Arc<dyn RemoteSource>,
            Arc::clone(store) as Arc<dyn RowStore>,
            options,
        )
    }

    #[tokio::test]
    async fn first_cycle_announces_new_solves_second_is_quiet() {
        let remote = Arc::new(FakeRemote::default());
        remote.add_profile(profile("leo", "111"));
        let store = Arc::new(FakeStore::default());
        store.add_row(row_for("leo", "101"));

        let process = process_with(&remote, &store, CycleOptions::default());
        let report = process.run_cycle().await.unwrap();
        assert_eq!(report.members_seen, 1);
        assert_eq!(report.records.len(), 1);
        assert_eq!(report.records[0].member.alias, "leo");
        assert_eq!(report.records[0].new_solves, vec![2]);
        assert!(!report.baselines_extended);

        let quiet = process.run_cycle().await.unwrap();
        assert!(quiet.records.is_empty());
        assert_eq!(quiet.members_skipped, 1);
    }

    #[tokio::test]
    async fn roster_is_the_union_of_store_and_feed() {
        let remote = Arc::new(FakeRemote::default());
        remote.add_profile(profile("mira", "1"));
        remote.add_profile(profile("nova", "11"));
        let store = Arc::new(FakeStore::default());
        store.add_row(row_for("leo", "101"));
        store.add_row(row_for("mira", "1"));

        let process = process_with(&remote, &store, CycleOptions::default());
        let report = process.run_cycle().await.unwrap();

        // leo is store-only, mira unchanged, nova freshly bootstrapped.
        assert_eq!(report.members_seen, 3);
        assert!(report.records.is_empty());
        assert_eq!(report.members_skipped, 3);

        let rows = store.rows.lock().unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows["nova"].solves.encode(), "11");
        assert_eq!(rows["nova"].solve_count, 2);
    }

    #[tokio::test]
    async fn private_member_counts_advance_without_a_record() {
        let remote = Arc::new(FakeRemote::default());
        remote.add_profile(profile("leo", "111"));
        remote.set_awards(
            "leo",
            AwardSnapshot {
                count: 1,
                state: AwardState::parse("1||").unwrap(),
            },
        );
        let store = Arc::new(FakeStore::default());
        let mut row = row_for("leo", "101");
        row.private = true;
        store.add_row(row);

        let process = process_with(&remote, &store, CycleOptions::default());
        let report = process.run_cycle().await.unwrap();

        assert!(report.records.is_empty());
        assert_eq!(report.private_members, 1);
        assert_eq!(report.members_skipped, 0);

        let rows = store.rows.lock().unwrap();
        assert_eq!(rows["leo"].solves.encode(), "111");
        assert_eq!(rows["leo"].solve_count, 3);
        assert_eq!(rows["leo"].award_count, 1);
        assert!(rows["leo"].private);
    }

    #[tokio::test]
    async fn award_only_change_still_emits_a_record() {
        let remote = Arc::new(FakeRemote::default());
        remote.add_profile(profile("leo", "101"));
        remote.set_awards(
            "leo",
            AwardSnapshot {
                count: 1,
                state: AwardState::parse("1||").unwrap(),
            },
        );
        let store = Arc::new(FakeStore::default());
        store.add_row(row_for("leo", "101"));

        let process = process_with(&remote, &store, CycleOptions::default());
        let report = process.run_cycle().await.unwrap();

        assert_eq!(report.records.len(), 1);
        let record = &report.records[0];
        assert!(record.new_solves.is_empty());
        assert_eq!(record.new_awards.item, vec![0]);
        assert_eq!(store.rows.lock().unwrap()["leo"].award_count, 1);
    }

    #[tokio::test]
    async fn credits_only_reconciled_when_configured() {
        let remote = Arc::new(FakeRemote::default());
        remote.add_profile(profile("leo", "101"));
        remote.set_credits("leo", credit_snapshot(&[(107, 2), (109, 1)]));
        let store = Arc::new(FakeStore::default());
        store.add_row(row_for("leo", "101"));
        store.add_credit(CreditRow {
            alias: "leo".into(),
            post_count: 1,
            total: 5,
            credits: credit_snapshot(&[(107, 5)]).state,
        });

        let quiet = process_with(&remote, &store, CycleOptions::default());
        let report = quiet.run_cycle().await.unwrap();
        assert!(report.records.is_empty());
        assert_eq!(remote.credit_fetches.load(Ordering::SeqCst), 0);

        let chatty = process_with(
            &remote,
            &store,
            CycleOptions {
                include_credits: true,
                ..CycleOptions::default()
            },
        );
        let report = chatty.run_cycle().await.unwrap();
        assert_eq!(report.records.len(), 1);
        let deltas = &report.records[0].new_credits;
        assert_eq!(deltas.len(), 2);
        assert_eq!((deltas[0].post, deltas[0].delta), (107, -3));
        assert_eq!((deltas[1].post, deltas[1].delta), (109, 1));
        assert_eq!(store.credit_rows.lock().unwrap()["leo"].total, 3);
    }

    #[tokio::test]
    async fn catalog_growth_extends_stored_baselines() {
        let remote = Arc::new(FakeRemote::default());
        remote.add_profile(profile("leo", "1010"));
        remote.set_catalog(vec![item(1), item(2), item(3), item(4)]);
        let store = Arc::new(FakeStore::default());
        store.add_row(row_for("leo", "101"));

        let process = process_with(&remote, &store, CycleOptions::default());
        let report = process.run_cycle().await.unwrap();

        // Solve count did not move, so the member loop stays quiet; the
        // wider feed line lands through the baseline extension instead.
        assert!(report.records.is_empty());
        assert!(report.baselines_extended);
        assert_eq!(store.rows.lock().unwrap()["leo"].solves.encode(), "1010");

        let again = process.run_cycle().await.unwrap();
        assert!(!again.baselines_extended);
    }

    #[tokio::test]
    async fn extension_can_be_configured_off() {
        let remote = Arc::new(FakeRemote::default());
        remote.add_profile(profile("leo", "1010"));
        remote.set_catalog(vec![item(1), item(2), item(3), item(4)]);
        let store = Arc::new(FakeStore::default());
        store.add_row(row_for("leo", "101"));

        let process = process_with(
            &remote,
            &store,
            CycleOptions {
                extend_baselines: false,
                ..CycleOptions::default()
            },
        );
        let report = process.run_cycle().await.unwrap();
        assert!(!report.baselines_extended);
        assert_eq!(store.rows.lock().unwrap()["leo"].solves.encode(), "101");
    }

    #[tokio::test]
    async fn empty_roster_cycle_reports_nothing() {
        let remote = Arc::new(FakeRemote::default());
        let store = Arc::new(FakeStore::default());

        let process = process_with(&remote, &store, CycleOptions::default());
        let report = process.run_cycle().await.unwrap();

        assert_eq!(report.members_seen, 0);
        assert!(report.records.is_empty());
        assert!(!report.baselines_extended);
    }

    #[tokio::test]
    async fn remote_failure_aborts_the_cycle() {
        let remote = Arc::new(FakeRemote {
            offline: true,
            ..FakeRemote::default()
        });
        let store = Arc::new(FakeStore::default());
        store.add_row(row_for("leo", "101"));

        let process = process_with(&remote, &store, CycleOptions::default());
        let err = process.run_cycle().await.unwrap_err();
        assert!(matches!(
            err,
            RosterError::Remote(FetchError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn probe_reflects_remote_state() {
        let remote = Arc::new(FakeRemote::default());
        let store = Arc::new(FakeStore::default());
        let process = process_with(&remote, &store, CycleOptions::default());
        let probe = process.probe().await;
        assert!(probe.reachable);
        assert!(probe.authenticated);

        let offline = Arc::new(FakeRemote {
            offline: true,
            ..FakeRemote::default()
        });
        let process = process_with(&offline, &store, CycleOptions::default());
        let probe = process.probe().await;
        assert!(!probe.reachable);
        assert!(!probe.authenticated);
    }
}
