//! In-memory collaborators shared by the runtime tests.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use tally_roster::{
    AwardSnapshot, BitSeq, ChangeRecord, CreditRow, CreditSnapshot, CreditState, FetchError,
    Identity, ItemInfo, MemberPatch, MemberRow, Profile, RemoteSource, RowStore, StoreError,
};

use crate::sink::NotificationSink;

pub(crate) fn profile(alias: &str, solves: &str) -> Profile {
    let solves = BitSeq::parse(solves).unwrap();
    Profile {
        alias: alias.to_string(),
        display_name: alias.to_string(),
        locale: "FR".to_string(),
        language: "Rust".to_string(),
        solve_count: solves.count_set(),
        level: solves.count_set() / 25,
        solves,
    }
}

pub(crate) fn row_for(alias: &str, solves: &str) -> MemberRow {
    let solves = BitSeq::parse(solves).unwrap();
    MemberRow {
        alias: alias.to_string(),
        display_name: alias.to_string(),
        locale: "FR".to_string(),
        language: "Rust".to_string(),
        solve_count: solves.count_set(),
        solves,
        ..MemberRow::default()
    }
}

pub(crate) fn credit_snapshot(entries: &[(u32, u32)]) -> CreditSnapshot {
    let mut state = CreditState::default();
    for (post, count) in entries {
        state.insert(*post, *count);
    }
    CreditSnapshot {
        post_count: entries.len() as u32,
        total: state.total(),
        state,
    }
}

pub(crate) fn item(id: u32) -> ItemInfo {
    ItemInfo {
        id,
        title: format!("Item {id}"),
        published_unix: 1_700_000_000 + i64::from(id),
        solver_count: 10,
    }
}

#[derive(Default)]
pub(crate) struct FakeRemote {
    pub offline: bool,
    pub profiles: Mutex<BTreeMap<String, Profile>>,
    pub awards: Mutex<BTreeMap<String, AwardSnapshot>>,
    pub credits: Mutex<BTreeMap<String, CreditSnapshot>>,
    pub catalog: Mutex<Vec<ItemInfo>>,
    pub roster_fetches: AtomicUsize,
    pub credit_fetches: AtomicUsize,
}

impl FakeRemote {
    pub fn add_profile(&self, profile: Profile) {
        self.profiles
            .lock()
            .unwrap()
            .insert(profile.alias.clone(), profile);
    }

    pub fn set_awards(&self, alias: &str, snapshot: AwardSnapshot) {
        self.awards.lock().unwrap().insert(alias.into(), snapshot);
    }

    pub fn set_credits(&self, alias: &str, snapshot: CreditSnapshot) {
        self.credits.lock().unwrap().insert(alias.into(), snapshot);
    }

    pub fn set_catalog(&self, items: Vec<ItemInfo>) {
        *self.catalog.lock().unwrap() = items;
    }

    fn check_online(&self) -> Result<(), FetchError> {
        if self.offline {
            Err(FetchError::Unavailable("offline".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RemoteSource for FakeRemote {
    async fn fetch_roster_profiles(&self) -> Result<Vec<Profile>, FetchError> {
        self.check_online()?;
        self.roster_fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.profiles.lock().unwrap().values().cloned().collect())
    }

    async fn fetch_awards(&self, alias: &str) -> Result<AwardSnapshot, FetchError> {
        self.check_online()?;
        Ok(self
            .awards
            .lock()
            .unwrap()
            .get(alias)
            .cloned()
            .unwrap_or_default())
    }

    async fn fetch_credits(&self, alias: &str) -> Result<CreditSnapshot, FetchError> {
        self.check_online()?;
        self.credit_fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .credits
            .lock()
            .unwrap()
            .get(alias)
            .cloned()
            .unwrap_or_default())
    }

    async fn fetch_catalog(&self) -> Result<Vec<ItemInfo>, FetchError> {
        self.check_online()?;
        Ok(self.catalog.lock().unwrap().clone())
    }

    async fn is_reachable(&self) -> bool {
        !self.offline
    }

    async fn is_authenticated(&self) -> bool {
        !self.offline
    }
}

#[derive(Default)]
pub(crate) struct FakeStore {
    pub rows: Mutex<BTreeMap<String, MemberRow>>,
    pub credit_rows: Mutex<BTreeMap<String, CreditRow>>,
}

impl FakeStore {
    pub fn add_row(&self, row: MemberRow) {
        self.rows.lock().unwrap().insert(row.alias.clone(), row);
    }

    pub fn add_credit(&self, row: CreditRow) {
        self.credit_rows
            .lock()
            .unwrap()
            .insert(row.alias.clone(), row);
    }
}

#[async_trait]
impl RowStore for FakeStore {
    async fn read_all(&self) -> Result<Vec<MemberRow>, StoreError> {
        Ok(self.rows.lock().unwrap().values().cloned().collect())
    }

    async fn read_member(&self, identity: &Identity) -> Result<Option<MemberRow>, StoreError> {
        let rows = self.rows.lock().unwrap();
        Ok(match identity {
            Identity::Alias(alias) => rows.get(alias).cloned(),
            Identity::Linked(id) => rows
                .values()
                .find(|row| !row.linked.is_empty() && row.linked == *id)
                .cloned(),
        })
    }

    async fn insert_member(&self, row: &MemberRow) -> Result<(), StoreError> {
        self.rows
            .lock()
            .unwrap()
            .insert(row.alias.clone(), row.clone());
        Ok(())
    }

    async fn update_member(
        &self,
        identity: &Identity,
        patch: &MemberPatch,
    ) -> Result<(), StoreError> {
        let mut rows = self.rows.lock().unwrap();
        let row = match identity {
            Identity::Alias(alias) => rows.get_mut(alias),
            Identity::Linked(id) => rows
                .values_mut()
                .find(|row| !row.linked.is_empty() && row.linked == *id),
        };
        if let Some(row) = row {
            patch.apply(row);
        }
        Ok(())
    }

    async fn read_credit(&self, alias: &str) -> Result<Option<CreditRow>, StoreError> {
        Ok(self.credit_rows.lock().unwrap().get(alias).cloned())
    }

    async fn write_credit(&self, row: &CreditRow) -> Result<(), StoreError> {
        self.credit_rows
            .lock()
            .unwrap()
            .insert(row.alias.clone(), row.clone());
        Ok(())
    }

    async fn member_count(&self) -> Result<u64, StoreError> {
        Ok(self.rows.lock().unwrap().len() as u64)
    }
}

#[derive(Default)]
pub(crate) struct CollectSink {
    pub records: Mutex<Vec<ChangeRecord>>,
}

#[async_trait]
impl NotificationSink for CollectSink {
    async fn deliver(&self, records: &[ChangeRecord]) -> anyhow::Result<()> {
        self.records.lock().unwrap().extend_from_slice(records);
        Ok(())
    }
}
