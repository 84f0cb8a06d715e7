//! Member and credit baselines backed by [`redb`].
//!
//! # Tables
//!
//! | Name      | Key              | Value                                |
//! |-----------|------------------|--------------------------------------|
//! | `members` | alias (str)      | JSON member row, wire-string fields  |
//! | `links`   | linked id (str)  | alias (str)                          |
//! | `credits` | alias (str)      | JSON list of credit generations      |
//!
//! The `links` table is a secondary index kept in step with the `linked`
//! field of the member rows.  Credit generations hold one element in the
//! default upsert mode; append mode grows the list and reads keep returning
//! the first (oldest) element.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use redb::{Database, ReadableTable, ReadableTableMetadata, TableDefinition};
use tracing::info;

use tally_config::CreditWrites;
use tally_roster::{CreditRow, Identity, MemberPatch, MemberRow, RowStore, StoreError};

use crate::encoding::{EncodedCredit, EncodedMember};

// ── redb table definitions ───────────────────────────────────────────────────

/// Member rows: `alias (str) → JSON row`.
const MEMBERS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("members");
/// Linked-id lookup: `linked id (str) → alias (str)`.
const LINKS_TABLE: TableDefinition<&str, &str> = TableDefinition::new("links");
/// Credit baselines: `alias (str) → JSON list of credit generations`.
const CREDITS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("credits");

fn backend_err(err: impl std::fmt::Display) -> StoreError {
    StoreError::Unavailable(err.to_string())
}

fn encode_member(row: &MemberRow) -> Result<Vec<u8>, StoreError> {
    serde_json::to_vec(&EncodedMember::from_row(row)).map_err(backend_err)
}

fn decode_member(alias: &str, bytes: &[u8]) -> Result<MemberRow, StoreError> {
    let encoded: EncodedMember =
        serde_json::from_slice(bytes).map_err(|e| StoreError::Corrupt {
            alias: alias.to_string(),
            reason: e.to_string(),
        })?;
    encoded.into_row()
}

fn decode_generations(alias: &str, bytes: &[u8]) -> Result<Vec<EncodedCredit>, StoreError> {
    serde_json::from_slice(bytes).map_err(|e| StoreError::Corrupt {
        alias: alias.to_string(),
        reason: e.to_string(),
    })
}

// ── Store ────────────────────────────────────────────────────────────────────

/// Counts reported when the store opens and by the doctor command.
#[derive(Debug, Clone, Default)]
pub struct StoreStats {
    pub members: u64,
    pub credit_rows: u64,
    /// Length of the longest persisted solve string.  Tracks how far the
    /// baselines have been extended against the item catalog.
    pub widest_solves: usize,
}

pub struct RedbStore {
    db: Database,
    path: PathBuf,
    credit_writes: CreditWrites,
}

impl RedbStore {
    /// Open or create the store file at `path`.
    pub fn open(path: impl AsRef<Path>, credit_writes: CreditWrites) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(backend_err)?;
            }
        }
        let db = Database::create(&path).map_err(backend_err)?;

        // Ensure tables exist.
        {
            let tx = db.begin_write().map_err(backend_err)?;
            tx.open_table(MEMBERS_TABLE).map_err(backend_err)?;
            tx.open_table(LINKS_TABLE).map_err(backend_err)?;
            tx.open_table(CREDITS_TABLE).map_err(backend_err)?;
            tx.commit().map_err(backend_err)?;
        }

        let store = Self {
            db,
            path,
            credit_writes,
        };
        let stats = store.stats()?;
        info!(
            members = stats.members,
            credit_rows = stats.credit_rows,
            widest_solves = stats.widest_solves,
            path = %store.path.display(),
            "store opened"
        );
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn credit_writes(&self) -> CreditWrites {
        self.credit_writes
    }

    /// Row and width counts, full table scan.
    pub fn stats(&self) -> Result<StoreStats, StoreError> {
        let tx = self.db.begin_read().map_err(backend_err)?;
        let members = tx.open_table(MEMBERS_TABLE).map_err(backend_err)?;
        let credits = tx.open_table(CREDITS_TABLE).map_err(backend_err)?;

        let mut widest = 0usize;
        for item in members.iter().map_err(backend_err)? {
            let (key, value) = item.map_err(backend_err)?;
            let row = decode_member(key.value(), value.value())?;
            widest = widest.max(row.solves.len());
        }

        Ok(StoreStats {
            members: members.len().map_err(backend_err)?,
            credit_rows: credits.len().map_err(backend_err)?,
            widest_solves: widest,
        })
    }
}

#[async_trait]
impl RowStore for RedbStore {
    async fn read_all(&self) -> Result<Vec<MemberRow>, StoreError> {
        let tx = self.db.begin_read().map_err(backend_err)?;
        let members = tx.open_table(MEMBERS_TABLE).map_err(backend_err)?;
        let mut rows = Vec::new();
        for item in members.iter().map_err(backend_err)? {
            let (key, value) = item.map_err(backend_err)?;
            rows.push(decode_member(key.value(), value.value())?);
        }
        Ok(rows)
    }

    async fn read_member(&self, identity: &Identity) -> Result<Option<MemberRow>, StoreError> {
        let tx = self.db.begin_read().map_err(backend_err)?;
        let alias = match identity {
            Identity::Alias(alias) => alias.clone(),
            Identity::Linked(id) if id.is_empty() => return Ok(None),
            Identity::Linked(id) => {
                let links = tx.open_table(LINKS_TABLE).map_err(backend_err)?;
                match links.get(id.as_str()).map_err(backend_err)? {
                    None => return Ok(None),
                    Some(v) => v.value().to_string(),
                }
            }
        };
        let members = tx.open_table(MEMBERS_TABLE).map_err(backend_err)?;
        match members.get(alias.as_str()).map_err(backend_err)? {
            None => Ok(None),
            Some(v) => Ok(Some(decode_member(&alias, v.value())?)),
        }
    }

    async fn insert_member(&self, row: &MemberRow) -> Result<(), StoreError> {
        let bytes = encode_member(row)?;
        let tx = self.db.begin_write().map_err(backend_err)?;
        {
            let mut members = tx.open_table(MEMBERS_TABLE).map_err(backend_err)?;
            // The replaced row is read under the write transaction; the links
            // index moves in the same commit.
            let previous_linked = match members.get(row.alias.as_str()).map_err(backend_err)? {
                None => String::new(),
                Some(v) => decode_member(&row.alias, v.value())?.linked,
            };
            members
                .insert(row.alias.as_str(), bytes.as_slice())
                .map_err(backend_err)?;

            if row.linked != previous_linked {
                let mut links = tx.open_table(LINKS_TABLE).map_err(backend_err)?;
                if !previous_linked.is_empty() {
                    links
                        .remove(previous_linked.as_str())
                        .map_err(backend_err)?;
                }
                if !row.linked.is_empty() {
                    links
                        .insert(row.linked.as_str(), row.alias.as_str())
                        .map_err(backend_err)?;
                }
            }
        }
        tx.commit().map_err(backend_err)?;
        Ok(())
    }

    async fn update_member(
        &self,
        identity: &Identity,
        patch: &MemberPatch,
    ) -> Result<(), StoreError> {
        // Identity resolution, row read and index maintenance all happen
        // under one write transaction.  Early returns drop the transaction
        // unchanged.
        let tx = self.db.begin_write().map_err(backend_err)?;
        {
            let mut links = tx.open_table(LINKS_TABLE).map_err(backend_err)?;
            let alias = match identity {
                Identity::Alias(alias) => alias.clone(),
                Identity::Linked(id) if id.is_empty() => return Ok(()),
                Identity::Linked(id) => match links.get(id.as_str()).map_err(backend_err)? {
                    None => return Ok(()),
                    Some(v) => v.value().to_string(),
                },
            };

            let mut members = tx.open_table(MEMBERS_TABLE).map_err(backend_err)?;
            let mut row = match members.get(alias.as_str()).map_err(backend_err)? {
                // Absent row: nothing to update.
                None => return Ok(()),
                Some(v) => decode_member(&alias, v.value())?,
            };
            let previous_linked = row.linked.clone();
            patch.apply(&mut row);
            let bytes = encode_member(&row)?;
            members
                .insert(row.alias.as_str(), bytes.as_slice())
                .map_err(backend_err)?;

            if row.linked != previous_linked {
                if !previous_linked.is_empty() {
                    links
                        .remove(previous_linked.as_str())
                        .map_err(backend_err)?;
                }
                if !row.linked.is_empty() {
                    links
                        .insert(row.linked.as_str(), row.alias.as_str())
                        .map_err(backend_err)?;
                }
            }
        }
        tx.commit().map_err(backend_err)?;
        Ok(())
    }

    async fn read_credit(&self, alias: &str) -> Result<Option<CreditRow>, StoreError> {
        let tx = self.db.begin_read().map_err(backend_err)?;
        let credits = tx.open_table(CREDITS_TABLE).map_err(backend_err)?;
        let generations = match credits.get(alias).map_err(backend_err)? {
            None => return Ok(None),
            Some(v) => decode_generations(alias, v.value())?,
        };
        // Oldest generation is the active baseline.
        match generations.into_iter().next() {
            None => Ok(None),
            Some(encoded) => Ok(Some(encoded.into_row()?)),
        }
    }

    async fn write_credit(&self, row: &CreditRow) -> Result<(), StoreError> {
        let tx = self.db.begin_write().map_err(backend_err)?;
        {
            let mut credits = tx.open_table(CREDITS_TABLE).map_err(backend_err)?;
            let mut generations = match credits.get(row.alias.as_str()).map_err(backend_err)? {
                None => Vec::new(),
                Some(v) => decode_generations(&row.alias, v.value())?,
            };
            match self.credit_writes {
                CreditWrites::Upsert => {
                    generations.clear();
                    generations.push(EncodedCredit::from_row(row));
                }
                CreditWrites::Append => generations.push(EncodedCredit::from_row(row)),
            }
            let bytes = serde_json::to_vec(&generations).map_err(backend_err)?;
            credits
                .insert(row.alias.as_str(), bytes.as_slice())
                .map_err(backend_err)?;
        }
        tx.commit().map_err(backend_err)?;
        Ok(())
    }

    async fn member_count(&self) -> Result<u64, StoreError> {
        let tx = self.db.begin_read().map_err(backend_err)?;
        let members = tx.open_table(MEMBERS_TABLE).map_err(backend_err)?;
        members.len().map_err(backend_err)
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
