//! Stored row envelopes.
//!
//! Rows are serialized as JSON with the sequence fields kept in their wire
//! string forms: solves as a `'0'`/`'1'` run, awards as three such runs
//! joined with `|`, credits as `post n count` entries joined with `|`, and
//! visibility as `0`/`1`.  A row written back unchanged is byte-identical.

use serde::{Deserialize, Serialize};

use tally_roster::{AwardState, BitSeq, CreditRow, CreditState, MemberRow, StoreError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct EncodedMember {
    pub alias: String,
    pub linked: String,
    pub display_name: String,
    pub locale: String,
    pub language: String,
    pub solve_count: u32,
    pub solves: String,
    pub award_count: u32,
    pub awards: String,
    pub private: u8,
}

impl EncodedMember {
    pub fn from_row(row: &MemberRow) -> Self {
        Self {
            alias: row.alias.clone(),
            linked: row.linked.clone(),
            display_name: row.display_name.clone(),
            locale: row.locale.clone(),
            language: row.language.clone(),
            solve_count: row.solve_count,
            solves: row.solves.encode(),
            award_count: row.award_count,
            awards: row.awards.encode(),
            private: u8::from(row.private),
        }
    }

    pub fn into_row(self) -> Result<MemberRow, StoreError> {
        let solves = BitSeq::parse(&self.solves).map_err(|source| StoreError::MalformedRow {
            alias: self.alias.clone(),
            source,
        })?;
        let awards = AwardState::parse(&self.awards).map_err(|source| StoreError::MalformedRow {
            alias: self.alias.clone(),
            source,
        })?;
        Ok(MemberRow {
            alias: self.alias,
            linked: self.linked,
            display_name: self.display_name,
            locale: self.locale,
            language: self.language,
            solve_count: self.solve_count,
            solves,
            award_count: self.award_count,
            awards,
            private: self.private != 0,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct EncodedCredit {
    pub alias: String,
    pub post_count: u32,
    pub total: u32,
    pub credits: String,
}

impl EncodedCredit {
    pub fn from_row(row: &CreditRow) -> Self {
        Self {
            alias: row.alias.clone(),
            post_count: row.post_count,
            total: row.total,
            credits: row.credits.encode(),
        }
    }

    pub fn into_row(self) -> Result<CreditRow, StoreError> {
        let credits =
            CreditState::parse(&self.credits).map_err(|source| StoreError::MalformedRow {
                alias: self.alias.clone(),
                source,
            })?;
        Ok(CreditRow {
            alias: self.alias,
            post_count: self.post_count,
            total: self.total,
            credits,
        })
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
