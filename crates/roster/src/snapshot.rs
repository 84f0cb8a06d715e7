use serde::{Deserialize, Serialize};

use crate::award::AwardState;
use crate::bits::BitSeq;
use crate::credit::CreditState;

/// Scalar profile fields plus the solve sequence, as one roster feed line
/// reports them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub alias: String,
    pub display_name: String,
    pub locale: String,
    pub language: String,
    pub solve_count: u32,
    pub level: u32,
    pub solves: BitSeq,
}

/// Award page observation: the remote's own total plus per-category flags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwardSnapshot {
    pub count: u32,
    pub state: AwardState,
}

/// Post page observation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditSnapshot {
    pub post_count: u32,
    pub total: u32,
    pub state: CreditState,
}

/// Full remote observation of one member at one instant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub profile: Profile,
    pub awards: AwardSnapshot,
    pub credits: CreditSnapshot,
    /// The remote never reports visibility; seeded rows default to public.
    pub private: bool,
}

/// One entry of the published item catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemInfo {
    pub id: u32,
    pub title: String,
    pub published_unix: i64,
    pub solver_count: u32,
}
