use serde::{Deserialize, Serialize};

use crate::bits::BitSeq;
use crate::error::CodecError;

/// Award categories in their fixed wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AwardCategory {
    /// Earned by solving particular sets of items.
    Item,
    /// Earned for publication milestones.
    Publication,
    /// Earned through community activity.
    Community,
}

impl AwardCategory {
    pub const ALL: [AwardCategory; 3] = [
        AwardCategory::Item,
        AwardCategory::Publication,
        AwardCategory::Community,
    ];

    pub fn slug(&self) -> &'static str {
        match self {
            AwardCategory::Item => "item",
            AwardCategory::Publication => "publication",
            AwardCategory::Community => "community",
        }
    }
}

/// Earned/unearned flags for each category.  Tracks follow the same
/// implicit-false padding rule as [`BitSeq`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwardState {
    tracks: [BitSeq; 3],
}

impl AwardState {
    pub fn new(item: BitSeq, publication: BitSeq, community: BitSeq) -> Self {
        Self {
            tracks: [item, publication, community],
        }
    }

    /// Decode the three-track wire string, tracks joined with `|` in fixed
    /// category order.
    pub fn parse(raw: &str) -> Result<Self, CodecError> {
        let parts: Vec<&str> = raw.split('|').collect();
        if parts.len() != 3 {
            return Err(CodecError::TrackCount {
                expected: 3,
                found: parts.len(),
            });
        }
        Ok(Self {
            tracks: [
                BitSeq::parse(parts[0])?,
                BitSeq::parse(parts[1])?,
                BitSeq::parse(parts[2])?,
            ],
        })
    }

    /// Encode to the `|`-joined wire string, fixed category order.
    pub fn encode(&self) -> String {
        format!(
            "{}|{}|{}",
            self.tracks[0].encode(),
            self.tracks[1].encode(),
            self.tracks[2].encode()
        )
    }

    pub fn track(&self, category: AwardCategory) -> &BitSeq {
        &self.tracks[category as usize]
    }

    /// Total earned across all three categories.
    pub fn count_earned(&self) -> u32 {
        self.tracks.iter().map(BitSeq::count_set).sum()
    }
}

/// Newly earned award indexes per category, 0-based within each track.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwardDelta {
    pub item: Vec<u32>,
    pub publication: Vec<u32>,
    pub community: Vec<u32>,
}

impl AwardDelta {
    pub fn is_empty(&self) -> bool {
        self.item.is_empty() && self.publication.is_empty() && self.community.is_empty()
    }

    pub fn total(&self) -> usize {
        self.item.len() + self.publication.len() + self.community.len()
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
