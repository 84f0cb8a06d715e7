use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::CodecError;

/// Per-post accumulated credit, keyed by post id.
///
/// Backed by an ordered map so the wire encoding and diff output are
/// deterministic (ascending post id).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CreditState(BTreeMap<u32, u32>);

impl CreditState {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Decode the wire string: `post` and `count` joined with the literal
    /// `n`, entries joined with `|` (e.g. `"107n5|108n2"`).  Empty input is
    /// an empty map.
    pub fn parse(raw: &str) -> Result<Self, CodecError> {
        let mut map = BTreeMap::new();
        if raw.is_empty() {
            return Ok(Self(map));
        }
        for entry in raw.split('|') {
            let malformed = || CodecError::CreditEntry {
                entry: entry.to_string(),
            };
            let (post, count) = entry.split_once('n').ok_or_else(malformed)?;
            let post: u32 = post.parse().map_err(|_| malformed())?;
            let count: u32 = count.parse().map_err(|_| malformed())?;
            map.insert(post, count);
        }
        Ok(Self(map))
    }

    pub fn encode(&self) -> String {
        self.0
            .iter()
            .map(|(post, count)| format!("{post}n{count}"))
            .collect::<Vec<_>>()
            .join("|")
    }

    pub fn insert(&mut self, post: u32, count: u32) {
        self.0.insert(post, count);
    }

    pub fn get(&self, post: u32) -> Option<u32> {
        self.0.get(&post).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Sum of all per-post credit.
    pub fn total(&self) -> u32 {
        self.0.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.0.iter().map(|(post, count)| (*post, *count))
    }
}

impl FromIterator<(u32, u32)> for CreditState {
    fn from_iter<I: IntoIterator<Item = (u32, u32)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// One post whose credit moved.  `delta` is the absolute value for posts the
/// baseline has never seen, the signed difference otherwise (negative when
/// the remote total dropped, which edited or removed posts permit).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditDelta {
    pub post: u32,
    pub delta: i64,
}

// ── Tests ────────────────────────────────────────────────────────────────────
