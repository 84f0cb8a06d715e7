use serde::{Deserialize, Serialize};

use crate::error::CodecError;

/// Ordered sequence of solved/unsolved flags, one per item, ascending id.
///
/// Positions past the end are implicitly unsolved: remote and persisted views
/// of the same member routinely differ in length (the catalog grows between
/// observations) and must still compare cleanly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BitSeq(Vec<bool>);

impl BitSeq {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Decode the `'0'/'1'` wire string, left-to-right ascending item id.
    pub fn parse(raw: &str) -> Result<Self, CodecError> {
        let mut bits = Vec::with_capacity(raw.len());
        for (pos, ch) in raw.chars().enumerate() {
            match ch {
                '0' => bits.push(false),
                '1' => bits.push(true),
                other => return Err(CodecError::InvalidBit { found: other, pos }),
            }
        }
        Ok(Self(bits))
    }

    /// Lenient variant for remote feed fields: anything that is not a
    /// `'0'`/`'1'` digit is skipped instead of rejected (the feed wraps the
    /// sequence in quote characters).
    pub fn parse_lenient(raw: &str) -> Self {
        Self(
            raw.chars()
                .filter(|c| *c == '0' || *c == '1')
                .map(|c| c == '1')
                .collect(),
        )
    }

    /// Encode to the `'0'/'1'` wire string.
    pub fn encode(&self) -> String {
        self.0.iter().map(|b| if *b { '1' } else { '0' }).collect()
    }

    /// Flag at a 0-based position, implicitly `false` past the end.
    pub fn get(&self, index: usize) -> bool {
        self.0.get(index).copied().unwrap_or(false)
    }

    pub fn set(&mut self, index: usize, value: bool) {
        if index >= self.0.len() {
            self.0.resize(index + 1, false);
        }
        self.0[index] = value;
    }

    /// Whether the 1-based item id is marked solved.
    pub fn has_solved(&self, item: u32) -> bool {
        if item == 0 {
            return false;
        }
        self.get(item as usize - 1)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn count_set(&self) -> u32 {
        self.0.iter().filter(|b| **b).count() as u32
    }

    /// 1-based ids of every set position, ascending.
    pub fn solved_items(&self) -> Vec<u32> {
        self.0
            .iter()
            .enumerate()
            .filter(|(_, b)| **b)
            .map(|(i, _)| i as u32 + 1)
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        self.0.iter().copied()
    }
}

impl From<Vec<bool>> for BitSeq {
    fn from(bits: Vec<bool>) -> Self {
        Self(bits)
    }
}

impl FromIterator<bool> for BitSeq {
    fn from_iter<I: IntoIterator<Item = bool>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
