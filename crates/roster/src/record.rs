use serde::{Deserialize, Serialize};

use crate::award::AwardDelta;
use crate::credit::CreditDelta;

/// Shown in place of the alias for members who asked not to be named.
pub const PRIVATE_PLACEHOLDER: &str = "Private Account";

/// Sink-facing slice of a member, carried inside a [`ChangeRecord`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberSummary {
    pub alias: String,
    /// Linked external account id, empty when unlinked.
    pub linked: String,
    pub display_name: String,
    pub private: bool,
    pub solve_count: u32,
    pub level: u32,
}

impl MemberSummary {
    /// Alias for display; private members get [`PRIVATE_PLACEHOLDER`]
    /// instead.
    pub fn display_alias(&self) -> &str {
        if self.private {
            PRIVATE_PLACEHOLDER
        } else {
            &self.alias
        }
    }
}

/// Everything that changed for one member in one reconciliation.
///
/// Transient: handed to the notification sink, never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub member: MemberSummary,
    /// 1-based ids of newly solved items, ascending.
    pub new_solves: Vec<u32>,
    /// 0-based newly earned award indexes per category.
    pub new_awards: AwardDelta,
    /// Signed credit movement per post.
    pub new_credits: Vec<CreditDelta>,
}

impl ChangeRecord {
    pub fn is_empty(&self) -> bool {
        self.new_solves.is_empty() && self.new_awards.is_empty() && self.new_credits.is_empty()
    }
}
