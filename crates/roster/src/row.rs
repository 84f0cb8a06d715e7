use serde::{Deserialize, Serialize};

use crate::award::AwardState;
use crate::bits::BitSeq;
use crate::credit::CreditState;

/// One member row as the store persists it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberRow {
    pub alias: String,
    /// Linked external account id; empty means unlinked.
    pub linked: String,
    pub display_name: String,
    pub locale: String,
    pub language: String,
    pub solve_count: u32,
    pub solves: BitSeq,
    pub award_count: u32,
    pub awards: AwardState,
    pub private: bool,
}

/// Partial member update; `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemberPatch {
    pub display_name: Option<String>,
    pub locale: Option<String>,
    pub language: Option<String>,
    pub solve_count: Option<u32>,
    pub solves: Option<BitSeq>,
    pub award_count: Option<u32>,
    pub awards: Option<AwardState>,
    pub private: Option<bool>,
    pub linked: Option<String>,
}

impl MemberPatch {
    /// Fold this patch into an existing row.
    pub fn apply(&self, row: &mut MemberRow) {
        if let Some(v) = &self.display_name {
            row.display_name = v.clone();
        }
        if let Some(v) = &self.locale {
            row.locale = v.clone();
        }
        if let Some(v) = &self.language {
            row.language = v.clone();
        }
        if let Some(v) = self.solve_count {
            row.solve_count = v;
        }
        if let Some(v) = &self.solves {
            row.solves = v.clone();
        }
        if let Some(v) = self.award_count {
            row.award_count = v;
        }
        if let Some(v) = &self.awards {
            row.awards = v.clone();
        }
        if let Some(v) = self.private {
            row.private = v;
        }
        if let Some(v) = &self.linked {
            row.linked = v.clone();
        }
    }

    pub fn is_empty(&self) -> bool {
        self.display_name.is_none()
            && self.locale.is_none()
            && self.language.is_none()
            && self.solve_count.is_none()
            && self.solves.is_none()
            && self.award_count.is_none()
            && self.awards.is_none()
            && self.private.is_none()
            && self.linked.is_none()
    }
}

/// One credit row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditRow {
    pub alias: String,
    pub post_count: u32,
    pub total: u32,
    pub credits: CreditState,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_applies_only_set_fields() {
        let mut row = MemberRow {
            alias: "leo".into(),
            linked: "4242".into(),
            display_name: "Leo".into(),
            locale: "FR".into(),
            language: "Rust".into(),
            solve_count: 3,
            solves: BitSeq::parse("111").unwrap(),
            award_count: 1,
            awards: AwardState::parse("1||").unwrap(),
            private: false,
        };

        let patch = MemberPatch {
            solve_count: Some(4),
            solves: Some(BitSeq::parse("1111").unwrap()),
            ..MemberPatch::default()
        };
        patch.apply(&mut row);

        assert_eq!(row.solve_count, 4);
        assert_eq!(row.solves.encode(), "1111");
        // Untouched fields keep their values.
        assert_eq!(row.display_name, "Leo");
        assert_eq!(row.linked, "4242");
        assert_eq!(row.award_count, 1);
        assert!(!row.private);
    }

    #[test]
    fn empty_patch_is_a_no_op() {
        let mut row = MemberRow {
            alias: "leo".into(),
            ..MemberRow::default()
        };
        let before = row.clone();
        let patch = MemberPatch::default();
        assert!(patch.is_empty());
        patch.apply(&mut row);
        assert_eq!(row, before);
    }
}
