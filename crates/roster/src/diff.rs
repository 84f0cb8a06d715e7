//! Pure reconciliation functions.  No I/O: both views are passed in and the
//! caller decides what to do with the result.

use crate::award::{AwardCategory, AwardDelta, AwardState};
use crate::bits::BitSeq;
use crate::credit::{CreditDelta, CreditState};

/// 1-based ids of items solved remotely but not in the persisted baseline,
/// ascending.
///
/// Positions past the end of `persisted` count as unsolved, so a freshly
/// grown remote sequence diffs cleanly against an older, shorter baseline.
/// The result is positional: it stays correct even when aggregate counts
/// happen to agree while the bit patterns differ.
pub fn new_solves(remote: &BitSeq, persisted: &BitSeq) -> Vec<u32> {
    let mut fresh = Vec::new();
    for i in 0..remote.len() {
        if remote.get(i) && !persisted.get(i) {
            fresh.push(i as u32 + 1);
        }
    }
    fresh
}

/// Newly earned award indexes per category, 0-based within each track.
///
/// Same transition rule as [`new_solves`]; a persisted track shorter than
/// the remote one is padded with implicit `false`.
pub fn new_awards(remote: &AwardState, persisted: &AwardState) -> AwardDelta {
    let mut delta = AwardDelta::default();
    for category in AwardCategory::ALL {
        let remote_track = remote.track(category);
        let persisted_track = persisted.track(category);
        let out = match category {
            AwardCategory::Item => &mut delta.item,
            AwardCategory::Publication => &mut delta.publication,
            AwardCategory::Community => &mut delta.community,
        };
        for i in 0..remote_track.len() {
            if remote_track.get(i) && !persisted_track.get(i) {
                out.push(i as u32);
            }
        }
    }
    delta
}

/// Credit movement per post, ascending post id.
///
/// Posts the baseline has never seen yield their absolute value; posts with
/// a differing value yield the signed difference, negative included.  Posts
/// present only in the baseline, or with equal values, are omitted.
pub fn new_credits(remote: &CreditState, persisted: &CreditState) -> Vec<CreditDelta> {
    let mut deltas = Vec::new();
    for (post, count) in remote.iter() {
        match persisted.get(post) {
            None => deltas.push(CreditDelta {
                post,
                delta: count as i64,
            }),
            Some(previous) if previous != count => deltas.push(CreditDelta {
                post,
                delta: count as i64 - previous as i64,
            }),
            Some(_) => {}
        }
    }
    deltas
}

// ── Tests ────────────────────────────────────────────────────────────────────
