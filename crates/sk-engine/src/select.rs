//! Candidate selection: best-of-encounter and supersession against the
//! stored per-event incumbent.

use sk_core::{MinKey, Result};
use sk_ntuple::RowReader;

use crate::candidates::Candidate;
use crate::channel::{RankingPolicy, VetoFn};

/// Pick the best candidate of one encounter by lexicographic minimization.
///
/// The first candidate in enumeration order wins ties, which keeps the
/// choice deterministic even when keys are degenerate.
pub fn best_of_encounter(candidates: &[Candidate]) -> Option<&Candidate> {
    let mut best: Option<&Candidate> = None;
    for cand in candidates {
        match best {
            None => best = Some(cand),
            Some(b) => {
                if cand.key.supersedes(&b.key) {
                    best = Some(cand);
                }
            }
        }
    }
    best
}

/// Decide whether `candidate` supersedes the stored incumbent key.
///
/// The store veto (when configured) gates any store regardless of policy.
/// Under lexicographic ranking a candidate supersedes only on strict
/// improvement at the first differing key element; an absent incumbent
/// counts as all-infinite. Under veto-only ranking any gated candidate
/// stores, which is idempotent across re-encounters with identical row
/// content.
pub fn supersedes(
    ranking: &RankingPolicy,
    store_veto: Option<&VetoFn>,
    row: &RowReader<'_>,
    candidate: &Candidate,
    incumbent: Option<&MinKey>,
) -> Result<bool> {
    if let Some(veto) = store_veto {
        if !veto(row)? {
            return Ok(false);
        }
    }
    match ranking {
        RankingPolicy::Lexicographic { .. } => match incumbent {
            Some(stored) => Ok(candidate.key.supersedes(stored)),
            None => Ok(candidate.key.supersedes(&MinKey::worst(candidate.key.0.len()))),
        },
        RankingPolicy::VetoOnly => Ok(true),
    }
}
