//! Candidate generation: brute-force permutation of the enumerated objects
//! over the role templates, with canonical pruning and constraint checks.

use sk_core::{MinKey, ObjectHandle, Result};
use sk_ntuple::RowReader;

use crate::channel::{KeyFn, PairSign, RoleMember, RoleSet};

/// One role assignment with its minimization key. Ephemeral: generated,
/// compared, and discarded within a single event encounter.
#[derive(Debug, Clone)]
pub struct Candidate {
    /// Minimization key (smaller is better, lexicographic).
    pub key: MinKey,
    /// Object handles assigned to role slots, in role order. Met members
    /// are implicit and do not occupy a slot.
    pub assignment: Vec<ObjectHandle>,
}

/// Enumerate all permutations of `items` in lexicographic order.
///
/// `items` arrives in canonical handle order, so the first emitted
/// permutation of any surviving class is the lexicographically smallest
/// handle tuple. Sizes are tiny (3-4 objects), brute force is fine.
fn permutations(items: &[ObjectHandle]) -> Vec<Vec<ObjectHandle>> {
    let mut out = Vec::new();
    let mut current = Vec::with_capacity(items.len());
    let mut used = vec![false; items.len()];
    permute_into(items, &mut used, &mut current, &mut out);
    out
}

fn permute_into(
    items: &[ObjectHandle],
    used: &mut [bool],
    current: &mut Vec<ObjectHandle>,
    out: &mut Vec<Vec<ObjectHandle>>,
) {
    if current.len() == items.len() {
        out.push(current.clone());
        return;
    }
    for i in 0..items.len() {
        if used[i] {
            continue;
        }
        used[i] = true;
        current.push(items[i]);
        permute_into(items, used, current, out);
        current.pop();
        used[i] = false;
    }
}

/// Does one assignment satisfy the role set's structural and stored-sign
/// constraints?
fn satisfies(set: &RoleSet, row: &RowReader<'_>, assignment: &[ObjectHandle]) -> Result<bool> {
    let mut slot = 0;
    for role in &set.roles {
        let n = role.n_objects();
        let members: Vec<ObjectHandle> = assignment[slot..slot + n].to_vec();
        for (member, handle) in role.members.iter().zip(members.iter()) {
            if let RoleMember::Object { allowed } = member {
                if !allowed.contains(&handle.flavor) {
                    return Ok(false);
                }
            }
        }
        if n == 2 {
            // Canonical-order pruning: a symmetric pair is only accepted
            // with its members in canonical handle order, so swapped
            // duplicates never survive.
            if members[0] >= members[1] {
                return Ok(false);
            }
            if role.same_flavor && members[0].flavor != members[1].flavor {
                return Ok(false);
            }
            match role.pair_sign {
                Some(PairSign::SameSign) => {
                    if !row.same_sign(members[0], members[1])? {
                        return Ok(false);
                    }
                }
                Some(PairSign::OppositeSign) => {
                    if row.same_sign(members[0], members[1])? {
                        return Ok(false);
                    }
                }
                None => {}
            }
        }
        slot += n;
    }
    if let Some((a, b)) = set.cross_opposite_sign {
        let lead_a = assignment[set.leading_slot(a)];
        let lead_b = assignment[set.leading_slot(b)];
        if row.charge(lead_a)? == row.charge(lead_b)? {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Enumerate every surviving (key, assignment) pair for this row.
///
/// For fixed row content the candidate set and each key are reproducible
/// bit for bit; permutation order is lexicographic over the canonical
/// handle list. Zero surviving candidates is a legitimate outcome.
pub fn generate(
    set: &RoleSet,
    key_fn: &KeyFn,
    row: &RowReader<'_>,
    objects: &[ObjectHandle],
) -> Result<Vec<Candidate>> {
    let mut candidates = Vec::new();
    for assignment in permutations(objects) {
        if !satisfies(set, row, &assignment)? {
            continue;
        }
        let key = key_fn(row, &assignment)?;
        candidates.push(Candidate { key, assignment });
    }
    Ok(candidates)
}

/// Veto-only variant: acceptance is boolean, so return the single
/// canonical representative (first surviving assignment in enumeration
/// order, i.e. the lexicographically smallest handle tuple) with a
/// constant key. Downstream treats presence as the signal.
pub fn generate_canonical(
    set: &RoleSet,
    row: &RowReader<'_>,
    objects: &[ObjectHandle],
) -> Result<Option<Candidate>> {
    for assignment in permutations(objects) {
        if satisfies(set, row, &assignment)? {
            return Ok(Some(Candidate { key: MinKey(vec![0.0]), assignment }));
        }
    }
    Ok(None)
}
