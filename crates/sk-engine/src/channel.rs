//! Channel descriptors: role templates, constraints, ranking policy, and
//! the injected predicate/weight library.
//!
//! A channel is data plus closures; there is exactly one engine and it is
//! parameterized by this descriptor. Channel-specific behavior (cut
//! content, minimization keys, identification tiers, weights) is expressed
//! as injected strategy functions, never as subclassing.

use std::sync::Arc;

use sk_core::{Error, Flavor, MinKey, ObjectHandle, Result, RunPeriod};
use sk_ntuple::RowReader;

use crate::cuts::CutSequence;
use crate::enumerate::enumerate_objects;

/// Predicate over one row plus the enumerated objects of its final state.
pub type CutFn = Arc<dyn Fn(&RowReader<'_>, &[ObjectHandle]) -> Result<bool> + Send + Sync>;

/// Minimization key for one role assignment (ordered handle list).
pub type KeyFn = Arc<dyn Fn(&RowReader<'_>, &[ObjectHandle]) -> Result<MinKey> + Send + Sync>;

/// Event-level store gate (e.g. extra-lepton veto); true allows storing.
pub type VetoFn = Arc<dyn Fn(&RowReader<'_>) -> Result<bool> + Send + Sync>;

/// Identification predicate for one object.
pub type IdFn = Arc<dyn Fn(&RowReader<'_>, ObjectHandle) -> Result<bool> + Send + Sync>;

/// Scalar event weight (pileup reweighting, lepton scale factors).
pub type WeightFn = Arc<dyn Fn(&RowReader<'_>, &[ObjectHandle]) -> Result<f64> + Send + Sync>;

/// One slot of a role template.
#[derive(Debug, Clone)]
pub enum RoleMember {
    /// A reconstructed object restricted to the given species.
    Object {
        /// Species this slot accepts.
        allowed: Vec<Flavor>,
    },
    /// Missing transverse energy. Implicit: never permuted, never counted
    /// as an enumerable object.
    Met,
}

/// Sign constraint between the two object members of one role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairSign {
    /// The stored same-sign flag must be set.
    SameSign,
    /// The stored same-sign flag must be clear.
    OppositeSign,
}

/// One initial-state role built from final-state objects.
#[derive(Debug, Clone)]
pub struct RoleTemplate {
    /// Role name; becomes the output column namespace (`z1.mass`, ...).
    pub name: String,
    /// One or two members; `Met` may only appear as the second member.
    pub members: Vec<RoleMember>,
    /// Require both object members to share a species.
    pub same_flavor: bool,
    /// Sign constraint between two object members.
    pub pair_sign: Option<PairSign>,
}

impl RoleTemplate {
    /// A single-object role.
    pub fn single(name: impl Into<String>, allowed: &[Flavor]) -> Self {
        RoleTemplate {
            name: name.into(),
            members: vec![RoleMember::Object { allowed: allowed.to_vec() }],
            same_flavor: false,
            pair_sign: None,
        }
    }

    /// A two-object role with optional flavor/sign constraints.
    pub fn pair(
        name: impl Into<String>,
        allowed: &[Flavor],
        same_flavor: bool,
        pair_sign: Option<PairSign>,
    ) -> Self {
        RoleTemplate {
            name: name.into(),
            members: vec![
                RoleMember::Object { allowed: allowed.to_vec() },
                RoleMember::Object { allowed: allowed.to_vec() },
            ],
            same_flavor,
            pair_sign,
        }
    }

    /// An object-plus-met role.
    pub fn with_met(name: impl Into<String>, allowed: &[Flavor]) -> Self {
        RoleTemplate {
            name: name.into(),
            members: vec![RoleMember::Object { allowed: allowed.to_vec() }, RoleMember::Met],
            same_flavor: false,
            pair_sign: None,
        }
    }

    /// Number of object (non-met) slots.
    pub fn n_objects(&self) -> usize {
        self.members.iter().filter(|m| matches!(m, RoleMember::Object { .. })).count()
    }

    /// True when the role includes missing energy.
    pub fn has_met(&self) -> bool {
        self.members.iter().any(|m| matches!(m, RoleMember::Met))
    }
}

/// An ordered list of roles plus cross-role constraints; the unit the
/// candidate generator enumerates against.
#[derive(Debug, Clone)]
pub struct RoleSet {
    /// Roles in assignment order.
    pub roles: Vec<RoleTemplate>,
    /// Opposite-charge requirement between the leading object members of
    /// two roles, by role index (doubly-charged-search style).
    pub cross_opposite_sign: Option<(usize, usize)>,
}

impl RoleSet {
    /// Role set with no cross-role constraint.
    pub fn new(roles: Vec<RoleTemplate>) -> Self {
        RoleSet { roles, cross_opposite_sign: None }
    }

    /// Add a cross-role opposite-sign constraint.
    pub fn cross_opposite_sign(mut self, role_a: usize, role_b: usize) -> Self {
        self.cross_opposite_sign = Some((role_a, role_b));
        self
    }

    /// Total object slots across all roles.
    pub fn n_objects(&self) -> usize {
        self.roles.iter().map(RoleTemplate::n_objects).sum()
    }

    /// Object-slot index of the leading member of a role.
    pub(crate) fn leading_slot(&self, role_idx: usize) -> usize {
        self.roles[..role_idx].iter().map(RoleTemplate::n_objects).sum()
    }
}

/// How competing candidates within (and across encounters of) an event are
/// ranked.
pub enum RankingPolicy {
    /// Full lexicographic minimization of the key produced by `key_fn`;
    /// strictly smaller keys supersede, ties keep the incumbent.
    Lexicographic {
        /// Minimization-key function, evaluated per surviving assignment.
        key_fn: KeyFn,
    },
    /// No ranking: acceptance is boolean and the generator's single
    /// canonical representative (first surviving assignment in enumeration
    /// order) is stored.
    VetoOnly,
}

/// Auxiliary bookkeeping roles chosen independently of the primary
/// selection and written alongside it (sentinel-filled when no assignment
/// satisfies the constraints).
pub struct AltState {
    /// Roles of the alternative state.
    pub role_set: RoleSet,
    /// Minimization key used to pick the single best assignment.
    pub key_fn: KeyFn,
}

/// Full per-channel configuration, fixed at construction.
pub struct ChannelSpec {
    /// Channel name (output tree name).
    pub name: String,
    /// Data-taking period, forwarded to injected predicates.
    pub period: RunPeriod,
    /// Valid final-state labels.
    pub final_states: Vec<String>,
    /// Primary initial-state roles.
    pub role_set: RoleSet,
    /// Preselection ladder (drives the cutflow).
    pub preselection: CutSequence,
    /// Optional tight selection for the `select.passTight` column; when
    /// absent the preselection result is reused.
    pub selection: Option<CutSequence>,
    /// Candidate ranking policy.
    pub ranking: RankingPolicy,
    /// Event-level gate evaluated before any store (extra-lepton veto).
    pub store_veto: Option<VetoFn>,
    /// Alternative bookkeeping states.
    pub alt_states: Vec<AltState>,
    /// Tight identification predicate (per-object `PassTight` columns).
    pub tight_id: IdFn,
    /// Pileup weight.
    pub pu_weight: WeightFn,
    /// Lepton scale factor for the selected objects.
    pub lep_scale: WeightFn,
}

impl ChannelSpec {
    /// Validate the descriptor: every final-state label must parse and
    /// enumerate to exactly the number of object slots the role templates
    /// require, roles must have one or two members with met only in second
    /// position, and cross-role constraints must point at real roles.
    ///
    /// Called once by the engine at startup; all failures are fatal
    /// configuration errors.
    pub fn validate(&self) -> Result<()> {
        if self.final_states.is_empty() {
            return Err(Error::Config(format!("channel '{}' has no final states", self.name)));
        }
        let want = self.role_set.n_objects();
        for fs in &self.final_states {
            let objects = enumerate_objects(fs)?;
            if objects.len() != want {
                return Err(Error::Config(format!(
                    "final state '{}' has {} objects, role templates require {}",
                    fs,
                    objects.len(),
                    want
                )));
            }
        }
        for alt in &self.alt_states {
            // Alternative states draw from the same enumerated objects, so
            // they may never require more slots than the primary roles.
            if alt.role_set.n_objects() > want {
                return Err(Error::Config(format!(
                    "alternative state requires {} objects, channel '{}' enumerates {}",
                    alt.role_set.n_objects(),
                    self.name,
                    want
                )));
            }
        }
        for set in std::iter::once(&self.role_set).chain(self.alt_states.iter().map(|a| &a.role_set))
        {
            for role in &set.roles {
                match role.members.as_slice() {
                    [RoleMember::Object { .. }] => {}
                    [RoleMember::Object { .. }, RoleMember::Object { .. }] => {}
                    [RoleMember::Object { .. }, RoleMember::Met] => {}
                    _ => {
                        return Err(Error::Config(format!(
                            "role '{}' has an unsupported member layout",
                            role.name
                        )));
                    }
                }
            }
            if let Some((a, b)) = set.cross_opposite_sign {
                if a >= set.roles.len() || b >= set.roles.len() || a == b {
                    return Err(Error::Config(format!(
                        "cross-sign constraint ({a}, {b}) does not name two distinct roles"
                    )));
                }
            }
        }
        Ok(())
    }
}
