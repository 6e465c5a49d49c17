//! # sk-engine
//!
//! The event reduction engine: reads final-state row streams, reconstructs
//! composite initial-state candidates by brute-force permutation with
//! canonical pruning, gates rows through an ordered cut sequence, resolves
//! combinatorial ambiguity by lexicographic minimization, and accumulates
//! idempotent per-event cutflow high-water-marks across files.
//!
//! One generic [`Engine`] is parameterized by a [`ChannelSpec`]: role
//! templates, cut sequences, ranking policy, and injected predicate/weight
//! closures. Built-in channel descriptors live in [`channels`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod candidates;
pub mod channel;
pub mod channels;
pub mod cuts;
pub mod cutflow;
pub mod engine;
pub mod enumerate;
pub mod materialize;
pub mod select;
pub mod state;

pub use candidates::Candidate;
pub use channel::{
    AltState, ChannelSpec, CutFn, IdFn, KeyFn, PairSign, RankingPolicy, RoleMember, RoleSet,
    RoleTemplate, VetoFn, WeightFn,
};
pub use cuts::{CutResult, CutSequence};
pub use engine::{Engine, RunOutput};
pub use enumerate::enumerate_objects;
