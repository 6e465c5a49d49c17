//! Per-event state across encounters.
//!
//! One entity per (run, lumi, evt) key holds the cutflow high-water-mark,
//! the stored best-candidate key, and the materialized output record.
//! Keeping them in one struct with monotonic update methods (rather than
//! parallel maps updated in lockstep) makes desynchronization impossible.

use std::collections::BTreeMap;

use sk_core::{EventKey, MinKey};
use sk_ntuple::OutputRecord;

/// State for one physical event, mutated monotonically across encounters.
#[derive(Debug, Clone, Default)]
pub struct PerEventState {
    /// Highest cutflow ladder stage ever reached, across all encounters
    /// and files. Never decreases.
    pub hwm: usize,
    /// Minimization key of the stored best candidate; `None` until a
    /// candidate is first stored (treated as all-infinite by the selector).
    pub best_key: Option<MinKey>,
    /// Output record materialized for the stored best candidate.
    pub record: Option<OutputRecord>,
}

impl PerEventState {
    /// Raise the high-water-mark; lower stages are ignored, so arrival
    /// order across files cannot regress the cutflow.
    pub fn raise(&mut self, stage: usize) {
        if stage > self.hwm {
            self.hwm = stage;
        }
    }

    /// Install a superseding candidate's key and freshly materialized
    /// record, replacing any prior materialization.
    pub fn install(&mut self, key: MinKey, record: OutputRecord) {
        self.best_key = Some(key);
        self.record = Some(record);
    }
}

/// All per-event state for one run, keyed and deduplicated by event key.
///
/// BTreeMap so finalize-time iteration (output rows, cutflow aggregation)
/// is in deterministic event-key order.
#[derive(Debug, Clone, Default)]
pub struct EventStore {
    map: BTreeMap<EventKey, PerEventState>,
}

impl EventStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an encounter of `key` that reached `stage`, creating the
    /// state on first encounter. Returns the (possibly new) entry.
    pub fn observe(&mut self, key: EventKey, stage: usize) -> &mut PerEventState {
        let entry = self.map.entry(key).or_default();
        entry.raise(stage);
        entry
    }

    /// Look up an event without creating it.
    pub fn get(&self, key: &EventKey) -> Option<&PerEventState> {
        self.map.get(key)
    }

    /// Number of distinct event keys seen.
    pub fn n_events(&self) -> usize {
        self.map.len()
    }

    /// Iterate in event-key order.
    pub fn iter(&self) -> impl Iterator<Item = (&EventKey, &PerEventState)> {
        self.map.iter()
    }
}
