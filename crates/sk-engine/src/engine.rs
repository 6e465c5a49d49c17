//! The event reduction loop.
//!
//! One [`Engine`] processes the files of one sample through one channel
//! descriptor and finalizes into an output table plus cutflow histogram.
//! All per-event state is keyed by (run, lumi, evt), so re-encounters of
//! the same physical event across rows and files fold into one entry.

use serde::Serialize;
use tracing::{debug, info};

use sk_core::Result;
use sk_ntuple::{ColumnSpec, CutflowHistogram, OutputTable, Sample, SampleFile};

use crate::candidates::{self, Candidate};
use crate::channel::{ChannelSpec, RankingPolicy};
use crate::cutflow;
use crate::enumerate::enumerate_objects;
use crate::materialize::{materialize, output_schema};
use crate::select::{best_of_encounter, supersedes};
use crate::state::EventStore;

/// Finalized results for one (channel, sample) run; one JSON document per
/// sample in the output sink.
#[derive(Serialize)]
pub struct RunOutput {
    /// Channel name.
    pub channel: String,
    /// Sample name.
    pub sample: String,
    /// One row per selected event, in event-key order.
    pub table: OutputTable,
    /// Labeled cutflow.
    pub cutflow: CutflowHistogram,
}

/// Reduction engine for one channel.
pub struct Engine {
    channel: ChannelSpec,
    schema: Vec<ColumnSpec>,
    store: EventStore,
    events_processed: u64,
}

impl Engine {
    /// Build an engine, validating the channel descriptor and its output
    /// schema up front so every failure mode of the configuration is hit
    /// before any row is read.
    pub fn new(channel: ChannelSpec) -> Result<Self> {
        channel.validate()?;
        let schema = output_schema(&channel)?;
        Ok(Engine { channel, schema, store: EventStore::new(), events_processed: 0 })
    }

    /// Process every file of a sample, in the sample's file order. The
    /// result is order-independent: high-water-marks are monotonic and
    /// lexicographic supersession is associative over encounters.
    pub fn process_sample(&mut self, sample: &Sample) -> Result<()> {
        info!(sample = %sample.name, files = sample.files.len(), "processing sample");
        for file in &sample.files {
            self.process_file(file)?;
        }
        Ok(())
    }

    /// Process one input file.
    pub fn process_file(&mut self, file: &SampleFile) -> Result<()> {
        self.events_processed += file.event_count;
        let channel = &self.channel;
        let store = &mut self.store;
        let n_cuts = channel.preselection.len();

        let mut rows = 0usize;
        for fs in &channel.final_states {
            let Some(block) = file.block(fs) else {
                debug!(file = %file.name, final_state = %fs, "final state absent, skipping");
                continue;
            };
            let objects = enumerate_objects(fs)?;
            rows += block.len();

            for idx in 0..block.len() {
                let row = block.reader(idx);
                let key = row.event_key()?;

                let result = channel.preselection.evaluate(&row, &objects)?;
                store.observe(key, result.stage);
                if !result.passed {
                    continue;
                }

                let candidates: Vec<Candidate> = match &channel.ranking {
                    RankingPolicy::Lexicographic { key_fn } => {
                        candidates::generate(&channel.role_set, key_fn, &row, &objects)?
                    }
                    RankingPolicy::VetoOnly => {
                        candidates::generate_canonical(&channel.role_set, &row, &objects)?
                            .into_iter()
                            .collect()
                    }
                };
                let Some(best) = best_of_encounter(&candidates) else {
                    continue;
                };
                store.observe(key, n_cuts + 1);

                let incumbent = store.get(&key).and_then(|s| s.best_key.clone());
                if !supersedes(
                    &channel.ranking,
                    channel.store_veto.as_ref(),
                    &row,
                    best,
                    incumbent.as_ref(),
                )? {
                    continue;
                }

                let pass_tight = match &channel.selection {
                    Some(seq) => seq.evaluate(&row, &objects)?.passed,
                    None => true,
                };
                let record = materialize(channel, &row, &best.assignment, true, pass_tight)?;
                let state = store.observe(key, n_cuts + 2);
                state.install(best.key.clone(), record);
            }
        }
        debug!(file = %file.name, rows, events = file.event_count, "file processed");
        Ok(())
    }

    /// Distinct event keys encountered so far.
    pub fn n_events(&self) -> usize {
        self.store.n_events()
    }

    /// Flush the accumulated state into the output table and cutflow.
    pub fn finalize(self, sample: impl Into<String>) -> Result<RunOutput> {
        let mut table = OutputTable::new(self.schema)?;
        for (_, state) in self.store.iter() {
            if let Some(record) = &state.record {
                table.append(record)?;
            }
        }
        let cutflow =
            cutflow::histogram(&self.channel.preselection.labels(), &self.store, self.events_processed);
        let sample = sample.into();
        info!(
            channel = %self.channel.name,
            sample = %sample,
            events = self.store.n_events(),
            selected = table.n_rows(),
            "finalized"
        );
        Ok(RunOutput { channel: self.channel.name, sample, table, cutflow })
    }
}
