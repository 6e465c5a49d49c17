//! Finalize-time cutflow aggregation.

use sk_ntuple::CutflowHistogram;

use crate::state::EventStore;

/// Aggregate per-event high-water-marks into a ladder of "at least N events
/// reached stage i" counts.
///
/// `ladder_len` is the number of stages past "seen at all": preselection
/// cuts plus the candidate-construction and best-candidate gates. Bin 0
/// counts every distinct event key; bin i counts keys with hwm >= i. The
/// result is monotone non-increasing by construction.
pub fn aggregate(store: &EventStore, ladder_len: usize) -> Vec<u64> {
    let mut bins = vec![0u64; ladder_len + 1];
    for (_, state) in store.iter() {
        for bin in bins.iter_mut().take(state.hwm.min(ladder_len) + 1) {
            *bin += 1;
        }
    }
    bins
}

/// Build the labeled histogram written next to the output table.
///
/// The leading "No cuts" bin carries the summed upstream processed-event
/// count (events the reconstruction stage ran over, not rows); the "All
/// events" bin is the distinct-event count, then one bin per preselection
/// cut, then the two downstream gates.
pub fn histogram(
    cut_labels: &[String],
    store: &EventStore,
    events_processed: u64,
) -> CutflowHistogram {
    let ladder_len = cut_labels.len() + 2;
    let bins = aggregate(store, ladder_len);

    let mut labels = Vec::with_capacity(bins.len() + 1);
    labels.push("No cuts".to_string());
    labels.push("All events".to_string());
    labels.extend(cut_labels.iter().cloned());
    labels.push("Candidate".to_string());
    labels.push("Best candidate".to_string());

    let mut counts = Vec::with_capacity(labels.len());
    counts.push(events_processed as f64);
    counts.extend(bins.iter().map(|&b| b as f64));

    CutflowHistogram::new(labels, counts)
}
