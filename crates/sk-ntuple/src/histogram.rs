//! Labeled cutflow histogram written alongside the output table.

use serde::Serialize;

/// Per-stage event counts over the selection ladder.
///
/// Bin 0 ("No cuts") holds the summed upstream processed-event count; the
/// remaining bins count distinct event keys whose cutflow high-water-mark
/// reached that ladder stage. Bins after the first are monotone
/// non-increasing.
#[derive(Debug, Clone, Serialize)]
pub struct CutflowHistogram {
    /// One label per bin.
    pub labels: Vec<String>,
    /// One count per bin.
    pub counts: Vec<f64>,
}

impl CutflowHistogram {
    /// Build a histogram; label and count lengths must agree (caller bug
    /// otherwise, so this asserts).
    pub fn new(labels: Vec<String>, counts: Vec<f64>) -> Self {
        assert_eq!(labels.len(), counts.len(), "cutflow labels and counts must align");
        CutflowHistogram { labels, counts }
    }

    /// Number of bins.
    pub fn n_bins(&self) -> usize {
        self.counts.len()
    }

    /// Count for a labeled bin, if present.
    pub fn count_for(&self, label: &str) -> Option<f64> {
        self.labels.iter().position(|l| l == label).map(|i| self.counts[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_lookup() {
        let h = CutflowHistogram::new(
            vec!["No cuts".into(), "Trigger".into()],
            vec![100.0, 40.0],
        );
        assert_eq!(h.n_bins(), 2);
        assert_eq!(h.count_for("Trigger"), Some(40.0));
        assert_eq!(h.count_for("ID"), None);
    }
}
