//! Ordered cut sequences for preselection and tight selection.

use sk_core::{ObjectHandle, Result};
use sk_ntuple::RowReader;

use crate::channel::CutFn;

/// Outcome of evaluating a cut sequence against one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CutResult {
    /// True when every predicate passed.
    pub passed: bool,
    /// Zero-based index of the first failing predicate, or the sequence
    /// length when all passed. This index feeds directly into the cutflow
    /// ladder; the candidate-construction and best-candidate gates occupy
    /// the next two indices after the sequence.
    pub stage: usize,
}

/// An ordered, named list of predicates over an event row.
///
/// Built once at configuration time and immutable afterwards (`add`
/// consumes and returns the sequence). Evaluation is a pure function of the
/// row and the fixed predicate list; the engine evaluates each sequence at
/// most once per row visit and threads the result through, so expensive
/// predicates are never recomputed within a pass.
pub struct CutSequence {
    cuts: Vec<(String, CutFn)>,
}

impl CutSequence {
    /// Empty sequence.
    pub fn new() -> Self {
        CutSequence { cuts: Vec::new() }
    }

    /// Append a named predicate.
    pub fn add(mut self, name: impl Into<String>, cut: CutFn) -> Self {
        self.cuts.push((name.into(), cut));
        self
    }

    /// Number of predicates.
    pub fn len(&self) -> usize {
        self.cuts.len()
    }

    /// True when no predicate has been added.
    pub fn is_empty(&self) -> bool {
        self.cuts.is_empty()
    }

    /// Cut names in evaluation order (cutflow bin labels).
    pub fn labels(&self) -> Vec<String> {
        self.cuts.iter().map(|(name, _)| name.clone()).collect()
    }

    /// Run predicates strictly in order, short-circuiting on the first
    /// failure. Predicate errors (missing branches) abort the run.
    pub fn evaluate(&self, row: &RowReader<'_>, objects: &[ObjectHandle]) -> Result<CutResult> {
        for (i, (_, cut)) in self.cuts.iter().enumerate() {
            if !cut(row, objects)? {
                return Ok(CutResult { passed: false, stage: i });
            }
        }
        Ok(CutResult { passed: true, stage: self.cuts.len() })
    }
}

impl Default for CutSequence {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use sk_ntuple::RowBlock;

    use super::*;

    fn one_row(met: f64) -> RowBlock {
        let mut cols = HashMap::new();
        cols.insert("pfMetEt".to_string(), vec![met]);
        RowBlock::new("emm", cols).unwrap()
    }

    fn sequence() -> CutSequence {
        CutSequence::new()
            .add("always", Arc::new(|_, _| Ok(true)))
            .add("met30", Arc::new(|row, _| Ok(row.met()? > 30.0)))
            .add("never", Arc::new(|_, _| Ok(false)))
    }

    #[test]
    fn reports_first_failing_stage() {
        let block = one_row(10.0);
        let result = sequence().evaluate(&block.reader(0), &[]).unwrap();
        assert_eq!(result, CutResult { passed: false, stage: 1 });
    }

    #[test]
    fn later_cuts_not_reached_after_failure() {
        let block = one_row(35.0);
        let result = sequence().evaluate(&block.reader(0), &[]).unwrap();
        // met passes, the final predicate fails
        assert_eq!(result, CutResult { passed: false, stage: 2 });
    }

    #[test]
    fn full_pass_reports_sequence_length() {
        let block = one_row(35.0);
        let cuts = CutSequence::new()
            .add("always", Arc::new(|_, _| Ok(true)))
            .add("met30", Arc::new(|row, _| Ok(row.met()? > 30.0)));
        let result = cuts.evaluate(&block.reader(0), &[]).unwrap();
        assert_eq!(result, CutResult { passed: true, stage: 2 });
    }

    #[test]
    fn missing_branch_aborts() {
        let cuts = CutSequence::new().add("mass", Arc::new(|row, _| Ok(row.mass()? > 0.0)));
        let block = one_row(35.0);
        assert!(cuts.evaluate(&block.reader(0), &[]).is_err());
    }
}
