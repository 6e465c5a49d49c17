//! # sk-ntuple
//!
//! Data plumbing for the skimmer event reduction engine: columnar row
//! blocks with a typed attribute accessor, sample/file loading from JSON
//! containers, the flat output table, and the cutflow histogram.
//!
//! The input naming scheme is load-bearing: per-object scalars
//! `<handle>Pt` / `<handle>Eta` / ..., pairwise relations
//! `<a>_<b>_Mass` / `<a>_<b>_DR` / `<a>_<b>_SS`, and event-global fields
//! (`evt`, `run`, `lumi`, `nvtx`, `pfMetEt`, veto counts, trigger bits).
//! All access goes through [`RowReader`] so the key strings are formatted
//! in exactly one place.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod histogram;
pub mod row;
pub mod source;
pub mod table;

pub use histogram::CutflowHistogram;
pub use row::{RowBlock, RowReader};
pub use source::{Sample, SampleFile};
pub use table::{
    ColumnData, ColumnKind, ColumnSpec, ColumnValue, OutputRecord, OutputTable, SENTINEL,
};
