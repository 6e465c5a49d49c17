//! Sample and file loading.
//!
//! A sample is a directory of JSON row containers, one per upstream file.
//! Each container carries the upstream processed-event count (used for the
//! "No cuts" cutflow bin) and one row block per final state.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use sk_core::{Error, Result};

use crate::row::RowBlock;

#[derive(Deserialize)]
struct BlockSchema {
    columns: HashMap<String, Vec<f64>>,
}

#[derive(Deserialize)]
struct SampleFileSchema {
    event_count: u64,
    final_states: HashMap<String, BlockSchema>,
}

/// One input file: upstream event count plus per-final-state row blocks.
#[derive(Debug, Clone)]
pub struct SampleFile {
    /// File stem, for logging.
    pub name: String,
    /// Events processed upstream to produce this file (not the row count:
    /// rows are post-reconstruction combinations).
    pub event_count: u64,
    blocks: HashMap<String, RowBlock>,
}

impl SampleFile {
    /// Parse a container from JSON text.
    pub fn from_json(name: impl Into<String>, text: &str) -> Result<Self> {
        let schema: SampleFileSchema = serde_json::from_str(text)?;
        let mut blocks = HashMap::new();
        for (fs, block) in schema.final_states {
            let rb = RowBlock::new(fs.clone(), block.columns)?;
            blocks.insert(fs, rb);
        }
        Ok(SampleFile { name: name.into(), event_count: schema.event_count, blocks })
    }

    /// Load a container from disk. Open/read/parse failures are fatal for
    /// the run; downstream event-count normalization requires every claimed
    /// file to have been processed.
    pub fn open(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self::from_json(name, &text)
    }

    /// Row block for one final state, if the file carries it.
    pub fn block(&self, final_state: &str) -> Option<&RowBlock> {
        self.blocks.get(final_state)
    }

    /// Build a file directly from blocks (test and in-memory use).
    pub fn from_blocks(
        name: impl Into<String>,
        event_count: u64,
        blocks: Vec<RowBlock>,
    ) -> Self {
        let blocks = blocks.into_iter().map(|b| (b.final_state().to_string(), b)).collect();
        SampleFile { name: name.into(), event_count, blocks }
    }
}

/// One sample: an ordered list of input files sharing an output sink.
#[derive(Debug, Clone)]
pub struct Sample {
    /// Sample name (directory stem).
    pub name: String,
    /// Input files in processing order.
    pub files: Vec<SampleFile>,
}

impl Sample {
    /// Load every `*.json` file under `dir`, in sorted filename order so
    /// the processing order is reproducible.
    pub fn from_dir(dir: &Path) -> Result<Self> {
        let name = dir
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| dir.display().to_string());
        let mut paths: Vec<_> = fs::read_dir(dir)?
            .collect::<std::io::Result<Vec<_>>>()?
            .into_iter()
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();
        if paths.is_empty() {
            return Err(Error::Config(format!("no input files in {}", dir.display())));
        }
        let mut files = Vec::with_capacity(paths.len());
        for p in &paths {
            files.push(SampleFile::open(p)?);
        }
        Ok(Sample { name, files })
    }

    /// Build a sample from in-memory files.
    pub fn from_files(name: impl Into<String>, files: Vec<SampleFile>) -> Self {
        Sample { name: name.into(), files }
    }
}
