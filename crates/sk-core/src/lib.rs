//! # sk-core
//!
//! Shared types for the skimmer event reduction engine: object handles,
//! event keys, minimization keys, and the workspace-wide error type.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{EventKey, Flavor, MinKey, ObjectHandle, RunPeriod};
