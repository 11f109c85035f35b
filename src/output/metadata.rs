//! Write run and program metadata alongside results.
//!
//! Metadata records when a result was produced, for which region and by which version of the
//! program. It is written as a JSON file next to cached results and batch output.
use super::write_json;
use crate::problem::RegionCode;
use anyhow::Result;
use chrono::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Metadata structure serialised to JSON
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct Metadata {
    /// Information about the run
    pub run: RunMetadata,
    /// Information about the program
    pub program: ProgramMetadata,
}

/// Information about the optimisation run
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct RunMetadata {
    /// The regions which were optimised
    pub source_region_codes: Vec<RegionCode>,
    /// The date and time at which the results were written
    pub datetime: String,
    /// Outcome of the optimisation (e.g. `Optimal`)
    pub status: String,
}

impl RunMetadata {
    /// Create metadata for a run finishing now
    pub fn new(source_region_codes: Vec<RegionCode>, status: &str) -> Self {
        let dt = Local::now();
        Self {
            source_region_codes,
            datetime: dt.to_rfc2822(),
            status: status.to_string(),
        }
    }
}

/// Information about the program which produced the results
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct ProgramMetadata {
    /// The program name
    pub name: String,
    /// The program version as specified in Cargo.toml
    pub version: String,
}

impl Default for ProgramMetadata {
    fn default() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Write metadata for a run to the specified path
pub fn write_metadata(file_path: &Path, run: RunMetadata) -> Result<()> {
    let metadata = Metadata {
        run,
        program: ProgramMetadata::default(),
    };
    write_json(file_path, &metadata)
}
