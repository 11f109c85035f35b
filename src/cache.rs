//! An on-disk cache of optimisation results.
//!
//! Results are keyed by a hash of the problem input, the representative periods used and the
//! program version, so a cached result is only reused if solving again would give the same answer.
//! Files are spread over two levels of subdirectories to keep directories small.
use crate::input::{ProblemInput, read_json};
use crate::optimisation::SolutionQuality;
use crate::output::metadata::{RunMetadata, write_metadata};
use crate::output::{OptimisationResult, write_json};
use crate::profile::RepresentativePeriods;
use anyhow::{Context, Result};
use log::{debug, warn};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

/// The data which determines a result
#[derive(Serialize)]
struct CacheKeyData<'a> {
    input: &'a ProblemInput,
    periods: &'a RepresentativePeriods,
    version: &'a str,
}

/// Compute the cache key for a problem.
///
/// The data are converted to a [`serde_json::Value`] first, which sorts the keys of objects, so that
/// the key does not depend on the order of entries in the input.
pub fn cache_key(input: &ProblemInput, periods: &RepresentativePeriods) -> Result<String> {
    let data = CacheKeyData {
        input,
        periods,
        version: env!("CARGO_PKG_VERSION"),
    };
    let canonical = serde_json::to_vec(&serde_json::to_value(&data)?)?;

    let mut hasher = Sha256::new();
    hasher.update(canonical);
    let digest = hasher.finalize();
    Ok(hex::encode(digest))
}

/// A directory of cached results
#[derive(Debug, Clone)]
pub struct ResultCache {
    dir: PathBuf,
}

impl ResultCache {
    /// Open a cache in the given directory. The directory is created when first written to.
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    /// The root directory of the cache
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The path to the result file for the given key
    pub(crate) fn result_path(&self, key: &str) -> PathBuf {
        self.dir
            .join(&key[0..2])
            .join(&key[2..4])
            .join(format!("{key}.json"))
    }

    /// Look up a result.
    ///
    /// A cache file which cannot be read is treated as missing.
    pub fn get(&self, key: &str) -> Option<OptimisationResult> {
        let file_path = self.result_path(key);
        if !file_path.is_file() {
            return None;
        }

        match read_json(&file_path) {
            Ok(result) => {
                debug!("Read cached result from {}", file_path.display());
                Some(result)
            }
            Err(err) => {
                warn!("Ignoring invalid cache file: {err:?}");
                None
            }
        }
    }

    /// Store a result along with metadata describing it.
    ///
    /// The metadata status records whether the result needed relaxed solver options.
    pub fn put(
        &self,
        key: &str,
        input: &ProblemInput,
        result: &OptimisationResult,
        quality: SolutionQuality,
    ) -> Result<()> {
        let file_path = self.result_path(key);
        let parent = file_path.parent().context("Invalid cache path")?;
        fs::create_dir_all(parent)
            .with_context(|| format!("Could not create cache directory {}", parent.display()))?;

        write_json(&file_path, result)?;
        write_metadata(
            &file_path.with_extension("metadata.json"),
            RunMetadata::new(
                vec![input.source_region_code.clone()],
                &quality.to_string(),
            ),
        )
    }
}
