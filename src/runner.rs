//! Code for running optimisations from input data, with optional caching and batch processing.
use crate::cache::{ResultCache, cache_key};
use crate::input::ProblemInput;
use crate::optimisation::{ChainOptimisation, SolutionQuality, SolverOptions};
use crate::output::OptimisationResult;
use crate::problem::RegionCode;
use crate::profile::ProfileSource;
use anyhow::Result;
use log::{info, warn};
use rayon::prelude::*;
use serde::Serialize;

/// The outcome of one optimisation in a batch
#[derive(Debug, Serialize)]
pub struct BatchEntry {
    /// Position of the problem in the batch input
    pub index: usize,
    /// The region of the problem
    #[serde(rename = "SOURCE_REGION_CODE")]
    pub source_region_code: RegionCode,
    /// The result, if the optimisation succeeded
    pub result: Option<OptimisationResult>,
    /// A description of the error, if the optimisation failed
    pub error: Option<String>,
}

impl BatchEntry {
    /// Whether the optimisation succeeded
    pub fn is_ok(&self) -> bool {
        self.result.is_some()
    }
}

/// Solves problems given as [`ProblemInput`]s.
///
/// Profiles are looked up for each problem and results are optionally cached.
pub struct Runner<'a> {
    profiles: &'a dyn ProfileSource,
    cache: Option<&'a ResultCache>,
    options: SolverOptions,
    retry: bool,
}

impl<'a> Runner<'a> {
    /// Create a new [`Runner`] using the given source of profiles
    pub fn new(profiles: &'a dyn ProfileSource) -> Self {
        Self {
            profiles,
            cache: None,
            options: SolverOptions::default(),
            retry: false,
        }
    }

    /// Read and write results from the given cache
    pub fn with_cache(self, cache: Option<&'a ResultCache>) -> Self {
        Self { cache, ..self }
    }

    /// Use the given solver options
    pub fn with_options(self, options: SolverOptions) -> Self {
        Self { options, ..self }
    }

    /// Whether to retry once after a numerical failure of the solver
    pub fn with_retry(self, retry: bool) -> Self {
        Self { retry, ..self }
    }

    /// Check that the input describes a valid problem and that profiles are available for it
    pub fn validate(&self, input: &ProblemInput) -> Result<()> {
        let problem = input.clone().into_problem()?;
        problem.validate()?;
        self.profiles
            .get_periods(&problem.source_region, &problem.renewable_codes())?;

        Ok(())
    }

    /// Solve a single problem
    pub fn solve(&self, input: &ProblemInput) -> Result<OptimisationResult> {
        let problem = input.clone().into_problem()?;
        problem.validate()?;
        let periods = self
            .profiles
            .get_periods(&problem.source_region, &problem.renewable_codes())?;

        let key = match self.cache {
            Some(cache) => {
                let key = cache_key(input, &periods)?;
                if let Some(result) = cache.get(&key) {
                    info!(
                        "Using cached result for problem in {}",
                        problem.source_region
                    );
                    return Ok(result);
                }
                Some((cache, key))
            }
            None => None,
        };

        let (result, quality) = ChainOptimisation::new(&problem, &periods)
            .with_options(self.options)
            .with_retry(self.retry)
            .run_with_quality()?;
        if quality == SolutionQuality::OptimalRelaxed {
            info!(
                "Result for {} was found with relaxed solver options",
                problem.source_region
            );
        }

        if let Some((cache, key)) = key {
            // A failure to cache shouldn't cause the optimisation to fail
            if let Err(err) = cache.put(&key, input, &result, quality) {
                warn!("Could not cache result: {err:?}");
            }
        }

        Ok(result)
    }

    /// Solve a batch of problems in parallel.
    ///
    /// A failure for one problem does not affect the others. Entries are returned in input order.
    pub fn solve_batch(&self, inputs: &[ProblemInput]) -> Vec<BatchEntry> {
        inputs
            .par_iter()
            .enumerate()
            .map(|(index, input)| {
                let (result, error) = match self.solve(input) {
                    Ok(result) => (Some(result), None),
                    Err(err) => {
                        warn!(
                            "Optimisation {index} ({}) failed: {err:#}",
                            input.source_region_code
                        );
                        (None, Some(format!("{err:#}")))
                    }
                };

                BatchEntry {
                    index,
                    source_region_code: input.source_region_code.clone(),
                    result,
                    error,
                }
            })
            .collect()
    }
}
