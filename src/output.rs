//! The results of an optimisation and code for writing them to file.
use crate::process::ProcessCode;
use crate::units::{Dimensionless, Hours, Money};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub mod metadata;

/// The default file name for the results of a single optimisation
pub const RESULT_FILE_NAME: &str = "result.json";

/// The file name for the results of a batch of optimisations
pub const BATCH_RESULTS_FILE_NAME: &str = "batch.results.json";

/// Results for a renewable source
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct RenewableResult {
    /// The technology of the source
    #[serde(rename = "PROCESS_CODE")]
    pub process_code: ProcessCode,
    /// Full load hours as a fraction of the year
    #[serde(rename = "FLH")]
    pub full_load_hours: Dimensionless,
    /// Share of total renewable capacity
    #[serde(rename = "SHARE_FACTOR")]
    pub share_factor: Dimensionless,
}

/// Results for a unit which converts commodities
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct ConversionResult {
    /// Full load hours as a fraction of the year
    #[serde(rename = "FLH")]
    pub full_load_hours: Dimensionless,
}

/// Results for a storage unit
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct StorageResult {
    /// Energy capacity relative to hourly final product output
    #[serde(rename = "CAP_F")]
    pub capacity_factor: Hours,
}

/// The result of a successful optimisation.
///
/// Entries for optional units are only present if the unit was part of the problem.
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct OptimisationResult {
    /// Results for each renewable source, in the order given in the problem
    #[serde(rename = "RES")]
    pub renewables: Vec<RenewableResult>,
    #[serde(rename = "ELY")]
    #[allow(missing_docs)]
    pub electrolyser: ConversionResult,
    #[serde(rename = "DERIV", default, skip_serializing_if = "Option::is_none")]
    #[allow(missing_docs)]
    pub derivative: Option<ConversionResult>,
    #[serde(rename = "H2O", default, skip_serializing_if = "Option::is_none")]
    #[allow(missing_docs)]
    pub water: Option<ConversionResult>,
    #[serde(rename = "CO2", default, skip_serializing_if = "Option::is_none")]
    #[allow(missing_docs)]
    pub carbon_dioxide: Option<ConversionResult>,
    #[serde(rename = "EL_STR", default, skip_serializing_if = "Option::is_none")]
    #[allow(missing_docs)]
    pub electricity_storage: Option<StorageResult>,
    #[serde(rename = "H2_STR", default, skip_serializing_if = "Option::is_none")]
    #[allow(missing_docs)]
    pub hydrogen_storage: Option<StorageResult>,
    /// Total annualised cost of the chain
    pub objective_value: Money,
}

impl OptimisationResult {
    /// Full load hours of the renewable mix as a whole.
    ///
    /// This is the mean of the sources' full load hours, weighted by their share factors. It can be
    /// used to treat a hybrid mix as a single renewable source.
    pub fn aggregate_renewable_flh(&self) -> Dimensionless {
        self.renewables
            .iter()
            .map(|res| Dimensionless(res.full_load_hours.value() * res.share_factor.value()))
            .sum()
    }

    /// Get the result for the given renewable source
    pub fn renewable(&self, code: &str) -> Option<&RenewableResult> {
        self.renewables
            .iter()
            .find(|res| res.process_code.as_str() == code)
    }
}

/// Serialise `value` as pretty-printed JSON to the given path.
///
/// The file is written to a temporary path first and then renamed, so that readers never see a
/// partially written file.
pub fn write_json<T: Serialize + ?Sized>(file_path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    let tmp_path = file_path.with_extension("json.tmp");
    fs::write(&tmp_path, json)
        .with_context(|| format!("Could not write to {}", tmp_path.display()))?;
    fs::rename(&tmp_path, file_path)
        .with_context(|| format!("Could not write to {}", file_path.display()))?;

    Ok(())
}

/// Write the result of a single optimisation to the given path
pub fn write_result(file_path: &Path, result: &OptimisationResult) -> Result<()> {
    write_json(file_path, result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::read_json;
    use float_cmp::assert_approx_eq;
    use rstest::{fixture, rstest};
    use serde_json::json;
    use tempfile::tempdir;

    #[fixture]
    fn hybrid_result() -> OptimisationResult {
        OptimisationResult {
            renewables: vec![
                RenewableResult {
                    process_code: "PV-FIX".into(),
                    full_load_hours: Dimensionless(0.2),
                    share_factor: Dimensionless(0.25),
                },
                RenewableResult {
                    process_code: "WIND-ON".into(),
                    full_load_hours: Dimensionless(0.6),
                    share_factor: Dimensionless(0.75),
                },
            ],
            electrolyser: ConversionResult {
                full_load_hours: Dimensionless(0.55),
            },
            derivative: None,
            water: None,
            carbon_dioxide: None,
            electricity_storage: Some(StorageResult {
                capacity_factor: Hours(0.0),
            }),
            hydrogen_storage: None,
            objective_value: Money(104.5),
        }
    }

    #[rstest]
    fn aggregate_flh(hybrid_result: OptimisationResult) {
        assert_approx_eq!(
            f64,
            hybrid_result.aggregate_renewable_flh().value(),
            0.5
        );
        assert_approx_eq!(
            f64,
            hybrid_result
                .aggregate_renewable_flh()
                .to_hours_per_year(),
            4380.0
        );
    }

    #[rstest]
    fn serialise_result(hybrid_result: OptimisationResult) {
        let value = serde_json::to_value(&hybrid_result).unwrap();
        assert_eq!(
            value,
            json!({
                "RES": [
                    {"PROCESS_CODE": "PV-FIX", "FLH": 0.2, "SHARE_FACTOR": 0.25},
                    {"PROCESS_CODE": "WIND-ON", "FLH": 0.6, "SHARE_FACTOR": 0.75}
                ],
                "ELY": {"FLH": 0.55},
                "EL_STR": {"CAP_F": 0.0},
                "objective_value": 104.5
            })
        );
    }

    #[rstest]
    fn write_and_read_result(hybrid_result: OptimisationResult) {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join(RESULT_FILE_NAME);
        write_result(&file_path, &hybrid_result).unwrap();

        let read: OptimisationResult = read_json(&file_path).unwrap();
        assert_eq!(read, hybrid_result);
        assert!(!file_path.with_extension("json.tmp").exists());
    }

    #[rstest]
    fn find_renewable(hybrid_result: OptimisationResult) {
        assert_eq!(
            hybrid_result.renewable("WIND-ON").unwrap().share_factor,
            Dimensionless(0.75)
        );
        assert!(hybrid_result.renewable("WIND-OFF").is_none());
    }
}
