//! Code for reading representative periods from aggregated profile CSV files.
use super::input_err_msg;
use crate::problem::RegionCode;
use crate::process::ProcessCode;
use crate::profile::{AvailabilityMap, ProfileSource, RepresentativePeriods};
use anyhow::{Context, Result, ensure};
use indexmap::IndexMap;
use log::debug;
use std::path::{Path, PathBuf};

/// The key used in file names for profiles of hybrid renewable configurations
pub const HYBRID_PROFILE_KEY: &str = "RES-HYBR";

/// The name of the profile file for the given region and renewable sources.
///
/// Profiles for a single source are stored in a file named after that source. Profiles for several
/// sources are stored together in a single hybrid file, so that availabilities are correlated.
pub fn profile_file_name(region: &RegionCode, codes: &[ProcessCode]) -> String {
    let key = match codes {
        [code] => code.as_str(),
        _ => HYBRID_PROFILE_KEY,
    };
    format!("{region}_{key}_aggregated.csv")
}

/// Reads profiles from CSV files in a directory.
///
/// Each file has the columns `period` and `weight`, followed by one column of availabilities for
/// each renewable source.
#[derive(Debug, Clone)]
pub struct CsvProfileSource {
    dir: PathBuf,
}

impl CsvProfileSource {
    /// Create a new profile source reading from `dir`
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    /// The directory profiles are read from
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ProfileSource for CsvProfileSource {
    fn get_periods(
        &self,
        region: &RegionCode,
        codes: &[ProcessCode],
    ) -> Result<RepresentativePeriods> {
        let file_path = self.dir.join(profile_file_name(region, codes));
        debug!("Reading profiles from {}", file_path.display());
        read_profiles_file(&file_path, codes).with_context(|| input_err_msg(&file_path))
    }
}

/// A row of a profile file, mapping column names to values
type ProfileRow = IndexMap<String, f64>;

/// Read the periods from the given file, keeping only the columns for `codes`
fn read_profiles_file(file_path: &Path, codes: &[ProcessCode]) -> Result<RepresentativePeriods> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(file_path)?;
    let headers = reader.headers()?;
    ensure!(
        headers.get(0) == Some("period") && headers.get(1) == Some("weight"),
        "The first two columns must be period and weight"
    );
    for code in codes {
        ensure!(
            headers.iter().any(|header| header == code.as_str()),
            "No availability column for {code}"
        );
    }

    let mut weights = Vec::new();
    let mut values = vec![Vec::new(); codes.len()];
    for row in reader.deserialize() {
        let row: ProfileRow = row?;
        weights.push(column_value(&row, "weight")?);
        for (code, values) in codes.iter().zip(values.iter_mut()) {
            values.push(column_value(&row, code.as_str())?);
        }
    }

    let availability: AvailabilityMap = codes.iter().cloned().zip(values).collect();
    RepresentativePeriods::new(weights, availability)
}

fn column_value(row: &ProfileRow, column: &str) -> Result<f64> {
    row.get(column)
        .copied()
        .with_context(|| format!("Missing value for {column}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::assert_error;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    fn write_file(dir: &Path, name: &str, contents: &str) {
        let mut file = File::create(dir.join(name)).unwrap();
        write!(file, "{contents}").unwrap();
    }

    #[test]
    fn file_names() {
        let region = RegionCode::from("ARG");
        assert_eq!(
            profile_file_name(&region, &["PV-FIX".into()]),
            "ARG_PV-FIX_aggregated.csv"
        );
        assert_eq!(
            profile_file_name(&region, &["PV-FIX".into(), "WIND-ON".into()]),
            "ARG_RES-HYBR_aggregated.csv"
        );
    }

    #[test]
    fn read_hybrid_profiles() {
        let dir = tempdir().unwrap();
        write_file(
            dir.path(),
            "ARG_RES-HYBR_aggregated.csv",
            "period,weight,PV-FIX,WIND-ON\n0,4380,0.8,0.1\n1,4380,0.0,0.6\n",
        );
        let source = CsvProfileSource::new(dir.path());

        let periods = source
            .get_periods(&"ARG".into(), &["WIND-ON".into(), "PV-FIX".into()])
            .unwrap();
        assert_eq!(periods.weights(), [4380.0, 4380.0]);
        assert_eq!(
            periods.availability(&"PV-FIX".into()),
            Some([0.8, 0.0].as_slice())
        );
        assert_eq!(
            periods.availability(&"WIND-ON".into()),
            Some([0.1, 0.6].as_slice())
        );
    }

    #[test]
    fn read_missing_column() {
        let dir = tempdir().unwrap();
        write_file(
            dir.path(),
            "ARG_PV-FIX_aggregated.csv",
            "period,weight,WIND-ON\n0,8760,0.5\n",
        );
        let source = CsvProfileSource::new(dir.path());

        let result = read_profiles_file(
            &dir.path().join("ARG_PV-FIX_aggregated.csv"),
            &["PV-FIX".into()],
        );
        assert_error!(result, "No availability column for PV-FIX");
        assert!(
            source
                .get_periods(&"ARG".into(), &["PV-FIX".into()])
                .is_err()
        );
    }

    #[test]
    fn read_invalid_availability() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("ARG_PV-FIX_aggregated.csv");
        write_file(
            dir.path(),
            "ARG_PV-FIX_aggregated.csv",
            "period,weight,PV-FIX\n0,8760,1.5\n",
        );
        assert_error!(
            read_profiles_file(&file_path, &["PV-FIX".into()]),
            "Availability of PV-FIX in period 0 must be between 0 and 1 inclusive (got 1.5)"
        );
    }

    #[test]
    fn read_padded_values() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("ARG_PV-FIX_aggregated.csv");
        write_file(
            dir.path(),
            "ARG_PV-FIX_aggregated.csv",
            "period, weight, PV-FIX\n0, 8760, 0.25\n",
        );
        let periods = read_profiles_file(&file_path, &["PV-FIX".into()]).unwrap();
        assert_eq!(periods.weights(), [8760.0]);
        assert_eq!(
            periods.availability(&"PV-FIX".into()),
            Some([0.25].as_slice())
        );
    }

    #[test]
    fn read_non_numeric_value() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("ARG_PV-FIX_aggregated.csv");
        write_file(
            dir.path(),
            "ARG_PV-FIX_aggregated.csv",
            "period,weight,PV-FIX\n0,8760,high\n",
        );
        assert!(read_profiles_file(&file_path, &["PV-FIX".into()]).is_err());
    }

    #[test]
    fn read_missing_value() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("ARG_PV-FIX_aggregated.csv");
        write_file(
            dir.path(),
            "ARG_PV-FIX_aggregated.csv",
            "period,weight,PV-FIX\n0,8760\n",
        );
        assert!(read_profiles_file(&file_path, &["PV-FIX".into()]).is_err());
    }

    #[test]
    fn read_weights_not_covering_a_year() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("ARG_PV-FIX_aggregated.csv");
        write_file(
            dir.path(),
            "ARG_PV-FIX_aggregated.csv",
            "period,weight,PV-FIX\n0,84,1.0\n1,84,0.5\n",
        );
        assert_error!(
            read_profiles_file(&file_path, &["PV-FIX".into()]),
            "Period weights add up to 168 hours, but must cover a full year (8760 hours)"
        );
    }

    #[test]
    fn read_missing_file() {
        let dir = tempdir().unwrap();
        let source = CsvProfileSource::new(dir.path());
        assert!(
            source
                .get_periods(&"CHL".into(), &["PV-FIX".into()])
                .is_err()
        );
    }
}
