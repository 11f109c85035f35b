//! Representative periods and renewable availability profiles.
//!
//! Generating profiles from weather data and aggregating them into representative periods happens
//! upstream. The optimiser only queries a [`ProfileSource`] for the already-aggregated data.
use crate::problem::RegionCode;
use crate::process::ProcessCode;
use crate::units::HOURS_PER_YEAR;
use anyhow::{Context, Result, ensure};
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::HashMap;

/// Relative tolerance when checking that the period weights cover a full year
const WEIGHT_SUM_TOLERANCE: f64 = 1e-4;

/// Availability values for each period, keyed by renewable process code
pub type AvailabilityMap = IndexMap<ProcessCode, Vec<f64>>;

/// A set of representative time periods with their weights and renewable availabilities
#[derive(PartialEq, Debug, Clone, Serialize)]
pub struct RepresentativePeriods {
    /// The number of hours each period represents
    weights: Vec<f64>,
    /// Normalised availability (between zero and one) of each renewable source in each period
    availability: AvailabilityMap,
}

impl RepresentativePeriods {
    /// Create a new set of representative periods, checking that the data is valid.
    ///
    /// The weights must add up to one year ([`HOURS_PER_YEAR`]), as variable costs are scaled by
    /// the weights while capital costs are annual.
    pub fn new(weights: Vec<f64>, availability: AvailabilityMap) -> Result<Self> {
        ensure!(!weights.is_empty(), "No representative periods given");
        for (period, weight) in weights.iter().enumerate() {
            ensure!(
                weight.is_finite() && *weight > 0.0,
                "Invalid weight for period {period} ({weight}). Must be a finite number >0."
            );
        }

        for (code, values) in &availability {
            ensure!(
                values.len() == weights.len(),
                "Availability profile for {code} has {} values, but there are {} periods",
                values.len(),
                weights.len()
            );
            for (period, value) in values.iter().enumerate() {
                ensure!(
                    (0.0..=1.0).contains(value),
                    "Availability of {code} in period {period} must be between 0 and 1 \
                    inclusive (got {value})"
                );
            }
        }

        let total: f64 = weights.iter().sum();
        ensure!(
            (total - HOURS_PER_YEAR).abs() <= WEIGHT_SUM_TOLERANCE * HOURS_PER_YEAR,
            "Period weights add up to {total} hours, but must cover a full year \
            ({HOURS_PER_YEAR} hours)"
        );

        Ok(Self {
            weights,
            availability,
        })
    }

    /// The number of periods
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    /// Whether there are no periods. Always false for a validated set of periods.
    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// The number of hours each period represents
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// The total number of hours represented by all periods
    pub fn total_weight(&self) -> f64 {
        self.weights.iter().sum()
    }

    /// The availability profile for the given renewable source, if present
    pub fn availability(&self, code: &ProcessCode) -> Option<&[f64]> {
        self.availability.get(code).map(Vec::as_slice)
    }

    /// Restrict the periods to the profiles of the given renewable sources.
    ///
    /// Returns an error if a profile is missing.
    pub fn select(&self, codes: &[ProcessCode]) -> Result<Self> {
        let availability = codes
            .iter()
            .map(|code| {
                let values = self
                    .availability
                    .get(code)
                    .with_context(|| format!("No availability profile for {code}"))?;
                Ok((code.clone(), values.clone()))
            })
            .collect::<Result<_>>()?;

        Ok(Self {
            weights: self.weights.clone(),
            availability,
        })
    }
}

/// A provider of representative periods for a region and a set of renewable sources
pub trait ProfileSource: Send + Sync {
    /// Get representative periods with availability profiles for each of `codes`
    fn get_periods(
        &self,
        region: &RegionCode,
        codes: &[ProcessCode],
    ) -> Result<RepresentativePeriods>;
}

/// Profiles held in memory, keyed by region
#[derive(Default)]
pub struct InMemoryProfiles {
    regions: HashMap<RegionCode, RepresentativePeriods>,
}

impl InMemoryProfiles {
    /// Create an empty set of profiles
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the periods for a region, replacing any existing entry
    pub fn with_region(mut self, region: RegionCode, periods: RepresentativePeriods) -> Self {
        self.regions.insert(region, periods);
        self
    }
}

impl ProfileSource for InMemoryProfiles {
    fn get_periods(
        &self,
        region: &RegionCode,
        codes: &[ProcessCode],
    ) -> Result<RepresentativePeriods> {
        let periods = self
            .regions
            .get(region)
            .with_context(|| format!("No profiles available for region {region}"))?;
        periods.select(codes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::assert_error;
    use indexmap::indexmap;
    use rstest::rstest;

    #[test]
    fn new_ok() {
        let periods = RepresentativePeriods::new(
            vec![4380.0, 4380.0],
            indexmap! {"PV-FIX".into() => vec![1.0, 0.0]},
        )
        .unwrap();
        assert_eq!(periods.len(), 2);
        assert_eq!(periods.total_weight(), 8760.0);
        assert_eq!(periods.availability(&"PV-FIX".into()), Some([1.0, 0.0].as_slice()));
        assert_eq!(periods.availability(&"WIND-ON".into()), None);
    }

    #[rstest]
    #[case(vec![], vec![], "No representative periods given")]
    #[case(vec![8760.0, 0.0], vec![0.5, 0.5], "Invalid weight for period 1 (0). Must be a finite number >0.")]
    #[case(vec![8760.0], vec![0.5, 0.5], "Availability profile for PV-FIX has 2 values, but there are 1 periods")]
    #[case(vec![4380.0, 4380.0], vec![0.5, 1.5], "Availability of PV-FIX in period 1 must be between 0 and 1 inclusive (got 1.5)")]
    #[case(vec![168.0], vec![0.5], "Period weights add up to 168 hours, but must cover a full year (8760 hours)")]
    #[case(vec![4368.0, 4368.0], vec![0.5, 0.5], "Period weights add up to 8736 hours, but must cover a full year (8760 hours)")]
    fn new_invalid(#[case] weights: Vec<f64>, #[case] values: Vec<f64>, #[case] msg: &str) {
        assert_error!(
            RepresentativePeriods::new(weights, indexmap! {"PV-FIX".into() => values}),
            msg
        );
    }

    #[test]
    fn weights_close_to_a_year_are_accepted() {
        let periods =
            RepresentativePeriods::new(vec![4379.9, 4380.0], indexmap! {"PV-FIX".into() => vec![0.5, 0.5]})
                .unwrap();
        assert_eq!(periods.len(), 2);
    }

    #[test]
    fn in_memory_select() {
        let periods = RepresentativePeriods::new(
            vec![8760.0],
            indexmap! {"PV-FIX".into() => vec![0.2], "WIND-ON".into() => vec![0.7]},
        )
        .unwrap();
        let profiles = InMemoryProfiles::new().with_region("ARG".into(), periods);

        let selected = profiles
            .get_periods(&"ARG".into(), &["WIND-ON".into()])
            .unwrap();
        assert_eq!(selected.availability(&"WIND-ON".into()), Some([0.7].as_slice()));
        assert_eq!(selected.availability(&"PV-FIX".into()), None);

        assert_error!(
            profiles.get_periods(&"ARG".into(), &["WIND-OFF".into()]),
            "No availability profile for WIND-OFF"
        );
        assert_error!(
            profiles.get_periods(&"CHL".into(), &["PV-FIX".into()]),
            "No profiles available for region CHL"
        );
    }
}
