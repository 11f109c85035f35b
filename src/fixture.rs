//! Fixtures for tests

use crate::commodity::SpecificCostMap;
use crate::problem::OptimisationProblem;
use crate::process::{ProcessCosts, ProcessUnit, StorageKind, UnitRole};
use crate::profile::RepresentativePeriods;
use crate::units::{Dimensionless, MoneyPerCapacity, MoneyPerFlow};
use rstest::fixture;

/// Assert that an error with the given message occurs
macro_rules! assert_error {
    ($result:expr, $msg:expr) => {
        assert_eq!(
            $result.unwrap_err().chain().next().unwrap().to_string(),
            $msg
        );
    };
}
pub(crate) use assert_error;

/// Costs with only a capital component
pub fn capex_only(capex: f64) -> ProcessCosts {
    ProcessCosts {
        capex_annualised: MoneyPerCapacity(capex),
        opex_fixed: MoneyPerCapacity(0.0),
        opex_variable: MoneyPerFlow(0.0),
    }
}

/// A renewable source with the given code and annualised capex
pub fn renewable(code: &str, capex: f64) -> ProcessUnit {
    ProcessUnit::new(UnitRole::Renewable(code.into()), capex_only(capex))
}

/// A storage unit with the given round-trip efficiency and capex
pub fn storage(kind: StorageKind, efficiency: f64, capex: f64) -> ProcessUnit {
    ProcessUnit::new(UnitRole::Storage(kind), capex_only(capex))
        .with_efficiency(Dimensionless(efficiency))
}

/// A set of periods with the given weights and availability profiles
pub fn periods(weights: &[f64], profiles: &[(&str, &[f64])]) -> RepresentativePeriods {
    let availability = profiles
        .iter()
        .map(|(code, values)| ((*code).into(), values.to_vec()))
        .collect();
    RepresentativePeriods::new(weights.to_vec(), availability).unwrap()
}

#[fixture]
pub fn costs() -> ProcessCosts {
    capex_only(10.0)
}

#[fixture]
pub fn electrolyser() -> ProcessUnit {
    ProcessUnit::new(
        UnitRole::Electrolyser,
        ProcessCosts {
            capex_annualised: MoneyPerCapacity(5.0),
            opex_fixed: MoneyPerCapacity(1.0),
            opex_variable: MoneyPerFlow(0.0),
        },
    )
    .with_efficiency(Dimensionless(0.5))
}

#[fixture]
pub fn h2_problem(electrolyser: ProcessUnit) -> OptimisationProblem {
    OptimisationProblem {
        source_region: "ARG".into(),
        renewables: vec![renewable("PV-FIX", 10.0)],
        electrolyser,
        derivative: None,
        water: None,
        carbon_dioxide: None,
        electricity_storage: None,
        hydrogen_storage: None,
        specific_costs: SpecificCostMap::new(),
    }
}

/// Four periods of equal weight in which PV is always fully available
#[fixture]
pub fn flat_periods() -> RepresentativePeriods {
    periods(&[2190.0; 4], &[("PV-FIX", &[1.0; 4])])
}
