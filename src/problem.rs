//! The optimisation problem describes the process chain to be sized for one source region.
use crate::commodity::{CARBON_DIOXIDE, CommodityID, SpecificCostMap, WATER};
use crate::id::define_id_type;
use crate::process::{ProcessCode, ProcessUnit, StorageKind, UnitRole};
use anyhow::{Result, bail, ensure};
use indexmap::IndexSet;
use itertools::chain;

define_id_type! {RegionCode}

/// A process chain to be optimised.
///
/// Problems are created fresh for each optimisation and are not modified while solving.
#[derive(PartialEq, Debug, Clone)]
pub struct OptimisationProblem {
    /// The region in which the chain is located (determines renewable profiles)
    pub source_region: RegionCode,
    /// Renewable electricity sources. There is more than one for hybrid configurations.
    pub renewables: Vec<ProcessUnit>,
    /// The electrolyser
    pub electrolyser: ProcessUnit,
    /// Derivative synthesis. If absent, hydrogen is the final product.
    pub derivative: Option<ProcessUnit>,
    /// Water provisioning (e.g. desalination)
    pub water: Option<ProcessUnit>,
    /// Carbon dioxide provisioning (e.g. direct air capture)
    pub carbon_dioxide: Option<ProcessUnit>,
    /// Electricity storage
    pub electricity_storage: Option<ProcessUnit>,
    /// Hydrogen storage
    pub hydrogen_storage: Option<ProcessUnit>,
    /// Prices for auxiliary commodities bought externally
    pub specific_costs: SpecificCostMap,
}

impl OptimisationProblem {
    /// Process codes of the renewable sources, in input order
    pub fn renewable_codes(&self) -> Vec<ProcessCode> {
        self.renewables
            .iter()
            .filter_map(|unit| unit.process_code().cloned())
            .collect()
    }

    /// Iterate over the auxiliary provisioning units which are present
    pub fn iter_auxiliaries(&self) -> impl Iterator<Item = &ProcessUnit> {
        chain(self.water.iter(), self.carbon_dioxide.iter())
    }

    /// Iterate over the units which convert a primary input into a primary output and may consume
    /// or produce auxiliary commodities
    pub fn iter_converters(&self) -> impl Iterator<Item = &ProcessUnit> {
        chain(
            chain(Some(&self.electrolyser), self.derivative.iter()),
            self.iter_auxiliaries(),
        )
    }

    /// Iterate over every unit in the chain
    pub fn iter_units(&self) -> impl Iterator<Item = &ProcessUnit> {
        chain(
            chain(self.renewables.iter(), self.iter_converters()),
            chain(
                self.electricity_storage.iter(),
                self.hydrogen_storage.iter(),
            ),
        )
    }

    /// All auxiliary commodities which have to be balanced.
    ///
    /// These are the commodities named in any conversion factor (other than electricity) along with
    /// the outputs of auxiliary units.
    pub fn auxiliary_commodities(&self) -> IndexSet<CommodityID> {
        let mut commodities = IndexSet::new();
        for unit in self.iter_converters() {
            if let UnitRole::Auxiliary(output) = &unit.role {
                commodities.insert(output.clone());
            }
            commodities.extend(
                unit.conversion
                    .keys()
                    .filter(|commodity| !commodity.is_electricity())
                    .cloned(),
            );
        }

        commodities
    }

    /// Check that the problem is well formed.
    ///
    /// This is performed before the problem is passed to the solver.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            !self.source_region.as_str().is_empty(),
            "SOURCE_REGION_CODE is empty"
        );
        ensure!(
            !self.renewables.is_empty(),
            "At least one renewable source (RES) must be given"
        );

        let mut codes = IndexSet::new();
        for unit in &self.renewables {
            let UnitRole::Renewable(code) = &unit.role else {
                bail!("{} cannot be given as a renewable source", unit.role);
            };
            ensure!(
                codes.insert(code),
                "Renewable source {code} is given more than once"
            );
        }

        check_role("ELY", &self.electrolyser, |role| {
            *role == UnitRole::Electrolyser
        })?;
        if let Some(unit) = &self.derivative {
            check_role("DERIV", unit, |role| matches!(role, UnitRole::Derivative(_)))?;
        }
        if let Some(unit) = &self.water {
            check_role("H2O", unit, |role| *role == UnitRole::Auxiliary(WATER.into()))?;
        }
        if let Some(unit) = &self.carbon_dioxide {
            check_role("CO2", unit, |role| {
                *role == UnitRole::Auxiliary(CARBON_DIOXIDE.into())
            })?;
        }
        if let Some(unit) = &self.electricity_storage {
            check_role("EL_STR", unit, |role| {
                *role == UnitRole::Storage(StorageKind::Electricity)
            })?;
        }
        if let Some(unit) = &self.hydrogen_storage {
            check_role("H2_STR", unit, |role| {
                *role == UnitRole::Storage(StorageKind::Hydrogen)
            })?;
        }

        for unit in self.iter_units() {
            unit.validate()?;
        }

        for (commodity, cost) in &self.specific_costs {
            ensure!(
                cost.is_finite() && cost.value() >= 0.0,
                "Invalid value for SPECCOST of {commodity} ({cost}). Must be a finite number >=0."
            );
        }

        Ok(())
    }
}

/// Check that a unit has been placed in the right slot of the problem
fn check_role<F>(slot: &str, unit: &ProcessUnit, predicate: F) -> Result<()>
where
    F: FnOnce(&UnitRole) -> bool,
{
    ensure!(
        predicate(&unit.role),
        "{} cannot be given as {slot}",
        unit.role
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{assert_error, electrolyser, h2_problem, renewable, storage};
    use crate::units::MoneyPerFlow;
    use rstest::rstest;

    #[rstest]
    fn validate_ok(h2_problem: OptimisationProblem) {
        h2_problem.validate().unwrap();
    }

    #[rstest]
    fn validate_no_renewables(mut h2_problem: OptimisationProblem) {
        h2_problem.renewables.clear();
        assert_error!(
            h2_problem.validate(),
            "At least one renewable source (RES) must be given"
        );
    }

    #[rstest]
    fn validate_duplicate_renewables(mut h2_problem: OptimisationProblem) {
        h2_problem.renewables.push(renewable("PV-FIX", 30.0));
        assert_error!(
            h2_problem.validate(),
            "Renewable source PV-FIX is given more than once"
        );
    }

    #[rstest]
    fn validate_misplaced_storage(mut h2_problem: OptimisationProblem) {
        h2_problem.electricity_storage = Some(storage(StorageKind::Hydrogen, 0.9, 1.0));
        assert_error!(h2_problem.validate(), "H2_STR cannot be given as EL_STR");
    }

    #[rstest]
    fn validate_non_renewable_in_res(
        mut h2_problem: OptimisationProblem,
        electrolyser: ProcessUnit,
    ) {
        h2_problem.renewables.push(electrolyser);
        assert_error!(
            h2_problem.validate(),
            "ELY cannot be given as a renewable source"
        );
    }

    #[rstest]
    fn validate_negative_specific_cost(mut h2_problem: OptimisationProblem) {
        h2_problem
            .specific_costs
            .insert(WATER.into(), MoneyPerFlow(-1.0));
        assert_error!(
            h2_problem.validate(),
            "Invalid value for SPECCOST of H2O-L (-1). Must be a finite number >=0."
        );
    }

    #[rstest]
    fn validate_bad_unit(mut h2_problem: OptimisationProblem) {
        h2_problem.electrolyser.costs.capex_annualised.0 = -25.0;
        assert_error!(h2_problem.validate(), "Invalid parameters for ELY");
    }

    #[rstest]
    fn auxiliary_commodities(mut h2_problem: OptimisationProblem) {
        h2_problem.electrolyser.conversion =
            [("H2O-L".into(), 1.5), ("EL".into(), 0.1)].into_iter().collect();
        let commodities = h2_problem.auxiliary_commodities();
        assert_eq!(commodities.len(), 1);
        assert!(commodities.contains("H2O-L"));
    }
}
