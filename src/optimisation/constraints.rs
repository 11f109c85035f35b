//! Code for adding constraints to the chain optimisation problem.
use super::{StorageVariables, UnitVariables, Variable, VariableMap};
use crate::commodity::{CommodityID, ELECTRICITY};
use crate::problem::OptimisationProblem;
use crate::process::ProcessUnit;
use crate::profile::RepresentativePeriods;
use highs::RowProblem as Problem;
use indexmap::IndexMap;
use itertools::izip;
use std::ops::RangeBounds;

/// The terms of a single constraint.
///
/// Coefficients for the same variable are summed, so that each column appears at most once in a
/// row.
#[derive(Default)]
struct Row {
    terms: IndexMap<usize, (highs::Col, f64)>,
}

impl Row {
    fn add(&mut self, var: Variable, coeff: f64) -> &mut Self {
        self.terms.entry(var.index).or_insert((var.col, 0.0)).1 += coeff;
        self
    }

    fn add_to<B>(self, problem: &mut Problem, bounds: B)
    where
        B: RangeBounds<f64>,
    {
        let terms = self.terms.into_values().filter(|(_, coeff)| *coeff != 0.0);
        problem.add_row(bounds, terms);
    }
}

/// A unit which converts its primary input along with its variables
type Converter<'a> = (&'a ProcessUnit, &'a UnitVariables);

/// Add all constraints for the chain.
///
/// # Arguments
///
/// * `problem` - The optimisation problem
/// * `variables` - The variables in the problem
/// * `chain` - The process chain being optimised
/// * `periods` - Representative periods with renewable availabilities
pub fn add_chain_constraints(
    problem: &mut Problem,
    variables: &VariableMap,
    chain: &OptimisationProblem,
    periods: &RepresentativePeriods,
) {
    add_availability_constraints(problem, variables, periods);

    let converters = iter_converters(variables, chain);
    for (_, vars) in &converters {
        add_capacity_constraints(problem, vars);
    }

    for storage in chain_storage(variables) {
        add_storage_constraints(problem, storage, periods.weights());
    }

    add_electricity_balance(problem, variables, &converters, periods.len());
    add_hydrogen_balance(problem, variables, chain, periods.len());
    add_auxiliary_balances(problem, variables, chain, &converters, periods.len());
}

/// Pair up units which convert commodities with their variables.
///
/// This includes the electrolyser, the derivative unit and auxiliary units.
fn iter_converters<'a>(
    variables: &'a VariableMap,
    chain: &'a OptimisationProblem,
) -> Vec<Converter<'a>> {
    let mut converters = vec![(&chain.electrolyser, &variables.electrolyser)];
    if let (Some(unit), Some(vars)) = (&chain.derivative, &variables.derivative) {
        converters.push((unit, vars));
    }
    converters.extend(chain.iter_auxiliaries().zip(variables.auxiliaries.values()));

    converters
}

fn chain_storage(variables: &VariableMap) -> impl Iterator<Item = &StorageVariables> {
    variables
        .electricity_storage
        .iter()
        .chain(variables.hydrogen_storage.iter())
}

/// Generation of each renewable source is limited by its availability in each period.
///
/// Generation below the available amount means that output is curtailed.
fn add_availability_constraints(
    problem: &mut Problem,
    variables: &VariableMap,
    periods: &RepresentativePeriods,
) {
    for (code, vars) in &variables.renewables {
        let availability = periods
            .availability(code)
            .expect("Periods should have been checked for missing profiles");
        assert_eq!(availability.len(), vars.activity.len());

        for (generation, available) in vars.activity.iter().zip(availability) {
            let mut row = Row::default();
            row.add(*generation, 1.0).add(vars.capacity, -available);
            row.add_to(problem, ..=0.0);
        }
    }
}

/// The input flow of a converting unit cannot exceed its capacity
fn add_capacity_constraints(problem: &mut Problem, vars: &UnitVariables) {
    for input in &vars.activity {
        let mut row = Row::default();
        row.add(*input, 1.0).add(vars.capacity, -1.0);
        row.add_to(problem, ..=0.0);
    }
}

/// Add state-of-charge continuity and the limit on the state of charge.
///
/// The storage level at the end of the final period wraps around to the start of the first period.
fn add_storage_constraints(problem: &mut Problem, vars: &StorageVariables, weights: &[f64]) {
    for level in &vars.level {
        let mut row = Row::default();
        row.add(*level, 1.0).add(vars.capacity, -1.0);
        row.add_to(problem, ..=0.0);
    }

    let num_periods = weights.len();
    for (t, (weight, charge, discharge)) in
        izip!(weights, &vars.charge, &vars.discharge).enumerate()
    {
        let previous = (t + num_periods - 1) % num_periods;

        // level[t] - level[t-1] - w * charge + (w / eff) * discharge = 0
        let mut row = Row::default();
        row.add(vars.level[t], 1.0)
            .add(vars.level[previous], -1.0)
            .add(*charge, -weight)
            .add(*discharge, weight / vars.efficiency);
        row.add_to(problem, 0.0..=0.0);
    }
}

/// Electricity generation must match consumption in every period
fn add_electricity_balance(
    problem: &mut Problem,
    variables: &VariableMap,
    converters: &[Converter],
    num_periods: usize,
) {
    let electricity = CommodityID::from(ELECTRICITY);
    for t in 0..num_periods {
        let mut row = Row::default();
        for vars in variables.renewables.values() {
            row.add(vars.activity[t], 1.0);
        }
        row.add(variables.electrolyser.activity[t], -1.0);
        if let Some(storage) = &variables.electricity_storage {
            row.add(storage.charge[t], -1.0).add(storage.discharge[t], 1.0);
        }

        // Other units may consume electricity as an auxiliary input
        for (unit, vars) in converters {
            let factor = unit.conversion_factor(&electricity);
            row.add(vars.activity[t], -factor * unit.efficiency.value());
        }

        row.add_to(problem, 0.0..=0.0);
    }
}

/// Hydrogen production must match consumption in every period.
///
/// If there is no derivative unit, hydrogen is the final product, of which one unit is delivered
/// every hour. Otherwise the derivative unit must deliver one unit of its product every hour.
fn add_hydrogen_balance(
    problem: &mut Problem,
    variables: &VariableMap,
    chain: &OptimisationProblem,
    num_periods: usize,
) {
    let electrolyser_efficiency = chain.electrolyser.efficiency.value();
    for t in 0..num_periods {
        let mut row = Row::default();
        row.add(variables.electrolyser.activity[t], electrolyser_efficiency);
        if let Some(storage) = &variables.hydrogen_storage {
            row.add(storage.charge[t], -1.0).add(storage.discharge[t], 1.0);
        }

        match (&chain.derivative, &variables.derivative) {
            (Some(unit), Some(vars)) => {
                row.add(vars.activity[t], -1.0);
                row.add_to(problem, 0.0..=0.0);

                let mut demand = Row::default();
                demand.add(vars.activity[t], unit.efficiency.value());
                demand.add_to(problem, 1.0..=1.0);
            }
            _ => row.add_to(problem, 1.0..=1.0),
        }
    }
}

/// Each auxiliary commodity consumed must be supplied by purchases, an auxiliary unit or as a
/// byproduct of another unit.
///
/// Any surplus is disposed of at no cost. If a commodity is consumed but there is no way of
/// supplying it, the problem is infeasible.
fn add_auxiliary_balances(
    problem: &mut Problem,
    variables: &VariableMap,
    chain: &OptimisationProblem,
    converters: &[Converter],
    num_periods: usize,
) {
    for commodity in chain.auxiliary_commodities() {
        for t in 0..num_periods {
            let mut row = Row::default();
            if let Some(purchases) = variables.purchases.get(&commodity) {
                row.add(purchases[t], 1.0);
            }
            if let Some(vars) = variables.auxiliaries.get(&commodity) {
                row.add(vars.activity[t], 1.0);
            }
            for (unit, vars) in converters {
                let factor = unit.conversion_factor(&commodity);
                row.add(vars.activity[t], -factor * unit.efficiency.value());
            }

            row.add_to(problem, 0.0..);
        }
    }
}
