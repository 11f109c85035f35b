//! Code for performing the process-chain cost optimisation.
//!
//! The chain is sized by solving a linear program which minimises the total annualised cost of
//! delivering one unit of final product in every hour of the year. Each representative period is
//! weighted by the number of hours it represents.
use crate::commodity::{CARBON_DIOXIDE, CommodityID, WATER};
use crate::output::{ConversionResult, OptimisationResult, RenewableResult, StorageResult};
use crate::problem::OptimisationProblem;
use crate::process::{ProcessCode, ProcessUnit, UnitRole};
use crate::profile::RepresentativePeriods;
use crate::units::{Capacity, Dimensionless, Flow, Hours, Money};
use anyhow::{Result, ensure};
use highs::{HighsModelStatus, HighsStatus, RowProblem as Problem, Sense};
use indexmap::IndexMap;
use log::{debug, warn};
use std::error::Error;
use std::fmt;

mod constraints;
use constraints::add_chain_constraints;

/// Capacities smaller than this are treated as zero when calculating results
pub const CAPACITY_THRESHOLD: f64 = 1e-8;

/// A decision variable in the optimisation.
///
/// Note that this type does **not** include the value of the variable; it refers to a particular
/// column of the problem, along with the column's position for reading back the solution.
#[derive(Clone, Copy)]
struct Variable {
    col: highs::Col,
    index: usize,
}

/// Add a non-negative variable with the given objective coefficient
fn add_variable(problem: &mut Problem, cost: f64) -> Variable {
    // This line **must** come before we add the column
    let index = problem.num_cols();
    let col = problem.add_column(cost, 0.0..);
    Variable { col, index }
}

/// Variables for a unit with a capacity and a level of activity in each period.
///
/// For renewable sources, activity is generation. For other units it is the flow of the unit's
/// primary input, which is converted to output according to the unit's efficiency.
struct UnitVariables {
    capacity: Variable,
    activity: Vec<Variable>,
}

impl UnitVariables {
    fn add(problem: &mut Problem, unit: &ProcessUnit, weights: &[f64]) -> Self {
        let capacity = add_variable(problem, unit.costs.annual_capacity_cost().value());

        // Variable costs are given per unit of output
        let cost_per_input = unit.costs.opex_variable.value() * unit.efficiency.value();
        let activity = weights
            .iter()
            .map(|weight| add_variable(problem, weight * cost_per_input))
            .collect();

        Self { capacity, activity }
    }
}

/// Variables for a storage unit
struct StorageVariables {
    /// Round-trip efficiency, applied on discharge
    efficiency: f64,
    /// Energy capacity
    capacity: Variable,
    charge: Vec<Variable>,
    /// Rate of delivery out of the store (after losses)
    discharge: Vec<Variable>,
    /// State of charge at the end of each period
    level: Vec<Variable>,
}

impl StorageVariables {
    fn add(problem: &mut Problem, unit: &ProcessUnit, weights: &[f64]) -> Self {
        let capacity = add_variable(problem, unit.costs.annual_capacity_cost().value());
        let charge = weights.iter().map(|_| add_variable(problem, 0.0)).collect();
        let discharge = weights
            .iter()
            .map(|weight| add_variable(problem, weight * unit.costs.opex_variable.value()))
            .collect();
        let level = weights.iter().map(|_| add_variable(problem, 0.0)).collect();

        Self {
            efficiency: unit.efficiency.value(),
            capacity,
            charge,
            discharge,
            level,
        }
    }
}

/// A map for easy lookup of variables in the problem.
///
/// We use this data structure for two things:
///
/// 1. In order to define constraints for the optimisation
/// 2. To know which column corresponds to which unit when reading the results of the optimisation
struct VariableMap {
    renewables: IndexMap<ProcessCode, UnitVariables>,
    electrolyser: UnitVariables,
    derivative: Option<UnitVariables>,
    auxiliaries: IndexMap<CommodityID, UnitVariables>,
    electricity_storage: Option<StorageVariables>,
    hydrogen_storage: Option<StorageVariables>,
    /// External purchases of auxiliary commodities which have a specific cost
    purchases: IndexMap<CommodityID, Vec<Variable>>,
}

impl VariableMap {
    /// Create a new [`VariableMap`], adding the variables to the problem
    fn new(
        problem: &mut Problem,
        chain: &OptimisationProblem,
        periods: &RepresentativePeriods,
    ) -> Self {
        let weights = periods.weights();
        let renewables = chain
            .renewables
            .iter()
            .map(|unit| {
                let UnitRole::Renewable(code) = &unit.role else {
                    panic!("Unit in RES has wrong role: {}", unit.role);
                };
                (code.clone(), UnitVariables::add(problem, unit, weights))
            })
            .collect();
        let electrolyser = UnitVariables::add(problem, &chain.electrolyser, weights);
        let derivative = chain
            .derivative
            .as_ref()
            .map(|unit| UnitVariables::add(problem, unit, weights));
        let auxiliaries = chain
            .iter_auxiliaries()
            .map(|unit| {
                let UnitRole::Auxiliary(output) = &unit.role else {
                    panic!("Unexpected role for auxiliary unit: {}", unit.role);
                };
                (output.clone(), UnitVariables::add(problem, unit, weights))
            })
            .collect();
        let electricity_storage = chain
            .electricity_storage
            .as_ref()
            .map(|unit| StorageVariables::add(problem, unit, weights));
        let hydrogen_storage = chain
            .hydrogen_storage
            .as_ref()
            .map(|unit| StorageVariables::add(problem, unit, weights));

        // Only commodities which are balanced can be purchased
        let purchases = chain
            .auxiliary_commodities()
            .into_iter()
            .filter_map(|commodity| {
                let cost = chain.specific_costs.get(&commodity)?.value();
                let vars = weights
                    .iter()
                    .map(|weight| add_variable(problem, weight * cost))
                    .collect();
                Some((commodity, vars))
            })
            .collect();

        Self {
            renewables,
            electrolyser,
            derivative,
            auxiliaries,
            electricity_storage,
            hydrogen_storage,
            purchases,
        }
    }
}

/// The solution to the chain optimisation problem
struct Solution<'a> {
    columns: Vec<f64>,
    variables: VariableMap,
    periods: &'a RepresentativePeriods,
    objective_value: Money,
}

impl Solution<'_> {
    fn value(&self, var: Variable) -> f64 {
        self.columns[var.index]
    }

    fn capacity(&self, vars: &UnitVariables) -> Capacity {
        Capacity(self.value(vars.capacity))
    }

    /// Average activity over the year, weighting each period by the hours it represents
    fn mean_activity(&self, vars: &UnitVariables) -> Flow {
        let total: f64 = vars
            .activity
            .iter()
            .zip(self.periods.weights())
            .map(|(var, weight)| weight * self.value(*var))
            .sum();
        Flow(total / self.periods.total_weight())
    }

    /// The fraction of the year a unit runs at full capacity
    fn full_load_hours(&self, vars: &UnitVariables) -> Dimensionless {
        let capacity = self.capacity(vars);
        if capacity.value() < CAPACITY_THRESHOLD {
            return Dimensionless(0.0);
        }

        normalise_fraction(self.mean_activity(vars) / capacity)
    }

    fn conversion_result(&self, vars: &UnitVariables) -> ConversionResult {
        ConversionResult {
            full_load_hours: self.full_load_hours(vars),
        }
    }

    fn storage_result(&self, vars: &StorageVariables) -> StorageResult {
        // Throughput of final product is one unit per hour, so the energy capacity is already
        // relative to it
        StorageResult {
            capacity_factor: Hours(normalise_non_negative(self.value(vars.capacity))),
        }
    }

    fn renewable_results(&self) -> Vec<RenewableResult> {
        let capacities: Vec<_> = self
            .variables
            .renewables
            .values()
            .map(|vars| self.capacity(vars).value())
            .map(|capacity| {
                if capacity < CAPACITY_THRESHOLD {
                    0.0
                } else {
                    capacity
                }
            })
            .collect();
        let total: f64 = capacities.iter().sum();

        self.variables
            .renewables
            .iter()
            .zip(capacities)
            .map(|((code, vars), capacity)| {
                let share = if total > 0.0 { capacity / total } else { 0.0 };
                RenewableResult {
                    process_code: code.clone(),
                    full_load_hours: self.full_load_hours(vars),
                    share_factor: normalise_fraction(Dimensionless(share)),
                }
            })
            .collect()
    }

    fn into_result(self) -> OptimisationResult {
        let variables = &self.variables;
        let auxiliary = |commodity: &str| {
            variables
                .auxiliaries
                .get(commodity)
                .map(|vars| self.conversion_result(vars))
        };

        OptimisationResult {
            renewables: self.renewable_results(),
            electrolyser: self.conversion_result(&variables.electrolyser),
            derivative: variables
                .derivative
                .as_ref()
                .map(|vars| self.conversion_result(vars)),
            water: auxiliary(WATER),
            carbon_dioxide: auxiliary(CARBON_DIOXIDE),
            electricity_storage: variables
                .electricity_storage
                .as_ref()
                .map(|vars| self.storage_result(vars)),
            hydrogen_storage: variables
                .hydrogen_storage
                .as_ref()
                .map(|vars| self.storage_result(vars)),
            objective_value: self.objective_value,
        }
    }
}

/// Clamp a fraction into the range [0, 1], removing solver noise and negative zero
fn normalise_fraction(value: Dimensionless) -> Dimensionless {
    Dimensionless(value.value().clamp(0.0, 1.0) + 0.0)
}

fn normalise_non_negative(value: f64) -> f64 {
    value.max(0.0) + 0.0
}

/// Reasons why the solver could fail to return a usable optimum
#[derive(Debug, Clone)]
pub enum NumericalFailure {
    /// The model definition is incoherent.
    ///
    /// Users should not be able to trigger this error.
    Incoherent(HighsStatus),
    /// An optimal solution could not be found (e.g. because the time limit was reached)
    NonOptimal(HighsModelStatus),
    /// The solver reported an optimum with a non-finite objective value
    NonFiniteObjective(f64),
}

impl fmt::Display for NumericalFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NumericalFailure::Incoherent(status) => write!(f, "Incoherent model: {status:?}"),
            NumericalFailure::NonOptimal(status) => {
                write!(f, "Could not find optimal result: {status:?}")
            }
            NumericalFailure::NonFiniteObjective(value) => {
                write!(f, "Objective value is not finite ({value})")
            }
        }
    }
}

/// Defines the possible errors that can occur when solving a problem
#[derive(Debug)]
pub enum SolveError {
    /// The problem or profile data is malformed. The solver was not run.
    Validation(anyhow::Error),
    /// The solver has proven that no feasible solution exists
    Infeasible(HighsModelStatus),
    /// The solver failed to converge
    Numerical(NumericalFailure),
}

impl SolveError {
    /// Whether the same problem might be solved with different solver settings
    pub fn is_numerical(&self) -> bool {
        matches!(self, SolveError::Numerical(_))
    }
}

impl fmt::Display for SolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolveError::Validation(_) => write!(f, "Invalid optimisation problem"),
            SolveError::Infeasible(status) => {
                write!(f, "The optimisation problem is infeasible ({status:?})")
            }
            SolveError::Numerical(failure) => write!(f, "Solver error: {failure}"),
        }
    }
}

impl Error for SolveError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            SolveError::Validation(err) => Some(&**err),
            _ => None,
        }
    }
}

/// Settings passed to the solver
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverOptions {
    /// Maximum time the solver may run for, in seconds
    pub time_limit: f64,
    /// Primal and dual feasibility tolerance
    pub feasibility_tolerance: f64,
    /// Whether to print the solver's own log output
    pub log_to_console: bool,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            time_limit: 300.0,
            feasibility_tolerance: 1e-7,
            log_to_console: false,
        }
    }
}

impl SolverOptions {
    /// Options for a second attempt after a numerical failure
    pub fn relaxed(&self) -> Self {
        Self {
            time_limit: self.time_limit * 2.0,
            feasibility_tolerance: self.feasibility_tolerance * 10.0,
            ..*self
        }
    }

    fn apply(&self, model: &mut highs::Model) {
        model.set_option("output_flag", self.log_to_console);
        model.set_option("time_limit", self.time_limit);
        model.set_option("primal_feasibility_tolerance", self.feasibility_tolerance);
        model.set_option("dual_feasibility_tolerance", self.feasibility_tolerance);
    }
}

/// Try to solve the model, returning an error if the model is infeasible or the result is
/// non-optimal
fn solve_optimal(model: highs::Model) -> Result<highs::SolvedModel, SolveError> {
    let solved = model
        .try_solve()
        .map_err(|status| SolveError::Numerical(NumericalFailure::Incoherent(status)))?;

    match solved.status() {
        HighsModelStatus::Optimal => Ok(solved),
        status @ (HighsModelStatus::Infeasible | HighsModelStatus::UnboundedOrInfeasible) => {
            Err(SolveError::Infeasible(status))
        }
        status => Err(SolveError::Numerical(NumericalFailure::NonOptimal(status))),
    }
}

/// Check that there is an availability profile for every renewable source
fn check_periods(problem: &OptimisationProblem, periods: &RepresentativePeriods) -> Result<()> {
    for code in problem.renewable_codes() {
        ensure!(
            periods.availability(&code).is_some(),
            "No availability profile for {code}"
        );
    }

    Ok(())
}

/// How the solution of a successful optimisation was obtained
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum SolutionQuality {
    /// Solved to optimality with the requested solver options
    Optimal,
    /// Solved to optimality only after retrying with relaxed solver options
    OptimalRelaxed,
}

impl fmt::Display for SolutionQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Optimal => write!(f, "Optimal"),
            Self::OptimalRelaxed => write!(f, "OptimalRelaxed"),
        }
    }
}

/// Provides the interface for running the chain optimisation.
///
/// By default, a numerical failure is returned to the caller. If retries are enabled with
/// [`ChainOptimisation::with_retry`], the problem is solved a second time with relaxed solver
/// options (see [`SolverOptions::relaxed`]).
pub struct ChainOptimisation<'a> {
    problem: &'a OptimisationProblem,
    periods: &'a RepresentativePeriods,
    options: SolverOptions,
    retry: bool,
}

impl<'a> ChainOptimisation<'a> {
    /// Create a new [`ChainOptimisation`] for the given problem and representative periods
    pub fn new(problem: &'a OptimisationProblem, periods: &'a RepresentativePeriods) -> Self {
        Self {
            problem,
            periods,
            options: SolverOptions::default(),
            retry: false,
        }
    }

    /// Use the given solver options
    pub fn with_options(self, options: SolverOptions) -> Self {
        Self { options, ..self }
    }

    /// Whether to retry once with relaxed options after a numerical failure
    pub fn with_retry(self, retry: bool) -> Self {
        Self { retry, ..self }
    }

    /// Perform the optimisation.
    ///
    /// The problem is validated before the solver is invoked.
    pub fn run(&self) -> Result<OptimisationResult, SolveError> {
        self.run_with_quality().map(|(result, _)| result)
    }

    /// Perform the optimisation, also reporting whether relaxed solver options were needed
    pub fn run_with_quality(&self) -> Result<(OptimisationResult, SolutionQuality), SolveError> {
        self.problem.validate().map_err(SolveError::Validation)?;
        check_periods(self.problem, self.periods).map_err(SolveError::Validation)?;

        match self.run_internal(&self.options) {
            Ok(result) => Ok((result, SolutionQuality::Optimal)),
            Err(err) if self.retry && err.is_numerical() => {
                warn!(
                    "Optimisation for {} failed ({err}). Retrying with relaxed solver options.",
                    self.problem.source_region
                );
                let result = self.run_internal(&self.options.relaxed())?;
                Ok((result, SolutionQuality::OptimalRelaxed))
            }
            Err(err) => Err(err),
        }
    }

    fn run_internal(&self, options: &SolverOptions) -> Result<OptimisationResult, SolveError> {
        debug!(
            "Optimising chain for {} with {} periods",
            self.problem.source_region,
            self.periods.len()
        );

        // Set up problem
        let mut problem = Problem::default();
        let variables = VariableMap::new(&mut problem, self.problem, self.periods);
        add_chain_constraints(&mut problem, &variables, self.problem, self.periods);

        // Solve model
        let mut model = problem.optimise(Sense::Minimise);
        options.apply(&mut model);
        let solved = solve_optimal(model)?;

        let objective_value = solved.objective_value();
        if !objective_value.is_finite() {
            return Err(SolveError::Numerical(
                NumericalFailure::NonFiniteObjective(objective_value),
            ));
        }

        let solution = Solution {
            columns: solved.get_solution().columns().to_vec(),
            variables,
            periods: self.periods,
            objective_value: Money(objective_value),
        };

        Ok(solution.into_result())
    }
}

/// Solve the chain optimisation problem for the given representative periods.
///
/// This does not retry on numerical failures. Use [`ChainOptimisation`] for more control.
pub fn solve(
    problem: &OptimisationProblem,
    periods: &RepresentativePeriods,
    options: &SolverOptions,
) -> Result<OptimisationResult, SolveError> {
    ChainOptimisation::new(problem, periods)
        .with_options(*options)
        .run()
}
