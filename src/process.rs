//! Process units convert between commodities. The data structures in this module represent the
//! units of a process chain along with their associated costs.
use crate::commodity::{CommodityID, ConversionMap};
use crate::id::define_id_type;
use crate::units::{Dimensionless, MoneyPerCapacity, MoneyPerFlow};
use anyhow::{Context, Result, ensure};
use std::fmt;

define_id_type! {ProcessCode}

/// Annualised costs for a process unit
#[derive(PartialEq, Debug, Clone)]
pub struct ProcessCosts {
    /// Annualised capital expenditure per unit of installed capacity
    pub capex_annualised: MoneyPerCapacity,
    /// Fixed operating cost per unit of installed capacity per year
    pub opex_fixed: MoneyPerCapacity,
    /// Variable operating cost per unit of output
    pub opex_variable: MoneyPerFlow,
}

impl ProcessCosts {
    /// The annual cost of one unit of installed capacity
    pub fn annual_capacity_cost(&self) -> MoneyPerCapacity {
        self.capex_annualised + self.opex_fixed
    }

    fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("CAPEX_A", self.capex_annualised.value()),
            ("OPEX_F", self.opex_fixed.value()),
            ("OPEX_O", self.opex_variable.value()),
        ] {
            ensure!(
                value.is_finite() && value >= 0.0,
                "Invalid value for {name} ({value}). Must be a finite number >=0."
            );
        }

        Ok(())
    }
}

/// The energy carrier held by a storage unit
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum StorageKind {
    /// Stores electricity drawn from the renewable sources
    Electricity,
    /// Stores hydrogen produced by the electrolyser
    Hydrogen,
}

/// The role a unit plays in the process chain
#[derive(PartialEq, Debug, Clone)]
pub enum UnitRole {
    /// Renewable electricity generation using the given technology (e.g. PV-FIX)
    Renewable(ProcessCode),
    /// Electrolysis of water into hydrogen
    Electrolyser,
    /// Synthesis of a hydrogen derivative (e.g. methane or ammonia)
    Derivative(ProcessCode),
    /// On-site provision of an auxiliary commodity (e.g. desalinated water)
    Auxiliary(CommodityID),
    /// Storage of an intermediate energy carrier
    Storage(StorageKind),
}

impl UnitRole {
    /// Whether units with this role convert their input with an efficiency
    pub fn has_efficiency(&self) -> bool {
        matches!(
            self,
            UnitRole::Electrolyser | UnitRole::Derivative(_) | UnitRole::Storage(_)
        )
    }

    /// Whether units with this role can consume or produce auxiliary commodities
    pub fn has_conversion_factors(&self) -> bool {
        matches!(
            self,
            UnitRole::Electrolyser | UnitRole::Derivative(_) | UnitRole::Auxiliary(_)
        )
    }
}

impl fmt::Display for UnitRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitRole::Renewable(code) => write!(f, "RES ({code})"),
            UnitRole::Electrolyser => write!(f, "ELY"),
            UnitRole::Derivative(code) => write!(f, "DERIV ({code})"),
            UnitRole::Auxiliary(commodity) => write!(f, "auxiliary unit ({commodity})"),
            UnitRole::Storage(StorageKind::Electricity) => write!(f, "EL_STR"),
            UnitRole::Storage(StorageKind::Hydrogen) => write!(f, "H2_STR"),
        }
    }
}

/// A unit in the process chain whose capacity is sized by the optimiser
#[derive(PartialEq, Debug, Clone)]
pub struct ProcessUnit {
    /// What this unit does in the chain
    pub role: UnitRole,
    /// Annualised costs
    pub costs: ProcessCosts,
    /// Ratio of output to input.
    ///
    /// For storage units, this is the round-trip efficiency. It is one for units which have no
    /// conversion efficiency (see [`UnitRole::has_efficiency`]).
    pub efficiency: Dimensionless,
    /// Auxiliary commodities consumed or produced per unit of primary output
    pub conversion: ConversionMap,
}

impl ProcessUnit {
    /// Create a new unit with unit efficiency and no conversion factors
    pub fn new(role: UnitRole, costs: ProcessCosts) -> Self {
        Self {
            role,
            costs,
            efficiency: Dimensionless(1.0),
            conversion: ConversionMap::new(),
        }
    }

    /// Set the efficiency of this unit
    pub fn with_efficiency(self, efficiency: Dimensionless) -> Self {
        Self { efficiency, ..self }
    }

    /// Set the conversion factors of this unit
    pub fn with_conversion(self, conversion: ConversionMap) -> Self {
        Self { conversion, ..self }
    }

    /// The technology code for renewable and derivative units
    pub fn process_code(&self) -> Option<&ProcessCode> {
        match &self.role {
            UnitRole::Renewable(code) | UnitRole::Derivative(code) => Some(code),
            _ => None,
        }
    }

    /// The amount of `commodity` consumed per unit of primary output (negative if produced)
    pub fn conversion_factor(&self, commodity: &CommodityID) -> f64 {
        self.conversion.get(commodity).copied().unwrap_or(0.0)
    }

    /// Check that costs, efficiency and conversion factors are in range
    pub fn validate(&self) -> Result<()> {
        self.validate_inner()
            .with_context(|| format!("Invalid parameters for {}", self.role))
    }

    fn validate_inner(&self) -> Result<()> {
        self.costs.validate()?;

        let efficiency = self.efficiency.value();
        if self.role.has_efficiency() {
            ensure!(
                efficiency.is_finite() && efficiency > 0.0 && efficiency <= 1.0,
                "Invalid value for EFF ({efficiency}). Must be in the range (0, 1]."
            );
        } else {
            ensure!(
                efficiency == 1.0,
                "{} units do not have an efficiency",
                self.role
            );
        }

        ensure!(
            self.role.has_conversion_factors() || self.conversion.is_empty(),
            "{} units cannot have conversion factors",
            self.role
        );
        for (commodity, factor) in &self.conversion {
            ensure!(
                factor.is_finite(),
                "Invalid conversion factor for {commodity} ({factor})"
            );
        }

        if let UnitRole::Auxiliary(output) = &self.role {
            ensure!(
                !output.is_electricity(),
                "Electricity cannot be provided by an auxiliary unit"
            );
            ensure!(
                !self.conversion.contains_key(output),
                "Auxiliary unit for {output} cannot have a conversion factor for {output}"
            );
        }

        Ok(())
    }
}
