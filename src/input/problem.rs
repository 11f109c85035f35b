//! Code for reading optimisation problems from JSON input.
use super::read_json;
use crate::commodity::{CARBON_DIOXIDE, ConversionMap, ELECTRICITY, SpecificCostMap, WATER};
use crate::problem::{OptimisationProblem, RegionCode};
use crate::process::{ProcessCode, ProcessCosts, ProcessUnit, StorageKind, UnitRole};
use crate::units::{Dimensionless, MoneyPerCapacity, MoneyPerFlow};
use anyhow::{Context, Result, bail, ensure};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// The input data for a single optimisation, as provided by the caller
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct ProblemInput {
    /// The region whose renewable profiles are used
    pub source_region_code: RegionCode,
    /// Renewable sources
    pub res: Vec<RenewableInput>,
    /// Electrolyser
    pub ely: ConversionUnitInput,
    /// Derivative synthesis
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deriv: Option<ConversionUnitInput>,
    /// Water provisioning
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub h2o: Option<ConversionUnitInput>,
    /// Carbon dioxide provisioning
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub co2: Option<ConversionUnitInput>,
    /// Electricity storage
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub el_str: Option<StorageInput>,
    /// Hydrogen storage
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub h2_str: Option<StorageInput>,
    /// Specific costs of purchased auxiliary commodities
    #[serde(default)]
    pub speccost: SpecificCostMap,
}

/// Parameters of a renewable source
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[allow(missing_docs)]
pub struct RenewableInput {
    pub capex_a: MoneyPerCapacity,
    pub opex_f: MoneyPerCapacity,
    pub opex_o: MoneyPerFlow,
    pub process_code: ProcessCode,
}

/// Parameters of a unit which converts commodities (ELY, DERIV, H2O and CO2)
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[allow(missing_docs)]
pub struct ConversionUnitInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eff: Option<Dimensionless>,
    pub capex_a: MoneyPerCapacity,
    pub opex_f: MoneyPerCapacity,
    pub opex_o: MoneyPerFlow,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process_code: Option<ProcessCode>,
    #[serde(default, skip_serializing_if = "ConversionMap::is_empty")]
    pub conv: ConversionMap,
}

/// Parameters of a storage unit
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[allow(missing_docs)]
pub struct StorageInput {
    pub eff: Dimensionless,
    pub capex_a: MoneyPerCapacity,
    pub opex_f: MoneyPerCapacity,
    pub opex_o: MoneyPerFlow,
}

impl RenewableInput {
    fn into_unit(self) -> ProcessUnit {
        let costs = ProcessCosts {
            capex_annualised: self.capex_a,
            opex_fixed: self.opex_f,
            opex_variable: self.opex_o,
        };
        ProcessUnit::new(UnitRole::Renewable(self.process_code), costs)
    }
}

impl ConversionUnitInput {
    fn costs(&self) -> ProcessCosts {
        ProcessCosts {
            capex_annualised: self.capex_a,
            opex_fixed: self.opex_f,
            opex_variable: self.opex_o,
        }
    }

    fn into_electrolyser(self) -> Result<ProcessUnit> {
        let efficiency = self.eff.context("Missing EFF")?;
        ensure!(
            self.process_code.is_none(),
            "PROCESS_CODE cannot be given for ELY"
        );

        Ok(ProcessUnit::new(UnitRole::Electrolyser, self.costs())
            .with_efficiency(efficiency)
            .with_conversion(self.conv))
    }

    fn into_derivative(self) -> Result<ProcessUnit> {
        let efficiency = self.eff.context("Missing EFF")?;
        let Some(code) = self.process_code.clone() else {
            bail!("Missing PROCESS_CODE");
        };

        Ok(ProcessUnit::new(UnitRole::Derivative(code), self.costs())
            .with_efficiency(efficiency)
            .with_conversion(self.conv))
    }

    /// Convert into an auxiliary unit.
    ///
    /// `EFF` is the amount of `output` produced per unit of electricity. It is folded into the
    /// unit's electricity conversion factor, on top of any `EL` given in `CONV`.
    fn into_auxiliary(mut self, output: &str) -> Result<ProcessUnit> {
        ensure!(
            self.process_code.is_none(),
            "PROCESS_CODE cannot be given for auxiliary units"
        );

        if let Some(efficiency) = self.eff {
            let efficiency = efficiency.value();
            ensure!(
                efficiency.is_finite() && efficiency > 0.0,
                "Invalid value for EFF ({efficiency}). Must be a finite number >0."
            );
            *self.conv.entry(ELECTRICITY.into()).or_insert(0.0) += 1.0 / efficiency;
        }

        Ok(ProcessUnit::new(UnitRole::Auxiliary(output.into()), self.costs())
            .with_conversion(self.conv))
    }
}

impl StorageInput {
    fn into_unit(self, kind: StorageKind) -> ProcessUnit {
        let costs = ProcessCosts {
            capex_annualised: self.capex_a,
            opex_fixed: self.opex_f,
            opex_variable: self.opex_o,
        };
        ProcessUnit::new(UnitRole::Storage(kind), costs).with_efficiency(self.eff)
    }
}

impl ProblemInput {
    /// Convert the input into an [`OptimisationProblem`].
    ///
    /// Only the structure of the input is checked here. Parameter values are checked by
    /// [`OptimisationProblem::validate`].
    pub fn into_problem(self) -> Result<OptimisationProblem> {
        let renewables = self.res.into_iter().map(RenewableInput::into_unit).collect();
        let electrolyser = self
            .ely
            .into_electrolyser()
            .context("Invalid input for ELY")?;
        let derivative = self
            .deriv
            .map(ConversionUnitInput::into_derivative)
            .transpose()
            .context("Invalid input for DERIV")?;
        let water = self
            .h2o
            .map(|unit| unit.into_auxiliary(WATER))
            .transpose()
            .context("Invalid input for H2O")?;
        let carbon_dioxide = self
            .co2
            .map(|unit| unit.into_auxiliary(CARBON_DIOXIDE))
            .transpose()
            .context("Invalid input for CO2")?;

        Ok(OptimisationProblem {
            source_region: self.source_region_code,
            renewables,
            electrolyser,
            derivative,
            water,
            carbon_dioxide,
            electricity_storage: self
                .el_str
                .map(|unit| unit.into_unit(StorageKind::Electricity)),
            hydrogen_storage: self.h2_str.map(|unit| unit.into_unit(StorageKind::Hydrogen)),
            specific_costs: self.speccost,
        })
    }
}

/// Read a single problem from a JSON file
pub fn read_problem_input(file_path: &Path) -> Result<ProblemInput> {
    read_json(file_path)
}

/// Read a batch of problems (a JSON array) from a file
pub fn read_batch_input(file_path: &Path) -> Result<Vec<ProblemInput>> {
    read_json(file_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::assert_error;
    use rstest::{fixture, rstest};
    use serde_json::{Value, json};

    #[fixture]
    fn input_json() -> Value {
        json!({
            "SOURCE_REGION_CODE": "ARG",
            "RES": [
                {"CAPEX_A": 25.0, "OPEX_F": 3.0, "OPEX_O": 0.01, "PROCESS_CODE": "PV-FIX"},
                {"CAPEX_A": 40.0, "OPEX_F": 5.0, "OPEX_O": 0.02, "PROCESS_CODE": "WIND-ON"}
            ],
            "ELY": {
                "EFF": 0.834,
                "CAPEX_A": 0.2,
                "OPEX_F": 0.05,
                "OPEX_O": 0.01,
                "CONV": {"H2O-L": 0.658}
            },
            "DERIV": {
                "EFF": 0.8,
                "CAPEX_A": 0.1,
                "OPEX_F": 0.01,
                "OPEX_O": 0.0,
                "PROCESS_CODE": "CH4SYN",
                "CONV": {"CO2-G": 0.2, "EL": 0.05}
            },
            "H2O": null,
            "EL_STR": {"EFF": 0.9, "CAPEX_A": 0.5, "OPEX_F": 0.0, "OPEX_O": 0.0},
            "SPECCOST": {"H2O-L": 0.001, "CO2-G": 0.05}
        })
    }

    fn parse(value: Value) -> ProblemInput {
        serde_json::from_value(value).unwrap()
    }

    #[rstest]
    fn into_problem_ok(input_json: Value) {
        let problem = parse(input_json).into_problem().unwrap();
        problem.validate().unwrap();

        assert_eq!(problem.source_region, RegionCode::from("ARG"));
        assert_eq!(
            problem.renewable_codes(),
            vec![ProcessCode::from("PV-FIX"), ProcessCode::from("WIND-ON")]
        );
        assert_eq!(problem.electrolyser.efficiency, Dimensionless(0.834));
        assert_eq!(
            problem.electrolyser.conversion_factor(&WATER.into()),
            0.658
        );
        let derivative = problem.derivative.as_ref().unwrap();
        assert_eq!(derivative.role, UnitRole::Derivative("CH4SYN".into()));
        assert!(problem.water.is_none());
        assert!(problem.carbon_dioxide.is_none());
        assert_eq!(
            problem.electricity_storage.as_ref().unwrap().role,
            UnitRole::Storage(StorageKind::Electricity)
        );
        assert!(problem.hydrogen_storage.is_none());
        assert_eq!(problem.specific_costs.len(), 2);
    }

    #[rstest]
    fn into_problem_missing_efficiency(mut input_json: Value) {
        input_json["ELY"].as_object_mut().unwrap().remove("EFF");
        assert_error!(
            parse(input_json).into_problem(),
            "Invalid input for ELY"
        );
    }

    #[rstest]
    fn into_problem_missing_derivative_code(mut input_json: Value) {
        input_json["DERIV"]
            .as_object_mut()
            .unwrap()
            .remove("PROCESS_CODE");
        assert_error!(
            parse(input_json).into_problem(),
            "Invalid input for DERIV"
        );
    }

    #[rstest]
    fn auxiliary_unit_defaults(mut input_json: Value) {
        input_json["CO2"] = json!({"CAPEX_A": 1.0, "OPEX_F": 0.0, "OPEX_O": 0.0, "CONV": {"EL": 0.5}});
        let problem = parse(input_json).into_problem().unwrap();
        let unit = problem.carbon_dioxide.unwrap();
        assert_eq!(unit.role, UnitRole::Auxiliary(CARBON_DIOXIDE.into()));
        assert_eq!(unit.efficiency, Dimensionless(1.0));
        assert_eq!(unit.conversion_factor(&"EL".into()), 0.5);
    }

    #[rstest]
    fn auxiliary_efficiency_becomes_electricity_use(mut input_json: Value) {
        input_json["H2O"] = json!({"EFF": 2.0, "CAPEX_A": 1.0, "OPEX_F": 0.0, "OPEX_O": 0.0});
        input_json["CO2"] =
            json!({"EFF": 4.0, "CAPEX_A": 1.0, "OPEX_F": 0.0, "OPEX_O": 0.0, "CONV": {"EL": 0.5}});
        let problem = parse(input_json).into_problem().unwrap();
        problem.validate().unwrap();

        let water = problem.water.unwrap();
        assert_eq!(water.efficiency, Dimensionless(1.0));
        assert_eq!(water.conversion_factor(&"EL".into()), 0.5);
        let carbon_dioxide = problem.carbon_dioxide.unwrap();
        assert_eq!(carbon_dioxide.conversion_factor(&"EL".into()), 0.75);
    }

    #[rstest]
    #[case(0.0)]
    #[case(-1.0)]
    fn auxiliary_efficiency_invalid(mut input_json: Value, #[case] eff: f64) {
        input_json["H2O"] = json!({"EFF": eff, "CAPEX_A": 1.0, "OPEX_F": 0.0, "OPEX_O": 0.0});
        assert_error!(
            parse(input_json).into_problem(),
            "Invalid input for H2O"
        );
    }

    #[rstest]
    fn missing_required_field(mut input_json: Value) {
        input_json.as_object_mut().unwrap().remove("ELY");
        assert!(serde_json::from_value::<ProblemInput>(input_json).is_err());
    }

    #[rstest]
    fn unknown_fields_ignored(mut input_json: Value) {
        input_json["comment"] = json!("H2, hybrid");
        parse(input_json);
    }

    #[test]
    fn minimal_input_serialises_without_optional_units() {
        let input = parse(json!({
            "SOURCE_REGION_CODE": "ARG",
            "RES": [{"CAPEX_A": 1.0, "OPEX_F": 0.0, "OPEX_O": 0.0, "PROCESS_CODE": "PV-FIX"}],
            "ELY": {"EFF": 0.7, "CAPEX_A": 1.0, "OPEX_F": 0.0, "OPEX_O": 0.0}
        }));
        let value = serde_json::to_value(&input).unwrap();
        assert!(value.get("DERIV").is_none());
        assert!(value["ELY"].get("CONV").is_none());
        assert_eq!(value["SPECCOST"], json!({}));
    }
}
