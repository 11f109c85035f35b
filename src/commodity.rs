//! Commodities are the substances and energy carriers consumed or produced by process units.
//!
//! Electricity and hydrogen are balanced on dedicated buses. All other commodities named in
//! conversion factors are "auxiliary" commodities, which are either purchased at a specific cost or
//! provided by an auxiliary process unit.
use crate::id::define_id_type;
use crate::units::MoneyPerFlow;
use indexmap::IndexMap;

define_id_type! {CommodityID}

/// Electricity
pub const ELECTRICITY: &str = "EL";

/// Liquid water
pub const WATER: &str = "H2O-L";

/// Gaseous carbon dioxide
pub const CARBON_DIOXIDE: &str = "CO2-G";

/// Conversion factors for a process unit, keyed by commodity.
///
/// Values are given per unit of the unit's primary output. Positive values are consumed and negative
/// values are produced as a byproduct.
pub type ConversionMap = IndexMap<CommodityID, f64>;

/// Prices at which auxiliary commodities can be purchased externally
pub type SpecificCostMap = IndexMap<CommodityID, MoneyPerFlow>;

impl CommodityID {
    /// Whether this commodity is balanced on the electricity bus
    pub fn is_electricity(&self) -> bool {
        self.as_str() == ELECTRICITY
    }
}
