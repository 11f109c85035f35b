//! Newtype wrappers for the physical and monetary quantities used by the optimiser.
//!
//! All flows are expressed per unit of final product output, so capacities are in e.g. MW per MW of
//! final product and costs are annual costs per unit of (hourly) final product output.
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Div, Mul, Sub};

/// The number of hours in a (non-leap) year
pub const HOURS_PER_YEAR: f64 = 8760.0;

macro_rules! base_unit_struct {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub f64);

        impl $name {
            /// Create a new value of this unit type
            pub const fn new(value: f64) -> Self {
                Self(value)
            }

            /// The underlying value as an `f64`
            pub const fn value(&self) -> f64 {
                self.0
            }

            /// Whether the underlying value is neither infinite nor NaN
            pub fn is_finite(&self) -> bool {
                self.0.is_finite()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl Add for $name {
            type Output = Self;

            fn add(self, rhs: Self) -> Self {
                Self(self.0 + rhs.0)
            }
        }

        impl AddAssign for $name {
            fn add_assign(&mut self, rhs: Self) {
                self.0 += rhs.0;
            }
        }

        impl Sub for $name {
            type Output = Self;

            fn sub(self, rhs: Self) -> Self {
                Self(self.0 - rhs.0)
            }
        }

        impl Mul<f64> for $name {
            type Output = Self;

            fn mul(self, rhs: f64) -> Self {
                Self(self.0 * rhs)
            }
        }

        impl Div<f64> for $name {
            type Output = Self;

            fn div(self, rhs: f64) -> Self {
                Self(self.0 / rhs)
            }
        }

        impl Sum for $name {
            fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
                Self(iter.map(|x| x.0).sum())
            }
        }
    };
}

macro_rules! impl_mul {
    ($lhs:ident, $rhs:ident, $out:ident) => {
        impl Mul<$rhs> for $lhs {
            type Output = $out;

            fn mul(self, rhs: $rhs) -> $out {
                $out(self.0 * rhs.0)
            }
        }

        impl Mul<$lhs> for $rhs {
            type Output = $out;

            fn mul(self, rhs: $lhs) -> $out {
                $out(self.0 * rhs.0)
            }
        }
    };
}

base_unit_struct!(Dimensionless);
base_unit_struct!(Money);
base_unit_struct!(Capacity);
base_unit_struct!(Flow);
base_unit_struct!(MoneyPerCapacity);
base_unit_struct!(MoneyPerFlow);
// Storage duration, in hours of final product output
base_unit_struct!(Hours);

impl_mul!(MoneyPerCapacity, Capacity, Money);
impl_mul!(MoneyPerFlow, Flow, Money);

impl Div<Capacity> for Flow {
    type Output = Dimensionless;

    fn div(self, rhs: Capacity) -> Dimensionless {
        Dimensionless(self.0 / rhs.0)
    }
}

impl Dimensionless {
    /// Convert a fraction of the year into a number of hours
    pub fn to_hours_per_year(self) -> f64 {
        self.0 * HOURS_PER_YEAR
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cost_times_quantity_gives_money() {
        assert_eq!(MoneyPerCapacity(2.5) * Capacity(4.0), Money(10.0));
        assert_eq!(Flow(3.0) * MoneyPerFlow(0.5), Money(1.5));
    }

    #[test]
    fn flow_over_capacity_is_dimensionless() {
        assert_eq!(Flow(2.0) / Capacity(4.0), Dimensionless(0.5));
    }

    #[test]
    fn sum_of_money() {
        let total: Money = [Money(1.0), Money(2.0), Money(3.5)].into_iter().sum();
        assert_eq!(total, Money(6.5));
    }

    #[test]
    fn fraction_to_hours() {
        assert_eq!(Dimensionless(0.5).to_hours_per_year(), 4380.0);
    }
}
