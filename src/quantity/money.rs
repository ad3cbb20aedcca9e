use std::{
    fmt::{Debug, Display, Formatter},
    ops::Div,
};

use ordered_float::OrderedFloat;

use crate::quantity::{energy::MegawattHours, price::EuroPerMegawattHour};

/// Money amount. Backed by [`OrderedFloat`] so that values are totally ordered and
/// can be compared and accumulated by the solver.
#[derive(
    Clone,
    Copy,
    Default,
    Eq,
    Ord,
    PartialEq,
    PartialOrd,
    serde::Deserialize,
    serde::Serialize,
    derive_more::Add,
    derive_more::AddAssign,
    derive_more::Neg,
    derive_more::Sub,
    derive_more::SubAssign,
    derive_more::Sum,
)]
pub struct Euro(pub OrderedFloat<f64>);

impl Euro {
    pub const ZERO: Self = Self(OrderedFloat(0.0));

    pub const fn value(self) -> f64 {
        self.0.0
    }
}

impl From<f64> for Euro {
    fn from(value: f64) -> Self {
        Self(OrderedFloat(value))
    }
}

impl Display for Euro {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:+.2} €", self.value())
    }
}

impl Debug for Euro {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:+.2}€", self.value())
    }
}

impl Div<MegawattHours> for Euro {
    type Output = EuroPerMegawattHour;

    fn div(self, rhs: MegawattHours) -> Self::Output {
        EuroPerMegawattHour(self.value() / rhs.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_specific_value() {
        assert_eq!(Euro::from(100.0) / MegawattHours(4.0), EuroPerMegawattHour(25.0));
    }

    #[test]
    fn test_total_order() {
        assert!(Euro::from(f64::NEG_INFINITY) < Euro::ZERO);
        assert!(Euro::from(1.0) > Euro::from(-1.0));
    }
}
