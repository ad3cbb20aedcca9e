use std::{
    fmt::{Debug, Display, Formatter},
    ops::Mul,
};

/// Specific energy price or value.
#[derive(
    Clone,
    Copy,
    Default,
    PartialEq,
    PartialOrd,
    serde::Deserialize,
    serde::Serialize,
    derive_more::Add,
    derive_more::AddAssign,
    derive_more::From,
    derive_more::FromStr,
    derive_more::Neg,
    derive_more::Sub,
    derive_more::SubAssign,
)]
pub struct EuroPerMegawattHour(pub f64);

impl EuroPerMegawattHour {
    pub const ZERO: Self = Self(0.0);
}

impl Display for EuroPerMegawattHour {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2} €/MWh", self.0)
    }
}

impl Debug for EuroPerMegawattHour {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}€/MWh", self.0)
    }
}

impl Mul<f64> for EuroPerMegawattHour {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self::Output {
        Self(self.0 * rhs)
    }
}
