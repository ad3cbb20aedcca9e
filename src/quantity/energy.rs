use std::{
    fmt::{Debug, Display, Formatter},
    ops::{Div, Mul},
};

use crate::quantity::{money::Euro, price::EuroPerMegawattHour};

/// Energy amount, either internal (stored) or external (traded).
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
    derive_more::Sum,
)]
pub struct MegawattHours(pub f64);

impl MegawattHours {
    pub const ZERO: Self = Self(0.0);

    pub const fn abs(mut self) -> Self {
        self.0 = self.0.abs();
        self
    }

    pub const fn signum(self) -> f64 {
        if self.0 == 0.0 { 0.0 } else { self.0.signum() }
    }

    pub fn min(mut self, rhs: Self) -> Self {
        if rhs < self {
            self = rhs;
        }
        self
    }

    pub fn max(mut self, rhs: Self) -> Self {
        if rhs > self {
            self = rhs;
        }
        self
    }

    pub fn clamp(self, min: Self, max: Self) -> Self {
        self.max(min).min(max)
    }
}

impl Display for MegawattHours {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.3} MWh", self.0)
    }
}

impl Debug for MegawattHours {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.3}MWh", self.0)
    }
}

impl Mul<EuroPerMegawattHour> for MegawattHours {
    type Output = Euro;

    fn mul(self, rhs: EuroPerMegawattHour) -> Self::Output {
        Euro::from(self.0 * rhs.0)
    }
}

impl Mul<f64> for MegawattHours {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self::Output {
        Self(self.0 * rhs)
    }
}

impl Div<f64> for MegawattHours {
    type Output = Self;

    fn div(self, rhs: f64) -> Self::Output {
        Self(self.0 / rhs)
    }
}
