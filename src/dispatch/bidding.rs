use crate::{
    dispatch::schedule::{Bid, BidSchedule, DispatchSchedule, DispatchStep},
    period::Period,
    quantity::EuroPerMegawattHour,
};

/// Technical price ceiling of the market: bidding it guarantees a purchase clears.
pub const SCARCITY_PRICE: EuroPerMegawattHour = EuroPerMegawattHour(3000.0);

/// Technical price floor of the market: bidding it guarantees a sale clears.
pub const MINIMAL_PRICE: EuroPerMegawattHour = EuroPerMegawattHour(-500.0);

/// Pricing policy turning a dispatch schedule into a market bid schedule.
///
/// A closed set of strategies, selected at configuration time. Both policies pass the
/// requested energy and the expected initial energy level through unchanged.
#[derive(Debug)]
pub enum BidScheduler {
    /// Bid at the technical price limits so the planned dispatch clears regardless
    /// of the market outcome.
    EnsureDispatch { scheduling_horizon_hours: f64 },

    /// Bid the specific stored-value change of each step: purchases pay at most the
    /// marginal value gained, sales recover at least the marginal value lost.
    WaterValueBids { scheduling_horizon_hours: f64 },
}

impl BidScheduler {
    pub const fn scheduling_horizon_hours(&self) -> f64 {
        match self {
            Self::EnsureDispatch { scheduling_horizon_hours }
            | Self::WaterValueBids { scheduling_horizon_hours } => *scheduling_horizon_hours,
        }
    }

    /// Price every dispatch step and assemble the bid schedule.
    pub fn create(&self, starting_period: Period, dispatch: &DispatchSchedule) -> BidSchedule {
        let bids = dispatch
            .steps
            .iter()
            .map(|step| Bid {
                energy: step.external_delta,
                price: self.bid_price(step),
                expected_initial_energy: step.initial_energy,
            })
            .collect();
        BidSchedule::new(starting_period, bids)
    }

    fn bid_price(&self, step: &DispatchStep) -> EuroPerMegawattHour {
        match self {
            Self::EnsureDispatch { .. } => {
                if step.external_delta.0 > 0.0 {
                    SCARCITY_PRICE
                } else if step.external_delta.0 < 0.0 {
                    MINIMAL_PRICE
                } else {
                    EuroPerMegawattHour::ZERO
                }
            }
            Self::WaterValueBids { .. } => {
                step.specific_value.unwrap_or_default() * step.external_delta.signum()
            }
        }
    }
}
