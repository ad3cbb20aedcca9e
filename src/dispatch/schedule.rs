use chrono::{DateTime, Utc};

use crate::{
    period::Period,
    quantity::{EuroPerMegawattHour, MegawattHours},
};

/// Maximum deviation between planned and actual energy content for a schedule to
/// still count as applicable.
const MAX_ENERGY_DEVIATION: MegawattHours = MegawattHours(1e-3);

/// One step of a realized dispatch plan.
#[derive(Copy, Clone, Debug)]
pub struct DispatchStep {
    /// Energy traded with the grid: positive when purchasing, negative when selling.
    pub external_delta: MegawattHours,

    /// Internal energy content at the beginning of the step.
    pub initial_energy: MegawattHours,

    /// Stored-value change per externally traded MWh, when a water value table is
    /// available and the step trades energy at all.
    pub specific_value: Option<EuroPerMegawattHour>,
}

/// The physical plan chosen by the optimiser: one step per scheduling period.
#[derive(Debug, Default)]
pub struct DispatchSchedule {
    pub steps: Vec<DispatchStep>,
}

/// A single market bid.
#[derive(Copy, Clone, Debug, serde::Serialize)]
pub struct Bid {
    /// Positive: energy requested (purchase); negative: energy offered (sale).
    pub energy: MegawattHours,

    pub price: EuroPerMegawattHour,

    /// Internal energy content the device is expected to have when the bid clears.
    pub expected_initial_energy: MegawattHours,
}

/// The market-facing plan: one bid per planning period, starting at a given period.
#[derive(Debug, serde::Serialize)]
pub struct BidSchedule {
    starting_period: Period,
    bids: Vec<Bid>,
}

impl BidSchedule {
    pub fn new(starting_period: Period, bids: Vec<Bid>) -> Self {
        Self { starting_period, bids }
    }

    pub const fn starting_period(&self) -> Period {
        self.starting_period
    }

    pub fn bids(&self) -> &[Bid] {
        &self.bids
    }

    /// Whether this schedule covers the given time with a matching expected energy
    /// content: the time lies within the schedule, on the period grid, and the
    /// actual energy deviates from the plan by less than the tolerance.
    pub fn is_applicable(&self, time: DateTime<Utc>, current_energy: MegawattHours) -> bool {
        let Ok(index) = Period::new(time, self.starting_period.duration())
            .and_then(|period| period.index_from(self.starting_period))
        else {
            return false;
        };
        let Some(bid) = self.bids.get(index) else {
            return false;
        };
        (bid.expected_initial_energy - current_energy).abs() < MAX_ENERGY_DEVIATION
    }
}
