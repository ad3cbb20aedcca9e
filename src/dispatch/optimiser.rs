use crate::{
    dispatch::{
        bidding::BidScheduler,
        schedule::{BidSchedule, DispatchSchedule},
        states::StorageStates,
        table::ValueTable,
        water_value::WaterValues,
    },
    prelude::*,
    quantity::Euro,
};

pub const ERR_NO_FEASIBLE_TRANSITION: &str = "no feasible transition found for time period";

/// Optimisation target of the assessment function's value.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Target {
    Maximise,
    Minimise,
}

impl Target {
    /// Worst possible value: the starting point of every best-transition search.
    fn sentinel(self) -> Euro {
        match self {
            Self::Maximise => Euro::from(f64::NEG_INFINITY),
            Self::Minimise => Euro::from(f64::INFINITY),
        }
    }

    /// Whether `value` is strictly better than `best` under this target.
    fn improves(self, value: Euro, best: Euro) -> bool {
        match self {
            Self::Maximise => value > best,
            Self::Minimise => value < best,
        }
    }
}

/// Backward-induction solver: finds the best dispatch of a flexibility device by
/// stepping through the planning horizon from the last period to the first and
/// recording, per period and state, the best reachable continuation.
///
/// With a bid scheduler attached it also reconstructs the optimal forward trajectory
/// and turns it into a market bid schedule.
#[derive(bon::Builder)]
pub struct Optimiser<'a> {
    states: &'a StorageStates<'a>,
    target: Target,
    bid_scheduler: Option<&'a BidScheduler>,
    water_values: Option<&'a WaterValues>,
}

impl Optimiser<'_> {
    /// Run the full backward pass and return the filled value table.
    #[instrument(
        skip_all,
        name = "Optimising…",
        fields(steps = self.states.step_count(), states = self.states.state_count()),
    )]
    pub fn solve(&self) -> Result<ValueTable> {
        let step_count = self.states.step_count();
        let mut table = ValueTable::new(step_count, self.states.state_count());
        for k in 0..step_count {
            let period = self.states.period_at(step_count - k - 1); // step backwards in time
            let step = self.states.time_index(period)?;
            for initial_state in self.states.initial_states(period) {
                let mut best_value = self.target.sentinel();
                let mut best_final_state = None;
                for final_state in self.states.final_states(period, initial_state) {
                    let value = self.states.transition_value(period, initial_state, final_state)
                        + table.best_value_next_period(step, final_state);
                    if self.target.improves(value, best_value) {
                        best_value = value;
                        best_final_state = Some(final_state);
                    }
                }
                let best_final_state = best_final_state
                    .with_context(|| format!("{ERR_NO_FEASIBLE_TRANSITION}: {period}"))?;
                table.record(step, initial_state, best_final_state, best_value);
            }
            trace!(step, period = %period, "solved");
        }
        Ok(table)
    }

    /// Optimise, reconstruct the optimal dispatch trajectory, and price it into a
    /// market bid schedule via the attached bid scheduler.
    pub fn create_schedule(&self) -> Result<(DispatchSchedule, BidSchedule)> {
        let bid_scheduler = self.bid_scheduler.context("no bid scheduler attached")?;
        let table = self.solve()?;
        let starting_period = self.states.starting_period();
        let scheduling_steps =
            starting_period.count_in_hours(bid_scheduler.scheduling_horizon_hours());
        ensure!(
            scheduling_steps <= self.states.step_count(),
            "scheduling horizon of {scheduling_steps} periods exceeds the planning horizon of {} \
             periods",
            self.states.step_count(),
        );
        let dispatch = self.states.best_dispatch(&table, scheduling_steps, self.water_values);
        let schedule = bid_scheduler.create(starting_period, &dispatch);
        Ok((dispatch, schedule))
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use chrono::{TimeDelta, TimeZone, Utc};

    use super::*;
    use crate::{
        device::StorageDevice,
        dispatch::assessment::Assessment,
        forecast::PriceForecast,
        period::Period,
        profile::Profile,
        quantity::{EuroPerMegawattHour, MegawattHours},
    };

    fn starting_period() -> Period {
        let start = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
        Period::new(start, TimeDelta::hours(1)).unwrap()
    }

    /// A 2 MWh battery whose power limits span the whole energy band in one hour, so
    /// the bound-states planning reaches every recorded state from every other one.
    fn battery(current_energy: f64) -> StorageDevice {
        StorageDevice::builder()
            .charging_power(Profile::constant(2.0))
            .discharging_power(Profile::constant(2.0))
            .upper_energy_limit(Profile::constant(2.0))
            .lower_energy_limit(Profile::constant(0.0))
            .current_energy(MegawattHours(current_energy))
            .build()
    }

    fn hourly_prices(prices: &[f64]) -> PriceForecast {
        prices
            .iter()
            .enumerate()
            .map(|(hour, price)| {
                #[expect(clippy::cast_possible_wrap)]
                let period = starting_period().shift_by(hour as i64);
                (period.start(), EuroPerMegawattHour(*price))
            })
            .collect()
    }

    fn states<'a>(
        device: &'a StorageDevice,
        assessment: &'a Assessment,
        horizon_hours: f64,
    ) -> StorageStates<'a> {
        StorageStates::builder()
            .device(device)
            .assessment(assessment)
            .starting_period(starting_period())
            .planning_horizon_hours(horizon_hours)
            .energy_resolution(MegawattHours(1.0))
            .build()
            .unwrap()
    }

    fn dispatch_deltas(
        device: &StorageDevice,
        assessment: &Assessment,
        horizon_hours: f64,
    ) -> Vec<f64> {
        let states = states(device, assessment, horizon_hours);
        let optimiser =
            Optimiser::builder().states(&states).target(assessment.target()).build();
        let table = optimiser.solve().unwrap();
        let steps = states.step_count();
        states
            .best_dispatch(&table, steps, None)
            .steps
            .iter()
            .map(|step| step.external_delta.0)
            .collect()
    }

    #[test]
    fn test_zero_horizon_is_a_no_op() {
        let device = battery(1.0);
        let assessment = Assessment::Profit { prices: hourly_prices(&[]) };
        let states = states(&device, &assessment, 0.0);
        let optimiser =
            Optimiser::builder().states(&states).target(Target::Maximise).build();
        let table = optimiser.solve().unwrap();
        assert_eq!(table.step_count(), 0);
    }

    #[test]
    fn test_profit_arbitrage_buys_low_and_sells_high() {
        // Cheap first hour, expensive second hour: charge, then discharge.
        let device = battery(0.0);
        let assessment = Assessment::Profit { prices: hourly_prices(&[10.0, 100.0]) };
        assert_eq!(dispatch_deltas(&device, &assessment, 2.0), [2.0, -2.0]);
    }

    #[test]
    fn test_trajectory_covers_the_whole_horizon() {
        let device = battery(0.0);
        let assessment = Assessment::Profit { prices: hourly_prices(&[30.0, 10.0, 80.0, 40.0]) };
        let deltas = dispatch_deltas(&device, &assessment, 4.0);
        assert_eq!(deltas.len(), 4);
        // The cheapest hour charges, the most expensive one discharges.
        assert_abs_diff_eq!(deltas[1], 2.0);
        assert_abs_diff_eq!(deltas[2], -2.0);
    }

    #[test]
    fn test_duality_of_maximise_and_minimise() {
        // Cost values are the negated profit values, and cost is minimised where
        // profit is maximised, so both must pick the same trajectory.
        let prices = [30.0, 10.0, 80.0, 40.0];
        let device = battery(0.0);
        let profit = Assessment::Profit { prices: hourly_prices(&prices) };
        let cost = Assessment::Cost { prices: hourly_prices(&prices) };
        assert_eq!(
            dispatch_deltas(&device, &profit, 4.0),
            dispatch_deltas(&device, &cost, 4.0),
        );
    }

    #[test]
    fn test_infeasible_period_fails_naming_the_period() {
        // A pure inflow device without any controllable power: every reachable
        // target falls between two grid states, so no transition snaps to the grid.
        let device = StorageDevice::builder()
            .charging_power(Profile::constant(0.0))
            .discharging_power(Profile::constant(0.0))
            .upper_energy_limit(Profile::constant(10.0))
            .lower_energy_limit(Profile::constant(5.0))
            .net_inflow_power(Profile::constant(0.4))
            .current_energy(MegawattHours(5.0))
            .build();
        let assessment = Assessment::Profit { prices: hourly_prices(&[10.0, 20.0]) };
        let states = states(&device, &assessment, 2.0);
        let optimiser =
            Optimiser::builder().states(&states).target(Target::Maximise).build();
        let error = optimiser.solve().unwrap_err();
        assert!(error.to_string().contains(ERR_NO_FEASIBLE_TRANSITION));
        assert!(error.to_string().contains("2030-01-01"));
    }

    #[test]
    fn test_create_schedule_produces_one_bid_per_period() {
        let device = battery(0.0);
        let assessment = Assessment::Profit { prices: hourly_prices(&[10.0, 100.0]) };
        let states = states(&device, &assessment, 2.0);
        let bid_scheduler = BidScheduler::EnsureDispatch { scheduling_horizon_hours: 2.0 };
        let optimiser = Optimiser::builder()
            .states(&states)
            .target(assessment.target())
            .bid_scheduler(&bid_scheduler)
            .build();
        let (dispatch, schedule) = optimiser.create_schedule().unwrap();
        assert_eq!(dispatch.steps.len(), 2);
        assert_eq!(schedule.bids().len(), 2);
    }

    #[test]
    fn test_create_schedule_without_scheduler_fails() {
        let device = battery(0.0);
        let assessment = Assessment::Profit { prices: hourly_prices(&[10.0]) };
        let states = states(&device, &assessment, 1.0);
        let optimiser =
            Optimiser::builder().states(&states).target(Target::Maximise).build();
        assert!(optimiser.create_schedule().is_err());
    }
}
