use std::ops::RangeInclusive;

use chrono::{DateTime, Utc};

use crate::{
    device::StorageDevice,
    dispatch::{
        assessment::Assessment,
        schedule::{DispatchSchedule, DispatchStep},
        table::ValueTable,
        water_value::WaterValues,
    },
    period::Period,
    prelude::*,
    quantity::{Euro, EuroPerMegawattHour, MegawattHours},
};

/// Added to floating-point grid-step calculations to avoid rounding errors.
const PRECISION_GUARD: f64 = 1e-5;

/// Discretized one-dimensional state space over the energy content of a device.
///
/// Owns the index↔energy mapping: state index 0 is the lowest grid level observed
/// across the planning horizon, consecutive indices are one energy resolution step
/// apart. All queries take the queried period explicitly and are pure, so one
/// instance may be shared by concurrent read-only callers.
pub struct StorageStates<'a> {
    device: &'a StorageDevice,
    assessment: &'a Assessment,
    starting_period: Period,
    energy_resolution: f64,
    step_count: usize,
    lowest_energy: f64,
    state_count: usize,
}

#[bon::bon]
impl<'a> StorageStates<'a> {
    /// Set up the state space for one planning window: derive the number of steps
    /// from the planning horizon and the energy grid from the union of the device's
    /// feasible bounds over all periods, snapped to the energy resolution.
    #[builder]
    pub fn new(
        device: &'a StorageDevice,
        assessment: &'a Assessment,
        starting_period: Period,
        planning_horizon_hours: f64,
        energy_resolution: MegawattHours,
    ) -> Result<Self> {
        ensure!(
            energy_resolution > MegawattHours::ZERO,
            "energy resolution must be positive, got {energy_resolution}",
        );
        let resolution = energy_resolution.0;
        let step_count = starting_period.count_in_hours(planning_horizon_hours);
        if step_count == 0 {
            return Ok(Self {
                device,
                assessment,
                starting_period,
                energy_resolution: resolution,
                step_count,
                lowest_energy: 0.0,
                state_count: 0,
            });
        }

        let mut lowest_bound = f64::MAX;
        let mut highest_bound = f64::MIN;
        #[expect(clippy::cast_possible_wrap)]
        for step in 0..step_count {
            let time = starting_period.shift_by(step as i64).start();
            lowest_bound = lowest_bound.min(device.lower_energy_limit(time).0);
            highest_bound = highest_bound.max(device.upper_energy_limit(time).0);
        }
        #[expect(clippy::cast_possible_truncation)]
        let lowest_step = (lowest_bound / resolution - PRECISION_GUARD).ceil() as i64;
        #[expect(clippy::cast_possible_truncation)]
        let highest_step = (highest_bound / resolution + PRECISION_GUARD).floor() as i64;
        ensure!(
            highest_step >= lowest_step,
            "energy resolution of {energy_resolution} leaves no grid state within the feasible \
             bounds [{lowest_bound} MWh, {highest_bound} MWh]",
        );
        #[expect(clippy::cast_precision_loss)]
        let lowest_energy = lowest_step as f64 * resolution;
        #[expect(clippy::cast_sign_loss)]
        let state_count = (highest_step - lowest_step + 1) as usize;
        Ok(Self {
            device,
            assessment,
            starting_period,
            energy_resolution: resolution,
            step_count,
            lowest_energy,
            state_count,
        })
    }
}

impl StorageStates<'_> {
    pub const fn step_count(&self) -> usize {
        self.step_count
    }

    pub const fn state_count(&self) -> usize {
        self.state_count
    }

    pub const fn starting_period(&self) -> Period {
        self.starting_period
    }

    #[expect(clippy::cast_possible_wrap)]
    pub fn period_at(&self, step: usize) -> Period {
        self.starting_period.shift_by(step as i64)
    }

    /// Time-step offset of the given period within the planning window; fails for
    /// periods not aligned with the planning grid.
    pub fn time_index(&self, period: Period) -> Result<usize> {
        period.index_from(self.starting_period)
    }

    /// Start times of all periods in the planning horizon, e.g. for requesting the
    /// forecasts still missing.
    pub fn planning_times(&self) -> Vec<DateTime<Utc>> {
        (0..self.step_count).map(|step| self.period_at(step).start()).collect()
    }

    /// State indices at the start of the given period: the device's feasible bounds
    /// at that instant, not the full discretized range.
    pub fn initial_states(&self, period: Period) -> [usize; 2] {
        let time = period.start();
        [
            self.ceil_index(self.device.lower_energy_limit(time)),
            self.floor_index(self.device.upper_energy_limit(time)),
        ]
    }

    /// All grid states reachable at the end of the given period from the given
    /// initial state; empty when no grid state lies within the reachable band.
    pub fn final_states(&self, period: Period, initial_state: usize) -> RangeInclusive<usize> {
        let initial_energy = self.index_to_energy(initial_state);
        let lowest =
            self.device.min_target_energy(period.start(), initial_energy, period.duration());
        let highest =
            self.device.max_target_energy(period.start(), initial_energy, period.duration());
        self.ceil_index(lowest)..=self.floor_index(highest)
    }

    /// Economic value of the transition between two states during the given period.
    pub fn transition_value(
        &self,
        period: Period,
        initial_state: usize,
        final_state: usize,
    ) -> Euro {
        let initial_energy = self.index_to_energy(initial_state);
        let final_energy = self.index_to_energy(final_state);
        let external_delta = self.device.simulate_transition(
            period.start(),
            initial_energy,
            final_energy,
            period.duration(),
        );
        self.assessment.transition_value(period, external_delta, initial_energy, final_energy)
    }

    /// Follow the best-next-state links from the device's actual energy content and
    /// turn them into a dispatch schedule of the given length. Each target level is
    /// clamped to the feasible bounds of its period, since the actual content may sit
    /// between grid states. When a water value table is given, each step also carries
    /// the specific value change of the traded energy for water-value-based bidding.
    pub fn best_dispatch(
        &self,
        table: &ValueTable,
        scheduling_steps: usize,
        water_values: Option<&WaterValues>,
    ) -> DispatchSchedule {
        let mut current_energy = self.device.current_energy();
        let mut steps = Vec::with_capacity(scheduling_steps);
        for step in 0..scheduling_steps {
            let period = self.period_at(step);
            let time = period.start();
            let state = self.energy_to_index(current_energy);
            let next_state = table.best_next_state(step, state);
            #[expect(clippy::cast_possible_wrap, clippy::cast_precision_loss)]
            let step_delta = (next_state as i64 - state as i64) as f64;
            let target = (current_energy + MegawattHours(step_delta * self.energy_resolution))
                .clamp(self.device.lower_energy_limit(time), self.device.upper_energy_limit(time));
            let external_delta =
                self.device.simulate_transition(time, current_energy, target, period.duration());
            let specific_value = water_values.and_then(|table| {
                Self::specific_value(table, period, current_energy, target, external_delta)
            });
            steps.push(DispatchStep {
                external_delta,
                initial_energy: current_energy,
                specific_value,
            });
            current_energy = target;
        }
        DispatchSchedule { steps }
    }

    /// Stored-value change per externally traded MWh: positive when charging gains
    /// value, negative when discharging loses it.
    fn specific_value(
        table: &WaterValues,
        period: Period,
        initial_energy: MegawattHours,
        final_energy: MegawattHours,
        external_delta: MegawattHours,
    ) -> Option<EuroPerMegawattHour> {
        (table.has_data() && external_delta != MegawattHours::ZERO).then(|| {
            let value_delta = table.value_at(period.end(), final_energy)
                - table.value_at(period.start(), initial_energy);
            value_delta / external_delta.abs()
        })
    }

    #[expect(clippy::cast_precision_loss)]
    pub fn index_to_energy(&self, index: usize) -> MegawattHours {
        MegawattHours(index as f64 * self.energy_resolution + self.lowest_energy)
    }

    /// Closest grid state for the given energy level.
    pub fn energy_to_index(&self, energy: MegawattHours) -> usize {
        self.nearest_index(energy)
    }

    fn nearest_index(&self, energy: MegawattHours) -> usize {
        self.grid_index((energy.0 / self.energy_resolution).round() * self.energy_resolution)
    }

    /// Next lower grid state for the given energy level.
    fn floor_index(&self, energy: MegawattHours) -> usize {
        let level =
            (energy.0 / self.energy_resolution + PRECISION_GUARD).floor() * self.energy_resolution;
        self.grid_index(level)
    }

    /// Next higher grid state for the given energy level.
    fn ceil_index(&self, energy: MegawattHours) -> usize {
        let level =
            (energy.0 / self.energy_resolution - PRECISION_GUARD).ceil() * self.energy_resolution;
        self.grid_index(level)
    }

    #[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn grid_index(&self, level: f64) -> usize {
        ((level - self.lowest_energy) / self.energy_resolution).round().max(0.0) as usize
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use chrono::{TimeDelta, TimeZone};

    use super::*;
    use crate::{forecast::PriceForecast, profile::Profile};

    fn starting_period() -> Period {
        let start = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
        Period::new(start, TimeDelta::hours(1)).unwrap()
    }

    fn device() -> StorageDevice {
        StorageDevice::builder()
            .charging_power(Profile::constant(2.0))
            .discharging_power(Profile::constant(2.0))
            .upper_energy_limit(Profile::constant(10.0))
            .lower_energy_limit(Profile::constant(0.0))
            .current_energy(MegawattHours(4.0))
            .build()
    }

    fn assessment() -> Assessment {
        Assessment::Cost {
            prices: [(starting_period().start(), EuroPerMegawattHour(50.0))]
                .into_iter()
                .collect::<PriceForecast>(),
        }
    }

    fn states<'a>(device: &'a StorageDevice, assessment: &'a Assessment) -> StorageStates<'a> {
        StorageStates::builder()
            .device(device)
            .assessment(assessment)
            .starting_period(starting_period())
            .planning_horizon_hours(12.0)
            .energy_resolution(MegawattHours(0.5))
            .build()
            .unwrap()
    }

    #[test]
    fn test_state_space_covers_feasible_bounds() {
        let (device, assessment) = (device(), assessment());
        let states = states(&device, &assessment);
        assert_eq!(states.step_count(), 12);
        assert_eq!(states.state_count(), 21);
        assert_eq!(states.index_to_energy(0), MegawattHours(0.0));
        assert_eq!(states.index_to_energy(20), MegawattHours(10.0));
    }

    #[test]
    fn test_index_energy_round_trip_within_one_resolution_step() {
        let (device, assessment) = (device(), assessment());
        let states = states(&device, &assessment);
        for energy in [0.0, 0.2, 1.7, 4.99, 9.75, 10.0] {
            let round_tripped =
                states.index_to_energy(states.energy_to_index(MegawattHours(energy)));
            assert!(
                (round_tripped.0 - energy).abs() <= 0.5,
                "{energy} MWh round-tripped to {round_tripped}",
            );
        }
    }

    #[test]
    fn test_initial_states_are_the_feasible_bounds() {
        let (device, assessment) = (device(), assessment());
        let states = states(&device, &assessment);
        assert_eq!(states.initial_states(starting_period()), [0, 20]);
    }

    #[test]
    fn test_final_states_follow_power_limits() {
        let (device, assessment) = (device(), assessment());
        let states = states(&device, &assessment);
        // 2 MW for one hour moves the content by at most 2 MWh, i.e. 4 grid steps.
        assert_eq!(states.final_states(starting_period(), 8), 4..=12);
        // Close to the upper limit, the range is clipped by the energy bounds.
        assert_eq!(states.final_states(starting_period(), 19), 15..=20);
    }

    #[test]
    fn test_transition_value_scales_with_external_delta() {
        let (device, assessment) = (device(), assessment());
        let states = states(&device, &assessment);
        // Charging by 1 MWh at 50 €/MWh.
        assert_abs_diff_eq!(
            states.transition_value(starting_period(), 8, 10).value(),
            50.0,
        );
        // The second period has no forecast entry and defaults to zero.
        assert_abs_diff_eq!(
            states.transition_value(starting_period().shift_by(1), 8, 10).value(),
            0.0,
        );
    }

    #[test]
    fn test_time_index_rejects_misaligned_periods() {
        let (device, assessment) = (device(), assessment());
        let states = states(&device, &assessment);
        let misaligned = Period::new(
            starting_period().start() + TimeDelta::minutes(30),
            TimeDelta::hours(1),
        )
        .unwrap();
        let error = states.time_index(misaligned).unwrap_err();
        assert!(error.to_string().contains("not aligned"));
        assert_eq!(states.time_index(starting_period().shift_by(3)).unwrap(), 3);
    }

    #[test]
    fn test_zero_horizon_has_no_states() {
        let (device, assessment) = (device(), assessment());
        let states = StorageStates::builder()
            .device(&device)
            .assessment(&assessment)
            .starting_period(starting_period())
            .planning_horizon_hours(0.0)
            .energy_resolution(MegawattHours(0.5))
            .build()
            .unwrap();
        assert_eq!(states.step_count(), 0);
        assert_eq!(states.state_count(), 0);
        assert!(states.planning_times().is_empty());
    }

    #[test]
    fn test_best_dispatch_follows_recorded_links() {
        let (device, assessment) = (device(), assessment());
        let states = states(&device, &assessment);
        let mut table = ValueTable::new(states.step_count(), states.state_count());
        // Current energy 4 MWh is state 8; send it up two grid steps, then hold.
        table.record(0, 8, 10, Euro::ZERO);
        let dispatch = states.best_dispatch(&table, 2, None);
        assert_eq!(dispatch.steps.len(), 2);
        assert_abs_diff_eq!(dispatch.steps[0].initial_energy.0, 4.0);
        assert_abs_diff_eq!(dispatch.steps[0].external_delta.0, 1.0);
        assert_abs_diff_eq!(dispatch.steps[1].initial_energy.0, 5.0);
        assert_abs_diff_eq!(dispatch.steps[1].external_delta.0, 0.0);
        assert!(dispatch.steps[0].specific_value.is_none());
    }

    #[test]
    fn test_best_dispatch_carries_specific_values() {
        let (device, assessment) = (device(), assessment());
        let states = states(&device, &assessment);
        let mut table = ValueTable::new(states.step_count(), states.state_count());
        table.record(0, 8, 10, Euro::ZERO);
        let water_values = WaterValues::new([
            (MegawattHours(0.0), Euro::ZERO),
            (MegawattHours(10.0), Euro::from(200.0)),
        ]);
        let dispatch = states.best_dispatch(&table, 1, Some(&water_values));
        // 1 MWh of charging gains 20 € of stored value.
        assert_abs_diff_eq!(dispatch.steps[0].specific_value.unwrap().0, 20.0);
    }
}
