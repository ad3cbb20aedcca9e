use chrono::{DateTime, TimeDelta, Utc};

use crate::{
    prelude::*,
    profile::Profile,
    quantity::{MegawattHours, Megawatts},
};

/// Absolute tolerance when checking power and energy limits of actual transitions.
const LIMIT_TOLERANCE: f64 = 1e-3;

/// A flexible energy device: storage, reservoir with inflow, shiftable demand, etc.
///
/// All queries are pure functions of time; only [`StorageDevice::transition`] mutates
/// the actual energy content. Positive external energy deltas correspond to charging,
/// negative ones to discharging.
#[derive(bon::Builder)]
pub struct StorageDevice {
    /// External charging power limit in MW.
    charging_power: Profile,

    /// External discharging power limit in MW.
    discharging_power: Profile,

    #[builder(default = Profile::constant(1.0))]
    charging_efficiency: Profile,

    #[builder(default = Profile::constant(1.0))]
    discharging_efficiency: Profile,

    /// Upper internal energy limit in MWh; may be negative.
    upper_energy_limit: Profile,

    /// Lower internal energy limit in MWh; may be negative.
    lower_energy_limit: Profile,

    /// Relative energy loss per hour, compounding over longer durations.
    #[builder(default = Profile::constant(0.0))]
    self_discharge_rate: Profile,

    /// Net external inflow (e.g. river inflow of a reservoir) in MW.
    #[builder(default = Profile::constant(0.0))]
    net_inflow_power: Profile,

    #[builder(default = MegawattHours::ZERO)]
    current_energy: MegawattHours,
}

impl StorageDevice {
    pub fn lower_energy_limit(&self, time: DateTime<Utc>) -> MegawattHours {
        MegawattHours(self.lower_energy_limit.value_at(time))
    }

    pub fn upper_energy_limit(&self, time: DateTime<Utc>) -> MegawattHours {
        MegawattHours(self.upper_energy_limit.value_at(time))
    }

    pub const fn current_energy(&self) -> MegawattHours {
        self.current_energy
    }

    /// Highest internal energy reachable from the given initial content by charging
    /// at full power for the whole duration, capped at the upper energy limit.
    pub fn max_target_energy(
        &self,
        time: DateTime<Utc>,
        initial_energy: MegawattHours,
        duration: TimeDelta,
    ) -> MegawattHours {
        let charging = Megawatts(
            self.net_inflow_power.value_at(time)
                + self.charging_power.value_at(time) * self.charging_efficiency.value_at(time),
        );
        let target = initial_energy * (1.0 - self.self_discharge_factor(time, duration))
            + charging * duration;
        target.min(self.upper_energy_limit(time))
    }

    /// Lowest internal energy reachable from the given initial content by
    /// discharging at full power for the whole duration, capped at the lower limit.
    pub fn min_target_energy(
        &self,
        time: DateTime<Utc>,
        initial_energy: MegawattHours,
        duration: TimeDelta,
    ) -> MegawattHours {
        let discharging = Megawatts(
            self.net_inflow_power.value_at(time)
                - self.discharging_power.value_at(time) / self.discharging_efficiency.value_at(time),
        );
        let target = initial_energy * (1.0 - self.self_discharge_factor(time, duration))
            + discharging * duration;
        target.max(self.lower_energy_limit(time))
    }

    /// Effective relative self-discharge loss over the given duration.
    fn self_discharge_factor(&self, time: DateTime<Utc>, duration: TimeDelta) -> f64 {
        let hours = duration.as_seconds_f64() / 3600.0;
        1.0 - (1.0 - self.self_discharge_rate.value_at(time)).powf(hours)
    }

    /// External energy delta required to move the internal energy content from
    /// `initial_energy` to `target_energy` over the given duration. Does **not**
    /// enforce power or energy limits.
    pub fn simulate_transition(
        &self,
        time: DateTime<Utc>,
        initial_energy: MegawattHours,
        target_energy: MegawattHours,
        duration: TimeDelta,
    ) -> MegawattHours {
        let self_discharge_loss = initial_energy * self.self_discharge_factor(time, duration);
        let inflow = Megawatts(self.net_inflow_power.value_at(time)) * duration;
        let internal_delta = target_energy - initial_energy - inflow + self_discharge_loss;
        self.internal_to_external(time, internal_delta)
    }

    fn internal_to_external(
        &self,
        time: DateTime<Utc>,
        internal_delta: MegawattHours,
    ) -> MegawattHours {
        if internal_delta > MegawattHours::ZERO {
            internal_delta / self.charging_efficiency.value_at(time)
        } else {
            internal_delta * self.discharging_efficiency.value_at(time)
        }
    }

    fn external_to_internal(
        &self,
        time: DateTime<Utc>,
        external_delta: MegawattHours,
    ) -> MegawattHours {
        if external_delta > MegawattHours::ZERO {
            external_delta * self.charging_efficiency.value_at(time)
        } else {
            external_delta / self.discharging_efficiency.value_at(time)
        }
    }

    /// Apply an external energy delta to the device's actual state. Limit violations
    /// are logged and clamped; the returned value is the actually applied external
    /// energy delta.
    pub fn transition(
        &mut self,
        time: DateTime<Utc>,
        external_delta: MegawattHours,
        duration: TimeDelta,
    ) -> MegawattHours {
        let hours = duration.as_seconds_f64() / 3600.0;
        let internal_delta = self.external_to_internal(time, external_delta);
        let internal_power = self.clamp_power(time, Megawatts(internal_delta.0 / hours));
        let net_charging = (internal_power + Megawatts(self.net_inflow_power.value_at(time)))
            * duration;
        let self_discharge_rate = self.self_discharge_factor(time, duration);
        let self_discharge_loss = self.current_energy * self_discharge_rate;
        let target = self.clamp_energy(time, self.current_energy + net_charging - self_discharge_loss);
        if self.current_energy < MegawattHours::ZERO && self_discharge_rate > 0.0 {
            error!(time = %time, "self-discharge on negative energy content");
        }
        let inflow = Megawatts(self.net_inflow_power.value_at(time)) * duration;
        let applied_internal_delta = target - self.current_energy + self_discharge_loss - inflow;
        self.current_energy = target;
        self.internal_to_external(time, applied_internal_delta)
    }

    fn clamp_power(&self, time: DateTime<Utc>, power: Megawatts) -> Megawatts {
        let charging_limit = self.charging_power.value_at(time);
        let discharging_limit = self.discharging_power.value_at(time);
        if power.0 > charging_limit + LIMIT_TOLERANCE {
            error!(
                time = %time,
                excess_mw = power.0 - charging_limit,
                "charging power limit exceeded",
            );
            Megawatts(charging_limit)
        } else if power.0 < -discharging_limit - LIMIT_TOLERANCE {
            error!(
                time = %time,
                excess_mw = -discharging_limit - power.0,
                "discharging power limit exceeded",
            );
            Megawatts(-discharging_limit)
        } else {
            power
        }
    }

    fn clamp_energy(&self, time: DateTime<Utc>, energy: MegawattHours) -> MegawattHours {
        let upper = self.upper_energy_limit(time);
        let lower = self.lower_energy_limit(time);
        if energy > upper + MegawattHours(LIMIT_TOLERANCE) {
            error!(time = %time, excess_mwh = (energy - upper).0, "upper energy limit exceeded");
            upper
        } else if energy < lower - MegawattHours(LIMIT_TOLERANCE) {
            error!(time = %time, excess_mwh = (lower - energy).0, "lower energy limit exceeded");
            lower
        } else {
            energy
        }
    }
}
