use std::path::Path;

use chrono::{DateTime, TimeDelta, Utc};

use crate::{
    device::StorageDevice,
    dispatch::{Assessment, BidScheduler, WaterValues},
    forecast::PriceForecast,
    period::Period,
    prelude::*,
    profile::Profile,
    quantity::{Euro, EuroPerMegawattHour, MegawattHours},
};

/// A planning scenario loaded from a TOML file: the planning grid, the device, the
/// forecast data, and the strategy selection for assessment and bidding.
#[derive(serde::Deserialize)]
pub struct Scenario {
    /// Start of the first planning period, RFC 3339.
    start: DateTime<Utc>,

    period_minutes: i64,
    planning_horizon_hours: f64,
    energy_resolution_mwh: f64,

    assessment: AssessmentConfig,
    bidding: BiddingConfig,
    device: DeviceConfig,

    #[serde(default)]
    forecast: Vec<ForecastEntry>,

    #[serde(default)]
    water_values: Vec<WaterValueSample>,
}

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
enum AssessmentConfig {
    Cost,
    Profit,
    StoredValue,
}

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
enum BiddingConfig {
    EnsureDispatch { scheduling_horizon_hours: f64 },
    WaterValue { scheduling_horizon_hours: f64 },
}

#[derive(serde::Deserialize)]
struct DeviceConfig {
    charging_power_mw: ProfileValues,
    discharging_power_mw: ProfileValues,
    upper_energy_limit_mwh: ProfileValues,
    lower_energy_limit_mwh: ProfileValues,
    charging_efficiency: Option<ProfileValues>,
    discharging_efficiency: Option<ProfileValues>,
    self_discharge_rate_per_hour: Option<ProfileValues>,
    net_inflow_power_mw: Option<ProfileValues>,

    #[serde(default)]
    initial_energy_mwh: f64,
}

/// Either a constant or a list of time-value points.
#[derive(serde::Deserialize)]
#[serde(untagged)]
enum ProfileValues {
    Constant(f64),
    Points(Vec<ProfilePoint>),
}

#[derive(serde::Deserialize)]
struct ProfilePoint {
    time: DateTime<Utc>,
    value: f64,
}

impl ProfileValues {
    fn to_profile(&self) -> Result<Profile> {
        match self {
            Self::Constant(value) => Ok(Profile::constant(*value)),
            Self::Points(points) => Profile::try_from_points(
                points.iter().map(|point| (point.time, point.value)).collect(),
            ),
        }
    }
}

#[derive(serde::Deserialize)]
struct ForecastEntry {
    time: DateTime<Utc>,
    price: EuroPerMegawattHour,
}

#[derive(serde::Deserialize)]
struct WaterValueSample {
    energy: MegawattHours,
    value: f64,
}

impl Scenario {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read the scenario from `{}`", path.display()))?;
        toml::from_str(&raw)
            .with_context(|| format!("failed to parse the scenario `{}`", path.display()))
    }

    pub fn starting_period(&self) -> Result<Period> {
        Period::new(self.start, TimeDelta::minutes(self.period_minutes))
    }

    pub const fn planning_horizon_hours(&self) -> f64 {
        self.planning_horizon_hours
    }

    pub const fn energy_resolution(&self) -> MegawattHours {
        MegawattHours(self.energy_resolution_mwh)
    }

    pub fn device(&self) -> Result<StorageDevice> {
        let device = &self.device;
        Ok(StorageDevice::builder()
            .charging_power(device.charging_power_mw.to_profile()?)
            .discharging_power(device.discharging_power_mw.to_profile()?)
            .upper_energy_limit(device.upper_energy_limit_mwh.to_profile()?)
            .lower_energy_limit(device.lower_energy_limit_mwh.to_profile()?)
            .maybe_charging_efficiency(Self::optional_profile(&device.charging_efficiency)?)
            .maybe_discharging_efficiency(Self::optional_profile(&device.discharging_efficiency)?)
            .maybe_self_discharge_rate(Self::optional_profile(&device.self_discharge_rate_per_hour)?)
            .maybe_net_inflow_power(Self::optional_profile(&device.net_inflow_power_mw)?)
            .current_energy(MegawattHours(device.initial_energy_mwh))
            .build())
    }

    fn optional_profile(values: &Option<ProfileValues>) -> Result<Option<Profile>> {
        values.as_ref().map(ProfileValues::to_profile).transpose()
    }

    pub fn forecast(&self) -> PriceForecast {
        self.forecast.iter().map(|entry| (entry.time, entry.price)).collect()
    }

    pub fn water_values(&self) -> WaterValues {
        WaterValues::new(
            self.water_values
                .iter()
                .map(|sample| (sample.energy, Euro::from(sample.value))),
        )
    }

    pub fn assessment(&self) -> Result<Assessment> {
        match self.assessment {
            AssessmentConfig::Cost => Ok(Assessment::Cost { prices: self.forecast() }),
            AssessmentConfig::Profit => Ok(Assessment::Profit { prices: self.forecast() }),
            AssessmentConfig::StoredValue => {
                let table = self.water_values();
                ensure!(
                    table.has_data(),
                    "the stored-value assessment requires water value samples, but the scenario \
                     provides none",
                );
                Ok(Assessment::StoredValue { table })
            }
        }
    }

    pub fn bid_scheduler(&self) -> Result<BidScheduler> {
        match self.bidding {
            BiddingConfig::EnsureDispatch { scheduling_horizon_hours } => {
                Ok(BidScheduler::EnsureDispatch { scheduling_horizon_hours })
            }
            BiddingConfig::WaterValue { scheduling_horizon_hours } => {
                ensure!(
                    !self.water_values.is_empty(),
                    "the water-value bidding policy requires water value samples, but the \
                     scenario provides none",
                );
                Ok(BidScheduler::WaterValueBids { scheduling_horizon_hours })
            }
        }
    }
}
