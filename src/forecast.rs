use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::quantity::EuroPerMegawattHour;

/// Time-indexed electricity price forecast, queried by exact period start.
#[derive(Clone, Debug, Default)]
pub struct PriceForecast {
    prices: BTreeMap<DateTime<Utc>, EuroPerMegawattHour>,
}

impl PriceForecast {
    pub fn insert(&mut self, time: DateTime<Utc>, price: EuroPerMegawattHour) {
        self.prices.insert(time, price);
    }

    pub fn price_at(&self, time: DateTime<Utc>) -> Option<EuroPerMegawattHour> {
        self.prices.get(&time).copied()
    }

    /// Drop all entries before the given time. The caller must not purge entries
    /// still needed by a pending optimisation.
    pub fn clear_before(&mut self, time: DateTime<Utc>) {
        self.prices = self.prices.split_off(&time);
    }

    /// Planning times for which no forecast is available yet.
    pub fn missing_times(&self, planning_times: &[DateTime<Utc>]) -> Vec<DateTime<Utc>> {
        planning_times
            .iter()
            .copied()
            .filter(|time| !self.prices.contains_key(time))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (DateTime<Utc>, EuroPerMegawattHour)> + '_ {
        self.prices.iter().map(|(time, price)| (*time, *price))
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}

impl FromIterator<(DateTime<Utc>, EuroPerMegawattHour)> for PriceForecast {
    fn from_iter<I: IntoIterator<Item = (DateTime<Utc>, EuroPerMegawattHour)>>(iter: I) -> Self {
        let mut forecast = Self::default();
        for (time, price) in iter {
            forecast.insert(time, price);
        }
        forecast
    }
}
