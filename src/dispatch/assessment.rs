use crate::{
    dispatch::{optimiser::Target, water_value::WaterValues},
    forecast::PriceForecast,
    period::Period,
    quantity::{Euro, EuroPerMegawattHour, MegawattHours},
};

/// Economic value of a single state transition within one planning period.
///
/// A closed set of strategies, selected once at configuration time; each strategy
/// dictates its natural optimisation target. Periods without a forecast entry are
/// priced at zero.
pub enum Assessment {
    /// Procurement cost of the traded energy at the forecast price, assuming own
    /// bids do not move the market. To be minimised.
    Cost { prices: PriceForecast },

    /// Trading profit at the forecast price, assuming own bids do not move the
    /// market. To be maximised.
    Profit { prices: PriceForecast },

    /// Change of the stored-energy value over the transition. Summed along a
    /// trajectory this telescopes to the value of the terminal state, so it prices
    /// the horizon boundary without any market forecast. To be maximised.
    StoredValue { table: WaterValues },
}

impl Assessment {
    pub const fn target(&self) -> Target {
        match self {
            Self::Cost { .. } => Target::Minimise,
            Self::Profit { .. } | Self::StoredValue { .. } => Target::Maximise,
        }
    }

    /// Value of moving from `initial_energy` to `final_energy` during `period` while
    /// exchanging `external_delta` with the grid (positive: purchasing).
    pub fn transition_value(
        &self,
        period: Period,
        external_delta: MegawattHours,
        initial_energy: MegawattHours,
        final_energy: MegawattHours,
    ) -> Euro {
        match self {
            Self::Cost { prices } => external_delta * Self::price(prices, period),
            Self::Profit { prices } => -(external_delta * Self::price(prices, period)),
            Self::StoredValue { table } => {
                table.value_at(period.end(), final_energy)
                    - table.value_at(period.start(), initial_energy)
            }
        }
    }

    fn price(prices: &PriceForecast, period: Period) -> EuroPerMegawattHour {
        prices.price_at(period.start()).unwrap_or_default()
    }
}
