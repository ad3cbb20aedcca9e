use comfy_table::{Attribute, Cell, CellAlignment, Color, Table, modifiers, presets};

use crate::{
    dispatch::{BidSchedule, DispatchSchedule},
    forecast::PriceForecast,
    period::Period,
    quantity::MegawattHours,
};

fn new_table() -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED).apply_modifier(modifiers::UTF8_ROUND_CORNERS);
    table.enforce_styling();
    table
}

fn direction_color(energy: MegawattHours) -> Color {
    if energy > MegawattHours::ZERO {
        // Purchasing.
        Color::Red
    } else if energy < MegawattHours::ZERO {
        // Selling.
        Color::Green
    } else {
        Color::Reset
    }
}

pub fn build_dispatch_table(dispatch: &DispatchSchedule, starting_period: Period) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Start", "Energy before", "Grid delta", "Specific value"]);
    for (step, entry) in dispatch.steps.iter().enumerate() {
        #[expect(clippy::cast_possible_wrap)]
        let period = starting_period.shift_by(step as i64);
        table.add_row(vec![
            Cell::new(period.start().format("%Y-%m-%d %H:%M")),
            Cell::new(entry.initial_energy).set_alignment(CellAlignment::Right),
            Cell::new(entry.external_delta)
                .set_alignment(CellAlignment::Right)
                .fg(direction_color(entry.external_delta)),
            match entry.specific_value {
                Some(value) => Cell::new(value).set_alignment(CellAlignment::Right),
                None => Cell::new("–").add_attribute(Attribute::Dim),
            },
        ]);
    }
    table
}

#[must_use]
pub fn build_bid_table(schedule: &BidSchedule) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Start", "Energy", "Price", "Expected energy"]);
    for (index, bid) in schedule.bids().iter().enumerate() {
        #[expect(clippy::cast_possible_wrap)]
        let period = schedule.starting_period().shift_by(index as i64);
        table.add_row(vec![
            Cell::new(period.start().format("%Y-%m-%d %H:%M")),
            Cell::new(bid.energy)
                .set_alignment(CellAlignment::Right)
                .fg(direction_color(bid.energy)),
            Cell::new(bid.price).set_alignment(CellAlignment::Right),
            Cell::new(bid.expected_initial_energy).set_alignment(CellAlignment::Right),
        ]);
    }
    table
}

#[must_use]
pub fn build_forecast_table(forecast: &PriceForecast) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Time", "Price"]);
    for (time, price) in forecast.iter() {
        table.add_row(vec![
            Cell::new(time.format("%Y-%m-%d %H:%M")),
            Cell::new(price).set_alignment(CellAlignment::Right),
        ]);
    }
    table
}
