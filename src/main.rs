mod cli;
mod device;
mod dispatch;
mod forecast;
mod period;
mod prelude;
mod profile;
mod quantity;
mod render;
mod scenario;

use clap::Parser;

use crate::{
    cli::{Args, Command, PlanArgs},
    dispatch::{Optimiser, StorageStates},
    prelude::*,
    scenario::Scenario,
};

fn main() -> Result {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt().with_target(false).with_max_level(Level::INFO).init();

    match Args::parse().command {
        Command::Plan(args) => plan(&args),

        Command::Forecast(args) => {
            let scenario = Scenario::load(&args.scenario)?;
            let forecast = scenario.forecast();
            if forecast.is_empty() {
                warn!("the scenario has no price forecast");
            }
            println!("{}", render::build_forecast_table(&forecast));
            Ok(())
        }
    }
}

fn plan(args: &PlanArgs) -> Result {
    let scenario = Scenario::load(&args.scenario)?;
    let mut device = scenario.device()?;
    let assessment = scenario.assessment()?;
    let bid_scheduler = scenario.bid_scheduler()?;
    let water_values = scenario.water_values();
    let starting_period = scenario.starting_period()?;

    let states = StorageStates::builder()
        .device(&device)
        .assessment(&assessment)
        .starting_period(starting_period)
        .planning_horizon_hours(scenario.planning_horizon_hours())
        .energy_resolution(scenario.energy_resolution())
        .build()?;
    info!(
        steps = states.step_count(),
        states = states.state_count(),
        "initialised the state space",
    );

    let mut forecast = scenario.forecast();
    forecast.clear_before(starting_period.start());
    info!(n_prices = forecast.len(), "loaded the price forecast");
    let missing_times = forecast.missing_times(&states.planning_times());
    if !missing_times.is_empty() {
        warn!(
            n_missing = missing_times.len(),
            first = %missing_times[0],
            "some planning periods have no price forecast and price at zero",
        );
    }

    let optimiser = Optimiser::builder()
        .states(&states)
        .target(assessment.target())
        .bid_scheduler(&bid_scheduler)
        .maybe_water_values(water_values.has_data().then_some(&water_values))
        .build();
    let (dispatch, schedule) = optimiser.create_schedule()?;
    println!("{}", render::build_dispatch_table(&dispatch, starting_period));
    println!("{}", render::build_bid_table(&schedule));

    if let Some(path) = &args.output {
        std::fs::write(path, serde_json::to_string_pretty(&schedule)?)
            .with_context(|| format!("failed to write the bid schedule to `{}`", path.display()))?;
        info!(path = %path.display(), "wrote the bid schedule");
    }

    if args.settle {
        ensure!(
            schedule.is_applicable(starting_period.start(), device.current_energy()),
            "the bid schedule does not apply to the device's current state",
        );
        for (step, entry) in dispatch.steps.iter().enumerate() {
            #[expect(clippy::cast_possible_wrap)]
            let period = starting_period.shift_by(step as i64);
            device.transition(period.start(), entry.external_delta, period.duration());
        }
        info!(final_energy = %device.current_energy(), "settled the dispatch");
    }

    Ok(())
}
