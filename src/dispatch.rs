mod assessment;
mod bidding;
mod optimiser;
mod schedule;
mod states;
mod table;
mod water_value;

pub use self::{
    assessment::Assessment,
    bidding::{BidScheduler, MINIMAL_PRICE, SCARCITY_PRICE},
    optimiser::{Optimiser, Target},
    schedule::{Bid, BidSchedule, DispatchSchedule, DispatchStep},
    states::StorageStates,
    table::ValueTable,
    water_value::WaterValues,
};
