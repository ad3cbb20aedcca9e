mod energy;
mod money;
mod power;
mod price;

pub use self::{
    energy::MegawattHours,
    money::Euro,
    power::Megawatts,
    price::EuroPerMegawattHour,
};
