pub mod charge_point;
pub mod meter_sample;
pub mod transaction;
pub mod user;

pub use charge_point::ChargePoint;
pub use meter_sample::MeterSample;
pub use transaction::Transaction;
pub use user::ChargingUser;
