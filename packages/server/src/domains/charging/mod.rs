//! Read-only view of the external SteVe charge-point store.
//!
//! Nothing in this domain writes to the external database; it is owned by
//! the charge-point management system and we only observe it.

pub mod models;
pub mod store;

pub use store::SteveStore;
