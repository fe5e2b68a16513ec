// EVCS Notification Backend - API Core
//
// Watches charging-session transactions in an external SteVe (OCPP) store,
// classifies lifecycle transitions, and pushes notifications to users while
// journaling START/STOP events in the local store.

pub mod common;
pub mod config;
pub mod domains;
pub mod kernel;
pub mod server;

pub use config::*;
