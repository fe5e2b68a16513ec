pub mod charging;
pub mod notifications;
pub mod sync;
