// HTTP routes
pub mod charging;
pub mod health;
pub mod notifications;
pub mod polling;

pub use charging::*;
pub use health::*;
pub use notifications::*;
pub use polling::*;
