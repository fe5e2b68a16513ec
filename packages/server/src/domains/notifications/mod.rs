//! Local notifications store: device tokens, the delivery log, and the
//! append-only transaction event journal, plus the push dispatcher that
//! fans one notification out to a user's devices.

pub mod dispatcher;
pub mod journal;
pub mod models;

pub use dispatcher::PushDispatcher;
pub use journal::SqlEventJournal;
