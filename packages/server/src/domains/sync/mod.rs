//! Change detection over the external store: the reconciliation loop that
//! turns point-in-time transaction snapshots into lifecycle notifications.

pub mod cache;
pub mod classification;
pub mod poller;

pub use cache::{CacheEntry, TransactionStateCache};
pub use classification::{classify, Classification};
pub use poller::{Reconciler, SyncConfig, SyncScheduler, SyncStatus};
