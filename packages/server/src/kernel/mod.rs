pub mod test_dependencies;
pub mod traits;

pub use traits::{
    BaseChargePointStore, BaseEventJournal, BasePushNotificationService, DeliverySummary,
};
