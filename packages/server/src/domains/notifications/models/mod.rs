pub mod device_token;
pub mod notification_log;
pub mod transaction_event;

pub use device_token::DeviceToken;
pub use notification_log::NotificationLog;
pub use transaction_event::{EventKind, NewTransactionEvent, TransactionEvent};
