use anyhow::Result;
use async_trait::async_trait;
use sqlx::MySqlPool;

use crate::domains::notifications::models::{NewTransactionEvent, TransactionEvent};
use crate::kernel::BaseEventJournal;

/// Event journal backed by the local `transaction_events` table.
pub struct SqlEventJournal {
    pool: MySqlPool,
}

impl SqlEventJournal {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BaseEventJournal for SqlEventJournal {
    async fn append(&self, event: NewTransactionEvent) -> Result<()> {
        TransactionEvent::insert(&event, &self.pool).await
    }
}
