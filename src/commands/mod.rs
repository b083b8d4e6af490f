use crate::{db::DbPool, errors::ServiceError, events::EventSender};
use async_trait::async_trait;
use std::sync::Arc;

/// A business operation that runs as one unit of work and publishes its
/// domain events once committed.
#[async_trait]
pub trait Command: Send + Sync {
    /// The return type of the command when executed successfully
    type Result;

    /// Execute the command with the given dependencies
    ///
    /// # Arguments
    /// * `db_pool` - Database connection pool for persistence operations
    /// * `event_sender` - Channel to publish domain events
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError>;
}

pub mod inventory;
pub mod purchaseorders;

use sea_orm::DatabaseTransaction;
use tracing::error;

pub(crate) async fn begin(pool: &DbPool) -> Result<DatabaseTransaction, ServiceError> {
    crate::db::begin_serializable(pool).await.map_err(|e| {
        error!("Failed to begin transaction: {}", e);
        ServiceError::StorageError(e)
    })
}

pub(crate) async fn commit(txn: DatabaseTransaction) -> Result<(), ServiceError> {
    txn.commit().await.map_err(|e| {
        error!("Failed to commit transaction: {}", e);
        ServiceError::StorageError(e)
    })
}
