use async_trait::async_trait;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use std::sync::Arc;
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::{
    commands::{begin, commit, purchaseorders::lock_order, Command},
    db::DbPool,
    entities::{
        purchase_order::{self, PurchaseOrderStatus},
        purchase_order_line, receipt,
    },
    errors::ServiceError,
    events::{Event, EventSender},
};

/// Deletes an open order that has never been received against.
#[derive(Debug, Clone)]
pub struct CancelDraftPurchaseOrderCommand {
    pub order_id: Uuid,
    pub cancelled_by: Uuid,
}

#[async_trait]
impl Command for CancelDraftPurchaseOrderCommand {
    type Result = ();

    #[instrument(skip(self, db_pool, event_sender), fields(order_id = %self.order_id))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        let txn = begin(&db_pool).await?;
        let order = lock_order(&txn, self.order_id).await?;

        if order.is_voided {
            return Err(ServiceError::InvalidState(format!(
                "Purchase order {} is voided",
                order.id
            )));
        }
        if order.status != PurchaseOrderStatus::Open {
            return Err(ServiceError::InvalidState(format!(
                "Purchase order {} is {} and can no longer be cancelled",
                order.id, order.status
            )));
        }

        let receipts = receipt::Entity::find()
            .filter(receipt::Column::OrderId.eq(order.id))
            .count(&txn)
            .await?;
        if receipts > 0 {
            return Err(ServiceError::InvalidState(format!(
                "Purchase order {} has {} receipt(s); void it instead of cancelling",
                order.id, receipts
            )));
        }

        purchase_order_line::Entity::delete_many()
            .filter(purchase_order_line::Column::OrderId.eq(order.id))
            .exec(&txn)
            .await?;
        purchase_order::Entity::delete_by_id(order.id)
            .exec(&txn)
            .await
            .map_err(|e| {
                error!("Failed to delete purchase order {}: {}", order.id, e);
                ServiceError::StorageError(e)
            })?;
        commit(txn).await?;

        info!(
            purchase_order_id = %order.id,
            cancelled_by = %self.cancelled_by,
            "Draft purchase order cancelled"
        );
        event_sender
            .send_or_log(Event::PurchaseOrderDraftCancelled(order.id))
            .await;
        Ok(())
    }
}
