pub mod cancel_draft_purchase_order_command;
pub mod create_purchase_order_command;
pub mod receive_purchase_order_command;
pub mod void_purchase_order_command;

pub use cancel_draft_purchase_order_command::CancelDraftPurchaseOrderCommand;
pub use create_purchase_order_command::{
    CreatePurchaseOrderCommand, CreatePurchaseOrderLine, CreatePurchaseOrderRequest,
    MAX_LINE_QUANTITY,
};
pub use receive_purchase_order_command::{
    ReceiveLineRequest, ReceivePurchaseOrderCommand, ReceivePurchaseOrderRequest,
    ReceivePurchaseOrderResult,
};
pub use void_purchase_order_command::{
    ReversedVariant, VoidPurchaseOrderCommand, VoidPurchaseOrderRequest, VoidPurchaseOrderResult,
};

use sea_orm::{DatabaseTransaction, EntityTrait};
use tracing::error;
use uuid::Uuid;

use crate::{db, entities::purchase_order, errors::ServiceError};

/// Loads the order header inside `txn`, holding a row lock where supported.
pub(crate) async fn lock_order(
    txn: &DatabaseTransaction,
    order_id: Uuid,
) -> Result<purchase_order::Model, ServiceError> {
    db::lock_for_update(purchase_order::Entity::find_by_id(order_id), txn)
        .one(txn)
        .await
        .map_err(|e| {
            error!("Failed to load purchase order {}: {}", order_id, e);
            ServiceError::StorageError(e)
        })?
        .ok_or_else(|| ServiceError::not_found("Purchase order", order_id))
}
