use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, sync::Arc};
use tracing::instrument;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::{
    commands::{
        purchaseorders::{
            CancelDraftPurchaseOrderCommand, CreatePurchaseOrderCommand,
            CreatePurchaseOrderRequest, ReceivePurchaseOrderCommand, ReceivePurchaseOrderRequest,
            ReceivePurchaseOrderResult, VoidPurchaseOrderCommand, VoidPurchaseOrderRequest,
            VoidPurchaseOrderResult,
        },
        Command,
    },
    common::{Page, PaginationParams},
    config::DEFAULT_MAX_ORDER_LINES,
    db::DbPool,
    entities::purchase_order::{self, LifecycleState, PurchaseOrderStatus},
    errors::ServiceError,
    events::EventSender,
    services::{
        read_model::{self, PurchaseOrderSummary, PurchaseOrderView, ReceiptView},
        reconciler,
    },
};

/// Filters for listing purchase orders
#[derive(Debug, Clone, Default, Serialize, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct OrderListFilter {
    /// Lifecycle state: open, completed or voided
    pub status: Option<LifecycleState>,
    pub voided: Option<bool>,
    pub supplier_id: Option<Uuid>,
}

/// Purchase-order lifecycle: creation, draft cancellation, receiving,
/// voiding and the order read model.
#[derive(Clone)]
pub struct ProcurementService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    max_order_lines: usize,
}

impl ProcurementService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
            max_order_lines: DEFAULT_MAX_ORDER_LINES,
        }
    }

    pub fn with_max_order_lines(mut self, max_order_lines: usize) -> Self {
        self.max_order_lines = max_order_lines;
        self
    }

    /// Creates a new purchase order in the `open` state
    #[instrument(skip(self, request))]
    pub async fn create_order(
        &self,
        request: CreatePurchaseOrderRequest,
        created_by: Uuid,
    ) -> Result<PurchaseOrderView, ServiceError> {
        CreatePurchaseOrderCommand {
            request,
            created_by,
            max_lines: self.max_order_lines,
        }
        .execute(self.db_pool.clone(), self.event_sender.clone())
        .await
    }

    /// Deletes an open order with no receipts
    #[instrument(skip(self))]
    pub async fn cancel_draft(
        &self,
        order_id: Uuid,
        cancelled_by: Uuid,
    ) -> Result<(), ServiceError> {
        CancelDraftPurchaseOrderCommand {
            order_id,
            cancelled_by,
        }
        .execute(self.db_pool.clone(), self.event_sender.clone())
        .await
    }

    #[instrument(skip(self, request))]
    pub async fn receive(
        &self,
        order_id: Uuid,
        request: ReceivePurchaseOrderRequest,
        received_by: Uuid,
        idempotency_key: Option<String>,
    ) -> Result<ReceivePurchaseOrderResult, ServiceError> {
        ReceivePurchaseOrderCommand {
            order_id,
            request,
            received_by,
            idempotency_key,
        }
        .execute(self.db_pool.clone(), self.event_sender.clone())
        .await
    }

    #[instrument(skip(self, reason))]
    pub async fn void(
        &self,
        order_id: Uuid,
        reason: impl Into<String>,
        voided_by: Uuid,
        idempotency_key: Option<String>,
    ) -> Result<VoidPurchaseOrderResult, ServiceError> {
        VoidPurchaseOrderCommand {
            order_id,
            request: VoidPurchaseOrderRequest {
                reason: reason.into(),
            },
            voided_by,
            idempotency_key,
        }
        .execute(self.db_pool.clone(), self.event_sender.clone())
        .await
    }

    #[instrument(skip(self))]
    pub async fn get_order(&self, order_id: Uuid) -> Result<PurchaseOrderView, ServiceError> {
        read_model::order_view(&*self.db_pool, order_id).await
    }

    /// Orders matching `filter`, newest order date first.
    #[instrument(skip(self))]
    pub async fn list_orders(
        &self,
        filter: OrderListFilter,
        pagination: PaginationParams,
    ) -> Result<Page<PurchaseOrderSummary>, ServiceError> {
        let pagination = pagination.normalized();
        let mut query = purchase_order::Entity::find();

        if let Some(status) = filter.status {
            query = match status {
                LifecycleState::Open => query
                    .filter(purchase_order::Column::Status.eq(PurchaseOrderStatus::Open))
                    .filter(purchase_order::Column::IsVoided.eq(false)),
                LifecycleState::Completed => query
                    .filter(purchase_order::Column::Status.eq(PurchaseOrderStatus::Completed))
                    .filter(purchase_order::Column::IsVoided.eq(false)),
                LifecycleState::Voided => query.filter(purchase_order::Column::IsVoided.eq(true)),
            };
        }
        if let Some(voided) = filter.voided {
            query = query.filter(purchase_order::Column::IsVoided.eq(voided));
        }
        if let Some(supplier_id) = filter.supplier_id {
            query = query.filter(purchase_order::Column::SupplierId.eq(supplier_id));
        }

        let paginator = query
            .order_by_desc(purchase_order::Column::OrderDate)
            .order_by_desc(purchase_order::Column::CreatedAt)
            .paginate(&*self.db_pool, pagination.per_page);
        let total = paginator.num_items().await?;
        let orders = paginator.fetch_page(pagination.page_index()).await?;

        Ok(Page::new(
            orders.into_iter().map(PurchaseOrderSummary::from).collect(),
            pagination,
            total,
        ))
    }

    /// Remaining quantity per order line, derived from receipts.
    #[instrument(skip(self))]
    pub async fn remaining_map(
        &self,
        order_id: Uuid,
    ) -> Result<BTreeMap<Uuid, i64>, ServiceError> {
        let db = &*self.db_pool;
        read_model::find_order(db, order_id).await?;
        Ok(reconciler::load(db, order_id).await?.remaining_map())
    }

    #[instrument(skip(self))]
    pub async fn receipts_for(&self, order_id: Uuid) -> Result<Vec<ReceiptView>, ServiceError> {
        let db = &*self.db_pool;
        read_model::find_order(db, order_id).await?;
        read_model::receipt_views(db, order_id).await
    }
}
