use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, DatabaseTransaction, EntityTrait, Set};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, sync::Arc};
use tracing::{error, info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    commands::{
        begin, commit,
        purchaseorders::{
            create_purchase_order_command::{validate_positive_quantity, validate_unit_cost},
            lock_order,
        },
        Command,
    },
    db::DbPool,
    entities::{
        idempotency_record::IdempotentOperation,
        purchase_order::{self, LifecycleState, PurchaseOrderStatus},
        purchase_order_line, receipt, receipt_line,
    },
    errors::{ServiceError, Violations},
    events::{Event, EventSender},
    services::{
        idempotency,
        ledger::{self, NewLedgerEntry},
        read_model::{self, ReceiptView},
        reconciler, reference_data,
    },
};

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct ReceiveLineRequest {
    pub order_line_id: Uuid,
    #[validate(custom = "validate_positive_quantity")]
    pub quantity_received: i64,
    #[validate(custom = "validate_unit_cost")]
    #[schema(value_type = String, example = "1000.00")]
    pub unit_cost: Decimal,
    /// Also record `unit_cost` as the variant's cost basis
    #[serde(default)]
    pub update_cost_basis: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct ReceivePurchaseOrderRequest {
    /// Defaults to today
    #[serde(default)]
    pub receipt_date: Option<NaiveDate>,
    #[validate(length(max = 1000, message = "must be at most 1000 characters"))]
    pub note: Option<String>,
    #[validate]
    pub lines: Vec<ReceiveLineRequest>,
}

/// Records one delivery against an order.
#[derive(Debug, Clone)]
pub struct ReceivePurchaseOrderCommand {
    pub order_id: Uuid,
    pub request: ReceivePurchaseOrderRequest,
    pub received_by: Uuid,
    pub idempotency_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReceivePurchaseOrderResult {
    pub receipt: ReceiptView,
    pub order_status: LifecycleState,
    /// Remaining quantity per order line after this receipt
    pub remaining: BTreeMap<Uuid, i64>,
    /// True when this receipt completed the order
    pub completed_order: bool,
    /// True when the result was replayed for a repeated idempotency key
    pub replayed: bool,
}

#[async_trait]
impl Command for ReceivePurchaseOrderCommand {
    type Result = ReceivePurchaseOrderResult;

    #[instrument(skip(self, db_pool, event_sender), fields(order_id = %self.order_id, received_by = %self.received_by))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        self.validate_request()?;

        let txn = begin(&db_pool).await?;

        if let Some(key) = &self.idempotency_key {
            if let Some(record) =
                idempotency::lookup(&txn, key, IdempotentOperation::Receive, self.order_id).await?
            {
                let receipt_id = record.receipt_id.ok_or_else(|| {
                    ServiceError::InternalError(format!(
                        "idempotency record '{}' has no receipt",
                        key
                    ))
                })?;
                info!(receipt_id = %receipt_id, "Replaying receipt for repeated idempotency key");
                let result = replay(&txn, self.order_id, receipt_id).await?;
                commit(txn).await?;
                return Ok(result);
            }
        }

        let order = lock_order(&txn, self.order_id).await?;
        if order.is_voided {
            return Err(ServiceError::InvalidState(format!(
                "Purchase order {} is voided",
                order.id
            )));
        }

        let lines = reconciler::order_lines(&txn, order.id).await?;
        let mut receipt_lines = reconciler::receipt_lines_for_order(&txn, order.id).await?;
        let requested: Vec<(Uuid, i64)> = self
            .request
            .lines
            .iter()
            .map(|l| (l.order_line_id, l.quantity_received))
            .collect();
        reconciler::reconcile(&lines, &receipt_lines).check_receipt(order.id, &requested)?;

        let (header, new_lines) = self.insert_receipt(&txn, &order, &lines).await?;
        receipt_lines.extend(new_lines.iter().cloned());

        let after = reconciler::reconcile(&lines, &receipt_lines);
        let completed_order =
            order.status == PurchaseOrderStatus::Open && after.is_fully_received();
        let order_status = if completed_order {
            mark_completed(&txn, order).await?;
            LifecycleState::Completed
        } else {
            order.lifecycle_state()
        };

        if let Some(key) = &self.idempotency_key {
            idempotency::remember(
                &txn,
                key,
                IdempotentOperation::Receive,
                self.order_id,
                Some(header.id),
            )
            .await?;
        }

        commit(txn).await?;

        let receipt = ReceiptView::assemble(header, new_lines);
        info!(
            receipt_id = %receipt.id,
            quantity = receipt.total_quantity(),
            completed_order,
            "Goods received"
        );

        event_sender
            .send_or_log(Event::GoodsReceived {
                order_id: self.order_id,
                receipt_id: receipt.id,
                total_quantity: receipt.total_quantity(),
            })
            .await;
        if completed_order {
            event_sender
                .send_or_log(Event::PurchaseOrderCompleted(self.order_id))
                .await;
        }

        Ok(ReceivePurchaseOrderResult {
            receipt,
            order_status,
            remaining: after.remaining_map(),
            completed_order,
            replayed: false,
        })
    }
}

impl ReceivePurchaseOrderCommand {
    fn validate_request(&self) -> Result<(), ServiceError> {
        let mut violations = match self.request.validate() {
            Ok(()) => Violations::new(),
            Err(errors) => Violations::from(errors),
        };
        if self.request.lines.is_empty() {
            violations.push("lines", "at least one line is required");
        }
        violations.into_result()?;

        if let Some(key) = &self.idempotency_key {
            idempotency::validate_key(key)?;
        }
        Ok(())
    }

    async fn insert_receipt(
        &self,
        txn: &DatabaseTransaction,
        order: &purchase_order::Model,
        order_lines: &[purchase_order_line::Model],
    ) -> Result<(receipt::Model, Vec<receipt_line::Model>), ServiceError> {
        let receipt_id = Uuid::new_v4();
        let header = receipt::ActiveModel {
            id: Set(receipt_id),
            order_id: Set(order.id),
            receipt_date: Set(self
                .request
                .receipt_date
                .unwrap_or_else(|| Utc::now().date_naive())),
            note: Set(self.request.note.clone()),
            received_by: Set(self.received_by),
            created_at: Set(Utc::now()),
        }
        .insert(txn)
        .await
        .map_err(|e| {
            error!("Failed to insert receipt for purchase order {}: {}", order.id, e);
            ServiceError::StorageError(e)
        })?;

        let mut lines = Vec::with_capacity(self.request.lines.len());
        for requested in &self.request.lines {
            // check_receipt already rejected unknown lines
            let Some(order_line) = order_lines.iter().find(|l| l.id == requested.order_line_id)
            else {
                return Err(ServiceError::not_found("Order line", requested.order_line_id));
            };
            lines.push(receipt_line::Model {
                id: Uuid::new_v4(),
                receipt_id,
                order_line_id: order_line.id,
                product_id: order_line.product_id,
                size_id: order_line.size_id,
                quantity_received: requested.quantity_received,
                unit_cost: requested.unit_cost,
                update_cost_basis: requested.update_cost_basis,
            });
        }

        let active: Vec<receipt_line::ActiveModel> = lines
            .iter()
            .map(|l| receipt_line::ActiveModel {
                id: Set(l.id),
                receipt_id: Set(l.receipt_id),
                order_line_id: Set(l.order_line_id),
                product_id: Set(l.product_id),
                size_id: Set(l.size_id),
                quantity_received: Set(l.quantity_received),
                unit_cost: Set(l.unit_cost),
                update_cost_basis: Set(l.update_cost_basis),
            })
            .collect();
        receipt_line::Entity::insert_many(active)
            .exec(txn)
            .await
            .map_err(|e| {
                error!("Failed to insert receipt lines for receipt {}: {}", receipt_id, e);
                ServiceError::StorageError(e)
            })?;

        ledger::append(
            txn,
            lines
                .iter()
                .map(|l| {
                    NewLedgerEntry::purchase_receipt(
                        l.variant(),
                        l.quantity_received,
                        receipt_id,
                        order.supplier_id,
                        self.received_by,
                    )
                })
                .collect(),
        )
        .await?;

        for line in lines.iter().filter(|l| l.update_cost_basis) {
            reference_data::update_cost_basis(txn, line.variant(), line.unit_cost, receipt_id)
                .await?;
        }

        Ok((header, lines))
    }
}

async fn mark_completed(
    txn: &DatabaseTransaction,
    order: purchase_order::Model,
) -> Result<(), ServiceError> {
    let order_id = order.id;
    let mut active: purchase_order::ActiveModel = order.into();
    active.status = Set(PurchaseOrderStatus::Completed);
    active.updated_at = Set(Utc::now());
    active.update(txn).await.map_err(|e| {
        error!("Failed to complete purchase order {}: {}", order_id, e);
        ServiceError::StorageError(e)
    })?;
    info!(purchase_order_id = %order_id, "Purchase order fully received");
    Ok(())
}

async fn replay(
    txn: &DatabaseTransaction,
    order_id: Uuid,
    receipt_id: Uuid,
) -> Result<ReceivePurchaseOrderResult, ServiceError> {
    let receipt = read_model::receipt_view(txn, receipt_id).await?;
    let order = read_model::find_order(txn, order_id).await?;
    let remaining = reconciler::load(txn, order_id).await?.remaining_map();
    Ok(ReceivePurchaseOrderResult {
        receipt,
        order_status: order.lifecycle_state(),
        remaining,
        completed_order: false,
        replayed: true,
    })
}
