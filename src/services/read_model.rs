//! Response shapes for orders, receipts and ledger history, and the loaders
//! that assemble them.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    common::{OriginReference, Variant},
    entities::{
        ledger_entry::{self, MovementType},
        purchase_order::{self, LifecycleState, PurchaseOrderStatus},
        purchase_order_line, receipt, receipt_line,
    },
    errors::ServiceError,
    services::reconciler::{self, Reconciliation},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct OrderLineView {
    pub id: Uuid,
    pub line_number: i32,
    pub product_id: Uuid,
    pub size_id: Uuid,
    pub scoping_unit_id: Option<Uuid>,
    pub ordered_quantity: i64,
    #[schema(value_type = String, example = "1000.00")]
    pub unit_cost: Decimal,
    pub received_quantity: i64,
    pub remaining_quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PurchaseOrderView {
    pub id: Uuid,
    pub supplier_id: Uuid,
    pub order_date: NaiveDate,
    pub external_reference: Option<String>,
    /// `open`, `completed` or `voided`
    pub status: LifecycleState,
    /// Fulfillment status before any void
    pub fulfillment_status: PurchaseOrderStatus,
    pub is_voided: bool,
    pub void_reason: Option<String>,
    pub voided_at: Option<DateTime<Utc>>,
    pub voided_by: Option<Uuid>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub lines: Vec<OrderLineView>,
}

impl PurchaseOrderView {
    pub fn assemble(
        order: purchase_order::Model,
        lines: &[purchase_order_line::Model],
        reconciliation: &Reconciliation,
    ) -> Self {
        let lines = lines
            .iter()
            .map(|line| {
                let (received, remaining) = reconciliation
                    .line(line.id)
                    .map(|p| (p.received_quantity, p.remaining_quantity))
                    .unwrap_or((0, line.ordered_quantity));
                OrderLineView {
                    id: line.id,
                    line_number: line.line_number,
                    product_id: line.product_id,
                    size_id: line.size_id,
                    scoping_unit_id: line.scoping_unit_id,
                    ordered_quantity: line.ordered_quantity,
                    unit_cost: line.unit_cost,
                    received_quantity: received,
                    remaining_quantity: remaining,
                }
            })
            .collect();

        Self {
            id: order.id,
            supplier_id: order.supplier_id,
            order_date: order.order_date,
            status: order.lifecycle_state(),
            fulfillment_status: order.status,
            external_reference: order.external_reference,
            is_voided: order.is_voided,
            void_reason: order.void_reason,
            voided_at: order.voided_at,
            voided_by: order.voided_by,
            created_by: order.created_by,
            created_at: order.created_at,
            updated_at: order.updated_at,
            lines,
        }
    }
}

/// Order header without lines, used by listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PurchaseOrderSummary {
    pub id: Uuid,
    pub supplier_id: Uuid,
    pub order_date: NaiveDate,
    pub external_reference: Option<String>,
    pub status: LifecycleState,
    pub is_voided: bool,
    pub void_reason: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

impl From<purchase_order::Model> for PurchaseOrderSummary {
    fn from(order: purchase_order::Model) -> Self {
        Self {
            status: order.lifecycle_state(),
            id: order.id,
            supplier_id: order.supplier_id,
            order_date: order.order_date,
            external_reference: order.external_reference,
            is_voided: order.is_voided,
            void_reason: order.void_reason,
            created_by: order.created_by,
            created_at: order.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ReceiptLineView {
    pub id: Uuid,
    pub order_line_id: Uuid,
    pub product_id: Uuid,
    pub size_id: Uuid,
    pub quantity_received: i64,
    #[schema(value_type = String, example = "1000.00")]
    pub unit_cost: Decimal,
    pub update_cost_basis: bool,
}

impl From<receipt_line::Model> for ReceiptLineView {
    fn from(line: receipt_line::Model) -> Self {
        Self {
            id: line.id,
            order_line_id: line.order_line_id,
            product_id: line.product_id,
            size_id: line.size_id,
            quantity_received: line.quantity_received,
            unit_cost: line.unit_cost,
            update_cost_basis: line.update_cost_basis,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ReceiptView {
    pub id: Uuid,
    pub order_id: Uuid,
    pub receipt_date: NaiveDate,
    pub note: Option<String>,
    pub received_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub lines: Vec<ReceiptLineView>,
}

impl ReceiptView {
    pub fn assemble(header: receipt::Model, lines: Vec<receipt_line::Model>) -> Self {
        Self {
            id: header.id,
            order_id: header.order_id,
            receipt_date: header.receipt_date,
            note: header.note,
            received_by: header.received_by,
            created_at: header.created_at,
            lines: lines.into_iter().map(ReceiptLineView::from).collect(),
        }
    }

    pub fn total_quantity(&self) -> i64 {
        self.lines.iter().map(|l| l.quantity_received).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct LedgerEntryView {
    pub id: Uuid,
    pub variant: Variant,
    pub quantity_delta: i64,
    pub movement_type: MovementType,
    pub origin: OriginReference,
    pub supplier_id: Option<Uuid>,
    pub note: Option<String>,
    pub recorded_by: Option<Uuid>,
    pub recorded_at: DateTime<Utc>,
}

impl From<ledger_entry::Model> for LedgerEntryView {
    fn from(entry: ledger_entry::Model) -> Self {
        Self {
            id: entry.id,
            variant: entry.variant(),
            origin: entry.origin(),
            quantity_delta: entry.quantity_delta,
            movement_type: entry.movement_type,
            supplier_id: entry.supplier_id,
            note: entry.note,
            recorded_by: entry.recorded_by,
            recorded_at: entry.recorded_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct VariantBalance {
    pub variant: Variant,
    pub balance: i64,
}

pub async fn find_order<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
) -> Result<purchase_order::Model, ServiceError> {
    purchase_order::Entity::find_by_id(order_id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::not_found("Purchase order", order_id))
}

pub async fn order_view<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
) -> Result<PurchaseOrderView, ServiceError> {
    let order = find_order(conn, order_id).await?;
    let lines = reconciler::order_lines(conn, order_id).await?;
    let receipt_lines = reconciler::receipt_lines_for_order(conn, order_id).await?;
    let reconciliation = reconciler::reconcile(&lines, &receipt_lines);
    Ok(PurchaseOrderView::assemble(order, &lines, &reconciliation))
}

/// Receipts of an order with their lines, oldest first.
pub async fn receipt_views<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
) -> Result<Vec<ReceiptView>, ServiceError> {
    let headers = receipt::Entity::find()
        .filter(receipt::Column::OrderId.eq(order_id))
        .order_by_asc(receipt::Column::CreatedAt)
        .all(conn)
        .await?;
    if headers.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<Uuid> = headers.iter().map(|h| h.id).collect();
    let mut by_receipt: HashMap<Uuid, Vec<receipt_line::Model>> = HashMap::new();
    for line in receipt_line::Entity::find()
        .filter(receipt_line::Column::ReceiptId.is_in(ids))
        .all(conn)
        .await?
    {
        by_receipt.entry(line.receipt_id).or_default().push(line);
    }

    Ok(headers
        .into_iter()
        .map(|header| {
            let lines = by_receipt.remove(&header.id).unwrap_or_default();
            ReceiptView::assemble(header, lines)
        })
        .collect())
}

pub async fn receipt_view<C: ConnectionTrait>(
    conn: &C,
    receipt_id: Uuid,
) -> Result<ReceiptView, ServiceError> {
    let header = receipt::Entity::find_by_id(receipt_id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::not_found("Receipt", receipt_id))?;
    let lines = receipt_line::Entity::find()
        .filter(receipt_line::Column::ReceiptId.eq(receipt_id))
        .all(conn)
        .await?;
    Ok(ReceiptView::assemble(header, lines))
}
