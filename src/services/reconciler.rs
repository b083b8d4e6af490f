//! Fulfillment reconciliation.
//!
//! Received and remaining quantities are always derived from stored receipt
//! lines. Nothing here reads a cached "remaining" value.

use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, JoinType, QueryFilter, QueryOrder, QuerySelect,
    RelationTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    common::Variant,
    entities::{purchase_order_line, receipt, receipt_line},
    errors::{OverReceipt, ServiceError},
};

/// Progress of one order line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct LineProgress {
    pub order_line_id: Uuid,
    pub variant: Variant,
    pub ordered_quantity: i64,
    pub received_quantity: i64,
    pub remaining_quantity: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    lines: Vec<LineProgress>,
}

impl Reconciliation {
    pub fn lines(&self) -> &[LineProgress] {
        &self.lines
    }

    pub fn line(&self, order_line_id: Uuid) -> Option<&LineProgress> {
        self.lines.iter().find(|l| l.order_line_id == order_line_id)
    }

    pub fn remaining_map(&self) -> BTreeMap<Uuid, i64> {
        self.lines
            .iter()
            .map(|l| (l.order_line_id, l.remaining_quantity))
            .collect()
    }

    /// True iff the order has lines and none has anything left to receive.
    pub fn is_fully_received(&self) -> bool {
        !self.lines.is_empty() && self.lines.iter().all(|l| l.remaining_quantity == 0)
    }

    pub fn total_received(&self) -> i64 {
        self.lines
            .iter()
            .fold(0i64, |acc, l| acc.saturating_add(l.received_quantity))
    }

    /// Checks a receive request against the current state. Requested
    /// quantities for the same line are summed first; the first line that
    /// would exceed its remaining quantity fails the whole request.
    pub fn check_receipt(
        &self,
        order_id: Uuid,
        requested: &[(Uuid, i64)],
    ) -> Result<(), ServiceError> {
        let mut per_line: Vec<(Uuid, i64)> = Vec::new();
        for (line_id, quantity) in requested {
            match per_line.iter_mut().find(|(id, _)| id == line_id) {
                // saturates, so an overflowing total still exceeds what remains
                Some((_, total)) => *total = total.saturating_add(*quantity),
                None => per_line.push((*line_id, *quantity)),
            }
        }

        for (line_id, quantity) in per_line {
            let progress = self.line(line_id).ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "Order line {} not found on purchase order {}",
                    line_id, order_id
                ))
            })?;
            if quantity > progress.remaining_quantity {
                return Err(ServiceError::OverReceipt(OverReceipt {
                    order_line_id: line_id,
                    ordered_quantity: progress.ordered_quantity,
                    already_received: progress.received_quantity,
                    requested: quantity,
                    remaining: progress.remaining_quantity,
                }));
            }
        }
        Ok(())
    }
}

/// Pure reconciliation of order lines against receipt lines. Receipt lines
/// that reference other orders' lines are ignored.
pub fn reconcile(
    lines: &[purchase_order_line::Model],
    receipt_lines: &[receipt_line::Model],
) -> Reconciliation {
    let mut received: HashMap<Uuid, i64> = HashMap::new();
    for rl in receipt_lines {
        let total = received.entry(rl.order_line_id).or_default();
        *total = total.saturating_add(rl.quantity_received);
    }

    let mut ordered: Vec<&purchase_order_line::Model> = lines.iter().collect();
    ordered.sort_by_key(|l| l.line_number);

    let lines = ordered
        .into_iter()
        .map(|line| {
            let received_quantity = received.get(&line.id).copied().unwrap_or(0);
            LineProgress {
                order_line_id: line.id,
                variant: line.variant(),
                ordered_quantity: line.ordered_quantity,
                received_quantity,
                remaining_quantity: line.ordered_quantity.saturating_sub(received_quantity).max(0),
            }
        })
        .collect();

    Reconciliation { lines }
}

/// Quantity posted to the ledger per variant by the given receipt lines.
pub fn quantities_by_variant(receipt_lines: &[receipt_line::Model]) -> BTreeMap<Variant, i64> {
    let mut totals = BTreeMap::new();
    for rl in receipt_lines {
        *totals.entry(rl.variant()).or_insert(0) += rl.quantity_received;
    }
    totals
}

pub async fn order_lines<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
) -> Result<Vec<purchase_order_line::Model>, ServiceError> {
    Ok(purchase_order_line::Entity::find()
        .filter(purchase_order_line::Column::OrderId.eq(order_id))
        .order_by_asc(purchase_order_line::Column::LineNumber)
        .all(conn)
        .await?)
}

/// Every receipt line recorded under an order, across all its receipts.
pub async fn receipt_lines_for_order<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
) -> Result<Vec<receipt_line::Model>, ServiceError> {
    Ok(receipt_line::Entity::find()
        .join(JoinType::InnerJoin, receipt_line::Relation::Receipt.def())
        .filter(receipt::Column::OrderId.eq(order_id))
        .all(conn)
        .await?)
}

/// Loads lines and receipts for an order and reconciles them.
pub async fn load<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
) -> Result<Reconciliation, ServiceError> {
    let lines = order_lines(conn, order_id).await?;
    let receipt_lines = receipt_lines_for_order(conn, order_id).await?;
    Ok(reconcile(&lines, &receipt_lines))
}
