//! Append-only stock ledger and the per-variant balance projection.
//!
//! The balance of a variant is always the sum of its entries' deltas; there
//! is no stored counter to drift. Functions take any connection so they run
//! inside the caller's transaction.

use chrono::Utc;
use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use std::collections::BTreeMap;
use tracing::{debug, error};
use uuid::Uuid;

use crate::{
    common::{OriginReference, Variant},
    entities::ledger_entry::{self, MovementType, OriginKind},
    errors::ServiceError,
};

/// Ledger entry before it is written.
#[derive(Debug, Clone)]
pub struct NewLedgerEntry {
    pub variant: Variant,
    pub quantity_delta: i64,
    pub movement_type: MovementType,
    pub origin: OriginReference,
    pub supplier_id: Option<Uuid>,
    pub note: Option<String>,
    pub recorded_by: Option<Uuid>,
}

impl NewLedgerEntry {
    pub fn purchase_receipt(
        variant: Variant,
        quantity: i64,
        receipt_id: Uuid,
        supplier_id: Uuid,
        recorded_by: Uuid,
    ) -> Self {
        Self {
            variant,
            quantity_delta: quantity,
            movement_type: MovementType::PurchaseReceipt,
            origin: OriginReference::receipt(receipt_id),
            supplier_id: Some(supplier_id),
            note: None,
            recorded_by: Some(recorded_by),
        }
    }

    /// Zero-delta marker recording that an order's receipts were reversed.
    pub fn void_audit(
        variant: Variant,
        order_id: Uuid,
        supplier_id: Uuid,
        reason: &str,
        recorded_by: Uuid,
    ) -> Self {
        Self {
            variant,
            quantity_delta: 0,
            movement_type: MovementType::VoidReversalAudit,
            origin: OriginReference::purchase_order(order_id),
            supplier_id: Some(supplier_id),
            note: Some(reason.to_string()),
            recorded_by: Some(recorded_by),
        }
    }

    pub fn adjustment(
        variant: Variant,
        delta: i64,
        adjustment_id: Uuid,
        note: Option<String>,
        recorded_by: Uuid,
    ) -> Self {
        Self {
            variant,
            quantity_delta: delta,
            movement_type: MovementType::Adjustment,
            origin: OriginReference::adjustment(adjustment_id),
            supplier_id: None,
            note,
            recorded_by: Some(recorded_by),
        }
    }
}

/// Writes all entries with one multi-row insert.
pub async fn append<C: ConnectionTrait>(
    conn: &C,
    entries: Vec<NewLedgerEntry>,
) -> Result<Vec<ledger_entry::Model>, ServiceError> {
    if entries.is_empty() {
        return Ok(Vec::new());
    }

    let recorded_at = Utc::now();
    let models: Vec<ledger_entry::Model> = entries
        .into_iter()
        .map(|e| ledger_entry::Model {
            id: Uuid::new_v4(),
            product_id: e.variant.product_id,
            size_id: e.variant.size_id,
            quantity_delta: e.quantity_delta,
            movement_type: e.movement_type,
            origin_kind: e.origin.kind,
            origin_id: e.origin.id,
            supplier_id: e.supplier_id,
            note: e.note,
            recorded_by: e.recorded_by,
            recorded_at,
        })
        .collect();

    let active: Vec<ledger_entry::ActiveModel> = models
        .iter()
        .map(|m| ledger_entry::ActiveModel {
            id: Set(m.id),
            product_id: Set(m.product_id),
            size_id: Set(m.size_id),
            quantity_delta: Set(m.quantity_delta),
            movement_type: Set(m.movement_type),
            origin_kind: Set(m.origin_kind),
            origin_id: Set(m.origin_id),
            supplier_id: Set(m.supplier_id),
            note: Set(m.note.clone()),
            recorded_by: Set(m.recorded_by),
            recorded_at: Set(m.recorded_at),
        })
        .collect();

    ledger_entry::Entity::insert_many(active)
        .exec(conn)
        .await
        .map_err(|e| {
            error!("Failed to append ledger entries: {}", e);
            ServiceError::StorageError(e)
        })?;

    debug!(count = models.len(), "Appended ledger entries");
    Ok(models)
}

/// Current on-hand quantity for a variant.
pub async fn balance<C: ConnectionTrait>(conn: &C, variant: Variant) -> Result<i64, ServiceError> {
    let deltas: Vec<i64> = ledger_entry::Entity::find()
        .select_only()
        .column(ledger_entry::Column::QuantityDelta)
        .filter(ledger_entry::Column::ProductId.eq(variant.product_id))
        .filter(ledger_entry::Column::SizeId.eq(variant.size_id))
        .into_tuple()
        .all(conn)
        .await?;
    deltas
        .into_iter()
        .try_fold(0i64, |acc, delta| acc.checked_add(delta))
        .ok_or_else(|| {
            error!(%variant, "Ledger balance overflowed");
            ServiceError::InternalError(format!("balance of {} overflowed", variant))
        })
}

pub async fn balances<C: ConnectionTrait>(
    conn: &C,
    variants: impl IntoIterator<Item = Variant>,
) -> Result<BTreeMap<Variant, i64>, ServiceError> {
    let mut out = BTreeMap::new();
    for variant in variants {
        out.insert(variant, balance(conn, variant).await?);
    }
    Ok(out)
}

/// Entries caused by one aggregate, oldest first.
pub async fn entries_for<C: ConnectionTrait>(
    conn: &C,
    origin: OriginReference,
) -> Result<Vec<ledger_entry::Model>, ServiceError> {
    Ok(ledger_entry::Entity::find()
        .filter(ledger_entry::Column::OriginKind.eq(origin.kind))
        .filter(ledger_entry::Column::OriginId.eq(origin.id))
        .order_by_asc(ledger_entry::Column::RecordedAt)
        .all(conn)
        .await?)
}

/// History of a variant, newest first.
pub async fn entries_for_variant<C: ConnectionTrait>(
    conn: &C,
    variant: Variant,
) -> Result<Vec<ledger_entry::Model>, ServiceError> {
    Ok(ledger_entry::Entity::find()
        .filter(ledger_entry::Column::ProductId.eq(variant.product_id))
        .filter(ledger_entry::Column::SizeId.eq(variant.size_id))
        .order_by_desc(ledger_entry::Column::RecordedAt)
        .all(conn)
        .await?)
}

/// Removes the entries posted by the given receipts. Only the void engine
/// calls this, after its validation pass.
pub async fn delete_receipt_entries<C: ConnectionTrait>(
    conn: &C,
    receipt_ids: &[Uuid],
) -> Result<u64, ServiceError> {
    if receipt_ids.is_empty() {
        return Ok(0);
    }
    let result = ledger_entry::Entity::delete_many()
        .filter(ledger_entry::Column::OriginKind.eq(OriginKind::Receipt))
        .filter(ledger_entry::Column::OriginId.is_in(receipt_ids.iter().copied()))
        .exec(conn)
        .await
        .map_err(|e| {
            error!("Failed to delete receipt ledger entries: {}", e);
            ServiceError::StorageError(e)
        })?;
    Ok(result.rows_affected)
}
