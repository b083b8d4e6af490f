use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseTransaction, Set};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, sync::Arc};
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::{
    commands::{begin, commit, purchaseorders::lock_order, Command},
    common::Variant,
    db::DbPool,
    entities::{
        idempotency_record::IdempotentOperation,
        purchase_order::{self, PurchaseOrderStatus},
    },
    errors::{ServiceError, StockShortfall, Violations},
    events::{Event, EventSender},
    services::{
        idempotency,
        ledger::{self, NewLedgerEntry},
        read_model::{self, PurchaseOrderView},
        reconciler,
    },
};

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct VoidPurchaseOrderRequest {
    #[validate(custom = "validate_reason")]
    pub reason: String,
}

fn validate_reason(reason: &str) -> Result<(), ValidationError> {
    let message = if reason.trim().is_empty() {
        "must not be empty"
    } else if reason.len() > 1000 {
        "must be at most 1000 characters"
    } else {
        return Ok(());
    };
    let mut err = ValidationError::new("reason");
    err.message = Some(message.into());
    Err(err)
}

/// Reverses the stock effect of every receipt under an order and marks it
/// voided. Nothing is written unless every affected variant still holds the
/// quantity to take back.
#[derive(Debug, Clone)]
pub struct VoidPurchaseOrderCommand {
    pub order_id: Uuid,
    pub request: VoidPurchaseOrderRequest,
    pub voided_by: Uuid,
    pub idempotency_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ReversedVariant {
    pub variant: Variant,
    pub quantity: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VoidPurchaseOrderResult {
    pub order: PurchaseOrderView,
    /// Quantity removed from the ledger per variant
    pub reversed: Vec<ReversedVariant>,
    pub replayed: bool,
}

/// Variants whose balance is below what the void must remove.
pub fn find_shortfalls(
    to_reverse: &BTreeMap<Variant, i64>,
    balances: &BTreeMap<Variant, i64>,
) -> Vec<StockShortfall> {
    to_reverse
        .iter()
        .filter_map(|(variant, quantity)| {
            let current_balance = balances.get(variant).copied().unwrap_or(0);
            (current_balance < *quantity).then(|| StockShortfall {
                variant: *variant,
                to_reverse: *quantity,
                current_balance,
                shortfall: quantity - current_balance,
            })
        })
        .collect()
}

fn reversed_list(to_reverse: &BTreeMap<Variant, i64>) -> Vec<ReversedVariant> {
    to_reverse
        .iter()
        .map(|(variant, quantity)| ReversedVariant {
            variant: *variant,
            quantity: *quantity,
        })
        .collect()
}

#[async_trait]
impl Command for VoidPurchaseOrderCommand {
    type Result = VoidPurchaseOrderResult;

    #[instrument(skip(self, db_pool, event_sender), fields(order_id = %self.order_id, voided_by = %self.voided_by))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        if let Err(errors) = self.request.validate() {
            Violations::from(errors).into_result()?;
        }
        if let Some(key) = &self.idempotency_key {
            idempotency::validate_key(key)?;
        }
        let reason = self.request.reason.trim().to_string();

        let txn = begin(&db_pool).await?;

        if let Some(key) = &self.idempotency_key {
            if idempotency::lookup(&txn, key, IdempotentOperation::Void, self.order_id)
                .await?
                .is_some()
            {
                info!("Replaying void for repeated idempotency key");
                let result = replay(&txn, self.order_id).await?;
                commit(txn).await?;
                return Ok(result);
            }
        }

        let order = lock_order(&txn, self.order_id).await?;
        if order.is_voided {
            return Err(ServiceError::InvalidState(format!(
                "Purchase order {} is already voided",
                order.id
            )));
        }

        let receipt_lines = reconciler::receipt_lines_for_order(&txn, order.id).await?;
        if receipt_lines.is_empty() && order.status == PurchaseOrderStatus::Open {
            return Err(ServiceError::InvalidState(format!(
                "Purchase order {} has no receipts; cancel it instead of voiding",
                order.id
            )));
        }

        let to_reverse = reconciler::quantities_by_variant(&receipt_lines);

        // Validation pass: reads only.
        let balances = ledger::balances(&txn, to_reverse.keys().copied()).await?;
        let shortfalls = find_shortfalls(&to_reverse, &balances);
        if !shortfalls.is_empty() {
            warn!(
                variants = shortfalls.len(),
                "Void rejected: insufficient stock to reverse receipts"
            );
            txn.rollback().await?;
            return Err(ServiceError::StockShortfall(shortfalls));
        }

        let mut receipt_ids: Vec<Uuid> = receipt_lines.iter().map(|l| l.receipt_id).collect();
        receipt_ids.sort();
        receipt_ids.dedup();
        let removed = ledger::delete_receipt_entries(&txn, &receipt_ids).await?;

        ledger::append(
            &txn,
            to_reverse
                .keys()
                .map(|variant| {
                    NewLedgerEntry::void_audit(
                        *variant,
                        order.id,
                        order.supplier_id,
                        &reason,
                        self.voided_by,
                    )
                })
                .collect(),
        )
        .await?;

        self.mark_voided(&txn, order, &reason).await?;

        if let Some(key) = &self.idempotency_key {
            idempotency::remember(&txn, key, IdempotentOperation::Void, self.order_id, None)
                .await?;
        }

        let view = read_model::order_view(&txn, self.order_id).await?;
        commit(txn).await?;

        info!(
            receipts = receipt_ids.len(),
            ledger_entries_removed = removed,
            variants = to_reverse.len(),
            "Purchase order voided"
        );
        event_sender
            .send_or_log(Event::PurchaseOrderVoided {
                order_id: self.order_id,
                reason,
                reversed_variants: to_reverse.len(),
            })
            .await;

        Ok(VoidPurchaseOrderResult {
            order: view,
            reversed: reversed_list(&to_reverse),
            replayed: false,
        })
    }
}

impl VoidPurchaseOrderCommand {
    async fn mark_voided(
        &self,
        txn: &DatabaseTransaction,
        order: purchase_order::Model,
        reason: &str,
    ) -> Result<(), ServiceError> {
        let order_id = order.id;
        let now = Utc::now();
        let mut active: purchase_order::ActiveModel = order.into();
        active.is_voided = Set(true);
        active.void_reason = Set(Some(reason.to_string()));
        active.voided_at = Set(Some(now));
        active.voided_by = Set(Some(self.voided_by));
        active.updated_at = Set(now);
        active.update(txn).await.map_err(|e| {
            error!("Failed to mark purchase order {} voided: {}", order_id, e);
            ServiceError::StorageError(e)
        })?;
        Ok(())
    }
}

async fn replay(
    txn: &DatabaseTransaction,
    order_id: Uuid,
) -> Result<VoidPurchaseOrderResult, ServiceError> {
    let order = read_model::order_view(txn, order_id).await?;
    let receipt_lines = reconciler::receipt_lines_for_order(txn, order_id).await?;
    Ok(VoidPurchaseOrderResult {
        order,
        reversed: reversed_list(&reconciler::quantities_by_variant(&receipt_lines)),
        replayed: true,
    })
}
