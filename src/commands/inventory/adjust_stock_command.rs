use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::{
    commands::{begin, commit, purchaseorders::MAX_LINE_QUANTITY, Command},
    common::Variant,
    db::DbPool,
    errors::{ServiceError, Violations},
    events::{Event, EventSender},
    services::{
        ledger::{self, NewLedgerEntry},
        read_model::LedgerEntryView,
        reference_data,
    },
};

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct AdjustStockRequest {
    pub product_id: Uuid,
    pub size_id: Uuid,
    /// Signed change; negative consumes stock
    #[validate(custom = "validate_delta")]
    pub delta: i64,
    #[validate(length(max = 1000, message = "must be at most 1000 characters"))]
    pub note: Option<String>,
}

fn validate_delta(delta: i64) -> Result<(), ValidationError> {
    let message = if delta == 0 {
        "must not be zero".to_string()
    } else if delta.unsigned_abs() > MAX_LINE_QUANTITY.unsigned_abs() {
        format!("must be between -{0} and {0}", MAX_LINE_QUANTITY)
    } else {
        return Ok(());
    };
    let mut err = ValidationError::new("delta");
    err.message = Some(message.into());
    Err(err)
}

/// Manual stock movement (consumption, scrap, count corrections). Never
/// takes a variant below zero.
#[derive(Debug, Clone)]
pub struct AdjustStockCommand {
    pub request: AdjustStockRequest,
    pub adjusted_by: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AdjustStockResult {
    pub adjustment_id: Uuid,
    pub entry: LedgerEntryView,
    pub previous_balance: i64,
    pub new_balance: i64,
}

#[async_trait]
impl Command for AdjustStockCommand {
    type Result = AdjustStockResult;

    #[instrument(skip(self, db_pool, event_sender), fields(product_id = %self.request.product_id, size_id = %self.request.size_id, delta = self.request.delta))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        if let Err(errors) = self.request.validate() {
            Violations::from(errors).into_result()?;
        }
        let variant = Variant::new(self.request.product_id, self.request.size_id);

        let txn = begin(&db_pool).await?;
        reference_data::ensure_variant_exists(&txn, variant).await?;

        let previous_balance = ledger::balance(&txn, variant).await?;
        let new_balance = previous_balance
            .checked_add(self.request.delta)
            .ok_or_else(|| {
                ServiceError::InternalError(format!("balance of {} would overflow", variant))
            })?;
        if new_balance < 0 {
            warn!(previous_balance, "Adjustment rejected: insufficient stock");
            return Err(ServiceError::InsufficientStock {
                variant,
                requested: self.request.delta.saturating_neg(),
                available: previous_balance,
            });
        }

        let adjustment_id = Uuid::new_v4();
        let mut written = ledger::append(
            &txn,
            vec![NewLedgerEntry::adjustment(
                variant,
                self.request.delta,
                adjustment_id,
                self.request.note.clone(),
                self.adjusted_by,
            )],
        )
        .await?;
        commit(txn).await?;

        let entry = written
            .pop()
            .map(LedgerEntryView::from)
            .ok_or_else(|| ServiceError::InternalError("adjustment entry was not written".into()))?;

        info!(%adjustment_id, previous_balance, new_balance, "Stock adjusted");
        event_sender
            .send_or_log(Event::StockAdjusted {
                adjustment_id,
                variant,
                delta: self.request.delta,
                new_balance,
            })
            .await;

        Ok(AdjustStockResult {
            adjustment_id,
            entry,
            previous_balance,
            new_balance,
        })
    }
}
