use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::{
    commands::{
        inventory::{AdjustStockCommand, AdjustStockRequest, AdjustStockResult},
        Command,
    },
    common::{OriginReference, Variant},
    db::DbPool,
    entities::variant_cost_basis,
    errors::ServiceError,
    events::EventSender,
    services::{
        ledger,
        read_model::{LedgerEntryView, VariantBalance},
        reference_data,
    },
};

/// Stock balances, ledger history and manual adjustments.
#[derive(Clone)]
pub struct InventoryService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl InventoryService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// On-hand quantity, reduced from the ledger on every call
    #[instrument(skip(self))]
    pub async fn balance(&self, variant: Variant) -> Result<VariantBalance, ServiceError> {
        let balance = ledger::balance(&*self.db_pool, variant).await?;
        Ok(VariantBalance { variant, balance })
    }

    #[instrument(skip(self))]
    pub async fn ledger_for_variant(
        &self,
        variant: Variant,
    ) -> Result<Vec<LedgerEntryView>, ServiceError> {
        let entries = ledger::entries_for_variant(&*self.db_pool, variant).await?;
        Ok(entries.into_iter().map(LedgerEntryView::from).collect())
    }

    #[instrument(skip(self))]
    pub async fn entries_for(
        &self,
        origin: OriginReference,
    ) -> Result<Vec<LedgerEntryView>, ServiceError> {
        let entries = ledger::entries_for(&*self.db_pool, origin).await?;
        Ok(entries.into_iter().map(LedgerEntryView::from).collect())
    }

    #[instrument(skip(self, request))]
    pub async fn adjust_stock(
        &self,
        request: AdjustStockRequest,
        adjusted_by: Uuid,
    ) -> Result<AdjustStockResult, ServiceError> {
        AdjustStockCommand {
            request,
            adjusted_by,
        }
        .execute(self.db_pool.clone(), self.event_sender.clone())
        .await
    }

    pub async fn cost_basis(
        &self,
        variant: Variant,
    ) -> Result<Option<variant_cost_basis::Model>, ServiceError> {
        reference_data::cost_basis(&*self.db_pool, variant).await
    }
}
