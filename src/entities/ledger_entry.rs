use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::common::{OriginReference, Variant};

/// Why a ledger entry exists.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    ToSchema,
    strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MovementType {
    #[sea_orm(string_value = "purchase_receipt")]
    PurchaseReceipt,
    /// Zero-delta marker written when an order is voided.
    #[sea_orm(string_value = "void_reversal_audit")]
    VoidReversalAudit,
    #[sea_orm(string_value = "adjustment")]
    Adjustment,
}

/// Kind of aggregate that caused a ledger entry.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    ToSchema,
    strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OriginKind {
    #[sea_orm(string_value = "receipt")]
    Receipt,
    #[sea_orm(string_value = "purchase_order")]
    PurchaseOrder,
    #[sea_orm(string_value = "adjustment")]
    Adjustment,
}

/// Immutable stock movement. The balance of a variant is the sum of
/// `quantity_delta` over its entries.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "ledger_entries")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub product_id: Uuid,
    pub size_id: Uuid,
    pub quantity_delta: i64,
    pub movement_type: MovementType,
    pub origin_kind: OriginKind,
    pub origin_id: Uuid,
    pub supplier_id: Option<Uuid>,
    pub note: Option<String>,
    pub recorded_by: Option<Uuid>,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn variant(&self) -> Variant {
        Variant::new(self.product_id, self.size_id)
    }

    pub fn origin(&self) -> OriginReference {
        OriginReference {
            kind: self.origin_kind,
            id: self.origin_id,
        }
    }

    /// Audit markers never move stock.
    pub fn is_audit_marker(&self) -> bool {
        self.movement_type == MovementType::VoidReversalAudit
    }
}
