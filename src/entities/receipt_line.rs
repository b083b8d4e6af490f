use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::common::Variant;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "receipt_lines")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub receipt_id: Uuid,
    pub order_line_id: Uuid,
    /// Copied from the order line so reversals can group by variant without a join.
    pub product_id: Uuid,
    pub size_id: Uuid,
    pub quantity_received: i64,
    pub unit_cost: Decimal,
    pub update_cost_basis: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::receipt::Entity",
        from = "Column::ReceiptId",
        to = "super::receipt::Column::Id"
    )]
    Receipt,
    #[sea_orm(
        belongs_to = "super::purchase_order_line::Entity",
        from = "Column::OrderLineId",
        to = "super::purchase_order_line::Column::Id"
    )]
    OrderLine,
}

impl Related<super::receipt::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Receipt.def()
    }
}

impl Related<super::purchase_order_line::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderLine.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn variant(&self) -> Variant {
        Variant::new(self.product_id, self.size_id)
    }
}
