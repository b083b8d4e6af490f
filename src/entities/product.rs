use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Catalog product as seen by procurement. Maintained elsewhere; this crate
/// only reads it.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub is_active: bool,
    /// Universal products are not bound to one organizational unit.
    pub is_universal: bool,
    pub scoping_unit_id: Option<Uuid>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
