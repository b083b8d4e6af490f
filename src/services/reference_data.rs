//! Read access to master data owned by other systems (suppliers, products,
//! sizes) and the cost-basis store receipts write through to.

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{sea_query::OnConflict, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};
use std::collections::HashMap;
use uuid::Uuid;

use crate::{
    common::Variant,
    entities::{product, size, supplier, variant_cost_basis},
    errors::ServiceError,
};

pub async fn find_supplier<C: ConnectionTrait>(
    conn: &C,
    supplier_id: Uuid,
) -> Result<Option<supplier::Model>, ServiceError> {
    Ok(supplier::Entity::find_by_id(supplier_id).one(conn).await?)
}

pub async fn find_products<C: ConnectionTrait>(
    conn: &C,
    ids: impl IntoIterator<Item = Uuid>,
) -> Result<HashMap<Uuid, product::Model>, ServiceError> {
    let ids: Vec<Uuid> = ids.into_iter().collect();
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let products = product::Entity::find()
        .filter(product::Column::Id.is_in(ids))
        .all(conn)
        .await?;
    Ok(products.into_iter().map(|p| (p.id, p)).collect())
}

pub async fn find_sizes<C: ConnectionTrait>(
    conn: &C,
    ids: impl IntoIterator<Item = Uuid>,
) -> Result<HashMap<Uuid, size::Model>, ServiceError> {
    let ids: Vec<Uuid> = ids.into_iter().collect();
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let sizes = size::Entity::find()
        .filter(size::Column::Id.is_in(ids))
        .all(conn)
        .await?;
    Ok(sizes.into_iter().map(|s| (s.id, s)).collect())
}

/// Fails with `NotFound` unless both the product and the size exist.
pub async fn ensure_variant_exists<C: ConnectionTrait>(
    conn: &C,
    variant: Variant,
) -> Result<(), ServiceError> {
    if product::Entity::find_by_id(variant.product_id)
        .one(conn)
        .await?
        .is_none()
    {
        return Err(ServiceError::not_found("Product", variant.product_id));
    }
    if size::Entity::find_by_id(variant.size_id)
        .one(conn)
        .await?
        .is_none()
    {
        return Err(ServiceError::not_found("Size", variant.size_id));
    }
    Ok(())
}

/// Records `unit_cost` as the variant's cost basis, replacing any previous value.
pub async fn update_cost_basis<C: ConnectionTrait>(
    conn: &C,
    variant: Variant,
    unit_cost: Decimal,
    source_receipt_id: Uuid,
) -> Result<(), ServiceError> {
    let record = variant_cost_basis::ActiveModel {
        product_id: Set(variant.product_id),
        size_id: Set(variant.size_id),
        unit_cost: Set(unit_cost),
        source_receipt_id: Set(Some(source_receipt_id)),
        updated_at: Set(Utc::now()),
    };

    variant_cost_basis::Entity::insert(record)
        .on_conflict(
            OnConflict::columns([
                variant_cost_basis::Column::ProductId,
                variant_cost_basis::Column::SizeId,
            ])
            .update_columns([
                variant_cost_basis::Column::UnitCost,
                variant_cost_basis::Column::SourceReceiptId,
                variant_cost_basis::Column::UpdatedAt,
            ])
            .to_owned(),
        )
        .exec_without_returning(conn)
        .await?;
    Ok(())
}

pub async fn cost_basis<C: ConnectionTrait>(
    conn: &C,
    variant: Variant,
) -> Result<Option<variant_cost_basis::Model>, ServiceError> {
    Ok(
        variant_cost_basis::Entity::find_by_id((variant.product_id, variant.size_id))
            .one(conn)
            .await?,
    )
}
