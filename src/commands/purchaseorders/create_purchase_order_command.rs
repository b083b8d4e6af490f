use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, DatabaseTransaction, EntityTrait, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::{
    commands::{begin, commit, Command},
    db::DbPool,
    entities::{
        purchase_order::{self, PurchaseOrderStatus},
        purchase_order_line,
    },
    errors::{ServiceError, Violations},
    events::{Event, EventSender},
    services::{read_model::PurchaseOrderView, reconciler, reference_data},
};

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreatePurchaseOrderLine {
    pub product_id: Uuid,
    pub size_id: Uuid,
    /// Required unless the product is universal
    #[serde(default)]
    pub scoping_unit_id: Option<Uuid>,
    #[validate(custom = "validate_positive_quantity")]
    pub ordered_quantity: i64,
    #[validate(custom = "validate_unit_cost")]
    #[schema(value_type = String, example = "1000.00")]
    pub unit_cost: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreatePurchaseOrderRequest {
    pub supplier_id: Uuid,
    pub order_date: NaiveDate,
    #[validate(length(max = 100, message = "must be at most 100 characters"))]
    pub external_reference: Option<String>,
    #[validate]
    pub lines: Vec<CreatePurchaseOrderLine>,
}

/// Upper bound on any single line or receipt quantity.
pub const MAX_LINE_QUANTITY: i64 = 1_000_000;

pub(crate) fn validate_positive_quantity(quantity: i64) -> Result<(), ValidationError> {
    let message = if quantity <= 0 {
        "must be greater than zero".to_string()
    } else if quantity > MAX_LINE_QUANTITY {
        format!("must be at most {}", MAX_LINE_QUANTITY)
    } else {
        return Ok(());
    };
    let mut err = ValidationError::new("positive_quantity");
    err.message = Some(message.into());
    Err(err)
}

pub(crate) fn validate_unit_cost(cost: &Decimal) -> Result<(), ValidationError> {
    if cost.is_sign_negative() && !cost.is_zero() {
        let mut err = ValidationError::new("unit_cost");
        err.message = Some("must not be negative".into());
        return Err(err);
    }
    Ok(())
}

/// Places a new purchase order. Ordering does not move stock.
#[derive(Debug, Clone)]
pub struct CreatePurchaseOrderCommand {
    pub request: CreatePurchaseOrderRequest,
    pub created_by: Uuid,
    pub max_lines: usize,
}

#[async_trait]
impl Command for CreatePurchaseOrderCommand {
    type Result = PurchaseOrderView;

    #[instrument(skip(self, db_pool, event_sender), fields(supplier_id = %self.request.supplier_id, lines = self.request.lines.len()))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        let mut violations = match self.request.validate() {
            Ok(()) => Violations::new(),
            Err(errors) => Violations::from(errors),
        };
        if self.request.lines.is_empty() {
            violations.push("lines", "at least one line is required");
        } else if self.request.lines.len() > self.max_lines {
            violations.push(
                "lines",
                format!("at most {} lines are allowed", self.max_lines),
            );
        }

        let txn = begin(&db_pool).await?;
        violations.extend(self.check_references(&txn).await?);
        violations.into_result()?;

        let (order, lines) = self.insert_order(&txn).await?;
        commit(txn).await?;

        info!(
            purchase_order_id = %order.id,
            supplier_id = %order.supplier_id,
            lines = lines.len(),
            "Purchase order created"
        );
        event_sender
            .send_or_log(Event::PurchaseOrderCreated {
                order_id: order.id,
                supplier_id: order.supplier_id,
                line_count: lines.len(),
            })
            .await;

        let reconciliation = reconciler::reconcile(&lines, &[]);
        Ok(PurchaseOrderView::assemble(order, &lines, &reconciliation))
    }
}

impl CreatePurchaseOrderCommand {
    /// Supplier and catalog checks. Every problem is reported.
    async fn check_references(
        &self,
        txn: &DatabaseTransaction,
    ) -> Result<Violations, ServiceError> {
        let mut violations = Violations::new();

        match reference_data::find_supplier(txn, self.request.supplier_id).await? {
            None => violations.push("supplier_id", "supplier does not exist"),
            Some(s) if !s.is_active => violations.push("supplier_id", "supplier is inactive"),
            Some(_) => {}
        }

        let lines = &self.request.lines;
        let products =
            reference_data::find_products(txn, lines.iter().map(|l| l.product_id)).await?;
        let sizes = reference_data::find_sizes(txn, lines.iter().map(|l| l.size_id)).await?;

        for (index, line) in lines.iter().enumerate() {
            let field = |name: &str| format!("lines[{}].{}", index, name);

            match products.get(&line.product_id) {
                None => violations.push(field("product_id"), "product does not exist"),
                Some(p) if !p.is_active => {
                    violations.push(field("product_id"), "product is inactive")
                }
                Some(p) if !p.is_universal => match (line.scoping_unit_id, p.scoping_unit_id) {
                    (None, _) => violations.push(
                        field("scoping_unit_id"),
                        "required for products scoped to a unit",
                    ),
                    (Some(requested), Some(owner)) if requested != owner => violations.push(
                        field("scoping_unit_id"),
                        "does not match the product's unit",
                    ),
                    _ => {}
                },
                Some(_) => {}
            }

            match sizes.get(&line.size_id) {
                None => violations.push(field("size_id"), "size does not exist"),
                Some(s) if !s.is_active => violations.push(field("size_id"), "size is inactive"),
                Some(_) => {}
            }
        }

        Ok(violations)
    }

    async fn insert_order(
        &self,
        txn: &DatabaseTransaction,
    ) -> Result<(purchase_order::Model, Vec<purchase_order_line::Model>), ServiceError> {
        let now = Utc::now();
        let order_id = Uuid::new_v4();

        let order = purchase_order::ActiveModel {
            id: Set(order_id),
            supplier_id: Set(self.request.supplier_id),
            order_date: Set(self.request.order_date),
            external_reference: Set(self.request.external_reference.clone()),
            status: Set(PurchaseOrderStatus::Open),
            is_voided: Set(false),
            void_reason: Set(None),
            voided_at: Set(None),
            voided_by: Set(None),
            created_by: Set(self.created_by),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(txn)
        .await
        .map_err(|e| {
            error!(
                "Failed to create purchase order for supplier {}: {}",
                self.request.supplier_id, e
            );
            ServiceError::StorageError(e)
        })?;

        let lines: Vec<purchase_order_line::Model> = self
            .request
            .lines
            .iter()
            .enumerate()
            .map(|(index, line)| purchase_order_line::Model {
                id: Uuid::new_v4(),
                order_id,
                line_number: index as i32 + 1,
                product_id: line.product_id,
                size_id: line.size_id,
                scoping_unit_id: line.scoping_unit_id,
                ordered_quantity: line.ordered_quantity,
                unit_cost: line.unit_cost,
            })
            .collect();

        let active: Vec<purchase_order_line::ActiveModel> = lines
            .iter()
            .map(|line| purchase_order_line::ActiveModel {
                id: Set(line.id),
                order_id: Set(line.order_id),
                line_number: Set(line.line_number),
                product_id: Set(line.product_id),
                size_id: Set(line.size_id),
                scoping_unit_id: Set(line.scoping_unit_id),
                ordered_quantity: Set(line.ordered_quantity),
                unit_cost: Set(line.unit_cost),
            })
            .collect();
        purchase_order_line::Entity::insert_many(active)
            .exec(txn)
            .await
            .map_err(|e| {
                error!("Failed to create lines for purchase order {}: {}", order_id, e);
                ServiceError::StorageError(e)
            })?;

        Ok((order, lines))
    }
}
