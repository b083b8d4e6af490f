//! Durable idempotency keys for `receive` and `void`.
//!
//! A key is stored in the same transaction as the operation it guards, so a
//! key exists iff the operation committed.

use chrono::Utc;
use sea_orm::{ConnectionTrait, EntityTrait, Set};
use uuid::Uuid;

use crate::{
    entities::idempotency_record::{self, IdempotentOperation},
    errors::{ServiceError, Violations},
};

pub const MAX_KEY_LENGTH: usize = 255;

pub fn validate_key(key: &str) -> Result<(), ServiceError> {
    let mut violations = Violations::new();
    if key.trim().is_empty() {
        violations.push("idempotency_key", "must not be blank");
    } else if key.len() > MAX_KEY_LENGTH {
        violations.push(
            "idempotency_key",
            format!("must be at most {} characters", MAX_KEY_LENGTH),
        );
    }
    violations.into_result()
}

/// Returns the earlier record for `key`, if any. A key first used for a
/// different operation or order is a conflict.
pub async fn lookup<C: ConnectionTrait>(
    conn: &C,
    key: &str,
    operation: IdempotentOperation,
    order_id: Uuid,
) -> Result<Option<idempotency_record::Model>, ServiceError> {
    let Some(record) = idempotency_record::Entity::find_by_id(key.to_string())
        .one(conn)
        .await?
    else {
        return Ok(None);
    };

    if record.operation != operation || record.order_id != order_id {
        return Err(ServiceError::IdempotencyConflict(format!(
            "key '{}' was already used for {} on purchase order {}",
            key, record.operation, record.order_id
        )));
    }
    Ok(Some(record))
}

pub async fn remember<C: ConnectionTrait>(
    conn: &C,
    key: &str,
    operation: IdempotentOperation,
    order_id: Uuid,
    receipt_id: Option<Uuid>,
) -> Result<(), ServiceError> {
    let record = idempotency_record::ActiveModel {
        key: Set(key.to_string()),
        operation: Set(operation),
        order_id: Set(order_id),
        receipt_id: Set(receipt_id),
        created_at: Set(Utc::now()),
    };
    idempotency_record::Entity::insert(record)
        .exec_without_returning(conn)
        .await?;
    Ok(())
}
