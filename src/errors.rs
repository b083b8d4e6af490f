use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::error::DbErr;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::ValidationErrorsKind;

use crate::common::Variant;

fn current_request_id() -> Option<String> {
    crate::tracing::current_request_id().map(|rid| rid.as_str().to_string())
}

/// JSON error body returned by every endpoint
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "error": "Unprocessable Entity",
    "code": "stock_shortfall",
    "message": "Stock shortfall on 1 variant(s)",
    "details": [{
        "variant": {
            "product_id": "0d5c3a38-5d0c-4a43-9a8c-6a3b2b0c3c11",
            "size_id": "7b1f1a0e-63b4-4c61-bb07-4d8c52f0f2a9"
        },
        "to_reverse": 100,
        "current_balance": 30,
        "shortfall": 70
    }],
    "request_id": "req-abc123xyz",
    "timestamp": "2026-01-01T10:30:00Z"
}))]
pub struct ErrorResponse {
    /// HTTP status category
    pub error: String,
    /// Machine-readable error code
    pub code: String,
    /// Human-readable error description
    pub message: String,
    /// Structured payload: violations, over-receipt breakdown or shortfall table
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Object)]
    pub details: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

/// One violated input field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FieldViolation {
    pub field: String,
    pub message: String,
}

/// Every violation found while validating a request, not just the first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Violations(Vec<FieldViolation>);

impl Violations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.push(FieldViolation {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn extend(&mut self, other: Violations) {
        self.0.extend(other.0);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldViolation> {
        self.0.iter()
    }

    pub fn contains_field(&self, field: &str) -> bool {
        self.0.iter().any(|v| v.field == field)
    }

    /// `Ok(())` when nothing was collected, otherwise a `ValidationError`
    /// carrying all violations sorted by field path.
    pub fn into_result(mut self) -> Result<(), ServiceError> {
        if self.0.is_empty() {
            return Ok(());
        }
        self.0.sort_by(|a, b| a.field.cmp(&b.field));
        Err(ServiceError::ValidationError(self))
    }
}

impl fmt::Display for Violations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self
            .0
            .iter()
            .map(|v| format!("{}: {}", v.field, v.message))
            .collect();
        write!(f, "{}", rendered.join("; "))
    }
}

impl From<validator::ValidationErrors> for Violations {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut out = Violations::new();
        flatten_validation_errors("", &errors, &mut out);
        out
    }
}

fn flatten_validation_errors(
    prefix: &str,
    errors: &validator::ValidationErrors,
    out: &mut Violations,
) {
    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{}.{}", prefix, field)
        };
        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                for err in field_errors {
                    let message = err
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| err.code.to_string());
                    out.push(path.clone(), message);
                }
            }
            ValidationErrorsKind::Struct(inner) => flatten_validation_errors(&path, inner, out),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    flatten_validation_errors(&format!("{}[{}]", path, index), inner, out);
                }
            }
        }
    }
}

/// Receive request that would push an order line past its ordered quantity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct OverReceipt {
    pub order_line_id: Uuid,
    pub ordered_quantity: i64,
    pub already_received: i64,
    pub requested: i64,
    pub remaining: i64,
}

/// One variant that cannot give back the stock a void needs to remove
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct StockShortfall {
    pub variant: Variant,
    pub to_reverse: i64,
    pub current_balance: i64,
    pub shortfall: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Validation error: {0}")]
    ValidationError(Violations),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error(
        "Over-receipt on order line {}: ordered {}, already received {}, requested {}",
        .0.order_line_id,
        .0.ordered_quantity,
        .0.already_received,
        .0.requested
    )]
    OverReceipt(OverReceipt),

    #[error("Stock shortfall on {} variant(s)", .0.len())]
    StockShortfall(Vec<StockShortfall>),

    #[error("Insufficient stock for variant {variant}: requested {requested}, available {available}")]
    InsufficientStock {
        variant: Variant,
        requested: i64,
        available: i64,
    },

    #[error("Idempotency key conflict: {0}")]
    IdempotencyConflict(String),

    #[error("Storage error: {0}")]
    StorageError(#[from] DbErr),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.into())
    }
}

impl ServiceError {
    pub fn not_found(kind: &str, id: Uuid) -> Self {
        ServiceError::NotFound(format!("{} {} not found", kind, id))
    }

    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::ValidationError(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidState(_) | Self::IdempotencyConflict(_) => StatusCode::CONFLICT,
            Self::OverReceipt(_) | Self::StockShortfall(_) | Self::InsufficientStock { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::StorageError(_) | Self::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            Self::ValidationError(_) => "validation_error",
            Self::NotFound(_) => "not_found",
            Self::InvalidState(_) => "invalid_state",
            Self::OverReceipt(_) => "over_receipt",
            Self::StockShortfall(_) => "stock_shortfall",
            Self::InsufficientStock { .. } => "insufficient_stock",
            Self::IdempotencyConflict(_) => "idempotency_conflict",
            Self::StorageError(_) => "storage_error",
            Self::InternalError(_) => "internal_error",
        }
    }

    /// Message suitable for HTTP responses. Storage and internal failures
    /// return generic text.
    pub fn response_message(&self) -> String {
        match self {
            Self::StorageError(_) => "Storage error; no changes were applied".to_string(),
            Self::InternalError(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }

    /// Structured payload for the `details` field of the error body
    pub fn details(&self) -> Option<Value> {
        match self {
            Self::ValidationError(violations) => Some(json!(violations)),
            Self::OverReceipt(over) => Some(json!(over)),
            Self::StockShortfall(items) => Some(json!(items)),
            Self::InsufficientStock {
                variant,
                requested,
                available,
            } => Some(json!({
                "variant": variant,
                "requested": requested,
                "available": available,
            })),
            _ => None,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, code = self.code(), "Request failed");
        }

        let body = ErrorResponse {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            code: self.code().to_string(),
            message: self.response_message(),
            details: self.details(),
            request_id: current_request_id(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, Json(body)).into_response()
    }
}

/// Errors raised by the HTTP layer before a request reaches a service
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Service error: {0}")]
    ServiceError(#[from] ServiceError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::ServiceError(service_error) => return service_error.into_response(),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg),
        };

        let body = ErrorResponse {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            code: code.to_string(),
            message,
            details: None,
            request_id: current_request_id(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use validator::Validate;

    fn positive(value: i64) -> Result<(), validator::ValidationError> {
        if value > 0 {
            Ok(())
        } else {
            Err(validator::ValidationError::new("positive"))
        }
    }

    #[derive(Validate)]
    struct Line {
        #[validate(custom = "positive")]
        quantity: i64,
    }

    #[derive(Validate)]
    struct Request {
        #[validate(length(min = 1, message = "reason must not be empty"))]
        reason: String,
        #[validate]
        lines: Vec<Line>,
    }

    #[test]
    fn status_code_mapping() {
        assert_eq!(
            ServiceError::ValidationError(Violations::new()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::NotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ServiceError::InvalidState("x".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ServiceError::StockShortfall(vec![]).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ServiceError::StorageError(DbErr::Custom("boom".into())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn storage_errors_hide_details() {
        let err = ServiceError::StorageError(DbErr::Custom("disk full at /var/lib".into()));
        assert!(!err.response_message().contains("/var/lib"));
        assert!(err.details().is_none());
    }

    #[test]
    fn validator_errors_flatten_to_field_paths() {
        let request = Request {
            reason: String::new(),
            lines: vec![Line { quantity: 5 }, Line { quantity: 0 }],
        };
        let violations: Violations = request.validate().unwrap_err().into();

        assert_eq!(violations.len(), 2);
        assert!(violations.contains_field("reason"));
        assert!(violations.contains_field("lines[1].quantity"));
        assert!(violations
            .iter()
            .any(|v| v.message == "reason must not be empty"));
    }

    #[test]
    fn into_result_sorts_by_field() {
        let mut violations = Violations::new();
        violations.push("supplier_id", "unknown supplier");
        violations.push("lines[0].size_id", "unknown size");

        match violations.into_result() {
            Err(ServiceError::ValidationError(v)) => {
                let fields: Vec<&str> = v.iter().map(|f| f.field.as_str()).collect();
                assert_eq!(fields, vec!["lines[0].size_id", "supplier_id"]);
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn shortfall_response_carries_breakdown_and_request_id() {
        let shortfall = StockShortfall {
            variant: Variant::new(Uuid::new_v4(), Uuid::new_v4()),
            to_reverse: 100,
            current_balance: 30,
            shortfall: 70,
        };
        let response = crate::tracing::scope_request_id(
            crate::tracing::RequestId::new("req-void-1"),
            async { ServiceError::StockShortfall(vec![shortfall]).into_response() },
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let payload: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(payload.code, "stock_shortfall");
        assert_eq!(payload.request_id.as_deref(), Some("req-void-1"));
        let details = payload.details.expect("details present");
        assert_eq!(details[0]["shortfall"], 70);
        assert_eq!(details[0]["current_balance"], 30);
    }

    #[tokio::test]
    async fn api_error_unauthorized_renders_json() {
        let response = ApiError::Unauthorized("missing actor".into()).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let payload: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(payload.code, "unauthorized");
    }
}
