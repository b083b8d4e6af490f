use super::common::{
    created_response, no_content_response, success_response, Actor, IdempotencyKey,
};
use crate::{
    commands::purchaseorders::{
        CreatePurchaseOrderRequest, ReceivePurchaseOrderRequest, VoidPurchaseOrderRequest,
    },
    common::PaginationParams,
    errors::ApiError,
    handlers::AppState,
    services::procurement::OrderListFilter,
};
use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use tracing::info;
use uuid::Uuid;

/// Create a new purchase order
#[utoipa::path(
    post,
    path = "/api/v1/purchase-orders",
    request_body = CreatePurchaseOrderRequest,
    params(("X-Actor-Id" = Uuid, Header, description = "Acting user")),
    responses(
        (status = 201, description = "Purchase order created", body = crate::services::read_model::PurchaseOrderView),
        (status = 400, description = "Validation failed", body = crate::errors::ErrorResponse),
        (status = 401, description = "Missing actor", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-orders"
)]
pub async fn create_purchase_order(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Json(payload): Json<CreatePurchaseOrderRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let order = state
        .services
        .procurement
        .create_order(payload, actor)
        .await?;

    info!(order_id = %order.id, lines = order.lines.len(), "Purchase order created");
    Ok(created_response(order))
}

/// List purchase orders
#[utoipa::path(
    get,
    path = "/api/v1/purchase-orders",
    params(OrderListFilter, PaginationParams),
    responses(
        (status = 200, description = "Page of purchase orders")
    ),
    tag = "purchase-orders"
)]
pub async fn list_purchase_orders(
    State(state): State<AppState>,
    Query(filter): Query<OrderListFilter>,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl IntoResponse, ApiError> {
    let page = state
        .services
        .procurement
        .list_orders(filter, pagination)
        .await?;

    Ok(success_response(page))
}

/// Get a purchase order with per-line progress
#[utoipa::path(
    get,
    path = "/api/v1/purchase-orders/{id}",
    params(("id" = Uuid, Path, description = "Purchase order ID")),
    responses(
        (status = 200, description = "Purchase order fetched", body = crate::services::read_model::PurchaseOrderView),
        (status = 404, description = "Purchase order not found", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-orders"
)]
pub async fn get_purchase_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let order = state.services.procurement.get_order(id).await?;
    Ok(success_response(order))
}

/// Cancel an order that has never been received against
#[utoipa::path(
    delete,
    path = "/api/v1/purchase-orders/{id}",
    params(
        ("id" = Uuid, Path, description = "Purchase order ID"),
        ("X-Actor-Id" = Uuid, Header, description = "Acting user")
    ),
    responses(
        (status = 204, description = "Draft cancelled"),
        (status = 404, description = "Purchase order not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Order has receipts or is not open", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-orders"
)]
pub async fn cancel_draft_purchase_order(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.services.procurement.cancel_draft(id, actor).await?;

    info!(order_id = %id, "Draft purchase order cancelled");
    Ok(no_content_response())
}

/// Record a receipt against a purchase order
#[utoipa::path(
    post,
    path = "/api/v1/purchase-orders/{id}/receipts",
    request_body = ReceivePurchaseOrderRequest,
    params(
        ("id" = Uuid, Path, description = "Purchase order ID"),
        ("X-Actor-Id" = Uuid, Header, description = "Acting user"),
        ("Idempotency-Key" = Option<String>, Header, description = "Client retry key")
    ),
    responses(
        (status = 201, description = "Goods received", body = crate::commands::purchaseorders::ReceivePurchaseOrderResult),
        (status = 200, description = "Replay of an earlier receipt", body = crate::commands::purchaseorders::ReceivePurchaseOrderResult),
        (status = 409, description = "Order voided or key reused", body = crate::errors::ErrorResponse),
        (status = 422, description = "Over-receipt", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-orders"
)]
pub async fn receive_purchase_order(
    State(state): State<AppState>,
    Actor(actor): Actor,
    IdempotencyKey(key): IdempotencyKey,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReceivePurchaseOrderRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let result = state
        .services
        .procurement
        .receive(id, payload, actor, key)
        .await?;

    if result.replayed {
        return Ok(success_response(result));
    }

    info!(
        order_id = %id,
        receipt_id = %result.receipt.id,
        completed = result.completed_order,
        "Goods received"
    );
    Ok(created_response(result))
}

/// List receipts of a purchase order, oldest first
#[utoipa::path(
    get,
    path = "/api/v1/purchase-orders/{id}/receipts",
    params(("id" = Uuid, Path, description = "Purchase order ID")),
    responses(
        (status = 200, description = "Receipts", body = [crate::services::read_model::ReceiptView]),
        (status = 404, description = "Purchase order not found", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-orders"
)]
pub async fn list_receipts(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let receipts = state.services.procurement.receipts_for(id).await?;
    Ok(success_response(receipts))
}

/// Remaining quantity per order line
#[utoipa::path(
    get,
    path = "/api/v1/purchase-orders/{id}/remaining",
    params(("id" = Uuid, Path, description = "Purchase order ID")),
    responses(
        (status = 200, description = "Map of order line id to remaining quantity"),
        (status = 404, description = "Purchase order not found", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-orders"
)]
pub async fn get_remaining(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let remaining = state.services.procurement.remaining_map(id).await?;
    Ok(success_response(remaining))
}

/// Void a purchase order and reverse the stock it brought in
#[utoipa::path(
    post,
    path = "/api/v1/purchase-orders/{id}/void",
    request_body = VoidPurchaseOrderRequest,
    params(
        ("id" = Uuid, Path, description = "Purchase order ID"),
        ("X-Actor-Id" = Uuid, Header, description = "Acting user"),
        ("Idempotency-Key" = Option<String>, Header, description = "Client retry key")
    ),
    responses(
        (status = 200, description = "Purchase order voided", body = crate::commands::purchaseorders::VoidPurchaseOrderResult),
        (status = 409, description = "Order not voidable or key reused", body = crate::errors::ErrorResponse),
        (status = 422, description = "Stock shortfall", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-orders"
)]
pub async fn void_purchase_order(
    State(state): State<AppState>,
    Actor(actor): Actor,
    IdempotencyKey(key): IdempotencyKey,
    Path(id): Path<Uuid>,
    Json(payload): Json<VoidPurchaseOrderRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let result = state
        .services
        .procurement
        .void(id, payload.reason, actor, key)
        .await?;

    if !result.replayed {
        info!(order_id = %id, reversed = result.reversed.len(), "Purchase order voided");
    }
    Ok(success_response(result))
}

/// Creates the router for purchase order endpoints
pub fn purchase_order_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_purchase_order).get(list_purchase_orders))
        .route(
            "/:id",
            get(get_purchase_order).delete(cancel_draft_purchase_order),
        )
        .route("/:id/receipts", post(receive_purchase_order).get(list_receipts))
        .route("/:id/remaining", get(get_remaining))
        .route("/:id/void", post(void_purchase_order))
}
