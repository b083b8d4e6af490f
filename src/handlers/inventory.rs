use super::common::{created_response, success_response, Actor};
use crate::{
    commands::inventory::AdjustStockRequest, common::Variant, errors::ApiError,
    handlers::AppState,
};
use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use tracing::info;
use uuid::Uuid;

/// Current on-hand balance of a variant
#[utoipa::path(
    get,
    path = "/api/v1/inventory/{product_id}/{size_id}/balance",
    params(
        ("product_id" = Uuid, Path, description = "Product ID"),
        ("size_id" = Uuid, Path, description = "Size ID")
    ),
    responses(
        (status = 200, description = "Variant balance", body = crate::services::read_model::VariantBalance)
    ),
    tag = "inventory"
)]
pub async fn get_variant_balance(
    State(state): State<AppState>,
    Path((product_id, size_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    let balance = state
        .services
        .inventory
        .balance(Variant::new(product_id, size_id))
        .await?;
    Ok(success_response(balance))
}

/// Ledger history of a variant, newest first
#[utoipa::path(
    get,
    path = "/api/v1/inventory/{product_id}/{size_id}/ledger",
    params(
        ("product_id" = Uuid, Path, description = "Product ID"),
        ("size_id" = Uuid, Path, description = "Size ID")
    ),
    responses(
        (status = 200, description = "Ledger entries", body = [crate::services::read_model::LedgerEntryView])
    ),
    tag = "inventory"
)]
pub async fn get_variant_ledger(
    State(state): State<AppState>,
    Path((product_id, size_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    let entries = state
        .services
        .inventory
        .ledger_for_variant(Variant::new(product_id, size_id))
        .await?;
    Ok(success_response(entries))
}

/// Manually adjust the stock of a variant
#[utoipa::path(
    post,
    path = "/api/v1/inventory/adjustments",
    request_body = AdjustStockRequest,
    params(("X-Actor-Id" = Uuid, Header, description = "Acting user")),
    responses(
        (status = 201, description = "Adjustment recorded", body = crate::commands::inventory::AdjustStockResult),
        (status = 404, description = "Unknown variant", body = crate::errors::ErrorResponse),
        (status = 422, description = "Insufficient stock", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn adjust_stock(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Json(payload): Json<AdjustStockRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let result = state
        .services
        .inventory
        .adjust_stock(payload, actor)
        .await?;

    info!(
        adjustment_id = %result.adjustment_id,
        new_balance = result.new_balance,
        "Stock adjusted"
    );
    Ok(created_response(result))
}

pub fn inventory_routes() -> Router<AppState> {
    Router::new()
        .route("/adjustments", post(adjust_stock))
        .route("/:product_id/:size_id/balance", get(get_variant_balance))
        .route("/:product_id/:size_id/ledger", get(get_variant_ledger))
}
