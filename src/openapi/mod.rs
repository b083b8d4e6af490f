use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Uniform Inventory API",
        version = "0.1.0",
        description = r#"
# Uniform Inventory API

Stock ledger and purchase-order lifecycle for uniform variants (product + size).

## Actors

Every mutating request must carry an `X-Actor-Id` header holding the UUID of
the acting user. Requests without it are rejected with `401`.

## Retries

`POST /purchase-orders/{id}/receipts` and `POST /purchase-orders/{id}/void`
accept an `Idempotency-Key` header. Replaying a key returns the original
result without writing anything.

## Error Handling

```json
{
  "error": "Unprocessable Entity",
  "code": "over_receipt",
  "message": "Over-receipt on order line ...",
  "details": { "remaining": 2 },
  "request_id": "5f1c...",
  "timestamp": "2026-01-01T00:00:00Z"
}
```
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "purchase-orders", description = "Purchase order lifecycle, receipts and voids"),
        (name = "inventory", description = "Variant balances, ledger history and adjustments")
    ),
    paths(
        crate::handlers::purchase_orders::create_purchase_order,
        crate::handlers::purchase_orders::list_purchase_orders,
        crate::handlers::purchase_orders::get_purchase_order,
        crate::handlers::purchase_orders::cancel_draft_purchase_order,
        crate::handlers::purchase_orders::receive_purchase_order,
        crate::handlers::purchase_orders::list_receipts,
        crate::handlers::purchase_orders::get_remaining,
        crate::handlers::purchase_orders::void_purchase_order,
        crate::handlers::inventory::get_variant_balance,
        crate::handlers::inventory::get_variant_ledger,
        crate::handlers::inventory::adjust_stock,
    ),
    components(
        schemas(
            crate::common::Variant,
            crate::entities::purchase_order::LifecycleState,
            crate::entities::purchase_order::PurchaseOrderStatus,
            crate::commands::purchaseorders::CreatePurchaseOrderRequest,
            crate::commands::purchaseorders::CreatePurchaseOrderLine,
            crate::commands::purchaseorders::ReceivePurchaseOrderRequest,
            crate::commands::purchaseorders::ReceiveLineRequest,
            crate::commands::purchaseorders::ReceivePurchaseOrderResult,
            crate::commands::purchaseorders::VoidPurchaseOrderRequest,
            crate::commands::purchaseorders::VoidPurchaseOrderResult,
            crate::commands::purchaseorders::ReversedVariant,
            crate::commands::inventory::AdjustStockRequest,
            crate::commands::inventory::AdjustStockResult,
            crate::services::read_model::PurchaseOrderView,
            crate::services::read_model::PurchaseOrderSummary,
            crate::services::read_model::OrderLineView,
            crate::services::read_model::ReceiptView,
            crate::services::read_model::ReceiptLineView,
            crate::services::read_model::LedgerEntryView,
            crate::services::read_model::VariantBalance,
            crate::errors::ErrorResponse,
            crate::errors::FieldViolation,
            crate::errors::OverReceipt,
            crate::errors::StockShortfall
        )
    )
)]
pub struct ApiDocV1;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_document_lists_routes() {
        let openapi = ApiDocV1::openapi();
        let json = serde_json::to_string_pretty(&openapi).unwrap();
        assert!(json.contains("Uniform Inventory API"));
        assert!(json.contains("/api/v1/purchase-orders/{id}/void"));
        assert!(json.contains("/api/v1/inventory/adjustments"));
    }
}
