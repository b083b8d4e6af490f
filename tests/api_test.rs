mod common;

use axum::http::{Method, StatusCode};
use common::{response_json, Catalog, TestApp};
use serde_json::{json, Value};

fn order_body(catalog: &Catalog, quantity: i64) -> Value {
    json!({
        "supplier_id": catalog.supplier_id,
        "order_date": "2026-03-02",
        "external_reference": "PO-2026-0042",
        "lines": [{
            "product_id": catalog.product_id,
            "size_id": catalog.size_id,
            "scoping_unit_id": catalog.scoping_unit_id,
            "ordered_quantity": quantity,
            "unit_cost": "1000.00"
        }]
    })
}

fn receipt_body(line_id: &str, quantity: i64) -> Value {
    json!({
        "receipt_date": "2026-03-05",
        "lines": [{
            "order_line_id": line_id,
            "quantity_received": quantity,
            "unit_cost": "1000.00"
        }]
    })
}

async fn create_order(app: &TestApp, catalog: &Catalog, quantity: i64) -> Value {
    let response = app
        .request_as_actor(
            Method::POST,
            "/api/v1/purchase-orders",
            Some(order_body(catalog, quantity)),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    response_json(response).await
}

#[tokio::test]
async fn health_endpoints_respond() {
    let app = TestApp::new().await;

    let response = app.request(Method::GET, "/health", None, &[]).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.request(Method::GET, "/health/ready", None, &[]).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["ready"], true);
}

#[tokio::test]
async fn mutations_require_an_actor() {
    let app = TestApp::new().await;
    let catalog = app.seed_catalog().await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/purchase-orders",
            Some(order_body(&catalog, 10)),
            &[],
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = response_json(response).await;
    assert_eq!(body["code"], "unauthorized");

    let response = app
        .request(
            Method::POST,
            "/api/v1/purchase-orders",
            Some(order_body(&catalog, 10)),
            &[("x-actor-id", "somebody")],
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn validation_errors_carry_field_details() {
    let app = TestApp::new().await;
    let catalog = app.seed_catalog().await;

    let mut body = order_body(&catalog, 0);
    body["supplier_id"] = json!(uuid::Uuid::new_v4());

    let response = app
        .request_as_actor(Method::POST, "/api/v1/purchase-orders", Some(body))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(response.headers().contains_key("x-request-id"));

    let body = response_json(response).await;
    assert_eq!(body["code"], "validation_error");
    assert!(body["request_id"].is_string());
    let fields: Vec<&str> = body["details"]
        .as_array()
        .expect("violation list")
        .iter()
        .filter_map(|v| v["field"].as_str())
        .collect();
    assert!(fields.contains(&"supplier_id"));
    assert!(fields.contains(&"lines[0].ordered_quantity"));
}

#[tokio::test]
async fn receive_replay_and_over_receipt_over_http() {
    let app = TestApp::new().await;
    let catalog = app.seed_catalog().await;
    let order = create_order(&app, &catalog, 100).await;
    let order_id = order["id"].as_str().unwrap().to_string();
    let line_id = order["lines"][0]["id"].as_str().unwrap().to_string();
    let actor = app.actor.to_string();
    let receipts_uri = format!("/api/v1/purchase-orders/{}/receipts", order_id);

    let headers = [
        ("x-actor-id", actor.as_str()),
        ("idempotency-key", "dock-7-delivery-1"),
    ];
    let response = app
        .request(
            Method::POST,
            &receipts_uri,
            Some(receipt_body(&line_id, 60)),
            &headers,
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let first = response_json(response).await;
    assert_eq!(first["remaining"][&line_id], 40);
    assert_eq!(first["order_status"], "open");

    let response = app
        .request(
            Method::POST,
            &receipts_uri,
            Some(receipt_body(&line_id, 60)),
            &headers,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let replay = response_json(response).await;
    assert_eq!(replay["replayed"], true);
    assert_eq!(replay["receipt"]["id"], first["receipt"]["id"]);

    let response = app
        .request_as_actor(Method::POST, &receipts_uri, Some(receipt_body(&line_id, 41)))
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = response_json(response).await;
    assert_eq!(body["code"], "over_receipt");
    assert_eq!(body["details"]["remaining"], 40);
    assert_eq!(body["details"]["requested"], 41);

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/purchase-orders/{}/remaining", order_id),
            None,
            &[],
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let remaining = response_json(response).await;
    assert_eq!(remaining[&line_id], 40);

    let response = app.request(Method::GET, &receipts_uri, None, &[]).await;
    assert_eq!(response.status(), StatusCode::OK);
    let receipts = response_json(response).await;
    assert_eq!(receipts.as_array().unwrap().len(), 1);

    let balance_uri = format!(
        "/api/v1/inventory/{}/{}/balance",
        catalog.product_id, catalog.size_id
    );
    let response = app.request(Method::GET, &balance_uri, None, &[]).await;
    let balance = response_json(response).await;
    assert_eq!(balance["balance"], 60);
}

#[tokio::test]
async fn void_shortfall_then_success_over_http() {
    let app = TestApp::new().await;
    let catalog = app.seed_catalog().await;
    let order = create_order(&app, &catalog, 10).await;
    let order_id = order["id"].as_str().unwrap().to_string();
    let line_id = order["lines"][0]["id"].as_str().unwrap().to_string();

    let response = app
        .request_as_actor(
            Method::POST,
            &format!("/api/v1/purchase-orders/{}/receipts", order_id),
            Some(receipt_body(&line_id, 10)),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let receipt = response_json(response).await;
    assert_eq!(receipt["completed_order"], true);

    let response = app
        .request_as_actor(
            Method::POST,
            "/api/v1/inventory/adjustments",
            Some(json!({
                "product_id": catalog.product_id,
                "size_id": catalog.size_id,
                "delta": -4,
                "note": "issued"
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let void_uri = format!("/api/v1/purchase-orders/{}/void", order_id);
    let response = app
        .request_as_actor(Method::POST, &void_uri, Some(json!({ "reason": "duplicate order" })))
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = response_json(response).await;
    assert_eq!(body["code"], "stock_shortfall");
    assert_eq!(body["details"][0]["to_reverse"], 10);
    assert_eq!(body["details"][0]["current_balance"], 6);
    assert_eq!(body["details"][0]["shortfall"], 4);

    // put the stock back, then the void goes through
    let response = app
        .request_as_actor(
            Method::POST,
            "/api/v1/inventory/adjustments",
            Some(json!({
                "product_id": catalog.product_id,
                "size_id": catalog.size_id,
                "delta": 4
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .request_as_actor(Method::POST, &void_uri, Some(json!({ "reason": "duplicate order" })))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let voided = response_json(response).await;
    assert_eq!(voided["order"]["status"], "voided");
    assert_eq!(voided["order"]["void_reason"], "duplicate order");

    let response = app
        .request_as_actor(Method::POST, &void_uri, Some(json!({ "reason": "again" })))
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let ledger_uri = format!(
        "/api/v1/inventory/{}/{}/ledger",
        catalog.product_id, catalog.size_id
    );
    let response = app.request(Method::GET, &ledger_uri, None, &[]).await;
    let ledger = response_json(response).await;
    let deltas: i64 = ledger
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["quantity_delta"].as_i64().unwrap())
        .sum();
    assert_eq!(deltas, 0);
}

#[tokio::test]
async fn draft_cancel_and_listing_over_http() {
    let app = TestApp::new().await;
    let catalog = app.seed_catalog().await;
    let keep = create_order(&app, &catalog, 5).await;
    let drop = create_order(&app, &catalog, 5).await;

    let response = app
        .request_as_actor(
            Method::DELETE,
            &format!("/api/v1/purchase-orders/{}", drop["id"].as_str().unwrap()),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/purchase-orders/{}", drop["id"].as_str().unwrap()),
            None,
            &[],
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .request(
            Method::GET,
            "/api/v1/purchase-orders?status=open&page=1&per_page=10",
            None,
            &[],
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let page = response_json(response).await;
    assert_eq!(page["total"], 1);
    assert_eq!(page["items"][0]["id"], keep["id"]);
}
