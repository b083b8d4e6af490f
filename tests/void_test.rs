mod common;

use assert_matches::assert_matches;
use common::{order_line, order_request, receive_request, Catalog, TestApp};
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use uniform_inventory::{
    commands::inventory::AdjustStockRequest,
    common::OriginReference,
    entities::{
        ledger_entry::MovementType,
        purchase_order::{self, LifecycleState, PurchaseOrderStatus},
    },
    errors::{ServiceError, StockShortfall},
    services::read_model::PurchaseOrderView,
};

/// Orders 100 of the catalog variant and receives it in two deliveries.
async fn fully_received_order(app: &TestApp, catalog: &Catalog) -> PurchaseOrderView {
    let procurement = app.procurement();
    let order = procurement
        .create_order(
            order_request(catalog, vec![order_line(catalog, 100, 1000)]),
            app.actor,
        )
        .await
        .unwrap();
    let line_id = order.lines[0].id;
    procurement
        .receive(order.id, receive_request(&[(line_id, 60)]), app.actor, None)
        .await
        .unwrap();
    procurement
        .receive(order.id, receive_request(&[(line_id, 40)]), app.actor, None)
        .await
        .unwrap();
    procurement.get_order(order.id).await.unwrap()
}

async fn consume(app: &TestApp, catalog: &Catalog, quantity: i64) {
    app.inventory()
        .adjust_stock(
            AdjustStockRequest {
                product_id: catalog.product_id,
                size_id: catalog.size_id,
                delta: -quantity,
                note: Some("issued to staff".into()),
            },
            app.actor,
        )
        .await
        .expect("consume stock");
}

#[tokio::test]
async fn void_reverses_all_received_stock() {
    let app = TestApp::new().await;
    let catalog = app.seed_catalog().await;
    let order = fully_received_order(&app, &catalog).await;
    assert_eq!(order.status, LifecycleState::Completed);

    let result = app
        .procurement()
        .void(order.id, "wrong supplier", app.actor, None)
        .await
        .expect("void");

    assert!(!result.replayed);
    assert!(result.order.is_voided);
    assert_eq!(result.order.status, LifecycleState::Voided);
    assert_eq!(result.order.void_reason.as_deref(), Some("wrong supplier"));
    assert_eq!(result.order.voided_by, Some(app.actor));
    assert_eq!(result.reversed.len(), 1);
    assert_eq!(result.reversed[0].quantity, 100);

    assert_eq!(
        app.inventory().balance(catalog.variant()).await.unwrap().balance,
        0
    );

    let audits = app
        .inventory()
        .entries_for(OriginReference::purchase_order(order.id))
        .await
        .unwrap();
    assert_eq!(audits.len(), 1);
    assert_eq!(audits[0].quantity_delta, 0);
    assert_eq!(audits[0].movement_type, MovementType::VoidReversalAudit);
    assert_eq!(audits[0].variant, catalog.variant());

    // receipt entries are gone, the receipts themselves stay as history
    let history = app
        .inventory()
        .ledger_for_variant(catalog.variant())
        .await
        .unwrap();
    assert!(history
        .iter()
        .all(|e| e.movement_type != MovementType::PurchaseReceipt));
    assert_eq!(app.procurement().receipts_for(order.id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn void_is_blocked_when_stock_was_consumed() {
    let app = TestApp::new().await;
    let catalog = app.seed_catalog().await;
    let order = fully_received_order(&app, &catalog).await;
    consume(&app, &catalog, 70).await;

    let err = app
        .procurement()
        .void(order.id, "duplicate order", app.actor, None)
        .await
        .unwrap_err();

    let ServiceError::StockShortfall(shortfalls) = err else {
        panic!("expected stock shortfall, got {:?}", err);
    };
    assert_eq!(
        shortfalls,
        vec![StockShortfall {
            variant: catalog.variant(),
            to_reverse: 100,
            current_balance: 30,
            shortfall: 70,
        }]
    );

    assert_eq!(
        app.inventory().balance(catalog.variant()).await.unwrap().balance,
        30
    );
    let order = app.procurement().get_order(order.id).await.unwrap();
    assert!(!order.is_voided);
    assert_eq!(order.status, LifecycleState::Completed);
    assert!(app
        .inventory()
        .entries_for(OriginReference::purchase_order(order.id))
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn universal_products_follow_the_same_lifecycle() {
    let app = TestApp::new().await;
    let catalog = app.seed_universal_catalog().await;

    let order = fully_received_order(&app, &catalog).await;
    assert!(order.lines[0].scoping_unit_id.is_none());
    assert_eq!(order.status, LifecycleState::Completed);
    assert_eq!(
        app.inventory().balance(catalog.variant()).await.unwrap().balance,
        100
    );

    let err = app
        .procurement()
        .receive(
            order.id,
            receive_request(&[(order.lines[0].id, 1)]),
            app.actor,
            None,
        )
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::OverReceipt(_));

    app.procurement()
        .void(order.id, "wrong supplier", app.actor, None)
        .await
        .unwrap();
    assert_eq!(
        app.inventory().balance(catalog.variant()).await.unwrap().balance,
        0
    );
}

#[tokio::test]
async fn open_order_without_receipts_cannot_be_voided() {
    let app = TestApp::new().await;
    let catalog = app.seed_catalog().await;
    let order = app
        .procurement()
        .create_order(
            order_request(&catalog, vec![order_line(&catalog, 5, 1)]),
            app.actor,
        )
        .await
        .unwrap();

    let err = app
        .procurement()
        .void(order.id, "not needed", app.actor, None)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidState(_));
}

#[tokio::test]
async fn partially_received_order_can_be_voided() {
    let app = TestApp::new().await;
    let catalog = app.seed_catalog().await;
    let order = app
        .procurement()
        .create_order(
            order_request(&catalog, vec![order_line(&catalog, 50, 1)]),
            app.actor,
        )
        .await
        .unwrap();
    app.procurement()
        .receive(
            order.id,
            receive_request(&[(order.lines[0].id, 20)]),
            app.actor,
            None,
        )
        .await
        .unwrap();

    let result = app
        .procurement()
        .void(order.id, "supplier closed", app.actor, None)
        .await
        .unwrap();
    assert_eq!(result.reversed[0].quantity, 20);

    // voided orders accept no further receipts
    let err = app
        .procurement()
        .receive(
            order.id,
            receive_request(&[(order.lines[0].id, 1)]),
            app.actor,
            None,
        )
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidState(_));
}

#[tokio::test]
async fn second_void_without_key_is_invalid_state() {
    let app = TestApp::new().await;
    let catalog = app.seed_catalog().await;
    let order = fully_received_order(&app, &catalog).await;

    app.procurement()
        .void(order.id, "wrong supplier", app.actor, None)
        .await
        .unwrap();
    let err = app
        .procurement()
        .void(order.id, "wrong supplier", app.actor, None)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidState(_));

    let err = app
        .procurement()
        .cancel_draft(order.id, app.actor)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidState(_));
}

#[tokio::test]
async fn void_retry_with_same_key_replays() {
    let app = TestApp::new().await;
    let catalog = app.seed_catalog().await;
    let order = fully_received_order(&app, &catalog).await;
    let key = Some("void-po-1".to_string());

    let first = app
        .procurement()
        .void(order.id, "wrong supplier", app.actor, key.clone())
        .await
        .unwrap();
    let retry = app
        .procurement()
        .void(order.id, "wrong supplier", app.actor, key.clone())
        .await
        .unwrap();

    assert!(retry.replayed);
    assert_eq!(retry.order.id, first.order.id);
    assert!(retry.order.is_voided);
    assert_eq!(retry.reversed, first.reversed);
    assert_eq!(
        app.inventory().balance(catalog.variant()).await.unwrap().balance,
        0
    );
    let audits = app
        .inventory()
        .entries_for(OriginReference::purchase_order(order.id))
        .await
        .unwrap();
    assert_eq!(audits.len(), 1);

    // the same key cannot be reused for a receipt
    let err = app
        .procurement()
        .receive(
            order.id,
            receive_request(&[(order.lines[0].id, 1)]),
            app.actor,
            key,
        )
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::IdempotencyConflict(_));
}

#[tokio::test]
async fn adjustments_never_take_stock_below_zero() {
    let app = TestApp::new().await;
    let catalog = app.seed_catalog().await;
    fully_received_order(&app, &catalog).await;

    let err = app
        .inventory()
        .adjust_stock(
            AdjustStockRequest {
                product_id: catalog.product_id,
                size_id: catalog.size_id,
                delta: -101,
                note: None,
            },
            app.actor,
        )
        .await
        .unwrap_err();
    assert_matches!(
        err,
        ServiceError::InsufficientStock {
            requested: 101,
            available: 100,
            ..
        }
    );

    let result = app
        .inventory()
        .adjust_stock(
            AdjustStockRequest {
                product_id: catalog.product_id,
                size_id: catalog.size_id,
                delta: -100,
                note: Some("annual issue".into()),
            },
            app.actor,
        )
        .await
        .unwrap();
    assert_eq!(result.previous_balance, 100);
    assert_eq!(result.new_balance, 0);
    assert_eq!(result.entry.movement_type, MovementType::Adjustment);
    assert_eq!(
        result.entry.origin,
        OriginReference::adjustment(result.adjustment_id)
    );

    let err = app
        .inventory()
        .adjust_stock(
            AdjustStockRequest {
                product_id: uuid::Uuid::new_v4(),
                size_id: catalog.size_id,
                delta: 5,
                note: None,
            },
            app.actor,
        )
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));
}

#[tokio::test]
async fn completed_order_without_receipts_is_voided_without_ledger_changes() {
    let app = TestApp::new().await;
    let catalog = app.seed_catalog().await;
    let order = app
        .procurement()
        .create_order(
            order_request(&catalog, vec![order_line(&catalog, 5, 1)]),
            app.actor,
        )
        .await
        .unwrap();

    // completed outside the receiving flow, e.g. by an import
    let stored = purchase_order::Entity::find_by_id(order.id)
        .one(&*app.state.db)
        .await
        .unwrap()
        .unwrap();
    let mut active: purchase_order::ActiveModel = stored.into();
    active.status = Set(PurchaseOrderStatus::Completed);
    active.update(&*app.state.db).await.unwrap();

    let result = app
        .procurement()
        .void(order.id, "closed by import", app.actor, None)
        .await
        .expect("void");

    assert!(result.order.is_voided);
    assert_eq!(result.order.void_reason.as_deref(), Some("closed by import"));
    assert!(result.reversed.is_empty());
    assert!(app
        .inventory()
        .entries_for(OriginReference::purchase_order(order.id))
        .await
        .unwrap()
        .is_empty());
    assert!(app
        .inventory()
        .ledger_for_variant(catalog.variant())
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn extreme_adjustments_are_rejected() {
    let app = TestApp::new().await;
    let catalog = app.seed_catalog().await;

    for delta in [i64::MIN, i64::MAX, -1_000_001] {
        let err = app
            .inventory()
            .adjust_stock(
                AdjustStockRequest {
                    product_id: catalog.product_id,
                    size_id: catalog.size_id,
                    delta,
                    note: None,
                },
                app.actor,
            )
            .await
            .unwrap_err();
        assert_matches!(err, ServiceError::ValidationError(ref v) if v.contains_field("delta"));
    }

    assert_eq!(
        app.inventory().balance(catalog.variant()).await.unwrap().balance,
        0
    );
}
