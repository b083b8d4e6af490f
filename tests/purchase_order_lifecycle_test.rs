mod common;

use assert_matches::assert_matches;
use common::{order_line, order_request, receive_request, TestApp};
use rust_decimal::Decimal;
use uniform_inventory::{
    common::PaginationParams,
    entities::purchase_order::{LifecycleState, PurchaseOrderStatus},
    errors::ServiceError,
    services::procurement::OrderListFilter,
};
use uuid::Uuid;

#[tokio::test]
async fn created_order_is_open_with_full_remaining() {
    let app = TestApp::new().await;
    let catalog = app.seed_catalog().await;

    let order = app
        .procurement()
        .create_order(
            order_request(&catalog, vec![order_line(&catalog, 100, 1000)]),
            app.actor,
        )
        .await
        .expect("create order");

    assert_eq!(order.status, LifecycleState::Open);
    assert_eq!(order.fulfillment_status, PurchaseOrderStatus::Open);
    assert!(!order.is_voided);
    assert_eq!(order.created_by, app.actor);
    assert_eq!(order.lines.len(), 1);
    assert_eq!(order.lines[0].line_number, 1);
    assert_eq!(order.lines[0].remaining_quantity, 100);
    assert_eq!(order.lines[0].unit_cost, Decimal::from(1000));

    // creating an order moves no stock
    let balance = app.inventory().balance(catalog.variant()).await.unwrap();
    assert_eq!(balance.balance, 0);

    let fetched = app.procurement().get_order(order.id).await.unwrap();
    assert_eq!(fetched.id, order.id);
    assert_eq!(fetched.lines, order.lines);
}

#[tokio::test]
async fn validation_reports_every_violation() {
    let app = TestApp::new().await;
    let catalog = app.seed_catalog().await;
    let inactive_supplier = app.seed_supplier(false).await;

    let mut missing_scope = order_line(&catalog, 5, 10);
    missing_scope.scoping_unit_id = None;
    let mut wrong_scope = order_line(&catalog, 5, 10);
    wrong_scope.scoping_unit_id = Some(Uuid::new_v4());
    let mut unknown_size = order_line(&catalog, 5, 10);
    unknown_size.size_id = Uuid::new_v4();
    let zero_quantity = order_line(&catalog, 0, 10);
    let negative_cost = order_line(&catalog, 1, -1);

    let mut request = order_request(
        &catalog,
        vec![
            missing_scope,
            wrong_scope,
            unknown_size,
            zero_quantity,
            negative_cost,
        ],
    );
    request.supplier_id = inactive_supplier;

    let err = app
        .procurement()
        .create_order(request, app.actor)
        .await
        .unwrap_err();

    let ServiceError::ValidationError(violations) = err else {
        panic!("expected validation error, got {:?}", err);
    };
    for field in [
        "supplier_id",
        "lines[0].scoping_unit_id",
        "lines[1].scoping_unit_id",
        "lines[2].size_id",
        "lines[3].ordered_quantity",
        "lines[4].unit_cost",
    ] {
        assert!(violations.contains_field(field), "missing violation for {}", field);
    }

    let page = app
        .procurement()
        .list_orders(OrderListFilter::default(), PaginationParams::default())
        .await
        .unwrap();
    assert_eq!(page.total, 0, "nothing is written when validation fails");
}

#[tokio::test]
async fn unknown_supplier_and_product_are_rejected() {
    let app = TestApp::new().await;
    let catalog = app.seed_catalog().await;

    let mut line = order_line(&catalog, 5, 10);
    line.product_id = Uuid::new_v4();
    let mut request = order_request(&catalog, vec![line]);
    request.supplier_id = Uuid::new_v4();

    let err = app
        .procurement()
        .create_order(request, app.actor)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(ref v)
        if v.contains_field("supplier_id") && v.contains_field("lines[0].product_id"));
}

#[tokio::test]
async fn line_count_is_bounded() {
    let app = TestApp::new().await;
    let catalog = app.seed_catalog().await;

    let err = app
        .procurement()
        .create_order(order_request(&catalog, vec![]), app.actor)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(ref v) if v.contains_field("lines"));

    let lines = (0..101).map(|_| order_line(&catalog, 1, 1)).collect();
    let err = app
        .procurement()
        .create_order(order_request(&catalog, lines), app.actor)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(ref v) if v.contains_field("lines"));

    let lines = (0..100).map(|_| order_line(&catalog, 1, 1)).collect();
    let order = app
        .procurement()
        .create_order(order_request(&catalog, lines), app.actor)
        .await
        .expect("one hundred lines are allowed");
    assert_eq!(order.lines.len(), 100);
    assert_eq!(order.lines[99].line_number, 100);
}

#[tokio::test]
async fn draft_without_receipts_can_be_cancelled() {
    let app = TestApp::new().await;
    let catalog = app.seed_catalog().await;
    let order = app
        .procurement()
        .create_order(
            order_request(&catalog, vec![order_line(&catalog, 10, 5)]),
            app.actor,
        )
        .await
        .unwrap();

    app.procurement()
        .cancel_draft(order.id, app.actor)
        .await
        .expect("cancel draft");

    let err = app.procurement().get_order(order.id).await.unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));

    let err = app
        .procurement()
        .cancel_draft(order.id, app.actor)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));
}

#[tokio::test]
async fn received_order_cannot_be_cancelled() {
    let app = TestApp::new().await;
    let catalog = app.seed_catalog().await;
    let order = app
        .procurement()
        .create_order(
            order_request(&catalog, vec![order_line(&catalog, 10, 5)]),
            app.actor,
        )
        .await
        .unwrap();
    app.procurement()
        .receive(order.id, receive_request(&[(order.lines[0].id, 3)]), app.actor, None)
        .await
        .unwrap();

    let err = app
        .procurement()
        .cancel_draft(order.id, app.actor)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidState(_));

    let still_there = app.procurement().get_order(order.id).await.unwrap();
    assert_eq!(still_there.lines[0].received_quantity, 3);
}

#[tokio::test]
async fn list_orders_filters_and_paginates() {
    let app = TestApp::new().await;
    let catalog = app.seed_catalog().await;
    let procurement = app.procurement();

    let mut ids = Vec::new();
    for _ in 0..3 {
        let order = procurement
            .create_order(
                order_request(&catalog, vec![order_line(&catalog, 2, 5)]),
                app.actor,
            )
            .await
            .unwrap();
        ids.push((order.id, order.lines[0].id));
    }

    // complete the first order, complete and void the second
    procurement
        .receive(ids[0].0, receive_request(&[(ids[0].1, 2)]), app.actor, None)
        .await
        .unwrap();
    procurement
        .receive(ids[1].0, receive_request(&[(ids[1].1, 2)]), app.actor, None)
        .await
        .unwrap();
    procurement
        .void(ids[1].0, "entered twice", app.actor, None)
        .await
        .unwrap();

    let open = procurement
        .list_orders(
            OrderListFilter {
                status: Some(LifecycleState::Open),
                ..Default::default()
            },
            PaginationParams::default(),
        )
        .await
        .unwrap();
    assert_eq!(open.total, 1);
    assert_eq!(open.items[0].id, ids[2].0);

    let completed = procurement
        .list_orders(
            OrderListFilter {
                status: Some(LifecycleState::Completed),
                ..Default::default()
            },
            PaginationParams::default(),
        )
        .await
        .unwrap();
    assert_eq!(completed.total, 1);
    assert_eq!(completed.items[0].id, ids[0].0);

    let voided = procurement
        .list_orders(
            OrderListFilter {
                voided: Some(true),
                ..Default::default()
            },
            PaginationParams::default(),
        )
        .await
        .unwrap();
    assert_eq!(voided.total, 1);
    assert_eq!(voided.items[0].status, LifecycleState::Voided);

    let other_supplier = procurement
        .list_orders(
            OrderListFilter {
                supplier_id: Some(Uuid::new_v4()),
                ..Default::default()
            },
            PaginationParams::default(),
        )
        .await
        .unwrap();
    assert_eq!(other_supplier.total, 0);

    let second_page = procurement
        .list_orders(
            OrderListFilter::default(),
            PaginationParams {
                page: 2,
                per_page: 2,
            },
        )
        .await
        .unwrap();
    assert_eq!(second_page.total, 3);
    assert_eq!(second_page.total_pages, 2);
    assert_eq!(second_page.items.len(), 1);
}
