#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request},
    response::Response,
    Router,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, Set};
use serde_json::Value;
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

use uniform_inventory::{
    commands::purchaseorders::{
        CreatePurchaseOrderLine, CreatePurchaseOrderRequest, ReceiveLineRequest,
        ReceivePurchaseOrderRequest,
    },
    common::Variant,
    config::AppConfig,
    db,
    entities::{product, size, supplier},
    events::{self, EventSender},
    services::{inventory::InventoryService, procurement::ProcurementService},
    AppState,
};

/// Application state and router backed by a fresh in-memory SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub actor: Uuid,
    _event_task: tokio::task::JoinHandle<()>,
}

/// Reference data most tests order against.
#[derive(Debug, Clone, Copy)]
pub struct Catalog {
    pub supplier_id: Uuid,
    pub product_id: Uuid,
    pub size_id: Uuid,
    pub scoping_unit_id: Uuid,
}

impl Catalog {
    pub fn variant(&self) -> Variant {
        Variant::new(self.product_id, self.size_id)
    }
}

impl TestApp {
    pub async fn new() -> Self {
        let cfg = AppConfig::new("sqlite::memory:", "test");

        let pool = db::establish_connection_with_config(&cfg.db_config())
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let db_arc = Arc::new(pool);
        let (event_tx, event_rx) = mpsc::channel(256);
        let event_sender = Arc::new(EventSender::new(event_tx));
        let event_task = tokio::spawn(events::process_events(event_rx));

        let state = AppState::new(db_arc, cfg, event_sender);
        let router = uniform_inventory::build_router(state.clone());

        Self {
            router,
            state,
            actor: Uuid::new_v4(),
            _event_task: event_task,
        }
    }

    pub fn procurement(&self) -> Arc<ProcurementService> {
        self.state.services.procurement.clone()
    }

    pub fn inventory(&self) -> Arc<InventoryService> {
        self.state.services.inventory.clone()
    }

    pub async fn seed_supplier(&self, active: bool) -> Uuid {
        let id = Uuid::new_v4();
        supplier::ActiveModel {
            id: Set(id),
            name: Set(format!("Supplier {}", &id.to_string()[..8])),
            is_active: Set(active),
        }
        .insert(&*self.state.db)
        .await
        .expect("seed supplier");
        id
    }

    pub async fn seed_product(&self, universal: bool, scoping_unit_id: Option<Uuid>) -> Uuid {
        let id = Uuid::new_v4();
        product::ActiveModel {
            id: Set(id),
            name: Set(format!("Product {}", &id.to_string()[..8])),
            is_active: Set(true),
            is_universal: Set(universal),
            scoping_unit_id: Set(scoping_unit_id),
        }
        .insert(&*self.state.db)
        .await
        .expect("seed product");
        id
    }

    pub async fn seed_size(&self, label: &str) -> Uuid {
        let id = Uuid::new_v4();
        size::ActiveModel {
            id: Set(id),
            label: Set(label.to_string()),
            is_active: Set(true),
        }
        .insert(&*self.state.db)
        .await
        .expect("seed size");
        id
    }

    /// Active supplier, a unit-scoped product and one size.
    pub async fn seed_catalog(&self) -> Catalog {
        let scoping_unit_id = Uuid::new_v4();
        Catalog {
            supplier_id: self.seed_supplier(true).await,
            product_id: self.seed_product(false, Some(scoping_unit_id)).await,
            size_id: self.seed_size("M").await,
            scoping_unit_id,
        }
    }

    /// Same as [`seed_catalog`](Self::seed_catalog) with a universal product.
    pub async fn seed_universal_catalog(&self) -> Catalog {
        Catalog {
            supplier_id: self.seed_supplier(true).await,
            product_id: self.seed_product(true, None).await,
            size_id: self.seed_size("L").await,
            scoping_unit_id: Uuid::nil(),
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        headers: &[(&str, &str)],
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Request carrying the harness actor in `X-Actor-Id`.
    pub async fn request_as_actor(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> Response {
        let actor = self.actor.to_string();
        self.request(method, uri, body, &[("x-actor-id", actor.as_str())])
            .await
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}

pub async fn response_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read response body");
    serde_json::from_slice(&bytes).expect("response body is json")
}

pub fn order_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 2).expect("valid date")
}

pub fn order_line(catalog: &Catalog, quantity: i64, unit_cost: i64) -> CreatePurchaseOrderLine {
    CreatePurchaseOrderLine {
        product_id: catalog.product_id,
        size_id: catalog.size_id,
        scoping_unit_id: (!catalog.scoping_unit_id.is_nil()).then_some(catalog.scoping_unit_id),
        ordered_quantity: quantity,
        unit_cost: Decimal::from(unit_cost),
    }
}

pub fn order_request(
    catalog: &Catalog,
    lines: Vec<CreatePurchaseOrderLine>,
) -> CreatePurchaseOrderRequest {
    CreatePurchaseOrderRequest {
        supplier_id: catalog.supplier_id,
        order_date: order_date(),
        external_reference: None,
        lines,
    }
}

pub fn receive_request(lines: &[(Uuid, i64)]) -> ReceivePurchaseOrderRequest {
    ReceivePurchaseOrderRequest {
        receipt_date: Some(order_date()),
        note: None,
        lines: lines
            .iter()
            .map(|(order_line_id, quantity)| ReceiveLineRequest {
                order_line_id: *order_line_id,
                quantity_received: *quantity,
                unit_cost: Decimal::from(1000),
                update_cost_basis: false,
            })
            .collect(),
    }
}
