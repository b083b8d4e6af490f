pub mod common;
pub mod inventory;
pub mod purchase_orders;

use std::sync::Arc;

use crate::{
    db::DbPool,
    events::EventSender,
    services::{inventory::InventoryService, procurement::ProcurementService},
};

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub procurement: Arc<ProcurementService>,
    pub inventory: Arc<InventoryService>,
}

impl AppServices {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        max_order_lines: usize,
    ) -> Self {
        let procurement = Arc::new(
            ProcurementService::new(db_pool.clone(), event_sender.clone())
                .with_max_order_lines(max_order_lines),
        );
        let inventory = Arc::new(InventoryService::new(db_pool, event_sender));

        Self {
            procurement,
            inventory,
        }
    }
}
