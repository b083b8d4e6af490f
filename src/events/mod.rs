use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::common::Variant;

/// Domain events published after a successful commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    PurchaseOrderCreated {
        order_id: Uuid,
        supplier_id: Uuid,
        line_count: usize,
    },
    PurchaseOrderDraftCancelled(Uuid),
    GoodsReceived {
        order_id: Uuid,
        receipt_id: Uuid,
        total_quantity: i64,
    },
    PurchaseOrderCompleted(Uuid),
    PurchaseOrderVoided {
        order_id: Uuid,
        reason: String,
        reversed_variants: usize,
    },
    StockAdjusted {
        adjustment_id: Uuid,
        variant: Variant,
        delta: i64,
        new_balance: i64,
    },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::PurchaseOrderCreated { .. } => "purchase_order.created",
            Event::PurchaseOrderDraftCancelled(_) => "purchase_order.draft_cancelled",
            Event::GoodsReceived { .. } => "purchase_order.goods_received",
            Event::PurchaseOrderCompleted(_) => "purchase_order.completed",
            Event::PurchaseOrderVoided { .. } => "purchase_order.voided",
            Event::StockAdjusted { .. } => "inventory.stock_adjusted",
        }
    }
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event; failures are logged, never returned. Used after commit,
    /// when the stored state is already final.
    pub async fn send_or_log(&self, event: Event) {
        let name = event.name();
        if let Err(e) = self.send(event).await {
            warn!(event = name, error = %e, "Dropping domain event");
        }
    }
}

/// Drains the event channel, logging each event. Returns when every sender
/// is dropped.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::PurchaseOrderVoided {
                order_id,
                reason,
                reversed_variants,
            } => {
                info!(
                    event = event.name(),
                    %order_id,
                    reason = %reason,
                    reversed_variants,
                    "Purchase order voided"
                );
            }
            Event::StockAdjusted {
                variant,
                delta,
                new_balance,
                ..
            } => {
                info!(
                    event = event.name(),
                    %variant,
                    delta,
                    new_balance,
                    "Stock adjusted"
                );
            }
            other => info!(event = other.name(), payload = ?other, "Domain event"),
        }
    }

    info!("Event processing loop stopped");
}
