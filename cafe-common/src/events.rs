//! Order board events and the broadcast bus that carries them
//!
//! Kitchen screens subscribe over SSE and refetch the board whenever an order
//! is created, advanced or removed.

use crate::order_status::OrderStatus;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CafeEvent {
    /// New order placed at the counter
    OrderCreated {
        order_id: Uuid,
        customer_name: String,
        total: f64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Order moved one column along the board
    OrderStatusChanged {
        order_id: Uuid,
        old_status: OrderStatus,
        new_status: OrderStatus,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Order removed from history
    OrderDeleted {
        order_id: Uuid,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl CafeEvent {
    /// Get event type as string for the SSE `event:` field
    pub fn event_type(&self) -> &'static str {
        match self {
            CafeEvent::OrderCreated { .. } => "OrderCreated",
            CafeEvent::OrderStatusChanged { .. } => "OrderStatusChanged",
            CafeEvent::OrderDeleted { .. } => "OrderDeleted",
        }
    }
}

/// Fan-out of [`CafeEvent`]s to every connected subscriber
///
/// Backed by `tokio::sync::broadcast`: publishing never blocks, and a slow
/// subscriber sees `Lagged` instead of stalling producers.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<CafeEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<CafeEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: CafeEvent) {
        let _ = self.tx.send(event);
    }

    /// Receivers currently attached
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
