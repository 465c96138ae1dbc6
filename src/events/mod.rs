//! In-process domain events.
//!
//! Every successful lifecycle transition emits one event on an mpsc channel.
//! The consumer here only logs them; delivery to external systems is not a
//! concern of this service.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    PurchaseOrderCreated(Uuid),
    PurchaseOrderPosted(Uuid),
    PurchaseOrderVoided(Uuid),
    PurchaseOrderCanceled(Uuid),

    ReceivingReportCreated(Uuid),
    ReceivingReportPosted(Uuid),
    ReceivingReportVoided(Uuid),
    ReceivingReportCanceled(Uuid),

    ServiceInvoiceCreated(Uuid),
    ServiceInvoicePosted(Uuid),
    ServiceInvoiceVoided(Uuid),
    ServiceInvoiceCanceled(Uuid),

    SupplierCreated(Uuid),
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

/// Drains the event channel, logging each event. Spawned once at startup.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    while let Some(event) = receiver.recv().await {
        info!(?event, "domain event");
    }
    info!("event channel closed; processor exiting");
}
