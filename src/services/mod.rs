pub mod purchase_orders;
pub mod receiving_reports;
pub mod service_invoices;
pub mod suppliers;

use std::sync::Arc;

use crate::{db::DbPool, events::EventSender};

/// Bundle of the service layer, shared with handlers through `AppState`.
#[derive(Clone)]
pub struct AppServices {
    pub purchase_orders: Arc<purchase_orders::PurchaseOrderService>,
    pub receiving_reports: Arc<receiving_reports::ReceivingReportService>,
    pub service_invoices: Arc<service_invoices::ServiceInvoiceService>,
    pub suppliers: Arc<suppliers::SupplierService>,
}

impl AppServices {
    pub fn new(db: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self {
            purchase_orders: Arc::new(purchase_orders::PurchaseOrderService::new(
                db.clone(),
                event_sender.clone(),
            )),
            receiving_reports: Arc::new(receiving_reports::ReceivingReportService::new(
                db.clone(),
                event_sender.clone(),
            )),
            service_invoices: Arc::new(service_invoices::ServiceInvoiceService::new(
                db.clone(),
                event_sender.clone(),
            )),
            suppliers: Arc::new(suppliers::SupplierService::new(db, event_sender)),
        }
    }
}

/// Attempts at allocating a document number before giving up with a conflict.
/// Each retry re-reads the current maximum, so this only loses to sustained
/// concurrent creation on the same station.
pub(crate) const NUMBER_ALLOCATION_ATTEMPTS: u32 = 3;
