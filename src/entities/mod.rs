pub mod audit_trail;
pub mod purchase_order;
pub mod receiving_report;
pub mod service_invoice;
pub mod supplier;
