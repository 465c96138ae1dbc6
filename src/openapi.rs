use utoipa::OpenApi;

use crate::handlers;

/// OpenAPI document for the back-office API. Served as plain JSON; the UI
/// lives wherever operations points it.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Mobility Back-Office API",
        description = "Document lifecycle management for station retail operations"
    ),
    paths(
        handlers::purchase_orders::create_purchase_order,
        handlers::purchase_orders::get_purchase_order,
        handlers::purchase_orders::list_purchase_orders,
        handlers::purchase_orders::post_purchase_order,
        handlers::purchase_orders::void_purchase_order,
        handlers::purchase_orders::cancel_purchase_order,
        handlers::receiving_reports::create_receiving_report,
        handlers::receiving_reports::get_receiving_report,
        handlers::receiving_reports::list_receiving_reports,
        handlers::receiving_reports::post_receiving_report,
        handlers::receiving_reports::void_receiving_report,
        handlers::receiving_reports::cancel_receiving_report,
        handlers::service_invoices::create_service_invoice,
        handlers::service_invoices::get_service_invoice,
        handlers::service_invoices::list_service_invoices,
        handlers::service_invoices::post_service_invoice,
        handlers::service_invoices::void_service_invoice,
        handlers::service_invoices::cancel_service_invoice,
        handlers::suppliers::create_supplier,
        handlers::suppliers::get_supplier,
        handlers::suppliers::list_suppliers,
    ),
    components(schemas(
        handlers::purchase_orders::CreatePurchaseOrderRequest,
        handlers::receiving_reports::CreateReceivingReportRequest,
        handlers::service_invoices::CreateServiceInvoiceRequest,
        handlers::suppliers::CreateSupplierRequest,
        handlers::common::CancelRequest,
    )),
    tags(
        (name = "purchase-orders", description = "Purchase order lifecycle"),
        (name = "receiving-reports", description = "Receiving report lifecycle"),
        (name = "service-invoices", description = "Service invoice lifecycle"),
        (name = "suppliers", description = "Supplier registry"),
        (name = "health", description = "Service health")
    )
)]
pub struct ApiDoc;
