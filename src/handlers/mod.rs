pub mod assignments;
pub mod monitor;
pub mod orders;
pub mod proofs;
pub mod stores;

use std::sync::Arc;

use actix_web::web;
use utoipa::OpenApi;

use crate::application::assignment_service::AssignmentService;
use crate::application::fulfillment_service::FulfillmentService;
use crate::application::ingestion_service::IngestionService;
use crate::application::monitor_service::MonitorService;
use crate::application::proof_service::ProofService;
use crate::connectors::HttpConnectorFactory;
use crate::domain::errors::DomainError;
use crate::errors::AppError;
use crate::infrastructure::diesel_repo::DieselRepository;

/// Services shared by every worker, all backed by the Postgres repository.
#[derive(Clone)]
pub struct AppState {
    pub ingestion: Arc<IngestionService<DieselRepository, HttpConnectorFactory>>,
    pub assignments: Arc<AssignmentService<DieselRepository>>,
    pub fulfillment: Arc<FulfillmentService<DieselRepository>>,
    pub proofs: Arc<ProofService<DieselRepository>>,
    pub monitor: Arc<MonitorService<DieselRepository>>,
}

/// Run a synchronous service call on the blocking pool.
pub(crate) async fn blocking<T, F>(f: F) -> Result<T, AppError>
where
    F: FnOnce() -> Result<T, DomainError> + Send + 'static,
    T: Send + 'static,
{
    Ok(web::block(f).await??)
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/stores")
            .route("/sync", web::post().to(stores::sync_all_stores))
            .route("/{id}/sync", web::post().to(stores::sync_store))
            .route("/{id}/products/sync", web::post().to(stores::sync_products))
            .route("/{id}/connection", web::get().to(stores::test_connection)),
    )
    .service(
        web::scope("/orders")
            .route("/{id}", web::get().to(orders::get_order))
            .route("/{id}/history", web::get().to(orders::order_history))
            .route("/{id}/status", web::post().to(orders::transition_order))
            .route("/{id}/assignments", web::post().to(orders::assign_vendor))
            .route("/{id}/proofs", web::post().to(orders::create_proof))
            .route(
                "/{id}/production-status",
                web::get().to(orders::production_status),
            ),
    )
    .service(
        web::scope("/assignments")
            .route("/bulk", web::post().to(assignments::bulk_assign_vendor))
            .route("/{id}/status", web::post().to(assignments::transition_assignment))
            .route("/{id}/tracking", web::post().to(assignments::add_tracking)),
    )
    .route(
        "/item-assignments/{id}",
        web::delete().to(assignments::remove_item_assignment),
    )
    .route(
        "/tracking/{id}/status",
        web::post().to(assignments::update_tracking_status),
    )
    .route(
        "/products/{id}/vendors",
        web::post().to(assignments::link_product_vendor),
    )
    .service(
        web::scope("/proofs")
            .route("/{token}", web::get().to(proofs::get_proof))
            .route("/{token}/respond", web::post().to(proofs::respond_to_proof))
            .route("/{token}/responses", web::get().to(proofs::proof_responses)),
    )
    .service(
        web::scope("/monitor")
            .route("/run", web::post().to(monitor::run_sweep))
            .route("/thresholds", web::get().to(monitor::get_thresholds))
            .route("/thresholds", web::put().to(monitor::update_thresholds))
            .route("/alerts", web::get().to(monitor::recent_alerts)),
    );
}

#[derive(OpenApi)]
#[openapi(
    paths(
        stores::sync_all_stores,
        stores::sync_store,
        stores::sync_products,
        stores::test_connection,
        orders::get_order,
        orders::order_history,
        orders::transition_order,
        orders::assign_vendor,
        orders::create_proof,
        orders::production_status,
        assignments::bulk_assign_vendor,
        assignments::transition_assignment,
        assignments::add_tracking,
        assignments::remove_item_assignment,
        assignments::update_tracking_status,
        assignments::link_product_vendor,
        proofs::get_proof,
        proofs::respond_to_proof,
        proofs::proof_responses,
        monitor::run_sweep,
        monitor::get_thresholds,
        monitor::update_thresholds,
        monitor::recent_alerts,
    ),
    components(schemas(
        orders::TransitionOrderRequest,
        orders::AssignVendorRequest,
        orders::CreateProofRequest,
        assignments::BulkAssignRequest,
        assignments::TransitionAssignmentRequest,
        assignments::AddTrackingRequest,
        assignments::TrackingStatusRequest,
        assignments::LinkProductVendorRequest,
        proofs::RespondToProofRequest,
        monitor::ThresholdsBody,
    )),
    tags(
        (name = "stores", description = "Storefront synchronisation"),
        (name = "orders", description = "Orders, assignment and proofs"),
        (name = "assignments", description = "Vendor assignments and shipment tracking"),
        (name = "proofs", description = "Customer proof approval"),
        (name = "monitor", description = "SLA monitor"),
    )
)]
pub struct ApiDoc;
