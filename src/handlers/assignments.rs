use actix_web::{web, HttpResponse};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use super::{blocking, AppState};
use crate::domain::assignment::AssignmentStatus;
use crate::domain::errors::DomainError;
use crate::domain::tracking::TrackingStatus;
use crate::errors::AppError;

const MAX_BULK_ORDERS: usize = 500;

#[derive(Debug, Deserialize, ToSchema)]
pub struct BulkAssignRequest {
    pub order_ids: Vec<Uuid>,
    pub vendor_id: Uuid,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TransitionAssignmentRequest {
    #[schema(value_type = String, example = "accepted")]
    pub status: AssignmentStatus,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddTrackingRequest {
    pub carrier: String,
    pub tracking_number: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TrackingStatusRequest {
    #[schema(value_type = String, example = "in_transit")]
    pub status: TrackingStatus,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LinkProductVendorRequest {
    pub vendor_id: Uuid,
    #[serde(default)]
    pub is_default: bool,
}

/// POST /assignments/bulk
///
/// Full assignment of each listed order to one vendor. Per-order failures are
/// returned alongside the created assignments.
#[utoipa::path(
    post,
    path = "/assignments/bulk",
    request_body = BulkAssignRequest,
    responses(
        (status = 200, description = "Created assignments and per-order failures"),
        (status = 400, description = "Empty or oversized order list, or inactive vendor"),
        (status = 404, description = "Vendor not found"),
    ),
    tag = "assignments"
)]
pub async fn bulk_assign_vendor(
    state: web::Data<AppState>,
    body: web::Json<BulkAssignRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    if body.order_ids.is_empty() || body.order_ids.len() > MAX_BULK_ORDERS {
        return Err(DomainError::InvalidInput(format!(
            "order_ids must contain between 1 and {} orders",
            MAX_BULK_ORDERS
        ))
        .into());
    }
    let assignments = state.assignments.clone();
    let report = blocking(move || {
        assignments.bulk_assign_vendor(&body.order_ids, body.vendor_id, body.notes)
    })
    .await?;
    Ok(HttpResponse::Ok().json(report))
}

/// POST /assignments/{id}/status
#[utoipa::path(
    post,
    path = "/assignments/{id}/status",
    params(("id" = Uuid, Path, description = "Vendor assignment UUID")),
    request_body = TransitionAssignmentRequest,
    responses(
        (status = 200, description = "Assignment after the transition"),
        (status = 404, description = "Assignment not found"),
        (status = 409, description = "Transition not allowed from the current status"),
    ),
    tag = "assignments"
)]
pub async fn transition_assignment(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<TransitionAssignmentRequest>,
) -> Result<HttpResponse, AppError> {
    let assignment_id = path.into_inner();
    let to = body.into_inner().status;
    let fulfillment = state.fulfillment.clone();
    let assignment = blocking(move || fulfillment.transition_assignment(assignment_id, to)).await?;
    Ok(HttpResponse::Ok().json(assignment))
}

/// POST /assignments/{id}/tracking
#[utoipa::path(
    post,
    path = "/assignments/{id}/tracking",
    params(("id" = Uuid, Path, description = "Vendor assignment UUID")),
    request_body = AddTrackingRequest,
    responses(
        (status = 201, description = "Tracking row created"),
        (status = 400, description = "Blank carrier/number or cancelled assignment"),
        (status = 404, description = "Assignment not found"),
    ),
    tag = "assignments"
)]
pub async fn add_tracking(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<AddTrackingRequest>,
) -> Result<HttpResponse, AppError> {
    let assignment_id = path.into_inner();
    let body = body.into_inner();
    let fulfillment = state.fulfillment.clone();
    let tracking = blocking(move || {
        fulfillment.add_tracking(assignment_id, &body.carrier, &body.tracking_number)
    })
    .await?;
    Ok(HttpResponse::Created().json(tracking))
}

/// DELETE /item-assignments/{id}
///
/// Unlinks one item from its assignment. The parent assignment and its
/// commission are left as they are.
#[utoipa::path(
    delete,
    path = "/item-assignments/{id}",
    params(("id" = Uuid, Path, description = "Item assignment UUID")),
    responses(
        (status = 200, description = "The removed link"),
        (status = 404, description = "Item assignment not found"),
    ),
    tag = "assignments"
)]
pub async fn remove_item_assignment(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let assignments = state.assignments.clone();
    let removed = blocking(move || assignments.remove_item_assignment(id)).await?;
    Ok(HttpResponse::Ok().json(removed))
}

/// POST /tracking/{id}/status
#[utoipa::path(
    post,
    path = "/tracking/{id}/status",
    params(("id" = Uuid, Path, description = "Shipment tracking UUID")),
    request_body = TrackingStatusRequest,
    responses(
        (status = 200, description = "Updated tracking row"),
        (status = 404, description = "Tracking row not found"),
    ),
    tag = "assignments"
)]
pub async fn update_tracking_status(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<TrackingStatusRequest>,
) -> Result<HttpResponse, AppError> {
    let tracking_id = path.into_inner();
    let status = body.into_inner().status;
    let fulfillment = state.fulfillment.clone();
    let tracking =
        blocking(move || fulfillment.update_tracking_status(tracking_id, status)).await?;
    Ok(HttpResponse::Ok().json(tracking))
}

/// POST /products/{id}/vendors
#[utoipa::path(
    post,
    path = "/products/{id}/vendors",
    params(("id" = Uuid, Path, description = "Product UUID")),
    request_body = LinkProductVendorRequest,
    responses(
        (status = 200, description = "Product-vendor link"),
        (status = 404, description = "Product or vendor not found"),
    ),
    tag = "assignments"
)]
pub async fn link_product_vendor(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<LinkProductVendorRequest>,
) -> Result<HttpResponse, AppError> {
    let product_id = path.into_inner();
    let body = body.into_inner();
    let assignments = state.assignments.clone();
    let link = blocking(move || {
        assignments.link_product_vendor(product_id, body.vendor_id, body.is_default)
    })
    .await?;
    Ok(HttpResponse::Ok().json(link))
}
