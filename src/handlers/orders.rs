use actix_web::{web, HttpResponse};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use super::{blocking, AppState};
use crate::domain::assignment::{AssignVendor, AssignmentType};
use crate::domain::order::OrderStatus;
use crate::domain::proof::{CreateProof, ProofType};
use crate::errors::AppError;

// ── Request DTOs ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct TransitionOrderRequest {
    #[schema(value_type = String, example = "processing")]
    pub status: OrderStatus,
    /// Who requested the change, recorded in the status history.
    pub actor: String,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AssignVendorRequest {
    pub vendor_id: Uuid,
    #[schema(value_type = String, example = "partial")]
    pub assignment_type: AssignmentType,
    /// Required for partial assignments, must be empty for full ones.
    #[serde(default)]
    pub item_ids: Vec<Uuid>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateProofRequest {
    pub order_item_id: Option<Uuid>,
    pub vendor_assignment_id: Option<Uuid>,
    #[schema(value_type = String, example = "design_proof")]
    pub proof_type: ProofType,
    pub image_urls: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProductionStatusParams {
    pub vendor_assignment_id: Option<Uuid>,
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// GET /orders/{id}
///
/// Returns the order with its items and vendor assignments.
#[utoipa::path(
    get,
    path = "/orders/{id}",
    params(("id" = Uuid, Path, description = "Order UUID")),
    responses(
        (status = 200, description = "Order found"),
        (status = 404, description = "Order not found"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn get_order(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();
    let fulfillment = state.fulfillment.clone();
    let details = blocking(move || fulfillment.order_details(order_id)).await?;
    Ok(HttpResponse::Ok().json(details))
}

/// GET /orders/{id}/history
#[utoipa::path(
    get,
    path = "/orders/{id}/history",
    params(("id" = Uuid, Path, description = "Order UUID")),
    responses(
        (status = 200, description = "Status history, oldest first"),
        (status = 404, description = "Order not found"),
    ),
    tag = "orders"
)]
pub async fn order_history(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();
    let fulfillment = state.fulfillment.clone();
    let history = blocking(move || fulfillment.order_history(order_id)).await?;
    Ok(HttpResponse::Ok().json(history))
}

/// POST /orders/{id}/status
#[utoipa::path(
    post,
    path = "/orders/{id}/status",
    params(("id" = Uuid, Path, description = "Order UUID")),
    request_body = TransitionOrderRequest,
    responses(
        (status = 200, description = "Order after the transition"),
        (status = 404, description = "Order not found"),
        (status = 409, description = "Transition not allowed from the current status"),
    ),
    tag = "orders"
)]
pub async fn transition_order(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<TransitionOrderRequest>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();
    let body = body.into_inner();
    let fulfillment = state.fulfillment.clone();
    let order = blocking(move || {
        fulfillment.transition_order(order_id, body.status, &body.actor, body.notes)
    })
    .await?;
    Ok(HttpResponse::Ok().json(order))
}

/// POST /orders/{id}/assignments
#[utoipa::path(
    post,
    path = "/orders/{id}/assignments",
    params(("id" = Uuid, Path, description = "Order UUID")),
    request_body = AssignVendorRequest,
    responses(
        (status = 201, description = "Assignment created"),
        (status = 400, description = "Invalid item selection or inactive vendor"),
        (status = 404, description = "Order or vendor not found"),
        (status = 409, description = "Vendor or item already assigned"),
    ),
    tag = "orders"
)]
pub async fn assign_vendor(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<AssignVendorRequest>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();
    let body = body.into_inner();
    let assignments = state.assignments.clone();
    let created = blocking(move || {
        assignments.assign_vendor(AssignVendor {
            order_id,
            vendor_id: body.vendor_id,
            assignment_type: body.assignment_type,
            item_ids: body.item_ids,
            notes: body.notes,
        })
    })
    .await?;
    Ok(HttpResponse::Created().json(created))
}

/// POST /orders/{id}/proofs
///
/// Issues a proof with a fresh approval token. The customer link is sent by
/// the notification dispatcher from the `ProofCreated` event.
#[utoipa::path(
    post,
    path = "/orders/{id}/proofs",
    params(("id" = Uuid, Path, description = "Order UUID")),
    request_body = CreateProofRequest,
    responses(
        (status = 201, description = "Proof created"),
        (status = 400, description = "No images, or item/assignment outside the order"),
        (status = 404, description = "Order or assignment not found"),
    ),
    tag = "orders"
)]
pub async fn create_proof(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<CreateProofRequest>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();
    let body = body.into_inner();
    let proofs = state.proofs.clone();
    let proof = blocking(move || {
        proofs.create_proof(CreateProof {
            order_id,
            order_item_id: body.order_item_id,
            vendor_assignment_id: body.vendor_assignment_id,
            proof_type: body.proof_type,
            image_urls: body.image_urls,
        })
    })
    .await?;
    Ok(HttpResponse::Created().json(proof))
}

/// GET /orders/{id}/production-status
#[utoipa::path(
    get,
    path = "/orders/{id}/production-status",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
        ("vendor_assignment_id" = Option<Uuid>, Query, description = "Scope to one assignment"),
    ),
    responses(
        (status = 200, description = "Design and production proof state"),
        (status = 404, description = "No proof has been approved yet"),
    ),
    tag = "orders"
)]
pub async fn production_status(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    query: web::Query<ProductionStatusParams>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();
    let assignment_id = query.into_inner().vendor_assignment_id;
    let proofs = state.proofs.clone();
    let status = blocking(move || proofs.production_status(order_id, assignment_id)).await?;
    Ok(HttpResponse::Ok().json(status))
}
