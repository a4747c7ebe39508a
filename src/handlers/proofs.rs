use actix_web::http::header;
use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use utoipa::ToSchema;

use super::{blocking, AppState};
use crate::domain::proof::{ProofDecision, RequesterMetadata};
use crate::errors::AppError;

#[derive(Debug, Deserialize, ToSchema)]
pub struct RespondToProofRequest {
    #[schema(value_type = String, example = "approved")]
    pub decision: ProofDecision,
    pub notes: Option<String>,
}

fn requester_metadata(req: &HttpRequest) -> RequesterMetadata {
    RequesterMetadata {
        ip: req
            .connection_info()
            .realip_remote_addr()
            .map(str::to_string),
        user_agent: req
            .headers()
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    }
}

/// GET /proofs/{token}
///
/// Customer-facing view of a proof. The token in the path is the only
/// credential.
#[utoipa::path(
    get,
    path = "/proofs/{token}",
    params(("token" = String, Path, description = "Approval token")),
    responses(
        (status = 200, description = "Proof found"),
        (status = 404, description = "Unknown token"),
    ),
    tag = "proofs"
)]
pub async fn get_proof(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let token = path.into_inner();
    let proofs = state.proofs.clone();
    let proof = blocking(move || proofs.proof_by_token(&token)).await?;
    Ok(HttpResponse::Ok().json(proof))
}

/// POST /proofs/{token}/respond
#[utoipa::path(
    post,
    path = "/proofs/{token}/respond",
    params(("token" = String, Path, description = "Approval token")),
    request_body = RespondToProofRequest,
    responses(
        (status = 200, description = "Response recorded"),
        (status = 404, description = "Unknown token"),
        (status = 409, description = "Proof already answered"),
        (status = 410, description = "Token expired"),
    ),
    tag = "proofs"
)]
pub async fn respond_to_proof(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
    body: web::Json<RespondToProofRequest>,
) -> Result<HttpResponse, AppError> {
    let token = path.into_inner();
    let body = body.into_inner();
    let requester = requester_metadata(&req);
    let proofs = state.proofs.clone();
    let proof = blocking(move || {
        proofs.respond_to_proof(&token, body.decision, body.notes, requester)
    })
    .await?;
    Ok(HttpResponse::Ok().json(proof))
}

/// GET /proofs/{token}/responses
#[utoipa::path(
    get,
    path = "/proofs/{token}/responses",
    params(("token" = String, Path, description = "Approval token")),
    responses(
        (status = 200, description = "Response log, oldest first"),
        (status = 404, description = "Unknown token"),
    ),
    tag = "proofs"
)]
pub async fn proof_responses(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let token = path.into_inner();
    let proofs = state.proofs.clone();
    let log = blocking(move || {
        let proof = proofs.proof_by_token(&token)?;
        proofs.proof_responses(proof.id)
    })
    .await?;
    Ok(HttpResponse::Ok().json(log))
}
