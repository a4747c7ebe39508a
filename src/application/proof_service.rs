//! Customer proof approvals.
//!
//! A proof is published with an unguessable token that the customer uses to
//! approve, reject or ask for a revision exactly once before the token
//! expires. The single-response guarantee lives in storage: the repository
//! only applies a response while the proof is still pending.

use chrono::{DateTime, Duration, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::ports::{AssignmentRepository, OrderRepository, ProofRepository};
use crate::domain::proof::{
    CreateProof, NewProof, OrderProductionStatus, ProofApproval, ProofDecision, ProofResponse,
    ProofResponseLog, ProofStatus, RequesterMetadata,
};

/// Random bytes behind each approval token (hex encoded to twice the length).
const TOKEN_BYTES: usize = 32;

pub struct ProofService<R> {
    repo: R,
    ttl: Duration,
}

impl<R> ProofService<R>
where
    R: OrderRepository + AssignmentRepository + ProofRepository,
{
    pub fn new(repo: R, ttl: Duration) -> Self {
        Self { repo, ttl }
    }

    pub fn create_proof(&self, request: CreateProof) -> Result<ProofApproval, DomainError> {
        self.create_proof_at(request, Utc::now())
    }

    pub fn create_proof_at(
        &self,
        request: CreateProof,
        now: DateTime<Utc>,
    ) -> Result<ProofApproval, DomainError> {
        let order_id = request.order_id;
        self.repo
            .find_order(order_id)?
            .ok_or_else(|| DomainError::not_found("Order", order_id))?;

        let image_urls: Vec<String> = request
            .image_urls
            .into_iter()
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())
            .collect();
        if image_urls.is_empty() {
            return Err(DomainError::InvalidInput(
                "a proof needs at least one image".to_string(),
            ));
        }

        if let Some(item_id) = request.order_item_id {
            let items = self.repo.order_items(order_id)?;
            if !items.iter().any(|i| i.id == item_id) {
                return Err(DomainError::InvalidInput(format!(
                    "item {} does not belong to order {}",
                    item_id, order_id
                )));
            }
        }
        if let Some(assignment_id) = request.vendor_assignment_id {
            let assignment = self
                .repo
                .find_assignment(assignment_id)?
                .ok_or_else(|| DomainError::not_found("Assignment", assignment_id))?;
            if assignment.order_id != order_id {
                return Err(DomainError::InvalidInput(format!(
                    "assignment {} does not belong to order {}",
                    assignment_id, order_id
                )));
            }
        }

        let proof = self.repo.insert_proof(NewProof {
            order_id,
            order_item_id: request.order_item_id,
            vendor_assignment_id: request.vendor_assignment_id,
            proof_type: request.proof_type,
            approval_token: generate_token(),
            image_urls,
            created_at: now,
            expires_at: now + self.ttl,
        })?;
        log::info!(
            "Created {} {} for order {}, expires {}",
            proof.proof_type,
            proof.id,
            order_id,
            proof.expires_at
        );
        Ok(proof)
    }

    pub fn respond_to_proof(
        &self,
        token: &str,
        decision: ProofDecision,
        notes: Option<String>,
        requester: RequesterMetadata,
    ) -> Result<ProofApproval, DomainError> {
        self.respond_to_proof_at(token, decision, notes, requester, Utc::now())
    }

    /// Checks run in a fixed order: unknown token, expiry (even while still
    /// pending), then an earlier response.
    pub fn respond_to_proof_at(
        &self,
        token: &str,
        decision: ProofDecision,
        notes: Option<String>,
        requester: RequesterMetadata,
        now: DateTime<Utc>,
    ) -> Result<ProofApproval, DomainError> {
        let proof = self.proof_by_token(token)?;
        if proof.is_expired_at(now) {
            return Err(DomainError::TokenExpired);
        }
        if proof.status != ProofStatus::Pending {
            return Err(DomainError::AlreadyResponded);
        }

        let response = ProofResponse {
            proof_id: proof.id,
            decision,
            notes: notes.filter(|n| !n.trim().is_empty()),
            requester,
            responded_at: now,
        };
        match self.repo.record_proof_response(&response)? {
            Some(updated) => {
                log::info!("Proof {} {}", updated.id, decision);
                Ok(updated)
            }
            None => {
                log::warn!("Proof {} was answered concurrently", proof.id);
                Err(DomainError::AlreadyResponded)
            }
        }
    }

    pub fn proof_by_token(&self, token: &str) -> Result<ProofApproval, DomainError> {
        self.repo
            .find_proof_by_token(token)?
            .ok_or(DomainError::TokenNotFound)
    }

    pub fn proof_responses(&self, proof_id: Uuid) -> Result<Vec<ProofResponseLog>, DomainError> {
        self.repo.proof_responses(proof_id)
    }

    pub fn production_status(
        &self,
        order_id: Uuid,
        vendor_assignment_id: Option<Uuid>,
    ) -> Result<OrderProductionStatus, DomainError> {
        self.repo
            .production_status(order_id, vendor_assignment_id)?
            .ok_or_else(|| {
                DomainError::NotFound(format!("Production status for order {}", order_id))
            })
    }
}

fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}
