use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

text_enum! {
    pub enum ProofType {
        DesignProof => "design_proof",
        ProductionProof => "production_proof",
    }
}

text_enum! {
    pub enum ProofStatus {
        Pending => "pending",
        Approved => "approved",
        Rejected => "rejected",
        RevisionRequested => "revision_requested",
    }
}

text_enum! {
    /// What a customer can answer to a proof.
    pub enum ProofDecision {
        Approved => "approved",
        Rejected => "rejected",
        RevisionRequested => "revision_requested",
    }
}

text_enum! {
    pub enum ProductionProofState {
        Pending => "pending",
        Approved => "approved",
    }
}

impl From<ProofDecision> for ProofStatus {
    fn from(d: ProofDecision) -> Self {
        match d {
            ProofDecision::Approved => ProofStatus::Approved,
            ProofDecision::Rejected => ProofStatus::Rejected,
            ProofDecision::RevisionRequested => ProofStatus::RevisionRequested,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProofApproval {
    pub id: Uuid,
    pub order_id: Uuid,
    pub order_item_id: Option<Uuid>,
    pub vendor_assignment_id: Option<Uuid>,
    pub proof_type: ProofType,
    #[serde(skip_serializing)]
    pub approval_token: String,
    pub status: ProofStatus,
    pub image_urls: Vec<String>,
    pub customer_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub responded_at: Option<DateTime<Utc>>,
}

impl ProofApproval {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// Caller request for `ProofService::create_proof`.
#[derive(Debug, Clone)]
pub struct CreateProof {
    pub order_id: Uuid,
    pub order_item_id: Option<Uuid>,
    pub vendor_assignment_id: Option<Uuid>,
    pub proof_type: ProofType,
    pub image_urls: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct NewProof {
    pub order_id: Uuid,
    pub order_item_id: Option<Uuid>,
    pub vendor_assignment_id: Option<Uuid>,
    pub proof_type: ProofType,
    pub approval_token: String,
    pub image_urls: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Who answered a proof, kept for the audit log.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RequesterMetadata {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

/// A customer response about to be applied with compare-and-swap semantics.
#[derive(Debug, Clone)]
pub struct ProofResponse {
    pub proof_id: Uuid,
    pub decision: ProofDecision,
    pub notes: Option<String>,
    pub requester: RequesterMetadata,
    pub responded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProofResponseLog {
    pub id: Uuid,
    pub proof_approval_id: Uuid,
    pub decision: ProofDecision,
    pub notes: Option<String>,
    pub responder_ip: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderProductionStatus {
    pub id: Uuid,
    pub order_id: Uuid,
    pub vendor_assignment_id: Option<Uuid>,
    pub design_proof_status: ProductionProofState,
    pub production_proof_status: ProductionProofState,
    pub updated_at: DateTime<Utc>,
}
