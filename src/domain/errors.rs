use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("Vendor {vendor_id} is already assigned to order {order_id}")]
    DuplicateAssignment { order_id: Uuid, vendor_id: Uuid },

    #[error("Order item {0} is already covered by an active assignment")]
    ItemAlreadyAssigned(Uuid),

    #[error("Invalid transition from '{from}' to '{to}'")]
    InvalidTransition { from: String, to: String },

    #[error("Approval token not found")]
    TokenNotFound,

    #[error("Approval token has expired")]
    TokenExpired,

    #[error("Proof has already been responded to")]
    AlreadyResponded,

    #[error("Store connector unavailable: {message}")]
    ConnectorUnavailable { message: String, retryable: bool },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn not_found(what: &str, id: Uuid) -> Self {
        DomainError::NotFound(format!("{} {}", what, id))
    }

    pub fn invalid_transition(from: impl ToString, to: impl ToString) -> Self {
        DomainError::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_names_the_entity() {
        let id = Uuid::nil();
        assert_eq!(
            DomainError::not_found("Order", id).to_string(),
            format!("Order {} not found", id)
        );
    }

    #[test]
    fn invalid_transition_display() {
        let err = DomainError::invalid_transition("completed", "accepted");
        assert_eq!(
            err.to_string(),
            "Invalid transition from 'completed' to 'accepted'"
        );
    }
}
