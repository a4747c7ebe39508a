//! Transition rules for orders and vendor assignments.
//!
//! Both machines treat re-applying the current status as a no-op success so
//! that retried requests (a vendor pressing "accept" twice) never fail.

use super::assignment::AssignmentStatus;
use super::errors::DomainError;
use super::order::OrderStatus;

/// Outcome of checking a requested transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition<S> {
    /// The entity is already in the target status.
    Unchanged,
    /// The entity moves from `from` to `to`.
    Apply { from: S, to: S },
}

pub fn order_transition(
    from: OrderStatus,
    to: OrderStatus,
) -> Result<Transition<OrderStatus>, DomainError> {
    use OrderStatus::*;

    if from == to {
        return Ok(Transition::Unchanged);
    }
    let legal = match (from, to) {
        (Pending, Processing) | (Processing, Shipped) | (Shipped, Fulfilled) => true,
        (Pending | Processing | Shipped, Cancelled) => true,
        _ => false,
    };
    if legal {
        Ok(Transition::Apply { from, to })
    } else {
        Err(DomainError::invalid_transition(from, to))
    }
}

pub fn assignment_transition(
    from: AssignmentStatus,
    to: AssignmentStatus,
) -> Result<Transition<AssignmentStatus>, DomainError> {
    use AssignmentStatus::*;

    if from == to {
        return Ok(Transition::Unchanged);
    }
    let legal = match (from, to) {
        (Assigned, Accepted) => true,
        (Accepted, InProgress) => true,
        // Vendors may complete straight from accepted.
        (Accepted | InProgress, Completed) => true,
        // Once work has started only completion closes the assignment.
        (Assigned | Accepted, Cancelled) => true,
        _ => false,
    };
    if legal {
        Ok(Transition::Apply { from, to })
    } else {
        Err(DomainError::invalid_transition(from, to))
    }
}
