use chrono::Utc;
use uuid::Uuid;

use crate::domain::assignment::{AssignmentStatus, VendorAssignment};
use crate::domain::errors::DomainError;
use crate::domain::lifecycle::{assignment_transition, order_transition, Transition};
use crate::domain::order::{Order, OrderDetails, OrderStatus, OrderStatusChange, OrderStatusHistory};
use crate::domain::ports::{AssignmentRepository, OrderRepository, TrackingRepository};
use crate::domain::tracking::{NewTracking, ShipmentTracking, TrackingStatus};

pub struct FulfillmentService<R> {
    repo: R,
}

impl<R> FulfillmentService<R>
where
    R: OrderRepository + AssignmentRepository + TrackingRepository,
{
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Move an order along its lifecycle. Re-applying the current status
    /// returns the order untouched and writes no history.
    pub fn transition_order(
        &self,
        order_id: Uuid,
        to: OrderStatus,
        actor: &str,
        notes: Option<String>,
    ) -> Result<Order, DomainError> {
        let order = self.order(order_id)?;
        let (from, to) = match order_transition(order.status, to)? {
            Transition::Unchanged => return Ok(order),
            Transition::Apply { from, to } => (from, to),
        };

        let change = OrderStatusChange {
            order_id,
            from,
            to,
            actor: actor.to_string(),
            notes,
            at: Utc::now(),
        };
        match self.repo.update_order_status(&change)? {
            Some(updated) => {
                log::info!("Order {} moved {} -> {} by {}", order_id, from, to, actor);
                Ok(updated)
            }
            // A concurrent writer got there first; arriving at the same
            // status is the same outcome.
            None => {
                let current = self.order(order_id)?;
                if current.status == to {
                    return Ok(current);
                }
                Err(DomainError::invalid_transition(current.status, to))
            }
        }
    }

    pub fn transition_assignment(
        &self,
        assignment_id: Uuid,
        to: AssignmentStatus,
    ) -> Result<VendorAssignment, DomainError> {
        let assignment = self.assignment(assignment_id)?;
        let (from, to) = match assignment_transition(assignment.status, to)? {
            Transition::Unchanged => return Ok(assignment),
            Transition::Apply { from, to } => (from, to),
        };

        match self
            .repo
            .update_assignment_status(assignment_id, from, to, Utc::now())?
        {
            Some(updated) => {
                log::info!("Assignment {} moved {} -> {}", assignment_id, from, to);
                Ok(updated)
            }
            None => {
                let current = self.assignment(assignment_id)?;
                if current.status == to {
                    return Ok(current);
                }
                Err(DomainError::invalid_transition(current.status, to))
            }
        }
    }

    pub fn add_tracking(
        &self,
        assignment_id: Uuid,
        carrier: &str,
        tracking_number: &str,
    ) -> Result<ShipmentTracking, DomainError> {
        let (carrier, tracking_number) = (carrier.trim(), tracking_number.trim());
        if carrier.is_empty() || tracking_number.is_empty() {
            return Err(DomainError::InvalidInput(
                "carrier and tracking number are required".to_string(),
            ));
        }
        let assignment = self.assignment(assignment_id)?;
        if assignment.status == AssignmentStatus::Cancelled {
            return Err(DomainError::InvalidInput(format!(
                "assignment {} is cancelled",
                assignment_id
            )));
        }
        let tracking = self.repo.insert_tracking(NewTracking {
            order_id: assignment.order_id,
            vendor_assignment_id: assignment.id,
            carrier: carrier.to_string(),
            tracking_number: tracking_number.to_string(),
            created_at: Utc::now(),
        })?;
        log::info!(
            "Added {} tracking {} to assignment {}",
            tracking.carrier,
            tracking.tracking_number,
            assignment_id
        );
        Ok(tracking)
    }

    pub fn update_tracking_status(
        &self,
        tracking_id: Uuid,
        status: TrackingStatus,
    ) -> Result<ShipmentTracking, DomainError> {
        let tracking = self
            .repo
            .find_tracking(tracking_id)?
            .ok_or_else(|| DomainError::not_found("Tracking", tracking_id))?;
        if tracking.status == status {
            return Ok(tracking);
        }
        self.repo
            .update_tracking_status(tracking_id, status, Utc::now())?
            .ok_or_else(|| DomainError::not_found("Tracking", tracking_id))
    }

    pub fn order_details(&self, order_id: Uuid) -> Result<OrderDetails, DomainError> {
        let order = self.order(order_id)?;
        Ok(OrderDetails {
            items: self.repo.order_items(order_id)?,
            assignments: self.repo.assignments_for_order(order_id)?,
            order,
        })
    }

    pub fn order_history(&self, order_id: Uuid) -> Result<Vec<OrderStatusHistory>, DomainError> {
        self.order(order_id)?;
        self.repo.order_history(order_id)
    }

    fn order(&self, id: Uuid) -> Result<Order, DomainError> {
        self.repo
            .find_order(id)?
            .ok_or_else(|| DomainError::not_found("Order", id))
    }

    fn assignment(&self, id: Uuid) -> Result<VendorAssignment, DomainError> {
        self.repo
            .find_assignment(id)?
            .ok_or_else(|| DomainError::not_found("Assignment", id))
    }
}
