//! Domain events handed to the notification dispatcher through the outbox.

use serde::Serialize;
use serde_json::{json, Value};
use uuid::Uuid;

use super::monitor::Alert;
use super::order::{Order, OrderStatusChange};
use super::proof::{ProofApproval, ProofResponse};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutboxMessage {
    pub aggregate_type: &'static str,
    pub aggregate_id: String,
    pub event_type: &'static str,
    pub payload: Value,
}

pub fn order_created(order: &Order, item_count: usize) -> OutboxMessage {
    OutboxMessage {
        aggregate_type: "Order",
        aggregate_id: order.id.to_string(),
        event_type: "OrderCreated",
        payload: json!({
            "order_id": order.id,
            "store_id": order.store_id,
            "external_order_id": order.external_order_id,
            "status": order.status,
            "total_amount": order.total_amount.to_string(),
            "currency": order.currency,
            "item_count": item_count,
        }),
    }
}

pub fn order_status_changed(change: &OrderStatusChange) -> OutboxMessage {
    OutboxMessage {
        aggregate_type: "Order",
        aggregate_id: change.order_id.to_string(),
        event_type: "OrderStatusChanged",
        payload: json!({
            "order_id": change.order_id,
            "old_status": change.from,
            "new_status": change.to,
            "actor": change.actor,
            "notes": change.notes,
            "changed_at": change.at,
        }),
    }
}

/// The token is included so the dispatcher can build the customer link.
pub fn proof_created(proof: &ProofApproval) -> OutboxMessage {
    OutboxMessage {
        aggregate_type: "ProofApproval",
        aggregate_id: proof.id.to_string(),
        event_type: "ProofCreated",
        payload: json!({
            "proof_id": proof.id,
            "order_id": proof.order_id,
            "order_item_id": proof.order_item_id,
            "vendor_assignment_id": proof.vendor_assignment_id,
            "proof_type": proof.proof_type,
            "approval_token": proof.approval_token,
            "image_urls": proof.image_urls,
            "expires_at": proof.expires_at,
        }),
    }
}

pub fn proof_responded(proof_order_id: Uuid, response: &ProofResponse) -> OutboxMessage {
    OutboxMessage {
        aggregate_type: "ProofApproval",
        aggregate_id: response.proof_id.to_string(),
        event_type: "ProofResponded",
        payload: json!({
            "proof_id": response.proof_id,
            "order_id": proof_order_id,
            "decision": response.decision,
            "notes": response.notes,
            "responded_at": response.responded_at,
        }),
    }
}

pub fn alert_raised(alert: &Alert) -> OutboxMessage {
    OutboxMessage {
        aggregate_type: "Alert",
        aggregate_id: alert.id.to_string(),
        event_type: "AlertRaised",
        payload: json!({
            "alert_id": alert.id,
            "alert_type": alert.alert_type,
            "subject_kind": alert.subject_kind,
            "subject_id": alert.subject_id,
            "order_id": alert.order_id,
            "overdue_minutes": alert.overdue_minutes,
            "created_at": alert.created_at,
        }),
    }
}
