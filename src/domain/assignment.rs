use bigdecimal::{BigDecimal, RoundingMode};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::errors::DomainError;

text_enum! {
    pub enum AssignmentType {
        Full => "full",
        Partial => "partial",
    }
}

text_enum! {
    /// Vendor-side lifecycle of an assignment.
    pub enum AssignmentStatus {
        Assigned => "assigned",
        Accepted => "accepted",
        InProgress => "in_progress",
        Completed => "completed",
        Cancelled => "cancelled",
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Vendor {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    /// Percentage of the assigned value, e.g. `15` for 15%.
    pub commission_rate: BigDecimal,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct VendorAssignment {
    pub id: Uuid,
    pub order_id: Uuid,
    pub vendor_id: Uuid,
    pub assignment_type: AssignmentType,
    pub status: AssignmentStatus,
    pub commission_amount: BigDecimal,
    pub notes: Option<String>,
    pub assigned_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ItemAssignment {
    pub id: Uuid,
    pub vendor_assignment_id: Uuid,
    pub order_item_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssignmentWithItems {
    pub assignment: VendorAssignment,
    pub items: Vec<ItemAssignment>,
}

/// Fully validated assignment, ready for storage.
#[derive(Debug, Clone)]
pub struct NewAssignment {
    pub order_id: Uuid,
    pub vendor_id: Uuid,
    pub assignment_type: AssignmentType,
    pub commission_amount: BigDecimal,
    pub notes: Option<String>,
    pub order_item_ids: Vec<Uuid>,
    pub assigned_at: DateTime<Utc>,
}

/// Caller request for `AssignmentService::assign_vendor`.
#[derive(Debug, Clone)]
pub struct AssignVendor {
    pub order_id: Uuid,
    pub vendor_id: Uuid,
    pub assignment_type: AssignmentType,
    pub item_ids: Vec<Uuid>,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BulkAssignFailure {
    pub order_id: Uuid,
    #[serde(serialize_with = "serialize_error")]
    pub error: DomainError,
}

#[derive(Debug, Default, Serialize)]
pub struct BulkAssignReport {
    pub assigned: Vec<AssignmentWithItems>,
    pub failures: Vec<BulkAssignFailure>,
}

/// Outcome of default-vendor assignment for one order. A vendor that cannot
/// take its items is recorded and the remaining vendors are still assigned.
#[derive(Debug, Default)]
pub struct AutoAssignReport {
    pub created: Vec<AssignmentWithItems>,
    pub failures: Vec<AutoAssignFailure>,
}

#[derive(Debug)]
pub struct AutoAssignFailure {
    pub vendor_id: Uuid,
    pub error: DomainError,
}

fn serialize_error<S: serde::Serializer>(err: &DomainError, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&err.to_string())
}

/// `base * rate / 100`, rounded half-up to cents.
pub fn commission(base: &BigDecimal, rate_percent: &BigDecimal) -> BigDecimal {
    (base * rate_percent / BigDecimal::from(100)).with_scale_round(2, RoundingMode::HalfUp)
}

/// Commission over the whole order total.
pub fn full_commission(order_total: &BigDecimal, rate_percent: &BigDecimal) -> BigDecimal {
    commission(order_total, rate_percent)
}

/// Commission over the summed `total_price` of the covered items.
pub fn partial_commission<'a>(
    item_totals: impl IntoIterator<Item = &'a BigDecimal>,
    rate_percent: &BigDecimal,
) -> BigDecimal {
    let base = item_totals
        .into_iter()
        .fold(BigDecimal::from(0), |acc, total| acc + total);
    commission(&base, rate_percent)
}
