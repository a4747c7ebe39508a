//! SLA thresholds and the pure rule evaluators behind the monitor.
//!
//! Every rule takes the candidate rows it needs plus `now` and returns the
//! alerts that are due. Nothing here touches storage, so the rules can be
//! exercised against any point in time.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::assignment::{AssignmentStatus, VendorAssignment};
use super::errors::DomainError;
use super::order::Order;
use super::proof::{ProofApproval, ProofStatus};
use super::tracking::{ShipmentTracking, TrackingStatus};

text_enum! {
    pub enum AlertType {
        Unassigned => "unassigned",
        NotAccepted => "not_accepted",
        NotStarted => "not_started",
        StaleInProgress => "stale_in_progress",
        MissingTracking => "missing_tracking",
        StaleTracking => "stale_tracking",
        OverdueProof => "overdue_proof",
    }
}

text_enum! {
    pub enum SubjectKind {
        Order => "order",
        Assignment => "assignment",
        Tracking => "tracking",
        Proof => "proof",
    }
}

text_enum! {
    /// Which rule set a monitor run evaluates.
    pub enum SweepKind {
        Critical => "critical",
        Full => "full",
    }
}

impl SweepKind {
    pub fn rules(&self) -> &'static [AlertType] {
        match self {
            SweepKind::Critical => &[
                AlertType::Unassigned,
                AlertType::NotAccepted,
                AlertType::OverdueProof,
            ],
            SweepKind::Full => AlertType::ALL,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alert {
    pub id: Uuid,
    pub alert_type: AlertType,
    pub subject_kind: SubjectKind,
    pub subject_id: Uuid,
    pub order_id: Uuid,
    pub overdue_minutes: i64,
    pub created_at: DateTime<Utc>,
}

impl Alert {
    fn overdue(
        alert_type: AlertType,
        subject_kind: SubjectKind,
        subject_id: Uuid,
        order_id: Uuid,
        deadline: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Option<Alert> {
        if now <= deadline {
            return None;
        }
        Some(Alert {
            id: Uuid::new_v4(),
            alert_type,
            subject_kind,
            subject_id,
            order_id,
            overdue_minutes: (now - deadline).num_minutes(),
            created_at: now,
        })
    }

    pub fn hours_overdue(&self) -> f64 {
        self.overdue_minutes as f64 / 60.0
    }
}

// ── Thresholds ───────────────────────────────────────────────────────────────

/// Runtime SLA thresholds. Field names follow the admin-facing config keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorThresholds {
    pub unassigned_order_hours: i64,
    pub assigned_but_not_accepted_hours: i64,
    pub accepted_but_not_started_hours: i64,
    pub in_progress_too_long_days: i64,
    pub no_tracking_after_days: i64,
    pub stale_tracking_days: i64,
}

impl Default for MonitorThresholds {
    fn default() -> Self {
        Self {
            unassigned_order_hours: 24,
            assigned_but_not_accepted_hours: 48,
            accepted_but_not_started_hours: 72,
            in_progress_too_long_days: 7,
            no_tracking_after_days: 3,
            stale_tracking_days: 14,
        }
    }
}

impl MonitorThresholds {
    pub fn validate(&self) -> Result<(), DomainError> {
        let fields = [
            ("unassignedOrderHours", self.unassigned_order_hours),
            ("assignedButNotAcceptedHours", self.assigned_but_not_accepted_hours),
            ("acceptedButNotStartedHours", self.accepted_but_not_started_hours),
            ("inProgressTooLongDays", self.in_progress_too_long_days),
            ("noTrackingAfterDays", self.no_tracking_after_days),
            ("staleTrackingDays", self.stale_tracking_days),
        ];
        for (name, value) in fields {
            if value <= 0 {
                return Err(DomainError::InvalidInput(format!(
                    "{} must be positive, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }

    /// Overlay the fields present in `update`.
    pub fn merged(&self, update: &ThresholdUpdate) -> MonitorThresholds {
        MonitorThresholds {
            unassigned_order_hours: update
                .unassigned_order_hours
                .unwrap_or(self.unassigned_order_hours),
            assigned_but_not_accepted_hours: update
                .assigned_but_not_accepted_hours
                .unwrap_or(self.assigned_but_not_accepted_hours),
            accepted_but_not_started_hours: update
                .accepted_but_not_started_hours
                .unwrap_or(self.accepted_but_not_started_hours),
            in_progress_too_long_days: update
                .in_progress_too_long_days
                .unwrap_or(self.in_progress_too_long_days),
            no_tracking_after_days: update
                .no_tracking_after_days
                .unwrap_or(self.no_tracking_after_days),
            stale_tracking_days: update.stale_tracking_days.unwrap_or(self.stale_tracking_days),
        }
    }
}

/// Partial threshold update from the admin API.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThresholdUpdate {
    pub unassigned_order_hours: Option<i64>,
    pub assigned_but_not_accepted_hours: Option<i64>,
    pub accepted_but_not_started_hours: Option<i64>,
    pub in_progress_too_long_days: Option<i64>,
    pub no_tracking_after_days: Option<i64>,
    pub stale_tracking_days: Option<i64>,
}

// ── Rules ────────────────────────────────────────────────────────────────────

/// Open orders (pending/processing) still lacking a live assignment.
/// `orders` must already exclude orders with a non-cancelled assignment.
pub fn unassigned_orders(
    orders: &[Order],
    thresholds: &MonitorThresholds,
    now: DateTime<Utc>,
) -> Vec<Alert> {
    let window = Duration::hours(thresholds.unassigned_order_hours);
    orders
        .iter()
        .filter(|o| o.status.awaits_assignment())
        .filter_map(|o| {
            Alert::overdue(
                AlertType::Unassigned,
                SubjectKind::Order,
                o.id,
                o.id,
                o.created_at + window,
                now,
            )
        })
        .collect()
}

pub fn not_accepted(
    assignments: &[VendorAssignment],
    thresholds: &MonitorThresholds,
    now: DateTime<Utc>,
) -> Vec<Alert> {
    let window = Duration::hours(thresholds.assigned_but_not_accepted_hours);
    assignments
        .iter()
        .filter(|a| a.status == AssignmentStatus::Assigned)
        .filter_map(|a| {
            assignment_alert(AlertType::NotAccepted, a, a.assigned_at + window, now)
        })
        .collect()
}

pub fn not_started(
    assignments: &[VendorAssignment],
    thresholds: &MonitorThresholds,
    now: DateTime<Utc>,
) -> Vec<Alert> {
    let window = Duration::hours(thresholds.accepted_but_not_started_hours);
    assignments
        .iter()
        .filter(|a| a.status == AssignmentStatus::Accepted)
        .filter_map(|a| {
            let accepted_at = a.accepted_at.unwrap_or(a.updated_at);
            assignment_alert(AlertType::NotStarted, a, accepted_at + window, now)
        })
        .collect()
}

pub fn stale_in_progress(
    assignments: &[VendorAssignment],
    thresholds: &MonitorThresholds,
    now: DateTime<Utc>,
) -> Vec<Alert> {
    let window = Duration::days(thresholds.in_progress_too_long_days);
    assignments
        .iter()
        .filter(|a| a.status == AssignmentStatus::InProgress)
        .filter_map(|a| {
            assignment_alert(AlertType::StaleInProgress, a, a.updated_at + window, now)
        })
        .collect()
}

/// In-progress assignments past the window with no tracking rows at all.
pub fn missing_tracking(
    assignments: &[VendorAssignment],
    tracked: &HashSet<Uuid>,
    thresholds: &MonitorThresholds,
    now: DateTime<Utc>,
) -> Vec<Alert> {
    let window = Duration::days(thresholds.no_tracking_after_days);
    assignments
        .iter()
        .filter(|a| a.status == AssignmentStatus::InProgress && !tracked.contains(&a.id))
        .filter_map(|a| {
            let started_at = a.started_at.unwrap_or(a.updated_at);
            assignment_alert(AlertType::MissingTracking, a, started_at + window, now)
        })
        .collect()
}

pub fn stale_tracking(
    tracking: &[ShipmentTracking],
    thresholds: &MonitorThresholds,
    now: DateTime<Utc>,
) -> Vec<Alert> {
    let window = Duration::days(thresholds.stale_tracking_days);
    tracking
        .iter()
        .filter(|t| t.status != TrackingStatus::Delivered)
        .filter_map(|t| {
            Alert::overdue(
                AlertType::StaleTracking,
                SubjectKind::Tracking,
                t.id,
                t.order_id,
                t.updated_at + window,
                now,
            )
        })
        .collect()
}

pub fn overdue_proofs(proofs: &[ProofApproval], now: DateTime<Utc>) -> Vec<Alert> {
    proofs
        .iter()
        .filter(|p| p.status == ProofStatus::Pending)
        .filter_map(|p| {
            Alert::overdue(
                AlertType::OverdueProof,
                SubjectKind::Proof,
                p.id,
                p.order_id,
                p.expires_at,
                now,
            )
        })
        .collect()
}

fn assignment_alert(
    alert_type: AlertType,
    a: &VendorAssignment,
    deadline: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Option<Alert> {
    Alert::overdue(
        alert_type,
        SubjectKind::Assignment,
        a.id,
        a.order_id,
        deadline,
        now,
    )
}
