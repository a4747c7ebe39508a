use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::assignment::AssignmentStatus;
use crate::domain::errors::DomainError;
use crate::domain::monitor::{
    self, Alert, AlertType, MonitorThresholds, SweepKind, ThresholdUpdate,
};
use crate::domain::ports::MonitorRepository;

/// Thresholds shared between the monitor and the admin API.
pub type SharedThresholds = Arc<RwLock<MonitorThresholds>>;

const MAX_ALERT_PAGE: i64 = 500;

#[derive(Debug, Serialize)]
pub struct RuleFailure {
    pub rule: AlertType,
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct MonitorRunReport {
    pub kind: SweepKind,
    pub evaluated_at: DateTime<Utc>,
    pub alerts: Vec<Alert>,
    pub rule_failures: Vec<RuleFailure>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SweepOutcome {
    Completed(MonitorRunReport),
    /// A sweep of the same kind was still running on this monitor.
    Skipped,
}

pub struct MonitorService<R> {
    repo: R,
    thresholds: SharedThresholds,
    critical_running: AtomicBool,
    full_running: AtomicBool,
}

/// Clears the running flag when the sweep ends, panics included.
struct SweepGuard<'a>(&'a AtomicBool);

impl<'a> SweepGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| SweepGuard(flag))
    }
}

impl Drop for SweepGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<R: MonitorRepository> MonitorService<R> {
    pub fn new(repo: R, thresholds: SharedThresholds) -> Self {
        Self {
            repo,
            thresholds,
            critical_running: AtomicBool::new(false),
            full_running: AtomicBool::new(false),
        }
    }

    pub fn run_sweep(&self, kind: SweepKind) -> Result<SweepOutcome, DomainError> {
        self.run_sweep_at(kind, Utc::now())
    }

    /// Evaluate `kind`'s rules as of `now` and persist the resulting alerts.
    /// A rule whose candidate query fails is reported and the rest still run.
    pub fn run_sweep_at(
        &self,
        kind: SweepKind,
        now: DateTime<Utc>,
    ) -> Result<SweepOutcome, DomainError> {
        let Some(_guard) = SweepGuard::acquire(self.running_flag(kind)) else {
            log::warn!("Skipping {} sweep: previous {} sweep still running", kind, kind);
            return Ok(SweepOutcome::Skipped);
        };

        let thresholds = self.thresholds();
        let mut report = MonitorRunReport {
            kind,
            evaluated_at: now,
            alerts: Vec::new(),
            rule_failures: Vec::new(),
        };
        for &rule in kind.rules() {
            match self.evaluate(rule, &thresholds, now) {
                Ok(alerts) => report.alerts.extend(alerts),
                Err(e) => {
                    log::warn!("Monitor rule {} failed: {}", rule, e);
                    report.rule_failures.push(RuleFailure {
                        rule,
                        error: e.to_string(),
                    });
                }
            }
        }

        if !report.alerts.is_empty() {
            self.repo.record_alerts(&report.alerts)?;
        }
        log::info!(
            "{} sweep raised {} alert(s), {} rule failure(s)",
            kind,
            report.alerts.len(),
            report.rule_failures.len()
        );
        Ok(SweepOutcome::Completed(report))
    }

    /// Overlap is refused per kind; a critical and a full sweep may run together.
    fn running_flag(&self, kind: SweepKind) -> &AtomicBool {
        match kind {
            SweepKind::Critical => &self.critical_running,
            SweepKind::Full => &self.full_running,
        }
    }

    pub fn thresholds(&self) -> MonitorThresholds {
        *self
            .thresholds
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Validate, persist, then swap in the merged thresholds. The next sweep
    /// picks them up.
    pub fn update_thresholds(
        &self,
        update: &ThresholdUpdate,
    ) -> Result<MonitorThresholds, DomainError> {
        let next = self.thresholds().merged(update);
        next.validate()?;
        self.repo.save_thresholds(&next)?;
        *self
            .thresholds
            .write()
            .unwrap_or_else(PoisonError::into_inner) = next;
        log::info!("Monitor thresholds updated: {:?}", next);
        Ok(next)
    }

    pub fn recent_alerts(&self, limit: i64) -> Result<Vec<Alert>, DomainError> {
        self.repo.recent_alerts(limit.clamp(1, MAX_ALERT_PAGE))
    }

    fn evaluate(
        &self,
        rule: AlertType,
        t: &MonitorThresholds,
        now: DateTime<Utc>,
    ) -> Result<Vec<Alert>, DomainError> {
        Ok(match rule {
            AlertType::Unassigned => {
                monitor::unassigned_orders(&self.repo.open_unassigned_orders()?, t, now)
            }
            AlertType::NotAccepted => monitor::not_accepted(
                &self.repo.assignments_with_status(AssignmentStatus::Assigned)?,
                t,
                now,
            ),
            AlertType::NotStarted => monitor::not_started(
                &self.repo.assignments_with_status(AssignmentStatus::Accepted)?,
                t,
                now,
            ),
            AlertType::StaleInProgress => monitor::stale_in_progress(
                &self.repo.assignments_with_status(AssignmentStatus::InProgress)?,
                t,
                now,
            ),
            AlertType::MissingTracking => {
                let in_progress = self
                    .repo
                    .assignments_with_status(AssignmentStatus::InProgress)?;
                let ids: Vec<Uuid> = in_progress.iter().map(|a| a.id).collect();
                let tracked = self.repo.assignments_with_tracking(&ids)?;
                monitor::missing_tracking(&in_progress, &tracked, t, now)
            }
            AlertType::StaleTracking => {
                monitor::stale_tracking(&self.repo.undelivered_tracking()?, t, now)
            }
            AlertType::OverdueProof => monitor::overdue_proofs(&self.repo.pending_proofs()?, now),
        })
    }
}
