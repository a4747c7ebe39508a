use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::monitor_service::{MonitorService, SweepOutcome};
use crate::domain::monitor::SweepKind;
use crate::domain::ports::MonitorRepository;

/// Run `kind` sweeps every `period` on the blocking pool.
///
/// Ticks that fire while a sweep is still executing are dropped rather than
/// queued, and the monitor refuses a second sweep of the same kind started
/// by another job or the admin API.
pub fn spawn_monitor_job<R>(
    monitor: Arc<MonitorService<R>>,
    kind: SweepKind,
    period: Duration,
) -> JoinHandle<()>
where
    R: MonitorRepository,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick completes immediately; sweeps start one period in.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let monitor = Arc::clone(&monitor);
            match tokio::task::spawn_blocking(move || monitor.run_sweep(kind)).await {
                Ok(Ok(SweepOutcome::Completed(_))) | Ok(Ok(SweepOutcome::Skipped)) => {}
                Ok(Err(e)) => log::error!("{} sweep failed: {}", kind, e),
                Err(e) => log::error!("{} sweep task aborted: {}", kind, e),
            }
        }
    })
}
