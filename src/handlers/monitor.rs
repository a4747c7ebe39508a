use actix_web::{web, HttpResponse};
use serde::Deserialize;
use utoipa::ToSchema;

use super::{blocking, AppState};
use crate::domain::monitor::{SweepKind, ThresholdUpdate};
use crate::errors::AppError;

#[derive(Debug, Deserialize)]
pub struct RunSweepParams {
    #[serde(default = "default_kind")]
    pub kind: SweepKind,
}

fn default_kind() -> SweepKind {
    SweepKind::Full
}

#[derive(Debug, Deserialize)]
pub struct AlertsParams {
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    50
}

/// Threshold fields accepted by `PUT /monitor/thresholds`. Omitted fields
/// keep their current value.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ThresholdsBody {
    pub unassigned_order_hours: Option<i64>,
    pub assigned_but_not_accepted_hours: Option<i64>,
    pub accepted_but_not_started_hours: Option<i64>,
    pub in_progress_too_long_days: Option<i64>,
    pub no_tracking_after_days: Option<i64>,
    pub stale_tracking_days: Option<i64>,
}

impl From<ThresholdsBody> for ThresholdUpdate {
    fn from(b: ThresholdsBody) -> Self {
        ThresholdUpdate {
            unassigned_order_hours: b.unassigned_order_hours,
            assigned_but_not_accepted_hours: b.assigned_but_not_accepted_hours,
            accepted_but_not_started_hours: b.accepted_but_not_started_hours,
            in_progress_too_long_days: b.in_progress_too_long_days,
            no_tracking_after_days: b.no_tracking_after_days,
            stale_tracking_days: b.stale_tracking_days,
        }
    }
}

/// POST /monitor/run
///
/// Runs one sweep now. Returns `{"outcome": "skipped"}` if a sweep is
/// already in progress.
#[utoipa::path(
    post,
    path = "/monitor/run",
    params(("kind" = Option<String>, Query, description = "critical or full (default full)")),
    responses(
        (status = 200, description = "Sweep report or skipped marker"),
        (status = 500, description = "Alerts could not be recorded"),
    ),
    tag = "monitor"
)]
pub async fn run_sweep(
    state: web::Data<AppState>,
    query: web::Query<RunSweepParams>,
) -> Result<HttpResponse, AppError> {
    let kind = query.into_inner().kind;
    let monitor = state.monitor.clone();
    let outcome = blocking(move || monitor.run_sweep(kind)).await?;
    Ok(HttpResponse::Ok().json(outcome))
}

/// GET /monitor/thresholds
#[utoipa::path(
    get,
    path = "/monitor/thresholds",
    responses((status = 200, description = "Thresholds in effect")),
    tag = "monitor"
)]
pub async fn get_thresholds(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(state.monitor.thresholds()))
}

/// PUT /monitor/thresholds
#[utoipa::path(
    put,
    path = "/monitor/thresholds",
    request_body = ThresholdsBody,
    responses(
        (status = 200, description = "Thresholds after the update"),
        (status = 400, description = "A threshold is not positive"),
    ),
    tag = "monitor"
)]
pub async fn update_thresholds(
    state: web::Data<AppState>,
    body: web::Json<ThresholdsBody>,
) -> Result<HttpResponse, AppError> {
    let update = ThresholdUpdate::from(body.into_inner());
    let monitor = state.monitor.clone();
    let thresholds = blocking(move || monitor.update_thresholds(&update)).await?;
    Ok(HttpResponse::Ok().json(thresholds))
}

/// GET /monitor/alerts
#[utoipa::path(
    get,
    path = "/monitor/alerts",
    params(("limit" = Option<i64>, Query, description = "Newest first, 1 to 500 (default 50)")),
    responses((status = 200, description = "Recent alerts")),
    tag = "monitor"
)]
pub async fn recent_alerts(
    state: web::Data<AppState>,
    query: web::Query<AlertsParams>,
) -> Result<HttpResponse, AppError> {
    let limit = query.into_inner().limit;
    let monitor = state.monitor.clone();
    let alerts = blocking(move || monitor.recent_alerts(limit)).await?;
    Ok(HttpResponse::Ok().json(alerts))
}
