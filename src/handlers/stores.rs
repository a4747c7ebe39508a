use actix_web::{web, HttpResponse};
use uuid::Uuid;

use super::{blocking, AppState};
use crate::errors::AppError;

/// POST /stores/sync
///
/// Sync every active store in turn. A failing store is reported in its own
/// entry and does not stop the others.
#[utoipa::path(
    post,
    path = "/stores/sync",
    responses(
        (status = 200, description = "Per-store sync outcomes"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "stores"
)]
pub async fn sync_all_stores(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let ingestion = state.ingestion.clone();
    let outcomes = blocking(move || ingestion.sync_all_stores()).await?;
    Ok(HttpResponse::Ok().json(outcomes))
}

/// POST /stores/{id}/sync
#[utoipa::path(
    post,
    path = "/stores/{id}/sync",
    params(("id" = Uuid, Path, description = "Store UUID")),
    responses(
        (status = 200, description = "Sync report"),
        (status = 400, description = "Store is inactive"),
        (status = 404, description = "Store not found"),
        (status = 502, description = "Storefront rejected the request"),
        (status = 503, description = "Storefront temporarily unavailable"),
    ),
    tag = "stores"
)]
pub async fn sync_store(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let store_id = path.into_inner();
    let ingestion = state.ingestion.clone();
    let report = blocking(move || ingestion.sync_store(store_id)).await?;
    Ok(HttpResponse::Ok().json(report))
}

/// POST /stores/{id}/products/sync
#[utoipa::path(
    post,
    path = "/stores/{id}/products/sync",
    params(("id" = Uuid, Path, description = "Store UUID")),
    responses(
        (status = 200, description = "Product sync report"),
        (status = 404, description = "Store not found"),
        (status = 502, description = "Storefront rejected the request"),
        (status = 503, description = "Storefront temporarily unavailable"),
    ),
    tag = "stores"
)]
pub async fn sync_products(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let store_id = path.into_inner();
    let ingestion = state.ingestion.clone();
    let report = blocking(move || ingestion.sync_products(store_id)).await?;
    Ok(HttpResponse::Ok().json(report))
}

/// GET /stores/{id}/connection
///
/// Probe the storefront credentials. An unreachable store is a successful
/// response with `ok: false`.
#[utoipa::path(
    get,
    path = "/stores/{id}/connection",
    params(("id" = Uuid, Path, description = "Store UUID")),
    responses(
        (status = 200, description = "Connection check result"),
        (status = 404, description = "Store not found"),
    ),
    tag = "stores"
)]
pub async fn test_connection(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let store_id = path.into_inner();
    let ingestion = state.ingestion.clone();
    let check = blocking(move || ingestion.test_connection(store_id)).await?;
    Ok(HttpResponse::Ok().json(check))
}
