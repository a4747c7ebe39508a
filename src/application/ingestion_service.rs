//! Storefront synchronisation.
//!
//! A sync pass pulls orders from one store's connector and inserts the ones
//! not seen before. Ingestion is idempotent per `(store, external order id)`,
//! so a pass that aborts halfway keeps what it already inserted and the next
//! pass picks up the rest.
//!
//! The store's sync cursor never moves past an order that failed for a
//! retryable reason. Orders the connector could not decode and orders that
//! fail validation are reported but do not hold the cursor, since refetching
//! them gives the same result.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::assignment_service::AssignmentService;
use crate::connectors::{ConnectorFactory, FetchedOrders};
use crate::domain::errors::DomainError;
use crate::domain::order::NewOrder;
use crate::domain::ports::{
    AssignmentRepository, CatalogRepository, OrderRepository, StoreRepository, VendorRepository,
};
use crate::domain::store::{CanonicalOrder, ConnectionCheck, Store};

#[derive(Debug, Serialize)]
pub struct SyncFailure {
    pub external_id: String,
    pub error: String,
    /// The next pass fetches this record again.
    pub retryable: bool,
}

#[derive(Debug, Default, Serialize)]
pub struct SyncReport {
    pub store_id: Uuid,
    pub fetched: usize,
    pub inserted: usize,
    pub skipped: usize,
    pub auto_assigned: usize,
    pub failures: Vec<SyncFailure>,
}

/// Result of one store within a multi-store sync.
#[derive(Debug, Serialize)]
pub struct StoreSyncOutcome {
    pub store_id: Uuid,
    pub store_name: String,
    pub report: Option<SyncReport>,
    pub error: Option<String>,
}

#[derive(Debug, Default, Serialize)]
pub struct ProductSyncReport {
    pub store_id: Uuid,
    pub fetched: usize,
    pub upserted: usize,
    pub failures: Vec<SyncFailure>,
}

pub struct IngestionService<R, F> {
    repo: R,
    connectors: F,
    assignments: AssignmentService<R>,
}

impl<R, F> IngestionService<R, F>
where
    R: StoreRepository
        + OrderRepository
        + CatalogRepository
        + VendorRepository
        + AssignmentRepository
        + Clone,
    F: ConnectorFactory,
{
    pub fn new(repo: R, connectors: F) -> Self {
        Self {
            assignments: AssignmentService::new(repo.clone()),
            repo,
            connectors,
        }
    }

    pub fn sync_store(&self, store_id: Uuid) -> Result<SyncReport, DomainError> {
        let store = self.active_store(store_id)?;
        let connector = self.connectors.connector_for(&store)?;
        let started_at = Utc::now();

        let FetchedOrders { orders, rejected } =
            connector.fetch_orders(store.last_sync_at).map_err(|e| {
                log::warn!("Fetching orders for store {} failed: {}", store.id, e);
                DomainError::from(e)
            })?;

        let mut report = SyncReport {
            store_id,
            fetched: orders.len() + rejected.len(),
            ..SyncReport::default()
        };
        for reject in rejected {
            log::warn!(
                "Store {} returned order {} that could not be decoded: {}",
                store.id,
                reject.external_id,
                reject.error
            );
            report.failures.push(SyncFailure {
                external_id: reject.external_id,
                error: reject.error.to_string(),
                retryable: false,
            });
        }

        let mut held_at: Option<DateTime<Utc>> = None;
        for order in orders {
            let order_date = order.order_date;
            if self.ingest_order(&store, order, &mut report) {
                held_at = Some(held_at.map_or(order_date, |h| h.min(order_date)));
            }
        }

        let cursor = match held_at {
            // Connectors send the cursor at second precision and some
            // platforms treat it as exclusive.
            Some(earliest) => {
                let cursor = started_at.min(earliest - Duration::seconds(1));
                log::warn!(
                    "Holding sync cursor of store {} at {} for retryable failures",
                    store.id,
                    cursor
                );
                cursor
            }
            None => started_at,
        };
        self.repo.mark_synced(store.id, cursor)?;
        log::info!(
            "Synced store {} ({}): fetched={} inserted={} skipped={} auto_assigned={} failed={}",
            store.name,
            store.platform,
            report.fetched,
            report.inserted,
            report.skipped,
            report.auto_assigned,
            report.failures.len()
        );
        Ok(report)
    }

    /// Sync every active store. One store failing never stops the others.
    pub fn sync_all_stores(&self) -> Result<Vec<StoreSyncOutcome>, DomainError> {
        let stores = self.repo.list_active_stores()?;
        Ok(stores
            .into_iter()
            .map(|store| match self.sync_store(store.id) {
                Ok(report) => StoreSyncOutcome {
                    store_id: store.id,
                    store_name: store.name,
                    report: Some(report),
                    error: None,
                },
                Err(e) => {
                    log::warn!("Sync of store {} failed: {}", store.id, e);
                    StoreSyncOutcome {
                        store_id: store.id,
                        store_name: store.name,
                        report: None,
                        error: Some(e.to_string()),
                    }
                }
            })
            .collect())
    }

    pub fn sync_products(&self, store_id: Uuid) -> Result<ProductSyncReport, DomainError> {
        let store = self.active_store(store_id)?;
        let connector = self.connectors.connector_for(&store)?;
        let products = connector.fetch_products()?;

        let mut report = ProductSyncReport {
            store_id,
            fetched: products.len(),
            ..ProductSyncReport::default()
        };
        for product in &products {
            match self.repo.upsert_product(store.id, product) {
                Ok(_) => report.upserted += 1,
                Err(e) => {
                    log::warn!(
                        "Upserting product {} for store {} failed: {}",
                        product.external_product_id,
                        store.id,
                        e
                    );
                    report.failures.push(SyncFailure {
                        external_id: product.external_product_id.clone(),
                        error: e.to_string(),
                        retryable: true,
                    });
                }
            }
        }
        log::info!(
            "Synced {} products for store {}",
            report.upserted,
            store.name
        );
        Ok(report)
    }

    pub fn test_connection(&self, store_id: Uuid) -> Result<ConnectionCheck, DomainError> {
        let store = self
            .repo
            .find_store(store_id)?
            .ok_or_else(|| DomainError::not_found("Store", store_id))?;
        Ok(match self.connectors.connector_for(&store) {
            Ok(connector) => connector.test_connection(),
            Err(e) => ConnectionCheck {
                ok: false,
                message: e.to_string(),
            },
        })
    }

    fn active_store(&self, store_id: Uuid) -> Result<Store, DomainError> {
        let store = self
            .repo
            .find_store(store_id)?
            .ok_or_else(|| DomainError::not_found("Store", store_id))?;
        if !store.is_active {
            return Err(DomainError::InvalidInput(format!(
                "store {} is inactive",
                store_id
            )));
        }
        Ok(store)
    }

    /// Returns true when the order failed before it was stored and a later
    /// pass should fetch it again.
    fn ingest_order(&self, store: &Store, order: CanonicalOrder, report: &mut SyncReport) -> bool {
        let external_id = order.external_order_id.clone();
        let fail = |report: &mut SyncReport, error: DomainError, retryable: bool| {
            log::warn!(
                "Ingesting order {} from store {} failed: {}",
                external_id,
                store.id,
                error
            );
            report.failures.push(SyncFailure {
                external_id: external_id.clone(),
                error: error.to_string(),
                retryable,
            });
            retryable
        };

        if let Err(e) = order.validate() {
            return fail(report, e, false);
        }
        match self.repo.find_order_by_external(store.id, &external_id) {
            Ok(Some(_)) => {
                report.skipped += 1;
                return false;
            }
            Ok(None) => {}
            Err(e) => return fail(report, e, true),
        }

        let inserted = match self.repo.insert_order(NewOrder {
            store_id: store.id,
            order,
        }) {
            Ok(Some(inserted)) => inserted,
            // Lost a race against a concurrent pass.
            Ok(None) => {
                report.skipped += 1;
                return false;
            }
            Err(e) => return fail(report, e, true),
        };
        report.inserted += 1;

        // The order is stored; refetching it would only skip it.
        match self.assignments.auto_assign(store.id, &inserted) {
            Ok(outcome) => {
                report.auto_assigned += outcome.created.len();
                for failure in outcome.failures {
                    fail(report, failure.error, false);
                }
            }
            Err(e) => {
                fail(report, e, false);
            }
        }
        false
    }
}
