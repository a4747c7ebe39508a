use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::result::DatabaseErrorKind;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::assignment::{
    AssignmentStatus, AssignmentWithItems, ItemAssignment, NewAssignment, Vendor, VendorAssignment,
};
use crate::domain::errors::DomainError;
use crate::domain::events::{self, OutboxMessage};
use crate::domain::monitor::{Alert, MonitorThresholds};
use crate::domain::order::{
    NewOrder, Order, OrderItem, OrderStatus, OrderStatusChange, OrderStatusHistory, OrderWithItems,
};
use crate::domain::ports::{
    AssignmentRepository, CatalogRepository, MonitorRepository, OrderRepository, ProofRepository,
    StoreRepository, TrackingRepository, VendorRepository,
};
use crate::domain::proof::{
    NewProof, OrderProductionStatus, ProductionProofState, ProofApproval, ProofDecision,
    ProofResponse, ProofResponseLog, ProofStatus, ProofType,
};
use crate::domain::store::{CanonicalProduct, Product, ProductVendor, Store};
use crate::domain::tracking::{NewTracking, ShipmentTracking, TrackingStatus};
use crate::schema::{
    alerts, item_assignments, marketplace_outbox, monitor_settings, order_items,
    order_production_status, order_status_history, orders, product_vendors, products,
    proof_approvals, proof_response_log, shipment_tracking, stores, vendor_assignments, vendors,
};

use super::models::{
    from_json, to_json, AlertRow, AssignmentStatusChangeset, ItemAssignmentRow, NewOrderRow,
    NewOutboxEventRow, NewProductRow, NewStoreRow, NewVendorRow, OrderItemRow, OrderRow,
    OrderStatusHistoryRow, ProductRow, ProductVendorRow, ProductionStatusRow, ProofApprovalRow,
    ProofResponseLogRow, ShipmentTrackingRow, StoreRow, VendorAssignmentRow, VendorRow,
};

const THRESHOLDS_KEY: &str = "sla_thresholds";

// ── Error conversions (infrastructure concern only) ──────────────────────────

impl From<diesel::result::Error> for DomainError {
    fn from(e: diesel::result::Error) -> Self {
        DomainError::Internal(e.to_string())
    }
}

impl From<r2d2::Error> for DomainError {
    fn from(e: r2d2::Error) -> Self {
        DomainError::Internal(e.to_string())
    }
}

fn convert_all<R, T>(rows: Vec<R>) -> Result<Vec<T>, DomainError>
where
    T: TryFrom<R, Error = DomainError>,
{
    rows.into_iter().map(T::try_from).collect()
}

/// Append a domain event to the outbox on the caller's transaction.
fn write_outbox(conn: &mut PgConnection, message: OutboxMessage) -> Result<(), DomainError> {
    diesel::insert_into(marketplace_outbox::table)
        .values(&NewOutboxEventRow {
            id: Uuid::new_v4(),
            aggregate_type: message.aggregate_type.to_string(),
            aggregate_id: message.aggregate_id,
            event_type: message.event_type.to_string(),
            payload: message.payload,
        })
        .execute(conn)?;
    Ok(())
}

// ── Repository ────────────────────────────────────────────────────────────────

/// Postgres adapter for every repository port. Multi-row writes run in a
/// single transaction together with their outbox events.
#[derive(Clone)]
pub struct DieselRepository {
    pool: DbPool,
}

impl DieselRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Register a storefront. Stores are provisioned by operators, not synced.
    pub fn insert_store(&self, store: &Store) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;
        diesel::insert_into(stores::table)
            .values(&NewStoreRow {
                id: store.id,
                name: store.name.clone(),
                platform: store.platform.to_string(),
                base_url: store.base_url.clone(),
                api_key: store.api_key.clone(),
                api_secret: store.api_secret.clone(),
                shop_id: store.shop_id.clone(),
                is_active: store.is_active,
            })
            .execute(&mut conn)?;
        Ok(())
    }

    pub fn insert_vendor(&self, vendor: &Vendor) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;
        diesel::insert_into(vendors::table)
            .values(&NewVendorRow {
                id: vendor.id,
                name: vendor.name.clone(),
                email: vendor.email.clone(),
                commission_rate: vendor.commission_rate.clone(),
                is_active: vendor.is_active,
            })
            .execute(&mut conn)?;
        Ok(())
    }
}

impl StoreRepository for DieselRepository {
    fn find_store(&self, id: Uuid) -> Result<Option<Store>, DomainError> {
        let mut conn = self.pool.get()?;
        stores::table
            .find(id)
            .select(StoreRow::as_select())
            .first(&mut conn)
            .optional()?
            .map(Store::try_from)
            .transpose()
    }

    fn list_active_stores(&self) -> Result<Vec<Store>, DomainError> {
        let mut conn = self.pool.get()?;
        let rows = stores::table
            .filter(stores::is_active.eq(true))
            .order(stores::name.asc())
            .select(StoreRow::as_select())
            .load(&mut conn)?;
        convert_all(rows)
    }

    fn mark_synced(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;
        diesel::update(stores::table.find(id))
            .set(stores::last_sync_at.eq(Some(at)))
            .execute(&mut conn)?;
        Ok(())
    }
}

impl CatalogRepository for DieselRepository {
    fn upsert_product(
        &self,
        store_id: Uuid,
        product: &CanonicalProduct,
    ) -> Result<Product, DomainError> {
        let mut conn = self.pool.get()?;
        let now = Utc::now();
        let row = diesel::insert_into(products::table)
            .values(&NewProductRow {
                id: Uuid::new_v4(),
                store_id,
                external_product_id: product.external_product_id.clone(),
                name: product.name.clone(),
                sku: product.sku.clone(),
                price: product.price.clone(),
                updated_at: now,
            })
            .on_conflict((products::store_id, products::external_product_id))
            .do_update()
            .set((
                products::name.eq(product.name.clone()),
                products::sku.eq(product.sku.clone()),
                products::price.eq(product.price.clone()),
                products::updated_at.eq(now),
            ))
            .returning(ProductRow::as_returning())
            .get_result(&mut conn)?;
        Ok(row.into())
    }

    fn find_product(&self, id: Uuid) -> Result<Option<Product>, DomainError> {
        let mut conn = self.pool.get()?;
        Ok(products::table
            .find(id)
            .select(ProductRow::as_select())
            .first(&mut conn)
            .optional()?
            .map(Product::from))
    }

    fn default_vendor_for(
        &self,
        store_id: Uuid,
        external_product_id: Option<&str>,
        sku: Option<&str>,
    ) -> Result<Option<Uuid>, DomainError> {
        let mut conn = self.pool.get()?;
        if let Some(pid) = external_product_id {
            let found = product_vendors::table
                .inner_join(products::table)
                .filter(products::store_id.eq(store_id))
                .filter(products::external_product_id.eq(pid))
                .filter(product_vendors::is_default.eq(true))
                .select(product_vendors::vendor_id)
                .first::<Uuid>(&mut conn)
                .optional()?;
            if found.is_some() {
                return Ok(found);
            }
        }
        if let Some(sku) = sku {
            return Ok(product_vendors::table
                .inner_join(products::table)
                .filter(products::store_id.eq(store_id))
                .filter(products::sku.eq(sku))
                .filter(product_vendors::is_default.eq(true))
                .select(product_vendors::vendor_id)
                .first::<Uuid>(&mut conn)
                .optional()?);
        }
        Ok(None)
    }

    fn link_product_vendor(
        &self,
        product_id: Uuid,
        vendor_id: Uuid,
        is_default: bool,
    ) -> Result<ProductVendor, DomainError> {
        let mut conn = self.pool.get()?;
        conn.transaction::<_, DomainError, _>(|conn| {
            if is_default {
                diesel::update(
                    product_vendors::table
                        .filter(product_vendors::product_id.eq(product_id))
                        .filter(product_vendors::vendor_id.ne(vendor_id)),
                )
                .set(product_vendors::is_default.eq(false))
                .execute(conn)?;
            }
            let row = diesel::insert_into(product_vendors::table)
                .values(&ProductVendorRow {
                    id: Uuid::new_v4(),
                    product_id,
                    vendor_id,
                    is_default,
                })
                .on_conflict((product_vendors::product_id, product_vendors::vendor_id))
                .do_update()
                .set(product_vendors::is_default.eq(is_default))
                .returning(ProductVendorRow::as_returning())
                .get_result(conn)?;
            Ok(row.into())
        })
    }
}

impl VendorRepository for DieselRepository {
    fn find_vendor(&self, id: Uuid) -> Result<Option<Vendor>, DomainError> {
        let mut conn = self.pool.get()?;
        Ok(vendors::table
            .find(id)
            .select(VendorRow::as_select())
            .first(&mut conn)
            .optional()?
            .map(Vendor::from))
    }
}

impl OrderRepository for DieselRepository {
    fn find_order(&self, id: Uuid) -> Result<Option<Order>, DomainError> {
        let mut conn = self.pool.get()?;
        orders::table
            .find(id)
            .select(OrderRow::as_select())
            .first(&mut conn)
            .optional()?
            .map(Order::try_from)
            .transpose()
    }

    fn find_order_by_external(
        &self,
        store_id: Uuid,
        external_order_id: &str,
    ) -> Result<Option<Order>, DomainError> {
        let mut conn = self.pool.get()?;
        orders::table
            .filter(orders::store_id.eq(store_id))
            .filter(orders::external_order_id.eq(external_order_id))
            .select(OrderRow::as_select())
            .first(&mut conn)
            .optional()?
            .map(Order::try_from)
            .transpose()
    }

    fn order_items(&self, order_id: Uuid) -> Result<Vec<OrderItem>, DomainError> {
        let mut conn = self.pool.get()?;
        let rows = order_items::table
            .filter(order_items::order_id.eq(order_id))
            .order((order_items::created_at.asc(), order_items::external_item_id.asc()))
            .select(OrderItemRow::as_select())
            .load(&mut conn)?;
        convert_all(rows)
    }

    fn insert_order(&self, new_order: NewOrder) -> Result<Option<OrderWithItems>, DomainError> {
        let mut conn = self.pool.get()?;
        let NewOrder { store_id, order: c } = new_order;

        conn.transaction::<_, DomainError, _>(|conn| {
            let now = Utc::now();
            let order_id = Uuid::new_v4();

            // 1. Insert the order; a concurrent pass may have beaten us to it.
            let inserted = diesel::insert_into(orders::table)
                .values(&NewOrderRow {
                    id: order_id,
                    store_id,
                    external_order_id: c.external_order_id.clone(),
                    order_number: c.order_number.clone(),
                    customer_name: c.customer.name.clone(),
                    customer_email: c.customer.email.clone(),
                    customer_phone: c.customer.phone.clone(),
                    shipping_address: c.shipping_address.as_ref().map(to_json).transpose()?,
                    total_amount: c.total_amount.clone(),
                    currency: c.currency.to_ascii_uppercase(),
                    status: c.status.to_string(),
                    fulfillment_status: c.fulfillment_status.clone(),
                    payment_status: c.payment_status.clone(),
                    order_date: c.order_date,
                    tags: to_json(&c.tags)?,
                    notes: c.notes.clone(),
                    created_at: now,
                    updated_at: now,
                })
                .on_conflict((orders::store_id, orders::external_order_id))
                .do_nothing()
                .returning(OrderRow::as_returning())
                .get_result(conn)
                .optional()?;
            let Some(order_row) = inserted else {
                return Ok(None);
            };

            // 2. Insert the items
            let item_rows = c
                .items
                .iter()
                .map(|i| {
                    Ok::<_, DomainError>(OrderItemRow {
                        id: Uuid::new_v4(),
                        order_id,
                        external_item_id: i.external_item_id.clone(),
                        external_product_id: i.external_product_id.clone(),
                        product_name: i.name.clone(),
                        sku: i.sku.clone(),
                        quantity: i.quantity,
                        unit_price: i.unit_price.clone(),
                        total_price: i.total_price.clone(),
                        customization: to_json(&i.customization)?,
                    })
                })
                .collect::<Result<Vec<_>, DomainError>>()?;
            let item_rows = diesel::insert_into(order_items::table)
                .values(&item_rows)
                .returning(OrderItemRow::as_returning())
                .get_results(conn)?;

            // 3. Outbox event in the same transaction
            let order = Order::try_from(order_row)?;
            write_outbox(conn, events::order_created(&order, item_rows.len()))?;

            Ok(Some(OrderWithItems {
                order,
                items: convert_all(item_rows)?,
            }))
        })
    }

    fn update_order_status(
        &self,
        change: &OrderStatusChange,
    ) -> Result<Option<Order>, DomainError> {
        let mut conn = self.pool.get()?;
        conn.transaction::<_, DomainError, _>(|conn| {
            let updated = diesel::update(
                orders::table
                    .filter(orders::id.eq(change.order_id))
                    .filter(orders::status.eq(change.from.as_str())),
            )
            .set((
                orders::status.eq(change.to.as_str()),
                orders::updated_at.eq(change.at),
            ))
            .returning(OrderRow::as_returning())
            .get_result(conn)
            .optional()?;
            let Some(row) = updated else {
                return Ok(None);
            };

            diesel::insert_into(order_status_history::table)
                .values(&OrderStatusHistoryRow {
                    id: Uuid::new_v4(),
                    order_id: change.order_id,
                    old_status: change.from.to_string(),
                    new_status: change.to.to_string(),
                    actor: change.actor.clone(),
                    notes: change.notes.clone(),
                    created_at: change.at,
                })
                .execute(conn)?;
            write_outbox(conn, events::order_status_changed(change))?;

            Order::try_from(row).map(Some)
        })
    }

    fn order_history(&self, order_id: Uuid) -> Result<Vec<OrderStatusHistory>, DomainError> {
        let mut conn = self.pool.get()?;
        let rows = order_status_history::table
            .filter(order_status_history::order_id.eq(order_id))
            .order(order_status_history::created_at.asc())
            .select(OrderStatusHistoryRow::as_select())
            .load(&mut conn)?;
        convert_all(rows)
    }
}

impl AssignmentRepository for DieselRepository {
    fn find_assignment(&self, id: Uuid) -> Result<Option<VendorAssignment>, DomainError> {
        let mut conn = self.pool.get()?;
        vendor_assignments::table
            .find(id)
            .select(VendorAssignmentRow::as_select())
            .first(&mut conn)
            .optional()?
            .map(VendorAssignment::try_from)
            .transpose()
    }

    fn find_assignment_for(
        &self,
        order_id: Uuid,
        vendor_id: Uuid,
    ) -> Result<Option<VendorAssignment>, DomainError> {
        let mut conn = self.pool.get()?;
        vendor_assignments::table
            .filter(vendor_assignments::order_id.eq(order_id))
            .filter(vendor_assignments::vendor_id.eq(vendor_id))
            .select(VendorAssignmentRow::as_select())
            .first(&mut conn)
            .optional()?
            .map(VendorAssignment::try_from)
            .transpose()
    }

    fn assignments_for_order(
        &self,
        order_id: Uuid,
    ) -> Result<Vec<AssignmentWithItems>, DomainError> {
        let mut conn = self.pool.get()?;
        let rows = vendor_assignments::table
            .filter(vendor_assignments::order_id.eq(order_id))
            .order(vendor_assignments::assigned_at.asc())
            .select(VendorAssignmentRow::as_select())
            .load(&mut conn)?;
        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();

        let mut items_by_assignment: HashMap<Uuid, Vec<ItemAssignment>> = HashMap::new();
        if !ids.is_empty() {
            let links = item_assignments::table
                .filter(item_assignments::vendor_assignment_id.eq_any(&ids))
                .order(item_assignments::created_at.asc())
                .select(ItemAssignmentRow::as_select())
                .load(&mut conn)?;
            for link in links {
                items_by_assignment
                    .entry(link.vendor_assignment_id)
                    .or_default()
                    .push(link.into());
            }
        }

        rows.into_iter()
            .map(|row| {
                let items = items_by_assignment.remove(&row.id).unwrap_or_default();
                Ok(AssignmentWithItems {
                    assignment: VendorAssignment::try_from(row)?,
                    items,
                })
            })
            .collect()
    }

    fn active_item_assignment(
        &self,
        order_item_id: Uuid,
    ) -> Result<Option<ItemAssignment>, DomainError> {
        let mut conn = self.pool.get()?;
        Ok(active_item_link(&mut conn, order_item_id)?.map(ItemAssignment::from))
    }

    fn insert_assignment(&self, new: NewAssignment) -> Result<AssignmentWithItems, DomainError> {
        let mut conn = self.pool.get()?;
        conn.transaction::<_, DomainError, _>(|conn| {
            // Concurrent claims on the same items queue here, so the check
            // below sees any link the other transaction committed.
            if !new.order_item_ids.is_empty() {
                order_items::table
                    .filter(order_items::id.eq_any(&new.order_item_ids))
                    .order(order_items::id)
                    .select(order_items::id)
                    .for_update()
                    .load::<Uuid>(conn)?;
            }
            for item_id in &new.order_item_ids {
                if active_item_link(conn, *item_id)?.is_some() {
                    return Err(DomainError::ItemAlreadyAssigned(*item_id));
                }
            }

            let row = diesel::insert_into(vendor_assignments::table)
                .values(&VendorAssignmentRow {
                    id: Uuid::new_v4(),
                    order_id: new.order_id,
                    vendor_id: new.vendor_id,
                    assignment_type: new.assignment_type.to_string(),
                    status: AssignmentStatus::Assigned.to_string(),
                    commission_amount: new.commission_amount.clone(),
                    notes: new.notes.clone(),
                    assigned_at: new.assigned_at,
                    accepted_at: None,
                    started_at: None,
                    completed_at: None,
                    cancelled_at: None,
                    updated_at: new.assigned_at,
                })
                .returning(VendorAssignmentRow::as_returning())
                .get_result(conn)
                .map_err(|e| match e {
                    diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                        DomainError::DuplicateAssignment {
                            order_id: new.order_id,
                            vendor_id: new.vendor_id,
                        }
                    }
                    other => other.into(),
                })?;

            let links: Vec<ItemAssignmentRow> = new
                .order_item_ids
                .iter()
                .map(|item_id| ItemAssignmentRow {
                    id: Uuid::new_v4(),
                    vendor_assignment_id: row.id,
                    order_item_id: *item_id,
                    created_at: new.assigned_at,
                })
                .collect();
            if !links.is_empty() {
                diesel::insert_into(item_assignments::table)
                    .values(&links)
                    .execute(conn)?;
            }

            Ok(AssignmentWithItems {
                assignment: VendorAssignment::try_from(row)?,
                items: links.into_iter().map(ItemAssignment::from).collect(),
            })
        })
    }

    fn find_item_assignment(&self, id: Uuid) -> Result<Option<ItemAssignment>, DomainError> {
        let mut conn = self.pool.get()?;
        Ok(item_assignments::table
            .find(id)
            .select(ItemAssignmentRow::as_select())
            .first(&mut conn)
            .optional()?
            .map(ItemAssignment::from))
    }

    fn delete_item_assignment(&self, id: Uuid) -> Result<bool, DomainError> {
        let mut conn = self.pool.get()?;
        let deleted = diesel::delete(item_assignments::table.find(id)).execute(&mut conn)?;
        Ok(deleted > 0)
    }

    fn update_assignment_status(
        &self,
        id: Uuid,
        from: AssignmentStatus,
        to: AssignmentStatus,
        at: DateTime<Utc>,
    ) -> Result<Option<VendorAssignment>, DomainError> {
        let mut conn = self.pool.get()?;
        let stamp = |status: AssignmentStatus| (to == status).then_some(at);
        let changes = AssignmentStatusChangeset {
            status: to.to_string(),
            updated_at: at,
            accepted_at: stamp(AssignmentStatus::Accepted),
            started_at: stamp(AssignmentStatus::InProgress),
            completed_at: stamp(AssignmentStatus::Completed),
            cancelled_at: stamp(AssignmentStatus::Cancelled),
        };
        diesel::update(
            vendor_assignments::table
                .filter(vendor_assignments::id.eq(id))
                .filter(vendor_assignments::status.eq(from.as_str())),
        )
        .set(&changes)
        .returning(VendorAssignmentRow::as_returning())
        .get_result(&mut conn)
        .optional()?
        .map(VendorAssignment::try_from)
        .transpose()
    }
}

/// The link covering `order_item_id` whose parent assignment is still live.
fn active_item_link(
    conn: &mut PgConnection,
    order_item_id: Uuid,
) -> Result<Option<ItemAssignmentRow>, DomainError> {
    Ok(item_assignments::table
        .inner_join(vendor_assignments::table)
        .filter(item_assignments::order_item_id.eq(order_item_id))
        .filter(vendor_assignments::status.ne(AssignmentStatus::Cancelled.as_str()))
        .select(ItemAssignmentRow::as_select())
        .first(conn)
        .optional()?)
}

impl TrackingRepository for DieselRepository {
    fn insert_tracking(&self, new: NewTracking) -> Result<ShipmentTracking, DomainError> {
        let mut conn = self.pool.get()?;
        let row = diesel::insert_into(shipment_tracking::table)
            .values(&ShipmentTrackingRow {
                id: Uuid::new_v4(),
                order_id: new.order_id,
                vendor_assignment_id: new.vendor_assignment_id,
                carrier: new.carrier,
                tracking_number: new.tracking_number,
                status: TrackingStatus::LabelCreated.to_string(),
                created_at: new.created_at,
                updated_at: new.created_at,
            })
            .returning(ShipmentTrackingRow::as_returning())
            .get_result(&mut conn)?;
        row.try_into()
    }

    fn find_tracking(&self, id: Uuid) -> Result<Option<ShipmentTracking>, DomainError> {
        let mut conn = self.pool.get()?;
        shipment_tracking::table
            .find(id)
            .select(ShipmentTrackingRow::as_select())
            .first(&mut conn)
            .optional()?
            .map(ShipmentTracking::try_from)
            .transpose()
    }

    fn update_tracking_status(
        &self,
        id: Uuid,
        status: TrackingStatus,
        at: DateTime<Utc>,
    ) -> Result<Option<ShipmentTracking>, DomainError> {
        let mut conn = self.pool.get()?;
        diesel::update(shipment_tracking::table.find(id))
            .set((
                shipment_tracking::status.eq(status.as_str()),
                shipment_tracking::updated_at.eq(at),
            ))
            .returning(ShipmentTrackingRow::as_returning())
            .get_result(&mut conn)
            .optional()?
            .map(ShipmentTracking::try_from)
            .transpose()
    }
}

impl ProofRepository for DieselRepository {
    fn insert_proof(&self, new: NewProof) -> Result<ProofApproval, DomainError> {
        let mut conn = self.pool.get()?;
        conn.transaction::<_, DomainError, _>(|conn| {
            let row = diesel::insert_into(proof_approvals::table)
                .values(&ProofApprovalRow {
                    id: Uuid::new_v4(),
                    order_id: new.order_id,
                    order_item_id: new.order_item_id,
                    vendor_assignment_id: new.vendor_assignment_id,
                    proof_type: new.proof_type.to_string(),
                    approval_token: new.approval_token.clone(),
                    status: ProofStatus::Pending.to_string(),
                    image_urls: to_json(&new.image_urls)?,
                    customer_notes: None,
                    created_at: new.created_at,
                    expires_at: new.expires_at,
                    responded_at: None,
                })
                .returning(ProofApprovalRow::as_returning())
                .get_result(conn)?;
            let proof = ProofApproval::try_from(row)?;
            write_outbox(conn, events::proof_created(&proof))?;
            Ok(proof)
        })
    }

    fn find_proof_by_token(&self, token: &str) -> Result<Option<ProofApproval>, DomainError> {
        let mut conn = self.pool.get()?;
        proof_approvals::table
            .filter(proof_approvals::approval_token.eq(token))
            .select(ProofApprovalRow::as_select())
            .first(&mut conn)
            .optional()?
            .map(ProofApproval::try_from)
            .transpose()
    }

    fn record_proof_response(
        &self,
        response: &ProofResponse,
    ) -> Result<Option<ProofApproval>, DomainError> {
        let mut conn = self.pool.get()?;
        conn.transaction::<_, DomainError, _>(|conn| {
            // Compare-and-swap: only a still-pending, unexpired proof moves.
            let updated = diesel::update(
                proof_approvals::table
                    .filter(proof_approvals::id.eq(response.proof_id))
                    .filter(proof_approvals::status.eq(ProofStatus::Pending.as_str()))
                    .filter(proof_approvals::expires_at.ge(response.responded_at)),
            )
            .set((
                proof_approvals::status.eq(ProofStatus::from(response.decision).as_str()),
                proof_approvals::customer_notes.eq(response.notes.clone()),
                proof_approvals::responded_at.eq(Some(response.responded_at)),
            ))
            .returning(ProofApprovalRow::as_returning())
            .get_result(conn)
            .optional()?;
            let Some(row) = updated else {
                return Ok(None);
            };
            let proof = ProofApproval::try_from(row)?;

            diesel::insert_into(proof_response_log::table)
                .values(&ProofResponseLogRow {
                    id: Uuid::new_v4(),
                    proof_approval_id: proof.id,
                    decision: response.decision.to_string(),
                    notes: response.notes.clone(),
                    responder_ip: response.requester.ip.clone(),
                    user_agent: response.requester.user_agent.clone(),
                    created_at: response.responded_at,
                })
                .execute(conn)?;

            if response.decision == ProofDecision::Approved {
                mark_proof_approved(conn, &proof, response.responded_at)?;
            }
            write_outbox(conn, events::proof_responded(proof.order_id, response))?;
            Ok(Some(proof))
        })
    }

    fn proof_responses(&self, proof_id: Uuid) -> Result<Vec<ProofResponseLog>, DomainError> {
        let mut conn = self.pool.get()?;
        let rows = proof_response_log::table
            .filter(proof_response_log::proof_approval_id.eq(proof_id))
            .order(proof_response_log::created_at.asc())
            .select(ProofResponseLogRow::as_select())
            .load(&mut conn)?;
        convert_all(rows)
    }

    fn production_status(
        &self,
        order_id: Uuid,
        vendor_assignment_id: Option<Uuid>,
    ) -> Result<Option<OrderProductionStatus>, DomainError> {
        let mut conn = self.pool.get()?;
        find_production_status(&mut conn, order_id, vendor_assignment_id)?
            .map(OrderProductionStatus::try_from)
            .transpose()
    }
}

fn find_production_status(
    conn: &mut PgConnection,
    order_id: Uuid,
    vendor_assignment_id: Option<Uuid>,
) -> Result<Option<ProductionStatusRow>, DomainError> {
    let query = order_production_status::table
        .filter(order_production_status::order_id.eq(order_id))
        .select(ProductionStatusRow::as_select())
        .into_boxed();
    let query = match vendor_assignment_id {
        Some(id) => query.filter(order_production_status::vendor_assignment_id.eq(id)),
        None => query.filter(order_production_status::vendor_assignment_id.is_null()),
    };
    Ok(query.first(conn).optional()?)
}

/// Flip the production-status field matching the proof's type to approved,
/// creating the row on first approval.
fn mark_proof_approved(
    conn: &mut PgConnection,
    proof: &ProofApproval,
    at: DateTime<Utc>,
) -> Result<(), DomainError> {
    let approved = ProductionProofState::Approved.as_str();
    match find_production_status(conn, proof.order_id, proof.vendor_assignment_id)? {
        Some(existing) => {
            let target = order_production_status::table.find(existing.id);
            match proof.proof_type {
                ProofType::DesignProof => diesel::update(target)
                    .set((
                        order_production_status::design_proof_status.eq(approved),
                        order_production_status::updated_at.eq(at),
                    ))
                    .execute(conn)?,
                ProofType::ProductionProof => diesel::update(target)
                    .set((
                        order_production_status::production_proof_status.eq(approved),
                        order_production_status::updated_at.eq(at),
                    ))
                    .execute(conn)?,
            };
        }
        None => {
            let pending = ProductionProofState::Pending.to_string();
            let (design, production) = match proof.proof_type {
                ProofType::DesignProof => (approved.to_string(), pending),
                ProofType::ProductionProof => (pending, approved.to_string()),
            };
            diesel::insert_into(order_production_status::table)
                .values(&ProductionStatusRow {
                    id: Uuid::new_v4(),
                    order_id: proof.order_id,
                    vendor_assignment_id: proof.vendor_assignment_id,
                    design_proof_status: design,
                    production_proof_status: production,
                    updated_at: at,
                })
                .execute(conn)?;
        }
    }
    Ok(())
}

impl MonitorRepository for DieselRepository {
    fn open_unassigned_orders(&self) -> Result<Vec<Order>, DomainError> {
        let mut conn = self.pool.get()?;
        let assigned_orders = vendor_assignments::table
            .filter(vendor_assignments::status.ne(AssignmentStatus::Cancelled.as_str()))
            .select(vendor_assignments::order_id);
        let rows = orders::table
            .filter(orders::status.eq_any([
                OrderStatus::Pending.as_str(),
                OrderStatus::Processing.as_str(),
            ]))
            .filter(orders::id.ne_all(assigned_orders))
            .order(orders::created_at.asc())
            .select(OrderRow::as_select())
            .load(&mut conn)?;
        convert_all(rows)
    }

    fn assignments_with_status(
        &self,
        status: AssignmentStatus,
    ) -> Result<Vec<VendorAssignment>, DomainError> {
        let mut conn = self.pool.get()?;
        let rows = vendor_assignments::table
            .filter(vendor_assignments::status.eq(status.as_str()))
            .select(VendorAssignmentRow::as_select())
            .load(&mut conn)?;
        convert_all(rows)
    }

    fn assignments_with_tracking(
        &self,
        assignment_ids: &[Uuid],
    ) -> Result<HashSet<Uuid>, DomainError> {
        if assignment_ids.is_empty() {
            return Ok(HashSet::new());
        }
        let mut conn = self.pool.get()?;
        let ids = shipment_tracking::table
            .filter(shipment_tracking::vendor_assignment_id.eq_any(assignment_ids))
            .select(shipment_tracking::vendor_assignment_id)
            .distinct()
            .load::<Uuid>(&mut conn)?;
        Ok(ids.into_iter().collect())
    }

    fn undelivered_tracking(&self) -> Result<Vec<ShipmentTracking>, DomainError> {
        let mut conn = self.pool.get()?;
        let rows = shipment_tracking::table
            .filter(shipment_tracking::status.ne(TrackingStatus::Delivered.as_str()))
            .select(ShipmentTrackingRow::as_select())
            .load(&mut conn)?;
        convert_all(rows)
    }

    fn pending_proofs(&self) -> Result<Vec<ProofApproval>, DomainError> {
        let mut conn = self.pool.get()?;
        let rows = proof_approvals::table
            .filter(proof_approvals::status.eq(ProofStatus::Pending.as_str()))
            .select(ProofApprovalRow::as_select())
            .load(&mut conn)?;
        convert_all(rows)
    }

    fn record_alerts(&self, new_alerts: &[Alert]) -> Result<(), DomainError> {
        if new_alerts.is_empty() {
            return Ok(());
        }
        let mut conn = self.pool.get()?;
        conn.transaction::<_, DomainError, _>(|conn| {
            let rows: Vec<AlertRow> = new_alerts.iter().map(AlertRow::from).collect();
            diesel::insert_into(alerts::table)
                .values(&rows)
                .execute(conn)?;
            for alert in new_alerts {
                write_outbox(conn, events::alert_raised(alert))?;
            }
            Ok(())
        })
    }

    fn recent_alerts(&self, limit: i64) -> Result<Vec<Alert>, DomainError> {
        let mut conn = self.pool.get()?;
        let rows = alerts::table
            .order(alerts::created_at.desc())
            .limit(limit)
            .select(AlertRow::as_select())
            .load(&mut conn)?;
        convert_all(rows)
    }

    fn load_thresholds(&self) -> Result<Option<MonitorThresholds>, DomainError> {
        let mut conn = self.pool.get()?;
        monitor_settings::table
            .find(THRESHOLDS_KEY)
            .select(monitor_settings::value)
            .first::<serde_json::Value>(&mut conn)
            .optional()?
            .map(|v| from_json("monitor_settings.value", v))
            .transpose()
    }

    fn save_thresholds(&self, thresholds: &MonitorThresholds) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;
        let value = to_json(thresholds)?;
        let now = Utc::now();
        diesel::insert_into(monitor_settings::table)
            .values((
                monitor_settings::key.eq(THRESHOLDS_KEY),
                monitor_settings::value.eq(&value),
                monitor_settings::updated_at.eq(now),
            ))
            .on_conflict(monitor_settings::key)
            .do_update()
            .set((
                monitor_settings::value.eq(&value),
                monitor_settings::updated_at.eq(now),
            ))
            .execute(&mut conn)?;
        Ok(())
    }
}
