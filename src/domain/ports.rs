use std::collections::HashSet;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::assignment::{
    AssignmentStatus, AssignmentWithItems, ItemAssignment, NewAssignment, Vendor, VendorAssignment,
};
use super::errors::DomainError;
use super::monitor::{Alert, MonitorThresholds};
use super::order::{NewOrder, Order, OrderItem, OrderStatusChange, OrderStatusHistory, OrderWithItems};
use super::proof::{
    NewProof, OrderProductionStatus, ProofApproval, ProofResponse, ProofResponseLog,
};
use super::store::{CanonicalProduct, Product, ProductVendor, Store};
use super::tracking::{NewTracking, ShipmentTracking, TrackingStatus};

pub trait StoreRepository: Send + Sync + 'static {
    fn find_store(&self, id: Uuid) -> Result<Option<Store>, DomainError>;
    fn list_active_stores(&self) -> Result<Vec<Store>, DomainError>;
    fn mark_synced(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), DomainError>;
}

pub trait CatalogRepository: Send + Sync + 'static {
    /// Insert or refresh a product keyed by (store, external product id).
    fn upsert_product(
        &self,
        store_id: Uuid,
        product: &CanonicalProduct,
    ) -> Result<Product, DomainError>;
    fn find_product(&self, id: Uuid) -> Result<Option<Product>, DomainError>;
    /// The vendor flagged `is_default` for the product matching either the
    /// external product id or, failing that, the sku.
    fn default_vendor_for(
        &self,
        store_id: Uuid,
        external_product_id: Option<&str>,
        sku: Option<&str>,
    ) -> Result<Option<Uuid>, DomainError>;
    /// Link a vendor to a product. A new default clears any previous one.
    fn link_product_vendor(
        &self,
        product_id: Uuid,
        vendor_id: Uuid,
        is_default: bool,
    ) -> Result<ProductVendor, DomainError>;
}

pub trait VendorRepository: Send + Sync + 'static {
    fn find_vendor(&self, id: Uuid) -> Result<Option<Vendor>, DomainError>;
}

pub trait OrderRepository: Send + Sync + 'static {
    fn find_order(&self, id: Uuid) -> Result<Option<Order>, DomainError>;
    fn find_order_by_external(
        &self,
        store_id: Uuid,
        external_order_id: &str,
    ) -> Result<Option<Order>, DomainError>;
    fn order_items(&self, order_id: Uuid) -> Result<Vec<OrderItem>, DomainError>;
    /// Insert the order and all of its items as one unit. Returns `None` when
    /// the (store, external id) pair already exists.
    fn insert_order(&self, new_order: NewOrder) -> Result<Option<OrderWithItems>, DomainError>;
    /// Apply `change` only if the order is still in `change.from`, appending
    /// the history row in the same unit. Returns `None` if the status moved.
    fn update_order_status(&self, change: &OrderStatusChange)
        -> Result<Option<Order>, DomainError>;
    fn order_history(&self, order_id: Uuid) -> Result<Vec<OrderStatusHistory>, DomainError>;
}

pub trait AssignmentRepository: Send + Sync + 'static {
    fn find_assignment(&self, id: Uuid) -> Result<Option<VendorAssignment>, DomainError>;
    fn find_assignment_for(
        &self,
        order_id: Uuid,
        vendor_id: Uuid,
    ) -> Result<Option<VendorAssignment>, DomainError>;
    fn assignments_for_order(&self, order_id: Uuid)
        -> Result<Vec<AssignmentWithItems>, DomainError>;
    /// The item assignment covering `order_item_id` whose parent is not cancelled.
    fn active_item_assignment(
        &self,
        order_item_id: Uuid,
    ) -> Result<Option<ItemAssignment>, DomainError>;
    /// Insert the assignment and its item links atomically. Fails with
    /// `DuplicateAssignment` or `ItemAlreadyAssigned` on conflicts.
    fn insert_assignment(&self, new: NewAssignment) -> Result<AssignmentWithItems, DomainError>;
    fn find_item_assignment(&self, id: Uuid) -> Result<Option<ItemAssignment>, DomainError>;
    fn delete_item_assignment(&self, id: Uuid) -> Result<bool, DomainError>;
    /// Conditional on the assignment still being in `from`.
    fn update_assignment_status(
        &self,
        id: Uuid,
        from: AssignmentStatus,
        to: AssignmentStatus,
        at: DateTime<Utc>,
    ) -> Result<Option<VendorAssignment>, DomainError>;
}

pub trait TrackingRepository: Send + Sync + 'static {
    fn insert_tracking(&self, new: NewTracking) -> Result<ShipmentTracking, DomainError>;
    fn find_tracking(&self, id: Uuid) -> Result<Option<ShipmentTracking>, DomainError>;
    fn update_tracking_status(
        &self,
        id: Uuid,
        status: TrackingStatus,
        at: DateTime<Utc>,
    ) -> Result<Option<ShipmentTracking>, DomainError>;
}

pub trait ProofRepository: Send + Sync + 'static {
    fn insert_proof(&self, new: NewProof) -> Result<ProofApproval, DomainError>;
    fn find_proof_by_token(&self, token: &str) -> Result<Option<ProofApproval>, DomainError>;
    /// Compare-and-swap: applies the response only while the proof is still
    /// pending and not past `expires_at`, writing the response log and, for
    /// approvals, the production status in the same unit. Returns `None` when
    /// the swap lost.
    fn record_proof_response(
        &self,
        response: &ProofResponse,
    ) -> Result<Option<ProofApproval>, DomainError>;
    fn proof_responses(&self, proof_id: Uuid) -> Result<Vec<ProofResponseLog>, DomainError>;
    fn production_status(
        &self,
        order_id: Uuid,
        vendor_assignment_id: Option<Uuid>,
    ) -> Result<Option<OrderProductionStatus>, DomainError>;
}

/// Read side of the SLA monitor plus alert and settings persistence.
pub trait MonitorRepository: Send + Sync + 'static {
    /// Pending/processing orders with no assignment other than cancelled ones.
    fn open_unassigned_orders(&self) -> Result<Vec<Order>, DomainError>;
    fn assignments_with_status(
        &self,
        status: AssignmentStatus,
    ) -> Result<Vec<VendorAssignment>, DomainError>;
    /// Ids among `assignment_ids` that have at least one tracking row.
    fn assignments_with_tracking(
        &self,
        assignment_ids: &[Uuid],
    ) -> Result<HashSet<Uuid>, DomainError>;
    fn undelivered_tracking(&self) -> Result<Vec<ShipmentTracking>, DomainError>;
    fn pending_proofs(&self) -> Result<Vec<ProofApproval>, DomainError>;
    fn record_alerts(&self, alerts: &[Alert]) -> Result<(), DomainError>;
    fn recent_alerts(&self, limit: i64) -> Result<Vec<Alert>, DomainError>;
    fn load_thresholds(&self) -> Result<Option<MonitorThresholds>, DomainError>;
    fn save_thresholds(&self, thresholds: &MonitorThresholds) -> Result<(), DomainError>;
}
