use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::de::DeserializeOwned;
use serde_json::Value;
use uuid::Uuid;

use crate::domain::assignment::{ItemAssignment, Vendor, VendorAssignment};
use crate::domain::errors::DomainError;
use crate::domain::monitor::Alert;
use crate::domain::order::{Order, OrderItem, OrderStatusHistory};
use crate::domain::proof::{OrderProductionStatus, ProofApproval, ProofResponseLog};
use crate::domain::store::{CustomerContact, Product, ProductVendor, Store};
use crate::domain::tracking::ShipmentTracking;
use crate::schema::{
    alerts, item_assignments, marketplace_outbox, order_items, order_production_status,
    order_status_history, orders, product_vendors, products, proof_approvals,
    proof_response_log, shipment_tracking, stores, vendor_assignments, vendors,
};

/// Decode a JSONB column into its typed domain shape.
pub fn from_json<T: DeserializeOwned>(column: &str, value: Value) -> Result<T, DomainError> {
    serde_json::from_value(value)
        .map_err(|e| DomainError::Internal(format!("corrupt {} column: {}", column, e)))
}

pub fn to_json<T: serde::Serialize>(value: &T) -> Result<Value, DomainError> {
    serde_json::to_value(value).map_err(|e| DomainError::Internal(e.to_string()))
}

// ── Stores & catalog ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = stores)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct StoreRow {
    pub id: Uuid,
    pub name: String,
    pub platform: String,
    pub base_url: String,
    pub api_key: String,
    pub api_secret: Option<String>,
    pub shop_id: Option<String>,
    pub is_active: bool,
    pub last_sync_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<StoreRow> for Store {
    type Error = DomainError;

    fn try_from(r: StoreRow) -> Result<Self, Self::Error> {
        Ok(Store {
            id: r.id,
            name: r.name,
            platform: r.platform.parse()?,
            base_url: r.base_url,
            api_key: r.api_key,
            api_secret: r.api_secret,
            shop_id: r.shop_id,
            is_active: r.is_active,
            last_sync_at: r.last_sync_at,
        })
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = stores)]
pub struct NewStoreRow {
    pub id: Uuid,
    pub name: String,
    pub platform: String,
    pub base_url: String,
    pub api_key: String,
    pub api_secret: Option<String>,
    pub shop_id: Option<String>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = vendors)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct VendorRow {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub commission_rate: BigDecimal,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<VendorRow> for Vendor {
    fn from(r: VendorRow) -> Self {
        Vendor {
            id: r.id,
            name: r.name,
            email: r.email,
            commission_rate: r.commission_rate,
            is_active: r.is_active,
        }
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = vendors)]
pub struct NewVendorRow {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub commission_rate: BigDecimal,
    pub is_active: bool,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = products)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ProductRow {
    pub id: Uuid,
    pub store_id: Uuid,
    pub external_product_id: String,
    pub name: String,
    pub sku: Option<String>,
    pub price: Option<BigDecimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(r: ProductRow) -> Self {
        Product {
            id: r.id,
            store_id: r.store_id,
            external_product_id: r.external_product_id,
            name: r.name,
            sku: r.sku,
            price: r.price,
        }
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = products)]
pub struct NewProductRow {
    pub id: Uuid,
    pub store_id: Uuid,
    pub external_product_id: String,
    pub name: String,
    pub sku: Option<String>,
    pub price: Option<BigDecimal>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Insertable)]
#[diesel(table_name = product_vendors)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ProductVendorRow {
    pub id: Uuid,
    pub product_id: Uuid,
    pub vendor_id: Uuid,
    pub is_default: bool,
}

impl From<ProductVendorRow> for ProductVendor {
    fn from(r: ProductVendorRow) -> Self {
        ProductVendor {
            id: r.id,
            product_id: r.product_id,
            vendor_id: r.vendor_id,
            is_default: r.is_default,
        }
    }
}

// ── Orders ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderRow {
    pub id: Uuid,
    pub store_id: Uuid,
    pub external_order_id: String,
    pub order_number: Option<String>,
    pub customer_name: String,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub shipping_address: Option<Value>,
    pub total_amount: BigDecimal,
    pub currency: String,
    pub status: String,
    pub fulfillment_status: Option<String>,
    pub payment_status: Option<String>,
    pub order_date: DateTime<Utc>,
    pub tags: Value,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = DomainError;

    fn try_from(r: OrderRow) -> Result<Self, Self::Error> {
        Ok(Order {
            id: r.id,
            store_id: r.store_id,
            external_order_id: r.external_order_id,
            order_number: r.order_number,
            customer: CustomerContact {
                name: r.customer_name,
                email: r.customer_email,
                phone: r.customer_phone,
            },
            shipping_address: r
                .shipping_address
                .map(|v| from_json("shipping_address", v))
                .transpose()?,
            total_amount: r.total_amount,
            currency: r.currency,
            status: r.status.parse()?,
            fulfillment_status: r.fulfillment_status,
            payment_status: r.payment_status,
            order_date: r.order_date,
            tags: from_json("tags", r.tags)?,
            notes: r.notes,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = orders)]
pub struct NewOrderRow {
    pub id: Uuid,
    pub store_id: Uuid,
    pub external_order_id: String,
    pub order_number: Option<String>,
    pub customer_name: String,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub shipping_address: Option<Value>,
    pub total_amount: BigDecimal,
    pub currency: String,
    pub status: String,
    pub fulfillment_status: Option<String>,
    pub payment_status: Option<String>,
    pub order_date: DateTime<Utc>,
    pub tags: Value,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Insertable)]
#[diesel(table_name = order_items)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderItemRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub external_item_id: String,
    pub external_product_id: Option<String>,
    pub product_name: String,
    pub sku: Option<String>,
    pub quantity: i32,
    pub unit_price: BigDecimal,
    pub total_price: BigDecimal,
    pub customization: Value,
}

impl TryFrom<OrderItemRow> for OrderItem {
    type Error = DomainError;

    fn try_from(r: OrderItemRow) -> Result<Self, Self::Error> {
        Ok(OrderItem {
            id: r.id,
            order_id: r.order_id,
            external_item_id: r.external_item_id,
            external_product_id: r.external_product_id,
            product_name: r.product_name,
            sku: r.sku,
            quantity: r.quantity,
            unit_price: r.unit_price,
            total_price: r.total_price,
            customization: from_json("customization", r.customization)?,
        })
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Insertable)]
#[diesel(table_name = order_status_history)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderStatusHistoryRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub old_status: String,
    pub new_status: String,
    pub actor: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<OrderStatusHistoryRow> for OrderStatusHistory {
    type Error = DomainError;

    fn try_from(r: OrderStatusHistoryRow) -> Result<Self, Self::Error> {
        Ok(OrderStatusHistory {
            id: r.id,
            order_id: r.order_id,
            old_status: r.old_status.parse()?,
            new_status: r.new_status.parse()?,
            actor: r.actor,
            notes: r.notes,
            created_at: r.created_at,
        })
    }
}

// ── Assignments & tracking ───────────────────────────────────────────────────

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Insertable)]
#[diesel(table_name = vendor_assignments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct VendorAssignmentRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub vendor_id: Uuid,
    pub assignment_type: String,
    pub status: String,
    pub commission_amount: BigDecimal,
    pub notes: Option<String>,
    pub assigned_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<VendorAssignmentRow> for VendorAssignment {
    type Error = DomainError;

    fn try_from(r: VendorAssignmentRow) -> Result<Self, Self::Error> {
        Ok(VendorAssignment {
            id: r.id,
            order_id: r.order_id,
            vendor_id: r.vendor_id,
            assignment_type: r.assignment_type.parse()?,
            status: r.status.parse()?,
            commission_amount: r.commission_amount,
            notes: r.notes,
            assigned_at: r.assigned_at,
            accepted_at: r.accepted_at,
            started_at: r.started_at,
            completed_at: r.completed_at,
            cancelled_at: r.cancelled_at,
            updated_at: r.updated_at,
        })
    }
}

/// Status change plus the lifecycle timestamp it stamps. `None` columns are
/// left untouched.
#[derive(Debug, AsChangeset)]
#[diesel(table_name = vendor_assignments)]
pub struct AssignmentStatusChangeset {
    pub status: String,
    pub updated_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Insertable)]
#[diesel(table_name = item_assignments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ItemAssignmentRow {
    pub id: Uuid,
    pub vendor_assignment_id: Uuid,
    pub order_item_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl From<ItemAssignmentRow> for ItemAssignment {
    fn from(r: ItemAssignmentRow) -> Self {
        ItemAssignment {
            id: r.id,
            vendor_assignment_id: r.vendor_assignment_id,
            order_item_id: r.order_item_id,
            created_at: r.created_at,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Insertable)]
#[diesel(table_name = shipment_tracking)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ShipmentTrackingRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub vendor_assignment_id: Uuid,
    pub carrier: String,
    pub tracking_number: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<ShipmentTrackingRow> for ShipmentTracking {
    type Error = DomainError;

    fn try_from(r: ShipmentTrackingRow) -> Result<Self, Self::Error> {
        Ok(ShipmentTracking {
            id: r.id,
            order_id: r.order_id,
            vendor_assignment_id: r.vendor_assignment_id,
            carrier: r.carrier,
            tracking_number: r.tracking_number,
            status: r.status.parse()?,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

// ── Proofs ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Insertable)]
#[diesel(table_name = proof_approvals)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ProofApprovalRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub order_item_id: Option<Uuid>,
    pub vendor_assignment_id: Option<Uuid>,
    pub proof_type: String,
    pub approval_token: String,
    pub status: String,
    pub image_urls: Value,
    pub customer_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub responded_at: Option<DateTime<Utc>>,
}

impl TryFrom<ProofApprovalRow> for ProofApproval {
    type Error = DomainError;

    fn try_from(r: ProofApprovalRow) -> Result<Self, Self::Error> {
        Ok(ProofApproval {
            id: r.id,
            order_id: r.order_id,
            order_item_id: r.order_item_id,
            vendor_assignment_id: r.vendor_assignment_id,
            proof_type: r.proof_type.parse()?,
            approval_token: r.approval_token,
            status: r.status.parse()?,
            image_urls: from_json("image_urls", r.image_urls)?,
            customer_notes: r.customer_notes,
            created_at: r.created_at,
            expires_at: r.expires_at,
            responded_at: r.responded_at,
        })
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Insertable)]
#[diesel(table_name = proof_response_log)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ProofResponseLogRow {
    pub id: Uuid,
    pub proof_approval_id: Uuid,
    pub decision: String,
    pub notes: Option<String>,
    pub responder_ip: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<ProofResponseLogRow> for ProofResponseLog {
    type Error = DomainError;

    fn try_from(r: ProofResponseLogRow) -> Result<Self, Self::Error> {
        Ok(ProofResponseLog {
            id: r.id,
            proof_approval_id: r.proof_approval_id,
            decision: r.decision.parse()?,
            notes: r.notes,
            responder_ip: r.responder_ip,
            user_agent: r.user_agent,
            created_at: r.created_at,
        })
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Insertable)]
#[diesel(table_name = order_production_status)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ProductionStatusRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub vendor_assignment_id: Option<Uuid>,
    pub design_proof_status: String,
    pub production_proof_status: String,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<ProductionStatusRow> for OrderProductionStatus {
    type Error = DomainError;

    fn try_from(r: ProductionStatusRow) -> Result<Self, Self::Error> {
        Ok(OrderProductionStatus {
            id: r.id,
            order_id: r.order_id,
            vendor_assignment_id: r.vendor_assignment_id,
            design_proof_status: r.design_proof_status.parse()?,
            production_proof_status: r.production_proof_status.parse()?,
            updated_at: r.updated_at,
        })
    }
}

// ── Monitor ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Insertable)]
#[diesel(table_name = alerts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct AlertRow {
    pub id: Uuid,
    pub alert_type: String,
    pub subject_kind: String,
    pub subject_id: Uuid,
    pub order_id: Uuid,
    pub overdue_minutes: i64,
    pub created_at: DateTime<Utc>,
}

impl From<&Alert> for AlertRow {
    fn from(a: &Alert) -> Self {
        AlertRow {
            id: a.id,
            alert_type: a.alert_type.to_string(),
            subject_kind: a.subject_kind.to_string(),
            subject_id: a.subject_id,
            order_id: a.order_id,
            overdue_minutes: a.overdue_minutes,
            created_at: a.created_at,
        }
    }
}

impl TryFrom<AlertRow> for Alert {
    type Error = DomainError;

    fn try_from(r: AlertRow) -> Result<Self, Self::Error> {
        Ok(Alert {
            id: r.id,
            alert_type: r.alert_type.parse()?,
            subject_kind: r.subject_kind.parse()?,
            subject_id: r.subject_id,
            order_id: r.order_id,
            overdue_minutes: r.overdue_minutes,
            created_at: r.created_at,
        })
    }
}

// ── Outbox ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = marketplace_outbox)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OutboxEventRow {
    pub id: Uuid,
    pub aggregate_type: String,
    pub aggregate_id: String,
    pub event_type: String,
    pub payload: Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = marketplace_outbox)]
pub struct NewOutboxEventRow {
    pub id: Uuid,
    pub aggregate_type: String,
    pub aggregate_id: String,
    pub event_type: String,
    pub payload: Value,
}
