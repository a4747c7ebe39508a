use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::assignment::AssignmentWithItems;
use super::store::{CanonicalOrder, CustomerContact, ItemCustomization, ShippingAddress};

text_enum! {
    /// Marketplace-side order lifecycle.
    pub enum OrderStatus {
        Pending => "pending",
        Processing => "processing",
        Shipped => "shipped",
        Fulfilled => "fulfilled",
        Cancelled => "cancelled",
    }
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Fulfilled | OrderStatus::Cancelled)
    }

    /// Orders in these states still need a vendor to pick them up.
    pub fn awaits_assignment(&self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::Processing)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub id: Uuid,
    pub store_id: Uuid,
    pub external_order_id: String,
    pub order_number: Option<String>,
    pub customer: CustomerContact,
    pub shipping_address: Option<ShippingAddress>,
    pub total_amount: BigDecimal,
    pub currency: String,
    pub status: OrderStatus,
    pub fulfillment_status: Option<String>,
    pub payment_status: Option<String>,
    pub order_date: DateTime<Utc>,
    pub tags: Vec<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub external_item_id: String,
    pub external_product_id: Option<String>,
    pub product_name: String,
    pub sku: Option<String>,
    pub quantity: i32,
    pub unit_price: BigDecimal,
    pub total_price: BigDecimal,
    pub customization: ItemCustomization,
}

/// An order plus its items, ready to be inserted as one unit.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub store_id: Uuid,
    pub order: CanonicalOrder,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderWithItems {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderDetails {
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub assignments: Vec<AssignmentWithItems>,
}

/// Requested order status change, recorded verbatim in the history.
#[derive(Debug, Clone)]
pub struct OrderStatusChange {
    pub order_id: Uuid,
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub actor: String,
    pub notes: Option<String>,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderStatusHistory {
    pub id: Uuid,
    pub order_id: Uuid,
    pub old_status: OrderStatus,
    pub new_status: OrderStatus,
    pub actor: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}
