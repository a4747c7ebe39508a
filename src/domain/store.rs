use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::DomainError;
use super::order::OrderStatus;

text_enum! {
    /// External storefront platforms with a connector implementation.
    pub enum StorePlatform {
        Shopify => "shopify",
        WooCommerce => "woocommerce",
        Etsy => "etsy",
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Store {
    pub id: Uuid,
    pub name: String,
    pub platform: StorePlatform,
    pub base_url: String,
    #[serde(skip_serializing)]
    pub api_key: String,
    #[serde(skip_serializing)]
    pub api_secret: Option<String>,
    /// Platform-side shop identifier, required by Etsy.
    pub shop_id: Option<String>,
    pub is_active: bool,
    pub last_sync_at: Option<DateTime<Utc>>,
}

// ── Canonical shapes produced by store connectors ────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomerContact {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub name: Option<String>,
    pub line1: Option<String>,
    pub line2: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
    pub postal_code: Option<String>,
    pub country_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemAttribute {
    pub name: String,
    pub value: String,
}

/// Variant and personalisation details attached to a line item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemCustomization {
    pub variant_title: Option<String>,
    #[serde(default)]
    pub attributes: Vec<ItemAttribute>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalItem {
    pub external_item_id: String,
    pub external_product_id: Option<String>,
    pub name: String,
    pub sku: Option<String>,
    pub quantity: i32,
    pub unit_price: BigDecimal,
    pub total_price: BigDecimal,
    pub customization: ItemCustomization,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalOrder {
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
    pub items: Vec<CanonicalItem>,
}

impl CanonicalOrder {
    /// Schema checks applied at the ingestion boundary.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.external_order_id.trim().is_empty() {
            return Err(DomainError::InvalidInput(
                "external order id is empty".to_string(),
            ));
        }
        if self.items.is_empty() {
            return Err(DomainError::InvalidInput(format!(
                "order {} has no items",
                self.external_order_id
            )));
        }
        if self.total_amount < BigDecimal::zero() {
            return Err(DomainError::InvalidInput(format!(
                "order {} has a negative total",
                self.external_order_id
            )));
        }
        if self.currency.len() != 3 || !self.currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(DomainError::InvalidInput(format!(
                "order {} has invalid currency '{}'",
                self.external_order_id, self.currency
            )));
        }
        for item in &self.items {
            if item.external_item_id.trim().is_empty() {
                return Err(DomainError::InvalidInput(format!(
                    "order {} has an item without an id",
                    self.external_order_id
                )));
            }
            if item.quantity <= 0 {
                return Err(DomainError::InvalidInput(format!(
                    "item {} has non-positive quantity {}",
                    item.external_item_id, item.quantity
                )));
            }
            if item.unit_price < BigDecimal::zero() || item.total_price < BigDecimal::zero() {
                return Err(DomainError::InvalidInput(format!(
                    "item {} has a negative price",
                    item.external_item_id
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalProduct {
    pub external_product_id: String,
    pub name: String,
    pub sku: Option<String>,
    pub price: Option<BigDecimal>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Product {
    pub id: Uuid,
    pub store_id: Uuid,
    pub external_product_id: String,
    pub name: String,
    pub sku: Option<String>,
    pub price: Option<BigDecimal>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductVendor {
    pub id: Uuid,
    pub product_id: Uuid,
    pub vendor_id: Uuid,
    pub is_default: bool,
}

/// Result of a storefront connectivity check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionCheck {
    pub ok: bool,
    pub message: String,
}
