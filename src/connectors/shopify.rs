use bigdecimal::BigDecimal;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::blocking::Client;
use reqwest::header::LINK;
use serde::Deserialize;
use serde_json::Value;

use super::{
    lookup_status, non_empty, parse_decimal, send_json, ConnectorError, FetchedOrders,
    StoreConnector,
};
use crate::domain::order::OrderStatus;
use crate::domain::store::{
    CanonicalItem, CanonicalOrder, CanonicalProduct, ConnectionCheck, CustomerContact,
    ItemAttribute, ItemCustomization, ShippingAddress, Store, StorePlatform,
};

const API_VERSION: &str = "2024-01";
const PAGE_LIMIT: &str = "250";

/// `fulfillment_status` → canonical status. A missing value means unfulfilled.
const STATUS_TABLE: &[(&str, OrderStatus)] = &[
    ("unfulfilled", OrderStatus::Pending),
    ("partial", OrderStatus::Processing),
    ("fulfilled", OrderStatus::Fulfilled),
    ("restocked", OrderStatus::Cancelled),
];

pub fn map_status(
    fulfillment_status: Option<&str>,
    cancelled: bool,
) -> Result<OrderStatus, ConnectorError> {
    if cancelled {
        return Ok(OrderStatus::Cancelled);
    }
    lookup_status(
        STATUS_TABLE,
        StorePlatform::Shopify,
        fulfillment_status.unwrap_or("unfulfilled"),
    )
}

pub struct ShopifyConnector {
    client: Client,
    base_url: String,
    access_token: String,
}

impl ShopifyConnector {
    pub fn new(store: &Store, client: Client) -> Result<Self, ConnectorError> {
        if store.api_key.is_empty() {
            return Err(ConnectorError::Config(
                "store is missing a Shopify access token".to_string(),
            ));
        }
        Ok(Self {
            client,
            base_url: store.base_url.trim_end_matches('/').to_string(),
            access_token: store.api_key.clone(),
        })
    }

    fn url(&self, resource: &str) -> String {
        format!("{}/admin/api/{}/{}", self.base_url, API_VERSION, resource)
    }

    /// Follow `Link: rel="next"` pages starting from `first`.
    fn fetch_pages<T: for<'de> Deserialize<'de>>(
        &self,
        first: reqwest::blocking::RequestBuilder,
        mut collect: impl FnMut(T) -> Result<(), ConnectorError>,
    ) -> Result<(), ConnectorError> {
        let mut request = first;
        loop {
            let (page, headers) = send_json::<T>(
                request.header("X-Shopify-Access-Token", &self.access_token),
            )?;
            collect(page)?;
            let next = headers
                .get(LINK)
                .and_then(|v| v.to_str().ok())
                .and_then(next_page_url);
            match next {
                Some(url) => request = self.client.get(url),
                None => return Ok(()),
            }
        }
    }
}

impl StoreConnector for ShopifyConnector {
    fn platform(&self) -> StorePlatform {
        StorePlatform::Shopify
    }

    fn test_connection(&self) -> ConnectionCheck {
        let request = self
            .client
            .get(self.url("shop.json"))
            .header("X-Shopify-Access-Token", &self.access_token);
        match send_json::<ShopEnvelope>(request) {
            Ok((body, _)) => ConnectionCheck {
                ok: true,
                message: format!("connected to Shopify shop '{}'", body.shop.name),
            },
            Err(e) => ConnectionCheck {
                ok: false,
                message: e.to_string(),
            },
        }
    }

    fn fetch_orders(&self, since: Option<DateTime<Utc>>) -> Result<FetchedOrders, ConnectorError> {
        let mut query = vec![
            ("status", "any".to_string()),
            ("limit", PAGE_LIMIT.to_string()),
        ];
        if let Some(since) = since {
            query.push((
                "created_at_min",
                since.to_rfc3339_opts(SecondsFormat::Secs, true),
            ));
        }
        let first = self.client.get(self.url("orders.json")).query(&query);

        let mut fetched = FetchedOrders::default();
        self.fetch_pages::<OrdersEnvelope>(first, |page| {
            for raw in page.orders {
                fetched.push(raw.id.to_string(), raw.into_canonical());
            }
            Ok(())
        })?;
        Ok(fetched)
    }

    fn fetch_products(&self) -> Result<Vec<CanonicalProduct>, ConnectorError> {
        let first = self
            .client
            .get(self.url("products.json"))
            .query(&[("limit", PAGE_LIMIT)]);

        let mut products = Vec::new();
        self.fetch_pages::<ProductsEnvelope>(first, |page| {
            for raw in page.products {
                products.push(raw.into_canonical()?);
            }
            Ok(())
        })?;
        Ok(products)
    }
}

/// Extract the `rel="next"` target from a Shopify `Link` header.
pub fn next_page_url(link: &str) -> Option<String> {
    link.split(',').find_map(|part| {
        let mut segments = part.split(';');
        let target = segments.next()?.trim();
        let is_next = segments.any(|s| s.trim() == "rel=\"next\"");
        if !is_next {
            return None;
        }
        target
            .strip_prefix('<')
            .and_then(|t| t.strip_suffix('>'))
            .map(str::to_string)
    })
}

// ── Wire format ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ShopEnvelope {
    shop: Shop,
}

#[derive(Debug, Deserialize)]
struct Shop {
    name: String,
}

#[derive(Debug, Deserialize)]
struct OrdersEnvelope {
    orders: Vec<ShopifyOrder>,
}

#[derive(Debug, Deserialize)]
struct ShopifyOrder {
    id: u64,
    name: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    created_at: DateTime<Utc>,
    cancelled_at: Option<DateTime<Utc>>,
    total_price: String,
    currency: String,
    financial_status: Option<String>,
    fulfillment_status: Option<String>,
    #[serde(default)]
    tags: String,
    note: Option<String>,
    customer: Option<ShopifyCustomer>,
    shipping_address: Option<ShopifyAddress>,
    #[serde(default)]
    line_items: Vec<ShopifyLineItem>,
}

#[derive(Debug, Deserialize)]
struct ShopifyCustomer {
    first_name: Option<String>,
    last_name: Option<String>,
    email: Option<String>,
    phone: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ShopifyAddress {
    name: Option<String>,
    address1: Option<String>,
    address2: Option<String>,
    city: Option<String>,
    province: Option<String>,
    zip: Option<String>,
    country_code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ShopifyLineItem {
    id: u64,
    product_id: Option<u64>,
    title: String,
    variant_title: Option<String>,
    sku: Option<String>,
    quantity: i32,
    price: String,
    #[serde(default)]
    properties: Vec<ShopifyProperty>,
}

#[derive(Debug, Deserialize)]
struct ShopifyProperty {
    name: String,
    value: Value,
}

#[derive(Debug, Deserialize)]
struct ProductsEnvelope {
    products: Vec<ShopifyProduct>,
}

#[derive(Debug, Deserialize)]
struct ShopifyProduct {
    id: u64,
    title: String,
    #[serde(default)]
    variants: Vec<ShopifyVariant>,
}

#[derive(Debug, Deserialize)]
struct ShopifyVariant {
    sku: Option<String>,
    price: Option<String>,
}

impl ShopifyOrder {
    fn into_canonical(self) -> Result<CanonicalOrder, ConnectorError> {
        let status = map_status(self.fulfillment_status.as_deref(), self.cancelled_at.is_some())?;
        let customer = match self.customer {
            Some(c) => CustomerContact {
                name: [c.first_name, c.last_name]
                    .into_iter()
                    .flatten()
                    .collect::<Vec<_>>()
                    .join(" "),
                email: c.email.or(self.email),
                phone: c.phone.or(self.phone),
            },
            None => CustomerContact {
                name: String::new(),
                email: self.email,
                phone: self.phone,
            },
        };
        let items = self
            .line_items
            .into_iter()
            .map(ShopifyLineItem::into_canonical)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(CanonicalOrder {
            external_order_id: self.id.to_string(),
            order_number: self.name,
            customer,
            shipping_address: self.shipping_address.map(|a| ShippingAddress {
                name: a.name,
                line1: a.address1,
                line2: non_empty(a.address2),
                city: a.city,
                region: a.province,
                postal_code: a.zip,
                country_code: a.country_code,
            }),
            total_amount: parse_decimal("total_price", &self.total_price)?,
            currency: self.currency,
            status,
            fulfillment_status: self.fulfillment_status,
            payment_status: self.financial_status,
            order_date: self.created_at,
            tags: self
                .tags
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect(),
            notes: non_empty(self.note),
            items,
        })
    }
}

impl ShopifyLineItem {
    fn into_canonical(self) -> Result<CanonicalItem, ConnectorError> {
        let unit_price = parse_decimal("line item price", &self.price)?;
        let total_price = &unit_price * BigDecimal::from(self.quantity);
        Ok(CanonicalItem {
            external_item_id: self.id.to_string(),
            external_product_id: self.product_id.map(|id| id.to_string()),
            name: self.title,
            sku: non_empty(self.sku),
            quantity: self.quantity,
            unit_price,
            total_price,
            customization: ItemCustomization {
                variant_title: non_empty(self.variant_title),
                attributes: self
                    .properties
                    .into_iter()
                    .map(|p| ItemAttribute {
                        name: p.name,
                        value: match p.value {
                            Value::String(s) => s,
                            other => other.to_string(),
                        },
                    })
                    .collect(),
            },
        })
    }
}

impl ShopifyProduct {
    fn into_canonical(self) -> Result<CanonicalProduct, ConnectorError> {
        let first = self.variants.into_iter().next();
        let price = match first.as_ref().and_then(|v| v.price.as_deref()) {
            Some(p) => Some(parse_decimal("variant price", p)?),
            None => None,
        };
        Ok(CanonicalProduct {
            external_product_id: self.id.to_string(),
            name: self.title,
            sku: first.and_then(|v| non_empty(v.sku)),
            price,
        })
    }
}
