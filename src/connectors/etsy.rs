use bigdecimal::BigDecimal;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::blocking::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::{
    lookup_status, non_empty, required, send_json, ConnectorError, FetchedOrders, StoreConnector,
};
use crate::domain::order::OrderStatus;
use crate::domain::store::{
    CanonicalItem, CanonicalOrder, CanonicalProduct, ConnectionCheck, CustomerContact,
    ItemAttribute, ItemCustomization, ShippingAddress, Store, StorePlatform,
};

pub const DEFAULT_BASE_URL: &str = "https://openapi.etsy.com";
const PAGE_LIMIT: usize = 100;

const STATUS_TABLE: &[(&str, OrderStatus)] = &[
    ("open", OrderStatus::Pending),
    ("payment processing", OrderStatus::Pending),
    ("paid", OrderStatus::Processing),
    ("partially refunded", OrderStatus::Processing),
    ("completed", OrderStatus::Fulfilled),
    ("canceled", OrderStatus::Cancelled),
    ("fully refunded", OrderStatus::Cancelled),
];

/// Etsy receipts report shipping separately from status; a paid receipt
/// that has shipped is treated as shipped.
pub fn map_status(native: &str, is_shipped: bool) -> Result<OrderStatus, ConnectorError> {
    let status = lookup_status(STATUS_TABLE, StorePlatform::Etsy, native)?;
    Ok(match status {
        OrderStatus::Processing if is_shipped => OrderStatus::Shipped,
        other => other,
    })
}

pub struct EtsyConnector {
    client: Client,
    base_url: String,
    shop_id: String,
    api_key: String,
    access_token: String,
}

impl EtsyConnector {
    pub fn new(store: &Store, client: Client) -> Result<Self, ConnectorError> {
        let shop_id = required(&store.shop_id, "an Etsy shop id")?;
        let access_token = required(&store.api_secret, "an Etsy OAuth access token")?;
        if store.api_key.is_empty() {
            return Err(ConnectorError::Config(
                "store is missing an Etsy API keystring".to_string(),
            ));
        }
        let base_url = if store.base_url.trim().is_empty() {
            DEFAULT_BASE_URL.to_string()
        } else {
            store.base_url.trim_end_matches('/').to_string()
        };
        Ok(Self {
            client,
            base_url,
            shop_id: shop_id.to_string(),
            api_key: store.api_key.clone(),
            access_token: access_token.to_string(),
        })
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.client
            .get(format!(
                "{}/v3/application/shops/{}{}",
                self.base_url, self.shop_id, path
            ))
            .header("x-api-key", &self.api_key)
            .bearer_auth(&self.access_token)
    }

    /// Offset pagination until `count` rows have been read.
    fn fetch_all<T: DeserializeOwned>(
        &self,
        path: &str,
        extra: &[(&str, String)],
    ) -> Result<Vec<T>, ConnectorError> {
        let mut all = Vec::new();
        loop {
            let mut query: Vec<(&str, String)> = vec![
                ("limit", PAGE_LIMIT.to_string()),
                ("offset", all.len().to_string()),
            ];
            query.extend(extra.iter().cloned());
            let (page, _) = send_json::<Page<T>>(self.get(path).query(&query))?;
            let received = page.results.len();
            all.extend(page.results);
            if received == 0 || all.len() as u64 >= page.count {
                return Ok(all);
            }
        }
    }
}

impl StoreConnector for EtsyConnector {
    fn platform(&self) -> StorePlatform {
        StorePlatform::Etsy
    }

    fn test_connection(&self) -> ConnectionCheck {
        match send_json::<EtsyShop>(self.get("")) {
            Ok((shop, _)) => ConnectionCheck {
                ok: true,
                message: format!("connected to Etsy shop '{}'", shop.shop_name),
            },
            Err(e) => ConnectionCheck {
                ok: false,
                message: e.to_string(),
            },
        }
    }

    fn fetch_orders(&self, since: Option<DateTime<Utc>>) -> Result<FetchedOrders, ConnectorError> {
        let extra: Vec<(&str, String)> = since
            .map(|s| vec![("min_created", s.timestamp().to_string())])
            .unwrap_or_default();
        let mut fetched = FetchedOrders::default();
        for raw in self.fetch_all::<EtsyReceipt>("/receipts", &extra)? {
            fetched.push(raw.receipt_id.to_string(), raw.into_canonical());
        }
        Ok(fetched)
    }

    fn fetch_products(&self) -> Result<Vec<CanonicalProduct>, ConnectorError> {
        self.fetch_all::<EtsyListing>("/listings/active", &[])?
            .into_iter()
            .map(EtsyListing::into_canonical)
            .collect()
    }
}

// ── Wire format ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct Page<T> {
    count: u64,
    results: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct EtsyShop {
    shop_name: String,
}

#[derive(Debug, Deserialize)]
struct Money {
    amount: i64,
    divisor: i64,
    currency_code: String,
}

impl Money {
    fn to_decimal(&self) -> Result<BigDecimal, ConnectorError> {
        if self.divisor <= 0 {
            return Err(ConnectorError::Decode(format!(
                "money divisor must be positive, got {}",
                self.divisor
            )));
        }
        Ok(BigDecimal::from(self.amount) / BigDecimal::from(self.divisor))
    }
}

#[derive(Debug, Deserialize)]
struct EtsyReceipt {
    receipt_id: u64,
    status: String,
    #[serde(default)]
    is_shipped: bool,
    #[serde(default)]
    is_paid: bool,
    name: Option<String>,
    buyer_email: Option<String>,
    first_line: Option<String>,
    second_line: Option<String>,
    city: Option<String>,
    state: Option<String>,
    zip: Option<String>,
    country_iso: Option<String>,
    message_from_buyer: Option<String>,
    create_timestamp: i64,
    grandtotal: Money,
    #[serde(default)]
    transactions: Vec<EtsyTransaction>,
}

#[derive(Debug, Deserialize)]
struct EtsyTransaction {
    transaction_id: u64,
    listing_id: Option<u64>,
    title: String,
    sku: Option<String>,
    quantity: i32,
    price: Money,
    #[serde(default)]
    variations: Vec<EtsyVariation>,
}

#[derive(Debug, Deserialize)]
struct EtsyVariation {
    formatted_name: String,
    formatted_value: String,
}

#[derive(Debug, Deserialize)]
struct EtsyListing {
    listing_id: u64,
    title: String,
    #[serde(default)]
    skus: Vec<String>,
    price: Option<Money>,
}

impl EtsyReceipt {
    fn into_canonical(self) -> Result<CanonicalOrder, ConnectorError> {
        let status = map_status(&self.status, self.is_shipped)?;
        let order_date = Utc
            .timestamp_opt(self.create_timestamp, 0)
            .single()
            .ok_or_else(|| {
                ConnectorError::Decode(format!(
                    "invalid create_timestamp {}",
                    self.create_timestamp
                ))
            })?;
        let total_amount = self.grandtotal.to_decimal()?;
        let items = self
            .transactions
            .into_iter()
            .map(EtsyTransaction::into_canonical)
            .collect::<Result<Vec<_>, _>>()?;
        let has_address = self.first_line.is_some() || self.city.is_some();

        Ok(CanonicalOrder {
            external_order_id: self.receipt_id.to_string(),
            order_number: Some(self.receipt_id.to_string()),
            customer: CustomerContact {
                name: self.name.clone().unwrap_or_default(),
                email: non_empty(self.buyer_email),
                phone: None,
            },
            shipping_address: has_address.then(|| ShippingAddress {
                name: self.name,
                line1: non_empty(self.first_line),
                line2: non_empty(self.second_line),
                city: non_empty(self.city),
                region: non_empty(self.state),
                postal_code: non_empty(self.zip),
                country_code: non_empty(self.country_iso),
            }),
            total_amount,
            currency: self.grandtotal.currency_code,
            status,
            fulfillment_status: Some(if self.is_shipped { "shipped" } else { "unshipped" }.to_string()),
            payment_status: Some(if self.is_paid { "paid" } else { "unpaid" }.to_string()),
            order_date,
            tags: Vec::new(),
            notes: non_empty(self.message_from_buyer),
            items,
        })
    }
}

impl EtsyTransaction {
    fn into_canonical(self) -> Result<CanonicalItem, ConnectorError> {
        let unit_price = self.price.to_decimal()?;
        let total_price = &unit_price * BigDecimal::from(self.quantity);
        Ok(CanonicalItem {
            external_item_id: self.transaction_id.to_string(),
            external_product_id: self.listing_id.map(|id| id.to_string()),
            name: self.title,
            sku: non_empty(self.sku),
            quantity: self.quantity,
            unit_price,
            total_price,
            customization: ItemCustomization {
                variant_title: None,
                attributes: self
                    .variations
                    .into_iter()
                    .map(|v| ItemAttribute {
                        name: v.formatted_name,
                        value: v.formatted_value,
                    })
                    .collect(),
            },
        })
    }
}

impl EtsyListing {
    fn into_canonical(self) -> Result<CanonicalProduct, ConnectorError> {
        let price = match &self.price {
            Some(m) => Some(m.to_decimal()?),
            None => None,
        };
        Ok(CanonicalProduct {
            external_product_id: self.listing_id.to_string(),
            name: self.title,
            sku: self.skus.into_iter().find(|s| !s.trim().is_empty()),
            price,
        })
    }
}
