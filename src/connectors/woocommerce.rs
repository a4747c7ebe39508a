use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use super::{
    lookup_status, non_empty, parse_decimal, required, send_json, ConnectorError, FetchedOrders,
    StoreConnector,
};
use crate::domain::order::OrderStatus;
use crate::domain::store::{
    CanonicalItem, CanonicalOrder, CanonicalProduct, ConnectionCheck, CustomerContact,
    ItemAttribute, ItemCustomization, ShippingAddress, Store, StorePlatform,
};

const PER_PAGE: usize = 100;

const STATUS_TABLE: &[(&str, OrderStatus)] = &[
    ("pending", OrderStatus::Pending),
    ("on-hold", OrderStatus::Pending),
    ("checkout-draft", OrderStatus::Pending),
    ("processing", OrderStatus::Processing),
    ("completed", OrderStatus::Fulfilled),
    ("cancelled", OrderStatus::Cancelled),
    ("refunded", OrderStatus::Cancelled),
    ("failed", OrderStatus::Cancelled),
    ("trash", OrderStatus::Cancelled),
];

pub fn map_status(native: &str) -> Result<OrderStatus, ConnectorError> {
    lookup_status(STATUS_TABLE, StorePlatform::WooCommerce, native)
}

pub struct WooCommerceConnector {
    client: Client,
    base_url: String,
    consumer_key: String,
    consumer_secret: String,
}

impl WooCommerceConnector {
    pub fn new(store: &Store, client: Client) -> Result<Self, ConnectorError> {
        if store.api_key.is_empty() {
            return Err(ConnectorError::Config(
                "store is missing a WooCommerce consumer key".to_string(),
            ));
        }
        let consumer_secret = required(&store.api_secret, "a WooCommerce consumer secret")?;
        Ok(Self {
            client,
            base_url: store.base_url.trim_end_matches('/').to_string(),
            consumer_key: store.api_key.clone(),
            consumer_secret: consumer_secret.to_string(),
        })
    }

    fn get(&self, resource: &str) -> reqwest::blocking::RequestBuilder {
        self.client
            .get(format!("{}/wp-json/wc/v3/{}", self.base_url, resource))
            .basic_auth(&self.consumer_key, Some(&self.consumer_secret))
    }

    /// Walk `page=1..` until a short page comes back.
    fn fetch_all<T: DeserializeOwned>(
        &self,
        resource: &str,
        extra: &[(&str, String)],
    ) -> Result<Vec<T>, ConnectorError> {
        let mut all = Vec::new();
        let mut page = 1usize;
        loop {
            let mut query: Vec<(&str, String)> = vec![
                ("per_page", PER_PAGE.to_string()),
                ("page", page.to_string()),
            ];
            query.extend(extra.iter().cloned());
            let (batch, _) = send_json::<Vec<T>>(self.get(resource).query(&query))?;
            let len = batch.len();
            all.extend(batch);
            if len < PER_PAGE {
                return Ok(all);
            }
            page += 1;
        }
    }
}

impl StoreConnector for WooCommerceConnector {
    fn platform(&self) -> StorePlatform {
        StorePlatform::WooCommerce
    }

    fn test_connection(&self) -> ConnectionCheck {
        match send_json::<Value>(self.get("system_status")) {
            Ok((body, _)) => {
                let version = body["environment"]["version"]
                    .as_str()
                    .unwrap_or("unknown")
                    .to_string();
                ConnectionCheck {
                    ok: true,
                    message: format!("connected to WooCommerce {}", version),
                }
            }
            Err(e) => ConnectionCheck {
                ok: false,
                message: e.to_string(),
            },
        }
    }

    fn fetch_orders(&self, since: Option<DateTime<Utc>>) -> Result<FetchedOrders, ConnectorError> {
        let extra: Vec<(&str, String)> = since
            .map(|s| vec![("after", s.to_rfc3339_opts(SecondsFormat::Secs, true))])
            .unwrap_or_default();
        let mut fetched = FetchedOrders::default();
        for raw in self.fetch_all::<WooOrder>("orders", &extra)? {
            fetched.push(raw.id.to_string(), raw.into_canonical());
        }
        Ok(fetched)
    }

    fn fetch_products(&self) -> Result<Vec<CanonicalProduct>, ConnectorError> {
        self.fetch_all::<WooProduct>("products", &[])?
            .into_iter()
            .map(WooProduct::into_canonical)
            .collect()
    }
}

// ── Wire format ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct WooOrder {
    id: u64,
    number: Option<String>,
    status: String,
    currency: String,
    total: String,
    date_created_gmt: String,
    date_paid_gmt: Option<String>,
    #[serde(default)]
    customer_note: String,
    billing: WooBilling,
    shipping: Option<WooShipping>,
    #[serde(default)]
    line_items: Vec<WooLineItem>,
}

#[derive(Debug, Deserialize)]
struct WooBilling {
    #[serde(default)]
    first_name: String,
    #[serde(default)]
    last_name: String,
    email: Option<String>,
    phone: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WooShipping {
    #[serde(default)]
    first_name: String,
    #[serde(default)]
    last_name: String,
    address_1: Option<String>,
    address_2: Option<String>,
    city: Option<String>,
    state: Option<String>,
    postcode: Option<String>,
    country: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WooLineItem {
    id: u64,
    product_id: Option<u64>,
    name: String,
    sku: Option<String>,
    quantity: i32,
    total: String,
    #[serde(default)]
    meta_data: Vec<WooMeta>,
}

#[derive(Debug, Deserialize)]
struct WooMeta {
    key: String,
    display_key: Option<String>,
    display_value: Option<Value>,
    value: Value,
}

#[derive(Debug, Deserialize)]
struct WooProduct {
    id: u64,
    name: String,
    sku: Option<String>,
    price: Option<String>,
}

fn parse_gmt(field: &str, raw: &str) -> Result<DateTime<Utc>, ConnectorError> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
        .map(|naive| naive.and_utc())
        .map_err(|e| ConnectorError::Decode(format!("invalid {} '{}': {}", field, raw, e)))
}

fn value_text(v: Value) -> String {
    match v {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

fn full_name(first: &str, last: &str) -> String {
    format!("{} {}", first.trim(), last.trim()).trim().to_string()
}

impl WooOrder {
    fn into_canonical(self) -> Result<CanonicalOrder, ConnectorError> {
        let status = map_status(&self.status)?;
        let items = self
            .line_items
            .into_iter()
            .map(WooLineItem::into_canonical)
            .collect::<Result<Vec<_>, _>>()?;
        let payment_status = if self.date_paid_gmt.is_some() {
            "paid"
        } else {
            "unpaid"
        };

        Ok(CanonicalOrder {
            external_order_id: self.id.to_string(),
            order_number: non_empty(self.number),
            customer: CustomerContact {
                name: full_name(&self.billing.first_name, &self.billing.last_name),
                email: non_empty(self.billing.email),
                phone: non_empty(self.billing.phone),
            },
            shipping_address: self.shipping.map(|s| ShippingAddress {
                name: non_empty(Some(full_name(&s.first_name, &s.last_name))),
                line1: non_empty(s.address_1),
                line2: non_empty(s.address_2),
                city: non_empty(s.city),
                region: non_empty(s.state),
                postal_code: non_empty(s.postcode),
                country_code: non_empty(s.country),
            }),
            total_amount: parse_decimal("total", &self.total)?,
            currency: self.currency,
            status,
            fulfillment_status: None,
            payment_status: Some(payment_status.to_string()),
            order_date: parse_gmt("date_created_gmt", &self.date_created_gmt)?,
            tags: Vec::new(),
            notes: non_empty(Some(self.customer_note)),
            items,
        })
    }
}

impl WooLineItem {
    fn into_canonical(self) -> Result<CanonicalItem, ConnectorError> {
        let total_price = parse_decimal("line item total", &self.total)?;
        if self.quantity <= 0 {
            return Err(ConnectorError::Decode(format!(
                "line item {} has quantity {}",
                self.id, self.quantity
            )));
        }
        let unit_price = &total_price / BigDecimal::from(self.quantity);
        Ok(CanonicalItem {
            external_item_id: self.id.to_string(),
            external_product_id: self.product_id.filter(|id| *id != 0).map(|id| id.to_string()),
            name: self.name,
            sku: non_empty(self.sku),
            quantity: self.quantity,
            unit_price,
            total_price,
            customization: ItemCustomization {
                variant_title: None,
                attributes: self
                    .meta_data
                    .into_iter()
                    // Keys starting with `_` are WooCommerce internals.
                    .filter(|m| !m.key.starts_with('_'))
                    .map(|m| ItemAttribute {
                        name: m.display_key.unwrap_or(m.key),
                        value: value_text(m.display_value.unwrap_or(m.value)),
                    })
                    .collect(),
            },
        })
    }
}

impl WooProduct {
    fn into_canonical(self) -> Result<CanonicalProduct, ConnectorError> {
        let price = match non_empty(self.price) {
            Some(p) => Some(parse_decimal("price", &p)?),
            None => None,
        };
        Ok(CanonicalProduct {
            external_product_id: self.id.to_string(),
            name: self.name,
            sku: non_empty(self.sku),
            price,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;
    use std::time::Duration;

    use httpmock::prelude::*;
    use serde_json::json;
    use uuid::Uuid;

    use super::*;
    use crate::connectors::http_client;

    fn store(base_url: &str) -> Store {
        Store {
            id: Uuid::new_v4(),
            name: "Woo".to_string(),
            platform: StorePlatform::WooCommerce,
            base_url: base_url.to_string(),
            api_key: "ck_test".to_string(),
            api_secret: Some("cs_test".to_string()),
            shop_id: None,
            is_active: true,
            last_sync_at: None,
        }
    }

    fn connector(server: &MockServer) -> WooCommerceConnector {
        let client = http_client(Duration::from_secs(5)).unwrap();
        WooCommerceConnector::new(&store(&server.base_url()), client).unwrap()
    }

    fn order_json(id: u64, status: &str) -> Value {
        json!({
            "id": id,
            "number": id.to_string(),
            "status": status,
            "currency": "EUR",
            "total": "40.00",
            "date_created_gmt": "2024-03-01T09:00:00",
            "date_paid_gmt": "2024-03-01T09:05:00",
            "customer_note": "Please gift wrap",
            "billing": { "first_name": "Grace", "last_name": "Hopper", "email": "grace@example.com", "phone": "" },
            "shipping": { "first_name": "Grace", "last_name": "Hopper", "address_1": "2 Compiler St", "address_2": "",
                          "city": "Arlington", "state": "VA", "postcode": "22201", "country": "US" },
            "line_items": [{
                "id": 7, "product_id": 99, "name": "Mug", "sku": "MUG-1", "quantity": 4, "total": "40.00",
                "meta_data": [
                    { "key": "_reduced_stock", "value": "4" },
                    { "key": "pa_color", "display_key": "Color", "display_value": "Blue", "value": "blue" }
                ]
            }]
        })
    }

    #[test]
    fn status_table_covers_woocommerce_vocabulary() {
        assert_eq!(map_status("on-hold").unwrap(), OrderStatus::Pending);
        assert_eq!(map_status("processing").unwrap(), OrderStatus::Processing);
        assert_eq!(map_status("completed").unwrap(), OrderStatus::Fulfilled);
        assert_eq!(map_status("refunded").unwrap(), OrderStatus::Cancelled);
        assert!(map_status("shipped-to-mars").is_err());
    }

    #[test]
    fn fetch_orders_maps_line_items_and_meta() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/wp-json/wc/v3/orders")
                .query_param("page", "1")
                .query_param("per_page", "100");
            then.status(200).json_body(json!([order_json(55, "processing")]));
        });

        let fetched = connector(&server).fetch_orders(None).unwrap();

        mock.assert();
        let o = &fetched.orders[0];
        assert_eq!(o.external_order_id, "55");
        assert_eq!(o.status, OrderStatus::Processing);
        assert_eq!(o.currency, "EUR");
        assert_eq!(o.customer.name, "Grace Hopper");
        assert_eq!(o.customer.phone, None);
        assert_eq!(o.payment_status.as_deref(), Some("paid"));
        assert_eq!(o.notes.as_deref(), Some("Please gift wrap"));
        assert_eq!(o.order_date.to_rfc3339(), "2024-03-01T09:00:00+00:00");
        let item = &o.items[0];
        assert_eq!(item.unit_price, BigDecimal::from_str("10").unwrap());
        assert_eq!(item.external_product_id.as_deref(), Some("99"));
        assert_eq!(item.customization.attributes.len(), 1);
        assert_eq!(item.customization.attributes[0].name, "Color");
        assert_eq!(item.customization.attributes[0].value, "Blue");
    }

    #[test]
    fn unknown_status_rejects_only_that_order() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/wp-json/wc/v3/orders");
            then.status(200)
                .json_body(json!([order_json(55, "processing"), order_json(56, "wc-custom-hold")]));
        });

        let fetched = connector(&server).fetch_orders(None).unwrap();

        assert_eq!(fetched.orders.len(), 1);
        assert_eq!(fetched.rejected[0].external_id, "56");
    }

    #[test]
    fn pagination_stops_on_short_page() {
        let server = MockServer::start();
        let full_page: Vec<Value> = (1..=100).map(|i| order_json(i, "pending")).collect();
        let page_one = server.mock(|when, then| {
            when.method(GET)
                .path("/wp-json/wc/v3/orders")
                .query_param("page", "1");
            then.status(200).json_body(Value::Array(full_page));
        });
        let page_two = server.mock(|when, then| {
            when.method(GET)
                .path("/wp-json/wc/v3/orders")
                .query_param("page", "2");
            then.status(200).json_body(json!([order_json(101, "pending")]));
        });

        let fetched = connector(&server).fetch_orders(None).unwrap();

        page_one.assert();
        page_two.assert();
        assert_eq!(fetched.orders.len(), 101);
    }

    #[test]
    fn server_errors_are_retryable() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/wp-json/wc/v3/orders");
            then.status(502).body("bad gateway");
        });

        let err = connector(&server).fetch_orders(None).unwrap_err();

        assert!(matches!(err, ConnectorError::Api { status: 502, .. }));
        assert!(err.is_retryable());
    }

    #[test]
    fn missing_secret_is_a_config_error() {
        let mut s = store("https://shop.example.com");
        s.api_secret = None;
        let client = http_client(Duration::from_secs(1)).unwrap();
        assert!(matches!(
            WooCommerceConnector::new(&s, client),
            Err(ConnectorError::Config(_))
        ));
    }
}
