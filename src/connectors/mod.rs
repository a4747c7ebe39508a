//! Storefront connectors.
//!
//! Each supported platform implements [`StoreConnector`], turning the
//! platform's own order and product payloads into the canonical shapes the
//! ingestion service works with. Status vocabularies are mapped through
//! explicit per-platform tables; an unknown native status is a decode error.

pub mod etsy;
pub mod shopify;
pub mod woocommerce;

use std::str::FromStr;
use std::time::Duration;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::domain::errors::DomainError;
use crate::domain::order::OrderStatus;
use crate::domain::store::{
    CanonicalOrder, CanonicalProduct, ConnectionCheck, Store, StorePlatform,
};

pub use etsy::EtsyConnector;
pub use shopify::ShopifyConnector;
pub use woocommerce::WooCommerceConnector;

#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("storefront api error (status {status}): {message}")]
    Api { status: u16, message: String },
    #[error("decode error: {0}")]
    Decode(String),
    #[error("config error: {0}")]
    Config(String),
}

impl ConnectorError {
    /// Whether the caller may reasonably retry the same call later.
    pub fn is_retryable(&self) -> bool {
        match self {
            ConnectorError::Transport(_) => true,
            ConnectorError::Api { status, .. } => *status == 429 || *status >= 500,
            ConnectorError::Auth(_) | ConnectorError::Decode(_) | ConnectorError::Config(_) => {
                false
            }
        }
    }
}

impl From<ConnectorError> for DomainError {
    fn from(e: ConnectorError) -> Self {
        DomainError::ConnectorUnavailable {
            retryable: e.is_retryable(),
            message: e.to_string(),
        }
    }
}

/// An order the platform returned that does not map onto the canonical shape.
#[derive(Debug)]
pub struct RejectedOrder {
    pub external_id: String,
    pub error: ConnectorError,
}

/// One fetch pass. Decode problems are kept per order; only transport, auth
/// and paging failures fail the fetch as a whole.
#[derive(Debug, Default)]
pub struct FetchedOrders {
    pub orders: Vec<CanonicalOrder>,
    pub rejected: Vec<RejectedOrder>,
}

impl FetchedOrders {
    pub(crate) fn push(
        &mut self,
        external_id: String,
        decoded: Result<CanonicalOrder, ConnectorError>,
    ) {
        match decoded {
            Ok(order) => self.orders.push(order),
            Err(error) => self.rejected.push(RejectedOrder { external_id, error }),
        }
    }
}

/// Capability contract every storefront integration satisfies.
pub trait StoreConnector: Send + Sync {
    fn platform(&self) -> StorePlatform;

    /// Probe credentials and reachability. Never fails; problems are
    /// reported through `ConnectionCheck::ok`.
    fn test_connection(&self) -> ConnectionCheck;

    /// Orders created since `since` (all orders when `None`).
    fn fetch_orders(&self, since: Option<DateTime<Utc>>) -> Result<FetchedOrders, ConnectorError>;

    fn fetch_products(&self) -> Result<Vec<CanonicalProduct>, ConnectorError>;
}

/// Builds the connector for a given store.
pub trait ConnectorFactory: Send + Sync + 'static {
    fn connector_for(&self, store: &Store) -> Result<Box<dyn StoreConnector>, ConnectorError>;
}

/// Production factory: HTTP connectors sharing one bounded timeout.
#[derive(Debug, Clone)]
pub struct HttpConnectorFactory {
    timeout: Duration,
}

impl HttpConnectorFactory {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl ConnectorFactory for HttpConnectorFactory {
    fn connector_for(&self, store: &Store) -> Result<Box<dyn StoreConnector>, ConnectorError> {
        let client = http_client(self.timeout)?;
        Ok(match store.platform {
            StorePlatform::Shopify => Box::new(ShopifyConnector::new(store, client)?),
            StorePlatform::WooCommerce => Box::new(WooCommerceConnector::new(store, client)?),
            StorePlatform::Etsy => Box::new(EtsyConnector::new(store, client)?),
        })
    }
}

// ── Shared helpers ───────────────────────────────────────────────────────────

pub(crate) fn http_client(timeout: Duration) -> Result<Client, ConnectorError> {
    Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout)
        .build()
        .map_err(|e| ConnectorError::Config(format!("failed to build http client: {}", e)))
}

/// Send a request and decode a JSON body, mapping HTTP failures to
/// connector errors. Response headers are returned for pagination.
pub(crate) fn send_json<T: DeserializeOwned>(
    request: RequestBuilder,
) -> Result<(T, HeaderMap), ConnectorError> {
    let response = request.send().map_err(transport_error)?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().unwrap_or_default();
        let message = truncate(&body, 300);
        return Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ConnectorError::Auth(message),
            _ => ConnectorError::Api {
                status: status.as_u16(),
                message,
            },
        });
    }
    let headers = response.headers().clone();
    let body = response
        .json::<T>()
        .map_err(|e| ConnectorError::Decode(e.to_string()))?;
    Ok((body, headers))
}

fn transport_error(e: reqwest::Error) -> ConnectorError {
    if e.is_timeout() {
        ConnectorError::Transport(format!("request timed out: {}", e))
    } else {
        ConnectorError::Transport(e.to_string())
    }
}

fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}…", &s[..idx]),
        None => s.to_string(),
    }
}

pub(crate) fn parse_decimal(field: &str, raw: &str) -> Result<BigDecimal, ConnectorError> {
    BigDecimal::from_str(raw.trim())
        .map_err(|e| ConnectorError::Decode(format!("invalid {} '{}': {}", field, raw, e)))
}

/// Look a native status up in a platform table (case-insensitive).
pub(crate) fn lookup_status(
    table: &[(&str, OrderStatus)],
    platform: StorePlatform,
    native: &str,
) -> Result<OrderStatus, ConnectorError> {
    let key = native.trim().to_ascii_lowercase();
    table
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, status)| *status)
        .ok_or_else(|| {
            ConnectorError::Decode(format!("unmapped {} order status '{}'", platform, native))
        })
}

pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

pub(crate) fn required<'a>(value: &'a Option<String>, what: &str) -> Result<&'a str, ConnectorError> {
    value
        .as_deref()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ConnectorError::Config(format!("store is missing {}", what)))
}
