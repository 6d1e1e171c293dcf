//! HTTP warehouse gateway client.
//!
//! Speaks the warehouse's typed-query endpoint: one POST per query kind,
//! JSON array responses. Transient failures (429, 5xx, network) retry with
//! exponential backoff; client errors fail permanently. Individual rows
//! that fail to parse are logged and skipped rather than failing the fetch.

use super::{Warehouse, WarehouseError};
use crate::domain::{Decimal, MarketId, RawEvent, RawKind, TimeMs, TokenId, TradeRole, Wallet};
use crate::oracle::{MarkRow, ResolutionRow, TokenMapping};
use async_trait::async_trait;
use backoff::future::retry;
use backoff::ExponentialBackoff;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

/// Warehouse client over the HTTP query gateway.
#[derive(Debug, Clone)]
pub struct HttpWarehouse {
    client: Client,
    base_url: String,
}

impl HttpWarehouse {
    /// Create a new client against the given gateway base URL.
    pub fn new(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
        }
    }

    async fn post_query(
        &self,
        payload: serde_json::Value,
    ) -> Result<serde_json::Value, WarehouseError> {
        let url = format!("{}/query", self.base_url);
        let backoff = ExponentialBackoff {
            max_elapsed_time: Some(Duration::from_secs(30)),
            ..Default::default()
        };

        retry(backoff, || async {
            let response = self
                .client
                .post(&url)
                .json(&payload)
                .send()
                .await
                .map_err(|e| backoff::Error::transient(WarehouseError::Network(e.to_string())))?;

            let status = response.status();
            if status == 429 {
                return Err(backoff::Error::transient(WarehouseError::RateLimited));
            }
            if status.is_server_error() {
                return Err(backoff::Error::transient(WarehouseError::Http {
                    status: status.as_u16(),
                    message: "server error".to_string(),
                }));
            }
            if !status.is_success() {
                return Err(backoff::Error::permanent(WarehouseError::Http {
                    status: status.as_u16(),
                    message: "client error".to_string(),
                }));
            }

            response
                .json::<serde_json::Value>()
                .await
                .map_err(|e| backoff::Error::permanent(WarehouseError::Parse(e.to_string())))
        })
        .await
    }

    fn parse_rows<T: DeserializeOwned>(value: serde_json::Value) -> Result<Vec<T>, WarehouseError> {
        let rows = value
            .as_array()
            .ok_or_else(|| WarehouseError::Parse("expected array response".to_string()))?;

        let mut parsed = Vec::with_capacity(rows.len());
        for row in rows {
            match serde_json::from_value::<T>(row.clone()) {
                Ok(item) => parsed.push(item),
                Err(e) => warn!("failed to parse warehouse row: {}", e),
            }
        }
        Ok(parsed)
    }
}

#[async_trait]
impl Warehouse for HttpWarehouse {
    async fn fetch_events(&self, wallets: &[Wallet]) -> Result<Vec<RawEvent>, WarehouseError> {
        debug!("fetching events for {} wallets", wallets.len());

        let payload = serde_json::json!({
            "type": "events",
            "wallets": wallets,
        });
        let response = self.post_query(payload).await?;
        let rows: Vec<EventRow> = Self::parse_rows(response)?;

        let mut events = Vec::with_capacity(rows.len());
        for row in rows {
            match row.into_raw() {
                Ok(event) => events.push(event),
                Err(e) => warn!("failed to parse event row: {}", e),
            }
        }
        Ok(events)
    }

    async fn fetch_token_map(&self) -> Result<Vec<TokenMapping>, WarehouseError> {
        debug!("fetching token mapping table");

        let payload = serde_json::json!({ "type": "token_map" });
        let response = self.post_query(payload).await?;
        Self::parse_rows(response)
    }

    async fn fetch_resolutions(
        &self,
        markets: &[MarketId],
    ) -> Result<Vec<ResolutionRow>, WarehouseError> {
        debug!("fetching resolutions for {} markets", markets.len());

        let payload = serde_json::json!({
            "type": "resolutions",
            "markets": markets,
        });
        let response = self.post_query(payload).await?;
        Self::parse_rows(response)
    }

    async fn fetch_marks(&self, markets: &[MarketId]) -> Result<Vec<MarkRow>, WarehouseError> {
        debug!("fetching marks for {} markets", markets.len());

        let payload = serde_json::json!({
            "type": "marks",
            "markets": markets,
        });
        let response = self.post_query(payload).await?;
        Self::parse_rows(response)
    }
}

/// Event row as the gateway serves it: timestamps as RFC3339 strings.
#[derive(Debug, Clone, Deserialize)]
struct EventRow {
    event_id: String,
    wallet: String,
    kind: RawKind,
    #[serde(default)]
    token_id: Option<String>,
    #[serde(default)]
    market_id: Option<String>,
    quantity: Decimal,
    #[serde(default)]
    price: Option<Decimal>,
    #[serde(default)]
    role: Option<TradeRole>,
    #[serde(default)]
    sold_indices: Option<Vec<u32>>,
    occurred_at: String,
}

impl EventRow {
    fn into_raw(self) -> Result<RawEvent, WarehouseError> {
        let occurred_at = chrono::DateTime::parse_from_rfc3339(&self.occurred_at)
            .map_err(|e| {
                WarehouseError::Parse(format!("invalid timestamp {:?}: {}", self.occurred_at, e))
            })?
            .timestamp_millis();

        Ok(RawEvent {
            event_id: self.event_id,
            wallet: Wallet::new(self.wallet),
            kind: self.kind,
            token_id: self.token_id.map(TokenId::new),
            market_id: self.market_id.map(MarketId::new),
            quantity: self.quantity,
            price: self.price,
            role: self.role,
            sold_indices: self.sold_indices,
            occurred_at: TimeMs::new(occurred_at),
        })
    }
}
