//! Warehouse abstraction for fetching events, token mappings, resolutions,
//! and mark prices from the external event store.

use crate::domain::{MarketId, RawEvent, Wallet};
use crate::oracle::{MarkRow, ResolutionRow, TokenMapping};
use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

pub mod http;
pub mod mock;

pub use http::HttpWarehouse;
pub use mock::MockWarehouse;

/// Read-only access to the event warehouse.
///
/// Implementations must handle retry/backoff internally; batch-shape
/// concerns (chunking oversized lookups) belong to the coordinator. All
/// methods take the full identifier sets so a batch run costs a small
/// constant number of round-trips rather than one per wallet.
#[async_trait]
pub trait Warehouse: Send + Sync + fmt::Debug {
    /// Fetch all events touching any of the given wallets.
    ///
    /// Rows may arrive unordered and duplicated; normalization owns both
    /// concerns. An empty result for a wallet is not an error.
    async fn fetch_events(&self, wallets: &[Wallet]) -> Result<Vec<RawEvent>, WarehouseError>;

    /// Fetch the canonical token mapping table.
    async fn fetch_token_map(&self) -> Result<Vec<TokenMapping>, WarehouseError>;

    /// Fetch payout vectors for the given markets. Markets without a
    /// terminal resolution are simply absent from the result.
    async fn fetch_resolutions(
        &self,
        markets: &[MarketId],
    ) -> Result<Vec<ResolutionRow>, WarehouseError>;

    /// Fetch current mark prices for the given markets' outcomes. Only
    /// consulted when the Full reporting policy is active.
    async fn fetch_marks(&self, markets: &[MarketId]) -> Result<Vec<MarkRow>, WarehouseError>;
}

/// Error type for warehouse operations.
#[derive(Debug, Clone, Error)]
pub enum WarehouseError {
    /// Network error (connection timeout, DNS failure).
    #[error("network error: {0}")]
    Network(String),
    /// HTTP error (rate limit, server error).
    #[error("http error {status}: {message}")]
    Http { status: u16, message: String },
    /// Invalid JSON or malformed response.
    #[error("parse error: {0}")]
    Parse(String),
    /// Rate limit exceeded after backoff gave up.
    #[error("rate limited")]
    RateLimited,
    /// Other error.
    #[error("{0}")]
    Other(String),
}
