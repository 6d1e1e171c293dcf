//! Mock warehouse for testing without network calls.

use super::{Warehouse, WarehouseError};
use crate::domain::{MarketId, RawEvent, Wallet};
use crate::oracle::{MarkRow, ResolutionRow, TokenMapping};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Mock warehouse that serves predefined fixture rows.
///
/// `max_wallets_per_query` simulates the empirically observed failure mode
/// of oversized batched lookups, so the coordinator's chunk fallback is
/// testable hermetically. `event_query_count` counts `fetch_events` calls.
#[derive(Debug, Clone, Default)]
pub struct MockWarehouse {
    events: Vec<RawEvent>,
    mappings: Vec<TokenMapping>,
    resolutions: Vec<ResolutionRow>,
    marks: Vec<MarkRow>,
    max_wallets_per_query: Option<usize>,
    event_queries: Arc<AtomicUsize>,
}

impl MockWarehouse {
    /// Create a mock warehouse with no fixture data.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one event row.
    pub fn with_event(mut self, event: RawEvent) -> Self {
        self.events.push(event);
        self
    }

    /// Add multiple event rows.
    pub fn with_events(mut self, events: Vec<RawEvent>) -> Self {
        self.events.extend(events);
        self
    }

    /// Add one token mapping row.
    pub fn with_mapping(mut self, mapping: TokenMapping) -> Self {
        self.mappings.push(mapping);
        self
    }

    /// Add one resolution row.
    pub fn with_resolution(mut self, resolution: ResolutionRow) -> Self {
        self.resolutions.push(resolution);
        self
    }

    /// Add one mark row.
    pub fn with_mark(mut self, mark: MarkRow) -> Self {
        self.marks.push(mark);
        self
    }

    /// Fail any `fetch_events` call naming more than `max` wallets.
    pub fn with_max_wallets_per_query(mut self, max: usize) -> Self {
        self.max_wallets_per_query = Some(max);
        self
    }

    /// How many `fetch_events` calls this mock has served or refused.
    pub fn event_query_count(&self) -> usize {
        self.event_queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Warehouse for MockWarehouse {
    async fn fetch_events(&self, wallets: &[Wallet]) -> Result<Vec<RawEvent>, WarehouseError> {
        self.event_queries.fetch_add(1, Ordering::SeqCst);

        if let Some(max) = self.max_wallets_per_query {
            if wallets.len() > max {
                return Err(WarehouseError::Other(format!(
                    "batched lookup too large: {} wallets (max {})",
                    wallets.len(),
                    max
                )));
            }
        }

        Ok(self
            .events
            .iter()
            .filter(|event| wallets.contains(&event.wallet))
            .cloned()
            .collect())
    }

    async fn fetch_token_map(&self) -> Result<Vec<TokenMapping>, WarehouseError> {
        Ok(self.mappings.clone())
    }

    async fn fetch_resolutions(
        &self,
        markets: &[MarketId],
    ) -> Result<Vec<ResolutionRow>, WarehouseError> {
        Ok(self
            .resolutions
            .iter()
            .filter(|row| markets.contains(&row.market))
            .cloned()
            .collect())
    }

    async fn fetch_marks(&self, markets: &[MarketId]) -> Result<Vec<MarkRow>, WarehouseError> {
        Ok(self
            .marks
            .iter()
            .filter(|row| markets.contains(&row.market))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Decimal, RawKind, TimeMs, TokenId};

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    fn event_for(wallet: &str) -> RawEvent {
        RawEvent {
            event_id: format!("0xtx-{}", wallet),
            wallet: Wallet::new(wallet),
            kind: RawKind::Buy,
            token_id: Some(TokenId::new("11")),
            market_id: None,
            quantity: d("1"),
            price: Some(d("0.5")),
            role: Some(crate::domain::TradeRole::Taker),
            sold_indices: None,
            occurred_at: TimeMs::new(1000),
        }
    }

    #[test]
    fn test_fetch_events_filters_by_wallet() {
        let warehouse = MockWarehouse::new()
            .with_event(event_for("0xa"))
            .with_event(event_for("0xb"));

        let events = tokio_test::block_on(
            warehouse.fetch_events(&[Wallet::new("0xa")]),
        )
        .unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].wallet, Wallet::new("0xa"));
        assert_eq!(warehouse.event_query_count(), 1);
    }

    #[test]
    fn test_oversized_query_fails_when_capped() {
        let warehouse = MockWarehouse::new().with_max_wallets_per_query(1);
        let result = tokio_test::block_on(
            warehouse.fetch_events(&[Wallet::new("0xa"), Wallet::new("0xb")]),
        );
        assert!(matches!(result, Err(WarehouseError::Other(_))));
        assert_eq!(warehouse.event_query_count(), 1);
    }

    #[test]
    fn test_fetch_resolutions_filters_by_market() {
        let warehouse = MockWarehouse::new()
            .with_resolution(ResolutionRow {
                market: MarketId::new("0xa"),
                payouts: vec![d("1"), d("0")],
            })
            .with_resolution(ResolutionRow {
                market: MarketId::new("0xb"),
                payouts: vec![d("0"), d("1")],
            });

        let rows = tokio_test::block_on(
            warehouse.fetch_resolutions(&[MarketId::new("0xb")]),
        )
        .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].market, MarketId::new("0xb"));
    }
}
