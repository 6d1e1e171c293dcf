//! Batch preload coordinator.
//!
//! Fetches everything a batch of wallets needs in a small constant number
//! of warehouse round-trips, then fans per-wallet replay out onto tokio
//! tasks over the shared read-only caches. Pure performance/isolation
//! plumbing: the output must be byte-identical to fetching and replaying
//! one wallet at a time, which the parity test enforces.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use crate::datasource::{Warehouse, WarehouseError};
use crate::domain::{Event, MarketId, RawEvent, Wallet};
use crate::engine::{
    replay_normalized, Diagnostics, EngineOptions, Normalizer, Report, ReportingPolicy,
};
use crate::oracle::{MarkBook, MarkRow, ResolutionCache, ResolutionRow, TokenRegistry};

const DEFAULT_MAX_CHUNK: usize = 50;

/// Coordinates one batch run over a set of wallets.
pub struct BatchCoordinator {
    warehouse: Arc<dyn Warehouse>,
    options: EngineOptions,
    max_chunk: usize,
}

impl BatchCoordinator {
    pub fn new(warehouse: Arc<dyn Warehouse>, options: EngineOptions) -> Self {
        Self {
            warehouse,
            options,
            max_chunk: DEFAULT_MAX_CHUNK,
        }
    }

    /// Override the initial chunk size for batched lookups.
    pub fn with_max_chunk(mut self, max_chunk: usize) -> Self {
        self.max_chunk = max_chunk.max(1);
        self
    }

    /// Run the batch: preload, replay every wallet, return reports sorted
    /// by wallet.
    ///
    /// All preloads complete before any wallet's replay begins; replay is a
    /// pure function of (normalized events, caches) with no partial-result
    /// mode. Batch-level fetch failure aborts the run after the chunk
    /// fallback is exhausted; the caller owns retries.
    pub async fn run(&self, wallets: &[Wallet]) -> Result<Vec<Report>, BatchError> {
        let wallets: Vec<Wallet> = wallets
            .iter()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let (mappings, raw_events) = tokio::try_join!(
            async {
                self.warehouse
                    .fetch_token_map()
                    .await
                    .map_err(BatchError::from)
            },
            self.fetch_events_chunked(&wallets)
        )?;
        let registry = TokenRegistry::from_mappings(mappings);

        let mut by_wallet: HashMap<Wallet, Vec<RawEvent>> = HashMap::new();
        for event in raw_events {
            by_wallet.entry(event.wallet.clone()).or_default().push(event);
        }

        // Normalize before the resolution fetch so the market union covers
        // exactly what replay will touch.
        let normalizer = Normalizer::new(&registry, self.options.dedup);
        let mut normalized: Vec<(Wallet, Vec<Event>, Diagnostics)> =
            Vec::with_capacity(wallets.len());
        let mut touched: BTreeSet<MarketId> = BTreeSet::new();
        for wallet in &wallets {
            let raws = by_wallet.remove(wallet).unwrap_or_default();
            let (events, diagnostics) = normalizer.normalize(wallet, raws);
            for event in &events {
                touched.insert(event.action.market().clone());
            }
            normalized.push((wallet.clone(), events, diagnostics));
        }
        let markets: Vec<MarketId> = touched.into_iter().collect();

        let (resolution_rows, mark_rows) = if self.options.policy == ReportingPolicy::Full {
            tokio::try_join!(
                self.fetch_resolutions_chunked(&markets),
                self.fetch_marks_chunked(&markets)
            )?
        } else {
            (self.fetch_resolutions_chunked(&markets).await?, Vec::new())
        };
        let resolutions = Arc::new(ResolutionCache::from_rows(resolution_rows));
        let marks = Arc::new(MarkBook::from_rows(mark_rows));

        info!(
            "replaying {} wallets across {} touched markets",
            normalized.len(),
            markets.len()
        );

        // Wallets share no mutable state; fan out one task per wallet.
        let mut handles = Vec::with_capacity(normalized.len());
        for (wallet, events, diagnostics) in normalized {
            let resolutions = Arc::clone(&resolutions);
            let marks = Arc::clone(&marks);
            let policy = self.options.policy;
            handles.push(tokio::spawn(async move {
                replay_normalized(wallet, &events, diagnostics, &resolutions, &marks, policy)
            }));
        }

        let mut reports = Vec::with_capacity(handles.len());
        for joined in futures::future::join_all(handles).await {
            reports.push(joined.map_err(|e| BatchError::Replay(e.to_string()))?);
        }
        reports.sort_by(|a, b| a.wallet.cmp(&b.wallet));
        Ok(reports)
    }

    /// Fetch events for all wallets, halving the chunk on failure.
    ///
    /// Oversized batched lookups are observed to fail in the wild; a failed
    /// chunk is split and retried down to single-wallet lookups before the
    /// batch gives up.
    async fn fetch_events_chunked(&self, wallets: &[Wallet]) -> Result<Vec<RawEvent>, BatchError> {
        let mut results = Vec::new();
        let mut pending: Vec<Vec<Wallet>> = wallets
            .chunks(self.max_chunk)
            .map(|chunk| chunk.to_vec())
            .collect();

        while let Some(chunk) = pending.pop() {
            match self.warehouse.fetch_events(&chunk).await {
                Ok(mut rows) => results.append(&mut rows),
                Err(err) if chunk.len() > 1 => {
                    warn!(
                        "events lookup failed for {} wallets, halving chunk: {}",
                        chunk.len(),
                        err
                    );
                    let (left, right) = chunk.split_at(chunk.len() / 2);
                    pending.push(right.to_vec());
                    pending.push(left.to_vec());
                }
                Err(err) => return Err(BatchError::Warehouse(err)),
            }
        }
        Ok(results)
    }

    async fn fetch_resolutions_chunked(
        &self,
        markets: &[MarketId],
    ) -> Result<Vec<ResolutionRow>, BatchError> {
        let mut results = Vec::new();
        let mut pending: Vec<Vec<MarketId>> = markets
            .chunks(self.max_chunk)
            .map(|chunk| chunk.to_vec())
            .collect();

        while let Some(chunk) = pending.pop() {
            match self.warehouse.fetch_resolutions(&chunk).await {
                Ok(mut rows) => results.append(&mut rows),
                Err(err) if chunk.len() > 1 => {
                    warn!(
                        "resolutions lookup failed for {} markets, halving chunk: {}",
                        chunk.len(),
                        err
                    );
                    let (left, right) = chunk.split_at(chunk.len() / 2);
                    pending.push(right.to_vec());
                    pending.push(left.to_vec());
                }
                Err(err) => return Err(BatchError::Warehouse(err)),
            }
        }
        Ok(results)
    }

    async fn fetch_marks_chunked(&self, markets: &[MarketId]) -> Result<Vec<MarkRow>, BatchError> {
        let mut results = Vec::new();
        let mut pending: Vec<Vec<MarketId>> = markets
            .chunks(self.max_chunk)
            .map(|chunk| chunk.to_vec())
            .collect();

        while let Some(chunk) = pending.pop() {
            match self.warehouse.fetch_marks(&chunk).await {
                Ok(mut rows) => results.append(&mut rows),
                Err(err) if chunk.len() > 1 => {
                    warn!(
                        "marks lookup failed for {} markets, halving chunk: {}",
                        chunk.len(),
                        err
                    );
                    let (left, right) = chunk.split_at(chunk.len() / 2);
                    pending.push(right.to_vec());
                    pending.push(left.to_vec());
                }
                Err(err) => return Err(BatchError::Warehouse(err)),
            }
        }
        Ok(results)
    }
}

#[derive(Debug, Error)]
pub enum BatchError {
    #[error(transparent)]
    Warehouse(#[from] WarehouseError),
    #[error("wallet replay task failed: {0}")]
    Replay(String),
}
