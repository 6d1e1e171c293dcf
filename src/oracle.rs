//! Read-only lookup state shared across wallet replays.
//!
//! The token registry, resolution cache, and mark book are each built once
//! per batch from warehouse rows, then shared immutably (via `Arc`) by every
//! wallet task. Nothing in this module mutates after construction.

use crate::domain::{Decimal, MarketId, OutcomeToken, TokenId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One row of the canonical token mapping table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMapping {
    pub token_id: TokenId,
    pub market: MarketId,
    pub outcome_index: u32,
}

/// Canonical mapping from on-chain token ids to (market, outcome index),
/// plus the per-market outcome count derived from the mapping.
#[derive(Debug, Clone, Default)]
pub struct TokenRegistry {
    tokens: HashMap<TokenId, OutcomeToken>,
    outcome_counts: HashMap<MarketId, u32>,
}

impl TokenRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from warehouse mapping rows.
    pub fn from_mappings(mappings: Vec<TokenMapping>) -> Self {
        let mut registry = Self::new();
        for m in mappings {
            registry.insert(m.token_id, m.market, m.outcome_index);
        }
        registry
    }

    /// Register one token mapping.
    pub fn insert(&mut self, token_id: TokenId, market: MarketId, outcome_index: u32) {
        let count = self.outcome_counts.entry(market.clone()).or_insert(0);
        *count = (*count).max(outcome_index + 1);
        self.tokens
            .insert(token_id, OutcomeToken::new(market, outcome_index));
    }

    /// Resolve a raw token id to its position key, if known.
    pub fn resolve(&self, token_id: &TokenId) -> Option<&OutcomeToken> {
        self.tokens.get(token_id)
    }

    /// Number of outcomes a market has, if the market is known.
    pub fn outcome_count(&self, market: &MarketId) -> Option<u32> {
        self.outcome_counts.get(market).copied()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// Terminal payout per outcome of a resolved market.
///
/// Commonly one-hot (0/1) for binary markets, but fractional payouts occur
/// on ties and multi-outcome settlements, so each entry is a full scalar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutVector(pub Vec<Decimal>);

impl PayoutVector {
    pub fn new(payouts: Vec<Decimal>) -> Self {
        PayoutVector(payouts)
    }

    /// Payout scalar for one outcome index; None if the index is out of range.
    pub fn payout_for(&self, index: u32) -> Option<Decimal> {
        self.0.get(index as usize).copied()
    }

    pub fn outcome_count(&self) -> usize {
        self.0.len()
    }
}

/// One row of the resolution source: a market and its payout vector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionRow {
    pub market: MarketId,
    pub payouts: Vec<Decimal>,
}

/// Lookup from market id to terminal payout vector.
///
/// A market absent from the cache is unresolved for replay purposes. An
/// out-of-range outcome index is also treated as unresolved; that is a
/// data-quality condition the caller surfaces, not an error here.
#[derive(Debug, Clone, Default)]
pub struct ResolutionCache {
    resolutions: HashMap<MarketId, PayoutVector>,
}

impl ResolutionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a cache from warehouse resolution rows.
    pub fn from_rows(rows: Vec<ResolutionRow>) -> Self {
        let mut cache = Self::new();
        for row in rows {
            cache.insert(row.market, PayoutVector::new(row.payouts));
        }
        cache
    }

    pub fn insert(&mut self, market: MarketId, payouts: PayoutVector) {
        self.resolutions.insert(market, payouts);
    }

    /// The full payout vector for a market, if resolved.
    pub fn lookup(&self, market: &MarketId) -> Option<&PayoutVector> {
        self.resolutions.get(market)
    }

    /// The terminal payout scalar for one outcome token, if resolved.
    pub fn payout(&self, token: &OutcomeToken) -> Option<Decimal> {
        self.resolutions
            .get(&token.market)
            .and_then(|v| v.payout_for(token.index))
    }

    /// Whether a market has a known terminal payout.
    pub fn is_resolved(&self, market: &MarketId) -> bool {
        self.resolutions.contains_key(market)
    }
}

/// One row of the mark-price source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkRow {
    pub market: MarketId,
    pub outcome_index: u32,
    pub price: Decimal,
}

/// Lookup from outcome token to current mark price, for unrealized valuation.
///
/// Only consulted under the Full reporting policy; staleness never affects
/// realized or resolved output.
#[derive(Debug, Clone, Default)]
pub struct MarkBook {
    marks: HashMap<OutcomeToken, Decimal>,
}

impl MarkBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a mark book from warehouse mark rows.
    pub fn from_rows(rows: Vec<MarkRow>) -> Self {
        let mut book = Self::new();
        for row in rows {
            book.insert(OutcomeToken::new(row.market, row.outcome_index), row.price);
        }
        book
    }

    pub fn insert(&mut self, token: OutcomeToken, price: Decimal) {
        self.marks.insert(token, price);
    }

    /// Current mark price for an outcome token, if available.
    pub fn price(&self, token: &OutcomeToken) -> Option<Decimal> {
        self.marks.get(token).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.marks.is_empty()
    }
}
