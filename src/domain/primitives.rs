//! Domain primitives: TimeMs, Wallet, MarketId, TokenId, OutcomeToken, TradeRole.

use serde::{Deserialize, Serialize};

/// Event time in milliseconds since Unix epoch. Primary ordering key for replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimeMs(pub i64);

impl TimeMs {
    /// Create a TimeMs from milliseconds.
    pub fn new(ms: i64) -> Self {
        TimeMs(ms)
    }

    /// Get the underlying milliseconds value.
    pub fn as_ms(&self) -> i64 {
        self.0
    }
}

/// Wallet address (hex string, lowercased by the ingestion side).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Wallet(pub String);

impl Wallet {
    /// Create a Wallet from a string.
    pub fn new(addr: impl Into<String>) -> Self {
        Wallet(addr.into())
    }

    /// Get the address as a string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Market identifier (condition id).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MarketId(pub String);

impl MarketId {
    /// Create a MarketId from a string.
    pub fn new(id: impl Into<String>) -> Self {
        MarketId(id.into())
    }

    /// Get the market id as a string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MarketId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Raw outcome-token identifier as it appears on chain (ERC-1155 token id).
///
/// Resolved to an [`OutcomeToken`] through the token registry; an event whose
/// TokenId cannot be resolved is dropped and the wallet's confidence reduced.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TokenId(pub String);

impl TokenId {
    /// Create a TokenId from a string.
    pub fn new(id: impl Into<String>) -> Self {
        TokenId(id.into())
    }

    /// Get the token id as a string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TokenId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A resolved outcome-token position key: market plus outcome index.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OutcomeToken {
    pub market: MarketId,
    pub index: u32,
}

impl OutcomeToken {
    /// Create an OutcomeToken from a market and outcome index.
    pub fn new(market: MarketId, index: u32) -> Self {
        OutcomeToken { market, index }
    }
}

impl std::fmt::Display for OutcomeToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.market, self.index)
    }
}

/// Which leg of an order fill this event represents.
///
/// One fill produces a maker leg and a taker leg carrying the same event id;
/// the dedup key for fills must keep the two legs distinct while collapsing
/// re-deliveries of the same leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeRole {
    Maker,
    Taker,
}

impl std::fmt::Display for TradeRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TradeRole::Maker => write!(f, "maker"),
            TradeRole::Taker => write!(f, "taker"),
        }
    }
}
