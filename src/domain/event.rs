//! Raw and normalized event types for the position ledger.
//!
//! `RawEvent` is the row shape the warehouse returns: stringly token/market
//! references, optional fields whose presence depends on the event kind.
//! `Event` is what replay consumes: token references resolved, payload
//! validated, one closed [`Action`] variant per event kind so the ledger's
//! transition match is exhaustive and compile-checked.

use crate::domain::{Decimal, MarketId, OutcomeToken, TimeMs, TokenId, TradeRole, Wallet};
use serde::{Deserialize, Serialize};

/// Event kind tag as delivered by the warehouse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RawKind {
    Buy,
    Sell,
    Split,
    Merge,
    Redeem,
    Convert,
}

impl std::fmt::Display for RawKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = match self {
            RawKind::Buy => "buy",
            RawKind::Sell => "sell",
            RawKind::Split => "split",
            RawKind::Merge => "merge",
            RawKind::Redeem => "redeem",
            RawKind::Convert => "convert",
        };
        write!(f, "{}", tag)
    }
}

/// An event row as fetched from the warehouse, before normalization.
///
/// `event_id` is the stable identity (transaction hash + log index upstream);
/// duplicates of the same identity must collapse to one canonical copy.
/// Field presence varies by kind: trades and redeems carry `token_id`,
/// splits/merges/converts carry `market_id`, only converts carry
/// `sold_indices`, and only order fills carry `role`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEvent {
    pub event_id: String,
    pub wallet: Wallet,
    pub kind: RawKind,
    #[serde(default)]
    pub token_id: Option<TokenId>,
    #[serde(default)]
    pub market_id: Option<MarketId>,
    pub quantity: Decimal,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub role: Option<TradeRole>,
    #[serde(default)]
    pub sold_indices: Option<Vec<u32>>,
    pub occurred_at: TimeMs,
}

impl RawEvent {
    /// Deterministic fingerprint of the full payload.
    ///
    /// Two deliveries of the same logical event hash identically; a duplicate
    /// identity whose payload diverges hashes differently, which is how the
    /// normalizer detects data-integrity problems and picks a stable winner.
    pub fn payload_fingerprint(&self) -> String {
        use sha2::{Digest, Sha256};

        let mut hasher = Sha256::new();
        hasher.update(self.event_id.as_bytes());
        hasher.update(self.wallet.as_str());
        hasher.update(self.kind.to_string());
        if let Some(token) = &self.token_id {
            hasher.update(token.as_str());
        }
        if let Some(market) = &self.market_id {
            hasher.update(market.as_str());
        }
        hasher.update(self.quantity.to_canonical_string());
        if let Some(price) = &self.price {
            hasher.update(price.to_canonical_string());
        }
        if let Some(role) = &self.role {
            hasher.update(role.to_string());
        }
        if let Some(sold) = &self.sold_indices {
            for index in sold {
                hasher.update(index.to_le_bytes());
            }
        }
        hasher.update(self.occurred_at.as_ms().to_le_bytes());
        let hash = hasher.finalize();
        hex::encode(&hash[..16])
    }
}

/// A normalized event, ready for replay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Event {
    pub event_id: String,
    pub wallet: Wallet,
    pub occurred_at: TimeMs,
    pub action: Action,
}

/// The validated, kind-specific payload of a normalized event.
///
/// Splits, merges, and converts carry the market's outcome count so the
/// ledger can fan a compound operation out across legs without consulting
/// the token registry again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Action {
    Buy {
        token: OutcomeToken,
        quantity: Decimal,
        price: Decimal,
        role: TradeRole,
    },
    Sell {
        token: OutcomeToken,
        quantity: Decimal,
        price: Decimal,
        role: TradeRole,
    },
    Split {
        market: MarketId,
        quantity: Decimal,
        outcome_count: u32,
    },
    Merge {
        market: MarketId,
        quantity: Decimal,
        outcome_count: u32,
    },
    Redeem {
        token: OutcomeToken,
        quantity: Decimal,
        price: Decimal,
    },
    Convert {
        market: MarketId,
        quantity: Decimal,
        sold: Vec<u32>,
        outcome_count: u32,
    },
}

impl Action {
    /// The market this action touches.
    pub fn market(&self) -> &MarketId {
        match self {
            Action::Buy { token, .. } | Action::Sell { token, .. } | Action::Redeem { token, .. } => {
                &token.market
            }
            Action::Split { market, .. }
            | Action::Merge { market, .. }
            | Action::Convert { market, .. } => market,
        }
    }

    /// The fill leg role, for order-fill actions only.
    pub fn role(&self) -> Option<TradeRole> {
        match self {
            Action::Buy { role, .. } | Action::Sell { role, .. } => Some(*role),
            _ => None,
        }
    }
}
