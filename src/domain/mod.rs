//! Domain types and determinism layer for the position ledger.
//!
//! This module provides:
//! - Lossless numeric handling via the Decimal wrapper
//! - Domain primitives: TimeMs, Wallet, MarketId, TokenId, OutcomeToken
//! - Raw and normalized event types with the closed Action sum type
//! - Stable event ordering key helper for deterministic replay

pub mod decimal;
pub mod event;
pub mod ordering;
pub mod primitives;

pub use decimal::Decimal;
pub use event::{Action, Event, RawEvent, RawKind};
pub use ordering::EventOrderingKey;
pub use primitives::{MarketId, OutcomeToken, TimeMs, TokenId, TradeRole, Wallet};
