//! Pure computation engine for deterministic ledger replay.
//!
//! Everything under this module is a pure function of (events, lookup
//! caches, options): no I/O, no clocks, no interior mutability. The batch
//! coordinator and the validation harness both go through
//! [`compute_report`], which is the one seam that ties normalization,
//! replay, and aggregation together.

use crate::domain::{Decimal, RawEvent, Wallet};
use crate::oracle::{MarkBook, ResolutionCache, TokenRegistry};
use serde::{Deserialize, Serialize};

pub mod aggregator;
pub mod ledger;
pub mod normalizer;

pub use aggregator::aggregate;
pub use ledger::{Position, WalletBook};
pub use normalizer::Normalizer;

/// Which value components fold into `total_pnl`.
///
/// External truth sources disagree on whether resolved-but-unredeemed value
/// counts as "realized"; the policy is carried on every report so two
/// reports are never compared across conventions by accident.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportingPolicy {
    /// Trade-realized PnL only.
    RealizedOnly,
    /// Realized plus mark-to-payout value of resolved, still-held positions.
    RealizedPlusResolved,
    /// Realized plus resolved plus mark-to-market value of open positions.
    Full,
}

impl std::fmt::Display for ReportingPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportingPolicy::RealizedOnly => write!(f, "realized_only"),
            ReportingPolicy::RealizedPlusResolved => write!(f, "realized_plus_resolved"),
            ReportingPolicy::Full => write!(f, "full"),
        }
    }
}

/// Dedup key strategy for order-fill events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupStrategy {
    /// Key fills by (event id, leg role); everything else by event id.
    /// One fill's maker and taker legs stay distinct.
    PerLeg,
    /// Key every event by event id alone. Collapses the two legs of a
    /// self-trade into one; kept for auditing feeds that pre-split legs.
    PerEvent,
}

/// Explicit engine configuration, passed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    pub policy: ReportingPolicy,
    pub dedup: DedupStrategy,
}

impl Default for EngineOptions {
    fn default() -> Self {
        EngineOptions {
            policy: ReportingPolicy::RealizedPlusResolved,
            dedup: DedupStrategy::PerLeg,
        }
    }
}

/// Per-wallet data-quality counters accumulated across normalization,
/// replay, and aggregation. None of these abort a wallet; they qualify it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Diagnostics {
    /// Events rejected at normalization (negative quantity, malformed payload).
    pub rejected_events: u64,
    /// Events dropped because their token or market is not in the registry.
    pub dropped_unresolvable: u64,
    /// Events kept despite a price outside [0, 1].
    pub flagged_prices: u64,
    /// Exact duplicate deliveries collapsed to one canonical copy.
    pub duplicates_collapsed: u64,
    /// Duplicate identities whose payloads disagreed.
    pub divergent_duplicates: u64,
    /// Liquidations where the inventory guard clamped the quantity.
    pub clamp_events: u64,
    /// Total quantity shaved off by the inventory guard.
    pub clamped_quantity: Decimal,
    /// Redeems replayed at their event price because no resolution was known.
    pub redeems_without_resolution: u64,
    /// Open unresolved positions with no mark price available.
    pub missing_marks: u64,
}

/// Resolution coverage over the markets a wallet touched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Coverage {
    pub resolved_markets: usize,
    pub touched_markets: usize,
    /// resolved / touched as an exact fraction; 1 when no market was touched.
    pub fraction: Decimal,
}

/// The engine's sole externally observable output, one per wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub wallet: Wallet,
    pub policy: ReportingPolicy,
    pub realized_pnl: Decimal,
    pub resolved_unredeemed_value: Decimal,
    pub unrealized_value: Decimal,
    pub total_pnl: Decimal,
    pub resolution_coverage: Coverage,
    pub diagnostics: Diagnostics,
}

/// Normalize, replay, and aggregate one wallet's raw events into a Report.
///
/// Pure: byte-identical output for byte-identical input, however the raw
/// events were fetched or ordered.
pub fn compute_report(
    wallet: Wallet,
    raw_events: Vec<RawEvent>,
    registry: &TokenRegistry,
    resolutions: &ResolutionCache,
    marks: &MarkBook,
    options: EngineOptions,
) -> Report {
    let normalizer = Normalizer::new(registry, options.dedup);
    let (events, diagnostics) = normalizer.normalize(&wallet, raw_events);
    replay_normalized(wallet, &events, diagnostics, resolutions, marks, options.policy)
}

/// Replay already-normalized events and aggregate. Split out so the batch
/// coordinator can normalize early (to learn which markets to preload) and
/// still share this exact path with [`compute_report`].
pub fn replay_normalized(
    wallet: Wallet,
    events: &[crate::domain::Event],
    diagnostics: Diagnostics,
    resolutions: &ResolutionCache,
    marks: &MarkBook,
    policy: ReportingPolicy,
) -> Report {
    let mut book = WalletBook::with_diagnostics(wallet, diagnostics);
    for event in events {
        book.apply(&event.action, resolutions);
    }
    aggregate(&book, resolutions, marks, policy)
}
