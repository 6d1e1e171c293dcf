//! Position ledger state machine.
//!
//! One [`Position`] per (wallet, outcome token), long-only: outcome shares
//! cannot be held short, so a liquidation larger than the tracked holding is
//! clamped by the inventory guard rather than flipping the sign. The
//! [`WalletBook`] owns all of one wallet's positions and applies normalized
//! actions strictly in replay order.

use std::collections::BTreeMap;

use crate::domain::{Action, Decimal, MarketId, OutcomeToken, Wallet};
use crate::oracle::ResolutionCache;

use super::Diagnostics;

/// Accounting state for one (wallet, outcome token) pair.
///
/// Created lazily on the first event touching the pair and never deleted;
/// a fully liquidated position persists at zero quantity.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Position {
    /// Quantity currently held. Never negative.
    pub held_quantity: Decimal,

    /// Volume-weighted average acquisition price of the current holding.
    /// Meaningless while `held_quantity` is zero.
    pub avg_cost: Decimal,

    /// Cumulative realized PnL from liquidations against this position.
    pub realized_pnl: Decimal,

    /// Total quantity ever acquired through tracked events. Diagnostic only.
    pub total_acquired: Decimal,
}

/// Result of one liquidation against a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Liquidation {
    pub requested: Decimal,
    pub adjusted: Decimal,
    pub realized: Decimal,
}

impl Liquidation {
    fn noop() -> Self {
        Liquidation {
            requested: Decimal::zero(),
            adjusted: Decimal::zero(),
            realized: Decimal::zero(),
        }
    }

    /// Whether the inventory guard shaved quantity off this liquidation.
    pub fn was_clamped(&self) -> bool {
        self.adjusted < self.requested
    }
}

impl Position {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_holding(&self) -> bool {
        self.held_quantity.is_positive()
    }

    /// Acquire `quantity` at `price`, folding it into the weighted average.
    ///
    /// From an empty position the average is simply `price`; the weighted
    /// update is order-independent across any sequence of acquisitions.
    pub fn acquire(&mut self, quantity: Decimal, price: Decimal) {
        if quantity.is_zero() {
            return;
        }
        let new_held = self.held_quantity + quantity;
        if self.held_quantity.is_zero() {
            self.avg_cost = price;
        } else {
            self.avg_cost = (self.avg_cost * self.held_quantity + price * quantity) / new_held;
        }
        self.held_quantity = new_held;
        self.total_acquired += quantity;
    }

    /// Liquidate up to `quantity` at `price`, realizing PnL against the
    /// weighted-average cost.
    ///
    /// Inventory guard: the effective quantity is `min(quantity, held)`.
    /// Tokens that entered through untracked channels contribute no PnL.
    /// `avg_cost` is unchanged by liquidations.
    pub fn liquidate(&mut self, quantity: Decimal, price: Decimal) -> Liquidation {
        if quantity.is_zero() {
            return Liquidation::noop();
        }
        let adjusted = quantity.min(self.held_quantity);
        let realized = adjusted * (price - self.avg_cost);
        self.realized_pnl += realized;
        self.held_quantity -= adjusted;
        Liquidation {
            requested: quantity,
            adjusted,
            realized,
        }
    }
}

/// All positions of one wallet, plus the diagnostics accumulated while
/// replaying its events.
///
/// Positions live in a BTreeMap so iteration (and therefore aggregation)
/// is deterministic.
#[derive(Debug, Clone)]
pub struct WalletBook {
    wallet: Wallet,
    positions: BTreeMap<OutcomeToken, Position>,
    diagnostics: Diagnostics,
}

impl WalletBook {
    pub fn new(wallet: Wallet) -> Self {
        Self::with_diagnostics(wallet, Diagnostics::default())
    }

    /// Start a book with diagnostics carried over from normalization.
    pub fn with_diagnostics(wallet: Wallet, diagnostics: Diagnostics) -> Self {
        WalletBook {
            wallet,
            positions: BTreeMap::new(),
            diagnostics,
        }
    }

    pub fn wallet(&self) -> &Wallet {
        &self.wallet
    }

    pub fn positions(&self) -> &BTreeMap<OutcomeToken, Position> {
        &self.positions
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn position(&self, token: &OutcomeToken) -> Option<&Position> {
        self.positions.get(token)
    }

    fn position_mut(&mut self, token: &OutcomeToken) -> &mut Position {
        self.positions.entry(token.clone()).or_default()
    }

    fn note_liquidation(&mut self, liquidation: &Liquidation) {
        if liquidation.was_clamped() {
            self.diagnostics.clamp_events += 1;
            self.diagnostics.clamped_quantity += liquidation.requested - liquidation.adjusted;
        }
    }

    /// Apply one normalized action. Transitions are exhaustive over the
    /// closed [`Action`] type; zero quantities are no-ops throughout.
    pub fn apply(&mut self, action: &Action, resolutions: &ResolutionCache) {
        match action {
            Action::Buy {
                token,
                quantity,
                price,
                ..
            } => {
                self.position_mut(token).acquire(*quantity, *price);
            }
            Action::Sell {
                token,
                quantity,
                price,
                ..
            } => {
                let liquidation = self.position_mut(token).liquidate(*quantity, *price);
                self.note_liquidation(&liquidation);
            }
            Action::Split {
                market,
                quantity,
                outcome_count,
            } => {
                // Minting one unit of every outcome costs one unit of
                // collateral: each leg is a buy at 1/n.
                let leg_price = Decimal::one() / Decimal::from_u32(*outcome_count);
                for index in 0..*outcome_count {
                    let token = OutcomeToken::new(market.clone(), index);
                    self.position_mut(&token).acquire(*quantity, leg_price);
                }
            }
            Action::Merge {
                market,
                quantity,
                outcome_count,
            } => {
                let leg_price = Decimal::one() / Decimal::from_u32(*outcome_count);
                for index in 0..*outcome_count {
                    let token = OutcomeToken::new(market.clone(), index);
                    let liquidation = self.position_mut(&token).liquidate(*quantity, leg_price);
                    self.note_liquidation(&liquidation);
                }
            }
            Action::Redeem {
                token,
                quantity,
                price,
            } => self.apply_redeem(token, *quantity, *price, resolutions),
            Action::Convert {
                market,
                quantity,
                sold,
                outcome_count,
            } => self.apply_convert(market, *quantity, sold, *outcome_count),
        }
    }

    /// Redeem against the terminal payout when the resolution is known;
    /// otherwise fall back to an ordinary sell at the event-supplied price.
    ///
    /// A redemption's presence is itself evidence the market resolved, so a
    /// missing resolution is flagged, never dropped. Replay is a pure batch
    /// function: re-running once the cache is populated re-applies the
    /// redemption against the true payout.
    fn apply_redeem(
        &mut self,
        token: &OutcomeToken,
        quantity: Decimal,
        price: Decimal,
        resolutions: &ResolutionCache,
    ) {
        match resolutions.payout(token) {
            Some(payout) => {
                // Redemption liquidates the entire remaining holding at the
                // payout scalar; requested == held, so no clamp can occur.
                let held = self.position_mut(token).held_quantity;
                self.position_mut(token).liquidate(held, payout);
            }
            None => {
                self.diagnostics.redeems_without_resolution += 1;
                let liquidation = self.position_mut(token).liquidate(quantity, price);
                self.note_liquidation(&liquidation);
            }
        }
    }

    /// Neg-risk conversion: sell the sold-side legs at a blended price and
    /// buy the complement legs at the complementary price.
    ///
    /// Blended price b = mean avg_cost over sold legs currently holding;
    /// each of the m complement legs is bought at (1 - b) / m, so the sold
    /// price and the summed bought price close to 1. When every sold leg's
    /// cost equals b the operation realizes exactly zero.
    fn apply_convert(
        &mut self,
        market: &MarketId,
        quantity: Decimal,
        sold: &[u32],
        outcome_count: u32,
    ) {
        if quantity.is_zero() {
            return;
        }

        let mut held_legs = 0u32;
        let mut cost_sum = Decimal::zero();
        for index in sold {
            let token = OutcomeToken::new(market.clone(), *index);
            if let Some(position) = self.positions.get(&token) {
                if position.is_holding() {
                    held_legs += 1;
                    cost_sum += position.avg_cost;
                }
            }
        }

        if held_legs == 0 {
            // No tracked inventory on the sold side: the conversion's inputs
            // arrived through untracked channels and earn no PnL.
            self.diagnostics.clamp_events += 1;
            self.diagnostics.clamped_quantity += quantity * Decimal::from_u32(sold.len() as u32);
            return;
        }

        let blended = cost_sum / Decimal::from_u32(held_legs);
        for index in sold {
            let token = OutcomeToken::new(market.clone(), *index);
            let liquidation = self.position_mut(&token).liquidate(quantity, blended);
            self.note_liquidation(&liquidation);
        }

        let bought: Vec<u32> = (0..outcome_count).filter(|i| !sold.contains(i)).collect();
        // The normalizer rejects converts whose sold set covers the market.
        let buy_price = (Decimal::one() - blended) / Decimal::from_u32(bought.len() as u32);
        for index in bought {
            let token = OutcomeToken::new(market.clone(), index);
            self.position_mut(&token).acquire(quantity, buy_price);
        }
    }
}
