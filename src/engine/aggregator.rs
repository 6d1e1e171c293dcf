//! Report derivation from terminal position state.
//!
//! Reports are pure derivations: recomputed on demand from the wallet book
//! and the shared caches, never stored as authoritative state.

use std::collections::BTreeSet;

use crate::domain::{Decimal, MarketId};
use crate::oracle::{MarkBook, ResolutionCache};

use super::{Coverage, Report, ReportingPolicy, WalletBook};

/// Fold one wallet's terminal positions into a [`Report`] under `policy`.
///
/// Resolved-but-unredeemed value and unrealized value use the same formula,
/// `held × (price − avg_cost)` — mark-to-payout against the resolution
/// vector for resolved markets, mark-to-market against the mark book for
/// open ones. The policy only decides which components fold into
/// `total_pnl`; all three components are always reported.
pub fn aggregate(
    book: &WalletBook,
    resolutions: &ResolutionCache,
    marks: &MarkBook,
    policy: ReportingPolicy,
) -> Report {
    let mut realized = Decimal::zero();
    let mut resolved_unredeemed = Decimal::zero();
    let mut unrealized = Decimal::zero();
    let mut diagnostics = book.diagnostics().clone();
    let mut touched: BTreeSet<&MarketId> = BTreeSet::new();

    for (token, position) in book.positions() {
        touched.insert(&token.market);
        realized += position.realized_pnl;
        if !position.is_holding() {
            continue;
        }
        match resolutions.payout(token) {
            Some(payout) => {
                resolved_unredeemed += position.held_quantity * (payout - position.avg_cost);
            }
            None => match marks.price(token) {
                Some(mark) => {
                    unrealized += position.held_quantity * (mark - position.avg_cost);
                }
                None => {
                    // Only meaningful when unrealized value is requested;
                    // mark staleness never qualifies the other policies.
                    if policy == ReportingPolicy::Full {
                        diagnostics.missing_marks += 1;
                    }
                }
            },
        }
    }

    let touched_markets = touched.len();
    let resolved_markets = touched
        .iter()
        .filter(|market| resolutions.is_resolved(market))
        .count();
    let fraction = if touched_markets == 0 {
        Decimal::one()
    } else {
        Decimal::from_u32(resolved_markets as u32) / Decimal::from_u32(touched_markets as u32)
    };

    let total_pnl = match policy {
        ReportingPolicy::RealizedOnly => realized,
        ReportingPolicy::RealizedPlusResolved => realized + resolved_unredeemed,
        ReportingPolicy::Full => realized + resolved_unredeemed + unrealized,
    };

    Report {
        wallet: book.wallet().clone(),
        policy,
        realized_pnl: realized,
        resolved_unredeemed_value: resolved_unredeemed,
        unrealized_value: unrealized,
        total_pnl,
        resolution_coverage: Coverage {
            resolved_markets,
            touched_markets,
            fraction,
        },
        diagnostics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Action, OutcomeToken, TradeRole, Wallet};
    use crate::oracle::PayoutVector;

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    fn buy(token: OutcomeToken, quantity: &str, price: &str) -> Action {
        Action::Buy {
            token,
            quantity: d(quantity),
            price: d(price),
            role: TradeRole::Taker,
        }
    }

    fn token(market: &str, index: u32) -> OutcomeToken {
        OutcomeToken::new(MarketId::new(market), index)
    }

    #[test]
    fn test_resolved_unredeemed_value() {
        let cache = {
            let mut cache = ResolutionCache::new();
            cache.insert(MarketId::new("0xm"), PayoutVector::new(vec![d("1"), d("0")]));
            cache
        };
        let mut book = WalletBook::new(Wallet::new("0xw"));
        // Bought the winner at 0.40 and never redeemed.
        book.apply(&buy(token("0xm", 0), "100", "0.4"), &cache);

        let report = aggregate(&book, &cache, &MarkBook::new(), ReportingPolicy::RealizedPlusResolved);
        assert_eq!(report.realized_pnl, Decimal::zero());
        assert_eq!(report.resolved_unredeemed_value, d("60"));
        assert_eq!(report.total_pnl, d("60"));
        assert_eq!(report.resolution_coverage.fraction, Decimal::one());
    }

    #[test]
    fn test_unrealized_value_against_marks() {
        let cache = ResolutionCache::new();
        let mut marks = MarkBook::new();
        marks.insert(token("0xm", 0), d("0.55"));

        let mut book = WalletBook::new(Wallet::new("0xw"));
        book.apply(&buy(token("0xm", 0), "100", "0.4"), &cache);

        let report = aggregate(&book, &cache, &marks, ReportingPolicy::Full);
        assert_eq!(report.unrealized_value, d("15"));
        assert_eq!(report.total_pnl, d("15"));
        assert_eq!(report.resolution_coverage.fraction, Decimal::zero());
    }

    #[test]
    fn test_missing_mark_counted_only_under_full_policy() {
        let cache = ResolutionCache::new();
        let mut book = WalletBook::new(Wallet::new("0xw"));
        book.apply(&buy(token("0xm", 0), "100", "0.4"), &cache);

        let full = aggregate(&book, &cache, &MarkBook::new(), ReportingPolicy::Full);
        assert_eq!(full.diagnostics.missing_marks, 1);
        assert_eq!(full.unrealized_value, Decimal::zero());

        let realized = aggregate(&book, &cache, &MarkBook::new(), ReportingPolicy::RealizedOnly);
        assert_eq!(realized.diagnostics.missing_marks, 0);
    }

    #[test]
    fn test_policy_components_always_reported() {
        let cache = {
            let mut cache = ResolutionCache::new();
            cache.insert(MarketId::new("0xa"), PayoutVector::new(vec![d("1"), d("0")]));
            cache
        };
        let mut marks = MarkBook::new();
        marks.insert(token("0xb", 0), d("0.6"));

        let mut book = WalletBook::new(Wallet::new("0xw"));
        book.apply(&buy(token("0xa", 0), "10", "0.5"), &cache);
        book.apply(&buy(token("0xb", 0), "10", "0.5"), &cache);

        let report = aggregate(&book, &cache, &marks, ReportingPolicy::RealizedOnly);
        // Components are computed regardless of policy; only total changes.
        assert_eq!(report.resolved_unredeemed_value, d("5"));
        assert_eq!(report.unrealized_value, d("1"));
        assert_eq!(report.total_pnl, Decimal::zero());
    }

    #[test]
    fn test_coverage_fraction_over_touched_markets() {
        let cache = {
            let mut cache = ResolutionCache::new();
            cache.insert(MarketId::new("0xa"), PayoutVector::new(vec![d("1"), d("0")]));
            cache
        };
        let mut book = WalletBook::new(Wallet::new("0xw"));
        book.apply(&buy(token("0xa", 0), "10", "0.5"), &cache);
        book.apply(&buy(token("0xb", 0), "10", "0.5"), &cache);

        let report = aggregate(&book, &cache, &MarkBook::new(), ReportingPolicy::RealizedOnly);
        assert_eq!(report.resolution_coverage.resolved_markets, 1);
        assert_eq!(report.resolution_coverage.touched_markets, 2);
        assert_eq!(report.resolution_coverage.fraction, d("0.5"));
    }

    #[test]
    fn test_zero_quantity_positions_still_count_as_touched() {
        let cache = ResolutionCache::new();
        let mut book = WalletBook::new(Wallet::new("0xw"));
        book.apply(&buy(token("0xa", 0), "10", "0.5"), &cache);
        book.apply(
            &Action::Sell {
                token: token("0xa", 0),
                quantity: d("10"),
                price: d("0.5"),
                role: TradeRole::Taker,
            },
            &cache,
        );

        let report = aggregate(&book, &cache, &MarkBook::new(), ReportingPolicy::RealizedOnly);
        assert_eq!(report.resolution_coverage.touched_markets, 1);
        assert_eq!(report.resolution_coverage.resolved_markets, 0);
    }
}
