//! Event normalization: dedup, token resolution, validation, ordering.
//!
//! Input is one wallet's raw event set — possibly duplicated, possibly
//! unordered, possibly referencing tokens the registry has never seen.
//! Output is the deduplicated, validated, deterministically ordered sequence
//! the ledger replays, plus the diagnostics describing everything that was
//! dropped, rejected, or flagged along the way. Per-event problems never
//! abort the wallet.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use tracing::{debug, warn};

use crate::domain::ordering::sort_events_deterministic;
use crate::domain::{Action, Decimal, Event, RawEvent, RawKind, TradeRole, Wallet};
use crate::oracle::TokenRegistry;

use super::{DedupStrategy, Diagnostics};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum DedupKey {
    Event(String),
    Leg(String, TradeRole),
}

/// Normalizes raw warehouse rows into replayable events.
pub struct Normalizer<'a> {
    registry: &'a TokenRegistry,
    dedup: DedupStrategy,
}

impl<'a> Normalizer<'a> {
    pub fn new(registry: &'a TokenRegistry, dedup: DedupStrategy) -> Self {
        Normalizer { registry, dedup }
    }

    /// Deduplicate, validate, resolve, and order one wallet's events.
    pub fn normalize(&self, wallet: &Wallet, raw_events: Vec<RawEvent>) -> (Vec<Event>, Diagnostics) {
        let mut diagnostics = Diagnostics::default();

        let mut canonical: HashMap<DedupKey, (String, RawEvent)> = HashMap::new();
        for raw in raw_events {
            if &raw.wallet != wallet {
                debug!(
                    event_id = %raw.event_id,
                    "skipping event for foreign wallet {}",
                    raw.wallet
                );
                continue;
            }
            let key = self.dedup_key(&raw);
            let fingerprint = raw.payload_fingerprint();
            match canonical.entry(key) {
                Entry::Occupied(mut entry) => {
                    let (existing, _) = entry.get();
                    if *existing == fingerprint {
                        diagnostics.duplicates_collapsed += 1;
                    } else {
                        // Same identity, different payload. Should not occur
                        // by construction; pick the greater fingerprint so
                        // the winner is independent of delivery order.
                        diagnostics.divergent_duplicates += 1;
                        warn!(
                            event_id = %raw.event_id,
                            "duplicate event identity with divergent payload"
                        );
                        if fingerprint > *existing {
                            entry.insert((fingerprint, raw));
                        }
                    }
                }
                Entry::Vacant(entry) => {
                    entry.insert((fingerprint, raw));
                }
            }
        }

        let mut events = Vec::with_capacity(canonical.len());
        for (_, (_, raw)) in canonical {
            if let Some(event) = self.validate(raw, &mut diagnostics) {
                events.push(event);
            }
        }

        sort_events_deterministic(&mut events);
        (events, diagnostics)
    }

    fn dedup_key(&self, raw: &RawEvent) -> DedupKey {
        match (self.dedup, raw.kind, raw.role) {
            // One fill legitimately produces two legs; keep them apart.
            (DedupStrategy::PerLeg, RawKind::Buy | RawKind::Sell, Some(role)) => {
                DedupKey::Leg(raw.event_id.clone(), role)
            }
            _ => DedupKey::Event(raw.event_id.clone()),
        }
    }

    /// Validate one canonical raw event and resolve it into an [`Action`].
    /// Returns None (with a diagnostic recorded) for anything unusable.
    fn validate(&self, raw: RawEvent, diagnostics: &mut Diagnostics) -> Option<Event> {
        if raw.quantity.is_negative() {
            diagnostics.rejected_events += 1;
            warn!(event_id = %raw.event_id, "rejecting event with negative quantity");
            return None;
        }
        if let Some(price) = raw.price {
            if price.is_negative() || price > Decimal::one() {
                diagnostics.flagged_prices += 1;
                debug!(event_id = %raw.event_id, %price, "price outside [0, 1]");
            }
        }

        let action = match raw.kind {
            RawKind::Buy | RawKind::Sell => self.validate_fill(&raw, diagnostics)?,
            RawKind::Split | RawKind::Merge => self.validate_market_op(&raw, diagnostics)?,
            RawKind::Redeem => self.validate_redeem(&raw, diagnostics)?,
            RawKind::Convert => self.validate_convert(&raw, diagnostics)?,
        };

        Some(Event {
            event_id: raw.event_id,
            wallet: raw.wallet,
            occurred_at: raw.occurred_at,
            action,
        })
    }

    fn validate_fill(&self, raw: &RawEvent, diagnostics: &mut Diagnostics) -> Option<Action> {
        let (token_id, price, role) = match (&raw.token_id, raw.price, raw.role) {
            (Some(token_id), Some(price), Some(role)) => (token_id, price, role),
            _ => {
                diagnostics.rejected_events += 1;
                warn!(event_id = %raw.event_id, kind = %raw.kind, "fill missing token, price, or role");
                return None;
            }
        };
        let token = match self.registry.resolve(token_id) {
            Some(token) => token.clone(),
            None => {
                diagnostics.dropped_unresolvable += 1;
                warn!(event_id = %raw.event_id, token_id = %token_id, "unresolvable outcome token");
                return None;
            }
        };
        Some(match raw.kind {
            RawKind::Buy => Action::Buy {
                token,
                quantity: raw.quantity,
                price,
                role,
            },
            _ => Action::Sell {
                token,
                quantity: raw.quantity,
                price,
                role,
            },
        })
    }

    fn validate_market_op(&self, raw: &RawEvent, diagnostics: &mut Diagnostics) -> Option<Action> {
        let market = match &raw.market_id {
            Some(market) => market.clone(),
            None => {
                diagnostics.rejected_events += 1;
                warn!(event_id = %raw.event_id, kind = %raw.kind, "market operation missing market id");
                return None;
            }
        };
        let outcome_count = match self.registry.outcome_count(&market) {
            // A single mapped outcome means the registry is incomplete for
            // this market; treat it the same as an unknown market.
            Some(count) if count >= 2 => count,
            _ => {
                diagnostics.dropped_unresolvable += 1;
                warn!(event_id = %raw.event_id, market = %market, "market not in registry");
                return None;
            }
        };
        Some(match raw.kind {
            RawKind::Split => Action::Split {
                market,
                quantity: raw.quantity,
                outcome_count,
            },
            _ => Action::Merge {
                market,
                quantity: raw.quantity,
                outcome_count,
            },
        })
    }

    fn validate_redeem(&self, raw: &RawEvent, diagnostics: &mut Diagnostics) -> Option<Action> {
        let (token_id, price) = match (&raw.token_id, raw.price) {
            (Some(token_id), Some(price)) => (token_id, price),
            _ => {
                diagnostics.rejected_events += 1;
                warn!(event_id = %raw.event_id, "redeem missing token or price");
                return None;
            }
        };
        let token = match self.registry.resolve(token_id) {
            Some(token) => token.clone(),
            None => {
                diagnostics.dropped_unresolvable += 1;
                warn!(event_id = %raw.event_id, token_id = %token_id, "unresolvable outcome token");
                return None;
            }
        };
        Some(Action::Redeem {
            token,
            quantity: raw.quantity,
            price,
        })
    }

    fn validate_convert(&self, raw: &RawEvent, diagnostics: &mut Diagnostics) -> Option<Action> {
        let (market, sold) = match (&raw.market_id, &raw.sold_indices) {
            (Some(market), Some(sold)) if !sold.is_empty() => (market.clone(), sold),
            _ => {
                diagnostics.rejected_events += 1;
                warn!(event_id = %raw.event_id, "convert missing market or sold index set");
                return None;
            }
        };
        let outcome_count = match self.registry.outcome_count(&market) {
            Some(count) if count >= 2 => count,
            _ => {
                diagnostics.dropped_unresolvable += 1;
                warn!(event_id = %raw.event_id, market = %market, "market not in registry");
                return None;
            }
        };

        let mut sold = sold.clone();
        sold.sort_unstable();
        sold.dedup();
        let in_range = sold.iter().all(|index| *index < outcome_count);
        // The sold set must leave at least one complement leg to buy.
        if !in_range || sold.len() >= outcome_count as usize {
            diagnostics.rejected_events += 1;
            warn!(event_id = %raw.event_id, market = %market, "convert sold set out of range");
            return None;
        }

        Some(Action::Convert {
            market,
            quantity: raw.quantity,
            sold,
            outcome_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MarketId, TimeMs, TokenId};
    use crate::oracle::TokenRegistry;

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    fn registry() -> TokenRegistry {
        let mut registry = TokenRegistry::new();
        registry.insert(TokenId::new("11"), MarketId::new("0xm"), 0);
        registry.insert(TokenId::new("22"), MarketId::new("0xm"), 1);
        registry
    }

    fn wallet() -> Wallet {
        Wallet::new("0xw")
    }

    fn raw_fill(event_id: &str, role: TradeRole, quantity: &str) -> RawEvent {
        RawEvent {
            event_id: event_id.to_string(),
            wallet: wallet(),
            kind: RawKind::Buy,
            token_id: Some(TokenId::new("11")),
            market_id: None,
            quantity: d(quantity),
            price: Some(d("0.4")),
            role: Some(role),
            sold_indices: None,
            occurred_at: TimeMs::new(1000),
        }
    }

    fn normalize(raws: Vec<RawEvent>) -> (Vec<Event>, Diagnostics) {
        let registry = registry();
        let normalizer = Normalizer::new(&registry, DedupStrategy::PerLeg);
        normalizer.normalize(&wallet(), raws)
    }

    #[test]
    fn test_duplicate_delivery_collapses_to_one() {
        let (events, diagnostics) = normalize(vec![
            raw_fill("0xtx-0", TradeRole::Taker, "100"),
            raw_fill("0xtx-0", TradeRole::Taker, "100"),
        ]);
        assert_eq!(events.len(), 1);
        assert_eq!(diagnostics.duplicates_collapsed, 1);
        assert_eq!(diagnostics.divergent_duplicates, 0);
    }

    #[test]
    fn test_two_legs_of_one_fill_do_not_collapse() {
        let (events, diagnostics) = normalize(vec![
            raw_fill("0xtx-0", TradeRole::Maker, "100"),
            raw_fill("0xtx-0", TradeRole::Taker, "100"),
        ]);
        assert_eq!(events.len(), 2);
        assert_eq!(diagnostics.duplicates_collapsed, 0);
    }

    #[test]
    fn test_per_event_strategy_collapses_legs() {
        let registry = registry();
        let normalizer = Normalizer::new(&registry, DedupStrategy::PerEvent);
        let (events, _) = normalizer.normalize(
            &wallet(),
            vec![
                raw_fill("0xtx-0", TradeRole::Maker, "100"),
                raw_fill("0xtx-0", TradeRole::Taker, "100"),
            ],
        );
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_divergent_duplicate_winner_is_delivery_order_independent() {
        let a = raw_fill("0xtx-0", TradeRole::Taker, "100");
        let b = raw_fill("0xtx-0", TradeRole::Taker, "250");

        let (forward, diag_forward) = normalize(vec![a.clone(), b.clone()]);
        let (reversed, diag_reversed) = normalize(vec![b, a]);

        assert_eq!(forward, reversed);
        assert_eq!(diag_forward.divergent_duplicates, 1);
        assert_eq!(diag_reversed.divergent_duplicates, 1);
    }

    #[test]
    fn test_negative_quantity_rejected() {
        let (events, diagnostics) = normalize(vec![raw_fill("0xtx-0", TradeRole::Taker, "-5")]);
        assert!(events.is_empty());
        assert_eq!(diagnostics.rejected_events, 1);
    }

    #[test]
    fn test_out_of_range_price_kept_but_flagged() {
        let mut raw = raw_fill("0xtx-0", TradeRole::Taker, "100");
        raw.price = Some(d("1.2"));
        let (events, diagnostics) = normalize(vec![raw]);
        assert_eq!(events.len(), 1);
        assert_eq!(diagnostics.flagged_prices, 1);
    }

    #[test]
    fn test_unresolvable_token_dropped_and_counted() {
        let mut raw = raw_fill("0xtx-0", TradeRole::Taker, "100");
        raw.token_id = Some(TokenId::new("unknown"));
        let (events, diagnostics) = normalize(vec![raw]);
        assert!(events.is_empty());
        assert_eq!(diagnostics.dropped_unresolvable, 1);
    }

    #[test]
    fn test_split_for_unknown_market_dropped() {
        let raw = RawEvent {
            event_id: "0xtx-1".to_string(),
            wallet: wallet(),
            kind: RawKind::Split,
            token_id: None,
            market_id: Some(MarketId::new("0xunknown")),
            quantity: d("10"),
            price: None,
            role: None,
            sold_indices: None,
            occurred_at: TimeMs::new(1000),
        };
        let (events, diagnostics) = normalize(vec![raw]);
        assert!(events.is_empty());
        assert_eq!(diagnostics.dropped_unresolvable, 1);
    }

    #[test]
    fn test_convert_sold_set_must_leave_a_complement() {
        let raw = RawEvent {
            event_id: "0xtx-2".to_string(),
            wallet: wallet(),
            kind: RawKind::Convert,
            token_id: None,
            market_id: Some(MarketId::new("0xm")),
            quantity: d("10"),
            price: None,
            role: None,
            sold_indices: Some(vec![0, 1]),
            occurred_at: TimeMs::new(1000),
        };
        let (events, diagnostics) = normalize(vec![raw]);
        assert!(events.is_empty());
        assert_eq!(diagnostics.rejected_events, 1);
    }

    #[test]
    fn test_convert_sold_set_is_sorted_and_deduped() {
        let mut registry = registry();
        registry.insert(TokenId::new("33"), MarketId::new("0xm"), 2);
        let normalizer = Normalizer::new(&registry, DedupStrategy::PerLeg);
        let raw = RawEvent {
            event_id: "0xtx-3".to_string(),
            wallet: wallet(),
            kind: RawKind::Convert,
            token_id: None,
            market_id: Some(MarketId::new("0xm")),
            quantity: d("10"),
            price: None,
            role: None,
            sold_indices: Some(vec![2, 1, 2]),
            occurred_at: TimeMs::new(1000),
        };
        let (events, _) = normalizer.normalize(&wallet(), vec![raw]);
        match &events[0].action {
            Action::Convert { sold, .. } => assert_eq!(sold, &vec![1, 2]),
            other => panic!("expected convert, got {:?}", other),
        }
    }

    #[test]
    fn test_foreign_wallet_events_ignored() {
        let mut raw = raw_fill("0xtx-0", TradeRole::Taker, "100");
        raw.wallet = Wallet::new("0xother");
        let (events, diagnostics) = normalize(vec![raw]);
        assert!(events.is_empty());
        assert_eq!(diagnostics, Diagnostics::default());
    }

    #[test]
    fn test_output_is_ordered() {
        let mut early = raw_fill("0xtx-b", TradeRole::Taker, "1");
        early.occurred_at = TimeMs::new(500);
        let late = raw_fill("0xtx-a", TradeRole::Taker, "1");
        let (events, _) = normalize(vec![late, early]);
        assert_eq!(events[0].event_id, "0xtx-b");
        assert_eq!(events[1].event_id, "0xtx-a");
    }
}
