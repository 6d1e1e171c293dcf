//! Stable event ordering for deterministic replay.

use crate::domain::{Event, TradeRole};

/// Total ordering key for normalized events.
///
/// Ordering: occurred_at -> event_id -> fill leg role. The role tiebreaker
/// matters because the two legs of one fill share an event id; without it
/// two wallets' replays of the same raw feed could disagree on order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct EventOrderingKey {
    pub occurred_at: i64,
    pub event_id: String,
    pub role: Option<TradeRole>,
}

impl EventOrderingKey {
    /// Create an ordering key from an Event.
    pub fn from_event(event: &Event) -> Self {
        EventOrderingKey {
            occurred_at: event.occurred_at.as_ms(),
            event_id: event.event_id.clone(),
            role: event.action.role(),
        }
    }
}

/// Sort events deterministically in place.
pub fn sort_events_deterministic(events: &mut [Event]) {
    events.sort_by(|a, b| {
        let key_a = EventOrderingKey::from_event(a);
        let key_b = EventOrderingKey::from_event(b);
        key_a.cmp(&key_b)
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Action, Decimal, MarketId, OutcomeToken, TimeMs, Wallet};

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    fn trade(event_id: &str, time_ms: i64, role: TradeRole) -> Event {
        Event {
            event_id: event_id.to_string(),
            wallet: Wallet::new("0xabc"),
            occurred_at: TimeMs::new(time_ms),
            action: Action::Buy {
                token: OutcomeToken::new(MarketId::new("0xcond"), 0),
                quantity: d("1"),
                price: d("0.5"),
                role,
            },
        }
    }

    #[test]
    fn test_orders_by_time_first() {
        let mut events = vec![
            trade("0xb", 2000, TradeRole::Taker),
            trade("0xa", 1000, TradeRole::Taker),
        ];
        sort_events_deterministic(&mut events);
        assert_eq!(events[0].event_id, "0xa");
        assert_eq!(events[1].event_id, "0xb");
    }

    #[test]
    fn test_same_time_orders_by_event_id() {
        let mut events = vec![
            trade("0xb", 1000, TradeRole::Taker),
            trade("0xa", 1000, TradeRole::Taker),
        ];
        sort_events_deterministic(&mut events);
        assert_eq!(events[0].event_id, "0xa");
    }

    #[test]
    fn test_same_event_orders_maker_before_taker() {
        let mut events = vec![
            trade("0xa", 1000, TradeRole::Taker),
            trade("0xa", 1000, TradeRole::Maker),
        ];
        sort_events_deterministic(&mut events);
        assert_eq!(events[0].action.role(), Some(TradeRole::Maker));
        assert_eq!(events[1].action.role(), Some(TradeRole::Taker));
    }

    #[test]
    fn test_sort_is_idempotent() {
        let mut once = vec![
            trade("0xc", 1500, TradeRole::Maker),
            trade("0xa", 1000, TradeRole::Taker),
            trade("0xb", 1500, TradeRole::Taker),
        ];
        sort_events_deterministic(&mut once);
        let mut twice = once.clone();
        sort_events_deterministic(&mut twice);
        assert_eq!(once, twice);
    }
}
