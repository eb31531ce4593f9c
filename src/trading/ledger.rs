//! Record of markets that have already triggered mirrored orders.

use std::collections::HashMap;

use super::config::DedupPolicy;

/// Outcome of checking a qualifying market against the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerDecision {
    /// Nothing new to mirror.
    Skip { prior: u32 },
    /// The ledger grew by `new_entries`; an order may follow.
    Order { prior: u32, new_entries: u32 },
}

/// Append-only, process-lifetime ledger of triggered markets.
///
/// Each ticker maps to the number of ledger entries it holds. Entries are
/// never removed, so a ticker can only ever move forward.
#[derive(Debug, Clone, Default)]
pub struct OrderedMarketsLedger {
    entries: HashMap<String, u32>,
    total_entries: u64,
}

impl OrderedMarketsLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check a market seen with `quorum_size` traders and record it.
    ///
    /// Counting: entries track how many quorum members were mirrored; only
    /// growth beyond that count is new. Boolean: the first sighting adds one
    /// entry, every later sighting is skipped.
    pub fn record(&mut self, market_ticker: &str, quorum_size: u32, policy: DedupPolicy) -> LedgerDecision {
        let prior = self.trigger_count(market_ticker);

        let new_entries = match policy {
            DedupPolicy::Counting => quorum_size.saturating_sub(prior),
            DedupPolicy::Boolean if prior == 0 => 1,
            DedupPolicy::Boolean => 0,
        };

        if new_entries == 0 {
            return LedgerDecision::Skip { prior };
        }

        *self.entries.entry(market_ticker.to_string()).or_insert(0) += new_entries;
        self.total_entries += u64::from(new_entries);

        LedgerDecision::Order { prior, new_entries }
    }

    /// How many entries this ticker has accumulated.
    pub fn trigger_count(&self, market_ticker: &str) -> u32 {
        self.entries.get(market_ticker).copied().unwrap_or(0)
    }

    /// Total entries across all tickers.
    pub fn len(&self) -> u64 {
        self.total_entries
    }

    pub fn distinct_markets(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counting_same_quorum_is_idempotent() {
        let mut ledger = OrderedMarketsLedger::new();

        assert_eq!(
            ledger.record("MKT-1", 2, DedupPolicy::Counting),
            LedgerDecision::Order { prior: 0, new_entries: 2 }
        );
        for _ in 0..3 {
            assert_eq!(
                ledger.record("MKT-1", 2, DedupPolicy::Counting),
                LedgerDecision::Skip { prior: 2 }
            );
        }
        assert_eq!(ledger.trigger_count("MKT-1"), 2);
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn test_counting_orders_only_growth() {
        let mut ledger = OrderedMarketsLedger::new();
        ledger.record("MKT-1", 2, DedupPolicy::Counting);

        assert_eq!(
            ledger.record("MKT-1", 3, DedupPolicy::Counting),
            LedgerDecision::Order { prior: 2, new_entries: 1 }
        );
        // Shrinking quorum never goes negative.
        assert_eq!(
            ledger.record("MKT-1", 2, DedupPolicy::Counting),
            LedgerDecision::Skip { prior: 3 }
        );
        assert_eq!(
            ledger.record("MKT-1", 3, DedupPolicy::Counting),
            LedgerDecision::Skip { prior: 3 }
        );
        assert_eq!(ledger.len(), 3);
    }

    #[test]
    fn test_boolean_triggers_once() {
        let mut ledger = OrderedMarketsLedger::new();

        assert_eq!(
            ledger.record("MKT-1", 3, DedupPolicy::Boolean),
            LedgerDecision::Order { prior: 0, new_entries: 1 }
        );
        assert_eq!(
            ledger.record("MKT-1", 5, DedupPolicy::Boolean),
            LedgerDecision::Skip { prior: 1 }
        );
        assert!(ledger.trigger_count("MKT-1") > 0);
        assert_eq!(ledger.trigger_count("MKT-2"), 0);
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_tickers_tracked_independently() {
        let mut ledger = OrderedMarketsLedger::new();
        ledger.record("A", 2, DedupPolicy::Counting);
        ledger.record("B", 4, DedupPolicy::Counting);

        assert_eq!(ledger.distinct_markets(), 2);
        assert_eq!(ledger.len(), 6);
        assert_eq!(ledger.trigger_count("B"), 4);
    }
}
