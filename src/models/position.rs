//! Trader positions grouped by market.

use std::collections::HashMap;

use crate::api::{Holding, Side};

/// One trader's open position in one market, flattened out of an event
/// holding.
#[derive(Debug, Clone, PartialEq)]
pub struct TraderPosition {
    pub nickname: String,
    pub event_ticker: String,
    pub series_ticker: String,
    pub market_ticker: String,
    /// Positive holds "yes", negative holds "no".
    pub signed_open_position: i64,
    pub pnl: f64,
}

impl TraderPosition {
    pub fn side(&self) -> Side {
        Side::from_signed_position(self.signed_open_position)
    }
}

/// Every trader position observed in one market during a run.
#[derive(Debug, Clone)]
pub struct MarketGroup {
    pub market_ticker: String,
    /// In trader discovery order.
    pub positions: Vec<TraderPosition>,
}

impl MarketGroup {
    /// Number of distinct traders in this market.
    pub fn quorum_size(&self) -> usize {
        self.positions.len()
    }

    /// Side of the first trader observed in this market.
    pub fn representative_side(&self) -> Side {
        self.positions
            .first()
            .map(TraderPosition::side)
            .unwrap_or(Side::No)
    }

    pub fn nicknames(&self) -> Vec<&str> {
        self.positions.iter().map(|p| p.nickname.as_str()).collect()
    }
}

/// Market ticker -> trader positions, in first-seen order. Rebuilt from
/// scratch every run.
#[derive(Debug, Clone, Default)]
pub struct MarketGroups {
    groups: Vec<MarketGroup>,
    index: HashMap<String, usize>,
}

impl MarketGroups {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flatten a trader's event holdings into per-market entries.
    /// Returns the number of positions added.
    pub fn add_holdings(&mut self, nickname: &str, holdings: &[Holding]) -> usize {
        let mut added = 0;
        for holding in holdings {
            for market in &holding.market_holdings {
                let position = TraderPosition {
                    nickname: nickname.to_string(),
                    event_ticker: holding.event_ticker.clone(),
                    series_ticker: holding.series_ticker.clone(),
                    market_ticker: market.market_ticker.clone(),
                    signed_open_position: market.signed_open_position,
                    pnl: market.pnl,
                };
                if self.insert(position) {
                    added += 1;
                }
            }
        }
        added
    }

    /// Insert a position. A trader counts once per market; repeats are
    /// dropped and return false.
    pub fn insert(&mut self, position: TraderPosition) -> bool {
        match self.index.get(&position.market_ticker) {
            Some(&i) => {
                let group = &mut self.groups[i];
                if group.positions.iter().any(|p| p.nickname == position.nickname) {
                    return false;
                }
                group.positions.push(position);
            }
            None => {
                self.index.insert(position.market_ticker.clone(), self.groups.len());
                self.groups.push(MarketGroup {
                    market_ticker: position.market_ticker.clone(),
                    positions: vec![position],
                });
            }
        }
        true
    }

    #[cfg(test)]
    pub fn get(&self, market_ticker: &str) -> Option<&MarketGroup> {
        self.index.get(market_ticker).map(|&i| &self.groups[i])
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    #[cfg(test)]
    pub fn iter(&self) -> impl Iterator<Item = &MarketGroup> {
        self.groups.iter()
    }

    /// Keep only markets held by at least `quorum` traders.
    pub fn with_quorum(self, quorum: usize) -> Vec<MarketGroup> {
        self.groups
            .into_iter()
            .filter(|g| g.quorum_size() >= quorum)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MarketHolding;

    fn holding(event: &str, markets: &[(&str, i64)]) -> Holding {
        Holding {
            event_ticker: event.to_string(),
            series_ticker: format!("S-{}", event),
            total_absolute_position: markets.iter().map(|(_, p)| p.abs()).sum(),
            market_holdings: markets
                .iter()
                .map(|(ticker, pos)| MarketHolding {
                    market_id: String::new(),
                    market_ticker: ticker.to_string(),
                    signed_open_position: *pos,
                    pnl: 0.0,
                })
                .collect(),
        }
    }

    #[test]
    fn test_groups_keep_discovery_order() {
        let mut groups = MarketGroups::new();
        groups.add_holdings("A", &[holding("E1", &[("E1-X", 5), ("E1-Y", -2)])]);
        groups.add_holdings("B", &[holding("E1", &[("E1-Y", 3)]), holding("E2", &[("E2-Z", 1)])]);

        let tickers: Vec<_> = groups.iter().map(|g| g.market_ticker.as_str()).collect();
        assert_eq!(tickers, vec!["E1-X", "E1-Y", "E2-Z"]);
        assert_eq!(groups.get("E1-Y").unwrap().nicknames(), vec!["A", "B"]);
        assert_eq!(groups.get("E1-Y").unwrap().positions[1].series_ticker, "S-E1");
    }

    #[test]
    fn test_quorum_filter() {
        let mut groups = MarketGroups::new();
        groups.add_holdings("A", &[holding("E", &[("M1", 1), ("M2", 1)])]);
        groups.add_holdings("B", &[holding("E", &[("M1", -1)])]);
        groups.add_holdings("C", &[holding("E", &[("M1", 1), ("M2", 1)])]);

        let two = groups.clone().with_quorum(2);
        assert_eq!(two.len(), 2);

        let three = groups.with_quorum(3);
        assert_eq!(three.len(), 1);
        assert_eq!(three[0].market_ticker, "M1");
        assert_eq!(three[0].quorum_size(), 3);
    }

    #[test]
    fn test_trader_counted_once_per_market() {
        let mut groups = MarketGroups::new();
        let added = groups.add_holdings(
            "A",
            &[holding("E", &[("M1", 1)]), holding("E", &[("M1", 4)])],
        );

        assert_eq!(added, 1);
        assert_eq!(groups.get("M1").unwrap().quorum_size(), 1);
    }

    #[test]
    fn test_representative_side_uses_first_trader() {
        let mut groups = MarketGroups::new();
        groups.add_holdings("A", &[holding("E", &[("OTHER", -9), ("M1", 4)])]);
        groups.add_holdings("B", &[holding("E", &[("M1", -4)])]);
        assert_eq!(groups.get("M1").unwrap().representative_side(), Side::Yes);

        let mut groups = MarketGroups::new();
        groups.add_holdings("A", &[holding("E", &[("M1", 0)])]);
        assert_eq!(groups.get("M1").unwrap().representative_side(), Side::No);
    }
}
