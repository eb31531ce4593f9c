//! Leaderboard traders merged across time periods.

use std::collections::HashSet;

use crate::api::LeaderboardEntry;

/// Ordered, de-duplicated list of trader nicknames.
///
/// Nicknames compare as exact, case-sensitive strings. The first sighting
/// fixes a trader's position in the roster.
#[derive(Debug, Clone, Default)]
pub struct TraderRoster {
    nicknames: Vec<String>,
    seen: HashSet<String>,
}

impl TraderRoster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a nickname; returns false if it was already present.
    pub fn add(&mut self, nickname: &str) -> bool {
        if self.seen.contains(nickname) {
            return false;
        }
        self.seen.insert(nickname.to_string());
        self.nicknames.push(nickname.to_string());
        true
    }

    /// Merge one leaderboard slice, returning how many traders were new.
    pub fn merge(&mut self, entries: &[LeaderboardEntry]) -> usize {
        entries.iter().filter(|e| self.add(&e.nickname)).count()
    }

    pub fn len(&self) -> usize {
        self.nicknames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nicknames.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.nicknames.iter().map(String::as_str)
    }
}
