use std::collections::BTreeSet;

use itertools::Itertools;

use crate::{Card, FEATURE_SIZE};

/// Decides which triples of cards form a match.
///
/// The dealer only ever consults the rule through this trait, so alternative
/// rules (or scripted ones in tests) can be plugged in.
pub trait MatchRule: Send + Sync {
    fn is_match(&self, cards: &[Card; 3]) -> bool;

    /// Up to `limit` matches among `cards`, in the order they are found.
    fn find_matches(&self, cards: &[Card], limit: usize) -> Vec<[Card; 3]> {
        cards
            .iter()
            .copied()
            .tuple_combinations()
            .map(|(a, b, c)| [a, b, c])
            .filter(|triple| self.is_match(triple))
            .take(limit)
            .collect()
    }

    fn any_match_exists(&self, cards: &[Card]) -> bool {
        !self.find_matches(cards, 1).is_empty()
    }
}

/// The standard rule: three distinct cards match if, for every feature,
/// their values are either all equal or all different.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SetRule {
    pub feature_count: u32,
}

impl SetRule {
    pub fn new(feature_count: u32) -> Self {
        Self { feature_count }
    }

    /// The one card that completes a match with `a` and `b`.
    ///
    /// If `a == b`, this is `a` itself, which never forms a match.
    pub fn third_card(&self, a: Card, b: Card) -> Card {
        let mut id: u8 = 0;
        for feature in (0..self.feature_count).rev() {
            // With three values per feature, "all equal or all different" is
            // the same as the values summing to a multiple of three.
            let value = (2 * FEATURE_SIZE - a.feature(feature) - b.feature(feature)) % FEATURE_SIZE;
            id = id * FEATURE_SIZE + value;
        }
        Card(id)
    }
}

impl MatchRule for SetRule {
    fn is_match(&self, cards: &[Card; 3]) -> bool {
        let [a, b, c] = *cards;
        if a == b || b == c || a == c {
            return false;
        }
        (0..self.feature_count)
            .all(|f| (a.feature(f) + b.feature(f) + c.feature(f)) % FEATURE_SIZE == 0)
    }

    fn any_match_exists(&self, cards: &[Card]) -> bool {
        let available: BTreeSet<Card> = cards.iter().copied().collect();
        available
            .iter()
            .tuple_combinations()
            .any(|(&a, &b)| {
                let c = self.third_card(a, b);
                c > b && available.contains(&c)
            })
    }
}
