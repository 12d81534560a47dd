use std::str::FromStr;

/// Number of distinct values a single feature can take.
pub const FEATURE_SIZE: u8 = 3;

/// The largest number of features a card may have.
///
/// With five features the deck has 243 cards, which still fits in a `u8`.
pub const MAX_FEATURE_COUNT: u32 = 5;

/// A card in a deck of `3^feature_count` cards.
///
/// The card's identifier doubles as its encoding: feature `i` is the `i`-th
/// base-3 digit of the identifier, least significant digit first.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Card(pub u8);

impl Card {
    /// The value of the feature with index `feature`.
    pub fn feature(self, feature: u32) -> u8 {
        let mut id = self.0;
        for _ in 0..feature {
            id /= FEATURE_SIZE;
        }
        id % FEATURE_SIZE
    }

    /// All feature values of this card, starting with feature 0.
    pub fn features(self, feature_count: u32) -> Vec<u8> {
        (0..feature_count).map(|f| self.feature(f)).collect()
    }

    /// Builds a card out of its feature values, feature 0 first.
    ///
    /// Returns `None` if a value is out of range or there are too many features.
    pub fn from_features(features: &[u8]) -> Option<Self> {
        if features.len() > MAX_FEATURE_COUNT as usize {
            return None;
        }
        let mut id: u8 = 0;
        for &value in features.iter().rev() {
            if value >= FEATURE_SIZE {
                return None;
            }
            id = id * FEATURE_SIZE + value;
        }
        Some(Card(id))
    }
}

impl std::fmt::Display for Card {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Number of cards in a deck where every card has `feature_count` features.
pub fn deck_size(feature_count: u32) -> usize {
    (FEATURE_SIZE as usize).pow(feature_count)
}

/// Every card of the deck, in ascending order.
pub fn full_deck(feature_count: u32) -> Vec<Card> {
    (0..deck_size(feature_count))
        .filter_map(|id| u8::try_from(id).ok())
        .map(Card)
        .collect()
}

/// The error type for the [`FromStr`] instance of [`Card`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CardFromStrErr {
    Empty,
    TooManyFeatures,
    InvalidFeature,
}

impl std::fmt::Display for CardFromStrErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CardFromStrErr::Empty => write!(f, "A card needs at least one feature"),
            CardFromStrErr::TooManyFeatures => {
                write!(f, "A card has at most {} features", MAX_FEATURE_COUNT)
            }
            CardFromStrErr::InvalidFeature => write!(f, "Feature values must be 0, 1 or 2"),
        }
    }
}

impl std::error::Error for CardFromStrErr {}

/// Parses the feature digits of a card, feature 0 first, e.g. `"0120"`.
impl FromStr for Card {
    type Err = CardFromStrErr;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(CardFromStrErr::Empty);
        }
        let features = s
            .chars()
            .map(|c| match c {
                '0' => Ok(0),
                '1' => Ok(1),
                '2' => Ok(2),
                _ => Err(CardFromStrErr::InvalidFeature),
            })
            .collect::<Result<Vec<u8>, _>>()?;
        Card::from_features(&features).ok_or(CardFromStrErr::TooManyFeatures)
    }
}

/// Shorthand for creating cards from their feature digits.
///
/// This macro is just calling the [`FromStr`] instance of [`Card`].
/// ```
/// # use setgame::{card, Card};
/// assert_eq!(card!("2100"), Card(5));
/// ```
#[macro_export]
macro_rules! card {
    ($features:literal) => {
        <$crate::Card as std::str::FromStr>::from_str($features)
            .expect("Invalid feature string given to card! macro")
    };
}
// The import is for using the macro in other modules, see https://stackoverflow.com/a/31749071/1726797
#[allow(unused_imports)]
pub(crate) use card;
