use setgame::Card;

/// Number of cards in a complete candidate.
pub const CANDIDATE_SIZE: usize = 3;

/// The cards a player has selected so far, in the order they were selected.
///
/// Holds at most [`CANDIDATE_SIZE`] distinct cards. Removing a card closes the
/// gap, so the filled entries are always a prefix.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CandidateSet {
    cards: [Option<Card>; CANDIDATE_SIZE],
    len: usize,
}

impl CandidateSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == CANDIDATE_SIZE
    }

    pub fn contains(&self, card: Card) -> bool {
        self.iter().any(|c| c == card)
    }

    pub fn iter(&self) -> impl Iterator<Item = Card> + '_ {
        self.cards.iter().flatten().copied()
    }

    /// Returns `false` if the set is full or already contains `card`.
    pub fn insert(&mut self, card: Card) -> bool {
        if self.is_full() || self.contains(card) {
            return false;
        }
        self.cards[self.len] = Some(card);
        self.len += 1;
        true
    }

    /// Returns whether `card` was a member.
    pub fn remove(&mut self, card: Card) -> bool {
        let Some(idx) = self.cards[..self.len].iter().position(|&c| c == Some(card)) else {
            return false;
        };
        self.cards[idx..].rotate_left(1);
        self.cards[CANDIDATE_SIZE - 1] = None;
        self.len -= 1;
        true
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// The three cards, if the set is complete.
    pub fn complete(&self) -> Option<[Card; CANDIDATE_SIZE]> {
        match self.cards {
            [Some(a), Some(b), Some(c)] => Some([a, b, c]),
            _ => None,
        }
    }
}
