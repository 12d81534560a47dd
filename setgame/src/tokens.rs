use std::iter::FusedIterator;

/// Identifies a player. Also the index of the player in the dealer's list.
pub type ActorId = usize;

/// The most players that can put tokens on one table.
pub const MAX_ACTORS: usize = 64;

/// A compact set of the players that have a token on one slot.
///
/// ```
/// use setgame::TokenSet;
/// let mut set = TokenSet::new();
/// // This is an immutable data type, so functions like `insert` return a new `TokenSet`.
/// set = set.insert(3);
/// set = set.insert(3); // Inserting a second time has no effect
/// set = set.insert(0);
/// assert_eq!(Vec::from_iter(set), vec![0, 3]);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TokenSet {
    bits: u64,
}

impl TokenSet {
    /// Creates a new, empty set.
    pub fn new() -> Self {
        Self { bits: 0 }
    }

    pub fn len(self) -> u32 {
        self.bits.count_ones()
    }

    pub fn is_empty(self) -> bool {
        self.bits == 0
    }

    /// Ids at or above [`MAX_ACTORS`] are never contained.
    pub fn contains(self, actor: ActorId) -> bool {
        actor < MAX_ACTORS && (self.bits & (1u64 << actor)) != 0
    }

    /// Ids at or above [`MAX_ACTORS`] are ignored.
    #[must_use] // Because users might expect this to be a mutating method
    pub fn insert(self, actor: ActorId) -> Self {
        if actor >= MAX_ACTORS {
            return self;
        }
        Self {
            bits: self.bits | (1u64 << actor),
        }
    }

    #[must_use] // Because users might expect this to be a mutating method
    pub fn remove(self, actor: ActorId) -> Self {
        if actor >= MAX_ACTORS {
            return self;
        }
        Self {
            bits: self.bits & !(1u64 << actor),
        }
    }
}

impl FromIterator<ActorId> for TokenSet {
    fn from_iter<T: IntoIterator<Item = ActorId>>(iter: T) -> Self {
        iter.into_iter().fold(Self::new(), TokenSet::insert)
    }
}

impl IntoIterator for TokenSet {
    type Item = ActorId;

    type IntoIter = TokenSetIter;

    fn into_iter(self) -> Self::IntoIter {
        TokenSetIter { bits: self.bits }
    }
}

/// Iterator for a [`TokenSet`] that returns player ids in ascending order.
#[derive(Clone, Copy, Debug)]
pub struct TokenSetIter {
    bits: u64,
}

impl Iterator for TokenSetIter {
    type Item = ActorId;

    fn next(&mut self) -> Option<Self::Item> {
        if self.bits == 0 {
            None
        } else {
            // The number of trailing zeros is the player id
            let actor = self.bits.trailing_zeros() as ActorId;
            self.bits ^= 1u64 << actor;
            Some(actor)
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let size = self.bits.count_ones() as usize;
        (size, Some(size))
    }
}

impl ExactSizeIterator for TokenSetIter {}

impl FusedIterator for TokenSetIter {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_ids_are_ignored() {
        let set = TokenSet::new().insert(MAX_ACTORS).insert(63);
        assert_eq!(set.len(), 1);
        assert!(set.contains(63));
        assert!(!set.contains(MAX_ACTORS));
    }

    #[test]
    fn remove_then_iterate() {
        let set = TokenSet::from_iter([5, 1, 9]).remove(1);
        assert_eq!(Vec::from_iter(set), vec![5, 9]);
        assert!(!set.is_empty());
    }
}
