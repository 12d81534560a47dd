use crate::Card;

/// Misuse of the [`Table`](crate::Table).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TableError {
    SlotOutOfBounds { slot: usize },
    SlotOccupied { slot: usize, card: Card },
    SlotEmpty { slot: usize },
    CardAlreadyOnTable { card: Card, slot: usize },
}

impl std::error::Error for TableError {}

impl std::fmt::Display for TableError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TableError::SlotOutOfBounds { slot } =>
                write!(f, "Slot {} does not exist on this table", slot),
            TableError::SlotOccupied { slot, card } =>
                write!(f, "Slot {} is already occupied by card {}", slot, card),
            TableError::SlotEmpty { slot } =>
                write!(f, "Slot {} holds no card", slot),
            TableError::CardAlreadyOnTable { card, slot } =>
                write!(f, "Card {} is already on the table, in slot {}", card, slot),
        }
    }
}
