use std::collections::HashMap;
use std::sync::Arc;

use crate::{ActorId, Card, MatchRule, TableError, TokenSet, Ui};

/// The cards laid out in front of the players, and the tokens on them.
///
/// The table keeps its two mappings (slot to card and card to slot) in sync and
/// forwards every change to the [`Ui`]. It does not serialize concurrent
/// callers: the dealer keeps it behind a single lock and every read or write
/// happens while holding it.
pub struct Table {
    /// `None` for slots that currently hold no card.
    slot_to_card: Vec<Option<Card>>,
    card_to_slot: HashMap<Card, usize>,
    /// The players with a token on each slot. Empty slots never carry tokens.
    tokens: Vec<TokenSet>,
    ui: Arc<dyn Ui>,
}

impl Table {
    pub fn new(table_size: usize, ui: Arc<dyn Ui>) -> Self {
        Self {
            slot_to_card: vec![None; table_size],
            card_to_slot: HashMap::with_capacity(table_size),
            tokens: vec![TokenSet::new(); table_size],
            ui,
        }
    }

    pub fn size(&self) -> usize {
        self.slot_to_card.len()
    }

    /// The card in every slot, in slot order.
    pub fn slots(&self) -> &[Option<Card>] {
        &self.slot_to_card
    }

    pub fn slot_to_card(&self, slot: usize) -> Option<Card> {
        self.slot_to_card.get(slot).copied().flatten()
    }

    pub fn card_to_slot(&self, card: Card) -> Option<usize> {
        self.card_to_slot.get(&card).copied()
    }

    pub fn count_cards(&self) -> usize {
        self.card_to_slot.len()
    }

    /// All cards on the table, in slot order.
    pub fn cards(&self) -> Vec<Card> {
        self.slot_to_card.iter().flatten().copied().collect()
    }

    pub fn empty_slots(&self) -> Vec<usize> {
        (0..self.size())
            .filter(|&slot| self.slot_to_card[slot].is_none())
            .collect()
    }

    pub fn tokens(&self, slot: usize) -> TokenSet {
        self.tokens.get(slot).copied().unwrap_or_default()
    }

    pub fn has_token(&self, actor: ActorId, slot: usize) -> bool {
        self.tokens(slot).contains(actor)
    }

    pub fn place_card(&mut self, card: Card, slot: usize) -> Result<(), TableError> {
        let existing = *self
            .slot_to_card
            .get(slot)
            .ok_or(TableError::SlotOutOfBounds { slot })?;
        if let Some(card) = existing {
            return Err(TableError::SlotOccupied { slot, card });
        }
        if let Some(&slot) = self.card_to_slot.get(&card) {
            return Err(TableError::CardAlreadyOnTable { card, slot });
        }
        self.slot_to_card[slot] = Some(card);
        self.card_to_slot.insert(card, slot);
        self.ui.place_card(card, slot);
        Ok(())
    }

    /// Takes the card out of `slot`. Any tokens on the slot are discarded with it.
    pub fn remove_card(&mut self, slot: usize) -> Result<Card, TableError> {
        let card = self
            .slot_to_card
            .get_mut(slot)
            .ok_or(TableError::SlotOutOfBounds { slot })?
            .take()
            .ok_or(TableError::SlotEmpty { slot })?;
        self.card_to_slot.remove(&card);
        for actor in std::mem::take(&mut self.tokens[slot]) {
            self.ui.remove_token(actor, slot);
        }
        self.ui.remove_card(slot);
        Ok(card)
    }

    /// Returns whether the token was newly placed.
    pub fn place_token(&mut self, actor: ActorId, slot: usize) -> Result<bool, TableError> {
        if self.slot_to_card(slot).is_none() {
            return Err(if slot < self.size() {
                TableError::SlotEmpty { slot }
            } else {
                TableError::SlotOutOfBounds { slot }
            });
        }
        let tokens = self.tokens[slot];
        if tokens.contains(actor) {
            return Ok(false);
        }
        self.tokens[slot] = tokens.insert(actor);
        self.ui.place_token(actor, slot);
        Ok(true)
    }

    /// Returns whether there was a token to remove.
    pub fn remove_token(&mut self, actor: ActorId, slot: usize) -> bool {
        match self.tokens.get_mut(slot) {
            Some(tokens) if tokens.contains(actor) => {
                *tokens = tokens.remove(actor);
                self.ui.remove_token(actor, slot);
                true
            }
            _ => false,
        }
    }

    /// Shows every match currently on the table.
    pub fn hints(&self, rule: &dyn MatchRule) {
        for cards in rule.find_matches(&self.cards(), usize::MAX) {
            if let [Some(a), Some(b), Some(c)] = cards.map(|card| self.card_to_slot(card)) {
                self.ui.show_hint([a, b, c], cards);
            }
        }
    }
}
