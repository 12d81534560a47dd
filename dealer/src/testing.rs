use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use setgame::{ActorId, Card, MatchRule, Table, Ui};

use crate::StopSignal;

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum UiEvent {
    PlaceCard { card: Card, slot: usize },
    RemoveCard { slot: usize },
    PlaceToken { actor: ActorId, slot: usize },
    RemoveToken { actor: ActorId, slot: usize },
    RemoveAllTokens,
    Countdown { remaining: Duration, urgent: bool },
    Score { actor: ActorId, score: u32 },
    Freeze { actor: ActorId, remaining: Duration },
    Hint { slots: [usize; 3] },
    Winners(Vec<ActorId>),
}

/// A display that remembers everything it was asked to show.
#[derive(Default)]
pub(crate) struct RecordingUi {
    events: Mutex<Vec<UiEvent>>,
    stop_on_removal: Mutex<Option<StopSignal>>,
}

impl RecordingUi {
    /// Triggers `stop` whenever a card is taken off the table from now on.
    pub(crate) fn stop_on_card_removal(&self, stop: StopSignal) {
        *self.stop_on_removal.lock() = Some(stop);
    }

    pub(crate) fn events(&self) -> Vec<UiEvent> {
        self.events.lock().clone()
    }

    pub(crate) fn count(&self, predicate: impl Fn(&UiEvent) -> bool) -> usize {
        self.events.lock().iter().filter(|event| predicate(event)).count()
    }

    fn push(&self, event: UiEvent) {
        self.events.lock().push(event);
    }
}

impl Ui for RecordingUi {
    fn place_card(&self, card: Card, slot: usize) {
        self.push(UiEvent::PlaceCard { card, slot });
    }

    fn remove_card(&self, slot: usize) {
        self.push(UiEvent::RemoveCard { slot });
        if let Some(stop) = &*self.stop_on_removal.lock() {
            stop.trigger();
        }
    }

    fn place_token(&self, actor: ActorId, slot: usize) {
        self.push(UiEvent::PlaceToken { actor, slot });
    }

    fn remove_token(&self, actor: ActorId, slot: usize) {
        self.push(UiEvent::RemoveToken { actor, slot });
    }

    fn remove_all_tokens(&self) {
        self.push(UiEvent::RemoveAllTokens);
    }

    fn set_countdown(&self, remaining: Duration, urgent: bool) {
        self.push(UiEvent::Countdown { remaining, urgent });
    }

    fn set_score(&self, actor: ActorId, score: u32) {
        self.push(UiEvent::Score { actor, score });
    }

    fn set_freeze(&self, actor: ActorId, remaining: Duration) {
        self.push(UiEvent::Freeze { actor, remaining });
    }

    fn show_hint(&self, slots: [usize; 3], _cards: [Card; 3]) {
        self.push(UiEvent::Hint { slots });
    }

    fn announce_winners(&self, winners: &[ActorId]) {
        self.push(UiEvent::Winners(winners.to_vec()));
    }
}

/// A match rule that gives the same answer for every triple.
pub(crate) struct FixedRule {
    answer: AtomicBool,
}

impl FixedRule {
    pub(crate) fn new(answer: bool) -> Self {
        Self {
            answer: AtomicBool::new(answer),
        }
    }
}

impl MatchRule for FixedRule {
    fn is_match(&self, _cards: &[Card; 3]) -> bool {
        self.answer.load(Ordering::SeqCst)
    }
}

/// A table of `size` slots with `cards` dealt into the first slots.
pub(crate) fn table_with(size: usize, cards: &[Card], ui: Arc<dyn Ui>) -> Arc<Mutex<Table>> {
    let mut table = Table::new(size, ui);
    for (slot, &card) in cards.iter().enumerate() {
        table.place_card(card, slot).unwrap();
    }
    Arc::new(Mutex::new(table))
}
