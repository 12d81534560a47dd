use std::time::Duration;

use crate::{ActorId, Card};

/// Everything the game shows to its players.
///
/// Implementations are called from the dealer thread and from every player
/// thread, often while the table lock is held, so they must not block.
pub trait Ui: Send + Sync {
    fn place_card(&self, card: Card, slot: usize);
    fn remove_card(&self, slot: usize);
    fn place_token(&self, actor: ActorId, slot: usize);
    fn remove_token(&self, actor: ActorId, slot: usize);
    fn remove_all_tokens(&self);
    /// `urgent` is set once the countdown drops below the warning threshold.
    fn set_countdown(&self, remaining: Duration, urgent: bool);
    fn set_score(&self, actor: ActorId, score: u32);
    /// A remaining time of zero means the player is no longer frozen.
    fn set_freeze(&self, actor: ActorId, remaining: Duration);
    fn show_hint(&self, slots: [usize; 3], cards: [Card; 3]);
    fn announce_winners(&self, winners: &[ActorId]);
}
