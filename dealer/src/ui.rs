use std::time::Duration;

use setgame::{ActorId, Card, Ui};
use tracing::{debug, info, trace};

/// Shows the game in the log.
pub struct TracingUi;

impl Ui for TracingUi {
    fn place_card(&self, card: Card, slot: usize) {
        debug!(%card, slot, "Card placed");
    }

    fn remove_card(&self, slot: usize) {
        debug!(slot, "Card removed");
    }

    fn place_token(&self, actor: ActorId, slot: usize) {
        trace!(actor, slot, "Token placed");
    }

    fn remove_token(&self, actor: ActorId, slot: usize) {
        trace!(actor, slot, "Token removed");
    }

    fn remove_all_tokens(&self) {
        debug!("All tokens removed");
    }

    fn set_countdown(&self, remaining: Duration, urgent: bool) {
        let remaining_ms = millis(remaining);
        if urgent {
            debug!(remaining_ms, "Countdown");
        } else {
            trace!(remaining_ms, "Countdown");
        }
    }

    fn set_score(&self, actor: ActorId, score: u32) {
        info!(actor, score, "Score");
    }

    fn set_freeze(&self, actor: ActorId, remaining: Duration) {
        trace!(actor, remaining_ms = millis(remaining), "Freeze");
    }

    fn show_hint(&self, slots: [usize; 3], cards: [Card; 3]) {
        info!(?slots, cards = %format!("{} {} {}", cards[0], cards[1], cards[2]), "Hint");
    }

    fn announce_winners(&self, winners: &[ActorId]) {
        info!(?winners, "Game over");
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
