use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crossbeam_channel::{at, select, unbounded, Receiver, Sender};
use parking_lot::Mutex;
use setgame::ActorId;

use crate::StopSignal;

/// What a player may ask of the dealer.
pub trait Arbiter: Send + Sync {
    /// Asks for the player's complete candidate to be validated.
    ///
    /// Returns `false` if a request by the same player is still pending.
    fn submit_candidate(&self, actor: ActorId) -> bool;
}

/// The FIFO handoff from players with a complete candidate to the dealer.
///
/// Each player is in the queue at most once.
pub struct RendezvousQueue {
    entries: Mutex<VecDeque<ActorId>>,
    // One message per successful enqueue, so a waiting dealer can `select!` on arrivals.
    ready_tx: Sender<()>,
    ready_rx: Receiver<()>,
}

impl RendezvousQueue {
    pub fn new() -> Self {
        let (ready_tx, ready_rx) = unbounded();
        Self {
            entries: Mutex::new(VecDeque::new()),
            ready_tx,
            ready_rx,
        }
    }

    /// Appends `actor` unless it is already waiting. Returns whether it was appended.
    pub fn enqueue(&self, actor: ActorId) -> bool {
        let mut entries = self.entries.lock();
        if entries.contains(&actor) {
            return false;
        }
        entries.push_back(actor);
        // The receiver lives in `self`, so this cannot fail.
        let _ = self.ready_tx.send(());
        true
    }

    /// Removes and returns the head of the queue, waiting at most `timeout`
    /// for one to arrive. Returns `None` on timeout or once `stop` fires.
    pub fn dequeue_timeout(&self, timeout: Duration, stop: &StopSignal) -> Option<ActorId> {
        let deadline = Instant::now() + timeout;
        loop {
            if stop.is_stopped() {
                return None;
            }
            if let Some(actor) = self.entries.lock().pop_front() {
                return Some(actor);
            }
            select! {
                recv(self.ready_rx) -> _ => {},
                recv(stop.receiver()) -> _ => return None,
                recv(at(deadline)) -> _ => return None,
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn contains(&self, actor: ActorId) -> bool {
        self.entries.lock().contains(&actor)
    }
}

impl Default for RendezvousQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl Arbiter for RendezvousQueue {
    fn submit_candidate(&self, actor: ActorId) -> bool {
        self.enqueue(actor)
    }
}
