use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{after, bounded, select, tick, Receiver, Sender};
use parking_lot::{Mutex, MutexGuard};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use setgame::{ActorId, Table, Ui};
use tracing::{debug, info, warn};

use crate::{Arbiter, CandidateSet, GameConfig, StopSignal, CANDIDATE_SIZE};

/// How many key presses a player buffers before dropping new ones.
pub const INPUT_CAPACITY: usize = CANDIDATE_SIZE;

/// The dealer's verdict on a player's last candidate, until the player has served it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FreezeState {
    #[default]
    Active,
    AwaitingPointFreeze,
    AwaitingPenaltyFreeze,
}

/// What a single key press did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Toggle {
    Added,
    Removed,
    /// The card was added and the candidate is now complete.
    Completed,
    /// Empty slot, or a full candidate that does not contain the card.
    Ignored,
}

/// State the player shares with the dealer, guarded by the player's own lock.
#[derive(Debug, Default)]
pub(crate) struct ActorState {
    pub(crate) candidate: CandidateSet,
    pub(crate) freeze: FreezeState,
}

/// The part of a player that other threads talk to.
///
/// Key presses go in through [`ActorHandle::key_pressed`]; the dealer reads and
/// purges the candidate, posts verdicts, and wakes the player through it.
pub struct ActorHandle {
    id: ActorId,
    human: bool,
    state: Mutex<ActorState>,
    // Written only by the player's own thread.
    score: AtomicU32,
    frozen: AtomicBool,
    inputs: Sender<usize>,
    wake: Sender<()>,
    stop: StopSignal,
}

impl ActorHandle {
    pub fn id(&self) -> ActorId {
        self.id
    }

    pub fn is_human(&self) -> bool {
        self.human
    }

    /// Buffers a key press for `slot`.
    ///
    /// Returns `false` if the press was dropped, because the player is frozen
    /// or already has [`INPUT_CAPACITY`] presses pending.
    pub fn key_pressed(&self, slot: usize) -> bool {
        if self.is_frozen() {
            return false;
        }
        self.inputs.try_send(slot).is_ok()
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen.load(Ordering::SeqCst) || self.state.lock().freeze != FreezeState::Active
    }

    pub fn score(&self) -> u32 {
        self.score.load(Ordering::SeqCst)
    }

    pub fn candidate(&self) -> CandidateSet {
        self.state.lock().candidate
    }

    pub fn freeze_state(&self) -> FreezeState {
        self.state.lock().freeze
    }

    /// Stops the player's threads. Interrupts whatever they are waiting on.
    pub fn terminate(&self) {
        self.stop.trigger();
    }

    pub fn is_terminated(&self) -> bool {
        self.stop.is_stopped()
    }

    pub(crate) fn state(&self) -> MutexGuard<'_, ActorState> {
        self.state.lock()
    }

    /// At most one wake-up is kept pending; waking a player that has one is a no-op.
    pub(crate) fn wake(&self) {
        let _ = self.wake.try_send(());
    }
}

#[derive(Clone, Copy, Debug)]
struct Timing {
    point_freeze: Duration,
    penalty_freeze: Duration,
    display_tick: Duration,
    key_delay: Duration,
    table_size: usize,
}

enum Event {
    Input(usize),
    Wake,
    Stop,
}

/// A player's own thread: turns key presses into tokens and candidates.
pub struct Actor {
    handle: Arc<ActorHandle>,
    inputs: Receiver<usize>,
    wake: Receiver<()>,
    table: Arc<Mutex<Table>>,
    arbiter: Arc<dyn Arbiter>,
    ui: Arc<dyn Ui>,
    timing: Timing,
    rng: StdRng,
}

impl Actor {
    pub fn new(
        id: ActorId,
        human: bool,
        config: &GameConfig,
        table: Arc<Mutex<Table>>,
        arbiter: Arc<dyn Arbiter>,
        ui: Arc<dyn Ui>,
        rng: StdRng,
    ) -> Self {
        let (input_tx, inputs) = bounded(INPUT_CAPACITY);
        let (wake_tx, wake) = bounded(1);
        let handle = Arc::new(ActorHandle {
            id,
            human,
            state: Mutex::new(ActorState::default()),
            score: AtomicU32::new(0),
            frozen: AtomicBool::new(false),
            inputs: input_tx,
            wake: wake_tx,
            stop: StopSignal::new(),
        });
        Self {
            handle,
            inputs,
            wake,
            table,
            arbiter,
            ui,
            timing: Timing {
                point_freeze: config.point_freeze(),
                penalty_freeze: config.penalty_freeze(),
                display_tick: config.display_tick(),
                key_delay: config.computer_key_delay(),
                table_size: config.table_size(),
            },
            rng,
        }
    }

    pub fn handle(&self) -> &Arc<ActorHandle> {
        &self.handle
    }

    /// The player's main loop. Returns once the player is terminated and its
    /// computer input thread, if any, has finished.
    pub fn run(mut self) {
        let id = self.handle.id;
        info!(actor = id, human = self.handle.human, "Player starting");
        let generator = if self.handle.human {
            None
        } else {
            self.spawn_generator()
        };

        while !self.handle.stop.is_stopped() {
            if self.step().is_break() {
                break;
            }
        }
        self.settle_verdict();

        if let Some(generator) = generator {
            if generator.join().is_err() {
                warn!(actor = id, "Computer input thread panicked");
            }
        }
        info!(actor = id, "Player terminated");
    }

    /// Feeds random key presses to a computer player until it is terminated.
    fn spawn_generator(&mut self) -> Option<JoinHandle<()>> {
        let handle = Arc::clone(&self.handle);
        let mut rng = StdRng::seed_from_u64(self.rng.gen());
        let Timing {
            key_delay,
            table_size,
            ..
        } = self.timing;
        let spawned = thread::Builder::new()
            .name(format!("computer-{}", handle.id))
            .spawn(move || {
                debug!(actor = handle.id, "Computer input starting");
                while !handle.stop.is_stopped() {
                    handle.key_pressed(rng.gen_range(0..table_size));
                    if !handle.stop.sleep(key_delay) {
                        break;
                    }
                }
                debug!(actor = handle.id, "Computer input terminated");
            });
        match spawned {
            Ok(generator) => Some(generator),
            Err(err) => {
                warn!(actor = self.handle.id, %err, "Could not start computer input thread");
                None
            }
        }
    }

    fn step(&mut self) -> ControlFlow<()> {
        let event = select! {
            recv(self.inputs) -> slot => slot.map_or(Event::Stop, Event::Input),
            recv(self.wake) -> _ => Event::Wake,
            recv(self.handle.stop.receiver()) -> _ => Event::Stop,
        };
        match event {
            Event::Input(slot) => {
                // A verdict may have arrived without a wake-up being awaited
                let flow = self.apply_verdict();
                if flow.is_break() {
                    return flow;
                }
                let flow = self.handle_input(slot);
                if flow.is_break() {
                    return flow;
                }
            }
            Event::Wake => {}
            Event::Stop => return ControlFlow::Break(()),
        }
        self.apply_verdict()
    }

    pub(crate) fn handle_input(&mut self, slot: usize) -> ControlFlow<()> {
        match self.toggle(slot) {
            Toggle::Completed => self.await_validation(),
            _ => ControlFlow::Continue(()),
        }
    }

    /// Toggles this player's token on `slot` and the slot's card in the candidate.
    pub(crate) fn toggle(&self, slot: usize) -> Toggle {
        let id = self.handle.id;
        let mut table = self.table.lock();
        let Some(card) = table.slot_to_card(slot) else {
            return Toggle::Ignored;
        };
        let mut state = self.handle.state();
        if state.candidate.remove(card) {
            table.remove_token(id, slot);
            debug!(actor = id, slot, %card, "Token removed");
            return Toggle::Removed;
        }
        if state.candidate.is_full() {
            return Toggle::Ignored;
        }
        if let Err(err) = table.place_token(id, slot) {
            warn!(actor = id, %err, "Could not place token");
            return Toggle::Ignored;
        }
        state.candidate.insert(card);
        debug!(actor = id, slot, %card, "Token placed");
        if state.candidate.is_full() {
            Toggle::Completed
        } else {
            Toggle::Added
        }
    }

    /// Hands the complete candidate to the dealer and waits until it answers.
    fn await_validation(&self) -> ControlFlow<()> {
        // Wake-ups from earlier rounds must not be mistaken for the answer
        while self.wake.try_recv().is_ok() {}
        self.arbiter.submit_candidate(self.handle.id);
        select! {
            recv(self.wake) -> _ => ControlFlow::Continue(()),
            recv(self.handle.stop.receiver()) -> _ => ControlFlow::Break(()),
        }
    }

    /// Serves a pending point or penalty, then returns to [`FreezeState::Active`].
    pub(crate) fn apply_verdict(&self) -> ControlFlow<()> {
        let verdict = self.handle.state().freeze;
        let flow = match verdict {
            FreezeState::Active => return ControlFlow::Continue(()),
            FreezeState::AwaitingPointFreeze => self.point(),
            FreezeState::AwaitingPenaltyFreeze => self.penalty(),
        };
        self.handle.state().freeze = FreezeState::Active;
        flow
    }

    /// A point granted right before the stop still counts, without the freeze.
    fn settle_verdict(&self) {
        let mut state = self.handle.state();
        if state.freeze == FreezeState::AwaitingPointFreeze {
            let score = self.handle.score.fetch_add(1, Ordering::SeqCst) + 1;
            self.ui.set_score(self.handle.id, score);
        }
        state.freeze = FreezeState::Active;
    }

    fn point(&self) -> ControlFlow<()> {
        let id = self.handle.id;
        // Counting and leaving AwaitingPointFreeze happen as one step under the
        // player's lock; the frozen flag keeps key presses out until the freeze ends.
        let score = {
            let mut state = self.handle.state();
            self.handle.frozen.store(true, Ordering::SeqCst);
            state.freeze = FreezeState::Active;
            self.handle.score.fetch_add(1, Ordering::SeqCst) + 1
        };
        info!(actor = id, score, "Point");
        self.ui.set_score(id, score);
        self.freeze(self.timing.point_freeze)
    }

    fn penalty(&self) -> ControlFlow<()> {
        debug!(actor = self.handle.id, "Penalty");
        let flow = self.freeze(self.timing.penalty_freeze);
        self.withdraw_candidate();
        flow
    }

    /// Takes back every token of the rejected candidate.
    fn withdraw_candidate(&self) {
        let id = self.handle.id;
        let mut table = self.table.lock();
        let mut state = self.handle.state();
        for card in state.candidate.iter() {
            if let Some(slot) = table.card_to_slot(card) {
                table.remove_token(id, slot);
            }
        }
        state.candidate.clear();
    }

    /// Blocks the player for `duration`, refreshing the display every tick.
    fn freeze(&self, duration: Duration) -> ControlFlow<()> {
        let id = self.handle.id;
        self.handle.frozen.store(true, Ordering::SeqCst);
        let deadline = Instant::now() + duration;
        let done = after(duration);
        let ticker = tick(self.timing.display_tick);
        self.ui.set_freeze(id, duration);
        let flow = loop {
            select! {
                recv(done) -> _ => break ControlFlow::Continue(()),
                recv(ticker) -> _ => {
                    self.ui.set_freeze(id, deadline.saturating_duration_since(Instant::now()));
                },
                recv(self.handle.stop.receiver()) -> _ => break ControlFlow::Break(()),
            }
        };
        self.ui.set_freeze(id, Duration::ZERO);
        self.handle.frozen.store(false, Ordering::SeqCst);
        flow
    }
}
