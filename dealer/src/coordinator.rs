use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use anyhow::Context;
use crossbeam_channel::tick;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use setgame::{full_deck, ActorId, Card, MatchRule, SetRule, Table, Ui};
use tracing::{debug, info, trace, warn};

use crate::{Actor, ActorHandle, FreezeState, GameConfig, RendezvousQueue, StopSignal};

/// What became of one validation request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    /// The candidate was incomplete or one of its cards had left the table.
    Stale,
    Match,
    NoMatch,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GameOutcome {
    /// Indexed by player id.
    pub scores: Vec<u32>,
    /// Every player sharing the top score.
    pub winners: Vec<ActorId>,
}

/// The dealer: deals cards, runs the countdown and judges candidates.
pub struct Coordinator {
    config: GameConfig,
    deck: Vec<Card>,
    table: Arc<Mutex<Table>>,
    actors: Vec<Arc<ActorHandle>>,
    // Handed to their threads by `run`
    runners: Vec<Actor>,
    queue: Arc<RendezvousQueue>,
    rule: Arc<dyn MatchRule>,
    ui: Arc<dyn Ui>,
    stop: StopSignal,
    deadline: Instant,
    rng: StdRng,
}

impl Coordinator {
    /// A game with the full deck and the standard rule.
    pub fn new(config: GameConfig, ui: Arc<dyn Ui>, rng: StdRng) -> Self {
        let deck = full_deck(config.feature_count);
        let rule = Arc::new(SetRule::new(config.feature_count));
        Self::with_deck(config, deck, rule, ui, rng)
    }

    /// Player ids `0..human_players` are human, the rest are computer players.
    pub fn with_deck(
        config: GameConfig,
        deck: Vec<Card>,
        rule: Arc<dyn MatchRule>,
        ui: Arc<dyn Ui>,
        mut rng: StdRng,
    ) -> Self {
        let table = Arc::new(Mutex::new(Table::new(config.table_size(), Arc::clone(&ui))));
        let queue = Arc::new(RendezvousQueue::new());
        let runners: Vec<Actor> = (0..config.players())
            .map(|id| {
                Actor::new(
                    id,
                    id < config.human_players,
                    &config,
                    Arc::clone(&table),
                    queue.clone(),
                    Arc::clone(&ui),
                    StdRng::seed_from_u64(rng.gen()),
                )
            })
            .collect();
        let actors = runners.iter().map(|r| Arc::clone(r.handle())).collect();
        Self {
            deadline: Instant::now() + config.turn_timeout(),
            config,
            deck,
            table,
            actors,
            runners,
            queue,
            rule,
            ui,
            stop: StopSignal::new(),
            rng,
        }
    }

    /// The players, indexed by id. Human players take their input from here.
    pub fn actors(&self) -> &[Arc<ActorHandle>] {
        &self.actors
    }

    /// Triggering the returned signal cuts the current round short and ends
    /// the game. The end-game pause is still served in full.
    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    pub fn deck(&self) -> &[Card] {
        &self.deck
    }

    pub fn table(&self) -> &Arc<Mutex<Table>> {
        &self.table
    }

    /// Plays the game to its end on the calling thread, with every player on
    /// a thread of its own.
    ///
    /// Returns an error only if the player threads could not be started.
    pub fn run(&mut self) -> anyhow::Result<GameOutcome> {
        info!(players = self.actors.len(), "Dealer starting");
        let threads = self.spawn_actors()?;

        while !self.should_finish() {
            self.play_round();
        }
        self.await_granted_points(&threads);
        let winners = self.announce_winners();
        self.terminate();

        for thread in threads {
            if thread.join().is_err() {
                warn!("A player thread panicked");
            }
        }
        info!("Dealer terminated");
        Ok(GameOutcome {
            scores: self.actors.iter().map(|a| a.score()).collect(),
            winners,
        })
    }

    fn spawn_actors(&mut self) -> anyhow::Result<Vec<JoinHandle<()>>> {
        let mut threads = Vec::with_capacity(self.runners.len());
        for runner in std::mem::take(&mut self.runners) {
            let spawned = thread::Builder::new()
                .name(format!("player-{}", runner.handle().id()))
                .spawn(move || runner.run());
            match spawned {
                Ok(thread) => threads.push(thread),
                Err(err) => {
                    self.stop.trigger();
                    self.actors.iter().for_each(|a| a.terminate());
                    for thread in threads {
                        let _ = thread.join();
                    }
                    return Err(err).context("Could not start a player thread");
                }
            }
        }
        Ok(threads)
    }

    fn should_finish(&self) -> bool {
        self.stop.is_stopped() || !self.rule.any_match_exists(&self.deck)
    }

    /// Shuffle, deal, count down, sweep.
    pub(crate) fn play_round(&mut self) {
        info!(deck = self.deck.len(), "Round starting");
        self.deck.shuffle(&mut self.rng);
        {
            let table = Arc::clone(&self.table);
            let mut table = table.lock();
            self.replenish(&mut table);
        }
        self.timer_loop();
        self.update_countdown();
        self.sweep();
    }

    fn timer_loop(&mut self) {
        self.reset_deadline();
        while !self.stop.is_stopped() {
            let now = Instant::now();
            if now >= self.deadline {
                break;
            }
            let wait = self.config.display_tick().min(self.deadline - now);
            if let Some(actor) = self.queue.dequeue_timeout(wait, &self.stop) {
                let verdict = self.validate(actor);
                debug!(actor, ?verdict, "Candidate judged");
                if let Some(handle) = self.actors.get(actor) {
                    handle.wake();
                }
            }
            self.update_countdown();
            let table = Arc::clone(&self.table);
            self.replenish(&mut table.lock());
        }
        // Nobody stays blocked on a validation across the sweep
        for actor in &self.actors {
            actor.wake();
        }
    }

    /// Judges the complete candidate of `actor`. Runs entirely under the table lock.
    pub(crate) fn validate(&mut self, actor: ActorId) -> Verdict {
        let Some(handle) = self.actors.get(actor).cloned() else {
            return Verdict::Stale;
        };
        let table = Arc::clone(&self.table);
        let mut table = table.lock();

        let cards = handle.state().candidate.complete();
        let Some(cards) =
            cards.filter(|cards| cards.iter().all(|&card| table.card_to_slot(card).is_some()))
        else {
            return Verdict::Stale;
        };

        if !self.rule.is_match(&cards) {
            handle.state().freeze = FreezeState::AwaitingPenaltyFreeze;
            return Verdict::NoMatch;
        }

        for card in cards {
            for other in &self.actors {
                other.state().candidate.remove(card);
            }
            if let Some(slot) = table.card_to_slot(card) {
                if let Err(err) = table.remove_card(slot) {
                    warn!(%err, "Could not take a matched card off the table");
                }
            }
        }
        {
            let mut state = handle.state();
            state.candidate.clear();
            state.freeze = FreezeState::AwaitingPointFreeze;
        }
        self.replenish(&mut table);
        self.reset_deadline();
        Verdict::Match
    }

    /// Deals from the top of the deck into every empty slot. Returns whether
    /// any card was dealt.
    fn replenish(&mut self, table: &mut Table) -> bool {
        let mut placed = false;
        for slot in table.empty_slots() {
            if self.deck.is_empty() {
                break;
            }
            let card = self.deck.remove(0);
            match table.place_card(card, slot) {
                Ok(()) => placed = true,
                Err(err) => {
                    warn!(%err, "Could not deal a card");
                    self.deck.push(card);
                }
            }
        }
        if placed && self.config.hints {
            table.hints(self.rule.as_ref());
        }
        placed
    }

    /// Returns every card on the table to the deck and purges them from all candidates.
    pub(crate) fn sweep(&mut self) {
        let table = Arc::clone(&self.table);
        let mut table = table.lock();
        self.ui.remove_all_tokens();
        for slot in 0..table.size() {
            if table.slot_to_card(slot).is_none() {
                continue;
            }
            match table.remove_card(slot) {
                Ok(card) => {
                    self.deck.push(card);
                    for actor in &self.actors {
                        actor.state().candidate.remove(card);
                    }
                }
                Err(err) => warn!(%err, "Could not return a card to the deck"),
            }
        }
        debug!(deck = self.deck.len(), "Table swept");
    }

    fn reset_deadline(&mut self) {
        self.deadline = Instant::now() + self.config.turn_timeout();
    }

    fn update_countdown(&self) {
        let remaining = self.deadline.saturating_duration_since(Instant::now());
        let urgent = remaining < self.config.turn_timeout_warning();
        let remaining_ms = u64::try_from(remaining.as_millis()).unwrap_or(u64::MAX);
        trace!(remaining_ms, urgent, "Countdown");
        self.ui.set_countdown(remaining, urgent);
    }

    /// Waits until every point granted by `validate` has reached its player's
    /// score. Players whose thread has already exited are not waited for.
    fn await_granted_points(&self, threads: &[JoinHandle<()>]) {
        let ticker = tick(self.config.display_tick());
        loop {
            let pending: Vec<&Arc<ActorHandle>> = self
                .actors
                .iter()
                .zip(threads)
                .filter(|(actor, thread)| {
                    !thread.is_finished() && actor.freeze_state() == FreezeState::AwaitingPointFreeze
                })
                .map(|(actor, _)| actor)
                .collect();
            if pending.is_empty() {
                return;
            }
            debug!(pending = pending.len(), "Waiting for granted points");
            for actor in pending {
                actor.wake();
            }
            let _ = ticker.recv();
        }
    }

    fn announce_winners(&self) -> Vec<ActorId> {
        let top = self.actors.iter().map(|a| a.score()).max().unwrap_or(0);
        let winners: Vec<ActorId> = self
            .actors
            .iter()
            .filter(|a| a.score() == top)
            .map(|a| a.id())
            .collect();
        info!(?winners, score = top, "Winners");
        self.ui.announce_winners(&winners);
        winners
    }

    /// Pauses, then stops every player. Does not wait for them.
    ///
    /// The pause is not cut short by the stop signal.
    fn terminate(&self) {
        thread::sleep(self.config.end_game_pause());
        self.stop.trigger();
        for actor in &self.actors {
            actor.terminate();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::testing::{FixedRule, RecordingUi, UiEvent};
    use crate::Toggle;

    fn config(rows: usize, columns: usize, humans: usize) -> GameConfig {
        GameConfig {
            rows,
            columns,
            human_players: humans,
            computer_players: 0,
            point_freeze_ms: 0,
            penalty_freeze_ms: 0,
            end_game_pause_ms: 0,
            display_tick_ms: 5,
            ..GameConfig::default()
        }
    }

    fn cards(ids: &[u8]) -> Vec<Card> {
        ids.iter().copied().map(Card).collect()
    }

    fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
        let started = Instant::now();
        while !condition() {
            if started.elapsed() > Duration::from_secs(10) {
                return false;
            }
            thread::sleep(Duration::from_millis(1));
        }
        true
    }

    /// Ends a game that would otherwise run forever if a test thread fails.
    fn watchdog(stop: StopSignal) -> JoinHandle<()> {
        thread::spawn(move || {
            if stop.sleep(Duration::from_secs(20)) {
                stop.trigger();
            }
        })
    }

    fn scripted(config: GameConfig, deck: &[u8], seed: u64) -> (Coordinator, Arc<RecordingUi>) {
        let ui = Arc::new(RecordingUi::default());
        let coordinator = Coordinator::with_deck(
            config,
            cards(deck),
            Arc::new(FixedRule::new(true)),
            ui.clone(),
            StdRng::seed_from_u64(seed),
        );
        (coordinator, ui)
    }

    fn dealt(
        config: GameConfig,
        deck: &[u8],
        answer: bool,
    ) -> (Coordinator, Arc<RecordingUi>) {
        let ui = Arc::new(RecordingUi::default());
        let mut coordinator = Coordinator::with_deck(
            config,
            cards(deck),
            Arc::new(FixedRule::new(answer)),
            ui.clone(),
            StdRng::seed_from_u64(7),
        );
        let table = Arc::clone(&coordinator.table);
        coordinator.replenish(&mut table.lock());
        (coordinator, ui)
    }

    #[test]
    fn match_empties_slots_and_scores() {
        let (mut coordinator, _ui) = dealt(config(2, 2, 1), &[1, 2, 3, 4], true);
        assert_eq!(coordinator.table.lock().cards(), cards(&[1, 2, 3, 4]));
        let actor = &coordinator.runners[0];
        assert_eq!(actor.toggle(0), Toggle::Added);
        assert_eq!(actor.toggle(1), Toggle::Added);
        assert_eq!(actor.toggle(2), Toggle::Completed);

        assert_eq!(coordinator.validate(0), Verdict::Match);
        {
            let table = coordinator.table.lock();
            assert_eq!(table.slots(), &[None, None, None, Some(Card(4))]);
            assert!(table.tokens(0).is_empty());
        }
        assert!(coordinator.deck.is_empty());

        let handle = Arc::clone(&coordinator.actors[0]);
        assert_eq!(handle.freeze_state(), FreezeState::AwaitingPointFreeze);
        assert!(handle.candidate().is_empty());
        // Nothing may be pressed until the point has been served
        assert!(!handle.key_pressed(3));

        assert!(coordinator.runners[0].apply_verdict().is_continue());
        assert_eq!(handle.score(), 1);
        assert_eq!(handle.freeze_state(), FreezeState::Active);
        assert!(handle.key_pressed(3));
    }

    #[test]
    fn matched_slots_are_refilled_and_countdown_reset() {
        let mut config = config(2, 2, 1);
        config.turn_timeout_ms = 60_000;
        let (mut coordinator, _ui) = dealt(config, &[1, 2, 3, 4, 5, 6, 7], true);
        coordinator.deadline = Instant::now();
        for slot in 0..3 {
            coordinator.runners[0].toggle(slot);
        }
        assert_eq!(coordinator.validate(0), Verdict::Match);
        assert_eq!(coordinator.table.lock().cards(), cards(&[5, 6, 7, 4]));
        assert!(coordinator.deadline > Instant::now() + Duration::from_secs(30));
    }

    #[test]
    fn no_match_penalizes_without_touching_the_table() {
        let (mut coordinator, _ui) = dealt(config(2, 2, 1), &[1, 2, 3, 4], false);
        for slot in 0..3 {
            coordinator.runners[0].toggle(slot);
        }
        assert_eq!(coordinator.validate(0), Verdict::NoMatch);
        assert_eq!(coordinator.table.lock().cards(), cards(&[1, 2, 3, 4]));

        let handle = Arc::clone(&coordinator.actors[0]);
        assert_eq!(handle.freeze_state(), FreezeState::AwaitingPenaltyFreeze);
        assert!(coordinator.runners[0].apply_verdict().is_continue());
        assert_eq!(handle.freeze_state(), FreezeState::Active);
        assert_eq!(handle.score(), 0);
        assert!(handle.candidate().is_empty());
        assert_eq!(coordinator.table.lock().cards(), cards(&[1, 2, 3, 4]));
    }

    #[test]
    fn shared_card_makes_the_second_candidate_stale() {
        let (mut coordinator, _ui) = dealt(config(2, 3, 2), &[0, 1, 2, 3, 4, 5], true);
        for slot in [0, 1, 2] {
            coordinator.runners[0].toggle(slot);
        }
        for slot in [2, 3, 4] {
            coordinator.runners[1].toggle(slot);
        }
        coordinator.queue.enqueue(0);
        coordinator.queue.enqueue(1);

        let stop = StopSignal::new();
        let first = coordinator.queue.dequeue_timeout(Duration::ZERO, &stop);
        assert_eq!(first, Some(0));
        assert_eq!(coordinator.validate(0), Verdict::Match);

        let second = Arc::clone(&coordinator.actors[1]);
        assert_eq!(second.candidate().len(), 2);
        assert!(!second.candidate().contains(Card(2)));
        assert!(!coordinator.table.lock().has_token(1, 2));

        assert_eq!(coordinator.queue.dequeue_timeout(Duration::ZERO, &stop), Some(1));
        assert_eq!(coordinator.validate(1), Verdict::Stale);
        assert_eq!(second.freeze_state(), FreezeState::Active);
        assert_eq!(coordinator.table.lock().cards(), cards(&[3, 4, 5]));
    }

    #[test]
    fn validating_an_unknown_player_is_stale() {
        let (mut coordinator, _ui) = dealt(config(2, 2, 1), &[1, 2, 3, 4], true);
        assert_eq!(coordinator.validate(5), Verdict::Stale);
        assert_eq!(coordinator.validate(0), Verdict::Stale);
    }

    #[test]
    fn timeout_sweeps_and_redeals() {
        let mut config = config(3, 4, 1);
        config.turn_timeout_ms = 40;
        let ui = Arc::new(RecordingUi::default());
        let mut coordinator = Coordinator::with_deck(
            config,
            full_deck(4),
            Arc::new(SetRule::new(4)),
            ui.clone(),
            StdRng::seed_from_u64(3),
        );

        coordinator.play_round();
        assert_eq!(coordinator.deck.len(), 81);
        assert_eq!(coordinator.table.lock().count_cards(), 0);
        assert!(coordinator.queue.is_empty());
        assert_eq!(ui.count(|e| matches!(e, UiEvent::PlaceCard { .. })), 12);
        assert_eq!(ui.count(|e| *e == UiEvent::RemoveAllTokens), 1);
        assert!(ui.count(|e| matches!(e, UiEvent::Countdown { .. })) >= 2);

        let first_deal: Vec<_> = coordinator.deck.clone();
        coordinator.play_round();
        assert_eq!(ui.count(|e| matches!(e, UiEvent::PlaceCard { .. })), 24);
        assert_eq!(coordinator.deck.len(), 81);
        assert_ne!(coordinator.deck, first_deal);
        assert_eq!(coordinator.actors[0].score(), 0);
    }

    #[test]
    fn sweep_purges_candidates_entry_by_entry() {
        let (mut coordinator, ui) = dealt(config(2, 2, 1), &[1, 2, 3, 4], true);
        coordinator.runners[0].toggle(0);
        coordinator.runners[0].toggle(3);
        coordinator.sweep();
        assert!(coordinator.actors[0].candidate().is_empty());
        assert_eq!(coordinator.deck.len(), 4);
        assert_eq!(ui.count(|e| matches!(e, UiEvent::RemoveToken { actor: 0, .. })), 2);
    }

    #[test]
    fn hints_follow_each_deal() {
        let mut config = config(1, 3, 1);
        config.hints = true;
        let (_coordinator, ui) = dealt(config, &[0, 1, 2], true);
        assert_eq!(ui.count(|e| *e == UiEvent::Hint { slots: [0, 1, 2] }), 1);
    }

    #[test]
    fn winners_share_the_top_score() {
        let (coordinator, ui) = dealt(config(2, 2, 3), &[1, 2, 3, 4], true);
        assert_eq!(coordinator.announce_winners(), vec![0, 1, 2]);
        assert_eq!(ui.events().last(), Some(&UiEvent::Winners(vec![0, 1, 2])));
    }

    #[test]
    fn threaded_game_conserves_cards() {
        let config = GameConfig {
            rows: 3,
            columns: 3,
            feature_count: 3,
            human_players: 0,
            computer_players: 4,
            turn_timeout_ms: 150,
            point_freeze_ms: 5,
            penalty_freeze_ms: 5,
            end_game_pause_ms: 0,
            display_tick_ms: 5,
            computer_key_delay_ms: 1,
            ..GameConfig::default()
        };
        let ui = Arc::new(RecordingUi::default());
        let mut coordinator = Coordinator::new(config, ui.clone(), StdRng::seed_from_u64(11));
        let stop = coordinator.stop_signal();
        let actors: Vec<_> = coordinator.actors().to_vec();

        let stopper = thread::spawn(move || {
            thread::sleep(Duration::from_millis(400));
            stop.trigger();
        });
        let outcome = coordinator.run().unwrap();
        stopper.join().unwrap();

        let matched: u32 = outcome.scores.iter().sum();
        assert_eq!(coordinator.deck.len() + 3 * matched as usize, 27);
        assert_eq!(coordinator.table.lock().count_cards(), 0);
        for actor in &actors {
            assert!(actor.is_terminated());
            assert!(actor.candidate().is_empty());
        }
        assert!(!outcome.winners.is_empty());
        assert!(outcome.winners.iter().all(|&id| id < 4));
    }

    #[test]
    fn stopping_inside_a_match_still_ranks_by_final_scores() {
        for seed in 0..20 {
            let mut config = config(2, 2, 2);
            config.turn_timeout_ms = 5_000;
            let (mut coordinator, ui) = scripted(config, &[1, 2, 3, 4], seed);
            let stop = coordinator.stop_signal();
            // The match itself ends the game
            ui.stop_on_card_removal(stop.clone());
            let watchdog = watchdog(stop);

            let table = Arc::clone(coordinator.table());
            let player = Arc::clone(&coordinator.actors()[0]);
            let presser = thread::spawn(move || {
                assert!(wait_until(|| table.lock().count_cards() == 4));
                for slot in 0..3 {
                    assert!(player.key_pressed(slot));
                }
            });

            let outcome = coordinator.run().unwrap();
            presser.join().unwrap();
            watchdog.join().unwrap();

            assert_eq!(outcome.scores, vec![1, 0], "seed {}", seed);
            assert_eq!(outcome.winners, vec![0], "seed {}", seed);
            assert_eq!(ui.events().last(), Some(&UiEvent::Winners(vec![0])));
        }
    }

    #[test]
    fn end_game_pause_is_served_after_an_external_stop() {
        let mut config = config(2, 2, 1);
        config.end_game_pause_ms = 150;
        let (mut coordinator, _ui) = scripted(config, &[1, 2, 3, 4], 5);
        let stop = coordinator.stop_signal();
        let actors = coordinator.actors().to_vec();
        let stopper = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            stop.trigger();
        });

        let started = Instant::now();
        coordinator.run().unwrap();
        stopper.join().unwrap();

        assert!(started.elapsed() >= Duration::from_millis(150));
        assert!(actors.iter().all(|actor| actor.is_terminated()));
    }

    #[test]
    fn concurrent_overlapping_candidates_keep_only_cards_on_the_table() {
        let mut config = config(2, 3, 2);
        config.turn_timeout_ms = 5_000;
        let (mut coordinator, _ui) = scripted(config, &[0, 1, 2, 3, 4, 5], 9);
        let stop = coordinator.stop_signal();
        let watchdog = watchdog(stop.clone());
        let table = Arc::clone(coordinator.table());
        let actors = coordinator.actors().to_vec();

        let driver = thread::spawn(move || {
            assert!(wait_until(|| table.lock().count_cards() == 6));
            let pressers: Vec<_> = [[0, 1, 2], [2, 3, 4]]
                .into_iter()
                .zip(actors.iter().cloned())
                .map(|(slots, actor)| {
                    thread::spawn(move || slots.into_iter().all(|slot| actor.key_pressed(slot)))
                })
                .collect();
            for presser in pressers {
                assert!(presser.join().unwrap());
            }

            assert!(wait_until(|| actors.iter().map(|a| a.score()).sum::<u32>() == 1));
            // Let the other player work through its remaining presses
            thread::sleep(Duration::from_millis(20));
            {
                let table = table.lock();
                assert_eq!(table.count_cards(), 3);
                for actor in &actors {
                    for card in actor.candidate().iter() {
                        let slot = table.card_to_slot(card);
                        assert!(slot.is_some(), "card {} left the table", card);
                        assert!(slot.is_some_and(|slot| table.has_token(actor.id(), slot)));
                    }
                }
            }
            stop.trigger();
        });

        let outcome = coordinator.run().unwrap();
        driver.join().unwrap();
        watchdog.join().unwrap();

        assert_eq!(outcome.scores.iter().sum::<u32>(), 1);
        let scorer = outcome.scores.iter().position(|&score| score == 1).unwrap();
        assert_eq!(outcome.winners, vec![scorer]);
    }
}
