use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context};
use serde::Deserialize;
use setgame::{deck_size, MAX_ACTORS, MAX_FEATURE_COUNT};

use crate::CANDIDATE_SIZE;

/// Settings for one game. Every field may be left out of the JSON file.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub rows: usize,
    pub columns: usize,
    /// Every card has this many features with three values each.
    pub feature_count: u32,
    pub human_players: usize,
    pub computer_players: usize,
    /// How long a round lasts without a match before the table is reshuffled.
    pub turn_timeout_ms: u64,
    /// Below this much time left, the countdown is shown as urgent.
    pub turn_timeout_warning_ms: u64,
    pub point_freeze_ms: u64,
    pub penalty_freeze_ms: u64,
    pub end_game_pause_ms: u64,
    /// How often countdowns are refreshed on the display.
    pub display_tick_ms: u64,
    /// Pause between two key presses of a computer player.
    pub computer_key_delay_ms: u64,
    /// Show every match on the table after dealing cards.
    pub hints: bool,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            rows: 3,
            columns: 4,
            feature_count: 4,
            human_players: 0,
            computer_players: 2,
            turn_timeout_ms: 60_000,
            turn_timeout_warning_ms: 5_000,
            point_freeze_ms: 1_000,
            penalty_freeze_ms: 3_000,
            end_game_pause_ms: 5_000,
            display_tick_ms: 250,
            computer_key_delay_ms: 10,
            hints: false,
        }
    }
}

impl GameConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Could not open config file '{}'", path.display()))?;
        let config: Self = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Could not parse config file '{}'", path.display()))?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.table_size() < CANDIDATE_SIZE {
            bail!(
                "A {}x{} table has fewer than {} slots",
                self.rows,
                self.columns,
                CANDIDATE_SIZE
            );
        }
        if !(1..=MAX_FEATURE_COUNT).contains(&self.feature_count) {
            bail!(
                "feature_count must be between 1 and {}, got {}",
                MAX_FEATURE_COUNT,
                self.feature_count
            );
        }
        match self.players() {
            0 => bail!("At least one player is needed"),
            n if n > MAX_ACTORS => bail!("At most {} players are supported, got {}", MAX_ACTORS, n),
            _ => {}
        }
        if self.display_tick_ms == 0 {
            bail!("display_tick_ms must be positive");
        }
        Ok(())
    }

    pub fn table_size(&self) -> usize {
        self.rows * self.columns
    }

    pub fn deck_size(&self) -> usize {
        deck_size(self.feature_count)
    }

    pub fn players(&self) -> usize {
        self.human_players + self.computer_players
    }

    pub fn turn_timeout(&self) -> Duration {
        Duration::from_millis(self.turn_timeout_ms)
    }

    pub fn turn_timeout_warning(&self) -> Duration {
        Duration::from_millis(self.turn_timeout_warning_ms)
    }

    pub fn point_freeze(&self) -> Duration {
        Duration::from_millis(self.point_freeze_ms)
    }

    pub fn penalty_freeze(&self) -> Duration {
        Duration::from_millis(self.penalty_freeze_ms)
    }

    pub fn end_game_pause(&self) -> Duration {
        Duration::from_millis(self.end_game_pause_ms)
    }

    pub fn display_tick(&self) -> Duration {
        Duration::from_millis(self.display_tick_ms)
    }

    pub fn computer_key_delay(&self) -> Duration {
        Duration::from_millis(self.computer_key_delay_ms)
    }
}
