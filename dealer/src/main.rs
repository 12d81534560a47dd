use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use clap::Parser;
use dealer::{ActorHandle, Coordinator, GameConfig, TracingUi};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, warn};
use tracing_subscriber::filter::{LevelFilter, Targets};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
struct Args {
    /// Path to a JSON game config. Missing fields take their defaults
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of human players, overriding the config
    #[arg(long)]
    humans: Option<usize>,

    /// Number of computer players, overriding the config
    #[arg(long)]
    computers: Option<usize>,

    /// Show every match on the table after dealing
    #[arg(long, default_value_t = false)]
    hints: bool,

    /// RNG seed
    #[arg(long)]
    seed: Option<u64>,

    /// A log level among "off", "error", "warn", "info", "debug", "trace"
    #[arg(short, long, default_value = "info")]
    log_level: LevelFilter,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    initialize_logging(args.log_level);

    let mut config = match &args.config {
        Some(path) => GameConfig::load(path)?,
        None => GameConfig::default(),
    };
    if let Some(humans) = args.humans {
        config.human_players = humans;
    }
    if let Some(computers) = args.computers {
        config.computer_players = computers;
    }
    config.hints |= args.hints;
    config.validate()?;

    let seed = args.seed.unwrap_or_else(rand::random);
    info!(
        seed,
        players = config.players(),
        deck = config.deck_size(),
        "Starting game"
    );
    let rng = StdRng::seed_from_u64(seed);

    let mut coordinator = Coordinator::new(config, Arc::new(TracingUi), rng);
    if coordinator.actors().iter().any(|actor| actor.is_human()) {
        let actors = coordinator.actors().to_vec();
        // Blocks on stdin for good, so it is never joined
        thread::Builder::new()
            .name("keyboard".to_string())
            .spawn(move || read_key_presses(&actors))?;
        eprintln!("Type '<player> <slot>' and press enter to select a card");
    }

    let outcome = coordinator.run()?;

    eprintln!("Final scores:");
    for (id, score) in outcome.scores.iter().enumerate() {
        eprintln!("- player {}: {}", id, score);
    }
    let winners: Vec<String> = outcome.winners.iter().map(|id| id.to_string()).collect();
    eprintln!("Winners: {}", winners.join(", "));

    Ok(())
}

/// Forwards `<player> <slot>` lines from stdin to human players.
fn read_key_presses(actors: &[Arc<ActorHandle>]) {
    for line in std::io::stdin().lock().lines() {
        let Ok(line) = line else {
            break;
        };
        let Some((player, slot)) = parse_key_press(&line) else {
            warn!(%line, "Expected '<player> <slot>'");
            continue;
        };
        match actors.get(player) {
            Some(actor) if actor.is_human() => {
                if !actor.key_pressed(slot) {
                    debug!(player, slot, "Key press dropped");
                }
            }
            _ => warn!(player, "Not a human player"),
        }
    }
}

fn parse_key_press(line: &str) -> Option<(usize, usize)> {
    let mut words = line.split_whitespace();
    let player = words.next()?.parse().ok()?;
    let slot = words.next()?.parse().ok()?;
    match words.next() {
        Some(_) => None,
        None => Some((player, slot)),
    }
}

fn initialize_logging(level: LevelFilter) {
    let format = tracing_subscriber::fmt::format()
        .with_target(false)
        .compact();

    let filter = Targets::new().with_default(level);

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().event_format(format))
        .with(filter)
        .init();
}
