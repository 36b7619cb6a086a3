//! Headless demo driver: loads (or starts) a save, runs a scripted stroll
//! through the demo maps and writes the registry back out.

mod behaviors;
mod builder;
mod player;
mod save;
mod session;

use std::process;

use engine::{resolve_app_paths, DirectionBits, GameEventKind, Level, Registry};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::session::{GameSession, InputState};

const START_MAP: &str = "start";
const START_TILE: (i32, i32) = (2, 7);
const START_LEVEL: i32 = 1;

/// (ticks, held direction, action key) segments of the demo walk.
const DEMO_SCRIPT: &[(u32, DirectionBits, bool)] = &[
    (96, DirectionBits::RIGHT, false), // collect the key, pass the checkpoint
    (24, DirectionBits::UP, false),    // push up against the door
    (1, DirectionBits::NONE, true),    // unlock it
    (70, DirectionBits::NONE, false),  // wait for it to swing open
    (80, DirectionBits::UP, false),    // head north, grabbing the coin
    (120, DirectionBits::RIGHT, false), // off the east edge into the cove
    (240, DirectionBits::RIGHT, false), // across the cove to the jetty's end
];

fn main() {
    init_tracing();
    info!("=== Adventure Startup ===");
    if let Err(error) = run() {
        error!(error = %error, "startup_failed");
        process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let paths = resolve_app_paths().map_err(|error| error.to_string())?;
    let save_path = save::save_file_path(&paths.saves_dir);
    let registry = if save_path.is_file() {
        match save::load_game(&save_path) {
            Ok(registry) => {
                info!(map = %registry.map_name, "save_loaded");
                registry
            }
            Err(reason) => {
                warn!(reason, "save_unreadable");
                new_game_registry()
            }
        }
    } else {
        new_game_registry()
    };

    let mut session =
        GameSession::new(&paths.maps_dir, registry).map_err(|error| error.to_string())?;
    subscribe_event_log(&mut session);
    run_script(&mut session).map_err(|error| error.to_string())?;
    save::save_game(&save_path, session.registry())?;
    Ok(())
}

fn new_game_registry() -> Registry {
    Registry::new(START_MAP, START_TILE, Level::new(START_LEVEL))
}

fn run_script(session: &mut GameSession) -> Result<(), engine::MapError> {
    for (ticks, bits, action) in DEMO_SCRIPT {
        for _ in 0..*ticks {
            if session.is_over() {
                break;
            }
            session.tick(InputState {
                bits: *bits,
                action: *action,
            })?;
        }
    }
    info!(
        map = %session.map_name(),
        lives = session.player().lives(),
        coins = session.player().coin_count(),
        over = session.is_over(),
        "script_finished"
    );
    Ok(())
}

/// Logs the gameplay events a real frontend would turn into audio cues.
fn subscribe_event_log(session: &mut GameSession) {
    let kinds = [
        GameEventKind::GameStarted,
        GameEventKind::CoinCollected,
        GameEventKind::KeyCollected,
        GameEventKind::DoorOpening,
        GameEventKind::DoorOpened,
        GameEventKind::CheckpointReached,
        GameEventKind::BoatMoving,
        GameEventKind::BoatStopped,
        GameEventKind::MapTransition,
        GameEventKind::LifeLost,
        GameEventKind::WaspZooming,
        GameEventKind::BladesStabbing,
        GameEventKind::EndGame,
    ];
    for kind in kinds {
        session.bus_mut().subscribe(
            kind,
            Box::new(move |event| info!(event = ?event, "game_event")),
        );
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}
