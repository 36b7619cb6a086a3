//! Gameplay event bus.
//!
//! Decouples the things that happen (a coin collected, a map boundary
//! breached, a wasp diving) from the things that react (the registry, audio
//! cues, the state sequencer). Listeners subscribe per event kind; dispatch
//! walks that kind's listeners in subscription order.

use std::collections::HashMap;

use tracing::trace;

use crate::map::MapTransitionEvent;
use crate::registry::SpriteMetadata;

/// Everything that can be announced on the bus. Metadata-carrying variants
/// feed the registry; the bare ones exist to trigger audio and state changes.
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    CoinCollected(SpriteMetadata),
    KeyCollected(SpriteMetadata),
    DoorOpening,
    DoorOpened(SpriteMetadata),
    CheckpointReached(SpriteMetadata),
    BoatMoving,
    BoatStopped(SpriteMetadata),
    PlayerFootstep,
    PlayerFalling,
    MapTransition(MapTransitionEvent),
    LifeLost { game_over: bool },
    EndGame,
    WaspZooming,
    BeetleCrawling,
    BladesStabbing,
    GameStarted,
}

/// Discriminant used as the subscription key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameEventKind {
    CoinCollected,
    KeyCollected,
    DoorOpening,
    DoorOpened,
    CheckpointReached,
    BoatMoving,
    BoatStopped,
    PlayerFootstep,
    PlayerFalling,
    MapTransition,
    LifeLost,
    EndGame,
    WaspZooming,
    BeetleCrawling,
    BladesStabbing,
    GameStarted,
}

impl GameEvent {
    pub fn kind(&self) -> GameEventKind {
        match self {
            Self::CoinCollected(_) => GameEventKind::CoinCollected,
            Self::KeyCollected(_) => GameEventKind::KeyCollected,
            Self::DoorOpening => GameEventKind::DoorOpening,
            Self::DoorOpened(_) => GameEventKind::DoorOpened,
            Self::CheckpointReached(_) => GameEventKind::CheckpointReached,
            Self::BoatMoving => GameEventKind::BoatMoving,
            Self::BoatStopped(_) => GameEventKind::BoatStopped,
            Self::PlayerFootstep => GameEventKind::PlayerFootstep,
            Self::PlayerFalling => GameEventKind::PlayerFalling,
            Self::MapTransition(_) => GameEventKind::MapTransition,
            Self::LifeLost { .. } => GameEventKind::LifeLost,
            Self::EndGame => GameEventKind::EndGame,
            Self::WaspZooming => GameEventKind::WaspZooming,
            Self::BeetleCrawling => GameEventKind::BeetleCrawling,
            Self::BladesStabbing => GameEventKind::BladesStabbing,
            Self::GameStarted => GameEventKind::GameStarted,
        }
    }
}

type Listener = Box<dyn FnMut(&GameEvent)>;

#[derive(Default)]
pub struct EventBus {
    listeners: HashMap<GameEventKind, Vec<Listener>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, kind: GameEventKind, listener: Listener) {
        self.listeners.entry(kind).or_default().push(listener);
    }

    pub fn dispatch(&mut self, event: &GameEvent) {
        trace!(event = ?event.kind(), "event_dispatched");
        if let Some(listeners) = self.listeners.get_mut(&event.kind()) {
            for listener in listeners {
                listener(event);
            }
        }
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let counts: HashMap<_, _> = self
            .listeners
            .iter()
            .map(|(kind, listeners)| (kind, listeners.len()))
            .collect();
        f.debug_struct("EventBus").field("listeners", &counts).finish()
    }
}
