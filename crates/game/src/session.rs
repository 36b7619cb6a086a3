//! The play session: a single-threaded fixed-tick loop over one map at a
//! time. Each tick resolves the player's map events first, then sprite
//! movement and collisions, then keyboard movement, then action-key
//! interactions; transitions consume the rest of the tick.

use std::path::PathBuf;

use engine::{
    Direction, DirectionBits, EventBus, GameEvent, MapCache, MapError, MapTransitionEvent,
    Registry, RegistryHandler, SceneData, SharedMap, Transition,
};
use tracing::info;

use crate::behaviors::{Behavior, Disposition, TickCtx};
use crate::builder::build_sprites;
use crate::player::Player;

/// Ticks walking the player into view after a map switch.
const BOUNDARY_TICKS_VERTICAL: u32 = 24;
const BOUNDARY_TICKS_HORIZONTAL: u32 = 14;
const DOORWAY_TICKS: u32 = 16;

fn boundary_ticks(direction: Direction) -> u32 {
    match direction {
        Direction::Up | Direction::Down => BOUNDARY_TICKS_VERTICAL,
        Direction::Left | Direction::Right => BOUNDARY_TICKS_HORIZONTAL,
    }
}

/// One tick's worth of keyboard state.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputState {
    pub bits: DirectionBits,
    pub action: bool,
}

pub struct GameSession {
    map_cache: MapCache,
    map: SharedMap,
    player: Player,
    sprites: Vec<Box<dyn Behavior>>,
    registry: RegistryHandler,
    bus: EventBus,
    effects: Vec<GameEvent>,
    /// A forced walk bringing the player into view; input is ignored and
    /// event checks are suspended until it runs out.
    entry: Option<(Direction, u32)>,
    ended: bool,
}

impl GameSession {
    pub fn new(maps_dir: impl Into<PathBuf>, registry: Registry) -> Result<Self, MapError> {
        let mut map_cache = MapCache::new(maps_dir);
        let mut handler = RegistryHandler::new(registry);
        let map = map_cache.load(&handler.registry().map_name.clone())?;
        let player = Player::new(handler.registry());
        let sprites = build_sprites(&mut map.borrow_mut(), handler.registry_mut());
        Ok(Self {
            map_cache,
            map,
            player,
            sprites,
            registry: handler,
            bus: EventBus::new(),
            effects: vec![GameEvent::GameStarted],
            entry: None,
            ended: false,
        })
    }

    pub fn bus_mut(&mut self) -> &mut EventBus {
        &mut self.bus
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    pub fn registry(&self) -> &Registry {
        self.registry.registry()
    }

    pub fn map_name(&self) -> String {
        self.map.borrow().name().to_string()
    }

    pub fn sprite_count(&self) -> usize {
        self.sprites.len()
    }

    pub fn is_over(&self) -> bool {
        self.ended
    }

    /// Advances the session by one tick.
    pub fn tick(&mut self, input: InputState) -> Result<(), MapError> {
        if self.ended {
            return Ok(());
        }
        let entry_active = self.entry.is_some();
        let (bits, action) = match self.entry {
            Some((direction, _)) => (DirectionBits::NONE.with(direction), false),
            None => (input.bits, input.action),
        };

        let falling = self.player.is_falling();
        if !entry_active && !falling {
            let transition = {
                let map = self.map.borrow();
                self.player.map_events(&map, &mut self.effects)
            };
            if let Some(event) = transition {
                self.handle_transition(event)?;
                self.drain_effects();
                return Ok(());
            }
        }

        if self.update_sprites(!entry_active) {
            self.life_lost()?;
            self.drain_effects();
            return Ok(());
        }

        if falling {
            self.player.continue_falling();
        } else if !self.player.is_falling() {
            // a fall that started this tick pre-empts movement
            let map = self.map.borrow();
            self.player.apply_movement(&map, bits, &mut self.effects);
        }

        if action && !falling {
            self.process_actions();
        }

        if let Some((_, ticks)) = &mut self.entry {
            *ticks -= 1;
            if *ticks == 0 {
                self.entry = None;
            }
        }

        self.drain_effects();
        Ok(())
    }

    /// Updates every sprite and, when allowed, routes collisions. Returns
    /// true when the player touched something lethal.
    fn update_sprites(&mut self, collisions: bool) -> bool {
        let trigger = self.sprites.iter().any(|sprite| {
            sprite.is_carrier()
                && sprite.level() == self.player.level()
                && sprite.base_rect().intersects(&self.player.base_rect())
        });
        let sprites = std::mem::take(&mut self.sprites);
        let mut survivors = Vec::with_capacity(sprites.len());
        let mut lethal = false;
        {
            let mut map = self.map.borrow_mut();
            let mut ctx = TickCtx {
                map: &mut map,
                player: &mut self.player,
                effects: &mut self.effects,
                trigger,
            };
            for mut sprite in sprites {
                let mut disposition = sprite.update(&mut ctx);
                if disposition == Disposition::Keep
                    && collisions
                    && !lethal
                    && sprite.level() == ctx.player.level()
                    && sprite.base_rect().intersects(&ctx.player.base_rect())
                {
                    disposition = sprite.on_collision(&mut ctx);
                }
                match disposition {
                    Disposition::Keep => survivors.push(sprite),
                    Disposition::Remove => {}
                    Disposition::Lethal => {
                        lethal = true;
                        survivors.push(sprite);
                    }
                }
            }
        }
        self.sprites = survivors;
        lethal
    }

    /// Routes the action key to sprites within reach of the player.
    fn process_actions(&mut self) {
        let sprites = std::mem::take(&mut self.sprites);
        let mut survivors = Vec::with_capacity(sprites.len());
        {
            let mut map = self.map.borrow_mut();
            let mut ctx = TickCtx {
                map: &mut map,
                player: &mut self.player,
                effects: &mut self.effects,
                trigger: false,
            };
            for mut sprite in sprites {
                let disposition = if sprite.level() == ctx.player.level()
                    && sprite.base_rect().intersects(&ctx.player.base_rect())
                {
                    sprite.on_action(&mut ctx)
                } else {
                    Disposition::Keep
                };
                if disposition != Disposition::Remove {
                    survivors.push(sprite);
                }
            }
        }
        self.sprites = survivors;
    }

    fn handle_transition(&mut self, event: MapTransitionEvent) -> Result<(), MapError> {
        match event.transition().clone() {
            Transition::EndGame => {
                self.effects.push(GameEvent::EndGame);
                self.ended = true;
            }
            Transition::Boundary {
                map_name,
                boundary,
                modifier,
            } => {
                self.switch_map(&map_name)?;
                let map_rect = self.map.borrow().pixel_rect();
                self.player.enter_hidden(&map_rect, boundary, modifier);
                self.entry = Some((boundary, boundary_ticks(boundary)));
                self.effects.push(GameEvent::MapTransition(event));
            }
            Transition::Scene(data) | Transition::LifeLost(data) => {
                self.enter_scene(&data)?;
                self.effects.push(GameEvent::MapTransition(event));
            }
        }
        Ok(())
    }

    fn enter_scene(&mut self, data: &SceneData) -> Result<(), MapError> {
        self.switch_map(&data.map_name)?;
        self.player.spawn(data.tile, data.level, data.direction);
        match data.boundary {
            Some(boundary) => {
                let map_rect = self.map.borrow().pixel_rect();
                self.player.enter_hidden(&map_rect, boundary, 0);
                self.entry = Some((data.direction, boundary_ticks(data.direction)));
            }
            None => {
                self.entry = Some((data.direction, DOORWAY_TICKS));
            }
        }
        Ok(())
    }

    fn switch_map(&mut self, name: &str) -> Result<(), MapError> {
        self.map = self.map_cache.load(name)?;
        self.sprites = build_sprites(&mut self.map.borrow_mut(), self.registry.registry_mut());
        self.entry = None;
        Ok(())
    }

    /// The life-lost sequence: spend a life, then either end the game or
    /// respawn from the registry snapshot.
    fn life_lost(&mut self) -> Result<(), MapError> {
        let remaining = self.player.lose_life();
        let game_over = remaining == 0;
        info!(lives = remaining, "life_lost");
        self.effects.push(GameEvent::LifeLost { game_over });
        if game_over {
            self.ended = true;
            return Ok(());
        }
        self.registry.switch_to_snapshot();
        self.start_from_registry()
    }

    fn start_from_registry(&mut self) -> Result<(), MapError> {
        let registry = self.registry.registry();
        let map_name = registry.map_name.clone();
        let position = registry.player_position;
        let level = registry.player_level;
        let counts = (registry.coin_count, registry.key_count);
        self.switch_map(&map_name)?;
        self.player.spawn(position, level, Direction::Down);
        self.player.set_counts(counts.0, counts.1);
        Ok(())
    }

    /// Hands the tick's events to the registry and then to the bus.
    fn drain_effects(&mut self) {
        let events: Vec<GameEvent> = self.effects.drain(..).collect();
        for event in events {
            match &event {
                GameEvent::CoinCollected(metadata)
                | GameEvent::KeyCollected(metadata)
                | GameEvent::DoorOpened(metadata)
                | GameEvent::BoatStopped(metadata) => self.registry.register(metadata.clone()),
                GameEvent::CheckpointReached(metadata) => {
                    self.registry.checkpoint_reached(metadata);
                }
                _ => {}
            }
            self.bus.dispatch(&event);
        }
    }
}
