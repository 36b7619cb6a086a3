//! The player: keyboard-driven movement, map event detection and falling.

use engine::{
    map::ActionEvent, Direction, DirectionBits, Footprint, GameEvent, Level, MapTransitionEvent,
    MovementResolver, Outcome, Rect, Registry, RpgMap, FALL_UNIT, MOVE_UNIT, SCALAR, TILE_SIZE,
};
use tracing::{debug, warn};

pub const START_LIVES: u32 = 2;

const FRAME_WIDTH: i32 = 13 * SCALAR;
const FRAME_HEIGHT: i32 = 17 * SCALAR;
const BASE_RECT_HEIGHT: i32 = 9 * SCALAR;
const BASE_RECT_EXTEND: i32 = SCALAR;
const FRAME_SKIP: u32 = 6;
const FRAME_COUNT: u32 = 4;

pub struct Player {
    /// Full sprite rectangle in map pixels; the base rect hangs off its
    /// bottom edge.
    rect: Rect,
    level: Level,
    direction: Direction,
    movement: MovementResolver,
    /// Pixels of fall remaining; zero when grounded.
    falling: i32,
    lives: u32,
    coin_count: u32,
    key_count: u32,
    frame_ticks: u32,
    frame_index: u32,
}

impl Player {
    pub fn new(registry: &Registry) -> Self {
        let mut player = Self {
            rect: Rect::new(0, 0, FRAME_WIDTH, FRAME_HEIGHT),
            level: registry.player_level,
            direction: Direction::Down,
            movement: MovementResolver::new(),
            falling: 0,
            lives: START_LIVES,
            coin_count: registry.coin_count,
            key_count: registry.key_count,
            frame_ticks: 0,
            frame_index: 0,
        };
        player.spawn(registry.player_position, registry.player_level, Direction::Down);
        player
    }

    /// Puts the player on a tile, clearing any in-flight movement state.
    pub fn spawn(&mut self, tile: (i32, i32), level: Level, direction: Direction) {
        self.rect.set_top_left(
            tile.0 * TILE_SIZE + (TILE_SIZE - FRAME_WIDTH) / 2,
            (tile.1 + 1) * TILE_SIZE - FRAME_HEIGHT,
        );
        self.level = level;
        self.direction = direction;
        self.movement.reset();
        self.falling = 0;
        self.stand();
    }

    /// Positions the player just outside the given map edge so an entry walk
    /// can bring them into view. `travel` is the direction the player keeps
    /// walking; the modifier shifts the carried-over coordinate by whole
    /// tiles.
    pub fn enter_hidden(&mut self, map_rect: &Rect, travel: Direction, modifier: i32) {
        let mut px = self.rect.left + modifier * TILE_SIZE;
        let mut py = self.rect.top + modifier * TILE_SIZE;
        match travel {
            Direction::Up => py = map_rect.bottom(),
            Direction::Down => py = -self.rect.height,
            Direction::Left => px = map_rect.right(),
            Direction::Right => px = -self.rect.width,
        }
        self.rect.set_top_left(px, py);
        self.direction = travel;
        self.movement.reset();
        self.falling = 0;
        self.stand();
    }

    pub fn rect(&self) -> Rect {
        self.rect
    }

    pub fn base_rect(&self) -> Rect {
        Rect::new(
            self.rect.left + BASE_RECT_EXTEND,
            self.rect.bottom() - BASE_RECT_HEIGHT,
            FRAME_WIDTH - 2 * BASE_RECT_EXTEND,
            BASE_RECT_HEIGHT,
        )
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn lives(&self) -> u32 {
        self.lives
    }

    pub fn coin_count(&self) -> u32 {
        self.coin_count
    }

    pub fn key_count(&self) -> u32 {
        self.key_count
    }

    pub fn add_coin(&mut self) {
        self.coin_count += 1;
    }

    pub fn add_key(&mut self) {
        self.key_count += 1;
    }

    pub fn take_key(&mut self) -> bool {
        if self.key_count == 0 {
            return false;
        }
        self.key_count -= 1;
        true
    }

    /// Resets the counters from a respawn registry.
    pub fn set_counts(&mut self, coin_count: u32, key_count: u32) {
        self.coin_count = coin_count;
        self.key_count = key_count;
    }

    /// Moves the player along with a carrier sprite, bypassing validity
    /// checks.
    pub fn carry(&mut self, dx: i32, dy: i32) {
        self.rect.translate(dx, dy);
    }

    pub fn lose_life(&mut self) -> u32 {
        self.lives = self.lives.saturating_sub(1);
        self.lives
    }

    pub fn is_falling(&self) -> bool {
        self.falling > 0
    }

    /// Checks the map for boundary and tile/falling events at the player's
    /// current position. A tile event is returned for the caller to act on;
    /// a falling event starts the fall here.
    pub fn map_events(
        &mut self,
        map: &RpgMap,
        effects: &mut Vec<GameEvent>,
    ) -> Option<MapTransitionEvent> {
        if !map.pixel_rect().contains(&self.rect) {
            let (boundary, tile_range) = self.breached_boundary(map);
            match map.boundary_event(boundary, tile_range) {
                Some(event) => return Some(MapTransitionEvent::Boundary(event.clone())),
                None => {
                    warn!(map = %map.name(), boundary = boundary.as_token(), "boundary_event_missing");
                }
            }
        }
        match map.action_event(self.level, &self.base_rect()) {
            Some(ActionEvent::Tile(event)) => Some(MapTransitionEvent::Tile(event)),
            Some(ActionEvent::Falling(event)) => {
                self.start_falling(event.down_level, effects);
                None
            }
            None => None,
        }
    }

    /// The breached edge and the tile indices along it covered by the base
    /// rect. A vertical breach wins over a horizontal one on corners.
    fn breached_boundary(&self, map: &RpgMap) -> (Direction, std::ops::RangeInclusive<i32>) {
        let map_rect = map.pixel_rect();
        let mut boundary = if self.rect.left < 0 {
            Direction::Left
        } else {
            Direction::Right
        };
        if self.rect.top < 0 {
            boundary = Direction::Up;
        } else if self.rect.bottom() > map_rect.bottom() {
            boundary = Direction::Down;
        }
        let base = self.base_rect();
        let tile_range = match boundary {
            Direction::Up | Direction::Down => {
                base.left.div_euclid(TILE_SIZE)..=(base.right() - 1).div_euclid(TILE_SIZE)
            }
            Direction::Left | Direction::Right => {
                base.top.div_euclid(TILE_SIZE)..=(base.bottom() - 1).div_euclid(TILE_SIZE)
            }
        };
        (boundary, tile_range)
    }

    fn start_falling(&mut self, down_level: i32, effects: &mut Vec<GameEvent>) {
        let distance = self.level.floor_whole() - down_level;
        if distance <= 0 {
            return;
        }
        debug!(from = %self.level, to = down_level, "player_falling");
        self.falling = distance * TILE_SIZE;
        self.movement.reset();
        effects.push(GameEvent::PlayerFalling);
    }

    /// Advances one tick of fall: a fixed descent, with the level dropping
    /// once per tile fallen.
    pub fn continue_falling(&mut self) {
        if self.falling == 0 {
            return;
        }
        self.rect.translate(0, FALL_UNIT);
        if self.falling % TILE_SIZE == 0 {
            self.level = Level::new(self.level.floor_whole() - 1);
        }
        self.falling -= FALL_UNIT;
    }

    /// Resolves and applies one tick of keyboard movement.
    pub fn apply_movement(&mut self, map: &RpgMap, bits: DirectionBits, effects: &mut Vec<GameEvent>) {
        match self.movement.resolve(map, self.level, &self.base_rect(), self.direction, bits) {
            Outcome::Moved {
                level,
                facing,
                dx,
                dy,
            } => {
                self.level = level;
                self.direction = facing;
                self.rect.translate(dx, dy);
                self.animate(effects);
            }
            Outcome::Deferred { facing, .. } => {
                // run on the spot; the stored move lands next tick
                self.direction = facing;
                self.animate(effects);
            }
            Outcome::Turned { facing } => {
                self.direction = facing;
                self.stand();
            }
            Outcome::Idle | Outcome::Blocked => self.stand(),
        }
    }

    fn animate(&mut self, effects: &mut Vec<GameEvent>) {
        self.frame_ticks += 1;
        let next = (self.frame_ticks / FRAME_SKIP) % FRAME_COUNT;
        if next != self.frame_index {
            self.frame_index = next;
            if next == 1 || next == 3 {
                effects.push(GameEvent::PlayerFootstep);
            }
        }
    }

    fn stand(&mut self) {
        self.frame_ticks = 0;
        self.frame_index = 0;
    }
}

impl Footprint for Player {
    fn rect(&self) -> Rect {
        self.rect
    }

    fn level(&self) -> Level {
        self.level
    }

    fn z(&self) -> i32 {
        self.rect.bottom() + self.level.floor_whole() * TILE_SIZE
    }

    fn upright(&self) -> bool {
        true
    }
}
