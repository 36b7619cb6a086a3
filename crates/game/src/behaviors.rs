//! Non-player sprite behaviors.
//!
//! Each behavior owns its position and per-tick state machine; the session
//! drives them through `update`, and routes collisions and action-key
//! presses to sprites whose base rect intersects the player's at the same
//! level. Behaviors never touch the registry directly: anything persistent
//! goes out as a metadata-carrying event and is registered by the session.

use engine::{
    Direction, GameEvent, Level, Rect, RpgMap, SpriteMetadata, MOVE_UNIT, SCALAR, TILE_SIZE,
};

use crate::player::Player;

const BASE_RECT_HEIGHT: i32 = 9 * SCALAR;
const BASE_RECT_EXTEND: i32 = SCALAR;

const WASP_COUNTDOWN: u32 = 12;
const WASP_SIGHT_X: i32 = 512;
const WASP_SIGHT_Y: i32 = 320;

const BLADES_COUNTDOWN: u32 = 24;
const BLADES_FRAME_SKIP: u32 = 6;
const BLADES_FRAME_COUNT: u32 = 10;

const DOOR_FRAME_SKIP: u32 = 6;
const DOOR_FRAME_COUNT: u32 = 10;

const BEETLE_CRAWL_TICKS: u32 = 24;

/// Everything a behavior may read or mutate during a tick.
pub struct TickCtx<'a> {
    pub map: &'a mut RpgMap,
    pub player: &'a mut Player,
    pub effects: &'a mut Vec<GameEvent>,
    /// Set while the player is standing on a carrier sprite.
    pub trigger: bool,
}

/// What the session should do with the sprite after a callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Keep,
    Remove,
    /// The player touched something lethal; the session ends the tick with
    /// the life-lost sequence.
    Lethal,
}

pub trait Behavior {
    fn uid(&self) -> &str;
    fn level(&self) -> Level;
    fn base_rect(&self) -> Rect;

    fn update(&mut self, ctx: &mut TickCtx<'_>) -> Disposition {
        let _ = ctx;
        Disposition::Keep
    }

    fn on_collision(&mut self, ctx: &mut TickCtx<'_>) -> Disposition {
        let _ = ctx;
        Disposition::Keep
    }

    fn on_action(&mut self, ctx: &mut TickCtx<'_>) -> Disposition {
        let _ = ctx;
        Disposition::Keep
    }

    /// Carriers move the player along with them; the session raises the
    /// trigger flag while the player stands on one.
    fn is_carrier(&self) -> bool {
        false
    }
}

fn tile_bottom(tile: (i32, i32)) -> i32 {
    (tile.1 + 1) * TILE_SIZE
}

/// A base rect of the given size, bottom-centred on the tile.
fn grounded_base_rect(tile: (i32, i32), width: i32, height: i32) -> Rect {
    Rect::new(
        tile.0 * TILE_SIZE + (TILE_SIZE - width) / 2,
        tile_bottom(tile) - height,
        width,
        height,
    )
}

/// Steps a rect one axis at a time toward a pixel target, horizontal first.
/// Returns the applied delta, or `None` on arrival.
fn step_toward(rect: &Rect, target: (i32, i32)) -> Option<(i32, i32)> {
    let dx = target.0 - rect.left;
    let dy = target.1 - rect.top;
    if dx < 0 {
        return Some((-MOVE_UNIT, 0));
    }
    if dx > 0 {
        return Some((MOVE_UNIT, 0));
    }
    if dy < 0 {
        return Some((0, -MOVE_UNIT));
    }
    if dy > 0 {
        return Some((0, MOVE_UNIT));
    }
    None
}

fn intersects_player(level: Level, base_rect: &Rect, player: &Player) -> bool {
    level == player.level() && base_rect.intersects(&player.base_rect())
}

/// Patrols a fixed loop of waypoints; lethal to touch.
pub struct Beetle {
    uid: String,
    level: Level,
    rect: Rect,
    path: Vec<(i32, i32)>,
    path_index: usize,
    ticks: u32,
}

impl Beetle {
    const BASE_SIZE: i32 = 12 * SCALAR;

    pub fn new(uid: &str, level: Level, tile_points: &[(i32, i32)]) -> Self {
        let rect = grounded_base_rect(tile_points[0], Self::BASE_SIZE, Self::BASE_SIZE);
        let path = tile_points
            .iter()
            .map(|tile| {
                let at_tile = grounded_base_rect(*tile, Self::BASE_SIZE, Self::BASE_SIZE);
                (at_tile.left, at_tile.top)
            })
            .collect();
        Self {
            uid: uid.to_string(),
            level,
            rect,
            path,
            path_index: 0,
            ticks: 0,
        }
    }
}

impl Behavior for Beetle {
    fn uid(&self) -> &str {
        &self.uid
    }

    fn level(&self) -> Level {
        self.level
    }

    fn base_rect(&self) -> Rect {
        self.rect
    }

    fn update(&mut self, ctx: &mut TickCtx<'_>) -> Disposition {
        let mut step = step_toward(&self.rect, self.path[self.path_index]);
        if step.is_none() {
            self.path_index = (self.path_index + 1) % self.path.len();
            step = step_toward(&self.rect, self.path[self.path_index]);
        }
        if let Some((dx, dy)) = step {
            self.rect.translate(dx, dy);
            self.ticks = (self.ticks + 1) % BEETLE_CRAWL_TICKS;
            if self.ticks == BEETLE_CRAWL_TICKS / 2 {
                ctx.effects.push(GameEvent::BeetleCrawling);
            }
        }
        Disposition::Keep
    }

    fn on_collision(&mut self, _ctx: &mut TickCtx<'_>) -> Disposition {
        Disposition::Lethal
    }
}

/// Hovers in place until the player crosses one of its four axis-aligned
/// sight rects at the same level, then counts down and zooms in a straight
/// line at double speed. Despawns once fully off the map.
pub struct Wasp {
    uid: String,
    level: Level,
    rect: Rect,
    sighted: Option<Direction>,
    countdown: u32,
    zooming: bool,
}

impl Wasp {
    const BASE_WIDTH: i32 = 9 * SCALAR;
    const BASE_HEIGHT: i32 = 12 * SCALAR;

    pub fn new(uid: &str, level: Level, tile_points: &[(i32, i32)]) -> Self {
        Self {
            uid: uid.to_string(),
            level,
            rect: grounded_base_rect(tile_points[0], Self::BASE_WIDTH, Self::BASE_HEIGHT),
            sighted: None,
            countdown: WASP_COUNTDOWN,
            zooming: false,
        }
    }

    fn sight(&self, direction: Direction) -> Rect {
        let base = self.rect;
        match direction {
            Direction::Left => Rect::new(base.left - WASP_SIGHT_X, base.top, WASP_SIGHT_X, base.height),
            Direction::Right => Rect::new(base.right(), base.top, WASP_SIGHT_X, base.height),
            Direction::Up => Rect::new(base.left, base.top - WASP_SIGHT_Y, base.width, WASP_SIGHT_Y),
            Direction::Down => Rect::new(base.left, base.bottom(), base.width, WASP_SIGHT_Y),
        }
    }

    fn spot_player(&mut self, player: &Player) -> bool {
        if self.level != player.level() {
            return false;
        }
        let player_base = player.base_rect();
        for direction in [
            Direction::Left,
            Direction::Right,
            Direction::Up,
            Direction::Down,
        ] {
            if self.sight(direction).intersects(&player_base) {
                self.sighted = Some(direction);
                return true;
            }
        }
        false
    }
}

impl Behavior for Wasp {
    fn uid(&self) -> &str {
        &self.uid
    }

    fn level(&self) -> Level {
        self.level
    }

    fn base_rect(&self) -> Rect {
        self.rect
    }

    fn update(&mut self, ctx: &mut TickCtx<'_>) -> Disposition {
        if self.zooming {
            let (dx, dy) = match self.sighted {
                Some(Direction::Up) => (0, -2 * MOVE_UNIT),
                Some(Direction::Down) => (0, 2 * MOVE_UNIT),
                Some(Direction::Left) => (-2 * MOVE_UNIT, 0),
                Some(Direction::Right) => (2 * MOVE_UNIT, 0),
                None => (0, 0),
            };
            self.rect.translate(dx, dy);
            if !self.rect.intersects(&ctx.map.pixel_rect()) {
                return Disposition::Remove;
            }
            return Disposition::Keep;
        }
        if self.sighted.is_none() {
            self.spot_player(ctx.player);
            return Disposition::Keep;
        }
        // the player has been seen; the countdown runs even if they hide
        self.countdown -= 1;
        if self.countdown == 0 {
            self.zooming = true;
            ctx.effects.push(GameEvent::WaspZooming);
        }
        Disposition::Keep
    }

    fn on_collision(&mut self, _ctx: &mut TickCtx<'_>) -> Disposition {
        Disposition::Lethal
    }
}

/// A floor trap cycling between retracted (tile walkable) and stabbing
/// (tile restored to its blocked state, lethal mid-animation).
pub struct Blades {
    uid: String,
    level: Level,
    tile: (i32, i32),
    rect: Rect,
    active: bool,
    countdown: u32,
    frame_ticks: u32,
    frame_index: u32,
}

impl Blades {
    pub fn new(uid: &str, level: Level, tile_points: &[(i32, i32)]) -> Self {
        let tile = tile_points[0];
        Self {
            uid: uid.to_string(),
            level,
            tile,
            rect: Rect::new(
                tile.0 * TILE_SIZE,
                tile_bottom(tile) - TILE_SIZE + 2 * SCALAR,
                TILE_SIZE,
                TILE_SIZE,
            ),
            active: false,
            countdown: BLADES_COUNTDOWN,
            frame_ticks: 0,
            frame_index: 0,
        }
    }
}

impl Behavior for Blades {
    fn uid(&self) -> &str {
        &self.uid
    }

    fn level(&self) -> Level {
        self.level
    }

    fn base_rect(&self) -> Rect {
        self.rect
    }

    fn update(&mut self, ctx: &mut TickCtx<'_>) -> Disposition {
        if self.active {
            self.frame_ticks += 1;
            if self.frame_ticks % BLADES_FRAME_SKIP == 0 {
                self.frame_index = (self.frame_index + 1) % BLADES_FRAME_COUNT;
                if self.frame_index == 0 {
                    // retracted: make the tile walkable again
                    self.active = false;
                    self.countdown = BLADES_COUNTDOWN;
                    ctx.map.add_level(self.tile.0, self.tile.1, self.level);
                } else if self.frame_index == 2 {
                    ctx.effects.push(GameEvent::BladesStabbing);
                }
            }
            return Disposition::Keep;
        }
        self.countdown -= 1;
        if self.countdown == 0 {
            self.active = true;
            self.frame_ticks = 0;
            ctx.map.tile_mut(self.tile.0, self.tile.1).restore();
        }
        Disposition::Keep
    }

    fn on_collision(&mut self, _ctx: &mut TickCtx<'_>) -> Disposition {
        if self.active && self.frame_index > 0 {
            return Disposition::Lethal;
        }
        Disposition::Keep
    }
}

/// A trigger-started carrier that sails horizontally to its end tile at half
/// speed, taking the player along.
pub struct Boat {
    uid: String,
    level: Level,
    rect: Rect,
    end_tile: (i32, i32),
    target_left: i32,
    moving: bool,
    started: bool,
    ticks: u32,
}

impl Boat {
    const BASE_WIDTH: i32 = 3 * TILE_SIZE;

    pub fn new(uid: &str, level: Level, tile_points: &[(i32, i32)]) -> Self {
        let start = tile_points[0];
        let end_tile = *tile_points.last().unwrap_or(&start);
        let rect = grounded_base_rect(start, Self::BASE_WIDTH, BASE_RECT_HEIGHT);
        let target_left = grounded_base_rect(end_tile, Self::BASE_WIDTH, BASE_RECT_HEIGHT).left;
        Self {
            uid: uid.to_string(),
            level,
            rect,
            end_tile,
            target_left,
            moving: false,
            started: tile_points.len() < 2,
            ticks: 0,
        }
    }
}

impl Behavior for Boat {
    fn uid(&self) -> &str {
        &self.uid
    }

    fn level(&self) -> Level {
        self.level
    }

    fn base_rect(&self) -> Rect {
        self.rect
    }

    fn is_carrier(&self) -> bool {
        true
    }

    fn update(&mut self, ctx: &mut TickCtx<'_>) -> Disposition {
        self.ticks = (self.ticks + 1) % 2;
        if self.ticks == 1 {
            return Disposition::Keep;
        }
        if ctx.trigger && !self.started {
            self.started = true;
            self.moving = true;
            ctx.effects.push(GameEvent::BoatMoving);
        }
        if !self.moving {
            return Disposition::Keep;
        }
        let remaining = self.target_left - self.rect.left;
        if remaining.abs() <= MOVE_UNIT {
            self.moving = false;
            ctx.effects.push(GameEvent::BoatStopped(SpriteMetadata::Boat {
                uid: self.uid.clone(),
                end_tile: self.end_tile,
            }));
            return Disposition::Keep;
        }
        let dx = MOVE_UNIT * remaining.signum();
        let carrying = intersects_player(self.level, &self.rect, ctx.player);
        self.rect.translate(dx, 0);
        if carrying {
            ctx.player.carry(dx, 0);
        }
        Disposition::Keep
    }
}

/// Collectible coin.
pub struct Coin {
    uid: String,
    level: Level,
    rect: Rect,
}

impl Coin {
    pub fn new(uid: &str, level: Level, tile_points: &[(i32, i32)]) -> Self {
        Self {
            uid: uid.to_string(),
            level,
            rect: grounded_base_rect(tile_points[0], 8 * SCALAR, BASE_RECT_HEIGHT),
        }
    }
}

impl Behavior for Coin {
    fn uid(&self) -> &str {
        &self.uid
    }

    fn level(&self) -> Level {
        self.level
    }

    fn base_rect(&self) -> Rect {
        self.rect
    }

    fn on_collision(&mut self, ctx: &mut TickCtx<'_>) -> Disposition {
        ctx.player.add_coin();
        ctx.effects.push(GameEvent::CoinCollected(SpriteMetadata::Coin {
            uid: self.uid.clone(),
        }));
        Disposition::Remove
    }
}

/// Collectible key; spends on doors.
pub struct Key {
    uid: String,
    level: Level,
    rect: Rect,
}

impl Key {
    pub fn new(uid: &str, level: Level, tile_points: &[(i32, i32)]) -> Self {
        Self {
            uid: uid.to_string(),
            level,
            rect: grounded_base_rect(tile_points[0], 8 * SCALAR, BASE_RECT_HEIGHT),
        }
    }
}

impl Behavior for Key {
    fn uid(&self) -> &str {
        &self.uid
    }

    fn level(&self) -> Level {
        self.level
    }

    fn base_rect(&self) -> Rect {
        self.rect
    }

    fn on_collision(&mut self, ctx: &mut TickCtx<'_>) -> Disposition {
        ctx.player.add_key();
        ctx.effects.push(GameEvent::KeyCollected(SpriteMetadata::Key {
            uid: self.uid.clone(),
        }));
        Disposition::Remove
    }
}

/// A locked door. Its base rect pokes just past the bottom of its tile so
/// the player, blocked on the tile below, can still reach it with the
/// action key. Opening plays out over the animation before the tile
/// unlocks.
pub struct Door {
    uid: String,
    level: Level,
    tile: (i32, i32),
    rect: Rect,
    opening: bool,
    frame_ticks: u32,
    frame_index: u32,
}

impl Door {
    const BASE_WIDTH: i32 = 4 * SCALAR;

    pub fn new(uid: &str, level: Level, tile_points: &[(i32, i32)]) -> Self {
        let tile = tile_points[0];
        let mut rect = grounded_base_rect(tile, Self::BASE_WIDTH, BASE_RECT_HEIGHT);
        rect.translate(0, BASE_RECT_EXTEND);
        Self {
            uid: uid.to_string(),
            level,
            tile,
            rect,
            opening: false,
            frame_ticks: 0,
            frame_index: 0,
        }
    }
}

impl Behavior for Door {
    fn uid(&self) -> &str {
        &self.uid
    }

    fn level(&self) -> Level {
        self.level
    }

    fn base_rect(&self) -> Rect {
        self.rect
    }

    fn update(&mut self, ctx: &mut TickCtx<'_>) -> Disposition {
        if !self.opening {
            return Disposition::Keep;
        }
        self.frame_ticks += 1;
        if self.frame_ticks % DOOR_FRAME_SKIP == 0 {
            self.frame_index += 1;
            if self.frame_index == DOOR_FRAME_COUNT - 1 {
                let metadata = SpriteMetadata::Door {
                    uid: self.uid.clone(),
                    tile: self.tile,
                    level: self.level,
                };
                metadata.apply_map_actions(ctx.map);
                ctx.effects.push(GameEvent::DoorOpened(metadata));
                return Disposition::Remove;
            }
        }
        Disposition::Keep
    }

    fn on_action(&mut self, ctx: &mut TickCtx<'_>) -> Disposition {
        if !self.opening && ctx.player.take_key() {
            self.opening = true;
            ctx.effects.push(GameEvent::DoorOpening);
        }
        Disposition::Keep
    }
}

/// Touching a checkpoint captures the respawn point together with the
/// player's counters.
pub struct Checkpoint {
    uid: String,
    level: Level,
    tile: (i32, i32),
    rect: Rect,
}

impl Checkpoint {
    pub fn new(uid: &str, level: Level, tile_points: &[(i32, i32)]) -> Self {
        let tile = tile_points[0];
        Self {
            uid: uid.to_string(),
            level,
            tile,
            rect: grounded_base_rect(tile, 8 * SCALAR, BASE_RECT_HEIGHT),
        }
    }
}

impl Behavior for Checkpoint {
    fn uid(&self) -> &str {
        &self.uid
    }

    fn level(&self) -> Level {
        self.level
    }

    fn base_rect(&self) -> Rect {
        self.rect
    }

    fn on_collision(&mut self, ctx: &mut TickCtx<'_>) -> Disposition {
        ctx.effects
            .push(GameEvent::CheckpointReached(SpriteMetadata::Checkpoint {
                uid: self.uid.clone(),
                map_name: ctx.map.name().to_string(),
                tile: self.tile,
                level: self.level,
                coin_count: ctx.player.coin_count(),
                key_count: ctx.player.key_count(),
            }));
        Disposition::Remove
    }
}

/// Inert scenery: flames, chests, rocks. Present for rendering and nothing
/// else.
pub struct Scenery {
    uid: String,
    level: Level,
    rect: Rect,
}

impl Scenery {
    pub fn new(uid: &str, level: Level, tile_points: &[(i32, i32)]) -> Self {
        Self {
            uid: uid.to_string(),
            level,
            rect: grounded_base_rect(tile_points[0], 8 * SCALAR, BASE_RECT_HEIGHT),
        }
    }
}

impl Behavior for Scenery {
    fn uid(&self) -> &str {
        &self.uid
    }

    fn level(&self) -> Level {
        self.level
    }

    fn base_rect(&self) -> Rect {
        self.rect
    }
}
