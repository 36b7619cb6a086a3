//! Keyboard-driven movement against the map's level-validity rules.
//!
//! Movement runs on a fixed tick. Each tick the resolver takes the pressed
//! direction bits and the actor's current footprint and decides one of:
//! move, run on the spot (a deferred corrective move lands next tick), turn
//! in place, or stay blocked. Diagonal movement only advances two ticks out
//! of three so it covers roughly the same ground per second as straight
//! movement.

use crate::geom::{Direction, Rect};
use crate::level::Level;
use crate::map::RpgMap;

pub const MOVE_UNIT: i32 = 2;
pub const FALL_UNIT: i32 = 2 * MOVE_UNIT;

const DIAGONAL_TICK: u32 = 3;

/// Pressed-direction bitset. Opposing bits (or no bits) yield no step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DirectionBits(u8);

impl DirectionBits {
    pub const NONE: Self = Self(0);
    pub const UP: Self = Self(1);
    pub const DOWN: Self = Self(2);
    pub const LEFT: Self = Self(4);
    pub const RIGHT: Self = Self(8);

    pub fn with(self, direction: Direction) -> Self {
        Self(self.0 | Self::from(direction).0)
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl From<Direction> for DirectionBits {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Up => Self::UP,
            Direction::Down => Self::DOWN,
            Direction::Left => Self::LEFT,
            Direction::Right => Self::RIGHT,
        }
    }
}

/// One tick's worth of requested movement. Diagonal steps face up or down,
/// never sideways.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Step {
    dx: i32,
    dy: i32,
    facing: Direction,
    diagonal: bool,
}

fn step_for(bits: DirectionBits) -> Option<Step> {
    let step = |dx, dy, facing, diagonal| Step {
        dx,
        dy,
        facing,
        diagonal,
    };
    match bits {
        DirectionBits::UP => Some(step(0, -MOVE_UNIT, Direction::Up, false)),
        DirectionBits::DOWN => Some(step(0, MOVE_UNIT, Direction::Down, false)),
        DirectionBits::LEFT => Some(step(-MOVE_UNIT, 0, Direction::Left, false)),
        DirectionBits::RIGHT => Some(step(MOVE_UNIT, 0, Direction::Right, false)),
        bits if bits == DirectionBits::UP.with(Direction::Left) => {
            Some(step(-MOVE_UNIT, -MOVE_UNIT, Direction::Up, true))
        }
        bits if bits == DirectionBits::UP.with(Direction::Right) => {
            Some(step(MOVE_UNIT, -MOVE_UNIT, Direction::Up, true))
        }
        bits if bits == DirectionBits::DOWN.with(Direction::Left) => {
            Some(step(-MOVE_UNIT, MOVE_UNIT, Direction::Down, true))
        }
        bits if bits == DirectionBits::DOWN.with(Direction::Right) => {
            Some(step(MOVE_UNIT, MOVE_UNIT, Direction::Down, true))
        }
        _ => None,
    }
}

/// What the actor should do this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing pressed, or an impossible combination.
    Idle,
    /// Apply the offset and adopt the level.
    Moved {
        level: Level,
        facing: Direction,
        dx: i32,
        dy: i32,
    },
    /// Animate in place; the stored move lands next tick.
    Deferred { level: Level, facing: Direction },
    /// Blocked, but facing changes.
    Turned { facing: Direction },
    Blocked,
}

/// Per-actor movement state: the last requested step, any deferred move and
/// the diagonal pacing counter.
#[derive(Debug, Default)]
pub struct MovementResolver {
    movement: Option<Step>,
    deferred: Option<(Level, Direction, i32, i32)>,
    ticks: u32,
}

impl MovementResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears all state, e.g. on a map switch.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Resolves one tick of movement. `facing` is the actor's current
    /// direction, used to detect a turn-in-place when blocked.
    pub fn resolve(
        &mut self,
        map: &RpgMap,
        level: Level,
        base_rect: &Rect,
        facing: Direction,
        bits: DirectionBits,
    ) -> Outcome {
        let Some(step) = step_for(bits) else {
            return Outcome::Idle;
        };
        if self.movement == Some(step) {
            self.ticks = (self.ticks + 1) % DIAGONAL_TICK;
            // a deferred move is applied as stored, without re-validation
            if let Some((level, facing, dx, dy)) = self.deferred.take() {
                return Outcome::Moved {
                    level,
                    facing,
                    dx,
                    dy,
                };
            }
        } else {
            self.ticks = 0;
        }
        self.movement = Some(step);

        let target = base_rect.translated(step.dx, step.dy);
        let (valid, level_after) = map.is_move_valid(level, &target);
        if valid {
            if step.diagonal && self.ticks == 0 {
                return self.defer(level_after, step.facing, step.dx, step.dy);
            }
            self.deferred = None;
            return Outcome::Moved {
                level: level_after,
                facing: step.facing,
                dx: step.dx,
                dy: step.dy,
            };
        }
        let outcome = if step.diagonal {
            self.slide(map, level, base_rect, step)
        } else {
            self.shuffle(map, level, base_rect, step)
        };
        if let Some(outcome) = outcome {
            return outcome;
        }
        if facing != step.facing {
            return Outcome::Turned {
                facing: step.facing,
            };
        }
        Outcome::Blocked
    }

    /// A blocked diagonal may still be valid in one of its components.
    fn slide(
        &mut self,
        map: &RpgMap,
        level: Level,
        base_rect: &Rect,
        step: Step,
    ) -> Option<Outcome> {
        let (valid, level_after) = map.is_move_valid(level, &base_rect.translated(step.dx, 0));
        if valid {
            return Some(self.defer(level_after, step.facing, step.dx, 0));
        }
        let (valid, level_after) = map.is_move_valid(level, &base_rect.translated(0, step.dy));
        if valid {
            return Some(self.defer(level_after, step.facing, 0, step.dy));
        }
        None
    }

    /// A blocked straight move may succeed after a perpendicular nudge that
    /// aligns the footprint with a step or doorway.
    fn shuffle(
        &mut self,
        map: &RpgMap,
        level: Level,
        base_rect: &Rect,
        step: Step,
    ) -> Option<Outcome> {
        if step.dx == 0 {
            let (valid, level_after, nudge) = map.is_vertical_valid(level, base_rect);
            if valid {
                return Some(self.defer(level_after, step.facing, nudge * MOVE_UNIT, 0));
            }
        } else {
            let (valid, level_after, nudge) = map.is_horizontal_valid(level, base_rect);
            if valid {
                return Some(self.defer(level_after, step.facing, 0, nudge * MOVE_UNIT));
            }
        }
        None
    }

    fn defer(&mut self, level: Level, facing: Direction, dx: i32, dy: i32) -> Outcome {
        self.deferred = Some((level, facing, dx, dy));
        Outcome::Deferred { level, facing }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_map(cols: i32, rows: i32) -> RpgMap {
        let mut map = RpgMap::new("test", None, cols, rows, Vec::new());
        for x in 0..cols {
            for y in 0..rows {
                map.tile_mut(x, y).add_level(Level::new(1));
            }
        }
        map
    }

    fn base_rect() -> Rect {
        // a typical footprint: slightly narrower than a tile
        Rect::new(34, 40, 28, 18)
    }

    #[test]
    fn opposing_bits_resolve_to_idle() {
        let map = open_map(4, 4);
        let mut resolver = MovementResolver::new();
        let bits = DirectionBits::UP.with(Direction::Down);
        assert_eq!(
            resolver.resolve(&map, Level::new(1), &base_rect(), Direction::Down, bits),
            Outcome::Idle
        );
        assert_eq!(
            resolver.resolve(
                &map,
                Level::new(1),
                &base_rect(),
                Direction::Down,
                DirectionBits::NONE
            ),
            Outcome::Idle
        );
    }

    #[test]
    fn straight_movement_applies_every_tick() {
        let map = open_map(4, 4);
        let mut resolver = MovementResolver::new();
        let mut rect = base_rect();
        for _ in 0..3 {
            let outcome = resolver.resolve(
                &map,
                Level::new(1),
                &rect,
                Direction::Right,
                DirectionBits::RIGHT,
            );
            assert_eq!(
                outcome,
                Outcome::Moved {
                    level: Level::new(1),
                    facing: Direction::Right,
                    dx: MOVE_UNIT,
                    dy: 0,
                }
            );
            rect.translate(MOVE_UNIT, 0);
        }
    }

    #[test]
    fn diagonal_movement_paces_two_ticks_in_three() {
        let map = open_map(6, 6);
        let mut resolver = MovementResolver::new();
        let mut rect = base_rect();
        let bits = DirectionBits::DOWN.with(Direction::Right);
        let mut moved = 0;
        for tick in 0..6 {
            let outcome = resolver.resolve(&map, Level::new(1), &rect, Direction::Down, bits);
            match outcome {
                Outcome::Moved { dx, dy, .. } => {
                    rect.translate(dx, dy);
                    moved += 1;
                }
                Outcome::Deferred { .. } => {
                    assert!(tick % 3 == 0, "deferred on tick {tick}");
                }
                other => panic!("unexpected outcome {other:?}"),
            }
        }
        assert_eq!(moved, 4);
    }

    #[test]
    fn blocked_movement_turns_in_place_once() {
        // only the bottom tile is walkable; the top tile has no levels
        let mut map = RpgMap::new("test", None, 1, 2, Vec::new());
        map.tile_mut(0, 1).add_level(Level::new(1));
        let mut resolver = MovementResolver::new();
        let rect = Rect::new(2, 33, 28, 18);
        assert_eq!(
            resolver.resolve(&map, Level::new(1), &rect, Direction::Down, DirectionBits::UP),
            Outcome::Turned {
                facing: Direction::Up
            }
        );
        assert_eq!(
            resolver.resolve(&map, Level::new(1), &rect, Direction::Up, DirectionBits::UP),
            Outcome::Blocked
        );
    }

    #[test]
    fn blocked_diagonal_slides_along_the_valid_axis() {
        // walkable corridor along the bottom row; the top row blocks the
        // vertical component
        let mut map = RpgMap::new("test", None, 6, 2, Vec::new());
        for x in 0..6 {
            map.tile_mut(x, 1).add_level(Level::new(1));
        }
        let mut resolver = MovementResolver::new();
        let rect = Rect::new(34, 33, 28, 18);
        let bits = DirectionBits::UP.with(Direction::Right);
        let outcome = resolver.resolve(&map, Level::new(1), &rect, Direction::Up, bits);
        assert_eq!(
            outcome,
            Outcome::Deferred {
                level: Level::new(1),
                facing: Direction::Up
            }
        );
        // the deferred slide lands next tick as a pure horizontal move
        let outcome = resolver.resolve(&map, Level::new(1), &rect, Direction::Up, bits);
        assert_eq!(
            outcome,
            Outcome::Moved {
                level: Level::new(1),
                facing: Direction::Up,
                dx: MOVE_UNIT,
                dy: 0,
            }
        );
    }

    #[test]
    fn blocked_straight_move_shuffles_toward_alignment() {
        // a doorway: only the middle column continues upward
        let mut map = RpgMap::new("test", None, 3, 2, Vec::new());
        for x in 0..3 {
            map.tile_mut(x, 1).add_level(Level::new(1));
        }
        map.tile_mut(1, 0).add_level(Level::new(1));
        let mut resolver = MovementResolver::new();
        // straddling columns 0 and 1, closer to column 1
        let rect = Rect::new(26, 33, 28, 18);
        let outcome =
            resolver.resolve(&map, Level::new(1), &rect, Direction::Up, DirectionBits::UP);
        assert_eq!(
            outcome,
            Outcome::Deferred {
                level: Level::new(1),
                facing: Direction::Up
            }
        );
        let outcome =
            resolver.resolve(&map, Level::new(1), &rect, Direction::Up, DirectionBits::UP);
        assert_eq!(
            outcome,
            Outcome::Moved {
                level: Level::new(1),
                facing: Direction::Up,
                dx: MOVE_UNIT,
                dy: 0,
            }
        );
    }
}
