use std::ops::RangeInclusive;

use crate::geom::Direction;
use crate::level::Level;

/// Map events come in two parts: the event itself (what the player just did,
/// e.g. breached a boundary) and a transition describing what happens next
/// (e.g. replace the current map with another one). Falling events are the
/// exception and carry no transition. All of these are built at map-load time
/// and immutable afterwards; the state sequencer consumes them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundaryEvent {
    pub boundary: Direction,
    /// Tile indices along the breached edge that this event covers.
    pub range: RangeInclusive<i32>,
    pub transition: Transition,
}

/// Triggered when the player's footprint stands on the tile at the event's
/// level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileEvent {
    pub x: i32,
    pub y: i32,
    pub level: Level,
    pub transition: Transition,
}

/// Triggered when every tile under the player's footprint is a ledge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FallingEvent {
    /// The level reached after the fall.
    pub down_level: i32,
}

/// Result of a tile/falling event query against the map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionEvent {
    Tile(TileEvent),
    Falling(FallingEvent),
}

/// Spawn data shared by scene-style transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneData {
    pub map_name: String,
    pub tile: (i32, i32),
    pub level: Level,
    pub direction: Direction,
    /// When entering via a doorway on a map edge, the edge the player slides
    /// in from.
    pub boundary: Option<Direction>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Walking off one map edge onto the adjacent map.
    Boundary {
        map_name: String,
        boundary: Direction,
        /// Whole-tile offset applied to the player's position on the new map.
        modifier: i32,
    },
    /// Switching scene entirely, e.g. walking into a cave.
    Scene(SceneData),
    /// Scene reset after the player loses a life.
    LifeLost(SceneData),
    EndGame,
}

/// A map transition event as dispatched on the bus; keeps the originating
/// event so consumers can position the player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MapTransitionEvent {
    Boundary(BoundaryEvent),
    Tile(TileEvent),
}

impl MapTransitionEvent {
    pub fn transition(&self) -> &Transition {
        match self {
            Self::Boundary(event) => &event.transition,
            Self::Tile(event) => &event.transition,
        }
    }
}

/// Sprite placeholder parsed from a map file; the game layer turns these into
/// live sprites.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapSprite {
    pub kind: String,
    pub uid: String,
    pub level: Level,
    pub tile_points: Vec<(i32, i32)>,
}
