//! Tile map model: the grid, per-tile level data, map-attached events and
//! the text-format loader.

pub mod events;
mod grid;
mod parser;
#[cfg(test)]
mod tests;
mod tile;

pub use events::{
    ActionEvent, BoundaryEvent, FallingEvent, MapSprite, MapTransitionEvent, SceneData,
    TileEvent, Transition,
};
pub use grid::{Footprint, RpgMap};
pub use parser::{MapCache, MapError, SharedMap};
pub use tile::{MapTile, MaskInfo, TileLayer};
