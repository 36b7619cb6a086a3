use std::collections::HashMap;

use crate::level::Level;
use crate::map::events::TileEvent;
use crate::TILE_SIZE;

/// A reference to one visual layer of a tile: a named tile within a named
/// tileset. Paint order follows the layer list; the last layer wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileLayer {
    pub tileset: String,
    pub name: String,
}

/// Occlusion-mask descriptor for one of a tile's layers. The derived depth
/// places the mask in the same pseudo-z ordering used for sprites; a sprite
/// with a smaller depth draws behind the mask layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaskInfo {
    pub layer: usize,
    pub level: Level,
    pub flat: bool,
    pub depth: i32,
}

/// One cell of the map grid. Tiles carry the levels a footprint may stand on,
/// transitional "special" levels for steps, falling ledges, visual layers,
/// occlusion masks and gameplay events. Owned exclusively by `RpgMap`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MapTile {
    pub x: i32,
    pub y: i32,
    levels: Vec<Level>,
    special_levels: HashMap<i32, Level>,
    down_levels: HashMap<Level, i32>,
    layers: Vec<TileLayer>,
    masks: Vec<MaskInfo>,
    events: Vec<TileEvent>,
    original_levels: Option<Vec<Level>>,
}

impl MapTile {
    pub fn new(x: i32, y: i32) -> Self {
        Self {
            x,
            y,
            ..Self::default()
        }
    }

    pub fn add_level(&mut self, level: Level) {
        self.levels.push(level);
    }

    /// Registers a special (transitional) level. A whole special is keyed to
    /// itself; a half level is keyed under both its floor and ceiling so a
    /// lookup by either adjacent whole level finds it.
    pub fn add_special_level(&mut self, level: Level) {
        self.special_levels.insert(level.floor_whole(), level);
        if !level.is_whole() {
            self.special_levels.insert(level.ceil_whole(), level);
        }
    }

    pub fn add_down_level(&mut self, level: Level, down_level: i32) {
        self.down_levels.insert(level, down_level);
    }

    pub fn add_layer(&mut self, layer: TileLayer) {
        self.layers.push(layer);
    }

    pub fn add_mask(&mut self, layer: usize, level: i32, flat: bool) {
        self.masks.push(MaskInfo {
            layer,
            level: Level::new(level),
            flat,
            depth: (self.y + 1) * TILE_SIZE + level * TILE_SIZE - 1,
        });
    }

    pub fn add_event(&mut self, event: TileEvent) {
        self.events.push(event);
    }

    pub fn levels(&self) -> &[Level] {
        &self.levels
    }

    pub fn layers(&self) -> &[TileLayer] {
        &self.layers
    }

    /// Adds a level dynamically (e.g. a door opening onto a bridge tile),
    /// snapshotting the parsed levels the first time so `restore` can roll
    /// the tile back.
    pub fn add_new_level(&mut self, level: Level) {
        if self.original_levels.is_none() {
            self.original_levels = Some(self.levels.clone());
        }
        self.add_level(level);
    }

    /// Rolls back any dynamically added levels; a no-op when nothing was
    /// added.
    pub fn restore(&mut self) {
        if let Some(original) = self.original_levels.take() {
            self.levels = original;
        }
    }

    /// Tests whether a footprint at `level` may stand on this tile. Returns
    /// the same-level match count (0 or 1) and any nearby special level. A
    /// registered down level counts as an exact stand (the fall is resolved
    /// later, by the action-event query). A special level always surfaces but
    /// only counts as a match when numerically equal to the query.
    pub fn test_validity(&self, level: Level) -> (u32, Option<Level>) {
        if self.levels.contains(&level) {
            return (1, None);
        }
        if self.down_level_at(level).is_some() {
            return (1, None);
        }
        if let Some(special) = self.special_level_near(level) {
            if special == level {
                return (1, Some(special));
            }
            return (0, Some(special));
        }
        (0, None)
    }

    /// Looks up a special level by exact key, then floor, then ceiling.
    pub fn special_level_near(&self, level: Level) -> Option<Level> {
        if let Some(&special) = self.special_levels.get(&level.floor_whole()) {
            return Some(special);
        }
        self.special_levels.get(&level.ceil_whole()).copied()
    }

    pub fn down_level_at(&self, level: Level) -> Option<i32> {
        self.down_levels.get(&level).copied()
    }

    pub fn event_at(&self, level: Level) -> Option<&TileEvent> {
        self.events.iter().find(|event| event.level == level)
    }

    /// Selects the mask layers that should be painted over a sprite standing
    /// at the given level and depth. Masks deeper than the sprite occlude it
    /// unless they are flat and at the sprite's own level (a floor never
    /// hides a sprite standing on it). Masks at or above the sprite's depth
    /// occlude only non-upright sprites, and only when non-flat and at the
    /// sprite's level or higher, so fallen or low-profile sprites can sit
    /// behind same-level scenery.
    pub fn masks_for(&self, level: Level, z: i32, upright: bool) -> Vec<&TileLayer> {
        let mut selected = Vec::new();
        for mask in &self.masks {
            if mask.depth > z {
                if mask.flat && mask.level == level {
                    continue;
                }
                selected.push(&self.layers[mask.layer]);
            } else if !upright && !mask.flat && mask.level >= level {
                selected.push(&self.layers[mask.layer]);
            }
        }
        selected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layer(name: &str) -> TileLayer {
        TileLayer {
            tileset: "test".to_string(),
            name: name.to_string(),
        }
    }

    #[test]
    fn whole_levels_match_exactly() {
        let mut tile = MapTile::new(0, 0);
        tile.add_level(Level::new(1));
        assert_eq!(tile.test_validity(Level::new(1)), (1, None));
        assert_eq!(tile.test_validity(Level::new(2)), (0, None));
        assert_eq!(tile.test_validity(Level::from_halves(3)), (0, None));
    }

    #[test]
    fn special_level_surfaces_from_either_adjacent_whole() {
        let mut tile = MapTile::new(0, 0);
        tile.add_special_level(Level::from_halves(3)); // 1.5
        let step = Some(Level::from_halves(3));
        assert_eq!(tile.test_validity(Level::new(1)), (0, step));
        assert_eq!(tile.test_validity(Level::new(2)), (0, step));
        assert_eq!(tile.test_validity(Level::from_halves(3)), (1, step));
    }

    #[test]
    fn whole_special_is_keyed_to_itself() {
        let mut tile = MapTile::new(0, 0);
        tile.add_special_level(Level::new(2));
        assert_eq!(tile.test_validity(Level::new(2)), (1, Some(Level::new(2))));
        // 1.5 resolves through its ceiling key.
        assert_eq!(
            tile.test_validity(Level::from_halves(3)),
            (0, Some(Level::new(2)))
        );
        assert_eq!(tile.test_validity(Level::new(1)), (0, None));
    }

    #[test]
    fn down_level_counts_as_a_stand_even_when_zero() {
        let mut tile = MapTile::new(0, 0);
        tile.add_down_level(Level::new(1), 0);
        assert_eq!(tile.test_validity(Level::new(1)), (1, None));
        assert_eq!(tile.down_level_at(Level::new(1)), Some(0));
        assert_eq!(tile.down_level_at(Level::new(2)), None);
    }

    #[test]
    fn add_new_level_then_restore_round_trips() {
        let mut tile = MapTile::new(0, 0);
        tile.add_level(Level::new(1));
        let before = tile.levels().to_vec();

        tile.add_new_level(Level::new(2));
        assert_eq!(tile.test_validity(Level::new(2)), (1, None));
        tile.add_new_level(Level::new(3));

        tile.restore();
        assert_eq!(tile.levels(), before.as_slice());
        // idempotent
        tile.restore();
        assert_eq!(tile.levels(), before.as_slice());
    }

    #[test]
    fn deep_mask_skipped_only_when_flat_at_sprite_level() {
        let mut tile = MapTile::new(0, 2);
        tile.add_layer(layer("ground"));
        tile.add_layer(layer("ledge"));
        tile.add_mask(1, 2, true);
        // mask depth = 3 * 32 + 2 * 32 - 1 = 159
        let sprite_z = 120;
        assert_eq!(tile.masks_for(Level::new(1), sprite_z, true).len(), 1);
        assert_eq!(tile.masks_for(Level::new(2), sprite_z, true).len(), 0);
    }

    #[test]
    fn shallow_mask_occludes_fallen_sprites_behind_scenery() {
        let mut tile = MapTile::new(0, 2);
        tile.add_layer(layer("wall"));
        tile.add_mask(0, 2, false);
        let sprite_z = 200; // deeper than the mask
        assert_eq!(tile.masks_for(Level::new(1), sprite_z, true).len(), 0);
        assert_eq!(tile.masks_for(Level::new(1), sprite_z, false).len(), 1);
        // scenery below the sprite's level never covers it
        assert_eq!(tile.masks_for(Level::new(3), sprite_z, false).len(), 0);
    }
}
