//! Persistent game state: which sprites have been collected or opened, where
//! the player is, and the last checkpoint snapshot to respawn from.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::level::Level;
use crate::map::RpgMap;

/// Per-sprite state worth remembering across map visits. Registered metadata
/// usually means "this sprite is gone now"; doors additionally unlock a map
/// tile and boats instead remember where they ended up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SpriteMetadata {
    Coin {
        uid: String,
    },
    Key {
        uid: String,
    },
    Door {
        uid: String,
        tile: (i32, i32),
        level: Level,
    },
    Checkpoint {
        uid: String,
        map_name: String,
        tile: (i32, i32),
        level: Level,
        coin_count: u32,
        key_count: u32,
    },
    Boat {
        uid: String,
        end_tile: (i32, i32),
    },
}

impl SpriteMetadata {
    pub fn uid(&self) -> &str {
        match self {
            Self::Coin { uid }
            | Self::Key { uid }
            | Self::Door { uid, .. }
            | Self::Checkpoint { uid, .. }
            | Self::Boat { uid, .. } => uid,
        }
    }

    /// Whether registered metadata removes the sprite from the map on the
    /// next visit.
    pub fn removed_from_map(&self) -> bool {
        !matches!(self, Self::Boat { .. })
    }

    /// Map mutations implied by this state, e.g. an opened door making its
    /// tile walkable at the door's level.
    pub fn apply_map_actions(&self, map: &mut RpgMap) {
        if let Self::Door { tile, level, .. } = self {
            map.add_level(tile.0, tile.1, *level);
        }
    }

    /// Replacement patrol points, when the sprite's resting position differs
    /// from where the map file placed it.
    pub fn override_tile_points(&self) -> Option<Vec<(i32, i32)>> {
        match self {
            Self::Boat { end_tile, .. } => Some(vec![*end_tile]),
            _ => None,
        }
    }
}

/// The full persistent state. Cloning it yields a snapshot; a save game is
/// just this struct serialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Registry {
    pub map_name: String,
    /// Player spawn tile on `map_name`.
    pub player_position: (i32, i32),
    pub player_level: Level,
    pub coin_count: u32,
    pub key_count: u32,
    sprite_metadata: HashMap<String, SpriteMetadata>,
    checkpoint: Option<SpriteMetadata>,
}

impl Registry {
    pub fn new(map_name: impl Into<String>, player_position: (i32, i32), player_level: Level) -> Self {
        Self {
            map_name: map_name.into(),
            player_position,
            player_level,
            coin_count: 0,
            key_count: 0,
            sprite_metadata: HashMap::new(),
            checkpoint: None,
        }
    }

    pub fn register(&mut self, metadata: SpriteMetadata) {
        self.sprite_metadata
            .insert(metadata.uid().to_string(), metadata);
    }

    /// Looks up metadata for a sprite being built. The pending checkpoint is
    /// handed out once: after a respawn the checkpoint sprite consumes it and
    /// is removed from its map exactly one time.
    pub fn metadata(&mut self, uid: &str) -> Option<SpriteMetadata> {
        if self
            .checkpoint
            .as_ref()
            .is_some_and(|checkpoint| checkpoint.uid() == uid)
        {
            return self.checkpoint.take();
        }
        self.sprite_metadata.get(uid).cloned()
    }

    pub fn take_snapshot(&self) -> Self {
        self.clone()
    }

    /// Builds the registry a respawn restores: the checkpoint's map, spawn
    /// tile and counts, with collected-sprite state carried over.
    pub fn checkpoint_reached(&self, checkpoint: &SpriteMetadata) -> Option<Self> {
        let SpriteMetadata::Checkpoint {
            uid,
            map_name,
            tile,
            level,
            coin_count,
            key_count,
        } = checkpoint
        else {
            return None;
        };
        info!(checkpoint = %uid, map = %map_name, "checkpoint_reached");
        Some(Self {
            map_name: map_name.clone(),
            player_position: *tile,
            player_level: *level,
            coin_count: *coin_count,
            key_count: *key_count,
            sprite_metadata: self.sprite_metadata.clone(),
            checkpoint: Some(checkpoint.clone()),
        })
    }
}

/// Holds the live registry alongside the snapshot a lost life falls back to.
#[derive(Debug, Clone)]
pub struct RegistryHandler {
    registry: Registry,
    snapshot: Registry,
}

impl RegistryHandler {
    pub fn new(registry: Registry) -> Self {
        let snapshot = registry.take_snapshot();
        Self { registry, snapshot }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    pub fn register(&mut self, metadata: SpriteMetadata) {
        self.registry.register(metadata);
    }

    /// A checkpoint replaces the respawn snapshot rather than mutating the
    /// live registry.
    pub fn checkpoint_reached(&mut self, checkpoint: &SpriteMetadata) {
        if let Some(snapshot) = self.registry.checkpoint_reached(checkpoint) {
            self.snapshot = snapshot;
        }
    }

    /// Abandons the live registry and resumes from the snapshot.
    pub fn switch_to_snapshot(&mut self) {
        self.registry = self.snapshot.take_snapshot();
    }

    pub fn take_snapshot(&mut self) {
        self.snapshot = self.registry.take_snapshot();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coin(uid: &str) -> SpriteMetadata {
        SpriteMetadata::Coin {
            uid: uid.to_string(),
        }
    }

    fn checkpoint(uid: &str) -> SpriteMetadata {
        SpriteMetadata::Checkpoint {
            uid: uid.to_string(),
            map_name: "caves".to_string(),
            tile: (4, 6),
            level: Level::new(2),
            coin_count: 7,
            key_count: 1,
        }
    }

    #[test]
    fn registered_metadata_removes_sprites_on_rebuild() {
        let mut registry = Registry::new("forest", (1, 1), Level::new(1));
        registry.register(coin("forest:coin:0"));
        let metadata = registry.metadata("forest:coin:0").unwrap();
        assert!(metadata.removed_from_map());
        assert!(registry.metadata("forest:coin:1").is_none());
    }

    #[test]
    fn door_metadata_unlocks_its_tile() {
        let mut map = RpgMap::new("keep", None, 3, 3, Vec::new());
        let door = SpriteMetadata::Door {
            uid: "keep:door:0".to_string(),
            tile: (2, 1),
            level: Level::new(1),
        };
        door.apply_map_actions(&mut map);
        assert_eq!(map.tile(2, 1).test_validity(Level::new(1)), (1, None));
    }

    #[test]
    fn pending_checkpoint_is_handed_out_once() {
        let registry = Registry::new("forest", (1, 1), Level::new(1));
        let mut respawn = registry.checkpoint_reached(&checkpoint("caves:checkpoint:0")).unwrap();
        assert_eq!(respawn.map_name, "caves");
        assert_eq!(respawn.player_position, (4, 6));
        assert_eq!(respawn.coin_count, 7);
        assert!(respawn.metadata("caves:checkpoint:0").is_some());
        // consumed: the next rebuild spawns the checkpoint sprite again
        assert!(respawn.metadata("caves:checkpoint:0").is_none());
    }

    #[test]
    fn snapshot_survives_later_mutation() {
        let mut handler = RegistryHandler::new(Registry::new("forest", (1, 1), Level::new(1)));
        handler.register(coin("forest:coin:0"));
        handler.registry_mut().coin_count += 1;
        handler.switch_to_snapshot();
        assert_eq!(handler.registry().coin_count, 0);
        assert!(handler.registry_mut().metadata("forest:coin:0").is_none());
    }

    #[test]
    fn checkpoint_updates_the_respawn_point_only() {
        let mut handler = RegistryHandler::new(Registry::new("forest", (1, 1), Level::new(1)));
        handler.checkpoint_reached(&checkpoint("caves:checkpoint:0"));
        assert_eq!(handler.registry().map_name, "forest");
        handler.switch_to_snapshot();
        assert_eq!(handler.registry().map_name, "caves");
        assert_eq!(handler.registry().player_position, (4, 6));
    }

    #[test]
    fn registry_round_trips_through_json() {
        let mut registry = Registry::new("forest", (3, 2), Level::from_halves(3));
        registry.register(coin("forest:coin:0"));
        registry.key_count = 2;
        let json = serde_json::to_string(&registry).unwrap();
        let restored: Registry = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, registry);
    }
}
