//! Turns the map's sprite placeholders into live behaviors, consulting the
//! registry so collected or opened sprites stay gone between visits.

use engine::{Level, Registry, RpgMap};
use tracing::{debug, warn};

use crate::behaviors::{
    Beetle, Behavior, Blades, Boat, Checkpoint, Coin, Door, Key, Scenery, Wasp,
};

fn build(kind: &str, uid: &str, level: Level, tile_points: &[(i32, i32)]) -> Option<Box<dyn Behavior>> {
    let behavior: Box<dyn Behavior> = match kind {
        "beetle" => Box::new(Beetle::new(uid, level, tile_points)),
        "wasp" => Box::new(Wasp::new(uid, level, tile_points)),
        "blades" => Box::new(Blades::new(uid, level, tile_points)),
        "boat" => Box::new(Boat::new(uid, level, tile_points)),
        "coin" => Box::new(Coin::new(uid, level, tile_points)),
        "key" => Box::new(Key::new(uid, level, tile_points)),
        "door" => Box::new(Door::new(uid, level, tile_points)),
        "checkpoint" => Box::new(Checkpoint::new(uid, level, tile_points)),
        "flames" | "chest" | "rock" => Box::new(Scenery::new(uid, level, tile_points)),
        _ => return None,
    };
    Some(behavior)
}

/// Builds the behaviors for a freshly loaded map. Registered metadata removes
/// sprites (re-applying their map actions, e.g. an opened door's unlocked
/// tile) or overrides their placement (a boat resting at its end point).
pub fn build_sprites(map: &mut RpgMap, registry: &mut Registry) -> Vec<Box<dyn Behavior>> {
    let descriptors = map.sprites().to_vec();
    let mut behaviors: Vec<Box<dyn Behavior>> = Vec::with_capacity(descriptors.len());
    for sprite in descriptors {
        let mut tile_points = sprite.tile_points.clone();
        if let Some(metadata) = registry.metadata(&sprite.uid) {
            if metadata.removed_from_map() {
                debug!(uid = %sprite.uid, "sprite_already_taken");
                metadata.apply_map_actions(map);
                continue;
            }
            if let Some(points) = metadata.override_tile_points() {
                tile_points = points;
            }
        }
        if tile_points.is_empty() {
            warn!(uid = %sprite.uid, "sprite_without_tile_points");
            continue;
        }
        match build(&sprite.kind, &sprite.uid, sprite.level, &tile_points) {
            Some(behavior) => behaviors.push(behavior),
            None => warn!(kind = %sprite.kind, uid = %sprite.uid, "unknown_sprite_kind"),
        }
    }
    behaviors
}
