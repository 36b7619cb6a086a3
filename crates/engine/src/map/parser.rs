//! Loader for the plain-text map format.
//!
//! Each non-blank line describes one tile, sprite, event or the map's music
//! track:
//!
//! ```text
//! 10,4 [1] water:dark grass:l2 wood:lrs_supp:3
//! sprite coin 2 5,3
//! event boundary right 1-2 : boundary eastwood left
//! event tile 4,2 2 : transition caves 6,2 2 down
//! music forest
//! ```
//!
//! A tile line is a coordinate, an optional `[..]` level list (`S` prefixes a
//! special level, `D2-1` a ledge from level 2 down to 1) and then visual
//! layers as `tileset:tile` pairs, optionally carrying a mask level (`:2`
//! flat, `:V2` vertical). Malformed lines are skipped, so a map with a bad
//! line degrades instead of failing to load.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use thiserror::Error;
use tracing::{debug, info};

use crate::geom::Direction;
use crate::level::Level;
use crate::map::events::{BoundaryEvent, MapSprite, SceneData, TileEvent, Transition};
use crate::map::grid::RpgMap;
use crate::map::tile::TileLayer;

/// Maps are shared between the loader cache and the running state, and the
/// running state mutates them (doors add levels), hence the shared cell.
pub type SharedMap = Rc<RefCell<RpgMap>>;

#[derive(Debug, Error)]
pub enum MapError {
    #[error("failed to read map file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Loads maps from a directory and caches them by name. A cache hit restores
/// the map first, rolling back any levels gameplay added on a previous visit.
#[derive(Debug, Default)]
pub struct MapCache {
    maps_dir: PathBuf,
    cache: HashMap<String, SharedMap>,
}

impl MapCache {
    pub fn new(maps_dir: impl Into<PathBuf>) -> Self {
        Self {
            maps_dir: maps_dir.into(),
            cache: HashMap::new(),
        }
    }

    pub fn load(&mut self, name: &str) -> Result<SharedMap, MapError> {
        if let Some(map) = self.cache.get(name) {
            map.borrow_mut().restore();
            return Ok(Rc::clone(map));
        }
        let path = self.maps_dir.join(format!("{name}.map"));
        let map = load_map_file(name, &path)?;
        info!(
            map = %name,
            cols = map.cols(),
            rows = map.rows(),
            sprites = map.sprites().len(),
            "map_loaded"
        );
        let shared = Rc::new(RefCell::new(map));
        self.cache.insert(name.to_string(), Rc::clone(&shared));
        Ok(shared)
    }
}

fn load_map_file(name: &str, path: &Path) -> Result<RpgMap, MapError> {
    let text = fs::read_to_string(path).map_err(|source| MapError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_map(name, &text))
}

fn parse_map(name: &str, text: &str) -> RpgMap {
    let mut tile_lines: Vec<(i32, i32, Vec<String>)> = Vec::new();
    let mut sprite_lines: Vec<Vec<String>> = Vec::new();
    let mut event_lines: Vec<Vec<String>> = Vec::new();
    let mut music = None;
    let (mut max_x, mut max_y) = (0, 0);

    for line in text.lines() {
        let bits: Vec<String> = line.split_whitespace().map(str::to_string).collect();
        let Some(first) = bits.first() else { continue };
        match first.as_str() {
            "sprite" if bits.len() > 1 => sprite_lines.push(bits[1..].to_vec()),
            "event" if bits.len() > 1 => event_lines.push(bits[1..].to_vec()),
            "music" if bits.len() > 1 => music = Some(bits[1].clone()),
            _ => {
                let Some((x, y)) = parse_xy(first, ',') else {
                    debug!(map = %name, line, "map_line_skipped");
                    continue;
                };
                max_x = max_x.max(x);
                max_y = max_y.max(y);
                if bits.len() > 1 {
                    tile_lines.push((x, y, bits[1..].to_vec()));
                }
            }
        }
    }

    let sprites = parse_sprites(name, &sprite_lines);
    let mut map = RpgMap::new(name, music, max_x + 1, max_y + 1, sprites);
    for (x, y, bits) in &tile_lines {
        if !apply_tile_line(&mut map, *x, *y, bits) {
            debug!(map = %name, x, y, "tile_line_skipped");
        }
    }
    for bits in &event_lines {
        if !apply_event_line(&mut map, bits) {
            debug!(map = %name, line = bits.join(" "), "event_line_skipped");
        }
    }
    map
}

fn apply_tile_line(map: &mut RpgMap, x: i32, y: i32, bits: &[String]) -> bool {
    let tile = map.tile_mut(x, y);
    let mut layer_bits = bits;
    if let Some(levels) = bits[0].strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
        layer_bits = &bits[1..];
        for token in levels.split(',') {
            let applied = if let Some(special) = token.strip_prefix('S') {
                Level::parse(special).map(|level| tile.add_special_level(level))
            } else if let Some(down) = token.strip_prefix('D') {
                parse_xy(down, '-')
                    .map(|(from, to)| tile.add_down_level(Level::new(from), to))
            } else {
                token.parse::<i32>().ok().map(|n| tile.add_level(Level::new(n)))
            };
            if applied.is_none() {
                return false;
            }
        }
    }
    for (index, layer) in layer_bits.iter().enumerate() {
        let parts: Vec<&str> = layer.split(':').collect();
        if parts.len() < 2 {
            continue;
        }
        tile.add_layer(TileLayer {
            tileset: parts[0].to_string(),
            name: parts[1].to_string(),
        });
        if parts.len() > 2 {
            let mask = parts[2];
            let parsed = if let Some(level) = mask.strip_prefix('V') {
                level.parse::<i32>().ok().map(|n| (n, false))
            } else {
                mask.parse::<i32>().ok().map(|n| (n, true))
            };
            match parsed {
                Some((level, flat)) => tile.add_mask(index, level, flat),
                None => return false,
            }
        }
    }
    true
}

fn parse_sprites(map_name: &str, sprite_lines: &[Vec<String>]) -> Vec<MapSprite> {
    let mut sprites = Vec::new();
    let mut kind_counts: HashMap<&str, u32> = HashMap::new();
    for bits in sprite_lines {
        if bits.len() < 3 {
            continue;
        }
        let kind = bits[0].as_str();
        let Ok(level) = bits[1].parse::<i32>() else { continue };
        let tile_points: Vec<(i32, i32)> = bits[2..]
            .iter()
            .filter_map(|xy| parse_xy(xy, ','))
            .collect();
        if tile_points.len() != bits.len() - 2 {
            continue;
        }
        let count = kind_counts.entry(kind).or_insert(0);
        let uid = format!("{map_name}:{kind}:{count}");
        *count += 1;
        sprites.push(MapSprite {
            kind: kind.to_string(),
            uid,
            level: Level::new(level),
            tile_points,
        });
    }
    sprites
}

fn apply_event_line(map: &mut RpgMap, bits: &[String]) -> bool {
    let Some(colon) = bits.iter().position(|bit| bit == ":") else {
        return false;
    };
    let (event_bits, transition_bits) = (&bits[..colon], &bits[colon + 1..]);
    let Some(transition) = parse_transition(transition_bits) else {
        return false;
    };
    match event_bits.first().map(String::as_str) {
        Some("boundary") if event_bits.len() >= 3 => {
            let Some(boundary) = Direction::parse(&event_bits[1]) else {
                return false;
            };
            let range = if event_bits[2].contains('-') {
                match parse_xy(&event_bits[2], '-') {
                    Some((min, max)) => min..=max,
                    None => return false,
                }
            } else {
                match event_bits[2].parse::<i32>() {
                    Ok(index) => index..=index,
                    Err(_) => return false,
                }
            };
            map.add_boundary_event(BoundaryEvent {
                boundary,
                range,
                transition,
            });
            true
        }
        Some("tile") if event_bits.len() >= 3 => {
            let Some((x, y)) = parse_xy(&event_bits[1], ',') else {
                return false;
            };
            let Ok(level) = event_bits[2].parse::<i32>() else {
                return false;
            };
            map.add_tile_event(TileEvent {
                x,
                y,
                level: Level::new(level),
                transition,
            });
            true
        }
        _ => false,
    }
}

fn parse_transition(bits: &[String]) -> Option<Transition> {
    match bits.first().map(String::as_str)? {
        "boundary" if bits.len() >= 3 => Some(Transition::Boundary {
            map_name: bits[1].clone(),
            boundary: Direction::parse(&bits[2])?,
            modifier: match bits.get(3) {
                Some(modifier) => modifier.parse().ok()?,
                None => 0,
            },
        }),
        "transition" if bits.len() >= 5 => Some(Transition::Scene(SceneData {
            map_name: bits[1].clone(),
            tile: parse_xy(&bits[2], ',')?,
            level: Level::new(bits[3].parse().ok()?),
            direction: Direction::parse(&bits[4])?,
            boundary: match bits.get(5) {
                Some(boundary) => Some(Direction::parse(boundary)?),
                None => None,
            },
        })),
        "end" => Some(Transition::EndGame),
        _ => None,
    }
}

fn parse_xy(token: &str, delimiter: char) -> Option<(i32, i32)> {
    let (x, y) = token.split_once(delimiter)?;
    Some((x.trim().parse().ok()?, y.trim().parse().ok()?))
}
