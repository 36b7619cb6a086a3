use std::collections::{BTreeMap, BTreeSet, HashMap};

use tracing::debug;

use crate::geom::{Direction, Rect};
use crate::level::Level;
use crate::map::events::{
    ActionEvent, BoundaryEvent, FallingEvent, MapSprite, TileEvent,
};
use crate::map::tile::{MapTile, TileLayer};
use crate::TILE_SIZE;

/// The moving-actor contract the map queries against. The map never
/// constructs or mutates actors; any value exposing a world rectangle, a
/// level, a pseudo-z depth and an upright flag will do.
pub trait Footprint {
    /// The full world-space rectangle (not just the foot area).
    fn rect(&self) -> Rect;
    fn level(&self) -> Level;
    fn z(&self) -> i32;
    fn upright(&self) -> bool;
}

/// The main map: a grid of tiles plus the level-validity algorithm that
/// restricts movement.
///
/// Each tile has zero or more levels that determine whether a sprite can move
/// onto it. At its most basic, a sprite at level 1 is blocked from a tile
/// holding only level 2. Steps make this more interesting: a staircase
/// linking levels 1 and 2 is tagged with special levels,
///
/// ```text
/// [2]  [S2]  [2]
/// [X] [S1.5] [X]
/// [1] [S1.5] [1]
/// [1]  [S1]  [1]
/// ```
///
/// where `[X]` is inaccessible and `[S*]` are specials. Movement is valid
/// when either every base tile matches the sprite's level exactly, or every
/// base tile is a special and the spread between the smallest and largest
/// special is under one level. On success the sprite's level becomes the
/// resolved landing level, which is how it climbs from one level to another.
#[derive(Debug)]
pub struct RpgMap {
    name: String,
    music: Option<String>,
    cols: i32,
    rows: i32,
    /// Column-major: index = x * rows + y.
    tiles: Vec<MapTile>,
    sprites: Vec<MapSprite>,
    boundary_events: HashMap<Direction, Vec<BoundaryEvent>>,
    pending_restore: BTreeSet<(i32, i32)>,
}

impl RpgMap {
    pub fn new(
        name: impl Into<String>,
        music: Option<String>,
        cols: i32,
        rows: i32,
        sprites: Vec<MapSprite>,
    ) -> Self {
        assert!(cols > 0 && rows > 0, "map must have at least one tile");
        let mut tiles = Vec::with_capacity((cols * rows) as usize);
        for x in 0..cols {
            for y in 0..rows {
                tiles.push(MapTile::new(x, y));
            }
        }
        Self {
            name: name.into(),
            music,
            cols,
            rows,
            tiles,
            sprites,
            boundary_events: HashMap::new(),
            pending_restore: BTreeSet::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn music(&self) -> Option<&str> {
        self.music.as_deref()
    }

    pub fn cols(&self) -> i32 {
        self.cols
    }

    pub fn rows(&self) -> i32 {
        self.rows
    }

    pub fn sprites(&self) -> &[MapSprite] {
        &self.sprites
    }

    /// The full map extent in pixels.
    pub fn pixel_rect(&self) -> Rect {
        Rect::new(0, 0, self.cols * TILE_SIZE, self.rows * TILE_SIZE)
    }

    pub fn tile(&self, x: i32, y: i32) -> &MapTile {
        &self.tiles[(x * self.rows + y) as usize]
    }

    pub fn tile_mut(&mut self, x: i32, y: i32) -> &mut MapTile {
        &mut self.tiles[(x * self.rows + y) as usize]
    }

    pub fn add_boundary_event(&mut self, event: BoundaryEvent) {
        self.boundary_events
            .entry(event.boundary)
            .or_default()
            .push(event);
    }

    pub fn add_tile_event(&mut self, event: TileEvent) {
        self.tile_mut(event.x, event.y).add_event(event);
    }

    /// Core validity test over the tiles touched by a footprint. Valid when
    /// every tile matches the level exactly, or when every tile contributed a
    /// special level and the specials span less than one whole level. The
    /// resolved level is the max special when that max is whole (the step
    /// transition is complete), otherwise the min (still mid-transition).
    /// Mixed exact/special spans are always invalid.
    pub fn is_span_valid(&self, level: Level, span_tiles: &[&MapTile]) -> (bool, Level) {
        let mut same_level_count = 0;
        let mut special_levels = Vec::new();
        for tile in span_tiles {
            let (increment, special) = tile.test_validity(level);
            same_level_count += increment;
            if let Some(special) = special {
                special_levels.push(special);
            }
        }
        if same_level_count as usize == span_tiles.len() {
            return (true, level);
        }
        if special_levels.len() == span_tiles.len() {
            let min = *special_levels.iter().min().unwrap_or(&level);
            let max = *special_levels.iter().max().unwrap_or(&level);
            if max.halves() - min.halves() < Level::new(1).halves() {
                // prefer a whole landing level when the step is complete
                let resolved = if max.is_whole() { max } else { min };
                return (true, resolved);
            }
        }
        (false, level)
    }

    pub fn is_move_valid(&self, level: Level, base_rect: &Rect) -> (bool, Level) {
        self.is_span_valid(level, &self.span_tiles(base_rect))
    }

    /// Tests one of two parallel tile stripes (columns or rows) under a
    /// footprint that straddles a boundary, preferring the stripe nearer the
    /// actor's current alignment so the corrective nudge is as small as
    /// possible. Returns the signed shuffle multiplier of the stripe that
    /// validated.
    pub fn is_stripe_valid(
        &self,
        level: Level,
        stripes: &BTreeMap<i32, Vec<&MapTile>>,
        range_min: i32,
        range_max: i32,
    ) -> (bool, Level, i32) {
        if stripes.len() < 2 {
            return (false, level, 0);
        }
        let keys: Vec<i32> = stripes.keys().copied().collect();
        let first = keys[0];
        let last = keys[keys.len() - 1];
        let min_diff = (first * TILE_SIZE - range_min).abs();
        let max_diff = ((last + 1) * TILE_SIZE - range_max).abs();
        let candidates = if min_diff < max_diff {
            [(first, -1), (last, 1)]
        } else {
            [(last, 1), (first, -1)]
        };
        let (valid, level) = self.is_span_valid(level, &stripes[&candidates[0].0]);
        if valid {
            return (true, level, candidates[0].1);
        }
        let (valid, level) = self.is_span_valid(level, &stripes[&candidates[1].0]);
        (valid, level, candidates[1].1)
    }

    /// Stripe validity over the base rect's tile columns; a successful result
    /// carries the signed horizontal nudge.
    pub fn is_vertical_valid(&self, level: Level, base_rect: &Rect) -> (bool, Level, i32) {
        let (columns, _) = self.stripe_tiles(base_rect);
        self.is_stripe_valid(level, &columns, base_rect.left, base_rect.right())
    }

    /// Stripe validity over the base rect's tile rows; a successful result
    /// carries the signed vertical nudge.
    pub fn is_horizontal_valid(&self, level: Level, base_rect: &Rect) -> (bool, Level, i32) {
        let (_, rows) = self.stripe_tiles(base_rect);
        self.is_stripe_valid(level, &rows, base_rect.top, base_rect.bottom())
    }

    /// All tiles touched by the given rectangle, in column-major order.
    pub fn span_tiles(&self, rect: &Rect) -> Vec<&MapTile> {
        let (x1, y1) = self.clamp_top_left(rect.left, rect.top);
        let (x2, y2) = self.clamp_bottom_right(rect.right() - 1, rect.bottom() - 1);
        let mut span = Vec::new();
        for x in x1..=x2 {
            for y in y1..=y2 {
                span.push(self.tile(x, y));
            }
        }
        span
    }

    /// The same tiles grouped into columns and rows, for shuffle queries.
    fn stripe_tiles(
        &self,
        rect: &Rect,
    ) -> (
        BTreeMap<i32, Vec<&MapTile>>,
        BTreeMap<i32, Vec<&MapTile>>,
    ) {
        let (x1, y1) = self.clamp_top_left(rect.left, rect.top);
        let (x2, y2) = self.clamp_bottom_right(rect.right() - 1, rect.bottom() - 1);
        let mut columns = BTreeMap::new();
        let mut rows = BTreeMap::new();
        for x in x1..=x2 {
            columns.insert(x, (y1..=y2).map(|y| self.tile(x, y)).collect());
        }
        for y in y1..=y2 {
            rows.insert(y, (x1..=x2).map(|x| self.tile(x, y)).collect());
        }
        (columns, rows)
    }

    /// Aggregates occlusion masks over the tiles spanned by the footprint's
    /// full rectangle, keyed by tile coordinate, for the caller to paint over
    /// the sprite.
    pub fn masks_for(&self, footprint: &dyn Footprint) -> BTreeMap<(i32, i32), Vec<&TileLayer>> {
        let rect = footprint.rect();
        let mut masks = BTreeMap::new();
        for tile in self.span_tiles(&rect) {
            let tile_masks = tile.masks_for(footprint.level(), footprint.z(), footprint.upright());
            if !tile_masks.is_empty() {
                masks.insert((tile.x, tile.y), tile_masks);
            }
        }
        masks
    }

    /// The first registered event for the breached boundary whose stored tile
    /// range covers every breached tile index.
    pub fn boundary_event(
        &self,
        boundary: Direction,
        tile_range: impl IntoIterator<Item = i32> + Clone,
    ) -> Option<&BoundaryEvent> {
        self.boundary_events.get(&boundary)?.iter().find(|event| {
            tile_range
                .clone()
                .into_iter()
                .all(|index| event.range.contains(&index))
        })
    }

    /// Scans the spanned tiles (column-major) for a tile event at the given
    /// level; the first match wins. When no tile event fires, a falling event
    /// is returned only if every spanned tile has a down level, so a sprite
    /// still partially supported never falls.
    pub fn action_event(&self, level: Level, base_rect: &Rect) -> Option<ActionEvent> {
        let span = self.span_tiles(base_rect);
        let mut down_levels = Vec::new();
        for tile in &span {
            if let Some(event) = tile.event_at(level) {
                return Some(ActionEvent::Tile(event.clone()));
            }
            if let Some(down_level) = tile.down_level_at(level) {
                down_levels.push(down_level);
            }
        }
        if !down_levels.is_empty() && down_levels.len() == span.len() {
            return Some(ActionEvent::Falling(FallingEvent {
                down_level: down_levels[0],
            }));
        }
        None
    }

    fn clamp_top_left(&self, px: i32, py: i32) -> (i32, i32) {
        (
            (px.div_euclid(TILE_SIZE)).max(0),
            (py.div_euclid(TILE_SIZE)).max(0),
        )
    }

    fn clamp_bottom_right(&self, px: i32, py: i32) -> (i32, i32) {
        (
            (px.div_euclid(TILE_SIZE)).min(self.cols - 1),
            (py.div_euclid(TILE_SIZE)).min(self.rows - 1),
        )
    }

    /// Adds a new level to the given tile and remembers it for restoration.
    /// Only gameplay (door metadata, blades) ever calls this; it is always
    /// reversible.
    pub fn add_level(&mut self, x: i32, y: i32, level: Level) {
        self.pending_restore.insert((x, y));
        self.tile_mut(x, y).add_new_level(level);
    }

    /// Rolls back every tile mutated since the last restore; called whenever
    /// the map is pulled from the cache again.
    pub fn restore(&mut self) {
        if self.pending_restore.is_empty() {
            return;
        }
        debug!(map = %self.name, tiles = self.pending_restore.len(), "map_restored");
        let pending = std::mem::take(&mut self.pending_restore);
        for (x, y) in pending {
            self.tile_mut(x, y).restore();
        }
    }
}
