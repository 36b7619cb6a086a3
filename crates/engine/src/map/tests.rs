//! Validity, stripe and mask behaviour against the staircase fixture map.
//!
//! The fixture (`assets/maps/unit.map`) holds a two-column staircase linking
//! levels 1 and 2:
//!
//! ```text
//!        col 5     col 6    col 7
//! row 1            [1]      [1]
//! row 2  [1,2]     [1,2]*   [1,2]*    * flat mask at level 2
//! row 3  [S2]      [2]      [2]
//! row 4  [S1.5]    [X]      [X]
//! row 5  [S1.5]    [1]      [1]
//! row 6  [S1]      [1]
//! row 7  [1]       [1]      [1]
//! ```

use std::path::Path;

use crate::geom::Rect;
use crate::level::Level;
use crate::map::{Footprint, MapCache, RpgMap, SharedMap};
use crate::TILE_SIZE;

fn load_fixture() -> SharedMap {
    let maps_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../assets/maps");
    MapCache::new(maps_dir).load("unit").unwrap()
}

fn level(whole: i32) -> Level {
    Level::new(whole)
}

fn half(halves: i32) -> Level {
    Level::from_halves(halves)
}

struct MockSprite {
    rect: Rect,
    level: Level,
}

impl MockSprite {
    fn new(rect: Rect, level: Level) -> Self {
        Self { rect, level }
    }

    fn move_by(&mut self, dx: i32, dy: i32) {
        self.rect.translate(dx, dy);
    }
}

impl Footprint for MockSprite {
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

fn assert_moves(
    map: &RpgMap,
    base_rect: &Rect,
    span_len: usize,
    expectations: &[(Level, (bool, Level))],
) {
    assert_eq!(map.span_tiles(base_rect).len(), span_len);
    for (query, expected) in expectations {
        assert_eq!(
            map.is_move_valid(*query, base_rect),
            *expected,
            "query level {query} over rect {base_rect:?}"
        );
    }
}

#[test]
fn staircase_descent_single_column() {
    let shared = load_fixture();
    let map = shared.borrow();
    let mut rect = Rect::new(5 * TILE_SIZE + 2, 2 * TILE_SIZE + 8, 28, 18);

    // [1,2] [S2]
    rect.translate(0, 16);
    assert_moves(
        &map,
        &rect,
        2,
        &[
            (level(1), (false, level(1))),
            (half(3), (false, half(3))),
            (level(2), (true, level(2))),
        ],
    );
    // [S2]
    rect.translate(0, 16);
    assert_moves(
        &map,
        &rect,
        1,
        &[
            (level(1), (false, level(1))),
            (half(3), (true, level(2))),
            (level(2), (true, level(2))),
        ],
    );
    // [S2] [S1.5]
    rect.translate(0, 16);
    assert_moves(
        &map,
        &rect,
        2,
        &[
            (level(1), (false, level(1))),
            (half(3), (true, level(2))),
            (level(2), (true, level(2))),
        ],
    );
    // [S1.5]: a lone half-step special accepts any adjacent level
    rect.translate(0, 16);
    assert_moves(
        &map,
        &rect,
        1,
        &[
            (level(1), (true, half(3))),
            (half(3), (true, half(3))),
            (level(2), (true, half(3))),
        ],
    );
    // [S1.5] [S1.5]
    rect.translate(0, 16);
    assert_moves(
        &map,
        &rect,
        2,
        &[
            (level(1), (true, half(3))),
            (half(3), (true, half(3))),
            (level(2), (true, half(3))),
        ],
    );
    // [S1.5]
    rect.translate(0, 16);
    assert_moves(
        &map,
        &rect,
        1,
        &[
            (level(1), (true, half(3))),
            (half(3), (true, half(3))),
            (level(2), (true, half(3))),
        ],
    );
    // [S1.5] [S1]
    rect.translate(0, 16);
    assert_moves(
        &map,
        &rect,
        2,
        &[
            (level(1), (true, level(1))),
            (half(3), (true, level(1))),
            (level(2), (false, level(2))),
        ],
    );
    // [S1]
    rect.translate(0, 16);
    assert_moves(
        &map,
        &rect,
        1,
        &[
            (level(1), (true, level(1))),
            (half(3), (true, level(1))),
            (level(2), (false, level(2))),
        ],
    );
    // [S1] [1]
    rect.translate(0, 16);
    assert_moves(
        &map,
        &rect,
        2,
        &[
            (level(1), (true, level(1))),
            (half(3), (false, half(3))),
            (level(2), (false, level(2))),
        ],
    );
    // [1]
    rect.translate(0, 16);
    assert_moves(
        &map,
        &rect,
        1,
        &[
            (level(1), (true, level(1))),
            (level(2), (false, level(2))),
        ],
    );
}

#[test]
fn staircase_descent_straddling_both_columns() {
    let shared = load_fixture();
    let map = shared.borrow();
    let mut rect = Rect::new(5 * TILE_SIZE + 18, 2 * TILE_SIZE + 8, 28, 18);

    // [1,2] [S2] / [1,2] [2]
    rect.translate(0, 16);
    assert_moves(
        &map,
        &rect,
        4,
        &[
            (level(1), (false, level(1))),
            (half(3), (false, half(3))),
            (level(2), (true, level(2))),
        ],
    );
    // [S2] / [2]
    rect.translate(0, 16);
    assert_moves(
        &map,
        &rect,
        2,
        &[
            (level(1), (false, level(1))),
            (half(3), (false, half(3))),
            (level(2), (true, level(2))),
        ],
    );
    // [S2] [S1.5] / [2] [X]: blocked, but the staircase column validates
    rect.translate(0, 16);
    assert_moves(
        &map,
        &rect,
        4,
        &[
            (level(1), (false, level(1))),
            (half(3), (false, half(3))),
            (level(2), (false, level(2))),
        ],
    );
    assert_eq!(map.is_vertical_valid(half(3), &rect), (true, level(2), -1));
    assert_eq!(map.is_vertical_valid(level(2), &rect), (true, level(2), -1));
    assert_eq!(map.is_horizontal_valid(level(2), &rect), (true, level(2), -1));
    // [S1.5] / [X]
    rect.translate(0, 16);
    assert_moves(
        &map,
        &rect,
        2,
        &[
            (level(1), (false, level(1))),
            (half(3), (false, half(3))),
            (level(2), (false, level(2))),
        ],
    );
    assert_eq!(map.is_vertical_valid(level(1), &rect), (true, half(3), -1));
    assert_eq!(map.is_vertical_valid(half(3), &rect), (true, half(3), -1));
    // one horizontal stripe: never enough to shuffle
    assert_eq!(map.is_horizontal_valid(half(3), &rect), (false, half(3), 0));
    // [S1.5] [S1.5] / [X] [1]
    rect.translate(0, 16);
    assert_moves(
        &map,
        &rect,
        4,
        &[
            (level(1), (false, level(1))),
            (half(3), (false, half(3))),
            (level(2), (false, level(2))),
        ],
    );
    assert_eq!(map.is_vertical_valid(level(1), &rect), (true, half(3), -1));
    assert_eq!(map.is_vertical_valid(half(3), &rect), (true, half(3), -1));
    // both rows fail; the far row's sign is still reported
    assert_eq!(map.is_horizontal_valid(half(3), &rect), (false, half(3), -1));
    // [S1.5] / [1]
    rect.translate(0, 16);
    assert_moves(
        &map,
        &rect,
        2,
        &[
            (level(1), (false, level(1))),
            (half(3), (false, half(3))),
            (level(2), (false, level(2))),
        ],
    );
    assert_eq!(map.is_vertical_valid(level(1), &rect), (true, level(1), 1));
    assert_eq!(map.is_vertical_valid(half(3), &rect), (true, half(3), -1));
    assert_eq!(map.is_horizontal_valid(half(3), &rect), (false, half(3), 0));
    // [S1.5] [S1] / [1] [1]
    rect.translate(0, 16);
    assert_moves(
        &map,
        &rect,
        4,
        &[
            (level(1), (false, level(1))),
            (half(3), (false, half(3))),
            (level(2), (false, level(2))),
        ],
    );
    assert_eq!(map.is_vertical_valid(level(1), &rect), (true, level(1), 1));
    assert_eq!(map.is_vertical_valid(half(3), &rect), (true, level(1), -1));
    assert_eq!(map.is_horizontal_valid(level(1), &rect), (true, level(1), 1));
    // [S1] / [1]
    rect.translate(0, 16);
    assert_moves(
        &map,
        &rect,
        2,
        &[
            (level(1), (true, level(1))),
            (half(3), (false, half(3))),
            (level(2), (false, level(2))),
        ],
    );
    // [S1] [1] / [1] [1]
    rect.translate(0, 16);
    assert_moves(
        &map,
        &rect,
        4,
        &[
            (level(1), (true, level(1))),
            (half(3), (false, half(3))),
            (level(2), (false, level(2))),
        ],
    );
    // [1] / [1]
    rect.translate(0, 16);
    assert_moves(
        &map,
        &rect,
        2,
        &[
            (level(1), (true, level(1))),
            (level(2), (false, level(2))),
        ],
    );
}

#[test]
fn plateau_column_blocks_between_levels() {
    let shared = load_fixture();
    let map = shared.borrow();
    let mut rect = Rect::new(6 * TILE_SIZE + 2, TILE_SIZE + 8, 28, 18);

    let sequence: &[(usize, (bool, Level), (bool, Level))] = &[
        // [1]
        (1, (true, level(1)), (false, level(2))),
        // [1] [1,2]
        (2, (true, level(1)), (false, level(2))),
        // [1,2]
        (1, (true, level(1)), (true, level(2))),
        // [1,2] [2]
        (2, (false, level(1)), (true, level(2))),
        // [2]
        (1, (false, level(1)), (true, level(2))),
        // [2] [X]
        (2, (false, level(1)), (false, level(2))),
        // [X]
        (1, (false, level(1)), (false, level(2))),
        // [X] [1]
        (2, (false, level(1)), (false, level(2))),
        // [1]
        (1, (true, level(1)), (false, level(2))),
    ];
    for (index, (span_len, at_one, at_two)) in sequence.iter().enumerate() {
        if index > 0 {
            rect.translate(0, 16);
        }
        assert_moves(
            &map,
            &rect,
            *span_len,
            &[(level(1), *at_one), (level(2), *at_two)],
        );
    }
}

#[test]
fn tiles_without_map_data_are_never_valid() {
    let shared = load_fixture();
    let map = shared.borrow();
    let mut rect = Rect::new(7 * TILE_SIZE + 2, 5 * TILE_SIZE + 8, 28, 18);

    let sequence: &[(usize, bool)] = &[
        // [1]
        (1, true),
        // [1] [ ]
        (2, false),
        // [ ]
        (1, false),
        // [ ] [1]
        (2, false),
        // [1]
        (1, true),
    ];
    for (index, (span_len, valid_at_one)) in sequence.iter().enumerate() {
        if index > 0 {
            rect.translate(0, 16);
        }
        assert_moves(
            &map,
            &rect,
            *span_len,
            &[
                (level(1), (*valid_at_one, level(1))),
                (level(2), (false, level(2))),
            ],
        );
    }
}

#[test]
fn archway_masks_level_one_sprite_single_column() {
    let shared = load_fixture();
    let map = shared.borrow();
    let rect = Rect::new(6 * TILE_SIZE + 2, TILE_SIZE - 24, 28, 48);
    let mut sprite = MockSprite::new(rect, level(1));

    let expected = [0, 1, 1, 0, 0, 0, 0];
    for (step, count) in expected.iter().enumerate() {
        if step > 0 {
            sprite.move_by(0, TILE_SIZE);
        }
        assert_eq!(
            map.masks_for(&sprite).len(),
            *count,
            "step {step} rect {:?}",
            sprite.rect
        );
    }
}

#[test]
fn archway_masks_level_one_sprite_both_columns() {
    let shared = load_fixture();
    let map = shared.borrow();
    let rect = Rect::new(6 * TILE_SIZE + 18, TILE_SIZE - 24, 28, 48);
    let mut sprite = MockSprite::new(rect, level(1));

    let expected = [0, 2, 2, 0, 0, 0, 0];
    for (step, count) in expected.iter().enumerate() {
        if step > 0 {
            sprite.move_by(0, TILE_SIZE);
        }
        assert_eq!(map.masks_for(&sprite).len(), *count, "step {step}");
    }
}

#[test]
fn archway_never_masks_a_sprite_at_its_own_level() {
    let shared = load_fixture();
    let map = shared.borrow();
    for left in [6 * TILE_SIZE + 2, 6 * TILE_SIZE + 18] {
        let rect = Rect::new(left, TILE_SIZE - 24, 28, 48);
        let mut sprite = MockSprite::new(rect, level(2));
        for step in 0..7 {
            if step > 0 {
                sprite.move_by(0, TILE_SIZE);
            }
            assert_eq!(map.masks_for(&sprite).len(), 0, "step {step}");
        }
    }
}
