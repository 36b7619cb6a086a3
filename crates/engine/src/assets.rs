//! Image assets: tilesets and sprite sheets, loaded once and cached.
//!
//! Source art is authored at half resolution and scaled up by `SCALAR` with
//! nearest-neighbour sampling on load, so all in-game coordinates work in
//! scaled pixels. A tileset is a PNG plus a sidecar `<name>_metadata.txt`
//! naming each raw tile:
//!
//! ```text
//! 0,0 grass
//! 1,0 water
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use image::{imageops, ImageReader, RgbaImage};
use thiserror::Error;
use tracing::debug;

use crate::{SCALAR, TILE_SIZE};

/// Magenta pixels in source art become fully transparent on load.
const TRANSPARENT_COLOUR: [u8; 3] = [255, 0, 255];

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("failed to read asset {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode image {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("tile {name} not found in tileset {tileset}")]
    MissingTile { tileset: String, name: String },
}

/// Loads an image, applies the colour key and scales it up.
fn load_scaled_image(path: &Path) -> Result<RgbaImage, AssetError> {
    let reader = ImageReader::open(path).map_err(|source| AssetError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let decoded = reader
        .decode()
        .map_err(|source| AssetError::Decode {
            path: path.to_path_buf(),
            source,
        })?
        .to_rgba8();
    let mut image = imageops::resize(
        &decoded,
        decoded.width() * SCALAR as u32,
        decoded.height() * SCALAR as u32,
        imageops::FilterType::Nearest,
    );
    for pixel in image.pixels_mut() {
        if pixel.0[..3] == TRANSPARENT_COLOUR {
            pixel.0 = [0, 0, 0, 0];
        }
    }
    Ok(image)
}

/// A named set of tile images sliced out of one sheet.
#[derive(Debug)]
pub struct TileSheet {
    name: String,
    tiles: HashMap<String, Rc<RgbaImage>>,
}

impl TileSheet {
    /// Loads `<dir>/<name>.png` and its metadata sidecar. Malformed metadata
    /// lines are skipped.
    pub fn load(dir: &Path, name: &str) -> Result<Self, AssetError> {
        let image_path = dir.join(format!("{name}.png"));
        let sheet = load_scaled_image(&image_path)?;
        let metadata_path = dir.join(format!("{name}_metadata.txt"));
        let metadata = fs::read_to_string(&metadata_path).map_err(|source| AssetError::Read {
            path: metadata_path.clone(),
            source,
        })?;

        let mut tiles = HashMap::new();
        for line in metadata.lines() {
            let mut bits = line.split_whitespace();
            let (Some(point), Some(tile_name)) = (bits.next(), bits.next()) else {
                continue;
            };
            let Some((x, y)) = point
                .split_once(',')
                .and_then(|(x, y)| Some((x.parse::<u32>().ok()?, y.parse::<u32>().ok()?)))
            else {
                debug!(tileset = %name, line, "tileset_metadata_line_skipped");
                continue;
            };
            let tile = imageops::crop_imm(
                &sheet,
                x * TILE_SIZE as u32,
                y * TILE_SIZE as u32,
                TILE_SIZE as u32,
                TILE_SIZE as u32,
            )
            .to_image();
            tiles.insert(tile_name.to_string(), Rc::new(tile));
        }
        debug!(tileset = %name, tiles = tiles.len(), "tileset_loaded");
        Ok(Self {
            name: name.to_string(),
            tiles,
        })
    }

    pub fn tile(&self, name: &str) -> Result<Rc<RgbaImage>, AssetError> {
        self.tiles
            .get(name)
            .cloned()
            .ok_or_else(|| AssetError::MissingTile {
                tileset: self.name.clone(),
                name: name.to_string(),
            })
    }
}

/// Load-once cache over a tiles directory and a sprites directory.
#[derive(Debug)]
pub struct AssetCache {
    tiles_dir: PathBuf,
    sprites_dir: PathBuf,
    tilesets: HashMap<String, Rc<TileSheet>>,
    sprite_images: HashMap<String, Rc<RgbaImage>>,
}

impl AssetCache {
    pub fn new(tiles_dir: impl Into<PathBuf>, sprites_dir: impl Into<PathBuf>) -> Self {
        Self {
            tiles_dir: tiles_dir.into(),
            sprites_dir: sprites_dir.into(),
            tilesets: HashMap::new(),
            sprite_images: HashMap::new(),
        }
    }

    pub fn tileset(&mut self, name: &str) -> Result<Rc<TileSheet>, AssetError> {
        if let Some(sheet) = self.tilesets.get(name) {
            return Ok(Rc::clone(sheet));
        }
        let sheet = Rc::new(TileSheet::load(&self.tiles_dir, name)?);
        self.tilesets.insert(name.to_string(), Rc::clone(&sheet));
        Ok(sheet)
    }

    /// A scaled sprite sheet image, e.g. `ulmo-frames.png`.
    pub fn sprite_image(&mut self, file_name: &str) -> Result<Rc<RgbaImage>, AssetError> {
        if let Some(image) = self.sprite_images.get(file_name) {
            return Ok(Rc::clone(image));
        }
        let image = Rc::new(load_scaled_image(&self.sprites_dir.join(file_name))?);
        self.sprite_images
            .insert(file_name.to_string(), Rc::clone(&image));
        Ok(image)
    }
}
