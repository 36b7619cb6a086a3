use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub mod assets;
pub mod bus;
pub mod geom;
pub mod level;
pub mod map;
pub mod movement;
pub mod registry;

pub use assets::{AssetCache, AssetError, TileSheet};
pub use bus::{EventBus, GameEvent, GameEventKind};
pub use geom::{Direction, Rect};
pub use level::Level;
pub use map::{
    ActionEvent, BoundaryEvent, FallingEvent, Footprint, MapCache, MapError, MapSprite, MapTile,
    MapTransitionEvent, RpgMap, SceneData, SharedMap, TileEvent, TileLayer, Transition,
};
pub use movement::{DirectionBits, MovementResolver, Outcome, FALL_UNIT, MOVE_UNIT};
pub use registry::{Registry, RegistryHandler, SpriteMetadata};

/// Source art is authored at half resolution and scaled up on load.
pub const SCALAR: i32 = 2;
/// Tile edge in scaled pixels.
pub const TILE_SIZE: i32 = 16 * SCALAR;

pub const ROOT_ENV_VAR: &str = "ADVENTURE_ROOT";

/// Resolved asset locations under the project root.
#[derive(Debug, Clone)]
pub struct AppPaths {
    pub root: PathBuf,
    pub maps_dir: PathBuf,
    pub tiles_dir: PathBuf,
    pub sprites_dir: PathBuf,
    pub saves_dir: PathBuf,
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to read environment variable {var}: {source}")]
    EnvVar {
        var: &'static str,
        #[source]
        source: env::VarError,
    },
    #[error("failed to resolve current executable path: {0}")]
    CurrentExe(#[source] std::io::Error),
    #[error("current executable path has no parent directory: {0}")]
    ExeHasNoParent(PathBuf),
    #[error("failed to create saves directory at {path}: {source}")]
    CreateSavesDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(
        "{env_var} is set but does not point to a valid project root: {path}\n\
A valid root must contain Cargo.toml and an assets/ directory."
    )]
    InvalidEnvRoot {
        path: PathBuf,
        env_var: &'static str,
    },
    #[error(
        "Could not detect project root by walking upward from executable directory: {start_dir}\n\
Expected a directory containing Cargo.toml and an assets/ directory.\n\
Set {env_var} explicitly, for example:\n\
Bash/zsh: export {env_var}=\"/path/to/project\""
    )]
    RootNotFound {
        start_dir: PathBuf,
        env_var: &'static str,
    },
}

/// Resolves the project root and derives the asset directories, creating the
/// saves directory if needed.
pub fn resolve_app_paths() -> Result<AppPaths, StartupError> {
    let root = resolve_root()?;
    let assets_dir = root.join("assets");
    let saves_dir = root.join("saves");

    fs::create_dir_all(&saves_dir).map_err(|source| StartupError::CreateSavesDir {
        path: saves_dir.clone(),
        source,
    })?;

    Ok(AppPaths {
        maps_dir: assets_dir.join("maps"),
        tiles_dir: assets_dir.join("tiles"),
        sprites_dir: assets_dir.join("sprites"),
        saves_dir,
        root,
    })
}

fn resolve_root() -> Result<PathBuf, StartupError> {
    match env::var(ROOT_ENV_VAR) {
        Ok(value) => {
            let normalized = normalize_path(Path::new(&value));
            if is_repo_marker(&normalized) {
                Ok(normalized)
            } else {
                Err(StartupError::InvalidEnvRoot {
                    path: normalized,
                    env_var: ROOT_ENV_VAR,
                })
            }
        }
        Err(env::VarError::NotPresent) => {
            let exe = env::current_exe().map_err(StartupError::CurrentExe)?;
            let exe_dir = exe
                .parent()
                .map(Path::to_path_buf)
                .ok_or_else(|| StartupError::ExeHasNoParent(exe.clone()))?;

            for candidate in exe_dir.ancestors() {
                if is_repo_marker(candidate) {
                    return Ok(normalize_path(candidate));
                }
            }

            Err(StartupError::RootNotFound {
                start_dir: normalize_path(&exe_dir),
                env_var: ROOT_ENV_VAR,
            })
        }
        Err(source) => Err(StartupError::EnvVar {
            var: ROOT_ENV_VAR,
            source,
        }),
    }
}

fn is_repo_marker(path: &Path) -> bool {
    path.join("Cargo.toml").is_file() && path.join("assets").is_dir()
}

fn normalize_path(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
