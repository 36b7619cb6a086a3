//! Save-game persistence. A save file is the registry serialized as JSON;
//! loading validates it field by field so a hand-edited or truncated file
//! fails with a message naming the offending path.

use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};

use engine::Registry;
use tracing::info;

pub type SaveLoadResult<T> = Result<T, String>;

pub const SAVE_FILE: &str = "adventure.json";

pub fn save_file_path(saves_dir: &Path) -> PathBuf {
    saves_dir.join(SAVE_FILE)
}

pub fn save_game(path: &Path, registry: &Registry) -> SaveLoadResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|error| format!("create save dir '{}': {error}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(registry)
        .map_err(|error| format!("encode save json: {error}"))?;
    fs::write(path, json).map_err(|error| format!("write save '{}': {error}", path.display()))?;
    info!(path = %path.display(), map = %registry.map_name, "game_saved");
    Ok(())
}

pub fn load_game(path: &Path) -> SaveLoadResult<Registry> {
    let raw = fs::read_to_string(path)
        .map_err(|error| format!("read save '{}': {error}", path.display()))?;
    let registry = parse_save_json(&raw)?;
    validate_save(&registry)?;
    Ok(registry)
}

fn parse_save_json(raw: &str) -> SaveLoadResult<Registry> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    match serde_path_to_error::deserialize::<_, Registry>(&mut deserializer) {
        Ok(registry) => Ok(registry),
        Err(error) => {
            let path = error.path().to_string();
            let source = error.into_inner();
            if path.is_empty() || path == "." {
                Err(format!("parse save json: {source}"))
            } else {
                Err(format!("parse save json at {path}: {source}"))
            }
        }
    }
}

fn validation_err(path: &str, message: impl Into<String>) -> String {
    format!("validation failed at {path}: {}", message.into())
}

fn expected_actual(path: &str, expected: impl Display, actual: impl Display) -> String {
    validation_err(path, format!("expected {expected}, got {actual}"))
}

fn validate_save(registry: &Registry) -> SaveLoadResult<()> {
    if registry.map_name.is_empty() {
        return Err(validation_err("map_name", "must not be empty"));
    }
    if registry.player_position.0 < 0 {
        return Err(expected_actual(
            "player_position.0",
            "a non-negative tile index",
            registry.player_position.0,
        ));
    }
    if registry.player_position.1 < 0 {
        return Err(expected_actual(
            "player_position.1",
            "a non-negative tile index",
            registry.player_position.1,
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine::Level;

    #[test]
    fn save_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = save_file_path(dir.path());
        let mut registry = Registry::new("cove", (4, 2), Level::new(1));
        registry.coin_count = 3;
        save_game(&path, &registry).unwrap();
        let loaded = load_game(&path).unwrap();
        assert_eq!(loaded, registry);
    }

    #[test]
    fn parse_errors_name_the_json_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(
            &path,
            r#"{"map_name":"cove","player_position":[4,"x"],"player_level":1,
                "coin_count":0,"key_count":0,"sprite_metadata":{},"checkpoint":null}"#,
        )
        .unwrap();
        let error = load_game(&path).unwrap_err();
        assert!(error.starts_with("parse save json at player_position"), "{error}");
    }

    #[test]
    fn empty_map_name_fails_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.json");
        let registry = Registry::new("", (0, 0), Level::new(1));
        save_game(&path, &registry).unwrap();
        let error = load_game(&path).unwrap_err();
        assert_eq!(error, "validation failed at map_name: must not be empty");
    }
}
