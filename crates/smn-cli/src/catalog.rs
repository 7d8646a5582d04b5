use std::fs;
use std::path::Path;

use smn_core::{Engine, PatternIndex, Preferences, Registry};

pub fn read_text(path: &Path) -> Result<String, String> {
    fs::read_to_string(path)
        .map_err(|e| format!("Failed to read '{}': {}", path.display(), e))
}

/// Load a catalog and compile its patterns.
pub fn load_catalog(path: &Path) -> Result<(Registry, PatternIndex), String> {
    let text = read_text(path)?;
    let registry = Registry::from_json(&text)
        .map_err(|e| format!("Invalid catalog '{}': {}", path.display(), e))?;
    let index = PatternIndex::build(&registry)
        .map_err(|e| format!("Invalid catalog '{}': {}", path.display(), e))?;
    Ok((registry, index))
}

pub fn load_preferences(path: Option<&Path>) -> Result<Preferences, String> {
    match path {
        Some(path) => {
            let text = read_text(path)?;
            Preferences::from_json(&text)
                .map_err(|e| format!("Invalid preferences '{}': {}", path.display(), e))
        }
        None => Ok(Preferences::default()),
    }
}

pub fn load_engine(catalog: &Path, preferences: Option<&Path>) -> Result<Engine, String> {
    let text = read_text(catalog)?;
    let preferences = load_preferences(preferences)?;
    Engine::from_catalog_json(&text, preferences)
        .map_err(|e| format!("Invalid catalog '{}': {}", catalog.display(), e))
}
