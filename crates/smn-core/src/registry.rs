//! Tracker Registry
//!
//! The catalog of known trackers, validated and frozen at startup. A catalog
//! that fails validation produces no registry at all.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use log::info;
use serde::de::{Deserializer, MapAccess, Visitor};
use serde::Deserialize;

use crate::types::{ReplacementButton, Tracker};

/// Error type for building the registry and its pattern index.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Invalid tracker catalog: {0}")]
    InvalidCatalog(String),
    #[error("Malformed definition for tracker '{name}': {reason}")]
    MalformedDefinition { name: String, reason: String },
    #[error("Duplicate tracker name: {0}")]
    DuplicateName(String),
}

impl RegistryError {
    pub(crate) fn malformed(name: &str, reason: impl Into<String>) -> Self {
        Self::MalformedDefinition {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

/// Immutable, ordered collection of trackers.
///
/// Registration order is the catalog order and is what the matcher uses to
/// break ties between overlapping patterns.
#[derive(Debug, Clone)]
pub struct Registry {
    trackers: Vec<Arc<Tracker>>,
}

impl Registry {
    /// Validate a list of tracker definitions and freeze them.
    pub fn load(definitions: Vec<Tracker>) -> Result<Self, RegistryError> {
        let mut seen = HashSet::with_capacity(definitions.len());
        let mut trackers = Vec::with_capacity(definitions.len());

        for tracker in definitions {
            validate(&tracker)?;
            if !seen.insert(tracker.name.clone()) {
                return Err(RegistryError::DuplicateName(tracker.name));
            }
            trackers.push(Arc::new(tracker));
        }

        info!("Loaded {} tracker definitions", trackers.len());
        Ok(Self { trackers })
    }

    /// Parse a catalog keyed by tracker name and load it.
    pub fn from_json(text: &str) -> Result<Self, RegistryError> {
        let catalog: Catalog = serde_json::from_str(text)
            .map_err(|e| RegistryError::InvalidCatalog(e.to_string()))?;

        let mut definitions = Vec::with_capacity(catalog.0.len());
        for (name, value) in catalog.0 {
            let raw: RawTracker = serde_json::from_value(value)
                .map_err(|e| RegistryError::malformed(&name, e.to_string()))?;
            definitions.push(Tracker {
                name,
                domain: raw.domain,
                match_patterns: raw.match_patterns,
                button_selectors: raw.button_selectors,
                replacement_button: raw.replacement_button,
            });
        }

        Self::load(definitions)
    }

    pub fn trackers(&self) -> &[Arc<Tracker>] {
        &self.trackers
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Tracker>> {
        self.trackers.iter().find(|t| t.name == name)
    }

    /// Position of a tracker in registration order.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.trackers.iter().position(|t| t.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.trackers.iter().map(|t| t.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.trackers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trackers.is_empty()
    }

    pub fn pattern_count(&self) -> usize {
        self.trackers.iter().map(|t| t.match_patterns.len()).sum()
    }
}

fn validate(tracker: &Tracker) -> Result<(), RegistryError> {
    if tracker.name.trim().is_empty() {
        return Err(RegistryError::malformed(&tracker.name, "empty name"));
    }
    if tracker.domain.trim().is_empty() {
        return Err(RegistryError::malformed(&tracker.name, "empty domain"));
    }
    if tracker.match_patterns.is_empty() {
        return Err(RegistryError::malformed(&tracker.name, "no match patterns"));
    }
    if tracker.match_patterns.iter().any(|p| p.is_empty()) {
        return Err(RegistryError::malformed(&tracker.name, "empty match pattern"));
    }
    if tracker.button_selectors.is_empty() {
        return Err(RegistryError::malformed(&tracker.name, "no button selectors"));
    }
    if tracker.button_selectors.iter().any(|s| s.trim().is_empty()) {
        return Err(RegistryError::malformed(&tracker.name, "empty button selector"));
    }
    Ok(())
}

// =============================================================================
// Catalog Format
// =============================================================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RawTracker {
    domain: String,
    match_patterns: Vec<String>,
    button_selectors: Vec<String>,
    replacement_button: ReplacementButton,
}

/// Catalog entries in file order, duplicates kept so they can be reported.
struct Catalog(Vec<(String, serde_json::Value)>);

impl<'de> Deserialize<'de> for Catalog {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct CatalogVisitor;

        impl<'de> Visitor<'de> for CatalogVisitor {
            type Value = Catalog;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object mapping tracker names to definitions")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Catalog, A::Error> {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some(entry) = map.next_entry::<String, serde_json::Value>()? {
                    entries.push(entry);
                }
                Ok(Catalog(entries))
            }
        }

        deserializer.deserialize_map(CatalogVisitor)
    }
}
