//! Global blocking policy
//!
//! The engine only reads policy; where it comes from is up to the host. The
//! `Preferences` type covers the common case of a JSON preferences blob.

use std::collections::HashMap;

use regex::Regex;
use serde::Deserialize;

/// Error type for loading preferences.
#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    #[error("Invalid preferences: {0}")]
    InvalidPreferences(String),
    #[error("Invalid exception for tracker '{tracker}': {source}")]
    InvalidException {
        tracker: String,
        #[source]
        source: regex::Error,
    },
}

/// Read-only view of the user's global settings.
pub trait Policy {
    /// The user's global "block this tracker" setting.
    fn is_blocked_globally(&self, tracker: &str) -> bool;

    /// URL expressions for which this tracker is never blocked.
    fn exceptions(&self, tracker: &str) -> &[Regex];

    /// Replace buttons with local placeholders (and cancel blocked requests
    /// instead of stripping their cookies).
    fn replace_buttons(&self) -> bool;
}

// =============================================================================
// Preferences
// =============================================================================

/// Serialized form of [`Preferences`].
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PreferencesConfig {
    pub replace_buttons: bool,
    pub block_by_default: bool,
    pub trackers: HashMap<String, TrackerPreferences>,
}

impl Default for PreferencesConfig {
    fn default() -> Self {
        Self {
            replace_buttons: true,
            block_by_default: true,
            trackers: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TrackerPreferences {
    pub blocked: Option<bool>,
    pub exceptions: Vec<String>,
}

#[derive(Debug, Clone, Default)]
struct TrackerSettings {
    blocked: Option<bool>,
    exceptions: Vec<Regex>,
}

/// In-memory policy with compiled exception expressions.
#[derive(Debug, Clone)]
pub struct Preferences {
    replace_buttons: bool,
    block_by_default: bool,
    trackers: HashMap<String, TrackerSettings>,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            replace_buttons: true,
            block_by_default: true,
            trackers: HashMap::new(),
        }
    }
}

impl Preferences {
    /// Compile a preferences config.
    pub fn from_config(config: PreferencesConfig) -> Result<Self, PolicyError> {
        let mut trackers = HashMap::with_capacity(config.trackers.len());
        for (name, prefs) in config.trackers {
            let mut exceptions = Vec::with_capacity(prefs.exceptions.len());
            for expr in &prefs.exceptions {
                exceptions.push(compile_exception(&name, expr)?);
            }
            trackers.insert(
                name,
                TrackerSettings {
                    blocked: prefs.blocked,
                    exceptions,
                },
            );
        }

        Ok(Self {
            replace_buttons: config.replace_buttons,
            block_by_default: config.block_by_default,
            trackers,
        })
    }

    /// Parse and compile a JSON preferences blob.
    pub fn from_json(text: &str) -> Result<Self, PolicyError> {
        let config: PreferencesConfig = serde_json::from_str(text)
            .map_err(|e| PolicyError::InvalidPreferences(e.to_string()))?;
        Self::from_config(config)
    }

    pub fn set_blocked(&mut self, tracker: &str, blocked: bool) {
        self.settings_mut(tracker).blocked = Some(blocked);
    }

    pub fn set_replace_buttons(&mut self, replace: bool) {
        self.replace_buttons = replace;
    }

    /// Add an exception expression for a tracker. Adding the same expression
    /// twice keeps one copy.
    pub fn add_exception(&mut self, tracker: &str, expr: &str) -> Result<(), PolicyError> {
        let regex = compile_exception(tracker, expr)?;
        let settings = self.settings_mut(tracker);
        if !settings.exceptions.iter().any(|re| re.as_str() == expr) {
            settings.exceptions.push(regex);
        }
        Ok(())
    }

    /// Remove an exception by its source text. Returns whether it existed.
    pub fn remove_exception(&mut self, tracker: &str, expr: &str) -> bool {
        match self.trackers.get_mut(tracker) {
            Some(settings) => {
                let before = settings.exceptions.len();
                settings.exceptions.retain(|re| re.as_str() != expr);
                settings.exceptions.len() != before
            }
            None => false,
        }
    }

    pub fn remove_all_exceptions(&mut self, tracker: &str) {
        if let Some(settings) = self.trackers.get_mut(tracker) {
            settings.exceptions.clear();
        }
    }

    fn settings_mut(&mut self, tracker: &str) -> &mut TrackerSettings {
        self.trackers.entry(tracker.to_string()).or_default()
    }
}

impl Policy for Preferences {
    fn is_blocked_globally(&self, tracker: &str) -> bool {
        self.trackers
            .get(tracker)
            .and_then(|settings| settings.blocked)
            .unwrap_or(self.block_by_default)
    }

    fn exceptions(&self, tracker: &str) -> &[Regex] {
        match self.trackers.get(tracker) {
            Some(settings) => &settings.exceptions,
            None => &[],
        }
    }

    fn replace_buttons(&self) -> bool {
        self.replace_buttons
    }
}

fn compile_exception(tracker: &str, expr: &str) -> Result<Regex, PolicyError> {
    Regex::new(expr).map_err(|source| PolicyError::InvalidException {
        tracker: tracker.to_string(),
        source,
    })
}
