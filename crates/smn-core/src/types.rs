//! Core type definitions for ShareMeNot
//!
//! These types are shared by the registry, the tab state store and the
//! engine facade, and are what the bindings hand to the extension UI.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Process-assigned browser tab identifier.
pub type TabId = i32;

// =============================================================================
// Replacement Buttons
// =============================================================================

/// What a placeholder button does when the user clicks it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplacementAction {
    /// Open a new window at the template URL followed by the encoded page URL.
    OpenWindow { url_template: String },
    /// Swap the placeholder for an iframe at the template URL followed by the
    /// encoded page URL.
    Iframe { url_template: String },
    /// Swap the placeholder for literal markup.
    InlineMarkup { markup: String },
}

impl ReplacementAction {
    /// Numeric kind used by the catalog format.
    pub fn kind(&self) -> u8 {
        match self {
            Self::OpenWindow { .. } => 0,
            Self::Iframe { .. } => 1,
            Self::InlineMarkup { .. } => 2,
        }
    }
}

/// Local stand-in for a tracker's share/like button.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawReplacementButton", into = "RawReplacementButton")]
pub struct ReplacementButton {
    /// Placeholder image, relative to the replacement button asset folder.
    pub image_path: String,
    pub action: ReplacementAction,
}

impl ReplacementButton {
    /// URL the window or iframe should load once the user clicks the
    /// placeholder on `page_url`. Inline markup has no target.
    pub fn target_url(&self, page_url: &str) -> Option<String> {
        match &self.action {
            ReplacementAction::OpenWindow { url_template }
            | ReplacementAction::Iframe { url_template } => {
                let encoded: String =
                    url::form_urlencoded::byte_serialize(page_url.as_bytes()).collect();
                Some(format!("{url_template}{encoded}"))
            }
            ReplacementAction::InlineMarkup { .. } => None,
        }
    }
}

/// On-disk shape of a replacement button: `{ type, details, imagePath }`.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RawReplacementButton {
    #[serde(rename = "type")]
    kind: u8,
    details: String,
    image_path: String,
}

impl TryFrom<RawReplacementButton> for ReplacementButton {
    type Error = String;

    fn try_from(raw: RawReplacementButton) -> Result<Self, Self::Error> {
        let action = match raw.kind {
            0 => ReplacementAction::OpenWindow { url_template: raw.details },
            1 => ReplacementAction::Iframe { url_template: raw.details },
            2 => ReplacementAction::InlineMarkup { markup: raw.details },
            other => return Err(format!("unknown replacement button type {other}")),
        };
        Ok(Self {
            image_path: raw.image_path,
            action,
        })
    }
}

impl From<ReplacementButton> for RawReplacementButton {
    fn from(button: ReplacementButton) -> Self {
        let kind = button.action.kind();
        let details = match button.action {
            ReplacementAction::OpenWindow { url_template }
            | ReplacementAction::Iframe { url_template } => url_template,
            ReplacementAction::InlineMarkup { markup } => markup,
        };
        Self {
            kind,
            details,
            image_path: button.image_path,
        }
    }
}

// =============================================================================
// Tracker
// =============================================================================

/// A named third-party service identified by URL patterns and page buttons.
///
/// Trackers are built once by the registry and shared behind `Arc`; nothing
/// mutates them afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tracker {
    /// Unique identifier, the key for every per-tracker map.
    pub name: String,
    /// The tracker's own site; requests are never blocked while browsing it.
    pub domain: String,
    /// Glob-style patterns (`*` = any run of characters), searched anywhere
    /// in a request URL.
    pub match_patterns: Vec<String>,
    /// CSS selectors for the tracker's buttons.
    pub button_selectors: Vec<String>,
    pub replacement_button: ReplacementButton,
}

// =============================================================================
// Requests
// =============================================================================

/// A request reported by the platform layer.
#[derive(Debug, Clone, Copy)]
pub struct ObservedRequest<'a> {
    /// Full request URL
    pub url: &'a str,
    /// Tab the request belongs to; `None` for requests without a top-level
    /// document (background fetches, prefetches)
    pub tab_id: Option<TabId>,
    /// The tab's top-level URL, when the platform knows it at request time
    pub tab_url: Option<&'a str>,
}

/// What the platform should do with a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
#[repr(u8)]
pub enum RequestVerdict {
    /// Let the request through untouched
    Allow = 0,
    /// Abort the request
    Cancel = 1,
    /// Send the request with an empty `Cookie` header
    StripCookies = 2,
}

impl RequestVerdict {
    pub fn is_blocked(self) -> bool {
        self != Self::Allow
    }
}

// =============================================================================
// UI Views
// =============================================================================

/// One popup row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PopupEntry {
    pub name: String,
    pub blocked_count: u32,
    pub is_blocked: bool,
}

/// Everything the popup shows for one tab.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PopupData {
    pub trackers: Vec<PopupEntry>,
}

impl PopupData {
    /// True if any tracker had at least one request blocked.
    pub fn any_blocked(&self) -> bool {
        self.trackers.iter().any(|entry| entry.blocked_count > 0)
    }

    pub fn entry(&self, name: &str) -> Option<&PopupEntry> {
        self.trackers.iter().find(|entry| entry.name == name)
    }
}

/// What the content script needs to swap buttons on a page.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ButtonReplacementPlan {
    pub trackers: Vec<Arc<Tracker>>,
    /// Complete map over every tracker: should its buttons be replaced?
    pub replace: BTreeMap<String, bool>,
}
