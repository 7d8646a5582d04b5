//! ShareMeNot Core Library
//!
//! This crate decides, for every outgoing request and every share/like button
//! on a page, whether a known third-party tracker is blocked, and keeps that
//! decision per browser tab so the user can override it.
//!
//! # Architecture
//!
//! The tracker catalog is validated and frozen once at startup, and all match
//! patterns are compiled into a single pattern set. Each request or button
//! query then flows through the tab state store into the request filter or
//! the button replacement selector, with the registry and matcher as
//! read-only references. The [`Engine`] ties these together behind the
//! operations the platform layer, popup and content script call.
//!
//! # Modules
//!
//! - `types`: Trackers, replacement buttons, verdicts and UI views
//! - `registry`: Tracker catalog loading and validation
//! - `matcher`: URL to tracker resolution
//! - `tab_state`: Per-tab overrides and blocked request counters
//! - `policy`: Global settings (`Policy` trait, JSON `Preferences`)
//! - `filter`: Per-request block decision
//! - `buttons`: Per-tab button replacement eligibility
//! - `engine`: Facade with fail-open request handling
//! - `host`: Allocation-free host extraction

pub mod buttons;
pub mod engine;
pub mod filter;
pub mod host;
pub mod matcher;
pub mod policy;
pub mod registry;
pub mod tab_state;
pub mod types;

// Re-export commonly used types
pub use engine::{Engine, EngineError};
pub use matcher::PatternIndex;
pub use policy::{Policy, PolicyError, Preferences, PreferencesConfig};
pub use registry::{Registry, RegistryError};
pub use tab_state::{TabSnapshot, TabStore};
pub use types::{
    ButtonReplacementPlan, ObservedRequest, PopupData, PopupEntry, ReplacementAction,
    ReplacementButton, RequestVerdict, TabId, Tracker,
};
