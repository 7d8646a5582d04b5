//! Engine facade
//!
//! Owns the registry, the pattern index, the tab state store and the current
//! policy, and exposes the operations the platform layer, the popup and the
//! content script call. All operations take `&self`; the tab store and the
//! policy sit behind locks so events may arrive from several contexts.
//!
//! Request filtering fails open: any internal failure yields
//! [`RequestVerdict::Allow`] so a bug here never breaks ordinary browsing.

use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard};

use log::{debug, info, warn};

use crate::buttons::selectable_trackers;
use crate::filter;
use crate::matcher::PatternIndex;
use crate::policy::{Policy, Preferences};
use crate::registry::{Registry, RegistryError};
use crate::tab_state::{TabSnapshot, TabStore};
use crate::types::{
    ButtonReplacementPlan, ObservedRequest, PopupData, PopupEntry, RequestVerdict, TabId, Tracker,
};

/// Internal failures while serving an event.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Tab state store is unavailable")]
    TabStateUnavailable,
    #[error("Policy is unavailable")]
    PolicyUnavailable,
}

/// The tracker decision engine.
pub struct Engine<P = Preferences> {
    registry: Registry,
    index: PatternIndex,
    tabs: Mutex<TabStore>,
    policy: RwLock<P>,
}

impl<P: Policy> Engine<P> {
    /// Build the engine. Fails if any match pattern does not compile.
    pub fn new(registry: Registry, policy: P) -> Result<Self, RegistryError> {
        let index = PatternIndex::build(&registry)?;
        let tabs = TabStore::new(&registry);
        info!(
            "Engine ready: {} trackers, {} patterns",
            registry.len(),
            index.len()
        );

        Ok(Self {
            registry,
            index,
            tabs: Mutex::new(tabs),
            policy: RwLock::new(policy),
        })
    }

    /// Build the engine from a tracker catalog.
    pub fn from_catalog_json(text: &str, policy: P) -> Result<Self, RegistryError> {
        Self::new(Registry::from_json(text)?, policy)
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn index(&self) -> &PatternIndex {
        &self.index
    }

    /// Tracker owning `url`, if any.
    pub fn resolve(&self, url: &str) -> Option<&Arc<Tracker>> {
        self.index.resolve(url)
    }

    /// Swap in new global settings (e.g. after the options page changed).
    pub fn replace_policy(&self, policy: P) {
        match self.policy.write() {
            Ok(mut guard) => *guard = policy,
            Err(poisoned) => {
                warn!("Recovering poisoned policy lock");
                *poisoned.into_inner() = policy;
                self.policy.clear_poison();
            }
        }
    }

    /// Run `f` against the current policy.
    pub fn with_policy<R>(&self, f: impl FnOnce(&P) -> R) -> Result<R, EngineError> {
        Ok(f(&*self.policy()?))
    }

    // =========================================================================
    // Platform layer
    // =========================================================================

    /// A tab started loading a new top-level document.
    pub fn on_top_level_navigation(&self, tab_id: TabId, url: &str) {
        match self.tabs() {
            Ok(mut tabs) => {
                tabs.reset_if_navigated(tab_id, url);
            }
            Err(e) => warn!("Navigation of tab {tab_id} not recorded: {e}"),
        }
    }

    /// Decide a request. Never fails; internal errors allow the request.
    pub fn on_request_observed(&self, request: &ObservedRequest<'_>) -> RequestVerdict {
        match self.try_filter_request(request) {
            Ok(verdict) => verdict,
            Err(e) => {
                warn!("Allowing {} after internal error: {e}", request.url);
                RequestVerdict::Allow
            }
        }
    }

    /// Decide a request, surfacing internal errors.
    pub fn try_filter_request(
        &self,
        request: &ObservedRequest<'_>,
    ) -> Result<RequestVerdict, EngineError> {
        let policy = self.policy()?;
        let mut tabs = self.tabs()?;

        // The new page's state must be in place before its requests are judged.
        if let (Some(tab_id), Some(tab_url)) = (request.tab_id, request.tab_url) {
            tabs.reset_if_navigated(tab_id, tab_url);
        }

        let tracker = match self.index.resolve(request.url) {
            Some(tracker) => tracker,
            None => return Ok(RequestVerdict::Allow),
        };

        if !filter::decide(&mut tabs, request.tab_id, request.url, tracker, &*policy) {
            return Ok(RequestVerdict::Allow);
        }

        if policy.replace_buttons() {
            Ok(RequestVerdict::Cancel)
        } else {
            Ok(RequestVerdict::StripCookies)
        }
    }

    pub fn on_tab_closed(&self, tab_id: TabId) {
        match self.tabs() {
            Ok(mut tabs) => {
                if tabs.remove(tab_id) {
                    debug!("Dropped state of closed tab {tab_id}");
                }
            }
            Err(e) => warn!("Close of tab {tab_id} not recorded: {e}"),
        }
    }

    // =========================================================================
    // Popup
    // =========================================================================

    /// Globally blocked trackers with their per-tab counts and overrides.
    /// `None` for a tab the engine has no state for.
    pub fn popup_data(&self, tab_id: TabId) -> Option<PopupData> {
        self.try_popup_data(tab_id).unwrap_or_else(|e| {
            warn!("No popup data for tab {tab_id}: {e}");
            None
        })
    }

    fn try_popup_data(&self, tab_id: TabId) -> Result<Option<PopupData>, EngineError> {
        let policy = self.policy()?;
        let tabs = self.tabs()?;

        let snapshot = match tabs.snapshot(tab_id) {
            Some(snapshot) => snapshot,
            None => return Ok(None),
        };

        let trackers = snapshot
            .trackers
            .into_iter()
            .filter(|status| policy.is_blocked_globally(&status.name))
            .map(|status| PopupEntry {
                name: status.name,
                blocked_count: status.blocked_count,
                is_blocked: status.blocked,
            })
            .collect();

        Ok(Some(PopupData { trackers }))
    }

    /// Block or allow one tracker on a tab until its next navigation.
    pub fn set_tracker_blocked(&self, tab_id: TabId, tracker: &str, blocked: bool) {
        match self.tabs() {
            Ok(mut tabs) => tabs.set_override(tab_id, tracker, blocked),
            Err(e) => warn!("Override of {tracker} on tab {tab_id} not recorded: {e}"),
        }
    }

    /// Allow every tracker on a tab until its next navigation.
    pub fn unblock_all(&self, tab_id: TabId) {
        match self.tabs() {
            Ok(mut tabs) => tabs.unblock_all(tab_id),
            Err(e) => warn!("Unblock-all on tab {tab_id} not recorded: {e}"),
        }
    }

    // =========================================================================
    // Content script
    // =========================================================================

    /// Which trackers' buttons to replace on a tab's page. `None` for a tab
    /// the engine has no state for.
    pub fn button_replacement_plan(&self, tab_id: TabId) -> Option<ButtonReplacementPlan> {
        self.try_button_replacement_plan(tab_id).unwrap_or_else(|e| {
            warn!("No button replacement plan for tab {tab_id}: {e}");
            None
        })
    }

    fn try_button_replacement_plan(
        &self,
        tab_id: TabId,
    ) -> Result<Option<ButtonReplacementPlan>, EngineError> {
        let policy = self.policy()?;
        let tabs = self.tabs()?;

        Ok(
            selectable_trackers(&self.registry, &tabs, tab_id, &*policy).map(|replace| {
                ButtonReplacementPlan {
                    trackers: self.registry.trackers().to_vec(),
                    replace,
                }
            }),
        )
    }

    /// The user clicked a placeholder: allow its tracker on this tab only.
    pub fn on_button_clicked(&self, tab_id: TabId, tracker: &str) {
        self.set_tracker_blocked(tab_id, tracker, false);
    }

    pub fn tab_snapshot(&self, tab_id: TabId) -> Option<TabSnapshot> {
        self.tabs().ok()?.snapshot(tab_id)
    }

    fn tabs(&self) -> Result<MutexGuard<'_, TabStore>, EngineError> {
        self.tabs.lock().map_err(|_| EngineError::TabStateUnavailable)
    }

    fn policy(&self) -> Result<RwLockReadGuard<'_, P>, EngineError> {
        self.policy.read().map_err(|_| EngineError::PolicyUnavailable)
    }
}
