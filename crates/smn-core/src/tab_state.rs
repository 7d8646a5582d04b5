//! Tab State Store
//!
//! Per-tab record of the current page URL, the per-tracker block overrides
//! and the per-tracker blocked request counters. State lives from a tab's
//! first top-level navigation until the tab closes and is reset whenever the
//! tab navigates to a different URL.
//!
//! Operations on a tab with no recorded state are no-ops: tab lifecycle
//! events routinely race with in-flight requests and UI messages.

use std::collections::HashMap;

use log::{debug, warn};

use crate::registry::Registry;
use crate::types::TabId;

/// Per-tracker state of one tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TrackerSlot {
    blocked: bool,
    blocked_count: u32,
}

impl Default for TrackerSlot {
    fn default() -> Self {
        Self {
            blocked: true,
            blocked_count: 0,
        }
    }
}

#[derive(Debug, Clone)]
struct TabState {
    current_url: String,
    slots: Vec<TrackerSlot>,
}

/// Read-only view of one tracker on one tab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerTabStatus {
    pub name: String,
    /// Block override for this tab (not the global setting)
    pub blocked: bool,
    pub blocked_count: u32,
}

/// Read-only view of one tab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabSnapshot {
    pub current_url: String,
    /// One entry per tracker, in registration order
    pub trackers: Vec<TrackerTabStatus>,
}

impl TabSnapshot {
    pub fn tracker(&self, name: &str) -> Option<&TrackerTabStatus> {
        self.trackers.iter().find(|t| t.name == name)
    }
}

/// Keyed store of every open tab's state.
#[derive(Debug, Clone)]
pub struct TabStore {
    names: Vec<String>,
    slot_by_name: HashMap<String, usize>,
    tabs: HashMap<TabId, TabState>,
}

impl TabStore {
    pub fn new(registry: &Registry) -> Self {
        let names: Vec<String> = registry.names().map(str::to_string).collect();
        let slot_by_name = names
            .iter()
            .enumerate()
            .map(|(slot, name)| (name.clone(), slot))
            .collect();

        Self {
            names,
            slot_by_name,
            tabs: HashMap::new(),
        }
    }

    /// Start a fresh page for `tab_id` unless it is already on `url`.
    ///
    /// Returns true if the state was (re)created. Calling this again with the
    /// same URL keeps every override and counter, so a reload triggered to
    /// apply an unblock does not undo it.
    pub fn reset_if_navigated(&mut self, tab_id: TabId, url: &str) -> bool {
        if let Some(state) = self.tabs.get(&tab_id) {
            if state.current_url == url {
                return false;
            }
        }

        debug!("Resetting state of tab {tab_id} for {url}");
        self.tabs.insert(
            tab_id,
            TabState {
                current_url: url.to_string(),
                slots: vec![TrackerSlot::default(); self.names.len()],
            },
        );
        true
    }

    /// Set the block override of one tracker on one tab.
    pub fn set_override(&mut self, tab_id: TabId, tracker: &str, blocked: bool) {
        if let Some(slot) = self.slot_mut(tab_id, tracker) {
            slot.blocked = blocked;
        }
    }

    /// Allow every tracker on this tab until the next navigation.
    pub fn unblock_all(&mut self, tab_id: TabId) {
        if let Some(state) = self.tabs.get_mut(&tab_id) {
            for slot in &mut state.slots {
                slot.blocked = false;
            }
        }
    }

    pub fn increment_blocked(&mut self, tab_id: TabId, tracker: &str) {
        if let Some(slot) = self.slot_mut(tab_id, tracker) {
            slot.blocked_count = slot.blocked_count.saturating_add(1);
        }
    }

    /// Block override of one tracker, `None` if the tab or tracker is unknown.
    pub fn block_override(&self, tab_id: TabId, tracker: &str) -> Option<bool> {
        let slot = *self.slot_by_name.get(tracker)?;
        self.tabs.get(&tab_id).map(|state| state.slots[slot].blocked)
    }

    pub fn current_url(&self, tab_id: TabId) -> Option<&str> {
        self.tabs.get(&tab_id).map(|state| state.current_url.as_str())
    }

    pub fn contains(&self, tab_id: TabId) -> bool {
        self.tabs.contains_key(&tab_id)
    }

    pub fn snapshot(&self, tab_id: TabId) -> Option<TabSnapshot> {
        let state = self.tabs.get(&tab_id)?;
        let trackers = self
            .names
            .iter()
            .zip(&state.slots)
            .map(|(name, slot)| TrackerTabStatus {
                name: name.clone(),
                blocked: slot.blocked,
                blocked_count: slot.blocked_count,
            })
            .collect();

        Some(TabSnapshot {
            current_url: state.current_url.clone(),
            trackers,
        })
    }

    /// Drop a closed tab's state. Returns whether there was any.
    pub fn remove(&mut self, tab_id: TabId) -> bool {
        self.tabs.remove(&tab_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    fn slot_mut(&mut self, tab_id: TabId, tracker: &str) -> Option<&mut TrackerSlot> {
        let state = self.tabs.get_mut(&tab_id)?;
        match self.slot_by_name.get(tracker) {
            Some(&slot) => state.slots.get_mut(slot),
            None => {
                warn!("Ignoring unknown tracker '{tracker}' on tab {tab_id}");
                None
            }
        }
    }
}
