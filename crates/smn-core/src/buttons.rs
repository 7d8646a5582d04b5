//! Button Replacement Selector
//!
//! Decides, per tracker, whether its buttons on a tab's page are swapped for
//! local placeholders: replacement is on, the tracker is blocked globally
//! and the tab has not unblocked it.
//!
//! Domain exceptions and first-party suppression are not consulted. They are
//! tied to a request URL and this decision is made at render time without
//! one, so a page on a tracker's own site still gets placeholders.

use std::collections::BTreeMap;

use crate::policy::Policy;
use crate::registry::Registry;
use crate::tab_state::TabStore;
use crate::types::TabId;

/// Complete `tracker name -> replace?` map for a tab, `None` if the tab has
/// no state.
pub fn selectable_trackers<P: Policy + ?Sized>(
    registry: &Registry,
    tabs: &TabStore,
    tab_id: TabId,
    policy: &P,
) -> Option<BTreeMap<String, bool>> {
    if !tabs.contains(tab_id) {
        return None;
    }

    let replace_buttons = policy.replace_buttons();
    let plan = registry
        .names()
        .map(|name| {
            let replace = replace_buttons
                && policy.is_blocked_globally(name)
                && tabs.block_override(tab_id, name).unwrap_or(true);
            (name.to_string(), replace)
        })
        .collect();

    Some(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::Preferences;
    use crate::types::{ReplacementAction, ReplacementButton, Tracker};

    fn registry() -> Registry {
        let tracker = |name: &str, domain: &str| Tracker {
            name: name.to_string(),
            domain: domain.to_string(),
            match_patterns: vec![format!("{domain}/widget")],
            button_selectors: vec![format!(".{name}")],
            replacement_button: ReplacementButton {
                image_path: format!("{name}.png"),
                action: ReplacementAction::OpenWindow { url_template: format!("https://{domain}/share?u=") },
            },
        };
        Registry::load(vec![tracker("Facebook", "facebook.com"), tracker("Twitter", "twitter.com")])
            .expect("registry should load")
    }

    #[test]
    fn replaces_blocked_trackers() {
        let registry = registry();
        let mut tabs = TabStore::new(&registry);
        tabs.reset_if_navigated(1, "http://example.com");

        let plan = selectable_trackers(&registry, &tabs, 1, &Preferences::default())
            .expect("tab should exist");
        assert_eq!(plan.len(), 2);
        assert_eq!(plan.get("Facebook"), Some(&true));
        assert_eq!(plan.get("Twitter"), Some(&true));
    }

    #[test]
    fn replace_buttons_off_maps_everything_to_false() {
        let registry = registry();
        let mut tabs = TabStore::new(&registry);
        tabs.reset_if_navigated(1, "http://example.com");
        let mut prefs = Preferences::default();
        prefs.set_replace_buttons(false);

        let plan = selectable_trackers(&registry, &tabs, 1, &prefs).expect("tab should exist");
        assert_eq!(plan.len(), 2);
        assert!(plan.values().all(|replace| !replace));
    }

    #[test]
    fn respects_global_and_tab_settings() {
        let registry = registry();
        let mut tabs = TabStore::new(&registry);
        tabs.reset_if_navigated(1, "http://example.com");
        tabs.set_override(1, "Twitter", false);
        let mut prefs = Preferences::default();
        prefs.set_blocked("Facebook", false);

        let plan = selectable_trackers(&registry, &tabs, 1, &prefs).expect("tab should exist");
        assert_eq!(plan.get("Facebook"), Some(&false));
        assert_eq!(plan.get("Twitter"), Some(&false));
    }

    #[test]
    fn ignores_first_party_and_exceptions() {
        let registry = registry();
        let mut tabs = TabStore::new(&registry);
        tabs.reset_if_navigated(1, "http://www.facebook.com/home");
        let mut prefs = Preferences::default();
        prefs.add_exception("Facebook", ".*").expect("valid regex");

        let plan = selectable_trackers(&registry, &tabs, 1, &prefs).expect("tab should exist");
        assert_eq!(plan.get("Facebook"), Some(&true));
    }

    #[test]
    fn unknown_tab_has_no_plan() {
        let registry = registry();
        let tabs = TabStore::new(&registry);
        assert!(selectable_trackers(&registry, &tabs, 9, &Preferences::default()).is_none());
    }
}
