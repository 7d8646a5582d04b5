//! Request Filter
//!
//! Decides whether one request to a known tracker is blocked. A request is
//! blocked iff all of the following hold:
//!
//! 1. the tracker is blocked globally,
//! 2. the tab has not overridden the block (requests without tab state
//!    skip this check),
//! 3. the URL matches none of the tracker's exceptions,
//! 4. the tab is not on the tracker's own site.
//!
//! A block decision increments the tab's counter for that tracker.

use log::debug;

use crate::policy::Policy;
use crate::tab_state::TabStore;
use crate::types::{TabId, Tracker};
use crate::host::is_on_domain;

/// Decide one request. `tracker` is the tracker `url` resolved to.
pub fn decide<P: Policy + ?Sized>(
    tabs: &mut TabStore,
    tab_id: Option<TabId>,
    url: &str,
    tracker: &Tracker,
    policy: &P,
) -> bool {
    let name = tracker.name.as_str();

    if !policy.is_blocked_globally(name) {
        debug!("Allowing {url}: {name} is not blocked globally");
        return false;
    }

    // Missing tab state is an expected transient (request racing tab creation).
    let tab = tab_id.filter(|id| tabs.contains(*id));

    if let Some(id) = tab {
        if tabs.block_override(id, name) == Some(false) {
            debug!("Allowing {url}: {name} unblocked on tab {id}");
            return false;
        }
    }

    if matches_exception(policy, name, url) {
        debug!("Allowing {url}: exception for {name}");
        return false;
    }

    if let Some(id) = tab {
        if let Some(page_url) = tabs.current_url(id) {
            if is_on_domain(page_url, &tracker.domain) {
                debug!("Allowing {url}: tab {id} is on {}", tracker.domain);
                return false;
            }
        }
        tabs.increment_blocked(id, name);
    }

    debug!("Blocking {url} ({name})");
    true
}

fn matches_exception<P: Policy + ?Sized>(policy: &P, tracker: &str, url: &str) -> bool {
    policy.exceptions(tracker).iter().any(|re| re.is_match(url))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::Preferences;
    use crate::registry::Registry;
    use crate::types::{ReplacementAction, ReplacementButton};

    const LIKE_URL: &str = "http://static.facebook.com/plugins/like.php";

    fn facebook() -> Tracker {
        Tracker {
            name: "Facebook".to_string(),
            domain: "facebook.com".to_string(),
            match_patterns: vec!["*.facebook.com/plugins*".to_string()],
            button_selectors: vec!["fb\\:like".to_string()],
            replacement_button: ReplacementButton {
                image_path: "FacebookLike.png".to_string(),
                action: ReplacementAction::Iframe {
                    url_template: "https://www.facebook.com/plugins/like.php?href=".to_string(),
                },
            },
        }
    }

    fn setup() -> (Tracker, TabStore) {
        let registry = Registry::load(vec![facebook()]).expect("registry should load");
        let tabs = TabStore::new(&registry);
        (facebook(), tabs)
    }

    fn count(tabs: &TabStore, tab: TabId) -> u32 {
        tabs.snapshot(tab)
            .and_then(|s| s.tracker("Facebook").map(|t| t.blocked_count))
            .unwrap_or(0)
    }

    #[test]
    fn blocks_third_party_request() {
        let (tracker, mut tabs) = setup();
        tabs.reset_if_navigated(1, "http://example.com");

        assert!(decide(&mut tabs, Some(1), LIKE_URL, &tracker, &Preferences::default()));
        assert_eq!(count(&tabs, 1), 1);
    }

    #[test]
    fn first_party_page_is_never_blocked() {
        let (tracker, mut tabs) = setup();
        tabs.reset_if_navigated(1, "http://www.facebook.com/home");

        assert!(!decide(&mut tabs, Some(1), LIKE_URL, &tracker, &Preferences::default()));
        assert_eq!(count(&tabs, 1), 0);
    }

    #[test]
    fn tab_override_allows() {
        let (tracker, mut tabs) = setup();
        tabs.reset_if_navigated(1, "http://example.com");
        tabs.set_override(1, "Facebook", false);

        assert!(!decide(&mut tabs, Some(1), LIKE_URL, &tracker, &Preferences::default()));
        assert_eq!(count(&tabs, 1), 0);

        tabs.unblock_all(1);
        assert!(!decide(&mut tabs, Some(1), LIKE_URL, &tracker, &Preferences::default()));
    }

    #[test]
    fn global_setting_allows() {
        let (tracker, mut tabs) = setup();
        tabs.reset_if_navigated(1, "http://example.com");
        let mut prefs = Preferences::default();
        prefs.set_blocked("Facebook", false);

        assert!(!decide(&mut tabs, Some(1), LIKE_URL, &tracker, &prefs));
        assert_eq!(count(&tabs, 1), 0);
    }

    #[test]
    fn exception_allows() {
        let (tracker, mut tabs) = setup();
        tabs.reset_if_navigated(1, "http://example.com");
        let mut prefs = Preferences::default();
        prefs.add_exception("Facebook", "nomatch\\.example").expect("valid regex");
        prefs.add_exception("Facebook", "plugins/like").expect("valid regex");

        assert!(!decide(&mut tabs, Some(1), LIKE_URL, &tracker, &prefs));
        assert!(decide(
            &mut tabs,
            Some(1),
            "http://static.facebook.com/plugins/share.php",
            &tracker,
            &prefs
        ));
    }

    #[test]
    fn request_without_tab_is_blocked_without_counting() {
        let (tracker, mut tabs) = setup();
        assert!(decide(&mut tabs, None, LIKE_URL, &tracker, &Preferences::default()));
        assert!(tabs.is_empty());
    }

    #[test]
    fn unknown_tab_does_not_panic() {
        let (tracker, mut tabs) = setup();
        assert!(decide(&mut tabs, Some(42), LIKE_URL, &tracker, &Preferences::default()));
        assert!(tabs.snapshot(42).is_none());
    }

    #[test]
    fn counter_accumulates() {
        let (tracker, mut tabs) = setup();
        tabs.reset_if_navigated(1, "http://example.com");
        for _ in 0..3 {
            decide(&mut tabs, Some(1), LIKE_URL, &tracker, &Preferences::default());
        }
        assert_eq!(count(&tabs, 1), 3);
    }
}
