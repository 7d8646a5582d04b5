//! URL Pattern Matcher
//!
//! Every tracker's match patterns are compiled into a single `RegexSet`.
//! A pattern is a regular expression in which `*` stands for any run of
//! characters, and it is searched for anywhere in the URL (no anchoring).
//!
//! When several patterns match, the one registered first wins: patterns are
//! indexed in catalog order, then in declaration order within a tracker.

use std::sync::Arc;

use regex::RegexSet;

use crate::registry::{Registry, RegistryError};
use crate::types::Tracker;

/// Translate a glob-style match pattern into a regular expression.
pub fn glob_to_regex(pattern: &str) -> String {
    pattern.replace('*', ".*")
}

/// Compiled pattern index: pattern -> owning tracker.
#[derive(Debug, Clone)]
pub struct PatternIndex {
    set: RegexSet,
    owners: Vec<Arc<Tracker>>,
}

impl PatternIndex {
    /// Compile the patterns of every tracker in the registry.
    pub fn build(registry: &Registry) -> Result<Self, RegistryError> {
        let mut sources = Vec::with_capacity(registry.pattern_count());
        let mut owners = Vec::with_capacity(registry.pattern_count());

        for tracker in registry.trackers() {
            for pattern in &tracker.match_patterns {
                let source = glob_to_regex(pattern);
                // Compile one at a time so a bad pattern is attributed to its tracker.
                if let Err(e) = regex::Regex::new(&source) {
                    return Err(RegistryError::malformed(
                        &tracker.name,
                        format!("invalid match pattern '{pattern}': {e}"),
                    ));
                }
                sources.push(source);
                owners.push(Arc::clone(tracker));
            }
        }

        let set = RegexSet::new(&sources)
            .map_err(|e| RegistryError::InvalidCatalog(format!("pattern set: {e}")))?;

        Ok(Self { set, owners })
    }

    /// Tracker owning `url`, or `None` if no pattern matches.
    pub fn resolve(&self, url: &str) -> Option<&Arc<Tracker>> {
        let first = self.set.matches(url).into_iter().next()?;
        self.owners.get(first)
    }

    /// Compiled expression of every pattern, in match priority order.
    pub fn patterns(&self) -> &[String] {
        self.set.patterns()
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ReplacementAction, ReplacementButton};

    fn tracker(name: &str, domain: &str, patterns: &[&str]) -> Tracker {
        Tracker {
            name: name.to_string(),
            domain: domain.to_string(),
            match_patterns: patterns.iter().map(|p| p.to_string()).collect(),
            button_selectors: vec![format!(".{name}")],
            replacement_button: ReplacementButton {
                image_path: format!("{name}.png"),
                action: ReplacementAction::InlineMarkup { markup: String::new() },
            },
        }
    }

    fn index(trackers: Vec<Tracker>) -> PatternIndex {
        let registry = Registry::load(trackers).expect("registry should load");
        PatternIndex::build(&registry).expect("index should build")
    }

    #[test]
    fn glob_translation() {
        assert_eq!(glob_to_regex("*.facebook.com/plugins*"), ".*.facebook.com/plugins.*");
        assert_eq!(glob_to_regex("plain"), "plain");
    }

    #[test]
    fn resolves_pattern_anywhere_in_url() {
        let index = index(vec![
            tracker("Facebook", "facebook.com", &["*.facebook.com/plugins*"]),
            tracker("Twitter", "twitter.com", &["platform.twitter.com/widgets*"]),
        ]);

        let hit = index
            .resolve("http://static.facebook.com/plugins/like.php")
            .expect("should resolve");
        assert_eq!(hit.name, "Facebook");

        // Search, not anchored match
        let hit = index
            .resolve("https://platform.twitter.com/widgets.js?x=1")
            .expect("should resolve");
        assert_eq!(hit.name, "Twitter");
    }

    #[test]
    fn each_tracker_resolves_from_literal_pattern() {
        let trackers = vec![
            tracker("Facebook", "facebook.com", &["*.facebook.com/plugins*", "connect.facebook.net*"]),
            tracker("Twitter", "twitter.com", &["platform.twitter.com/widgets*"]),
            tracker("LinkedIn", "linkedin.com", &["platform.linkedin.com/in.js"]),
        ];
        let index = index(trackers.clone());

        for t in &trackers {
            for pattern in &t.match_patterns {
                let url = format!("https://{}", pattern.replace('*', "x"));
                let hit = index.resolve(&url).expect("pattern URL should resolve");
                assert_eq!(hit.name, t.name, "url {url}");
            }
        }
    }

    #[test]
    fn unmatched_url_resolves_to_none() {
        let index = index(vec![tracker("Facebook", "facebook.com", &["*.facebook.com/plugins*"])]);
        assert!(index.resolve("http://example.com/index.html").is_none());
        assert!(index.resolve("").is_none());
    }

    #[test]
    fn overlapping_patterns_prefer_registration_order() {
        let index = index(vec![
            tracker("First", "first.com", &["widgets"]),
            tracker("Second", "second.com", &["cdn.example.com/widgets"]),
        ]);
        let hit = index.resolve("https://cdn.example.com/widgets.js").expect("should resolve");
        assert_eq!(hit.name, "First");
    }

    #[test]
    fn invalid_pattern_is_malformed_definition() {
        let registry = Registry::load(vec![tracker("Broken", "broken.com", &["broken.com/(unclosed"])])
            .expect("registry should load");
        match PatternIndex::build(&registry) {
            Err(RegistryError::MalformedDefinition { name, .. }) => assert_eq!(name, "Broken"),
            other => panic!("expected malformed definition, got {other:?}"),
        }
    }

    #[test]
    fn patterns_listed_in_priority_order() {
        let index = index(vec![
            tracker("A", "a.com", &["a1", "a2*"]),
            tracker("B", "b.com", &["b1"]),
        ]);
        assert_eq!(index.len(), 3);
        assert_eq!(index.patterns(), &["a1".to_string(), "a2.*".to_string(), "b1".to_string()]);
    }
}
