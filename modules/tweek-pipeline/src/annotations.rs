// Read-model for focused-content annotations: the client source label and
// the author's free-text location.

use tweek_common::{ContentId, Settings};

use crate::store::EntryCacheStore;

/// Shown when a focused item's client source was never captured.
pub const FALLBACK_SOURCE_LABEL: &str = "Twitter Web App";

pub struct Annotations<'a> {
    store: &'a EntryCacheStore,
    settings: &'a Settings,
}

impl<'a> Annotations<'a> {
    pub fn new(store: &'a EntryCacheStore, settings: &'a Settings) -> Self {
        Self { store, settings }
    }

    /// Client source label, or `None` when source labels are turned off.
    pub fn source_label(&self, id: &ContentId) -> Option<String> {
        if !self.settings.restore_tweet_source {
            return None;
        }
        let cached = self
            .store
            .get(id)
            .and_then(|entry| entry.source)
            .or_else(|| self.store.facts(id).and_then(|facts| facts.client_source));
        Some(cached.unwrap_or_else(|| FALLBACK_SOURCE_LABEL.to_string()))
    }

    /// Author location for a focused item.
    ///
    /// Tried in order: the location cached for the content itself, the
    /// cached author's account facts, then each handle the rendered item links to.
    pub fn account_location(&self, id: &ContentId, rendered_handles: &[&str]) -> Option<String> {
        if !self.settings.show_account_location {
            return None;
        }

        self.store
            .location(id)
            .or_else(|| {
                let handle = self.store.facts(id)?.account_handle?;
                self.store.account(&handle)?.location
            })
            .or_else(|| {
                rendered_handles
                    .iter()
                    .find_map(|handle| self.store.account(handle)?.location)
            })
            .filter(|location| !location.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tweek_common::{AccountFacts, CachedMedia, ContentFacts};

    fn id(raw: &str) -> ContentId {
        ContentId::new(raw).unwrap()
    }

    fn account(handle: &str, location: &str) -> AccountFacts {
        AccountFacts {
            handle: handle.into(),
            location: Some(location.into()),
            display_name: None,
        }
    }

    #[test]
    fn source_label_prefers_media_entry_then_facts_then_fallback() {
        let store = EntryCacheStore::new();
        let settings = Settings::default();
        store.put(
            id("1"),
            CachedMedia {
                account_handle: "a".into(),
                media: vec![],
                source: Some("Twitter for iPhone".into()),
            },
        );
        store.put_facts(
            id("2"),
            ContentFacts {
                account_handle: None,
                client_source: Some("Twitter for Android".into()),
            },
        );

        let annotations = Annotations::new(&store, &settings);
        assert_eq!(annotations.source_label(&id("1")).as_deref(), Some("Twitter for iPhone"));
        assert_eq!(annotations.source_label(&id("2")).as_deref(), Some("Twitter for Android"));
        assert_eq!(annotations.source_label(&id("3")).as_deref(), Some(FALLBACK_SOURCE_LABEL));
    }

    #[test]
    fn source_label_respects_setting() {
        let store = EntryCacheStore::new();
        let settings = Settings {
            restore_tweet_source: false,
            ..Settings::default()
        };
        assert!(Annotations::new(&store, &settings).source_label(&id("1")).is_none());
    }

    #[test]
    fn location_falls_back_through_author_and_rendered_handles() {
        let store = EntryCacheStore::new();
        let settings = Settings::default();
        store.put_location(id("1"), "Direct");
        store.put_facts(
            id("2"),
            ContentFacts {
                account_handle: Some("Writer".into()),
                client_source: None,
            },
        );
        store.put_account(account("writer", "Via Author"));
        store.put_account(account("linked", "Via Link"));

        let annotations = Annotations::new(&store, &settings);
        assert_eq!(annotations.account_location(&id("1"), &[]).as_deref(), Some("Direct"));
        assert_eq!(annotations.account_location(&id("2"), &[]).as_deref(), Some("Via Author"));
        assert_eq!(
            annotations
                .account_location(&id("3"), &["nobody", "Linked"])
                .as_deref(),
            Some("Via Link")
        );
        assert!(annotations.account_location(&id("4"), &["nobody"]).is_none());
    }
}
