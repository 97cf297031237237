// Entry cache: facts extracted from intercepted payloads, keyed by content id.
//
// Lives for one page context. Nothing is evicted; every write replaces the
// previous value for its key under a single lock acquisition, so a reader
// never observes a half-written entry.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::Serialize;
use tweek_common::{AccountFacts, CachedMedia, ContentFacts, ContentId};

#[derive(Default)]
struct StoreInner {
    media: HashMap<ContentId, CachedMedia>,
    facts: HashMap<ContentId, ContentFacts>,
    locations: HashMap<ContentId, String>,
    accounts: HashMap<String, AccountFacts>,
    url_aliases: HashMap<String, ContentId>,
}

/// Counts per index, for logging and the CLI.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub media: usize,
    pub facts: usize,
    pub locations: usize,
    pub accounts: usize,
    pub url_aliases: usize,
}

#[derive(Default)]
pub struct EntryCacheStore {
    inner: RwLock<StoreInner>,
}

impl EntryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    // --- media entries ---

    /// Replace the media entry for `id`.
    pub fn put(&self, id: ContentId, entry: CachedMedia) {
        self.write().media.insert(id, entry);
    }

    pub fn get(&self, id: &ContentId) -> Option<CachedMedia> {
        self.read().media.get(id).cloned()
    }

    pub fn has_media(&self, id: &ContentId) -> bool {
        self.read().media.contains_key(id)
    }

    // --- content facts ---

    pub fn put_facts(&self, id: ContentId, facts: ContentFacts) {
        self.write().facts.insert(id, facts);
    }

    pub fn facts(&self, id: &ContentId) -> Option<ContentFacts> {
        self.read().facts.get(id).cloned()
    }

    pub fn has_facts(&self, id: &ContentId) -> bool {
        self.read().facts.contains_key(id)
    }

    // --- locations ---

    pub fn put_location(&self, id: ContentId, location: impl Into<String>) {
        self.write().locations.insert(id, location.into());
    }

    pub fn location(&self, id: &ContentId) -> Option<String> {
        self.read().locations.get(id).cloned()
    }

    // --- accounts ---

    /// Replace the facts for an account. Keyed by the lower-cased handle.
    pub fn put_account(&self, facts: AccountFacts) {
        let key = facts.handle.to_lowercase();
        self.write().accounts.insert(key, facts);
    }

    /// Look up an account by handle, case-insensitively.
    pub fn account(&self, handle: &str) -> Option<AccountFacts> {
        self.read().accounts.get(&handle.to_lowercase()).cloned()
    }

    // --- reverse URL index ---

    /// Map a normalized asset URL to the content that owns it.
    pub fn put_url_alias(&self, normalized_url: impl Into<String>, id: ContentId) {
        self.write().url_aliases.insert(normalized_url.into(), id);
    }

    pub fn resolve_url_alias(&self, normalized_url: &str) -> Option<ContentId> {
        self.read().url_aliases.get(normalized_url).cloned()
    }

    pub fn stats(&self) -> StoreStats {
        let inner = self.read();
        StoreStats {
            media: inner.media.len(),
            facts: inner.facts.len(),
            locations: inner.locations.len(),
            accounts: inner.accounts.len(),
            url_aliases: inner.url_aliases.len(),
        }
    }

    /// Ids of every content item with cached media, sorted.
    pub fn media_ids(&self) -> Vec<ContentId> {
        let mut ids: Vec<ContentId> = self.read().media.keys().cloned().collect();
        ids.sort();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tweek_common::{MediaDescriptor, MediaKind};

    fn id(raw: &str) -> ContentId {
        ContentId::new(raw).unwrap()
    }

    fn entry(handle: &str, urls: &[&str]) -> CachedMedia {
        CachedMedia {
            account_handle: handle.to_string(),
            media: urls
                .iter()
                .map(|u| MediaDescriptor {
                    kind: MediaKind::Photo,
                    source_url: format!("{u}:orig"),
                    thumbnail_url: u.to_string(),
                })
                .collect(),
            source: None,
        }
    }

    #[test]
    fn media_entry_is_last_write_wins() {
        let store = EntryCacheStore::new();
        store.put(id("1"), entry("a", &["https://x/1.jpg", "https://x/2.jpg"]));
        store.put(id("1"), entry("a", &["https://x/3.jpg"]));

        let cached = store.get(&id("1")).unwrap();
        assert_eq!(cached.media.len(), 1);
        assert_eq!(cached.media[0].thumbnail_url, "https://x/3.jpg");
    }

    #[test]
    fn account_lookup_ignores_case() {
        let store = EntryCacheStore::new();
        store.put_account(AccountFacts {
            handle: "SomeOne".into(),
            location: Some("Lisbon".into()),
            display_name: Some("Some One".into()),
        });

        let facts = store.account("someone").unwrap();
        assert_eq!(facts.location.as_deref(), Some("Lisbon"));
        assert!(store.account("SOMEONE").is_some());
    }

    #[test]
    fn url_alias_resolves_to_owner() {
        let store = EntryCacheStore::new();
        store.put_url_alias("https://pbs.twimg.com/media/abc.jpg", id("42"));

        assert_eq!(
            store.resolve_url_alias("https://pbs.twimg.com/media/abc.jpg"),
            Some(id("42"))
        );
        assert_eq!(store.resolve_url_alias("https://pbs.twimg.com/media/zzz.jpg"), None);
    }

    #[test]
    fn stats_count_each_index() {
        let store = EntryCacheStore::new();
        store.put(id("1"), entry("a", &["https://x/1.jpg"]));
        store.put_facts(id("1"), ContentFacts::default());
        store.put_facts(id("2"), ContentFacts::default());
        store.put_location(id("2"), "Oslo");

        let stats = store.stats();
        assert_eq!(stats.media, 1);
        assert_eq!(stats.facts, 2);
        assert_eq!(stats.locations, 1);
        assert_eq!(stats.accounts, 0);
        assert_eq!(store.media_ids(), vec![id("1")]);
    }
}
