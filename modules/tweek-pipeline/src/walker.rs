// Payload walker, extraction mode.
//
// Descends any decoded payload and records content facts and media entries in
// the cache as it goes. Depth-bounded so adversarially nested input
// terminates; shape misses are silent.

use serde::Serialize;
use serde_json::Value;
use tracing::trace;
use tweek_common::{AccountFacts, CachedMedia, ContentFacts, ContentId};

use crate::media::{describe_entity, normalize_asset_url};
use crate::shape::{
    client_source, facts_author, facts_content_id, media_author, media_content_id,
    media_entities, quoted_references, str_at,
};
use crate::store::EntryCacheStore;

/// Nodes deeper than this are left unvisited.
pub const EXTRACTION_DEPTH_LIMIT: usize = 25;

/// Handle recorded when a media-bearing node names no account and none is cached.
pub const UNKNOWN_ACCOUNT_HANDLE: &str = "twitter_user";

/// What one walk wrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WalkReport {
    pub nodes_visited: usize,
    pub media_entries: usize,
    pub facts_entries: usize,
    pub depth_cutoffs: usize,
}

pub struct PayloadWalker<'a> {
    store: &'a EntryCacheStore,
    max_depth: usize,
}

impl<'a> PayloadWalker<'a> {
    pub fn new(store: &'a EntryCacheStore) -> Self {
        Self {
            store,
            max_depth: EXTRACTION_DEPTH_LIMIT,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Walk `payload` and record every fact found.
    pub fn walk(&self, payload: &Value) -> WalkReport {
        let mut report = WalkReport::default();
        self.visit(payload, 0, &mut report);
        report
    }

    fn visit(&self, node: &Value, depth: usize, report: &mut WalkReport) {
        if depth > self.max_depth {
            if node.is_object() || node.is_array() {
                report.depth_cutoffs += 1;
            }
            return;
        }

        match node {
            Value::Object(map) => {
                report.nodes_visited += 1;
                self.record_content_facts(node, report);
                self.record_media(node, report);

                for quoted in quoted_references(node) {
                    self.visit(quoted, depth + 1, report);
                }
                for child in map.values() {
                    self.visit(child, depth + 1, report);
                }
            }
            Value::Array(items) => {
                report.nodes_visited += 1;
                for item in items {
                    self.visit(item, depth + 1, report);
                }
            }
            _ => {}
        }
    }

    /// Account, source and location facts for any node that carries a content id.
    fn record_content_facts(&self, node: &Value, report: &mut WalkReport) {
        let Some(id) = facts_content_id(node) else {
            return;
        };
        if self.store.has_facts(&id) {
            return;
        }

        let author = facts_author(node).unwrap_or_default();
        let handle = author.handle;
        let location = author.location;

        if let (Some(handle), Some(location)) = (handle, location) {
            self.store.put_account(AccountFacts {
                handle: handle.to_string(),
                location: Some(location.to_string()),
                display_name: author.display_name.map(str::to_string),
            });
        }

        let client_source = client_source(node);
        if handle.is_some() || client_source.is_some() {
            self.store.put_facts(
                id.clone(),
                ContentFacts {
                    account_handle: handle.map(str::to_string),
                    client_source,
                },
            );
            report.facts_entries += 1;
        }

        if let Some(location) = location.filter(|l| !l.trim().is_empty()) {
            self.store.put_location(id, location);
        }
    }

    /// Media entry, location and reverse URL aliases for a media-bearing node.
    fn record_media(&self, node: &Value, report: &mut WalkReport) {
        let Some(entities) = media_entities(node) else {
            return;
        };
        let Some(id) = media_content_id(node) else {
            return;
        };

        let media: Vec<_> = entities.iter().filter_map(describe_entity).collect();
        if media.is_empty() {
            trace!(content_id = %id, "Media entities carried no usable URL");
            return;
        }

        let author = media_author(node);
        let account_handle = match author.and_then(|a| a.handle) {
            Some(handle) => handle.to_string(),
            None => self.cached_handle(&id),
        };

        self.store.put(
            id.clone(),
            CachedMedia {
                account_handle,
                media,
                source: client_source(node),
            },
        );
        report.media_entries += 1;

        if let Some(location) = author
            .and_then(|a| a.location)
            .filter(|l| !l.trim().is_empty())
        {
            self.store.put_location(id.clone(), location);
        }

        for entity in entities {
            if let Some(thumbnail) = str_at(entity, &["media_url_https"]) {
                self.store
                    .put_url_alias(normalize_asset_url(thumbnail), id.clone());
            }
        }
    }

    /// Handle already known for `id`: the cached media entry first, then content facts.
    fn cached_handle(&self, id: &ContentId) -> String {
        self.store
            .get(id)
            .map(|entry| entry.account_handle)
            .filter(|handle| handle != UNKNOWN_ACCOUNT_HANDLE)
            .or_else(|| self.store.facts(id).and_then(|facts| facts.account_handle))
            .unwrap_or_else(|| UNKNOWN_ACCOUNT_HANDLE.to_string())
    }
}
