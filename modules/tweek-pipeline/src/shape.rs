// Structural predicates over decoded payload nodes.
//
// Upstream payloads come in several versions (legacy REST, GraphQL with a
// `legacy` sub-object, embedded `core.user_results`). Every probe here is
// optional: a missing field means "not this shape", never an error.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tweek_common::ContentId;

/// Inner text of the anchor markup upstream uses for the client source.
static SOURCE_TEXT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r">([^<]+)<").expect("valid regex"));

/// Follow a chain of object keys.
pub(crate) fn path<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().try_fold(value, |node, key| node.as_object()?.get(*key))
}

/// A non-empty string at the end of a key chain.
pub(crate) fn str_at<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a str> {
    path(value, keys)?.as_str().filter(|s| !s.is_empty())
}

fn first_id(node: &Value, candidates: &[&[&str]]) -> Option<ContentId> {
    candidates
        .iter()
        .find_map(|keys| str_at(node, keys))
        .and_then(ContentId::new)
}

/// Content id of a media-bearing node: canonical id, alternate id,
/// legacy-nested id, then the conversation reference.
pub(crate) fn media_content_id(node: &Value) -> Option<ContentId> {
    first_id(
        node,
        &[
            &["id_str"],
            &["rest_id"],
            &["legacy", "id_str"],
            &["conversation_id_str"],
        ],
    )
}

/// Content id used for facts. No conversation fallback: a reply's
/// conversation id names a different tweet.
pub(crate) fn facts_content_id(node: &Value) -> Option<ContentId> {
    first_id(node, &[&["rest_id"], &["id_str"], &["legacy", "id_str"]])
}

/// The media-entities list, under either nesting. Present but empty counts as absent.
pub(crate) fn media_entities(node: &Value) -> Option<&Vec<Value>> {
    let list = path(node, &["extended_entities", "media"])
        .or_else(|| path(node, &["legacy", "extended_entities", "media"]))?
        .as_array()?;
    if list.is_empty() {
        None
    } else {
        Some(list)
    }
}

/// Authoring-account fields found on a node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct AccountRecord<'a> {
    pub handle: Option<&'a str>,
    pub location: Option<&'a str>,
    pub display_name: Option<&'a str>,
}

impl<'a> AccountRecord<'a> {
    fn from_user(user: &'a Value) -> Self {
        Self {
            handle: str_at(user, &["screen_name"]),
            location: str_at(user, &["location"]),
            display_name: str_at(user, &["name"]),
        }
    }
}

/// Account record as seen from a media-bearing node. Only a record that
/// names a handle counts; the three nestings are tried in order.
pub(crate) fn media_author(node: &Value) -> Option<AccountRecord<'_>> {
    [
        &["core", "user_results", "result", "legacy"][..],
        &["user"][..],
        &["legacy", "user"][..],
    ]
    .iter()
    .filter_map(|keys| path(node, keys))
    .map(AccountRecord::from_user)
    .find(|record| record.handle.is_some())
}

/// Account record as seen from any content node. An embedded user result
/// shadows the flat `user` object even when it has no legacy payload.
pub(crate) fn facts_author(node: &Value) -> Option<AccountRecord<'_>> {
    if let Some(result) = path(node, &["core", "user_results", "result"]) {
        return path(result, &["legacy"]).map(AccountRecord::from_user);
    }
    path(node, &["user"])
        .filter(|user| user.is_object())
        .map(AccountRecord::from_user)
}

/// Client source label, unwrapped from its anchor markup when possible.
pub(crate) fn client_source(node: &Value) -> Option<String> {
    let raw = str_at(node, &["source"]).or_else(|| str_at(node, &["legacy", "source"]))?;
    Some(source_text(raw))
}

/// Text between the first `>` and the following `<`, or the raw string.
pub fn source_text(raw: &str) -> String {
    SOURCE_TEXT_RE
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| raw.to_string())
}

/// Quoted originals embedded in a node, under either nesting.
pub(crate) fn quoted_references(node: &Value) -> impl Iterator<Item = &Value> {
    [
        path(node, &["quoted_status_result", "result"]),
        path(node, &["legacy", "quoted_status"]),
    ]
    .into_iter()
    .flatten()
    .filter(|quoted| quoted.is_object())
}

/// Listing entry id: `entryId`, or `entry.entryId` for wrapped entries.
pub(crate) fn entry_id(item: &Value) -> Option<&str> {
    str_at(item, &["entryId"]).or_else(|| str_at(item, &["entry", "entryId"]))
}
