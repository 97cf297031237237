// Payload walker, filtering mode.
//
// Produces a copy of the payload with dropped listing entries removed.
// Entries are classified on their raw form before any recursion, so a
// dropped entry's own content is never walked.

use serde_json::{Map, Value};
use tracing::debug;
use tweek_common::Settings;

use crate::classifier::classify;
use crate::shape::entry_id;

/// Subtrees deeper than this are copied unchanged.
pub const FILTER_DEPTH_LIMIT: usize = 30;

pub struct TimelineFilter<'a> {
    settings: &'a Settings,
    max_depth: usize,
}

impl<'a> TimelineFilter<'a> {
    pub fn new(settings: &'a Settings) -> Self {
        Self {
            settings,
            max_depth: FILTER_DEPTH_LIMIT,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Filtered deep copy of `payload`.
    pub fn filter(&self, payload: &Value) -> Value {
        self.filter_at(payload, 0)
    }

    fn filter_at(&self, node: &Value, depth: usize) -> Value {
        if depth > self.max_depth {
            return node.clone();
        }

        match node {
            Value::Array(items) => Value::Array(self.filter_entries(items, depth)),
            Value::Object(map) => {
                let mut out = Map::with_capacity(map.len());
                for (key, value) in map {
                    let filtered = match (key.as_str(), value) {
                        ("entries", Value::Array(entries)) => {
                            Value::Array(self.filter_entries(entries, depth))
                        }
                        ("instructions", Value::Array(instructions)) => Value::Array(
                            instructions
                                .iter()
                                .map(|instruction| self.filter_instruction(instruction, depth))
                                .collect(),
                        ),
                        _ => self.filter_at(value, depth + 1),
                    };
                    out.insert(key.clone(), filtered);
                }
                Value::Object(out)
            }
            scalar => scalar.clone(),
        }
    }

    /// Drop classified entries, then recurse into the survivors.
    fn filter_entries(&self, entries: &[Value], depth: usize) -> Vec<Value> {
        entries
            .iter()
            .filter(|entry| self.keep(entry))
            .map(|entry| self.filter_at(entry, depth + 1))
            .collect()
    }

    /// An instruction carrying `entries` has that list filtered in place;
    /// its other fields are copied as they are.
    fn filter_instruction(&self, instruction: &Value, depth: usize) -> Value {
        if let Some(Value::Array(entries)) = instruction.get("entries") {
            let mut copy = instruction.clone();
            copy["entries"] = Value::Array(self.filter_entries(entries, depth));
            return copy;
        }
        self.filter_at(instruction, depth + 1)
    }

    fn keep(&self, entry: &Value) -> bool {
        let id = entry_id(entry);
        match classify(id, self.settings) {
            Some(reason) => {
                debug!(entry_id = id.unwrap_or_default(), ?reason, "Dropped listing entry");
                false
            }
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn timeline() -> Value {
        json!({
            "data": { "home": { "home_timeline_urt": { "instructions": [
                { "type": "TimelineClearCache" },
                { "type": "TimelineAddEntries", "entries": [
                    { "entryId": "tweet-1", "content": { "entryType": "TimelineTimelineItem" } },
                    { "entryId": "promoted-tweet-2", "content": {} },
                    { "entryId": "who-to-follow-3", "content": {} },
                    { "entryId": "cursor-bottom-4", "content": { "value": "abc" } }
                ]}
            ]}}}
        })
    }

    fn entry_ids(entries: &Value) -> Vec<&str> {
        entries
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["entryId"].as_str().unwrap())
            .collect()
    }

    #[test]
    fn instruction_entries_are_filtered() {
        let settings = Settings::default();
        let filtered = TimelineFilter::new(&settings).filter(&timeline());

        let instructions = &filtered["data"]["home"]["home_timeline_urt"]["instructions"];
        assert_eq!(instructions[0], json!({ "type": "TimelineClearCache" }));
        assert_eq!(
            entry_ids(&instructions[1]["entries"]),
            vec!["tweet-1", "cursor-bottom-4"]
        );
    }

    #[test]
    fn permissive_settings_leave_payload_unchanged() {
        let settings = Settings::permissive();
        let payload = timeline();
        assert_eq!(TimelineFilter::new(&settings).filter(&payload), payload);
    }

    #[test]
    fn nested_module_items_are_filtered_in_bare_arrays() {
        let settings = Settings::default();
        let payload = json!({ "content": { "items": [
            { "entryId": "profile-conversation-1-tweet-9" },
            { "entry": { "entryId": "promoted-tweet-10" } },
            "scalar survives"
        ]}});

        let filtered = TimelineFilter::new(&settings).filter(&payload);
        let items = filtered["content"]["items"].as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1], json!("scalar survives"));
    }

    #[test]
    fn filtering_is_idempotent() {
        let settings = Settings::default();
        let filter = TimelineFilter::new(&settings);
        let once = filter.filter(&timeline());
        assert_eq!(filter.filter(&once), once);
    }

    #[test]
    fn key_order_is_preserved() {
        let settings = Settings::default();
        let payload: Value =
            serde_json::from_str(r#"{"zeta":1,"alpha":{"entries":[]},"mid":[true]}"#).unwrap();
        let filtered = TimelineFilter::new(&settings).filter(&payload);
        assert_eq!(
            serde_json::to_string(&filtered).unwrap(),
            r#"{"zeta":1,"alpha":{"entries":[]},"mid":[true]}"#
        );
    }

    #[test]
    fn deep_subtrees_are_copied_unchanged() {
        let settings = Settings::default();
        let mut nested = json!({ "entries": [{ "entryId": "promoted-tweet-1" }] });
        for _ in 0..35 {
            nested = json!({ "wrap": nested });
        }

        let filtered = TimelineFilter::new(&settings).filter(&nested);
        assert_eq!(filtered, nested);
    }
}
