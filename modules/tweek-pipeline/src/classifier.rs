// Entry classifier: decides which listing entries are dropped.
//
// Upstream entry ids embed a stable keyword amid variable suffixes
// ("promoted-tweet-1749...", "who-to-follow-1749..."), so matching is by
// case-insensitive substring.

use tweek_common::Settings;

/// Substrings of suggestion-module entry ids.
pub const SUGGESTION_PATTERNS: &[&str] = &[
    "who-to-follow",
    "whoToFollow",
    "topics-to-follow",
    "topicsToFollow",
    "communities-to-join",
    "communitiesToJoin",
    "creators-to-subscribe",
    "creatorsToSubscribe",
    "cursor-show-more-threads",
];

const PROMOTED_MARKER: &str = "promoted";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    Promoted,
    Suggestion,
}

/// Why an entry would be dropped under `settings`, if at all.
pub fn classify(entry_id: Option<&str>, settings: &Settings) -> Option<DropReason> {
    let id = entry_id.filter(|id| !id.is_empty())?.to_lowercase();

    if settings.hide_ads && id.contains(PROMOTED_MARKER) {
        return Some(DropReason::Promoted);
    }

    if settings.hides_suggestions()
        && SUGGESTION_PATTERNS
            .iter()
            .any(|pattern| id.contains(&pattern.to_lowercase()))
    {
        return Some(DropReason::Suggestion);
    }

    None
}

pub fn should_drop(entry_id: Option<&str>, settings: &Settings) -> bool {
    classify(entry_id, settings).is_some()
}
