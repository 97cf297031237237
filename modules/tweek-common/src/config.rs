use std::env;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::{Result, TweekError};

/// Option snapshot supplied by the settings collaborator.
///
/// Only `hide_ads`, `hide_who_to_follow` and `hide_topics_to_follow` affect the
/// interception pipeline; the rest are read by the presentation side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub enable_downloads: bool,
    pub enable_share_backup: bool,
    pub hide_ads: bool,
    pub hide_who_to_follow: bool,
    pub hide_topics_to_follow: bool,
    pub hide_grok: bool,
    pub hide_views: bool,
    pub hide_premium_upsells: bool,
    pub hide_explore_content: bool,
    pub blue_bird: bool,
    pub clean_nav: bool,
    pub restore_tweet_source: bool,
    pub show_account_location: bool,
    pub hide_floating_button: bool,
    pub hide_discover_more: bool,
    pub enable_video_loop: bool,
    pub enable_video_autoplay: bool,
    pub hide_top_live: bool,
    pub hide_todays_news: bool,
    pub fix_video_scrollbar: bool,
    pub video_scrollbar_color: String,
    pub hide_bookmarks_button: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enable_downloads: true,
            enable_share_backup: true,
            hide_ads: true,
            hide_who_to_follow: true,
            hide_topics_to_follow: true,
            hide_grok: true,
            hide_views: false,
            hide_premium_upsells: true,
            hide_explore_content: true,
            blue_bird: true,
            clean_nav: true,
            restore_tweet_source: true,
            show_account_location: true,
            hide_floating_button: true,
            hide_discover_more: false,
            enable_video_loop: false,
            enable_video_autoplay: false,
            hide_top_live: false,
            hide_todays_news: false,
            fix_video_scrollbar: true,
            video_scrollbar_color: "#ffffff".to_string(),
            hide_bookmarks_button: false,
        }
    }
}

impl Settings {
    /// All filtering options off. Useful as a neutral base for snapshots.
    pub fn permissive() -> Self {
        Self {
            hide_ads: false,
            hide_who_to_follow: false,
            hide_topics_to_follow: false,
            ..Self::default()
        }
    }

    /// True when either suggestion-module option is on.
    pub fn hides_suggestions(&self) -> bool {
        self.hide_who_to_follow || self.hide_topics_to_follow
    }

    /// Merge a snapshot over the current values.
    /// Unknown keys and values of the wrong type are ignored.
    pub fn merge_snapshot(&mut self, snapshot: &Map<String, Value>) {
        let mut current = match serde_json::to_value(&*self) {
            Ok(Value::Object(map)) => map,
            _ => return,
        };

        for (key, value) in snapshot {
            match current.get(key) {
                Some(existing) if same_kind(existing, value) => {
                    current.insert(key.clone(), value.clone());
                }
                Some(_) => warn!(option = key.as_str(), "Ignoring option with unexpected type"),
                None => debug!(option = key.as_str(), "Ignoring unknown option"),
            }
        }

        match serde_json::from_value(Value::Object(current)) {
            Ok(merged) => *self = merged,
            Err(e) => warn!(error = %e, "Settings snapshot could not be applied"),
        }
    }

    /// Load settings for the command-line tools.
    ///
    /// `TWEEK_SETTINGS` may hold a JSON snapshot; `TWEEK_HIDE_ADS`,
    /// `TWEEK_HIDE_WHO_TO_FOLLOW` and `TWEEK_HIDE_TOPICS_TO_FOLLOW` override
    /// the filtering options individually.
    pub fn from_env() -> Result<Self> {
        let mut settings = Self::default();

        if let Ok(raw) = env::var("TWEEK_SETTINGS") {
            match serde_json::from_str::<Value>(&raw) {
                Ok(Value::Object(snapshot)) => settings.merge_snapshot(&snapshot),
                Ok(_) => {
                    return Err(TweekError::Config(
                        "TWEEK_SETTINGS must be a JSON object".to_string(),
                    ))
                }
                Err(e) => return Err(TweekError::Config(format!("TWEEK_SETTINGS: {e}"))),
            }
        }

        if let Some(flag) = env_flag("TWEEK_HIDE_ADS")? {
            settings.hide_ads = flag;
        }
        if let Some(flag) = env_flag("TWEEK_HIDE_WHO_TO_FOLLOW")? {
            settings.hide_who_to_follow = flag;
        }
        if let Some(flag) = env_flag("TWEEK_HIDE_TOPICS_TO_FOLLOW")? {
            settings.hide_topics_to_follow = flag;
        }

        Ok(settings)
    }

    /// Log the options that change pipeline behavior.
    pub fn log_summary(&self) {
        info!(
            hide_ads = self.hide_ads,
            hide_who_to_follow = self.hide_who_to_follow,
            hide_topics_to_follow = self.hide_topics_to_follow,
            enable_downloads = self.enable_downloads,
            "Settings loaded"
        );
    }
}

fn same_kind(a: &Value, b: &Value) -> bool {
    matches!(
        (a, b),
        (Value::Bool(_), Value::Bool(_)) | (Value::String(_), Value::String(_))
    )
}

fn env_flag(key: &str) -> Result<Option<bool>> {
    match env::var(key) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(Some(true)),
            "0" | "false" | "no" | "off" => Ok(Some(false)),
            other => Err(TweekError::Config(format!("{key} must be a boolean, got {other:?}"))),
        },
        Err(_) => Ok(None),
    }
}

// ---------------------------------------------------------------------------
// SettingsHandle
// ---------------------------------------------------------------------------

/// Shared view of the latest settings snapshot with change notification.
///
/// Readers call `current()` at the time of use and never hold a snapshot
/// across an await point.
#[derive(Clone)]
pub struct SettingsHandle {
    tx: Arc<watch::Sender<Settings>>,
}

impl SettingsHandle {
    pub fn new(initial: Settings) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx: Arc::new(tx) }
    }

    pub fn current(&self) -> Settings {
        self.tx.borrow().clone()
    }

    /// Merge a snapshot delivered by the settings collaborator and notify subscribers.
    pub fn apply_snapshot(&self, snapshot: &Map<String, Value>) {
        self.tx.send_modify(|settings| settings.merge_snapshot(snapshot));
        debug!(keys = snapshot.len(), "Settings snapshot applied");
    }

    pub fn replace(&self, settings: Settings) {
        self.tx.send_replace(settings);
    }

    pub fn subscribe(&self) -> watch::Receiver<Settings> {
        self.tx.subscribe()
    }
}

impl Default for SettingsHandle {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshot(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("snapshot must be an object"),
        }
    }

    #[test]
    fn defaults_hide_ads_and_suggestions() {
        let settings = Settings::default();
        assert!(settings.hide_ads);
        assert!(settings.hides_suggestions());
        assert_eq!(settings.video_scrollbar_color, "#ffffff");
    }

    #[test]
    fn snapshot_overrides_known_options() {
        let mut settings = Settings::default();
        settings.merge_snapshot(&snapshot(json!({
            "hideAds": false,
            "videoScrollbarColor": "#1d9bf0"
        })));
        assert!(!settings.hide_ads);
        assert_eq!(settings.video_scrollbar_color, "#1d9bf0");
        assert!(settings.hide_who_to_follow);
    }

    #[test]
    fn unknown_and_mistyped_options_are_ignored() {
        let mut settings = Settings::default();
        settings.merge_snapshot(&snapshot(json!({
            "hideAds": "no",
            "showBookmarkButton": true
        })));
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn only_topics_option_still_hides_suggestions() {
        let mut settings = Settings::permissive();
        assert!(!settings.hides_suggestions());
        settings.hide_topics_to_follow = true;
        assert!(settings.hides_suggestions());
    }

    #[tokio::test]
    async fn handle_notifies_subscribers_on_change() {
        let handle = SettingsHandle::default();
        let mut rx = handle.subscribe();

        handle.apply_snapshot(&snapshot(json!({ "hideWhoToFollow": false })));

        rx.changed().await.unwrap();
        assert!(!rx.borrow().hide_who_to_follow);
        assert!(!handle.current().hide_who_to_follow);
    }
}
