// Feeds captured responses through an installed page context, the same way
// the host's exchange primitive would.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;
use tweek_pipeline::{PageContext, RawExchange};

/// A finished exchange whose body was captured to disk.
pub struct CapturedExchange {
    content_type: String,
    body: String,
}

impl CapturedExchange {
    pub fn new(content_type: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            content_type: content_type.into(),
            body: body.into(),
        }
    }

    pub fn load(path: &Path, content_type: &str) -> Result<Self> {
        let body = std::fs::read_to_string(path)
            .with_context(|| format!("reading captured response {}", path.display()))?;
        Ok(Self::new(content_type, body))
    }
}

impl RawExchange for CapturedExchange {
    fn is_done(&self) -> bool {
        true
    }

    fn response_header(&self, name: &str) -> Option<String> {
        name.eq_ignore_ascii_case("content-type")
            .then(|| self.content_type.clone())
    }

    fn response_text(&self) -> Option<String> {
        Some(self.body.clone())
    }
}

/// Replay one captured body as a GET to `url`; returns the text the host would read.
pub fn replay(page: &PageContext, url: &str, exchange: CapturedExchange) -> Option<String> {
    let exchange = page.install().open("GET", url).send(exchange);
    exchange.ready_state_changed();
    exchange.response_text()
}

/// Replay every file in order against the same page context.
pub fn replay_all(
    page: &PageContext,
    url: &str,
    files: &[PathBuf],
    content_type: &str,
) -> Result<()> {
    for path in files {
        let exchange = CapturedExchange::load(path, content_type)?;
        replay(page, url, exchange);
    }
    let stats = page.store().stats();
    info!(files = files.len(), ?stats, "Replayed captured responses");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tweek_common::SettingsHandle;

    const HOME: &str = "https://x.com/i/api/graphql/abc/HomeTimeline";

    fn timeline() -> String {
        serde_json::json!({ "data": { "instructions": [{ "entries": [
            { "entryId": "tweet-1", "content": { "itemContent": { "tweet_results": { "result": {
                "rest_id": "1",
                "core": { "user_results": { "result": { "legacy": { "screen_name": "a" }}}},
                "legacy": { "extended_entities": { "media": [
                    { "type": "photo", "media_url_https": "https://pbs.twimg.com/media/x.jpg" }
                ]}}
            }}}}},
            { "entryId": "promoted-tweet-2" }
        ]}]}})
        .to_string()
    }

    #[test]
    fn replay_filters_listing_and_fills_store() {
        let page = PageContext::new(SettingsHandle::default());
        let text = replay(&page, HOME, CapturedExchange::new("application/json", timeline())).unwrap();

        assert!(!text.contains("promoted-tweet-2"));
        assert!(text.contains("tweet-1"));
        assert_eq!(page.store().media_ids().len(), 1);
    }

    #[test]
    fn replay_all_reads_files() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(timeline().as_bytes()).unwrap();

        let page = PageContext::new(SettingsHandle::default());
        replay_all(&page, HOME, &[file.path().to_path_buf()], "application/json").unwrap();
        assert_eq!(page.store().stats().media, 1);

        let missing = replay_all(&page, HOME, &[PathBuf::from("/nonexistent/capture.json")], "application/json");
        assert!(missing.is_err());
    }
}
