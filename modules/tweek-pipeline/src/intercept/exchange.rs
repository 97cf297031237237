// Open-then-send exchange interception.
//
// The host configures a request, sends it, and later reads the response body
// whenever it likes, possibly several times. For listing endpoints the body
// read is a memoized transform: the first read after completion decodes,
// extracts, filters and re-encodes once; every later read returns the same
// text. Extraction runs at most once per response.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use serde_json::Value;
use tracing::trace;

use super::endpoint::{classify_endpoint, EndpointClass};
use super::{contain, decode, encode, Interceptor};

const JSON_CONTENT_TYPE: &str = "application/json";

/// The host's own exchange primitive, as observed by the interceptor.
pub trait RawExchange: Send + Sync {
    /// True once the response has fully arrived.
    fn is_done(&self) -> bool;

    fn response_header(&self, name: &str) -> Option<String>;

    /// Raw response text, if any has arrived.
    fn response_text(&self) -> Option<String>;
}

/// A request that has been opened but not yet sent.
pub struct PendingRequest {
    interceptor: Arc<Interceptor>,
    method: String,
    url: String,
}

impl PendingRequest {
    pub(crate) fn new(interceptor: Arc<Interceptor>, method: &str, url: &str) -> Self {
        Self {
            interceptor,
            method: method.to_string(),
            url: url.to_string(),
        }
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Hand over the host's exchange once it has been sent.
    pub fn send<E: RawExchange>(self, inner: E) -> InterceptedExchange<E> {
        let class = classify_endpoint(&self.url);
        trace!(method = self.method.as_str(), url = self.url.as_str(), ?class, "Exchange sent");
        InterceptedExchange {
            inner,
            url: self.url,
            class,
            interceptor: self.interceptor,
            extracted: AtomicBool::new(false),
            rewritten: OnceLock::new(),
        }
    }
}

pub struct InterceptedExchange<E> {
    inner: E,
    url: String,
    class: EndpointClass,
    interceptor: Arc<Interceptor>,
    extracted: AtomicBool,
    rewritten: OnceLock<Option<String>>,
}

impl<E: RawExchange> InterceptedExchange<E> {
    pub fn inner(&self) -> &E {
        &self.inner
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn endpoint_class(&self) -> EndpointClass {
        self.class
    }

    /// Run the interceptor's completion hook, then the host's own handler.
    pub fn on_ready_state_change<F>(&self, host_handler: F)
    where
        F: FnOnce(&Self),
    {
        self.ready_state_changed();
        host_handler(self);
    }

    /// Completion hook for hosts without a handler of their own.
    pub fn ready_state_changed(&self) {
        if self.class == EndpointClass::Foreign || !self.inner.is_done() {
            return;
        }

        let is_json = self
            .inner
            .response_header("content-type")
            .is_some_and(|ct| ct.contains(JSON_CONTENT_TYPE));
        if !is_json {
            return;
        }

        match self.class {
            EndpointClass::Listing => {
                self.rewritten_body();
            }
            _ => {
                let Some(text) = self.inner.response_text().filter(|t| !t.is_empty()) else {
                    return;
                };
                contain("extract", || {
                    let payload = decode(&text)?;
                    self.extract_once(&payload);
                    Some(())
                });
            }
        }
    }

    /// Response text as the host sees it.
    ///
    /// Listing responses come back filtered once complete; anything that
    /// cannot be decoded is returned exactly as received.
    pub fn response_text(&self) -> Option<String> {
        if self.class == EndpointClass::Listing && self.inner.is_done() {
            if let Some(rewritten) = self.rewritten_body() {
                return Some(rewritten.to_string());
            }
        }
        self.inner.response_text()
    }

    fn rewritten_body(&self) -> Option<&str> {
        self.rewritten
            .get_or_init(|| {
                let original = self.inner.response_text().filter(|t| !t.is_empty())?;
                contain("rewrite", || {
                    let payload = decode(&original)?;
                    self.extract_once(&payload);
                    encode(&self.interceptor.filter(&payload))
                })
            })
            .as_deref()
    }

    fn extract_once(&self, payload: &Value) {
        if self.extracted.swap(true, Ordering::AcqRel) {
            return;
        }
        self.interceptor.extract(payload);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intercept::PageContext;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;
    use tweek_common::{ContentId, SettingsHandle};

    struct CannedExchange {
        done: bool,
        content_type: &'static str,
        body: String,
        reads: AtomicUsize,
    }

    impl CannedExchange {
        fn json(body: serde_json::Value) -> Self {
            Self {
                done: true,
                content_type: "application/json; charset=utf-8",
                body: body.to_string(),
                reads: AtomicUsize::new(0),
            }
        }
    }

    impl RawExchange for CannedExchange {
        fn is_done(&self) -> bool {
            self.done
        }

        fn response_header(&self, name: &str) -> Option<String> {
            (name == "content-type").then(|| self.content_type.to_string())
        }

        fn response_text(&self) -> Option<String> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            Some(self.body.clone())
        }
    }

    fn listing_body() -> serde_json::Value {
        json!({ "data": { "instructions": [{ "entries": [
            { "entryId": "promoted-tweet-1", "content": { "tweet": {
                "rest_id": "1",
                "legacy": { "extended_entities": { "media": [
                    { "type": "photo", "media_url_https": "https://pbs.twimg.com/media/ad.jpg" }
                ]}}
            }}},
            { "entryId": "tweet-2", "content": { "tweet": {
                "rest_id": "2",
                "legacy": { "extended_entities": { "media": [
                    { "type": "photo", "media_url_https": "https://pbs.twimg.com/media/ok.jpg" }
                ]}}
            }}}
        ]}]}})
    }

    const LISTING_URL: &str = "https://x.com/i/api/graphql/abc/HomeTimeline?variables=%7B%7D";

    #[test]
    fn listing_body_is_filtered_and_memoized() {
        let page = PageContext::new(SettingsHandle::default());
        let exchange = page
            .install()
            .open("GET", LISTING_URL)
            .send(CannedExchange::json(listing_body()));

        let mut seen = None;
        exchange.on_ready_state_change(|x| seen = x.response_text());
        let seen = seen.unwrap();

        let parsed: serde_json::Value = serde_json::from_str(&seen).unwrap();
        let entries = parsed["data"]["instructions"][0]["entries"].as_array().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0]["entryId"], "tweet-2");

        assert_eq!(exchange.response_text().unwrap(), seen);
        assert_eq!(exchange.inner().reads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dropped_entries_are_still_extracted() {
        // Extraction sees the raw payload; only the host's copy is filtered.
        let page = PageContext::new(SettingsHandle::default());
        let exchange = page
            .install()
            .open("GET", LISTING_URL)
            .send(CannedExchange::json(listing_body()));
        exchange.ready_state_changed();

        assert!(page.store().get(&ContentId::new("2").unwrap()).is_some());
        assert!(page.store().get(&ContentId::new("1").unwrap()).is_some());
    }

    #[test]
    fn non_listing_api_response_is_extracted_not_rewritten() {
        let page = PageContext::new(SettingsHandle::default());
        let body = json!({ "entries": [{ "entryId": "promoted-tweet-1" }], "id_str": "5", "source": "Web" });
        let exchange = page
            .install()
            .open("GET", "https://x.com/i/api/graphql/abc/UserByScreenName")
            .send(CannedExchange::json(body.clone()));
        exchange.ready_state_changed();

        assert_eq!(exchange.response_text().unwrap(), body.to_string());
        assert!(page.store().facts(&ContentId::new("5").unwrap()).is_some());
    }

    #[test]
    fn non_json_listing_body_passes_through() {
        let page = PageContext::new(SettingsHandle::default());
        let exchange = page.install().open("GET", LISTING_URL).send(CannedExchange {
            done: true,
            content_type: "text/html",
            body: "<html>rate limited</html>".to_string(),
            reads: AtomicUsize::new(0),
        });

        exchange.ready_state_changed();
        assert_eq!(exchange.response_text().unwrap(), "<html>rate limited</html>");
        assert_eq!(page.store().stats(), Default::default());
    }

    #[test]
    fn incomplete_exchange_is_left_alone() {
        let page = PageContext::new(SettingsHandle::default());
        let mut raw = CannedExchange::json(listing_body());
        raw.done = false;
        let exchange = page.install().open("GET", LISTING_URL).send(raw);

        exchange.ready_state_changed();
        assert_eq!(exchange.response_text().unwrap(), listing_body().to_string());
        assert_eq!(page.store().stats(), Default::default());
    }

    #[test]
    fn foreign_urls_are_untouched() {
        let page = PageContext::new(SettingsHandle::default());
        let exchange = page
            .install()
            .open("GET", "https://example.com/HomeTimeline")
            .send(CannedExchange::json(listing_body()));

        exchange.ready_state_changed();
        assert_eq!(exchange.endpoint_class(), EndpointClass::Foreign);
        assert_eq!(exchange.response_text().unwrap(), listing_body().to_string());
        assert_eq!(page.store().stats(), Default::default());
    }
}
