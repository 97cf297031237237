// Transport interception: the registration point the host routes its
// network calls through.
//
// Two call shapes are supported: the open-then-send exchange (`exchange`)
// and the future-returning fetch (`fetch`). Both populate the entry cache
// before the host reads a body; only the exchange rewrites listing bodies.
// Nothing in here may fail into host code: decode errors are logged and the
// original data passes through, and pipeline work runs under `catch_unwind`.

pub mod endpoint;
pub mod exchange;
pub mod fetch;

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, OnceLock};

use serde_json::Value;
use tracing::{debug, info, warn};
use tweek_common::SettingsHandle;

use crate::filter::TimelineFilter;
use crate::store::EntryCacheStore;
use crate::walker::{PayloadWalker, WalkReport};

pub use endpoint::{classify_endpoint, EndpointClass};
pub use exchange::{InterceptedExchange, PendingRequest, RawExchange};
pub use fetch::{FetchRequest, FetchResponse, FetchTransport, InterceptingFetch};

pub struct Interceptor {
    store: Arc<EntryCacheStore>,
    settings: SettingsHandle,
}

impl Interceptor {
    pub fn new(store: Arc<EntryCacheStore>, settings: SettingsHandle) -> Self {
        Self { store, settings }
    }

    pub fn store(&self) -> &Arc<EntryCacheStore> {
        &self.store
    }

    pub fn settings(&self) -> &SettingsHandle {
        &self.settings
    }

    /// Record every fact found in a decoded payload.
    pub fn extract(&self, payload: &Value) -> WalkReport {
        let report = PayloadWalker::new(&self.store).walk(payload);
        debug!(
            nodes = report.nodes_visited,
            media = report.media_entries,
            facts = report.facts_entries,
            "Extracted payload"
        );
        report
    }

    /// Filtered copy of a decoded payload under the current settings.
    pub fn filter(&self, payload: &Value) -> Value {
        let settings = self.settings.current();
        TimelineFilter::new(&settings).filter(payload)
    }

    /// Decode, extract, filter and re-encode a listing body in one pass.
    /// `None` means the body is left as it is.
    pub fn rewrite_listing_body(&self, body: &str) -> Option<String> {
        contain("rewrite", || {
            let payload = decode(body)?;
            self.extract(&payload);
            encode(&self.filter(&payload))
        })
    }

    /// Begin an open-then-send exchange: remember the target until `send`.
    pub fn open(self: &Arc<Self>, method: &str, url: &str) -> PendingRequest {
        PendingRequest::new(Arc::clone(self), method, url)
    }

    /// Wrap the host's future-returning transport.
    pub fn wrap_fetch<T: FetchTransport>(self: &Arc<Self>, inner: T) -> InterceptingFetch<T> {
        InterceptingFetch::new(inner, Arc::clone(self))
    }
}

/// Decode a body, logging and swallowing failure.
pub(crate) fn decode(body: &str) -> Option<Value> {
    match serde_json::from_str(body) {
        Ok(value) => Some(value),
        Err(e) => {
            debug!(error = %e, "Response body is not JSON, passing through");
            None
        }
    }
}

pub(crate) fn encode(payload: &Value) -> Option<String> {
    match serde_json::to_string(payload) {
        Ok(text) => Some(text),
        Err(e) => {
            warn!(error = %e, "Filtered payload could not be encoded, passing through");
            None
        }
    }
}

/// Run one pipeline step so that not even a panic reaches the caller.
pub(crate) fn contain<T>(stage: &'static str, step: impl FnOnce() -> Option<T>) -> Option<T> {
    match catch_unwind(AssertUnwindSafe(step)) {
        Ok(out) => out,
        Err(_) => {
            warn!(stage, "Interception step panicked, passing response through");
            None
        }
    }
}

// ---------------------------------------------------------------------------
// PageContext
// ---------------------------------------------------------------------------

/// One page context: the entry cache and the interceptor installed over it.
///
/// A navigation discards the context and everything cached with it.
pub struct PageContext {
    store: Arc<EntryCacheStore>,
    settings: SettingsHandle,
    interceptor: OnceLock<Arc<Interceptor>>,
}

impl PageContext {
    pub fn new(settings: SettingsHandle) -> Self {
        Self {
            store: Arc::new(EntryCacheStore::new()),
            settings,
            interceptor: OnceLock::new(),
        }
    }

    /// Install the interceptor. Later calls return the one already installed.
    pub fn install(&self) -> Arc<Interceptor> {
        Arc::clone(self.interceptor.get_or_init(|| {
            info!("Installing response interceptor");
            Arc::new(Interceptor::new(
                Arc::clone(&self.store),
                self.settings.clone(),
            ))
        }))
    }

    pub fn interceptor(&self) -> Option<Arc<Interceptor>> {
        self.interceptor.get().cloned()
    }

    pub fn store(&self) -> &Arc<EntryCacheStore> {
        &self.store
    }

    pub fn settings(&self) -> &SettingsHandle {
        &self.settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tweek_common::Settings;

    #[test]
    fn install_is_idempotent() {
        let page = PageContext::new(SettingsHandle::default());
        assert!(page.interceptor().is_none());

        let first = page.install();
        let second = page.install();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(first.store(), page.store()));
    }

    #[test]
    fn rewrite_passes_non_json_through() {
        let page = PageContext::new(SettingsHandle::default());
        let interceptor = page.install();
        assert_eq!(interceptor.rewrite_listing_body("<html>oops</html>"), None);
        assert_eq!(page.store().stats(), Default::default());
    }

    #[test]
    fn filter_reads_settings_at_time_of_use() {
        let settings = SettingsHandle::new(Settings::permissive());
        let page = PageContext::new(settings.clone());
        let interceptor = page.install();
        let payload = serde_json::json!({ "entries": [{ "entryId": "promoted-tweet-1" }] });

        assert_eq!(interceptor.filter(&payload), payload);

        settings.replace(Settings::default());
        assert_eq!(
            interceptor.filter(&payload),
            serde_json::json!({ "entries": [] })
        );
    }

    #[test]
    fn contain_absorbs_panics() {
        let out: Option<()> = contain("test", || panic!("boom"));
        assert!(out.is_none());
    }
}
