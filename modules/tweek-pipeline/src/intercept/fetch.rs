// Future-returning fetch interception.
//
// Response bodies are single-consume, so facts are read from a clone and the
// original response reaches the host unread. This path extracts only; it
// never rewrites the body the host sees.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;
use tweek_common::{Result, TweekError};

use super::endpoint::is_api_host;
use super::{contain, Interceptor};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub method: String,
    pub url: String,
    pub body: Option<String>,
}

impl FetchRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: "GET".to_string(),
            url: url.into(),
            body: None,
        }
    }
}

/// A response whose body can be read once.
#[derive(Debug)]
pub struct FetchResponse {
    status: u16,
    url: String,
    headers: Vec<(String, String)>,
    body: Mutex<Option<String>>,
}

impl FetchResponse {
    pub fn new(status: u16, url: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            status,
            url: url.into(),
            headers: Vec::new(),
            body: Mutex::new(Some(body.into())),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn is_body_used(&self) -> bool {
        self.body
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    /// Independent copy with its own unread body. Fails once the body is consumed.
    pub fn try_clone(&self) -> Result<FetchResponse> {
        let body = self
            .body
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or_else(|| TweekError::Transport("response body already used".to_string()))?;
        Ok(FetchResponse {
            status: self.status,
            url: self.url.clone(),
            headers: self.headers.clone(),
            body: Mutex::new(Some(body)),
        })
    }

    /// Consume the body as text.
    pub async fn text(&self) -> Result<String> {
        self.body
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or_else(|| TweekError::Transport("response body already used".to_string()))
    }

    /// Consume the body and decode it as JSON.
    pub async fn json(&self) -> Result<Value> {
        let text = self.text().await?;
        Ok(serde_json::from_str(&text)?)
    }
}

/// The host's future-returning network primitive.
#[async_trait]
pub trait FetchTransport: Send + Sync {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse>;
}

/// Transport middleware that feeds API responses to the extractor.
pub struct InterceptingFetch<T> {
    inner: T,
    interceptor: Arc<Interceptor>,
}

impl<T: FetchTransport> InterceptingFetch<T> {
    pub(crate) fn new(inner: T, interceptor: Arc<Interceptor>) -> Self {
        Self { inner, interceptor }
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }

    async fn observe(&self, response: &FetchResponse) {
        let copy = match response.try_clone() {
            Ok(copy) => copy,
            Err(e) => {
                debug!(error = %e, "Response not cloneable, skipping extraction");
                return;
            }
        };
        let payload = match copy.json().await {
            Ok(payload) => payload,
            Err(e) => {
                debug!(url = response.url(), error = %e, "Response body is not JSON, skipping extraction");
                return;
            }
        };
        contain("extract", || {
            self.interceptor.extract(&payload);
            Some(())
        });
    }
}

#[async_trait]
impl<T: FetchTransport> FetchTransport for InterceptingFetch<T> {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse> {
        let eligible = is_api_host(&request.url);
        let response = self.inner.fetch(request).await?;
        if eligible {
            self.observe(&response).await;
        }
        Ok(response)
    }
}
