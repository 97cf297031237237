// Hands planned downloads to the collaborator that saves files.
//
// Production wires in an HTTP dispatcher; tests use RecordingDispatcher.
// When dispatch fails every asset is opened directly instead.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use tweek_common::DownloadRequest;

use crate::error::{DispatchError, Result};
use crate::naming::{suggested_base_name, suggested_filenames};

/// Reply from the download collaborator. A missing or unreadable reply counts as accepted.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DispatchAck {
    #[serde(default = "accepted")]
    pub success: bool,
}

fn accepted() -> bool {
    true
}

impl Default for DispatchAck {
    fn default() -> Self {
        Self { success: true }
    }
}

/// Wire shape of one dispatched request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadEnvelope<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub data: &'a DownloadRequest,
    pub suggested_base_name: String,
    pub filenames: Vec<String>,
}

impl<'a> DownloadEnvelope<'a> {
    pub fn new(request: &'a DownloadRequest) -> Self {
        Self {
            kind: "DOWNLOAD",
            data: request,
            suggested_base_name: suggested_base_name(request),
            filenames: suggested_filenames(request),
        }
    }
}

#[async_trait]
pub trait DownloadDispatcher: Send + Sync {
    async fn dispatch(&self, request: &DownloadRequest) -> Result<DispatchAck>;
}

/// Opens an asset URL outside the download collaborator. Fire and forget.
pub trait AssetOpener: Send + Sync {
    fn open(&self, url: &str);
}

// ---------------------------------------------------------------------------
// HttpDispatcher (production)
// ---------------------------------------------------------------------------

pub struct HttpDispatcher {
    http: reqwest::Client,
    endpoint: String,
}

impl HttpDispatcher {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl DownloadDispatcher for HttpDispatcher {
    async fn dispatch(&self, request: &DownloadRequest) -> Result<DispatchAck> {
        let envelope = DownloadEnvelope::new(request);

        info!(
            endpoint = self.endpoint.as_str(),
            content_id = request.content_id.as_str(),
            file_count = envelope.filenames.len(),
            "Dispatching download"
        );

        let resp = self
            .http
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .json(&envelope)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    DispatchError::Unreachable(e.to_string())
                } else {
                    DispatchError::from(e)
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(DispatchError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = resp.text().await?;
        let ack = serde_json::from_str::<DispatchAck>(&body).unwrap_or_default();
        if !ack.success {
            return Err(DispatchError::Rejected(request.content_id.clone()));
        }
        Ok(ack)
    }
}

// ---------------------------------------------------------------------------
// Recording doubles (for tests)
// ---------------------------------------------------------------------------

/// Records `dispatch()` calls; optionally fails every call.
#[derive(Default)]
pub struct RecordingDispatcher {
    calls: Mutex<Vec<DownloadRequest>>,
    fail_with: Option<String>,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail_with: Some(reason.into()),
        }
    }

    pub fn calls(&self) -> Vec<DownloadRequest> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl DownloadDispatcher for RecordingDispatcher {
    async fn dispatch(&self, request: &DownloadRequest) -> Result<DispatchAck> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());
        match &self.fail_with {
            Some(reason) => Err(DispatchError::Unreachable(reason.clone())),
            None => Ok(DispatchAck::default()),
        }
    }
}

#[derive(Default)]
pub struct RecordingOpener {
    opened: Mutex<Vec<String>>,
}

impl RecordingOpener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn opened(&self) -> Vec<String> {
        self.opened
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl AssetOpener for RecordingOpener {
    fn open(&self, url: &str) {
        self.opened
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(url.to_string());
    }
}

// ---------------------------------------------------------------------------
// Delivery
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Dispatched,
    OpenedDirectly { count: usize },
    /// The request carried no media.
    Skipped,
}

/// Dispatch `request`, opening each asset directly if the dispatcher fails.
pub async fn deliver(
    request: &DownloadRequest,
    dispatcher: &dyn DownloadDispatcher,
    opener: &dyn AssetOpener,
) -> Delivery {
    if request.media.is_empty() {
        warn!(content_id = request.content_id.as_str(), "No media to download");
        return Delivery::Skipped;
    }

    match dispatcher.dispatch(request).await {
        Ok(_) => Delivery::Dispatched,
        Err(e) => {
            warn!(
                content_id = request.content_id.as_str(),
                error = %e,
                "Dispatch failed, opening assets directly"
            );
            for media in &request.media {
                opener.open(&media.source_url);
            }
            Delivery::OpenedDirectly {
                count: request.media.len(),
            }
        }
    }
}
