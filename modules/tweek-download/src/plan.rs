// Turns a located content id into something that can be downloaded.

use tracing::{debug, info};
use tweek_common::{ContentId, DownloadRequest, MediaDescriptor, MediaKind, Settings};
use tweek_pipeline::EntryCacheStore;

use crate::locate::{status_id, RenderedArticle, RenderedPage};

pub const NOT_CAPTURED_MESSAGE: &str =
    "Media not captured yet. Scroll the tweet out of view and back, then try again.";

/// Handle used when media is taken from the rendered page instead of the cache.
pub const RENDERED_ACCOUNT_HANDLE: &str = "twitter";

const ORIGINAL_JPG_QUERY: &str = "?format=jpg&name=orig";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadPlan {
    /// Built from cached media, including a quoted item's media when present.
    Cached(DownloadRequest),
    /// Built from what the page renders; nothing was cached for the id.
    Rendered(DownloadRequest),
    /// Nothing to download yet.
    NotCaptured { message: String },
    /// Downloads are switched off.
    Disabled,
}

impl DownloadPlan {
    pub fn request(&self) -> Option<&DownloadRequest> {
        match self {
            DownloadPlan::Cached(request) | DownloadPlan::Rendered(request) => Some(request),
            DownloadPlan::NotCaptured { .. } | DownloadPlan::Disabled => None,
        }
    }
}

pub struct DownloadPlanner<'a> {
    store: &'a EntryCacheStore,
    settings: &'a Settings,
}

impl<'a> DownloadPlanner<'a> {
    pub fn new(store: &'a EntryCacheStore, settings: &'a Settings) -> Self {
        Self { store, settings }
    }

    pub fn plan(&self, id: &ContentId, page: &RenderedPage) -> DownloadPlan {
        if !self.settings.enable_downloads {
            debug!(content_id = %id, "Downloads disabled");
            return DownloadPlan::Disabled;
        }

        let article = page.article_for(id);

        if let Some(request) = self.from_cache(id, article) {
            info!(
                content_id = %id,
                media = request.media.len(),
                "Planned download from cache"
            );
            return DownloadPlan::Cached(request);
        }

        if let Some(request) = article.and_then(|a| rendered_request(id, a)) {
            info!(
                content_id = %id,
                media = request.media.len(),
                "Planned download from rendered media"
            );
            return DownloadPlan::Rendered(request);
        }

        debug!(content_id = %id, "No media captured");
        DownloadPlan::NotCaptured {
            message: NOT_CAPTURED_MESSAGE.to_string(),
        }
    }

    fn from_cache(&self, id: &ContentId, article: Option<&RenderedArticle>) -> Option<DownloadRequest> {
        let cached = self.store.get(id);

        let quoted = article
            .into_iter()
            .flat_map(|a| a.quote_links.iter())
            .filter_map(|link| status_id(link))
            .filter(|quoted_id| quoted_id != id)
            .find_map(|quoted_id| self.store.get(&quoted_id));

        let (account_handle, mut media) = match (&cached, &quoted) {
            (Some(own), _) => (own.account_handle.clone(), own.media.clone()),
            (None, Some(quote)) => (quote.account_handle.clone(), Vec::new()),
            (None, None) => return None,
        };

        if let Some(quote) = quoted {
            for item in quote.media {
                if !media.iter().any(|m| m.source_url == item.source_url) {
                    media.push(item);
                }
            }
        }

        if media.is_empty() {
            return None;
        }

        Some(DownloadRequest {
            content_id: id.to_string(),
            account_handle,
            media,
        })
    }
}

fn rendered_request(id: &ContentId, article: &RenderedArticle) -> Option<DownloadRequest> {
    let images = article.image_sources.iter().map(|src| {
        let base = src.split('?').next().unwrap_or(src);
        let url = format!("{base}{ORIGINAL_JPG_QUERY}");
        MediaDescriptor {
            kind: MediaKind::Photo,
            thumbnail_url: url.clone(),
            source_url: url,
        }
    });

    let videos = article
        .video_sources
        .iter()
        .filter(|src| !src.starts_with("blob:"))
        .map(|src| MediaDescriptor {
            kind: MediaKind::Video,
            source_url: src.clone(),
            thumbnail_url: src.clone(),
        });

    let media: Vec<MediaDescriptor> = images.chain(videos).collect();
    if media.is_empty() {
        return None;
    }

    Some(DownloadRequest {
        content_id: id.to_string(),
        account_handle: RENDERED_ACCOUNT_HANDLE.to_string(),
        media,
    })
}
