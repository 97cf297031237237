// Content-id discovery for download requests.
//
// The presentation side hands over a snapshot of what is rendered; ids are
// recovered from it by progressively weaker strategies until one succeeds.

use std::sync::{LazyLock, Mutex, PoisonError};

use regex::Regex;
use tracing::debug;
use tweek_common::ContentId;
use tweek_pipeline::{normalize_asset_url, EntryCacheStore};

static STATUS_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"status/(\d+)").expect("valid regex"));

/// One rendered content item (an `article`), reduced to the links and media it shows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedArticle {
    /// Every status link in the item, in document order.
    pub status_links: Vec<String>,
    /// The status link wrapping the item's timestamp, when present.
    pub time_link: Option<String>,
    /// Status links inside an embedded quote card.
    pub quote_links: Vec<String>,
    /// `src` of every rendered image.
    pub image_sources: Vec<String>,
    /// `src` of every rendered video element.
    pub video_sources: Vec<String>,
}

impl RenderedArticle {
    /// Id of the item this article renders: the timestamp link, else the last status link.
    pub fn main_id(&self) -> Option<ContentId> {
        self.time_link
            .as_deref()
            .and_then(status_id)
            .or_else(|| self.status_links.iter().rev().find_map(|l| status_id(l)))
    }

    /// True when any status link in the article points at `id`.
    pub fn links_to(&self, id: &ContentId) -> bool {
        self.status_links
            .iter()
            .any(|link| status_id(link).as_ref() == Some(id))
    }
}

/// Snapshot of the rendered page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedPage {
    pub url: String,
    pub articles: Vec<RenderedArticle>,
}

impl RenderedPage {
    pub fn article_for(&self, id: &ContentId) -> Option<&RenderedArticle> {
        self.articles.iter().find(|article| article.links_to(id))
    }
}

/// Content id from any URL or href containing `status/<digits>`.
pub fn status_id(link: &str) -> Option<ContentId> {
    STATUS_ID_RE
        .captures(link)
        .and_then(|caps| caps.get(1))
        .and_then(|m| ContentId::new(m.as_str()))
}

/// Asset URL as stored in the reverse index, recovered from a rendered image `src`.
///
/// Rendered sources carry the format as a query parameter
/// (`.../media/abc?format=jpg&name=small`); the index is keyed by the
/// extension form (`.../media/abc.jpg`).
pub fn asset_key_from_rendered(src: &str) -> Option<String> {
    let mut parsed = url::Url::parse(src).ok()?;
    let format = parsed
        .query_pairs()
        .find(|(key, _)| key == "format")
        .map(|(_, value)| value.into_owned());
    parsed.set_query(None);
    parsed.set_fragment(None);

    let mut key = parsed.to_string();
    if let Some(format) = format {
        let last_segment = key.rsplit('/').next().unwrap_or_default();
        if !last_segment.contains('.') {
            key = format!("{key}.{format}");
        }
    }
    Some(normalize_asset_url(&key))
}

// ---------------------------------------------------------------------------
// InteractionTracker
// ---------------------------------------------------------------------------

/// Remembers the item whose share control was clicked last.
#[derive(Default)]
pub struct InteractionTracker {
    last: Mutex<Option<ContentId>>,
}

impl InteractionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a share click inside `article`. Returns the id recorded, if any.
    pub fn record_share_click(&self, article: &RenderedArticle) -> Option<ContentId> {
        let id = article.main_id()?;
        debug!(content_id = %id, "Share clicked");
        *self.last.lock().unwrap_or_else(PoisonError::into_inner) = Some(id.clone());
        Some(id)
    }

    pub fn last(&self) -> Option<ContentId> {
        self.last
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

// ---------------------------------------------------------------------------
// Locator
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocatedBy {
    /// The page URL names a status.
    PageUrl,
    /// The user last interacted with this item.
    LastInteraction,
    /// A rendered item resolved to cached media.
    CacheScan,
    /// Any rendered item at all.
    LiveScan,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Located {
    pub id: ContentId,
    pub by: LocatedBy,
}

pub struct ContentLocator<'a> {
    store: &'a EntryCacheStore,
    tracker: &'a InteractionTracker,
}

impl<'a> ContentLocator<'a> {
    pub fn new(store: &'a EntryCacheStore, tracker: &'a InteractionTracker) -> Self {
        Self { store, tracker }
    }

    pub fn locate(&self, page: &RenderedPage) -> Option<Located> {
        let found = self
            .from_page_url(page)
            .or_else(|| self.from_last_interaction())
            .or_else(|| self.from_cache_scan(page))
            .or_else(|| self.from_live_scan(page));

        match &found {
            Some(located) => debug!(content_id = %located.id, by = ?located.by, "Located content"),
            None => debug!("No content id found on page"),
        }
        found
    }

    fn from_page_url(&self, page: &RenderedPage) -> Option<Located> {
        status_id(&page.url).map(|id| Located {
            id,
            by: LocatedBy::PageUrl,
        })
    }

    fn from_last_interaction(&self) -> Option<Located> {
        self.tracker.last().map(|id| Located {
            id,
            by: LocatedBy::LastInteraction,
        })
    }

    fn from_cache_scan(&self, page: &RenderedPage) -> Option<Located> {
        let by_link = page.articles.iter().find_map(|article| {
            let id = article.status_links.iter().find_map(|l| status_id(l))?;
            self.store.has_media(&id).then_some(id)
        });

        by_link
            .or_else(|| {
                page.articles
                    .iter()
                    .flat_map(|article| article.image_sources.iter())
                    .filter_map(|src| asset_key_from_rendered(src))
                    .find_map(|key| self.store.resolve_url_alias(&key))
            })
            .map(|id| Located {
                id,
                by: LocatedBy::CacheScan,
            })
    }

    fn from_live_scan(&self, page: &RenderedPage) -> Option<Located> {
        page.articles
            .iter()
            .find_map(RenderedArticle::main_id)
            .map(|id| Located {
                id,
                by: LocatedBy::LiveScan,
            })
    }
}
