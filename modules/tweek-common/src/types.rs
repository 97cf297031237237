use serde::{Deserialize, Serialize};

// --- Identifiers ---

/// Opaque identifier of one piece of authored content (a tweet).
///
/// Numeric in practice but always kept as text: upstream ids exceed the
/// range a JSON number can carry without loss.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentId(String);

impl ContentId {
    /// Returns `None` for empty input; an empty id is never a usable key.
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        if raw.is_empty() {
            None
        } else {
            Some(Self(raw))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ContentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// --- Media ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Photo,
    Video,
    AnimatedGif,
}

impl MediaKind {
    /// Parse the upstream entity `type` field.
    pub fn from_entity_type(raw: &str) -> Option<Self> {
        match raw {
            "photo" => Some(MediaKind::Photo),
            "video" => Some(MediaKind::Video),
            "animated_gif" => Some(MediaKind::AnimatedGif),
            _ => None,
        }
    }

    /// Kind used when saving the asset. Animated images are served as mp4.
    pub fn download_kind(self) -> MediaKind {
        match self {
            MediaKind::AnimatedGif => MediaKind::Video,
            other => other,
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaKind::Photo => write!(f, "photo"),
            MediaKind::Video => write!(f, "video"),
            MediaKind::AnimatedGif => write!(f, "animated_gif"),
        }
    }
}

/// One downloadable asset attached to a piece of content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaDescriptor {
    pub kind: MediaKind,
    pub source_url: String,
    pub thumbnail_url: String,
}

// --- Extracted facts ---

/// Facts about an authoring account, cached by lower-cased handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountFacts {
    pub handle: String,
    pub location: Option<String>,
    pub display_name: Option<String>,
}

/// Facts about a piece of content that hold whether or not it carries media.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentFacts {
    pub account_handle: Option<String>,
    pub client_source: Option<String>,
}

/// Cache entry for content that carries media. Replaced wholesale on re-extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedMedia {
    pub account_handle: String,
    pub media: Vec<MediaDescriptor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

// --- Download dispatch ---

/// Request handed to the download-dispatch collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadRequest {
    pub content_id: String,
    pub account_handle: String,
    pub media: Vec<MediaDescriptor>,
}
