// Media descriptor derivation from upstream media entities.

use serde_json::Value;
use tweek_common::{MediaDescriptor, MediaKind};

use crate::shape::{path, str_at};

/// The only variant content type worth downloading.
pub const CANONICAL_VIDEO_TYPE: &str = "video/mp4";

/// Appended to still-image URLs to request the original resolution.
pub const ORIGINAL_SIZE_SUFFIX: &str = ":orig";

/// Size and quality suffixes stripped when normalizing an asset URL.
const SIZE_SUFFIXES: &[&str] = &[":large", ":orig", ":small", ":medium"];

/// Derive a descriptor from one media entity.
///
/// Video-like entities take the highest-bitrate mp4 variant (query stripped);
/// photos get the original-size suffix. Returns `None` when the entity has
/// no usable URL at all.
pub fn describe_entity(entity: &Value) -> Option<MediaDescriptor> {
    let thumbnail = str_at(entity, &["media_url_https"]);
    let entity_type = str_at(entity, &["type"]).unwrap_or_default();

    if let Some(variants) = path(entity, &["video_info", "variants"]).and_then(Value::as_array) {
        if let Some(url) = best_variant(variants).and_then(|v| str_at(v, &["url"])) {
            let kind = if entity_type == "animated_gif" {
                MediaKind::AnimatedGif
            } else {
                MediaKind::Video
            };
            let source_url = strip_query(url).to_string();
            return Some(MediaDescriptor {
                kind,
                thumbnail_url: thumbnail.unwrap_or(source_url.as_str()).to_string(),
                source_url,
            });
        }
    }

    let thumbnail = thumbnail?;
    let kind = MediaKind::from_entity_type(entity_type).unwrap_or(MediaKind::Photo);
    let source_url = if entity_type == "photo" {
        format!("{thumbnail}{ORIGINAL_SIZE_SUFFIX}")
    } else {
        thumbnail.to_string()
    };

    Some(MediaDescriptor {
        kind,
        source_url,
        thumbnail_url: thumbnail.to_string(),
    })
}

/// Highest-bitrate variant of the canonical video type with a URL.
/// Ties go to the first one listed; a missing bitrate counts as zero.
pub fn best_variant(variants: &[Value]) -> Option<&Value> {
    let mut best: Option<(&Value, f64)> = None;
    for variant in variants {
        if str_at(variant, &["content_type"]) != Some(CANONICAL_VIDEO_TYPE) {
            continue;
        }
        if str_at(variant, &["url"]).is_none() {
            continue;
        }
        let bitrate = variant
            .get("bitrate")
            .and_then(Value::as_f64)
            .unwrap_or(0.0);
        match best {
            Some((_, top)) if bitrate <= top => {}
            _ => best = Some((variant, bitrate)),
        }
    }
    best.map(|(variant, _)| variant)
}

/// Everything before the first `?`.
pub fn strip_query(url: &str) -> &str {
    url.split('?').next().unwrap_or(url)
}

/// Asset URL with every size/quality suffix removed. Used as the reverse-index key.
pub fn normalize_asset_url(url: &str) -> String {
    SIZE_SUFFIXES
        .iter()
        .fold(url.to_string(), |acc, suffix| acc.replace(suffix, ""))
}
