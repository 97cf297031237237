// Suggested file names for downloaded media: `handle_contentId[_n].ext`.

use tweek_common::{DownloadRequest, MediaDescriptor, MediaKind};

/// Folder every download is saved under.
pub const DOWNLOAD_FOLDER: &str = "TwitterTweek";

const MAX_HANDLE_CHARS: usize = 50;
const KNOWN_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "mp4", "webp"];

/// `handle_contentId`, the stem shared by every file of one request.
pub fn suggested_base_name(request: &DownloadRequest) -> String {
    format!(
        "{}_{}",
        sanitize_handle(&request.account_handle),
        request.content_id
    )
}

/// One path per media item, in request order. The `_n` index only appears
/// when the request carries more than one item.
pub fn suggested_filenames(request: &DownloadRequest) -> Vec<String> {
    let base = suggested_base_name(request);
    let many = request.media.len() > 1;
    request
        .media
        .iter()
        .enumerate()
        .map(|(i, media)| {
            let index = if many { format!("_{}", i + 1) } else { String::new() };
            format!("{DOWNLOAD_FOLDER}/{base}{index}.{}", extension_for(media))
        })
        .collect()
}

/// File extension from the media kind, refined by the URL's own extension.
/// Animated images are served as mp4, so a `.gif` URL never yields `gif`.
pub fn extension_for(media: &MediaDescriptor) -> String {
    let url = media.source_url.as_str();

    let mut ext = if media.kind.download_kind() == MediaKind::Video
        || url.contains(".mp4")
        || url.contains("video")
        || url.contains(".gif")
    {
        "mp4"
    } else if url.contains(".png") {
        "png"
    } else if url.contains(".webp") {
        "webp"
    } else {
        "jpg"
    }
    .to_string();

    let clean = url.split('?').next().unwrap_or(url);
    let clean = clean.strip_suffix(":orig").unwrap_or(clean);
    if let Some((_, url_ext)) = clean.rsplit_once('.') {
        let url_ext = url_ext.to_lowercase();
        if KNOWN_EXTENSIONS.contains(&url_ext.as_str()) {
            if url_ext == "jpeg" {
                ext = "jpg".to_string();
            } else if url_ext != "gif" {
                ext = url_ext;
            }
        }
    }

    ext
}

/// Replace characters that are invalid in file names and cap the length.
pub fn sanitize_handle(handle: &str) -> String {
    handle
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            other => other,
        })
        .take(MAX_HANDLE_CHARS)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(kind: MediaKind, url: &str) -> MediaDescriptor {
        MediaDescriptor {
            kind,
            source_url: url.to_string(),
            thumbnail_url: url.to_string(),
        }
    }

    fn request(handle: &str, media: Vec<MediaDescriptor>) -> DownloadRequest {
        DownloadRequest {
            content_id: "1790000000000000000".into(),
            account_handle: handle.into(),
            media,
        }
    }

    #[test]
    fn single_item_has_no_index() {
        let req = request(
            "painter",
            vec![descriptor(MediaKind::Photo, "https://pbs.twimg.com/media/a.jpg:orig")],
        );
        assert_eq!(
            suggested_filenames(&req),
            vec!["TwitterTweek/painter_1790000000000000000.jpg"]
        );
    }

    #[test]
    fn multiple_items_are_numbered_from_one() {
        let req = request(
            "painter",
            vec![
                descriptor(MediaKind::Photo, "https://pbs.twimg.com/media/a.png:orig"),
                descriptor(MediaKind::Video, "https://video.twimg.com/vid/b.mp4"),
            ],
        );
        assert_eq!(
            suggested_filenames(&req),
            vec![
                "TwitterTweek/painter_1790000000000000000_1.png",
                "TwitterTweek/painter_1790000000000000000_2.mp4",
            ]
        );
    }

    #[test]
    fn animated_gif_is_saved_as_mp4() {
        let gif = descriptor(MediaKind::AnimatedGif, "https://video.twimg.com/tweet_video/g.mp4");
        assert_eq!(extension_for(&gif), "mp4");

        let gif_url = descriptor(MediaKind::Photo, "https://example.com/anim.gif");
        assert_eq!(extension_for(&gif_url), "mp4");
    }

    #[test]
    fn jpeg_url_maps_to_jpg_and_query_is_ignored() {
        let jpeg = descriptor(MediaKind::Photo, "https://example.com/p.JPEG?x=1");
        assert_eq!(extension_for(&jpeg), "jpg");

        let rendered = descriptor(
            MediaKind::Photo,
            "https://pbs.twimg.com/media/abc?format=jpg&name=orig",
        );
        assert_eq!(extension_for(&rendered), "jpg");
    }

    #[test]
    fn handle_is_sanitized_and_truncated() {
        assert_eq!(sanitize_handle("a/b:c*d"), "a_b_c_d");
        assert_eq!(sanitize_handle(&"x".repeat(80)).chars().count(), 50);
    }
}
