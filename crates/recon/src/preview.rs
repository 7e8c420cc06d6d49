use crate::error::ReconcileError;
use crate::gateway::{FetchJson, Gateway, MediaInfo};
use crate::normalize::{normalize_media_id, page_id_of};

pub const DEFAULT_PREVIEW_WIDTH: u32 = 400;
pub const DEFAULT_PREVIEW_HEIGHT: u32 = 400;

/// Fragment returned for files with no inline player or viewer.
pub const UNSUPPORTED_PREVIEW: &str =
    "<html><head><meta charset='utf-8' /></head><body><p>Preview not available for this file type</p></body></html>";

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "svg", "tif", "tiff", "webp", "bmp", "xcf"];
const AUDIO_EXTENSIONS: &[&str] = &["mp3", "ogg", "oga", "wav", "flac", "opus", "mid", "midi"];
const VIDEO_EXTENSIONS: &[&str] = &["webm", "ogv", "mp4", "mpg", "mpeg"];

const SIZE_UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB", "PB"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreviewSize {
    pub width: u32,
    pub height: u32,
}

impl Default for PreviewSize {
    fn default() -> Self {
        Self { width: DEFAULT_PREVIEW_WIDTH, height: DEFAULT_PREVIEW_HEIGHT }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaClass {
    Image,
    Audio,
    Video,
    Unsupported,
}

impl MediaClass {
    /// Classify by the file extension of `url`, ignoring case.
    pub fn from_url(url: &str) -> Self {
        let path = url.split(['?', '#']).next().unwrap_or(url);
        let file = path.rsplit('/').next().unwrap_or(path);
        let Some((_, ext)) = file.rsplit_once('.') else {
            return Self::Unsupported;
        };
        let ext = ext.to_ascii_lowercase();
        if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            Self::Image
        } else if AUDIO_EXTENSIONS.contains(&ext.as_str()) {
            Self::Audio
        } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            Self::Video
        } else {
            Self::Unsupported
        }
    }
}

/// Preview fragment for `media_id`, or `None` if the page does not exist.
pub fn render_preview<F: FetchJson>(
    gateway: &Gateway<F>,
    media_id: &str,
    size: PreviewSize,
) -> Result<Option<String>, ReconcileError> {
    let media_id = normalize_media_id(media_id)?;
    let info = gateway.media_info(page_id_of(&media_id)?)?;
    Ok(info.map(|info| render(&info, size)))
}

/// Render metadata that is already fetched. Pure.
pub fn render(info: &MediaInfo, size: PreviewSize) -> String {
    let url = escape_html(&info.url);
    let title = escape_html(&info.title);
    let PreviewSize { width, height } = size;

    let player = match MediaClass::from_url(&info.url) {
        MediaClass::Image => format!(
            r#"<img src="{url}" width="{width}" height="{height}" style="float: left; object-fit: contain">"#
        ),
        MediaClass::Audio => format!(r#"<audio controls src="{url}"></audio>"#),
        MediaClass::Video => {
            format!(r#"<video controls src="{url}" width="{width}" height="{height}"></video>"#)
        }
        MediaClass::Unsupported => return UNSUPPORTED_PREVIEW.to_string(),
    };

    let mut details = format!("<p>{title}</p><p>{}", human_size(info.size));
    if info.width > 0 && info.height > 0 {
        details.push_str(&format!(" &middot; {} &times; {} px", info.width, info.height));
    }
    details.push_str("</p>");

    format!("<html><head><meta charset='utf-8' /></head><body>{player}{details}</body></html>")
}

/// Binary-unit size: `1536` → `1.5 KB`.
pub fn human_size(bytes: u64) -> String {
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < SIZE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let rounded = format!("{value:.2}");
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{trimmed} {}", SIZE_UNITS[unit])
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::Endpoints;
    use crate::test_support::ScriptedFetcher;
    use serde_json::json;

    fn info(url: &str) -> MediaInfo {
        MediaInfo {
            url: url.into(),
            title: "File:Commons-logo.svg".into(),
            width: 1024,
            height: 1376,
            size: 932,
        }
    }

    #[test]
    fn classification() {
        assert_eq!(MediaClass::from_url("https://x/a/b/Photo.JPG"), MediaClass::Image);
        assert_eq!(MediaClass::from_url("https://x/a/b/Song.ogg"), MediaClass::Audio);
        assert_eq!(MediaClass::from_url("https://x/a/b/Clip.webm?x=1"), MediaClass::Video);
        assert_eq!(MediaClass::from_url("https://x/a/b/Book.pdf"), MediaClass::Unsupported);
        assert_eq!(MediaClass::from_url("https://x/a/b/noext"), MediaClass::Unsupported);
    }

    #[test]
    fn sizes() {
        assert_eq!(human_size(0), "0 B");
        assert_eq!(human_size(932), "932 B");
        assert_eq!(human_size(1536), "1.5 KB");
        assert_eq!(human_size(1024 * 1024), "1 MB");
        assert_eq!(human_size(5_368_709_120), "5 GB");
        assert_eq!(human_size(1_234_567), "1.18 MB");
    }

    #[test]
    fn image_fragment() {
        let html = render(
            &info("https://upload.wikimedia.org/wikipedia/commons/4/4a/Commons-logo.svg"),
            PreviewSize::default(),
        );
        assert!(html.contains(
            r#"<img src="https://upload.wikimedia.org/wikipedia/commons/4/4a/Commons-logo.svg" width="400" height="400""#
        ));
        assert!(html.contains("<p>File:Commons-logo.svg</p>"));
        assert!(html.contains("932 B"));
    }

    #[test]
    fn audio_and_video_fragments() {
        assert!(render(&info("https://x/a.flac"), PreviewSize::default()).contains("<audio controls"));
        let video = render(&info("https://x/a.webm"), PreviewSize { width: 320, height: 240 });
        assert!(video.contains(r#"<video controls src="https://x/a.webm" width="320" height="240">"#));
    }

    #[test]
    fn unsupported_is_fixed_and_idempotent() {
        let i = info("https://x/a.pdf");
        assert_eq!(render(&i, PreviewSize::default()), UNSUPPORTED_PREVIEW);
        let j = info("https://x/a.png");
        assert_eq!(render(&j, PreviewSize::default()), render(&j, PreviewSize::default()));
    }

    #[test]
    fn title_is_escaped() {
        let mut i = info("https://x/a.png");
        i.title = r#"File:<b>"x" & y</b>.png"#.into();
        let html = render(&i, PreviewSize::default());
        assert!(html.contains("File:&lt;b&gt;&quot;x&quot; &amp; y&lt;/b&gt;.png"));
    }

    #[test]
    fn render_preview_fetches_by_page_id() {
        let fetcher = ScriptedFetcher::new()
            .on(
                &[("pageids", "317966")],
                json!({"query": {"pages": {"317966": {
                    "pageid": 317966,
                    "title": "File:Commons-logo.svg",
                    "imageinfo": [{"url": "https://upload.wikimedia.org/wikipedia/commons/4/4a/Commons-logo.svg",
                                   "width": 1024, "height": 1376, "size": 932}]
                }}}}),
            )
            .on(&[("pageids", "5")], json!({"query": {"pages": {"5": {"pageid": 5, "missing": ""}}}}));
        let gw = Gateway::new(fetcher, Endpoints::default());
        let html = render_preview(&gw, "M317966", PreviewSize::default()).unwrap().unwrap();
        assert!(html.starts_with("<html>"));
        assert_eq!(render_preview(&gw, "M5", PreviewSize::default()).unwrap(), None);
        assert_eq!(render_preview(&gw, "X5", PreviewSize::default()).unwrap_err().kind(), "invalid_input");
    }
}
