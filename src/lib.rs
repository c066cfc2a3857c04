pub mod config;
pub mod error;
pub mod mirror;
pub mod output;
pub mod server;
pub mod summarize;
pub mod transcript;
pub mod youtube;

use serde::Deserialize;
use url::Url;

/// Length of every YouTube video identifier
pub const VIDEO_ID_LEN: usize = 11;

/// A validated YouTube video identifier.
///
/// Only [`extract_video_id`] produces one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VideoId(String);

impl VideoId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for VideoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single caption fragment, timing discarded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub text: String,
}

impl Segment {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Which transcript strategy produced a transcript
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// YouTube's own caption tracks via the InnerTube player API
    #[default]
    Captions,
    /// HTML scraping of a transcript mirror site
    Mirror,
}

/// Complete transcript for a video
#[derive(Debug, Clone)]
pub struct Transcript {
    pub video_id: String,
    pub language: String,
    pub backend: Backend,
    pub segments: Vec<Segment>,
}

impl Transcript {
    /// Segment texts joined by single spaces, in order
    pub fn text(&self) -> String {
        self.segments
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Backend::Captions => write!(f, "captions"),
            Backend::Mirror => write!(f, "mirror"),
        }
    }
}

fn is_valid_video_id(candidate: &str) -> bool {
    candidate.len() == VIDEO_ID_LEN
        && candidate
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

fn is_youtube_host(host: &str) -> bool {
    host == "youtube.com" || host.ends_with(".youtube.com")
}

fn is_embed_host(host: &str) -> bool {
    is_youtube_host(host) || host == "youtube-nocookie.com" || host.ends_with(".youtube-nocookie.com")
}

/// Extract video ID from the supported YouTube URL shapes.
///
/// Accepts `watch?v=`, `youtu.be/`, `/shorts/`, `/embed/` and `/live/` links with or
/// without a scheme. Anything else, including a bare ID, yields `None`.
pub fn extract_video_id(input: &str) -> Option<VideoId> {
    let input = input.trim();
    if input.is_empty() || input.chars().any(char::is_whitespace) {
        return None;
    }

    let url = if input.contains("://") {
        Url::parse(input).ok()?
    } else {
        Url::parse(&format!("https://{input}")).ok()?
    };

    let host = url.host_str()?.to_ascii_lowercase();
    let mut segments = url.path_segments()?.filter(|s| !s.is_empty());

    let candidate = if host == "youtu.be" || host == "www.youtu.be" {
        segments.next()?.to_string()
    } else {
        match segments.next()? {
            "watch" if is_youtube_host(&host) => url
                .query_pairs()
                .find(|(k, _)| k == "v")
                .map(|(_, v)| v.into_owned())?,
            "shorts" | "live" if is_youtube_host(&host) => segments.next()?.to_string(),
            "embed" if is_embed_host(&host) => segments.next()?.to_string(),
            _ => return None,
        }
    };

    is_valid_video_id(&candidate).then_some(VideoId(candidate))
}
