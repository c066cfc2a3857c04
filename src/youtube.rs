use async_trait::async_trait;
use log::debug;
use regex::Regex;
use serde::Deserialize;

use crate::error::TranscriptError;
use crate::transcript::TranscriptProvider;
use crate::{Backend, Segment, VideoId};

const YOUTUBE_BASE_URL: &str = "https://www.youtube.com";

#[derive(Debug, Deserialize)]
struct InnerTubePlayerResponse {
    #[serde(rename = "playabilityStatus")]
    playability_status: Option<PlayabilityStatus>,
    captions: Option<CaptionsData>,
}

#[derive(Debug, Deserialize)]
struct PlayabilityStatus {
    status: String,
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CaptionsData {
    #[serde(rename = "playerCaptionsTracklistRenderer")]
    player_captions_tracklist_renderer: Option<CaptionTracklistRenderer>,
}

#[derive(Debug, Deserialize)]
struct CaptionTracklistRenderer {
    #[serde(rename = "captionTracks")]
    caption_tracks: Option<Vec<CaptionTrack>>,
}

#[derive(Debug, Deserialize)]
struct CaptionTrack {
    #[serde(rename = "baseUrl")]
    base_url: String,
    #[serde(rename = "languageCode")]
    language_code: String,
    /// "asr" for auto-generated tracks
    kind: Option<String>,
}

/// Captions straight from YouTube via the InnerTube player API
pub struct CaptionsProvider {
    client: reqwest::Client,
    base_url: String,
}

impl CaptionsProvider {
    pub fn new(client: reqwest::Client) -> Self {
        Self::with_base_url(client, YOUTUBE_BASE_URL)
    }

    /// Talk to a YouTube-compatible host other than www.youtube.com
    pub fn with_base_url(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl TranscriptProvider for CaptionsProvider {
    fn name(&self) -> &'static str {
        "youtube-captions"
    }

    fn backend(&self) -> Backend {
        Backend::Captions
    }

    async fn fetch_language(&self, video_id: &VideoId, lang: &str) -> Result<Vec<Segment>, TranscriptError> {
        // Step 1: Fetch the watch page to get the InnerTube API key
        debug!("Fetching watch page for {video_id}");
        let page_html = self
            .client
            .get(format!("{}/watch", self.base_url))
            .query(&[("v", video_id.as_str())])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let api_key = extract_api_key(&page_html)?;
        debug!("Extracted InnerTube API key: {api_key}");

        // Step 2: Call InnerTube player endpoint
        let body = serde_json::json!({
            "context": {
                "client": {
                    "hl": lang,
                    "gl": "US",
                    "clientName": "WEB",
                    "clientVersion": "2.20241126.01.00"
                }
            },
            "videoId": video_id.as_str()
        });

        let resp: InnerTubePlayerResponse = self
            .client
            .post(format!("{}/youtubei/v1/player", self.base_url))
            .query(&[("key", api_key.as_str()), ("prettyPrint", "false")])
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        // Step 3: Pick the caption track for this language
        let track = select_track(resp, video_id, lang)?;
        debug!(
            "Using caption track: lang={} kind={}",
            track.language_code,
            track.kind.as_deref().unwrap_or("manual")
        );

        // Step 4: Fetch the caption XML
        let caption_xml = self
            .client
            .get(&track.base_url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        parse_caption_xml(&caption_xml)
    }
}

fn extract_api_key(html: &str) -> Result<String, TranscriptError> {
    let patterns = [
        r#""INNERTUBE_API_KEY"\s*:\s*"([^"]+)""#,
        // Fallback: try the newer pattern
        r#"innertubeApiKey\s*[=:]\s*"([^"]+)""#,
    ];
    for pattern in patterns {
        let re = Regex::new(pattern).map_err(|e| TranscriptError::Upstream(e.to_string()))?;
        if let Some(caps) = re.captures(html) {
            return Ok(caps[1].to_string());
        }
    }

    Err(TranscriptError::Upstream(
        "could not extract InnerTube API key from watch page".to_string(),
    ))
}

fn language_matches(code: &str, lang: &str) -> bool {
    code.eq_ignore_ascii_case(lang)
        || code
            .split(['-', '_'])
            .next()
            .is_some_and(|primary| primary.eq_ignore_ascii_case(lang))
}

/// Classify the player response into disabled, not found, or a usable track
fn select_track(resp: InnerTubePlayerResponse, video_id: &VideoId, lang: &str) -> Result<CaptionTrack, TranscriptError> {
    if let Some(status) = resp.playability_status.filter(|s| s.status != "OK") {
        return Err(TranscriptError::Upstream(format!(
            "video {video_id} is not playable: {} ({})",
            status.status,
            status.reason.unwrap_or_default()
        )));
    }

    let tracks = resp
        .captions
        .and_then(|c| c.player_captions_tracklist_renderer)
        .and_then(|r| r.caption_tracks)
        .unwrap_or_default();

    if tracks.is_empty() {
        return Err(TranscriptError::Disabled {
            video_id: video_id.to_string(),
        });
    }

    let (manual, generated): (Vec<_>, Vec<_>) = tracks
        .into_iter()
        .filter(|t| language_matches(&t.language_code, lang))
        .partition(|t| t.kind.as_deref() != Some("asr"));

    manual
        .into_iter()
        .chain(generated)
        .next()
        .ok_or_else(|| TranscriptError::NotFound {
            video_id: video_id.to_string(),
            lang: lang.to_string(),
        })
}

fn parse_caption_xml(xml: &str) -> Result<Vec<Segment>, TranscriptError> {
    use quick_xml::Reader;
    use quick_xml::events::Event;

    let mut reader = Reader::from_str(xml);
    let mut segments = Vec::new();
    let mut in_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) if e.name().as_ref() == b"text" => {
                in_text = true;
            }
            Ok(Event::End(ref e)) if e.name().as_ref() == b"text" => {
                in_text = false;
            }
            Ok(Event::Text(ref e)) if in_text => {
                let raw_text = e.unescape().unwrap_or_default().to_string();
                let text = html_escape::decode_html_entities(&raw_text).trim().to_string();
                if !text.is_empty() {
                    segments.push(Segment { text });
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(TranscriptError::Upstream(format!("error parsing caption XML: {e}"))),
            _ => {}
        }
    }

    Ok(segments)
}
