use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info};

use crate::config::Config;
use crate::error::TranscriptError;
use crate::mirror::MirrorProvider;
use crate::youtube::CaptionsProvider;
use crate::{Backend, Segment, Transcript, VideoId};

/// A fallback language is tried at most once
pub const MAX_LANGUAGE_ATTEMPTS: usize = 2;

pub(crate) const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// A source of caption text for one video in one language
#[async_trait]
pub trait TranscriptProvider: Send + Sync {
    fn name(&self) -> &'static str;

    fn backend(&self) -> Backend;

    /// One attempt for one language.
    ///
    /// `NotFound` means "try another language", `Disabled` and `Upstream` are terminal.
    async fn fetch_language(&self, video_id: &VideoId, lang: &str) -> Result<Vec<Segment>, TranscriptError>;
}

/// Fetch a transcript, falling back through at most [`MAX_LANGUAGE_ATTEMPTS`] languages
pub async fn fetch_transcript(
    provider: &dyn TranscriptProvider,
    video_id: &VideoId,
    languages: &[String],
) -> Result<Transcript, TranscriptError> {
    let mut last_err = TranscriptError::NotFound {
        video_id: video_id.to_string(),
        lang: languages.first().cloned().unwrap_or_default(),
    };

    for lang in languages.iter().take(MAX_LANGUAGE_ATTEMPTS) {
        debug!("Fetching {} transcript for {video_id} via {}", lang, provider.name());
        match provider.fetch_language(video_id, lang).await {
            Ok(segments) => {
                let transcript = Transcript {
                    video_id: video_id.to_string(),
                    language: lang.clone(),
                    backend: provider.backend(),
                    segments,
                };
                if transcript.text().trim().is_empty() {
                    debug!("Empty {lang} transcript for {video_id}, treating as not found");
                    last_err = TranscriptError::NotFound {
                        video_id: video_id.to_string(),
                        lang: lang.clone(),
                    };
                    continue;
                }
                info!(
                    "Fetched {lang} transcript for {video_id} via {}: {} segments",
                    provider.name(),
                    transcript.segments.len()
                );
                return Ok(transcript);
            }
            Err(e @ TranscriptError::NotFound { .. }) => {
                debug!("{e}");
                last_err = e;
            }
            Err(e) => return Err(e),
        }
    }

    Err(last_err)
}

/// HTTP client shared by both transcript backends
pub fn http_client(timeout: Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
}

/// Build the transcript backend selected by `config.backend`
pub fn build_provider(config: &Config) -> eyre::Result<Arc<dyn TranscriptProvider>> {
    let client = http_client(Duration::from_secs(config.transcript_timeout_secs))?;
    let provider: Arc<dyn TranscriptProvider> = match config.backend {
        Backend::Captions => Arc::new(CaptionsProvider::new(client)),
        Backend::Mirror => Arc::new(MirrorProvider::new(client, config.mirror.clone())?),
    };
    Ok(provider)
}
