use axum::http::StatusCode;

/// Longest slice of upstream generation detail echoed back to the client
const MAX_DETAIL_CHARS: usize = 300;

/// Failure outcomes of a transcript backend
#[derive(Debug, thiserror::Error)]
pub enum TranscriptError {
    /// Captions are turned off for this video; other languages are not tried
    #[error("transcripts are disabled for video {video_id}")]
    Disabled { video_id: String },

    /// No transcript in the requested language, or the transcript was empty
    #[error("no transcript found for video {video_id} in language {lang}")]
    NotFound { video_id: String, lang: String },

    /// Network, status, or payload failure talking to the backend
    #[error("transcript backend failure: {0}")]
    Upstream(String),
}

impl From<reqwest::Error> for TranscriptError {
    fn from(e: reqwest::Error) -> Self {
        TranscriptError::Upstream(e.to_string())
    }
}

/// Failure outcomes of the summary generator
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("{provider} API key not configured (set {env_var})")]
    NotConfigured {
        provider: &'static str,
        env_var: &'static str,
    },

    #[error("{0}")]
    Remote(String),
}

impl From<reqwest::Error> for GenerationError {
    fn from(e: reqwest::Error) -> Self {
        GenerationError::Remote(e.to_string())
    }
}

/// Terminal error of one summarize request
#[derive(Debug, thiserror::Error)]
pub enum SummarizeError {
    #[error("invalid or unsupported YouTube URL")]
    InvalidUrl,

    #[error(transparent)]
    Transcript(#[from] TranscriptError),

    #[error(transparent)]
    Generation(#[from] GenerationError),
}

impl SummarizeError {
    pub fn status(&self) -> StatusCode {
        match self {
            SummarizeError::InvalidUrl => StatusCode::BAD_REQUEST,
            SummarizeError::Transcript(TranscriptError::Disabled { .. })
            | SummarizeError::Transcript(TranscriptError::NotFound { .. }) => StatusCode::NOT_FOUND,
            SummarizeError::Transcript(TranscriptError::Upstream(_)) | SummarizeError::Generation(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message shown to the end user. Transcript backend detail stays in the log.
    pub fn user_message(&self) -> String {
        match self {
            SummarizeError::InvalidUrl => {
                "Invalid or unsupported YouTube URL. Please check and try again.".to_string()
            }
            SummarizeError::Transcript(TranscriptError::Disabled { .. }) => {
                "Transcripts are disabled for this video by the uploader.".to_string()
            }
            SummarizeError::Transcript(TranscriptError::NotFound { .. }) => {
                "No transcript could be found for this video. It might be a music video, a very new upload, \
                 or have subtitles turned off."
                    .to_string()
            }
            SummarizeError::Transcript(TranscriptError::Upstream(_)) => {
                "Failed to fetch the transcript. YouTube may be blocking requests or the video is unavailable. \
                 Please try again later."
                    .to_string()
            }
            SummarizeError::Generation(GenerationError::NotConfigured { .. }) => {
                "AI summarization is unavailable because the service is not configured.".to_string()
            }
            SummarizeError::Generation(GenerationError::Remote(detail)) => {
                format!(
                    "Could not generate summary. Error from AI service: {}",
                    truncate(detail, MAX_DETAIL_CHARS)
                )
            }
        }
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}
