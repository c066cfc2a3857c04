use std::sync::Arc;
use std::time::Duration;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::error::{SummarizeError, TranscriptError};
use crate::summarize::{SummaryGenerator, build_prompt};
use crate::transcript::{TranscriptProvider, fetch_transcript};
use crate::{extract_video_id, output};

const INDEX_HTML: &str = include_str!("../static/index.html");

/// Immutable per-process collaborators shared by every request
#[derive(Clone)]
pub struct AppState {
    pub transcripts: Arc<dyn TranscriptProvider>,
    pub generator: Arc<dyn SummaryGenerator>,
    pub languages: Arc<[String]>,
    /// Bound on the whole transcript fetch, across every language attempt
    pub transcript_timeout: Duration,
}

#[derive(Debug, Deserialize)]
pub struct SummarizeRequest {
    #[serde(default)]
    pub youtube_url: String,
}

#[derive(Debug, Serialize)]
struct SummaryBody {
    summary: String,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for SummarizeError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.user_message(),
        };
        (self.status(), Json(body)).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/healthz", get(healthz))
        .route("/summarize", post(summarize))
        .with_state(state)
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn summarize(State(state): State<AppState>, payload: Result<Json<SummarizeRequest>, JsonRejection>) -> Response {
    let raw_url = match payload {
        Ok(Json(req)) => req.youtube_url,
        Err(rejection) => {
            warn!("Rejected summarize body: {rejection}");
            return SummarizeError::InvalidUrl.into_response();
        }
    };

    match summarize_url(&state, &raw_url).await {
        Ok(summary) => (StatusCode::OK, Json(SummaryBody { summary })).into_response(),
        Err(e) => {
            warn!("Summarize failed for {:?}: {e}", raw_url.trim());
            e.into_response()
        }
    }
}

/// Run the whole pipeline for one URL and return the summary as sanitized HTML
pub async fn summarize_url(state: &AppState, raw_url: &str) -> Result<String, SummarizeError> {
    debug!("Normalizing {:?}", raw_url.trim());
    let video_id = extract_video_id(raw_url).ok_or(SummarizeError::InvalidUrl)?;

    debug!("Fetching transcript for {video_id}");
    let transcript = tokio::time::timeout(
        state.transcript_timeout,
        fetch_transcript(state.transcripts.as_ref(), &video_id, &state.languages),
    )
    .await
    .map_err(|_| {
        TranscriptError::Upstream(format!(
            "transcript fetch for {video_id} timed out after {:?}",
            state.transcript_timeout
        ))
    })??;

    debug!(
        "Building prompt from {} characters of {} transcript",
        transcript.text().len(),
        transcript.language
    );
    let prompt = build_prompt(&transcript);

    debug!("Generating summary for {video_id}");
    let markdown = state.generator.generate(&prompt).await?;

    debug!("Formatting {} bytes of markdown", markdown.len());
    let html = output::render_html(&markdown);

    info!("Summarized {video_id} from {} ({})", transcript.backend, transcript.language);
    Ok(html)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, header};
    use tower::ServiceExt;

    use super::*;
    use crate::error::GenerationError;
    use crate::transcript::tests::{Canned, StubProvider};

    struct StubGenerator {
        reply: Result<&'static str, fn() -> GenerationError>,
        calls: AtomicUsize,
        prompts: Mutex<Vec<String>>,
    }

    impl StubGenerator {
        fn ok(reply: &'static str) -> Self {
            Self {
                reply: Ok(reply),
                calls: AtomicUsize::new(0),
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn failing(make: fn() -> GenerationError) -> Self {
            Self {
                reply: Err(make),
                calls: AtomicUsize::new(0),
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SummaryGenerator for StubGenerator {
        async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.prompts.lock().unwrap().push(prompt.to_string());
            match &self.reply {
                Ok(text) => Ok(text.to_string()),
                Err(make) => Err(make()),
            }
        }
    }

    const URL: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";

    fn state(provider: &Arc<StubProvider>, generator: &Arc<StubGenerator>) -> AppState {
        AppState {
            transcripts: provider.clone(),
            generator: generator.clone(),
            languages: vec!["hi".to_string(), "en".to_string()].into(),
            transcript_timeout: Duration::from_secs(5),
        }
    }

    async fn post_json(state: AppState, body: &str) -> (StatusCode, serde_json::Value) {
        let req = Request::builder()
            .method("POST")
            .uri("/summarize")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let resp = router(state).oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_success_returns_html_summary() {
        let provider = Arc::new(StubProvider::new(vec![
            ("hi", Canned::NotFound),
            ("en", Canned::Segments(vec!["Hello", "world"])),
        ]));
        let generator = Arc::new(StubGenerator::ok("**hi** there"));

        let (status, body) = post_json(state(&provider, &generator), &format!(r#"{{"youtube_url": "{URL}"}}"#)).await;

        assert_eq!(status, StatusCode::OK);
        assert!(body["summary"].as_str().unwrap().contains("<strong>hi</strong>"));
        assert!(body.get("error").is_none());
        assert_eq!(generator.calls(), 1);
        assert!(generator.prompts.lock().unwrap()[0].contains("Hello world"));
    }

    #[tokio::test]
    async fn test_invalid_url_makes_no_outbound_calls() {
        let provider = Arc::new(StubProvider::new(vec![]));
        let generator = Arc::new(StubGenerator::ok("unused"));

        let (status, body) = post_json(state(&provider, &generator), r#"{"youtube_url": "not a url"}"#).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
        assert!(body.get("summary").is_none());
        assert_eq!(provider.calls(), 0);
        assert_eq!(generator.calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_field_and_bad_json_are_bad_request() {
        let provider = Arc::new(StubProvider::new(vec![]));
        let generator = Arc::new(StubGenerator::ok("unused"));

        let (status, body) = post_json(state(&provider, &generator), "{}").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());

        let (status, body) = post_json(state(&provider, &generator), "{not json").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());

        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_disabled_is_404_without_fallback() {
        let provider = Arc::new(StubProvider::new(vec![
            ("hi", Canned::Disabled),
            ("en", Canned::Segments(vec!["never"])),
        ]));
        let generator = Arc::new(StubGenerator::ok("unused"));

        let (status, body) = post_json(state(&provider, &generator), &format!(r#"{{"youtube_url": "{URL}"}}"#)).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains("disabled"));
        assert_eq!(provider.calls(), 1);
        assert_eq!(*provider.langs.lock().unwrap(), vec!["hi"]);
        assert_eq!(generator.calls(), 0);
    }

    #[tokio::test]
    async fn test_empty_transcript_skips_generation() {
        let provider = Arc::new(StubProvider::new(vec![
            ("hi", Canned::Segments(vec![])),
            ("en", Canned::Segments(vec![])),
        ]));
        let generator = Arc::new(StubGenerator::ok("unused"));

        let (status, body) = post_json(state(&provider, &generator), &format!(r#"{{"youtube_url": "{URL}"}}"#)).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains("No transcript"));
        assert_eq!(generator.calls(), 0);
    }

    #[tokio::test]
    async fn test_upstream_transcript_failure_is_500() {
        let provider = Arc::new(StubProvider::new(vec![("hi", Canned::Upstream)]));
        let generator = Arc::new(StubGenerator::ok("unused"));

        let (status, body) = post_json(state(&provider, &generator), &format!(r#"{{"youtube_url": "{URL}"}}"#)).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].as_str().unwrap().contains("try again"));
        assert!(!body["error"].as_str().unwrap().contains("429"));
        assert_eq!(generator.calls(), 0);
    }

    #[tokio::test]
    async fn test_generator_not_configured_is_500() {
        let provider = Arc::new(StubProvider::new(vec![("hi", Canned::Segments(vec!["text"]))]));
        let generator = Arc::new(StubGenerator::failing(|| GenerationError::NotConfigured {
            provider: "Gemini",
            env_var: "GEMINI_API_KEY",
        }));

        let (status, body) = post_json(state(&provider, &generator), &format!(r#"{{"youtube_url": "{URL}"}}"#)).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].as_str().unwrap().contains("not configured"));
    }

    #[tokio::test]
    async fn test_generator_remote_failure_includes_detail() {
        let provider = Arc::new(StubProvider::new(vec![("hi", Canned::Segments(vec!["text"]))]));
        let generator = Arc::new(StubGenerator::failing(|| {
            GenerationError::Remote("Gemini API returned 429: quota exhausted".to_string())
        }));

        let (status, body) = post_json(state(&provider, &generator), &format!(r#"{{"youtube_url": "{URL}"}}"#)).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].as_str().unwrap().contains("quota exhausted"));
        assert_eq!(generator.calls(), 1);
    }

    #[tokio::test]
    async fn test_index_and_healthz() {
        let provider = Arc::new(StubProvider::new(vec![]));
        let generator = Arc::new(StubGenerator::ok("unused"));
        let app = router(state(&provider, &generator));

        let resp = app
            .clone()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert!(String::from_utf8_lossy(&bytes).contains("/summarize"));

        let resp = app
            .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    /// Provider that never answers within the request deadline
    struct HangingProvider {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TranscriptProvider for HangingProvider {
        fn name(&self) -> &'static str {
            "hanging"
        }

        fn backend(&self) -> crate::Backend {
            crate::Backend::Mirror
        }

        async fn fetch_language(
            &self,
            _video_id: &crate::VideoId,
            _lang: &str,
        ) -> Result<Vec<crate::Segment>, TranscriptError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(vec![crate::Segment::new("too late")])
        }
    }

    #[tokio::test]
    async fn test_transcript_fetch_deadline_is_500() {
        let provider = Arc::new(HangingProvider {
            calls: AtomicUsize::new(0),
        });
        let generator = Arc::new(StubGenerator::ok("unused"));
        let state = AppState {
            transcripts: provider.clone(),
            generator: generator.clone(),
            languages: vec!["hi".to_string(), "en".to_string()].into(),
            transcript_timeout: Duration::from_millis(100),
        };

        let started = std::time::Instant::now();
        let (status, body) = post_json(state, &format!(r#"{{"youtube_url": "{URL}"}}"#)).await;

        assert!(started.elapsed() < Duration::from_secs(10));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].as_str().unwrap().contains("try again"));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
        assert_eq!(generator.calls(), 0);
    }
}
