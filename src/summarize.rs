use std::time::Duration;

use async_trait::async_trait;
use log::debug;

use crate::Transcript;
use crate::error::GenerationError;

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";

const PROMPT_TEMPLATE: &str = "\
You are an expert content summarizer. Turn the following YouTube video transcript into an engaging \
summary that reads like a well-written article rather than a spoken transcript.

Instructions:
1. Keep it concise: short paragraphs that follow the flow of the video, while keeping every fact, \
name, number and point the transcript mentions. Do not leave anything out and do not invent anything.
2. Make it engaging: use a friendly, lively tone. A few relevant emojis are welcome.
3. Format with Markdown:
   - Use very few headings (`#`, `##`), only where the topic clearly changes.
   - Use `**bold text**` sparingly, only for the most important terms or conclusions.
   - Use bullet points (`-`) where a list reads better than prose.

Here is the transcript:
---
{transcript}
---

Now write the short, engaging, Markdown-formatted summary.";

/// Build the summarization prompt for a transcript
pub fn build_prompt(transcript: &Transcript) -> String {
    PROMPT_TEMPLATE.replace("{transcript}", &transcript.text())
}

/// Hosted LLM API family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Gemini,
    Anthropic,
    OpenAi,
}

impl Provider {
    /// Pick the provider from the model name
    pub fn for_model(model: &str) -> Self {
        if model.starts_with("claude") {
            Provider::Anthropic
        } else if ["gpt", "o1", "o3", "o4"].iter().any(|p| model.starts_with(p)) {
            Provider::OpenAi
        } else {
            Provider::Gemini
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Provider::Gemini => "Gemini",
            Provider::Anthropic => "Anthropic",
            Provider::OpenAi => "OpenAI",
        }
    }

    pub fn env_var(&self) -> &'static str {
        match self {
            Provider::Gemini => "GEMINI_API_KEY",
            Provider::Anthropic => "ANTHROPIC_API_KEY",
            Provider::OpenAi => "OPENAI_API_KEY",
        }
    }
}

/// Everything the generator client needs, resolved once at startup
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub provider: Provider,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl GeneratorConfig {
    /// Resolve the provider for `model` and read its API key from the environment
    pub fn from_env(model: &str, timeout: Duration) -> Self {
        let provider = Provider::for_model(model);
        Self {
            provider,
            model: model.to_string(),
            api_key: std::env::var(provider.env_var()).ok(),
            timeout,
        }
    }
}

/// Turns a prompt into markdown
#[async_trait]
pub trait SummaryGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

/// Generator backed by a hosted LLM API
pub struct LlmClient {
    client: reqwest::Client,
    provider: Provider,
    model: String,
    api_key: Option<String>,
}

impl LlmClient {
    pub fn new(config: GeneratorConfig) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        let api_key = config.api_key.map(|k| k.trim().to_string()).filter(|k| !k.is_empty());
        Ok(Self {
            client,
            provider: config.provider,
            model: config.model,
            api_key,
        })
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    async fn generate_gemini(&self, api_key: &str, prompt: &str) -> Result<String, GenerationError> {
        let url = format!("{GEMINI_API_BASE}/{}:generateContent", self.model);
        let body = serde_json::json!({
            "contents": [
                {
                    "role": "user",
                    "parts": [{"text": prompt}]
                }
            ]
        });

        let resp = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await?;

        let json = read_json(resp, self.provider).await?;
        extract_gemini_text(&json)
    }

    async fn generate_anthropic(&self, api_key: &str, prompt: &str) -> Result<String, GenerationError> {
        let body = serde_json::json!({
            "model": self.model,
            "max_tokens": 4096,
            "messages": [
                {
                    "role": "user",
                    "content": prompt
                }
            ]
        });

        let resp = self
            .client
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&body)
            .send()
            .await?;

        let json = read_json(resp, self.provider).await?;
        extract_anthropic_text(&json)
    }

    async fn generate_openai(&self, api_key: &str, prompt: &str) -> Result<String, GenerationError> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                {
                    "role": "user",
                    "content": prompt
                }
            ]
        });

        let resp = self
            .client
            .post(OPENAI_API_URL)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        let json = read_json(resp, self.provider).await?;
        extract_openai_text(&json)
    }
}

#[async_trait]
impl SummaryGenerator for LlmClient {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let api_key = self.api_key.as_deref().ok_or(GenerationError::NotConfigured {
            provider: self.provider.name(),
            env_var: self.provider.env_var(),
        })?;

        debug!("Summarizing via {} API with model {}", self.provider.name(), self.model);

        match self.provider {
            Provider::Gemini => self.generate_gemini(api_key, prompt).await,
            Provider::Anthropic => self.generate_anthropic(api_key, prompt).await,
            Provider::OpenAi => self.generate_openai(api_key, prompt).await,
        }
    }
}

async fn read_json(resp: reqwest::Response, provider: Provider) -> Result<serde_json::Value, GenerationError> {
    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        return Err(GenerationError::Remote(format!(
            "{} API returned {status}: {body}",
            provider.name()
        )));
    }
    Ok(resp.json().await?)
}

fn extract_gemini_text(json: &serde_json::Value) -> Result<String, GenerationError> {
    if let Some(parts) = json
        .get("candidates")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("content"))
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.as_array())
    {
        let text: String = parts
            .iter()
            .filter_map(|part| part.get("text")?.as_str())
            .collect::<Vec<_>>()
            .join("");
        if !text.trim().is_empty() {
            return Ok(text);
        }
    }

    let reason = json
        .get("promptFeedback")
        .and_then(|f| f.get("blockReason"))
        .and_then(|r| r.as_str())
        .or_else(|| {
            json.get("candidates")
                .and_then(|c| c.get(0))
                .and_then(|c| c.get("finishReason"))
                .and_then(|r| r.as_str())
        });
    match reason {
        Some(reason) => Err(GenerationError::Remote(format!("Gemini returned no text ({reason})"))),
        None => Err(GenerationError::Remote("unexpected Gemini API response format".to_string())),
    }
}

fn extract_anthropic_text(json: &serde_json::Value) -> Result<String, GenerationError> {
    if let Some(content) = json.get("content").and_then(|c| c.as_array()) {
        let text: String = content
            .iter()
            .filter_map(|block| {
                if block.get("type")?.as_str()? == "text" {
                    block.get("text")?.as_str().map(|s| s.to_string())
                } else {
                    None
                }
            })
            .collect::<Vec<_>>()
            .join("");
        if !text.is_empty() {
            return Ok(text);
        }
    }
    Err(GenerationError::Remote("unexpected Anthropic API response format".to_string()))
}

fn extract_openai_text(json: &serde_json::Value) -> Result<String, GenerationError> {
    if let Some(text) = json
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|t| t.as_str())
    {
        return Ok(text.to_string());
    }
    Err(GenerationError::Remote("unexpected OpenAI API response format".to_string()))
}
