use std::path::{Path, PathBuf};

use eyre::{Result, WrapErr, bail};
use log::{debug, warn};
use serde::Deserialize;

use crate::Backend;

pub const DEFAULT_BIND: &str = "127.0.0.1:5000";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash-latest";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub bind: String,
    pub backend: Backend,
    /// Caption languages in preference order; only the first two are tried
    pub languages: Vec<String>,
    pub model: String,
    /// Deadline for a whole transcript fetch; also caps each backend HTTP call
    pub transcript_timeout_secs: u64,
    pub generation_timeout_secs: u64,
    pub mirror: MirrorConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            backend: Backend::default(),
            languages: vec!["hi".to_string(), "en".to_string()],
            model: DEFAULT_MODEL.to_string(),
            transcript_timeout_secs: 15,
            generation_timeout_secs: 60,
            mirror: MirrorConfig::default(),
        }
    }
}

/// Everything specific to the transcript mirror site lives here
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MirrorConfig {
    /// Page URL with `{video_id}` and `{lang}` placeholders
    pub url_template: String,
    /// CSS selector for the element wrapping the transcript
    pub container: String,
    /// CSS selector, relative to the container, for each caption fragment
    pub segment: String,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            url_template: "https://youtubetotranscript.com/transcript?v={video_id}&current_language_code={lang}"
                .to_string(),
            container: "#transcript".to_string(),
            segment: "span.transcript-segment".to_string(),
        }
    }
}

impl Config {
    /// Load config from `path`, or ~/.config/ytsum/config.toml when `None`.
    ///
    /// Only the implicit default path may be missing; an explicit path must exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (config_path(), false),
        };
        if path.exists() {
            debug!("Loading config from {}", path.display());
            let content = std::fs::read_to_string(&path)
                .wrap_err_with(|| format!("reading config {}", path.display()))?;
            let config: Config =
                toml::from_str(&content).wrap_err_with(|| format!("parsing config {}", path.display()))?;
            Ok(config)
        } else if explicit {
            bail!("config file not found: {}", path.display());
        } else {
            debug!("No config file found at {}", path.display());
            Ok(Config::default())
        }
    }

    /// Like [`Config::load`], but logs and falls back to defaults on error
    pub fn load_or_default(path: Option<&Path>) -> Self {
        Self::load(path).unwrap_or_else(|e| {
            warn!("Ignoring config: {e:#}");
            Config::default()
        })
    }
}

pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from(".config"))
        .join("ytsum")
        .join("config.toml")
}
