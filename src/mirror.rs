use async_trait::async_trait;
use eyre::eyre;
use log::debug;
use scraper::{Html, Selector};

use crate::config::MirrorConfig;
use crate::error::TranscriptError;
use crate::transcript::TranscriptProvider;
use crate::{Backend, Segment, VideoId};

/// Transcript scraped from a third-party mirror page.
///
/// All knowledge of the mirror's markup lives in [`MirrorConfig`].
pub struct MirrorProvider {
    client: reqwest::Client,
    url_template: String,
    container: Selector,
    segment: Selector,
}

impl MirrorProvider {
    pub fn new(client: reqwest::Client, config: MirrorConfig) -> eyre::Result<Self> {
        let container =
            Selector::parse(&config.container).map_err(|e| eyre!("invalid mirror container selector: {e:?}"))?;
        let segment =
            Selector::parse(&config.segment).map_err(|e| eyre!("invalid mirror segment selector: {e:?}"))?;
        Ok(Self {
            client,
            url_template: config.url_template,
            container,
            segment,
        })
    }

    fn page_url(&self, video_id: &VideoId, lang: &str) -> String {
        self.url_template
            .replace("{video_id}", video_id.as_str())
            .replace("{lang}", lang)
    }

    /// Text of every segment under the first matching container
    fn extract_segments(&self, html: &str) -> Option<Vec<Segment>> {
        let document = Html::parse_document(html);
        let container = document.select(&self.container).next()?;
        let segments: Vec<Segment> = container
            .select(&self.segment)
            .map(|el| el.text().collect::<String>())
            .map(|text| text.split_whitespace().collect::<Vec<_>>().join(" "))
            .filter(|text| !text.is_empty())
            .map(Segment::new)
            .collect();
        (!segments.is_empty()).then_some(segments)
    }
}

#[async_trait]
impl TranscriptProvider for MirrorProvider {
    fn name(&self) -> &'static str {
        "mirror"
    }

    fn backend(&self) -> Backend {
        Backend::Mirror
    }

    async fn fetch_language(&self, video_id: &VideoId, lang: &str) -> Result<Vec<Segment>, TranscriptError> {
        let url = self.page_url(video_id, lang);
        debug!("Fetching mirror page: {url}");

        let resp = self.client.get(&url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(TranscriptError::Upstream(format!("mirror returned {status} for {url}")));
        }
        let page_html = resp.text().await?;

        self.extract_segments(&page_html)
            .ok_or_else(|| TranscriptError::NotFound {
                video_id: video_id.to_string(),
                lang: lang.to_string(),
            })
    }
}
