use digest_core::{LOAD_ERROR_TITLE, MISSING_TITLE};
use scraper::{ElementRef, Html, Selector};
use serde::Deserialize;
use url::Url;

use crate::filters::{contains_any, default_domain_filters, default_noise_phrases, DomainFilter};
use crate::{FetchError, FetchOutcome};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedContent {
    pub title: String,
    /// Empty when no paragraph survived filtering.
    pub text: String,
}

impl ExtractedContent {
    /// Placeholder content for a page that could not be loaded.
    pub fn load_error() -> Self {
        Self {
            title: LOAD_ERROR_TITLE.to_string(),
            text: String::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExtractSettings {
    pub max_paragraphs: usize,
    /// Upper bound on the text handed to the model, in characters.
    pub max_chars: usize,
    pub noise_phrases: Vec<String>,
    pub domain_filters: Vec<DomainFilter>,
}

impl Default for ExtractSettings {
    fn default() -> Self {
        Self {
            max_paragraphs: 10,
            max_chars: 8_000,
            noise_phrases: default_noise_phrases(),
            domain_filters: default_domain_filters(),
        }
    }
}

/// Title plus the first clean paragraphs of a page.
///
/// Paragraphs go through two filters: the generic noise list, then the
/// phrases of the first domain filter whose domain serves the URL.
#[derive(Debug, Clone)]
pub struct ParagraphExtractor {
    settings: ExtractSettings,
}

impl Default for ParagraphExtractor {
    fn default() -> Self {
        Self::new(ExtractSettings::default())
    }
}

impl ParagraphExtractor {
    pub fn new(mut settings: ExtractSettings) -> Self {
        lowercase_all(&mut settings.noise_phrases);
        for filter in &mut settings.domain_filters {
            filter.domain = filter.domain.to_lowercase();
            lowercase_all(&mut filter.phrases);
        }
        Self { settings }
    }

    /// Short-circuits any non-`Body` outcome into its fetch error.
    pub fn extract(&self, url: &str, outcome: FetchOutcome) -> Result<ExtractedContent, FetchError> {
        let html = outcome.into_result()?;
        Ok(self.extract_html(url, &html))
    }

    pub fn extract_html(&self, url: &str, html: &str) -> ExtractedContent {
        let doc = Html::parse_document(html);
        let title = first_text(&doc, "title")
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| MISSING_TITLE.to_string());

        let domain_phrases = self.domain_phrases(url);
        let paragraphs: Vec<String> = select_all(&doc, "p")
            .into_iter()
            .map(|p| collapse_whitespace(&element_text(p)))
            .filter(|p| !p.is_empty())
            .filter(|p| {
                let lowered = p.to_lowercase();
                !contains_any(&lowered, &self.settings.noise_phrases)
                    && !domain_phrases.is_some_and(|phrases| contains_any(&lowered, phrases))
            })
            .take(self.settings.max_paragraphs)
            .collect();

        let text = truncate_chars(paragraphs.join(" "), self.settings.max_chars);
        ExtractedContent { title, text }
    }

    fn domain_phrases(&self, url: &str) -> Option<&[String]> {
        let host = Url::parse(url).ok()?.host_str()?.to_lowercase();
        self.settings
            .domain_filters
            .iter()
            .find(|filter| filter.matches_host(&host))
            .map(|filter| filter.phrases.as_slice())
    }
}

fn lowercase_all(phrases: &mut [String]) {
    for phrase in phrases.iter_mut() {
        *phrase = phrase.to_lowercase();
    }
}

fn select_all<'a>(doc: &'a Html, css: &str) -> Vec<ElementRef<'a>> {
    match Selector::parse(css) {
        Ok(selector) => doc.select(&selector).collect(),
        Err(_) => Vec::new(),
    }
}

fn first_text(doc: &Html, css: &str) -> Option<String> {
    select_all(doc, css)
        .into_iter()
        .next()
        .map(|node| collapse_whitespace(&element_text(node)))
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn truncate_chars(mut text: String, max_chars: usize) -> String {
    if let Some((idx, _)) = text.char_indices().nth(max_chars) {
        text.truncate(idx);
        let trimmed_len = text.trim_end().len();
        text.truncate(trimmed_len);
    }
    text
}
