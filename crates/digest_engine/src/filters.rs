use serde::Deserialize;

/// Boilerplate found across most publishers: consent banners, newsletter
/// prompts, social widgets, comment sections.
pub const NOISE_PHRASES: &[&str] = &[
    "cookie",
    "newsletter",
    "subscribe",
    "sign up",
    "digest",
    "privacy policy",
    "advertisement",
    "adblock",
    "accept cookies",
    "breaking bad",
    "comment",
    "related article",
    "get the verge",
    "connect with",
    "daily digest",
    "follow",
    "open in app",
];

const TECHCRUNCH_PHRASES: &[&str] = &[
    "latest news",
    "artificial intelligence",
    "amazon apps",
    "biotech",
    "climate",
    "cryptocurrency",
    "enterprise",
    "apps",
    "health",
    "tc+",
    "privacy",
    "advertising",
];

const THE_VERGE_PHRASES: &[&str] = &[
    "digest quotidien",
    "flux d’accueil",
    "daily digest",
    "articles de ce sujet",
    "articles de cet auteur",
    "s’abonner",
    "newsletter",
    "inscrivez-vous",
    "follow us",
    "subscribe",
    "sign up",
    "cookie",
    "privacy policy",
    "advertisement",
];

const BUILTIN_DOMAIN_FILTERS: &[(&str, &[&str])] = &[
    ("techcrunch.com", TECHCRUNCH_PHRASES),
    ("theverge.com", THE_VERGE_PHRASES),
];

/// Publisher-specific boilerplate, applied to pages served from `domain` or one of its subdomains.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DomainFilter {
    pub domain: String,
    pub phrases: Vec<String>,
}

impl DomainFilter {
    pub fn new(domain: impl Into<String>, phrases: &[&str]) -> Self {
        Self {
            domain: domain.into().to_lowercase(),
            phrases: phrases.iter().map(|p| p.to_lowercase()).collect(),
        }
    }

    pub fn matches_host(&self, host: &str) -> bool {
        host == self.domain
            || host
                .strip_suffix(self.domain.as_str())
                .is_some_and(|prefix| prefix.ends_with('.'))
    }
}

pub fn default_domain_filters() -> Vec<DomainFilter> {
    BUILTIN_DOMAIN_FILTERS
        .iter()
        .map(|(domain, phrases)| DomainFilter::new(*domain, phrases))
        .collect()
}

pub fn default_noise_phrases() -> Vec<String> {
    NOISE_PHRASES.iter().map(|p| p.to_string()).collect()
}

/// `true` when the lowercased paragraph contains any phrase.
pub(crate) fn contains_any(lowered: &str, phrases: &[String]) -> bool {
    phrases.iter().any(|phrase| lowered.contains(phrase.as_str()))
}
