use std::time::Duration;

use engine_logging::{engine_debug, engine_info, engine_warn};
use futures_util::StreamExt;
use reqwest::header::{
    HeaderMap, HeaderValue, InvalidHeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE, REFERER,
    USER_AGENT,
};
use reqwest::StatusCode;

use crate::decode::decode_html_lossy;
use crate::{FetchError, FetchOutcome};

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const DEFAULT_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub redirect_limit: usize,
    pub max_bytes: u64,
    /// Source sites are untrusted but reachable; certificates are not checked by default.
    pub accept_invalid_certs: bool,
    pub user_agent: String,
    pub accept_language: String,
    pub referer: String,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(20),
            redirect_limit: 5,
            max_bytes: 5 * 1024 * 1024,
            accept_invalid_certs: true,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept_language: "fr-FR,fr;q=0.9,en-US;q=0.8,en;q=0.7".to_string(),
            referer: "https://www.google.com/".to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FetcherInitError {
    #[error("invalid value for header {name}: {source}")]
    InvalidHeader {
        name: &'static str,
        #[source]
        source: InvalidHeaderValue,
    },
    #[error("failed to build http client: {0}")]
    Client(#[from] reqwest::Error),
}

#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    /// Single GET attempt, classified. Never retries.
    async fn fetch(&self, url: &str) -> FetchOutcome;
}

#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    client: reqwest::Client,
    settings: FetchSettings,
}

impl ReqwestFetcher {
    pub fn new(settings: FetchSettings) -> Result<Self, FetcherInitError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, header_value("user-agent", &settings.user_agent)?);
        headers.insert(
            ACCEPT_LANGUAGE,
            header_value("accept-language", &settings.accept_language)?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static(DEFAULT_ACCEPT));
        headers.insert(REFERER, header_value("referer", &settings.referer)?);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .redirect(reqwest::redirect::Policy::limited(settings.redirect_limit))
            .danger_accept_invalid_certs(settings.accept_invalid_certs)
            .build()?;

        Ok(Self { client, settings })
    }

    async fn try_fetch(&self, url: &str) -> Result<String, FetchError> {
        let parsed = reqwest::Url::parse(url)
            .map_err(|err| FetchError::Transport(format!("URL invalide ({err})")))?;

        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(FetchError::Restricted(status.as_u16()));
        }
        if status != StatusCode::OK {
            return Err(FetchError::HttpStatus(status.as_u16()));
        }

        let max_bytes = self.settings.max_bytes;
        if let Some(content_len) = response.content_length() {
            if content_len > max_bytes {
                return Err(too_large(content_len, max_bytes));
            }
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            let next_len = bytes.len() as u64 + chunk.len() as u64;
            if next_len > max_bytes {
                return Err(too_large(next_len, max_bytes));
            }
            bytes.extend_from_slice(&chunk);
        }

        engine_debug!("{} -> {} bytes", url, bytes.len());
        Ok(decode_html_lossy(&bytes, content_type.as_deref()))
    }
}

#[async_trait::async_trait]
impl Fetcher for ReqwestFetcher {
    async fn fetch(&self, url: &str) -> FetchOutcome {
        let result = self.try_fetch(url).await;
        match &result {
            Ok(_) => {}
            Err(FetchError::Restricted(status)) => {
                engine_info!("{} -> HTTP {} (accès restreint)", url, status);
            }
            Err(err) => engine_warn!("{} -> {}", url, err),
        }
        FetchOutcome::from(result)
    }
}

fn header_value(name: &'static str, value: &str) -> Result<HeaderValue, FetcherInitError> {
    HeaderValue::from_str(value).map_err(|source| FetcherInitError::InvalidHeader { name, source })
}

fn too_large(actual: u64, max_bytes: u64) -> FetchError {
    FetchError::Transport(format!(
        "réponse trop volumineuse ({actual} octets, max {max_bytes})"
    ))
}

fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        return FetchError::Transport(format!("délai dépassé ({err})"));
    }
    if err.is_redirect() {
        return FetchError::Transport(format!("trop de redirections ({err})"));
    }
    FetchError::Transport(err.to_string())
}
