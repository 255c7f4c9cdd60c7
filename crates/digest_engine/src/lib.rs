//! Digest engine: snapshot collection, fetching, extraction, summarization
//! and incremental report writing.
mod collect;
mod decode;
mod extract;
mod fetch;
mod filters;
mod model;
mod persist;
mod pipeline;
mod report;
mod summarize;
mod types;

pub use collect::{collect_urls, extract_links, CollectError, CollectSettings};
pub use decode::{decode_html, decode_html_lossy, DecodeError, DecodedHtml};
pub use extract::{ExtractSettings, ExtractedContent, ParagraphExtractor};
pub use fetch::{FetchSettings, Fetcher, FetcherInitError, ReqwestFetcher};
pub use filters::{default_domain_filters, default_noise_phrases, DomainFilter, NOISE_PHRASES};
pub use model::{
    ModelClient, OllamaClient, OllamaSettings, SummarizeError, DEFAULT_MODEL, DEFAULT_MODEL_URL,
};
pub use persist::{ensure_output_dir, write_url_list, AtomicFileWriter, PersistError};
pub use pipeline::{Pipeline, DEFAULT_CONCURRENCY};
pub use report::{ReportError, ReportWriter};
pub use summarize::{build_prompt, system_instruction, Summarizer};
pub use types::{CompletedItem, FetchError, FetchOutcome};
