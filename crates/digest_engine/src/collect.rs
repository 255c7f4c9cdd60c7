use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use digest_core::{dedupe_preserving_order, normalize_url};
use engine_logging::{engine_debug, engine_info, engine_warn};
use scraper::{Html, Selector};

use crate::decode::{decode_html, decode_html_lossy};

#[derive(Debug, Clone, Default)]
pub struct CollectSettings {
    /// URLs containing any of these substrings are dropped from the work list.
    pub excluded_patterns: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum CollectError {
    #[error("cannot read input directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Build the work list from every HTML snapshot in `dir`.
///
/// Files are visited in file-name order. Links are normalized, deduplicated
/// (first occurrence wins) and filtered against the exclusion patterns.
/// Undecodable bytes are replaced rather than discarding the snapshot. A
/// snapshot that cannot be read contributes nothing; only an unreadable
/// directory is an error.
pub fn collect_urls(dir: &Path, settings: &CollectSettings) -> Result<Vec<String>, CollectError> {
    let mut snapshots: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(|source| CollectError::ReadDir {
            path: dir.to_path_buf(),
            source,
        })?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| is_html_file_name(path))
        .collect();
    snapshots.sort();

    let mut all_urls = Vec::new();
    for path in &snapshots {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) => {
                engine_warn!("Skipping {:?}: {}", path, err);
                continue;
            }
        };
        let html = match decode_html(&bytes, None) {
            Ok(decoded) => {
                engine_debug!("{:?} decoded as {}", path, decoded.encoding_label);
                decoded.html
            }
            Err(err) => {
                engine_warn!("{:?}: {}, decoding with replacement characters", path, err);
                decode_html_lossy(&bytes, None)
            }
        };
        let urls = extract_links(&html);
        engine_info!("{} URL(s) extracted from {:?}", urls.len(), path);
        all_urls.extend(urls);
    }

    let unique = dedupe_preserving_order(all_urls);
    let unique_count = unique.len();
    let kept: Vec<String> = unique
        .into_iter()
        .filter(|url| !is_excluded(url, &settings.excluded_patterns))
        .collect();
    engine_info!(
        "{} unique URL(s) collected from {:?}, {} after exclusions",
        unique_count,
        dir,
        kept.len()
    );
    Ok(kept)
}

/// Normalized absolute http(s) link targets of one document, in document order.
pub fn extract_links(html: &str) -> Vec<String> {
    let doc = Html::parse_document(html);
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };
    doc.select(&selector)
        .filter_map(|anchor| anchor.value().attr("href"))
        .filter(|href| is_followable(href))
        .map(normalize_url)
        .filter(|url| url.starts_with("http://") || url.starts_with("https://"))
        .collect()
}

fn is_followable(href: &str) -> bool {
    let lower = href.trim().to_ascii_lowercase();
    !(lower.is_empty()
        || lower.starts_with('#')
        || lower.starts_with("javascript:")
        || lower.starts_with("mailto:"))
}

fn is_excluded(url: &str, patterns: &[String]) -> bool {
    patterns
        .iter()
        .any(|pattern| !pattern.is_empty() && url.contains(pattern.as_str()))
}

fn is_html_file_name(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("html") || ext.eq_ignore_ascii_case("htm"))
}
