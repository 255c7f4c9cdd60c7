use std::collections::HashSet;

use percent_encoding::percent_decode_str;
use url::{form_urlencoded, Url};

/// Host/path prefixes of links that wrap the real destination in a `q` parameter.
const REDIRECT_WRAPPERS: &[(&str, &str)] = &[("google.", "/url")];

/// Exact query keys dropped during normalization. Any `utm_*` key is dropped too.
const TRACKING_PARAMS: &[&str] = &[
    "fbclid", "gclid", "mc_cid", "mc_eid", "ref", "sa", "source", "ust", "usg",
];

/// Upper bound on decode/strip passes.
const MAX_PASSES: usize = 8;

/// Canonicalize a raw href harvested from a snapshot.
///
/// Percent-decodes, unwraps redirect-wrapper links, repairs doubled schemes and
/// strips tracking parameters, repeating until the result is stable so that
/// normalizing an already normalized URL returns it unchanged. Never fails:
/// input that does not parse as an absolute URL comes back decoded and trimmed.
pub fn normalize_url(raw: &str) -> String {
    let mut current = normalize_once(raw);
    for _ in 1..MAX_PASSES {
        let next = normalize_once(&current);
        if next == current {
            break;
        }
        current = next;
    }
    current
}

/// Remove repeated URLs, keeping the first occurrence of each.
pub fn dedupe_preserving_order(urls: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::with_capacity(urls.len());
    urls.into_iter()
        .filter(|url| seen.insert(url.clone()))
        .collect()
}

fn normalize_once(raw: &str) -> String {
    let decoded = percent_decode_str(raw.trim())
        .decode_utf8_lossy()
        .into_owned();
    let unwrapped = unwrap_redirect(&decoded).unwrap_or(decoded);
    let repaired = collapse_doubled_scheme(&unwrapped);

    match Url::parse(&repaired) {
        Ok(url) => strip_tracking(url).to_string(),
        Err(_) => repaired,
    }
}

fn unwrap_redirect(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?.to_ascii_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);
    let wrapped = REDIRECT_WRAPPERS
        .iter()
        .any(|(prefix, path)| host.starts_with(prefix) && parsed.path() == *path);
    if !wrapped {
        return None;
    }
    parsed
        .query_pairs()
        .find(|(key, _)| key == "q")
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn collapse_doubled_scheme(url: &str) -> String {
    let mut current = url;
    loop {
        let inner = ["https://", "http://"]
            .iter()
            .find_map(|scheme| current.strip_prefix(scheme))
            .filter(|rest| rest.starts_with("https://") || rest.starts_with("http://"));
        match inner {
            Some(rest) => current = rest,
            None => return current.to_string(),
        }
    }
}

/// Drops tracking and repeated keys. Kept segments are copied verbatim so
/// their escaping survives.
fn strip_tracking(mut url: Url) -> Url {
    let Some(query) = url.query() else {
        return url;
    };

    let mut seen_keys: Vec<String> = Vec::new();
    let mut kept: Vec<&str> = Vec::new();
    for segment in query.split('&').filter(|segment| !segment.is_empty()) {
        let key = segment_key(segment);
        if is_tracking_param(&key) || seen_keys.contains(&key) {
            continue;
        }
        seen_keys.push(key);
        kept.push(segment);
    }
    let rebuilt = kept.join("&");

    if rebuilt.is_empty() {
        url.set_query(None);
    } else {
        url.set_query(Some(&rebuilt));
    }
    url
}

fn segment_key(segment: &str) -> String {
    form_urlencoded::parse(segment.as_bytes())
        .next()
        .map(|(key, _)| key.into_owned())
        .unwrap_or_default()
}

fn is_tracking_param(key: &str) -> bool {
    key.starts_with("utm_") || TRACKING_PARAMS.contains(&key)
}
