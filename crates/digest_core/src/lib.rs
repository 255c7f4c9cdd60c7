//! Digest core: pure URL canonicalization and per-item result bookkeeping.
mod normalize;
mod result;

pub use normalize::{dedupe_preserving_order, normalize_url};
pub use result::{
    no_content_summary, unavailable, RunTally, SummaryResult, LOAD_ERROR_TITLE, MISSING_TITLE,
    UNAVAILABLE_PREFIX,
};
