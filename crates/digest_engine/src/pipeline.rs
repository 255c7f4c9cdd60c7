use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use digest_core::{no_content_summary, unavailable, RunTally, SummaryResult};
use engine_logging::{engine_error, engine_info, engine_warn};
use futures_util::FutureExt;
use tokio::sync::{mpsc, Semaphore};

use crate::extract::{ExtractedContent, ParagraphExtractor};
use crate::fetch::Fetcher;
use crate::report::{ReportError, ReportWriter};
use crate::summarize::Summarizer;
use crate::CompletedItem;

pub const DEFAULT_CONCURRENCY: usize = 5;

/// Fetch -> extract -> summarize for every URL of a batch, at most
/// `concurrency` items in flight.
///
/// Every input URL produces exactly one [`CompletedItem`]; failures at any
/// stage downgrade that item's result instead of aborting the batch.
#[derive(Clone)]
pub struct Pipeline {
    fetcher: Arc<dyn Fetcher>,
    extractor: Arc<ParagraphExtractor>,
    summarizer: Arc<Summarizer>,
    concurrency: usize,
}

impl Pipeline {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        extractor: Arc<ParagraphExtractor>,
        summarizer: Arc<Summarizer>,
        concurrency: usize,
    ) -> Self {
        Self {
            fetcher,
            extractor,
            summarizer,
            concurrency: concurrency.max(1),
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Start the batch and return the completion stream, in completion order.
    ///
    /// Must be called from within a tokio runtime. The channel closes once
    /// every item has been delivered.
    pub fn dispatch(&self, urls: Vec<String>) -> mpsc::UnboundedReceiver<CompletedItem> {
        let (tx, rx) = mpsc::unbounded_channel();
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let pipeline = self.clone();

        tokio::spawn(async move {
            for (index, url) in urls.into_iter().enumerate() {
                let permit = match semaphore.clone().acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        let result = SummaryResult::load_error("file de traitement fermée");
                        let _ = tx.send(CompletedItem { index, url, result });
                        continue;
                    }
                };
                let pipeline = pipeline.clone();
                let tx = tx.clone();
                tokio::spawn(async move {
                    let result = pipeline.process_guarded(&url).await;
                    drop(permit);
                    let _ = tx.send(CompletedItem { index, url, result });
                });
            }
        });

        rx
    }

    /// Run the batch and return one result per URL, in input order.
    pub async fn run(&self, urls: Vec<String>) -> Vec<SummaryResult> {
        let total = urls.len();
        let mut slots: Vec<Option<SummaryResult>> = vec![None; total];
        let mut rx = self.dispatch(urls);
        while let Some(item) = rx.recv().await {
            if let Some(slot) = slots.get_mut(item.index) {
                *slot = Some(item.result);
            }
        }
        slots
            .into_iter()
            .map(|slot| slot.unwrap_or_else(|| SummaryResult::load_error("résultat perdu")))
            .collect()
    }

    /// Run the batch, appending each result to `writer` as soon as it completes.
    ///
    /// The caller remains responsible for finishing the writer.
    pub async fn run_into_report(
        &self,
        urls: Vec<String>,
        writer: &mut ReportWriter,
    ) -> Result<RunTally, ReportError> {
        let total = urls.len();
        let mut rx = self.dispatch(urls);
        let mut done = 0;
        while let Some(item) = rx.recv().await {
            done += 1;
            let marker = if item.result.ok { "ok" } else { "erreur" };
            engine_info!("({}/{}) [{}] {}", done, total, marker, item.url);
            writer.append(&item.url, &item.result)?;
        }
        Ok(writer.tally())
    }

    /// Process a single URL. Never panics past this point.
    pub async fn process_guarded(&self, url: &str) -> SummaryResult {
        match AssertUnwindSafe(self.process(url)).catch_unwind().await {
            Ok(result) => result,
            Err(_) => {
                engine_error!("{}: processing panicked", url);
                SummaryResult::load_error("erreur interne")
            }
        }
    }

    async fn process(&self, url: &str) -> SummaryResult {
        let outcome = self.fetcher.fetch(url).await;
        let content = match self.extractor.extract(url, outcome) {
            Ok(content) => content,
            Err(err) => {
                let placeholder = ExtractedContent::load_error();
                return SummaryResult::classify(placeholder.title, unavailable(err));
            }
        };

        if content.text.is_empty() {
            engine_info!("{}: no paragraph survived filtering", url);
            return SummaryResult::classify(content.title, no_content_summary());
        }

        match self.summarizer.summarize(&content.title, &content.text).await {
            Ok(summary) => SummaryResult::classify(content.title, summary),
            Err(err) => {
                engine_warn!("{}: summarization failed: {}", url, err);
                SummaryResult::classify(content.title, unavailable(err))
            }
        }
    }
}
