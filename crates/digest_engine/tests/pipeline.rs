use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Local;
use digest_core::{no_content_summary, SummaryResult, LOAD_ERROR_TITLE};
use digest_engine::{
    FetchOutcome, FetchSettings, Fetcher, ModelClient, OllamaClient, OllamaSettings,
    ParagraphExtractor, Pipeline, ReportWriter, ReqwestFetcher, SummarizeError, Summarizer,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn article(title: &str, paragraphs: &[&str]) -> String {
    let body: String = paragraphs.iter().map(|p| format!("<p>{p}</p>")).collect();
    format!("<html><head><title>{title}</title></head><body>{body}</body></html>")
}

/// Serves canned outcomes keyed by URL, optionally after a delay.
struct StubFetcher {
    pages: HashMap<String, FetchOutcome>,
    delay: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl StubFetcher {
    fn new(pages: HashMap<String, FetchOutcome>) -> Self {
        Self {
            pages,
            delay: Duration::ZERO,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl Fetcher for StubFetcher {
    async fn fetch(&self, url: &str) -> FetchOutcome {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.pages
            .get(url)
            .cloned()
            .unwrap_or(FetchOutcome::HttpError(404))
    }
}

struct PanickingFetcher;

#[async_trait]
impl Fetcher for PanickingFetcher {
    async fn fetch(&self, url: &str) -> FetchOutcome {
        if url.contains("boom") {
            panic!("fetcher exploded");
        }
        FetchOutcome::Body(article("Calme", &["Un paragraphe tranquille."]))
    }
}

/// Answers with a fixed sentence and counts calls.
struct CountingModel {
    calls: AtomicUsize,
    answer: Result<String, SummarizeError>,
}

impl CountingModel {
    fn answering(answer: &str) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            answer: Ok(answer.to_string()),
        }
    }

    fn failing(err: SummarizeError) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            answer: Err(err),
        }
    }
}

#[async_trait]
impl ModelClient for CountingModel {
    async fn chat(&self, _system: &str, _prompt: &str) -> Result<String, SummarizeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.answer.clone()
    }

    async fn health_check(&self) -> Result<(), SummarizeError> {
        Ok(())
    }

    fn model_name(&self) -> &str {
        "stub"
    }
}

fn pipeline(fetcher: Arc<dyn Fetcher>, model: Arc<CountingModel>, concurrency: usize) -> Pipeline {
    Pipeline::new(
        fetcher,
        Arc::new(ParagraphExtractor::default()),
        Arc::new(Summarizer::new(model)),
        concurrency,
    )
}

#[tokio::test]
async fn one_result_per_url_in_input_order() {
    let urls: Vec<String> = (0..8).map(|i| format!("https://site.example/{i}")).collect();
    let mut pages = HashMap::new();
    for (i, url) in urls.iter().enumerate() {
        if i % 3 == 0 {
            pages.insert(url.clone(), FetchOutcome::Restricted(403));
        } else {
            let title = format!("Article {i}");
            pages.insert(
                url.clone(),
                FetchOutcome::Body(article(&title, &["Un vrai paragraphe."])),
            );
        }
    }
    let model = Arc::new(CountingModel::answering("Cet article traite de tests."));
    let fetcher = Arc::new(StubFetcher::new(pages).with_delay(Duration::from_millis(5)));

    let results = pipeline(fetcher, model.clone(), 3).run(urls).await;

    assert_eq!(results.len(), 8);
    for (i, result) in results.iter().enumerate() {
        if i % 3 == 0 {
            assert_eq!(
                result,
                &SummaryResult::load_error("accès restreint, HTTP 403")
            );
        } else {
            assert_eq!(
                result,
                &SummaryResult::classify(format!("Article {i}"), "Cet article traite de tests.")
            );
        }
    }
    assert_eq!(model.calls.load(Ordering::SeqCst), 5);
}

#[tokio::test]
async fn empty_batch_yields_nothing() {
    let model = Arc::new(CountingModel::answering("x"));
    let fetcher = Arc::new(StubFetcher::new(HashMap::new()));
    let results = pipeline(fetcher, model, 5).run(Vec::new()).await;
    assert!(results.is_empty());
}

#[tokio::test]
async fn noise_only_page_skips_the_model() {
    let url = "https://noise.example/".to_string();
    let mut pages = HashMap::new();
    pages.insert(
        url.clone(),
        FetchOutcome::Body(article(
            "Bruit",
            &["Abonnez-vous à notre newsletter", "Follow us on social media"],
        )),
    );
    let model = Arc::new(CountingModel::answering("jamais"));
    let fetcher = Arc::new(StubFetcher::new(pages));

    let results = pipeline(fetcher, model.clone(), 2).run(vec![url]).await;

    assert_eq!(
        results,
        vec![SummaryResult::classify("Bruit", no_content_summary())]
    );
    assert!(!results[0].ok);
    assert_eq!(model.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn model_failure_keeps_title_and_reports_reason() {
    let url = "https://site.example/a".to_string();
    let mut pages = HashMap::new();
    pages.insert(
        url.clone(),
        FetchOutcome::Body(article("Un titre", &["Du contenu utile."])),
    );
    let model = Arc::new(CountingModel::failing(SummarizeError::EmptyResponse));
    let fetcher = Arc::new(StubFetcher::new(pages));

    let results = pipeline(fetcher, model, 1).run(vec![url]).await;

    assert_eq!(results[0].title, "Un titre");
    assert!(results[0].summary.starts_with("Résumé indisponible ("));
    assert!(!results[0].ok);
}

#[tokio::test]
async fn never_more_than_concurrency_items_in_flight() {
    let urls: Vec<String> = (0..12).map(|i| format!("https://slow.example/{i}")).collect();
    let pages = urls
        .iter()
        .map(|url| (url.clone(), FetchOutcome::HttpError(500)))
        .collect();
    let fetcher = Arc::new(StubFetcher::new(pages).with_delay(Duration::from_millis(20)));
    let model = Arc::new(CountingModel::answering("x"));

    let results = pipeline(fetcher.clone(), model, 3).run(urls).await;

    assert_eq!(results.len(), 12);
    let peak = fetcher.max_in_flight.load(Ordering::SeqCst);
    assert!(peak <= 3, "peak in-flight was {peak}");
    assert!(peak >= 2, "work never overlapped (peak {peak})");
}

#[tokio::test]
async fn zero_concurrency_is_clamped_to_one() {
    let model = Arc::new(CountingModel::answering("x"));
    let fetcher = Arc::new(StubFetcher::new(HashMap::new()));
    let pipeline = pipeline(fetcher, model, 0);
    assert_eq!(pipeline.concurrency(), 1);
    let results = pipeline.run(vec!["https://a.example/".to_string()]).await;
    assert_eq!(results, vec![SummaryResult::load_error("HTTP 404")]);
}

#[tokio::test]
async fn panicking_item_still_produces_a_result() {
    engine_logging::initialize_for_tests();
    let model = Arc::new(CountingModel::answering("Cet article traite du calme."));
    let urls = vec![
        "https://calm.example/1".to_string(),
        "https://boom.example/".to_string(),
        "https://calm.example/2".to_string(),
    ];

    let results = pipeline(Arc::new(PanickingFetcher), model, 2).run(urls).await;

    assert_eq!(results.len(), 3);
    assert!(results[0].ok);
    assert_eq!(results[1].title, LOAD_ERROR_TITLE);
    assert!(!results[1].ok);
    assert!(results[2].ok);
}

#[tokio::test]
async fn end_to_end_report_against_live_servers() {
    engine_logging::initialize_for_tests();
    let site = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ok"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html; charset=utf-8")
                .set_body_string(article(
                    "Page valide",
                    &[
                        "Premier paragraphe de contenu.",
                        "Deuxième paragraphe de contenu.",
                        "Troisième paragraphe de contenu.",
                    ],
                )),
        )
        .mount(&site)
        .await;
    Mock::given(method("GET"))
        .and(path("/forbidden"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&site)
        .await;

    let ollama = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "message": { "role": "assistant", "content": "  Cet article traite de contenu.  " },
            "done": true
        })))
        .expect(1)
        .mount(&ollama)
        .await;

    let fetcher = ReqwestFetcher::new(FetchSettings::default()).unwrap();
    let client = OllamaClient::new(OllamaSettings {
        base_url: ollama.uri(),
        model: "test-model".to_string(),
        ..OllamaSettings::default()
    })
    .unwrap();
    let pipeline = Pipeline::new(
        Arc::new(fetcher),
        Arc::new(ParagraphExtractor::default()),
        Arc::new(Summarizer::new(Arc::new(client))),
        5,
    );

    let temp = TempDir::new().unwrap();
    let report_path = temp.path().join("output.html");
    let mut writer = ReportWriter::create(&report_path, Local::now()).unwrap();
    let ok_url = format!("{}/ok", site.uri());
    let forbidden_url = format!("{}/forbidden", site.uri());

    pipeline
        .run_into_report(vec![ok_url.clone(), forbidden_url.clone()], &mut writer)
        .await
        .unwrap();
    let tally = writer.finish().unwrap();

    assert_eq!(tally.total, 2);
    assert_eq!(tally.success_count, 1);
    assert_eq!(tally.error_count, 1);

    let html = std::fs::read_to_string(&report_path).unwrap();
    assert!(html.contains(&format!(
        "<div class=\"article\">\n  <a href=\"{ok_url}\">Page valide</a>"
    )));
    assert!(html.contains("<span>Cet article traite de contenu.</span>"));
    assert!(html.contains(&format!(
        "<div class=\"article error\">\n  <a href=\"{forbidden_url}\">⚠️ Erreur de chargement</a>"
    )));
    assert!(html.contains("Résumé indisponible (accès restreint, HTTP 403)"));
}
