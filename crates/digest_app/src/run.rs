use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use chrono::Local;
use digest_engine::{
    collect_urls, write_url_list, CollectSettings, FetchSettings, ModelClient, OllamaClient,
    OllamaSettings, ParagraphExtractor, Pipeline, ReportWriter, ReqwestFetcher, Summarizer,
};
use engine_logging::{engine_error, engine_info, engine_warn};

use crate::config::RunConfig;

/// Collect, probe the model, then stream every summary into the report.
pub async fn run(config: &RunConfig, skip_preflight: bool) -> Result<()> {
    let collect_settings = CollectSettings {
        excluded_patterns: config.exclude.clone(),
    };
    let urls = collect_urls(&config.input_dir, &collect_settings)
        .with_context(|| format!("collecting links from {}", config.input_dir.display()))?;

    if urls.is_empty() {
        engine_warn!(
            "No article URL found in {:?}; no report written",
            config.input_dir
        );
        return Ok(());
    }

    if let Some(path) = &config.urls_out {
        let written = write_url_list(path, &urls)
            .with_context(|| format!("saving URL list to {}", path.display()))?;
        engine_info!("{} URL(s) saved to {:?}", urls.len(), written);
    }

    let client = OllamaClient::new(OllamaSettings {
        base_url: config.model_url.clone(),
        model: config.model.clone(),
        ..OllamaSettings::default()
    })
    .context("building model client")?;
    if skip_preflight {
        engine_info!("Model service preflight skipped");
    } else {
        preflight(&client, &config.model_url).await?;
    }

    let fetcher = ReqwestFetcher::new(FetchSettings {
        request_timeout: Duration::from_secs(config.timeout_secs.max(1)),
        ..FetchSettings::default()
    })
    .context("building HTTP client")?;
    let summarizer = Summarizer::new(Arc::new(client));
    let model_name = summarizer.model_name().to_string();
    let pipeline = Pipeline::new(
        Arc::new(fetcher),
        Arc::new(ParagraphExtractor::new(config.extract.clone())),
        Arc::new(summarizer),
        config.concurrency,
    );

    let mut writer = ReportWriter::create(&config.output, Local::now())
        .with_context(|| format!("creating report {}", config.output.display()))?;
    engine_info!(
        "Summarizing {} article(s) with {} ({} at a time) into {:?}",
        urls.len(),
        model_name,
        pipeline.concurrency(),
        writer.path()
    );

    let started = Instant::now();
    pipeline
        .run_into_report(urls, &mut writer)
        .await
        .context("writing report")?;
    let tally = writer.finish().context("finalizing report")?;

    engine_info!(
        "Done in {:.1?}: {} summarized, {} failed, {} total -> {:?}",
        started.elapsed(),
        tally.success_count,
        tally.error_count,
        tally.total,
        config.output
    );
    Ok(())
}

async fn preflight(client: &dyn ModelClient, base_url: &str) -> Result<()> {
    match client.health_check().await {
        Ok(()) => {
            engine_info!("Model service reachable at {}", base_url);
            Ok(())
        }
        Err(err) => {
            engine_error!(
                "Model service not reachable at {}: {}. Is it running? Try `ollama serve`.",
                base_url,
                err
            );
            bail!("model service preflight failed: {err}")
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::net::TcpListener;

    use tempfile::TempDir;

    use super::*;

    fn unreachable_url() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        format!("http://127.0.0.1:{port}")
    }

    #[tokio::test]
    async fn no_urls_means_no_report() {
        let temp = TempDir::new().unwrap();
        let input = temp.path().join("input");
        fs::create_dir(&input).unwrap();
        fs::write(
            input.join("page.html"),
            r#"<a href="https://techcafe.fr/x">exclu</a><a href="mailto:a@b.c">mail</a>"#,
        )
        .unwrap();
        let config = RunConfig {
            input_dir: input,
            output: temp.path().join("output.html"),
            model_url: unreachable_url(),
            ..RunConfig::default()
        };

        run(&config, false).await.unwrap();
        assert!(!config.output.exists());
    }

    #[tokio::test]
    async fn failed_preflight_aborts_before_the_report() {
        let temp = TempDir::new().unwrap();
        let input = temp.path().join("input");
        fs::create_dir(&input).unwrap();
        fs::write(input.join("page.html"), r#"<a href="https://a.example/">a</a>"#).unwrap();
        let config = RunConfig {
            input_dir: input,
            output: temp.path().join("output.html"),
            urls_out: Some(temp.path().join("urls.txt")),
            model_url: unreachable_url(),
            ..RunConfig::default()
        };

        let err = run(&config, false).await.unwrap_err();
        assert!(err.to_string().contains("preflight"));
        assert!(!config.output.exists());
        assert_eq!(
            fs::read_to_string(temp.path().join("urls.txt")).unwrap(),
            "https://a.example/\n"
        );
    }

    #[tokio::test]
    async fn missing_input_dir_is_an_error() {
        let temp = TempDir::new().unwrap();
        let config = RunConfig {
            input_dir: temp.path().join("nowhere"),
            ..RunConfig::default()
        };
        assert!(run(&config, true).await.is_err());
    }
}
