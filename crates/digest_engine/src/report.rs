use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use digest_core::{RunTally, SummaryResult, LOAD_ERROR_TITLE};
use engine_logging::engine_error;

use crate::persist::{ensure_output_dir, PersistError};

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("cannot write report {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot prepare report directory: {0}")]
    OutputDir(#[from] PersistError),
}

const STYLE: &str = r#"  <style>
    body {
      font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, Arial, sans-serif;
      margin: 40px auto;
      max-width: 900px;
      line-height: 1.6;
      color: #212529;
    }
    h1 {
      text-align: center;
      color: #004085;
      border-bottom: 2px solid #004085;
      padding-bottom: 10px;
    }
    .meta {
      text-align: center;
      font-size: 0.9em;
      color: #666;
      margin-bottom: 40px;
    }
    .article {
      margin-bottom: 20px;
      padding: 12px;
      border-left: 4px solid #004085;
      background: #f8f9fa;
      border-radius: 6px;
    }
    .error {
      border-left-color: #d9534f;
      background: #fdf2f2;
    }
    a {
      font-weight: bold;
      color: #004085;
      text-decoration: none;
    }
    a:hover {
      text-decoration: underline;
    }
  </style>
"#;

/// Incrementally written HTML report.
///
/// The header is written on creation and every [`append`](Self::append) is
/// flushed straight to disk, so the file stays an openable document if the
/// run dies halfway. The footer is written by [`finish`](Self::finish), or by
/// `Drop` when the writer goes away unfinished.
#[derive(Debug)]
pub struct ReportWriter {
    path: PathBuf,
    file: Option<File>,
    tally: RunTally,
}

impl ReportWriter {
    /// Create (or truncate) the report and write its header.
    pub fn create(path: &Path, generated_at: DateTime<Local>) -> Result<Self, ReportError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            ensure_output_dir(parent)?;
        }
        let file = File::create(path).map_err(|source| ReportError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut writer = Self {
            path: path.to_path_buf(),
            file: Some(file),
            tally: RunTally::new(),
        };
        writer.write(&render_header(generated_at))?;
        Ok(writer)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn tally(&self) -> RunTally {
        self.tally
    }

    /// Write one fragment and count it.
    pub fn append(&mut self, url: &str, result: &SummaryResult) -> Result<(), ReportError> {
        self.write(&render_fragment(url, result))?;
        self.tally.record(result);
        Ok(())
    }

    /// Write the tally footer and close the document.
    pub fn finish(mut self) -> Result<RunTally, ReportError> {
        self.finalize()?;
        Ok(self.tally)
    }

    fn finalize(&mut self) -> Result<(), ReportError> {
        if self.file.is_none() {
            return Ok(());
        }
        let footer = render_footer(&self.tally);
        self.write(&footer)?;
        self.file = None;
        Ok(())
    }

    fn write(&mut self, chunk: &str) -> Result<(), ReportError> {
        let Some(file) = self.file.as_mut() else {
            return Ok(());
        };
        file.write_all(chunk.as_bytes())
            .and_then(|_| file.flush())
            .map_err(|source| ReportError::Io {
                path: self.path.clone(),
                source,
            })
    }
}

impl Drop for ReportWriter {
    fn drop(&mut self) {
        if let Err(err) = self.finalize() {
            engine_error!("Failed to finalize report: {}", err);
        }
    }
}

fn render_header(generated_at: DateTime<Local>) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"fr\">\n<head>\n  <meta charset=\"UTF-8\">\n  \
<title>Résumés d’articles - {date}</title>\n{STYLE}</head>\n<body>\n  \
<h1>Résumés d’articles</h1>\n  <div class=\"meta\">Généré le {stamp}</div>\n",
        date = generated_at.format("%d/%m/%Y"),
        stamp = generated_at.format("%d/%m/%Y à %H:%M"),
    )
}

fn render_fragment(url: &str, result: &SummaryResult) -> String {
    let (class, label) = if result.ok {
        ("article", escape_html(&result.title))
    } else if result.title.is_empty() || result.title == LOAD_ERROR_TITLE {
        ("article error", format!("⚠️ {}", LOAD_ERROR_TITLE))
    } else {
        ("article error", format!("⚠️ {}", escape_html(&result.title)))
    };
    format!(
        "\n<div class=\"{class}\">\n  <a href=\"{href}\">{label}</a><br />\n  <span>{summary}</span>\n</div>\n",
        href = escape_html(url),
        summary = escape_html(&result.summary),
    )
}

fn render_footer(tally: &RunTally) -> String {
    format!(
        "\n<hr />\n<p><strong>Synthèse du traitement</strong><br />\n\
✅ Articles traités avec succès : {}<br />\n\
⚠️ Erreurs de chargement ou résumé : {}<br />\n\
📄 Total d’articles analysés : {}\n</p>\n</body>\n</html>\n",
        tally.success_count, tally.error_count, tally.total
    )
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::escape_html;

    #[test]
    fn markup_characters_are_escaped() {
        assert_eq!(
            escape_html(r#"<a href="x">Tom & Jerry's</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; Jerry&#39;s&lt;/a&gt;"
        );
    }
}
