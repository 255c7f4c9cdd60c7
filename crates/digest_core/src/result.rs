/// Title given to items whose page could not be loaded.
pub const LOAD_ERROR_TITLE: &str = "Erreur de chargement";

/// Title used when a page has no `<title>` element.
pub const MISSING_TITLE: &str = "Titre non trouvé";

/// Prefix shared by every diagnostic that stands in for a summary.
pub const UNAVAILABLE_PREFIX: &str = "Résumé indisponible";

/// Build a diagnostic summary embedding the failure reason.
pub fn unavailable(reason: impl std::fmt::Display) -> String {
    format!("{UNAVAILABLE_PREFIX} ({reason})")
}

/// Summary substituted when no paragraph survived extraction.
pub fn no_content_summary() -> String {
    unavailable("aucun texte détecté")
}

/// The only per-item value that leaves the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryResult {
    pub title: String,
    pub summary: String,
    pub ok: bool,
}

impl SummaryResult {
    /// Classify a title/summary pair: load-error titles and diagnostic
    /// summaries are failures, anything else is a success.
    pub fn classify(title: impl Into<String>, summary: impl Into<String>) -> Self {
        let title = title.into();
        let summary = summary.into();
        let ok = title != LOAD_ERROR_TITLE && !summary.starts_with(UNAVAILABLE_PREFIX);
        Self { title, summary, ok }
    }

    /// Result for an item whose page never produced content.
    pub fn load_error(reason: impl std::fmt::Display) -> Self {
        Self::classify(LOAD_ERROR_TITLE, unavailable(reason))
    }
}

/// Running success/error counters for one batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunTally {
    pub total: usize,
    pub success_count: usize,
    pub error_count: usize,
}

impl RunTally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, result: &SummaryResult) {
        self.total += 1;
        if result.ok {
            self.success_count += 1;
        } else {
            self.error_count += 1;
        }
    }

    /// `success_count + error_count == total`.
    pub fn is_balanced(&self) -> bool {
        self.success_count + self.error_count == self.total
    }
}
