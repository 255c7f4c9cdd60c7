use digest_core::SummaryResult;

/// Classified result of one fetch attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Body(String),
    Restricted(u16),
    HttpError(u16),
    TransportError(String),
}

impl FetchOutcome {
    pub fn into_result(self) -> Result<String, FetchError> {
        match self {
            FetchOutcome::Body(html) => Ok(html),
            FetchOutcome::Restricted(status) => Err(FetchError::Restricted(status)),
            FetchOutcome::HttpError(status) => Err(FetchError::HttpStatus(status)),
            FetchOutcome::TransportError(message) => Err(FetchError::Transport(message)),
        }
    }
}

impl From<Result<String, FetchError>> for FetchOutcome {
    fn from(result: Result<String, FetchError>) -> Self {
        match result {
            Ok(html) => FetchOutcome::Body(html),
            Err(FetchError::Restricted(status)) => FetchOutcome::Restricted(status),
            Err(FetchError::HttpStatus(status)) => FetchOutcome::HttpError(status),
            Err(FetchError::Transport(message)) => FetchOutcome::TransportError(message),
        }
    }
}

/// Per-item fetch failure. The message is what ends up in the report.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("accès restreint, HTTP {0}")]
    Restricted(u16),
    #[error("HTTP {0}")]
    HttpStatus(u16),
    #[error("erreur réseau : {0}")]
    Transport(String),
}

/// One finished unit of work, as delivered to the report consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedItem {
    /// Position of the URL in the work list.
    pub index: usize,
    pub url: String,
    pub result: SummaryResult,
}
