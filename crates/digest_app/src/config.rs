use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use digest_engine::{ExtractSettings, DEFAULT_CONCURRENCY, DEFAULT_MODEL, DEFAULT_MODEL_URL};
use serde::Deserialize;

use crate::cli::Cli;

const DEFAULT_EXCLUSIONS: &[&str] = &["techcafe.fr", "guillaumevende.fr"];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ron::error::SpannedError,
    },
}

/// Everything one run needs. Missing fields in a config file take their defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub input_dir: PathBuf,
    pub output: PathBuf,
    pub concurrency: usize,
    pub timeout_secs: u64,
    /// URL substrings never fetched.
    pub exclude: Vec<String>,
    pub model_url: String,
    pub model: String,
    pub urls_out: Option<PathBuf>,
    pub log_file: Option<PathBuf>,
    pub extract: ExtractSettings,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("input"),
            output: PathBuf::from("output.html"),
            concurrency: DEFAULT_CONCURRENCY,
            timeout_secs: 20,
            exclude: DEFAULT_EXCLUSIONS.iter().map(|p| p.to_string()).collect(),
            model_url: DEFAULT_MODEL_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            urls_out: None,
            log_file: None,
            extract: ExtractSettings::default(),
        }
    }
}

impl RunConfig {
    /// Defaults, or the given RON file on top of them.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        ron::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Command-line flags win over the file. `--exclude` adds to the list.
    pub fn with_overrides(mut self, cli: &Cli) -> Self {
        if let Some(input) = &cli.input {
            self.input_dir = input.clone();
        }
        if let Some(output) = &cli.output {
            self.output = output.clone();
        }
        if let Some(concurrency) = cli.concurrency {
            self.concurrency = concurrency;
        }
        if let Some(timeout) = cli.timeout_secs {
            self.timeout_secs = timeout;
        }
        if let Some(model) = &cli.model {
            self.model = model.clone();
        }
        if let Some(url) = &cli.model_url {
            self.model_url = url.clone();
        }
        if cli.urls_out.is_some() {
            self.urls_out = cli.urls_out.clone();
        }
        if cli.log_file.is_some() {
            self.log_file = cli.log_file.clone();
        }
        for pattern in &cli.exclude {
            if !self.exclude.contains(pattern) {
                self.exclude.push(pattern.clone());
            }
        }
        self
    }
}
