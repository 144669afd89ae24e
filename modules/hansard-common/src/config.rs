use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveDate;
use serde::Deserialize;

use crate::error::ConfigError;

pub const DEFAULT_BASE_URL: &str = "https://api.parliament.uk/historic-hansard";
pub const DEFAULT_WINDOW: usize = 40;
pub const DEFAULT_CONFIDENCE_THRESHOLD: u8 = 5;

/// Crawl configuration. Built from defaults, then an optional TOML file,
/// then environment, then CLI flags (applied by the binary).
#[derive(Debug, Clone)]
pub struct Config {
    // Range
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,

    // Matching
    pub window: usize,
    pub confidence_threshold: u8,
    pub lexicon: Option<LexiconConfig>,
    pub relevant_titles_only: bool,

    // Politeness
    pub min_request_spacing_ms: u64,
    pub max_jitter_ms: u64,
    pub max_retries: u32,
    pub retry_base_ms: u64,
    pub request_timeout_secs: u64,
    pub skip_weekends: bool,

    // Upstream / output
    pub base_url: String,
    pub user_agent: String,
    pub output_dir: PathBuf,
}

/// Term lists that replace the built-in lexicon when present.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LexiconConfig {
    pub migration_terms: Vec<String>,
    pub labour_terms: Vec<String>,
}

/// TOML-backed overrides. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub start_year: Option<i32>,
    pub end_year: Option<i32>,
    pub window: Option<usize>,
    pub confidence_threshold: Option<u8>,
    pub relevant_titles_only: Option<bool>,
    pub min_request_spacing_ms: Option<u64>,
    pub max_jitter_ms: Option<u64>,
    pub max_retries: Option<u32>,
    pub retry_base_ms: Option<u64>,
    pub request_timeout_secs: Option<u64>,
    pub skip_weekends: Option<bool>,
    pub base_url: Option<String>,
    pub user_agent: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub lexicon: Option<LexiconConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            start_date: year_start(1900),
            end_date: year_end(1930),
            window: DEFAULT_WINDOW,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            lexicon: None,
            relevant_titles_only: false,
            min_request_spacing_ms: 1000,
            max_jitter_ms: 500,
            max_retries: 4,
            retry_base_ms: 1000,
            request_timeout_secs: 40,
            skip_weekends: false,
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: "HansardResearch/1.0".to_string(),
            output_dir: PathBuf::from("data"),
        }
    }
}

impl Config {
    /// Load defaults, then apply `path` if given, then environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(path) = path {
            config.apply_file(load_file_config(path)?)?;
        }
        config.apply_env()?;
        Ok(config)
    }

    pub fn apply_file(&mut self, file: FileConfig) -> Result<(), ConfigError> {
        if let Some(y) = file.start_year {
            self.start_date = checked_year(y, year_start)?;
        }
        if let Some(y) = file.end_year {
            self.end_date = checked_year(y, year_end)?;
        }
        if let Some(v) = file.window {
            self.window = v;
        }
        if let Some(v) = file.confidence_threshold {
            self.confidence_threshold = v;
        }
        if let Some(v) = file.relevant_titles_only {
            self.relevant_titles_only = v;
        }
        if let Some(v) = file.min_request_spacing_ms {
            self.min_request_spacing_ms = v;
        }
        if let Some(v) = file.max_jitter_ms {
            self.max_jitter_ms = v;
        }
        if let Some(v) = file.max_retries {
            self.max_retries = v;
        }
        if let Some(v) = file.retry_base_ms {
            self.retry_base_ms = v;
        }
        if let Some(v) = file.request_timeout_secs {
            self.request_timeout_secs = v;
        }
        if let Some(v) = file.skip_weekends {
            self.skip_weekends = v;
        }
        if let Some(v) = file.base_url {
            self.base_url = v;
        }
        if let Some(v) = file.user_agent {
            self.user_agent = v;
        }
        if let Some(v) = file.output_dir {
            self.output_dir = v;
        }
        if file.lexicon.is_some() {
            self.lexicon = file.lexicon;
        }
        Ok(())
    }

    /// Environment overrides (a `.env` file is honoured).
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        dotenvy::dotenv().ok();

        if let Ok(url) = env::var("HANSARD_BASE_URL") {
            self.base_url = url;
        }
        if let Ok(dir) = env::var("HANSARD_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(dir);
        }
        if let Ok(raw) = env::var("HANSARD_MIN_REQUEST_SPACING_MS") {
            self.min_request_spacing_ms = raw.parse().map_err(|_| ConfigError::InvalidEnv {
                key: "HANSARD_MIN_REQUEST_SPACING_MS",
                value: raw.clone(),
            })?;
        }
        Ok(())
    }

    pub fn set_years(&mut self, start_year: i32, end_year: i32) -> Result<(), ConfigError> {
        self.start_date = checked_year(start_year, year_start)?;
        self.end_date = checked_year(end_year, year_end)?;
        Ok(())
    }

    /// Reject configurations that cannot produce a meaningful crawl.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.start_date > self.end_date {
            return Err(ConfigError::InvalidDateRange {
                start: self.start_date,
                end: self.end_date,
            });
        }
        if self.window == 0 {
            return Err(ConfigError::InvalidWindow);
        }
        if self.confidence_threshold > 10 {
            return Err(ConfigError::InvalidThreshold(self.confidence_threshold));
        }
        if let Some(lexicon) = &self.lexicon {
            if lexicon.migration_terms.iter().all(|t| t.trim().is_empty()) {
                return Err(ConfigError::EmptyLexicon("migration_terms"));
            }
            if lexicon.labour_terms.iter().all(|t| t.trim().is_empty()) {
                return Err(ConfigError::EmptyLexicon("labour_terms"));
            }
        }
        Ok(())
    }

    pub fn min_request_spacing(&self) -> Duration {
        Duration::from_millis(self.min_request_spacing_ms)
    }

    pub fn max_jitter(&self) -> Duration {
        Duration::from_millis(self.max_jitter_ms)
    }

    pub fn retry_base(&self) -> Duration {
        Duration::from_millis(self.retry_base_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn log_summary(&self) {
        tracing::info!("Config loaded:");
        tracing::info!("  range: {} .. {}", self.start_date, self.end_date);
        tracing::info!("  window: {} words", self.window);
        tracing::info!(
            "  spacing: {}ms (+ up to {}ms jitter), retries: {}",
            self.min_request_spacing_ms,
            self.max_jitter_ms,
            self.max_retries
        );
        tracing::info!("  base_url: {}", self.base_url);
        tracing::info!("  output_dir: {}", self.output_dir.display());
        tracing::info!(
            "  lexicon: {}",
            if self.lexicon.is_some() { "custom" } else { "built-in" }
        );
    }
}

/// Load and parse a TOML config file.
pub fn load_file_config(path: &Path) -> Result<FileConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn checked_year(year: i32, f: fn(i32) -> NaiveDate) -> Result<NaiveDate, ConfigError> {
    if !(1000..=9999).contains(&year) {
        return Err(ConfigError::InvalidYear(year));
    }
    Ok(f(year))
}

fn year_start(year: i32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, 1, 1).unwrap_or(NaiveDate::MIN)
}

fn year_end(year: i32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, 12, 31).unwrap_or(NaiveDate::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.window, 40);
        assert_eq!(config.confidence_threshold, 5);
        assert!(config.min_request_spacing() >= Duration::from_secs(1));
    }

    #[test]
    fn inverted_range_is_fatal() {
        let mut config = Config::default();
        config.set_years(1910, 1905).unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidDateRange { .. })
        ));
    }

    #[test]
    fn zero_window_is_fatal() {
        let config = Config {
            window: 0,
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidWindow)));
    }

    #[test]
    fn empty_lexicon_is_fatal() {
        let config = Config {
            lexicon: Some(LexiconConfig {
                migration_terms: vec!["aliens".into()],
                labour_terms: vec![" ".into()],
            }),
            ..Config::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::EmptyLexicon("labour_terms"))
        ));
    }

    #[test]
    fn file_overrides_apply() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
start_year = 1905
end_year = 1906
window = 25
skip_weekends = true

[lexicon]
migration_terms = ["aliens"]
labour_terms = ["wages"]
"#
        )
        .unwrap();

        let mut config = Config::default();
        config.apply_file(load_file_config(file.path()).unwrap()).unwrap();
        assert_eq!(config.start_date, NaiveDate::from_ymd_opt(1905, 1, 1).unwrap());
        assert_eq!(config.end_date, NaiveDate::from_ymd_opt(1906, 12, 31).unwrap());
        assert_eq!(config.window, 25);
        assert!(config.skip_weekends);
        assert_eq!(config.lexicon.unwrap().labour_terms, vec!["wages".to_string()]);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "windw = 3").unwrap();
        assert!(matches!(
            load_file_config(file.path()),
            Err(ConfigError::Parse { .. })
        ));
    }
}
