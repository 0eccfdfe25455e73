use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::RecallError;

pub const DEFAULT_OMDB_URL: &str = "https://www.omdbapi.com/";
pub const DEFAULT_WIKIPEDIA_API: &str = "https://en.wikipedia.org/w/api.php";
pub const DEFAULT_WIKIDATA_API: &str = "https://www.wikidata.org/w/api.php";

/// Upper bound on `HTTP_MAX_ATTEMPTS`.
pub const MAX_HTTP_ATTEMPTS: u32 = 10;

/// Where rendered secondary-catalog pages come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowserBackend {
    /// A local headless browser binary, one process per page.
    Chrome { bin: String },
    /// A remote browserless instance.
    Browserless { base_url: String, token: String },
}

/// Application configuration loaded from environment variables.
/// Contains the single catalog credential plus endpoints and tuning knobs;
/// everything has a default except the catalog key.
#[derive(Debug, Clone)]
pub struct Config {
    // Caches
    pub cache_dir: PathBuf,

    // Primary catalog
    pub omdb_api_key: Option<String>,
    pub omdb_base_url: String,

    // Knowledge graph
    pub wikipedia_api_url: String,
    pub wikidata_api_url: String,
    pub kg_search_limit: u32,
    pub kg_language: String,

    // Browser
    pub browser: BrowserBackend,
    pub page_load_timeout: Duration,

    // Retry
    pub http_max_attempts: u32,
    pub retry_base: Duration,

    // Offline corpora
    pub wikiplots_path: Option<PathBuf>,
    pub bookgraph_dir: Option<PathBuf>,

    // Drivers
    pub interrupt_grace: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    /// Call `dotenvy::dotenv()` first if a `.env` file should be honoured.
    pub fn from_env() -> Result<Self, RecallError> {
        let browser = match optional_env("BROWSERLESS_URL") {
            Some(base_url) => BrowserBackend::Browserless {
                base_url,
                token: required_env("BROWSERLESS_TOKEN")?,
            },
            None => BrowserBackend::Chrome {
                bin: env_or("CHROME_BIN", "chromium"),
            },
        };

        Ok(Self {
            cache_dir: PathBuf::from(env_or("RECALL_CACHE_DIR", "./cache")),
            omdb_api_key: optional_env("OMDB_API_KEY"),
            omdb_base_url: env_or("OMDB_BASE_URL", DEFAULT_OMDB_URL),
            wikipedia_api_url: env_or("WIKIPEDIA_API_URL", DEFAULT_WIKIPEDIA_API),
            wikidata_api_url: env_or("WIKIDATA_API_URL", DEFAULT_WIKIDATA_API),
            kg_search_limit: parsed_env("KG_SEARCH_LIMIT", 10)?,
            kg_language: env_or("KG_LANGUAGE", "en"),
            browser,
            page_load_timeout: Duration::from_secs(parsed_env("PAGE_LOAD_TIMEOUT_SECS", 10)?),
            http_max_attempts: bounded_env("HTTP_MAX_ATTEMPTS", 3, 1, MAX_HTTP_ATTEMPTS)?,
            retry_base: Duration::from_millis(parsed_env("RETRY_BASE_MS", 500)?),
            wikiplots_path: optional_env("WIKIPLOTS_PATH").map(PathBuf::from),
            bookgraph_dir: optional_env("BOOKGRAPH_DIR").map(PathBuf::from),
            interrupt_grace: Duration::from_secs(parsed_env("INTERRUPT_GRACE_SECS", 5)?),
        })
    }

    /// The catalog key, required by every movie command.
    pub fn require_omdb_api_key(&self) -> Result<&str, RecallError> {
        self.omdb_api_key
            .as_deref()
            .ok_or_else(|| RecallError::Config("OMDB_API_KEY environment variable is required".into()))
    }

    /// Log the effective configuration with secrets masked.
    pub fn log_redacted(&self) {
        fn preview(val: &str) -> String {
            let head: String = val.chars().take(4).collect();
            format!("{head}...({} chars)", val.chars().count())
        }
        fn preview_opt(val: &Option<String>) -> String {
            match val {
                Some(v) if !v.is_empty() => preview(v),
                _ => "<not set>".to_string(),
            }
        }

        tracing::info!("Config loaded:");
        tracing::info!("  RECALL_CACHE_DIR: {}", self.cache_dir.display());
        tracing::info!("  OMDB_API_KEY: {}", preview_opt(&self.omdb_api_key));
        tracing::info!("  OMDB_BASE_URL: {}", self.omdb_base_url);
        tracing::info!("  WIKIPEDIA_API_URL: {}", self.wikipedia_api_url);
        tracing::info!("  WIKIDATA_API_URL: {}", self.wikidata_api_url);
        tracing::info!("  KG_SEARCH_LIMIT: {}", self.kg_search_limit);
        match &self.browser {
            BrowserBackend::Chrome { bin } => tracing::info!("  CHROME_BIN: {bin}"),
            BrowserBackend::Browserless { base_url, token } => {
                tracing::info!("  BROWSERLESS_URL: {base_url}");
                tracing::info!("  BROWSERLESS_TOKEN: {}", preview(token));
            }
        }
        tracing::info!("  HTTP_MAX_ATTEMPTS: {}", self.http_max_attempts);
        tracing::info!(
            "  WIKIPLOTS_PATH: {}",
            self.wikiplots_path
                .as_ref()
                .map_or("<not set>".to_string(), |p| p.display().to_string())
        );
        tracing::info!(
            "  BOOKGRAPH_DIR: {}",
            self.bookgraph_dir
                .as_ref()
                .map_or("<not set>".to_string(), |p| p.display().to_string())
        );
    }
}

fn optional_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn required_env(key: &str) -> Result<String, RecallError> {
    optional_env(key).ok_or_else(|| RecallError::Config(format!("{key} environment variable is required")))
}

fn env_or(key: &str, default: &str) -> String {
    optional_env(key).unwrap_or_else(|| default.to_string())
}

fn parsed_env<T: FromStr>(key: &str, default: T) -> Result<T, RecallError> {
    match optional_env(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| RecallError::Config(format!("{key} must be a number, got {raw:?}"))),
        None => Ok(default),
    }
}

fn bounded_env(key: &str, default: u32, min: u32, max: u32) -> Result<u32, RecallError> {
    let value = parsed_env(key, default)?;
    let clamped = value.clamp(min, max);
    if clamped != value {
        tracing::warn!(key, value, clamped, "value out of range, clamping");
    }
    Ok(clamped)
}
