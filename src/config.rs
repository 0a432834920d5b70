use std::env;
use std::time::Duration;

/// Browser identity sent on every outbound request; DuckDuckGo's HTML
/// endpoint rejects obvious bot agents.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

const DDG_HTML_URL: &str = "https://html.duckduckgo.com/html/";
const SEMANTIC_API_BASE: &str = "https://api.semanticscholar.org/graph/v1";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} must be a positive integer, got {value:?}")]
    Invalid { var: &'static str, value: String },
}

#[derive(Clone)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: String) -> Self {
        Self(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// Process-wide tunables. Built once at startup and never mutated.
#[derive(Debug, Clone)]
pub struct ResearchConfig {
    pub user_agent: String,
    /// Hard ceiling on the assembled document, in bytes.
    pub max_content_size: usize,
    /// Upper bound on results examined per source.
    pub max_results: usize,
    pub default_results: usize,
    /// Cap on extracted text per result so one page cannot starve the rest.
    pub max_chars_per_result: usize,
    pub search_timeout: Duration,
    pub page_timeout: Duration,
    pub max_page_bytes: usize,
    pub fetch_concurrency: usize,
    pub web_search_url: String,
    pub academic_api_url: String,
    pub semantic_scholar_api_key: Option<ApiKey>,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_content_size: 8000,
            max_results: 3,
            default_results: 2,
            max_chars_per_result: 1500,
            search_timeout: Duration::from_secs(10),
            page_timeout: Duration::from_secs(8),
            max_page_bytes: 5_000_000,
            fetch_concurrency: 4,
            web_search_url: DDG_HTML_URL.to_string(),
            academic_api_url: SEMANTIC_API_BASE.to_string(),
            semantic_scholar_api_key: None,
        }
    }
}

impl ResearchConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut config = Self::default();
        if let Some(ua) = get("RESEARCH_USER_AGENT") {
            config.user_agent = ua;
        }
        if let Some(v) = get("RESEARCH_MAX_CONTENT_SIZE") {
            config.max_content_size = parse_positive("RESEARCH_MAX_CONTENT_SIZE", v)?;
        }
        if let Some(v) = get("RESEARCH_MAX_RESULTS") {
            config.max_results = parse_positive("RESEARCH_MAX_RESULTS", v)?;
            config.default_results = config.default_results.min(config.max_results);
        }
        if let Some(v) = get("RESEARCH_MAX_CHARS_PER_RESULT") {
            config.max_chars_per_result = parse_positive("RESEARCH_MAX_CHARS_PER_RESULT", v)?;
        }
        config.semantic_scholar_api_key = get("SEMANTIC_SCHOLAR_API_KEY").map(ApiKey::new);
        Ok(config)
    }

    /// Clamp a caller-requested result count into `[1, max_results]`.
    pub fn clamp_results(&self, requested: Option<i64>) -> usize {
        let max = self.max_results.max(1);
        match requested {
            None => self.default_results.clamp(1, max),
            Some(n) if n < 1 => 1,
            Some(n) => usize::try_from(n).unwrap_or(max).min(max),
        }
    }
}

fn parse_positive(var: &'static str, value: String) -> Result<usize, ConfigError> {
    match value.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::Invalid { var, value }),
    }
}
