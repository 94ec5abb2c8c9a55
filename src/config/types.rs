use crate::fetch::DEFAULT_USER_AGENT;
use serde::Deserialize;
use std::collections::BTreeMap;

/// A crawl plan: orchestrator settings plus the page forest
#[derive(Debug, Clone, Deserialize)]
pub struct PlanConfig {
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,

    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,

    /// Headers shared by every page
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    #[serde(default)]
    pub http: HttpSection,

    /// Pages in declaration order; a parent must be declared before its children
    #[serde(rename = "page", default)]
    pub pages: Vec<PageEntry>,
}

/// Orchestrator behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OrchestratorConfig {
    /// Name of the run, used for the pool and its task names
    #[serde(default = "default_name")]
    pub name: String,

    /// Maximum number of concurrently running fetches
    #[serde(rename = "max-concurrency", default = "default_max_concurrency")]
    pub max_concurrency: u32,

    /// Seconds a page waits on one pending fetch before giving up
    #[serde(rename = "result-timeout-secs")]
    pub result_timeout_secs: Option<u64>,

    /// Pause between two submissions of the same page
    #[serde(default)]
    pub delay: DelayConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            max_concurrency: default_max_concurrency(),
            result_timeout_secs: None,
            delay: DelayConfig::default(),
        }
    }
}

/// Randomized delay bounds in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct DelayConfig {
    #[serde(rename = "min-ms", default = "default_min_delay")]
    pub min_ms: u64,

    #[serde(rename = "max-ms", default = "default_max_delay")]
    pub max_ms: u64,
}

impl Default for DelayConfig {
    fn default() -> Self {
        Self {
            min_ms: default_min_delay(),
            max_ms: default_max_delay(),
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Sent as the `User-Agent` header unless `[headers]` sets one
    #[serde(default = "default_agent")]
    pub agent: String,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            agent: default_agent(),
        }
    }
}

/// HTTP client timeouts
#[derive(Debug, Clone, Deserialize)]
pub struct HttpSection {
    #[serde(rename = "timeout-secs", default = "default_timeout")]
    pub timeout_secs: u64,

    #[serde(rename = "connect-timeout-secs", default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

impl Default for HttpSection {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

/// Kind of a plan page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageKindConfig {
    Fetch,
    Paginated,
    Download,
    Extract,
}

/// One page of the plan
///
/// Which fields apply depends on `kind`; validation rejects missing ones.
#[derive(Debug, Clone, Deserialize)]
pub struct PageEntry {
    /// Unique page name
    pub name: String,

    /// Name of an earlier page whose result feeds this one
    pub parent: Option<String>,

    pub kind: PageKindConfig,

    /// Literal URLs fetched as a single page-bucket
    pub urls: Option<Vec<String>>,

    /// Literal URLs, one list per page-bucket
    pub pages: Option<Vec<Vec<String>>>,

    /// Base URL handed to the paginated URL template
    #[serde(rename = "base-url")]
    pub base_url: Option<String>,

    /// Paginated URL template with `{base}` and `{index}` placeholders
    #[serde(rename = "url-template")]
    pub url_template: Option<String>,

    /// First index substituted into the template
    #[serde(rename = "start-index", default)]
    pub start_index: usize,

    /// Number of paginated URLs to generate
    #[serde(rename = "max-pages")]
    pub max_pages: Option<usize>,

    /// Download destination directory
    pub folder: Option<String>,

    #[serde(rename = "skip-if-exists", default = "default_true")]
    pub skip_if_exists: bool,

    #[serde(rename = "wait-all", default = "default_true")]
    pub wait_all: bool,

    /// CSS selector alternatives, primary first
    #[serde(default)]
    pub query: Vec<String>,

    /// Tag name matched when no selector matches
    #[serde(rename = "fallback-tag")]
    pub fallback_tag: Option<String>,

    /// `text`, `html`, `inner-html` or `attr:<name>`; matched elements when absent
    pub output: Option<String>,

    #[serde(rename = "ignore-dedup", default)]
    pub ignore_dedup: bool,

    /// Overrides the orchestrator delay for this page
    pub delay: Option<DelayConfig>,

    /// Pause taken before the page performs
    #[serde(rename = "sleep-before")]
    pub sleep_before: Option<DelayConfig>,

    /// Replaces the shared headers for this page
    pub headers: Option<BTreeMap<String, String>>,
}

/// How an extract page renders its matches
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputMode {
    Elements,
    Text,
    Html,
    InnerHtml,
    Attr(String),
}

impl OutputMode {
    /// Parses an `output` value; `None` for unknown modes
    pub fn parse(value: Option<&str>) -> Option<Self> {
        match value {
            None => Some(Self::Elements),
            Some("text") => Some(Self::Text),
            Some("html") => Some(Self::Html),
            Some("inner-html") => Some(Self::InnerHtml),
            Some(other) => other
                .strip_prefix("attr:")
                .filter(|name| !name.is_empty())
                .map(|name| Self::Attr(name.to_string())),
        }
    }
}

fn default_name() -> String {
    "weave".to_string()
}

fn default_max_concurrency() -> u32 {
    8
}

fn default_min_delay() -> u64 {
    500
}

fn default_max_delay() -> u64 {
    1000
}

fn default_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_true() -> bool {
    true
}
