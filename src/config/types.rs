use serde::Deserialize;

/// Browser-like client identifier sent with static fetches
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Environment variable that overrides `[storage] uri`
pub const STORE_URI_ENV: &str = "CYBER_NEWS_STORE_URI";

/// Store used when the configuration does not name one
pub const DEFAULT_STORAGE_URI: &str = "sqlite://cyber_news.db";

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default, rename = "site")]
    pub sites: Vec<SiteConfig>,
}

impl Config {
    /// Looks up a site by name
    pub fn site(&self, name: &str) -> Option<&SiteConfig> {
        self.sites.iter().find(|site| site.name == name)
    }
}

/// Static HTTP client configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// User-Agent header for static fetches
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    /// Total request timeout (seconds)
    #[serde(rename = "timeout-secs", default = "default_http_timeout")]
    pub timeout_secs: u64,

    /// TCP/TLS connect timeout (seconds)
    #[serde(rename = "connect-timeout-secs", default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout_secs: default_http_timeout(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

/// Document store connection configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Connection string (`sqlite://<path>` or `sqlite::memory:`)
    #[serde(default = "default_storage_uri")]
    pub uri: String,

    /// Connection attempts before giving up
    #[serde(default = "default_retries")]
    pub retries: u32,

    /// Delay between connection attempts (milliseconds)
    #[serde(rename = "retry-delay-ms", default = "default_retry_delay")]
    pub retry_delay_ms: u64,

    /// How the delay grows between attempts
    #[serde(default)]
    pub backoff: BackoffKind,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            uri: default_storage_uri(),
            retries: default_retries(),
            retry_delay_ms: default_retry_delay(),
            backoff: BackoffKind::default(),
        }
    }
}

/// Backoff shape between retry attempts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffKind {
    /// Same delay after every failed attempt
    #[default]
    Fixed,
    /// Delay multiplied by the attempt number
    Linear,
}

/// One scraped site, described as data
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Identifier used on the command line
    pub name: String,

    /// Value stored in every record's `source` field
    pub source: String,

    /// Listing page to fetch
    pub url: String,

    /// Origin that relative links are joined against (defaults to the origin of `url`)
    #[serde(rename = "base-url", default)]
    pub base_url: Option<String>,

    /// Store collection receiving this site's records
    pub collection: String,

    /// Flat JSON export written on every run
    #[serde(rename = "export-path", default)]
    pub export_path: Option<String>,

    /// Zone assumed for dates that carry none (abbreviation or offset)
    #[serde(default)]
    pub timezone: Option<String>,

    /// Fetch attempts per run (1 = no retry)
    #[serde(rename = "fetch-attempts", default = "default_fetch_attempts")]
    pub fetch_attempts: u32,

    pub fetch: FetchMode,

    pub selectors: SelectorConfig,

    #[serde(default)]
    pub dates: DateConfig,
}

/// How a site's page is obtained
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum FetchMode {
    /// Single HTTP GET of server-rendered HTML
    Static,
    /// Headless browser render of a JavaScript page
    Rendered(RenderOptions),
}

impl FetchMode {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Static => "static",
            Self::Rendered(_) => "rendered",
        }
    }
}

/// Headless browser options for rendered sites
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RenderOptions {
    /// Selector whose appearance marks the content as loaded
    #[serde(rename = "wait-selector")]
    pub wait_selector: String,

    /// Navigation timeout (seconds)
    #[serde(rename = "navigation-timeout-secs", default = "default_browser_timeout")]
    pub navigation_timeout_secs: u64,

    /// Timeout for the wait selector to appear (seconds)
    #[serde(rename = "wait-timeout-secs", default = "default_browser_timeout")]
    pub wait_timeout_secs: u64,

    /// Fixed pause after the selector appears (milliseconds)
    #[serde(rename = "settle-delay-ms", default)]
    pub settle_delay_ms: u64,

    /// Explicit Chrome/Chromium binary; discovered from PATH when unset
    #[serde(rename = "chrome-executable", default)]
    pub chrome_executable: Option<String>,
}

/// CSS selectors locating each field of a listing entry
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SelectorConfig {
    /// Root node of one listing entry
    pub container: String,

    pub title: String,

    #[serde(default)]
    pub summary: Option<String>,

    /// Link node; when unset the container itself carries the link
    #[serde(default)]
    pub link: Option<String>,

    /// Attribute holding the link target
    #[serde(rename = "link-attr", default = "default_link_attr")]
    pub link_attr: String,

    /// Dedicated date node
    #[serde(default)]
    pub date: Option<String>,

    /// Noisy metadata node searched for a date when `date` finds nothing
    #[serde(default)]
    pub meta: Option<String>,

    #[serde(default)]
    pub author: Option<String>,
}

/// Per-site date handling
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DateConfig {
    /// Separator of compound "author / date" strings
    #[serde(rename = "author-separator", default)]
    pub author_separator: Option<String>,

    /// Regex locating a date inside metadata text
    #[serde(default)]
    pub pattern: Option<String>,
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_http_timeout() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_storage_uri() -> String {
    DEFAULT_STORAGE_URI.to_string()
}

fn default_retries() -> u32 {
    3
}

fn default_retry_delay() -> u64 {
    2000
}

fn default_fetch_attempts() -> u32 {
    1
}

fn default_browser_timeout() -> u64 {
    30
}

fn default_link_attr() -> String {
    "href".to_string()
}
