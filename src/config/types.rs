use serde::Deserialize;

/// Main configuration structure for Robocop
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Seed URL; its host is the only host that receives full GETs
    pub host: String,

    /// Turns on verbose (debug) logging
    pub verbose: bool,

    /// Maximum number of full page fetches (HEAD checks are exempt)
    pub max_visits: u32,

    /// Upper bound of the random delay before each request (seconds)
    pub random_delay: u64,

    /// Maximum concurrent requests per host
    pub parallelism: u32,

    /// Per-request timeout enforced by the HTTP fetcher (seconds)
    pub request_timeout: u64,

    /// Strip query string and fragment from links on the crawled host
    pub strip_same_host_query: bool,

    /// Whether the fetcher follows redirects itself
    pub follow_redirects: bool,

    /// Domain patterns that never receive a full GET ("*.example.com" allowed)
    pub disallowed_domains: Vec<String>,

    /// Directory for the on-disk response cache
    pub cache_dir: String,

    /// Disables the on-disk response cache entirely
    pub no_cache: bool,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            verbose: false,
            max_visits: 10_000,
            random_delay: 1,
            parallelism: 2,
            request_timeout: 30,
            strip_same_host_query: true,
            follow_redirects: true,
            disallowed_domains: vec!["*.facebook.com".to_string()],
            cache_dir: ".url-cache".to_string(),
            no_cache: false,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct UserAgentConfig {
    /// Name of the crawler
    pub crawler_name: String,

    /// Version of the crawler
    pub crawler_version: String,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "robocop".to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl UserAgentConfig {
    /// Formats the User-Agent header value
    pub fn header_value(&self) -> String {
        format!("{}/{}", self.crawler_name, self.crawler_version)
    }
}

/// Report output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Also dump the report as CSV (stdout and `csv_path`)
    pub csv: bool,

    /// Path of the CSV report file
    pub csv_path: String,

    /// Hide http links whose https variant answers 200
    pub only_failures: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            csv: false,
            csv_path: "report.csv".to_string(),
            only_failures: false,
        }
    }
}
