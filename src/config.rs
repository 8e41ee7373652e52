//! TOML configuration parsing and validation.
//!
//! Every section is optional. A missing config file is not an error: the
//! server falls back to [`Config::default`], which points at the public
//! Internet Archive endpoints.
//!
//! ```toml
//! [archive]
//! cdx_endpoint = "https://web.archive.org/cdx/search/cdx"
//! wayback_endpoint = "https://web.archive.org/web"
//! advanced_search_endpoint = "https://archive.org/advancedsearch.php"
//!
//! [http]
//! product = "wayback-mcp"
//! contact_url = "https://archive.org/developers/index-apis.html"
//! json_timeout_secs = 20
//! text_timeout_secs = 30
//!
//! [server]
//! bind = "127.0.0.1:7341"
//! ```

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub archive: ArchiveConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Upstream Internet Archive endpoints.
#[derive(Debug, Deserialize, Clone)]
pub struct ArchiveConfig {
    #[serde(default = "default_cdx_endpoint")]
    pub cdx_endpoint: String,
    /// Replay base, i.e. `WAYBACK_BASE` in `{base}/{timestamp}/{url}`.
    #[serde(default = "default_wayback_endpoint")]
    pub wayback_endpoint: String,
    #[serde(default = "default_advanced_search_endpoint")]
    pub advanced_search_endpoint: String,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            cdx_endpoint: default_cdx_endpoint(),
            wayback_endpoint: default_wayback_endpoint(),
            advanced_search_endpoint: default_advanced_search_endpoint(),
        }
    }
}

fn default_cdx_endpoint() -> String {
    "https://web.archive.org/cdx/search/cdx".to_string()
}
fn default_wayback_endpoint() -> String {
    "https://web.archive.org/web".to_string()
}
fn default_advanced_search_endpoint() -> String {
    "https://archive.org/advancedsearch.php".to_string()
}

/// Outbound HTTP behaviour shared by every upstream call.
#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    #[serde(default = "default_product")]
    pub product: String,
    #[serde(default = "default_contact_url")]
    pub contact_url: String,
    #[serde(default = "default_json_timeout_secs")]
    pub json_timeout_secs: u64,
    #[serde(default = "default_text_timeout_secs")]
    pub text_timeout_secs: u64,
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            product: default_product(),
            contact_url: default_contact_url(),
            json_timeout_secs: default_json_timeout_secs(),
            text_timeout_secs: default_text_timeout_secs(),
            max_redirects: default_max_redirects(),
        }
    }
}

fn default_product() -> String {
    "wayback-mcp".to_string()
}
fn default_contact_url() -> String {
    "https://archive.org/developers/index-apis.html".to_string()
}
fn default_json_timeout_secs() -> u64 {
    20
}
fn default_text_timeout_secs() -> u64 {
    30
}
fn default_max_redirects() -> usize {
    10
}

impl HttpConfig {
    /// The identifying client signature: `"<product>/<version> (+<contact-url>)"`.
    pub fn user_agent(&self) -> String {
        format!(
            "{}/{} (+{})",
            self.product,
            env!("CARGO_PKG_VERSION"),
            self.contact_url
        )
    }

    pub fn json_timeout(&self) -> Duration {
        Duration::from_secs(self.json_timeout_secs)
    }

    pub fn text_timeout(&self) -> Duration {
        Duration::from_secs(self.text_timeout_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7341".to_string()
}

/// Load the config file at `path`, or the defaults when it does not exist.
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "config file not found, using defaults");
        return validate(Config::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    validate(config)
}

/// Check invariants and normalise endpoint URLs (trailing slashes removed).
pub fn validate(mut config: Config) -> Result<Config> {
    for (name, endpoint) in [
        ("archive.cdx_endpoint", &mut config.archive.cdx_endpoint),
        ("archive.wayback_endpoint", &mut config.archive.wayback_endpoint),
        (
            "archive.advanced_search_endpoint",
            &mut config.archive.advanced_search_endpoint,
        ),
    ] {
        let parsed = url::Url::parse(endpoint)
            .with_context(|| format!("{} is not a valid URL: '{}'", name, endpoint))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            bail!("{} must use http or https, got '{}'", name, parsed.scheme());
        }
        let trimmed = endpoint.trim_end_matches('/').to_string();
        *endpoint = trimmed;
    }

    if config.http.json_timeout_secs == 0 {
        bail!("http.json_timeout_secs must be > 0");
    }
    if config.http.text_timeout_secs == 0 {
        bail!("http.text_timeout_secs must be > 0");
    }
    if config.http.product.trim().is_empty() {
        bail!("http.product must not be empty");
    }
    if config.server.bind.trim().is_empty() {
        bail!("server.bind must not be empty");
    }

    Ok(config)
}
