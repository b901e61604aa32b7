//! Worker Configuration
//!
//! Cache naming, the app shell list and the API endpoint are all carried by
//! [`WorkerConfig`], which is handed to the worker at construction time.
//!
//! Expected JSON format:
//! ```json
//! {
//!   "origin": "https://app.example",
//!   "version": "v3",
//!   "cache_prefix": "service-line",
//!   "app_shell": ["/", "/index.html"],
//!   "api_base": "https://api.example/macros/exec",
//!   "layout": "single",
//!   "api_reads": "cache-first-revalidate"
//! }
//! ```

use serde::Deserialize;
use url::Url;

use super::error::ConfigError;

/// How roles map onto partition names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PartitionLayout {
    /// One partition per role: `{prefix}-{role}-{version}`
    #[default]
    Split,
    /// Every role shares `{prefix}-{version}`
    Single,
}

/// Strategy used for GET requests to the API endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ApiReadPolicy {
    /// Serve the last known data, refresh it in the background
    #[default]
    CacheFirstRevalidate,
    /// Fresh data when online, last known data when not
    NetworkFirst,
    /// Always hit the API; offline snapshot on failure
    NetworkOnly,
}

const TAILWIND_CDN: &str = "cdn.tailwindcss.com";

fn default_prefix() -> String {
    "app".to_string()
}

fn default_offline_page() -> String {
    "/index.html".to_string()
}

fn default_offline_message() -> String {
    "Offline: showing last known data.".to_string()
}

fn default_mutation_offline_message() -> String {
    "Cannot complete this action while offline. Retry when you reconnect.".to_string()
}

fn default_sync_tags() -> Vec<String> {
    vec!["sync-pending-actions".to_string()]
}

/// Worker configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WorkerConfig {
    /// Origin relative shell paths are resolved against
    pub origin: String,
    /// Version tag embedded in every partition name
    pub version: String,
    /// Leading part of every partition name
    #[serde(default = "default_prefix")]
    pub cache_prefix: String,
    /// Paths or absolute URLs pre-cached at install
    #[serde(default)]
    pub app_shell: Vec<String>,
    /// Remote API endpoint (host + path prefix)
    #[serde(default)]
    pub api_base: Option<String>,
    /// Page served to navigations that fail with nothing cached
    #[serde(default = "default_offline_page")]
    pub offline_page: String,
    /// Partition naming scheme
    #[serde(default)]
    pub layout: PartitionLayout,
    /// Strategy for API GET requests
    #[serde(default)]
    pub api_reads: ApiReadPolicy,
    /// Serve app shell URLs cache-first from the shell partition
    #[serde(default)]
    pub shell_cache_first: bool,
    /// Hosts whose every URL is served cache-first from the shell partition
    #[serde(default)]
    pub shell_hosts: Vec<String>,
    /// Message in the offline API read snapshot
    #[serde(default = "default_offline_message")]
    pub offline_message: String,
    /// Message in the offline API write error
    #[serde(default = "default_mutation_offline_message")]
    pub mutation_offline_message: String,
    /// Background sync tags registered at construction
    #[serde(default = "default_sync_tags")]
    pub sync_tags: Vec<String>,
    /// Byte limit for the in-memory store
    #[serde(default)]
    pub quota_bytes: Option<usize>,
}

impl WorkerConfig {
    /// Split-layout config with no shell and no API endpoint
    pub fn new(origin: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            version: version.into(),
            cache_prefix: default_prefix(),
            app_shell: Vec::new(),
            api_base: None,
            offline_page: default_offline_page(),
            layout: PartitionLayout::Split,
            api_reads: ApiReadPolicy::CacheFirstRevalidate,
            shell_cache_first: false,
            shell_hosts: Vec::new(),
            offline_message: default_offline_message(),
            mutation_offline_message: default_mutation_offline_message(),
            sync_tags: default_sync_tags(),
            quota_bytes: None,
        }
    }

    /// Messaging app preset: one shared cache, API reads served from cache
    /// and refreshed in the background.
    pub fn service_line(origin: impl Into<String>, api_base: impl Into<String>) -> Self {
        Self {
            cache_prefix: "service-line".to_string(),
            app_shell: [
                "/",
                "/login.html",
                "/index.html",
                "/announce.html",
                "/members.html",
                "/manifest.json",
                "/customer-192.png",
                "/customer-512.png",
            ]
            .iter()
            .map(|p| p.to_string())
            .collect(),
            api_base: Some(api_base.into()),
            layout: PartitionLayout::Single,
            offline_message:
                "Offline: showing last known data (members, comments, announcements)."
                    .to_string(),
            mutation_offline_message: "Cannot update status, send, edit or delete while \
                offline. Action will retry when you reconnect."
                .to_string(),
            ..Self::new(origin, "v3")
        }
    }

    /// Social feed preset: shell URLs and the CSS CDN pinned cache-first, API
    /// always live.
    pub fn social_app(origin: impl Into<String>, api_base: impl Into<String>) -> Self {
        Self {
            cache_prefix: "social-app-cache".to_string(),
            app_shell: vec![
                "/".to_string(),
                "/view.html".to_string(),
                "/studio.html".to_string(),
                format!("https://{}", TAILWIND_CDN),
            ],
            shell_hosts: vec![TAILWIND_CDN.to_string()],
            api_base: Some(api_base.into()),
            offline_page: "/view.html".to_string(),
            layout: PartitionLayout::Single,
            api_reads: ApiReadPolicy::NetworkOnly,
            shell_cache_first: true,
            ..Self::new(origin, "v1")
        }
    }

    /// Parse and validate a JSON config
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version.trim().is_empty() {
            return Err(ConfigError::EmptyVersion);
        }
        self.origin_url()?;
        if let Some(api) = &self.api_base {
            parse_url(api)?;
        }
        Ok(())
    }

    pub fn origin_url(&self) -> Result<Url, ConfigError> {
        parse_url(&self.origin)
    }

    pub fn api_url(&self) -> Result<Option<Url>, ConfigError> {
        self.api_base.as_deref().map(parse_url).transpose()
    }

    /// Resolve a shell path (or absolute URL) against the origin
    pub fn resolve(&self, path: &str) -> Result<String, ConfigError> {
        let resolved = self
            .origin_url()?
            .join(path)
            .map_err(|source| ConfigError::InvalidUrl {
                url: path.to_string(),
                source,
            })?;
        Ok(resolved.to_string())
    }

    /// Absolute URLs of every app shell entry
    pub fn shell_urls(&self) -> Result<Vec<String>, ConfigError> {
        self.app_shell.iter().map(|p| self.resolve(p)).collect()
    }

    /// Absolute URL of the offline page
    pub fn offline_page_url(&self) -> Result<String, ConfigError> {
        self.resolve(&self.offline_page)
    }
}

fn parse_url(raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw).map_err(|source| ConfigError::InvalidUrl {
        url: raw.to_string(),
        source,
    })
}
