//! Configuration for the extension map client.

use std::time::Duration;

#[cfg(feature = "config")]
use clap::Args;
use machinist_core::CORE_EXTENSION_ID;
use serde::{Deserialize, Serialize};

/// Canonical upstream location of the extension map.
pub const DEFAULT_EXTENSION_MAP_URL: &str =
    "https://raw.githubusercontent.com/ltdrdata/ComfyUI-Manager/main/extension-node-map.json";

/// Default timeout for fetching the extension map: 10 seconds.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for loading the extension map.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct ExtensionMapConfig {
    /// URL of the extension map document.
    #[cfg_attr(
        feature = "config",
        arg(
            long = "extension-map-url",
            env = "EXTENSION_MAP_URL",
            default_value = DEFAULT_EXTENSION_MAP_URL
        )
    )]
    pub url: String,

    /// Fetch timeout in seconds. Zero falls back to the default.
    #[cfg_attr(
        feature = "config",
        arg(long = "extension-map-timeout", env = "EXTENSION_MAP_TIMEOUT", default_value = "10")
    )]
    pub timeout_secs: u64,

    /// Identifier of the core extension entry.
    #[cfg_attr(
        feature = "config",
        arg(long = "core-extension", env = "CORE_EXTENSION", default_value = CORE_EXTENSION_ID)
    )]
    pub core_extension: String,

    /// Skips the network fetch and uses the bundled snapshot.
    #[cfg_attr(
        feature = "config",
        arg(long = "extension-map-offline", env = "EXTENSION_MAP_OFFLINE", default_value_t = false)
    )]
    pub offline: bool,

    /// User-Agent header to send with requests.
    #[cfg_attr(
        feature = "config",
        arg(long = "extension-map-user-agent", env = "EXTENSION_MAP_USER_AGENT")
    )]
    pub user_agent: Option<String>,
}

impl Default for ExtensionMapConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_EXTENSION_MAP_URL.to_owned(),
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            core_extension: CORE_EXTENSION_ID.to_owned(),
            offline: false,
            user_agent: None,
        }
    }
}

impl ExtensionMapConfig {
    /// Returns the default user agent string.
    fn default_user_agent() -> String {
        format!("machinist/{}", env!("CARGO_PKG_VERSION"))
    }

    /// Sets the extension map URL.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Sets the fetch timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_secs = timeout.as_secs();
        self
    }

    /// Sets the core extension identifier.
    pub fn with_core_extension(mut self, core_extension: impl Into<String>) -> Self {
        self.core_extension = core_extension.into();
        self
    }

    /// Skips the network fetch.
    pub fn with_offline(mut self, offline: bool) -> Self {
        self.offline = offline;
        self
    }

    /// Returns the effective timeout, using default if zero.
    pub fn effective_timeout(&self) -> Duration {
        if self.timeout_secs == 0 {
            DEFAULT_TIMEOUT
        } else {
            Duration::from_secs(self.timeout_secs)
        }
    }

    /// Returns the effective user agent, using default if unset or empty.
    pub fn effective_user_agent(&self) -> String {
        match self.user_agent.as_deref() {
            Some(user_agent) if !user_agent.is_empty() => user_agent.to_owned(),
            _ => Self::default_user_agent(),
        }
    }
}
