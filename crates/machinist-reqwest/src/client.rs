//! Extension map client.

use std::sync::Arc;

use machinist_core::{ExtensionMap, ExtensionSource, PRIORITY_EXTENSIONS};
use reqwest::Client;

use crate::{ExtensionMapConfig, Result};

/// Tracing target for extension map client operations.
pub const TRACING_TARGET: &str = "machinist_reqwest::client";

/// Inner client that holds the HTTP client and configuration.
struct ExtensionMapClientInner {
    http: Client,
    config: ExtensionMapConfig,
}

/// Loads the extension map from its upstream location.
///
/// Cloning is cheap; clones share the underlying connection pool.
#[derive(Clone)]
pub struct ExtensionMapClient {
    inner: Arc<ExtensionMapClientInner>,
}

impl std::fmt::Debug for ExtensionMapClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtensionMapClient")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl ExtensionMapClient {
    /// Creates a new client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: ExtensionMapConfig) -> Result<Self> {
        let timeout = config.effective_timeout();

        tracing::debug!(
            target: TRACING_TARGET,
            url = %config.url,
            timeout_ms = timeout.as_millis(),
            "creating extension map client"
        );

        let http = Client::builder()
            .timeout(timeout)
            .user_agent(config.effective_user_agent())
            .build()?;

        let inner = ExtensionMapClientInner { http, config };
        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    /// Gets the client configuration.
    pub fn config(&self) -> &ExtensionMapConfig {
        &self.inner.config
    }

    /// Fetches and parses the upstream document without any fallback.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, non-success status or an
    /// undecodable body.
    pub async fn fetch(&self) -> Result<ExtensionMap> {
        let response = self
            .inner
            .http
            .get(&self.inner.config.url)
            .send()
            .await?
            .error_for_status()?;

        let body = response.bytes().await?;
        let map = ExtensionMap::from_slice(&body)?;
        Ok(map.with_source(ExtensionSource::Remote))
    }

    /// Loads the extension map, falling back to the bundled snapshot.
    ///
    /// The returned map has the configured core identifier and the priority
    /// extensions moved to the front.
    pub async fn load(&self) -> ExtensionMap {
        let config = &self.inner.config;

        let map = if config.offline {
            tracing::info!(
                target: TRACING_TARGET,
                "offline mode, using bundled extension map"
            );
            ExtensionMap::bundled()
        } else {
            match self.fetch().await {
                Ok(map) => map,
                Err(error) => {
                    tracing::warn!(
                        target: TRACING_TARGET,
                        url = %config.url,
                        error = %error,
                        timeout = error.is_timeout(),
                        "failed to fetch extension map, using bundled snapshot"
                    );
                    ExtensionMap::bundled()
                }
            }
        };

        let map = map
            .with_core_id(config.core_extension.as_str())
            .prioritized(PRIORITY_EXTENSIONS);

        tracing::info!(
            target: TRACING_TARGET,
            source = %map.source(),
            extensions = map.len(),
            core_present = map.core().is_some(),
            "extension map loaded"
        );

        map
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::Router;
    use axum::http::StatusCode;
    use axum::routing::get;
    use tokio::net::TcpListener;

    use super::*;

    const REMOTE_MAP: &str = r#"{
        "https://github.com/comfyanonymous/ComfyUI": [["KSampler"], {}],
        "https://github.com/laksjdjf/IPAdapter-ComfyUI": [["IPAdapter"], {}],
        "https://github.com/cubiq/ComfyUI_IPAdapter_plus": [["IPAdapter"], {}]
    }"#;

    async fn serve(router: Router) -> anyhow::Result<String> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move { axum::serve(listener, router).await });
        Ok(format!("http://{addr}/extension-node-map.json"))
    }

    fn client(url: String) -> anyhow::Result<ExtensionMapClient> {
        let config = ExtensionMapConfig::default()
            .with_url(url)
            .with_timeout(Duration::from_secs(2));
        Ok(ExtensionMapClient::new(config)?)
    }

    #[tokio::test]
    async fn loads_remote_map_with_priorities() -> anyhow::Result<()> {
        let router = Router::new().route("/extension-node-map.json", get(|| async { REMOTE_MAP }));
        let map = client(serve(router).await?)?.load().await;

        assert_eq!(map.source(), ExtensionSource::Remote);
        assert_eq!(map.len(), 3);
        assert_eq!(map.ids().next(), Some(PRIORITY_EXTENSIONS[0]));
        Ok(())
    }

    #[tokio::test]
    async fn error_status_falls_back_to_bundled() -> anyhow::Result<()> {
        let router = Router::new().route(
            "/extension-node-map.json",
            get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "down") }),
        );
        let client = client(serve(router).await?)?;

        assert!(client.fetch().await.is_err());
        assert_eq!(client.load().await.source(), ExtensionSource::Bundled);
        Ok(())
    }

    #[tokio::test]
    async fn undecodable_body_falls_back_to_bundled() -> anyhow::Result<()> {
        let router = Router::new().route("/extension-node-map.json", get(|| async { "[1, 2" }));
        let map = client(serve(router).await?)?.load().await;

        assert_eq!(map.source(), ExtensionSource::Bundled);
        assert!(map.core().is_some());
        Ok(())
    }

    #[tokio::test]
    async fn unreachable_host_falls_back_to_bundled() -> anyhow::Result<()> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        drop(listener);

        let map = client(format!("http://{addr}/extension-node-map.json"))?.load().await;
        assert_eq!(map.source(), ExtensionSource::Bundled);
        Ok(())
    }

    #[tokio::test]
    async fn offline_skips_fetch_and_applies_core_override() -> anyhow::Result<()> {
        let config = ExtensionMapConfig::default()
            .with_url("http://127.0.0.1:1/never")
            .with_offline(true)
            .with_core_extension("custom-core");
        let map = ExtensionMapClient::new(config)?.load().await;

        assert_eq!(map.source(), ExtensionSource::Bundled);
        assert_eq!(map.core_id(), "custom-core");
        Ok(())
    }
}
