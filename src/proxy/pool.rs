use crate::config::ProxyConfig;
use crate::proxy::credential::{parse_proxy_list, ProxyCredential};
use crate::ConfigError;

/// Holds the configured proxies and hands one out per request
///
/// Draws are independent and uniformly random; there is no round-robin
/// cursor or session affinity, so `next` takes `&self` and is safe to call
/// from any number of concurrent units.
#[derive(Debug, Clone, Default)]
pub struct ProxyPool {
    proxies: Vec<ProxyCredential>,
}

impl ProxyPool {
    pub fn new(proxies: Vec<ProxyCredential>) -> Self {
        Self { proxies }
    }

    /// A pool that never yields a proxy
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Loads the pool described by the `[proxy]` section
    ///
    /// Disabled proxy mode yields an empty pool without touching the file.
    pub fn from_config(config: &ProxyConfig) -> Result<Self, ConfigError> {
        if !config.enabled {
            return Ok(Self::disabled());
        }

        let content = std::fs::read_to_string(&config.file)?;
        let proxies = parse_proxy_list(&content)?;

        if proxies.is_empty() {
            tracing::warn!(
                "Proxy mode enabled but {} holds no proxies; requests go direct",
                config.file.display()
            );
        } else {
            tracing::info!(
                "Loaded {} proxies from {}",
                proxies.len(),
                config.file.display()
            );
        }

        Ok(Self::new(proxies))
    }

    /// Draws a proxy, or `None` when the pool is empty
    pub fn next(&self) -> Option<ProxyCredential> {
        if self.proxies.is_empty() {
            return None;
        }
        let idx = rand::random_range(0..self.proxies.len());
        Some(self.proxies[idx].clone())
    }

    pub fn len(&self) -> usize {
        self.proxies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proxies.is_empty()
    }
}
