//! HTTP plumbing shared by the classifier, downloader, and renderer
//!
//! This module handles:
//! - Building reqwest clients with the crawler's user agent
//! - Caching one client per proxy server (reqwest binds proxies per client)
//! - The `ByteFetcher` seam used for header probes and raw downloads

use crate::config::UserAgentConfig;
use crate::proxy::ProxyCredential;
use crate::{Result, WaveError};
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderName, CONTENT_DISPOSITION, CONTENT_TYPE};
use reqwest::{Client, Proxy};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

/// Status line and the headers the crawler cares about
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseHead {
    pub status: u16,
    pub content_type: Option<String>,
    pub content_disposition: Option<String>,
}

impl ResponseHead {
    fn from_headers(status: u16, headers: &HeaderMap) -> Self {
        let header = |name: HeaderName| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(|v| v.to_string())
        };

        Self {
            status,
            content_type: header(CONTENT_TYPE),
            content_disposition: header(CONTENT_DISPOSITION),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// An open response whose body has not been read yet
pub struct BodyStream {
    pub head: ResponseHead,
    pub chunks: BoxStream<'static, Result<Vec<u8>>>,
}

/// Plain HTTP GET with header inspection and streamed bodies
///
/// Every call carries its own timeout; a timeout surfaces as
/// [`WaveError::Timeout`] like any other transport failure.
#[async_trait]
pub trait ByteFetcher: Send + Sync {
    /// Issues a GET and returns the status and headers, discarding the body
    async fn get_headers(
        &self,
        url: &Url,
        proxy: Option<&ProxyCredential>,
        timeout: Duration,
    ) -> Result<ResponseHead>;

    /// Issues a GET and returns the body as a stream of chunks
    async fn stream_body(
        &self,
        url: &Url,
        proxy: Option<&ProxyCredential>,
        timeout: Duration,
    ) -> Result<BodyStream>;
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
/// * `proxy` - Optional proxy every request of this client goes through
///
/// # Example
///
/// ```no_run
/// use wavecrawl::config::UserAgentConfig;
/// use wavecrawl::crawler::build_http_client;
///
/// let client = build_http_client(&UserAgentConfig::default(), None).unwrap();
/// ```
pub fn build_http_client(
    config: &UserAgentConfig,
    proxy: Option<&ProxyCredential>,
) -> std::result::Result<Client, reqwest::Error> {
    let mut builder = Client::builder()
        .user_agent(config.header_value())
        .connect_timeout(Duration::from_secs(10))
        .pool_idle_timeout(Duration::from_secs(30))
        .gzip(true)
        .brotli(true);

    if let Some(proxy) = proxy {
        builder = builder
            .proxy(Proxy::all(proxy.server.as_str())?.basic_auth(&proxy.username, &proxy.password));
    }

    builder.build()
}

/// Lazily built reqwest clients, one per proxy server plus one direct
///
/// The lock is only held to look up or insert a client, never across an
/// await point.
pub struct ClientPool {
    user_agent: UserAgentConfig,
    direct: Client,
    proxied: Mutex<HashMap<String, Client>>,
}

impl ClientPool {
    pub fn new(user_agent: UserAgentConfig) -> Result<Self> {
        let direct = build_http_client(&user_agent, None).map_err(|e| WaveError::Http {
            url: String::new(),
            source: e,
        })?;

        Ok(Self {
            user_agent,
            direct,
            proxied: Mutex::new(HashMap::new()),
        })
    }

    /// Returns the client for `proxy`, building it on first use
    pub fn client(&self, proxy: Option<&ProxyCredential>) -> Result<Client> {
        let Some(proxy) = proxy else {
            return Ok(self.direct.clone());
        };

        let mut clients = self
            .proxied
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(client) = clients.get(&proxy.server) {
            return Ok(client.clone());
        }

        let client = build_http_client(&self.user_agent, Some(proxy)).map_err(|e| {
            WaveError::Http {
                url: proxy.server.clone(),
                source: e,
            }
        })?;
        clients.insert(proxy.server.clone(), client.clone());
        Ok(client)
    }
}

/// `ByteFetcher` backed by reqwest
pub struct HttpFetcher {
    clients: Arc<ClientPool>,
}

impl HttpFetcher {
    pub fn new(clients: Arc<ClientPool>) -> Self {
        Self { clients }
    }

    async fn send(
        &self,
        url: &Url,
        proxy: Option<&ProxyCredential>,
        timeout: Duration,
    ) -> Result<reqwest::Response> {
        let client = self.clients.client(proxy)?;
        client
            .get(url.clone())
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| WaveError::from_reqwest(url.as_str(), e))
    }
}

#[async_trait]
impl ByteFetcher for HttpFetcher {
    async fn get_headers(
        &self,
        url: &Url,
        proxy: Option<&ProxyCredential>,
        timeout: Duration,
    ) -> Result<ResponseHead> {
        let response = self.send(url, proxy, timeout).await?;
        Ok(ResponseHead::from_headers(
            response.status().as_u16(),
            response.headers(),
        ))
    }

    async fn stream_body(
        &self,
        url: &Url,
        proxy: Option<&ProxyCredential>,
        timeout: Duration,
    ) -> Result<BodyStream> {
        let response = self.send(url, proxy, timeout).await?;
        let head = ResponseHead::from_headers(response.status().as_u16(), response.headers());

        let url_str = url.to_string();
        let chunks = response
            .bytes_stream()
            .map(move |chunk| {
                chunk
                    .map(|bytes| bytes.to_vec())
                    .map_err(|e| WaveError::from_reqwest(&url_str, e))
            })
            .boxed();

        Ok(BodyStream { head, chunks })
    }
}
