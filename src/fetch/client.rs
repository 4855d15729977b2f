//! Authenticated HTTP client
//!
//! Every request carries a bearer-token `Authorization` header and an
//! explicit `Host` header naming the logical hostname. The Host header
//! matters in forward-proxy mode: the physical connection then targets the
//! configured proxy host and port while the logical hostname is preserved
//! for the server behind it.

use reqwest::header::{AUTHORIZATION, HOST};
use reqwest::{Client, Response};
use std::str::FromStr;
use std::time::Duration;
use url::Url;

use super::FetchError;

/// Time to establish the TCP connection
const CONNECT_TIMEOUT_SECS: u64 = 10;
/// Inactivity timeout aborting an in-flight request
const READ_TIMEOUT_SECS: u64 = 60;

/// Explicit forward-proxy configuration.
///
/// When present, the physical connection targets `host:port` instead of the
/// URL's own authority; disabled state is simply `None` at the call sites.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyConfig {
    /// Proxy hostname or address
    pub host: String,
    /// Proxy port
    pub port: u16,
}

impl FromStr for ProxyConfig {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (host, port) = s
            .rsplit_once(':')
            .ok_or_else(|| format!("invalid proxy '{s}', expected host:port"))?;
        if host.is_empty() {
            return Err(format!("invalid proxy '{s}', expected host:port"));
        }
        let port: u16 = port
            .parse()
            .map_err(|_| format!("invalid proxy port in '{s}'"))?;

        // Reject host strings the URL rewrite could not apply later.
        Url::parse(&format!("https://{host}:{port}/"))
            .map_err(|e| format!("invalid proxy host in '{s}': {e}"))?;

        Ok(Self {
            host: host.to_string(),
            port,
        })
    }
}

/// HTTP client for authenticated artifact fetches
pub struct ReceiptClient {
    http: Client,
    bearer: String,
    proxy: Option<ProxyConfig>,
}

impl ReceiptClient {
    /// Build the client with the run's bearer token, optional proxy, and
    /// the default 60 second inactivity timeout.
    pub fn new(token: &str, proxy: Option<ProxyConfig>) -> Result<Self, FetchError> {
        Self::with_read_timeout(token, proxy, Duration::from_secs(READ_TIMEOUT_SECS))
    }

    /// Build the client with an explicit inactivity timeout.
    ///
    /// The read timeout fires when no response data arrives for the given
    /// duration, not on total request time; it aborts the in-flight request.
    pub fn with_read_timeout(
        token: &str,
        proxy: Option<ProxyConfig>,
        read_timeout: Duration,
    ) -> Result<Self, FetchError> {
        let http = Client::builder()
            .use_rustls_tls()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .read_timeout(read_timeout)
            .build()?;

        Ok(Self {
            http,
            bearer: format!("Bearer {token}"),
            proxy,
        })
    }

    /// Issue the authenticated GET for one artifact URL
    pub async fn get(&self, url: &Url) -> Result<Response, reqwest::Error> {
        let logical_host = url.host_str().unwrap_or_default().to_string();
        let target = self.physical_target(url);

        self.http
            .get(target)
            .header(HOST, logical_host)
            .header(AUTHORIZATION, self.bearer.as_str())
            .send()
            .await
    }

    /// Rewrite the connection target to the proxy when one is configured,
    /// leaving the scheme and path untouched.
    fn physical_target(&self, url: &Url) -> Url {
        match &self.proxy {
            Some(proxy) => {
                let mut target = url.clone();
                // Host string was validated when the proxy was parsed.
                if target.set_host(Some(&proxy.host)).is_ok() {
                    let _ = target.set_port(Some(proxy.port));
                }
                target
            }
            None => url.clone(),
        }
    }
}
