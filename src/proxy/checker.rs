//! Proxy prober: one SOCKS5-tunnelled geolocation lookup per proxy

use crate::proxy::geo::GeoLocation;
use crate::proxy::models::{ProbeResult, ProxyDescriptor};
use async_trait::async_trait;
use reqwest::{Client, Proxy as ReqwestProxy};
use std::io;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{timeout_at, Instant};
use tracing::debug;

/// Default timeout for a whole probe in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 8;

/// Default endpoint returning the caller's IP and its geolocation as JSON
const DEFAULT_LOOKUP_URL: &str = "https://ipinfo.io/json";

/// Host the local listeners bind to
const DEFAULT_PROXY_HOST: &str = "127.0.0.1";

const SOCKS5_VERSION: u8 = 0x05;
const METHOD_NO_AUTH: u8 = 0x00;
const METHOD_NONE_ACCEPTABLE: u8 = 0xff;

/// Headroom between reqwest's connect timer and the probe deadline; the connect timer fires first
const CONNECT_SLACK: Duration = Duration::from_millis(50);

/// Configuration for probing proxies
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// Budget for one probe, handshake and lookup together
    pub timeout: Duration,
    /// URL of the geolocation endpoint fetched through the proxy
    pub lookup_url: String,
    /// Host of the local SOCKS5 listeners
    pub proxy_host: String,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            lookup_url: DEFAULT_LOOKUP_URL.to_string(),
            proxy_host: DEFAULT_PROXY_HOST.to_string(),
        }
    }
}

impl ProbeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_lookup_url(mut self, url: impl Into<String>) -> Self {
        self.lookup_url = url.into();
        self
    }

    pub fn with_proxy_host(mut self, host: impl Into<String>) -> Self {
        self.proxy_host = host.into();
        self
    }
}

/// Something that can probe a proxy
///
/// Implementations never fail: every problem is reported through the result.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, descriptor: &ProxyDescriptor) -> ProbeResult;
}

/// Why the lookup phase failed
enum LookupError {
    /// The tunnel through the proxy could not be opened
    Connect(String),
    /// The proxy never answered the CONNECT request in time
    ConnectTimedOut,
    /// The tunnel worked but the answer was unusable
    Lookup(String),
}

/// Probes local SOCKS5 listeners against a geolocation endpoint
#[derive(Debug, Clone, Default)]
pub struct ProxyChecker {
    config: ProbeConfig,
}

impl ProxyChecker {
    /// Create a new checker with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new checker with custom configuration
    pub fn with_config(config: ProbeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    /// Check a single proxy
    pub async fn check(&self, descriptor: &ProxyDescriptor) -> ProbeResult {
        let start = Instant::now();
        let deadline = start + self.config.timeout;

        match timeout_at(deadline, self.negotiate(descriptor.port)).await {
            Err(_) => return ProbeResult::timeout(descriptor.clone()),
            Ok(Err(e)) => return ProbeResult::connection_failed(descriptor.clone(), e.to_string()),
            Ok(Ok(())) => {}
        }

        let connect_budget = deadline
            .saturating_duration_since(Instant::now())
            .saturating_sub(CONNECT_SLACK);
        let client = match self.create_client(descriptor.port, connect_budget) {
            Ok(client) => client,
            Err(e) => return ProbeResult::connection_failed(descriptor.clone(), e.to_string()),
        };

        let geo = match timeout_at(deadline, self.lookup(&client)).await {
            Ok(Ok(geo)) => geo,
            Ok(Err(LookupError::Connect(reason))) => {
                return ProbeResult::connection_failed(descriptor.clone(), reason)
            }
            Ok(Err(LookupError::ConnectTimedOut)) => return ProbeResult::timeout(descriptor.clone()),
            Ok(Err(LookupError::Lookup(reason))) => {
                return ProbeResult::lookup_failed(descriptor.clone(), reason)
            }
            Err(_) => return ProbeResult::lookup_failed(descriptor.clone(), "lookup timed out"),
        };

        let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
        debug!(proxy = %descriptor.name, location = %geo, latency_ms, "lookup succeeded");

        match geo.into_egress(latency_ms) {
            Some(egress) => ProbeResult::success(descriptor.clone(), egress),
            None => ProbeResult::lookup_failed(descriptor.clone(), "response has no IP address"),
        }
    }

    /// Open a TCP connection to the listener and agree on a no-auth SOCKS5 session
    async fn negotiate(&self, port: u16) -> io::Result<()> {
        let mut stream = TcpStream::connect((self.config.proxy_host.as_str(), port)).await?;
        stream.write_all(&[SOCKS5_VERSION, 1, METHOD_NO_AUTH]).await?;

        let mut reply = [0u8; 2];
        stream.read_exact(&mut reply).await?;

        if reply[0] != SOCKS5_VERSION {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("not a SOCKS5 listener (version byte {:#04x})", reply[0]),
            ));
        }

        match reply[1] {
            METHOD_NO_AUTH => Ok(()),
            METHOD_NONE_ACCEPTABLE => Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "listener requires authentication",
            )),
            method => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("unexpected SOCKS5 method {:#04x}", method),
            )),
        }
    }

    async fn lookup(&self, client: &Client) -> Result<GeoLocation, LookupError> {
        let response = client
            .get(&self.config.lookup_url)
            .send()
            .await
            .map_err(|e| match (e.is_connect(), e.is_timeout()) {
                (true, true) => LookupError::ConnectTimedOut,
                (true, false) => LookupError::Connect(e.to_string()),
                _ => LookupError::Lookup(e.to_string()),
            })?;

        if !response.status().is_success() {
            return Err(LookupError::Lookup(format!(
                "HTTP status: {}",
                response.status()
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| LookupError::Lookup(e.to_string()))?;

        GeoLocation::from_slice(&body)
            .map_err(|e| LookupError::Lookup(format!("invalid lookup response: {}", e)))
    }

    /// Create a reqwest client tunnelling through the listener.
    ///
    /// `connect_timeout` bounds the SOCKS5 CONNECT; the response itself is
    /// bounded by the probe deadline in [`check`](Self::check).
    fn create_client(&self, port: u16, connect_timeout: Duration) -> reqwest::Result<Client> {
        let proxy_url = format!("socks5://{}:{}", self.config.proxy_host, port);

        Client::builder()
            .proxy(ReqwestProxy::all(&proxy_url)?)
            .connect_timeout(connect_timeout)
            .build()
    }
}

#[async_trait]
impl Prober for ProxyChecker {
    async fn probe(&self, descriptor: &ProxyDescriptor) -> ProbeResult {
        self.check(descriptor).await
    }
}
