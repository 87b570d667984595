use crate::config::{ALL_PROXY_NAMES, DialerConfig, PROTOCOL_TIMEOUT};
use crate::conn::UdpConn;
use crate::env_once::EnvOnce;
use crate::error;
use crate::proxy::ProxyConfig;
use crate::socks5::{Socks5Client, Socks5UdpConn};
use log::debug;
use once_cell::sync::{Lazy, OnceCell};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;
use tokio::net::UdpSocket;

static ALL_PROXY: Lazy<ProxyDialer> = Lazy::new(|| ProxyDialer::new(EnvOnce::new(ALL_PROXY_NAMES)));

/// Dials `raddr` through the SOCKS5 proxy named by `ALL_PROXY` or
/// `all_proxy`.
///
/// `Ok(None)` means no usable proxy is configured (unset, not a URL, or not
/// a `socks5`/`socks5h` URL) and the caller should connect directly. An
/// error means a proxy is configured but could not be used.
pub async fn dial_proxy_from_environment(raddr: SocketAddr) -> error::Result<Option<Socks5UdpConn>> {
    ALL_PROXY.dial(raddr).await
}

/// Like [`dial_proxy_from_environment`], connecting directly when no proxy
/// is configured.
pub async fn dial_udp(raddr: SocketAddr) -> error::Result<UdpConn> {
    ALL_PROXY.dial_or_direct(raddr).await
}

#[derive(Debug)]
pub struct ProxyDialer {
    env: EnvOnce,
    proxy: OnceCell<Option<ProxyConfig>>,
    timeout: Duration,
}

impl ProxyDialer {
    pub fn new(env: EnvOnce) -> Self {
        Self {
            env,
            proxy: OnceCell::new(),
            timeout: PROTOCOL_TIMEOUT,
        }
    }

    pub fn from_config(cfg: &DialerConfig) -> Self {
        Self::new(EnvOnce::new(&cfg.env_names)).with_timeout(cfg.timeout())
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The proxy selected by the environment, parsed once.
    pub fn proxy_config(&self) -> Option<&ProxyConfig> {
        self.proxy
            .get_or_init(|| ProxyConfig::parse(self.env.get()))
            .as_ref()
    }

    pub async fn dial(&self, raddr: SocketAddr) -> error::Result<Option<Socks5UdpConn>> {
        let Some(proxy) = self.proxy_config() else {
            return Ok(None);
        };

        let client = Socks5Client::new(
            proxy.server_addr(),
            proxy.username.as_deref(),
            proxy.password.as_deref(),
            self.timeout,
        )?;

        debug!("dialing {raddr} through {} proxy {}", proxy.scheme, client.server());
        let conn = client.dial_udp(raddr).await?;
        Ok(Some(conn))
    }

    /// Proxy failures are returned as errors, never retried directly.
    pub async fn dial_or_direct(&self, raddr: SocketAddr) -> error::Result<UdpConn> {
        if let Some(conn) = self.dial(raddr).await? {
            return Ok(UdpConn::Proxied(conn));
        }

        let bind_addr = match raddr {
            SocketAddr::V4(_) => SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0),
            SocketAddr::V6(_) => SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), 0),
        };
        let socket = UdpSocket::bind(bind_addr).await?;
        socket.connect(raddr).await?;
        debug!("dialing {raddr} directly from {}", socket.local_addr()?);
        Ok(UdpConn::Direct(socket))
    }
}
