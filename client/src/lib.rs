//! Dial UDP destinations through the SOCKS5 proxy named by `ALL_PROXY`,
//! or directly when none is configured.

pub mod config;
pub mod conn;
pub mod dial;
pub mod env_once;
pub mod error;
pub mod proxy;
pub mod socks5;

pub use config::DialerConfig;
pub use conn::UdpConn;
pub use dial::{ProxyDialer, dial_proxy_from_environment, dial_udp};
pub use env_once::EnvOnce;
pub use proxy::{ProxyConfig, ProxyScheme};
pub use socks5::{Socks5Client, Socks5UdpConn};
