use crate::error;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

pub const ALL_PROXY_NAMES: &[&str] = &["ALL_PROXY", "all_proxy"];

/// Bound on TCP connect plus SOCKS5 negotiation. UDP read/write deadlines
/// are left to the caller.
pub const PROTOCOL_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct DialerConfig {
    #[serde(default = "default_env_names")]
    pub env_names: Vec<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_env_names() -> Vec<String> {
    ALL_PROXY_NAMES.iter().map(|n| n.to_string()).collect()
}

fn default_timeout_secs() -> u64 {
    PROTOCOL_TIMEOUT.as_secs()
}

impl Default for DialerConfig {
    fn default() -> Self {
        Self {
            env_names: default_env_names(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl DialerConfig {
    pub fn load(path: impl AsRef<Path>) -> error::Result<Self> {
        let cfg = std::fs::read_to_string(path)?;
        Self::from_toml(&cfg)
    }

    pub fn from_toml(cfg: &str) -> error::Result<Self> {
        let loaded = toml::from_str::<DialerConfig>(cfg)?;
        Ok(loaded)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let cfg = DialerConfig::from_toml("").unwrap();
        assert_eq!(cfg, DialerConfig::default());
        assert_eq!(cfg.env_names, vec!["ALL_PROXY", "all_proxy"]);
        assert_eq!(cfg.timeout(), Duration::from_secs(60));
    }

    #[test]
    fn overrides() {
        let cfg = DialerConfig::from_toml(
            r#"
            env_names = ["SOCKS_PROXY"]
            timeout_secs = 5
            "#,
        )
        .unwrap();
        assert_eq!(cfg.env_names, vec!["SOCKS_PROXY"]);
        assert_eq!(cfg.timeout(), Duration::from_secs(5));
    }

    #[test]
    fn rejects_bad_types() {
        assert!(matches!(
            DialerConfig::from_toml("timeout_secs = \"soon\""),
            Err(error::Error::Config(_))
        ));
    }
}
