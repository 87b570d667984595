use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Protocol(#[from] protocol::error::Error),

    #[error("{0}")]
    Config(#[from] toml::de::Error),

    #[error("invalid proxy address: {0}")]
    InvalidProxyAddress(String),

    #[error("SOCKS5 handshake with {0} timed out after {1:?}")]
    Timeout(String, Duration),

    #[error("proxy accepted none of the offered auth methods")]
    NoAcceptableMethod,

    #[error("proxy selected unsupported auth method {0:#04x}")]
    UnsupportedMethod(u8),

    #[error("proxy requires a username and password")]
    CredentialsRequired,

    #[error("proxy authentication failed (status {0:#04x})")]
    AuthFailed(u8),

    #[error("proxy rejected UDP ASSOCIATE: {0}")]
    Rejected(protocol::ReplyCode),
}

pub type Result<T> = std::result::Result<T, Error>;
