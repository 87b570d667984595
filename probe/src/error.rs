use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    Client(#[from] client::error::Error),

    #[error("no reply within {0:?}")]
    NoReply(Duration),
}

pub type Result<T> = std::result::Result<T, Error>;
