#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum Error {
    #[error("unsupported SOCKS version: {0:#04x}")]
    Version(u8),
    #[error("unknown address type: {0:#04x}")]
    AddrType(u8),
    #[error("truncated message: need {need} bytes, got {got}")]
    Truncated { need: usize, got: usize },
    #[error("domain name too long: {0} bytes")]
    DomainTooLong(usize),
    #[error("{0} must be 1..=255 bytes, got {1}")]
    CredentialLength(&'static str, usize),
    #[error("non-zero reserved field: {0:#06x}")]
    Reserved(u16),
}

pub type Result<T> = std::result::Result<T, Error>;

pub(crate) fn ensure_len(data: &[u8], need: usize) -> Result<()> {
    if data.len() < need {
        return Err(Error::Truncated {
            need,
            got: data.len(),
        });
    }
    Ok(())
}
