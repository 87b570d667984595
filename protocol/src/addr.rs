use crate::error::{self, Error, ensure_len};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AddrType {
    Ipv4 = 0x01,
    Domain = 0x03,
    Ipv6 = 0x04,
}

impl AddrType {
    pub fn from_u8(b: u8) -> error::Result<Self> {
        match b {
            0x01 => Ok(Self::Ipv4),
            0x03 => Ok(Self::Domain),
            0x04 => Ok(Self::Ipv6),
            other => Err(Error::AddrType(other)),
        }
    }

    /// Address length in bytes, or `None` for a length-prefixed domain.
    pub fn fixed_len(self) -> Option<usize> {
        match self {
            Self::Ipv4 => Some(4),
            Self::Ipv6 => Some(16),
            Self::Domain => None,
        }
    }
}

/// `ATYP ADDR PORT` as it appears in requests, replies and UDP headers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TargetAddr {
    Ip(SocketAddr),
    Domain(String, u16),
}

impl TargetAddr {
    pub fn addr_type(&self) -> AddrType {
        match self {
            Self::Ip(SocketAddr::V4(_)) => AddrType::Ipv4,
            Self::Ip(SocketAddr::V6(_)) => AddrType::Ipv6,
            Self::Domain(..) => AddrType::Domain,
        }
    }

    pub fn port(&self) -> u16 {
        match self {
            Self::Ip(addr) => addr.port(),
            Self::Domain(_, port) => *port,
        }
    }

    pub fn encoded_len(&self) -> usize {
        match self {
            Self::Ip(SocketAddr::V4(_)) => 1 + 4 + 2,
            Self::Ip(SocketAddr::V6(_)) => 1 + 16 + 2,
            Self::Domain(host, _) => 1 + 1 + host.len() + 2,
        }
    }

    pub fn encode_into(&self, buf: &mut Vec<u8>) -> error::Result<()> {
        buf.push(self.addr_type() as u8);
        match self {
            Self::Ip(SocketAddr::V4(addr)) => buf.extend_from_slice(&addr.ip().octets()),
            Self::Ip(SocketAddr::V6(addr)) => buf.extend_from_slice(&addr.ip().octets()),
            Self::Domain(host, _) => {
                if host.len() > u8::MAX as usize {
                    return Err(Error::DomainTooLong(host.len()));
                }
                buf.push(host.len() as u8);
                buf.extend_from_slice(host.as_bytes());
            }
        }
        buf.extend_from_slice(&self.port().to_be_bytes());
        Ok(())
    }

    /// Decodes an address from the front of `data`, returning it together
    /// with the number of bytes consumed.
    pub fn decode(data: &[u8]) -> error::Result<(Self, usize)> {
        ensure_len(data, 1)?;
        let atyp = AddrType::from_u8(data[0])?;
        let (host_end, addr) = match atyp {
            AddrType::Ipv4 => {
                ensure_len(data, 1 + 4 + 2)?;
                let octets: [u8; 4] = [data[1], data[2], data[3], data[4]];
                (5, Some(IpAddr::V4(Ipv4Addr::from(octets))))
            }
            AddrType::Ipv6 => {
                ensure_len(data, 1 + 16 + 2)?;
                let mut octets = [0u8; 16];
                octets.copy_from_slice(&data[1..17]);
                (17, Some(IpAddr::V6(Ipv6Addr::from(octets))))
            }
            AddrType::Domain => {
                ensure_len(data, 2)?;
                let len = data[1] as usize;
                ensure_len(data, 2 + len + 2)?;
                (2 + len, None)
            }
        };

        let port = u16::from_be_bytes([data[host_end], data[host_end + 1]]);
        let target = match addr {
            Some(ip) => Self::Ip(SocketAddr::new(ip, port)),
            None => {
                let host = String::from_utf8_lossy(&data[2..host_end]).into_owned();
                Self::Domain(host, port)
            }
        };
        Ok((target, host_end + 2))
    }
}

impl From<SocketAddr> for TargetAddr {
    fn from(addr: SocketAddr) -> Self {
        Self::Ip(addr)
    }
}

impl fmt::Display for TargetAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ip(addr) => write!(f, "{addr}"),
            Self::Domain(host, port) => write!(f, "{host}:{port}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ipv4_wire_layout() {
        let addr = TargetAddr::Ip("192.168.1.1:53".parse().unwrap());
        let mut buf = Vec::new();
        addr.encode_into(&mut buf).unwrap();
        assert_eq!(buf, vec![0x01, 192, 168, 1, 1, 0x00, 0x35]);
        assert_eq!(buf.len(), addr.encoded_len());
    }

    #[test]
    fn domain_wire_layout() {
        let addr = TargetAddr::Domain("example.com".into(), 443);
        let mut buf = Vec::new();
        addr.encode_into(&mut buf).unwrap();
        assert_eq!(buf[0], 0x03);
        assert_eq!(buf[1], 11);
        assert_eq!(&buf[2..13], b"example.com");
        assert_eq!(&buf[13..], &443u16.to_be_bytes());
    }

    #[test]
    fn decode_reports_consumed_bytes() {
        let data = [0x04, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 0x1f, 0x90, 0xaa];
        let (addr, used) = TargetAddr::decode(&data).unwrap();
        assert_eq!(addr, TargetAddr::Ip("[::1]:8080".parse().unwrap()));
        assert_eq!(used, 19);
    }

    #[test]
    fn rejects_long_domain() {
        let addr = TargetAddr::Domain("a".repeat(256), 80);
        let mut buf = Vec::new();
        assert_eq!(addr.encode_into(&mut buf), Err(Error::DomainTooLong(256)));
    }

    #[test]
    fn rejects_truncated_and_unknown() {
        assert!(matches!(
            TargetAddr::decode(&[0x01, 127, 0, 0]),
            Err(Error::Truncated { need: 7, got: 4 })
        ));
        assert_eq!(TargetAddr::decode(&[0x09]), Err(Error::AddrType(0x09)));
    }
}
