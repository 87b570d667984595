use crate::error;
use crate::socks5::Socks5UdpConn;
use protocol::TargetAddr;
use std::net::SocketAddr;
use tokio::net::UdpSocket;

/// Either a plain connected UDP socket or one relayed through SOCKS5.
#[derive(Debug)]
pub enum UdpConn {
    Direct(UdpSocket),
    Proxied(Socks5UdpConn),
}

impl UdpConn {
    pub async fn send(&self, buf: &[u8]) -> error::Result<usize> {
        match self {
            Self::Direct(socket) => Ok(socket.send(buf).await?),
            Self::Proxied(conn) => conn.send(buf).await,
        }
    }

    pub async fn recv(&self, buf: &mut [u8]) -> error::Result<usize> {
        match self {
            Self::Direct(socket) => Ok(socket.recv(buf).await?),
            Self::Proxied(conn) => conn.recv(buf).await,
        }
    }

    pub fn local_addr(&self) -> error::Result<SocketAddr> {
        match self {
            Self::Direct(socket) => Ok(socket.local_addr()?),
            Self::Proxied(conn) => conn.local_addr(),
        }
    }

    pub fn peer_addr(&self) -> error::Result<TargetAddr> {
        match self {
            Self::Direct(socket) => Ok(TargetAddr::Ip(socket.peer_addr()?)),
            Self::Proxied(conn) => Ok(conn.peer_addr().clone()),
        }
    }

    pub fn is_proxied(&self) -> bool {
        matches!(self, Self::Proxied(_))
    }
}
