//! SOCKS5 client side of UDP ASSOCIATE.

use crate::error::{self, Error};
use log::debug;
use protocol::packet::{decode_header, encode_datagram};
use protocol::{
    AddrType, Command, Method, MethodReply, MethodRequest, PasswordReply, PasswordRequest, Reply,
    ReplyCode, Request, TargetAddr,
};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, UdpSocket};

/// `RSV FRAG ATYP LEN <255 bytes> PORT`
const MAX_UDP_HEADER_LEN: usize = 3 + 1 + 1 + 255 + 2;

#[derive(Debug, Clone)]
pub struct Socks5Client {
    server: String,
    credentials: Option<(String, String)>,
    timeout: Duration,
}

impl Socks5Client {
    /// Validates the server address and credentials; no I/O happens here.
    /// Credentials are only offered when both parts are non-empty.
    pub fn new(
        server: impl Into<String>,
        username: Option<&str>,
        password: Option<&str>,
        timeout: Duration,
    ) -> error::Result<Self> {
        let server = server.into();
        validate_server(&server)?;

        let credentials = match (username, password) {
            (Some(user), Some(pass)) if !user.is_empty() && !pass.is_empty() => {
                PasswordRequest {
                    username: user,
                    password: pass,
                }
                .validate()?;
                Some((user.to_owned(), pass.to_owned()))
            }
            _ => None,
        };

        Ok(Self {
            server,
            credentials,
            timeout,
        })
    }

    pub fn server(&self) -> &str {
        &self.server
    }

    /// Opens a UDP association through the proxy and returns a datagram
    /// connection addressed to `target`.
    pub async fn dial_udp(&self, target: impl Into<TargetAddr>) -> error::Result<Socks5UdpConn> {
        let target = target.into();
        let (control, relay) = tokio::time::timeout(self.timeout, self.associate())
            .await
            .map_err(|_| Error::Timeout(self.server.clone(), self.timeout))??;

        let bind_addr = match relay {
            SocketAddr::V4(_) => SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0),
            SocketAddr::V6(_) => SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), 0),
        };
        let socket = UdpSocket::bind(bind_addr).await?;
        socket.connect(relay).await?;

        debug!(
            "UDP association via {} ready: {} -> relay {} -> {}",
            self.server,
            socket.local_addr()?,
            relay,
            target
        );

        Ok(Socks5UdpConn {
            _control: control,
            socket,
            target,
            relay,
        })
    }

    async fn associate(&self) -> error::Result<(TcpStream, SocketAddr)> {
        let mut stream = TcpStream::connect(self.server.as_str()).await?;
        stream.set_nodelay(true)?;
        let proxy_ip = stream.peer_addr()?.ip();

        self.negotiate(&mut stream).await?;

        let unspecified = match proxy_ip {
            IpAddr::V4(_) => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            IpAddr::V6(_) => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
        };
        let request = Request {
            command: Command::UdpAssociate,
            target: TargetAddr::Ip(SocketAddr::new(unspecified, 0)),
        };
        stream.write_all(&request.encode()?).await?;

        let reply = read_reply(&mut stream).await?;
        if reply.code != ReplyCode::Succeeded {
            return Err(Error::Rejected(reply.code));
        }

        let relay = match reply.bound {
            TargetAddr::Ip(addr) if addr.ip().is_unspecified() => {
                SocketAddr::new(proxy_ip, addr.port())
            }
            TargetAddr::Ip(addr) => addr,
            TargetAddr::Domain(host, port) => tokio::net::lookup_host((host.as_str(), port))
                .await?
                .next()
                .ok_or_else(|| Error::InvalidProxyAddress(format!("{host}:{port}")))?,
        };

        Ok((stream, relay))
    }

    async fn negotiate(&self, stream: &mut TcpStream) -> error::Result<()> {
        let methods = match self.credentials {
            Some(_) => vec![Method::NoAuth, Method::Password],
            None => vec![Method::NoAuth],
        };
        stream.write_all(&MethodRequest { methods }.encode()).await?;

        let mut resp = [0u8; MethodReply::LEN];
        stream.read_exact(&mut resp).await?;

        match MethodReply::decode(&resp)?.method {
            Method::NoAuth => Ok(()),
            Method::Password => {
                let Some((username, password)) = &self.credentials else {
                    return Err(Error::CredentialsRequired);
                };
                let auth = PasswordRequest {
                    username: username.as_str(),
                    password: password.as_str(),
                }
                .encode()?;
                stream.write_all(&auth).await?;

                let mut resp = [0u8; PasswordReply::LEN];
                stream.read_exact(&mut resp).await?;
                let reply = PasswordReply::decode(&resp)?;
                if !reply.is_success() {
                    return Err(Error::AuthFailed(reply.status));
                }
                Ok(())
            }
            Method::NoAcceptable => Err(Error::NoAcceptableMethod),
            Method::Other(m) => Err(Error::UnsupportedMethod(m)),
        }
    }
}

fn validate_server(server: &str) -> error::Result<()> {
    let invalid = || Error::InvalidProxyAddress(server.to_owned());
    let (host, port) = server.rsplit_once(':').ok_or_else(invalid)?;
    let host = host.trim_start_matches('[').trim_end_matches(']');
    if host.is_empty() {
        return Err(invalid());
    }
    port.parse::<u16>().map_err(|_| invalid())?;
    Ok(())
}

async fn read_reply(stream: &mut TcpStream) -> error::Result<Reply> {
    let mut buf = vec![0u8; Reply::HEADER_LEN];
    stream.read_exact(&mut buf).await?;

    let addr_len = match AddrType::from_u8(buf[3])?.fixed_len() {
        Some(len) => len,
        None => {
            let len = stream.read_u8().await?;
            buf.push(len);
            len as usize
        }
    };
    let start = buf.len();
    buf.resize(start + addr_len + 2, 0);
    stream.read_exact(&mut buf[start..]).await?;

    Ok(Reply::decode(&buf)?)
}

/// A UDP "connection" relayed through a SOCKS5 proxy. Dropping it closes
/// the TCP control connection, which ends the association.
#[derive(Debug)]
pub struct Socks5UdpConn {
    _control: TcpStream,
    socket: UdpSocket,
    target: TargetAddr,
    relay: SocketAddr,
}

impl Socks5UdpConn {
    /// Sends `buf` to the dial target. Returns the payload length.
    pub async fn send(&self, buf: &[u8]) -> error::Result<usize> {
        let packet = encode_datagram(0, &self.target, buf)?;
        self.socket.send(&packet).await?;
        Ok(buf.len())
    }

    pub async fn send_to(&self, buf: &[u8], target: &TargetAddr) -> error::Result<usize> {
        let packet = encode_datagram(0, target, buf)?;
        self.socket.send(&packet).await?;
        Ok(buf.len())
    }

    /// Receives one payload, truncated to `buf.len()`.
    pub async fn recv(&self, buf: &mut [u8]) -> error::Result<usize> {
        let (n, _) = self.recv_from(buf).await?;
        Ok(n)
    }

    /// Receives one payload and the address it came from. Fragmented and
    /// malformed datagrams are skipped.
    pub async fn recv_from(&self, buf: &mut [u8]) -> error::Result<(usize, TargetAddr)> {
        let mut recv_buf = vec![0u8; buf.len() + MAX_UDP_HEADER_LEN];
        loop {
            let n = self.socket.recv(&mut recv_buf).await?;
            match decode_header(&recv_buf[..n]) {
                Ok((0, from, offset)) => {
                    let len = (n - offset).min(buf.len());
                    buf[..len].copy_from_slice(&recv_buf[offset..offset + len]);
                    return Ok((len, from));
                }
                Ok((frag, from, _)) => {
                    debug!("dropping fragment {frag} from {from}");
                }
                Err(err) => {
                    debug!("dropping malformed datagram from relay {}: {err}", self.relay);
                }
            }
        }
    }

    pub fn local_addr(&self) -> error::Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    pub fn peer_addr(&self) -> &TargetAddr {
        &self.target
    }

    pub fn relay_addr(&self) -> SocketAddr {
        self.relay
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(60);

    #[test]
    fn new_accepts_host_port() {
        let c = Socks5Client::new("proxy.local:1080", None, None, TIMEOUT).unwrap();
        assert_eq!(c.server(), "proxy.local:1080");
        assert!(c.credentials.is_none());

        Socks5Client::new("[::1]:1080", Some("u"), Some("p"), TIMEOUT).unwrap();
    }

    #[test]
    fn new_rejects_bad_address() {
        for addr in ["", "proxy", ":1080", "proxy:http", "proxy:70000"] {
            assert!(
                matches!(
                    Socks5Client::new(addr, None, None, TIMEOUT),
                    Err(Error::InvalidProxyAddress(_))
                ),
                "{addr}"
            );
        }
    }

    #[test]
    fn new_rejects_oversized_credentials() {
        let long = "u".repeat(256);
        let err = Socks5Client::new("proxy:1080", Some(&long), Some("p"), TIMEOUT).unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }

    #[test]
    fn username_alone_is_not_offered() {
        let c = Socks5Client::new("proxy:1080", Some("user"), None, TIMEOUT).unwrap();
        assert!(c.credentials.is_none());
    }

    #[tokio::test]
    async fn unreachable_proxy_fails() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let c = Socks5Client::new(addr.to_string(), None, None, TIMEOUT).unwrap();
        let err = c
            .dial_udp("127.0.0.1:53".parse::<SocketAddr>().unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
