//! Control-channel messages exchanged over TCP before a UDP association
//! is usable (RFC 1928 sections 3-6, RFC 1929).

use crate::addr::TargetAddr;
use crate::error::{self, Error, ensure_len};
use std::fmt;

pub const VERSION: u8 = 0x05;
pub const PASSWORD_AUTH_VERSION: u8 = 0x01;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    NoAuth,
    Password,
    NoAcceptable,
    Other(u8),
}

impl From<u8> for Method {
    fn from(b: u8) -> Self {
        match b {
            0x00 => Self::NoAuth,
            0x02 => Self::Password,
            0xff => Self::NoAcceptable,
            other => Self::Other(other),
        }
    }
}

impl From<Method> for u8 {
    fn from(m: Method) -> u8 {
        match m {
            Method::NoAuth => 0x00,
            Method::Password => 0x02,
            Method::NoAcceptable => 0xff,
            Method::Other(b) => b,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodRequest {
    pub methods: Vec<Method>,
}

impl MethodRequest {
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(2 + self.methods.len());
        buf.push(VERSION);
        buf.push(self.methods.len() as u8);
        buf.extend(self.methods.iter().map(|m| u8::from(*m)));
        buf
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodReply {
    pub method: Method,
}

impl MethodReply {
    pub const LEN: usize = 2;

    pub fn decode(data: &[u8]) -> error::Result<Self> {
        ensure_len(data, Self::LEN)?;
        if data[0] != VERSION {
            return Err(Error::Version(data[0]));
        }
        Ok(Self {
            method: Method::from(data[1]),
        })
    }
}

/// Username/password sub-negotiation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

impl PasswordRequest<'_> {
    pub fn validate(&self) -> error::Result<()> {
        check_credential("username", self.username)?;
        check_credential("password", self.password)
    }

    pub fn encode(&self) -> error::Result<Vec<u8>> {
        self.validate()?;
        let mut buf = Vec::with_capacity(3 + self.username.len() + self.password.len());
        buf.push(PASSWORD_AUTH_VERSION);
        buf.push(self.username.len() as u8);
        buf.extend_from_slice(self.username.as_bytes());
        buf.push(self.password.len() as u8);
        buf.extend_from_slice(self.password.as_bytes());
        Ok(buf)
    }
}

fn check_credential(what: &'static str, value: &str) -> error::Result<()> {
    if value.is_empty() || value.len() > u8::MAX as usize {
        return Err(Error::CredentialLength(what, value.len()));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordReply {
    pub status: u8,
}

impl PasswordReply {
    pub const LEN: usize = 2;

    pub fn decode(data: &[u8]) -> error::Result<Self> {
        ensure_len(data, Self::LEN)?;
        if data[0] != PASSWORD_AUTH_VERSION {
            return Err(Error::Version(data[0]));
        }
        Ok(Self { status: data[1] })
    }

    pub fn is_success(&self) -> bool {
        self.status == 0x00
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Command {
    Connect = 0x01,
    Bind = 0x02,
    UdpAssociate = 0x03,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub command: Command,
    pub target: TargetAddr,
}

impl Request {
    pub fn encode(&self) -> error::Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(3 + self.target.encoded_len());
        buf.extend_from_slice(&[VERSION, self.command as u8, 0x00]);
        self.target.encode_into(&mut buf)?;
        Ok(buf)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyCode {
    Succeeded,
    GeneralFailure,
    NotAllowed,
    NetworkUnreachable,
    HostUnreachable,
    ConnectionRefused,
    TtlExpired,
    CommandNotSupported,
    AddrTypeNotSupported,
    Unknown(u8),
}

impl From<u8> for ReplyCode {
    fn from(b: u8) -> Self {
        match b {
            0x00 => Self::Succeeded,
            0x01 => Self::GeneralFailure,
            0x02 => Self::NotAllowed,
            0x03 => Self::NetworkUnreachable,
            0x04 => Self::HostUnreachable,
            0x05 => Self::ConnectionRefused,
            0x06 => Self::TtlExpired,
            0x07 => Self::CommandNotSupported,
            0x08 => Self::AddrTypeNotSupported,
            other => Self::Unknown(other),
        }
    }
}

impl From<ReplyCode> for u8 {
    fn from(code: ReplyCode) -> u8 {
        match code {
            ReplyCode::Succeeded => 0x00,
            ReplyCode::GeneralFailure => 0x01,
            ReplyCode::NotAllowed => 0x02,
            ReplyCode::NetworkUnreachable => 0x03,
            ReplyCode::HostUnreachable => 0x04,
            ReplyCode::ConnectionRefused => 0x05,
            ReplyCode::TtlExpired => 0x06,
            ReplyCode::CommandNotSupported => 0x07,
            ReplyCode::AddrTypeNotSupported => 0x08,
            ReplyCode::Unknown(b) => b,
        }
    }
}

impl fmt::Display for ReplyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Succeeded => f.write_str("succeeded"),
            Self::GeneralFailure => f.write_str("general SOCKS server failure"),
            Self::NotAllowed => f.write_str("connection not allowed by ruleset"),
            Self::NetworkUnreachable => f.write_str("network unreachable"),
            Self::HostUnreachable => f.write_str("host unreachable"),
            Self::ConnectionRefused => f.write_str("connection refused"),
            Self::TtlExpired => f.write_str("TTL expired"),
            Self::CommandNotSupported => f.write_str("command not supported"),
            Self::AddrTypeNotSupported => f.write_str("address type not supported"),
            Self::Unknown(b) => write!(f, "unknown reply code {b:#04x}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub code: ReplyCode,
    pub bound: TargetAddr,
}

impl Reply {
    /// `VER REP RSV ATYP`, the part read before the address length is known.
    pub const HEADER_LEN: usize = 4;

    pub fn encode(&self) -> error::Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(3 + self.bound.encoded_len());
        buf.extend_from_slice(&[VERSION, u8::from(self.code), 0x00]);
        self.bound.encode_into(&mut buf)?;
        Ok(buf)
    }

    pub fn decode(data: &[u8]) -> error::Result<Self> {
        ensure_len(data, Self::HEADER_LEN)?;
        if data[0] != VERSION {
            return Err(Error::Version(data[0]));
        }
        let (bound, _) = TargetAddr::decode(&data[3..])?;
        Ok(Self {
            code: ReplyCode::from(data[1]),
            bound,
        })
    }
}

#[test]
fn method_request_offers_password_after_noauth() {
    let req = MethodRequest {
        methods: vec![Method::NoAuth, Method::Password],
    };
    assert_eq!(req.encode(), vec![0x05, 0x02, 0x00, 0x02]);
}

#[test]
fn password_request_layout() {
    let req = PasswordRequest {
        username: "user",
        password: "pass",
    };
    assert_eq!(
        req.encode().unwrap(),
        b"\x01\x04user\x04pass".to_vec()
    );

    let empty = PasswordRequest {
        username: "user",
        password: "",
    };
    assert_eq!(empty.encode(), Err(Error::CredentialLength("password", 0)));
}

#[test]
fn udp_associate_request_layout() {
    let req = Request {
        command: Command::UdpAssociate,
        target: TargetAddr::Ip("0.0.0.0:0".parse().unwrap()),
    };
    assert_eq!(
        req.encode().unwrap(),
        vec![0x05, 0x03, 0x00, 0x01, 0, 0, 0, 0, 0, 0]
    );
}

#[test]
fn reply_decodes_failure_code() {
    let data = [0x05, 0x07, 0x00, 0x01, 10, 0, 0, 1, 0x04, 0x38];
    let reply = Reply::decode(&data).unwrap();
    assert_eq!(reply.code, ReplyCode::CommandNotSupported);
    assert_eq!(reply.bound, TargetAddr::Ip("10.0.0.1:1080".parse().unwrap()));
    assert_eq!(reply.code.to_string(), "command not supported");
}

#[test]
fn reply_rejects_wrong_version() {
    let data = [0x04, 0x00, 0x00, 0x01, 0, 0, 0, 0, 0, 0];
    assert_eq!(Reply::decode(&data), Err(Error::Version(0x04)));
}
