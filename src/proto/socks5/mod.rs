///
/// SOCKS5 protocol implementation details.
///
/// RFC 1928 — https://datatracker.ietf.org/doc/html/rfc1928
/// RFC 1929 — https://datatracker.ietf.org/doc/html/rfc1929 (username/password sub-protocol)
///
use crate::common::{
    error::{InvalidValue, ProxyError, Unsupported},
    net::Address,
};
use anyhow::{bail, Result};
use bytes::BufMut;
use std::{fmt::Display, net::SocketAddr};
use tokio::io::AsyncReadExt;

pub mod request;
pub mod response;
pub mod userpass;


#[rustfmt::skip]
pub mod consts {
    pub const SOCKS5_VERSION: u8 = 0x05;

    pub mod auth {
        pub const METHOD_NONE: u8 = 0x00;
        pub const METHOD_GSSAPI: u8 = 0x01;
        pub const METHOD_PASSWORD: u8 = 0x02;
        pub const METHOD_NO_ACCEPTABLE: u8 = 0xff;
    }

    pub mod command {
        pub const CMD_CONNECT: u8 = 0x01;
        pub const CMD_BIND: u8 = 0x02;
        pub const CMD_UDP_ASSOCIATE: u8 = 0x03;
    }

    pub mod address {
        pub const ATYP_IPV4: u8 = 0x01;
        pub const ATYP_DOMAIN_NAME: u8 = 0x03;
        pub const ATYP_IPV6: u8 = 0x04;
    }

    pub mod reply {
        pub const REP_SUCCEEDED: u8 = 0x00;
        pub const REP_GENERAL_FAILURE: u8 = 0x01;
        pub const REP_CONNECTION_NOT_ALLOWED: u8 = 0x02;
        pub const REP_NETWORK_UNREACHABLE: u8 = 0x03;
        pub const REP_HOST_UNREACHABLE: u8 = 0x04;
        pub const REP_CONNECTION_REFUSED: u8 = 0x05;
        pub const REP_TTL_EXPIRED: u8 = 0x06;
        pub const REP_COMMAND_NOT_SUPPORTED: u8 = 0x07;
        pub const REP_ADDRESS_TYPE_NOT_SUPPORTED: u8 = 0x08;
    }
}

/// The SOCKS5 command carried by a relay request. Only `Connect` is ever
/// dialed; `Bind`/`UdpAssociate` parse successfully but are always answered
/// with `ReplyStatus::CommandNotSupported`.
#[repr(u8)]
#[rustfmt::skip]
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum Command {
    Connect,
    Bind,
    UdpAssociate,
}

impl TryFrom<u8> for Command {
    type Error = ProxyError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        use consts::command::*;
        match value {
            CMD_CONNECT => Ok(Command::Connect),
            CMD_BIND => Ok(Command::Bind),
            CMD_UDP_ASSOCIATE => Ok(Command::UdpAssociate),
            _ => Err(ProxyError::DataError(InvalidValue::SocksCommand(value))),
        }
    }
}

impl Address {
    pub async fn read_from<T: AsyncReadExt + Unpin>(stream: &mut T) -> Result<Address> {
        use consts::address::*;
        let address_type = stream.read_u8().await?;

        match address_type {
            ATYP_IPV4 => Address::read_ipv4(stream).await,
            ATYP_IPV6 => Address::read_ipv6(stream).await,
            ATYP_DOMAIN_NAME => {
                let len = stream.read_u8().await?;
                Address::read_domain_name(stream, len).await
            }
            _ => bail!(ProxyError::DataError(InvalidValue::AddressType(address_type))),
        }
    }

    pub fn write_to<T: BufMut>(&self, buf: &mut T) {
        match self {
            Address::SocketAddress(SocketAddr::V4(ipv4_addr)) => {
                buf.put_u8(consts::address::ATYP_IPV4);
                Address::write_ipv4(buf, ipv4_addr)
            }
            Address::SocketAddress(SocketAddr::V6(ipv6_addr)) => {
                buf.put_u8(consts::address::ATYP_IPV6);
                Address::write_ipv6(buf, ipv6_addr)
            }
            Address::DomainName(name, port) => {
                buf.put_u8(consts::address::ATYP_DOMAIN_NAME);
                Address::write_domain_name(buf, name, *port)
            }
        }
    }
}

/// The REP byte of a relay reply (base spec §4.1).
#[derive(Debug, Clone, Copy, PartialEq)]
#[allow(dead_code)]
pub enum ReplyStatus {
    Succeeded,
    GeneralFailure,
    ConnectionNotAllowed,
    NetworkUnreachable,
    HostUnreachable,
    ConnectionRefused,
    TtlExpired,
    CommandNotSupported,
    AddressTypeNotSupported,
    OtherReply(u8),
}

impl ReplyStatus {
    #[rustfmt::skip]
    pub fn as_u8(self) -> u8 {
        match self {
            ReplyStatus::Succeeded               => consts::reply::REP_SUCCEEDED,
            ReplyStatus::GeneralFailure          => consts::reply::REP_GENERAL_FAILURE,
            ReplyStatus::ConnectionNotAllowed    => consts::reply::REP_CONNECTION_NOT_ALLOWED,
            ReplyStatus::NetworkUnreachable      => consts::reply::REP_NETWORK_UNREACHABLE,
            ReplyStatus::HostUnreachable         => consts::reply::REP_HOST_UNREACHABLE,
            ReplyStatus::ConnectionRefused       => consts::reply::REP_CONNECTION_REFUSED,
            ReplyStatus::TtlExpired              => consts::reply::REP_TTL_EXPIRED,
            ReplyStatus::CommandNotSupported     => consts::reply::REP_COMMAND_NOT_SUPPORTED,
            ReplyStatus::AddressTypeNotSupported => consts::reply::REP_ADDRESS_TYPE_NOT_SUPPORTED,
            ReplyStatus::OtherReply(other)       => other,
        }
    }
}

impl Display for ReplyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            ReplyStatus::Succeeded => write!(f, "succeeded"),
            ReplyStatus::GeneralFailure => write!(f, "general failure"),
            ReplyStatus::ConnectionNotAllowed => write!(f, "connection not allowed"),
            ReplyStatus::NetworkUnreachable => write!(f, "network unreachable"),
            ReplyStatus::HostUnreachable => write!(f, "host unreachable"),
            ReplyStatus::ConnectionRefused => write!(f, "connection refused"),
            ReplyStatus::TtlExpired => write!(f, "TTL expired"),
            ReplyStatus::CommandNotSupported => write!(f, "command not supported"),
            ReplyStatus::AddressTypeNotSupported => write!(f, "address type not supported"),
            ReplyStatus::OtherReply(code) => write!(f, "other reply ({code:#04x})"),
        }
    }
}

impl From<&ProxyError> for ReplyStatus {
    fn from(err: &ProxyError) -> Self {
        match err {
            ProxyError::Unsupported(Unsupported::SocksCommand(_)) => ReplyStatus::CommandNotSupported,
            ProxyError::DataError(InvalidValue::SocksCommand(_)) => ReplyStatus::CommandNotSupported,
            ProxyError::DataError(InvalidValue::AddressType(_)) => ReplyStatus::AddressTypeNotSupported,
            ProxyError::UnresolvedDomainName(_) => ReplyStatus::HostUnreachable,
            ProxyError::DialTimeout => ReplyStatus::TtlExpired,
            _ => ReplyStatus::GeneralFailure,
        }
    }
}

impl From<anyhow::Error> for ReplyStatus {
    fn from(err: anyhow::Error) -> Self {
        let err = match err.downcast::<ProxyError>() {
            Ok(proxy_err) => return ReplyStatus::from(&proxy_err),
            Err(err) => err,
        };
        match err.downcast::<std::io::Error>() {
            Ok(io) => ReplyStatus::from(io.kind()),
            Err(_) => ReplyStatus::GeneralFailure,
        }
    }
}

impl From<std::io::ErrorKind> for ReplyStatus {
    fn from(kind: std::io::ErrorKind) -> Self {
        use std::io::ErrorKind;
        match kind {
            ErrorKind::ConnectionRefused => ReplyStatus::ConnectionRefused,
            ErrorKind::HostUnreachable => ReplyStatus::HostUnreachable,
            ErrorKind::NetworkUnreachable => ReplyStatus::NetworkUnreachable,
            ErrorKind::TimedOut => ReplyStatus::TtlExpired,
            _ => ReplyStatus::GeneralFailure,
        }
    }
}
