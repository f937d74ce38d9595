use crate::proto::socks5::Command;
use thiserror::Error;

/// Errors confined to a single connection. Every variant here is mapped to
/// either a SOCKS5 reply code (`ReplyStatus`) or a silent close, never
/// propagated to the `Server`.
#[derive(Error, Debug, PartialEq)]
pub enum ProxyError {
    #[error("data has incorrect / corrupted field: {0}")]
    DataError(InvalidValue),
    #[error("failed UTF-8 decoding of domain name: {0}")]
    DomainNameDecodingFailed(std::string::FromUtf8Error),
    #[error("{0} is not supported")]
    Unsupported(Unsupported),
    #[error("unable to resolve domain name {0}")]
    UnresolvedDomainName(String),
    #[error("dial to endpoint timed out")]
    DialTimeout,
    #[error("unable to agree on an authentication method")]
    NoAcceptableAuthMethod,
    #[error("authentication failed")]
    AuthenticationFailed,
    #[error("handshake read timed out")]
    HandshakeTimeout,
}

#[derive(Error, Debug, PartialEq)]
pub enum InvalidValue {
    #[error("invalid 'reserved' value {0:#04x}")]
    ReservedValue(u8),
    #[error("invalid type of network address {0:#04x}")]
    AddressType(u8),
    #[error("invalid version of protocol {0:#04x}")]
    ProtocolVersion(u8),
    #[error("invalid SOCKS command {0:#04x}")]
    SocksCommand(u8),
    #[error("empty methods list")]
    EmptyMethodList,
    #[error("domain name must be at least 1 byte long")]
    EmptyDomainName,
    #[error("domain name {0:?} is not ASCII or contains a NUL byte")]
    MalformedDomainName(String),
}

#[derive(Error, Debug, PartialEq)]
pub enum Unsupported {
    #[error("{0:?} SOCKS command")]
    SocksCommand(Command),
}
