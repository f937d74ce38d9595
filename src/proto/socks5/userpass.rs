use crate::{common::error::InvalidValue, io::{WireRequest, WireResponse}};
use anyhow::{ensure, Result};
use bytes::{BufMut, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// RFC 1929 subnegotiation version. Distinct from the SOCKS5 version byte.
const USERPASS_VERSION: u8 = 0x01;

const STATUS_SUCCESS: u8 = 0x00;
const STATUS_FAILURE: u8 = 0x01;

// Once the SOCKS V5 server has started, and the client has selected the
// Username/Password Authentication protocol, the client sends a request:
// +----+------+----------+------+----------+
// |VER | ULEN |  UNAME   | PLEN |  PASSWD  |
// +----+------+----------+------+----------+
// | 1  |  1   | 1 to 255 |  1   | 1 to 255 |
// +----+------+----------+------+----------+

#[derive(Debug)]
pub struct UserPasswordRequest {
    username: String,
    password: String,
}

impl UserPasswordRequest {
    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl WireRequest for UserPasswordRequest {
    async fn read_from<T: AsyncReadExt + Unpin>(stream: &mut T) -> Result<Self>
    where
        Self: std::marker::Sized,
    {
        let version = stream.read_u8().await?;
        ensure!(version == USERPASS_VERSION, InvalidValue::ProtocolVersion(version));

        let ulen = stream.read_u8().await?;
        let mut uname = vec![0u8; ulen as usize];
        stream.read_exact(&mut uname).await?;

        let plen = stream.read_u8().await?;
        let mut passwd = vec![0u8; plen as usize];
        stream.read_exact(&mut passwd).await?;

        Ok(UserPasswordRequest {
            username: String::from_utf8_lossy(&uname).into_owned(),
            password: String::from_utf8_lossy(&passwd).into_owned(),
        })
    }
}

// The server verifies the supplied UNAME and PASSWD, and sends the
// following response:
// +----+--------+
// |VER | STATUS |
// +----+--------+
// | 1  |   1    |
// +----+--------+
// A STATUS field of X'00' indicates success; any other value indicates
// failure and the connection must be closed.

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UserPasswordResponse {
    success: bool,
}

impl UserPasswordResponse {
    pub fn success() -> UserPasswordResponse {
        UserPasswordResponse { success: true }
    }

    pub fn failure() -> UserPasswordResponse {
        UserPasswordResponse { success: false }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }
}

impl WireResponse for UserPasswordResponse {
    async fn write_to<T: AsyncWriteExt + Unpin>(&self, stream: &mut T) -> Result<()> {
        let mut bytes = BytesMut::with_capacity(2);
        bytes.put_u8(USERPASS_VERSION);
        bytes.put_u8(if self.success { STATUS_SUCCESS } else { STATUS_FAILURE });
        stream.write_all(&bytes).await?;
        Ok(())
    }
}
