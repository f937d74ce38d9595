use super::{consts, Address, Command};
use crate::{common::error::InvalidValue, io::WireRequest};
use anyhow::{ensure, Result};
use tokio::io::AsyncReadExt;

// The client connects to the server, and sends a
// version identifier/method selection message:
// +----+----------+----------+
// |VER | NMETHODS | METHODS  |
// +----+----------+----------+
// | 1  |    1     | 1 to 255 |
// +----+----------+----------+
//
// `METHODS` is read back as an ordered `Vec<u8>`, duplicates and all: which
// method the server picks depends on the client's offered order, so nothing
// here may reorder or de-duplicate it.

#[derive(Debug)]
pub struct HandshakeRequest {
    auth_methods: Vec<u8>,
}

impl HandshakeRequest {
    #[cfg(test)]
    pub fn new(auth_methods: Vec<u8>) -> HandshakeRequest {
        HandshakeRequest { auth_methods }
    }

    pub fn auth_methods(&self) -> &[u8] {
        &self.auth_methods
    }
}

impl WireRequest for HandshakeRequest {
    async fn read_from<T: AsyncReadExt + Unpin>(stream: &mut T) -> Result<Self>
    where
        Self: std::marker::Sized,
    {
        let mut header: [u8; 2] = [0, 0];
        stream.read_exact(&mut header).await?;

        let (version, nmethods) = (header[0], header[1]);

        ensure!(version == consts::SOCKS5_VERSION, InvalidValue::ProtocolVersion(version));

        let auth_methods = match nmethods {
            0 => Vec::new(),
            n => {
                let mut methods = vec![0u8; n.into()];
                stream.read_exact(&mut methods).await?;
                methods
            }
        };

        Ok(HandshakeRequest { auth_methods })
    }
}

// The SOCKS request information is sent by the client as
// soon as it has established a connection to the SOCKS
// server, and completed the authentication negotiations.
// +----+-----+-------+------+----------+----------+
// |VER | CMD |  RSV  | ATYP | DST.ADDR | DST.PORT |
// +----+-----+-------+------+----------+----------+
// | 1  |  1  | X'00' |  1   | Variable |    2     |
// +----+-----+-------+------+----------+----------+

#[derive(Debug)]
pub struct RelayRequest {
    command: Command,
    target_addr: Address,
}

impl RelayRequest {
    #[cfg(test)]
    pub fn new(command: Command, target_addr: Address) -> RelayRequest {
        RelayRequest { command, target_addr }
    }

    pub fn command(&self) -> Command {
        self.command
    }

    pub fn target_addr(&self) -> &Address {
        &self.target_addr
    }
}

impl WireRequest for RelayRequest {
    async fn read_from<T: AsyncReadExt + Unpin>(stream: &mut T) -> Result<RelayRequest> {
        let mut buff: [u8; 3] = [0, 0, 0];
        stream.read_exact(&mut buff).await?;

        let (version, cmd, reserved) = (buff[0], buff[1], buff[2]);

        ensure!(version == consts::SOCKS5_VERSION, InvalidValue::ProtocolVersion(version));
        ensure!(reserved == 0x00, InvalidValue::ReservedValue(reserved));

        let command = Command::try_from(cmd)?;
        let target_addr = Address::read_from(stream).await?;

        Ok(RelayRequest { command, target_addr })
    }
}
