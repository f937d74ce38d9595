use std::{
    fmt::Debug,
    ops::{Deref, DerefMut},
};

use super::{RequestRead, ResponseWrite, WireRequest, WireResponse};
use anyhow::Result;
use log::trace;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

#[cfg(test)]
use mockall::mock;

/// Thin wrapper around a duplex stream that adds framed request/response
/// read/write and trace logging. Everything that needs the raw stream
/// (`TcpStream::connect`, `shutdown`, ...) reaches it through `Deref`.
pub struct Socks5Stream<Stream>
where
    Stream: AsyncReadExt + AsyncWriteExt + Unpin,
{
    stream: Stream,
}

impl<Stream> Socks5Stream<Stream>
where
    Stream: AsyncReadExt + AsyncWriteExt + Unpin,
{
    pub fn new(stream: Stream) -> Socks5Stream<Stream> {
        Socks5Stream { stream }
    }

    pub fn into_inner(self) -> Stream {
        self.stream
    }
}

impl<Stream> RequestRead for Socks5Stream<Stream>
where
    Stream: AsyncReadExt + AsyncWriteExt + Unpin,
{
    async fn read_request<Request>(&mut self) -> Result<Request>
    where
        Request: WireRequest + Debug,
    {
        let request = Request::read_from(&mut self.stream).await?;
        trace!("read {:?}", request);

        Ok(request)
    }
}

impl<Stream> ResponseWrite for Socks5Stream<Stream>
where
    Stream: AsyncReadExt + AsyncWriteExt + Unpin,
{
    async fn write_response<Response>(&mut self, response: Response) -> Result<()>
    where
        Response: WireResponse + Debug,
    {
        Response::write_to(&response, &mut self.stream).await?;
        trace!("wrote {:?}", response);

        Ok(())
    }
}

impl<Stream> Deref for Socks5Stream<Stream>
where
    Stream: AsyncReadExt + AsyncWriteExt + Unpin,
{
    type Target = Stream;
    fn deref(&self) -> &Self::Target {
        &self.stream
    }
}

impl<Stream> DerefMut for Socks5Stream<Stream>
where
    Stream: AsyncReadExt + AsyncWriteExt + Unpin,
{
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.stream
    }
}

#[cfg(test)]
mock! {
  pub Socks5Stream<Stream: AsyncReadExt + AsyncWriteExt + Unpin + 'static> {}

  impl<Stream: AsyncReadExt + AsyncWriteExt + Unpin> RequestRead for Socks5Stream<Stream> {
      async fn read_request<Request: WireRequest + Debug + 'static>(&mut self) -> Result<Request>;
  }

  impl<Stream: AsyncReadExt + AsyncWriteExt + Unpin> ResponseWrite for Socks5Stream<Stream> {
      async fn write_response<Response: WireResponse + Debug + 'static>(&mut self, response: Response) -> Result<()>;
  }

  impl<Stream: AsyncReadExt + AsyncWriteExt + Unpin> Deref for Socks5Stream<Stream> {
      type Target = Stream;
      fn deref(&self) -> &<MockSocks5Stream<Stream> as Deref>::Target;
  }

  impl<Stream: AsyncReadExt + AsyncWriteExt + Unpin> DerefMut for Socks5Stream<Stream> {
      fn deref_mut(&mut self) -> &mut Stream;
  }
}
