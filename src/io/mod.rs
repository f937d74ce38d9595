use anyhow::Result;
use std::fmt::Debug;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

pub mod stream;
pub mod relay;

/// A frame the server reads off the wire (greeting, relay request, RFC 1929
/// sub-request).
pub trait WireRequest {
    async fn read_from<T: AsyncReadExt + Unpin>(stream: &mut T) -> Result<Self>
    where
        Self: std::marker::Sized;
}

/// A frame the server writes to the wire (method selection, relay reply,
/// RFC 1929 sub-reply).
pub trait WireResponse {
    async fn write_to<T: AsyncWriteExt + Unpin>(&self, stream: &mut T) -> Result<()>;
}

pub trait ResponseWrite {
    async fn write_response<Response>(&mut self, response: Response) -> Result<()>
    where
        Response: WireResponse + Debug + 'static;
}

pub trait RequestRead {
    async fn read_request<Request>(&mut self) -> Result<Request>
    where
        Request: WireRequest + Debug + 'static;
}
