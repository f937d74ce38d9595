use anyhow::Result;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
};

/// Byte counters for one finished relay, reported back for logging.
#[derive(Debug, Clone, Copy, Default)]
pub struct RelayStats {
    pub client_to_endpoint: u64,
    pub endpoint_to_client: u64,
}

/// Copies bytes in both directions between `client` and `endpoint` until both
/// halves have seen EOF. Each direction is its own task so that a read-EOF on
/// one side only half-closes its destination (`shutdown()`), rather than
/// tearing down the whole connection the instant either side goes quiet.
pub async fn relay(client: TcpStream, endpoint: TcpStream) -> Result<RelayStats> {
    let (mut client_rd, mut client_wr) = client.into_split();
    let (mut endpoint_rd, mut endpoint_wr) = endpoint.into_split();

    let client_to_endpoint = async {
        let copied = tokio::io::copy(&mut client_rd, &mut endpoint_wr).await?;
        endpoint_wr.shutdown().await?;
        Ok::<u64, anyhow::Error>(copied)
    };

    let endpoint_to_client = async {
        let copied = tokio::io::copy(&mut endpoint_rd, &mut client_wr).await?;
        client_wr.shutdown().await?;
        Ok::<u64, anyhow::Error>(copied)
    };

    let (client_to_endpoint, endpoint_to_client) = tokio::try_join!(
        tokio::spawn(client_to_endpoint),
        tokio::spawn(endpoint_to_client)
    )?;

    Ok(RelayStats {
        client_to_endpoint: client_to_endpoint?,
        endpoint_to_client: endpoint_to_client?,
    })
}
