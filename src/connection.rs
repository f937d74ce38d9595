use crate::{
    auth::{self, AuthHandler},
    common::{
        error::{ProxyError, Unsupported},
        logging::{log_relay_closed, log_relay_closed_with_error, log_relay_established},
    },
    io::{relay, stream::Socks5Stream, RequestRead, ResponseWrite},
    proto::socks5::{
        request::{HandshakeRequest, RelayRequest},
        response::RelayResponse,
        Command,
    },
};
use anyhow::{anyhow, Result};
use human_bytes::human_bytes;
use log::{debug, info, warn};
use std::{collections::HashSet, fmt::Display, net::SocketAddr, sync::Arc, time::Duration};
use tokio::{net::TcpStream, time::timeout};

/// Mirrors the state diagram in the base spec §4.3. Control flow is a
/// straight-line `async fn`, not a dispatch table; this enum exists purely
/// so lifecycle logging can say which phase a connection died in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    AwaitGreeting,
    Authenticating,
    AwaitRequest,
    ResolvingAndDialing,
    Relaying,
    Terminated,
}

impl Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

/// One accepted client socket, driven through the handshake and (on
/// success) the byte relay. Owns the client socket for its entire
/// lifetime and the endpoint socket from dial until relay teardown.
pub struct Connection {
    stream: Socks5Stream<TcpStream>,
    peer_addr: SocketAddr,
    local_addr: SocketAddr,
    state: ConnectionState,
    auth_handlers: Arc<[AuthHandler]>,
    supported_commands: Arc<HashSet<Command>>,
    handshake_read_timeout: Duration,
    dial_timeout: Duration,
}

impl Connection {
    pub fn new(
        stream: TcpStream,
        auth_handlers: Arc<[AuthHandler]>,
        supported_commands: Arc<HashSet<Command>>,
        handshake_read_timeout: Duration,
        dial_timeout: Duration,
    ) -> Result<Connection> {
        let peer_addr = stream.peer_addr()?;
        let local_addr = stream.local_addr()?;

        Ok(Connection {
            stream: Socks5Stream::new(stream),
            peer_addr,
            local_addr,
            state: ConnectionState::AwaitGreeting,
            auth_handlers,
            supported_commands,
            handshake_read_timeout,
            dial_timeout,
        })
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Drives the whole connection to completion: greeting, method
    /// selection, auth, relay request, dial, reply, relay. Every exit path
    /// — success or any `ProxyError`/I/O error — lands on `Terminated` and
    /// the socket(s) are dropped when this returns.
    pub async fn run(mut self) -> Result<()> {
        self.negotiate_auth().await?;
        self.handle_relay_request().await
    }

    /// `AwaitGreeting -> AwaitMethods -> Authenticating`. On a timed-out
    /// greeting read there is no reply to send yet — the client hasn't told
    /// us anything we could usefully respond to — so the connection just
    /// closes silently, matching base spec §5's "closing silently if the
    /// client has already been sent an error" latitude. `handshake_read_timeout`
    /// bounds every framed handshake read, including the sub-negotiation read
    /// inside `handler.negotiate` (e.g. the RFC 1929 credential frame), so a
    /// client that selects UserPassword and then stalls can't pin the
    /// connection task indefinitely.
    async fn negotiate_auth(&mut self) -> Result<()> {
        self.state = ConnectionState::AwaitGreeting;

        let greeting: HandshakeRequest = timeout(self.handshake_read_timeout, self.stream.read_request())
            .await
            .map_err(|_| anyhow!(ProxyError::HandshakeTimeout))??;

        self.state = ConnectionState::Authenticating;

        let selected = AuthHandler::select(greeting.auth_methods(), &self.auth_handlers);
        self.stream.write_response(auth::handshake_response(selected)).await?;

        match selected {
            Some(handler) => {
                debug!("{}: selected auth method {:#04x}", self.peer_addr, handler.method_id());
                timeout(self.handshake_read_timeout, handler.negotiate(&mut self.stream))
                    .await
                    .map_err(|_| anyhow!(ProxyError::HandshakeTimeout))?
            }
            None => {
                warn!("{}: no acceptable authentication method", self.peer_addr);
                Err(anyhow!(ProxyError::NoAcceptableAuthMethod))
            }
        }
    }

    /// `AwaitRequest -> ResolvingAndDialing -> Send{Success,Error}Reply ->
    /// Relaying`. A relay-request read timeout closes silently for the same
    /// reason as the greeting; once the request is parsed, every other
    /// failure (unsupported command/ATYP, DNS, dial) gets a best-effort
    /// reply before the connection closes, matching invariant #1 in base §8
    /// (exactly one reply, or none — never a partial one).
    async fn handle_relay_request(mut self) -> Result<()> {
        self.state = ConnectionState::AwaitRequest;

        // Unlike the greeting, a malformed request (bad CMD/ATYP/reserved
        // byte) still gets a best-effort reply: the client has committed to
        // a request frame and a REP byte costs nothing, matching S6 in base
        // spec §8 (ATYP 0x08 is a reply, not a silent close).
        let request: RelayRequest = match timeout(self.handshake_read_timeout, self.stream.read_request()).await {
            Ok(Ok(request)) => request,
            Ok(Err(err)) => return self.fail_relay_request(err).await,
            Err(_) => return Err(anyhow!(ProxyError::HandshakeTimeout)),
        };

        if !self.supported_commands.contains(&request.command()) {
            let err = anyhow!(ProxyError::Unsupported(Unsupported::SocksCommand(request.command())));
            return self.fail_relay_request(err).await;
        }

        self.state = ConnectionState::ResolvingAndDialing;

        let endpoint = match self.dial(&request).await {
            Ok(endpoint) => endpoint,
            Err(err) => return self.fail_relay_request(err).await,
        };

        let bound_addr = endpoint.local_addr()?;
        let response = RelayResponse::builder().with_success().with_bound_address(bound_addr).build();
        self.stream.write_response(response).await?;

        self.state = ConnectionState::Relaying;
        let (peer_addr, local_addr, target_addr) = (self.peer_addr, self.local_addr, request.target_addr().clone());
        log_relay_established!(peer_addr, local_addr, target_addr);

        let client = self.stream.into_inner();
        match relay::relay(client, endpoint).await {
            Ok(stats) => {
                self.state = ConnectionState::Terminated;
                log_relay_closed!(peer_addr, local_addr, target_addr, stats.client_to_endpoint, stats.endpoint_to_client);
                Ok(())
            }
            Err(err) => {
                log_relay_closed_with_error!(peer_addr, local_addr, target_addr, err);
                Err(err)
            }
        }
    }

    /// Resolves and dials within a single `dial_timeout` window, matching
    /// the config table in base §6 ("dial_timeout: endpoint connect").
    async fn dial(&self, request: &RelayRequest) -> Result<TcpStream> {
        let target = request.target_addr().clone();

        timeout(self.dial_timeout, async move {
            let addr = target.to_socket_addr().await?;
            TcpStream::connect(addr).await.map_err(anyhow::Error::from)
        })
        .await
        .map_err(|_| anyhow!(ProxyError::DialTimeout))?
    }

    /// Sends a best-effort error reply (zeroed bound address per base
    /// §4.1) and returns `err` so the caller's `?`/logging sees the real
    /// cause. If the client is already gone the write itself errors; that
    /// error is swallowed in favor of the original `err`.
    async fn fail_relay_request(&mut self, err: anyhow::Error) -> Result<()> {
        warn!("{} (local {}): relay request failed: {}", self.peer_addr, self.local_addr, err);
        let err_message = err.to_string();

        let response = RelayResponse::builder().with_err(err).build();

        if let Err(write_err) = self.stream.write_response(response).await {
            debug!("{}: failed to write error reply: {}", self.peer_addr, write_err);
        }

        Err(anyhow!(err_message))
    }
}
