use crate::{
    auth::AuthHandler,
    common::logging::{log_accept_error, log_conn_accepted, log_conn_terminated, log_conn_terminated_with_error},
    config::ServerConfig,
    connection::Connection,
    proto::socks5::Command,
};
use anyhow::Result;
use async_listen::is_transient_error;
use log::{info, warn};
use socket2::{Domain, Socket, Type};
use std::{collections::HashSet, net::SocketAddr, sync::Arc, time::Duration};
use tokio::{net::TcpListener, signal, time::sleep};
use tokio_util::{sync::CancellationToken, task::TaskTracker};

pub mod stats;

pub use stats::ServerStats;

const TCP_LISTEN_BACKLOG: i32 = 1024;

/// Accepts TCP connections on `bind_addr` and drives each one through a
/// `Connection`, until Ctrl+C is received. Every accepted connection runs
/// in its own task, tracked by `task_tracker` and abortable via
/// `task_cancellation_token` so shutdown doesn't wait forever on a stuck
/// relay.
pub struct Server {
    bind_addr: SocketAddr,
    auth_handlers: Arc<[AuthHandler]>,
    supported_commands: Arc<HashSet<Command>>,
    handshake_read_timeout: Duration,
    dial_timeout: Duration,
    stats: Arc<ServerStats>,
    task_tracker: TaskTracker,
    task_cancellation_token: CancellationToken,
}

impl Server {
    /// Delay after a non-transient accept failure, e.g. file descriptor
    /// exhaustion, to avoid spinning the accept loop hot.
    const DELAY_AFTER_ERROR_MILLIS: u64 = 500;

    pub fn new(config: &ServerConfig, auth_handlers: Arc<[AuthHandler]>) -> Server {
        Server {
            bind_addr: config.listen_address(),
            auth_handlers,
            supported_commands: Arc::new(config.supported_commands()),
            handshake_read_timeout: config.handshake_read_timeout(),
            dial_timeout: config.dial_timeout(),
            stats: Arc::new(ServerStats::new()),
            task_tracker: TaskTracker::new(),
            task_cancellation_token: CancellationToken::new(),
        }
    }

    pub fn stats(&self) -> Arc<ServerStats> {
        Arc::clone(&self.stats)
    }

    pub async fn run(&self) -> Result<()> {
        let listener = bind_listener(self.bind_addr)?;
        info!("proxy is listening on {}", self.bind_addr);

        self.stats.on_server_started();

        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, _)) => self.on_tcp_connection_established(stream),
                    Err(err) => self.on_tcp_accept_error(anyhow::Error::from(err)).await,
                },
                _ = signal::ctrl_c() => {
                    info!("received Ctrl+C, tearing down gracefully");
                    self.on_shutdown_requested();
                    break;
                }
            }
        }

        self.task_tracker.wait().await;
        Ok(())
    }

    async fn on_tcp_accept_error(&self, err: anyhow::Error) {
        log_accept_error!(err);

        if let Some(err) = err.downcast_ref::<std::io::Error>() {
            if !is_transient_error(err) {
                sleep(Duration::from_millis(Server::DELAY_AFTER_ERROR_MILLIS)).await;
            }
        }
    }

    fn on_tcp_connection_established(&self, stream: tokio::net::TcpStream) {
        let connection = match Connection::new(
            stream,
            Arc::clone(&self.auth_handlers),
            Arc::clone(&self.supported_commands),
            self.handshake_read_timeout,
            self.dial_timeout,
        ) {
            Ok(connection) => connection,
            Err(err) => {
                log_accept_error!(err);
                return;
            }
        };

        let peer_addr = connection.peer_addr();
        log_conn_accepted!(peer_addr);
        self.stats.on_connection_accepted();

        let stats = Arc::clone(&self.stats);
        let token = self.task_cancellation_token.clone();

        self.task_tracker.spawn(async move {
            tokio::select! {
                res = connection.run() => {
                    match res {
                        Ok(()) => {
                            log_conn_terminated!(peer_addr, "closed");
                            stats.on_connection_terminated(true);
                        }
                        Err(err) => {
                            log_conn_terminated_with_error!(peer_addr, err);
                            stats.on_connection_terminated(false);
                        }
                    }
                }
                _ = token.cancelled() => {
                    log_conn_terminated!(peer_addr, "cancelled");
                    stats.on_connection_terminated(false);
                }
            }
        });
    }

    fn on_shutdown_requested(&self) {
        self.task_tracker.close();
        self.task_cancellation_token.cancel();
    }
}

/// Binds a non-blocking listener with a fixed backlog, the same way the
/// configured socket options on the original listener were applied before
/// handing the socket to tokio.
fn bind_listener(addr: SocketAddr) -> Result<TcpListener> {
    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, None)?;
    socket.set_reuse_address(true)?;
    socket.bind(&addr.into())?;
    socket.listen(TCP_LISTEN_BACKLOG)?;
    socket.set_nonblocking(true)?;

    Ok(TcpListener::from_std(socket.into())?)
}
