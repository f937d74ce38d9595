use crate::{
    auth::{store::InMemoryCredentialStore, AuthHandler},
    proto::socks5::{consts, Command},
};
use anyhow::{Context, Result};
use clap::Parser;
use std::{
    collections::HashSet,
    net::SocketAddr,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

pub const LOG4RS_CONFIG_FILE_PATH: &str = "log4rs.yaml";

/// CLI-facing name for a method a client may offer in its greeting. Maps
/// 1:1 onto the wire method-id bytes in `proto::socks5::consts::auth`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum AuthMethodArg {
    None,
    Password,
}

impl AuthMethodArg {
    fn method_id(self) -> u8 {
        match self {
            AuthMethodArg::None => consts::auth::METHOD_NONE,
            AuthMethodArg::Password => consts::auth::METHOD_PASSWORD,
        }
    }
}

/// Command-line configuration for the proxy, matching the option table in
/// the base spec §6. Parsed once at process start and shared read-only
/// (`Arc<ServerConfig>`) with every accepted connection.
#[derive(Parser, Debug)]
#[clap(author = "Boris S. <boris.works@hotmail.com>", about = "Fast and fancy SOCKS5 proxy", version)]
pub struct ServerConfig {
    /// TCP address to listen on.
    #[clap(long, default_value = "0.0.0.0:1080")]
    listen_address: SocketAddr,

    /// Authentication methods offered to clients, in registration order
    /// (selection itself depends on the *client's* offered order, not
    /// this one — see `AuthHandler::select`). May be repeated.
    #[clap(long = "auth-method", value_enum, default_values_t = vec![AuthMethodArg::None])]
    auth_methods: Vec<AuthMethodArg>,

    /// `user:password`-per-line file; required iff `password` is among
    /// `--auth-method`.
    #[clap(long = "credentials-file")]
    credentials_file: Option<PathBuf>,

    /// Per framed read during the handshake (greeting, RFC 1929 sub-request).
    #[clap(long, default_value_t = 10)]
    handshake_read_timeout_secs: u64,

    /// Endpoint dial timeout, covering DNS resolution and the TCP connect.
    #[clap(long, default_value_t = 30)]
    dial_timeout_secs: u64,
}

impl ServerConfig {
    pub fn listen_address(&self) -> SocketAddr {
        self.listen_address
    }

    pub fn handshake_read_timeout(&self) -> Duration {
        Duration::from_secs(self.handshake_read_timeout_secs)
    }

    pub fn dial_timeout(&self) -> Duration {
        Duration::from_secs(self.dial_timeout_secs)
    }

    /// Commands the `ConnectionFSM` will dial. Fixed to `CONNECT` per base
    /// spec §1/§9 (BIND/UDP ASSOCIATE are explicit Non-goals); modeled as a
    /// set rather than a hardcoded branch so a future `--enable-bind` flag
    /// only touches this constructor.
    pub fn supported_commands(&self) -> HashSet<Command> {
        HashSet::from([Command::Connect])
    }

    /// Builds the registered `AuthHandler` set from `--auth-method`,
    /// wiring in `store` when `password` was requested.
    pub fn build_auth_handlers(&self, store: Option<Arc<InMemoryCredentialStore>>) -> Result<Arc<[AuthHandler]>> {
        let mut handlers = Vec::with_capacity(self.auth_methods.len());

        for method in &self.auth_methods {
            let handler = match method {
                AuthMethodArg::None => AuthHandler::NoAuth,
                AuthMethodArg::Password => {
                    let store = store
                        .clone()
                        .context("--auth-method password requires --credentials-file")?;
                    AuthHandler::UserPassword(store)
                }
            };
            handlers.push(handler);
        }

        Ok(handlers.into())
    }

    pub fn requires_credential_store(&self) -> bool {
        self.auth_methods.contains(&AuthMethodArg::Password)
    }

    pub fn credentials_file(&self) -> Option<&Path> {
        self.credentials_file.as_deref()
    }
}

/// Parses a `user:password`-per-line credentials file into a fresh
/// in-memory store, analogous to seeding the original `PasswordManager`
/// at startup. Blank lines and lines starting with `#` are skipped.
pub async fn load_credentials_file(path: &Path) -> Result<InMemoryCredentialStore> {
    use crate::auth::CredentialStore;

    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read credentials file {}", path.display()))?;

    let store = InMemoryCredentialStore::new();
    for (lineno, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let (username, password) = line
            .split_once(':')
            .with_context(|| format!("{}:{}: expected 'user:password'", path.display(), lineno + 1))?;

        store
            .add(username, password, false)
            .await
            .with_context(|| format!("{}:{}: invalid credential entry", path.display(), lineno + 1))?;
    }

    Ok(store)
}
