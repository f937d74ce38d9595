use anyhow::{Context, Result};
use clap::Parser;
use log4rs::config::Deserializers;
use log::info;
use socks5_relay::{
    config::{self, ServerConfig},
    server::Server,
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    log4rs::init_file(config::LOG4RS_CONFIG_FILE_PATH, Deserializers::default())
        .context("failed to initialize logging from log4rs.yaml")?;

    let config = ServerConfig::parse();

    let store = if config.requires_credential_store() {
        let path = config
            .credentials_file()
            .context("--auth-method password requires --credentials-file")?;
        Some(Arc::new(config::load_credentials_file(path).await?))
    } else {
        None
    };

    let auth_handlers = config.build_auth_handlers(store)?;
    let server = Server::new(&config, auth_handlers);

    info!("starting socks5-relay on {}", config.listen_address());
    server.run().await
}
