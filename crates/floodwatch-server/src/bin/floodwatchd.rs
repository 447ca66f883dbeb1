use std::io;

use floodwatch_server::{FloodServer, ServerConfig};
use tracing::error;
use tracing_subscriber::EnvFilter;

fn main() -> io::Result<()> {
    let filter = EnvFilter::try_from_env("FLOODWATCH_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let config = ServerConfig::from_env().map_err(|e| {
        error!(error = %e, "invalid configuration");
        io::Error::new(io::ErrorKind::InvalidInput, e.to_string())
    })?;
    let server = FloodServer::from_config(&config).map_err(|e| {
        error!(error = %e.redacted(), "failed to start floodwatch server");
        io::Error::other(e.to_string())
    })?;
    server.serve_http(&config.http_addr)
}
