//! TCP transport to the bridge server.
//!
//! # Example
//!
//! ```ignore
//! use bridgewire_client::transport::connect;
//!
//! let conn = connect("172.20.218.12:9090").await?;
//! ```

use tokio::net::{TcpStream, ToSocketAddrs};

use super::{Connection, ConnectionConfig};
use crate::error::Result;

/// Open a TCP connection with default settings.
pub async fn connect<A: ToSocketAddrs>(addr: A) -> Result<Connection<TcpStream>> {
    connect_with_config(addr, &ConnectionConfig::default()).await
}

/// Open a TCP connection with custom settings.
///
/// Nagle is disabled: every write is a complete document that the peer is
/// waiting on before it replies.
pub async fn connect_with_config<A: ToSocketAddrs>(
    addr: A,
    config: &ConnectionConfig,
) -> Result<Connection<TcpStream>> {
    let stream = TcpStream::connect(addr).await?;
    stream.set_nodelay(true)?;

    if let Ok(peer) = stream.peer_addr() {
        tracing::info!(%peer, framing = ?config.framing, "Connected to bridge");
    }

    Ok(Connection::with_config(stream, config))
}
