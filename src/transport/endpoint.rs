//! WebSocket endpoint the subprocess connects back to.
//!
//! # Connection Flow
//!
//! 1. The client binds to `127.0.0.1` (ephemeral port by default)
//! 2. The subprocess is launched with the endpoint's `ws://` URL
//! 3. The subprocess connects and sends a ready handshake
//! 4. Channel established, ready for commands

// ============================================================================
// Imports
// ============================================================================

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::time::timeout;
use tracing::{debug, info};

use crate::error::{Error, Result};

use super::Channel;
use super::channel::ReadyData;

// ============================================================================
// Constants
// ============================================================================

/// Timeout for waiting for the subprocess to connect.
const CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// PendingEndpoint
// ============================================================================

/// A bound, not-yet-connected transport endpoint.
///
/// Represents the state between binding to a port and accepting the
/// subprocess's single inbound connection.
///
/// # Example
///
/// ```ignore
/// let endpoint = PendingEndpoint::bind(None).await?;
/// let ws_url = endpoint.ws_url();
///
/// // Launch the subprocess with ws_url...
///
/// let (channel, ready) = endpoint.accept().await?;
/// ```
pub struct PendingEndpoint {
    /// TCP listener for the inbound connection.
    listener: TcpListener,
    /// Port the endpoint is bound to.
    port: u16,
}

impl PendingEndpoint {
    /// Binds the endpoint on localhost.
    ///
    /// With `port: None` the OS assigns an ephemeral port, so parallel
    /// sessions never collide.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if binding fails.
    pub async fn bind(port: Option<u16>) -> Result<Self> {
        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port.unwrap_or(0));
        let listener = TcpListener::bind(addr).await?;
        let actual_port = listener.local_addr()?.port();

        debug!(port = actual_port, "Transport endpoint bound");

        Ok(Self {
            listener,
            port: actual_port,
        })
    }

    /// Returns the port the endpoint is bound to.
    #[inline]
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Returns the WebSocket URL for this endpoint.
    ///
    /// Format: `ws://127.0.0.1:{port}`
    #[inline]
    #[must_use]
    pub fn ws_url(&self) -> String {
        format!("ws://127.0.0.1:{}", self.port)
    }

    /// Accepts the subprocess connection and completes the handshake.
    ///
    /// 1. Waits for the TCP connection (with timeout)
    /// 2. Upgrades to WebSocket
    /// 3. Waits for the ready handshake message
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionTimeout`] if the subprocess doesn't connect in time
    /// - [`Error::Protocol`] if the upgrade or handshake fails
    pub async fn accept(self) -> Result<(Channel, ReadyData)> {
        let accept_result = timeout(CONNECTION_TIMEOUT, self.listener.accept()).await;

        let (stream, addr) = accept_result
            .map_err(|_| Error::connection_timeout(CONNECTION_TIMEOUT.as_millis() as u64))??;

        debug!(?addr, "TCP connection accepted");

        let ws_stream = tokio_tungstenite::accept_async(stream)
            .await
            .map_err(|e| Error::protocol(format!("WebSocket upgrade failed: {e}")))?;

        info!(port = self.port, "Subprocess transport established");

        let channel = Channel::new(ws_stream);
        let ready = channel.wait_ready().await?;

        Ok((channel, ready))
    }
}

// ============================================================================
// Tests
// ============================================================================
