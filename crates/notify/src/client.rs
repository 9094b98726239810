//! Transport connection for the notification channel.
//!
//! [`connect`] opens a WebSocket to the URL issued in a channel session
//! descriptor and returns a live [`ChannelConnection`].

use std::time::Duration;

use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

/// Upper bound on the transport handshake.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

pub type ChannelStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// A live WebSocket connection for one channel session.
pub struct ChannelConnection {
    /// The URL the connection was opened against.
    pub url: String,
    /// The raw WebSocket stream for reading/writing frames.
    pub ws_stream: ChannelStream,
}

impl std::fmt::Debug for ChannelConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelConnection")
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}

/// Open the transport for a channel session.
pub async fn connect(url: &str) -> Result<ChannelConnection, ConnectError> {
    let (ws_stream, _response) = tokio::time::timeout(CONNECT_TIMEOUT, connect_async(url))
        .await
        .map_err(|_| ConnectError::Timeout(CONNECT_TIMEOUT))?
        .map_err(|e| ConnectError::Connection(format!("Failed to connect to {url}: {e}")))?;

    tracing::info!(url, "Notification channel transport open");

    Ok(ChannelConnection {
        url: url.to_string(),
        ws_stream,
    })
}

/// Errors that can occur while opening the transport.
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    /// The handshake failed (refused, DNS, TLS, bad URL, upgrade rejected).
    #[error("Connection error: {0}")]
    Connection(String),

    /// The handshake did not complete in time.
    #[error("Connection timed out after {0:?}")]
    Timeout(Duration),
}
