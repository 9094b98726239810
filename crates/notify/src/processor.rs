//! The per-connection session loop.
//!
//! [`run_session`] owns an open WebSocket until it closes, fails or is
//! cancelled. It sends the optional hello, keeps the heartbeat going,
//! forwards queued outbound frames and passes each inbound text frame to
//! the [`Reconciler`] in arrival order.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::sync::{broadcast, mpsc};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use crate::client::ChannelStream;
use crate::events::ChannelEvent;
use crate::reconciler::Reconciler;
use crate::state::SharedStore;

/// Upper bound on sending our own close frame during cancellation.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// Longest heartbeat period honoured; anything above disables pings.
pub const MAX_HEARTBEAT: Duration = Duration::from_secs(24 * 60 * 60);

/// Everything a session loop needs besides the socket itself.
#[derive(Clone)]
pub struct SessionContext {
    pub reconciler: Reconciler,
    pub store: SharedStore,
    pub events: broadcast::Sender<ChannelEvent>,
    /// Serialised hello envelope, sent once before anything else.
    pub hello: Option<String>,
    /// Transport ping period; `None` disables heartbeats.
    pub heartbeat: Option<Duration>,
}

/// Why a session loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    /// Clean close: a close frame, end of stream, or local cancellation.
    Closed(String),
    /// The transport failed while open.
    Failed(String),
}

/// Drive one open connection to completion.
pub async fn run_session(
    ws_stream: ChannelStream,
    mut outbound: mpsc::UnboundedReceiver<Message>,
    cancel: CancellationToken,
    ctx: SessionContext,
) -> SessionEnd {
    let (mut sink, mut stream) = ws_stream.split();

    if let Some(hello) = ctx.hello.clone() {
        if let Err(e) = sink.send(Message::Text(hello)).await {
            tracing::warn!(error = %e, "Failed to send hello envelope");
        }
    }

    let mut heartbeat = ctx.heartbeat.and_then(heartbeat_ticker);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                let _ = tokio::time::timeout(CLOSE_TIMEOUT, sink.send(Message::Close(None))).await;
                return SessionEnd::Closed("closed by client".to_string());
            }
            Some(msg) = outbound.recv() => {
                if let Err(e) = sink.send(msg).await {
                    tracing::error!(error = %e, "Failed to send channel frame");
                    return SessionEnd::Failed(e.to_string());
                }
            }
            _ = tick(&mut heartbeat) => {
                tracing::trace!("Sending channel heartbeat");
                if let Err(e) = sink.send(Message::Ping(Vec::new())).await {
                    tracing::error!(error = %e, "Failed to send heartbeat");
                    return SessionEnd::Failed(e.to_string());
                }
            }
            msg = stream.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let _ = ctx.events.send(ChannelEvent::MessageReceived { raw: text.clone() });
                        tokio::select! {
                            _ = cancel.cancelled() => {
                                return SessionEnd::Closed("closed by client".to_string());
                            }
                            _ = handle_text(&ctx, &text) => {}
                        }
                    }
                    Some(Ok(Message::Binary(data))) => {
                        tracing::trace!(len = data.len(), "Ignoring binary channel frame");
                    }
                    Some(Ok(Message::Ping(_) | Message::Pong(_))) => {
                        // Handled automatically by tungstenite.
                    }
                    Some(Ok(Message::Close(frame))) => {
                        tracing::info!(?frame, "Notification channel closed by server");
                        let reason = frame
                            .map(|f| f.reason.to_string())
                            .filter(|r| !r.is_empty())
                            .unwrap_or_else(|| "closed by server".to_string());
                        return SessionEnd::Closed(reason);
                    }
                    Some(Ok(Message::Frame(_))) => {}
                    Some(Err(e)) => {
                        tracing::error!(error = %e, "Notification channel receive error");
                        return SessionEnd::Failed(e.to_string());
                    }
                    None => {
                        tracing::info!("Notification channel stream exhausted");
                        return SessionEnd::Closed("stream ended".to_string());
                    }
                }
            }
        }
    }
}

/// Reconcile one text frame against the store as it stands now.
async fn handle_text(ctx: &SessionContext, text: &str) {
    let (passenger, booking) = {
        let store = ctx.store.read().await;
        (store.passenger().cloned(), store.booking().cloned())
    };
    let outcome = ctx
        .reconciler
        .handle(text, passenger.as_ref(), booking.as_ref())
        .await;
    tracing::debug!(?outcome, "Channel frame reconciled");
}

/// Resolve on the next heartbeat tick, or never when heartbeats are off.
async fn tick(heartbeat: &mut Option<tokio::time::Interval>) {
    match heartbeat {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}

/// Build the ping ticker for a server-supplied period. Zero would spin and
/// an oversized period cannot be scheduled, so both turn heartbeats off.
fn heartbeat_ticker(period: Duration) -> Option<tokio::time::Interval> {
    if period.is_zero() {
        return None;
    }
    let start = match Instant::now().checked_add(period) {
        Some(start) if period <= MAX_HEARTBEAT => start,
        _ => {
            tracing::warn!(
                period_secs = period.as_secs(),
                max_secs = MAX_HEARTBEAT.as_secs(),
                "Heartbeat interval out of range, heartbeats disabled",
            );
            return None;
        }
    };
    let mut ticker = interval_at(start, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    Some(ticker)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn heartbeat_ticker_accepts_normal_period() {
        let ticker = heartbeat_ticker(Duration::from_secs(30)).unwrap();
        assert_eq!(ticker.period(), Duration::from_secs(30));
    }

    #[tokio::test]
    async fn heartbeat_ticker_rejects_zero_and_oversized_periods() {
        assert!(heartbeat_ticker(Duration::ZERO).is_none());
        assert!(heartbeat_ticker(MAX_HEARTBEAT + Duration::from_secs(1)).is_none());
        assert!(heartbeat_ticker(Duration::from_secs(u64::MAX)).is_none());
    }
}
