//! The notification channel for the active booking.
//!
//! [`NotificationChannel`] owns at most one live connection. Opening it
//! asks the booking service for a session descriptor, connects to the
//! issued URL and spawns a [`run_session`] task that feeds inbound
//! frames to the [`Reconciler`]. When the transport cannot be reached
//! the channel degrades to a single simulated gate change after a delay.
//!
//! Every state change happens under one internal lock. The store lock
//! may be taken while it is held, never the reverse.

use std::sync::Arc;
use std::time::Duration;

use gatewatch_booking::{BookingService, CreateSessionRequest};
use gatewatch_core::booking::{Booking, Passenger};
use gatewatch_core::channel_status::ChannelStatus;
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use crate::client::{connect, ChannelConnection};
use crate::config::ChannelConfig;
use crate::error::ChannelError;
use crate::events::{ChannelEvent, EVENT_CHANNEL_CAPACITY};
use crate::fallback::{next_gate, simulated_envelope, FallbackTimer};
use crate::messages::HelloEnvelope;
use crate::processor::{run_session, SessionContext, SessionEnd};
use crate::reconciler::Reconciler;
use crate::state::SharedStore;

/// Upper bound on waiting for the session task during shutdown.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Coarse view of the channel's lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelPhase {
    Idle,
    Connecting,
    Open,
}

/// Handle to the notification channel. Cheap to clone.
#[derive(Clone)]
pub struct NotificationChannel {
    shared: Arc<Shared>,
}

struct Shared {
    config: ChannelConfig,
    service: Arc<dyn BookingService>,
    store: SharedStore,
    reconciler: Reconciler,
    events: broadcast::Sender<ChannelEvent>,
    inner: Mutex<Inner>,
}

struct Inner {
    state: ChannelState,
    /// Bumped on every `open`; continuations of a superseded attempt
    /// find a different number and back out.
    attempts: u64,
    fallback: Option<FallbackTimer>,
    /// A fired timer whose notification is still being applied.
    firing: Option<FallbackTimer>,
    next_timer_id: u64,
}

enum ChannelState {
    Idle,
    Connecting { attempt: u64 },
    Open(OpenChannel),
}

struct OpenChannel {
    attempt: u64,
    session_id: String,
    url: String,
    outbound: mpsc::UnboundedSender<Message>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl Inner {
    fn is_connecting(&self, attempt: u64) -> bool {
        matches!(self.state, ChannelState::Connecting { attempt: a } if a == attempt)
    }

    fn is_open(&self, attempt: u64) -> bool {
        matches!(&self.state, ChannelState::Open(open) if open.attempt == attempt)
    }

    fn cancel_fallback(&mut self) {
        if let Some(timer) = self.fallback.take() {
            tracing::debug!(timer_id = timer.id, "Cancelling pending simulated notification");
            timer.cancel.cancel();
        }
    }

    /// Cancel the pending timer and any delivery already under way.
    fn abort_fallback(&mut self) {
        self.cancel_fallback();
        if let Some(timer) = self.firing.take() {
            tracing::debug!(timer_id = timer.id, "Abandoning simulated notification in flight");
            timer.cancel.cancel();
        }
    }
}

impl NotificationChannel {
    pub fn new(config: ChannelConfig, service: Arc<dyn BookingService>, store: SharedStore) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let reconciler = Reconciler::new(Arc::clone(&service), store.clone(), events.clone());

        Self {
            shared: Arc::new(Shared {
                config,
                service,
                store,
                reconciler,
                events,
                inner: Mutex::new(Inner {
                    state: ChannelState::Idle,
                    attempts: 0,
                    fallback: None,
                    firing: None,
                    next_timer_id: 0,
                }),
            }),
        }
    }

    /// Subscribe to channel events.
    pub fn subscribe(&self) -> broadcast::Receiver<ChannelEvent> {
        self.shared.events.subscribe()
    }

    pub fn store(&self) -> &SharedStore {
        &self.shared.store
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.shared.config
    }

    pub async fn phase(&self) -> ChannelPhase {
        match self.shared.inner.lock().await.state {
            ChannelState::Idle => ChannelPhase::Idle,
            ChannelState::Connecting { .. } => ChannelPhase::Connecting,
            ChannelState::Open(_) => ChannelPhase::Open,
        }
    }

    /// The URL of the live connection, if any.
    pub async fn active_url(&self) -> Option<String> {
        match &self.shared.inner.lock().await.state {
            ChannelState::Open(open) => Some(open.url.clone()),
            _ => None,
        }
    }

    /// Whether a simulated notification is waiting to fire.
    pub async fn fallback_pending(&self) -> bool {
        self.shared.inner.lock().await.fallback.is_some()
    }

    /// Open the channel for a booking.
    ///
    /// A no-op while a channel is already open or opening. Fails only
    /// when no session descriptor could be obtained; a transport that
    /// cannot be reached sets status `error` and arms the simulated
    /// notification instead.
    pub async fn open(&self, passenger: &Passenger, booking: &Booking) -> Result<(), ChannelError> {
        let shared = &self.shared;

        let attempt = {
            let mut inner = shared.inner.lock().await;
            if !matches!(inner.state, ChannelState::Idle) {
                tracing::debug!(pnr = %booking.pnr, "Notification channel already open or opening");
                return Ok(());
            }
            inner.attempts += 1;
            let attempt = inner.attempts;
            inner.state = ChannelState::Connecting { attempt };
            inner.cancel_fallback();
            shared.set_status(ChannelStatus::Connecting).await;
            attempt
        };

        let request = CreateSessionRequest {
            passenger_id: passenger.id.clone(),
            booking_pnr: booking.pnr.to_string(),
            device: Some(shared.config.device.clone()),
        };

        let session = match shared.service.create_channel_session(&request).await {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!(pnr = %booking.pnr, error = %e, "Channel session creation failed");
                let mut inner = shared.inner.lock().await;
                if inner.is_connecting(attempt) {
                    inner.state = ChannelState::Idle;
                    shared.set_status(ChannelStatus::Error).await;
                }
                return Err(ChannelError::SessionCreation(e));
            }
        };

        tracing::info!(
            session_id = %session.session_id,
            url = %session.channel_url,
            expires_at = %session.expires_at,
            "Channel session issued",
        );

        if !shared.inner.lock().await.is_connecting(attempt) {
            tracing::debug!(attempt, "Channel closed while session was being issued");
            shared.release_session(session.session_id);
            return Ok(());
        }

        let connection = connect(&session.channel_url).await;

        let mut inner = shared.inner.lock().await;
        if !inner.is_connecting(attempt) {
            tracing::debug!(attempt, "Channel closed while transport was connecting");
            drop(inner);
            shared.release_session(session.session_id);
            return Ok(());
        }

        let connection = match connection {
            Ok(connection) => connection,
            Err(e) => {
                tracing::warn!(url = %session.channel_url, error = %e, "Notification channel transport error");
                inner.state = ChannelState::Idle;
                shared.set_status(ChannelStatus::Error).await;
                shared.schedule_fallback(&mut inner, shared.config.fallback_delay);
                drop(inner);
                shared.release_session(session.session_id);
                return Ok(());
            }
        };

        let hello = if shared.config.send_hello {
            HelloEnvelope::new(
                session.session_id.clone(),
                Some(passenger),
                Some(booking),
                Some(shared.config.device.clone()),
            )
            .to_json()
            .inspect_err(|e| tracing::warn!(error = %e, "Failed to encode hello envelope"))
            .ok()
        } else {
            None
        };
        let heartbeat = (shared.config.heartbeat && session.heartbeat_interval_sec > 0)
            .then(|| Duration::from_secs(session.heartbeat_interval_sec));
        let ctx = SessionContext {
            reconciler: shared.reconciler.clone(),
            store: shared.store.clone(),
            events: shared.events.clone(),
            hello,
            heartbeat,
        };

        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let ChannelConnection { url, ws_stream } = connection;
        let task = {
            let shared = Arc::clone(shared);
            let cancel = cancel.clone();
            let session_id = session.session_id.clone();
            tokio::spawn(async move {
                let end = run_session(ws_stream, outbound_rx, cancel, ctx).await;
                shared.on_session_end(attempt, session_id, end).await;
            })
        };

        inner.state = ChannelState::Open(OpenChannel {
            attempt,
            session_id: session.session_id,
            url,
            outbound,
            cancel,
            task,
        });
        shared.set_status(ChannelStatus::Connected).await;
        Ok(())
    }

    /// Close the channel. Idempotent; always ends `disconnected` with no
    /// simulated notification pending.
    pub async fn close(&self) {
        let mut inner = self.shared.inner.lock().await;
        inner.abort_fallback();
        match std::mem::replace(&mut inner.state, ChannelState::Idle) {
            ChannelState::Idle => {}
            ChannelState::Connecting { attempt } => {
                tracing::debug!(attempt, "Abandoning channel open in progress");
            }
            ChannelState::Open(open) => {
                tracing::info!(session_id = %open.session_id, "Closing notification channel");
                open.cancel.cancel();
            }
        }
        self.shared.set_status(ChannelStatus::Disconnected).await;
    }

    /// Forward a raw frame unmodified.
    pub async fn send(&self, raw: &str) -> Result<(), ChannelError> {
        let inner = self.shared.inner.lock().await;
        let ChannelState::Open(open) = &inner.state else {
            return Err(ChannelError::NotOpen);
        };
        open.outbound
            .send(Message::Text(raw.to_string()))
            .map_err(|_| ChannelError::Transport("session task has stopped".to_string()))?;
        let _ = self.shared.events.send(ChannelEvent::MessageSent {
            raw: raw.to_string(),
        });
        Ok(())
    }

    /// Arm the simulated notification for the booking in the store.
    ///
    /// Returns `false` without scheduling when there is no active
    /// booking or one is already pending.
    pub async fn schedule_simulated(&self, delay: Duration) -> bool {
        let mut inner = self.shared.inner.lock().await;
        let has_booking = {
            let store = self.shared.store.read().await;
            store.passenger().is_some() && store.booking().is_some()
        };
        if !has_booking {
            tracing::debug!("No active booking, not scheduling simulated notification");
            return false;
        }
        self.shared.schedule_fallback(&mut inner, delay)
    }

    /// Close and wait briefly for the session task to finish.
    pub async fn shutdown(&self) {
        let task = {
            let mut inner = self.shared.inner.lock().await;
            inner.abort_fallback();
            match std::mem::replace(&mut inner.state, ChannelState::Idle) {
                ChannelState::Open(open) => {
                    open.cancel.cancel();
                    Some(open.task)
                }
                _ => None,
            }
        };
        self.shared.set_status(ChannelStatus::Disconnected).await;

        if let Some(task) = task {
            let _ = tokio::time::timeout(SHUTDOWN_TIMEOUT, task).await;
        }
        tracing::info!("Notification channel shut down");
    }
}

impl Shared {
    /// Write the status to the store, emitting an event when it changes.
    async fn set_status(&self, status: ChannelStatus) {
        let previous = {
            let mut store = self.store.write().await;
            let previous = store.channel_status();
            store.set_channel_status(status);
            previous
        };
        if previous != status {
            tracing::info!(from = %previous, to = %status, "Notification channel status changed");
            let _ = self.events.send(ChannelEvent::StatusChanged { status });
        }
    }

    /// Arm the singleton timer. Caller holds the inner lock.
    fn schedule_fallback(self: &Arc<Self>, inner: &mut Inner, delay: Duration) -> bool {
        if let Some(pending) = &inner.fallback {
            tracing::debug!(timer_id = pending.id, "Simulated notification already pending");
            return false;
        }

        inner.next_timer_id += 1;
        let timer = FallbackTimer::new(inner.next_timer_id);
        let (id, cancel) = (timer.id, timer.cancel.clone());
        inner.fallback = Some(timer);

        let shared = Arc::clone(self);
        tokio::spawn(async move {
            // The token covers the refresh too, so teardown discards it.
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = async {
                    tokio::time::sleep(delay).await;
                    shared.fire_fallback(id).await;
                } => {}
            }
        });

        tracing::info!(timer_id = id, delay_ms = delay.as_millis() as u64, "Simulated notification scheduled");
        let _ = self.events.send(ChannelEvent::FallbackScheduled {
            delay_ms: delay.as_millis() as u64,
        });
        true
    }

    async fn fire_fallback(&self, id: u64) {
        {
            let mut inner = self.inner.lock().await;
            match inner.fallback.take() {
                Some(timer) if timer.id == id => inner.firing = Some(timer),
                other => {
                    inner.fallback = other;
                    return;
                }
            }
        }
        self.deliver_simulated().await;

        let mut inner = self.inner.lock().await;
        if inner.firing.as_ref().is_some_and(|timer| timer.id == id) {
            inner.firing = None;
        }
    }

    async fn deliver_simulated(&self) {
        let (passenger, booking) = {
            let store = self.store.read().await;
            (store.passenger().cloned(), store.booking().cloned())
        };
        let (Some(passenger), Some(booking)) = (passenger, booking) else {
            tracing::debug!("Simulated notification fired with no active booking");
            return;
        };

        let (old_gate, new_gate) = next_gate(booking.flight.boarding_gate.as_deref());
        tracing::info!(pnr = %booking.pnr, %old_gate, %new_gate, "Delivering simulated notification");
        let _ = self
            .events
            .send(ChannelEvent::FallbackFired { old_gate, new_gate });

        let envelope = simulated_envelope(&passenger, &booking);
        self.reconciler
            .apply(envelope, Some(&passenger), Some(&booking))
            .await;
    }

    /// Called from the session task once the loop exits.
    async fn on_session_end(self: &Arc<Self>, attempt: u64, session_id: String, end: SessionEnd) {
        let mut inner = self.inner.lock().await;
        if inner.is_open(attempt) {
            inner.state = ChannelState::Idle;
            match &end {
                SessionEnd::Closed(_) => {
                    inner.cancel_fallback();
                    self.set_status(ChannelStatus::Disconnected).await;
                }
                SessionEnd::Failed(_) => {
                    self.set_status(ChannelStatus::Error).await;
                    self.schedule_fallback(&mut inner, self.config.fallback_delay);
                }
            }
        }
        drop(inner);

        let reason = match end {
            SessionEnd::Closed(reason) | SessionEnd::Failed(reason) => reason,
        };
        tracing::info!(%session_id, %reason, "Notification channel session ended");
        let _ = self.events.send(ChannelEvent::Closed { reason });
        self.release_session(session_id);
    }

    /// Tell the booking service the session is done, without waiting.
    fn release_session(&self, session_id: String) {
        let service = Arc::clone(&self.service);
        tokio::spawn(async move {
            if let Err(e) = service.close_channel_session(&session_id).await {
                tracing::debug!(%session_id, error = %e, "Failed to release channel session");
            }
        });
    }
}
