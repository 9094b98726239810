#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use gatewatch_booking::{
    BookingService, BookingServiceError, ChannelSession, CreateSessionRequest,
    FixtureBookingService, RetrievedBooking,
};
use gatewatch_core::booking::Passenger;
use gatewatch_core::store::AppStore;
use gatewatch_notify::{ChannelConfig, SharedStore};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

const WAIT: Duration = Duration::from_secs(5);
const POLL: Duration = Duration::from_millis(10);

/// Channel config with a short fallback and heartbeats left to the
/// session descriptor.
pub fn test_config(fallback_delay: Duration) -> ChannelConfig {
    ChannelConfig {
        fallback_delay,
        ..ChannelConfig::default()
    }
}

/// A `ws://` URL nothing is listening on.
pub async fn dead_channel_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("ws://{addr}/ws/v1/notifications")
}

// ---------------------------------------------------------------------------
// Loopback notification server
// ---------------------------------------------------------------------------

/// What the server saw from the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    Connected,
    Text(String),
    Ping,
    Closed,
}

enum ServerCommand {
    Push(String),
    /// Send a close frame and hang up.
    Close,
    /// Hang up without a close handshake.
    Abort,
}

/// Accepts one client at a time and records its frames.
pub struct TestServer {
    pub url: String,
    events: mpsc::UnboundedReceiver<ServerEvent>,
    commands: mpsc::UnboundedSender<ServerCommand>,
}

impl TestServer {
    pub async fn spawn() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (event_tx, events) = mpsc::unbounded_channel();
        let (commands, mut command_rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            while let Ok((tcp, _)) = listener.accept().await {
                let Ok(ws) = accept_async(tcp).await else {
                    continue;
                };
                let _ = event_tx.send(ServerEvent::Connected);
                let (mut sink, mut stream) = ws.split();

                loop {
                    tokio::select! {
                        command = command_rx.recv() => match command {
                            Some(ServerCommand::Push(text)) => {
                                let _ = sink.send(Message::Text(text)).await;
                            }
                            Some(ServerCommand::Close) => {
                                let _ = sink.send(Message::Close(None)).await;
                                let _ = event_tx.send(ServerEvent::Closed);
                                break;
                            }
                            Some(ServerCommand::Abort) => {
                                let _ = event_tx.send(ServerEvent::Closed);
                                break;
                            }
                            None => return,
                        },
                        msg = stream.next() => match msg {
                            Some(Ok(Message::Text(text))) => {
                                let _ = event_tx.send(ServerEvent::Text(text));
                            }
                            Some(Ok(Message::Ping(_))) => {
                                let _ = event_tx.send(ServerEvent::Ping);
                            }
                            Some(Ok(Message::Close(_))) | Some(Err(_)) | None => {
                                let _ = event_tx.send(ServerEvent::Closed);
                                break;
                            }
                            Some(Ok(_)) => {}
                        },
                    }
                }
            }
        });

        Self {
            url: format!("ws://{addr}/ws/v1/notifications"),
            events,
            commands,
        }
    }

    pub fn push(&self, text: &str) {
        self.commands
            .send(ServerCommand::Push(text.to_string()))
            .unwrap();
    }

    pub fn close(&self) {
        self.commands.send(ServerCommand::Close).unwrap();
    }

    pub fn abort(&self) {
        self.commands.send(ServerCommand::Abort).unwrap();
    }

    pub async fn next_event(&mut self) -> ServerEvent {
        tokio::time::timeout(WAIT, self.events.recv())
            .await
            .expect("no server event in time")
            .expect("server task ended")
    }

    /// Skip events until one matches.
    pub async fn expect_event(&mut self, pred: impl Fn(&ServerEvent) -> bool) -> ServerEvent {
        loop {
            let event = self.next_event().await;
            if pred(&event) {
                return event;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Counting booking service
// ---------------------------------------------------------------------------

/// Fixture-backed service that counts calls and points sessions at a
/// chosen channel URL.
pub struct CountingService {
    fixture: FixtureBookingService,
    retrievals: AtomicUsize,
    sessions: AtomicUsize,
    closed: Mutex<Vec<String>>,
    fail_sessions: bool,
    heartbeat_secs: u64,
    retrieve_delay: Duration,
}

impl CountingService {
    pub fn new(channel_url: &str) -> Self {
        Self {
            fixture: FixtureBookingService::new().with_channel_url(channel_url),
            retrievals: AtomicUsize::new(0),
            sessions: AtomicUsize::new(0),
            closed: Mutex::new(Vec::new()),
            fail_sessions: false,
            heartbeat_secs: 0,
            retrieve_delay: Duration::ZERO,
        }
    }

    pub fn failing_sessions(mut self) -> Self {
        self.fail_sessions = true;
        self
    }

    pub fn with_heartbeat(mut self, secs: u64) -> Self {
        self.heartbeat_secs = secs;
        self
    }

    /// Make every booking retrieval take `delay`.
    pub fn with_retrieve_delay(mut self, delay: Duration) -> Self {
        self.retrieve_delay = delay;
        self
    }

    pub fn fixture(&self) -> &FixtureBookingService {
        &self.fixture
    }

    pub fn retrievals(&self) -> usize {
        self.retrievals.load(Ordering::SeqCst)
    }

    pub fn sessions(&self) -> usize {
        self.sessions.load(Ordering::SeqCst)
    }

    pub fn closed_sessions(&self) -> Vec<String> {
        self.closed.lock().unwrap().clone()
    }
}

#[async_trait]
impl BookingService for CountingService {
    async fn retrieve_booking(
        &self,
        pnr: &str,
        last_name: &str,
    ) -> Result<RetrievedBooking, BookingServiceError> {
        self.retrievals.fetch_add(1, Ordering::SeqCst);
        if !self.retrieve_delay.is_zero() {
            tokio::time::sleep(self.retrieve_delay).await;
        }
        self.fixture.retrieve_booking(pnr, last_name).await
    }

    async fn current_passenger(&self) -> Passenger {
        self.fixture.passenger()
    }

    async fn create_channel_session(
        &self,
        _request: &CreateSessionRequest,
    ) -> Result<ChannelSession, BookingServiceError> {
        let n = self.sessions.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_sessions {
            return Err(BookingServiceError::Api {
                status: 503,
                body: "notifications unavailable".into(),
            });
        }
        let mut session = self.fixture.session();
        session.session_id = format!("session-{n}");
        session.heartbeat_interval_sec = self.heartbeat_secs;
        Ok(session)
    }

    async fn close_channel_session(&self, session_id: &str) -> Result<(), BookingServiceError> {
        self.closed.lock().unwrap().push(session_id.to_string());
        Ok(())
    }

    fn apply_gate_change(&self, new_gate: &str) {
        self.fixture.apply_gate_change(new_gate);
    }
}

// ---------------------------------------------------------------------------
// Polling helpers
// ---------------------------------------------------------------------------

/// Poll the store until `pred` holds.
pub async fn wait_for_store(store: &SharedStore, pred: impl Fn(&AppStore) -> bool) {
    tokio::time::timeout(WAIT, async {
        loop {
            if pred(&*store.read().await) {
                return;
            }
            tokio::time::sleep(POLL).await;
        }
    })
    .await
    .expect("store condition not met in time");
}

/// Poll until `pred` holds.
pub async fn wait_until(pred: impl Fn() -> bool) {
    tokio::time::timeout(WAIT, async {
        while !pred() {
            tokio::time::sleep(POLL).await;
        }
    })
    .await
    .expect("condition not met in time");
}

/// Seed the store with the fixture's passenger and booking.
pub async fn seed_booking(store: &SharedStore, service: &CountingService) {
    store
        .write()
        .await
        .replace_booking(service.fixture().passenger(), service.fixture().booking());
}

pub fn shared(service: CountingService) -> Arc<CountingService> {
    Arc::new(service)
}
