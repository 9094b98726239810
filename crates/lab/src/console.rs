//! Command execution and text rendering for the lab console.

use std::time::Duration;

use gatewatch_core::store::AppStore;
use gatewatch_notify::{BookingSession, ChannelError, ChannelEvent};

use crate::commands::{Command, DismissTarget, HELP};

/// Whether the console loop should keep reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Run one command against the session and return the text to print.
pub async fn execute(session: &BookingSession, command: Command) -> (Flow, String) {
    let output = match command {
        Command::Retrieve { pnr, last_name } => match session.retrieve(&pnr, &last_name).await {
            Ok(found) => format!(
                "Retrieved {} for {} {}",
                found.booking.pnr, found.passenger.first_name, found.passenger.last_name
            ),
            Err(e) => format!("Retrieve failed: {e}"),
        },
        Command::Connect => {
            if session.store().read().await.booking().is_none() {
                "No booking loaded; use 'retrieve' first".to_string()
            } else {
                session.connect().await;
                render_status(&*session.store().read().await)
            }
        }
        Command::Disconnect => {
            session.channel().close().await;
            "Channel closed".to_string()
        }
        Command::Send(raw) => match session.channel().send(&raw).await {
            Ok(()) => format!("Sent {} bytes", raw.len()),
            Err(ChannelError::NotOpen) => "Channel is not open".to_string(),
            Err(e) => format!("Send failed: {e}"),
        },
        Command::Simulate(delay) => {
            let delay = delay.unwrap_or(session.channel().config().fallback_delay);
            if session.channel().schedule_simulated(delay).await {
                format!("Simulated notification in {}", format_delay(delay))
            } else {
                "Not scheduled: no booking loaded or one is already pending".to_string()
            }
        }
        Command::Status => render_status(&*session.store().read().await),
        Command::Feed => render_feed(&*session.store().read().await),
        Command::Dismiss(target) => {
            let mut store = session.store().write().await;
            let id = match target {
                DismissTarget::Id(id) => Some(id),
                DismissTarget::Position(n) => store.notifications().iter().nth(n - 1).map(|i| i.id),
            };
            match id {
                Some(id) if store.dismiss_notification(id) => "Dismissed".to_string(),
                _ => "No such notification".to_string(),
            }
        }
        Command::Clear => {
            session.store().write().await.clear_notifications();
            "Notifications cleared".to_string()
        }
        Command::Tab(tab) => {
            session.store().write().await.set_active_tab(tab);
            format!("Switched to {tab:?}")
        }
        Command::Help => HELP.to_string(),
        Command::Quit => return (Flow::Quit, "Bye".to_string()),
    };
    (Flow::Continue, output)
}

pub fn render_status(store: &AppStore) -> String {
    let mut lines = vec![format!("Channel: {}", store.channel_status())];
    match (store.passenger(), store.booking()) {
        (Some(passenger), Some(booking)) => {
            let flight = &booking.flight;
            lines.push(format!(
                "Booking: {} ({:?}) for {} {}",
                booking.pnr, booking.status, passenger.first_name, passenger.last_name
            ));
            lines.push(format!(
                "Flight:  {} {} -> {} departs {} gate {}",
                flight.flight_number,
                flight.origin.code,
                flight.destination.code,
                flight.departure_time.format("%Y-%m-%d %H:%M"),
                flight.boarding_gate.as_deref().unwrap_or("TBA"),
            ));
        }
        (Some(passenger), None) => {
            lines.push(format!(
                "Passenger: {} {} ({} points), no booking",
                passenger.first_name, passenger.last_name, passenger.loyalty_points
            ));
        }
        _ => lines.push("No booking loaded".to_string()),
    }
    lines.push(format!(
        "Tab: {:?}  Notifications: {}",
        store.active_tab(),
        store.notifications().len()
    ));
    lines.join("\n")
}

pub fn render_feed(store: &AppStore) -> String {
    if store.notifications().is_empty() {
        return "No notifications".to_string();
    }
    store
        .notifications()
        .iter()
        .enumerate()
        .map(|(i, item)| {
            format!(
                "{}. [{}] {}\n   {}\n   id {}",
                i + 1,
                item.occurred_at.format("%H:%M:%S"),
                item.title,
                item.message,
                item.id
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// One debug-log line per channel event.
pub fn render_event(event: &ChannelEvent) -> String {
    match event {
        ChannelEvent::StatusChanged { status } => format!("[channel] status {status}"),
        ChannelEvent::MessageReceived { raw } => format!("[channel] <- {raw}"),
        ChannelEvent::MessageSent { raw } => format!("[channel] -> {raw}"),
        ChannelEvent::NotificationApplied { notification } => {
            format!("[notify] {}: {}", notification.title, notification.message)
        }
        ChannelEvent::FallbackScheduled { delay_ms } => {
            format!("[channel] simulated notification in {delay_ms}ms")
        }
        ChannelEvent::FallbackFired { old_gate, new_gate } => {
            format!("[channel] simulated gate change {old_gate} -> {new_gate}")
        }
        ChannelEvent::Closed { reason } => format!("[channel] closed: {reason}"),
    }
}

fn format_delay(delay: Duration) -> String {
    format!("{:.1}s", delay.as_secs_f64())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use gatewatch_booking::FixtureBookingService;
    use gatewatch_core::channel_status::ChannelStatus;
    use gatewatch_notify::{new_shared_store, ChannelConfig};

    use super::*;

    fn session() -> BookingSession {
        BookingSession::new(
            ChannelConfig::default(),
            Arc::new(FixtureBookingService::new()),
            new_shared_store(),
        )
    }

    #[tokio::test]
    async fn status_without_booking() {
        let session = session();
        let (flow, out) = execute(&session, Command::Status).await;
        assert_eq!(flow, Flow::Continue);
        assert!(out.contains("Channel: disconnected"));
        assert!(out.contains("No booking loaded"));
    }

    #[tokio::test]
    async fn send_while_closed_reports_not_open() {
        let (_, out) = execute(&session(), Command::Send("hi".into())).await;
        assert_eq!(out, "Channel is not open");
    }

    #[tokio::test]
    async fn simulate_needs_booking() {
        let (_, out) = execute(&session(), Command::Simulate(None)).await;
        assert!(out.starts_with("Not scheduled"));
    }

    #[tokio::test]
    async fn retrieve_shows_booking_and_connects() {
        let session = session();
        let (_, out) = execute(
            &session,
            Command::Retrieve {
                pnr: "AB12CD".into(),
                last_name: "Nightingale".into(),
            },
        )
        .await;
        assert_eq!(out, "Retrieved AB12CD for Joe Nightingale");

        // The fixture channel URL is unreachable, so the channel degrades.
        let store = session.store().read().await;
        assert_eq!(store.channel_status(), ChannelStatus::Error);
        assert!(render_status(&store).contains("VA801 MEL -> SYD"));
        drop(store);
        session.teardown().await;
    }

    #[tokio::test]
    async fn quit_stops_the_loop() {
        let (flow, _) = execute(&session(), Command::Quit).await;
        assert_eq!(flow, Flow::Quit);
    }

    #[test]
    fn empty_feed_renders_placeholder() {
        assert_eq!(render_feed(&AppStore::new()), "No notifications");
    }
}
