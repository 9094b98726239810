//! `gatewatch-lab` -- interactive console for the notification pipeline.
//!
//! Retrieves a booking, opens its notification channel and prints every
//! channel event as it happens. Commands are read line by line from
//! stdin; type `help` for the list. Logs go to stderr.
//!
//! # Environment variables
//!
//! | Variable                    | Default                 | Description                         |
//! |-----------------------------|-------------------------|-------------------------------------|
//! | `API_BASE_URL`              | `http://localhost:8080` | Booking service base URL            |
//! | `API_TOKEN`                 | demo token              | Bearer token                        |
//! | `API_FALLBACK_TO_FIXTURE`   | `true`                  | Answer from the fixture on failure  |
//! | `CHANNEL_FALLBACK_DELAY_MS` | `6500`                  | Delay before the simulated event    |
//! | `LAB_PNR` / `LAB_LAST_NAME` | unset                   | Booking to retrieve on start        |
//! | `LOG_FORMAT`                | `text`                  | `json` for JSON log lines           |

use std::sync::Arc;

use anyhow::Context;
use gatewatch_booking::{BookingService, HttpBookingService};
use gatewatch_lab::commands::{Command, ParseError, HELP};
use gatewatch_lab::config::LabConfig;
use gatewatch_lab::console::{execute, render_event, Flow};
use gatewatch_notify::{new_shared_store, BookingSession};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_LOG_FILTER: &str = "gatewatch_lab=info,gatewatch_notify=info,gatewatch_booking=info";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = LabConfig::from_env().context("Invalid configuration")?;
    init_tracing(config.log_json);

    tracing::info!(
        base_url = %config.api.base_url,
        fallback_to_fixture = config.api.fallback_to_fixture,
        fallback_delay_ms = config.channel.fallback_delay.as_millis() as u64,
        "Starting gatewatch-lab",
    );

    let service: Arc<dyn BookingService> = Arc::new(
        HttpBookingService::new(&config.api).context("Failed to build booking service client")?,
    );
    let session = BookingSession::new(config.channel.clone(), service, new_shared_store());
    session.load_passenger().await;

    let mut events = session.channel().subscribe();
    let printer = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => println!("{}", render_event(&event)),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Event printer lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    println!("{HELP}");

    if let Some((pnr, last_name)) = config.initial_booking.clone() {
        let (_, output) = execute(&session, Command::Retrieve { pnr, last_name }).await;
        println!("{output}");
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read stdin")? else {
                    break;
                };
                match line.parse::<Command>() {
                    Ok(command) => {
                        let (flow, output) = execute(&session, command).await;
                        println!("{output}");
                        if flow == Flow::Quit {
                            break;
                        }
                    }
                    Err(ParseError::Empty) => {}
                    Err(e) => println!("{e}"),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received Ctrl+C, shutting down");
                break;
            }
        }
    }

    session.teardown().await;
    printer.abort();
    Ok(())
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
