//! Console command parsing.

use std::str::FromStr;
use std::time::Duration;

use gatewatch_core::store::Tab;
use uuid::Uuid;

pub const HELP: &str = "\
Commands:
  retrieve <PNR> <LASTNAME>   look up a booking and connect
  connect                     open the channel for the current booking
  disconnect                  close the channel
  send <raw>                  send a raw frame over the open channel
  simulate [secs]             deliver a simulated gate change
  status                      show channel status and booking
  feed                        list notifications, newest first
  dismiss <n|id>              remove one notification
  clear                       remove all notifications
  tab <home|trips|book|specials|more>
  help                        show this help
  quit                        exit";

/// Which notification to dismiss.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DismissTarget {
    /// 1-based position in the feed as listed by `feed`.
    Position(usize),
    Id(Uuid),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Retrieve { pnr: String, last_name: String },
    Connect,
    Disconnect,
    Send(String),
    Simulate(Option<Duration>),
    Status,
    Feed,
    Dismiss(DismissTarget),
    Clear,
    Tab(Tab),
    Help,
    Quit,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("empty command")]
    Empty,

    #[error("unknown command '{0}', try 'help'")]
    Unknown(String),

    #[error("usage: {0}")]
    Usage(&'static str),

    #[error("{0}")]
    Invalid(String),
}

impl FromStr for Command {
    type Err = ParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (verb, rest) = match line.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (line, ""),
        };

        match verb.to_ascii_lowercase().as_str() {
            "" => Err(ParseError::Empty),
            "retrieve" => {
                let mut args = rest.split_whitespace();
                match (args.next(), args.next(), args.next()) {
                    (Some(pnr), Some(last_name), None) => Ok(Command::Retrieve {
                        pnr: pnr.to_string(),
                        last_name: last_name.to_string(),
                    }),
                    _ => Err(ParseError::Usage("retrieve <PNR> <LASTNAME>")),
                }
            }
            "connect" => Ok(Command::Connect),
            "disconnect" => Ok(Command::Disconnect),
            // The payload is sent as typed, inner whitespace included.
            "send" if rest.is_empty() => Err(ParseError::Usage("send <raw>")),
            "send" => Ok(Command::Send(rest.to_string())),
            "simulate" if rest.is_empty() => Ok(Command::Simulate(None)),
            "simulate" => rest
                .parse::<f64>()
                .ok()
                .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
                .map(|delay| Command::Simulate(Some(delay)))
                .ok_or_else(|| ParseError::Invalid(format!("invalid delay '{rest}'"))),
            "status" => Ok(Command::Status),
            "feed" => Ok(Command::Feed),
            "dismiss" => parse_dismiss(rest).map(Command::Dismiss),
            "clear" => Ok(Command::Clear),
            "tab" => rest.parse().map(Command::Tab).map_err(ParseError::Invalid),
            "help" | "?" => Ok(Command::Help),
            "quit" | "exit" => Ok(Command::Quit),
            other => Err(ParseError::Unknown(other.to_string())),
        }
    }
}

fn parse_dismiss(arg: &str) -> Result<DismissTarget, ParseError> {
    if arg.is_empty() {
        return Err(ParseError::Usage("dismiss <n|id>"));
    }
    if let Ok(position) = arg.parse::<usize>() {
        return match position {
            0 => Err(ParseError::Invalid("positions start at 1".into())),
            n => Ok(DismissTarget::Position(n)),
        };
    }
    arg.parse::<Uuid>()
        .map(DismissTarget::Id)
        .map_err(|_| ParseError::Invalid(format!("'{arg}' is neither a position nor an id")))
}
