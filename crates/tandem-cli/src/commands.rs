//! Command parsing for the line shell.
//!
//! This module parses input lines into structured [`Command`] values.

use tandem_core::Endpoint;

/// Parsed command from operator input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Connect to a peer, replacing any current connection.
    Connect {
        /// Peer to connect to.
        endpoint: Endpoint,
    },

    /// Close the current connection.
    Disconnect,

    /// Show the command list.
    Help,

    /// Quit the shell.
    Quit,

    /// Send a message to the peer.
    Message {
        /// Message content.
        content: String,
    },

    /// Unknown or invalid command.
    Unknown {
        /// The original input.
        input: String,
    },

    /// Command with missing or invalid arguments.
    InvalidArgs {
        /// Command name.
        command: String,
        /// Error message.
        error: String,
    },
}

/// One line per command, for `/help`.
pub const HELP: &[&str] = &[
    "/connect HOST:PORT  connect to a peer (replaces the current connection)",
    "/disconnect         close the current connection",
    "/help               show this list",
    "/quit, /q           leave",
    "anything else is sent as a message",
];

/// Parse an input line into a command.
///
/// Commands start with `/`. Anything else is treated as a message.
pub fn parse(input: &str) -> Command {
    let input = input.trim();

    if input.is_empty() {
        return Command::Message { content: String::new() };
    }

    let Some(cmd_str) = input.strip_prefix('/') else {
        return Command::Message { content: input.to_string() };
    };

    let parts: Vec<&str> = cmd_str.split_whitespace().collect();
    let command = parts.first().copied().unwrap_or("");

    match command {
        "connect" => match parts.get(1) {
            Some(endpoint) => match endpoint.parse::<Endpoint>() {
                Ok(endpoint) => Command::Connect { endpoint },
                Err(err) => Command::InvalidArgs { command: "connect".into(), error: err.to_string() },
            },
            None => Command::InvalidArgs {
                command: "connect".into(),
                error: "Usage: /connect <host:port>".into(),
            },
        },

        "disconnect" => Command::Disconnect,

        "help" | "?" => Command::Help,

        "quit" | "q" => Command::Quit,

        _ => Command::Unknown { input: input.to_string() },
    }
}
