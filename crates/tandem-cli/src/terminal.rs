//! Line-oriented terminal output.
//!
//! Messages render as `[HH:MM:SS] author: text` (UTC time of day); anything
//! else is a notice prefixed with `*** `.

use std::{fmt, io, time::SystemTime};

use chrono::{DateTime, Utc};
use tandem_core::LinkEvent;
use tandem_proto::Message;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::commands::HELP;

/// Output side of the shell.
#[derive(Debug)]
pub struct Terminal<W> {
    out: W,
}

impl<W> Terminal<W>
where
    W: AsyncWrite + Unpin,
{
    /// Write to `out`, usually stdout.
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Write one line and flush it.
    pub async fn line(&mut self, line: &str) -> io::Result<()> {
        self.out.write_all(line.as_bytes()).await?;
        self.out.write_all(b"\n").await?;
        self.out.flush().await
    }

    /// Write a `*** ` notice.
    pub async fn notice(&mut self, text: impl fmt::Display) -> io::Result<()> {
        self.line(&notice(text)).await
    }

    /// Render a link event.
    pub async fn event(&mut self, event: &LinkEvent) -> io::Result<()> {
        self.line(&render_event(event)).await
    }

    /// Print the command list.
    pub async fn help(&mut self) -> io::Result<()> {
        for line in HELP {
            self.notice(line).await?;
        }
        Ok(())
    }

    /// Underlying writer.
    pub fn into_inner(self) -> W {
        self.out
    }
}

/// Text for a link event.
pub fn render_event(event: &LinkEvent) -> String {
    match event {
        LinkEvent::StateChanged(state) => notice(state),
        LinkEvent::Message(message) => render_message(message),
        LinkEvent::ConnectFailed { endpoint, reason } => {
            notice(format_args!("could not connect to {endpoint}: {reason}"))
        },
        LinkEvent::ConnectionLost { reason } => notice(format_args!("connection lost: {reason}")),
    }
}

/// Text for a message.
pub fn render_message(message: &Message) -> String {
    format_message(message.timestamp(), message.author(), message.text())
}

/// Text for a notice.
pub fn notice(text: impl fmt::Display) -> String {
    format!("*** {text}")
}

fn format_message(at: SystemTime, author: &str, text: &str) -> String {
    let time = DateTime::<Utc>::from(at).format("%H:%M:%S");
    format!("[{time}] {author}: {text}")
}
