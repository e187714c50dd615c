//! Shell event loops.
//!
//! One foreground task multiplexes operator input lines, the controller's
//! event feed, receive-loop exits and a shutdown signal with `select!`.
//! Every controller call happens on this task.

use std::future::Future;

use tandem_core::{
    Connector, Controller, Endpoint, LinkConfig, LinkError, LinkEvent, LinkEvents, TcpConnector,
};
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite},
    net::TcpListener,
};

use crate::{
    commands::{self, Command},
    error::CliError,
    terminal::Terminal,
};

/// What the loop does after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

/// Controller, its feed and the terminal, driven together.
struct Shell<C: Connector, W> {
    controller: Controller<C>,
    feed: LinkEvents,
    terminal: Terminal<W>,
    /// Echo received messages back to the peer.
    echo: bool,
    /// `/connect` allowed (client role only).
    can_connect: bool,
}

impl<C, W> Shell<C, W>
where
    C: Connector,
    W: AsyncWrite + Unpin,
{
    async fn command(&mut self, line: &str) -> Result<Flow, CliError> {
        if line.trim().is_empty() {
            return Ok(Flow::Continue);
        }

        match commands::parse(line) {
            Command::Quit => return Ok(Flow::Quit),
            Command::Help => self.terminal.help().await?,
            Command::Connect { endpoint } if self.can_connect => self.connect(&endpoint).await?,
            Command::Connect { .. } => {
                self.terminal.notice("/connect is not available while listening").await?;
            },
            Command::Disconnect => {
                let result = self.controller.disconnect().await;
                self.report(result).await?;
            },
            Command::Message { content } => {
                // The sent message comes back through the feed.
                let result = self.controller.send(&content).await.map(|_| ());
                self.report(result).await?;
            },
            Command::Unknown { input } => {
                self.terminal.notice(format!("unknown command {input} (try /help)")).await?;
            },
            Command::InvalidArgs { command, error } => {
                self.terminal.notice(format!("/{command}: {error}")).await?;
            },
        }
        Ok(Flow::Continue)
    }

    async fn connect(&mut self, endpoint: &Endpoint) -> Result<(), CliError> {
        let result = self.controller.connect(endpoint).await;
        self.report(result).await
    }

    async fn event(&mut self, event: LinkEvent) -> Result<(), CliError> {
        self.terminal.event(&event).await?;

        match event {
            LinkEvent::Message(message) if self.echo && !message.is_local() => {
                // Echoes are not operator commands; a failed one is only logged.
                if let Err(err) = self.controller.send(message.text()).await {
                    tracing::debug!(error = %err, "echo not sent");
                }
                Ok(())
            },
            _ => Ok(()),
        }
    }

    /// Handle every event already queued on the feed.
    ///
    /// Run before adopting a new peer, so that nothing from the previous
    /// session is echoed into the new one.
    async fn drain(&mut self) -> Result<(), CliError> {
        while let Ok(event) = self.feed.try_recv() {
            self.event(event).await?;
        }
        Ok(())
    }

    /// Show a failed command to the operator. Connect failures were already
    /// published on the feed.
    async fn report(&mut self, result: Result<(), LinkError>) -> Result<(), CliError> {
        match result {
            Ok(()) | Err(LinkError::Connect { .. }) => Ok(()),
            Err(err) => {
                tracing::debug!(error = %err, "command failed");
                Ok(self.terminal.notice(err).await?)
            },
        }
    }

    /// Tear the link down and render whatever is still queued.
    async fn finish(&mut self) -> Result<(), CliError> {
        self.controller.shutdown().await;
        while let Ok(event) = self.feed.try_recv() {
            self.terminal.event(&event).await?;
        }
        Ok(())
    }
}

/// Run the client role until `/quit`, end of input, or `shutdown` resolves.
///
/// Connects to `initial` first when given.
pub async fn run_client<C, R, W, F>(
    controller: Controller<C>,
    feed: LinkEvents,
    initial: Option<Endpoint>,
    input: R,
    terminal: Terminal<W>,
    shutdown: F,
) -> Result<(), CliError>
where
    C: Connector,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    let mut shell = Shell { controller, feed, terminal, echo: false, can_connect: true };
    shell.terminal.notice("type /help for commands").await?;

    if let Some(endpoint) = initial {
        shell.connect(&endpoint).await?;
    }

    let mut lines = input.lines();
    loop {
        tokio::select! {
            () = &mut shutdown => break,
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if shell.command(&line).await? == Flow::Quit {
                    break;
                }
            },
            Some(event) = shell.feed.recv() => shell.event(event).await?,
            Some(exit) = shell.controller.next_loop_exit() => {
                shell.controller.handle_loop_exit(exit).await;
            },
        }
    }

    shell.finish().await
}

/// Run the listener role.
///
/// Serves one peer at a time and returns to accepting when its session
/// ends. With `echo`, every received message is sent back to the peer that
/// sent it. Runs until `/quit` or `shutdown` resolves; end of input only
/// stops reading commands.
pub async fn run_listener<R, W, F>(
    listener: TcpListener,
    config: LinkConfig,
    echo: bool,
    input: R,
    terminal: Terminal<W>,
    shutdown: F,
) -> Result<(), CliError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    let nodelay = config.nodelay;
    let connector = TcpConnector::new(config.connect_timeout, nodelay);
    let (controller, feed) = Controller::new(connector, config);
    let mut shell = Shell { controller, feed, terminal, echo, can_connect: false };

    let local = listener.local_addr()?;
    tracing::info!(%local, echo, "listening");
    shell.terminal.notice(format!("listening on {local}")).await?;

    let mut lines = input.lines();
    let mut input_open = true;
    loop {
        tokio::select! {
            () = &mut shutdown => break,
            accepted = listener.accept(), if !shell.controller.is_connected() => {
                match accepted {
                    Ok((stream, addr)) => {
                        set_nodelay(&stream, nodelay);
                        shell.drain().await?;
                        shell.controller.adopt(stream, addr.to_string()).await?;
                    },
                    Err(err) => tracing::warn!(error = %err, "accept failed"),
                }
            },
            line = lines.next_line(), if input_open => {
                match line? {
                    Some(line) => {
                        if shell.command(&line).await? == Flow::Quit {
                            break;
                        }
                    },
                    None => input_open = false,
                }
            },
            Some(event) = shell.feed.recv() => shell.event(event).await?,
            Some(exit) = shell.controller.next_loop_exit() => {
                shell.controller.handle_loop_exit(exit).await;
            },
        }
    }

    shell.finish().await
}

fn set_nodelay(stream: &tokio::net::TcpStream, nodelay: bool) {
    if let Err(err) = stream.set_nodelay(nodelay) {
        tracing::debug!(error = %err, "failed to set TCP_NODELAY");
    }
}
