//! Lifecycle driver.
//!
//! [`Controller`] owns the lifecycle state machine, the live session (if
//! any) and its receive loop. It is driven from a single foreground task:
//! operator commands arrive as method calls, receive-loop exits arrive on an
//! internal channel polled through [`Controller::next_loop_exit`]. Nothing is
//! shared across tasks except the two channels, so no lock is needed.
//!
//! Each session gets a fresh generation number. Exit reports carrying an
//! older generation come from sessions that were already torn down and are
//! ignored.

use tandem_proto::{FrameError, Message};
use tokio::sync::mpsc;

use crate::{
    config::LinkConfig,
    error::LinkError,
    event::{EventSink, LinkEvent, LinkEvents},
    lifecycle::{ConnectionState, Lifecycle, LifecycleAction, LossCause},
    receive_loop::{LoopExit, LoopOutcome, ReceiveLoop},
    session::Session,
    transport::{Connector, Endpoint},
};

/// A live session and the loop draining it.
struct ActiveLink<S> {
    session: Session<S>,
    receive_loop: ReceiveLoop,
}

/// Drives one point-to-point link.
pub struct Controller<C: Connector> {
    connector: C,
    config: LinkConfig,
    lifecycle: Lifecycle,
    active: Option<ActiveLink<C::Stream>>,
    generation: u64,
    events: EventSink,
    exits_tx: mpsc::UnboundedSender<LoopExit>,
    exits_rx: mpsc::UnboundedReceiver<LoopExit>,
}

impl<C: Connector> Controller<C> {
    /// Create a disconnected controller and the event feed it publishes to.
    pub fn new(connector: C, config: LinkConfig) -> (Self, LinkEvents) {
        let (events, feed) = mpsc::unbounded_channel();
        let (exits_tx, exits_rx) = mpsc::unbounded_channel();

        let controller = Self {
            connector,
            config,
            lifecycle: Lifecycle::new(),
            active: None,
            generation: 0,
            events,
            exits_tx,
            exits_rx,
        };
        (controller, feed)
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        self.lifecycle.state()
    }

    /// True while a session is live.
    pub fn is_connected(&self) -> bool {
        self.lifecycle.state() == ConnectionState::Connected
    }

    /// Label of the connected peer.
    pub fn peer(&self) -> Option<&str> {
        self.active.as_ref().map(|link| link.session.peer())
    }

    /// Link configuration.
    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    /// Open a connection to `endpoint`, replacing any live one.
    ///
    /// Publishes `Connecting`, then either `Connected` or `Faulted` followed
    /// by `ConnectFailed` and `Disconnected`.
    ///
    /// # Errors
    /// - `InvalidState` if a connect is already in progress
    /// - `Connect` if the transport could not be opened (already published)
    pub async fn connect(&mut self, endpoint: &Endpoint) -> Result<(), LinkError> {
        let actions = self.lifecycle.connect_requested()?;
        self.execute(actions, None).await;

        tracing::info!(%endpoint, "connecting");
        match self.connector.connect(endpoint).await {
            Ok(stream) => self.attach(stream, endpoint.to_string()).await,
            Err(source) => {
                tracing::warn!(%endpoint, error = %source, "connect failed");
                let actions = self.lifecycle.open_failed(endpoint.to_string(), source.to_string())?;
                self.execute(actions, None).await;
                Err(LinkError::Connect { endpoint: endpoint.to_string(), source })
            },
        }
    }

    /// Take over a stream opened elsewhere, typically accepted by a listener.
    ///
    /// Behaves like a successful [`Self::connect`].
    ///
    /// # Errors
    /// Returns `InvalidState` if a connect is already in progress.
    pub async fn adopt(
        &mut self,
        stream: C::Stream,
        peer: impl Into<String>,
    ) -> Result<(), LinkError> {
        let actions = self.lifecycle.connect_requested()?;
        self.execute(actions, None).await;
        self.attach(stream, peer.into()).await
    }

    /// Close the live connection. No-op when already disconnected.
    ///
    /// Returns once the receive loop has stopped; no message from the closed
    /// session is published after this.
    ///
    /// # Errors
    /// Returns `InvalidState` if a connect is in progress.
    pub async fn disconnect(&mut self) -> Result<(), LinkError> {
        let actions = self.lifecycle.disconnect_requested()?;
        self.execute(actions, None).await;
        Ok(())
    }

    /// Send `text` to the peer.
    ///
    /// On success the local message is published to the feed and returned.
    /// A write failure ends the connection the same way a receive failure
    /// does.
    ///
    /// # Errors
    /// - `NotConnected` without a live session
    /// - `Frame(EmptyMessage | PayloadTooLarge)` for unsendable text
    /// - `Frame(ConnectionClosed | Transport)` if the write failed
    pub async fn send(&mut self, text: &str) -> Result<Message, LinkError> {
        self.lifecycle.ensure_connected()?;
        let Some(link) = self.active.as_mut() else {
            return Err(LinkError::NotConnected);
        };

        match link.session.send(text).await {
            Ok(()) => {
                let message = Message::local(self.config.username.clone(), text);
                self.emit(LinkEvent::Message(message.clone()));
                Ok(message)
            },
            Err(err) if err.is_recoverable() => Err(err),
            Err(err) => {
                let cause = match &err {
                    LinkError::Frame(FrameError::ConnectionClosed) => LossCause::Closed,
                    _ => LossCause::Faulted,
                };
                self.lose_connection(&cause, err.to_string()).await;
                Err(err)
            },
        }
    }

    /// Wait for the next receive-loop exit report. Cancel-safe.
    pub async fn next_loop_exit(&mut self) -> Option<LoopExit> {
        self.exits_rx.recv().await
    }

    /// React to a receive-loop exit: a live session whose loop stopped is
    /// torn down and reported lost. Stale reports are ignored.
    pub async fn handle_loop_exit(&mut self, exit: LoopExit) {
        let current = self.active.as_ref().map(|link| link.receive_loop.generation());
        if current != Some(exit.generation) {
            tracing::trace!(generation = exit.generation, ?current, "ignoring stale loop exit");
            return;
        }

        let (cause, reason) = match exit.outcome {
            LoopOutcome::Closed => (LossCause::Closed, "peer closed the connection".to_string()),
            LoopOutcome::Faulted(err) => (LossCause::Faulted, err.to_string()),
        };
        self.lose_connection(&cause, reason).await;
    }

    /// Tear everything down unconditionally. Used at process exit.
    pub async fn shutdown(&mut self) {
        let actions = self.lifecycle.teardown();
        self.execute(actions, None).await;
    }

    async fn attach(&mut self, stream: C::Stream, peer: String) -> Result<(), LinkError> {
        let actions = self.lifecycle.transport_opened()?;
        tracing::info!(%peer, "connected");
        self.execute(actions, Some((stream, peer))).await;
        Ok(())
    }

    async fn lose_connection(&mut self, cause: &LossCause, reason: String) {
        tracing::info!(?cause, %reason, "connection lost");
        match self.lifecycle.connection_lost(cause, reason) {
            Ok(actions) => self.execute(actions, None).await,
            Err(err) => tracing::debug!(error = %err, "ignoring loss report"),
        }
    }

    async fn execute(
        &mut self,
        actions: Vec<LifecycleAction>,
        mut transport: Option<(C::Stream, String)>,
    ) {
        for action in actions {
            match action {
                LifecycleAction::TearDown => self.tear_down().await,
                LifecycleAction::StartSession => {
                    let Some((stream, peer)) = transport.take() else {
                        tracing::error!("session start requested without a transport");
                        continue;
                    };
                    self.start_session(stream, peer);
                },
                LifecycleAction::Emit(event) => self.emit(event),
            }
        }
    }

    fn start_session(&mut self, stream: C::Stream, peer: String) {
        self.generation += 1;
        let (session, reader) = Session::open(stream, peer);
        let receive_loop =
            ReceiveLoop::spawn(self.generation, reader, self.events.clone(), self.exits_tx.clone());
        self.active = Some(ActiveLink { session, receive_loop });
    }

    async fn tear_down(&mut self) {
        let Some(ActiveLink { mut session, receive_loop }) = self.active.take() else {
            return;
        };

        session.close().await;
        receive_loop.join(self.config.teardown_grace).await;
    }

    fn emit(&self, event: LinkEvent) {
        if self.events.send(event).is_err() {
            tracing::trace!("event feed closed");
        }
    }
}
