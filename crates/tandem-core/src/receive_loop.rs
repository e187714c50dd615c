//! Background receive loop.
//!
//! One task per session. It decodes frames from the [`SessionReader`] and
//! publishes each as a [`LinkEvent::Message`]. When the stream ends it
//! reports a [`LoopExit`] to the controller, which decides what the end
//! means for the lifecycle. The loop never touches lifecycle state itself.

use std::time::Duration;

use tandem_proto::FrameError;
use tokio::{io::AsyncRead, sync::mpsc, task::JoinHandle};

use crate::{event::LinkEvent, session::SessionReader};

/// How a receive loop ended.
#[derive(Debug)]
pub enum LoopOutcome {
    /// The stream closed: peer EOF, or the session was closed locally.
    Closed,
    /// The stream broke: bad frame length or a transport error.
    Faulted(FrameError),
}

/// Exit report sent by a finished receive loop.
#[derive(Debug)]
pub struct LoopExit {
    /// Session generation the loop belonged to.
    pub generation: u64,
    /// Why it stopped.
    pub outcome: LoopOutcome,
}

/// Handle to a running receive loop. Dropping it aborts the task.
#[derive(Debug)]
pub struct ReceiveLoop {
    generation: u64,
    handle: Option<JoinHandle<()>>,
}

impl ReceiveLoop {
    /// Start draining `reader` on a new task.
    ///
    /// Messages go to `events`. The exit report goes to `exits`, tagged with
    /// `generation` so the controller can tell it apart from reports of
    /// earlier sessions.
    pub fn spawn<S>(
        generation: u64,
        reader: SessionReader<S>,
        events: mpsc::UnboundedSender<LinkEvent>,
        exits: mpsc::UnboundedSender<LoopExit>,
    ) -> Self
    where
        S: AsyncRead + Send + 'static,
    {
        let handle = tokio::spawn(run(generation, reader, events, exits));
        Self { generation, handle: Some(handle) }
    }

    /// Session generation this loop belongs to.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// True once the task has stopped.
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Wait up to `grace` for the task to stop, then abort it.
    ///
    /// Call after closing the session; the close signal makes a healthy loop
    /// stop on its own well within any reasonable grace period. Either way
    /// the task has fully stopped when this returns.
    pub async fn join(mut self, grace: Duration) {
        let Some(mut handle) = self.handle.take() else {
            return;
        };

        match tokio::time::timeout(grace, &mut handle).await {
            Ok(Ok(())) => {},
            Ok(Err(err)) if err.is_cancelled() => {},
            Ok(Err(err)) => {
                tracing::error!(generation = self.generation, error = %err, "receive loop panicked");
            },
            Err(_) => {
                tracing::warn!(
                    generation = self.generation,
                    ?grace,
                    "receive loop did not stop in time, aborting"
                );
                handle.abort();
                // Wait out a poll that may be running on another worker.
                if let Err(err) = handle.await {
                    if !err.is_cancelled() {
                        tracing::error!(generation = self.generation, error = %err, "receive loop panicked");
                    }
                }
            },
        }
    }
}

impl Drop for ReceiveLoop {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

async fn run<S>(
    generation: u64,
    mut reader: SessionReader<S>,
    events: mpsc::UnboundedSender<LinkEvent>,
    exits: mpsc::UnboundedSender<LoopExit>,
) where
    S: AsyncRead,
{
    tracing::debug!(generation, peer = reader.peer(), "receive loop started");

    let outcome = loop {
        match reader.receive_one().await {
            Ok(message) => {
                // A frame that completed as the session closed is dropped.
                if reader.is_closed() {
                    break LoopOutcome::Closed;
                }
                if events.send(LinkEvent::Message(message)).is_err() {
                    tracing::trace!(generation, "event feed closed, dropping message");
                }
            },
            Err(FrameError::ConnectionClosed) => break LoopOutcome::Closed,
            Err(err) => break LoopOutcome::Faulted(err),
        }
    };

    match &outcome {
        LoopOutcome::Closed => {
            tracing::debug!(
                generation,
                frames = reader.frames_received(),
                "receive loop stopped: connection closed"
            );
        },
        LoopOutcome::Faulted(err) => {
            tracing::warn!(
                generation,
                frames = reader.frames_received(),
                error = %err,
                "receive loop stopped: stream fault"
            );
        },
    }

    // The controller may already be gone during process teardown.
    let _ = exits.send(LoopExit { generation, outcome });
}
