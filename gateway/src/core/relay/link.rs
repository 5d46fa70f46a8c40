//! Duplex connection plumbing shared by the telephony and backend sides.
//!
//! A [`Link`] is what the relay sees of one socket: a channel of inbound
//! text frames and a [`LinkSender`] that queues typed outbound events for a
//! writer task owning the socket sink. When the socket goes away the
//! channels close, which is how "connection closed" reaches the pumps.

use std::fmt::Display;
use std::time::Duration;

use futures::{Sink, SinkExt};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error};

/// Buffer size for both directions of a link.
pub const LINK_CHANNEL_CAPACITY: usize = 1024;

/// The other end of the link is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("link closed")]
pub struct LinkClosed;

/// Instruction for a link's writer task.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkCommand<T> {
    Send(T),
    Close,
}

/// Cloneable handle for queueing outbound events on a link.
#[derive(Debug)]
pub struct LinkSender<T> {
    tx: mpsc::Sender<LinkCommand<T>>,
}

impl<T> Clone for LinkSender<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<T> LinkSender<T> {
    pub fn new(tx: mpsc::Sender<LinkCommand<T>>) -> Self {
        Self { tx }
    }

    /// Queue an event, waiting for buffer space.
    pub async fn send(&self, event: T) -> Result<(), LinkClosed> {
        self.tx
            .send(LinkCommand::Send(event))
            .await
            .map_err(|_| LinkClosed)
    }

    /// Queue an event without waiting. Fails when closed or full.
    pub fn try_send(&self, event: T) -> Result<(), LinkClosed> {
        self.tx
            .try_send(LinkCommand::Send(event))
            .map_err(|_| LinkClosed)
    }

    /// Queue an event, giving up after `limit` when the writer is not
    /// draining. A stalled link is reported the same as a closed one.
    pub async fn send_within(&self, event: T, limit: Duration) -> Result<(), LinkClosed> {
        self.tx
            .send_timeout(LinkCommand::Send(event), limit)
            .await
            .map_err(|_| LinkClosed)
    }

    /// Ask the writer to close the socket. Never waits: when the queue is
    /// full the request is dropped and the writer is left for teardown to
    /// abort. Closing twice is harmless.
    pub fn close(&self) {
        if self.tx.try_send(LinkCommand::Close).is_err() && !self.tx.is_closed() {
            debug!("Link queue full, close request not queued");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// One duplex connection owned by a call.
#[derive(Debug)]
pub struct Link<T> {
    incoming: mpsc::Receiver<String>,
    outgoing: LinkSender<T>,
    tasks: Vec<JoinHandle<()>>,
}

impl<T> Link<T> {
    /// Assemble a link from its channels and the I/O tasks serving them.
    pub fn new(
        incoming: mpsc::Receiver<String>,
        outgoing: LinkSender<T>,
        tasks: Vec<JoinHandle<()>>,
    ) -> Self {
        Self {
            incoming,
            outgoing,
            tasks,
        }
    }

    /// An in-process link and the peer that scripts it.
    pub fn pair() -> (Self, LinkPeer<T>) {
        let (inbound_tx, inbound_rx) = mpsc::channel(LINK_CHANNEL_CAPACITY);
        let (outbound_tx, outbound_rx) = mpsc::channel(LINK_CHANNEL_CAPACITY);
        (
            Self::new(inbound_rx, LinkSender::new(outbound_tx), Vec::new()),
            LinkPeer {
                inbound: inbound_tx,
                outbound: outbound_rx,
            },
        )
    }

    pub fn sender(&self) -> LinkSender<T> {
        self.outgoing.clone()
    }

    pub(crate) fn into_parts(self) -> (mpsc::Receiver<String>, LinkSender<T>, Vec<JoinHandle<()>>) {
        (self.incoming, self.outgoing, self.tasks)
    }
}

/// Remote end of an in-process [`Link`].
#[derive(Debug)]
pub struct LinkPeer<T> {
    /// Frames delivered to the relay
    pub inbound: mpsc::Sender<String>,
    /// Commands the relay queued for the socket
    pub outbound: mpsc::Receiver<LinkCommand<T>>,
}

impl<T> LinkPeer<T> {
    /// Deliver a frame to the relay. Returns false once the relay stopped reading.
    pub async fn push(&self, frame: impl Into<String>) -> bool {
        self.inbound.send(frame.into()).await.is_ok()
    }

    /// Everything the relay has queued so far.
    pub fn drain(&mut self) -> Vec<LinkCommand<T>> {
        let mut commands = Vec::new();
        while let Ok(command) = self.outbound.try_recv() {
            commands.push(command);
        }
        commands
    }
}

/// Spawn the task that serializes queued events onto a socket sink.
///
/// The task ends after a close command, when the sink errors, or when every
/// [`LinkSender`] is dropped.
pub fn spawn_json_writer<S, M, T, F>(
    mut sink: S,
    mut commands: mpsc::Receiver<LinkCommand<T>>,
    to_message: F,
    label: &'static str,
) -> JoinHandle<()>
where
    S: Sink<M> + Unpin + Send + 'static,
    S::Error: Display,
    M: Send + 'static,
    T: Serialize + Send + 'static,
    F: Fn(String) -> M + Send + 'static,
{
    tokio::spawn(async move {
        while let Some(command) = commands.recv().await {
            match command {
                LinkCommand::Send(event) => {
                    let json = match serde_json::to_string(&event) {
                        Ok(json) => json,
                        Err(e) => {
                            error!(link = label, "Failed to serialize outgoing event: {}", e);
                            continue;
                        }
                    };

                    if let Err(e) = sink.send(to_message(json)).await {
                        debug!(link = label, "Failed to send WebSocket message: {}", e);
                        break;
                    }
                }
                LinkCommand::Close => {
                    debug!(link = label, "Closing WebSocket");
                    if let Err(e) = sink.close().await {
                        debug!(link = label, "WebSocket close failed: {}", e);
                    }
                    break;
                }
            }
        }
    })
}
