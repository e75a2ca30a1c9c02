//! Chat gateway: one supervised task per socket
//!
//! Lifecycle of a connection:
//!
//! ```text
//! Connecting -> Open -> Closing -> Closed
//! ```
//!
//! Authentication happens before the gateway sees the socket (the HTTP
//! layer rejects bad credentials before upgrading), so a connection enters
//! here already bound to its principal. While `Open`, frames are handled
//! strictly one at a time: parse, persist, then fan out. A frame that cannot
//! be stored is dropped and the sender gets an error notice; the connection
//! stays open.

use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use futures::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use super::broadcast::Broadcaster;
use super::registry::{ConnectionHandle, ConnectionRegistry};
use super::{Frame, InboundMessage};
use crate::config::ChatConfig;
use crate::db::repositories::MessageRepository;
use crate::db::StoreError;
use crate::models::NewMessage;

/// Failure classes reported in connection logs
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("persisting message failed: {0}")]
    Persistence(#[from] StoreError),

    #[error("delivery to connection {handle} failed: {reason}")]
    Delivery {
        handle: ConnectionHandle,
        reason: &'static str,
    },

    #[error("transport read failed: {0}")]
    TransportRead(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closing,
    Closed,
}

/// Runtime settings for the gateway
#[derive(Debug, Clone)]
pub struct GatewaySettings {
    /// Whether sockets must present a valid token
    pub require_auth: bool,
    /// Whether the sender receives its own frames
    pub echo_to_sender: bool,
    /// Capacity of each connection's outbound queue
    pub outbound_buffer: usize,
    /// Close connections that send nothing for this long
    pub idle_timeout: Option<Duration>,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self::from(&ChatConfig::default())
    }
}

impl From<&ChatConfig> for GatewaySettings {
    fn from(config: &ChatConfig) -> Self {
        Self {
            require_auth: config.require_auth,
            echo_to_sender: config.echo_to_sender,
            outbound_buffer: config.outbound_buffer.max(1),
            idle_timeout: (config.idle_timeout_secs > 0)
                .then(|| Duration::from_secs(config.idle_timeout_secs)),
        }
    }
}

pub struct ChatGateway {
    registry: Arc<ConnectionRegistry>,
    broadcaster: Broadcaster,
    messages: Arc<dyn MessageRepository>,
    settings: GatewaySettings,
    shutdown: CancellationToken,
    tracker: TaskTracker,
}

enum ReadOutcome {
    Frame(Frame),
    Ended,
    Failed(String),
    Idle,
    Signalled,
}

impl ChatGateway {
    pub fn new(messages: Arc<dyn MessageRepository>, settings: GatewaySettings) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        Self {
            broadcaster: Broadcaster::new(registry.clone(), settings.echo_to_sender),
            registry,
            messages,
            settings,
            shutdown: CancellationToken::new(),
            tracker: TaskTracker::new(),
        }
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    pub fn settings(&self) -> &GatewaySettings {
        &self.settings
    }

    pub fn connection_count(&self) -> usize {
        self.registry.len()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Run an accepted chat connection to completion on the gateway's task
    /// tracker. A panic inside the connection is logged and contained.
    pub async fn run_connection<R, W, E>(self: Arc<Self>, principal: Option<i64>, reader: R, writer: W)
    where
        R: Stream<Item = Result<Frame, E>> + Unpin + Send + 'static,
        W: Sink<Frame> + Unpin + Send + 'static,
        W::Error: Display,
        E: Display + Send + 'static,
    {
        if self.is_shutting_down() {
            tracing::debug!(principal = ?principal, "Refusing connection during shutdown");
            return;
        }

        let gateway = self.clone();
        let task = self
            .tracker
            .spawn(async move { gateway.serve_connection(principal, reader, writer).await });

        if let Err(err) = task.await {
            if err.is_panic() {
                tracing::error!(principal = ?principal, "Connection task panicked");
            }
        }
    }

    /// Run an echo connection: each frame goes back to its sender only.
    pub async fn run_echo<R, W, E>(self: Arc<Self>, reader: R, writer: W)
    where
        R: Stream<Item = Result<Frame, E>> + Unpin + Send + 'static,
        W: Sink<Frame> + Unpin + Send + 'static,
        W::Error: Display,
        E: Display + Send + 'static,
    {
        if self.is_shutting_down() {
            return;
        }

        let close = self.shutdown.child_token();
        let task = self.tracker.spawn(serve_echo(reader, writer, close));
        if let Err(err) = task.await {
            if err.is_panic() {
                tracing::error!("Echo task panicked");
            }
        }
    }

    /// Serve one chat connection until it closes.
    pub async fn serve_connection<R, W, E>(&self, principal: Option<i64>, mut reader: R, writer: W)
    where
        R: Stream<Item = Result<Frame, E>> + Unpin + Send,
        W: Sink<Frame> + Unpin + Send + 'static,
        W::Error: Display,
        E: Display,
    {
        let mut state = ConnectionState::Connecting;
        let (outbound, queue) = mpsc::channel(self.settings.outbound_buffer);
        let close = self.shutdown.child_token();
        let handle = self.registry.add(principal, outbound.clone(), close.clone());
        let _registration = Registration {
            registry: &self.registry,
            handle,
        };
        let writer_task = tokio::spawn(write_loop(queue, writer, close.clone(), handle));
        advance(handle, principal, &mut state, ConnectionState::Open);

        loop {
            let outcome = tokio::select! {
                _ = close.cancelled() => ReadOutcome::Signalled,
                outcome = read_next(&mut reader, self.settings.idle_timeout) => outcome,
            };

            match outcome {
                ReadOutcome::Frame(frame) => {
                    self.handle_frame(handle, principal, &outbound, frame).await
                }
                ReadOutcome::Ended => break,
                ReadOutcome::Failed(reason) => {
                    let error = GatewayError::TransportRead(reason);
                    tracing::warn!(handle, principal = ?principal, error = %error, "Closing connection");
                    break;
                }
                ReadOutcome::Idle => {
                    tracing::info!(handle, principal = ?principal, "Closing idle connection");
                    break;
                }
                ReadOutcome::Signalled => break,
            }
        }

        advance(handle, principal, &mut state, ConnectionState::Closing);
        self.registry.remove(handle);
        close.cancel();
        drop(outbound);
        if let Err(err) = writer_task.await {
            tracing::error!(handle, error = %err, "Writer task failed");
        }
        advance(handle, principal, &mut state, ConnectionState::Closed);
    }

    async fn handle_frame(
        &self,
        handle: ConnectionHandle,
        principal: Option<i64>,
        outbound: &mpsc::Sender<Frame>,
        frame: Frame,
    ) {
        let inbound = match InboundMessage::parse(&frame) {
            Ok(inbound) => inbound,
            Err(err) => {
                tracing::warn!(handle, error = %err, "Dropping unparsable frame");
                notify(outbound, "invalid message");
                return;
            }
        };

        let sender_id = match (principal, inbound.sender_id) {
            (Some(principal), Some(claimed)) if claimed != principal => {
                tracing::warn!(handle, principal, claimed, "Dropping frame with foreign sender_id");
                notify(outbound, "sender_id does not match the authenticated user");
                return;
            }
            (Some(principal), _) => principal,
            (None, Some(claimed)) => claimed,
            (None, None) => {
                notify(outbound, "sender_id is required");
                return;
            }
        };

        let message = NewMessage::new(inbound.chat_id, sender_id, inbound.content);
        match self.messages.create(&message).await {
            Ok(stored) => {
                tracing::debug!(handle, message_id = stored.id, chat_id = stored.chat_id, "Message stored");
            }
            Err(err) => {
                let error = GatewayError::from(err);
                tracing::warn!(
                    handle,
                    chat_id = message.chat_id,
                    sender_id,
                    error = %error,
                    "Dropping frame"
                );
                notify(outbound, "message could not be stored");
                return;
            }
        }

        self.broadcaster.fanout(Some(handle), &frame);
    }

    /// Close every connection and wait for their tasks to finish.
    pub async fn shutdown(&self) {
        tracing::info!(connections = self.registry.len(), "Shutting down chat gateway");
        self.shutdown.cancel();
        self.tracker.close();
        self.tracker.wait().await;
    }
}

/// Removes the registry entry when the connection task ends, including by
/// panic.
struct Registration<'a> {
    registry: &'a ConnectionRegistry,
    handle: ConnectionHandle,
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        self.registry.remove(self.handle);
    }
}

fn advance(
    handle: ConnectionHandle,
    principal: Option<i64>,
    state: &mut ConnectionState,
    next: ConnectionState,
) {
    tracing::debug!(handle, principal = ?principal, from = ?*state, to = ?next, "Connection state");
    if next == ConnectionState::Open {
        tracing::info!(handle, principal = ?principal, "Connection open");
    } else if next == ConnectionState::Closed {
        tracing::info!(handle, principal = ?principal, "Connection closed");
    }
    *state = next;
}

fn notify(outbound: &mpsc::Sender<Frame>, message: &str) {
    // Best effort: a full queue means the client is not reading anyway
    let _ = outbound.try_send(Frame::error_notice(message));
}

async fn read_next<R, E>(reader: &mut R, idle_timeout: Option<Duration>) -> ReadOutcome
where
    R: Stream<Item = Result<Frame, E>> + Unpin,
    E: Display,
{
    let next = match idle_timeout {
        Some(window) => match tokio::time::timeout(window, reader.next()).await {
            Ok(next) => next,
            Err(_) => return ReadOutcome::Idle,
        },
        None => reader.next().await,
    };

    match next {
        Some(Ok(frame)) => ReadOutcome::Frame(frame),
        Some(Err(err)) => ReadOutcome::Failed(err.to_string()),
        None => ReadOutcome::Ended,
    }
}

async fn write_loop<W>(
    mut queue: mpsc::Receiver<Frame>,
    mut writer: W,
    close: CancellationToken,
    handle: ConnectionHandle,
) where
    W: Sink<Frame> + Unpin,
    W::Error: Display,
{
    loop {
        let frame = tokio::select! {
            biased;
            frame = queue.recv() => frame,
            _ = close.cancelled() => None,
        };
        let Some(frame) = frame else { break };

        if let Err(err) = writer.send(frame).await {
            tracing::debug!(handle, error = %err, "Write failed");
            close.cancel();
            break;
        }
    }

    let _ = writer.close().await;
}

async fn serve_echo<R, W, E>(mut reader: R, mut writer: W, close: CancellationToken)
where
    R: Stream<Item = Result<Frame, E>> + Unpin,
    W: Sink<Frame> + Unpin,
    W::Error: Display,
    E: Display,
{
    loop {
        let next = tokio::select! {
            _ = close.cancelled() => break,
            next = reader.next() => next,
        };

        match next {
            Some(Ok(frame)) => {
                if let Err(err) = writer.send(frame).await {
                    tracing::debug!(error = %err, "Echo write failed");
                    break;
                }
            }
            Some(Err(err)) => {
                tracing::debug!(error = %GatewayError::TransportRead(err.to_string()), "Echo closed");
                break;
            }
            None => break,
        }
    }

    let _ = writer.close().await;
}
