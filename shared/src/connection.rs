//! One byte-stream endpoint: frame reassembly, idle timeout and a single,
//! idempotent disconnect.
//!
//! [`Connection::spawn`] splits a stream into a read task and a write task.
//! The read task feeds every decoded message to the owner's event channel in
//! stream order and is the only place a connection finishes, so exactly one
//! [`ConnectionEvent::Disconnected`] is emitted per connection whatever
//! triggered the close.

use crate::codec::{decode_frame, encode_frame};
use crate::framing::FrameAssembler;
use crate::message::Message;
use crate::{ClientId, MAX_QUEUED_FRAMES};
use bytes::Bytes;
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};

/// Longest a closing connection spends flushing queued frames.
const CLOSE_GRACE: Duration = Duration::from_secs(1);

/// Why a connection left the `Open` state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    /// The peer closed the stream.
    RemoteClosed,
    /// No bytes arrived within the idle window.
    Timeout,
    ReadError,
    WriteError,
    /// A length prefix was corrupt and the stream cannot be re-synchronized.
    ProtocolViolation,
    /// Closed locally through [`Connection::close`].
    Requested,
    /// The peer stopped reading and the outbound queue filled up.
    SlowConsumer,
}

/// Lifecycle of a connection. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Open,
    Closing(DisconnectReason),
    Closed(DisconnectReason),
}

impl ConnectionState {
    pub fn is_open(&self) -> bool {
        matches!(self, ConnectionState::Open)
    }
}

/// What a connection reports to its owner.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionEvent {
    Message { id: ClientId, message: Message },
    Disconnected { id: ClientId, reason: DisconnectReason },
}

#[derive(Debug)]
struct Lifecycle {
    state: watch::Sender<ConnectionState>,
}

impl Lifecycle {
    fn new() -> Self {
        let (state, _) = watch::channel(ConnectionState::Open);
        Self { state }
    }

    fn current(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// `Open -> Closing`. Returns true only for the call that made the move.
    fn begin_close(&self, reason: DisconnectReason) -> bool {
        self.state.send_if_modified(|state| match state {
            ConnectionState::Open => {
                *state = ConnectionState::Closing(reason);
                true
            }
            _ => false,
        })
    }

    /// `Closing -> Closed`. Returns the close reason only the first time.
    fn finish(&self) -> Option<DisconnectReason> {
        let mut finished = None;
        self.state.send_if_modified(|state| match *state {
            ConnectionState::Closing(reason) => {
                *state = ConnectionState::Closed(reason);
                finished = Some(reason);
                true
            }
            _ => false,
        });
        finished
    }

    /// Resolves once the connection has left `Open`.
    async fn closing(&self) {
        let mut rx = self.state.subscribe();
        loop {
            if !rx.borrow_and_update().is_open() {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    }
}

/// Cloneable handle to a running connection.
#[derive(Debug, Clone)]
pub struct Connection {
    id: ClientId,
    outbound: mpsc::Sender<Bytes>,
    lifecycle: Arc<Lifecycle>,
}

impl Connection {
    /// Start the read and write tasks for `stream` on the current runtime.
    pub fn spawn<S>(
        id: ClientId,
        stream: S,
        idle_timeout: Duration,
        events: mpsc::UnboundedSender<ConnectionEvent>,
    ) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (reader, writer) = tokio::io::split(stream);
        let (outbound, outbound_rx) = mpsc::channel(MAX_QUEUED_FRAMES);
        let lifecycle = Arc::new(Lifecycle::new());

        tokio::spawn(write_loop(id, writer, outbound_rx, Arc::clone(&lifecycle)));

        let reader_lifecycle = Arc::clone(&lifecycle);
        tokio::spawn(async move {
            let reason = read_loop(id, reader, &reader_lifecycle, idle_timeout, &events).await;
            reader_lifecycle.begin_close(reason);
            if let Some(reason) = reader_lifecycle.finish() {
                info!("Connection {} closed ({:?})", id, reason);
                let _ = events.send(ConnectionEvent::Disconnected { id, reason });
            }
        });

        Self {
            id,
            outbound,
            lifecycle,
        }
    }

    pub fn id(&self) -> ClientId {
        self.id
    }

    pub fn state(&self) -> ConnectionState {
        self.lifecycle.current()
    }

    pub fn is_open(&self) -> bool {
        self.state().is_open()
    }

    /// Queue `message` for writing. Dropped (returns false) once closing.
    pub fn send(&self, message: &Message) -> bool {
        self.send_frame(encode_frame(message))
    }

    /// Queue an already encoded frame, so broadcasts encode once.
    ///
    /// Never waits. A peer that lets [`MAX_QUEUED_FRAMES`] pile up is closed
    /// as a [`DisconnectReason::SlowConsumer`].
    pub fn send_frame(&self, frame: Bytes) -> bool {
        if !self.is_open() {
            return false;
        }
        match self.outbound.try_send(frame) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                if self.lifecycle.begin_close(DisconnectReason::SlowConsumer) {
                    warn!("Connection {} is not reading, closing it", self.id);
                }
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }

    /// Ask the connection to close. Returns false if it was already closing.
    pub fn close(&self) -> bool {
        self.lifecycle.begin_close(DisconnectReason::Requested)
    }
}

async fn read_loop<R>(
    id: ClientId,
    mut reader: R,
    lifecycle: &Lifecycle,
    idle_timeout: Duration,
    events: &mpsc::UnboundedSender<ConnectionEvent>,
) -> DisconnectReason
where
    R: AsyncRead + Unpin,
{
    let mut assembler = FrameAssembler::new();

    loop {
        let read = tokio::select! {
            _ = lifecycle.closing() => return DisconnectReason::Requested,
            read = tokio::time::timeout(idle_timeout, reader.read_buf(assembler.buffer_mut())) => read,
        };

        match read {
            Err(_) => {
                debug!("Connection {} idle for {:?}", id, idle_timeout);
                return DisconnectReason::Timeout;
            }
            Ok(Ok(0)) => return DisconnectReason::RemoteClosed,
            Ok(Err(e)) => {
                debug!("Read error on connection {}: {}", id, e);
                return DisconnectReason::ReadError;
            }
            Ok(Ok(_)) => {}
        }

        loop {
            match assembler.next_frame() {
                Ok(Some(frame)) => match decode_frame(frame) {
                    Ok(message) => {
                        if events
                            .send(ConnectionEvent::Message { id, message })
                            .is_err()
                        {
                            // Owner is gone; nobody is listening any more.
                            return DisconnectReason::Requested;
                        }
                    }
                    Err(e) => warn!("Dropping frame from connection {}: {}", id, e),
                },
                Ok(None) => break,
                Err(e) => {
                    warn!("Connection {} sent a corrupt frame: {}", id, e);
                    return DisconnectReason::ProtocolViolation;
                }
            }
        }
    }
}

async fn write_loop<W>(
    id: ClientId,
    mut writer: W,
    mut outbound: mpsc::Receiver<Bytes>,
    lifecycle: Arc<Lifecycle>,
) where
    W: AsyncWrite + Unpin,
{
    let mut unsent = Bytes::new();

    loop {
        let mut frame = tokio::select! {
            biased;
            _ = lifecycle.closing() => break,
            frame = outbound.recv() => match frame {
                Some(frame) => frame,
                None => break,
            },
        };

        // A write stalled on a peer that stops reading gives way to a close.
        let interrupted = tokio::select! {
            written = writer.write_all_buf(&mut frame) => {
                if let Err(e) = written {
                    debug!("Write error on connection {}: {}", id, e);
                    lifecycle.begin_close(DisconnectReason::WriteError);
                    return;
                }
                false
            }
            _ = lifecycle.closing() => true,
        };
        if interrupted {
            unsent = frame;
            break;
        }
    }

    // Frames queued before the close still go out, within the grace period.
    let flushed = tokio::time::timeout(CLOSE_GRACE, async {
        writer.write_all_buf(&mut unsent).await?;
        while let Ok(mut frame) = outbound.try_recv() {
            writer.write_all_buf(&mut frame).await?;
        }
        writer.shutdown().await
    })
    .await;
    if !matches!(flushed, Ok(Ok(()))) {
        debug!("Connection {} dropped its backlog on close", id);
    }
}
