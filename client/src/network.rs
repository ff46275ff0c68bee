//! Server link for the render loop
//!
//! The render loop is not async, so the connection runs on a small tokio
//! runtime owned by [`NetworkClient`] and the loop polls for events.

use crate::error::ClientError;
use log::{info, warn};
use shared::message::{Disconnect, Message};
use shared::{Connection, ConnectionEvent, DisconnectReason, IDLE_TIMEOUT};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::runtime::Runtime;
use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver};

/// Handle id used locally before the server assigns one
const LOCAL_HANDLE_ID: i32 = -1;
const SHUTDOWN_GRACE: Duration = Duration::from_millis(200);

pub struct NetworkClient {
    runtime: Runtime,
    connection: Connection,
    events: UnboundedReceiver<ConnectionEvent>,
    disconnected: Option<DisconnectReason>,
}

impl NetworkClient {
    pub fn connect(address: &str) -> Result<Self, ClientError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()?;

        let (events_tx, events) = mpsc::unbounded_channel();
        let connection = runtime.block_on(async {
            let stream = TcpStream::connect(address).await?;
            stream.set_nodelay(true)?;
            Ok::<_, std::io::Error>(Connection::spawn(
                LOCAL_HANDLE_ID,
                stream,
                IDLE_TIMEOUT,
                events_tx,
            ))
        })?;
        info!("Connected to {}", address);

        Ok(Self {
            runtime,
            connection,
            events,
            disconnected: None,
        })
    }

    /// Messages received since the last poll, in arrival order
    pub fn poll(&mut self) -> Vec<Message> {
        let mut messages = Vec::new();
        loop {
            match self.events.try_recv() {
                Ok(ConnectionEvent::Message { message, .. }) => messages.push(message),
                Ok(ConnectionEvent::Disconnected { reason, .. }) => {
                    warn!("Lost connection to server ({:?})", reason);
                    self.disconnected = Some(reason);
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.disconnected.get_or_insert(DisconnectReason::Requested);
                    break;
                }
            }
        }
        messages
    }

    pub fn send(&self, message: &Message) -> bool {
        self.connection.send(message)
    }

    pub fn is_connected(&self) -> bool {
        self.disconnected.is_none() && self.connection.is_open()
    }

    pub fn disconnect_reason(&self) -> Option<DisconnectReason> {
        self.disconnected
    }

    /// Say goodbye, close the link and stop the runtime
    pub fn shutdown(mut self) {
        if self.connection.send(&Disconnect.into()) {
            self.connection.close();
            let events = &mut self.events;
            let closed = self.runtime.block_on(async {
                tokio::time::timeout(SHUTDOWN_GRACE, async {
                    while let Some(event) = events.recv().await {
                        if matches!(event, ConnectionEvent::Disconnected { .. }) {
                            break;
                        }
                    }
                })
                .await
            });
            if closed.is_err() {
                warn!("Connection did not close within {:?}", SHUTDOWN_GRACE);
            }
        }
        self.runtime.shutdown_timeout(SHUTDOWN_GRACE);
    }
}
