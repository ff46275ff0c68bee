//! Server network layer handling TCP connections and game loop coordination

use crate::client_manager::ClientManager;
use crate::game::GameState;
use log::{debug, error, info, warn};
use shared::map::MapData;
use shared::message::{Disconnect, Heartbeat, MovePlayer, UpdateName};
use shared::{
    ClientId, Connection, ConnectionEvent, Dispatcher, FixedTimestep, IDLE_TIMEOUT, TICK_RATE,
};
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::{interval, Instant, MissedTickBehavior};

/// Tunables for a server instance
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Simulation steps per second
    pub tick_rate: u32,
    /// Connections silent for this long are closed
    pub idle_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            tick_rate: TICK_RATE,
            idle_timeout: IDLE_TIMEOUT,
        }
    }
}

/// Everything message handlers are allowed to touch
pub struct ServerState {
    pub clients: ClientManager,
    pub game: GameState,
}

impl ServerState {
    pub fn new(map: MapData, tick_rate: u32) -> Self {
        Self {
            clients: ClientManager::new(),
            game: GameState::new(map, tick_rate),
        }
    }
}

/// Handlers for the messages a client may send
///
/// Movement only ever applies to the sender's own player; names are
/// truncated and echoed to everyone; heartbeats need no work because any
/// inbound bytes already reset the idle timer.
pub fn build_dispatcher() -> Dispatcher<ServerState> {
    Dispatcher::new()
        .register(|state: &mut ServerState, from, report: MovePlayer| {
            if !state.game.apply_move(from, &report) {
                debug!("Move from unknown player {}", from);
            }
        })
        .register(|state: &mut ServerState, from, update: UpdateName| {
            let messages = state.game.set_name(from, &update.name);
            state.clients.deliver(messages);
        })
        .register(|state: &mut ServerState, from, _: Disconnect| {
            debug!("Client {} asked to disconnect", from);
            state.clients.disconnect(from);
        })
        .register(|_: &mut ServerState, _, _: Heartbeat| {})
}

/// Main server coordinating networking and game simulation
///
/// One select loop owns the client table and the game state, so every
/// mutation (new streams, connection events, ticks) happens in sequence.
pub struct Server {
    local_addr: SocketAddr,
    accepted: mpsc::UnboundedReceiver<(TcpStream, SocketAddr)>,
    config: ServerConfig,
    state: ServerState,
    dispatcher: Dispatcher<ServerState>,
    events_tx: mpsc::UnboundedSender<ConnectionEvent>,
    events_rx: mpsc::UnboundedReceiver<ConnectionEvent>,
}

impl Server {
    pub async fn bind(addr: &str, map: MapData, config: ServerConfig) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        info!("Server listening on {}", local_addr);

        let (events_tx, events_rx) = mpsc::unbounded_channel();

        Ok(Server {
            local_addr,
            accepted: Self::spawn_acceptor(listener),
            state: ServerState::new(map, config.tick_rate),
            config,
            dispatcher: build_dispatcher(),
            events_tx,
            events_rx,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Spawns task that accepts streams and forwards them to the main loop
    fn spawn_acceptor(listener: TcpListener) -> mpsc::UnboundedReceiver<(TcpStream, SocketAddr)> {
        let (tx, rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, addr)) => {
                        if tx.send((stream, addr)).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        error!("Error accepting connection: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        });

        rx
    }

    fn handle_connect(&mut self, stream: TcpStream, addr: SocketAddr) {
        if let Err(e) = stream.set_nodelay(true) {
            warn!("Failed to set TCP_NODELAY for {}: {}", addr, e);
        }

        let id = self.state.clients.allocate_id();
        debug!("Accepted {} as client {}", addr, id);
        let connection =
            Connection::spawn(id, stream, self.config.idle_timeout, self.events_tx.clone());

        if self.state.clients.add_client(connection) {
            let messages = self.state.game.add_player(id);
            self.state.clients.deliver(messages);
        }
    }

    fn handle_disconnect(&mut self, id: ClientId) {
        // Leave the table first so the destroy broadcast skips the departed client.
        if self.state.clients.remove_client(id).is_some() {
            let messages = self.state.game.remove_player(id);
            self.state.clients.deliver(messages);
        }
    }

    fn handle_event(&mut self, event: ConnectionEvent) {
        match event {
            ConnectionEvent::Message { id, message } => {
                self.dispatcher.dispatch(&mut self.state, id, message);
            }
            ConnectionEvent::Disconnected { id, .. } => self.handle_disconnect(id),
        }
    }

    fn run_ticks(&mut self, steps: u32) {
        for _ in 0..steps {
            let messages = self.state.game.tick();
            self.state.clients.deliver(messages);
        }
    }

    /// Runs until Ctrl+C
    pub async fn run(self) -> io::Result<()> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Main server loop, returning once `shutdown` resolves
    pub async fn run_until(mut self, shutdown: impl Future<Output = ()>) -> io::Result<()> {
        let mut timestep = FixedTimestep::from_rate(self.config.tick_rate);
        let mut ticker = interval(timestep.period());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last_tick = Instant::now();

        tokio::pin!(shutdown);
        info!("Server started at {} Hz", self.config.tick_rate);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Server shutting down");
                    break;
                }

                Some((stream, addr)) = self.accepted.recv() => {
                    self.handle_connect(stream, addr);
                }

                Some(event) = self.events_rx.recv() => {
                    self.handle_event(event);
                }

                now = ticker.tick() => {
                    let steps = timestep.advance(now.duration_since(last_tick));
                    last_tick = now;
                    self.run_ticks(steps);

                    if self.state.game.tick_count() % (self.config.tick_rate.max(1) as u64 * 60) == 0
                        && !self.state.clients.is_empty()
                    {
                        debug!(
                            "Tick {}: {} clients",
                            self.state.game.tick_count(),
                            self.state.clients.len()
                        );
                    }
                }
            }
        }

        for id in self.state.clients.ids() {
            self.state.clients.disconnect(id);
        }
        Ok(())
    }
}
