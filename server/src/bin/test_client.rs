use clap::Parser;
use rand::Rng;
use shared::message::{Disconnect, Heartbeat, Message, MovePlayer, UpdateName};
use shared::{
    Animation, ClientId, Connection, ConnectionEvent, Direction, DEFAULT_PORT, IDLE_TIMEOUT,
};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::{interval, sleep};

/// Headless client that joins a server, wanders around and prints traffic
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short, long, default_value_t = format!("127.0.0.1:{}", DEFAULT_PORT))]
    server: String,

    /// Name to announce after joining
    #[arg(short, long, default_value = "wanderer")]
    name: String,

    /// How long to stay connected
    #[arg(long, default_value = "10")]
    seconds: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let stream = TcpStream::connect(&args.server).await?;
    stream.set_nodelay(true)?;
    println!("Connected to {}", args.server);

    let (events_tx, mut events) = mpsc::unbounded_channel();
    // Local handle id is irrelevant until the server assigns one.
    let connection = Connection::spawn(-1, stream, IDLE_TIMEOUT, events_tx);

    let id = match events.recv().await {
        Some(ConnectionEvent::Message {
            message: Message::Initialize(init),
            ..
        }) => init.id,
        other => {
            println!("Expected Initialize but got: {:?}", other);
            return Ok(());
        }
    };
    println!("Assigned client ID: {}", id);

    // Wander from where the server put us, not from the origin.
    let Some((mut x, mut y)) = await_own_spawn(&mut events, id).await else {
        return Ok(());
    };
    println!("Spawned at ({}, {})", x, y);

    connection.send(&UpdateName {
        id,
        name: args.name.clone(),
    }
    .into());

    let mut rng = rand::thread_rng();
    let mut moves = interval(Duration::from_millis(50));
    let deadline = sleep(Duration::from_secs(args.seconds));
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = &mut deadline => break,

            _ = moves.tick() => {
                x += rng.gen_range(-2.0f32..=2.0);
                let report = MovePlayer {
                    id,
                    x,
                    y,
                    direction: if rng.gen_bool(0.5) { Direction::Left } else { Direction::Right },
                    animation: Animation::Running,
                    grounded: true,
                };
                connection.send(&report.into());
            }

            event = events.recv() => match event {
                Some(ConnectionEvent::Message { message, .. }) => {
                    if let Some(reset) = own_reset(&message, id) {
                        // The server moved us, follow it.
                        x = reset.x;
                        y = reset.y;
                    }
                    if matches!(message, Message::Heartbeat(_)) {
                        connection.send(&Heartbeat.into());
                    } else if !matches!(message, Message::MovePlayer(_)) {
                        println!("Received: {:?}", message);
                    }
                }
                Some(ConnectionEvent::Disconnected { reason, .. }) => {
                    println!("Disconnected by server ({:?})", reason);
                    return Ok(());
                }
                None => return Ok(()),
            },
        }
    }

    println!("Sending disconnect request");
    connection.send(&Disconnect.into());
    // Give the writer a moment to flush before closing.
    sleep(Duration::from_millis(100)).await;
    connection.close();

    println!("Test client finished");
    Ok(())
}

/// Wait for the server to spawn `id`, printing anything else that arrives.
async fn await_own_spawn(
    events: &mut mpsc::UnboundedReceiver<ConnectionEvent>,
    id: ClientId,
) -> Option<(f32, f32)> {
    loop {
        match events.recv().await? {
            ConnectionEvent::Message {
                message: Message::SpawnPlayer(spawn),
                ..
            } if spawn.id == id => return Some((spawn.x, spawn.y)),
            ConnectionEvent::Message { message, .. } => println!("Received: {:?}", message),
            ConnectionEvent::Disconnected { reason, .. } => {
                println!("Disconnected by server ({:?})", reason);
                return None;
            }
        }
    }
}

fn own_reset(message: &Message, id: ClientId) -> Option<&MovePlayer> {
    match message {
        Message::MovePlayer(update) if update.id == id => Some(update),
        _ => None,
    }
}
