use clap::Parser;
use log::info;
use server::network::{Server, ServerConfig};
use shared::map::MapData;
use shared::{DEFAULT_PORT, IDLE_TIMEOUT, TICK_RATE};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// IP address to bind to
    #[arg(short = 'H', long, default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Simulation ticks per second
    #[arg(short, long, default_value_t = TICK_RATE)]
    tick_rate: u32,

    /// Tile map to load
    #[arg(short, long, default_value = "assets/map.json")]
    map: String,

    /// Seconds of silence before a client is dropped
    #[arg(long, default_value_t = IDLE_TIMEOUT.as_secs())]
    idle_timeout: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let map = MapData::load(&args.map)?;
    info!(
        "Loaded {} ({}x{} tiles, spawn at {:?})",
        args.map,
        map.width(),
        map.height(),
        map.spawn()
    );

    let config = ServerConfig {
        tick_rate: args.tick_rate.max(1),
        idle_timeout: Duration::from_secs(args.idle_timeout.max(1)),
    };

    let address = format!("{}:{}", args.host, args.port);
    let server = Server::bind(&address, map, config).await?;

    info!("Press Ctrl+C to stop");
    server.run().await?;

    Ok(())
}
