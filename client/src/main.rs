use clap::Parser;
use client::error::ClientError;
use client::game::ClientWorld;
use client::input::InputManager;
use client::network::NetworkClient;
use client::rendering::{HudConfig, Renderer};
use log::{error, info, warn};
use macroquad::prelude::*;
use shared::map::MapData;
use shared::{DEFAULT_NAME, DEFAULT_PORT, TICK_RATE};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value_t = format!("127.0.0.1:{}", DEFAULT_PORT))]
    server: String,

    /// Name shown to other players
    #[arg(short, long, default_value = DEFAULT_NAME)]
    name: String,

    /// Tile map, must match the server's
    #[arg(short, long, default_value = "assets/map.json")]
    map: String,

    /// Window width
    #[arg(short = 'w', long, default_value = "800")]
    width: usize,

    /// Window height (no short flag to avoid conflict with --help)
    #[arg(long, default_value = "600")]
    height: usize,
}

fn window_conf() -> Conf {
    Conf {
        window_title: "Tilesync".to_string(),
        window_width: 800,
        window_height: 600,
        ..Default::default()
    }
}

#[macroquad::main(window_conf)]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    if let Err(e) = run(args).await {
        error!("{}", e);
    }
}

async fn run(args: Args) -> Result<(), ClientError> {
    request_new_screen_size(args.width as f32, args.height as f32);

    let map = MapData::load(&args.map)?;
    info!("Connecting to: {}", args.server);
    let mut network = NetworkClient::connect(&args.server)?;

    let mut world = ClientWorld::new(map, &args.name, TICK_RATE);
    let mut input = InputManager::new();
    let mut renderer = Renderer::new(args.width, args.height);
    let mut show_scoreboard = false;

    info!("Controls: A/D to move, Space to jump, Tab for scores, Esc to quit");

    loop {
        for message in network.poll() {
            match world.handle_message(message) {
                Ok(replies) => {
                    for reply in replies {
                        network.send(&reply);
                    }
                }
                Err(e) => warn!("Ignoring server message: {}", e),
            }
        }

        let frame = input.update();
        if frame.quit {
            break;
        }
        if frame.toggle_scoreboard {
            show_scoreboard = !show_scoreboard;
        }

        for report in world.update(frame.movement, get_frame_time()) {
            network.send(&report);
        }

        renderer.render(
            &world,
            HudConfig {
                connected: network.is_connected(),
                show_scoreboard,
            },
        );
        next_frame().await;
    }

    info!("Leaving server");
    network.shutdown();
    Ok(())
}
