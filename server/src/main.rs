use clap::Parser;
use log::{error, info};
use server::config::Settings;
use server::game::GameLoop;
use server::network::Server;
use server::session::Session;
use server::world::World;
use shared::DEFAULT_PORT;
use std::path::PathBuf;
use tokio::sync::mpsc;

/// Command line arguments
#[derive(Parser, Debug)]
#[clap(author, version, about = "Authoritative tank arena server")]
struct Args {
    /// Address to bind to
    #[clap(short = 'H', long, default_value = "0.0.0.0")]
    host: String,
    /// Port to listen on
    #[clap(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,
    /// JSON settings file; built-in defaults when omitted
    #[clap(short, long)]
    settings: Option<PathBuf>,
    /// Overrides the settings' milliseconds per tick
    #[clap(long)]
    tick_ms: Option<u64>,
    /// Overrides the settings' random seed
    #[clap(long)]
    seed: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let mut settings = match &args.settings {
        Some(path) => {
            info!("Loading settings from {}", path.display());
            Settings::load(path)?
        }
        None => Settings::default(),
    };
    if let Some(tick_ms) = args.tick_ms {
        settings.ms_per_frame = tick_ms;
    }
    if args.seed.is_some() {
        settings.seed = args.seed;
    }
    settings.validate()?;

    let (server_tx, server_rx) = mpsc::unbounded_channel();
    let address = format!("{}:{}", args.host, args.port);
    let server = Server::bind(&address, server_tx).await?;

    let session = Session::new(World::new(&settings));
    let game = GameLoop::new(session, server_rx, settings.tick_duration());

    let server_handle = tokio::spawn(server.run());
    let game_handle = tokio::spawn(game.run());

    tokio::select! {
        result = server_handle => {
            if let Err(e) = result {
                error!("Network task panicked: {}", e);
            }
        }
        result = game_handle => {
            if let Err(e) = result {
                error!("Game loop task panicked: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
