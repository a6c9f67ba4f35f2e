use clap::Parser;
use client::game::WorldEvent;
use client::input::Autopilot;
use client::network::Client;
use log::{info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;

#[derive(Parser, Debug)]
#[command(author, version, about = "Headless tank arena client driving a scripted tank", long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:11000")]
    server: String,

    /// Player name, at most 16 characters
    #[arg(short = 'n', long, default_value = "bot")]
    name: String,

    /// Frames to play before leaving; 0 plays until the server hangs up
    #[arg(short = 't', long, default_value = "0")]
    ticks: u64,

    /// Seed for the bot's decisions
    #[arg(long)]
    seed: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    info!("Connecting to {} as {:?}", args.server, args.name);
    let mut client = Client::connect(&args.server, &args.name).await?;

    let rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let mut bot = Autopilot::new(rng);
    let player_id = client.player_id();

    loop {
        tokio::select! {
            result = client.receive() => {
                let events = match result {
                    Ok(events) => events,
                    Err(e) => {
                        warn!("Connection ended: {}", e);
                        break;
                    }
                };
                for event in events {
                    match event {
                        WorldEvent::TankDied(id) if id == player_id => info!("We were destroyed"),
                        WorldEvent::TankJoined(id) if id != player_id => info!("Tank {} joined", id),
                        WorldEvent::TankLeft(id) => info!("Tank {} left", id),
                        _ => {}
                    }
                }

                let command = bot.next_command(client.world());
                client.send_command(&command).await?;

                if args.ticks > 0 && client.world().frames >= args.ticks {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, leaving");
                break;
            }
        }
    }

    if let Some(tank) = client.world().own_tank() {
        info!("Final score: {}", tank.score);
    }
    client.shutdown().await?;
    Ok(())
}
