use clap::Parser;
use log::info;
use server::config::ServerConfig;
use server::network::Server;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Server port to listen on
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Tick rate (updates per second)
    #[arg(short, long, default_value_t = shared::TICK_RATE)]
    tick_rate: u32,

    /// Maximum number of concurrent clients
    #[arg(short, long, default_value = "32")]
    max_clients: usize,

    /// Delay every outgoing world update by this many milliseconds
    #[arg(short = 'l', long, default_value = "0")]
    simulated_latency: u64,

    /// Chunks streamed around each player
    #[arg(long, default_value = "1")]
    view_distance: i32,

    /// Objects closer than this are sent to a player
    #[arg(long, default_value = "600")]
    nearby_radius: f32,

    /// Number of wandering entities
    #[arg(long, default_value = "12")]
    wanderers: usize,

    /// Number of independently timed drifting objects
    #[arg(long, default_value = "4")]
    drifters: usize,

    /// Number of collectible pickups
    #[arg(long, default_value = "10")]
    pickups: usize,

    /// Seed for spawn positions and wandering
    #[arg(long, default_value = "7")]
    seed: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    let config = ServerConfig {
        bind_addr: format!("{}:{}", args.host, args.port),
        tick_rate: args.tick_rate,
        max_clients: args.max_clients,
        simulated_latency: Duration::from_millis(args.simulated_latency),
        view_distance: args.view_distance,
        nearby_radius: args.nearby_radius,
        wanderers: args.wanderers,
        drifters: args.drifters,
        pickups: args.pickups,
        seed: args.seed,
        ..ServerConfig::default()
    };

    info!("Starting server on {}", config.bind_addr);
    info!(
        "Tick rate: {} Hz ({:?} per tick)",
        config.tick_rate,
        config.tick_interval()
    );
    if !config.simulated_latency.is_zero() {
        info!("Simulating {:?} latency", config.simulated_latency);
    }

    let mut server = Server::new(config).await?;
    let shutdown = server.shutdown_handle();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, shutting down");
            shutdown.shutdown();
        }
    });

    server.run().await?;

    Ok(())
}
