use clap::Parser;
use client::network::Client;
use client::rendering::LogRenderer;
use client::state::ClientConfig;
use log::info;
use shared::{RENDER_DELAY_MS, SERVER_RESYNC_THRESHOLD_MS};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:8080")]
    server: String,

    /// Name shown to other players
    #[arg(short = 'u', long, default_value = "player")]
    username: String,

    /// Simulate network latency in milliseconds
    #[arg(short = 'l', long, default_value = "0")]
    fake_ping: u64,

    /// How far behind the server the client renders, in milliseconds
    #[arg(long, default_value_t = RENDER_DELAY_MS)]
    render_delay: i64,

    /// Offset drift that triggers a clock resync, in milliseconds
    #[arg(long, default_value_t = SERVER_RESYNC_THRESHOLD_MS)]
    resync_threshold: i64,

    /// Walk in a circle instead of standing still
    #[arg(short = 'a', long)]
    autopilot: bool,

    /// Log a frame summary every N frames
    #[arg(long, default_value = "60")]
    log_every: u64,

    /// Exit after this many frames (0 runs forever)
    #[arg(long, default_value = "0")]
    frames: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    info!("Starting client...");
    info!("Connecting to: {}", args.server);
    if args.fake_ping > 0 {
        info!("Simulating {}ms latency", args.fake_ping);
    }
    info!(
        "Render delay {}ms, resync threshold {}ms",
        args.render_delay, args.resync_threshold
    );

    let config = ClientConfig {
        render_delay_ms: args.render_delay,
        resync_threshold_ms: args.resync_threshold,
    };
    let renderer = LogRenderer::new(args.log_every, (args.frames > 0).then_some(args.frames));

    let mut client = Client::new(
        &args.server,
        &args.username,
        config,
        args.fake_ping,
        args.autopilot,
        Box::new(renderer),
    )
    .await?;

    client.run().await?;

    Ok(())
}
