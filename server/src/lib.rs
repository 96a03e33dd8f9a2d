//! # Tick Server
//!
//! Authoritative server that advances the world at a fixed rate and sends
//! every connected player one world update per tick.
//!
//! ## Tick Loop
//!
//! Each tick advances the simulation by the measured time since the previous
//! tick, then builds a personalised update for every player: their own state,
//! nearby players and entities, terrain changes since their last update,
//! inventory changes, recipes, the roster, darkness and measured tps.
//!
//! Ticks are scheduled at fixed intervals. A tick that overruns its budget is
//! logged and the next one runs immediately; missed ticks are dropped rather
//! than replayed.
//!
//! ## Concurrency
//!
//! The `Game` is owned by a single task. Packet handlers and ticks are
//! interleaved on that task, so no tick ever observes a half-applied input.
//! Socket IO and client timeouts run on helper tasks that communicate over
//! channels. Outgoing updates may be delayed to simulate latency without
//! holding up the next tick.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ServerConfig;
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut server = Server::new(ServerConfig::default()).await?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod client_manager;
pub mod config;
pub mod game;
pub mod inventory;
pub mod network;
pub mod scheduler;
pub mod tick;
pub mod world;
