//! # Interpolating Game Client
//!
//! Client side of the tick-stream protocol. The server sends one world update
//! per tick; this crate turns those discrete, jittery arrivals into a smooth,
//! continuously moving picture.
//!
//! ## Pipeline
//!
//! 1. The network loop decodes a `WorldUpdate` and hands it to the
//!    [`state::StateManager`].
//! 2. The state manager applies terrain, position fixes and inventory changes
//!    to its collaborators, records a snapshot per tracked object, and feeds
//!    the send time to [`clock::ClockSync`].
//! 3. On every frame the renderer asks for [`state::StateManager::current_state`],
//!    which looks up the render time in each object's history and blends the
//!    two surrounding snapshots through [`interpolation`].
//!
//! ## Render time
//!
//! The client deliberately draws the world a little in the past. The offset
//! between local time and server time is anchored on the first update and only
//! corrected when a window of samples shows it has drifted past a threshold,
//! so small jitter never causes visible drift.
//!
//! ## Tracked objects
//!
//! The local player, every remote player and every independently timed object
//! keeps its own [`history::HistoryBuffer`]. Remote players and independent
//! objects that stop being mentioned are dropped at the end of the ingest that
//! omitted them. Plain entities share a single timeline keyed by update time.
//!
//! ## Usage Example
//!
//! ```rust
//! use client::collaborators::Hooks;
//! use client::state::{ClientConfig, StateManager};
//! use shared::{EntityUpdate, WorldUpdate};
//!
//! let mut state = StateManager::new(ClientConfig::default());
//! assert!(state.current_state().is_none());
//!
//! let update = WorldUpdate::new(shared::now_millis(), EntityUpdate::new(1).with_dynamic("x", 4.0));
//! state.ingest(&update, Hooks::default());
//!
//! let view = state.current_state().expect("one update is enough to render");
//! assert_eq!(view.player.number("x"), Some(4.0));
//! ```

pub mod clock;
pub mod collaborators;
pub mod history;
pub mod input;
pub mod interpolation;
pub mod network;
pub mod rendering;
pub mod state;
pub mod tracked;
