//! The per-tick world update sent from the server to each player

use crate::model::EntityUpdate;
use serde::{Deserialize, Serialize};

/// Chunk coordinates in chunk units
pub type ChunkId = (i32, i32);

/// A square block of world cells, row-major
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: ChunkId,
    pub cells: Vec<u8>,
}

/// A single cell change in world cell coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CellUpdate {
    pub x: i32,
    pub y: i32,
    pub cell: u8,
}

/// Terrain changes a player needs since their previous update
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WorldDelta {
    pub unloaded: Vec<ChunkId>,
    pub loaded: Vec<Chunk>,
    pub cells: Vec<CellUpdate>,
}

impl WorldDelta {
    pub fn is_empty(&self) -> bool {
        self.unloaded.is_empty() && self.loaded.is_empty() && self.cells.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemStack {
    pub item: String,
    pub count: u32,
}

/// New contents of one inventory slot; `None` empties it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotChange {
    pub slot: u8,
    pub stack: Option<ItemStack>,
}

/// Server-authoritative correction to the local player's predicted position
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PositionFix {
    /// Collision pushback, applied as an offset
    Push { x: f32, y: f32 },
    /// Teleport to an absolute position
    SetPosition { x: f32, y: f32 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub id: u32,
    pub username: String,
}

/// Everything one player receives for one server tick.
///
/// Only `t` and `player` are always meaningful; every other part may be empty
/// and the receiver applies whatever is present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldUpdate {
    /// Server send time in milliseconds
    pub t: u64,
    pub player: EntityUpdate,
    pub others: Vec<EntityUpdate>,
    pub entities: Vec<EntityUpdate>,
    pub independent: Vec<EntityUpdate>,
    pub world: Option<WorldDelta>,
    pub fixes: Vec<PositionFix>,
    pub inventory: Vec<SlotChange>,
    pub recipes: Option<Vec<String>>,
    pub roster: Vec<RosterEntry>,
    pub darkness: f32,
    pub tps: f32,
}

impl WorldUpdate {
    /// An update carrying only the player's own state
    pub fn new(t: u64, player: EntityUpdate) -> Self {
        Self {
            t,
            player,
            others: Vec::new(),
            entities: Vec::new(),
            independent: Vec::new(),
            world: None,
            fixes: Vec::new(),
            inventory: Vec::new(),
            recipes: None,
            roster: Vec::new(),
            darkness: 0.0,
            tps: 0.0,
        }
    }
}
