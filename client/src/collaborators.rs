//! Client-side models that server updates are applied to
//!
//! The state manager only talks to these through the traits below, so a game
//! can plug in its own terrain store, predictor or inventory UI.

use log::debug;
use shared::{CellUpdate, Chunk, ChunkId, ItemStack, SlotChange, Vec2, CHUNK_SIZE, WORLD_SIZE};
use std::collections::{BTreeMap, HashMap};

pub trait WorldModel {
    fn apply_chunk_unload(&mut self, ids: &[ChunkId]);
    fn apply_chunk_load(&mut self, chunks: &[Chunk]);
    fn apply_cell_updates(&mut self, updates: &[CellUpdate]);
}

pub trait LocalPredictor {
    fn apply_server_correction(&mut self, push_x: f32, push_y: f32);
    fn apply_set_position(&mut self, position: Vec2);
}

pub trait InventoryModel {
    fn apply_slot_changes(&mut self, changes: &[SlotChange]);
    fn set_available_recipes(&mut self, recipes: &[String]);
}

/// Collaborators for one ingest call; absent ones are skipped
#[derive(Default)]
pub struct Hooks<'a> {
    pub world: Option<&'a mut dyn WorldModel>,
    pub predictor: Option<&'a mut dyn LocalPredictor>,
    pub inventory: Option<&'a mut dyn InventoryModel>,
}

/// Loaded terrain keyed by chunk
#[derive(Debug, Default)]
pub struct ChunkCache {
    chunks: HashMap<ChunkId, Chunk>,
}

impl ChunkCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn is_loaded(&self, id: ChunkId) -> bool {
        self.chunks.contains_key(&id)
    }

    /// Cell at world cell coordinates, if its chunk is loaded
    pub fn cell(&self, x: i32, y: i32) -> Option<u8> {
        let (id, index) = locate(x, y);
        self.chunks.get(&id)?.cells.get(index).copied()
    }
}

fn locate(x: i32, y: i32) -> (ChunkId, usize) {
    let id = (x.div_euclid(CHUNK_SIZE), y.div_euclid(CHUNK_SIZE));
    let local_x = x.rem_euclid(CHUNK_SIZE);
    let local_y = y.rem_euclid(CHUNK_SIZE);
    (id, (local_y * CHUNK_SIZE + local_x) as usize)
}

impl WorldModel for ChunkCache {
    fn apply_chunk_unload(&mut self, ids: &[ChunkId]) {
        for id in ids {
            self.chunks.remove(id);
        }
    }

    fn apply_chunk_load(&mut self, chunks: &[Chunk]) {
        for chunk in chunks {
            self.chunks.insert(chunk.id, chunk.clone());
        }
    }

    fn apply_cell_updates(&mut self, updates: &[CellUpdate]) {
        for update in updates {
            let (id, index) = locate(update.x, update.y);
            match self.chunks.get_mut(&id).and_then(|c| c.cells.get_mut(index)) {
                Some(cell) => *cell = update.cell,
                None => debug!("Dropping cell update for unloaded chunk {:?}", id),
            }
        }
    }
}

/// Locally predicted position of the player, nudged by server corrections
#[derive(Debug, Clone, Default)]
pub struct PredictedPosition {
    pub position: Vec2,
    pub corrections: u32,
}

impl PredictedPosition {
    pub fn new(position: Vec2) -> Self {
        Self {
            position,
            corrections: 0,
        }
    }

    /// Moves along `intent` for `dt` seconds at `speed`, clamped to the world
    pub fn step(&mut self, intent: Vec2, speed: f32, dt: f32) {
        let moved = self.position.add(intent.normalize().scale(speed * dt));
        self.position = Vec2::new(moved.x.clamp(0.0, WORLD_SIZE), moved.y.clamp(0.0, WORLD_SIZE));
    }
}

impl LocalPredictor for PredictedPosition {
    fn apply_server_correction(&mut self, push_x: f32, push_y: f32) {
        self.position = self.position.add(Vec2::new(push_x, push_y));
        self.corrections += 1;
    }

    fn apply_set_position(&mut self, position: Vec2) {
        self.position = position;
        self.corrections += 1;
    }
}

#[derive(Debug, Clone, Default)]
pub struct Inventory {
    slots: BTreeMap<u8, ItemStack>,
    recipes: Vec<String>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slot(&self, slot: u8) -> Option<&ItemStack> {
        self.slots.get(&slot)
    }

    pub fn recipes(&self) -> &[String] {
        &self.recipes
    }

    pub fn item_count(&self, item: &str) -> u32 {
        self.slots
            .values()
            .filter(|stack| stack.item == item)
            .map(|stack| stack.count)
            .sum()
    }
}

impl InventoryModel for Inventory {
    fn apply_slot_changes(&mut self, changes: &[SlotChange]) {
        for change in changes {
            match &change.stack {
                Some(stack) => {
                    self.slots.insert(change.slot, stack.clone());
                }
                None => {
                    self.slots.remove(&change.slot);
                }
            }
        }
    }

    fn set_available_recipes(&mut self, recipes: &[String]) {
        self.recipes = recipes.to_vec();
    }
}
