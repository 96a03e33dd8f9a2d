//! Server-side world model: terrain chunks, per-player streaming and
//! visibility

use log::debug;
use shared::{
    CellUpdate, Chunk, ChunkId, Vec2, WorldDelta, CELL_SIZE, CHUNK_SIZE, WORLD_CHUNKS,
};
use std::collections::{BTreeSet, HashMap};

pub const EMPTY: u8 = 0;
pub const WALL: u8 = 1;

/// Terrain a single player currently has loaded
#[derive(Debug, Clone, Default)]
pub struct PlayerView {
    pub loaded: BTreeSet<ChunkId>,
}

/// What the tick loop needs from the world for each player
pub trait WorldModel {
    /// Whether `target` should be included in the update of a player at `viewer`
    fn is_nearby(&self, viewer: Vec2, target: Vec2) -> bool;

    /// Terrain changes for a player at `position` since their last delta
    fn compute_delta_for_player(&mut self, view: &mut PlayerView, position: Vec2)
        -> Option<WorldDelta>;

    /// Flips a cell between empty and wall; `None` outside the world
    fn toggle_cell(&mut self, x: i32, y: i32) -> Option<CellUpdate>;

    /// Called once all players have received this tick's deltas
    fn end_tick(&mut self);
}

pub struct ChunkWorld {
    chunks: HashMap<ChunkId, Chunk>,
    view_distance: i32,
    nearby_radius: f32,
    pending: Vec<CellUpdate>,
}

impl ChunkWorld {
    /// A walled arena of `WORLD_CHUNKS` x `WORLD_CHUNKS` chunks
    pub fn new(view_distance: i32, nearby_radius: f32) -> Self {
        let edge = CHUNK_SIZE * WORLD_CHUNKS - 1;
        let mut chunks = HashMap::new();
        for cx in 0..WORLD_CHUNKS {
            for cy in 0..WORLD_CHUNKS {
                let mut cells = vec![EMPTY; (CHUNK_SIZE * CHUNK_SIZE) as usize];
                for ly in 0..CHUNK_SIZE {
                    for lx in 0..CHUNK_SIZE {
                        let (x, y) = (cx * CHUNK_SIZE + lx, cy * CHUNK_SIZE + ly);
                        if x == 0 || y == 0 || x == edge || y == edge {
                            cells[(ly * CHUNK_SIZE + lx) as usize] = WALL;
                        }
                    }
                }
                chunks.insert((cx, cy), Chunk { id: (cx, cy), cells });
            }
        }

        Self {
            chunks,
            view_distance,
            nearby_radius,
            pending: Vec::new(),
        }
    }

    pub fn cell(&self, x: i32, y: i32) -> Option<u8> {
        let (id, index) = locate(x, y);
        self.chunks.get(&id)?.cells.get(index).copied()
    }

    pub fn pending_changes(&self) -> &[CellUpdate] {
        &self.pending
    }

    fn chunks_around(&self, position: Vec2) -> BTreeSet<ChunkId> {
        let (cx, cy) = chunk_of(position);
        let mut wanted = BTreeSet::new();
        for dx in -self.view_distance..=self.view_distance {
            for dy in -self.view_distance..=self.view_distance {
                let id = (cx + dx, cy + dy);
                if self.chunks.contains_key(&id) {
                    wanted.insert(id);
                }
            }
        }
        wanted
    }
}

impl WorldModel for ChunkWorld {
    fn is_nearby(&self, viewer: Vec2, target: Vec2) -> bool {
        viewer.distance(target) <= self.nearby_radius
    }

    fn compute_delta_for_player(
        &mut self,
        view: &mut PlayerView,
        position: Vec2,
    ) -> Option<WorldDelta> {
        let wanted = self.chunks_around(position);

        let unloaded: Vec<ChunkId> = view.loaded.difference(&wanted).copied().collect();
        let loaded: Vec<Chunk> = wanted
            .difference(&view.loaded)
            .filter_map(|id| self.chunks.get(id).cloned())
            .collect();
        // Freshly loaded chunks already contain this tick's changes
        let cells: Vec<CellUpdate> = self
            .pending
            .iter()
            .filter(|update| {
                let id = locate(update.x, update.y).0;
                view.loaded.contains(&id) && wanted.contains(&id)
            })
            .copied()
            .collect();

        view.loaded = wanted;

        let delta = WorldDelta {
            unloaded,
            loaded,
            cells,
        };
        if delta.is_empty() {
            None
        } else {
            debug!(
                "World delta: -{} chunks, +{} chunks, {} cells",
                delta.unloaded.len(),
                delta.loaded.len(),
                delta.cells.len()
            );
            Some(delta)
        }
    }

    fn toggle_cell(&mut self, x: i32, y: i32) -> Option<CellUpdate> {
        let (id, index) = locate(x, y);
        let cell = self.chunks.get_mut(&id)?.cells.get_mut(index)?;
        *cell = if *cell == EMPTY { WALL } else { EMPTY };
        let update = CellUpdate { x, y, cell: *cell };
        self.pending.push(update);
        Some(update)
    }

    fn end_tick(&mut self) {
        self.pending.clear();
    }
}

/// Cell coordinates containing a world position
pub fn cell_of(position: Vec2) -> (i32, i32) {
    (
        (position.x / CELL_SIZE).floor() as i32,
        (position.y / CELL_SIZE).floor() as i32,
    )
}

fn chunk_of(position: Vec2) -> ChunkId {
    let (x, y) = cell_of(position);
    (x.div_euclid(CHUNK_SIZE), y.div_euclid(CHUNK_SIZE))
}

fn locate(x: i32, y: i32) -> (ChunkId, usize) {
    let id = (x.div_euclid(CHUNK_SIZE), y.div_euclid(CHUNK_SIZE));
    let index = y.rem_euclid(CHUNK_SIZE) * CHUNK_SIZE + x.rem_euclid(CHUNK_SIZE);
    (id, index as usize)
}
