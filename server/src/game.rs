//! Authoritative game simulation
//!
//! All mutation happens either inside `simulate` or in the message handlers
//! that run strictly between ticks on the same task.

use crate::inventory::Inventory;
use crate::world::{cell_of, ChunkWorld, PlayerView, WorldModel};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::{
    CellUpdate, EntityUpdate, PositionFix, RosterEntry, Vec2, WorldUpdate, CELL_SIZE,
    DIRECTION_KEY, ENTITY_SPEED, PICKUP_RADIUS, PLAYER_RADIUS, PLAYER_SPEED, WORLD_SIZE,
};
use std::collections::BTreeMap;
use std::f32::consts::TAU;

/// Seconds for a full day/night cycle
pub const DAY_LENGTH_SECS: f32 = 120.0;
pub const MAX_DARKNESS: f32 = 0.8;
/// Drifters only move once every this many ticks
pub const DRIFT_EVERY_TICKS: u64 = 10;
pub const CLICK_REACH: f32 = CELL_SIZE * 4.0;

const FIRST_ENTITY_ID: u32 = 10_000;
const WANDER_TURN_CHANCE: f64 = 0.02;
const PICKUP_ITEMS: [&str; 3] = ["wood", "stone", "coal"];
const COLORS: [&str; 8] = [
    "blue", "red", "green", "purple", "orange", "cyan", "magenta", "yellow",
];

#[derive(Debug, Clone)]
pub struct PlayerRecord {
    pub id: u32,
    pub username: String,
    pub color: String,
    pub position: Vec2,
    pub intent: Vec2,
    pub direction: f32,
    pub last_sequence: u32,
    pub inventory: Inventory,
    pub view: PlayerView,
    fixes: Vec<PositionFix>,
}

impl PlayerRecord {
    fn new(id: u32, username: &str, position: Vec2) -> Self {
        Self {
            id,
            username: username.to_string(),
            color: COLORS[(id as usize).saturating_sub(1) % COLORS.len()].to_string(),
            position,
            intent: Vec2::ZERO,
            direction: 0.0,
            last_sequence: 0,
            inventory: Inventory::new(),
            view: PlayerView::default(),
            fixes: vec![PositionFix::SetPosition {
                x: position.x,
                y: position.y,
            }],
        }
    }

    pub fn pending_fixes(&self) -> &[PositionFix] {
        &self.fixes
    }

    fn to_update(&self) -> EntityUpdate {
        EntityUpdate::new(self.id)
            .with_static("username", self.username.as_str())
            .with_static("color", self.color.as_str())
            .with_dynamic("x", self.position.x as f64)
            .with_dynamic("y", self.position.y as f64)
            .with_dynamic(DIRECTION_KEY, self.direction as f64)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EntityKind {
    Wanderer,
    /// Moves on its own schedule and is tracked by its own timestamp
    Drifter,
    Pickup { item: String },
}

impl EntityKind {
    fn name(&self) -> &'static str {
        match self {
            EntityKind::Wanderer => "wanderer",
            EntityKind::Drifter => "drifter",
            EntityKind::Pickup { .. } => "pickup",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Entity {
    pub id: u32,
    pub kind: EntityKind,
    pub position: Vec2,
    pub velocity: Vec2,
    pub direction: f32,
    pub last_updated: u64,
}

impl Entity {
    fn to_update(&self) -> EntityUpdate {
        let mut update = EntityUpdate::new(self.id)
            .with_static("kind", self.kind.name())
            .with_dynamic("x", self.position.x as f64)
            .with_dynamic("y", self.position.y as f64)
            .with_dynamic(DIRECTION_KEY, self.direction as f64);
        match &self.kind {
            EntityKind::Pickup { item } => update = update.with_static("item", item.as_str()),
            EntityKind::Drifter => update = update.updated_at(self.last_updated),
            EntityKind::Wanderer => {}
        }
        update
    }
}

pub struct Game<W: WorldModel = ChunkWorld> {
    pub tick: u64,
    players: BTreeMap<u32, PlayerRecord>,
    entities: BTreeMap<u32, Entity>,
    world: W,
    next_entity_id: u32,
    rng: StdRng,
    elapsed: f32,
}

impl<W: WorldModel> Game<W> {
    pub fn new(world: W, seed: u64) -> Self {
        Self {
            tick: 0,
            players: BTreeMap::new(),
            entities: BTreeMap::new(),
            world,
            next_entity_id: FIRST_ENTITY_ID,
            rng: StdRng::seed_from_u64(seed),
            elapsed: 0.0,
        }
    }

    pub fn world(&self) -> &W {
        &self.world
    }

    pub fn player(&self, id: u32) -> Option<&PlayerRecord> {
        self.players.get(&id)
    }

    pub fn players(&self) -> impl Iterator<Item = &PlayerRecord> {
        self.players.values()
    }

    pub fn player_ids(&self) -> Vec<u32> {
        self.players.keys().copied().collect()
    }

    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    fn random_position(&mut self) -> Vec2 {
        let margin = CELL_SIZE * 2.0;
        Vec2::new(
            self.rng.gen_range(margin..WORLD_SIZE - margin),
            self.rng.gen_range(margin..WORLD_SIZE - margin),
        )
    }

    fn random_heading(&mut self) -> Vec2 {
        let angle: f32 = self.rng.gen_range(0.0..TAU);
        Vec2::new(angle.sin(), angle.cos())
    }

    pub fn spawn_entity(&mut self, kind: EntityKind, server_time: u64) -> u32 {
        let id = self.next_entity_id;
        self.next_entity_id += 1;

        let position = self.random_position();
        let velocity = match kind {
            EntityKind::Pickup { .. } => Vec2::ZERO,
            _ => self.random_heading().scale(ENTITY_SPEED),
        };
        self.entities.insert(
            id,
            Entity {
                id,
                kind,
                position,
                velocity,
                direction: velocity.angle(),
                last_updated: server_time,
            },
        );
        id
    }

    pub fn spawn_pickup(&mut self, server_time: u64) -> u32 {
        let item = PICKUP_ITEMS[self.rng.gen_range(0..PICKUP_ITEMS.len())].to_string();
        self.spawn_entity(EntityKind::Pickup { item }, server_time)
    }

    pub fn populate(&mut self, wanderers: usize, drifters: usize, pickups: usize, server_time: u64) {
        for _ in 0..wanderers {
            self.spawn_entity(EntityKind::Wanderer, server_time);
        }
        for _ in 0..drifters {
            self.spawn_entity(EntityKind::Drifter, server_time);
        }
        for _ in 0..pickups {
            self.spawn_pickup(server_time);
        }
        info!(
            "Spawned {} wanderers, {} drifters, {} pickups",
            wanderers, drifters, pickups
        );
    }

    pub fn add_player(&mut self, id: u32, username: &str) {
        let position = self.random_position();
        let player = PlayerRecord::new(id, username, position);
        info!(
            "Added player {} ({}) at ({:.0}, {:.0})",
            id, username, position.x, position.y
        );
        self.players.insert(id, player);
    }

    pub fn remove_player(&mut self, id: &u32) {
        if self.players.remove(id).is_some() {
            info!("Removed player {}", id);
        }
    }

    /// Applies a movement input. Stale or non-finite inputs are ignored.
    pub fn set_input(&mut self, id: u32, sequence: u32, intent: Vec2, direction: f32) -> bool {
        let Some(player) = self.players.get_mut(&id) else {
            return false;
        };
        if sequence <= player.last_sequence {
            return false;
        }
        if !(intent.x.is_finite() && intent.y.is_finite() && direction.is_finite()) {
            debug!("Ignoring non-finite input from player {}", id);
            return false;
        }
        player.last_sequence = sequence;
        player.intent = intent.normalize();
        player.direction = direction;
        true
    }

    /// Toggles the cell under a world position if it is within reach of the player
    pub fn click(&mut self, id: u32, target: Vec2) -> Option<CellUpdate> {
        let player = self.players.get(&id)?;
        if player.position.distance(target) > CLICK_REACH {
            return None;
        }
        let (x, y) = cell_of(target);
        self.world.toggle_cell(x, y)
    }

    /// Darkness level in [0, MAX_DARKNESS] for the current time of day
    pub fn darkness(&self) -> f32 {
        let phase = (self.elapsed / DAY_LENGTH_SECS) * TAU;
        (1.0 - phase.cos()) / 2.0 * MAX_DARKNESS
    }

    /// Advances the world by `dt` seconds
    pub fn simulate(&mut self, dt: f32, server_time: u64) {
        let min = PLAYER_RADIUS;
        let max = WORLD_SIZE - PLAYER_RADIUS;
        for player in self.players.values_mut() {
            let moved = player.position.add(player.intent.scale(PLAYER_SPEED * dt));
            player.position = Vec2::new(moved.x.clamp(min, max), moved.y.clamp(min, max));
        }

        self.separate_players();
        self.move_entities(dt, server_time);
        self.collect_pickups(server_time);

        self.elapsed += dt;
        self.tick += 1;
    }

    fn separate_players(&mut self) {
        let ids: Vec<u32> = self.players.keys().copied().collect();
        for i in 0..ids.len() {
            for j in (i + 1)..ids.len() {
                let (a, b) = (self.players[&ids[i]].position, self.players[&ids[j]].position);
                let offset = b.sub(a);
                let distance = offset.length();
                if distance >= PLAYER_RADIUS * 2.0 {
                    continue;
                }

                let normal = if distance < 0.001 {
                    Vec2::new(1.0, 0.0)
                } else {
                    offset.scale(1.0 / distance)
                };
                let push = normal.scale((PLAYER_RADIUS * 2.0 - distance) / 2.0);

                if let Some(first) = self.players.get_mut(&ids[i]) {
                    first.position = first.position.sub(push);
                    first.fixes.push(PositionFix::Push {
                        x: -push.x,
                        y: -push.y,
                    });
                }
                if let Some(second) = self.players.get_mut(&ids[j]) {
                    second.position = second.position.add(push);
                    second.fixes.push(PositionFix::Push {
                        x: push.x,
                        y: push.y,
                    });
                }
            }
        }
    }

    fn move_entities(&mut self, dt: f32, server_time: u64) {
        let drift_now = self.tick % DRIFT_EVERY_TICKS == 0;
        let ids: Vec<u32> = self.entities.keys().copied().collect();

        for id in ids {
            let turn = self.rng.gen_bool(WANDER_TURN_CHANCE);
            let heading = self.random_heading();
            let Some(entity) = self.entities.get_mut(&id) else {
                continue;
            };

            let step = match entity.kind {
                EntityKind::Pickup { .. } => continue,
                EntityKind::Wanderer => {
                    if turn {
                        entity.velocity = heading.scale(ENTITY_SPEED);
                    }
                    dt
                }
                EntityKind::Drifter if drift_now => {
                    entity.last_updated = server_time;
                    dt * DRIFT_EVERY_TICKS as f32
                }
                EntityKind::Drifter => continue,
            };

            let mut next = entity.position.add(entity.velocity.scale(step));
            if next.x < 0.0 || next.x > WORLD_SIZE {
                entity.velocity.x = -entity.velocity.x;
                next.x = next.x.clamp(0.0, WORLD_SIZE);
            }
            if next.y < 0.0 || next.y > WORLD_SIZE {
                entity.velocity.y = -entity.velocity.y;
                next.y = next.y.clamp(0.0, WORLD_SIZE);
            }
            entity.position = next;
            entity.direction = entity.velocity.angle();
        }
    }

    fn collect_pickups(&mut self, server_time: u64) {
        let mut collected = Vec::new();
        for player in self.players.values_mut() {
            for entity in self.entities.values() {
                let EntityKind::Pickup { item } = &entity.kind else {
                    continue;
                };
                if collected.contains(&entity.id) {
                    continue;
                }
                if player.position.distance(entity.position) <= PLAYER_RADIUS + PICKUP_RADIUS {
                    player.inventory.add(item, 1);
                    debug!("Player {} picked up {}", player.id, item);
                    collected.push(entity.id);
                }
            }
        }

        for id in collected {
            self.entities.remove(&id);
            self.spawn_pickup(server_time);
        }
    }

    /// Builds the world update for one player, draining their pending
    /// corrections and inventory changes
    pub fn build_update(&mut self, player_id: u32, t: u64, tps: f32) -> Option<WorldUpdate> {
        let player = self.players.get(&player_id)?;
        let position = player.position;

        let mut update = WorldUpdate::new(t, player.to_update());
        update.others = self
            .players
            .values()
            .filter(|other| other.id != player_id)
            .filter(|other| self.world.is_nearby(position, other.position))
            .map(PlayerRecord::to_update)
            .collect();

        for entity in self.entities.values() {
            if !self.world.is_nearby(position, entity.position) {
                continue;
            }
            match entity.kind {
                EntityKind::Drifter => update.independent.push(entity.to_update()),
                _ => update.entities.push(entity.to_update()),
            }
        }

        update.roster = self
            .players
            .values()
            .map(|p| RosterEntry {
                id: p.id,
                username: p.username.clone(),
            })
            .collect();
        update.darkness = self.darkness();
        update.tps = tps;

        let player = self.players.get_mut(&player_id)?;
        update.world = self
            .world
            .compute_delta_for_player(&mut player.view, position);
        update.fixes = std::mem::take(&mut player.fixes);
        update.inventory = player.inventory.take_changes();
        update.recipes = player.inventory.take_recipe_update();

        Some(update)
    }

    /// Clears per-tick state once every player's update has been built
    pub fn end_tick(&mut self) {
        self.world.end_tick();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn game() -> Game {
        Game::new(ChunkWorld::new(1, 600.0), 1)
    }

    fn place(game: &mut Game, id: u32, position: Vec2) {
        game.add_player(id, "tester");
        let player = game.players.get_mut(&id).unwrap();
        player.position = position;
        player.fixes.clear();
    }

    #[test]
    fn test_new_player_gets_spawn_fix() {
        let mut game = game();
        game.add_player(1, "ada");
        let player = game.player(1).unwrap();
        assert_eq!(player.color, "blue");
        assert!(matches!(
            player.pending_fixes(),
            [PositionFix::SetPosition { .. }]
        ));
    }

    #[test]
    fn test_input_moves_player() {
        let mut game = game();
        place(&mut game, 1, Vec2::new(500.0, 500.0));

        assert!(game.set_input(1, 1, Vec2::new(2.0, 0.0), 1.0));
        game.simulate(0.5, 1_000);

        let player = game.player(1).unwrap();
        assert_approx_eq!(player.position.x, 500.0 + PLAYER_SPEED * 0.5, 1e-3);
        assert_approx_eq!(player.position.y, 500.0, 1e-3);
        assert_eq!(game.tick, 1);
    }

    #[test]
    fn test_stale_and_malformed_inputs_are_ignored() {
        let mut game = game();
        place(&mut game, 1, Vec2::new(500.0, 500.0));

        assert!(game.set_input(1, 5, Vec2::new(1.0, 0.0), 0.0));
        assert!(!game.set_input(1, 4, Vec2::new(-1.0, 0.0), 0.0));
        assert!(!game.set_input(1, 6, Vec2::new(f32::NAN, 0.0), 0.0));
        assert!(!game.set_input(99, 7, Vec2::new(1.0, 0.0), 0.0));
        assert_eq!(game.player(1).unwrap().intent, Vec2::new(1.0, 0.0));
    }

    #[test]
    fn test_overlapping_players_are_pushed_apart() {
        let mut game = game();
        place(&mut game, 1, Vec2::new(500.0, 500.0));
        place(&mut game, 2, Vec2::new(510.0, 500.0));

        game.simulate(0.0, 1_000);

        let (a, b) = (game.player(1).unwrap(), game.player(2).unwrap());
        assert_approx_eq!(a.position.distance(b.position), PLAYER_RADIUS * 2.0, 1e-3);
        assert!(matches!(a.pending_fixes(), [PositionFix::Push { x, .. }] if *x < 0.0));
        assert!(matches!(b.pending_fixes(), [PositionFix::Push { x, .. }] if *x > 0.0));
    }

    #[test]
    fn test_pickups_feed_inventory_and_respawn() {
        let mut game = game();
        place(&mut game, 1, Vec2::new(500.0, 500.0));
        let id = game.spawn_entity(
            EntityKind::Pickup {
                item: "wood".to_string(),
            },
            0,
        );
        game.entities.get_mut(&id).unwrap().position = Vec2::new(505.0, 500.0);

        game.simulate(0.0, 1_000);

        assert!(game.entities.get(&id).is_none());
        assert_eq!(game.entities().count(), 1);
        assert_eq!(game.player(1).unwrap().inventory.count("wood"), 1);

        let update = game.build_update(1, 1_000, 20.0).unwrap();
        assert_eq!(update.inventory.len(), 1);
        assert_eq!(update.recipes, Some(vec!["plank".to_string()]));

        let update = game.build_update(1, 1_050, 20.0).unwrap();
        assert!(update.inventory.is_empty());
        assert!(update.recipes.is_none());
    }

    #[test]
    fn test_drifters_only_move_on_their_schedule() {
        let mut game = game();
        let id = game.spawn_entity(EntityKind::Drifter, 0);
        let start = game.entities[&id].position;

        game.simulate(0.05, 1_000);
        let after_first = game.entities[&id].clone();
        assert_ne!(after_first.position, start);
        assert_eq!(after_first.last_updated, 1_000);

        for i in 1..DRIFT_EVERY_TICKS {
            game.simulate(0.05, 1_000 + i * 50);
        }
        assert_eq!(game.entities[&id].position, after_first.position);
        assert_eq!(game.entities[&id].last_updated, 1_000);
    }

    #[test]
    fn test_update_contains_only_nearby_objects() {
        let mut game = Game::new(ChunkWorld::new(1, 100.0), 1);
        place(&mut game, 1, Vec2::new(500.0, 500.0));
        place(&mut game, 2, Vec2::new(550.0, 500.0));
        place(&mut game, 3, Vec2::new(1500.0, 1500.0));

        let update = game.build_update(1, 1_000, 20.0).unwrap();
        assert_eq!(update.player.id, 1);
        let others: Vec<u32> = update.others.iter().map(|o| o.id).collect();
        assert_eq!(others, vec![2]);
        assert_eq!(update.roster.len(), 3);
        assert!(update.world.is_some());
        assert_eq!(update.tps, 20.0);
    }

    #[test]
    fn test_drifters_are_sent_as_independent_objects() {
        let mut game = game();
        place(&mut game, 1, Vec2::new(1000.0, 1000.0));
        let id = game.spawn_entity(EntityKind::Drifter, 0);
        game.entities.get_mut(&id).unwrap().position = Vec2::new(1010.0, 1000.0);

        let update = game.build_update(1, 1_000, 20.0).unwrap();
        assert_eq!(update.independent.len(), 1);
        assert_eq!(update.independent[0].last_updated, Some(0));
        assert!(update.entities.is_empty());
    }

    #[test]
    fn test_click_toggles_cells_within_reach() {
        let mut game = game();
        place(&mut game, 1, Vec2::new(500.0, 500.0));

        let changed = game.click(1, Vec2::new(520.0, 500.0)).unwrap();
        assert_eq!(changed.cell, crate::world::WALL);
        assert!(game.click(1, Vec2::new(1500.0, 500.0)).is_none());
        assert!(game.click(42, Vec2::new(500.0, 500.0)).is_none());
    }

    #[test]
    fn test_darkness_cycle() {
        let mut game = game();
        assert_approx_eq!(game.darkness(), 0.0, 1e-6);
        game.simulate(DAY_LENGTH_SECS / 2.0, 0);
        assert_approx_eq!(game.darkness(), MAX_DARKNESS, 1e-4);
    }

    #[test]
    fn test_removed_player_gets_no_update() {
        let mut game = game();
        game.add_player(1, "ada");
        game.remove_player(&1);
        assert!(game.build_update(1, 1_000, 20.0).is_none());
    }
}
