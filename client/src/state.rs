//! Client state manager
//!
//! Ingests world updates in arrival order and answers "what should be drawn
//! right now". Players and independent objects keep their own timelines;
//! plain entities share one timeline keyed by update send time.

use crate::clock::{Clock, ClockSync, SystemClock};
use crate::collaborators::Hooks;
use crate::history::{HistoryBuffer, Sample};
use crate::interpolation::{flatten, interpolate_array, EntityView};
use crate::tracked::{TimeKey, TrackedObject};
use log::debug;
use shared::{
    EntityUpdate, PositionFix, RosterEntry, Snapshot, Timestamped, Vec2, WorldUpdate,
    RENDER_DELAY_MS, SERVER_RESYNC_THRESHOLD_MS,
};
use std::collections::HashMap;

/// Upper bound on shared-timeline frames kept while render time lags behind
const MAX_TIMELINE_FRAMES: usize = 256;

#[derive(Debug, Clone, Copy)]
pub struct ClientConfig {
    pub render_delay_ms: i64,
    pub resync_threshold_ms: i64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            render_delay_ms: RENDER_DELAY_MS,
            resync_threshold_ms: SERVER_RESYNC_THRESHOLD_MS,
        }
    }
}

/// Everything the renderer needs for one frame
#[derive(Debug, Clone, PartialEq)]
pub struct WorldView {
    pub player: EntityView,
    pub others: Vec<EntityView>,
    pub entities: Vec<EntityView>,
    pub independent: Vec<EntityView>,
}

#[derive(Debug, Clone)]
struct EntitiesFrame {
    t: u64,
    entities: Vec<Snapshot>,
}

impl Timestamped for EntitiesFrame {
    fn server_time(&self) -> u64 {
        self.t
    }
}

pub struct StateManager<C: Clock = SystemClock> {
    clock: C,
    config: ClientConfig,
    sync: ClockSync,
    player: Option<TrackedObject>,
    others: HashMap<u32, TrackedObject>,
    independent: HashMap<u32, TrackedObject>,
    timeline: HistoryBuffer<EntitiesFrame>,
    roster: Vec<RosterEntry>,
    darkness: f32,
    tps: f32,
    updates_ingested: u64,
}

impl StateManager<SystemClock> {
    pub fn new(config: ClientConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: Clock> StateManager<C> {
    pub fn with_clock(config: ClientConfig, clock: C) -> Self {
        Self {
            clock,
            config,
            sync: ClockSync::new(config.render_delay_ms, config.resync_threshold_ms),
            player: None,
            others: HashMap::new(),
            independent: HashMap::new(),
            timeline: HistoryBuffer::new(),
            roster: Vec::new(),
            darkness: 0.0,
            tps: 0.0,
            updates_ingested: 0,
        }
    }

    /// Forgets everything, as if no update had ever arrived
    pub fn reset(&mut self) {
        self.sync = ClockSync::new(self.config.render_delay_ms, self.config.resync_threshold_ms);
        self.player = None;
        self.others.clear();
        self.independent.clear();
        self.timeline = HistoryBuffer::new();
        self.roster.clear();
        self.darkness = 0.0;
        self.tps = 0.0;
        self.updates_ingested = 0;
    }

    pub fn ingest(&mut self, update: &WorldUpdate, hooks: Hooks<'_>) {
        let now = self.clock.now_ms();

        let Hooks {
            world,
            predictor,
            inventory,
        } = hooks;

        if let (Some(delta), Some(world)) = (&update.world, world) {
            world.apply_chunk_unload(&delta.unloaded);
            world.apply_chunk_load(&delta.loaded);
            world.apply_cell_updates(&delta.cells);
        }

        if let Some(predictor) = predictor {
            for fix in &update.fixes {
                match *fix {
                    PositionFix::Push { x, y } => predictor.apply_server_correction(x, y),
                    PositionFix::SetPosition { x, y } => {
                        predictor.apply_set_position(Vec2::new(x, y))
                    }
                }
            }
        }

        if let Some(inventory) = inventory {
            if !update.inventory.is_empty() {
                inventory.apply_slot_changes(&update.inventory);
            }
            if let Some(recipes) = &update.recipes {
                inventory.set_available_recipes(recipes);
            }
        }

        let player = match self.player.take() {
            Some(player) if player.id() == update.player.id => player,
            _ => {
                debug!("Tracking local player {}", update.player.id);
                TrackedObject::new(update.player.id, TimeKey::Envelope)
            }
        };
        let player = self.player.insert(player);
        player.record(&update.player, update.t);

        refresh_group(&mut self.others, &update.others, update.t, TimeKey::Envelope);
        refresh_group(
            &mut self.independent,
            &update.independent,
            update.t,
            TimeKey::LastUpdated,
        );

        self.sync.observe(update.t, now);

        self.timeline.push(EntitiesFrame {
            t: update.t,
            entities: update
                .entities
                .iter()
                .map(|entity| Snapshot::from_update(entity, update.t))
                .collect(),
        });

        self.roster = update.roster.clone();
        self.darkness = update.darkness;
        self.tps = update.tps;
        self.updates_ingested += 1;

        if let Some(render_time) = self.sync.current_server_time(now) {
            self.prune(render_time);
        }
    }

    fn prune(&mut self, render_time: i64) {
        self.timeline.prune(render_time);
        self.timeline.cap(MAX_TIMELINE_FRAMES, render_time);
        if let Some(player) = self.player.as_mut() {
            player.prune(render_time);
        }
        for object in self.others.values_mut().chain(self.independent.values_mut()) {
            object.prune(render_time);
        }
    }

    /// Render time for the current instant, `None` before the first update
    pub fn render_time(&self) -> Option<i64> {
        self.sync.current_server_time(self.clock.now_ms())
    }

    /// The world as it should look now, or `None` if nothing has arrived yet
    pub fn current_state(&self) -> Option<WorldView> {
        let render_time = self.render_time()?;
        let player = self.player.as_ref()?.view(render_time)?;

        let entities = match self.timeline.sample(render_time) {
            Some(Sample::Latest(frame)) => frame.entities.iter().map(flatten).collect(),
            Some(Sample::Between {
                before,
                after,
                ratio,
            }) => interpolate_array(&before.entities, &after.entities, ratio),
            None => Vec::new(),
        };

        Some(WorldView {
            player,
            others: views_by_id(&self.others, render_time),
            entities,
            independent: views_by_id(&self.independent, render_time),
        })
    }

    /// Advisory: true when updates have stopped arriving for a while
    pub fn connection_lost(&mut self) -> bool {
        let now = self.clock.now_ms();
        self.sync.check_connection(now)
    }

    /// Local time the most recent update arrived
    pub fn last_arrival(&self) -> Option<i64> {
        self.sync.last_update()
    }

    pub fn server_delay(&self) -> Option<i64> {
        self.sync.server_delay()
    }

    pub fn clock_sync(&self) -> &ClockSync {
        &self.sync
    }

    pub fn player_id(&self) -> Option<u32> {
        self.player.as_ref().map(TrackedObject::id)
    }

    pub fn tracked_others(&self) -> usize {
        self.others.len()
    }

    pub fn tracked_independent(&self) -> usize {
        self.independent.len()
    }

    pub fn timeline_len(&self) -> usize {
        self.timeline.len()
    }

    pub fn roster(&self) -> &[RosterEntry] {
        &self.roster
    }

    pub fn darkness(&self) -> f32 {
        self.darkness
    }

    pub fn server_tps(&self) -> f32 {
        self.tps
    }

    pub fn updates_ingested(&self) -> u64 {
        self.updates_ingested
    }
}

/// Records this cycle's readings and drops objects that were not mentioned
fn refresh_group(
    group: &mut HashMap<u32, TrackedObject>,
    updates: &[EntityUpdate],
    t: u64,
    time_key: TimeKey,
) {
    for object in group.values_mut() {
        object.exists = false;
    }

    for update in updates {
        group
            .entry(update.id)
            .or_insert_with(|| {
                debug!("Tracking object {}", update.id);
                TrackedObject::new(update.id, time_key)
            })
            .record(update, t);
    }

    group.retain(|id, object| {
        if !object.exists {
            debug!("Object {} left", id);
        }
        object.exists
    });
}

fn views_by_id(group: &HashMap<u32, TrackedObject>, render_time: i64) -> Vec<EntityView> {
    let mut views: Vec<EntityView> = group
        .values()
        .filter_map(|object| object.view(render_time))
        .collect();
    views.sort_by_key(|view| view.id);
    views
}
