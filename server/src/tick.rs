//! The per-tick update loop: advance the simulation, then build one world
//! update for every connected player.

use crate::game::Game;
use crate::scheduler::{Schedule, TickScheduler};
use crate::world::WorldModel;
use log::debug;
use shared::WorldUpdate;
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// Upper bound on the simulated step after a long stall
pub const MAX_TICK_DT: Duration = Duration::from_millis(250);
const TPS_WINDOW: Duration = Duration::from_secs(1);
const SUMMARY_EVERY_TICKS: u64 = 100;

/// Measures ticks per second over a sliding one second window
#[derive(Debug, Default)]
pub struct TpsMeter {
    ticks: VecDeque<Instant>,
}

impl TpsMeter {
    pub fn record(&mut self, now: Instant) {
        self.ticks.push_back(now);
        while let Some(&oldest) = self.ticks.front() {
            if now.saturating_duration_since(oldest) > TPS_WINDOW {
                self.ticks.pop_front();
            } else {
                break;
            }
        }
    }

    pub fn current(&self) -> f32 {
        match (self.ticks.front(), self.ticks.back()) {
            (Some(first), Some(last)) if self.ticks.len() > 1 => {
                let span = last.saturating_duration_since(*first).as_secs_f32();
                if span > 0.0 {
                    (self.ticks.len() - 1) as f32 / span
                } else {
                    0.0
                }
            }
            _ => 0.0,
        }
    }
}

pub struct TickLoop {
    scheduler: TickScheduler,
    last_tick: Option<Instant>,
    tps: TpsMeter,
}

impl TickLoop {
    pub fn new(interval: Duration, start: Instant) -> Self {
        Self {
            scheduler: TickScheduler::new(interval, start),
            last_tick: None,
            tps: TpsMeter::default(),
        }
    }

    pub fn next_tick(&self) -> Instant {
        self.scheduler.next_tick()
    }

    pub fn scheduler(&self) -> &TickScheduler {
        &self.scheduler
    }

    pub fn tps(&self) -> f32 {
        self.tps.current()
    }

    /// Runs one tick that started at `started`, stamping every update with
    /// `server_time`. Returns the updates keyed by player id.
    pub fn run_tick<W: WorldModel>(
        &mut self,
        game: &mut Game<W>,
        started: Instant,
        server_time: u64,
    ) -> Vec<(u32, WorldUpdate)> {
        let dt = match self.last_tick {
            Some(last) => started.saturating_duration_since(last),
            None => self.scheduler.interval(),
        }
        .min(MAX_TICK_DT);
        self.last_tick = Some(started);
        self.tps.record(started);

        game.simulate(dt.as_secs_f32(), server_time);

        let tps = self.tps.current();
        let updates: Vec<(u32, WorldUpdate)> = game
            .player_ids()
            .into_iter()
            .filter_map(|id| game.build_update(id, server_time, tps).map(|update| (id, update)))
            .collect();
        game.end_tick();

        if game.tick % SUMMARY_EVERY_TICKS == 0 {
            debug!(
                "Tick {}: {} players, {:.1} tps, {} overruns",
                game.tick,
                updates.len(),
                tps,
                self.scheduler.overruns()
            );
        }

        updates
    }

    /// Schedules the next tick after the current one finished at `now`
    pub fn finish_tick(&mut self, now: Instant) -> Schedule {
        self.scheduler.tick_finished(now)
    }
}

/// Sends `item` after `delay` without holding up the caller
pub fn dispatch_delayed<T: Send + 'static>(
    tx: mpsc::UnboundedSender<T>,
    item: T,
    delay: Duration,
) {
    if delay.is_zero() {
        if tx.send(item).is_err() {
            debug!("Dropping update: sender task has stopped");
        }
        return;
    }

    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        if tx.send(item).is_err() {
            debug!("Dropping delayed update: sender task has stopped");
        }
    });
}
