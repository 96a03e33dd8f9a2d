//! Fixed-rate tick scheduling
//!
//! Each tick is due one interval after the previous tick's due time. When a
//! tick finishes after the next one was already due, the missed ticks are
//! dropped: the next tick runs immediately and the schedule is re-anchored on
//! the current time instead of trying to catch up.

use log::warn;
use std::time::{Duration, Instant};

/// When the next tick should run, as decided after finishing a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    pub delay: Duration,
    pub fell_behind: bool,
}

#[derive(Debug, Clone)]
pub struct TickScheduler {
    interval: Duration,
    next_tick: Instant,
    overruns: u64,
}

impl TickScheduler {
    /// The first tick is due at `start`
    pub fn new(interval: Duration, start: Instant) -> Self {
        Self {
            interval,
            next_tick: start,
            overruns: 0,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn next_tick(&self) -> Instant {
        self.next_tick
    }

    /// Number of ticks that overran their budget so far
    pub fn overruns(&self) -> u64 {
        self.overruns
    }

    /// Advances the schedule after a tick that finished at `now`
    pub fn tick_finished(&mut self, now: Instant) -> Schedule {
        self.next_tick += self.interval;

        if now >= self.next_tick {
            self.overruns += 1;
            warn!(
                "Server falling behind: tick finished {:?} past its successor's slot",
                now - self.next_tick
            );
            self.next_tick = now;
            return Schedule {
                delay: Duration::ZERO,
                fell_behind: true,
            };
        }

        Schedule {
            delay: self.next_tick - now,
            fell_behind: false,
        }
    }
}
