//! Mapping from local wall-clock time to server render time
//!
//! The offset is anchored on the first update and then only revisited once
//! every sample window. When the averaged offset has drifted past the resync
//! threshold it is replaced outright, which shows up as a visible jump.

use log::{info, warn};
use shared::{now_millis, CLOCK_SAMPLE_WINDOW, CONNECTION_LOSS_FACTOR};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// Source of local wall-clock time in milliseconds
pub trait Clock {
    fn now_ms(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        now_millis() as i64
    }
}

/// Hand-driven clock for deterministic tests and replays
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicI64>,
}

impl ManualClock {
    pub fn new(start_ms: i64) -> Self {
        Self {
            now: Arc::new(AtomicI64::new(start_ms)),
        }
    }

    pub fn set(&self, now_ms: i64) {
        self.now.store(now_ms, Ordering::SeqCst);
    }

    pub fn advance(&self, delta_ms: i64) {
        self.now.fetch_add(delta_ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
pub struct ClockSync {
    render_delay: i64,
    resync_threshold: i64,
    server_delay: Option<i64>,
    game_start: i64,
    first_server_timestamp: u64,
    delay_sum: i64,
    delay_samples: u32,
    last_update: Option<i64>,
    lost: bool,
}

impl ClockSync {
    pub fn new(render_delay: i64, resync_threshold: i64) -> Self {
        Self {
            render_delay,
            resync_threshold,
            server_delay: None,
            game_start: 0,
            first_server_timestamp: 0,
            delay_sum: 0,
            delay_samples: 0,
            last_update: None,
            lost: false,
        }
    }

    /// Records that an update stamped `server_time` arrived at local time `now`
    pub fn observe(&mut self, server_time: u64, now: i64) {
        self.last_update = Some(now);
        if self.lost {
            info!("Server updates resumed");
            self.lost = false;
        }

        let sample = now - server_time as i64 + self.render_delay;
        let Some(current) = self.server_delay else {
            self.game_start = now;
            self.first_server_timestamp = server_time;
            self.server_delay = Some(sample);
            info!(
                "Clock anchored at server time {} with offset {}ms",
                server_time, sample
            );
            return;
        };

        self.delay_sum += sample;
        self.delay_samples += 1;
        if self.delay_samples < CLOCK_SAMPLE_WINDOW {
            return;
        }

        let average = self.delay_sum / self.delay_samples as i64;
        if (average - current).abs() > self.resync_threshold {
            info!(
                "Resyncing clock offset from {}ms to {}ms",
                current, average
            );
            self.server_delay = Some(average);
        }
        self.delay_sum = 0;
        self.delay_samples = 0;
    }

    /// Server time that should be on screen at local time `now`
    pub fn current_server_time(&self, now: i64) -> Option<i64> {
        self.server_delay.map(|delay| now - delay)
    }

    /// Advisory liveness check; true once updates have been silent for too long
    pub fn connection_lost(&self, now: i64) -> bool {
        match self.last_update {
            Some(last) => now - last > CONNECTION_LOSS_FACTOR * self.render_delay,
            None => false,
        }
    }

    /// Like `connection_lost` but logs the transition once
    pub fn check_connection(&mut self, now: i64) -> bool {
        let lost = self.connection_lost(now);
        if lost && !self.lost {
            warn!("No server update for over {}ms", CONNECTION_LOSS_FACTOR * self.render_delay);
        }
        self.lost = lost;
        lost
    }

    pub fn server_delay(&self) -> Option<i64> {
        self.server_delay
    }

    /// Local time the most recent update was observed
    pub fn last_update(&self) -> Option<i64> {
        self.last_update
    }

    /// Local time of the first update and its server timestamp
    pub fn anchor(&self) -> Option<(i64, u64)> {
        self.server_delay
            .map(|_| (self.game_start, self.first_server_timestamp))
    }

    /// Accumulated samples not yet folded into a resync check
    pub fn pending_samples(&self) -> (i64, u32) {
        (self.delay_sum, self.delay_samples)
    }
}
