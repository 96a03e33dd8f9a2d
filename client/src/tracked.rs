//! Objects that keep their own snapshot timeline

use crate::history::HistoryBuffer;
use crate::interpolation::{view_of, EntityView};
use shared::{EntityUpdate, Snapshot};

/// Which timestamp orders an object's snapshots
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeKey {
    /// The send time of the update that carried the reading
    Envelope,
    /// The object's own `last_updated` stamp
    LastUpdated,
}

#[derive(Debug, Clone)]
pub struct TrackedObject {
    id: u32,
    time_key: TimeKey,
    history: HistoryBuffer<Snapshot>,
    /// Seen during the current ingest cycle
    pub exists: bool,
}

impl TrackedObject {
    pub fn new(id: u32, time_key: TimeKey) -> Self {
        Self {
            id,
            time_key,
            history: HistoryBuffer::new(),
            exists: true,
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn time_key(&self) -> TimeKey {
        self.time_key
    }

    pub fn history(&self) -> &HistoryBuffer<Snapshot> {
        &self.history
    }

    /// Appends a reading. Returns false when a `LastUpdated` object repeats a
    /// stamp that is not newer than what is already stored.
    pub fn record(&mut self, update: &EntityUpdate, envelope_time: u64) -> bool {
        self.exists = true;
        let time = match self.time_key {
            TimeKey::Envelope => envelope_time,
            TimeKey::LastUpdated => {
                let stamp = update.last_updated.unwrap_or(envelope_time);
                if self
                    .history
                    .latest()
                    .is_some_and(|latest| latest.server_time >= stamp)
                {
                    return false;
                }
                stamp
            }
        };
        self.history.push(Snapshot::from_update(update, time));
        true
    }

    pub fn prune(&mut self, render_time: i64) -> usize {
        self.history.prune(render_time)
    }

    /// Interpolated view at `render_time`, `None` only if nothing was recorded
    pub fn view(&self, render_time: i64) -> Option<EntityView> {
        self.history.sample(render_time).map(view_of)
    }
}
