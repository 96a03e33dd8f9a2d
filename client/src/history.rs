//! Timestamped history for a single timeline
//!
//! Entries are appended in arrival order and the caller is responsible for
//! keeping server times non-decreasing; nothing is re-sorted here. Pruning is
//! driven by the render time so the buffer always keeps exactly one entry at
//! or before the render time plus everything newer.

use shared::Timestamped;
use std::collections::VecDeque;

/// Where a render time falls relative to the stored history
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Sample<'a, T> {
    /// No usable pair, show this entry as-is
    Latest(&'a T),
    /// Render time lies between two entries
    Between {
        before: &'a T,
        after: &'a T,
        ratio: f64,
    },
}

#[derive(Debug, Clone)]
pub struct HistoryBuffer<T> {
    entries: VecDeque<T>,
}

impl<T> Default for HistoryBuffer<T> {
    fn default() -> Self {
        Self {
            entries: VecDeque::new(),
        }
    }
}

impl<T: Timestamped> HistoryBuffer<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: T) {
        self.entries.push_back(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.entries.get(index)
    }

    pub fn latest(&self) -> Option<&T> {
        self.entries.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }

    /// Index of the newest entry at or before `render_time`, scanning from the back
    pub fn find_base_index(&self, render_time: i64) -> Option<usize> {
        self.entries
            .iter()
            .rposition(|entry| (entry.server_time() as i64) <= render_time)
    }

    /// Drops everything older than the base entry for `render_time`.
    ///
    /// Returns the number of entries removed. Nothing is removed when there is
    /// no base entry or the base is already the oldest one.
    pub fn prune(&mut self, render_time: i64) -> usize {
        match self.find_base_index(render_time) {
            Some(base) if base > 0 => {
                self.entries.drain(..base);
                base
            }
            _ => 0,
        }
    }

    /// Drops the oldest entries until at most `max_len` remain, but never the
    /// base entry for `render_time` or anything newer than it.
    pub fn cap(&mut self, max_len: usize, render_time: i64) -> usize {
        let excess = self.entries.len().saturating_sub(max_len);
        let dropped = match self.find_base_index(render_time) {
            Some(base) => excess.min(base),
            None => excess,
        };
        self.entries.drain(..dropped);
        dropped
    }

    /// Locates `render_time` in the history, or `None` when the buffer is empty
    pub fn sample(&self, render_time: i64) -> Option<Sample<'_, T>> {
        let newest = self.entries.back()?;
        let last = self.entries.len() - 1;

        match self.find_base_index(render_time) {
            Some(base) if base < last => {
                let before = &self.entries[base];
                let after = &self.entries[base + 1];
                Some(Sample::Between {
                    before,
                    after,
                    ratio: blend_ratio(before.server_time(), after.server_time(), render_time),
                })
            }
            _ => Some(Sample::Latest(newest)),
        }
    }
}

/// Fraction of the way from `start` to `end` that `at` lies, clamped to [0, 1].
/// A zero or negative span yields 0.
pub fn blend_ratio(start: u64, end: u64, at: i64) -> f64 {
    let span = end as i64 - start as i64;
    if span <= 0 {
        return 0.0;
    }
    ((at - start as i64) as f64 / span as f64).clamp(0.0, 1.0)
}
