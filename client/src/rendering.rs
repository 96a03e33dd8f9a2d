use crate::state::WorldView;
use log::{debug, info};

/// Per-frame status shown alongside the world
#[derive(Debug, Clone, Default)]
pub struct FrameStatus {
    pub client_id: Option<u32>,
    pub connection_lost: bool,
    pub server_tps: f32,
    pub darkness: f32,
    pub ping_ms: u64,
    pub fake_ping_ms: u64,
}

/// Pull-only consumer of the client's current state
pub trait Renderer {
    fn is_open(&self) -> bool;
    fn render(&mut self, view: Option<&WorldView>, status: &FrameStatus);
}

/// Headless renderer that summarizes frames to the log
pub struct LogRenderer {
    frames: u64,
    log_every: u64,
    max_frames: Option<u64>,
    was_lost: bool,
}

impl LogRenderer {
    pub fn new(log_every: u64, max_frames: Option<u64>) -> Self {
        Self {
            frames: 0,
            log_every: log_every.max(1),
            max_frames,
            was_lost: false,
        }
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl Renderer for LogRenderer {
    fn is_open(&self) -> bool {
        self.max_frames.map_or(true, |max| self.frames < max)
    }

    fn render(&mut self, view: Option<&WorldView>, status: &FrameStatus) {
        self.frames += 1;

        if status.connection_lost != self.was_lost {
            self.was_lost = status.connection_lost;
            if status.connection_lost {
                info!("Connection lost, showing last known state");
            } else {
                info!("Connection restored");
            }
        }

        if self.frames % self.log_every != 0 {
            return;
        }

        match view {
            Some(view) => {
                let (x, y) = view.player.position().unwrap_or_default();
                info!(
                    "Frame {}: player {} at ({:.1}, {:.1}), {} others, {} entities, {} independent | ping {}ms (+{}ms fake), server {:.1} tps, darkness {:.2}",
                    self.frames,
                    view.player.id,
                    x,
                    y,
                    view.others.len(),
                    view.entities.len(),
                    view.independent.len(),
                    status.ping_ms,
                    status.fake_ping_ms,
                    status.server_tps,
                    status.darkness,
                );
            }
            None => debug!("Frame {}: nothing to render yet", self.frames),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_renderer_closes_after_max_frames() {
        let mut renderer = LogRenderer::new(10, Some(3));
        let status = FrameStatus::default();
        for _ in 0..3 {
            assert!(renderer.is_open());
            renderer.render(None, &status);
        }
        assert!(!renderer.is_open());
        assert_eq!(renderer.frames(), 3);
    }

    #[test]
    fn test_log_renderer_unbounded() {
        let mut renderer = LogRenderer::new(0, None);
        renderer.render(None, &FrameStatus::default());
        assert!(renderer.is_open());
    }
}
