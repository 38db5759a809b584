use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// High-level behaviour requested by the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderPolicy {
    /// Open a window and animate until closed, optionally capping the frame rate.
    Animate {
        /// Optional requested frames-per-second cap.
        target_fps: Option<f32>,
    },
    /// Render one frame on the CPU and write it to disk as PNG.
    Export {
        /// Scene time to evaluate, in seconds.
        time: f32,
        /// Destination path for the exported file.
        path: PathBuf,
    },
}

impl Default for RenderPolicy {
    fn default() -> Self {
        Self::Animate { target_fps: None }
    }
}

/// Shared running flag for the frame loop.
///
/// Clones share the flag, so any thread holding one can call [`FrameLoop::stop`].
/// Once stopped, the next scheduled tick does nothing and the window loop exits.
#[derive(Debug, Clone)]
pub struct FrameLoop {
    running: Arc<AtomicBool>,
}

impl Default for FrameLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameLoop {
    pub fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
    }
}

/// Paces redraws when a frame-rate cap is configured.
#[derive(Debug, Clone, Copy)]
pub struct FrameScheduler {
    interval: Option<Duration>,
    last: Option<Instant>,
}

impl FrameScheduler {
    pub fn new(target_fps: Option<f32>) -> Self {
        let interval = target_fps
            .filter(|fps| fps.is_finite() && *fps > 0.0)
            .and_then(|fps| Duration::try_from_secs_f32(1.0 / fps).ok());
        Self {
            interval,
            last: None,
        }
    }

    pub fn ready(&self, now: Instant) -> bool {
        self.next_deadline().map_or(true, |deadline| now >= deadline)
    }

    pub fn mark_rendered(&mut self, now: Instant) {
        self.last = Some(now);
    }

    /// When the next frame is due, or `None` when uncapped or nothing has rendered yet.
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.interval, self.last) {
            (Some(interval), Some(last)) => Some(last + interval),
            _ => None,
        }
    }
}
