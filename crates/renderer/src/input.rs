//! Pointer capture: throttling, normalization, and cross-thread delivery.

use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, TryIter};

use crate::touch::TouchPoint;
use crate::types::DEFAULT_POINTER_THROTTLE;

/// Drops samples that arrive closer together than the configured interval.
#[derive(Debug, Clone, Copy)]
pub struct PointerThrottle {
    interval: Duration,
    last: Option<Instant>,
}

impl Default for PointerThrottle {
    fn default() -> Self {
        Self::new(DEFAULT_POINTER_THROTTLE)
    }
}

impl PointerThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    /// Returns `true` and records `now` if a sample may pass.
    pub fn accept(&mut self, now: Instant) -> bool {
        if let Some(last) = self.last {
            if now.saturating_duration_since(last) < self.interval {
                return false;
            }
        }
        self.last = Some(now);
        true
    }
}

/// Maps a pixel position (top-left origin) to `[0, 1]` with y pointing up.
///
/// Returns `None` while the surface has no area.
pub fn normalize_pointer(x: f64, y: f64, width: u32, height: u32) -> Option<TouchPoint> {
    if width == 0 || height == 0 {
        return None;
    }
    Some(TouchPoint::new(
        (x / width as f64) as f32,
        (1.0 - y / height as f64) as f32,
    ))
}

/// Window-side input handling for the frame loop thread.
#[derive(Debug, Clone, Default)]
pub struct InputAdapter {
    throttle: PointerThrottle,
}

impl InputAdapter {
    pub fn new(throttle: Duration) -> Self {
        Self {
            throttle: PointerThrottle::new(throttle),
        }
    }

    /// Converts a raw pointer or touch position into a trail sample.
    pub fn pointer_moved(
        &mut self,
        now: Instant,
        position: (f64, f64),
        surface: (u32, u32),
    ) -> Option<TouchPoint> {
        if !self.throttle.accept(now) {
            return None;
        }
        normalize_pointer(position.0, position.1, surface.0, surface.1)
    }
}

/// Creates the channel used to inject touches from other threads.
pub fn touch_channel() -> (TouchSender, TouchReceiver) {
    let (sender, receiver) = crossbeam_channel::unbounded();
    (TouchSender(sender), TouchReceiver(receiver))
}

/// Cloneable handle for sending normalized touches to the frame loop.
#[derive(Debug, Clone)]
pub struct TouchSender(Sender<TouchPoint>);

impl TouchSender {
    /// Queues a sample; returns `false` once the frame loop has gone away.
    pub fn send(&self, point: TouchPoint) -> bool {
        self.0.send(point).is_ok()
    }
}

/// Loop-side end of [`touch_channel`].
#[derive(Debug)]
pub struct TouchReceiver(Receiver<TouchPoint>);

impl TouchReceiver {
    /// Everything queued so far, without blocking.
    pub fn drain(&self) -> TryIter<'_, TouchPoint> {
        self.0.try_iter()
    }
}
