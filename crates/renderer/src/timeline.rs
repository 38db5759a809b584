use std::time::{Duration, Instant};

/// Longest step the animation clock will take in one frame, in seconds.
pub const MAX_FRAME_DELTA: f32 = 0.1;

/// Accumulated animation time fed to the shaders.
///
/// Steps are clamped to [`MAX_FRAME_DELTA`] so a stalled frame (window drag,
/// debugger pause, suspended laptop) never makes the field jump.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameClock {
    elapsed: f32,
    delta: f32,
    frame: u64,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances by `real_dt` seconds after clamping and returns the applied step.
    ///
    /// Negative or non-finite deltas count as zero.
    pub fn advance(&mut self, real_dt: f32) -> f32 {
        let dt = if real_dt.is_finite() {
            real_dt.clamp(0.0, MAX_FRAME_DELTA)
        } else {
            0.0
        };
        self.elapsed += dt;
        self.delta = dt;
        self.frame = self.frame.saturating_add(1);
        dt
    }

    /// Jumps straight to `seconds` without counting a frame.
    pub fn seek(&mut self, seconds: f32) {
        self.elapsed = if seconds.is_finite() {
            seconds.max(0.0)
        } else {
            0.0
        };
        self.delta = 0.0;
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn delta(&self) -> f32 {
        self.delta
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }
}

/// Measures real time between successive frames.
///
/// The first call reports zero, so the animation starts from rest.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeltaTimer {
    last: Option<Instant>,
}

impl DeltaTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delta(&mut self, now: Instant) -> f32 {
        let dt = self
            .last
            .map(|last| now.saturating_duration_since(last).as_secs_f32())
            .unwrap_or(0.0);
        self.last = Some(now);
        dt
    }
}

/// `1 − (1 − t)³` with `t` clamped to `[0, 1]`.
pub fn ease_out_cubic(t: f32) -> f32 {
    1.0 - (1.0 - t.clamp(0.0, 1.0)).powi(3)
}

/// Ease-out-cubic intro fade measured in scene time rather than wall-clock
/// instants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FadeEnvelope {
    duration: Duration,
}

impl FadeEnvelope {
    /// Returns `None` for a zero duration; callers treat that as fully faded in.
    pub fn new(duration: Duration) -> Option<Self> {
        if duration.is_zero() {
            None
        } else {
            Some(Self { duration })
        }
    }

    /// Eased progress and whether the fade has completed.
    pub fn progress(&self, elapsed: f32) -> (f32, bool) {
        let progress = elapsed / self.duration.as_secs_f32().max(f32::EPSILON);
        (ease_out_cubic(progress), progress >= 1.0)
    }
}
