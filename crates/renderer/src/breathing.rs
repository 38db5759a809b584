//! Breathing radial gradient: an ellipse of color stops whose size drifts
//! back and forth between two bounds, revealed by an eased fade-in.

use anyhow::Result;

use crate::camera::Backdrop;
use crate::gpu::FlowUniforms;
use crate::gradient::surface_or_default;
use crate::timeline::{FadeEnvelope, FrameClock};
use crate::types::{validate_stops, BreathingParams, Rgb};

/// Scale the gradient starts at before settling to 1 during the fade-in.
pub const INTRO_SCALE: f32 = 1.3;

/// Frame rate assumed when seeking straight to a timestamp.
const SEEK_FRAME_RATE: f32 = 60.0;

/// Frame counts above this jump along the triangle wave instead of stepping.
const EXACT_ADVANCE_FRAMES: u64 = 1 << 16;

/// Oscillating ellipse width in percent.
#[derive(Debug, Clone, PartialEq)]
pub struct BreathingGradient {
    params: BreathingParams,
    width: f32,
    direction: f32,
}

impl BreathingGradient {
    pub fn new(params: BreathingParams) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            width: params.starting_gap,
            direction: 1.0,
            params,
        })
    }

    /// Advances one animation frame.
    pub fn step(&mut self) {
        if !self.params.breathing {
            return;
        }
        let gap = self.params.starting_gap;
        let range = self.params.range;
        if self.width >= gap + range {
            self.direction = -1.0;
        }
        if self.width <= gap - range {
            self.direction = 1.0;
        }
        self.width += self.direction * self.params.speed;
    }

    /// Advances `frames` animation frames.
    pub fn advance(&mut self, frames: u64) {
        if frames <= EXACT_ADVANCE_FRAMES || !self.params.breathing {
            for _ in 0..frames.min(EXACT_ADVANCE_FRAMES) {
                self.step();
            }
            return;
        }

        let speed = f64::from(self.params.speed);
        let range = f64::from(self.params.range);
        let span = 2.0 * range;
        if !(speed > 0.0 && speed.is_finite() && span > 0.0 && span.is_finite()) {
            // Degenerate bands flip every frame at most.
            for _ in 0..frames % 2 {
                self.step();
            }
            return;
        }

        // Unfold (width, direction) into a phase along one up-and-down cycle.
        let lower = f64::from(self.params.starting_gap) - range;
        let offset = (f64::from(self.width) - lower).clamp(0.0, span);
        let phase = if self.direction > 0.0 {
            offset
        } else {
            2.0 * span - offset
        };
        let phase = (phase + frames as f64 * speed).rem_euclid(2.0 * span);
        if phase <= span {
            self.width = (lower + phase) as f32;
            self.direction = 1.0;
        } else {
            self.width = (lower + 2.0 * span - phase) as f32;
            self.direction = -1.0;
        }
    }

    pub fn set_breathing(&mut self, breathing: bool) {
        self.params.breathing = breathing;
    }

    pub fn set_colors(&mut self, colors: Vec<Rgb>, stops: Vec<f32>) -> Result<()> {
        validate_stops(&colors, &stops)?;
        self.params.colors = colors;
        self.params.stops = stops;
        Ok(())
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn direction(&self) -> f32 {
        self.direction
    }

    /// Horizontal and vertical ellipse radii in percent.
    pub fn radii(&self) -> (f32, f32) {
        (self.width, self.width + self.params.top_offset)
    }

    pub fn params(&self) -> &BreathingParams {
        &self.params
    }
}

/// Opacity and scale of the intro after `elapsed` seconds.
pub fn intro_fade(envelope: Option<&FadeEnvelope>, elapsed: f32) -> (f32, f32) {
    let opacity = match envelope {
        Some(envelope) => envelope.progress(elapsed).0,
        None => 1.0,
    };
    (opacity, INTRO_SCALE - (INTRO_SCALE - 1.0) * opacity)
}

/// Breathing gradient bound to a surface.
#[derive(Debug, Clone)]
pub struct BreathingScene {
    gradient: BreathingGradient,
    backdrop: Backdrop,
    clock: FrameClock,
    fade: Option<FadeEnvelope>,
    since_start: f32,
    uniforms: FlowUniforms,
}

impl BreathingScene {
    pub fn new(params: BreathingParams, width: u32, height: u32) -> Result<Self> {
        let (width, height) = surface_or_default(width, height);
        let fade = FadeEnvelope::new(params.fade_in);
        let gradient = BreathingGradient::new(params)?;
        let backdrop = Backdrop::new(width, height);
        let mut uniforms = FlowUniforms::new(width, height);
        uniforms.set_view_projection(backdrop.camera().view_projection());
        let mut scene = Self {
            gradient,
            backdrop,
            clock: FrameClock::new(),
            fade,
            since_start: 0.0,
            uniforms,
        };
        scene.sync_uniforms();
        Ok(scene)
    }

    /// Steps the breathing width once and advances the fade by the raw delta.
    pub fn tick(&mut self, real_dt: f32) -> f32 {
        if real_dt.is_finite() && real_dt > 0.0 {
            self.since_start += real_dt;
        }
        let dt = self.clock.advance(real_dt);
        self.gradient.step();
        self.sync_uniforms();
        dt
    }

    /// Replays the animation up to `seconds` at a fixed frame rate.
    pub fn seek(&mut self, seconds: f32) {
        let seconds = if seconds.is_finite() {
            seconds.max(0.0)
        } else {
            0.0
        };
        let frames = (seconds * SEEK_FRAME_RATE).round() as u64;
        self.gradient.advance(frames);
        self.since_start = seconds;
        self.clock.seek(seconds);
        self.sync_uniforms();
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.backdrop.resize(width, height);
        self.uniforms.set_resolution(width, height);
        self.uniforms
            .set_view_projection(self.backdrop.camera().view_projection());
    }

    pub fn gradient(&self) -> &BreathingGradient {
        &self.gradient
    }

    pub fn gradient_mut(&mut self) -> &mut BreathingGradient {
        &mut self.gradient
    }

    pub fn backdrop(&self) -> &Backdrop {
        &self.backdrop
    }

    /// Current intro opacity and scale.
    pub fn fade(&self) -> (f32, f32) {
        intro_fade(self.fade.as_ref(), self.since_start)
    }

    pub fn time(&self) -> f32 {
        self.clock.elapsed()
    }

    pub(crate) fn uniforms(&self) -> &FlowUniforms {
        &self.uniforms
    }

    fn sync_uniforms(&mut self) {
        let params = self.gradient.params();
        self.uniforms.set_stops(&params.colors, &params.stops);
        let (radius_x, radius_y) = self.gradient.radii();
        self.uniforms
            .set_ellipse(radius_x, radius_y, params.center);
        let (opacity, scale) = self.fade();
        self.uniforms.set_fade(opacity, scale);
        self.uniforms.set_clock(
            self.clock.elapsed(),
            self.clock.delta(),
            self.clock.frame(),
        );
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn params() -> BreathingParams {
        BreathingParams {
            starting_gap: 100.0,
            range: 1.0,
            speed: 0.5,
            ..BreathingParams::default()
        }
    }

    #[test]
    fn width_turns_around_at_upper_bound() {
        let mut gradient = BreathingGradient::new(params()).expect("gradient");
        for _ in 0..2 {
            gradient.step();
        }
        assert_eq!(gradient.width(), 101.0);
        gradient.step();
        assert_eq!(gradient.direction(), -1.0);
        assert_eq!(gradient.width(), 100.5);
    }

    #[test]
    fn width_turns_around_at_lower_bound() {
        let mut gradient = BreathingGradient::new(params()).expect("gradient");
        let mut lowest = f32::MAX;
        for _ in 0..20 {
            gradient.step();
            lowest = lowest.min(gradient.width());
        }
        assert!(lowest >= 99.0 - 0.5);
        assert!(gradient.width() <= 101.0 + 0.5);
    }

    #[test]
    fn paused_gradient_holds_width() {
        let mut gradient = BreathingGradient::new(params()).expect("gradient");
        gradient.set_breathing(false);
        gradient.step();
        assert_eq!(gradient.width(), 100.0);
    }

    #[test]
    fn set_colors_rejects_mismatch() {
        let mut gradient = BreathingGradient::new(params()).expect("gradient");
        let err = gradient
            .set_colors(vec![[0.0; 3], [1.0; 3]], vec![0.0])
            .expect_err("mismatch");
        assert!(err.to_string().contains("2 colors but 1 stops"));
        gradient
            .set_colors(vec![[0.0; 3], [1.0; 3]], vec![0.0, 100.0])
            .expect("valid stops");
        assert_eq!(gradient.params().colors.len(), 2);
    }

    #[test]
    fn intro_fade_eases_opacity_and_scale() {
        let envelope = FadeEnvelope::new(Duration::from_secs(2));
        let (opacity, scale) = intro_fade(envelope.as_ref(), 0.0);
        assert_eq!(opacity, 0.0);
        assert!((scale - INTRO_SCALE).abs() < 1e-6);
        let (opacity, scale) = intro_fade(envelope.as_ref(), 1.0);
        assert!((opacity - 0.875).abs() < 1e-6);
        assert!((scale - (1.3 - 0.3 * 0.875)).abs() < 1e-6);
        let (opacity, scale) = intro_fade(envelope.as_ref(), 5.0);
        assert_eq!(opacity, 1.0);
        assert!((scale - 1.0).abs() < 1e-6);
        assert_eq!(intro_fade(None, 0.0).0, 1.0);
    }

    #[test]
    fn scene_tracks_fade_with_unclamped_time() {
        let mut scene = BreathingScene::new(BreathingParams::default(), 400, 300).expect("scene");
        scene.tick(0.5);
        scene.tick(0.5);
        let (opacity, _) = scene.fade();
        assert!((opacity - 0.875).abs() < 1e-5);
        assert!(scene.time() <= 0.2 + 1e-6);
        assert_eq!(scene.uniforms().clock[2], opacity);
    }

    #[test]
    fn seek_replays_frames() {
        let mut scene = BreathingScene::new(params(), 400, 300).expect("scene");
        scene.seek(2.0 / SEEK_FRAME_RATE);
        assert_eq!(scene.gradient().width(), 101.0);
        assert_eq!(scene.uniforms().breath[0], 101.0);
    }

    #[test]
    fn long_advance_matches_stepping() {
        let frames = EXACT_ADVANCE_FRAMES + 13;
        let mut stepped = BreathingGradient::new(params()).expect("gradient");
        for _ in 0..frames {
            stepped.step();
        }
        let mut jumped = BreathingGradient::new(params()).expect("gradient");
        jumped.advance(frames);
        assert_eq!(jumped.width(), stepped.width());
        assert_eq!(jumped.direction(), stepped.direction());
    }

    #[test]
    fn huge_seek_lands_inside_band() {
        let started = std::time::Instant::now();
        let defaults = BreathingParams::default();
        let (gap, range, speed) = (defaults.starting_gap, defaults.range, defaults.speed);
        let mut scene = BreathingScene::new(defaults, 400, 300).expect("scene");
        scene.seek(1.0e12);
        let width = scene.gradient().width();
        assert!(width >= gap - range - speed, "width {width}");
        assert!(width <= gap + range + speed, "width {width}");
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn paused_gradient_ignores_long_advance() {
        let mut gradient = BreathingGradient::new(params()).expect("gradient");
        gradient.set_breathing(false);
        gradient.advance(u64::MAX);
        assert_eq!(gradient.width(), 100.0);
    }
}
