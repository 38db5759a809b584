//! Decaying pointer trail rasterized into a small RGBA texture.
//!
//! Every accepted pointer sample becomes a [`TrailPoint`] that drifts along
//! its direction of travel, ages one step per [`TouchTexture::update`], and
//! is drawn as a soft glow into a 64×64 bitmap. The fragment program reads the
//! bitmap back as a displacement field:
//!
//! - red/green hold the direction of travel remapped from `[-1, 1]` to `[0, 1]`
//! - blue holds the point's current intensity
//!
//! The raster is rebuilt from scratch every update, so the buffer of points is
//! the only state that carries between frames.

use std::f32::consts::FRAC_PI_2;

/// Width and height of the trail raster in texels.
pub const TOUCH_TEXTURE_SIZE: u32 = 64;
/// Number of updates a point survives before it is dropped.
pub const MAX_AGE: u32 = 32;
/// Glow radius as a fraction of the raster width.
pub const GLOW_RADIUS: f32 = 0.1;
/// Drift applied per update, scaled by force and remaining life.
pub const DECAY_SPEED: f32 = 1.0 / 64.0;
/// Converts squared pointer travel into force before clamping to 1.
pub const FORCE_GAIN: f32 = 8000.0;

const GLOW_ALPHA: f32 = 0.2;
const ATTACK_FRACTION: f32 = 0.3;
const BYTES_PER_TEXEL: usize = 4;

/// Normalized pointer position, origin at the bottom-left.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchPoint {
    pub x: f32,
    pub y: f32,
}

impl TouchPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// One sample in the trail buffer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrailPoint {
    pub x: f32,
    pub y: f32,
    /// Unit direction of travel when the sample was taken.
    pub vx: f32,
    pub vy: f32,
    /// Strength in `[0, 1]`; zero for the very first sample.
    pub force: f32,
    /// Updates survived so far.
    pub age: u32,
}

impl TrailPoint {
    /// Brightness the point contributes to the raster at its current age.
    pub fn intensity(&self) -> f32 {
        (age_envelope(self.age as f32, MAX_AGE as f32) * self.force).max(0.0)
    }
}

/// Rise-then-fall brightness curve over a point's life.
///
/// Eases in with a quarter sine over the first 30% of `max_age`, then falls
/// off with an ease-out quadratic, reaching zero at `max_age`.
pub fn age_envelope(age: f32, max_age: f32) -> f32 {
    let attack = max_age * ATTACK_FRACTION;
    if age < attack {
        (age / attack * FRAC_PI_2).sin()
    } else {
        let t = 1.0 - (age - attack) / (max_age * (1.0 - ATTACK_FRACTION));
        -t * (t - 2.0)
    }
}

/// Owner of the trail buffer and its raster.
#[derive(Debug, Clone)]
pub struct TouchTexture {
    trail: Vec<TrailPoint>,
    last: Option<TouchPoint>,
    accum: Vec<[f32; 3]>,
    pixels: Vec<u8>,
    dirty: bool,
}

impl Default for TouchTexture {
    fn default() -> Self {
        Self::new()
    }
}

impl TouchTexture {
    pub fn new() -> Self {
        let texels = (TOUCH_TEXTURE_SIZE * TOUCH_TEXTURE_SIZE) as usize;
        let mut texture = Self {
            trail: Vec::new(),
            last: None,
            accum: vec![[0.0; 3]; texels],
            pixels: vec![0; texels * BYTES_PER_TEXEL],
            dirty: true,
        };
        texture.encode();
        texture
    }

    /// Records a pointer sample.
    ///
    /// Returns `false` when the sample did not move relative to the previous
    /// one; nothing is recorded in that case.
    pub fn add_touch(&mut self, point: TouchPoint) -> bool {
        let (force, vx, vy) = match self.last {
            Some(last) => {
                let dx = point.x - last.x;
                let dy = point.y - last.y;
                if dx == 0.0 && dy == 0.0 {
                    return false;
                }
                let d2 = dx * dx + dy * dy;
                let d = d2.sqrt();
                ((d2 * FORCE_GAIN).min(1.0), dx / d, dy / d)
            }
            None => (0.0, 0.0, 0.0),
        };

        self.last = Some(point);
        self.trail.push(TrailPoint {
            x: point.x,
            y: point.y,
            vx,
            vy,
            force,
            age: 0,
        });
        true
    }

    /// Ages every point by one step and rebuilds the raster.
    pub fn update(&mut self) {
        self.accum.fill([0.0; 3]);

        let mut index = self.trail.len();
        while index > 0 {
            index -= 1;
            let point = &mut self.trail[index];
            let drift = point.force * DECAY_SPEED * (1.0 - point.age as f32 / MAX_AGE as f32);
            point.x += point.vx * drift;
            point.y += point.vy * drift;
            point.age += 1;
            if point.age > MAX_AGE {
                self.trail.remove(index);
            } else {
                let point = *point;
                self.draw(&point);
            }
        }

        self.encode();
        self.dirty = true;
    }

    pub fn trail(&self) -> &[TrailPoint] {
        &self.trail
    }

    pub fn last_position(&self) -> Option<TouchPoint> {
        self.last
    }

    /// RGBA8 texels, row 0 at the top.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let offset = ((y * TOUCH_TEXTURE_SIZE + x) as usize) * BYTES_PER_TEXEL;
        let mut texel = [0; 4];
        texel.copy_from_slice(&self.pixels[offset..offset + BYTES_PER_TEXEL]);
        texel
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Returns whether the raster changed since the last call and clears the flag.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }

    /// Samples the raster with bilinear filtering and clamp-to-edge addressing.
    ///
    /// `s` runs left to right and `t` top to bottom, both in `[0, 1]`, matching
    /// the GPU texture coordinate convention. Channels come back in `[0, 1]`.
    pub fn sample(&self, s: f32, t: f32) -> [f32; 4] {
        let size = TOUCH_TEXTURE_SIZE as f32;
        let max = TOUCH_TEXTURE_SIZE as i32 - 1;
        let fx = s * size - 0.5;
        let fy = t * size - 0.5;
        let x0 = fx.floor();
        let y0 = fy.floor();
        let ax = fx - x0;
        let ay = fy - y0;
        let clamp = |v: f32| (v as i32).clamp(0, max) as u32;
        let (x0i, x1i) = (clamp(x0), clamp(x0 + 1.0));
        let (y0i, y1i) = (clamp(y0), clamp(y0 + 1.0));

        let mut out = [0.0; 4];
        let corners = [
            (x0i, y0i, (1.0 - ax) * (1.0 - ay)),
            (x1i, y0i, ax * (1.0 - ay)),
            (x0i, y1i, (1.0 - ax) * ay),
            (x1i, y1i, ax * ay),
        ];
        for (x, y, weight) in corners {
            let texel = self.pixel(x, y);
            for (channel, value) in out.iter_mut().zip(texel) {
                *channel += value as f32 / 255.0 * weight;
            }
        }
        out
    }

    fn draw(&mut self, point: &TrailPoint) {
        let intensity = point.intensity();
        if intensity <= 0.0 {
            return;
        }

        let size = TOUCH_TEXTURE_SIZE as f32;
        let radius = GLOW_RADIUS * size;
        let sigma = radius * 0.5;
        let reach = radius + 3.0 * sigma;
        let cx = point.x * size;
        let cy = (1.0 - point.y) * size;
        let color = [
            ((point.vx + 1.0) * 0.5).clamp(0.0, 1.0),
            ((point.vy + 1.0) * 0.5).clamp(0.0, 1.0),
            intensity.clamp(0.0, 1.0),
        ];
        let alpha = GLOW_ALPHA * intensity;

        let max = TOUCH_TEXTURE_SIZE as i32 - 1;
        let x_start = ((cx - reach).floor() as i32).clamp(0, max);
        let x_end = ((cx + reach).ceil() as i32).clamp(0, max);
        let y_start = ((cy - reach).floor() as i32).clamp(0, max);
        let y_end = ((cy + reach).ceil() as i32).clamp(0, max);

        for py in y_start..=y_end {
            for px in x_start..=x_end {
                let dx = px as f32 + 0.5 - cx;
                let dy = py as f32 + 0.5 - cy;
                let distance = (dx * dx + dy * dy).sqrt();
                let coverage = blurred_disc(distance, radius, sigma);
                let a = alpha * coverage;
                if a <= 0.0 {
                    continue;
                }
                let texel = &mut self.accum[(py * TOUCH_TEXTURE_SIZE as i32 + px) as usize];
                for (dst, src) in texel.iter_mut().zip(color) {
                    *dst = src * a + *dst * (1.0 - a);
                }
            }
        }
    }

    fn encode(&mut self) {
        for (texel, bytes) in self
            .accum
            .iter()
            .zip(self.pixels.chunks_exact_mut(BYTES_PER_TEXEL))
        {
            for (byte, value) in bytes.iter_mut().zip(texel) {
                *byte = (value.clamp(0.0, 1.0) * 255.0).round() as u8;
            }
            bytes[3] = u8::MAX;
        }
    }
}

/// Coverage of a disc of `radius` blurred by a Gaussian of `sigma`, sampled
/// `distance` away from its center.
fn blurred_disc(distance: f32, radius: f32, sigma: f32) -> f32 {
    0.5 * erfc((distance - radius) / (sigma * std::f32::consts::SQRT_2))
}

// Abramowitz and Stegun 7.1.26, max error 1.5e-7.
fn erfc(x: f32) -> f32 {
    let z = x.abs();
    let t = 1.0 / (1.0 + 0.327_591_1 * z);
    let poly = t
        * (0.254_829_6
            + t * (-0.284_496_74 + t * (1.421_413_8 + t * (-1.453_152_1 + t * 1.061_405_4))));
    let tail = poly * (-z * z).exp();
    if x >= 0.0 {
        tail
    } else {
        2.0 - tail
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn distinct_samples_each_append_a_point() {
        let mut texture = TouchTexture::new();
        for step in 0..5 {
            assert!(texture.add_touch(TouchPoint::new(0.1 * step as f32, 0.2)));
        }
        assert_eq!(texture.trail().len(), 5);
    }

    #[test]
    fn repeated_sample_is_ignored() {
        let mut texture = TouchTexture::new();
        texture.add_touch(TouchPoint::new(0.3, 0.3));
        texture.add_touch(TouchPoint::new(0.4, 0.3));
        let before = texture.trail().len();
        assert!(!texture.add_touch(TouchPoint::new(0.4, 0.3)));
        assert_eq!(texture.trail().len(), before);
        assert_eq!(texture.last_position(), Some(TouchPoint::new(0.4, 0.3)));
    }

    #[test]
    fn first_sample_has_no_force() {
        let mut texture = TouchTexture::new();
        texture.add_touch(TouchPoint::new(0.5, 0.5));
        let first = texture.trail()[0];
        assert_eq!(first.force, 0.0);
        assert_eq!((first.vx, first.vy), (0.0, 0.0));
        assert_eq!(first.intensity(), 0.0);
    }

    #[test]
    fn force_scales_with_squared_distance() {
        let mut texture = TouchTexture::new();
        texture.add_touch(TouchPoint::new(0.5, 0.5));
        texture.add_touch(TouchPoint::new(0.5, 0.505));
        let point = texture.trail()[1];
        assert!(approx(point.force, 0.005 * 0.005 * FORCE_GAIN));
        assert!(approx(point.vx, 0.0));
        assert!(approx(point.vy, 1.0));
    }

    #[test]
    fn swipe_then_decay_empties_buffer() {
        let mut texture = TouchTexture::new();
        texture.add_touch(TouchPoint::new(0.5, 0.5));
        texture.add_touch(TouchPoint::new(0.6, 0.5));
        assert_eq!(texture.trail().len(), 2);
        let latest = texture.trail()[1];
        assert!(approx(latest.vx, 1.0));
        assert!(approx(latest.vy, 0.0));
        assert!(approx(latest.force, 1.0));

        for _ in 0..MAX_AGE {
            texture.update();
        }
        assert_eq!(texture.trail().len(), 2);
        texture.update();
        assert!(texture.trail().is_empty());
    }

    #[test]
    fn update_ages_points_by_one() {
        let mut texture = TouchTexture::new();
        texture.add_touch(TouchPoint::new(0.2, 0.2));
        texture.add_touch(TouchPoint::new(0.25, 0.2));
        for expected in 1..=10 {
            texture.update();
            for point in texture.trail() {
                assert_eq!(point.age, expected);
                assert!(point.age <= MAX_AGE);
            }
        }
    }

    #[test]
    fn points_drift_along_their_direction() {
        let mut texture = TouchTexture::new();
        texture.add_touch(TouchPoint::new(0.5, 0.5));
        texture.add_touch(TouchPoint::new(0.6, 0.5));
        texture.update();
        let moved = texture.trail()[1];
        assert!(approx(moved.x, 0.6 + DECAY_SPEED));
        assert!(approx(moved.y, 0.5));
        let still = texture.trail()[0];
        assert!(approx(still.x, 0.5));
    }

    #[test]
    fn envelope_rises_then_falls() {
        let max = MAX_AGE as f32;
        assert!(approx(age_envelope(0.0, max), 0.0));
        assert!(approx(age_envelope(max * 0.3, max), 1.0));
        assert!(age_envelope(max, max).abs() < 1e-3);
        assert!(age_envelope(4.0, max) < age_envelope(8.0, max));
        assert!(age_envelope(20.0, max) > age_envelope(28.0, max));
        for age in 0..=MAX_AGE {
            let value = age_envelope(age as f32, max);
            assert!(value <= 1.0 + 1e-6);
            assert!(value >= -1e-3);
        }
    }

    #[test]
    fn empty_trail_rasterizes_black() {
        let mut texture = TouchTexture::new();
        texture.update();
        assert!(texture
            .pixels()
            .chunks_exact(4)
            .all(|texel| texel == [0, 0, 0, 255]));
    }

    #[test]
    fn raster_encodes_direction_and_intensity() {
        let mut texture = TouchTexture::new();
        texture.add_touch(TouchPoint::new(0.5, 0.5));
        texture.add_touch(TouchPoint::new(0.6, 0.5));
        for _ in 0..10 {
            texture.update();
        }
        let point = texture.trail()[1];
        let cx = (point.x * TOUCH_TEXTURE_SIZE as f32) as u32;
        let cy = ((1.0 - point.y) * TOUCH_TEXTURE_SIZE as f32) as u32;
        let [r, g, b, a] = texture.pixel(cx, cy);
        assert_eq!(a, 255);
        assert!(b > 0, "intensity is written to blue");
        // Moving right: red carries (1 + 1) / 2, green (0 + 1) / 2.
        assert!(r > g);
        assert!(g > 0);

        let [fr, fg, fb, _] = texture.pixel(2, 2);
        assert_eq!((fr, fg, fb), (0, 0, 0));
    }

    #[test]
    fn glow_is_centered_with_y_flipped() {
        let mut texture = TouchTexture::new();
        texture.add_touch(TouchPoint::new(0.2, 0.8));
        texture.add_touch(TouchPoint::new(0.2, 0.85));
        for _ in 0..8 {
            texture.update();
        }
        // y near the top in normalized space lands in the top rows of the raster.
        let top = texture.pixel(13, 10)[2];
        let bottom = texture.pixel(13, 54)[2];
        assert!(top > bottom);
    }

    #[test]
    fn dirty_flag_is_taken_once() {
        let mut texture = TouchTexture::new();
        assert!(texture.take_dirty());
        assert!(!texture.take_dirty());
        texture.update();
        assert!(texture.is_dirty());
        assert!(texture.take_dirty());
    }

    #[test]
    fn bilinear_sample_matches_texel_centers() {
        let mut texture = TouchTexture::new();
        texture.add_touch(TouchPoint::new(0.5, 0.5));
        texture.add_touch(TouchPoint::new(0.55, 0.5));
        for _ in 0..6 {
            texture.update();
        }
        let size = TOUCH_TEXTURE_SIZE as f32;
        let texel = texture.pixel(35, 32);
        let sampled = texture.sample(35.5 / size, 32.5 / size);
        for channel in 0..4 {
            assert!((sampled[channel] - texel[channel] as f32 / 255.0).abs() < 1e-5);
        }
        let corner = texture.sample(-1.0, 2.0);
        assert_eq!(corner[3], 1.0);
    }

    #[test]
    fn erfc_matches_reference_points() {
        assert!(approx(erfc(0.0), 1.0));
        assert!((erfc(1.0) - 0.157_299_2).abs() < 1e-5);
        assert!((erfc(-1.0) - 1.842_700_8).abs() < 1e-5);
    }
}
