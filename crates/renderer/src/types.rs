use std::time::Duration;

use anyhow::Result;

use crate::runtime::RenderPolicy;

/// Linear RGB triple with components in `[0, 1]`.
pub type Rgb = [f32; 3];

/// Maximum number of color stops the breathing program can interpolate.
pub const MAX_GRADIENT_STOPS: usize = 6;

/// Default pointer sampling interval (~30 Hz).
pub const DEFAULT_POINTER_THROTTLE: Duration = Duration::from_millis(32);

/// Which fragment program drives the backdrop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scene {
    /// Six-blob color field distorted by the pointer trail.
    #[default]
    Flow,
    /// Breathing radial gradient.
    Breathing,
}

impl std::fmt::Display for Scene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scene::Flow => f.write_str("flow"),
            Scene::Breathing => f.write_str("breathing"),
        }
    }
}

/// Tunables for the flow gradient program.
///
/// Defaults reproduce the warm rust/cream palette the effect was designed with.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowParams {
    /// Base colors of the six orbiting blobs.
    pub colors: [Rgb; 6],
    /// Color the field falls back to in dark regions.
    pub dark_base: Rgb,
    /// Clear color behind the backdrop plane.
    pub background: Rgb,
    /// Global animation speed multiplier.
    pub speed: f32,
    /// Brightness multiplier applied after the blob sum is clamped.
    pub intensity: f32,
    /// Amplitude of the per-pixel grain.
    pub grain: f32,
    /// Radius of each blob's influence in UV units.
    pub gradient_size: f32,
    /// Weight applied to blobs 1, 3 and 5.
    pub color1_weight: f32,
    /// Weight applied to blobs 2, 4 and 6.
    pub color2_weight: f32,
    /// How far the stored trail velocity displaces sampling coordinates.
    pub distortion: f32,
    /// Amplitude of the radial ripple driven by trail intensity.
    pub ripple: f32,
}

impl Default for FlowParams {
    fn default() -> Self {
        Self {
            colors: [
                [0.77, 0.36, 0.24],
                [0.18, 0.16, 0.15],
                [0.83, 0.45, 0.35],
                [0.12, 0.11, 0.09],
                [0.79, 0.65, 0.36],
                [0.15, 0.14, 0.12],
            ],
            dark_base: [0.07, 0.067, 0.059],
            background: rgb_from_hex(0x12110f),
            speed: 0.6,
            intensity: 1.1,
            grain: 0.04,
            gradient_size: 0.5,
            color1_weight: 0.4,
            color2_weight: 1.0,
            distortion: 0.25,
            ripple: 0.012,
        }
    }
}

/// Tunables for the breathing radial gradient.
#[derive(Debug, Clone, PartialEq)]
pub struct BreathingParams {
    /// Resting ellipse size as a percentage of the surface.
    pub starting_gap: f32,
    /// Whether the ellipse oscillates at all.
    pub breathing: bool,
    /// Oscillation half-range in percent.
    pub range: f32,
    /// Percent the ellipse grows or shrinks per frame.
    pub speed: f32,
    /// Extra vertical size in percent.
    pub top_offset: f32,
    /// Ellipse center in fractions of the surface, top-left origin.
    pub center: [f32; 2],
    /// Stop colors.
    pub colors: Vec<Rgb>,
    /// Stop positions in percent, one per color.
    pub stops: Vec<f32>,
    /// Duration of the opacity/scale intro.
    pub fade_in: Duration,
}

impl Default for BreathingParams {
    fn default() -> Self {
        Self {
            starting_gap: 120.0,
            breathing: true,
            range: 10.0,
            speed: 0.02,
            top_offset: 0.0,
            center: [0.5, 0.3],
            colors: vec![
                rgb_from_hex(0x0a0a0f),
                rgb_from_hex(0x1a1a2e),
                rgb_from_hex(0x6366f1),
                rgb_from_hex(0xa855f7),
                rgb_from_hex(0x0a0a0f),
            ],
            stops: vec![0.0, 30.0, 55.0, 75.0, 100.0],
            fade_in: Duration::from_millis(2000),
        }
    }
}

impl BreathingParams {
    /// Checks that colors and stops line up and fit the shader's stop table.
    pub fn validate(&self) -> Result<()> {
        validate_stops(&self.colors, &self.stops)
    }
}

pub(crate) fn validate_stops(colors: &[Rgb], stops: &[f32]) -> Result<()> {
    if colors.len() != stops.len() {
        anyhow::bail!(
            "gradient has {} colors but {} stops",
            colors.len(),
            stops.len()
        );
    }
    if colors.len() < 2 || colors.len() > MAX_GRADIENT_STOPS {
        anyhow::bail!(
            "gradient needs between 2 and {} stops, got {}",
            MAX_GRADIENT_STOPS,
            colors.len()
        );
    }
    let mut previous = f32::NEG_INFINITY;
    for &stop in stops {
        if !(0.0..=100.0).contains(&stop) {
            anyhow::bail!("gradient stop {stop} is outside 0-100");
        }
        if stop < previous {
            anyhow::bail!("gradient stops must be non-decreasing");
        }
        previous = stop;
    }
    Ok(())
}

/// Converts a packed `0xRRGGBB` value into an [`Rgb`] triple.
pub fn rgb_from_hex(value: u32) -> Rgb {
    [
        ((value >> 16) & 0xff) as f32 / 255.0,
        ((value >> 8) & 0xff) as f32 / 255.0,
        (value & 0xff) as f32 / 255.0,
    ]
}

/// Output color handling for the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorSpaceMode {
    /// Shader output is already display-encoded; pick a non-sRGB swapchain.
    #[default]
    Auto,
    /// Treat shader outputs as gamma-encoded; use non-sRGB surfaces.
    Gamma,
    /// Treat shader outputs as linear and let an sRGB swapchain encode them.
    Linear,
}

/// Anti-aliasing policy for the render pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Antialiasing {
    /// Pick the highest sample count supported by the surface format.
    #[default]
    Auto,
    /// Disable MSAA and render directly into the swapchain.
    Off,
    /// Request a specific MSAA sample count (clamped to what the device supports).
    Samples(u32),
}

/// Immutable configuration passed to the renderer at start-up.
///
/// Built once by the CLI from the config file and flags, then handed to
/// [`crate::Renderer::new`]. Nothing else in the crate reads global state.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Window size in physical pixels.
    pub surface_size: (u32, u32),
    /// Fragment program to run.
    pub scene: Scene,
    /// Flow gradient tunables.
    pub flow: FlowParams,
    /// Breathing gradient tunables.
    pub breathing: BreathingParams,
    /// Minimum spacing between processed pointer samples.
    pub pointer_throttle: Duration,
    /// Anti-aliasing mode requested by the caller.
    pub antialiasing: Antialiasing,
    /// Desired color handling for the swapchain.
    pub color_space: ColorSpaceMode,
    /// Animate in a window or export a still frame.
    pub policy: RenderPolicy,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            surface_size: (1920, 1080),
            scene: Scene::default(),
            flow: FlowParams::default(),
            breathing: BreathingParams::default(),
            pointer_throttle: DEFAULT_POINTER_THROTTLE,
            antialiasing: Antialiasing::default(),
            color_space: ColorSpaceMode::default(),
            policy: RenderPolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_conversion_matches_palette() {
        let midnight = rgb_from_hex(0x12110f);
        assert!((midnight[0] - 18.0 / 255.0).abs() < 1e-6);
        assert!((midnight[1] - 17.0 / 255.0).abs() < 1e-6);
        assert!((midnight[2] - 15.0 / 255.0).abs() < 1e-6);
    }

    #[test]
    fn default_breathing_stops_are_valid() {
        BreathingParams::default().validate().expect("defaults validate");
    }

    #[test]
    fn rejects_mismatched_or_unsorted_stops() {
        let colors = vec![[0.0; 3], [1.0; 3]];
        assert!(validate_stops(&colors, &[0.0]).is_err());
        assert!(validate_stops(&colors, &[60.0, 40.0]).is_err());
        assert!(validate_stops(&colors, &[0.0, 140.0]).is_err());
        assert!(validate_stops(&colors[..1], &[0.0]).is_err());
        assert!(validate_stops(&colors, &[10.0, 10.0]).is_ok());
    }
}
