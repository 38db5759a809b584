use bytemuck::{Pod, Zeroable};

use crate::camera::Mat4;
use crate::types::{FlowParams, Rgb, MAX_GRADIENT_STOPS};

/// Uniform block shared by both fragment programs.
///
/// Layout must match `FlowParams` in the GLSL header. Every member is a vec4
/// or mat4 so std140 adds no padding. The breathing program reuses the color
/// table: stop positions ride in `colors[i][3]` and the stop count in
/// `dark_base[3]`.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub(crate) struct FlowUniforms {
    pub view_proj: Mat4,
    /// time, delta, fade, frame
    pub clock: [f32; 4],
    /// width, height, aspect, scene scale
    pub resolution: [f32; 4],
    pub colors: [[f32; 4]; MAX_GRADIENT_STOPS],
    pub dark_base: [f32; 4],
    /// speed, intensity, grain, blob size
    pub motion: [f32; 4],
    /// color1 weight, color2 weight, distortion, ripple
    pub weights: [f32; 4],
    /// radius x %, radius y %, center x, center y
    pub breath: [f32; 4],
}

impl FlowUniforms {
    pub fn new(width: u32, height: u32) -> Self {
        let mut uniforms = Self::zeroed();
        uniforms.set_resolution(width, height);
        uniforms.clock[2] = 1.0;
        uniforms.resolution[3] = 1.0;
        uniforms
    }

    pub fn set_resolution(&mut self, width: u32, height: u32) {
        let (w, h) = (width as f32, height as f32);
        self.resolution[0] = w;
        self.resolution[1] = h;
        self.resolution[2] = if h > 0.0 { w / h } else { 1.0 };
    }

    pub fn set_view_projection(&mut self, matrix: Mat4) {
        self.view_proj = matrix;
    }

    pub fn set_clock(&mut self, time: f32, delta: f32, frame: u64) {
        self.clock[0] = time;
        self.clock[1] = delta;
        self.clock[3] = frame as f32;
    }

    pub fn set_fade(&mut self, opacity: f32, scale: f32) {
        self.clock[2] = opacity;
        self.resolution[3] = scale;
    }

    pub fn set_flow(&mut self, params: &FlowParams) {
        for (slot, color) in self.colors.iter_mut().zip(params.colors) {
            *slot = rgba(color, 0.0);
        }
        self.dark_base = rgba(params.dark_base, 0.0);
        self.motion = [
            params.speed,
            params.intensity,
            params.grain,
            params.gradient_size,
        ];
        self.weights = [
            params.color1_weight,
            params.color2_weight,
            params.distortion,
            params.ripple,
        ];
    }

    /// Writes the stop table; entries past `colors.len()` are zeroed.
    pub fn set_stops(&mut self, colors: &[Rgb], stops: &[f32]) {
        self.colors = [[0.0; 4]; MAX_GRADIENT_STOPS];
        for ((slot, color), stop) in self.colors.iter_mut().zip(colors).zip(stops) {
            *slot = rgba(*color, stop / 100.0);
        }
        self.dark_base = [0.0, 0.0, 0.0, colors.len().min(MAX_GRADIENT_STOPS) as f32];
    }

    pub fn set_ellipse(&mut self, radius_x: f32, radius_y: f32, center: [f32; 2]) {
        self.breath = [radius_x, radius_y, center[0], center[1]];
    }

    pub fn time(&self) -> f32 {
        self.clock[0]
    }

    pub fn resolution(&self) -> (f32, f32) {
        (self.resolution[0], self.resolution[1])
    }
}

fn rgba(color: Rgb, w: f32) -> [f32; 4] {
    [color[0], color[1], color[2], w]
}
