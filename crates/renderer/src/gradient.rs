//! CPU side of the flow gradient: everything the draw call needs except GPU
//! handles.

use crate::camera::Backdrop;
use crate::gpu::FlowUniforms;
use crate::timeline::FrameClock;
use crate::touch::{TouchPoint, TouchTexture};
use crate::types::FlowParams;

/// Surface size assumed when the host reports a zero-sized window.
pub const DEFAULT_SURFACE_SIZE: (u32, u32) = (1280, 720);

/// Animated six-blob field distorted by the pointer trail.
#[derive(Debug, Clone)]
pub struct FlowGradient {
    params: FlowParams,
    touch: TouchTexture,
    backdrop: Backdrop,
    clock: FrameClock,
    uniforms: FlowUniforms,
}

impl FlowGradient {
    pub fn new(params: FlowParams, width: u32, height: u32) -> Self {
        let (width, height) = surface_or_default(width, height);
        let backdrop = Backdrop::new(width, height);
        let mut uniforms = FlowUniforms::new(width, height);
        uniforms.set_flow(&params);
        uniforms.set_view_projection(backdrop.camera().view_projection());
        Self {
            params,
            touch: TouchTexture::new(),
            backdrop,
            clock: FrameClock::new(),
            uniforms,
        }
    }

    /// Feeds one normalized pointer sample into the trail.
    pub fn add_touch(&mut self, point: TouchPoint) {
        self.touch.add_touch(point);
    }

    /// Steps the animation by `real_dt` seconds and refreshes the trail raster.
    ///
    /// Returns the step actually applied after clamping.
    pub fn tick(&mut self, real_dt: f32) -> f32 {
        let dt = self.clock.advance(real_dt);
        self.touch.update();
        self.uniforms
            .set_clock(self.clock.elapsed(), dt, self.clock.frame());
        dt
    }

    /// Jumps the clock to `seconds`, used for still frames.
    pub fn seek(&mut self, seconds: f32) {
        self.clock.seek(seconds);
        self.uniforms
            .set_clock(self.clock.elapsed(), 0.0, self.clock.frame());
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.backdrop.resize(width, height);
        self.uniforms.set_resolution(width, height);
        self.uniforms
            .set_view_projection(self.backdrop.camera().view_projection());
    }

    pub fn params(&self) -> &FlowParams {
        &self.params
    }

    pub fn set_params(&mut self, params: FlowParams) {
        self.uniforms.set_flow(&params);
        self.params = params;
    }

    pub fn time(&self) -> f32 {
        self.clock.elapsed()
    }

    pub fn frame(&self) -> u64 {
        self.clock.frame()
    }

    pub fn backdrop(&self) -> &Backdrop {
        &self.backdrop
    }

    pub fn touch(&self) -> &TouchTexture {
        &self.touch
    }

    pub(crate) fn touch_mut(&mut self) -> &mut TouchTexture {
        &mut self.touch
    }

    pub(crate) fn uniforms(&self) -> &FlowUniforms {
        &self.uniforms
    }
}

pub(crate) fn surface_or_default(width: u32, height: u32) -> (u32, u32) {
    if width == 0 || height == 0 {
        DEFAULT_SURFACE_SIZE
    } else {
        (width, height)
    }
}
