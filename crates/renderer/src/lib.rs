//! Renderer crate for flowpaper, an animated gradient backdrop.
//!
//! Two scenes share one plane, one camera and one frame loop:
//!
//! ```text
//!   pointer / touch ─▶ InputAdapter ─▶ TouchTexture (64x64 trail raster)
//!                                            │
//!   FrameClock ─▶ GradientScene::tick ───────┼─▶ FlowUniforms ─▶ GPU UBO
//!                                            └─▶ TouchChannel ─▶ GPU texture
//! ```
//!
//! `Renderer` is the thin entry point. It either opens a window and animates
//! until closed or stopped, or renders a single still frame on the CPU and
//! writes it to disk. The CPU path evaluates the same field as the fragment
//! shaders so stills match the live backdrop without a GPU.

mod breathing;
mod camera;
mod compile;
mod field;
mod gpu;
mod gradient;
mod input;
mod runtime;
mod scene;
mod timeline;
mod touch;
mod types;
mod window;

use anyhow::Result;
use tracing::info;

pub use breathing::{intro_fade, BreathingGradient, BreathingScene, INTRO_SCALE};
pub use camera::{
    Backdrop, Mat4, PerspectiveCamera, PlaneGeometry, PlaneVertex, ViewSize, CAMERA_DISTANCE,
    FALLBACK_VIEW_SIZE, FAR_PLANE, FIELD_OF_VIEW_DEGREES, NEAR_PLANE, PLANE_INDICES,
};
pub use field::{export_png, render_still, FieldSampler};
pub use gradient::{FlowGradient, DEFAULT_SURFACE_SIZE};
pub use input::{
    normalize_pointer, touch_channel, InputAdapter, PointerThrottle, TouchReceiver, TouchSender,
};
pub use runtime::{FrameLoop, FrameScheduler, RenderPolicy};
pub use scene::GradientScene;
pub use timeline::{ease_out_cubic, DeltaTimer, FadeEnvelope, FrameClock, MAX_FRAME_DELTA};
pub use touch::{
    age_envelope, TouchPoint, TouchTexture, TrailPoint, DECAY_SPEED, FORCE_GAIN, GLOW_RADIUS,
    MAX_AGE, TOUCH_TEXTURE_SIZE,
};
pub use types::{
    rgb_from_hex, Antialiasing, BreathingParams, ColorSpaceMode, FlowParams, RendererConfig, Rgb,
    Scene, DEFAULT_POINTER_THROTTLE, MAX_GRADIENT_STOPS,
};

/// High-level entry point that owns the chosen configuration.
///
/// Touches can be injected from other threads through [`Renderer::touch_sender`]
/// and the loop can be stopped through [`Renderer::frame_loop`], both before
/// and while [`Renderer::run`] blocks.
pub struct Renderer {
    config: RendererConfig,
    frame_loop: FrameLoop,
    sender: TouchSender,
    receiver: Option<TouchReceiver>,
}

impl Renderer {
    pub fn new(config: RendererConfig) -> Self {
        let (sender, receiver) = touch_channel();
        Self {
            config,
            frame_loop: FrameLoop::new(),
            sender,
            receiver: Some(receiver),
        }
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Handle that stops the animation loop when [`FrameLoop::stop`] is called.
    pub fn frame_loop(&self) -> FrameLoop {
        self.frame_loop.clone()
    }

    /// Sender whose touches are applied at the start of the next frame.
    pub fn touch_sender(&self) -> TouchSender {
        self.sender.clone()
    }

    /// Runs the configured policy to completion.
    ///
    /// `Animate` blocks until the window closes or the loop is stopped; a
    /// second call after that returns immediately. `Export` renders one frame
    /// at the requested time and writes it as PNG.
    pub fn run(&mut self) -> Result<()> {
        match self.config.policy.clone() {
            RenderPolicy::Animate { target_fps } => {
                let Some(receiver) = self.receiver.take() else {
                    info!("renderer already ran; nothing to do");
                    return Ok(());
                };
                window::run_window(
                    self.config.clone(),
                    self.frame_loop.clone(),
                    receiver,
                    target_fps,
                )
            }
            RenderPolicy::Export { time, path } => {
                let (width, height) = self.config.surface_size;
                let image = render_still(&self.config, width, height, time)?;
                export_png(&image, &path)?;
                info!(
                    path = %path.display(),
                    width,
                    height,
                    time,
                    scene = %self.config.scene,
                    "exported still frame"
                );
                Ok(())
            }
        }
    }
}
