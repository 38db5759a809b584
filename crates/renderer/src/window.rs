use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Result};
use tracing::{debug, error, info, warn};
use winit::dpi::{PhysicalPosition, PhysicalSize};
use winit::event::{ElementState, Event, TouchPhase, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoopBuilder};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Window, WindowBuilder};

use crate::gpu::{GpuInitError, GpuState};
use crate::input::{InputAdapter, TouchReceiver};
use crate::runtime::{FrameLoop, FrameScheduler};
use crate::scene::GradientScene;
use crate::timeline::DeltaTimer;
use crate::types::{RendererConfig, Scene};

/// Everything the loop thread owns while the window is open.
///
/// `gpu` is declared before `window` so the surface drops first.
pub(crate) struct WindowState {
    gpu: GpuState,
    scene: GradientScene,
    input: InputAdapter,
    timer: DeltaTimer,
    touches: TouchReceiver,
    window: Arc<Window>,
}

impl WindowState {
    fn new(
        window: Arc<Window>,
        config: &RendererConfig,
        touches: TouchReceiver,
    ) -> Result<Self, GpuInitError> {
        let size = window.inner_size();
        let mut scene = GradientScene::from_config(config, size.width, size.height)?;
        let clear_color = match config.scene {
            Scene::Flow => config.flow.background,
            Scene::Breathing => [0.0; 3],
        };
        let gpu = GpuState::new(
            window.as_ref(),
            size,
            &scene,
            config.antialiasing,
            config.color_space,
            clear_color,
        )?;
        let surface = gpu.size();
        if surface != size {
            scene.resize(surface.width, surface.height);
        }
        Ok(Self {
            gpu,
            scene,
            input: InputAdapter::new(config.pointer_throttle),
            timer: DeltaTimer::new(),
            touches,
            window,
        })
    }

    fn window(&self) -> &Window {
        self.window.as_ref()
    }

    fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        self.gpu.resize(new_size);
        let surface = self.gpu.size();
        self.scene.resize(surface.width, surface.height);
    }

    fn pointer_moved(&mut self, position: PhysicalPosition<f64>) {
        let size = self.window().inner_size();
        if let Some(point) = self.input.pointer_moved(
            Instant::now(),
            (position.x, position.y),
            (size.width, size.height),
        ) {
            self.scene.add_touch(point);
        }
    }

    /// Applies queued touches and advances the scene by the real frame delta.
    fn tick(&mut self, now: Instant) {
        for point in self.touches.drain() {
            self.scene.add_touch(point);
        }
        let dt = self.timer.delta(now);
        self.scene.tick(dt);
    }

    fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        self.gpu.render(&mut self.scene)
    }
}

/// Opens the window and animates until closed or [`FrameLoop::stop`] is called.
///
/// Hosts without a display, window system or GPU adapter log a warning and
/// return `Ok(())`; there is nothing to draw on and nothing to retry.
pub(crate) fn run_window(
    config: RendererConfig,
    frame_loop: FrameLoop,
    touches: TouchReceiver,
    target_fps: Option<f32>,
) -> Result<()> {
    let event_loop = match EventLoopBuilder::new().build() {
        Ok(event_loop) => event_loop,
        Err(err) => {
            warn!(error = %err, "no display available; skipping gradient renderer");
            return Ok(());
        }
    };

    let window_size = PhysicalSize::new(config.surface_size.0, config.surface_size.1);
    let window = match WindowBuilder::new()
        .with_title("flowpaper")
        .with_inner_size(window_size)
        .build(&event_loop)
    {
        Ok(window) => Arc::new(window),
        Err(err) => {
            warn!(error = %err, "failed to create window; skipping gradient renderer");
            return Ok(());
        }
    };

    let mut state = match WindowState::new(window, &config, touches) {
        Ok(state) => state,
        Err(GpuInitError::NoAdapter(reason)) => {
            warn!(%reason, "no GPU adapter; skipping gradient renderer");
            return Ok(());
        }
        Err(GpuInitError::Other(err)) => {
            return Err(err.context("failed to initialise gradient renderer"));
        }
    };

    info!(
        scene = %config.scene,
        width = window_size.width,
        height = window_size.height,
        "gradient renderer started"
    );

    let mut scheduler = FrameScheduler::new(target_fps);
    state.window().request_redraw();

    let run_result = event_loop.run(move |event, elwt| {
        if !frame_loop.is_running() {
            elwt.exit();
            return;
        }

        match event {
            Event::WindowEvent { window_id, event } if window_id == state.window().id() => {
                match event {
                    WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                        frame_loop.stop();
                        elwt.exit();
                    }
                    WindowEvent::KeyboardInput { event, .. } => {
                        if event.state == ElementState::Pressed
                            && matches!(event.logical_key, Key::Named(NamedKey::Escape))
                        {
                            frame_loop.stop();
                            elwt.exit();
                        }
                    }
                    WindowEvent::CursorMoved { position, .. } => {
                        state.pointer_moved(position);
                    }
                    WindowEvent::Touch(touch) => {
                        if matches!(touch.phase, TouchPhase::Started | TouchPhase::Moved) {
                            state.pointer_moved(touch.location);
                        }
                    }
                    WindowEvent::Resized(new_size) => {
                        state.resize(new_size);
                    }
                    WindowEvent::RedrawRequested => {
                        let now = Instant::now();
                        state.tick(now);
                        match state.render() {
                            Ok(()) => {}
                            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                                debug!("surface lost or outdated; reconfiguring");
                                state.gpu.reconfigure();
                            }
                            Err(wgpu::SurfaceError::Timeout) => {
                                debug!("surface timeout; skipping frame");
                            }
                            Err(wgpu::SurfaceError::OutOfMemory) => {
                                error!("surface out of memory; stopping renderer");
                                frame_loop.stop();
                                elwt.exit();
                            }
                            Err(other) => {
                                warn!(error = ?other, "surface error; retrying next frame");
                            }
                        }
                        scheduler.mark_rendered(now);
                    }
                    _ => {}
                }
            }
            Event::AboutToWait => {
                let now = Instant::now();
                if scheduler.ready(now) {
                    state.window().request_redraw();
                    elwt.set_control_flow(ControlFlow::Wait);
                } else if let Some(deadline) = scheduler.next_deadline() {
                    elwt.set_control_flow(ControlFlow::WaitUntil(deadline));
                } else {
                    elwt.set_control_flow(ControlFlow::Wait);
                }
            }
            _ => {}
        }
    });

    run_result.map_err(|err| anyhow!("window event loop error: {err}"))
}
