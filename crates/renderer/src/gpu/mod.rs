//! GPU side of the backdrop.
//!
//! - `context` owns the wgpu instance, device and surface and reconfigures
//!   the swapchain on resize or loss.
//! - `pipeline` builds the plane pipeline for the selected scene with a
//!   uniform group and a touch texture group.
//! - `uniforms` mirrors the GLSL uniform block.
//! - `touch_channel` uploads the trail raster when it changes.
//! - `state` glues everything together behind `GpuState`.

mod context;
mod pipeline;
mod state;
mod touch_channel;
mod uniforms;

pub(crate) use context::GpuInitError;
pub(crate) use state::GpuState;
pub(crate) use uniforms::FlowUniforms;
