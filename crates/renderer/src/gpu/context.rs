use anyhow::{anyhow, Context as AnyhowContext, Result};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use tracing::{debug, warn};
use wgpu::TextureFormatFeatureFlags;
use winit::dpi::PhysicalSize;

use crate::types::{Antialiasing, ColorSpaceMode};

/// Why the GPU could not be brought up.
///
/// A missing adapter means the host simply has nothing to render with; the
/// caller skips rendering instead of failing.
#[derive(Debug)]
pub(crate) enum GpuInitError {
    NoAdapter(String),
    Other(anyhow::Error),
}

impl std::fmt::Display for GpuInitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GpuInitError::NoAdapter(reason) => write!(f, "no usable GPU adapter: {reason}"),
            GpuInitError::Other(err) => write!(f, "{err:#}"),
        }
    }
}

impl std::error::Error for GpuInitError {}

impl From<anyhow::Error> for GpuInitError {
    fn from(value: anyhow::Error) -> Self {
        GpuInitError::Other(value)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum SurfaceColorSpace {
    Gamma,
    Linear,
}

impl From<ColorSpaceMode> for SurfaceColorSpace {
    /// Shader outputs are display-encoded, so `Auto` resolves to gamma.
    fn from(mode: ColorSpaceMode) -> Self {
        match mode {
            ColorSpaceMode::Auto | ColorSpaceMode::Gamma => SurfaceColorSpace::Gamma,
            ColorSpaceMode::Linear => SurfaceColorSpace::Linear,
        }
    }
}

pub(crate) struct GpuContext {
    pub _instance: wgpu::Instance,
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub size: PhysicalSize<u32>,
    pub sample_count: u32,
    pub surface_format: wgpu::TextureFormat,
    max_dimension: u32,
}

impl GpuContext {
    pub(crate) fn new<T>(
        target: &T,
        initial_size: PhysicalSize<u32>,
        antialiasing: Antialiasing,
        color_space: ColorSpaceMode,
    ) -> Result<Self, GpuInitError>
    where
        T: HasDisplayHandle + HasWindowHandle,
    {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            flags: wgpu::InstanceFlags::default(),
            memory_budget_thresholds: wgpu::MemoryBudgetThresholds::default(),
            backend_options: wgpu::BackendOptions::default(),
        });

        let window_handle = target
            .window_handle()
            .map_err(|err| anyhow!("failed to acquire window handle: {err}"))?;
        let display_handle = target
            .display_handle()
            .map_err(|err| anyhow!("failed to acquire display handle: {err}"))?;

        // The window outlives the surface: both live in the same loop closure and
        // the GPU state is dropped first.
        let surface = unsafe {
            instance.create_surface_unsafe(wgpu::SurfaceTargetUnsafe::RawHandle {
                raw_display_handle: display_handle.as_raw(),
                raw_window_handle: window_handle.as_raw(),
            })
        }
        .context("failed to create rendering surface")?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::LowPower,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .map_err(|err| GpuInitError::NoAdapter(err.to_string()))?;

        let info = adapter.get_info();
        let limits = adapter.limits();
        let is_software = info.device_type == wgpu::DeviceType::Cpu;
        debug!(
            adapter = %info.name,
            backend = ?info.backend,
            device_type = ?info.device_type,
            "using GPU adapter"
        );

        let max_dimension = limits.max_texture_dimension_2d;
        let size = clamp_surface_size(initial_size, max_dimension);

        let caps = surface.get_capabilities(&adapter);
        if caps.formats.is_empty() {
            return Err(GpuInitError::NoAdapter(
                "adapter cannot present to this surface".to_string(),
            ));
        }
        let surface_format = pick_surface_format(&caps.formats, color_space.into());

        let format_features = adapter.get_texture_format_features(surface_format);
        let sample_count = choose_sample_count(
            antialiasing,
            &format_features.flags.supported_sample_counts(),
            format_features
                .flags
                .contains(TextureFormatFeatureFlags::MULTISAMPLE_RESOLVE),
            is_software,
        );

        // 8x and 16x are only reachable through adapter-specific format features.
        let required_features = if sample_count > 4 {
            wgpu::Features::TEXTURE_ADAPTER_SPECIFIC_FORMAT_FEATURES
        } else {
            wgpu::Features::empty()
        };
        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("flowpaper device"),
            required_features,
            required_limits: limits,
            memory_hints: wgpu::MemoryHints::MemoryUsage,
            trace: wgpu::Trace::default(),
        }))
        .context("failed to create GPU device")?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width,
            height: size.height,
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: wgpu::CompositeAlphaMode::Auto,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);
        debug!(?surface_format, sample_count, width = size.width, height = size.height, "surface configured");

        Ok(Self {
            _instance: instance,
            surface,
            device,
            queue,
            config,
            size,
            sample_count,
            surface_format,
            max_dimension,
        })
    }

    pub(crate) fn resize(&mut self, new_size: PhysicalSize<u32>) {
        let Some(size) = resized_surface(new_size, self.max_dimension) else {
            return;
        };

        self.size = size;
        self.config.width = size.width;
        self.config.height = size.height;
        self.surface.configure(&self.device, &self.config);
    }

    /// Re-applies the current configuration after the surface was lost.
    pub(crate) fn reconfigure(&self) {
        self.surface.configure(&self.device, &self.config);
    }
}

/// MSAA sample count for the plane pass.
///
/// `Auto` caps at 4x. Explicit requests fall back to the largest supported
/// count below them. Formats without resolve support and software adapters
/// always get 1.
fn choose_sample_count(
    antialiasing: Antialiasing,
    supported: &[u32],
    can_resolve: bool,
    is_software: bool,
) -> u32 {
    let best_at_most = |limit: u32| {
        supported
            .iter()
            .copied()
            .filter(|&count| count <= limit)
            .max()
            .unwrap_or(1)
    };
    let count = match antialiasing {
        Antialiasing::Off => 1,
        Antialiasing::Auto => best_at_most(4),
        Antialiasing::Samples(requested) if supported.contains(&requested) => requested,
        Antialiasing::Samples(requested) => {
            let fallback = best_at_most(requested);
            warn!(requested, fallback, ?supported, "MSAA sample count unsupported; falling back");
            fallback
        }
    };
    if count > 1 && !can_resolve {
        warn!("surface format cannot resolve multisampled targets; MSAA off");
        return 1;
    }
    if count > 1 && is_software {
        debug!(count, "software adapter; MSAA off");
        return 1;
    }
    count
}

/// Zero sizes become 1 and oversized ones are clamped to what the device can
/// allocate.
/// Surface size for a window resize; `None` while the window is minimised.
fn resized_surface(new_size: PhysicalSize<u32>, max_dimension: u32) -> Option<PhysicalSize<u32>> {
    if new_size.width == 0 || new_size.height == 0 {
        return None;
    }
    Some(clamp_surface_size(new_size, max_dimension))
}

fn clamp_surface_size(size: PhysicalSize<u32>, max_dimension: u32) -> PhysicalSize<u32> {
    let clamped = PhysicalSize::new(
        size.width.clamp(1, max_dimension.max(1)),
        size.height.clamp(1, max_dimension.max(1)),
    );
    if clamped.width < size.width || clamped.height < size.height {
        warn!(
            requested_width = size.width,
            requested_height = size.height,
            max_dimension,
            "surface larger than the GPU supports; clamping"
        );
    }
    clamped
}

fn pick_surface_format(
    formats: &[wgpu::TextureFormat],
    color_space: SurfaceColorSpace,
) -> wgpu::TextureFormat {
    let want_srgb = matches!(color_space, SurfaceColorSpace::Linear);
    formats
        .iter()
        .copied()
        .find(|format| format.is_srgb() == want_srgb)
        .unwrap_or_else(|| {
            let fallback = formats[0];
            warn!(
                ?fallback,
                ?color_space,
                "no surface format matches the requested color space; falling back"
            );
            fallback
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gamma_prefers_non_srgb_formats() {
        let formats = [
            wgpu::TextureFormat::Bgra8UnormSrgb,
            wgpu::TextureFormat::Bgra8Unorm,
        ];
        assert_eq!(
            pick_surface_format(&formats, SurfaceColorSpace::Gamma),
            wgpu::TextureFormat::Bgra8Unorm
        );
        assert_eq!(
            pick_surface_format(&formats, SurfaceColorSpace::Linear),
            wgpu::TextureFormat::Bgra8UnormSrgb
        );
    }

    #[test]
    fn falls_back_to_first_format() {
        let formats = [wgpu::TextureFormat::Rgba16Float];
        assert_eq!(
            pick_surface_format(&formats, SurfaceColorSpace::Linear),
            wgpu::TextureFormat::Rgba16Float
        );
    }

    #[test]
    fn auto_msaa_caps_at_four() {
        assert_eq!(choose_sample_count(Antialiasing::Auto, &[1, 2, 4, 8], true, false), 4);
        assert_eq!(choose_sample_count(Antialiasing::Auto, &[1, 2], true, false), 2);
        assert_eq!(choose_sample_count(Antialiasing::Off, &[1, 4], true, false), 1);
    }

    #[test]
    fn explicit_msaa_falls_back_to_supported_count() {
        assert_eq!(choose_sample_count(Antialiasing::Samples(8), &[1, 4, 8], true, false), 8);
        assert_eq!(choose_sample_count(Antialiasing::Samples(16), &[1, 2, 4], true, false), 4);
        assert_eq!(choose_sample_count(Antialiasing::Samples(2), &[], true, false), 1);
    }

    #[test]
    fn msaa_disabled_without_resolve_or_on_software() {
        assert_eq!(choose_sample_count(Antialiasing::Auto, &[1, 4], false, false), 1);
        assert_eq!(choose_sample_count(Antialiasing::Samples(4), &[1, 4], true, true), 1);
    }

    #[test]
    fn surface_size_is_clamped() {
        assert_eq!(
            clamp_surface_size(PhysicalSize::new(0, 720), 8192),
            PhysicalSize::new(1, 720)
        );
        assert_eq!(
            clamp_surface_size(PhysicalSize::new(10_000, 600), 8192),
            PhysicalSize::new(8192, 600)
        );
    }

    #[test]
    fn resize_clamps_to_device_limit() {
        assert_eq!(resized_surface(PhysicalSize::new(0, 600), 8192), None);
        assert_eq!(resized_surface(PhysicalSize::new(800, 0), 8192), None);
        assert_eq!(
            resized_surface(PhysicalSize::new(16_384, 9_000), 8192),
            Some(PhysicalSize::new(8192, 8192))
        );
        assert_eq!(
            resized_surface(PhysicalSize::new(1280, 720), 8192),
            Some(PhysicalSize::new(1280, 720))
        );
    }

    #[test]
    fn auto_color_space_means_gamma() {
        assert_eq!(SurfaceColorSpace::from(ColorSpaceMode::Auto), SurfaceColorSpace::Gamma);
        assert_eq!(SurfaceColorSpace::from(ColorSpaceMode::Linear), SurfaceColorSpace::Linear);
    }
}
