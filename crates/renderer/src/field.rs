//! CPU evaluation of the fragment programs.
//!
//! Mirrors the GLSL in `compile.rs` operation for operation so still frames
//! can be produced without a GPU and the color math can be tested directly.

use std::path::Path;

use anyhow::{Context, Result};
use image::RgbaImage;

use crate::gpu::FlowUniforms;
use crate::scene::GradientScene;
use crate::touch::TouchTexture;
use crate::types::{RendererConfig, Rgb, MAX_GRADIENT_STOPS};

type Vec2 = [f32; 2];

/// Samples the color field of one scene snapshot.
pub struct FieldSampler<'a> {
    scene: &'a GradientScene,
}

impl<'a> FieldSampler<'a> {
    pub fn new(scene: &'a GradientScene) -> Self {
        Self { scene }
    }

    /// Color at `uv`, origin at the bottom-left, as displayed.
    pub fn color_at(&self, uv: Vec2) -> Rgb {
        let uniforms = self.scene.uniforms();
        match self.scene {
            GradientScene::Flow(_) => flow_color(uniforms, self.scene.touch(), uv),
            GradientScene::Breathing(_) => breathing_color(uniforms, uv),
        }
    }

    /// Rasterizes the field at `width`×`height`, row 0 at the top.
    pub fn render(&self, width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| {
            let uv = [
                (x as f32 + 0.5) / width as f32,
                1.0 - (y as f32 + 0.5) / height as f32,
            ];
            let [r, g, b] = self.color_at(uv);
            image::Rgba([to_byte(r), to_byte(g), to_byte(b), u8::MAX])
        })
    }
}

/// Builds the configured scene at `width`×`height`, jumps to `time` and
/// renders it.
pub fn render_still(config: &RendererConfig, width: u32, height: u32, time: f32) -> Result<RgbaImage> {
    if width == 0 || height == 0 {
        anyhow::bail!("still frame size must be non-zero, got {width}x{height}");
    }
    let mut scene = GradientScene::from_config(config, width, height)?;
    scene.seek(time);
    Ok(FieldSampler::new(&scene).render(width, height))
}

/// Writes `image` to `path` as PNG, creating parent directories.
pub fn export_png(image: &RgbaImage, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    image
        .save_with_format(path, image::ImageFormat::Png)
        .with_context(|| format!("failed to write PNG to {}", path.display()))
}

fn flow_color(params: &FlowUniforms, touch: Option<&TouchTexture>, uv: Vec2) -> Rgb {
    let time = params.clock[0];
    let tex = touch
        .map(|touch| touch.sample(uv[0], 1.0 - uv[1]))
        .unwrap_or([0.0, 0.0, 0.0, 1.0]);
    let push = params.weights[2] * tex[2];
    let mut uv = [
        uv[0] - (tex[0] * 2.0 - 1.0) * push,
        uv[1] - (tex[1] * 2.0 - 1.0) * push,
    ];

    let dist = length2(sub2(uv, [0.5, 0.5]));
    let ripple = (dist * 15.0 - time * 2.5).sin() * params.weights[3] * tex[2];
    uv = [uv[0] + ripple, uv[1] + ripple];

    let field = field_color(params, uv, time);
    let noise = grain(params, uv, time) * params.motion[2];
    field.map(|channel| (channel + noise).clamp(0.0, 1.0))
}

fn field_color(params: &FlowUniforms, uv: Vec2, time: f32) -> Rgb {
    let s = time * params.motion[0];
    let (w1, w2) = (params.weights[0], params.weights[1]);
    let blobs: [(Vec2, f32, f32); 6] = [
        (
            [0.5 + (s * 0.3).sin() * 0.45, 0.5 + (s * 0.4).cos() * 0.45],
            0.5 + 0.5 * (s * 0.8).sin(),
            w1,
        ),
        (
            [0.5 + (s * 0.5).cos() * 0.5, 0.5 + (s * 0.35).sin() * 0.5],
            0.5 + 0.5 * (s * 1.0).cos(),
            w2,
        ),
        (
            [0.5 + (s * 0.25).sin() * 0.4, 0.5 + (s * 0.45).cos() * 0.4],
            0.5 + 0.5 * (s * 0.6).sin(),
            w1,
        ),
        (
            [0.5 + (s * 0.4).cos() * 0.45, 0.5 + (s * 0.3).sin() * 0.45],
            0.5 + 0.5 * (s * 1.1).cos(),
            w2,
        ),
        (
            [0.5 + (s * 0.55).sin() * 0.35, 0.5 + (s * 0.5).cos() * 0.35],
            0.5 + 0.5 * (s * 0.9).sin(),
            w1 * 0.7,
        ),
        (
            [0.5 + (s * 0.35).cos() * 0.5, 0.5 + (s * 0.55).sin() * 0.5],
            0.5 + 0.5 * (s * 0.7).cos(),
            w2,
        ),
    ];

    let mut color = [0.0f32; 3];
    for (slot, (center, pulse, weight)) in params.colors.iter().zip(blobs) {
        let influence = 1.0 - smoothstep(0.0, params.motion[3], length2(sub2(uv, center)));
        for (channel, base) in color.iter_mut().zip(slot) {
            *channel += base * influence * pulse * weight;
        }
    }

    let color = color.map(|c| c.clamp(0.0, 1.0) * params.motion[1]);
    let lum = color[0] * 0.299 + color[1] * 0.587 + color[2] * 0.114;
    let color = color.map(|c| mix(lum, c, 1.4).max(0.0).powf(0.95));
    let brightness = (color[0] * color[0] + color[1] * color[1] + color[2] * color[2]).sqrt();
    let k = (brightness * 1.3).max(0.1);
    [
        mix(params.dark_base[0], color[0], k),
        mix(params.dark_base[1], color[1], k),
        mix(params.dark_base[2], color[2], k),
    ]
}

fn grain(params: &FlowUniforms, uv: Vec2, time: f32) -> f32 {
    let px = uv[0] * params.resolution[0] * 0.5 + time;
    let py = uv[1] * params.resolution[1] * 0.5 + time;
    let value = (px * 12.9898 + py * 78.233).sin() * 43758.5453;
    (value - value.floor()) * 2.0 - 1.0
}

fn breathing_color(params: &FlowUniforms, uv: Vec2) -> Rgb {
    let res = [params.resolution[0], params.resolution[1]];
    let scale = params.resolution[3];
    let mid = [res[0] * 0.5, res[1] * 0.5];
    let pixel = [uv[0] * res[0], (1.0 - uv[1]) * res[1]];
    let pixel = [
        (pixel[0] - mid[0]) / scale + mid[0],
        (pixel[1] - mid[1]) / scale + mid[1],
    ];

    let center = [params.breath[2] * res[0], params.breath[3] * res[1]];
    let radii = [
        (params.breath[0] * 0.01 * res[0]).max(0.0001),
        (params.breath[1] * 0.01 * res[1]).max(0.0001),
    ];
    let t = length2([
        (pixel[0] - center[0]) / radii[0],
        (pixel[1] - center[1]) / radii[1],
    ]);

    let count = (params.dark_base[3] as usize).min(MAX_GRADIENT_STOPS);
    let rgb = |index: usize| {
        let c = params.colors[index];
        [c[0], c[1], c[2]]
    };
    let mut color = rgb(0);
    for index in 1..count {
        let a = params.colors[index - 1][3];
        let b = params.colors[index][3];
        if t >= a {
            let k = if b > a {
                ((t - a) / (b - a)).clamp(0.0, 1.0)
            } else {
                1.0
            };
            let (from, to) = (rgb(index - 1), rgb(index));
            color = [
                mix(from[0], to[0], k),
                mix(from[1], to[1], k),
                mix(from[2], to[2], k),
            ];
        }
    }

    let opacity = params.clock[2];
    color.map(|c| c * opacity)
}

fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

fn mix(a: f32, b: f32, t: f32) -> f32 {
    a * (1.0 - t) + b * t
}

fn sub2(a: Vec2, b: Vec2) -> Vec2 {
    [a[0] - b[0], a[1] - b[1]]
}

fn length2(v: Vec2) -> f32 {
    (v[0] * v[0] + v[1] * v[1]).sqrt()
}

fn to_byte(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::touch::TouchPoint;
    use crate::types::{BreathingParams, FlowParams, Scene};

    fn flat_flow() -> RendererConfig {
        RendererConfig {
            flow: FlowParams {
                grain: 0.0,
                ..FlowParams::default()
            },
            ..RendererConfig::default()
        }
    }

    #[test]
    fn flow_field_stays_in_range_and_is_opaque() {
        let image = render_still(&RendererConfig::default(), 48, 32, 3.0).expect("still");
        assert_eq!(image.dimensions(), (48, 32));
        assert!(image.pixels().all(|pixel| pixel[3] == 255));
    }

    #[test]
    fn empty_field_settles_on_dark_base() {
        let config = flat_flow();
        let scene = GradientScene::from_config(&config, 64, 64).expect("scene");
        let sampler = FieldSampler::new(&scene);
        // Outside every blob only the 10% floor of the dark-base mix remains.
        let far = sampler.color_at([40.0, 40.0]);
        for (channel, base) in far.iter().zip(config.flow.dark_base) {
            assert!((channel - base * 0.9).abs() < 1e-5);
        }
    }

    #[test]
    fn field_animates_over_time() {
        let config = flat_flow();
        let early = render_still(&config, 16, 16, 0.0).expect("early");
        let late = render_still(&config, 16, 16, 9.0).expect("late");
        assert_ne!(early.as_raw(), late.as_raw());
    }

    #[test]
    fn trail_distorts_the_field() {
        let config = flat_flow();
        let mut scene = GradientScene::from_config(&config, 64, 64).expect("scene");
        let before: Vec<Rgb> = (0..16)
            .map(|i| FieldSampler::new(&scene).color_at([0.3 + i as f32 * 0.02, 0.5]))
            .collect();
        scene.add_touch(TouchPoint::new(0.3, 0.5));
        scene.add_touch(TouchPoint::new(0.45, 0.5));
        for _ in 0..8 {
            scene.tick(0.0);
        }
        let sampler = FieldSampler::new(&scene);
        let changed = (0..16)
            .filter(|&i| sampler.color_at([0.3 + i as f32 * 0.02, 0.5]) != before[i])
            .count();
        assert!(changed > 0);
    }

    #[test]
    fn breathing_center_uses_first_stop_after_fade() {
        let config = RendererConfig {
            scene: Scene::Breathing,
            breathing: BreathingParams {
                colors: vec![[1.0, 0.0, 0.0], [0.0, 0.0, 1.0]],
                stops: vec![0.0, 100.0],
                center: [0.5, 0.5],
                fade_in: Duration::ZERO,
                ..BreathingParams::default()
            },
            ..RendererConfig::default()
        };
        let scene = GradientScene::from_config(&config, 100, 100).expect("scene");
        let sampler = FieldSampler::new(&scene);
        let center = sampler.color_at([0.5, 0.5]);
        assert!((center[0] - 1.0).abs() < 1e-4);
        assert!(center[2].abs() < 1e-4);
        let corner = sampler.color_at([0.0, 1.0]);
        assert!(corner[2] > 0.3);
    }

    #[test]
    fn breathing_starts_dark_during_fade() {
        let config = RendererConfig {
            scene: Scene::Breathing,
            ..RendererConfig::default()
        };
        let image = render_still(&config, 8, 8, 0.0).expect("still");
        assert!(image.pixels().all(|pixel| pixel[0] == 0 && pixel[1] == 0 && pixel[2] == 0));
    }

    #[test]
    fn export_writes_png() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("frame.png");
        let image = render_still(&RendererConfig::default(), 20, 10, 1.0).expect("still");
        export_png(&image, &path).expect("export");
        let decoded = image::open(&path).expect("decode");
        assert_eq!((decoded.width(), decoded.height()), (20, 10));
    }

    #[test]
    fn zero_sized_still_is_rejected() {
        assert!(render_still(&RendererConfig::default(), 0, 10, 0.0).is_err());
    }
}
