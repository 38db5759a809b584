use flowconfig::{AntialiasSetting, Color, ColorSpaceSetting, FlowConfig, SceneKind};
use renderer::{
    Antialiasing, BreathingParams, ColorSpaceMode, FlowParams, RenderPolicy, RendererConfig, Scene,
};

use crate::cli::RunArgs;

/// Applies command-line overrides on top of the loaded configuration.
pub fn apply_overrides(config: &mut FlowConfig, args: &RunArgs) {
    if let Some(scene) = args.scene {
        config.scene = scene;
    }
    if let Some(size) = args.size {
        config.window.size = size;
    }
    if let Some(fps) = args.fps {
        config.window.fps = Some(fps);
    }
    if let Some(antialias) = args.antialias {
        config.window.antialias = antialias;
    }
    if let Some(color_space) = args.color_space {
        config.window.color_space = color_space;
    }
}

/// Export when `--still-export` is given, animate otherwise.
pub fn render_policy(config: &FlowConfig, args: &RunArgs) -> RenderPolicy {
    match args.still_export.as_ref() {
        Some(path) => RenderPolicy::Export {
            time: args.still_time.unwrap_or(0.0),
            path: path.clone(),
        },
        None => RenderPolicy::Animate {
            target_fps: config.target_fps(),
        },
    }
}

pub fn renderer_config(config: &FlowConfig, policy: RenderPolicy) -> RendererConfig {
    RendererConfig {
        surface_size: config.window.size,
        scene: map_scene(config.scene),
        flow: flow_params(config),
        breathing: breathing_params(config),
        pointer_throttle: config.touch.throttle,
        antialiasing: map_antialias(config.window.antialias),
        color_space: map_color_space(config.window.color_space),
        policy,
    }
}

fn flow_params(config: &FlowConfig) -> FlowParams {
    let flow = &config.flow;
    FlowParams {
        colors: flow.colors.map(Color::rgb),
        dark_base: flow.dark_base.rgb(),
        background: flow.background.rgb(),
        speed: flow.speed,
        intensity: flow.intensity,
        grain: flow.grain,
        gradient_size: flow.gradient_size,
        color1_weight: flow.color1_weight,
        color2_weight: flow.color2_weight,
        distortion: flow.distortion,
        ripple: flow.ripple,
    }
}

fn breathing_params(config: &FlowConfig) -> BreathingParams {
    let breathing = &config.breathing;
    BreathingParams {
        starting_gap: breathing.starting_gap,
        breathing: breathing.breathing,
        range: breathing.range,
        speed: breathing.speed,
        top_offset: breathing.top_offset,
        center: breathing.center,
        colors: breathing.colors.iter().map(|color| color.rgb()).collect(),
        stops: breathing.stops.clone(),
        fade_in: breathing.fade_in,
    }
}

pub fn map_scene(scene: SceneKind) -> Scene {
    match scene {
        SceneKind::Flow => Scene::Flow,
        SceneKind::Breathing => Scene::Breathing,
    }
}

pub fn map_antialias(setting: AntialiasSetting) -> Antialiasing {
    match setting.samples() {
        None => Antialiasing::Auto,
        Some(1) => Antialiasing::Off,
        Some(samples) => Antialiasing::Samples(samples),
    }
}

pub fn map_color_space(setting: ColorSpaceSetting) -> ColorSpaceMode {
    match setting {
        ColorSpaceSetting::Auto => ColorSpaceMode::Auto,
        ColorSpaceSetting::Gamma => ColorSpaceMode::Gamma,
        ColorSpaceSetting::Linear => ColorSpaceMode::Linear,
    }
}
