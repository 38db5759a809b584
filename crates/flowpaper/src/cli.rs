use std::path::PathBuf;

use clap::{Parser, Subcommand};
use flowconfig::{AntialiasSetting, ColorSpaceSetting, SceneKind};

#[derive(Parser, Debug)]
#[command(
    name = "flowpaper",
    author,
    version,
    about = "Animated gradient backdrop with a pointer-driven distortion trail",
    arg_required_else_help = false
)]
pub struct Cli {
    #[command(flatten)]
    pub run: RunArgs,
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Flags that override the configuration file.
#[derive(Parser, Debug, Default)]
pub struct RunArgs {
    /// Configuration file to load instead of `<config dir>/config.toml`.
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Gradient program: `flow` or `breathing`.
    #[arg(long, value_name = "SCENE", value_parser = parse_scene, global = true)]
    pub scene: Option<SceneKind>,

    /// Window or export size (e.g. `1280x720`).
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_surface_size, global = true)]
    pub size: Option<(u32, u32)>,

    /// Optional FPS cap for the animated window (0=uncapped).
    #[arg(long, value_name = "FPS", value_parser = parse_fps, global = true)]
    pub fps: Option<f32>,

    /// Anti-aliasing policy: `auto`, `off`, or an explicit MSAA sample count (e.g. `4`).
    #[arg(long, value_name = "MODE", value_parser = parse_antialias, global = true)]
    pub antialias: Option<AntialiasSetting>,

    /// Output color space handling: `auto`, `gamma`, or `linear`.
    #[arg(long, value_name = "MODE", value_parser = parse_color_space, global = true)]
    pub color_space: Option<ColorSpaceSetting>,

    /// Render one frame on the CPU and write it as PNG instead of opening a window.
    #[arg(long, value_name = "PATH")]
    pub still_export: Option<PathBuf>,

    /// Animation time of the exported frame in seconds.
    #[arg(
        long,
        value_name = "SECONDS",
        value_parser = parse_still_time,
        requires = "still_export"
    )]
    pub still_time: Option<f32>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Inspect the configuration.
    Config(ConfigCommand),
}

#[derive(Parser, Debug)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigAction {
    /// Print the resolved config directory and file.
    Where,
    /// Print the effective configuration, flags applied, as TOML.
    Print,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_scene(value: &str) -> Result<SceneKind, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "flow" => Ok(SceneKind::Flow),
        "breathing" | "breathe" => Ok(SceneKind::Breathing),
        "" => Err("scene must not be empty".to_string()),
        other => Err(format!(
            "unknown scene '{other}'; expected flow or breathing"
        )),
    }
}

pub fn parse_surface_size(spec: &str) -> Result<(u32, u32), String> {
    let trimmed = spec.trim();
    let (width, height) = trimmed
        .split_once(['x', 'X', '×'])
        .ok_or_else(|| "expected WxH format, e.g. 1920x1080".to_string())?;

    let width: u32 = width
        .trim()
        .parse()
        .map_err(|_| format!("invalid width in size specification '{trimmed}'"))?;
    let height: u32 = height
        .trim()
        .parse()
        .map_err(|_| format!("invalid height in size specification '{trimmed}'"))?;

    if width == 0 || height == 0 {
        return Err("surface dimensions must be greater than zero".to_string());
    }

    Ok((width, height))
}

pub fn parse_fps(value: &str) -> Result<f32, String> {
    let fps: f32 = value
        .trim()
        .parse()
        .map_err(|_| format!("invalid fps '{value}'"))?;
    if !fps.is_finite() || fps < 0.0 {
        return Err("fps must be a non-negative number".to_string());
    }
    Ok(fps)
}

pub fn parse_antialias(value: &str) -> Result<AntialiasSetting, String> {
    if value.trim().is_empty() {
        return Err("anti-alias mode must not be empty".to_string());
    }
    flowconfig::parse_antialias(value)
        .map_err(|err| format!("{err}; use auto/off or 2/4/8/16"))
}

pub fn parse_color_space(value: &str) -> Result<ColorSpaceSetting, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("color space must not be empty".to_string());
    }

    match trimmed.to_ascii_lowercase().as_str() {
        "auto" => Ok(ColorSpaceSetting::Auto),
        "gamma" | "srgb-off" => Ok(ColorSpaceSetting::Gamma),
        "linear" | "srgb" => Ok(ColorSpaceSetting::Linear),
        other => Err(format!(
            "unknown color space '{other}'; expected auto, gamma, or linear"
        )),
    }
}

pub fn parse_still_time(value: &str) -> Result<f32, String> {
    let seconds: f32 = value
        .trim()
        .parse()
        .map_err(|_| format!("invalid time '{value}'"))?;
    if !seconds.is_finite() || seconds < 0.0 {
        return Err("still time must be a non-negative number of seconds".to_string());
    }
    Ok(seconds)
}
