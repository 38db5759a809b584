use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

/// Current configuration schema version.
pub const CONFIG_VERSION: u32 = 1;

/// Most color stops the breathing gradient accepts.
pub const MAX_STOPS: usize = 6;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialise configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SceneKind {
    #[default]
    Flow,
    Breathing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorSpaceSetting {
    #[default]
    Auto,
    Gamma,
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AntialiasSetting {
    #[default]
    Auto,
    Off,
    Samples2,
    Samples4,
    Samples8,
    Samples16,
}

impl AntialiasSetting {
    pub fn from_samples(samples: u32) -> Option<Self> {
        match samples {
            0 | 1 => Some(Self::Off),
            2 => Some(Self::Samples2),
            4 => Some(Self::Samples4),
            8 => Some(Self::Samples8),
            16 => Some(Self::Samples16),
            _ => None,
        }
    }

    /// MSAA sample count, or `None` for `Auto`.
    pub fn samples(self) -> Option<u32> {
        match self {
            Self::Auto => None,
            Self::Off => Some(1),
            Self::Samples2 => Some(2),
            Self::Samples4 => Some(4),
            Self::Samples8 => Some(8),
            Self::Samples16 => Some(16),
        }
    }
}

impl fmt::Display for AntialiasSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.samples() {
            None => f.write_str("auto"),
            Some(1) => f.write_str("off"),
            Some(samples) => write!(f, "{samples}"),
        }
    }
}

impl Serialize for AntialiasSetting {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for AntialiasSetting {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Helper {
            Str(String),
            Num(i64),
        }

        match Helper::deserialize(deserializer)? {
            Helper::Str(raw) => parse_antialias(&raw).map_err(de::Error::custom),
            Helper::Num(value) => {
                if value < 0 {
                    return Err(de::Error::custom("antialias value must be non-negative"));
                }
                parse_antialias(&value.to_string()).map_err(de::Error::custom)
            }
        }
    }
}

pub fn parse_antialias(raw: &str) -> Result<AntialiasSetting, String> {
    let normalized = raw.trim().to_ascii_lowercase();
    match normalized.as_str() {
        "auto" | "max" | "default" => Ok(AntialiasSetting::Auto),
        "off" | "none" | "disable" | "disabled" | "0" | "1" => Ok(AntialiasSetting::Off),
        "2" => Ok(AntialiasSetting::Samples2),
        "4" => Ok(AntialiasSetting::Samples4),
        "8" => Ok(AntialiasSetting::Samples8),
        "16" => Ok(AntialiasSetting::Samples16),
        other => Err(format!("invalid antialias setting '{other}'")),
    }
}

/// RGB color with components in `[0, 1]`.
///
/// Accepts `"#rrggbb"` strings or `[r, g, b]` float arrays and always writes
/// the array form so values survive a round trip unchanged.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color(pub [f32; 3]);

impl Color {
    pub fn from_hex(value: u32) -> Self {
        Self([
            ((value >> 16) & 0xff) as f32 / 255.0,
            ((value >> 8) & 0xff) as f32 / 255.0,
            (value & 0xff) as f32 / 255.0,
        ])
    }

    pub fn parse_hex(raw: &str) -> Result<Self, String> {
        let trimmed = raw.trim();
        let digits = trimmed.strip_prefix('#').unwrap_or(trimmed);
        if digits.len() != 6 || !digits.chars().all(|ch| ch.is_ascii_hexdigit()) {
            return Err(format!("invalid color '{raw}'; expected #rrggbb"));
        }
        u32::from_str_radix(digits, 16)
            .map(Self::from_hex)
            .map_err(|err| format!("invalid color '{raw}': {err}"))
    }

    pub fn rgb(self) -> [f32; 3] {
        self.0
    }
}

impl Serialize for Color {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Helper {
            Hex(String),
            Floats([f32; 3]),
        }

        match Helper::deserialize(deserializer)? {
            Helper::Hex(raw) => Color::parse_hex(&raw).map_err(de::Error::custom),
            Helper::Floats(rgb) => Ok(Color(rgb)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FlowConfig {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub scene: SceneKind,
    #[serde(default)]
    pub window: WindowSection,
    #[serde(default)]
    pub touch: TouchSection,
    #[serde(default)]
    pub flow: FlowSection,
    #[serde(default)]
    pub breathing: BreathingSection,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct WindowSection {
    pub size: (u32, u32),
    /// Frame rate cap; `0` or absent renders at display rate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fps: Option<f32>,
    pub antialias: AntialiasSetting,
    pub color_space: ColorSpaceSetting,
}

impl Default for WindowSection {
    fn default() -> Self {
        Self {
            size: (1920, 1080),
            fps: None,
            antialias: AntialiasSetting::Auto,
            color_space: ColorSpaceSetting::Auto,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TouchSection {
    #[serde(
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub throttle: Duration,
}

impl Default for TouchSection {
    fn default() -> Self {
        Self {
            throttle: Duration::from_millis(32),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct FlowSection {
    pub speed: f32,
    pub intensity: f32,
    pub grain: f32,
    pub gradient_size: f32,
    pub color1_weight: f32,
    pub color2_weight: f32,
    pub distortion: f32,
    pub ripple: f32,
    pub colors: [Color; 6],
    pub dark_base: Color,
    pub background: Color,
}

impl Default for FlowSection {
    fn default() -> Self {
        Self {
            speed: 0.6,
            intensity: 1.1,
            grain: 0.04,
            gradient_size: 0.5,
            color1_weight: 0.4,
            color2_weight: 1.0,
            distortion: 0.25,
            ripple: 0.012,
            colors: [
                Color([0.77, 0.36, 0.24]),
                Color([0.18, 0.16, 0.15]),
                Color([0.83, 0.45, 0.35]),
                Color([0.12, 0.11, 0.09]),
                Color([0.79, 0.65, 0.36]),
                Color([0.15, 0.14, 0.12]),
            ],
            dark_base: Color([0.07, 0.067, 0.059]),
            background: Color::from_hex(0x12110f),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct BreathingSection {
    pub starting_gap: f32,
    pub breathing: bool,
    pub range: f32,
    pub speed: f32,
    pub top_offset: f32,
    /// Ellipse center as fractions of the surface, top-left origin.
    pub center: [f32; 2],
    #[serde(
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub fade_in: Duration,
    pub colors: Vec<Color>,
    /// Stop positions in percent, one per color.
    pub stops: Vec<f32>,
}

impl Default for BreathingSection {
    fn default() -> Self {
        Self {
            starting_gap: 120.0,
            breathing: true,
            range: 10.0,
            speed: 0.02,
            top_offset: 0.0,
            center: [0.5, 0.3],
            fade_in: Duration::from_millis(2000),
            colors: vec![
                Color::from_hex(0x0a0a0f),
                Color::from_hex(0x1a1a2e),
                Color::from_hex(0x6366f1),
                Color::from_hex(0xa855f7),
                Color::from_hex(0x0a0a0f),
            ],
            stops: vec![0.0, 30.0, 55.0, 75.0, 100.0],
        }
    }
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            scene: SceneKind::default(),
            window: WindowSection::default(),
            touch: TouchSection::default(),
            flow: FlowSection::default(),
            breathing: BreathingSection::default(),
        }
    }
}

fn default_version() -> u32 {
    CONFIG_VERSION
}

fn serialize_duration<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_str(&humantime::format_duration(*value))
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;
    impl<'de> de::Visitor<'de> for Visitor {
        type Value = Duration;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a duration as number of seconds or human-readable string")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            humantime::parse_duration(v.trim())
                .map_err(|err| E::custom(format!("invalid duration '{v}': {err}")))
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Duration::from_secs(v))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v < 0 {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Duration::from_secs(v as u64))
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if !v.is_finite() || v.is_sign_negative() {
                return Err(E::custom("duration must be a non-negative number"));
            }
            Ok(Duration::from_secs_f64(v))
        }
    }

    deserializer.deserialize_any(Visitor)
}

impl FlowConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: FlowConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Frame cap to hand to the renderer; `0` means uncapped.
    pub fn target_fps(&self) -> Option<f32> {
        self.window.fps.filter(|fps| *fps > 0.0)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != CONFIG_VERSION {
            return Err(ConfigError::Invalid(format!(
                "unsupported config version {}; expected {CONFIG_VERSION}",
                self.version
            )));
        }

        let (width, height) = self.window.size;
        if width == 0 || height == 0 {
            return Err(ConfigError::Invalid(format!(
                "window.size must be non-zero, got {width}x{height}"
            )));
        }
        if let Some(fps) = self.window.fps {
            if !fps.is_finite() || fps < 0.0 {
                return Err(ConfigError::Invalid("window.fps must be >= 0".into()));
            }
        }

        self.validate_flow()?;
        self.validate_breathing()
    }

    fn validate_flow(&self) -> Result<(), ConfigError> {
        let flow = &self.flow;
        let scalars = [
            ("speed", flow.speed),
            ("intensity", flow.intensity),
            ("grain", flow.grain),
            ("gradient_size", flow.gradient_size),
            ("color1_weight", flow.color1_weight),
            ("color2_weight", flow.color2_weight),
            ("distortion", flow.distortion),
            ("ripple", flow.ripple),
        ];
        for (name, value) in scalars {
            if !value.is_finite() {
                return Err(ConfigError::Invalid(format!("flow.{name} must be finite")));
            }
        }
        if flow.gradient_size <= 0.0 {
            return Err(ConfigError::Invalid(
                "flow.gradient_size must be greater than zero".into(),
            ));
        }
        if flow.grain < 0.0 {
            return Err(ConfigError::Invalid("flow.grain must be >= 0".into()));
        }

        for (index, color) in flow.colors.iter().enumerate() {
            validate_color(&format!("flow.colors[{index}]"), *color)?;
        }
        validate_color("flow.dark_base", flow.dark_base)?;
        validate_color("flow.background", flow.background)
    }

    fn validate_breathing(&self) -> Result<(), ConfigError> {
        let breathing = &self.breathing;
        if !breathing.starting_gap.is_finite() || breathing.starting_gap <= 0.0 {
            return Err(ConfigError::Invalid(
                "breathing.starting_gap must be greater than zero".into(),
            ));
        }
        if !breathing.range.is_finite() || breathing.range < 0.0 {
            return Err(ConfigError::Invalid("breathing.range must be >= 0".into()));
        }
        if !breathing.speed.is_finite() || breathing.speed < 0.0 {
            return Err(ConfigError::Invalid("breathing.speed must be >= 0".into()));
        }
        if !breathing.top_offset.is_finite() {
            return Err(ConfigError::Invalid(
                "breathing.top_offset must be finite".into(),
            ));
        }
        if breathing.center.iter().any(|value| !value.is_finite()) {
            return Err(ConfigError::Invalid("breathing.center must be finite".into()));
        }

        if breathing.colors.len() != breathing.stops.len() {
            return Err(ConfigError::Invalid(format!(
                "breathing has {} colors but {} stops",
                breathing.colors.len(),
                breathing.stops.len()
            )));
        }
        if breathing.stops.len() < 2 || breathing.stops.len() > MAX_STOPS {
            return Err(ConfigError::Invalid(format!(
                "breathing needs between 2 and {MAX_STOPS} stops, got {}",
                breathing.stops.len()
            )));
        }
        let mut previous = f32::NEG_INFINITY;
        for &stop in &breathing.stops {
            if !(0.0..=100.0).contains(&stop) {
                return Err(ConfigError::Invalid(format!(
                    "breathing stop {stop} is outside 0-100"
                )));
            }
            if stop < previous {
                return Err(ConfigError::Invalid(
                    "breathing stops must be non-decreasing".into(),
                ));
            }
            previous = stop;
        }
        for (index, color) in breathing.colors.iter().enumerate() {
            validate_color(&format!("breathing.colors[{index}]"), *color)?;
        }
        Ok(())
    }
}

fn validate_color(name: &str, color: Color) -> Result<(), ConfigError> {
    if color
        .0
        .iter()
        .any(|channel| !channel.is_finite() || !(0.0..=1.0).contains(channel))
    {
        return Err(ConfigError::Invalid(format!(
            "{name} components must be within 0-1"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r##"
version = 1
scene = "breathing"

[window]
size = [1280, 720]
fps = 30
antialias = 4
color_space = "linear"

[touch]
throttle = "16ms"

[flow]
speed = 0.8
background = "#000000"

[breathing]
breathing = false
fade_in = 1.5
colors = ["#ff0000", [0.0, 0.0, 1.0]]
stops = [0, 100]
"##;

    #[test]
    fn parses_sample_config() {
        let config = FlowConfig::from_toml_str(SAMPLE).expect("parse config");
        assert_eq!(config.scene, SceneKind::Breathing);
        assert_eq!(config.window.size, (1280, 720));
        assert_eq!(config.target_fps(), Some(30.0));
        assert_eq!(config.window.antialias, AntialiasSetting::Samples4);
        assert_eq!(config.window.color_space, ColorSpaceSetting::Linear);
        assert_eq!(config.touch.throttle, Duration::from_millis(16));
        assert_eq!(config.flow.speed, 0.8);
        assert_eq!(config.flow.background, Color([0.0, 0.0, 0.0]));
        assert_eq!(config.flow.intensity, FlowSection::default().intensity);
        assert!(!config.breathing.breathing);
        assert_eq!(config.breathing.fade_in, Duration::from_millis(1500));
        assert_eq!(
            config.breathing.colors,
            vec![Color([1.0, 0.0, 0.0]), Color([0.0, 0.0, 1.0])]
        );
        assert_eq!(config.breathing.stops, vec![0.0, 100.0]);
    }

    #[test]
    fn empty_file_uses_defaults() {
        let config = FlowConfig::from_toml_str("").expect("empty config");
        assert_eq!(config, FlowConfig::default());
        assert_eq!(config.target_fps(), None);
    }

    #[test]
    fn defaults_round_trip_through_toml() {
        let config = FlowConfig::default();
        let text = config.to_toml_string().expect("serialise");
        let parsed = FlowConfig::from_toml_str(&text).expect("reparse");
        assert_eq!(parsed, config);
    }

    #[test]
    fn zero_fps_means_uncapped() {
        let config = FlowConfig::from_toml_str("[window]\nfps = 0\n").unwrap();
        assert_eq!(config.target_fps(), None);
    }

    #[test]
    fn rejects_unknown_version() {
        let err = FlowConfig::from_toml_str("version = 2").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_mismatched_stops() {
        let config = r##"
[breathing]
colors = ["#000000", "#ffffff", "#ff0000"]
stops = [0, 100]
"##;
        let err = FlowConfig::from_toml_str(config).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_decreasing_stops() {
        let config = r##"
[breathing]
colors = ["#000000", "#ffffff"]
stops = [60, 40]
"##;
        let err = FlowConfig::from_toml_str(config).unwrap_err();
        assert!(err.to_string().contains("non-decreasing"));
    }

    #[test]
    fn rejects_malformed_values() {
        assert!(matches!(
            FlowConfig::from_toml_str("[flow]\nbackground = \"#12345\"\n"),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            FlowConfig::from_toml_str("[touch]\nthrottle = \"soon\"\n"),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            FlowConfig::from_toml_str("[window]\nantialias = 3\n"),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            FlowConfig::from_toml_str("[window]\nsize = [0, 720]\n"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            FlowConfig::from_toml_str("[flow]\ndark_base = [1.5, 0.0, 0.0]\n"),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn parses_hex_colors() {
        assert_eq!(
            Color::parse_hex("#ff8000").unwrap(),
            Color([1.0, 128.0 / 255.0, 0.0])
        );
        assert_eq!(Color::parse_hex("12110f").unwrap(), Color::from_hex(0x12110f));
        assert!(Color::parse_hex("#gg0000").is_err());
    }

    #[test]
    fn antialias_display_parses_back() {
        for setting in [
            AntialiasSetting::Auto,
            AntialiasSetting::Off,
            AntialiasSetting::Samples2,
            AntialiasSetting::Samples16,
        ] {
            assert_eq!(parse_antialias(&setting.to_string()), Ok(setting));
        }
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.toml");
        let err = FlowConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "scene = \"breathing\"\n").unwrap();
        let config = FlowConfig::load(&path).unwrap();
        assert_eq!(config.scene, SceneKind::Breathing);
    }
}
