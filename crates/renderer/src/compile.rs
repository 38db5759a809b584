use std::borrow::Cow;

use wgpu::naga::ShaderStage;

use crate::types::Scene;

/// Compiles the backdrop plane vertex shader.
pub(crate) fn compile_vertex_shader(device: &wgpu::Device) -> wgpu::ShaderModule {
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("backdrop plane vertex"),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Owned(vertex_source()),
            stage: ShaderStage::Vertex,
            defines: &[],
        },
    })
}

/// Compiles the fragment program for `scene`.
pub(crate) fn compile_fragment_shader(device: &wgpu::Device, scene: Scene) -> wgpu::ShaderModule {
    let label = match scene {
        Scene::Flow => "flow gradient fragment",
        Scene::Breathing => "breathing gradient fragment",
    };
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Owned(fragment_source(scene)),
            stage: ShaderStage::Fragment,
            defines: &[],
        },
    })
}

pub(crate) fn vertex_source() -> String {
    format!("{VERSION}{UNIFORM_BLOCK}{VERTEX_BODY}")
}

pub(crate) fn fragment_source(scene: Scene) -> String {
    let body = match scene {
        Scene::Flow => FLOW_FRAGMENT_BODY,
        Scene::Breathing => BREATHING_FRAGMENT_BODY,
    };
    format!("{VERSION}{UNIFORM_BLOCK}{TOUCH_BINDINGS}{body}")
}

const VERSION: &str = "#version 450\n";

/// Mirrors `FlowUniforms` member for member.
const UNIFORM_BLOCK: &str = r"
layout(std140, set = 0, binding = 0) uniform FlowParams {
    mat4 view_proj;
    vec4 clock;
    vec4 resolution;
    vec4 colors[6];
    vec4 dark_base;
    vec4 motion;
    vec4 weights;
    vec4 breath;
} params;
";

const TOUCH_BINDINGS: &str = r"
layout(set = 1, binding = 0) uniform texture2D touch_texture;
layout(set = 1, binding = 1) uniform sampler touch_sampler;
";

const VERTEX_BODY: &str = r"
layout(location = 0) in vec3 a_position;
layout(location = 1) in vec2 a_uv;
layout(location = 0) out vec2 v_uv;

void main() {
    v_uv = a_uv;
    gl_Position = params.view_proj * vec4(a_position, 1.0);
}
";

const FLOW_FRAGMENT_BODY: &str = r"
layout(location = 0) in vec2 v_uv;
layout(location = 0) out vec4 out_color;

float grain(vec2 uv, float t) {
    vec2 p = uv * params.resolution.xy * 0.5 + vec2(t);
    return fract(sin(dot(p, vec2(12.9898, 78.233))) * 43758.5453) * 2.0 - 1.0;
}

float influence(vec2 uv, vec2 center) {
    return 1.0 - smoothstep(0.0, params.motion.w, length(uv - center));
}

vec3 field_color(vec2 uv, float time) {
    float s = time * params.motion.x;
    float w1 = params.weights.x;
    float w2 = params.weights.y;

    vec2 c1 = vec2(0.5 + sin(s * 0.3) * 0.45, 0.5 + cos(s * 0.4) * 0.45);
    vec2 c2 = vec2(0.5 + cos(s * 0.5) * 0.5, 0.5 + sin(s * 0.35) * 0.5);
    vec2 c3 = vec2(0.5 + sin(s * 0.25) * 0.4, 0.5 + cos(s * 0.45) * 0.4);
    vec2 c4 = vec2(0.5 + cos(s * 0.4) * 0.45, 0.5 + sin(s * 0.3) * 0.45);
    vec2 c5 = vec2(0.5 + sin(s * 0.55) * 0.35, 0.5 + cos(s * 0.5) * 0.35);
    vec2 c6 = vec2(0.5 + cos(s * 0.35) * 0.5, 0.5 + sin(s * 0.55) * 0.5);

    vec3 color = vec3(0.0);
    color += params.colors[0].rgb * influence(uv, c1) * (0.5 + 0.5 * sin(s * 0.8)) * w1;
    color += params.colors[1].rgb * influence(uv, c2) * (0.5 + 0.5 * cos(s * 1.0)) * w2;
    color += params.colors[2].rgb * influence(uv, c3) * (0.5 + 0.5 * sin(s * 0.6)) * w1;
    color += params.colors[3].rgb * influence(uv, c4) * (0.5 + 0.5 * cos(s * 1.1)) * w2;
    color += params.colors[4].rgb * influence(uv, c5) * (0.5 + 0.5 * sin(s * 0.9)) * w1 * 0.7;
    color += params.colors[5].rgb * influence(uv, c6) * (0.5 + 0.5 * cos(s * 0.7)) * w2;

    color = clamp(color, vec3(0.0), vec3(1.0)) * params.motion.y;

    float lum = dot(color, vec3(0.299, 0.587, 0.114));
    color = mix(vec3(lum), color, 1.4);
    color = pow(max(color, vec3(0.0)), vec3(0.95));

    float brightness = length(color);
    return mix(params.dark_base.rgb, color, max(brightness * 1.3, 0.1));
}

void main() {
    vec2 uv = v_uv;
    // Raster row 0 is the top of the surface.
    vec4 touch = texture(sampler2D(touch_texture, touch_sampler), vec2(uv.x, 1.0 - uv.y));
    uv -= (touch.rg * 2.0 - vec2(1.0)) * params.weights.z * touch.b;

    float dist = length(uv - vec2(0.5));
    float ripple = sin(dist * 15.0 - params.clock.x * 2.5) * params.weights.w * touch.b;
    uv += vec2(ripple);

    vec3 color = field_color(uv, params.clock.x);
    color += vec3(grain(uv, params.clock.x) * params.motion.z);
    out_color = vec4(clamp(color, vec3(0.0), vec3(1.0)), 1.0);
}
";

const BREATHING_FRAGMENT_BODY: &str = r"
layout(location = 0) in vec2 v_uv;
layout(location = 0) out vec4 out_color;

void main() {
    vec2 res = params.resolution.xy;
    vec2 mid = res * 0.5;
    vec2 pixel = vec2(v_uv.x, 1.0 - v_uv.y) * res;
    pixel = (pixel - mid) / params.resolution.w + mid;

    vec2 center = params.breath.zw * res;
    vec2 radii = max(params.breath.xy * 0.01 * res, vec2(0.0001));
    float t = length((pixel - center) / radii);

    int count = int(params.dark_base.w);
    vec3 color = params.colors[0].rgb;
    for (int i = 1; i < 6; i++) {
        if (i >= count) {
            break;
        }
        float a = params.colors[i - 1].a;
        float b = params.colors[i].a;
        if (t >= a) {
            float k = 1.0;
            if (b > a) {
                k = clamp((t - a) / (b - a), 0.0, 1.0);
            }
            color = mix(params.colors[i - 1].rgb, params.colors[i].rgb, k);
        }
    }

    out_color = vec4(color * params.clock.z, 1.0);
}
";

#[cfg(test)]
mod tests {
    use wgpu::naga::front::glsl::{Frontend, Options};
    use wgpu::naga::valid::{Capabilities, ValidationFlags, Validator};

    use super::*;

    fn validate(source: &str, stage: ShaderStage) {
        let module = Frontend::default()
            .parse(&Options::from(stage), source)
            .unwrap_or_else(|err| panic!("{stage:?} parse failed: {err:?}\n{source}"));
        Validator::new(ValidationFlags::all(), Capabilities::all())
            .validate(&module)
            .unwrap_or_else(|err| panic!("{stage:?} validation failed: {err:?}"));
    }

    #[test]
    fn vertex_program_validates() {
        validate(&vertex_source(), ShaderStage::Vertex);
    }

    #[test]
    fn flow_program_validates() {
        validate(&fragment_source(Scene::Flow), ShaderStage::Fragment);
    }

    #[test]
    fn breathing_program_validates() {
        validate(&fragment_source(Scene::Breathing), ShaderStage::Fragment);
    }

    #[test]
    fn uniform_block_matches_rust_layout() {
        let members = UNIFORM_BLOCK
            .lines()
            .filter(|line| line.trim_start().starts_with("vec4") || line.contains("mat4"))
            .count();
        assert_eq!(members, 8);
    }
}
