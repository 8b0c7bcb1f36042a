//! WGSL compute shaders of the GPU backend
//!
//! Every shader works on tightly packed storage buffers laid out exactly like
//! `PixelData`, one invocation per output pixel, 16x16 workgroups. Bindings
//! are shared by all shaders:
//!
//! - 0: input pixels (read-only storage)
//! - 1: output pixels (read-write storage)
//! - 2: `KernelParams` (uniform)

use crate::pad::PaddingMethod;
use crate::types::PixelFormat;

pub const GAMMA_CORRECT: &str = "compositor_gamma_correct";
pub const GAMMA_UNCORRECT: &str = "compositor_gamma_uncorrect";
pub const JUMP_FLOODING_PASS: &str = "compositor_jump_flooding_pass";

const PAD_PREFIX: &str = "compositor_pad_";

/// Side of the square workgroups every shader is compiled with
pub const WORKGROUP_SIZE: u32 = 16;

// `PIXEL` is replaced by the WGSL type of the pixel format
const BINDINGS: &str = r#"
struct KernelParams {
    input_size: vec2<i32>,
    output_size: vec2<i32>,
    offset: vec2<i32>,
    step_size: i32,
    _padding: i32,
};

@group(0) @binding(0) var<storage, read> input_pixels: array<PIXEL>;
@group(0) @binding(1) var<storage, read_write> output_pixels: array<PIXEL>;
@group(0) @binding(2) var<uniform> params: KernelParams;

fn input_index(texel: vec2<i32>) -> i32 {
    return texel.y * params.input_size.x + texel.x;
}

fn is_inside_input(texel: vec2<i32>) -> bool {
    return all(texel >= vec2<i32>(0)) && all(texel < params.input_size);
}
"#;

// `ADJUST` is replaced by the gamma expression of `straight`
const GAMMA: &str = r#"
@compute @workgroup_size(16, 16, 1)
fn main(@builtin(global_invocation_id) id: vec3<u32>) {
    let texel = vec2<i32>(id.xy);
    if (any(texel >= params.output_size)) {
        return;
    }

    let color = input_pixels[input_index(texel)];
    let alpha = select(1.0, color.a, color.a > 0.0);
    let straight = max(color.rgb / alpha, vec3<f32>(0.0));
    output_pixels[texel.y * params.output_size.x + texel.x] = vec4<f32>((ADJUST) * alpha, color.a);
}
"#;

// `LOAD` is replaced by the padding specific load of `source`
const PAD: &str = r#"
@compute @workgroup_size(16, 16, 1)
fn main(@builtin(global_invocation_id) id: vec3<u32>) {
    let texel = vec2<i32>(id.xy);
    if (any(texel >= params.output_size)) {
        return;
    }

    let source = texel - params.offset;
    var value = PIXEL();
    LOAD
    output_pixels[texel.y * params.output_size.x + texel.x] = value;
}
"#;

const PAD_ZERO_LOAD: &str = r#"if (is_inside_input(source)) {
        value = input_pixels[input_index(source)];
    }"#;

const PAD_EXTEND_LOAD: &str =
    "value = input_pixels[input_index(clamp(source, vec2<i32>(0), params.input_size - vec2<i32>(1)))];";

const JUMP_FLOODING: &str = r#"
const NON_FLOODED: vec2<i32> = vec2<i32>(-1, -1);

fn load_flooded(texel: vec2<i32>) -> vec2<i32> {
    if (is_inside_input(texel)) {
        return input_pixels[input_index(texel)];
    }
    return NON_FLOODED;
}

@compute @workgroup_size(16, 16, 1)
fn main(@builtin(global_invocation_id) id: vec3<u32>) {
    let texel = vec2<i32>(id.xy);
    if (any(texel >= params.output_size)) {
        return;
    }

    var closest = NON_FLOODED;
    var minimum = 0;
    var found = false;
    for (var j = -1; j <= 1; j++) {
        for (var i = -1; i <= 1; i++) {
            let value = load_flooded(texel + vec2<i32>(i, j) * params.step_size);
            if (all(value == NON_FLOODED)) {
                continue;
            }

            let difference = texel - value;
            let squared_distance = dot(difference, difference);
            if (!found || squared_distance < minimum) {
                found = true;
                minimum = squared_distance;
                closest = value;
            }
        }
    }

    output_pixels[texel.y * params.output_size.x + texel.x] = closest;
}
"#;

fn wgsl_type(format: PixelFormat) -> &'static str {
    match format {
        PixelFormat::Float => "f32",
        PixelFormat::Float2 => "vec2<f32>",
        PixelFormat::Float4 => "vec4<f32>",
        PixelFormat::Int2 => "vec2<i32>",
    }
}

fn format_suffix(format: PixelFormat) -> &'static str {
    match format {
        PixelFormat::Float => "float",
        PixelFormat::Float2 => "float2",
        PixelFormat::Float4 => "float4",
        PixelFormat::Int2 => "int2",
    }
}

fn method_suffix(method: PaddingMethod) -> &'static str {
    match method {
        PaddingMethod::Zero => "zero",
        PaddingMethod::Extend => "extend",
    }
}

fn with_bindings(format: PixelFormat, body: &str) -> String {
    let mut source = BINDINGS.to_string();
    source.push_str(body);
    source.replace("PIXEL", wgsl_type(format))
}

/// Name of the padding shader for results of `format`
pub fn pad_shader_name(method: PaddingMethod, format: PixelFormat) -> String {
    format!("{PAD_PREFIX}{}_{}", method_suffix(method), format_suffix(format))
}

/// WGSL source of the named shader, `None` if no shader has that name
pub fn shader_source(name: &str) -> Option<String> {
    match name {
        GAMMA_CORRECT => Some(with_bindings(
            PixelFormat::Float4,
            &GAMMA.replace("ADJUST", "straight * straight"),
        )),
        GAMMA_UNCORRECT => Some(with_bindings(
            PixelFormat::Float4,
            &GAMMA.replace("ADJUST", "sqrt(straight)"),
        )),
        JUMP_FLOODING_PASS => Some(with_bindings(PixelFormat::Int2, JUMP_FLOODING)),
        _ => {
            let (method, format) = name.strip_prefix(PAD_PREFIX)?.split_once('_')?;
            let load = match method {
                "zero" => PAD_ZERO_LOAD,
                "extend" => PAD_EXTEND_LOAD,
                _ => return None,
            };
            let format = [
                PixelFormat::Float,
                PixelFormat::Float2,
                PixelFormat::Float4,
                PixelFormat::Int2,
            ]
            .into_iter()
            .find(|candidate| format_suffix(*candidate) == format)?;
            Some(with_bindings(format, &PAD.replace("LOAD", load)))
        }
    }
}
