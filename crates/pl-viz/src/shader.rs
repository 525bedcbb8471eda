//! WGSL generation for scheme-colored rendering
//!
//! The gradient is baked into shader text as a branch chain rather than a
//! palette texture, so a waterfall pipeline needs no extra bindings and the
//! fragment path evaluates the same stop scan as
//! [`ColorScheme::interpolate`]. Generation is pure (scheme value in, text
//! out); pipeline caching is the scene's job, never a hidden global.

use crate::scheme::{ColorScheme, SchemeRegistry};

/// Vertex-side frequency warp, embedded verbatim in every plot shader
///
/// Mirrors `pl_core::cents_deviation`, `fisheye::normalized_position`, and
/// `fisheye::fisheye` including the non-positive-frequency guard; the CPU
/// and GPU forms are equivalence-tested at a grid of inputs.
pub const FISHEYE_WGSL: &str = r#"
fn cents_deviation(freq: f32, target_freq: f32) -> f32 {
    if (freq <= 0.0 || target_freq <= 0.0) {
        return 0.0;
    }
    return 1200.0 * log2(freq / target_freq);
}

fn normalized_position(cents: f32, half_range: f32) -> f32 {
    if (half_range <= 0.0) {
        return 0.5;
    }
    return (cents + half_range) / (2.0 * half_range);
}

fn fisheye(x01: f32, distortion: f32) -> f32 {
    let x = (x01 - 0.5) * 2.0;
    var t = x / (1.0 + abs(x) * distortion);
    t = t * (1.0 + distortion);
    return (t + 1.0) / 2.0;
}
"#;

/// WGSL `fn scheme_color(magnitude) -> vec3<f32>` for one scheme
///
/// Clamps the input, then emits one branch per consecutive stop pair
/// returning that pair's interpolation; the final stop's color is the
/// fall-through default.
pub fn scheme_color_source(scheme: &ColorScheme) -> String {
    let mut src = String::new();
    src.push_str("fn scheme_color(magnitude: f32) -> vec3<f32> {\n");
    src.push_str("    let m = clamp(magnitude, 0.0, 1.0);\n");

    for pair in scheme.stops.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        src.push_str(&format!("    if (m <= {:.6}) {{\n", b.position));
        src.push_str(&format!(
            "        let t = (m - {:.6}) / {:.6};\n",
            a.position,
            b.position - a.position
        ));
        src.push_str(&format!(
            "        return mix(vec3<f32>({:.6}, {:.6}, {:.6}), vec3<f32>({:.6}, {:.6}, {:.6}), t);\n",
            a.color.r, a.color.g, a.color.b, b.color.r, b.color.g, b.color.b
        ));
        src.push_str("    }\n");
    }

    let last = scheme.stops[scheme.stops.len() - 1].color;
    src.push_str(&format!(
        "    return vec3<f32>({:.6}, {:.6}, {:.6});\n",
        last.r, last.g, last.b
    ));
    src.push_str("}\n");
    src
}

/// WGSL `fn waterfall_color(magnitude, threshold, reduced_visual) -> vec3<f32>`
///
/// The combined fragment contract: magnitudes below the threshold render
/// black (noise gate); reduced-visual mode maps the remainder onto the pure
/// black/white axis regardless of scheme; otherwise the scheme gradient
/// applies. Includes `scheme_color` so the output is self-contained.
pub fn waterfall_color_source(scheme: &ColorScheme) -> String {
    let mut src = scheme_color_source(scheme);
    src.push('\n');
    src.push_str(
        "fn waterfall_color(magnitude: f32, threshold: f32, reduced_visual: u32) -> vec3<f32> {\n\
         \x20   if (magnitude < threshold) {\n\
         \x20       return vec3<f32>(0.0, 0.0, 0.0);\n\
         \x20   }\n\
         \x20   if (reduced_visual != 0u) {\n\
         \x20       let m = clamp(magnitude, 0.0, 1.0);\n\
         \x20       return vec3<f32>(m, m, m);\n\
         \x20   }\n\
         \x20   return scheme_color(magnitude);\n\
         }\n",
    );
    src
}

/// Full waterfall render shader for one scheme
///
/// The vertex stage warps column positions through the shared fisheye
/// mapping (falling back to linear placement when no target is set); the
/// fragment stage samples the scrolling history texture and colors it via
/// `waterfall_color`.
pub fn waterfall_shader_source(scheme: &ColorScheme) -> String {
    format!(
        r#"struct WaterfallUniforms {{
    start_frequency: f32,
    end_frequency: f32,
    target_frequency: f32,
    half_range_cents: f32,
    distortion: f32,
    scroll_offset: f32,
    threshold: f32,
    texel_v: f32,
    reduced_visual: u32,
}}

@group(0) @binding(0) var<uniform> u: WaterfallUniforms;
@group(0) @binding(1) var history: texture_2d<f32>;
@group(0) @binding(2) var history_sampler: sampler;

struct VertexInput {{
    @location(0) x01: f32,
    @location(1) y01: f32,
}}

struct VertexOutput {{
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
}}
{fisheye}
@vertex
fn vs_main(input: VertexInput) -> VertexOutput {{
    var x = input.x01;
    if (u.target_frequency > 0.0 && u.half_range_cents > 0.0) {{
        let freq = mix(u.start_frequency, u.end_frequency, input.x01);
        let cents = cents_deviation(freq, u.target_frequency);
        x = fisheye(normalized_position(cents, u.half_range_cents), u.distortion);
    }}

    var output: VertexOutput;
    output.position = vec4<f32>(x * 2.0 - 1.0, input.y01 * 2.0 - 1.0, 0.0, 1.0);
    output.uv = vec2<f32>(input.x01, input.y01);
    return output;
}}

{color_fns}
@fragment
fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {{
    // Newest row sits at the bottom edge; older rows scroll upward.
    // The v axis wraps through the ring texture via the repeat sampler.
    let v = fract(u.scroll_offset - 0.5 * u.texel_v - input.uv.y * (1.0 - u.texel_v));
    let magnitude = textureSample(history, history_sampler, vec2<f32>(input.uv.x, v)).r;
    return vec4<f32>(waterfall_color(magnitude, u.threshold, u.reduced_visual), 1.0);
}}
"#,
        fisheye = FISHEYE_WGSL,
        color_fns = waterfall_color_source(scheme),
    )
}

/// Shader text for a scheme name, applying the registry fallback chain
///
/// The pure `name -> source` entry point for callers managing their own
/// GPU pipeline.
pub fn shader_source_for(registry: &SchemeRegistry, name: &str) -> String {
    waterfall_shader_source(registry.lookup(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheme_color_branch_count() {
        let registry = SchemeRegistry::builtin();
        for scheme in registry.schemes() {
            let src = scheme_color_source(scheme);
            let branches = src.matches("if (m <= ").count();
            assert_eq!(
                branches,
                scheme.stops.len() - 1,
                "one branch per stop pair in {}",
                scheme.name
            );
            // last stop is the fall-through default
            let last = scheme.stops[scheme.stops.len() - 1].color;
            assert!(src.contains(&format!(
                "    return vec3<f32>({:.6}, {:.6}, {:.6});",
                last.r, last.g, last.b
            )));
        }
    }

    #[test]
    fn test_scheme_color_clamps_input() {
        let registry = SchemeRegistry::builtin();
        let src = scheme_color_source(registry.lookup("Viridis"));
        assert!(src.contains("clamp(magnitude, 0.0, 1.0)"));
    }

    #[test]
    fn test_waterfall_color_contract() {
        let registry = SchemeRegistry::builtin();
        let src = waterfall_color_source(registry.lookup("Viridis"));
        assert!(src.contains("fn scheme_color(magnitude: f32)"));
        assert!(src.contains("fn waterfall_color(magnitude: f32, threshold: f32, reduced_visual: u32)"));
        assert!(src.contains("magnitude < threshold"));
        assert!(src.contains("reduced_visual != 0u"));
    }

    #[test]
    fn test_full_shader_has_entry_points() {
        let registry = SchemeRegistry::builtin();
        for scheme in registry.schemes() {
            let src = waterfall_shader_source(scheme);
            assert!(src.contains("fn vs_main"));
            assert!(src.contains("fn fs_main"));
            assert!(src.contains("fn fisheye"));
            assert!(src.contains("fn cents_deviation"));
            // braces balance, a cheap structural sanity check
            let open = src.matches('{').count();
            let close = src.matches('}').count();
            assert_eq!(open, close, "unbalanced braces for {}", scheme.name);
        }
    }

    #[test]
    fn test_shader_source_for_falls_back() {
        let registry = SchemeRegistry::builtin();
        let unknown = shader_source_for(&registry, "nonexistent");
        let viridis = shader_source_for(&registry, "Viridis");
        assert_eq!(unknown, viridis);
    }
}
