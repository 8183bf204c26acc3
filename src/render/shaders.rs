//! WGSL programs for the four scene pipelines. The globals block is shared;
//! each material adds its own group(2) (or group(1) for the fireflies,
//! which have no per-node transform).

pub(crate) const GLOBALS_WGSL: &str = r#"
struct Globals {
    view_proj: mat4x4<f32>,
    camera_pos: vec4<f32>,
    fog_color: vec4<f32>,
    fog_params: vec4<f32>,
    viewport: vec4<f32>,
}

@group(0) @binding(0)
var<uniform> globals: Globals;

fn apply_fog(color: vec3<f32>, world_pos: vec3<f32>) -> vec3<f32> {
    let dist = distance(globals.camera_pos.xyz, world_pos);
    let factor = smoothstep(globals.fog_params.x, globals.fog_params.y, dist);
    return mix(color, globals.fog_color.rgb, factor);
}
"#;

pub(crate) const NODE_WGSL: &str = r#"
struct NodeUniform {
    model: mat4x4<f32>,
}

@group(1) @binding(0)
var<uniform> node: NodeUniform;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) uv: vec2<f32>,
}

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
    @location(1) world_pos: vec3<f32>,
}

@vertex
fn vs_main(input: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    let world_pos = node.model * vec4<f32>(input.position, 1.0);
    out.position = globals.view_proj * world_pos;
    out.uv = input.uv;
    out.world_pos = world_pos.xyz;
    return out;
}
"#;

pub(crate) const BAKED_FS: &str = r#"
@group(2) @binding(0)
var baked_map: texture_2d<f32>;
@group(2) @binding(1)
var baked_sampler: sampler;

@fragment
fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    let baked = textureSample(baked_map, baked_sampler, input.uv).rgb;
    return vec4<f32>(apply_fog(baked, input.world_pos), 1.0);
}
"#;

pub(crate) const FLAT_FS: &str = r#"
struct FlatUniform {
    color: vec4<f32>,
}

@group(2) @binding(0)
var<uniform> flat_material: FlatUniform;

@fragment
fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    return vec4<f32>(apply_fog(flat_material.color.rgb, input.world_pos), 1.0);
}
"#;

pub(crate) const PORTAL_FS: &str = r#"
struct PortalUniform {
    color_start: vec4<f32>,
    color_end: vec4<f32>,
    // x: elapsed time
    time: vec4<f32>,
}

@group(2) @binding(0)
var<uniform> portal: PortalUniform;

fn hash21(p: vec2<f32>) -> f32 {
    return fract(sin(dot(p, vec2<f32>(127.1, 311.7))) * 43758.5453123);
}

fn value_noise(p: vec2<f32>) -> f32 {
    let cell = floor(p);
    let frac_part = fract(p);
    let smooth_t = frac_part * frac_part * (3.0 - 2.0 * frac_part);

    let a = hash21(cell);
    let b = hash21(cell + vec2<f32>(1.0, 0.0));
    let c = hash21(cell + vec2<f32>(0.0, 1.0));
    let d = hash21(cell + vec2<f32>(1.0, 1.0));

    return mix(mix(a, b, smooth_t.x), mix(c, d, smooth_t.x), smooth_t.y);
}

fn fbm(p: vec2<f32>) -> f32 {
    var total = 0.0;
    var amplitude = 0.5;
    var frequency = p;
    for (var i = 0; i < 4; i = i + 1) {
        total += value_noise(frequency) * amplitude;
        frequency = frequency * 2.0;
        amplitude = amplitude * 0.5;
    }
    return total;
}

@fragment
fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    let t = portal.time.x;

    // Swirl the lookup so the noise pattern churns instead of scrolling.
    let displaced = input.uv + vec2<f32>(
        fbm(input.uv * 5.0 + vec2<f32>(t * 0.1, 0.0)),
        fbm(input.uv * 5.0 - vec2<f32>(0.0, t * 0.1)),
    ) * 0.1;

    var strength = fbm(displaced * 5.0 + vec2<f32>(t * 0.2)) * 2.0 - 0.5;

    // Outer ring glow plus a sharp step to whiten the rim.
    let outer_glow = distance(input.uv, vec2<f32>(0.5)) * 4.0 - 1.4;
    strength += outer_glow;
    strength += step(-0.2, strength) * 0.8;
    strength = clamp(strength, 0.0, 1.0);

    let color = mix(portal.color_start.rgb, portal.color_end.rgb, strength);
    return vec4<f32>(color, 1.0);
}
"#;

pub(crate) const FIREFLIES_WGSL: &str = r#"
struct FirefliesUniform {
    // x: elapsed time, y: pixel ratio, z: point size
    params: vec4<f32>,
}

@group(1) @binding(0)
var<uniform> fireflies: FirefliesUniform;

struct VertexInput {
    @location(0) corner: vec2<f32>,
    @location(1) center: vec3<f32>,
    @location(2) scale: f32,
}

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) corner: vec2<f32>,
}

@vertex
fn vs_main(input: VertexInput) -> VertexOutput {
    let time = fireflies.params.x;
    let pixel_ratio = fireflies.params.y;
    let point_size = fireflies.params.z;

    var world = input.center;
    world.y += sin(time + input.center.x * 100.0) * input.scale * 0.2;

    var clip = globals.view_proj * vec4<f32>(world, 1.0);

    // Pixel-sized billboard; skipping the perspective divide compensation
    // keeps the classic point attenuation (farther fireflies are smaller).
    let size_px = point_size * input.scale * pixel_ratio;
    clip.x += input.corner.x * size_px * 2.0 / globals.viewport.x;
    clip.y += input.corner.y * size_px * 2.0 / globals.viewport.y;

    var out: VertexOutput;
    out.position = clip;
    out.corner = input.corner;
    return out;
}

@fragment
fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    let dist = length(input.corner);
    let strength = clamp(0.05 / max(dist, 0.001) - 0.1, 0.0, 1.0);
    return vec4<f32>(vec3<f32>(strength), 1.0);
}
"#;

/// Assembles a scene-geometry shader: globals + node transform + fragment.
pub(crate) fn scene_shader(fragment: &str) -> String {
    format!("{GLOBALS_WGSL}\n{NODE_WGSL}\n{fragment}")
}

/// Assembles the fireflies shader: globals + billboard program.
pub(crate) fn fireflies_shader() -> String {
    format!("{GLOBALS_WGSL}\n{FIREFLIES_WGSL}")
}
