//! WGSL source for the strided element-wise binary kernels.
//!
//! One kernel per operation (add/sub/mul/div), all reading both operands
//! through per-operand offset and strides so that broadcast dimensions
//! (stride 0) replay the same value across the output extent. The output is
//! always written contiguously in row-major order.
//!
//! Parameters travel in a storage buffer rather than a uniform: WGSL uniform
//! arrays require 16-byte element alignment, which a flat u32 array avoids.

/// Element-wise strided binary shader module source (f32)
///
/// Parameter layout (u32 words):
/// `[numel, ndim, a_offset, b_offset, shape[8], a_strides[8], b_strides[8]]`
/// with strides bitcast from i32.
pub const ELEMENTWISE_SHADER: &str = r#"
const MAX_DIMS: u32 = 8u;
const WORKGROUP_SIZE: u32 = 256u;

// Operands and parameters are read-only so both operands may alias the
// same buffer; only the output binding is writable.
@group(0) @binding(0) var<storage, read> src_a: array<f32>;
@group(0) @binding(1) var<storage, read> src_b: array<f32>;
@group(0) @binding(2) var<storage, read> params: array<u32>;
@group(0) @binding(3) var<storage, read_write> dst: array<f32>;

fn shape_at(d: u32) -> u32 {
    return params[4u + d];
}

fn a_stride_at(d: u32) -> i32 {
    return bitcast<i32>(params[12u + d]);
}

fn b_stride_at(d: u32) -> i32 {
    return bitcast<i32>(params[20u + d]);
}

// Map a linear output index to the two operand element positions by walking
// the output shape in row-major order and applying each operand's strides.
fn load_operands(gid: u32) -> vec2<f32> {
    let ndim = params[1];
    var remaining = gid;
    var a_off: i32 = i32(params[2]);
    var b_off: i32 = i32(params[3]);

    for (var d: i32 = i32(ndim) - 1; d >= 0; d = d - 1) {
        let dim = shape_at(u32(d));
        let idx = remaining % dim;
        remaining = remaining / dim;
        a_off = a_off + i32(idx) * a_stride_at(u32(d));
        b_off = b_off + i32(idx) * b_stride_at(u32(d));
    }

    return vec2<f32>(src_a[u32(a_off)], src_b[u32(b_off)]);
}

@compute @workgroup_size(256)
fn add_f32(@builtin(global_invocation_id) global_id: vec3<u32>) {
    let gid = global_id.x;
    if (gid >= params[0]) {
        return;
    }
    let v = load_operands(gid);
    dst[gid] = v.x + v.y;
}

@compute @workgroup_size(256)
fn sub_f32(@builtin(global_invocation_id) global_id: vec3<u32>) {
    let gid = global_id.x;
    if (gid >= params[0]) {
        return;
    }
    let v = load_operands(gid);
    dst[gid] = v.x - v.y;
}

@compute @workgroup_size(256)
fn mul_f32(@builtin(global_invocation_id) global_id: vec3<u32>) {
    let gid = global_id.x;
    if (gid >= params[0]) {
        return;
    }
    let v = load_operands(gid);
    dst[gid] = v.x * v.y;
}

@compute @workgroup_size(256)
fn div_f32(@builtin(global_invocation_id) global_id: vec3<u32>) {
    let gid = global_id.x;
    if (gid >= params[0]) {
        return;
    }
    let v = load_operands(gid);
    dst[gid] = v.x / v.y;
}
"#;
