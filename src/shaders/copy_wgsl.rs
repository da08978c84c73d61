//! WGSL source for the strided copy kernel.
//!
//! Handles both directions of materialization: strided-to-contiguous (making
//! a view dense before kernels that need unit strides) and
//! contiguous-to-strided (writing into a sliced region of an existing
//! buffer). The kernel iterates a logical shape in row-major order and maps
//! each index through independent read and write layouts.

/// Strided copy shader module source (f32)
///
/// Parameter layout (u32 words):
/// `[numel, ndim, src_offset, dst_offset, shape[8], src_strides[8], dst_strides[8]]`
/// with strides bitcast from i32.
pub const COPY_SHADER: &str = r#"
const MAX_DIMS: u32 = 8u;
const WORKGROUP_SIZE: u32 = 256u;

@group(0) @binding(0) var<storage, read> src: array<f32>;
@group(0) @binding(1) var<storage, read> params: array<u32>;
@group(0) @binding(2) var<storage, read_write> dst: array<f32>;

fn shape_at(d: u32) -> u32 {
    return params[4u + d];
}

fn src_stride_at(d: u32) -> i32 {
    return bitcast<i32>(params[12u + d]);
}

fn dst_stride_at(d: u32) -> i32 {
    return bitcast<i32>(params[20u + d]);
}

@compute @workgroup_size(256)
fn strided_copy_f32(@builtin(global_invocation_id) global_id: vec3<u32>) {
    let gid = global_id.x;
    if (gid >= params[0]) {
        return;
    }

    let ndim = params[1];
    var remaining = gid;
    var s_off: i32 = i32(params[2]);
    var d_off: i32 = i32(params[3]);

    for (var d: i32 = i32(ndim) - 1; d >= 0; d = d - 1) {
        let dim = shape_at(u32(d));
        let idx = remaining % dim;
        remaining = remaining / dim;
        s_off = s_off + i32(idx) * src_stride_at(u32(d));
        d_off = d_off + i32(idx) * dst_stride_at(u32(d));
    }

    dst[u32(d_off)] = src[u32(s_off)];
}
"#;
