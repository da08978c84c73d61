//! Launcher for the strided element-wise binary kernels.

use wgpu::{Buffer, SubmissionIndex};

use super::elementwise_wgsl::ELEMENTWISE_SHADER;
use super::pipeline::{LayoutKey, MAX_DIMS, workgroup_count};
use crate::device::GpuContext;
use crate::error::{Error, Result};

/// Bind group shape shared by all element-wise kernels:
/// a, b, params (read-only) + out (read-write)
const BINARY_LAYOUT: LayoutKey = LayoutKey {
    num_read_buffers: 3,
    num_write_buffers: 1,
    num_uniform_buffers: 0,
};

/// Pack the strided binary parameter block.
///
/// Word layout (matches the WGSL side):
/// `[numel, ndim, a_offset, b_offset, shape[8], a_strides[8], b_strides[8]]`
pub fn pack_binary_params(
    out_shape: &[usize],
    a_strides: &[isize],
    a_offset: usize,
    b_strides: &[isize],
    b_offset: usize,
) -> Result<Vec<u32>> {
    let ndim = out_shape.len();
    if ndim > MAX_DIMS {
        return Err(Error::InvalidArgument {
            arg: "shape",
            reason: format!("rank {} exceeds the supported maximum {}", ndim, MAX_DIMS),
        });
    }

    let numel: usize = out_shape.iter().product();
    let mut params = vec![0u32; 4 + 3 * MAX_DIMS];
    params[0] = numel as u32;
    params[1] = ndim as u32;
    params[2] = a_offset as u32;
    params[3] = b_offset as u32;
    for (d, &s) in out_shape.iter().enumerate() {
        params[4 + d] = s as u32;
    }
    for (d, &s) in a_strides.iter().enumerate() {
        params[4 + MAX_DIMS + d] = (s as i32) as u32;
    }
    for (d, &s) in b_strides.iter().enumerate() {
        params[4 + 2 * MAX_DIMS + d] = (s as i32) as u32;
    }
    Ok(params)
}

/// Launch a strided element-wise binary kernel.
///
/// `entry` is the kernel entry point (`add_f32`, `sub_f32`, `mul_f32`,
/// `div_f32`) and doubles as the pipeline cache key. Both operands are read
/// through the offsets/strides packed into `params`; the output is written
/// contiguously.
///
/// Returns the submission index of the enqueued dispatch without blocking.
pub fn launch_binary_op(
    ctx: &GpuContext,
    entry: &'static str,
    a: &Buffer,
    b: &Buffer,
    out: &Buffer,
    params: &Buffer,
    numel: usize,
) -> Result<SubmissionIndex> {
    let cache = ctx.pipelines();
    let pipeline = cache.pipeline(entry, "elementwise", ELEMENTWISE_SHADER, BINARY_LAYOUT)?;
    let layout = cache.layout(BINARY_LAYOUT);
    let bind_group = cache.bind_group(&layout, &[a, b, params, out]);

    let mut encoder = ctx
        .device()
        .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some(entry) });

    {
        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some(entry),
            timestamp_writes: None,
        });
        pass.set_pipeline(&pipeline);
        pass.set_bind_group(0, Some(&bind_group), &[]);
        pass.dispatch_workgroups(workgroup_count(numel), 1, 1);
    }

    Ok(ctx.submit(encoder))
}
