//! Launcher for the strided copy kernel.

use wgpu::{Buffer, SubmissionIndex};

use super::copy_wgsl::COPY_SHADER;
use super::pipeline::{LayoutKey, MAX_DIMS, workgroup_count};
use crate::device::GpuContext;
use crate::error::{Error, Result};

/// src, params (read-only) + dst (read-write)
const COPY_LAYOUT: LayoutKey = LayoutKey {
    num_read_buffers: 2,
    num_write_buffers: 1,
    num_uniform_buffers: 0,
};

/// Pack the strided copy parameter block.
///
/// Word layout (matches the WGSL side):
/// `[numel, ndim, src_offset, dst_offset, shape[8], src_strides[8], dst_strides[8]]`
pub fn pack_copy_params(
    shape: &[usize],
    src_strides: &[isize],
    src_offset: usize,
    dst_strides: &[isize],
    dst_offset: usize,
) -> Result<Vec<u32>> {
    let ndim = shape.len();
    if ndim > MAX_DIMS {
        return Err(Error::InvalidArgument {
            arg: "shape",
            reason: format!("rank {} exceeds the supported maximum {}", ndim, MAX_DIMS),
        });
    }

    let numel: usize = shape.iter().product();
    let mut params = vec![0u32; 4 + 3 * MAX_DIMS];
    params[0] = numel as u32;
    params[1] = ndim as u32;
    params[2] = src_offset as u32;
    params[3] = dst_offset as u32;
    for (d, &s) in shape.iter().enumerate() {
        params[4 + d] = s as u32;
    }
    for (d, &s) in src_strides.iter().enumerate() {
        params[4 + MAX_DIMS + d] = (s as i32) as u32;
    }
    for (d, &s) in dst_strides.iter().enumerate() {
        params[4 + 2 * MAX_DIMS + d] = (s as i32) as u32;
    }
    Ok(params)
}

/// Launch the strided copy kernel.
///
/// Iterates the logical shape packed into `params` in row-major order,
/// reading `src` through the source layout and writing `dst` through the
/// destination layout. Either side may be strided; stride-0 source
/// dimensions replicate across the extent.
///
/// Returns the submission index of the enqueued dispatch without blocking.
pub fn launch_strided_copy(
    ctx: &GpuContext,
    src: &Buffer,
    dst: &Buffer,
    params: &Buffer,
    numel: usize,
) -> Result<SubmissionIndex> {
    let cache = ctx.pipelines();
    let pipeline = cache.pipeline("strided_copy_f32", "copy", COPY_SHADER, COPY_LAYOUT)?;
    let layout = cache.layout(COPY_LAYOUT);
    let bind_group = cache.bind_group(&layout, &[src, params, dst]);

    let mut encoder = ctx
        .device()
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("strided_copy"),
        });

    {
        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("strided_copy"),
            timestamp_writes: None,
        });
        pass.set_pipeline(&pipeline);
        pass.set_bind_group(0, Some(&bind_group), &[]);
        pass.dispatch_workgroups(workgroup_count(numel), 1, 1);
    }

    Ok(ctx.submit(encoder))
}
