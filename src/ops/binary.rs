//! Element-wise binary operation dispatch

use super::{BinaryOp, broadcast_read_strides, broadcast_shapes, ensure_same_context};
use crate::error::Result;
use crate::shaders::elementwise;
use crate::tensor::Array;

/// Dispatch a named element-wise binary operation with broadcasting.
///
/// Computes the broadcast output shape, then launches a strided kernel over
/// it: each logical output coordinate is mapped independently through each
/// operand's offset and broadcast read strides, so views and broadcast
/// operands dispatch without materialization. The result is a fresh
/// contiguous array.
///
/// # Errors
///
/// [`crate::error::Error::UnsupportedOp`] if `op_name` is not one of
/// `add`/`sub`/`mul`/`div`; a shape error if the operand shapes cannot be
/// broadcast together.
pub fn binary_op(a: &Array, b: &Array, op_name: &str) -> Result<Array> {
    let op = BinaryOp::from_name(op_name)?;
    ensure_same_context(a, b)?;

    let out_shape = broadcast_shapes(a.shape(), b.shape())?;
    let ctx = a.context();
    let out = Array::empty(&out_shape, ctx)?;

    let numel = out.numel();
    if numel == 0 {
        return Ok(out);
    }

    let a_strides = broadcast_read_strides(a.layout(), &out_shape);
    let b_strides = broadcast_read_strides(b.layout(), &out_shape);

    let packed = elementwise::pack_binary_params(
        &out_shape,
        &a_strides,
        a.offset(),
        &b_strides,
        b.offset(),
    )?;
    let params = ctx.create_data_buffer("binary_params", &packed);

    let token = elementwise::launch_binary_op(
        ctx,
        op.entry_point(),
        a.storage().buffer(),
        b.storage().buffer(),
        out.storage().buffer(),
        &params,
        numel,
    )?;
    out.storage().set_write_token(token);

    Ok(out)
}
