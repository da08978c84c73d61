//! Batched matrix multiplication dispatch

use super::{broadcast_shapes, ensure_same_context, prepare};
use crate::error::{Error, Result};
use crate::shaders::matmul::{MatmulParams, launch_matmul};
use crate::tensor::Array;

/// Batched matrix multiplication.
///
/// The trailing two dimensions of each operand are the matrix dimensions and
/// must satisfy `A[..., m, k] @ B[..., k, n]`; all leading dimensions are
/// batch dimensions and are broadcast under the standard rule. Operands are
/// materialized contiguous (replicating across broadcast batch dimensions
/// where needed) before the kernel runs, and the result is a fresh
/// contiguous `[batch..., m, n]` array.
///
/// # Errors
///
/// A shape error on incompatible inner dimensions or non-broadcastable batch
/// dimensions.
pub fn matmul(a: &Array, b: &Array) -> Result<Array> {
    ensure_same_context(a, b)?;

    if a.ndim() < 2 || b.ndim() < 2 {
        return Err(Error::InvalidArgument {
            arg: "operands",
            reason: format!(
                "matmul requires at least 2 dimensions, got ranks {} and {}",
                a.ndim(),
                b.ndim()
            ),
        });
    }

    let a_shape = a.shape();
    let b_shape = b.shape();
    let m = a_shape[a_shape.len() - 2];
    let k = a_shape[a_shape.len() - 1];
    let k2 = b_shape[b_shape.len() - 2];
    let n = b_shape[b_shape.len() - 1];

    if k != k2 {
        return Err(Error::shape_mismatch(a_shape, b_shape));
    }

    let batch_shape = broadcast_shapes(
        &a_shape[..a_shape.len() - 2],
        &b_shape[..b_shape.len() - 2],
    )?;
    let batch: usize = batch_shape.iter().product();

    let a_c = materialize_batched(a, &batch_shape, m, k)?;
    let b_c = materialize_batched(b, &batch_shape, k, n)?;

    let mut out_shape: Vec<usize> = batch_shape.to_vec();
    out_shape.push(m);
    out_shape.push(n);

    let ctx = a.context();
    let out = Array::empty(&out_shape, ctx)?;
    if out.numel() == 0 {
        return Ok(out);
    }

    let params = MatmulParams {
        m: m as u32,
        k: k as u32,
        n: n as u32,
        batch: batch as u32,
    };

    let token = launch_matmul(
        ctx,
        a_c.storage().buffer(),
        b_c.storage().buffer(),
        out.storage().buffer(),
        &params,
    )?;
    out.storage().set_write_token(token);

    Ok(out)
}

/// Materialize an operand contiguous at the broadcast batch shape.
///
/// An operand whose batch dimensions already match comes back via `prepare`
/// (zero-copy when contiguous). Otherwise the view is expanded with stride-0
/// batch dimensions and the strided copy replicates it across the broadcast
/// extent.
fn materialize_batched(x: &Array, batch_shape: &[usize], rows: usize, cols: usize) -> Result<Array> {
    let mut target: Vec<usize> = batch_shape.to_vec();
    target.push(rows);
    target.push(cols);

    if x.shape() == target.as_slice() {
        return Ok(prepare(x)?.0);
    }

    let layout = x
        .layout()
        .broadcast_to(&target)
        .ok_or_else(|| Error::broadcast(x.shape(), &target))?;
    let expanded = Array::from_parts(x.storage().clone(), layout);
    Ok(prepare(&expanded)?.0)
}
