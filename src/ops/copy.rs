//! Contiguous materialization and strided region writes

use crate::error::{Error, Result};
use crate::shaders::copy::{launch_strided_copy, pack_copy_params};
use crate::tensor::{Array, Layout};

/// Materialize a view as a contiguous array if it is not one already.
///
/// Returns the array together with a flag saying whether a copy was made:
/// `false` means the input was returned unchanged (zero-copy clone), `true`
/// means a fresh contiguous buffer was filled through the strided copy
/// kernel. Kernels that need unit-stride access (batched matmul) call this
/// before dispatch.
pub fn prepare(a: &Array) -> Result<(Array, bool)> {
    if a.is_contiguous() {
        return Ok((a.clone(), false));
    }
    Ok((materialize(a)?, true))
}

/// Copy a view into a fresh contiguous buffer unconditionally
fn materialize(a: &Array) -> Result<Array> {
    let ctx = a.context();
    let out = Array::empty(a.shape(), ctx)?;

    let numel = out.numel();
    if numel == 0 {
        return Ok(out);
    }

    let packed = pack_copy_params(
        a.shape(),
        a.strides(),
        a.offset(),
        &Layout::row_major_strides(a.shape()),
        0,
    )?;
    let params = ctx.create_data_buffer("copy_params", &packed);

    let token = launch_strided_copy(
        ctx,
        a.storage().buffer(),
        out.storage().buffer(),
        &params,
        numel,
    )?;
    out.storage().set_write_token(token);

    Ok(out)
}

/// Copy `src` into the region of `dst`'s storage described by
/// `shape`/`strides`/`offset`.
///
/// The source is materialized contiguous first, then scattered through the
/// destination layout by the strided copy kernel. The write is visible
/// through every view aliasing `dst`'s storage once it synchronizes.
pub fn copy_into(
    dst: &Array,
    src: &Array,
    shape: &[usize],
    strides: &[isize],
    offset: usize,
) -> Result<()> {
    if shape.len() != strides.len() {
        return Err(Error::InvalidArgument {
            arg: "strides",
            reason: format!(
                "strides rank {} does not match shape rank {}",
                strides.len(),
                shape.len()
            ),
        });
    }

    let numel: usize = shape.iter().product();
    if src.numel() != numel {
        return Err(Error::shape_mismatch(shape, src.shape()));
    }
    if numel == 0 {
        return Ok(());
    }

    super::ensure_same_context(dst, src)?;

    let (src_c, _) = prepare(src)?;
    // A source aliasing the destination buffer would make the kernel read
    // and write the same binding; stage it through a fresh buffer instead.
    let src_c = if src_c.storage().same_buffer(dst.storage()) {
        materialize(&src_c)?
    } else {
        src_c
    };

    let ctx = dst.context();
    let packed = pack_copy_params(
        shape,
        &Layout::row_major_strides(shape),
        0,
        strides,
        offset,
    )?;
    let params = ctx.create_data_buffer("copy_params", &packed);

    let token = launch_strided_copy(
        ctx,
        src_c.storage().buffer(),
        dst.storage().buffer(),
        &params,
        numel,
    )?;
    dst.storage().set_write_token(token);

    Ok(())
}
