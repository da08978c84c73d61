//! Broadcast and dispatch engine.
//!
//! Turns named operations on array views into correctly-shaped kernel
//! dispatches: broadcast shape computation, per-operand read strides,
//! contiguous materialization, and the element-wise/matmul launch paths.

mod binary;
mod copy;
mod matmul;

pub use binary::binary_op;
pub use copy::{copy_into, prepare};
pub use matmul::matmul;

use crate::error::{Error, Result};
use crate::tensor::{Array, Layout, Shape, Strides};

/// Binary element-wise operation kind
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    /// Addition: a + b
    Add,
    /// Subtraction: a - b
    Sub,
    /// Multiplication: a * b
    Mul,
    /// Division: a / b
    Div,
}

impl BinaryOp {
    /// Resolve an operation name.
    ///
    /// # Errors
    ///
    /// [`Error::UnsupportedOp`] for anything other than the four recognized
    /// element-wise operations.
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "add" => Ok(Self::Add),
            "sub" => Ok(Self::Sub),
            "mul" => Ok(Self::Mul),
            "div" => Ok(Self::Div),
            _ => Err(Error::unsupported_op(name)),
        }
    }

    /// The operation name (pipeline cache key prefix)
    pub fn name(&self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Sub => "sub",
            Self::Mul => "mul",
            Self::Div => "div",
        }
    }

    /// The kernel entry point for this operation
    pub fn entry_point(&self) -> &'static str {
        match self {
            Self::Add => "add_f32",
            Self::Sub => "sub_f32",
            Self::Mul => "mul_f32",
            Self::Div => "div_f32",
        }
    }
}

/// Compute the broadcast shape of two shapes.
///
/// The shapes are right-aligned, the shorter padded on the left with 1s;
/// each aligned dimension pair must be equal or contain a 1.
///
/// # Errors
///
/// [`Error::Broadcast`] carrying both operand shapes when any aligned pair
/// is incompatible.
pub fn broadcast_shapes(a: &[usize], b: &[usize]) -> Result<Shape> {
    let max_ndim = a.len().max(b.len());
    let mut result = Shape::with_capacity(max_ndim);

    for i in 0..max_ndim {
        let a_dim = if i < a.len() { a[a.len() - 1 - i] } else { 1 };
        let b_dim = if i < b.len() { b[b.len() - 1 - i] } else { 1 };

        if a_dim == b_dim {
            result.push(a_dim);
        } else if a_dim == 1 {
            result.push(b_dim);
        } else if b_dim == 1 {
            result.push(a_dim);
        } else {
            return Err(Error::broadcast(a, b));
        }
    }

    result.reverse();
    Ok(result)
}

/// Per-operand read strides for a broadcast dispatch.
///
/// Right-aligns the operand's layout to the output rank. Dimensions the
/// operand lacks, and dimensions where the operand holds size 1, get stride 0
/// regardless of the stored stride, so the same value replays across the
/// broadcast extent. Where the dimensions agree the operand's actual stride
/// carries over, letting non-contiguous views dispatch without
/// materialization.
pub(crate) fn broadcast_read_strides(layout: &Layout, out_shape: &[usize]) -> Strides {
    let ndim = out_shape.len();
    let pad = ndim - layout.ndim();
    let mut strides = Strides::with_capacity(ndim);

    for _ in 0..pad {
        strides.push(0);
    }
    for (d, (&dim, &stride)) in layout
        .shape()
        .iter()
        .zip(layout.strides().iter())
        .enumerate()
    {
        if dim == 1 && out_shape[pad + d] != 1 {
            strides.push(0);
        } else {
            strides.push(stride);
        }
    }

    strides
}

/// Check that two arrays were created from the same device context
pub(crate) fn ensure_same_context(a: &Array, b: &Array) -> Result<()> {
    if std::sync::Arc::ptr_eq(a.context(), b.context()) {
        Ok(())
    } else {
        Err(Error::InvalidArgument {
            arg: "rhs",
            reason: "operands belong to different device contexts".into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broadcast_shapes_basic() {
        assert_eq!(
            broadcast_shapes(&[3, 1], &[1, 4]).unwrap().as_slice(),
            &[3, 4]
        );
        assert_eq!(
            broadcast_shapes(&[2, 3, 4], &[4]).unwrap().as_slice(),
            &[2, 3, 4]
        );
        assert_eq!(broadcast_shapes(&[], &[5]).unwrap().as_slice(), &[5]);
        assert_eq!(broadcast_shapes(&[], &[]).unwrap().as_slice(), &[] as &[usize]);
    }

    #[test]
    fn test_broadcast_shapes_elementwise_max() {
        // Suffix extension up to size-1 padding yields the element-wise max
        assert_eq!(
            broadcast_shapes(&[5, 1, 3], &[1, 2, 1]).unwrap().as_slice(),
            &[5, 2, 3]
        );
        assert_eq!(
            broadcast_shapes(&[7, 1], &[2, 1, 4]).unwrap().as_slice(),
            &[2, 7, 4]
        );
    }

    #[test]
    fn test_broadcast_shapes_incompatible() {
        assert!(broadcast_shapes(&[3], &[4]).is_err());
        assert!(broadcast_shapes(&[2, 3], &[3, 2]).is_err());
        let err = broadcast_shapes(&[2, 5], &[4, 5, 3]).unwrap_err();
        assert!(err.is_shape_error());
    }

    #[test]
    fn test_binary_op_names() {
        assert_eq!(BinaryOp::from_name("add").unwrap(), BinaryOp::Add);
        assert_eq!(BinaryOp::from_name("div").unwrap().entry_point(), "div_f32");
        assert!(matches!(
            BinaryOp::from_name("pow"),
            Err(Error::UnsupportedOp { .. })
        ));
    }

    #[test]
    fn test_broadcast_read_strides() {
        // [3, 1] against [3, 4]: size-1 dim reads with stride 0
        let layout = Layout::contiguous(&[3, 1]);
        let strides = broadcast_read_strides(&layout, &[3, 4]);
        assert_eq!(strides.as_slice(), &[1, 0]);

        // [4] against [2, 3, 4]: missing leading dims read with stride 0
        let layout = Layout::contiguous(&[4]);
        let strides = broadcast_read_strides(&layout, &[2, 3, 4]);
        assert_eq!(strides.as_slice(), &[0, 0, 1]);

        // Non-contiguous operand keeps its actual strides where dims agree
        let layout = Layout::contiguous(&[4, 3]).transpose(0, 1).unwrap();
        let strides = broadcast_read_strides(&layout, &[3, 4]);
        assert_eq!(strides.as_slice(), &[1, 3]);
    }
}
