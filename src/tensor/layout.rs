//! Layout: shape, strides, and offset describing a view into storage

use smallvec::SmallVec;
use std::fmt;

/// Stack allocation threshold for dimensions.
/// Most arrays have 4 or fewer dimensions, so we stack-allocate up to 4.
const STACK_DIMS: usize = 4;

/// Shape type: dimensions of an array
pub type Shape = SmallVec<[usize; STACK_DIMS]>;

/// Strides type: element offsets between consecutive elements along each
/// dimension. Signed so that remapped views (e.g. reversed slices) can be
/// described. Strides are in elements, not bytes.
pub type Strides = SmallVec<[isize; STACK_DIMS]>;

/// Layout describes how logical indices map into the underlying storage.
///
/// Address of the element at indices `[i0, i1, ..., in]`:
///   `offset + i0 * strides[0] + i1 * strides[1] + ... + in * strides[n]`
///
/// A scalar is a zero-dimensional layout; its single element lives at
/// `offset`.
#[derive(Clone, PartialEq, Eq)]
pub struct Layout {
    /// Size along each dimension
    shape: Shape,
    /// Offset (in elements) between consecutive elements along each dimension
    strides: Strides,
    /// Starting element index in the underlying storage
    offset: usize,
}

impl Layout {
    /// Create a contiguous (row-major) layout for a shape
    ///
    /// # Example
    /// ```
    /// use stridr::tensor::Layout;
    /// let layout = Layout::contiguous(&[2, 3, 4]);
    /// assert_eq!(layout.strides(), &[12, 4, 1]);
    /// ```
    pub fn contiguous(shape: &[usize]) -> Self {
        let shape: Shape = shape.iter().copied().collect();
        let strides = Self::row_major_strides(&shape);
        Self {
            shape,
            strides,
            offset: 0,
        }
    }

    /// Create a layout with explicit shape, strides, and offset
    pub fn new(shape: Shape, strides: Strides, offset: usize) -> Self {
        debug_assert_eq!(shape.len(), strides.len());
        Self {
            shape,
            strides,
            offset,
        }
    }

    /// Create a scalar (0-dimensional) layout
    pub fn scalar() -> Self {
        Self {
            shape: SmallVec::new(),
            strides: SmallVec::new(),
            offset: 0,
        }
    }

    /// Row-major strides for a shape
    pub fn row_major_strides(shape: &[usize]) -> Strides {
        if shape.is_empty() {
            return SmallVec::new();
        }

        let mut strides: Strides = SmallVec::with_capacity(shape.len());
        let mut stride = 1isize;

        for &dim in shape.iter().rev() {
            strides.push(stride);
            stride *= dim as isize;
        }

        strides.reverse();
        strides
    }

    /// Get the shape
    #[inline]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Get the strides
    #[inline]
    pub fn strides(&self) -> &[isize] {
        &self.strides
    }

    /// Get the offset
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Number of dimensions (rank)
    #[inline]
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Total number of logical elements
    #[inline]
    pub fn elem_count(&self) -> usize {
        self.shape.iter().product()
    }

    /// Check if this is a scalar (0 dimensions)
    #[inline]
    pub fn is_scalar(&self) -> bool {
        self.shape.is_empty()
    }

    /// Check if the strides match the row-major layout implied by the shape
    ///
    /// A view with row-major strides but a nonzero offset is a dense window
    /// into a larger buffer: it can be reshaped without copying but cannot be
    /// read as a whole buffer.
    pub fn has_row_major_strides(&self) -> bool {
        self.strides == Self::row_major_strides(&self.shape)
    }

    /// Check if the view is fully contiguous (row-major strides, offset 0)
    pub fn is_contiguous(&self) -> bool {
        if self.is_scalar() {
            return self.offset == 0;
        }
        self.offset == 0 && self.has_row_major_strides()
    }

    /// Swap two dimensions, producing a (generally non-contiguous) view layout
    pub fn transpose(&self, d0: usize, d1: usize) -> Option<Self> {
        if d0 >= self.ndim() || d1 >= self.ndim() {
            return None;
        }

        let mut shape = self.shape.clone();
        let mut strides = self.strides.clone();
        shape.swap(d0, d1);
        strides.swap(d0, d1);

        Some(Self {
            shape,
            strides,
            offset: self.offset,
        })
    }

    /// Reinterpret a logically contiguous layout with a new shape
    ///
    /// Returns `None` if the strides are not row-major or the element counts
    /// differ. The offset carries over, so dense windows reshape in place.
    pub fn reshape(&self, new_shape: &[usize]) -> Option<Self> {
        if !self.has_row_major_strides() {
            return None;
        }

        let new_count: usize = new_shape.iter().product();
        if new_count != self.elem_count() {
            return None;
        }

        let shape: Shape = new_shape.iter().copied().collect();
        let strides = Self::row_major_strides(&shape);
        Some(Self {
            shape,
            strides,
            offset: self.offset,
        })
    }

    /// Expand this layout to a broadcast target shape
    ///
    /// Missing leading dimensions and dimensions of size 1 get stride 0, so
    /// the same element is replayed across the broadcast extent. Returns
    /// `None` if the shapes are incompatible.
    pub fn broadcast_to(&self, target: &[usize]) -> Option<Self> {
        if target.len() < self.ndim() {
            return None;
        }

        let mut shape = Shape::with_capacity(target.len());
        let mut strides = Strides::with_capacity(target.len());

        let pad = target.len() - self.ndim();
        for &t in &target[..pad] {
            shape.push(t);
            strides.push(0);
        }

        for ((&s, &st), &t) in self
            .shape
            .iter()
            .zip(self.strides.iter())
            .zip(&target[pad..])
        {
            if s == t {
                shape.push(t);
                strides.push(st);
            } else if s == 1 {
                shape.push(t);
                strides.push(0);
            } else {
                return None;
            }
        }

        Some(Self::new(shape, strides, self.offset))
    }
}

impl fmt::Debug for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Layout {{ shape: {:?}, strides: {:?}, offset: {} }}",
            self.shape.as_slice(),
            self.strides.as_slice(),
            self.offset
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contiguous_layout() {
        let layout = Layout::contiguous(&[2, 3, 4]);
        assert_eq!(layout.shape(), &[2, 3, 4]);
        assert_eq!(layout.strides(), &[12, 4, 1]);
        assert_eq!(layout.elem_count(), 24);
        assert!(layout.is_contiguous());
    }

    #[test]
    fn test_scalar_layout() {
        let layout = Layout::scalar();
        assert!(layout.is_scalar());
        assert_eq!(layout.elem_count(), 1);
        assert!(layout.is_contiguous());
    }

    #[test]
    fn test_transpose_not_contiguous() {
        let layout = Layout::contiguous(&[2, 3]);
        let t = layout.transpose(0, 1).unwrap();
        assert_eq!(t.shape(), &[3, 2]);
        assert_eq!(t.strides(), &[1, 3]);
        assert!(!t.is_contiguous());
    }

    #[test]
    fn test_transpose_out_of_range() {
        let layout = Layout::contiguous(&[2, 3]);
        assert!(layout.transpose(0, 2).is_none());
    }

    #[test]
    fn test_reshape_contiguous() {
        let layout = Layout::contiguous(&[2, 3, 4]);
        let r = layout.reshape(&[6, 4]).unwrap();
        assert_eq!(r.shape(), &[6, 4]);
        assert!(r.is_contiguous());
    }

    #[test]
    fn test_reshape_count_mismatch() {
        let layout = Layout::contiguous(&[2, 3]);
        assert!(layout.reshape(&[4, 2]).is_none());
    }

    #[test]
    fn test_reshape_keeps_offset() {
        // A dense window at offset 4 reshapes without copying
        let layout = Layout::new(
            Shape::from_slice(&[2, 2]),
            Strides::from_slice(&[2, 1]),
            4,
        );
        let r = layout.reshape(&[4]).unwrap();
        assert_eq!(r.shape(), &[4]);
        assert_eq!(r.offset(), 4);
    }

    #[test]
    fn test_broadcast_to_strides() {
        let layout = Layout::contiguous(&[3, 1]);
        let b = layout.broadcast_to(&[3, 4]).unwrap();
        assert_eq!(b.shape(), &[3, 4]);
        assert_eq!(b.strides(), &[1, 0]);

        let layout = Layout::contiguous(&[4]);
        let b = layout.broadcast_to(&[2, 3, 4]).unwrap();
        assert_eq!(b.strides(), &[0, 0, 1]);
    }

    #[test]
    fn test_broadcast_to_incompatible() {
        let layout = Layout::contiguous(&[3]);
        assert!(layout.broadcast_to(&[4]).is_none());
        assert!(layout.broadcast_to(&[]).is_none());
    }
}
