//! # stridr
//!
//! **Minimal tensor-compute engine: strided `f32` array views over
//! GPU-resident storage, with WebGPU kernel dispatch and graph execution.**
//!
//! stridr represents multi-dimensional arrays as shape/strides/offset views
//! over shared device buffers, executes element-wise and matrix operations
//! by dispatching compute kernels, and evaluates small flattened computation
//! graphs end to end.
//!
//! ## Design
//!
//! - **Zero-copy views**: reshape, slice, and transpose share storage;
//!   mutating through one view is visible through every alias
//! - **Broadcasting**: element-wise operations combine compatible shapes by
//!   replaying size-1 dimensions with stride 0, directly in the kernel
//! - **Async dispatch**: kernels are enqueued on a single FIFO queue and run
//!   asynchronously; the issuing thread blocks only on explicit
//!   synchronization or host reads
//! - **Pipeline caching**: each kernel compiles at most once per process,
//!   keyed by operation name
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use stridr::prelude::*;
//!
//! let ctx = GpuContext::global()?;
//! let a = Array::from_slice(&[1.0, 2.0, 3.0], &[3, 1], &ctx)?;
//! let b = Array::from_slice(&[10.0, 20.0, 30.0, 40.0], &[1, 4], &ctx)?;
//!
//! let c = a.add(&b)?;            // shape [3, 4] via broadcasting
//! let host = c.to_vec()?;        // synchronizes, then reads back
//! ```
//!
//! ## Graph execution
//!
//! ```rust,ignore
//! use stridr::graph::{Graph, Node, OpCode};
//!
//! // (x + y) * x
//! let graph = Graph::new(
//!     vec![
//!         Node::new(OpCode::Input, vec![], vec![]),
//!         Node::new(OpCode::Input, vec![], vec![]),
//!         Node::new(OpCode::Add, vec![0, 1], vec![]),
//!         Node::new(OpCode::Mul, vec![2, 0], vec![]),
//!     ],
//!     3,
//! )?;
//! let out = graph.execute(&[x, y])?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_inception)]

pub mod device;
pub mod error;
pub mod graph;
pub mod ops;
pub mod shaders;
pub mod tensor;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::device::GpuContext;
    pub use crate::error::{Error, Result};
    pub use crate::graph::{Graph, Node, OpCode};
    pub use crate::ops::{binary_op, broadcast_shapes, matmul, prepare};
    pub use crate::tensor::{Array, Layout, Nested, Storage};
}
