//! Compute kernel sources, launchers, and the pipeline cache.
//!
//! Kernel source text is fixed: each WGSL module lives in a `*_wgsl.rs`
//! sibling of its launcher, and every entry point is keyed by a stable
//! operation name in the [`PipelineCache`].

pub mod copy;
mod copy_wgsl;
pub mod elementwise;
mod elementwise_wgsl;
pub mod matmul;
mod matmul_wgsl;
mod pipeline;

pub use copy_wgsl::COPY_SHADER;
pub use elementwise_wgsl::ELEMENTWISE_SHADER;
pub use matmul_wgsl::MATMUL_SHADER;
pub use pipeline::{LayoutKey, MAX_DIMS, PipelineCache, WORKGROUP_SIZE, workgroup_count};
