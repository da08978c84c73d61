//! Compute pipeline infrastructure.
//!
//! Provides pipeline caching and dispatch utilities for the WGSL compute
//! kernels. The operation name is the sole pipeline cache key: one name maps
//! to exactly one compiled pipeline for the life of the cache, and the
//! check-compile-insert sequence is serialized so concurrent first requests
//! for the same name produce a single compile.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use wgpu::{
    BindGroup, BindGroupDescriptor, BindGroupEntry, BindGroupLayout, BindGroupLayoutDescriptor,
    BindGroupLayoutEntry, BindingType, Buffer, BufferBindingType, ComputePipeline,
    ComputePipelineDescriptor, Device, PipelineLayoutDescriptor, ShaderModule,
    ShaderModuleDescriptor, ShaderSource, ShaderStages,
};

use crate::error::{Error, Result};

/// Workgroup size for one-dimensional compute kernels
pub const WORKGROUP_SIZE: u32 = 256;

/// Maximum number of dimensions supported by the strided kernels.
/// WGSL has no dynamic arrays in parameter blocks, so shapes and strides are
/// passed as fixed-size arrays.
pub const MAX_DIMS: usize = 8;

// ============================================================================
// Pipeline Cache
// ============================================================================

/// Cache for compute pipelines keyed by operation name.
///
/// Shader modules are cached separately by module name (several operations
/// can share one module), and bind group layouts by [`LayoutKey`]. Entries
/// live as long as the cache; there is no eviction.
pub struct PipelineCache {
    device: Arc<Device>,
    /// Cached shader modules by module name
    modules: Mutex<HashMap<&'static str, Arc<ShaderModule>>>,
    /// Cached pipelines by operation name (entry point)
    pipelines: Mutex<HashMap<&'static str, Arc<ComputePipeline>>>,
    /// Cached bind group layouts by layout key
    layouts: Mutex<HashMap<LayoutKey, Arc<BindGroupLayout>>>,
}

/// Key for the bind group layout cache.
///
/// Read-only storage buffers come first (bindings `0..r`), then read-write
/// storage buffers, then uniforms. Operand buffers are bound read-only so
/// that both operands of an element-wise op may alias the same buffer; the
/// aliasing rules only restrict writable bindings.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayoutKey {
    /// Number of read-only storage buffers in the layout
    pub num_read_buffers: u32,
    /// Number of read-write storage buffers in the layout
    pub num_write_buffers: u32,
    /// Number of uniform buffers in the layout
    pub num_uniform_buffers: u32,
}

impl PipelineCache {
    /// Create a new pipeline cache
    pub fn new(device: Arc<Device>) -> Self {
        Self {
            device,
            modules: Mutex::new(HashMap::new()),
            pipelines: Mutex::new(HashMap::new()),
            layouts: Mutex::new(HashMap::new()),
        }
    }

    /// Get the compiled pipeline for an operation, compiling at most once.
    ///
    /// The first call for `op` compiles `source` (as module `module_name`,
    /// with `op` as the entry point) against the device. Subsequent calls
    /// return the cached object without recompiling, even if a different
    /// `source` string is passed: the name is the sole cache key, so one name
    /// means one fixed program.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Compile`] naming the operation and carrying the
    /// device diagnostic when compilation or pipeline validation fails.
    pub fn pipeline(
        &self,
        op: &'static str,
        module_name: &'static str,
        source: &str,
        layout_key: LayoutKey,
    ) -> Result<Arc<ComputePipeline>> {
        let layout = self.layout(layout_key);

        // Hold the lock across check-compile-insert so exactly one pipeline
        // object is ever created per name.
        let mut pipelines = self.pipelines.lock();
        if let Some(pipeline) = pipelines.get(op) {
            return Ok(pipeline.clone());
        }

        // Compilation errors in wgpu surface through error scopes rather
        // than return values.
        let error_scope = self.device.push_error_scope(wgpu::ErrorFilter::Validation);

        let module = self.module(module_name, source);

        let pipeline_layout = self
            .device
            .create_pipeline_layout(&PipelineLayoutDescriptor {
                label: Some(&format!("{}_layout", op)),
                bind_group_layouts: &[layout.as_ref()],
                immediate_size: 0,
            });

        let pipeline = self
            .device
            .create_compute_pipeline(&ComputePipelineDescriptor {
                label: Some(op),
                layout: Some(&pipeline_layout),
                module: &module,
                entry_point: Some(op),
                compilation_options: Default::default(),
                cache: None,
            });

        if let Some(err) = pollster::block_on(error_scope.pop()) {
            // Drop the module so a corrected source can be compiled under
            // another name without colliding with the failed one.
            self.modules.lock().remove(module_name);
            return Err(Error::Compile {
                op,
                message: err.to_string(),
            });
        }

        let pipeline = Arc::new(pipeline);
        pipelines.insert(op, pipeline.clone());
        Ok(pipeline)
    }

    /// Get or create a shader module
    fn module(&self, name: &'static str, source: &str) -> Arc<ShaderModule> {
        let mut modules = self.modules.lock();
        if let Some(module) = modules.get(name) {
            return module.clone();
        }

        let module = self.device.create_shader_module(ShaderModuleDescriptor {
            label: Some(name),
            source: ShaderSource::Wgsl(source.into()),
        });

        let module = Arc::new(module);
        modules.insert(name, module.clone());
        module
    }

    /// Get or create a bind group layout for a [`LayoutKey`]
    pub fn layout(&self, key: LayoutKey) -> Arc<BindGroupLayout> {
        let mut layouts = self.layouts.lock();

        if let Some(layout) = layouts.get(&key) {
            return layout.clone();
        }

        let mut entries = Vec::new();

        for i in 0..key.num_read_buffers {
            entries.push(BindGroupLayoutEntry {
                binding: i,
                visibility: ShaderStages::COMPUTE,
                ty: BindingType::Buffer {
                    ty: BufferBindingType::Storage { read_only: true },
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            });
        }

        for i in 0..key.num_write_buffers {
            entries.push(BindGroupLayoutEntry {
                binding: key.num_read_buffers + i,
                visibility: ShaderStages::COMPUTE,
                ty: BindingType::Buffer {
                    ty: BufferBindingType::Storage { read_only: false },
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            });
        }

        for i in 0..key.num_uniform_buffers {
            entries.push(BindGroupLayoutEntry {
                binding: key.num_read_buffers + key.num_write_buffers + i,
                visibility: ShaderStages::COMPUTE,
                ty: BindingType::Buffer {
                    ty: BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            });
        }

        let layout = self
            .device
            .create_bind_group_layout(&BindGroupLayoutDescriptor {
                label: Some("compute_layout"),
                entries: &entries,
            });

        let layout = Arc::new(layout);
        layouts.insert(key, layout.clone());
        layout
    }

    /// Create a bind group binding the given buffers in order
    pub fn bind_group(&self, layout: &BindGroupLayout, buffers: &[&Buffer]) -> BindGroup {
        let entries: Vec<BindGroupEntry> = buffers
            .iter()
            .enumerate()
            .map(|(i, buffer)| BindGroupEntry {
                binding: i as u32,
                resource: buffer.as_entire_binding(),
            })
            .collect();

        self.device.create_bind_group(&BindGroupDescriptor {
            label: Some("compute_bind_group"),
            layout,
            entries: &entries,
        })
    }

    /// Get the device reference
    pub fn device(&self) -> &Device {
        &self.device
    }
}

// ============================================================================
// Dispatch Helpers
// ============================================================================

/// Number of workgroups needed to cover n elements
#[inline]
pub fn workgroup_count(n: usize) -> u32 {
    ((n as u32) + WORKGROUP_SIZE - 1) / WORKGROUP_SIZE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workgroup_count() {
        assert_eq!(workgroup_count(0), 0);
        assert_eq!(workgroup_count(1), 1);
        assert_eq!(workgroup_count(256), 1);
        assert_eq!(workgroup_count(257), 2);
    }
}
