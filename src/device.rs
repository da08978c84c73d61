//! WebGPU compute context.
//!
//! `GpuContext` owns the device and queue used for every allocation and
//! kernel dispatch, plus the process-wide pipeline cache.
//!
//! # Thread Safety
//!
//! `GpuContext` is shared via `Arc` and the underlying `wgpu::Device` and
//! `wgpu::Queue` are `Send + Sync` by design. The default context is created
//! lazily, exactly once, on first use; tests can construct isolated contexts
//! with [`GpuContext::new`].

use std::fmt;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use wgpu::{Buffer, BufferDescriptor, BufferUsages, SubmissionIndex};

use crate::error::{Error, Result};
use crate::shaders::PipelineCache;

/// How long to wait for the device before giving up on a poll
const POLL_TIMEOUT: Duration = Duration::from_secs(60);

/// Process-wide default context, initialized on first use
static DEFAULT_CONTEXT: OnceLock<Result<Arc<GpuContext>>> = OnceLock::new();

/// WebGPU compute context.
///
/// Owns the device and queue for kernel dispatch. All array storage is
/// allocated through this context, and all operations on arrays created from
/// it are submitted to its (single, FIFO) queue.
pub struct GpuContext {
    /// WebGPU device handle
    device: Arc<wgpu::Device>,
    /// WebGPU queue for command submission
    queue: Arc<wgpu::Queue>,
    /// Adapter name (e.g. "NVIDIA GeForce RTX 4090")
    adapter_name: String,
    /// Backend type (Vulkan, Metal, DX12, GL)
    backend: wgpu::Backend,
    /// Pipeline cache for compute kernels
    pipelines: PipelineCache,
}

impl GpuContext {
    /// Create a new context on the first available adapter.
    ///
    /// # Errors
    ///
    /// Returns an error if no suitable GPU adapter is found or device
    /// creation fails.
    pub fn new() -> Result<Arc<Self>> {
        let adapter = pollster::block_on(request_adapter())?;
        let info = adapter.get_info();

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("stridr device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            memory_hints: wgpu::MemoryHints::Performance,
            trace: wgpu::Trace::Off,
            experimental_features: wgpu::ExperimentalFeatures::default(),
        }))
        .map_err(|e| Error::Device(format!("{:?}", e)))?;

        let device = Arc::new(device);
        let queue = Arc::new(queue);
        let pipelines = PipelineCache::new(device.clone());

        Ok(Arc::new(Self {
            device,
            queue,
            adapter_name: info.name,
            backend: info.backend,
            pipelines,
        }))
    }

    /// Get the process-wide default context.
    ///
    /// The context is created lazily on the first call and reused for the
    /// lifetime of the process. Initialization happens exactly once even
    /// under concurrent first calls; a failed initialization is sticky.
    pub fn global() -> Result<Arc<Self>> {
        DEFAULT_CONTEXT.get_or_init(Self::new).clone()
    }

    /// Check whether a usable adapter exists without creating a device
    pub fn is_available() -> bool {
        pollster::block_on(request_adapter()).is_ok()
    }

    /// Get the adapter name
    pub fn adapter_name(&self) -> &str {
        &self.adapter_name
    }

    /// Get the backend type (Vulkan, Metal, DX12, GL)
    pub fn backend(&self) -> wgpu::Backend {
        self.backend
    }

    /// Get a reference to the WebGPU device
    #[inline]
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    /// Get a reference to the WebGPU queue
    #[inline]
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Get a reference to the pipeline cache
    #[inline]
    pub fn pipelines(&self) -> &PipelineCache {
        &self.pipelines
    }

    /// Create a storage buffer for array data.
    ///
    /// Storage buffers can be read and written by compute kernels and copied
    /// in both directions. Sizes are aligned up to the 4-byte granularity
    /// WebGPU requires; zero-sized requests get a minimal valid buffer.
    pub fn create_storage_buffer(&self, label: &str, size_bytes: usize) -> Buffer {
        let aligned = size_bytes.div_ceil(4).max(1) * 4;
        self.device.create_buffer(&BufferDescriptor {
            label: Some(label),
            size: aligned as u64,
            usage: BufferUsages::STORAGE | BufferUsages::COPY_DST | BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        })
    }

    /// Create a staging buffer for GPU-to-CPU readback
    pub fn create_staging_buffer(&self, label: &str, size_bytes: usize) -> Buffer {
        let aligned = size_bytes.div_ceil(4).max(1) * 4;
        self.device.create_buffer(&BufferDescriptor {
            label: Some(label),
            size: aligned as u64,
            usage: BufferUsages::MAP_READ | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    /// Create a buffer initialized with the given data.
    ///
    /// Usable both as a storage binding (kernel parameter arrays) and as a
    /// uniform binding (fixed-size parameter structs).
    pub fn create_data_buffer<T: bytemuck::Pod>(&self, label: &str, data: &[T]) -> Buffer {
        use wgpu::util::DeviceExt;
        self.device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytemuck::cast_slice(data),
                usage: BufferUsages::STORAGE | BufferUsages::UNIFORM | BufferUsages::COPY_DST,
            })
    }

    /// Create a uniform buffer holding a single parameter struct
    pub fn create_params_buffer<T: bytemuck::Pod>(&self, label: &str, params: &T) -> Buffer {
        use wgpu::util::DeviceExt;
        self.device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytemuck::bytes_of(params),
                usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
            })
    }

    /// Write data into a buffer through the queue
    pub fn write_buffer<T: bytemuck::Pod>(&self, buffer: &Buffer, data: &[T]) {
        self.queue
            .write_buffer(buffer, 0, bytemuck::cast_slice(data));
    }

    /// Submit recorded commands; returns the submission index.
    ///
    /// Does not block: dispatches execute asynchronously in queue order.
    pub fn submit(&self, encoder: wgpu::CommandEncoder) -> SubmissionIndex {
        self.queue.submit(std::iter::once(encoder.finish()))
    }

    /// Block until the given submission (or all work, if `None`) completes
    pub fn wait(&self, submission: Option<SubmissionIndex>) -> Result<()> {
        self.device
            .poll(wgpu::PollType::Wait {
                submission_index: submission,
                timeout: Some(POLL_TIMEOUT),
            })
            .map_err(|e| Error::Device(format!("GPU poll failed: {e}")))?;
        Ok(())
    }

    /// Read buffer data back to the CPU (blocking).
    ///
    /// `staging` must be a `MAP_READ` buffer that already holds the data
    /// (copied via a submitted command encoder).
    pub fn read_buffer<T: bytemuck::Pod>(&self, staging: &Buffer, output: &mut [T]) -> Result<()> {
        let slice = staging.slice(..);

        let (sender, receiver) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });

        self.wait(None)?;

        let map_result = receiver
            .recv()
            .map_err(|_| Error::Backend("map_async callback was not invoked".into()))?;
        map_result.map_err(|e| Error::Backend(format!("map_async failed: {e}")))?;

        {
            let data = slice.get_mapped_range();
            let src: &[T] = bytemuck::cast_slice(&data);
            output.copy_from_slice(&src[..output.len()]);
        }

        staging.unmap();
        Ok(())
    }
}

impl fmt::Debug for GpuContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GpuContext")
            .field("adapter", &self.adapter_name)
            .field("backend", &self.backend)
            .finish_non_exhaustive()
    }
}

/// Request the first available adapter, preferring enumeration order.
async fn request_adapter() -> Result<wgpu::Adapter> {
    let instance = wgpu::Instance::default();

    let adapters: Vec<_> = instance.enumerate_adapters(wgpu::Backends::all()).await;
    if let Some(adapter) = adapters.into_iter().next() {
        return Ok(adapter);
    }

    instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        })
        .await
        .map_err(|_| Error::NoAdapter)
}
