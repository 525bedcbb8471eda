//! Common GPU utilities for visualization

use std::sync::Arc;
use thiserror::Error;
use wgpu;

/// Visualization errors
#[derive(Error, Debug)]
pub enum VizError {
    #[error("GPU initialization failed: {0}")]
    GpuInit(String),
    #[error("Shader compilation failed: {0}")]
    Shader(String),
    #[error("Buffer creation failed: {0}")]
    Buffer(String),
    #[error("Render failed: {0}")]
    Render(String),
    #[error("Invalid color scheme: {0}")]
    Scheme(String),
}

pub type VizResult<T> = Result<T, VizError>;

/// Shared GPU context for all visualizations
pub struct GpuContext {
    pub device: Arc<wgpu::Device>,
    pub queue: Arc<wgpu::Queue>,
    pub adapter_info: wgpu::AdapterInfo,
}

impl GpuContext {
    /// Create GPU context (async)
    pub async fn new() -> VizResult<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| VizError::GpuInit("No suitable GPU adapter found".into()))?;

        let adapter_info = adapter.get_info();
        log::info!(
            "Using GPU: {} ({:?})",
            adapter_info.name,
            adapter_info.backend
        );

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("PitchLens Viz Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: wgpu::MemoryHints::Performance,
                },
                None,
            )
            .await
            .map_err(|e| VizError::GpuInit(e.to_string()))?;

        Ok(Self {
            device: Arc::new(device),
            queue: Arc::new(queue),
            adapter_info,
        })
    }

    /// Create GPU context (blocking)
    pub fn new_blocking() -> VizResult<Self> {
        pollster::block_on(Self::new())
    }

    /// Copy a GPU buffer back to the CPU (async)
    pub async fn read_buffer(&self, buffer: &wgpu::Buffer, size: u64) -> VizResult<Vec<u8>> {
        let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Readback Staging Buffer"),
            size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Readback Encoder"),
            });
        encoder.copy_buffer_to_buffer(buffer, 0, &staging, 0, size);
        self.queue.submit(std::iter::once(encoder.finish()));

        let slice = staging.slice(..);
        let (sender, receiver) = flume::bounded(1);
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });

        self.device.poll(wgpu::Maintain::Wait);

        receiver
            .recv_async()
            .await
            .map_err(|e| VizError::Buffer(e.to_string()))?
            .map_err(|e| VizError::Buffer(e.to_string()))?;

        let data = slice.get_mapped_range().to_vec();
        staging.unmap();
        Ok(data)
    }

    /// Blocking wrapper around [`GpuContext::read_buffer`]
    pub fn read_buffer_blocking(&self, buffer: &wgpu::Buffer, size: u64) -> VizResult<Vec<u8>> {
        pollster::block_on(self.read_buffer(buffer, size))
    }
}

/// Viewport for rendering
#[repr(C)]
#[derive(Clone, Copy, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
    pub scale: f32,
    pub _padding: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32, scale: f32) -> Self {
        Self {
            width,
            height,
            scale,
            _padding: 0.0,
        }
    }

    /// Width over height, 1.0 for degenerate sizes
    pub fn aspect(&self) -> f32 {
        if self.width <= 0.0 || self.height <= 0.0 {
            1.0
        } else {
            self.width / self.height
        }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(800.0, 480.0, 1.0)
    }
}
