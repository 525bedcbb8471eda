//! Scrolling waterfall spectrogram
//!
//! History lives in a fixed-height ring of 8-bit rows:
//! - Ingest is throttled to a user speed setting, independent of draw rate
//! - A bin-count change reallocates the ring and discards history
//! - The GPU side mirrors the ring as an R8 texture with a repeat sampler,
//!   so scrolling is a uniform update instead of a texture shuffle

use std::time::{Duration, Instant};

use pl_core::AnalysisFrame;

use crate::scheme::ColorScheme;
use crate::shader::waterfall_shader_source;

/// Rows of history kept in the ring
pub const DEFAULT_HISTORY_ROWS: usize = 512;

/// Columns in the warped strip mesh
const MESH_COLUMNS: usize = 256;

// ═══════════════════════════════════════════════════════════════════════════
// WRITE THROTTLE
// ═══════════════════════════════════════════════════════════════════════════

/// Decouples ingest rate from display refresh
///
/// Speed 1-10 maps linearly to 5-50 row writes per second. `ready` is a
/// monotonic-clock comparison; callers skip the write when it is false
/// rather than suspending.
#[derive(Debug, Clone)]
pub struct WriteThrottle {
    interval: Duration,
    last_write: Option<Instant>,
}

impl WriteThrottle {
    pub fn new(speed: u32) -> Self {
        Self {
            interval: Self::interval_for(speed),
            last_write: None,
        }
    }

    /// Writes per second for a speed setting (clamped to 1-10)
    pub fn rate_for(speed: u32) -> f32 {
        (speed.clamp(1, 10) * 5) as f32
    }

    fn interval_for(speed: u32) -> Duration {
        Duration::from_secs_f32(1.0 / Self::rate_for(speed))
    }

    pub fn set_speed(&mut self, speed: u32) {
        self.interval = Self::interval_for(speed);
    }

    /// True when enough time has passed for another row
    pub fn ready(&self, now: Instant) -> bool {
        match self.last_write {
            None => true,
            Some(last) => now.duration_since(last) >= self.interval,
        }
    }

    pub fn mark_written(&mut self, now: Instant) {
        self.last_write = Some(now);
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// RING BUFFER
// ═══════════════════════════════════════════════════════════════════════════

/// CPU-side row history
///
/// Starts unallocated; the first frame with a non-zero bin count sizes it.
/// `write_row` counts every write monotonically, so `write_row % height`
/// is the ring slot and `write_row / height` the number of completed wraps.
#[derive(Debug)]
pub struct WaterfallBuffer {
    width: usize,
    height: usize,
    rows: Vec<u8>,
    write_row: u64,
    throttle: WriteThrottle,
}

impl WaterfallBuffer {
    pub fn new(height: usize, speed: u32) -> Self {
        Self {
            width: 0,
            height: height.max(1),
            rows: Vec::new(),
            write_row: 0,
            throttle: WriteThrottle::new(speed),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn write_row(&self) -> u64 {
        self.write_row
    }

    pub fn is_allocated(&self) -> bool {
        self.width > 0
    }

    pub fn set_speed(&mut self, speed: u32) {
        self.throttle.set_speed(speed);
    }

    /// Reallocate when the analysis bin count changes
    ///
    /// History is discarded and the write index restarts at 0; there is no
    /// cross-resize row migration. Returns whether a reallocation happened.
    pub fn ensure_width(&mut self, bin_count: usize) -> bool {
        if bin_count == self.width || bin_count == 0 {
            return false;
        }
        log::debug!(
            "waterfall reallocating: {} -> {} bins",
            self.width,
            bin_count
        );
        self.width = bin_count;
        self.rows = vec![0; bin_count * self.height];
        self.write_row = 0;
        true
    }

    /// Ingest one frame
    ///
    /// Returns the ring slot that was written, or None when the write was
    /// skipped (throttled, or a zero-length frame; previous rows are
    /// retained either way). Magnitudes are normalized by the frame's
    /// envelope maximum and quantized to 8 bits; a non-positive envelope
    /// produces a zero row.
    pub fn push_frame(&mut self, frame: &AnalysisFrame, now: Instant) -> Option<usize> {
        if frame.bin_count == 0 || frame.magnitudes.is_empty() {
            return None;
        }
        if !self.throttle.ready(now) {
            return None;
        }
        self.ensure_width(frame.bin_count);

        let row = (self.write_row % self.height as u64) as usize;
        let dst = &mut self.rows[row * self.width..(row + 1) * self.width];
        let scale = if frame.envelope_max > 0.0 {
            255.0 / frame.envelope_max
        } else {
            0.0
        };
        for (out, &mag) in dst.iter_mut().zip(frame.magnitudes.iter()) {
            *out = (mag.max(0.0) * scale).min(255.0) as u8;
        }
        if frame.magnitudes.len() < self.width {
            dst[frame.magnitudes.len()..].fill(0);
        }

        self.write_row += 1;
        self.throttle.mark_written(now);
        Some(row)
    }

    /// Fraction of the texture where the next write lands
    ///
    /// The display anchors the newest row one texel behind this offset and
    /// scrolls older rows away from it.
    pub fn scroll_offset(&self) -> f32 {
        (self.write_row % self.height as u64) as f32 / self.height as f32
    }

    /// One stored row by ring slot
    pub fn row(&self, slot: usize) -> &[u8] {
        let slot = slot % self.height;
        &self.rows[slot * self.width..(slot + 1) * self.width]
    }

    /// The whole ring, row-major
    pub fn rows(&self) -> &[u8] {
        &self.rows
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// GPU RENDERER
// ═══════════════════════════════════════════════════════════════════════════

/// Per-frame waterfall parameters
#[derive(Debug, Clone, Copy)]
pub struct WaterfallParams {
    pub start_frequency: f32,
    pub end_frequency: f32,
    pub target_frequency: f32,
    pub half_range_cents: f32,
    pub distortion: f32,
    pub scroll_offset: f32,
    pub threshold: f32,
    pub reduced_visual: bool,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct WaterfallUniforms {
    start_frequency: f32,
    end_frequency: f32,
    target_frequency: f32,
    half_range_cents: f32,
    distortion: f32,
    scroll_offset: f32,
    threshold: f32,
    texel_v: f32,
    reduced_visual: u32,
    _padding: [u32; 3],
}

/// Column vertex for the warped strip
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct WaterfallVertex {
    x01: f32,
    y01: f32,
}

/// Full-viewport strip subdivided into columns so the vertex shader can
/// bend the frequency axis
fn strip_vertices(columns: usize) -> Vec<WaterfallVertex> {
    let mut vertices = Vec::with_capacity(columns * 6);
    for i in 0..columns {
        let x0 = i as f32 / columns as f32;
        let x1 = (i + 1) as f32 / columns as f32;
        vertices.push(WaterfallVertex { x01: x0, y01: 0.0 });
        vertices.push(WaterfallVertex { x01: x1, y01: 0.0 });
        vertices.push(WaterfallVertex { x01: x1, y01: 1.0 });
        vertices.push(WaterfallVertex { x01: x0, y01: 0.0 });
        vertices.push(WaterfallVertex { x01: x1, y01: 1.0 });
        vertices.push(WaterfallVertex { x01: x0, y01: 1.0 });
    }
    vertices
}

/// GPU waterfall renderer, pipeline baked for one color scheme
pub struct WaterfallRenderer {
    texture: wgpu::Texture,
    sampler: wgpu::Sampler,
    uniform_buffer: wgpu::Buffer,
    vertex_buffer: wgpu::Buffer,
    vertex_count: u32,
    bind_group_layout: wgpu::BindGroupLayout,
    bind_group: wgpu::BindGroup,
    render_pipeline: wgpu::RenderPipeline,
    width: u32,
    height: u32,
}

impl WaterfallRenderer {
    pub fn new(
        device: &wgpu::Device,
        scheme: &ColorScheme,
        format: wgpu::TextureFormat,
        width: u32,
        height: u32,
    ) -> Self {
        use wgpu::util::DeviceExt;

        let texture = Self::create_history_texture(device, width, height);

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Waterfall History Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Waterfall Uniform Buffer"),
            size: std::mem::size_of::<WaterfallUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let vertices = strip_vertices(MESH_COLUMNS);
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Waterfall Vertex Buffer"),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Waterfall Bind Group Layout"),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Float { filterable: true },
                            view_dimension: wgpu::TextureViewDimension::D2,
                            multisampled: false,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 2,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                ],
            });

        let bind_group = Self::create_bind_group(
            device,
            &bind_group_layout,
            &uniform_buffer,
            &texture,
            &sampler,
        );

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Waterfall Shader"),
            source: wgpu::ShaderSource::Wgsl(waterfall_shader_source(scheme).into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Waterfall Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let render_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Waterfall Render Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<WaterfallVertex>() as u64,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &[
                        wgpu::VertexAttribute {
                            offset: 0,
                            shader_location: 0,
                            format: wgpu::VertexFormat::Float32,
                        },
                        wgpu::VertexAttribute {
                            offset: 4,
                            shader_location: 1,
                            format: wgpu::VertexFormat::Float32,
                        },
                    ],
                }],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        Self {
            texture,
            sampler,
            uniform_buffer,
            vertex_buffer,
            vertex_count: vertices.len() as u32,
            bind_group_layout,
            bind_group,
            render_pipeline,
            width,
            height,
        }
    }

    fn create_history_texture(device: &wgpu::Device, width: u32, height: u32) -> wgpu::Texture {
        device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Waterfall History Texture"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::R8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        })
    }

    fn create_bind_group(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        uniform_buffer: &wgpu::Buffer,
        texture: &wgpu::Texture,
        sampler: &wgpu::Sampler,
    ) -> wgpu::BindGroup {
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Waterfall Bind Group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    /// Swap the history texture for a new bin count (ring reallocation)
    pub fn resize_width(&mut self, device: &wgpu::Device, width: u32) {
        if width == self.width {
            return;
        }
        self.width = width;
        self.texture = Self::create_history_texture(device, width, self.height);
        self.bind_group = Self::create_bind_group(
            device,
            &self.bind_group_layout,
            &self.uniform_buffer,
            &self.texture,
            &self.sampler,
        );
    }

    /// Upload one freshly written ring row
    pub fn upload_row(&self, queue: &wgpu::Queue, slot: usize, data: &[u8]) {
        debug_assert_eq!(data.len(), self.width as usize);
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d {
                    x: 0,
                    y: slot as u32 % self.height,
                    z: 0,
                },
                aspect: wgpu::TextureAspect::All,
            },
            data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(self.width),
                rows_per_image: None,
            },
            wgpu::Extent3d {
                width: self.width,
                height: 1,
                depth_or_array_layers: 1,
            },
        );
    }

    /// Upload the whole ring (after reallocation or a pipeline rebuild)
    pub fn upload_all(&self, queue: &wgpu::Queue, rows: &[u8]) {
        debug_assert_eq!(rows.len(), (self.width * self.height) as usize);
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            rows,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(self.width),
                rows_per_image: Some(self.height),
            },
            wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
        );
    }

    /// Update per-frame uniforms
    pub fn set_params(&self, queue: &wgpu::Queue, params: &WaterfallParams) {
        let uniforms = WaterfallUniforms {
            start_frequency: params.start_frequency,
            end_frequency: params.end_frequency,
            target_frequency: params.target_frequency,
            half_range_cents: params.half_range_cents,
            distortion: params.distortion,
            scroll_offset: params.scroll_offset,
            threshold: params.threshold,
            texel_v: 1.0 / self.height as f32,
            reduced_visual: params.reduced_visual as u32,
            _padding: [0; 3],
        };
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));
    }

    /// Draw the scrolling history (clears the target first)
    pub fn render(&self, encoder: &mut wgpu::CommandEncoder, target: &wgpu::TextureView) {
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Waterfall Render Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        render_pass.set_pipeline(&self.render_pipeline);
        render_pass.set_bind_group(0, &self.bind_group, &[]);
        render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        render_pass.draw(0..self.vertex_count, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_with(bins: usize, value: f32, envelope_max: f32) -> AnalysisFrame {
        AnalysisFrame {
            bin_count: bins,
            magnitudes: vec![value; bins],
            envelope_max,
            ..Default::default()
        }
    }

    #[test]
    fn test_throttle_rate_mapping() {
        assert_eq!(WriteThrottle::rate_for(1), 5.0);
        assert_eq!(WriteThrottle::rate_for(5), 25.0);
        assert_eq!(WriteThrottle::rate_for(10), 50.0);
        // out-of-range speeds clamp
        assert_eq!(WriteThrottle::rate_for(0), 5.0);
        assert_eq!(WriteThrottle::rate_for(99), 50.0);
    }

    #[test]
    fn test_throttle_gates_by_elapsed_time() {
        let mut throttle = WriteThrottle::new(5); // 25/s = 40ms
        let t0 = Instant::now();
        assert!(throttle.ready(t0));
        throttle.mark_written(t0);
        assert!(!throttle.ready(t0 + Duration::from_millis(20)));
        assert!(throttle.ready(t0 + Duration::from_millis(40)));
    }

    #[test]
    fn test_first_frame_allocates() {
        let mut buffer = WaterfallBuffer::new(8, 10);
        assert!(!buffer.is_allocated());

        let t0 = Instant::now();
        let written = buffer.push_frame(&frame_with(16, 0.5, 1.0), t0);
        assert_eq!(written, Some(0));
        assert!(buffer.is_allocated());
        assert_eq!(buffer.width(), 16);
        assert_eq!(buffer.write_row(), 1);
    }

    #[test]
    fn test_row_normalization() {
        let mut buffer = WaterfallBuffer::new(4, 10);
        let t0 = Instant::now();
        buffer.push_frame(&frame_with(8, 1.0, 2.0), t0);
        // 1.0 / envelope_max 2.0 = half intensity
        assert_eq!(buffer.row(0)[0], 127);

        // non-positive envelope produces a zero row
        buffer.push_frame(&frame_with(8, 1.0, 0.0), t0 + Duration::from_secs(1));
        assert!(buffer.row(1).iter().all(|&b| b == 0));
    }

    #[test]
    fn test_zero_length_frame_retains_buffer() {
        let mut buffer = WaterfallBuffer::new(4, 10);
        let t0 = Instant::now();
        buffer.push_frame(&frame_with(8, 1.0, 1.0), t0);

        let written = buffer.push_frame(&AnalysisFrame::silent(), t0 + Duration::from_secs(1));
        assert_eq!(written, None);
        assert_eq!(buffer.width(), 8);
        assert_eq!(buffer.write_row(), 1);
        assert_eq!(buffer.row(0)[0], 255);
    }

    #[test]
    fn test_reallocation_resets_ring() {
        let mut buffer = WaterfallBuffer::new(4, 10);
        let t0 = Instant::now();
        buffer.push_frame(&frame_with(8, 1.0, 1.0), t0);
        buffer.push_frame(&frame_with(8, 1.0, 1.0), t0 + Duration::from_secs(1));
        assert_eq!(buffer.write_row(), 2);

        // bin count change discards history and restarts the index
        buffer.push_frame(&frame_with(16, 0.25, 1.0), t0 + Duration::from_secs(2));
        assert_eq!(buffer.width(), 16);
        assert_eq!(buffer.write_row(), 1);
        assert_eq!(buffer.row(0)[0], 63);
        assert!(buffer.row(1).iter().all(|&b| b == 0));
    }

    #[test]
    fn test_scroll_offset_wraps() {
        let mut buffer = WaterfallBuffer::new(4, 10);
        let t0 = Instant::now();
        for i in 0..6 {
            buffer.push_frame(&frame_with(2, 1.0, 1.0), t0 + Duration::from_secs(i));
        }
        assert_eq!(buffer.write_row(), 6);
        // 6 % 4 = 2 -> half way down the texture
        assert!((buffer.scroll_offset() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_strip_vertices_cover_unit_square() {
        let vertices = strip_vertices(16);
        assert_eq!(vertices.len(), 16 * 6);
        assert!(vertices.iter().all(|v| (0.0..=1.0).contains(&v.x01)));
        assert_eq!(vertices[0].x01, 0.0);
        assert_eq!(vertices[vertices.len() - 2].x01, 1.0);
    }
}
