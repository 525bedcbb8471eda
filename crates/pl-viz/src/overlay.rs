//! Ring and marker overlay
//!
//! Drawn on top of the waterfall each frame from a small CPU-built mesh:
//! a center target line, one annulus per tolerance ring shifted by its
//! deviation position, and a peak marker gated on strike state. Vertices
//! are already in clip space so the pipeline needs no bindings.

use std::f32::consts::TAU;

use glam::Vec2;
use pl_core::{AnalysisFrame, StrikeState};

use crate::fisheye::PitchProjection;
use crate::rings::{RingIndication, ToleranceRing, strike_opacity};
use crate::scheme::OverlayColors;

/// Segments per ring annulus
const CIRCLE_SEGMENTS: usize = 64;

/// Vertex capacity of the overlay buffer
const MAX_OVERLAY_VERTICES: usize = 4096;

const RING_THICKNESS: f32 = 0.035;
const CENTER_LINE_HALF_WIDTH: f32 = 0.003;
const MARKER_HALF_WIDTH: f32 = 0.006;

const OVERLAY_SHADER: &str = r#"
struct VertexInput {
    @location(0) position: vec2<f32>,
    @location(1) color: vec4<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) color: vec4<f32>,
};

@vertex
fn vs_main(input: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    out.clip_position = vec4<f32>(input.position, 0.0, 1.0);
    out.color = input.color;
    return out;
}

@fragment
fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    return input.color;
}
"#;

#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct OverlayVertex {
    pub position: [f32; 2],
    pub color: [f32; 4],
}

fn vertex(position: Vec2, color: [f32; 4]) -> OverlayVertex {
    OverlayVertex {
        position: position.to_array(),
        color,
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// MESH BUILDING
// ═══════════════════════════════════════════════════════════════════════════

fn push_quad(out: &mut Vec<OverlayVertex>, center: Vec2, half: Vec2, color: [f32; 4]) {
    let bl = center - half;
    let tr = center + half;
    let br = Vec2::new(tr.x, bl.y);
    let tl = Vec2::new(bl.x, tr.y);
    out.push(vertex(bl, color));
    out.push(vertex(br, color));
    out.push(vertex(tr, color));
    out.push(vertex(bl, color));
    out.push(vertex(tr, color));
    out.push(vertex(tl, color));
}

/// Annulus band around `center`, x compressed by the aspect ratio so rings
/// stay round on wide viewports
fn push_annulus(out: &mut Vec<OverlayVertex>, center: Vec2, radius: f32, aspect: f32, color: [f32; 4]) {
    let inner = (radius - RING_THICKNESS * 0.5).max(0.0);
    let outer = radius + RING_THICKNESS * 0.5;
    let squeeze = Vec2::new(1.0 / aspect.max(f32::EPSILON), 1.0);
    for i in 0..CIRCLE_SEGMENTS {
        let a0 = i as f32 / CIRCLE_SEGMENTS as f32 * TAU;
        let a1 = (i + 1) as f32 / CIRCLE_SEGMENTS as f32 * TAU;
        let d0 = Vec2::from_angle(a0) * squeeze;
        let d1 = Vec2::from_angle(a1) * squeeze;
        let i0 = center + d0 * inner;
        let o0 = center + d0 * outer;
        let i1 = center + d1 * inner;
        let o1 = center + d1 * outer;
        out.push(vertex(i0, color));
        out.push(vertex(o0, color));
        out.push(vertex(o1, color));
        out.push(vertex(i0, color));
        out.push(vertex(o1, color));
        out.push(vertex(i1, color));
    }
}

fn clip_x(position01: f32) -> f32 {
    position01 * 2.0 - 1.0
}

/// Horizontal marker position in [0, 1] for the detected peak
///
/// Without a usable target the marker falls back to the frame's linear
/// frequency axis so it stays aligned with the unwarped waterfall.
pub fn marker_position(frame: &AnalysisFrame, projection: &PitchProjection) -> f32 {
    if projection.is_neutral() {
        let span = frame.end_frequency - frame.start_frequency;
        if span <= 0.0 {
            return 0.5;
        }
        ((frame.peak_frequency - frame.start_frequency) / span).clamp(0.0, 1.0)
    } else {
        projection.project(frame.peak_frequency)
    }
}

/// Build the full overlay mesh for one frame
pub fn build_overlay_mesh(
    rings: &[ToleranceRing],
    indications: &[RingIndication],
    frame: &AnalysisFrame,
    projection: &PitchProjection,
    colors: &OverlayColors,
    aspect: f32,
) -> Vec<OverlayVertex> {
    let mut mesh = Vec::with_capacity(rings.len() * CIRCLE_SEGMENTS * 6 + 12);

    push_quad(
        &mut mesh,
        Vec2::ZERO,
        Vec2::new(CENTER_LINE_HALF_WIDTH, 0.9),
        colors.secondary.to_array(),
    );

    for (ring, indication) in rings.iter().zip(indications.iter()) {
        if indication.opacity <= 0.0 {
            continue;
        }
        let color = ring.color.with_alpha(ring.color.a * indication.opacity);
        let center = Vec2::new(clip_x(indication.position), 0.0);
        push_annulus(&mut mesh, center, ring.radius, aspect, color.to_array());
    }

    if frame.strike_state != StrikeState::Waiting && frame.has_valid_peak() {
        let alpha = strike_opacity(frame.relative_strength(frame.peak_magnitude));
        let color = colors.primary.with_alpha(colors.primary.a * alpha);
        let center = Vec2::new(clip_x(marker_position(frame, projection)), 0.0);
        push_quad(&mut mesh, center, Vec2::new(MARKER_HALF_WIDTH, 0.95), color.to_array());
    }

    mesh
}

// ═══════════════════════════════════════════════════════════════════════════
// GPU RENDERER
// ═══════════════════════════════════════════════════════════════════════════

pub struct OverlayRenderer {
    vertex_buffer: wgpu::Buffer,
    vertex_count: u32,
    render_pipeline: wgpu::RenderPipeline,
}

impl OverlayRenderer {
    pub fn new(device: &wgpu::Device, format: wgpu::TextureFormat) -> Self {
        let vertex_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Overlay Vertex Buffer"),
            size: (MAX_OVERLAY_VERTICES * std::mem::size_of::<OverlayVertex>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Overlay Shader"),
            source: wgpu::ShaderSource::Wgsl(OVERLAY_SHADER.into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Overlay Pipeline Layout"),
            bind_group_layouts: &[],
            push_constant_ranges: &[],
        });

        let render_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Overlay Render Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<OverlayVertex>() as u64,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &[
                        wgpu::VertexAttribute {
                            offset: 0,
                            shader_location: 0,
                            format: wgpu::VertexFormat::Float32x2,
                        },
                        wgpu::VertexAttribute {
                            offset: 8,
                            shader_location: 1,
                            format: wgpu::VertexFormat::Float32x4,
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
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
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
            vertex_buffer,
            vertex_count: 0,
            render_pipeline,
        }
    }

    /// Replace the overlay mesh, truncating if it exceeds buffer capacity
    pub fn update(&mut self, queue: &wgpu::Queue, vertices: &[OverlayVertex]) {
        let mut count = vertices.len();
        if count > MAX_OVERLAY_VERTICES {
            log::warn!(
                "overlay mesh truncated: {count} vertices exceeds capacity {MAX_OVERLAY_VERTICES}"
            );
            count = MAX_OVERLAY_VERTICES;
        }
        queue.write_buffer(
            &self.vertex_buffer,
            0,
            bytemuck::cast_slice(&vertices[..count]),
        );
        self.vertex_count = count as u32;
    }

    /// Draw the overlay over the existing frame contents
    pub fn render(&self, encoder: &mut wgpu::CommandEncoder, target: &wgpu::TextureView) {
        if self.vertex_count == 0 {
            return;
        }
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Overlay Render Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        render_pass.set_pipeline(&self.render_pipeline);
        render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        render_pass.draw(0..self.vertex_count, 0..1);
    }
}
