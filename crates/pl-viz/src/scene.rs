//! Tuner scene
//!
//! Top-level render entry: ingests analysis frames into the waterfall,
//! evaluates the tolerance rings, and draws both into a caller-owned
//! surface. The waterfall pipeline is built lazily on the first allocated
//! frame and rebuilt when the bin count or color scheme changes; a rebuild
//! re-uploads the retained CPU history so the display never blanks.
//!
//! A rejected pipeline logs one error and disables GPU work for the rest
//! of the session instead of panicking on every frame.

use std::sync::Arc;
use std::time::Instant;

use pl_core::AnalysisFrame;
use serde::{Deserialize, Serialize};

use crate::common::{GpuContext, Viewport, VizError, VizResult};
use crate::fisheye::{DEFAULT_DISTORTION, PitchProjection};
use crate::overlay::{OverlayRenderer, build_overlay_mesh};
use crate::rings::{RingSet, evaluate_rings};
use crate::scheme::SchemeRegistry;
use crate::waterfall::{DEFAULT_HISTORY_ROWS, WaterfallBuffer, WaterfallParams, WaterfallRenderer};

/// Everything the caller chooses per frame
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// Reference pitch in Hz; non-positive disables warping and locks
    pub target_frequency: f32,
    pub scheme_name: String,
    pub dark_mode: bool,
    pub distortion: f32,
    pub rings: RingSet,
    /// Waterfall ingest speed, 1-10
    pub speed: u32,
    /// Magnitudes below this render as background
    pub threshold: f32,
    /// Map colors onto a plain grayscale ramp
    pub reduced_visual: bool,
    /// Half-range in cents across the waterfall width
    pub view_range_cents: f32,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            target_frequency: 440.0,
            scheme_name: SchemeRegistry::DEFAULT_SCHEME.into(),
            dark_mode: true,
            distortion: DEFAULT_DISTORTION,
            rings: RingSet::standard(),
            speed: 5,
            threshold: 0.05,
            reduced_visual: false,
            view_range_cents: 50.0,
        }
    }
}

/// Waterfall plus ring overlay drawing into one target
pub struct TunerScene {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    format: wgpu::TextureFormat,
    buffer: WaterfallBuffer,
    waterfall: Option<WaterfallRenderer>,
    overlay: OverlayRenderer,
    viewport: Viewport,
    cached_scheme: String,
    disabled: bool,
}

impl TunerScene {
    pub fn new(ctx: &GpuContext, format: wgpu::TextureFormat) -> VizResult<Self> {
        ctx.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let overlay = OverlayRenderer::new(&ctx.device, format);
        if let Some(error) = pollster::block_on(ctx.device.pop_error_scope()) {
            return Err(VizError::Shader(error.to_string()));
        }

        Ok(Self {
            device: Arc::clone(&ctx.device),
            queue: Arc::clone(&ctx.queue),
            format,
            buffer: WaterfallBuffer::new(DEFAULT_HISTORY_ROWS, 5),
            waterfall: None,
            overlay,
            viewport: Viewport::default(),
            cached_scheme: String::new(),
            disabled: false,
        })
    }

    /// Track the output surface size (used for ring aspect correction)
    pub fn resize(&mut self, width: u32, height: u32) {
        self.viewport = Viewport::new(width as f32, height as f32, self.viewport.scale);
    }

    /// True once a pipeline failure has shut rendering down
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// Render one frame using the current wall clock
    pub fn render(
        &mut self,
        view: &wgpu::TextureView,
        frame: &AnalysisFrame,
        registry: &SchemeRegistry,
        opts: &RenderOptions,
    ) -> VizResult<()> {
        self.render_at(view, frame, registry, opts, Instant::now())
    }

    /// Render one frame with an explicit ingest timestamp
    pub fn render_at(
        &mut self,
        view: &wgpu::TextureView,
        frame: &AnalysisFrame,
        registry: &SchemeRegistry,
        opts: &RenderOptions,
        now: Instant,
    ) -> VizResult<()> {
        if self.disabled {
            return Ok(());
        }

        self.buffer.set_speed(opts.speed);
        let written = self.buffer.push_frame(frame, now);

        let width = self.buffer.width();
        let needs_rebuild = width > 0
            && (self
                .waterfall
                .as_ref()
                .is_none_or(|w| w.width() as usize != width)
                || self.cached_scheme != opts.scheme_name);
        if needs_rebuild {
            if let Err(error) = self.rebuild_waterfall(registry, opts, width as u32) {
                self.disabled = true;
                self.waterfall = None;
                log::error!("waterfall pipeline rejected, rendering disabled: {error}");
                return Ok(());
            }
        } else if let (Some(renderer), Some(slot)) = (&self.waterfall, written) {
            renderer.upload_row(&self.queue, slot, self.buffer.row(slot));
        }

        if let Some(renderer) = &self.waterfall {
            renderer.set_params(
                &self.queue,
                &WaterfallParams {
                    start_frequency: frame.start_frequency,
                    end_frequency: frame.end_frequency,
                    target_frequency: opts.target_frequency,
                    half_range_cents: opts.view_range_cents,
                    distortion: opts.distortion,
                    scroll_offset: self.buffer.scroll_offset(),
                    threshold: opts.threshold,
                    reduced_visual: opts.reduced_visual,
                },
            );
        }

        let projection =
            PitchProjection::new(opts.target_frequency, opts.view_range_cents, opts.distortion);
        let indications =
            evaluate_rings(&opts.rings.rings, frame, opts.target_frequency, opts.distortion);
        let colors = registry.lookup(&opts.scheme_name).complementary(opts.dark_mode);
        let mesh = build_overlay_mesh(
            &opts.rings.rings,
            &indications,
            frame,
            &projection,
            &colors,
            self.viewport.aspect(),
        );
        self.overlay.update(&self.queue, &mesh);

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Tuner Scene Encoder"),
            });
        match &self.waterfall {
            Some(renderer) => renderer.render(&mut encoder, view),
            None => Self::clear(&mut encoder, view),
        }
        self.overlay.render(&mut encoder, view);
        self.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }

    /// Build (or rebuild) the waterfall pipeline and restore history
    fn rebuild_waterfall(
        &mut self,
        registry: &SchemeRegistry,
        opts: &RenderOptions,
        width: u32,
    ) -> VizResult<()> {
        let scheme = registry.lookup(&opts.scheme_name);
        log::debug!("building waterfall pipeline for scheme '{}'", scheme.name);

        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let renderer = WaterfallRenderer::new(
            &self.device,
            scheme,
            self.format,
            width,
            self.buffer.height() as u32,
        );
        if let Some(error) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(VizError::Shader(error.to_string()));
        }

        renderer.upload_all(&self.queue, self.buffer.rows());
        self.waterfall = Some(renderer);
        self.cached_scheme = opts.scheme_name.clone();
        Ok(())
    }

    /// Blank the target when no history exists yet
    fn clear(encoder: &mut wgpu::CommandEncoder, target: &wgpu::TextureView) {
        encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Scene Clear Pass"),
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
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_options_defaults() {
        let opts = RenderOptions::default();
        assert_eq!(opts.target_frequency, 440.0);
        assert_eq!(opts.scheme_name, "Viridis");
        assert_eq!(opts.speed, 5);
        assert_eq!(opts.rings, RingSet::standard());
        assert!(opts.dark_mode);
        assert!(!opts.reduced_visual);
    }

    #[test]
    fn test_render_options_partial_json() {
        let opts: RenderOptions =
            serde_json::from_str(r#"{"scheme_name": "Magma", "speed": 9}"#).unwrap();
        assert_eq!(opts.scheme_name, "Magma");
        assert_eq!(opts.speed, 9);
        assert_eq!(opts.target_frequency, 440.0);
        assert_eq!(opts.view_range_cents, 50.0);
    }
}
