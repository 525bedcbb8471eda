//! Offscreen waterfall demo
//!
//! Renders a few seconds of synthetic tuning strikes into an offscreen
//! texture and dumps the final frame as a PPM image in the temp
//! directory. Run with RUST_LOG=debug to watch pipeline rebuilds.

use std::fs::File;
use std::io::Write;
use std::time::{Duration, Instant};

use pl_core::{AnalysisFrame, StrikeState};
use pl_viz::{GpuContext, RenderOptions, SchemeRegistry, TunerScene};

const WIDTH: u32 = 1024;
const HEIGHT: u32 = 512;
const BINS: usize = 256;
const START_HZ: f32 = 400.0;
const END_HZ: f32 = 480.0;
const STEPS: usize = 600;

/// Synthetic strike: starts sharp, decays, walks toward the target pitch
fn synth_frame(step: usize) -> AnalysisFrame {
    let strike = (step / 150) as f32;
    let phase = (step % 150) as f32;

    let cents_off = (16.0 / (strike + 1.0)) * (1.0 - phase / 300.0);
    let peak = 440.0 * 2.0_f32.powf(cents_off / 1200.0);
    let level = (1.0 - phase / 180.0).max(0.05);

    let peak_bin = (peak - START_HZ) / (END_HZ - START_HZ) * BINS as f32;
    let magnitudes: Vec<f32> = (0..BINS)
        .map(|b| {
            let distance = b as f32 - peak_bin;
            (level * (-distance * distance / 18.0).exp()).max(0.002)
        })
        .collect();

    AnalysisFrame {
        bin_count: BINS,
        magnitudes,
        start_frequency: START_HZ,
        end_frequency: END_HZ,
        envelope_min: 0.0,
        envelope_max: 1.0,
        peak_frequency: peak,
        peak_magnitude: level,
        peak_confidence: 0.92,
        strike_state: if phase < 8.0 {
            StrikeState::Attack
        } else {
            StrikeState::Monitoring
        },
        ..Default::default()
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let ctx = match GpuContext::new_blocking() {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("no GPU adapter available ({e}), nothing to draw");
            return Ok(());
        }
    };

    let texture = ctx.device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Demo Target"),
        size: wgpu::Extent3d {
            width: WIDTH,
            height: HEIGHT,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

    let registry = SchemeRegistry::builtin();
    let opts = RenderOptions {
        speed: 10,
        ..Default::default()
    };

    let mut scene = TunerScene::new(&ctx, wgpu::TextureFormat::Rgba8UnormSrgb)?;
    scene.resize(WIDTH, HEIGHT);

    // fixed timestamps keep the ingest cadence deterministic
    let t0 = Instant::now();
    for step in 0..STEPS {
        let frame = synth_frame(step);
        scene.render_at(
            &view,
            &frame,
            &registry,
            &opts,
            t0 + Duration::from_millis(step as u64 * 25),
        )?;
    }

    let size = (WIDTH * HEIGHT * 4) as u64;
    let readback = ctx.device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Demo Readback"),
        size,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::COPY_SRC,
        mapped_at_creation: false,
    });
    let mut encoder = ctx
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Demo Copy Encoder"),
        });
    encoder.copy_texture_to_buffer(
        wgpu::TexelCopyTextureInfo {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::TexelCopyBufferInfo {
            buffer: &readback,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(WIDTH * 4),
                rows_per_image: Some(HEIGHT),
            },
        },
        wgpu::Extent3d {
            width: WIDTH,
            height: HEIGHT,
            depth_or_array_layers: 1,
        },
    );
    ctx.queue.submit(std::iter::once(encoder.finish()));
    let pixels = ctx.read_buffer_blocking(&readback, size)?;

    let path = std::env::temp_dir().join("pitchlens_waterfall.ppm");
    let mut file = File::create(&path)?;
    write!(file, "P6\n{WIDTH} {HEIGHT}\n255\n")?;
    for pixel in pixels.chunks_exact(4) {
        file.write_all(&pixel[..3])?;
    }

    println!("wrote {}", path.display());
    Ok(())
}
