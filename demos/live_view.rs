// demos/live_view.rs
//
// Live view of the frame pipeline on a synthetic camera feed.
// A moving scene is rendered straight into NV21 (the way a phone camera
// delivers preview frames), run through FrameTransformer, and blitted to
// a window. The sensor is "mounted" in landscape, so the window shows the
// portrait image after the 90° clockwise correction.
//
// Usage:
//   cargo run --example live_view --release
//   RUST_LOG=edgeview=debug cargo run --example live_view --release
//
// Controls:
//   E      - toggle edge detection
//   Space  - pause/resume the scene
//   Q/Esc  - quit

use std::time::Duration;

use edgeview::stats::FpsCounter;
use edgeview::{FrameTransformer, ProcessedFrame, ProcessingMode};

use minifb::{Key, KeyRepeat, Window, WindowOptions};

/// Sensor resolution (landscape).
const SENSOR_W: usize = 640;
const SENSOR_H: usize = 480;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let transformer = FrameTransformer::default();
    let (win_w, win_h) = transformer.config().rotation.output_size(SENSOR_W, SENSOR_H);

    let mut window = Window::new(
        "edgeview - E: edges, Space: pause, Q: quit",
        win_w,
        win_h,
        WindowOptions::default(),
    )
    .expect("failed to create window");
    window.set_target_fps(30);

    let mut fb = vec![0u32; win_w * win_h];
    let mut mode = ProcessingMode::EdgeDetect;
    let mut paused = false;
    let mut tick = 0usize;
    let mut fps = FpsCounter::new(Duration::from_secs(1));

    tracing::info!(width = SENSOR_W, height = SENSOR_H, ?mode, "starting");

    while window.is_open() && !window.is_key_down(Key::Escape) && !window.is_key_down(Key::Q) {
        if window.is_key_pressed(Key::E, KeyRepeat::No) {
            mode = match mode {
                ProcessingMode::EdgeDetect => ProcessingMode::PassThrough,
                ProcessingMode::PassThrough => ProcessingMode::EdgeDetect,
            };
            tracing::info!(?mode, "mode changed");
        }
        if window.is_key_pressed(Key::Space, KeyRepeat::No) {
            paused = !paused;
        }
        if !paused {
            tick += 1;
        }

        let nv21 = synthetic_frame(SENSOR_W, SENSOR_H, tick);
        let frame = transformer.process_bytes(&nv21, SENSOR_W, SENSOR_H, mode);
        blit(&frame, &mut fb);

        fps.tick();
        if let Some(rate) = fps.sample() {
            tracing::info!(fps = format!("{rate:.1}"), ?mode, "frame rate");
        }

        window
            .update_with_buffer(&fb, win_w, win_h)
            .expect("window update failed");
    }
}

/// A landscape scene: horizontal luma ramp, a bright square orbiting the
/// centre, a dark bar sweeping across, and a blue-ish chroma tint on the
/// left half.
fn synthetic_frame(w: usize, h: usize, tick: usize) -> Vec<u8> {
    let mut data = vec![0u8; w * h * 3 / 2];
    let (luma, chroma) = data.split_at_mut(w * h);

    let t = tick as f32 * 0.05;
    let sq_x = (w as f32 * 0.5 + t.cos() * w as f32 * 0.3) as usize;
    let sq_y = (h as f32 * 0.5 + t.sin() * h as f32 * 0.3) as usize;
    let bar_x = (tick * 4) % w;

    for y in 0..h {
        for x in 0..w {
            let mut v = 40 + (x * 120 / w) as u8;
            if x.abs_diff(sq_x) < 40 && y.abs_diff(sq_y) < 40 {
                v = 230;
            }
            if x.abs_diff(bar_x) < 8 {
                v = 20;
            }
            luma[y * w + x] = v;
        }
    }
    for (i, vu) in chroma.chunks_exact_mut(2).enumerate() {
        let left = (i % (w / 2)) < w / 4;
        vu[0] = 128;
        vu[1] = if left { 170 } else { 128 };
    }
    data
}

/// Copy packed RGB into the 0RGB framebuffer.
fn blit(frame: &ProcessedFrame, fb: &mut [u32]) {
    if frame.is_empty() {
        fb.fill(0);
        return;
    }
    for (dst, px) in fb.iter_mut().zip(frame.as_bytes().chunks_exact(3)) {
        *dst = ((px[0] as u32) << 16) | ((px[1] as u32) << 8) | px[2] as u32;
    }
}
