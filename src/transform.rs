// transform.rs -- The per-frame pipeline.
//
//   NV21 bytes
//     │  RawFrame::new         validate dims + length (no reads yet)
//     ▼
//   nv21_to_rgb              BT.601 fixed point
//     ▼
//   rotate                   configured rotation (default 90° cw)
//     ▼
//   ┌── PassThrough ───────────────────────────────┐
//   │                                              │
//   └── EdgeDetect: gray → blur 5×5 σ1.4 → Canny ──┤
//                   → replicate to 3 channels      │
//                                                  ▼
//                                      packed RGB bytes (ProcessedFrame)
//
// Every call is independent. The transformer holds only its validated
// configuration and a diagnostic sink, both immutable, so one instance
// can be shared across capture threads by reference.

use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;

use crate::canny::CannyDetector;
use crate::convert::{gray_to_rgb, rgb_to_gray};
use crate::convolution::gaussian_blur;
use crate::diagnostics::{Component, Diagnostic, DiagnosticSink, TracingSink};
use crate::image::{Image, Rgb};
use crate::orientation::{rotate, Rotation};
use crate::yuv::{nv21_to_rgb, FrameError, RawFrame};

/// Bytes per output pixel.
pub const OUTPUT_CHANNELS: usize = 3;

/// What the pipeline does after color conversion and rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ProcessingMode {
    /// Color image only.
    PassThrough,
    /// Edge map, replicated to three channels.
    #[default]
    EdgeDetect,
}

impl From<bool> for ProcessingMode {
    /// `true` selects edge detection, matching the capture-side toggle.
    fn from(edge_detection: bool) -> Self {
        if edge_detection {
            ProcessingMode::EdgeDetect
        } else {
            ProcessingMode::PassThrough
        }
    }
}

/// Invalid pipeline configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("blur kernel size must be odd and at least 1 (got {0})")]
    KernelSize(usize),

    #[error("blur sigma must be positive and finite (got {0})")]
    Sigma(f32),

    #[error("edge thresholds must satisfy 0 <= low <= high (got {low}, {high})")]
    Thresholds { low: f32, high: f32 },
}

/// Pipeline configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformConfig {
    /// Sensor-mount correction applied to every frame.
    pub rotation: Rotation,
    /// Gaussian kernel edge length (odd).
    pub blur_kernel_size: usize,
    /// Gaussian standard deviation.
    pub blur_sigma: f32,
    /// Edge candidates need a gradient magnitude above this.
    pub low_threshold: f32,
    /// Edge seeds need a gradient magnitude above this.
    pub high_threshold: f32,
}

impl Default for TransformConfig {
    /// 90° clockwise, 5×5 Gaussian with σ = 1.4, thresholds 50 / 150.
    fn default() -> Self {
        TransformConfig {
            rotation: Rotation::Clockwise90,
            blur_kernel_size: 5,
            blur_sigma: 1.4,
            low_threshold: 50.0,
            high_threshold: 150.0,
        }
    }
}

impl TransformConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.blur_kernel_size % 2 == 0 {
            return Err(ConfigError::KernelSize(self.blur_kernel_size));
        }
        if !(self.blur_sigma.is_finite() && self.blur_sigma > 0.0) {
            return Err(ConfigError::Sigma(self.blur_sigma));
        }
        let (low, high) = (self.low_threshold, self.high_threshold);
        if !(low >= 0.0 && low <= high) {
            return Err(ConfigError::Thresholds { low, high });
        }
        Ok(())
    }
}

/// Output of one `process` call: packed RGB, row-major, no padding.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProcessedFrame {
    data: Vec<u8>,
    width: usize,
    height: usize,
}

impl ProcessedFrame {
    /// The zero-length frame returned when input is rejected.
    pub fn empty() -> Self {
        Self::default()
    }

    fn from_image(img: &Image<Rgb>) -> Self {
        ProcessedFrame {
            data: img.to_rgb_bytes(),
            width: img.width(),
            height: img.height(),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// The RGB triple at (x, y).
    ///
    /// # Panics
    /// Panics if (x, y) is out of bounds.
    pub fn pixel(&self, x: usize, y: usize) -> [u8; 3] {
        assert!(
            x < self.width && y < self.height,
            "pixel ({x},{y}) out of bounds for frame {}×{}",
            self.width,
            self.height,
        );
        let i = (y * self.width + x) * OUTPUT_CHANNELS;
        [self.data[i], self.data[i + 1], self.data[i + 2]]
    }

    /// View the bytes as an `Image<Rgb>` (copies).
    pub fn to_image(&self) -> Image<Rgb> {
        Image::from_vec(self.width, self.height, bytemuck::cast_slice(&self.data).to_vec())
    }
}

/// Converts raw NV21 camera frames into display-ready RGB.
pub struct FrameTransformer {
    config: TransformConfig,
    canny: CannyDetector,
    sink: Arc<dyn DiagnosticSink>,
}

impl FrameTransformer {
    /// Build a transformer, rejecting an invalid configuration.
    /// Diagnostics go to `tracing` until `with_sink` replaces the sink.
    pub fn new(config: TransformConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::from_valid(config))
    }

    fn from_valid(config: TransformConfig) -> Self {
        let canny = CannyDetector::new(config.low_threshold, config.high_threshold);
        FrameTransformer {
            config,
            canny,
            sink: Arc::new(TracingSink),
        }
    }

    /// Route rejected-frame diagnostics to `sink`.
    pub fn with_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn config(&self) -> &TransformConfig {
        &self.config
    }

    /// Run the pipeline on an already-validated frame.
    pub fn process(&self, raw: &RawFrame<'_>, mode: ProcessingMode) -> ProcessedFrame {
        let started = Instant::now();

        let rgb = nv21_to_rgb(raw);
        let oriented = rotate(&rgb, self.config.rotation);
        let out = match mode {
            ProcessingMode::PassThrough => oriented,
            ProcessingMode::EdgeDetect => self.edge_map(&oriented),
        };
        let frame = ProcessedFrame::from_image(&out);

        tracing::debug!(
            width = raw.width(),
            height = raw.height(),
            ?mode,
            elapsed_us = started.elapsed().as_micros() as u64,
            "frame processed"
        );
        frame
    }

    /// Validate raw bytes and run the pipeline.
    pub fn try_process_bytes(
        &self,
        data: &[u8],
        width: usize,
        height: usize,
        mode: ProcessingMode,
    ) -> Result<ProcessedFrame, FrameError> {
        let raw = RawFrame::new(data, width, height)?;
        Ok(self.process(&raw, mode))
    }

    /// Byte-boundary entry point: malformed input yields an empty frame
    /// and one diagnostic instead of an error.
    pub fn process_bytes(
        &self,
        data: &[u8],
        width: usize,
        height: usize,
        mode: ProcessingMode,
    ) -> ProcessedFrame {
        match self.try_process_bytes(data, width, height, mode) {
            Ok(frame) => frame,
            Err(e) => {
                self.sink.record(Diagnostic::new(
                    Component::FrameTransformer,
                    format!("rejected {width}×{height} frame: {e}"),
                ));
                ProcessedFrame::empty()
            }
        }
    }

    fn edge_map(&self, rgb: &Image<Rgb>) -> Image<Rgb> {
        let gray = rgb_to_gray(rgb);
        let blurred = gaussian_blur(&gray, self.config.blur_kernel_size, self.config.blur_sigma);
        let edges = self.canny.detect(&blurred);
        gray_to_rgb(&edges)
    }
}

impl Default for FrameTransformer {
    /// `TransformConfig::default()` always passes `validate`.
    fn default() -> Self {
        Self::from_valid(TransformConfig::default())
    }
}
