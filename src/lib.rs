// edgeview: per-frame camera pipeline for live edge visualization
//
//   NV21 frame ─► RGB ─► orientation ─► [gray ─► Gaussian ─► Canny] ─► packed RGB
//
// plus the render-setup boundary that compiles and links the shader pair
// used to draw the result.

pub mod image;
pub mod convert;
pub mod convolution;
pub mod gradient;
pub mod canny;
pub mod yuv;
pub mod orientation;
pub mod diagnostics;
pub mod transform;
pub mod stats;
pub mod shader;

#[cfg(feature = "gpu")]
pub mod gpu;

pub use diagnostics::{Component, Diagnostic, DiagnosticSink, MemorySink, TracingSink};
pub use orientation::Rotation;
pub use shader::{RenderSetup, ShaderBackend, ShaderError, ShaderProgram, ValidatingBackend};
pub use transform::{ConfigError, FrameTransformer, ProcessedFrame, ProcessingMode, TransformConfig};
pub use yuv::{FrameError, RawFrame};
