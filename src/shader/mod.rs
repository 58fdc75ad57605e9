// shader/mod.rs -- Render setup: compile two shader stages, link a program.
//
// STATE SEQUENCE (once per call, no retries)
// ──────────────────────────────────────────
//
//   Compiling ──(vertex ok, fragment ok)──► Linking ──(ok)──► Ready
//       │                                      │
//       └──────────── any failure ─────────────┴────────────► Failed
//
// Failure at any point yields `ShaderProgram::INVALID` and one
// diagnostic carrying the backend's log text. Nothing is returned
// half-built:
//   - a failed vertex compile stops before the fragment stage and
//     before any program object exists;
//   - every compiled stage is released on every exit path;
//   - a program that fails to link is released before returning.
//
// Releases are driven by Drop on small guard structs rather than by
// explicit calls on each branch, so an early `?` return cannot leak.
//
// The GPU itself sits behind `ShaderBackend`. The crate ships a CPU-only
// validating backend (WGSL via naga) and, with the `gpu` feature, a wgpu
// backend.

pub mod validate;

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::diagnostics::{Component, Diagnostic, DiagnosticSink, TracingSink};

pub use validate::ValidatingBackend;

/// Vertex shader for drawing the processed frame as a full-screen quad.
pub const QUAD_VERTEX_WGSL: &str = include_str!("../shaders/quad_vs.wgsl");
/// Fragment shader sampling the processed frame texture.
pub const QUAD_FRAGMENT_WGSL: &str = include_str!("../shaders/quad_fs.wgsl");

/// Pipeline stage of a shader source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => write!(f, "vertex"),
            ShaderStage::Fragment => write!(f, "fragment"),
        }
    }
}

/// Backend handle for one compiled stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StageHandle(pub u32);

/// Opaque handle to a linked program. Zero is the invalid sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderProgram(u32);

impl ShaderProgram {
    pub const INVALID: ShaderProgram = ShaderProgram(0);

    pub const fn from_raw(raw: u32) -> Self {
        ShaderProgram(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }

    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl Default for ShaderProgram {
    fn default() -> Self {
        ShaderProgram::INVALID
    }
}

/// Errors from compiling or linking a program.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShaderError {
    #[error("error compiling {stage} shader: {log}")]
    Compile { stage: ShaderStage, log: String },

    #[error("error creating program: {log}")]
    Program { log: String },

    #[error("error linking program: {log}")]
    Link { log: String },
}

/// The GPU-side operations render setup needs.
///
/// Methods take `&self`: GPU contexts are typically used through shared
/// handles, and implementations keep their object tables behind a lock.
/// Error strings are the backend's diagnostic log text.
pub trait ShaderBackend {
    fn compile_stage(&self, stage: ShaderStage, source: &str) -> Result<StageHandle, String>;

    fn release_stage(&self, stage: StageHandle);

    /// Allocate an empty program object.
    fn create_program(&self) -> Result<ShaderProgram, String>;

    fn link_program(
        &self,
        program: ShaderProgram,
        vertex: StageHandle,
        fragment: StageHandle,
    ) -> Result<(), String>;

    fn release_program(&self, program: ShaderProgram);
}

/// Progress of one link attempt, reported through `tracing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Compiling,
    Linking,
    Ready,
    Failed,
}

// ---------------------------------------------------------------------------
// Scoped guards
// ---------------------------------------------------------------------------

/// Releases a compiled stage when dropped.
struct StageGuard<'b, B: ShaderBackend + ?Sized> {
    backend: &'b B,
    handle: StageHandle,
}

impl<'b, B: ShaderBackend + ?Sized> StageGuard<'b, B> {
    fn compile(backend: &'b B, stage: ShaderStage, source: &str) -> Result<Self, ShaderError> {
        let handle = backend
            .compile_stage(stage, source)
            .map_err(|log| ShaderError::Compile { stage, log })?;
        Ok(StageGuard { backend, handle })
    }
}

impl<B: ShaderBackend + ?Sized> Drop for StageGuard<'_, B> {
    fn drop(&mut self) {
        self.backend.release_stage(self.handle);
    }
}

/// Releases a program when dropped, unless `keep` hands it out.
struct ProgramGuard<'b, B: ShaderBackend + ?Sized> {
    backend: &'b B,
    program: Option<ShaderProgram>,
}

impl<'b, B: ShaderBackend + ?Sized> ProgramGuard<'b, B> {
    fn create(backend: &'b B) -> Result<Self, ShaderError> {
        let program = backend
            .create_program()
            .map_err(|log| ShaderError::Program { log })?;
        if !program.is_valid() {
            return Err(ShaderError::Program {
                log: "backend returned the invalid program handle".to_string(),
            });
        }
        Ok(ProgramGuard { backend, program: Some(program) })
    }

    fn handle(&self) -> ShaderProgram {
        self.program.unwrap_or(ShaderProgram::INVALID)
    }

    fn keep(mut self) -> ShaderProgram {
        self.program.take().unwrap_or(ShaderProgram::INVALID)
    }
}

impl<B: ShaderBackend + ?Sized> Drop for ProgramGuard<'_, B> {
    fn drop(&mut self) {
        if let Some(program) = self.program.take() {
            self.backend.release_program(program);
        }
    }
}

// ---------------------------------------------------------------------------
// RenderSetup
// ---------------------------------------------------------------------------

/// Builds shader programs on a backend, reporting failures to a sink.
pub struct RenderSetup<B: ShaderBackend> {
    backend: B,
    sink: Arc<dyn DiagnosticSink>,
}

impl<B: ShaderBackend> RenderSetup<B> {
    /// Diagnostics go to `tracing` until `with_sink` replaces the sink.
    pub fn new(backend: B) -> Self {
        RenderSetup { backend, sink: Arc::new(TracingSink) }
    }

    pub fn with_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }

    /// Compile and link, returning the program or the reason it failed.
    /// Nothing is recorded to the sink.
    pub fn try_link_program(
        &self,
        vertex_source: &str,
        fragment_source: &str,
    ) -> Result<ShaderProgram, ShaderError> {
        let backend = &self.backend;

        tracing::debug!(state = ?LinkState::Compiling);
        let vertex = StageGuard::compile(backend, ShaderStage::Vertex, vertex_source)?;
        let fragment = StageGuard::compile(backend, ShaderStage::Fragment, fragment_source)?;

        tracing::debug!(state = ?LinkState::Linking);
        let program = ProgramGuard::create(backend)?;
        backend
            .link_program(program.handle(), vertex.handle, fragment.handle)
            .map_err(|log| ShaderError::Link { log })?;

        let program = program.keep();
        tracing::debug!(state = ?LinkState::Ready, program = program.raw());
        Ok(program)
        // `vertex` and `fragment` are released here.
    }

    /// Compile and link; on failure record the diagnostic and return
    /// `ShaderProgram::INVALID`.
    pub fn link_program(&self, vertex_source: &str, fragment_source: &str) -> ShaderProgram {
        match self.try_link_program(vertex_source, fragment_source) {
            Ok(program) => program,
            Err(e) => {
                tracing::debug!(state = ?LinkState::Failed);
                self.sink.record(Diagnostic::new(Component::RenderSetup, e.to_string()));
                ShaderProgram::INVALID
            }
        }
    }
}
