// gpu/shader.rs -- `ShaderBackend` on a real wgpu device.
//
// wgpu has no separate "link" step: a render pipeline is created from a
// vertex module and a fragment module in one call. The backend maps the
// two-step protocol onto it:
//
//   compile_stage    naga parse + validate (for a readable log), then
//                    create_shader_module inside a validation error scope
//   create_program   reserve a handle, no GPU object yet
//   link_program     inter-stage check, then create_render_pipeline
//                    inside a validation error scope
//
// wgpu reports validation failures asynchronously through error scopes
// instead of return values; `pollster::block_on(pop_error_scope())`
// turns them back into a synchronous `Err(log)`.

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::gpu::device::GpuDevice;
use crate::shader::validate::{check_interface, compile_wgsl, CompiledStage};
use crate::shader::{ShaderBackend, ShaderProgram, ShaderStage, StageHandle};

struct Stage {
    compiled: CompiledStage,
    module: wgpu::ShaderModule,
}

#[derive(Default)]
struct State {
    next_id: u32,
    stages: HashMap<u32, Stage>,
    programs: HashMap<u32, Option<wgpu::RenderPipeline>>,
}

/// Builds render pipelines that draw into `target_format`.
pub struct WgpuBackend {
    gpu: GpuDevice,
    target_format: wgpu::TextureFormat,
    state: Mutex<State>,
}

impl WgpuBackend {
    pub fn new(gpu: GpuDevice, target_format: wgpu::TextureFormat) -> Self {
        WgpuBackend { gpu, target_format, state: Mutex::new(State::default()) }
    }

    pub fn gpu(&self) -> &GpuDevice {
        &self.gpu
    }

    pub fn target_format(&self) -> wgpu::TextureFormat {
        self.target_format
    }

    /// Run `f` with the pipeline of a linked program. Returns `None` for
    /// unknown or unlinked programs.
    pub fn with_pipeline<R>(
        &self,
        program: ShaderProgram,
        f: impl FnOnce(&wgpu::RenderPipeline) -> R,
    ) -> Option<R> {
        let state = self.lock();
        state.programs.get(&program.raw())?.as_ref().map(f)
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Run `f` inside a validation error scope and return its error text.
    fn scoped<R>(&self, f: impl FnOnce(&wgpu::Device) -> R) -> Result<R, String> {
        self.gpu.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let out = f(&self.gpu.device);
        match pollster::block_on(self.gpu.device.pop_error_scope()) {
            Some(err) => Err(err.to_string()),
            None => Ok(out),
        }
    }
}

impl ShaderBackend for WgpuBackend {
    fn compile_stage(&self, stage: ShaderStage, source: &str) -> Result<StageHandle, String> {
        let compiled = compile_wgsl(stage, source)?;
        let module = self.scoped(|device| {
            device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(match stage {
                    ShaderStage::Vertex => "edgeview::vertex",
                    ShaderStage::Fragment => "edgeview::fragment",
                }),
                source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(source)),
            })
        })?;

        let mut state = self.lock();
        state.next_id += 1;
        let id = state.next_id;
        state.stages.insert(id, Stage { compiled, module });
        Ok(StageHandle(id))
    }

    fn release_stage(&self, stage: StageHandle) {
        // Dropping the module releases it; pipelines keep their own reference.
        self.lock().stages.remove(&stage.0);
    }

    fn create_program(&self) -> Result<ShaderProgram, String> {
        let mut state = self.lock();
        state.next_id += 1;
        let id = state.next_id;
        state.programs.insert(id, None);
        Ok(ShaderProgram::from_raw(id))
    }

    fn link_program(
        &self,
        program: ShaderProgram,
        vertex: StageHandle,
        fragment: StageHandle,
    ) -> Result<(), String> {
        let mut state = self.lock();
        if !state.programs.contains_key(&program.raw()) {
            return Err(format!("unknown program {}", program.raw()));
        }
        let vs = state
            .stages
            .get(&vertex.0)
            .filter(|s| s.compiled.stage == ShaderStage::Vertex)
            .ok_or_else(|| format!("{} is not a compiled vertex stage", vertex.0))?;
        let fs = state
            .stages
            .get(&fragment.0)
            .filter(|s| s.compiled.stage == ShaderStage::Fragment)
            .ok_or_else(|| format!("{} is not a compiled fragment stage", fragment.0))?;
        check_interface(&vs.compiled, &fs.compiled)?;

        let pipeline = self.scoped(|device| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("edgeview::program"),
                layout: None,
                vertex: wgpu::VertexState {
                    module: &vs.module,
                    entry_point: &vs.compiled.entry_point,
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                    buffers: &[],
                },
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleStrip,
                    ..Default::default()
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                fragment: Some(wgpu::FragmentState {
                    module: &fs.module,
                    entry_point: &fs.compiled.entry_point,
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: self.target_format,
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                multiview: None,
                cache: None,
            })
        })?;

        state.programs.insert(program.raw(), Some(pipeline));
        Ok(())
    }

    fn release_program(&self, program: ShaderProgram) {
        self.lock().programs.remove(&program.raw());
    }
}
