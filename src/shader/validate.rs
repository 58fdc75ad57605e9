// shader/validate.rs -- A GPU-free shader backend.
//
// Compiles WGSL with naga (the same front end wgpu uses) and performs the
// interface checks a driver would do at link time:
//
//   compile   parse → validate → find an entry point for the stage
//   link      vertex stage writes @builtin(position)
//             every fragment @location input is written by the vertex
//             stage at the same location with the same type
//
// Handles are plain integers handed out from a counter, so the backend
// can track which stages and programs are still alive. Tests use that to
// check that render setup releases everything it allocates.

use std::collections::HashMap;
use std::error::Error;
use std::sync::{Mutex, MutexGuard};

use naga::valid::{Capabilities, ValidationFlags, Validator};
use naga::{Binding, BuiltIn, Handle, Module, Type, TypeInner};

use super::{ShaderBackend, ShaderProgram, ShaderStage, StageHandle};

impl From<ShaderStage> for naga::ShaderStage {
    fn from(stage: ShaderStage) -> Self {
        match stage {
            ShaderStage::Vertex => naga::ShaderStage::Vertex,
            ShaderStage::Fragment => naga::ShaderStage::Fragment,
        }
    }
}

/// A parsed and validated stage.
#[derive(Debug)]
pub(crate) struct CompiledStage {
    pub(crate) stage: ShaderStage,
    pub(crate) module: Module,
    pub(crate) entry_point: String,
}

/// Entry point names of a linked program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramEntryPoints {
    pub vertex: String,
    pub fragment: String,
}

#[derive(Debug, Default)]
struct State {
    next_id: u32,
    stages: HashMap<u32, CompiledStage>,
    // None until linked successfully.
    programs: HashMap<u32, Option<ProgramEntryPoints>>,
}

impl State {
    fn allocate(&mut self) -> u32 {
        // Zero is reserved for the invalid program.
        self.next_id += 1;
        self.next_id
    }
}

/// Shader backend that validates WGSL without touching a GPU.
#[derive(Debug, Default)]
pub struct ValidatingBackend {
    state: Mutex<State>,
}

impl ValidatingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stages compiled and not yet released.
    pub fn live_stages(&self) -> usize {
        self.lock().stages.len()
    }

    /// Programs created and not yet released, linked or not.
    pub fn live_programs(&self) -> usize {
        self.lock().programs.len()
    }

    /// Entry points of a successfully linked program.
    pub fn entry_points(&self, program: ShaderProgram) -> Option<ProgramEntryPoints> {
        self.lock().programs.get(&program.raw()).cloned().flatten()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl ShaderBackend for ValidatingBackend {
    fn compile_stage(&self, stage: ShaderStage, source: &str) -> Result<StageHandle, String> {
        let compiled = compile_wgsl(stage, source)?;
        let mut state = self.lock();
        let id = state.allocate();
        state.stages.insert(id, compiled);
        tracing::trace!(id, %stage, "stage compiled");
        Ok(StageHandle(id))
    }

    fn release_stage(&self, stage: StageHandle) {
        if self.lock().stages.remove(&stage.0).is_none() {
            tracing::warn!(id = stage.0, "release of unknown stage");
        }
    }

    fn create_program(&self) -> Result<ShaderProgram, String> {
        let mut state = self.lock();
        let id = state.allocate();
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
        let vs = lookup(&state, vertex, ShaderStage::Vertex)?;
        let fs = lookup(&state, fragment, ShaderStage::Fragment)?;
        check_interface(vs, fs)?;

        let entry = ProgramEntryPoints {
            vertex: vs.entry_point.clone(),
            fragment: fs.entry_point.clone(),
        };
        state.programs.insert(program.raw(), Some(entry));
        Ok(())
    }

    fn release_program(&self, program: ShaderProgram) {
        if self.lock().programs.remove(&program.raw()).is_none() {
            tracing::warn!(id = program.raw(), "release of unknown program");
        }
    }
}

fn lookup(state: &State, handle: StageHandle, expected: ShaderStage) -> Result<&CompiledStage, String> {
    let compiled = state
        .stages
        .get(&handle.0)
        .ok_or_else(|| format!("unknown {expected} stage {}", handle.0))?;
    if compiled.stage != expected {
        return Err(format!(
            "stage {} is a {} shader, expected {expected}",
            handle.0, compiled.stage
        ));
    }
    Ok(compiled)
}

/// Parse and validate WGSL, then pick the first entry point for `stage`.
/// The error string is the compiler log.
pub(crate) fn compile_wgsl(stage: ShaderStage, source: &str) -> Result<CompiledStage, String> {
    let module = naga::front::wgsl::parse_str(source).map_err(|e| e.emit_to_string(source))?;

    Validator::new(ValidationFlags::all(), Capabilities::all())
        .validate(&module)
        .map_err(|e| error_chain(&e))?;

    let naga_stage = naga::ShaderStage::from(stage);
    let entry_point = module
        .entry_points
        .iter()
        .find(|ep| ep.stage == naga_stage)
        .map(|ep| ep.name.clone())
        .ok_or_else(|| format!("no @{stage} entry point"))?;

    Ok(CompiledStage { stage, module, entry_point })
}

fn error_chain(e: &dyn Error) -> String {
    let mut msg = e.to_string();
    let mut source = e.source();
    while let Some(inner) = source {
        msg.push_str(": ");
        msg.push_str(&inner.to_string());
        source = inner.source();
    }
    msg
}

// ---------------------------------------------------------------------------
// Inter-stage interface
// ---------------------------------------------------------------------------

/// Bound values crossing an entry point boundary, with structs flattened.
fn flatten_bindings(
    module: &Module,
    ty: Handle<Type>,
    binding: Option<&Binding>,
    out: &mut Vec<(Binding, TypeInner)>,
) {
    let inner = &module.types[ty].inner;
    match (binding, inner) {
        (Some(b), _) => out.push((b.clone(), inner.clone())),
        (None, TypeInner::Struct { members, .. }) => {
            for m in members {
                flatten_bindings(module, m.ty, m.binding.as_ref(), out);
            }
        }
        (None, _) => {}
    }
}

fn entry_function<'m>(stage: &'m CompiledStage) -> Option<&'m naga::Function> {
    stage
        .module
        .entry_points
        .iter()
        .find(|ep| ep.name == stage.entry_point)
        .map(|ep| &ep.function)
}

fn vertex_outputs(vs: &CompiledStage) -> Vec<(Binding, TypeInner)> {
    let mut out = Vec::new();
    if let Some(result) = entry_function(vs).and_then(|f| f.result.as_ref()) {
        flatten_bindings(&vs.module, result.ty, result.binding.as_ref(), &mut out);
    }
    out
}

fn fragment_inputs(fs: &CompiledStage) -> Vec<(Binding, TypeInner)> {
    let mut out = Vec::new();
    if let Some(f) = entry_function(fs) {
        for arg in &f.arguments {
            flatten_bindings(&fs.module, arg.ty, arg.binding.as_ref(), &mut out);
        }
    }
    out
}

fn location_of(binding: &Binding) -> Option<u32> {
    match binding {
        Binding::Location { location, .. } => Some(*location),
        Binding::BuiltIn(_) => None,
    }
}

pub(crate) fn check_interface(vs: &CompiledStage, fs: &CompiledStage) -> Result<(), String> {
    let outputs = vertex_outputs(vs);

    let writes_position = outputs
        .iter()
        .any(|(b, _)| matches!(b, Binding::BuiltIn(BuiltIn::Position { .. })));
    if !writes_position {
        return Err(format!(
            "vertex entry point '{}' does not write @builtin(position)",
            vs.entry_point
        ));
    }

    for (binding, ty) in fragment_inputs(fs) {
        let Some(location) = location_of(&binding) else {
            continue;
        };
        let produced = outputs
            .iter()
            .find(|(b, _)| location_of(b) == Some(location))
            .map(|(_, t)| t);
        match produced {
            None => {
                return Err(format!(
                    "fragment input at location {location} is not written by the vertex stage"
                ))
            }
            Some(out_ty) if *out_ty != ty => {
                return Err(format!(
                    "location {location}: vertex output {out_ty:?} does not match fragment input {ty:?}"
                ))
            }
            Some(_) => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const VS: &str = r#"
        struct Out {
            @builtin(position) pos: vec4<f32>,
            @location(0) color: vec3<f32>,
        }
        @vertex
        fn main_vs(@builtin(vertex_index) i: u32) -> Out {
            var o: Out;
            o.pos = vec4<f32>(f32(i), 0.0, 0.0, 1.0);
            o.color = vec3<f32>(1.0, 0.0, 0.0);
            return o;
        }
    "#;

    const FS: &str = r#"
        @fragment
        fn main_fs(@location(0) color: vec3<f32>) -> @location(0) vec4<f32> {
            return vec4<f32>(color, 1.0);
        }
    "#;

    #[test]
    fn test_compile_finds_entry_point() {
        let vs = compile_wgsl(ShaderStage::Vertex, VS).unwrap();
        assert_eq!(vs.entry_point, "main_vs");
    }

    #[test]
    fn test_wrong_stage_has_no_entry_point() {
        let err = compile_wgsl(ShaderStage::Fragment, VS).unwrap_err();
        assert!(err.contains("no @fragment entry point"), "{err}");
    }

    #[test]
    fn test_parse_error_is_logged() {
        let err = compile_wgsl(ShaderStage::Vertex, "fn broken( {").unwrap_err();
        assert!(!err.is_empty());
    }

    #[test]
    fn test_interface_matches() {
        let vs = compile_wgsl(ShaderStage::Vertex, VS).unwrap();
        let fs = compile_wgsl(ShaderStage::Fragment, FS).unwrap();
        assert_eq!(check_interface(&vs, &fs), Ok(()));
    }

    #[test]
    fn test_interface_type_mismatch() {
        let fs_src = r#"
            @fragment
            fn main_fs(@location(0) color: vec4<f32>) -> @location(0) vec4<f32> {
                return color;
            }
        "#;
        let vs = compile_wgsl(ShaderStage::Vertex, VS).unwrap();
        let fs = compile_wgsl(ShaderStage::Fragment, fs_src).unwrap();
        let err = check_interface(&vs, &fs).unwrap_err();
        assert!(err.contains("location 0"), "{err}");
    }

    #[test]
    fn test_backend_tracks_handles() {
        let backend = ValidatingBackend::new();
        let vs = backend.compile_stage(ShaderStage::Vertex, VS).unwrap();
        let fs = backend.compile_stage(ShaderStage::Fragment, FS).unwrap();
        let program = backend.create_program().unwrap();
        assert!(program.is_valid());
        backend.link_program(program, vs, fs).unwrap();
        assert_eq!(
            backend.entry_points(program),
            Some(ProgramEntryPoints { vertex: "main_vs".into(), fragment: "main_fs".into() })
        );

        backend.release_stage(vs);
        backend.release_stage(fs);
        assert_eq!(backend.live_stages(), 0);
        assert_eq!(backend.live_programs(), 1);
        backend.release_program(program);
        assert_eq!(backend.live_programs(), 0);
    }

    #[test]
    fn test_link_rejects_swapped_stages() {
        let backend = ValidatingBackend::new();
        let vs = backend.compile_stage(ShaderStage::Vertex, VS).unwrap();
        let fs = backend.compile_stage(ShaderStage::Fragment, FS).unwrap();
        let program = backend.create_program().unwrap();
        let err = backend.link_program(program, fs, vs).unwrap_err();
        assert!(err.contains("expected vertex"), "{err}");
    }
}
