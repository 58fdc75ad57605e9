// tests/test_shader.rs -- Render setup against a scripted backend and the
// naga-backed ValidatingBackend.
//
// The scripted backend records every call so the tests can check both the
// returned handle and the exact set of allocations and releases on each
// failure path.

use std::cell::RefCell;
use std::sync::Arc;

use edgeview::shader::{
    ShaderStage, StageHandle, QUAD_FRAGMENT_WGSL, QUAD_VERTEX_WGSL,
};
use edgeview::{
    Component, MemorySink, RenderSetup, ShaderBackend, ShaderError, ShaderProgram,
    ValidatingBackend,
};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Call {
    Compile(ShaderStage),
    ReleaseStage(u32),
    CreateProgram,
    Link(u32, u32, u32),
    ReleaseProgram(u32),
}

/// Fails whichever step it is told to.
#[derive(Default)]
struct ScriptedBackend {
    fail_vertex: bool,
    fail_fragment: bool,
    fail_link: bool,
    calls: RefCell<Vec<Call>>,
}

impl ScriptedBackend {
    fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }
}

impl ShaderBackend for ScriptedBackend {
    fn compile_stage(&self, stage: ShaderStage, _source: &str) -> Result<StageHandle, String> {
        self.calls.borrow_mut().push(Call::Compile(stage));
        match stage {
            ShaderStage::Vertex if self.fail_vertex => Err("0:1: syntax error in vertex".into()),
            ShaderStage::Fragment if self.fail_fragment => Err("0:3: undeclared identifier".into()),
            ShaderStage::Vertex => Ok(StageHandle(10)),
            ShaderStage::Fragment => Ok(StageHandle(11)),
        }
    }

    fn release_stage(&self, stage: StageHandle) {
        self.calls.borrow_mut().push(Call::ReleaseStage(stage.0));
    }

    fn create_program(&self) -> Result<ShaderProgram, String> {
        self.calls.borrow_mut().push(Call::CreateProgram);
        Ok(ShaderProgram::from_raw(7))
    }

    fn link_program(
        &self,
        program: ShaderProgram,
        vertex: StageHandle,
        fragment: StageHandle,
    ) -> Result<(), String> {
        self.calls
            .borrow_mut()
            .push(Call::Link(program.raw(), vertex.0, fragment.0));
        if self.fail_link {
            Err("varying `v_uv` not written by vertex shader".into())
        } else {
            Ok(())
        }
    }

    fn release_program(&self, program: ShaderProgram) {
        self.calls.borrow_mut().push(Call::ReleaseProgram(program.raw()));
    }
}

fn setup(backend: ScriptedBackend) -> (RenderSetup<ScriptedBackend>, Arc<MemorySink>) {
    let sink = Arc::new(MemorySink::new());
    (RenderSetup::new(backend).with_sink(sink.clone()), sink)
}

// ===== Scripted backend: call sequences =====

#[test]
fn success_releases_stages_and_keeps_program() {
    let (rs, sink) = setup(ScriptedBackend::default());
    let program = rs.link_program("vs", "fs");

    assert_eq!(program, ShaderProgram::from_raw(7));
    assert!(sink.is_empty());
    assert_eq!(
        rs.backend().calls(),
        vec![
            Call::Compile(ShaderStage::Vertex),
            Call::Compile(ShaderStage::Fragment),
            Call::CreateProgram,
            Call::Link(7, 10, 11),
            Call::ReleaseStage(11),
            Call::ReleaseStage(10),
        ]
    );
}

#[test]
fn vertex_failure_stops_before_fragment_and_link() {
    let (rs, sink) = setup(ScriptedBackend { fail_vertex: true, ..Default::default() });
    let program = rs.link_program("broken", "fs");

    assert_eq!(program, ShaderProgram::INVALID);
    assert_eq!(rs.backend().calls(), vec![Call::Compile(ShaderStage::Vertex)]);

    let records = sink.take();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].component, Component::RenderSetup);
    assert!(records[0].message.contains("syntax error in vertex"), "{}", records[0]);
}

#[test]
fn fragment_failure_releases_vertex_stage() {
    let (rs, sink) = setup(ScriptedBackend { fail_fragment: true, ..Default::default() });
    let program = rs.link_program("vs", "broken");

    assert_eq!(program, ShaderProgram::INVALID);
    assert_eq!(
        rs.backend().calls(),
        vec![
            Call::Compile(ShaderStage::Vertex),
            Call::Compile(ShaderStage::Fragment),
            Call::ReleaseStage(10),
        ]
    );
    assert!(sink.take()[0].message.contains("undeclared identifier"));
}

#[test]
fn link_failure_releases_program_and_both_stages() {
    let (rs, sink) = setup(ScriptedBackend { fail_link: true, ..Default::default() });
    let program = rs.link_program("vs", "fs");

    assert_eq!(program, ShaderProgram::INVALID);
    let calls = rs.backend().calls();
    assert_eq!(&calls[..4], &[
        Call::Compile(ShaderStage::Vertex),
        Call::Compile(ShaderStage::Fragment),
        Call::CreateProgram,
        Call::Link(7, 10, 11),
    ]);
    let released: Vec<_> = calls[4..].to_vec();
    assert_eq!(released.len(), 3);
    assert!(released.contains(&Call::ReleaseProgram(7)));
    assert!(released.contains(&Call::ReleaseStage(10)));
    assert!(released.contains(&Call::ReleaseStage(11)));

    let records = sink.take();
    assert_eq!(records.len(), 1);
    assert!(records[0].message.contains("v_uv"));
}

#[test]
fn try_link_program_reports_stage() {
    let rs = RenderSetup::new(ScriptedBackend { fail_fragment: true, ..Default::default() });
    let err = rs.try_link_program("vs", "fs").unwrap_err();
    assert!(matches!(err, ShaderError::Compile { stage: ShaderStage::Fragment, .. }));
}

// ===== ValidatingBackend: real WGSL =====

const MIN_VS: &str = r#"
@vertex
fn main(@builtin(vertex_index) i: u32) -> @builtin(position) vec4<f32> {
    let x = f32(i & 1u) * 2.0 - 1.0;
    let y = f32((i >> 1u) & 1u) * 2.0 - 1.0;
    return vec4<f32>(x, y, 0.0, 1.0);
}
"#;

const MIN_FS: &str = r#"
@fragment
fn main() -> @location(0) vec4<f32> {
    return vec4<f32>(1.0, 1.0, 1.0, 1.0);
}
"#;

#[test]
fn minimal_shaders_link() {
    let rs = RenderSetup::new(ValidatingBackend::new());
    let program = rs.link_program(MIN_VS, MIN_FS);
    assert!(program.is_valid());
    assert_eq!(rs.backend().live_stages(), 0);
    assert_eq!(rs.backend().live_programs(), 1);
}

#[test]
fn quad_shaders_link() {
    let rs = RenderSetup::new(ValidatingBackend::new());
    let program = rs.try_link_program(QUAD_VERTEX_WGSL, QUAD_FRAGMENT_WGSL).unwrap();
    let entry = rs.backend().entry_points(program).unwrap();
    assert_eq!(entry.vertex, "vs_main");
    assert_eq!(entry.fragment, "fs_main");
}

#[test]
fn invalid_vertex_source_is_invalid_program() {
    let sink = Arc::new(MemorySink::new());
    let rs = RenderSetup::new(ValidatingBackend::new()).with_sink(sink.clone());
    let program = rs.link_program("@vertex fn main( -> {", MIN_FS);

    assert_eq!(program, ShaderProgram::INVALID);
    assert_eq!(rs.backend().live_stages(), 0);
    assert_eq!(rs.backend().live_programs(), 0);
    let records = sink.take();
    assert_eq!(records.len(), 1);
    assert!(records[0].message.starts_with("error compiling vertex shader"), "{}", records[0]);
}

#[test]
fn unmatched_fragment_input_fails_link() {
    let fs = r#"
        @fragment
        fn main(@location(2) tint: vec4<f32>) -> @location(0) vec4<f32> {
            return tint;
        }
    "#;
    let rs = RenderSetup::new(ValidatingBackend::new());
    let err = rs.try_link_program(MIN_VS, fs).unwrap_err();
    match err {
        ShaderError::Link { log } => assert!(log.contains("location 2"), "{log}"),
        other => panic!("expected link error, got {other:?}"),
    }
    assert_eq!(rs.backend().live_stages(), 0);
    assert_eq!(rs.backend().live_programs(), 0);
}

#[test]
fn vertex_without_position_fails_link() {
    let vs = r#"
        @vertex
        fn main() -> @location(0) vec4<f32> {
            return vec4<f32>(0.0);
        }
    "#;
    let rs = RenderSetup::new(ValidatingBackend::new());
    assert_eq!(rs.link_program(vs, MIN_FS), ShaderProgram::INVALID);
    assert_eq!(rs.backend().live_stages(), 0);
    assert_eq!(rs.backend().live_programs(), 0);
}
