//! Compiled shader programs.
//!
//! A [`ShaderProgram`] pairs a vertex stage with a fragment stage and links
//! them into one native program. The lifecycle is strict: sources are
//! attached with [`ShaderProgram::open`] (or
//! [`ShaderProgram::open_source`]), [`ShaderProgram::compile`] runs exactly
//! once, and only a compiled program may be bound or asked to resolve
//! uniform names. Native handles are released exactly once, on the first
//! [`ShaderProgram::dispose`] or on drop of the last owner.
//!
//! Programs are shared between materials as `Arc<ShaderProgram>`; a
//! material never assumes exclusive ownership of a program it did not
//! create.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use silene_core::paths::AssetPaths;

use crate::backend::{ProgramHandle, ShaderHandle, UniformSlot};
use crate::device::RenderDevice;
use crate::error::{RenderError, RenderResult};

/// Shader stage in the graphics pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    /// Vertex stage.
    Vertex,
    /// Fragment stage.
    Fragment,
}

impl ShaderStage {
    /// Both stages, in the order they are compiled and persisted.
    pub const ALL: [ShaderStage; 2] = [ShaderStage::Vertex, ShaderStage::Fragment];

    /// The native stage enum value, used on the wire by the material codec.
    pub fn wire_code(self) -> i32 {
        match self {
            ShaderStage::Vertex => 0x8B31,   // GL_VERTEX_SHADER
            ShaderStage::Fragment => 0x8B30, // GL_FRAGMENT_SHADER
        }
    }

    /// Look a stage up by its native enum value.
    pub fn from_wire_code(code: i32) -> Option<Self> {
        match code {
            0x8B31 => Some(ShaderStage::Vertex),
            0x8B30 => Some(ShaderStage::Fragment),
            _ => None,
        }
    }

    fn index(self) -> usize {
        match self {
            ShaderStage::Vertex => 0,
            ShaderStage::Fragment => 1,
        }
    }
}

impl std::fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShaderStage::Vertex => write!(f, "vertex"),
            ShaderStage::Fragment => write!(f, "fragment"),
        }
    }
}

/// Name recorded for the hard-coded default stages.
pub(crate) const DEFAULT_SOURCE_NAME: &str = "Default";

pub(crate) const DEFAULT_VERTEX_SOURCE: &str = "\
#version 330 core
layout (location = 0) in vec3 aPosition;

uniform mat4 u_MVP;
uniform vec3 u_Position;

void main()
{
    gl_Position = u_MVP * vec4(aPosition + u_Position, 1.0);
}
";

pub(crate) const DEFAULT_FRAGMENT_SOURCE: &str = "\
#version 330 core
out vec4 FragColor;

void main()
{
    FragColor = vec4(0.5, 0.8, 0.7, 1.0);
}
";

#[derive(Debug)]
struct Stage {
    handle: ShaderHandle,
    /// The source name recorded for persistence; `None` until a source is
    /// attached.
    source_name: Option<String>,
}

/// A linked, GPU-executable pairing of a vertex stage and a fragment stage.
pub struct ShaderProgram {
    device: Arc<RenderDevice>,
    program: ProgramHandle,
    stages: [Stage; 2],
    compiled: bool,
    disposed: AtomicBool,
}

impl ShaderProgram {
    /// Create an empty program with fresh native stage and program objects.
    pub fn new(device: &Arc<RenderDevice>) -> Self {
        let backend = device.backend();
        let stages = [
            Stage {
                handle: backend.create_shader(ShaderStage::Vertex),
                source_name: None,
            },
            Stage {
                handle: backend.create_shader(ShaderStage::Fragment),
                source_name: None,
            },
        ];
        let program = backend.create_program();
        Self {
            device: Arc::clone(device),
            program,
            stages,
            compiled: false,
            disposed: AtomicBool::new(false),
        }
    }

    /// The opaque native program identity. Non-zero once created.
    pub fn id(&self) -> ProgramHandle {
        self.program
    }

    /// The device this program was created on.
    pub fn device(&self) -> &Arc<RenderDevice> {
        &self.device
    }

    /// Whether [`ShaderProgram::compile`] has succeeded.
    pub fn is_compiled(&self) -> bool {
        self.compiled
    }

    /// Whether the native handles have been released.
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// The source name recorded for a stage, if one was attached.
    pub fn stage_name(&self, stage: ShaderStage) -> Option<&str> {
        self.stages[stage.index()].source_name.as_deref()
    }

    /// Stages with attached sources, in vertex-then-fragment order.
    pub fn stage_names(&self) -> impl Iterator<Item = (ShaderStage, &str)> {
        ShaderStage::ALL
            .into_iter()
            .filter_map(|stage| self.stage_name(stage).map(|name| (stage, name)))
    }

    /// Attach a stage source read from the configured shader directory.
    ///
    /// `name` is resolved against `paths.shaders()` and also recorded as the
    /// stage's persistent source name. Fails with
    /// [`RenderError::InvalidArgument`] for an empty name and
    /// [`RenderError::ResourceNotFound`] if the file cannot be read.
    pub fn open(&mut self, name: &str, stage: ShaderStage, paths: &AssetPaths) -> RenderResult<()> {
        if name.is_empty() {
            return Err(RenderError::InvalidArgument(
                "shader source name is required".to_owned(),
            ));
        }

        let path = paths.shader_file(name);
        let source = std::fs::read_to_string(&path)
            .map_err(|_| RenderError::ResourceNotFound(path.display().to_string()))?;

        self.attach_source(name, stage, &source);
        Ok(())
    }

    /// Attach in-memory stage source under a recorded name.
    ///
    /// Used for hard-coded programs; the name participates in persistence
    /// exactly as a file-backed name would.
    pub fn open_source(&mut self, name: &str, stage: ShaderStage, source: &str) -> RenderResult<()> {
        if name.is_empty() {
            return Err(RenderError::InvalidArgument(
                "shader source name is required".to_owned(),
            ));
        }
        self.attach_source(name, stage, source);
        Ok(())
    }

    /// Compile both stages and link them into the program.
    ///
    /// Fails with [`RenderError::Compilation`] (carrying the native
    /// diagnostic log) if either stage fails, [`RenderError::Link`] if
    /// linking fails. Must be called exactly once: a second call is
    /// [`RenderError::InvalidState`].
    pub fn compile(&mut self) -> RenderResult<()> {
        if self.is_disposed() {
            return Err(RenderError::Disposed);
        }
        if self.compiled {
            return Err(RenderError::InvalidState(
                "shader program is already compiled".to_owned(),
            ));
        }

        let backend = self.device.backend();

        for stage in ShaderStage::ALL {
            let handle = self.stages[stage.index()].handle;
            backend
                .compile_shader(handle)
                .map_err(|log| RenderError::Compilation { stage, log })?;
        }

        for stage in &self.stages {
            backend.attach_shader(self.program, stage.handle);
        }

        let linked = backend.link_program(self.program);

        for stage in &self.stages {
            backend.detach_shader(self.program, stage.handle);
        }

        linked.map_err(RenderError::Link)?;

        if let Some(error) = backend.poll_error() {
            return Err(RenderError::Api(error));
        }

        self.compiled = true;
        Ok(())
    }

    /// Make this program the active one for subsequent draw and uniform
    /// calls.
    ///
    /// Fails with [`RenderError::Disposed`] after destruction and
    /// [`RenderError::NotCompiled`] before a successful compile.
    pub fn bind(&self) -> RenderResult<()> {
        if self.is_disposed() {
            return Err(RenderError::Disposed);
        }
        if !self.compiled {
            return Err(RenderError::NotCompiled);
        }

        let backend = self.device.backend();
        backend.use_program(self.program);

        if let Some(error) = backend.poll_error() {
            return Err(RenderError::Api(error));
        }
        Ok(())
    }

    /// Resolve a uniform name to its slot in this program.
    ///
    /// Exact-name match; fails with [`RenderError::UniformNotFound`] if the
    /// program reports no such active uniform.
    pub fn uniform_location(&self, name: &str) -> RenderResult<UniformSlot> {
        if self.is_disposed() {
            return Err(RenderError::Disposed);
        }
        if !self.compiled {
            return Err(RenderError::NotCompiled);
        }

        self.device
            .backend()
            .uniform_location(self.program, name)
            .ok_or_else(|| RenderError::UniformNotFound(name.to_owned()))
    }

    /// Release the stage and program handles.
    ///
    /// The release happens exactly once; further calls are no-ops.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }

        let backend = self.device.backend();
        for stage in &self.stages {
            backend.delete_shader(stage.handle);
        }
        backend.delete_program(self.program);
        log::trace!("released shader program {:?}", self.program);
    }

    /// Build the hard-coded passthrough program.
    pub(crate) fn passthrough(device: &Arc<RenderDevice>) -> RenderResult<Self> {
        let mut program = Self::new(device);
        program.open_source(DEFAULT_SOURCE_NAME, ShaderStage::Vertex, DEFAULT_VERTEX_SOURCE)?;
        program.open_source(
            DEFAULT_SOURCE_NAME,
            ShaderStage::Fragment,
            DEFAULT_FRAGMENT_SOURCE,
        )?;
        program.compile()?;
        Ok(program)
    }

    fn attach_source(&mut self, name: &str, stage: ShaderStage, source: &str) {
        self.device
            .backend()
            .shader_source(self.stages[stage.index()].handle, source);
        self.stages[stage.index()].source_name = Some(name.to_owned());
    }
}

impl Drop for ShaderProgram {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for ShaderProgram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShaderProgram")
            .field("id", &self.program)
            .field("compiled", &self.compiled)
            .field("disposed", &self.is_disposed())
            .field("vertex", &self.stage_name(ShaderStage::Vertex))
            .field("fragment", &self.stage_name(ShaderStage::Fragment))
            .finish()
    }
}

static_assertions::assert_impl_all!(ShaderProgram: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::HeadlessBackend;

    fn test_device() -> (Arc<RenderDevice>, Arc<HeadlessBackend>) {
        let backend = Arc::new(HeadlessBackend::new());
        (RenderDevice::new(backend.clone()), backend)
    }

    fn compiled_program(device: &Arc<RenderDevice>) -> ShaderProgram {
        let mut program = ShaderProgram::new(device);
        program
            .open_source("test.vert", ShaderStage::Vertex, DEFAULT_VERTEX_SOURCE)
            .unwrap();
        program
            .open_source("test.frag", ShaderStage::Fragment, DEFAULT_FRAGMENT_SOURCE)
            .unwrap();
        program.compile().unwrap();
        program
    }

    #[test]
    fn wire_codes_round_trip() {
        for stage in ShaderStage::ALL {
            assert_eq!(ShaderStage::from_wire_code(stage.wire_code()), Some(stage));
        }
        assert_eq!(ShaderStage::from_wire_code(0), None);
    }

    #[test]
    fn open_rejects_empty_name() {
        let (device, _backend) = test_device();
        let mut program = ShaderProgram::new(&device);
        let paths = AssetPaths::new("/nonexistent");
        assert!(matches!(
            program.open("", ShaderStage::Vertex, &paths),
            Err(RenderError::InvalidArgument(_))
        ));
    }

    #[test]
    fn open_reports_missing_file() {
        let (device, _backend) = test_device();
        let mut program = ShaderProgram::new(&device);
        let paths = AssetPaths::new("/nonexistent");
        assert!(matches!(
            program.open("missing.vert", ShaderStage::Vertex, &paths),
            Err(RenderError::ResourceNotFound(_))
        ));
    }

    #[test]
    fn compile_then_bind() {
        let (device, _backend) = test_device();
        let program = compiled_program(&device);
        assert!(program.is_compiled());
        program.bind().unwrap();
    }

    #[test]
    fn bind_before_compile_fails() {
        let (device, _backend) = test_device();
        let mut program = ShaderProgram::new(&device);
        program
            .open_source("test.vert", ShaderStage::Vertex, DEFAULT_VERTEX_SOURCE)
            .unwrap();
        assert!(matches!(program.bind(), Err(RenderError::NotCompiled)));
    }

    #[test]
    fn bind_after_dispose_fails() {
        let (device, _backend) = test_device();
        let program = compiled_program(&device);
        program.dispose();
        assert!(matches!(program.bind(), Err(RenderError::Disposed)));
    }

    #[test]
    fn compile_twice_is_an_error() {
        let (device, _backend) = test_device();
        let mut program = compiled_program(&device);
        assert!(matches!(
            program.compile(),
            Err(RenderError::InvalidState(_))
        ));
    }

    #[test]
    fn compilation_failure_carries_stage_and_log() {
        let (device, backend) = test_device();
        backend.fail_next_compile(ShaderStage::Fragment, "0:3: unexpected token");

        let mut program = ShaderProgram::new(&device);
        program
            .open_source("test.vert", ShaderStage::Vertex, DEFAULT_VERTEX_SOURCE)
            .unwrap();
        program
            .open_source("test.frag", ShaderStage::Fragment, DEFAULT_FRAGMENT_SOURCE)
            .unwrap();

        match program.compile() {
            Err(RenderError::Compilation { stage, log }) => {
                assert_eq!(stage, ShaderStage::Fragment);
                assert!(log.contains("unexpected token"));
            }
            other => panic!("expected compilation error, got {other:?}"),
        }
    }

    #[test]
    fn link_failure_is_reported() {
        let (device, backend) = test_device();
        backend.fail_next_link("mismatched interface block");

        let mut program = ShaderProgram::new(&device);
        program
            .open_source("test.vert", ShaderStage::Vertex, DEFAULT_VERTEX_SOURCE)
            .unwrap();
        program
            .open_source("test.frag", ShaderStage::Fragment, DEFAULT_FRAGMENT_SOURCE)
            .unwrap();

        assert!(matches!(program.compile(), Err(RenderError::Link(_))));
    }

    #[test]
    fn uniform_resolution() {
        let (device, _backend) = test_device();
        let program = compiled_program(&device);
        let mvp = program.uniform_location("u_MVP").unwrap();
        let position = program.uniform_location("u_Position").unwrap();
        assert_ne!(mvp, position);
        assert!(matches!(
            program.uniform_location("u_Missing"),
            Err(RenderError::UniformNotFound(_))
        ));
    }

    #[test]
    fn dispose_releases_handles_exactly_once() {
        let (device, backend) = test_device();
        let program = compiled_program(&device);
        let id = program.id();

        program.dispose();
        program.dispose();
        assert_eq!(backend.delete_count(id), 1);
        assert!(!backend.program_alive(id));
    }

    #[test]
    fn drop_of_last_owner_releases_handles() {
        let (device, backend) = test_device();

        let program = Arc::new(compiled_program(&device));
        let id = program.id();
        let second = Arc::clone(&program);

        drop(program);
        assert!(backend.program_alive(id));
        drop(second);
        assert_eq!(backend.delete_count(id), 1);
    }

    #[test]
    fn stage_names_are_recorded() {
        let (device, _backend) = test_device();
        let program = compiled_program(&device);
        assert_eq!(program.stage_name(ShaderStage::Vertex), Some("test.vert"));
        assert_eq!(program.stage_name(ShaderStage::Fragment), Some("test.frag"));
        let names: Vec<_> = program.stage_names().collect();
        assert_eq!(
            names,
            vec![
                (ShaderStage::Vertex, "test.vert"),
                (ShaderStage::Fragment, "test.frag")
            ]
        );
    }
}
