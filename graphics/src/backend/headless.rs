//! In-memory backend for tests and machines without a GPU.
//!
//! The headless backend performs no real GPU work but records every state
//! transition (program sources and link results, resolved uniform slots,
//! the last value uploaded to each slot, texture bindings per unit, draw
//! calls) so tests can observe exactly what would have reached the native
//! API. Uniform names are recovered from the attached GLSL source at link
//! time, giving the same name-to-slot resolution behavior a real driver
//! provides.
//!
//! Fault injection hooks (forced compile/link failures, queued API errors)
//! make every hard error path reachable without hardware.

use std::collections::{HashMap, VecDeque};

use parking_lot::Mutex;

use silene_core::vertex::VertexAttribute;

use crate::error::ApiError;
use crate::program::ShaderStage;
use crate::uniform::UniformValue;

use super::{
    BufferHandle, BufferTarget, FramebufferHandle, ProgramHandle, RenderBackend, ShaderHandle,
    TextureHandle, TextureParameter, TextureUnit, UniformSlot, VertexArrayHandle,
};

#[derive(Debug, Clone)]
struct ShaderRecord {
    stage: ShaderStage,
    source: String,
    compiled: bool,
}

#[derive(Debug, Clone, Default)]
struct ProgramRecord {
    attached: Vec<ShaderHandle>,
    linked: bool,
    uniforms: HashMap<String, UniformSlot>,
}

#[derive(Debug, Clone, Default)]
struct TextureRecord {
    width: u32,
    height: u32,
    byte_len: usize,
    mipmapped: bool,
    parameters: Vec<TextureParameter>,
}

#[derive(Debug, Clone, Default)]
struct BufferRecord {
    byte_len: usize,
}

#[derive(Debug, Clone, Default)]
struct VertexArrayRecord {
    vertex_buffer: Option<BufferHandle>,
    index_buffer: Option<BufferHandle>,
    stride: usize,
    attribute_count: usize,
}

#[derive(Debug, Clone, Default)]
struct FramebufferRecord {
    color_texture: Option<TextureHandle>,
}

#[derive(Default)]
struct HeadlessState {
    next_handle: u64,

    shaders: HashMap<u64, ShaderRecord>,
    programs: HashMap<u64, ProgramRecord>,
    textures: HashMap<u64, TextureRecord>,
    buffers: HashMap<u64, BufferRecord>,
    vertex_arrays: HashMap<u64, VertexArrayRecord>,
    framebuffers: HashMap<u64, FramebufferRecord>,

    active_program: Option<ProgramHandle>,
    bound_textures: HashMap<u32, TextureHandle>,
    bound_vertex_array: Option<VertexArrayHandle>,
    bound_framebuffer: Option<FramebufferHandle>,

    /// Last value uploaded per (program, slot).
    uploaded: HashMap<(ProgramHandle, i32), UniformValue>,

    draw_calls: Vec<(VertexArrayHandle, i32)>,
    deleted_programs: Vec<ProgramHandle>,

    errors: VecDeque<ApiError>,
    fail_compile: HashMap<ShaderStage, String>,
    fail_link: Option<String>,
}

impl HeadlessState {
    fn allocate(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }

    fn push_error(&mut self, error: ApiError) {
        self.errors.push_back(error);
    }
}

/// Recording backend with no GPU requirements.
pub struct HeadlessBackend {
    state: Mutex<HeadlessState>,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(HeadlessState::default()),
        }
    }

    // Fault injection

    /// Force the next compile of the given stage to fail with `log`.
    pub fn fail_next_compile(&self, stage: ShaderStage, log: impl Into<String>) {
        self.state.lock().fail_compile.insert(stage, log.into());
    }

    /// Force the next program link to fail with `log`.
    pub fn fail_next_link(&self, log: impl Into<String>) {
        self.state.lock().fail_link = Some(log.into());
    }

    /// Queue an API error to be reported by the next poll.
    pub fn inject_api_error(&self, error: ApiError) {
        self.state.lock().push_error(error);
    }

    // Introspection

    /// The last value uploaded for `name` in `program`, if any.
    pub fn uploaded_value(&self, program: ProgramHandle, name: &str) -> Option<UniformValue> {
        let state = self.state.lock();
        let slot = *state.programs.get(&program.0)?.uniforms.get(name)?;
        state.uploaded.get(&(program, slot.0)).cloned()
    }

    /// The texture currently bound on a unit, if any.
    pub fn bound_texture(&self, unit: TextureUnit) -> Option<TextureHandle> {
        self.state.lock().bound_textures.get(&unit.index()).copied()
    }

    /// Number of draw calls issued so far.
    pub fn draw_call_count(&self) -> usize {
        self.state.lock().draw_calls.len()
    }

    /// The most recent draw call as (vertex array, index count).
    pub fn last_draw_call(&self) -> Option<(VertexArrayHandle, i32)> {
        self.state.lock().draw_calls.last().copied()
    }

    /// Whether a program object is still alive.
    pub fn program_alive(&self, program: ProgramHandle) -> bool {
        self.state.lock().programs.contains_key(&program.0)
    }

    /// Whether a shader object is still alive.
    pub fn shader_alive(&self, shader: ShaderHandle) -> bool {
        self.state.lock().shaders.contains_key(&shader.0)
    }

    /// Whether a texture object is still alive.
    pub fn texture_alive(&self, texture: TextureHandle) -> bool {
        self.state.lock().textures.contains_key(&texture.0)
    }

    /// How many times a program handle has been deleted.
    pub fn delete_count(&self, program: ProgramHandle) -> usize {
        self.state
            .lock()
            .deleted_programs
            .iter()
            .filter(|p| **p == program)
            .count()
    }

    /// The framebuffer currently bound, or `None` for the default target.
    pub fn bound_framebuffer(&self) -> Option<FramebufferHandle> {
        self.state.lock().bound_framebuffer
    }
}

impl Default for HeadlessBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Recover uniform names from GLSL source text.
///
/// Scans `uniform <type> <name>` declarations statement by statement; array
/// suffixes are stripped. Block and precision syntax is not handled; the
/// scaffold's shaders declare plain uniforms only.
fn parse_uniform_names(source: &str) -> Vec<String> {
    let mut names = Vec::new();
    for statement in source.split(';') {
        let tokens: Vec<&str> = statement.split_whitespace().collect();
        if let Some(pos) = tokens.iter().position(|t| *t == "uniform") {
            if let Some(raw) = tokens.get(pos + 2) {
                let name = match raw.find('[') {
                    Some(i) => &raw[..i],
                    None => raw,
                };
                if !name.is_empty() {
                    names.push(name.to_owned());
                }
            }
        }
    }
    names
}

impl RenderBackend for HeadlessBackend {
    fn name(&self) -> &'static str {
        "Headless"
    }

    fn create_shader(&self, stage: ShaderStage) -> ShaderHandle {
        let mut state = self.state.lock();
        let id = state.allocate();
        state.shaders.insert(
            id,
            ShaderRecord {
                stage,
                source: String::new(),
                compiled: false,
            },
        );
        log::trace!("headless: created {stage} shader {id}");
        ShaderHandle(id)
    }

    fn shader_source(&self, shader: ShaderHandle, source: &str) {
        let mut state = self.state.lock();
        match state.shaders.get_mut(&shader.0) {
            Some(record) => {
                record.source = source.to_owned();
                record.compiled = false;
            }
            None => state.push_error(ApiError::InvalidValue),
        }
    }

    fn compile_shader(&self, shader: ShaderHandle) -> Result<(), String> {
        let mut state = self.state.lock();
        let stage = match state.shaders.get(&shader.0) {
            Some(record) => record.stage,
            None => return Err("no such shader object".to_owned()),
        };
        if let Some(log) = state.fail_compile.remove(&stage) {
            return Err(log);
        }
        let record = state
            .shaders
            .get_mut(&shader.0)
            .ok_or_else(|| "no such shader object".to_owned())?;
        if record.source.is_empty() {
            return Err(format!("0:0: error: no source attached to {stage} stage"));
        }
        record.compiled = true;
        Ok(())
    }

    fn delete_shader(&self, shader: ShaderHandle) {
        self.state.lock().shaders.remove(&shader.0);
    }

    fn create_program(&self) -> ProgramHandle {
        let mut state = self.state.lock();
        let id = state.allocate();
        state.programs.insert(id, ProgramRecord::default());
        log::trace!("headless: created program {id}");
        ProgramHandle(id)
    }

    fn attach_shader(&self, program: ProgramHandle, shader: ShaderHandle) {
        let mut state = self.state.lock();
        if !state.shaders.contains_key(&shader.0) {
            state.push_error(ApiError::InvalidValue);
            return;
        }
        match state.programs.get_mut(&program.0) {
            Some(record) => record.attached.push(shader),
            None => state.push_error(ApiError::InvalidValue),
        }
    }

    fn detach_shader(&self, program: ProgramHandle, shader: ShaderHandle) {
        let mut state = self.state.lock();
        if let Some(record) = state.programs.get_mut(&program.0) {
            record.attached.retain(|s| *s != shader);
        }
    }

    fn link_program(&self, program: ProgramHandle) -> Result<(), String> {
        let mut state = self.state.lock();
        if let Some(log) = state.fail_link.take() {
            return Err(log);
        }

        let attached = match state.programs.get(&program.0) {
            Some(record) => record.attached.clone(),
            None => return Err("no such program object".to_owned()),
        };
        if attached.is_empty() {
            return Err("no shader objects attached".to_owned());
        }

        let mut uniforms = HashMap::new();
        let mut next_slot = 0i32;
        for shader in &attached {
            let record = match state.shaders.get(&shader.0) {
                Some(record) => record,
                None => return Err("attached shader object no longer exists".to_owned()),
            };
            if !record.compiled {
                return Err(format!("attached {} shader is not compiled", record.stage));
            }
            for name in parse_uniform_names(&record.source) {
                uniforms.entry(name).or_insert_with(|| {
                    let slot = UniformSlot(next_slot);
                    next_slot += 1;
                    slot
                });
            }
        }

        let record = state
            .programs
            .get_mut(&program.0)
            .ok_or_else(|| "no such program object".to_owned())?;
        record.linked = true;
        record.uniforms = uniforms;
        log::trace!(
            "headless: linked program {} with {} active uniforms",
            program.0,
            record.uniforms.len()
        );
        Ok(())
    }

    fn use_program(&self, program: ProgramHandle) {
        let mut state = self.state.lock();
        match state.programs.get(&program.0) {
            Some(record) if record.linked => state.active_program = Some(program),
            Some(_) => state.push_error(ApiError::InvalidOperation),
            None => state.push_error(ApiError::InvalidValue),
        }
    }

    fn delete_program(&self, program: ProgramHandle) {
        let mut state = self.state.lock();
        state.deleted_programs.push(program);
        state.programs.remove(&program.0);
        if state.active_program == Some(program) {
            state.active_program = None;
        }
    }

    fn uniform_location(&self, program: ProgramHandle, name: &str) -> Option<UniformSlot> {
        let state = self.state.lock();
        let record = state.programs.get(&program.0)?;
        if !record.linked {
            return None;
        }
        record.uniforms.get(name).copied()
    }

    fn set_uniform(&self, slot: UniformSlot, value: &UniformValue) {
        let mut state = self.state.lock();
        match state.active_program {
            Some(program) => {
                state.uploaded.insert((program, slot.0), value.clone());
            }
            None => state.push_error(ApiError::InvalidOperation),
        }
    }

    fn create_texture(&self) -> TextureHandle {
        let mut state = self.state.lock();
        let id = state.allocate();
        state.textures.insert(id, TextureRecord::default());
        TextureHandle(id)
    }

    fn bind_texture(&self, unit: TextureUnit, texture: Option<TextureHandle>) {
        let mut state = self.state.lock();
        match texture {
            Some(texture) => {
                if state.textures.contains_key(&texture.0) {
                    state.bound_textures.insert(unit.index(), texture);
                } else {
                    state.push_error(ApiError::InvalidValue);
                }
            }
            None => {
                state.bound_textures.remove(&unit.index());
            }
        }
    }

    fn tex_image_2d(&self, texture: TextureHandle, width: u32, height: u32, pixels: &[u8]) {
        let mut state = self.state.lock();
        if pixels.len() != (width as usize) * (height as usize) * 4 {
            state.push_error(ApiError::InvalidValue);
            return;
        }
        match state.textures.get_mut(&texture.0) {
            Some(record) => {
                record.width = width;
                record.height = height;
                record.byte_len = pixels.len();
                record.mipmapped = false;
            }
            None => state.push_error(ApiError::InvalidValue),
        }
    }

    fn tex_parameter(&self, texture: TextureHandle, parameter: TextureParameter) {
        let mut state = self.state.lock();
        match state.textures.get_mut(&texture.0) {
            Some(record) => record.parameters.push(parameter),
            None => state.push_error(ApiError::InvalidValue),
        }
    }

    fn generate_mipmap(&self, texture: TextureHandle) {
        let mut state = self.state.lock();
        match state.textures.get_mut(&texture.0) {
            Some(record) => record.mipmapped = true,
            None => state.push_error(ApiError::InvalidValue),
        }
    }

    fn delete_texture(&self, texture: TextureHandle) {
        let mut state = self.state.lock();
        state.textures.remove(&texture.0);
        state.bound_textures.retain(|_, t| *t != texture);
    }

    fn create_buffer(&self) -> BufferHandle {
        let mut state = self.state.lock();
        let id = state.allocate();
        state.buffers.insert(id, BufferRecord::default());
        BufferHandle(id)
    }

    fn buffer_data(&self, _target: BufferTarget, buffer: BufferHandle, data: &[u8]) {
        let mut state = self.state.lock();
        match state.buffers.get_mut(&buffer.0) {
            Some(record) => record.byte_len = data.len(),
            None => state.push_error(ApiError::InvalidValue),
        }
    }

    fn delete_buffer(&self, buffer: BufferHandle) {
        self.state.lock().buffers.remove(&buffer.0);
    }

    fn create_vertex_array(&self) -> VertexArrayHandle {
        let mut state = self.state.lock();
        let id = state.allocate();
        state.vertex_arrays.insert(id, VertexArrayRecord::default());
        VertexArrayHandle(id)
    }

    fn configure_vertex_array(
        &self,
        vertex_array: VertexArrayHandle,
        vertex_buffer: BufferHandle,
        index_buffer: BufferHandle,
        stride: usize,
        attributes: &[VertexAttribute],
    ) {
        let mut state = self.state.lock();
        match state.vertex_arrays.get_mut(&vertex_array.0) {
            Some(record) => {
                record.vertex_buffer = Some(vertex_buffer);
                record.index_buffer = Some(index_buffer);
                record.stride = stride;
                record.attribute_count = attributes.len();
            }
            None => state.push_error(ApiError::InvalidValue),
        }
    }

    fn bind_vertex_array(&self, vertex_array: Option<VertexArrayHandle>) {
        let mut state = self.state.lock();
        match vertex_array {
            Some(vao) => {
                if state.vertex_arrays.contains_key(&vao.0) {
                    state.bound_vertex_array = Some(vao);
                } else {
                    state.push_error(ApiError::InvalidValue);
                }
            }
            None => state.bound_vertex_array = None,
        }
    }

    fn draw_elements(&self, index_count: i32) {
        let mut state = self.state.lock();
        match state.bound_vertex_array {
            Some(vao) => state.draw_calls.push((vao, index_count)),
            None => state.push_error(ApiError::InvalidOperation),
        }
    }

    fn delete_vertex_array(&self, vertex_array: VertexArrayHandle) {
        let mut state = self.state.lock();
        state.vertex_arrays.remove(&vertex_array.0);
        if state.bound_vertex_array == Some(vertex_array) {
            state.bound_vertex_array = None;
        }
    }

    fn create_framebuffer(&self) -> FramebufferHandle {
        let mut state = self.state.lock();
        let id = state.allocate();
        state.framebuffers.insert(id, FramebufferRecord::default());
        FramebufferHandle(id)
    }

    fn bind_framebuffer(&self, framebuffer: Option<FramebufferHandle>) {
        let mut state = self.state.lock();
        match framebuffer {
            Some(fbo) => {
                if state.framebuffers.contains_key(&fbo.0) {
                    state.bound_framebuffer = Some(fbo);
                } else {
                    state.push_error(ApiError::InvalidValue);
                }
            }
            None => state.bound_framebuffer = None,
        }
    }

    fn framebuffer_color_texture(&self, framebuffer: FramebufferHandle, texture: TextureHandle) {
        let mut state = self.state.lock();
        if !state.textures.contains_key(&texture.0) {
            state.push_error(ApiError::InvalidValue);
            return;
        }
        match state.framebuffers.get_mut(&framebuffer.0) {
            Some(record) => record.color_texture = Some(texture),
            None => state.push_error(ApiError::InvalidValue),
        }
    }

    fn delete_framebuffer(&self, framebuffer: FramebufferHandle) {
        let mut state = self.state.lock();
        state.framebuffers.remove(&framebuffer.0);
        if state.bound_framebuffer == Some(framebuffer) {
            state.bound_framebuffer = None;
        }
    }

    fn poll_error(&self) -> Option<ApiError> {
        self.state.lock().errors.pop_front()
    }
}

static_assertions::assert_impl_all!(HeadlessBackend: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_plain_uniforms() {
        let source = "#version 330 core\nuniform mat4 u_MVP;\nuniform vec3 u_Position;\nvoid main() {}";
        assert_eq!(parse_uniform_names(source), vec!["u_MVP", "u_Position"]);
    }

    #[test]
    fn parse_strips_array_suffix() {
        let source = "uniform float u_Weights[4];";
        assert_eq!(parse_uniform_names(source), vec!["u_Weights"]);
    }

    #[test]
    fn compile_requires_source() {
        let backend = HeadlessBackend::new();
        let shader = backend.create_shader(ShaderStage::Vertex);
        assert!(backend.compile_shader(shader).is_err());

        backend.shader_source(shader, "void main() {}");
        assert!(backend.compile_shader(shader).is_ok());
    }

    #[test]
    fn link_resolves_uniform_slots() {
        let backend = HeadlessBackend::new();
        let vs = backend.create_shader(ShaderStage::Vertex);
        backend.shader_source(vs, "uniform mat4 u_MVP;\nvoid main() {}");
        backend.compile_shader(vs).unwrap();

        let program = backend.create_program();
        backend.attach_shader(program, vs);
        backend.link_program(program).unwrap();

        assert!(backend.uniform_location(program, "u_MVP").is_some());
        assert!(backend.uniform_location(program, "u_Missing").is_none());
    }

    #[test]
    fn uploads_are_recorded_per_program_slot() {
        let backend = HeadlessBackend::new();
        let vs = backend.create_shader(ShaderStage::Vertex);
        backend.shader_source(vs, "uniform float u_Scale;\nvoid main() {}");
        backend.compile_shader(vs).unwrap();

        let program = backend.create_program();
        backend.attach_shader(program, vs);
        backend.link_program(program).unwrap();
        backend.use_program(program);

        let slot = backend.uniform_location(program, "u_Scale").unwrap();
        backend.set_uniform(slot, &UniformValue::Float(2.5));
        assert_eq!(
            backend.uploaded_value(program, "u_Scale"),
            Some(UniformValue::Float(2.5))
        );
    }

    #[test]
    fn uploads_without_active_program_flag_an_error() {
        let backend = HeadlessBackend::new();
        backend.set_uniform(UniformSlot(0), &UniformValue::Int(1));
        assert_eq!(backend.poll_error(), Some(ApiError::InvalidOperation));
        assert_eq!(backend.poll_error(), None);
    }

    #[test]
    fn injected_compile_failure() {
        let backend = HeadlessBackend::new();
        backend.fail_next_compile(ShaderStage::Fragment, "0:1: syntax error");

        let fs = backend.create_shader(ShaderStage::Fragment);
        backend.shader_source(fs, "void main() {}");
        assert_eq!(
            backend.compile_shader(fs),
            Err("0:1: syntax error".to_owned())
        );
        // Injection is one-shot.
        assert!(backend.compile_shader(fs).is_ok());
    }

    #[test]
    fn draw_requires_bound_vertex_array() {
        let backend = HeadlessBackend::new();
        backend.draw_elements(3);
        assert_eq!(backend.poll_error(), Some(ApiError::InvalidOperation));

        let vao = backend.create_vertex_array();
        backend.bind_vertex_array(Some(vao));
        backend.draw_elements(3);
        assert_eq!(backend.poll_error(), None);
        assert_eq!(backend.last_draw_call(), Some((vao, 3)));
    }
}
